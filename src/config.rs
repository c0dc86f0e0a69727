use crate::error::{FinancePlannerError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub const DEFAULT_LLM_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_CHAT_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_VISION_MODEL: &str = "gpt-4o";

/// Settings for the gateway client and the HTTP functions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub llm_base_url: String,
    #[serde(skip_serializing)]
    pub llm_api_key: String,
    pub chat_model: String,
    pub vision_model: String,
    /// Transactions per categorization request.
    pub batch_size: usize,
    /// Categorization requests in flight at once.
    pub group_size: usize,
    pub batch_timeout_secs: u64,
    pub request_timeout_secs: u64,
    pub bind_address: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            llm_base_url: DEFAULT_LLM_BASE_URL.to_string(),
            llm_api_key: String::new(),
            chat_model: DEFAULT_CHAT_MODEL.to_string(),
            vision_model: DEFAULT_VISION_MODEL.to_string(),
            batch_size: 25,
            group_size: 3,
            batch_timeout_secs: 45,
            request_timeout_secs: 60,
            bind_address: "0.0.0.0:8787".to_string(),
        }
    }
}

impl ServiceConfig {
    /// Reads `FINPLAN_*` variables from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_vars(&std::env::vars().collect())
    }

    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self> {
        let defaults = Self::default();
        let get = |key: &str| vars.get(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let config = Self {
            llm_base_url: get("FINPLAN_LLM_BASE_URL")
                .unwrap_or(defaults.llm_base_url)
                .trim_end_matches('/')
                .to_string(),
            llm_api_key: get("FINPLAN_LLM_API_KEY").ok_or_else(|| {
                FinancePlannerError::Config("FINPLAN_LLM_API_KEY must be set".to_string())
            })?,
            chat_model: get("FINPLAN_CHAT_MODEL").unwrap_or(defaults.chat_model),
            vision_model: get("FINPLAN_VISION_MODEL").unwrap_or(defaults.vision_model),
            batch_size: parse_var(get("FINPLAN_BATCH_SIZE"), "FINPLAN_BATCH_SIZE", defaults.batch_size)?,
            group_size: parse_var(get("FINPLAN_GROUP_SIZE"), "FINPLAN_GROUP_SIZE", defaults.group_size)?,
            batch_timeout_secs: parse_var(
                get("FINPLAN_BATCH_TIMEOUT_SECS"),
                "FINPLAN_BATCH_TIMEOUT_SECS",
                defaults.batch_timeout_secs,
            )?,
            request_timeout_secs: parse_var(
                get("FINPLAN_REQUEST_TIMEOUT_SECS"),
                "FINPLAN_REQUEST_TIMEOUT_SECS",
                defaults.request_timeout_secs,
            )?,
            bind_address: get("FINPLAN_BIND_ADDRESS").unwrap_or(defaults.bind_address),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !(1..=200).contains(&self.batch_size) {
            return Err(FinancePlannerError::Config(format!(
                "batch size must be between 1 and 200, got {}",
                self.batch_size
            )));
        }
        if !(1..=16).contains(&self.group_size) {
            return Err(FinancePlannerError::Config(format!(
                "group size must be between 1 and 16, got {}",
                self.group_size
            )));
        }
        if self.batch_timeout_secs == 0 || self.request_timeout_secs == 0 {
            return Err(FinancePlannerError::Config(
                "timeouts must be at least one second".to_string(),
            ));
        }
        if !self.llm_base_url.starts_with("http://") && !self.llm_base_url.starts_with("https://") {
            return Err(FinancePlannerError::Config(format!(
                "LLM base URL must be http(s), got '{}'",
                self.llm_base_url
            )));
        }
        Ok(())
    }
}

fn parse_var<T: std::str::FromStr>(value: Option<String>, key: &str, default: T) -> Result<T> {
    match value {
        None => Ok(default),
        Some(raw) => raw
            .parse()
            .map_err(|_| FinancePlannerError::Config(format!("{} has invalid value '{}'", key, raw))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_defaults_with_key() {
        let config = ServiceConfig::from_vars(&vars(&[("FINPLAN_LLM_API_KEY", "sk-test")])).unwrap();
        assert_eq!(config.llm_base_url, DEFAULT_LLM_BASE_URL);
        assert_eq!(config.batch_size, 25);
        assert_eq!(config.group_size, 3);
    }

    #[test]
    fn test_missing_key() {
        assert!(matches!(
            ServiceConfig::from_vars(&vars(&[])),
            Err(FinancePlannerError::Config(_))
        ));
    }

    #[test]
    fn test_overrides_and_validation() {
        let config = ServiceConfig::from_vars(&vars(&[
            ("FINPLAN_LLM_API_KEY", "k"),
            ("FINPLAN_LLM_BASE_URL", "http://localhost:9000/v1/"),
            ("FINPLAN_BATCH_SIZE", "10"),
        ]))
        .unwrap();
        assert_eq!(config.llm_base_url, "http://localhost:9000/v1");
        assert_eq!(config.batch_size, 10);

        assert!(ServiceConfig::from_vars(&vars(&[
            ("FINPLAN_LLM_API_KEY", "k"),
            ("FINPLAN_GROUP_SIZE", "0"),
        ]))
        .is_err());
        assert!(ServiceConfig::from_vars(&vars(&[
            ("FINPLAN_LLM_API_KEY", "k"),
            ("FINPLAN_BATCH_SIZE", "many"),
        ]))
        .is_err());
    }

    #[test]
    fn test_api_key_not_serialized() {
        let config = ServiceConfig {
            llm_api_key: "secret".to_string(),
            ..ServiceConfig::default()
        };
        assert!(!serde_json::to_string(&config).unwrap().contains("secret"));
    }
}
