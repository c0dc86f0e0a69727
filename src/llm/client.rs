use crate::config::ServiceConfig;
use crate::error::{FinancePlannerError, Result};
use crate::llm::extract::extract_json;
use crate::llm::types::*;
use log::{debug, warn};
use reqwest::{Client, StatusCode};
use serde_json::Value;
use std::time::Duration;

/// Client for an OpenAI-compatible `/chat/completions` endpoint.
#[derive(Clone)]
pub struct ChatClient {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
    timeout_secs: u64,
}

impl ChatClient {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
        timeout_secs: u64,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;

        Ok(Self {
            client,
            api_key: api_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            timeout_secs,
        })
    }

    /// Client for the chat model named in `config`.
    pub fn from_config(config: &ServiceConfig) -> Result<Self> {
        Self::new(
            &config.llm_base_url,
            &config.llm_api_key,
            &config.chat_model,
            config.request_timeout_secs,
        )
    }

    /// Same connection settings, different model (used for the vision model).
    pub fn with_model(&self, model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            ..self.clone()
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    async fn send(&self, request: &ChatRequest<'_>) -> Result<ResponseMessage> {
        let url = format!("{}/chat/completions", self.base_url);
        debug!("POST {} (model {})", url, self.model);

        let res = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| self.map_transport_error(e))?;

        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            warn!("Gateway returned {}: {}", status, body);
            return Err(match status {
                StatusCode::TOO_MANY_REQUESTS => FinancePlannerError::RateLimited,
                StatusCode::PAYMENT_REQUIRED => FinancePlannerError::QuotaExhausted,
                _ => FinancePlannerError::Gateway {
                    status: status.as_u16(),
                    body,
                },
            });
        }

        let body: ChatResponse = res.json().await.map_err(|e| self.map_transport_error(e))?;
        body.choices
            .into_iter()
            .next()
            .map(|choice| choice.message)
            .ok_or_else(|| FinancePlannerError::UnparseableResponse {
                raw: "response contained no choices".to_string(),
            })
    }

    fn map_transport_error(&self, err: reqwest::Error) -> FinancePlannerError {
        if err.is_timeout() {
            FinancePlannerError::Timeout(self.timeout_secs)
        } else {
            FinancePlannerError::Http(err)
        }
    }

    /// Free-text completion. Returns the assistant message content.
    pub async fn complete(&self, messages: &[ChatMessage]) -> Result<String> {
        let request = ChatRequest {
            model: &self.model,
            messages,
            temperature: Some(0.1),
            tools: None,
            tool_choice: None,
        };

        let message = self.send(&request).await?;
        message
            .content
            .ok_or_else(|| FinancePlannerError::UnparseableResponse {
                raw: String::new(),
            })
    }

    /// Forces a call to `tool` and returns its parsed arguments. Models that answer in
    /// plain content instead still get their JSON extracted.
    pub async fn complete_with_tool(
        &self,
        messages: &[ChatMessage],
        tool: &ToolDefinition,
    ) -> Result<Value> {
        let request = ChatRequest {
            model: &self.model,
            messages,
            temperature: Some(0.0),
            tools: Some(vec![tool.as_tool()]),
            tool_choice: Some(tool.as_tool_choice()),
        };

        let message = self.send(&request).await?;
        if let Some(call) = message.tool_calls.into_iter().next() {
            return serde_json::from_str(&call.function.arguments).map_err(|_| {
                FinancePlannerError::UnparseableResponse {
                    raw: call.function.arguments,
                }
            });
        }

        match message.content {
            Some(content) => extract_json(&content),
            None => Err(FinancePlannerError::UnparseableResponse {
                raw: String::new(),
            }),
        }
    }
}
