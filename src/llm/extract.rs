//! Pulling JSON out of model output that may wrap it in prose or markdown fences.

use crate::error::{FinancePlannerError, Result};
use regex::Regex;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::OnceLock;

static FENCED_BLOCK: OnceLock<Option<Regex>> = OnceLock::new();
static OBJECT_SPAN: OnceLock<Option<Regex>> = OnceLock::new();
static ARRAY_SPAN: OnceLock<Option<Regex>> = OnceLock::new();

fn cached(cell: &'static OnceLock<Option<Regex>>, pattern: &str) -> Option<&'static Regex> {
    cell.get_or_init(|| Regex::new(pattern).ok()).as_ref()
}

/// Tries, in order: the whole text, a fenced ```json block, the widest `{...}` span,
/// the widest `[...]` span.
pub fn extract_json(text: &str) -> Result<Value> {
    let trimmed = text.trim();
    if let Ok(value) = serde_json::from_str(trimmed) {
        return Ok(value);
    }

    if let Some(caps) = cached(&FENCED_BLOCK, r"(?s)```(?:json|JSON)?\s*(.*?)```")
        .and_then(|re| re.captures(trimmed))
    {
        if let Ok(value) = serde_json::from_str(caps[1].trim()) {
            return Ok(value);
        }
    }

    for (cell, pattern) in [(&OBJECT_SPAN, r"(?s)\{.*\}"), (&ARRAY_SPAN, r"(?s)\[.*\]")] {
        if let Some(m) = cached(cell, pattern).and_then(|re| re.find(trimmed)) {
            if let Ok(value) = serde_json::from_str(m.as_str()) {
                return Ok(value);
            }
        }
    }

    Err(FinancePlannerError::UnparseableResponse {
        raw: text.to_string(),
    })
}

/// Like [`extract_json`], but also requires the JSON to match `T`.
pub fn extract_typed<T: DeserializeOwned>(text: &str) -> Result<T> {
    let value = extract_json(text)?;
    serde_json::from_value(value).map_err(|_| FinancePlannerError::UnparseableResponse {
        raw: text.to_string(),
    })
}
