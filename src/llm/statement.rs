use crate::error::{FinancePlannerError, Result};
use crate::ingestion::{deduplicate, normalize_statement, ParsedStatement};
use crate::llm::client::ChatClient;
use crate::llm::prompts::{statement_user_prompt, SYSTEM_PROMPT_STATEMENT};
use crate::llm::types::{ChatMessage, ToolDefinition};
use crate::schema::Transaction;
use log::{info, warn};
use serde::{Deserialize, Serialize};

/// Statement text beyond this many characters is cut off before sending.
pub const MAX_STATEMENT_CHARS: usize = 60_000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatementImport {
    pub bank_name: Option<String>,
    pub transactions: Vec<Transaction>,
    pub rows_read: usize,
    pub duplicates_skipped: usize,
    pub truncated: bool,
}

pub struct StatementParser {
    client: ChatClient,
}

impl StatementParser {
    pub fn new(client: ChatClient) -> Self {
        Self { client }
    }

    /// Reads statement rows out of extracted statement text.
    pub async fn parse(&self, text: &str) -> Result<ParsedStatement> {
        Ok(self.parse_text(text).await?.0)
    }

    async fn parse_text(&self, text: &str) -> Result<(ParsedStatement, bool)> {
        let text = text.trim();
        if text.is_empty() {
            return Err(FinancePlannerError::InvalidInput(
                "statement text is empty".to_string(),
            ));
        }

        let (text, truncated) = truncate_chars(text, MAX_STATEMENT_CHARS);
        if truncated {
            warn!(
                "Statement text truncated to {} characters",
                MAX_STATEMENT_CHARS
            );
        }

        let tool = ToolDefinition::from_schema::<ParsedStatement>(
            "record_statement",
            "Record every transaction row of the bank statement",
        )?;
        let messages = [
            ChatMessage::system(SYSTEM_PROMPT_STATEMENT),
            ChatMessage::user(statement_user_prompt(text)),
        ];

        let value = self.client.complete_with_tool(&messages, &tool).await?;
        let statement: ParsedStatement = serde_json::from_value(value.clone()).map_err(|_| {
            FinancePlannerError::UnparseableResponse {
                raw: value.to_string(),
            }
        })?;

        Ok((statement, truncated))
    }

    /// Parses, normalizes and drops rows already present in `existing`.
    pub async fn parse_into_transactions(
        &self,
        text: &str,
        existing: &[Transaction],
    ) -> Result<StatementImport> {
        let (statement, truncated) = self.parse_text(text).await?;
        let rows_read = statement.rows.len();
        let (transactions, duplicates_skipped) =
            deduplicate(existing, normalize_statement(&statement));

        info!(
            "Statement import: {} rows read, {} new, {} duplicates",
            rows_read,
            transactions.len(),
            duplicates_skipped
        );

        Ok(StatementImport {
            bank_name: statement.bank_name,
            transactions,
            rows_read,
            duplicates_skipped,
            truncated,
        })
    }
}

fn truncate_chars(text: &str, max: usize) -> (&str, bool) {
    match text.char_indices().nth(max) {
        Some((byte_idx, _)) => (&text[..byte_idx], true),
        None => (text, false),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_respects_char_boundaries() {
        let (short, cut) = truncate_chars("ŞÇĞÜÖİ", 3);
        assert_eq!(short, "ŞÇĞ");
        assert!(cut);

        let (same, cut) = truncate_chars("abc", 3);
        assert_eq!(same, "abc");
        assert!(!cut);
    }
}
