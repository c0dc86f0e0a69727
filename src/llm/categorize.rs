use crate::categories::CategoryBook;
use crate::config::ServiceConfig;
use crate::error::{FinancePlannerError, Result};
use crate::llm::client::ChatClient;
use crate::llm::prompts::{categorize_user_prompt, SYSTEM_PROMPT_CATEGORIZE};
use crate::llm::types::{ChatMessage, ToolDefinition};
use crate::schema::Transaction;
use futures::future::join_all;
use log::{debug, info, warn};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::HashSet;
use std::ops::Range;
use std::time::Duration;

/// Confidence recorded when the model leaves it out.
pub const DEFAULT_CONFIDENCE: f64 = 0.5;

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct AssignmentPayload {
    #[schemars(description = "One entry per transaction that was given")]
    pub assignments: Vec<RawAssignment>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct RawAssignment {
    #[schemars(description = "The `index` of the transaction exactly as given")]
    pub index: usize,

    #[schemars(description = "Category id chosen from the provided list")]
    pub category_id: String,

    #[serde(default)]
    #[schemars(description = "Confidence between 0 and 1")]
    pub confidence: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryAssignment {
    /// Position in the slice passed to [`TransactionCategorizer::categorize`].
    pub transaction_index: usize,
    pub transaction_id: Option<String>,
    pub category_id: String,
    pub confidence: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CategorizationReport {
    pub assignments: Vec<CategoryAssignment>,
    pub batches: usize,
    pub failed_batches: usize,
    /// Assignments dropped for an unknown index or category id.
    pub discarded: usize,
}

pub struct TransactionCategorizer {
    client: ChatClient,
    batch_size: usize,
    group_size: usize,
    batch_timeout: Duration,
}

impl TransactionCategorizer {
    pub fn new(client: ChatClient) -> Self {
        let defaults = ServiceConfig::default();
        Self {
            client,
            batch_size: defaults.batch_size,
            group_size: defaults.group_size,
            batch_timeout: Duration::from_secs(defaults.batch_timeout_secs),
        }
    }

    pub fn from_config(client: ChatClient, config: &ServiceConfig) -> Self {
        Self::new(client).with_batching(
            config.batch_size,
            config.group_size,
            Duration::from_secs(config.batch_timeout_secs),
        )
    }

    /// Sizes below one are raised to one.
    pub fn with_batching(mut self, batch_size: usize, group_size: usize, batch_timeout: Duration) -> Self {
        self.batch_size = batch_size.max(1);
        self.group_size = group_size.max(1);
        self.batch_timeout = batch_timeout;
        self
    }

    /// Splits `transactions` into batches and runs them `group_size` at a time.
    /// A failed or timed-out batch is logged and skipped; the gateway's 429/402 is only
    /// returned when no batch succeeded.
    pub async fn categorize(
        &self,
        transactions: &[Transaction],
        book: &CategoryBook,
    ) -> Result<CategorizationReport> {
        let mut report = CategorizationReport::default();
        if transactions.is_empty() {
            return Ok(report);
        }

        let tool = ToolDefinition::from_schema::<AssignmentPayload>(
            "record_categories",
            "Record the chosen category for each transaction",
        )?;
        let listing = book.prompt_listing();

        let ranges: Vec<Range<usize>> = (0..transactions.len())
            .step_by(self.batch_size)
            .map(|start| start..(start + self.batch_size).min(transactions.len()))
            .collect();
        report.batches = ranges.len();

        info!(
            "Categorizing {} transactions in {} batches (group size {})",
            transactions.len(),
            ranges.len(),
            self.group_size
        );

        let mut gateway_limit: Option<FinancePlannerError> = None;
        // First answer per transaction wins.
        let mut seen: HashSet<usize> = HashSet::new();

        for (group_no, group) in ranges.chunks(self.group_size).enumerate() {
            debug!("Starting batch group {}", group_no + 1);

            let results = join_all(group.iter().map(|range| {
                self.run_batch(transactions, range.clone(), &tool, &listing)
            }))
            .await;

            for (range, result) in group.iter().zip(results) {
                match result {
                    Ok(raw) => {
                        for assignment in raw {
                            match validate(assignment, range, transactions, book) {
                                Some(valid) if seen.insert(valid.transaction_index) => {
                                    report.assignments.push(valid)
                                }
                                Some(valid) => {
                                    debug!(
                                        "Discarding repeated assignment for index {}",
                                        valid.transaction_index
                                    );
                                    report.discarded += 1;
                                }
                                None => report.discarded += 1,
                            }
                        }
                    }
                    Err(e) => {
                        warn!(
                            "Batch {}..{} failed and was skipped: {}",
                            range.start, range.end, e
                        );
                        report.failed_batches += 1;
                        if e.is_gateway_limit() && gateway_limit.is_none() {
                            gateway_limit = Some(e);
                        }
                    }
                }
            }
        }

        if report.failed_batches == report.batches {
            if let Some(e) = gateway_limit {
                return Err(e);
            }
        }

        report.assignments.sort_by_key(|a| a.transaction_index);
        info!(
            "Categorized {} transactions ({} batches failed, {} assignments discarded)",
            report.assignments.len(),
            report.failed_batches,
            report.discarded
        );

        Ok(report)
    }

    async fn run_batch(
        &self,
        transactions: &[Transaction],
        range: Range<usize>,
        tool: &ToolDefinition,
        listing: &str,
    ) -> Result<Vec<RawAssignment>> {
        let rows: Vec<_> = range
            .clone()
            .map(|index| {
                let tx = &transactions[index];
                json!({
                    "index": index,
                    "date": tx.date,
                    "description": tx.description,
                    "amount": tx.signed_amount(),
                    "kind": tx.kind,
                })
            })
            .collect();

        let messages = [
            ChatMessage::system(SYSTEM_PROMPT_CATEGORIZE),
            ChatMessage::user(categorize_user_prompt(
                listing,
                &serde_json::to_string_pretty(&rows)?,
            )),
        ];

        let call = self.client.complete_with_tool(&messages, tool);
        let value = tokio::time::timeout(self.batch_timeout, call)
            .await
            .map_err(|_| FinancePlannerError::Timeout(self.batch_timeout.as_secs()))??;

        let payload: AssignmentPayload = serde_json::from_value(value.clone()).map_err(|_| {
            FinancePlannerError::UnparseableResponse {
                raw: value.to_string(),
            }
        })?;

        Ok(payload.assignments)
    }
}

fn validate(
    raw: RawAssignment,
    batch: &Range<usize>,
    transactions: &[Transaction],
    book: &CategoryBook,
) -> Option<CategoryAssignment> {
    if !batch.contains(&raw.index) {
        debug!("Discarding assignment for index {} outside batch", raw.index);
        return None;
    }
    if !book.contains(&raw.category_id) {
        debug!("Discarding unknown category '{}'", raw.category_id);
        return None;
    }

    Some(CategoryAssignment {
        transaction_index: raw.index,
        transaction_id: transactions[raw.index].id.clone(),
        category_id: raw.category_id,
        confidence: raw.confidence.unwrap_or(DEFAULT_CONFIDENCE).clamp(0.0, 1.0),
    })
}

/// Writes category and confidence back onto the transactions. Returns how many changed.
pub fn apply_assignments(transactions: &mut [Transaction], assignments: &[CategoryAssignment]) -> usize {
    let mut applied = 0;
    for a in assignments {
        if let Some(tx) = transactions.get_mut(a.transaction_index) {
            tx.category_id = Some(a.category_id.clone());
            tx.ai_confidence = Some(a.confidence);
            applied += 1;
        }
    }
    applied
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::TransactionKind;
    use chrono::NaiveDate;

    fn txs() -> Vec<Transaction> {
        let date = NaiveDate::from_ymd_opt(2024, 2, 1).unwrap();
        vec![
            Transaction::new(date, "MIGROS", 300.0, TransactionKind::Expense),
            Transaction::new(date, "MAAŞ", 40_000.0, TransactionKind::Income),
        ]
    }

    fn raw(index: usize, category_id: &str, confidence: Option<f64>) -> RawAssignment {
        RawAssignment {
            index,
            category_id: category_id.to_string(),
            confidence,
        }
    }

    #[test]
    fn test_validate_assignment() {
        let book = CategoryBook::turkish_defaults();
        let txs = txs();

        let ok = validate(raw(1, "salary", None), &(0..2), &txs, &book).unwrap();
        assert_eq!(ok.confidence, DEFAULT_CONFIDENCE);

        let clamped = validate(raw(0, "groceries", Some(1.7)), &(0..2), &txs, &book).unwrap();
        assert_eq!(clamped.confidence, 1.0);

        assert!(validate(raw(0, "yacht", Some(0.9)), &(0..2), &txs, &book).is_none());
        assert!(validate(raw(5, "groceries", Some(0.9)), &(0..2), &txs, &book).is_none());
    }

    #[test]
    fn test_apply_assignments() {
        let mut txs = txs();
        let applied = apply_assignments(
            &mut txs,
            &[CategoryAssignment {
                transaction_index: 0,
                transaction_id: None,
                category_id: "groceries".to_string(),
                confidence: 0.9,
            }],
        );
        assert_eq!(applied, 1);
        assert_eq!(txs[0].category_id.as_deref(), Some("groceries"));
        assert!(txs[1].category_id.is_none());
    }
}
