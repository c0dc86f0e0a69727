use crate::categories::normalize_name;
use crate::currency::Currency;
use crate::schema::{Transaction, TransactionKind};
use chrono::NaiveDate;
use log::debug;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// One row of a bank or card statement, as read from the document.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct StatementRow {
    #[schemars(description = "Transaction date in YYYY-MM-DD format")]
    pub date: NaiveDate,

    #[schemars(description = "Description exactly as printed (merchant, EFT/Havale note, etc.)")]
    pub description: String,

    #[schemars(
        description = "Signed amount: negative for money leaving the account (harcama, ödeme), positive for money coming in (gelen havale, maaş)"
    )]
    pub amount: f64,

    #[serde(default)]
    #[schemars(description = "Running balance after the row, if printed")]
    pub balance: Option<f64>,

    #[serde(default)]
    #[schemars(
        description = "True for movements between the holder's own accounts or credit card debt payments"
    )]
    pub is_transfer: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ParsedStatement {
    #[serde(default)]
    #[schemars(description = "Bank name as shown on the statement header")]
    pub bank_name: Option<String>,

    #[serde(default)]
    #[schemars(description = "Account currency; TRY unless the statement says otherwise")]
    pub currency: Currency,

    #[schemars(description = "Every transaction row in the statement, in printed order")]
    pub rows: Vec<StatementRow>,
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Converts signed statement rows into transactions. Zero-amount rows are dropped.
pub fn normalize_statement(statement: &ParsedStatement) -> Vec<Transaction> {
    let transactions: Vec<Transaction> = statement
        .rows
        .iter()
        .filter(|row| row.amount != 0.0 && row.amount.is_finite())
        .map(|row| {
            let kind = if row.is_transfer {
                TransactionKind::Transfer
            } else if row.amount > 0.0 {
                TransactionKind::Income
            } else {
                TransactionKind::Expense
            };
            Transaction::new(row.date, collapse_whitespace(&row.description), row.amount, kind)
                .with_currency(statement.currency)
        })
        .collect();

    debug!(
        "Normalized {} of {} statement rows",
        transactions.len(),
        statement.rows.len()
    );

    transactions
}

type DedupKey = (NaiveDate, i64, String);

fn dedup_key(tx: &Transaction) -> DedupKey {
    (
        tx.date,
        (tx.signed_amount() * 100.0).round() as i64,
        normalize_name(&tx.description),
    )
}

/// Drops incoming transactions already present in `existing` (or repeated within
/// `incoming`) by date, amount and description. Returns the kept rows and the number skipped.
pub fn deduplicate(existing: &[Transaction], incoming: Vec<Transaction>) -> (Vec<Transaction>, usize) {
    let mut seen: HashSet<DedupKey> = existing.iter().map(dedup_key).collect();
    let total = incoming.len();

    let kept: Vec<Transaction> = incoming
        .into_iter()
        .filter(|tx| seen.insert(dedup_key(tx)))
        .collect();

    let skipped = total - kept.len();
    if skipped > 0 {
        debug!("Skipped {} duplicate transactions", skipped);
    }
    (kept, skipped)
}
