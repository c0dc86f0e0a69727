//! Persistence seam. Handlers write through [`RecordStore`]; the hosted database
//! implements it in production and [`MemoryStore`] stands in everywhere else.

use crate::error::{FinancePlannerError, Result};
use crate::planning::PlanItem;
use crate::schema::{Receipt, Transaction};
use chrono::{DateTime, Utc};
use log::warn;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

/// Raw model output kept for later inspection when it could not be used.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub user_id: String,
    pub operation: String,
    pub input: String,
    pub raw_response: String,
    pub error: String,
    pub created_at: DateTime<Utc>,
}

/// Category chosen for an already stored transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryUpdate {
    pub transaction_id: String,
    pub category_id: String,
    pub confidence: f64,
}

pub trait RecordStore: Send + Sync {
    /// Inserts rows and returns how many were written.
    fn insert_transactions(&self, user_id: &str, transactions: &[Transaction]) -> Result<usize>;

    fn transactions(&self, user_id: &str) -> Result<Vec<Transaction>>;

    /// Applies updates to the user's transactions and returns how many matched.
    fn set_categories(&self, user_id: &str, updates: &[CategoryUpdate]) -> Result<usize>;

    fn insert_receipt(&self, user_id: &str, receipt: &Receipt) -> Result<()>;

    fn upsert_plan_item(&self, user_id: &str, item: &PlanItem) -> Result<()>;

    fn plan_items(&self, user_id: &str) -> Result<Vec<PlanItem>>;

    /// Returns false when no item had that id.
    fn delete_plan_item(&self, user_id: &str, item_id: &str) -> Result<bool>;

    fn record_audit(&self, entry: AuditEntry) -> Result<()>;
}

#[derive(Default)]
struct Tables {
    transactions: HashMap<String, Vec<Transaction>>,
    receipts: HashMap<String, Vec<Receipt>>,
    plan_items: HashMap<String, Vec<PlanItem>>,
    audit: Vec<AuditEntry>,
}

#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Tables>> {
        self.tables
            .lock()
            .map_err(|_| FinancePlannerError::Store("memory store lock poisoned".to_string()))
    }

    pub fn audit_entries(&self) -> Result<Vec<AuditEntry>> {
        Ok(self.lock()?.audit.clone())
    }

    pub fn receipts(&self, user_id: &str) -> Result<Vec<Receipt>> {
        Ok(self
            .lock()?
            .receipts
            .get(user_id)
            .cloned()
            .unwrap_or_default())
    }
}

impl RecordStore for MemoryStore {
    fn insert_transactions(&self, user_id: &str, transactions: &[Transaction]) -> Result<usize> {
        let mut tables = self.lock()?;
        let rows = tables.transactions.entry(user_id.to_string()).or_default();
        let start = rows.len();
        rows.extend(transactions.iter().enumerate().map(|(i, tx)| {
            let mut tx = tx.clone();
            if tx.id.is_none() {
                tx.id = Some(format!("{}-{}", user_id, start + i + 1));
            }
            tx
        }));
        Ok(transactions.len())
    }

    fn transactions(&self, user_id: &str) -> Result<Vec<Transaction>> {
        Ok(self
            .lock()?
            .transactions
            .get(user_id)
            .cloned()
            .unwrap_or_default())
    }

    fn set_categories(&self, user_id: &str, updates: &[CategoryUpdate]) -> Result<usize> {
        let mut tables = self.lock()?;
        let Some(rows) = tables.transactions.get_mut(user_id) else {
            return Ok(0);
        };

        let mut matched = 0;
        for update in updates {
            if let Some(tx) = rows
                .iter_mut()
                .find(|tx| tx.id.as_deref() == Some(update.transaction_id.as_str()))
            {
                tx.category_id = Some(update.category_id.clone());
                tx.ai_confidence = Some(update.confidence);
                matched += 1;
            }
        }
        Ok(matched)
    }

    fn insert_receipt(&self, user_id: &str, receipt: &Receipt) -> Result<()> {
        self.lock()?
            .receipts
            .entry(user_id.to_string())
            .or_default()
            .push(receipt.clone());
        Ok(())
    }

    fn upsert_plan_item(&self, user_id: &str, item: &PlanItem) -> Result<()> {
        let mut tables = self.lock()?;
        let items = tables.plan_items.entry(user_id.to_string()).or_default();
        match items.iter_mut().find(|existing| existing.id == item.id) {
            Some(existing) => *existing = item.clone(),
            None => items.push(item.clone()),
        }
        Ok(())
    }

    fn plan_items(&self, user_id: &str) -> Result<Vec<PlanItem>> {
        Ok(self
            .lock()?
            .plan_items
            .get(user_id)
            .cloned()
            .unwrap_or_default())
    }

    fn delete_plan_item(&self, user_id: &str, item_id: &str) -> Result<bool> {
        let mut tables = self.lock()?;
        let Some(items) = tables.plan_items.get_mut(user_id) else {
            return Ok(false);
        };
        let before = items.len();
        items.retain(|item| item.id != item_id);
        Ok(items.len() < before)
    }

    fn record_audit(&self, entry: AuditEntry) -> Result<()> {
        warn!(
            "Audit [{}] for user {}: {}",
            entry.operation, entry.user_id, entry.error
        );
        self.lock()?.audit.push(entry);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::TransactionKind;
    use chrono::NaiveDate;

    #[test]
    fn test_transactions_are_scoped_per_user() {
        let store = MemoryStore::new();
        let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let tx = Transaction::new(date, "Kira", 100.0, TransactionKind::Expense);

        assert_eq!(store.insert_transactions("u1", &[tx.clone(), tx.clone()]).unwrap(), 2);
        store.insert_transactions("u2", &[tx]).unwrap();

        let rows = store.transactions("u1").unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].id.as_deref(), Some("u1-2"));
        assert_eq!(store.transactions("u2").unwrap().len(), 1);
        assert!(store.transactions("nobody").unwrap().is_empty());
    }

    #[test]
    fn test_upsert_plan_item() {
        let store = MemoryStore::new();
        let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let mut item = PlanItem::new("p1", "Rapor yaz", date);
        store.upsert_plan_item("u1", &item).unwrap();

        item.title = "Raporu bitir".to_string();
        store.upsert_plan_item("u1", &item).unwrap();

        let items = store.plan_items("u1").unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].title, "Raporu bitir");

        assert!(store.delete_plan_item("u1", "p1").unwrap());
        assert!(!store.delete_plan_item("u1", "p1").unwrap());
        assert!(store.plan_items("u1").unwrap().is_empty());
    }

    #[test]
    fn test_set_categories() {
        let store = MemoryStore::new();
        let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let tx = Transaction::new(date, "Migros", 250.0, TransactionKind::Expense);
        store.insert_transactions("u1", &[tx.clone(), tx]).unwrap();

        let matched = store
            .set_categories(
                "u1",
                &[
                    CategoryUpdate {
                        transaction_id: "u1-2".to_string(),
                        category_id: "groceries".to_string(),
                        confidence: 0.8,
                    },
                    CategoryUpdate {
                        transaction_id: "u1-9".to_string(),
                        category_id: "groceries".to_string(),
                        confidence: 0.8,
                    },
                ],
            )
            .unwrap();
        assert_eq!(matched, 1);

        let rows = store.transactions("u1").unwrap();
        assert!(rows[0].category_id.is_none());
        assert_eq!(rows[1].category_id.as_deref(), Some("groceries"));
        assert_eq!(store.set_categories("u2", &[]).unwrap(), 0);
    }
}
