use crate::currency::Currency;
use chrono::NaiveDate;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    #[schemars(description = "Money coming in: salary, sales, interest received, refunds")]
    Income,

    #[schemars(description = "Money going out: purchases, bills, rent, taxes, fees")]
    Expense,

    #[schemars(
        description = "Movement between the user's own accounts or card payments. Not income or expense."
    )]
    Transfer,
}

/// Where a category lands when income statements are built.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum CategoryClass {
    #[schemars(description = "Sales of goods or services, salary and other main income")]
    Revenue,

    #[schemars(description = "Direct costs of goods or services sold")]
    CostOfSales,

    #[schemars(description = "Rent, utilities, salaries paid, marketing, groceries and other running costs")]
    OperatingExpense,

    #[schemars(description = "Interest income, FX gains, investment income")]
    FinancialIncome,

    #[schemars(description = "Interest expense, bank fees, FX losses")]
    FinancialExpense,

    #[schemars(description = "Income and corporate taxes")]
    Tax,

    #[schemars(description = "Transfers between own accounts; excluded from statements")]
    Transfer,
}

impl CategoryClass {
    pub fn default_kind(&self) -> TransactionKind {
        match self {
            CategoryClass::Revenue | CategoryClass::FinancialIncome => TransactionKind::Income,
            CategoryClass::Transfer => TransactionKind::Transfer,
            _ => TransactionKind::Expense,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct Category {
    pub id: String,
    pub name: String,
    pub class: CategoryClass,
}

impl Category {
    pub fn new(id: impl Into<String>, name: impl Into<String>, class: CategoryClass) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            class,
        }
    }
}

/// A single bank or card movement. `amount` is always non-negative; direction lives in `kind`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Transaction {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub date: NaiveDate,
    pub description: String,
    pub amount: f64,
    pub kind: TransactionKind,
    #[serde(default)]
    pub currency: Currency,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub counterparty: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai_confidence: Option<f64>,
}

impl Transaction {
    pub fn new(
        date: NaiveDate,
        description: impl Into<String>,
        amount: f64,
        kind: TransactionKind,
    ) -> Self {
        Self {
            id: None,
            date,
            description: description.into(),
            amount: amount.abs(),
            kind,
            currency: Currency::Try,
            category_id: None,
            counterparty: None,
            ai_confidence: None,
        }
    }

    pub fn with_category(mut self, category_id: impl Into<String>) -> Self {
        self.category_id = Some(category_id.into());
        self
    }

    pub fn with_currency(mut self, currency: Currency) -> Self {
        self.currency = currency;
        self
    }

    /// Positive for income, negative for expenses, zero for transfers.
    pub fn signed_amount(&self) -> f64 {
        match self.kind {
            TransactionKind::Income => self.amount,
            TransactionKind::Expense => -self.amount,
            TransactionKind::Transfer => 0.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct ReceiptItem {
    #[schemars(description = "Line item name exactly as printed on the receipt")]
    pub name: String,

    #[serde(default)]
    #[schemars(description = "Quantity; 1 when not printed")]
    pub quantity: Option<f64>,

    #[schemars(description = "Line total including tax")]
    pub total: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct Receipt {
    #[schemars(description = "Merchant / store name at the top of the receipt")]
    pub merchant: String,

    #[schemars(description = "Receipt date in YYYY-MM-DD format")]
    pub date: NaiveDate,

    #[schemars(description = "Grand total paid (TOPLAM)")]
    pub total: f64,

    #[serde(default)]
    #[schemars(description = "Total VAT (KDV / TOPKDV) if printed")]
    pub tax_amount: Option<f64>,

    #[serde(default)]
    #[schemars(description = "Currency of the receipt. Use TRY when the ₺ or TL sign is shown.")]
    pub currency: Currency,

    #[serde(default)]
    #[schemars(description = "Individual line items, if legible")]
    pub items: Vec<ReceiptItem>,

    #[serde(default)]
    #[schemars(description = "Best matching category id from the provided list, if any")]
    pub suggested_category_id: Option<String>,
}

impl Receipt {
    /// Sum of line items; differs from `total` when the OCR missed lines or discounts applied.
    pub fn items_total(&self) -> f64 {
        self.items.iter().map(|i| i.total).sum()
    }

    pub fn to_transaction(&self) -> Transaction {
        Transaction {
            id: None,
            date: self.date,
            description: self.merchant.clone(),
            amount: self.total.abs(),
            kind: TransactionKind::Expense,
            currency: self.currency,
            category_id: self.suggested_category_id.clone(),
            counterparty: Some(self.merchant.clone()),
            ai_confidence: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signed_amount() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let income = Transaction::new(date, "Maaş", 50_000.0, TransactionKind::Income);
        let expense = Transaction::new(date, "Kira", -15_000.0, TransactionKind::Expense);
        let transfer = Transaction::new(date, "Kart ödemesi", 3_000.0, TransactionKind::Transfer);

        assert_eq!(income.signed_amount(), 50_000.0);
        assert_eq!(expense.amount, 15_000.0);
        assert_eq!(expense.signed_amount(), -15_000.0);
        assert_eq!(transfer.signed_amount(), 0.0);
    }

    #[test]
    fn test_receipt_schema_and_transaction() {
        let schema = serde_json::to_string(&schemars::schema_for!(Receipt)).unwrap();
        assert!(schema.contains("merchant"));
        assert!(schema.contains("tax_amount"));

        let receipt: Receipt = serde_json::from_str(
            r#"{"merchant":"Migros","date":"2024-05-02","total":412.5,
                "items":[{"name":"Süt","total":42.5},{"name":"Peynir","total":370.0}]}"#,
        )
        .unwrap();
        assert_eq!(receipt.currency, Currency::Try);
        assert_eq!(receipt.items_total(), 412.5);

        let tx = receipt.to_transaction();
        assert_eq!(tx.kind, TransactionKind::Expense);
        assert_eq!(tx.description, "Migros");
    }
}
