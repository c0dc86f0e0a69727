//! Financial statement construction: income statements built from categorized
//! transactions and balance sheets that must satisfy Assets = Liabilities + Equity.

use crate::categories::CategoryBook;
use crate::currency::ExchangeRates;
use crate::error::{FinancePlannerError, Result};
use crate::schema::{CategoryClass, Transaction, TransactionKind};
use chrono::NaiveDate;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const UNCATEGORIZED_INCOME: &str = "uncategorized_income";
pub const UNCATEGORIZED_EXPENSE: &str = "uncategorized_expense";
pub const BALANCING_LINE: &str = "Balancing Equity Adjustment";
pub const PERIOD_RESULT_LINE: &str = "Current Period Net Income";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatementLine {
    pub category_id: String,
    pub name: String,
    pub class: CategoryClass,
    pub amount: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncomeStatement {
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    pub revenue: f64,
    pub cost_of_sales: f64,
    pub gross_profit: f64,
    pub operating_expenses: f64,
    pub operating_profit: f64,
    pub financial_income: f64,
    pub financial_expense: f64,
    pub profit_before_tax: f64,
    pub tax: f64,
    pub net_income: f64,
    pub gross_margin_percent: f64,
    pub net_margin_percent: f64,
    pub lines: Vec<StatementLine>,
}

impl IncomeStatement {
    /// Builds the statement for `[start, end]` in TRY.
    ///
    /// A transaction whose direction is opposite to its category (a refund booked to
    /// an expense category) reduces that category instead of adding to it.
    pub fn from_transactions(
        transactions: &[Transaction],
        book: &CategoryBook,
        start: NaiveDate,
        end: NaiveDate,
        rates: &ExchangeRates,
    ) -> Result<Self> {
        if end < start {
            return Err(FinancePlannerError::DateError(format!(
                "Statement period ends ({}) before it starts ({})",
                end, start
            )));
        }

        let mut lines: BTreeMap<String, StatementLine> = BTreeMap::new();
        let mut included = 0usize;

        for tx in transactions
            .iter()
            .filter(|t| t.date >= start && t.date <= end)
        {
            let Some((id, name, class)) = classify(tx, book) else {
                continue;
            };

            let amount = rates.to_try(tx.amount, tx.currency)?;
            let contribution = if tx.kind == class.default_kind() {
                amount
            } else {
                -amount
            };

            lines
                .entry(id.clone())
                .or_insert_with(|| StatementLine {
                    category_id: id,
                    name,
                    class,
                    amount: 0.0,
                })
                .amount += contribution;
            included += 1;
        }

        let sum_class = |class: CategoryClass| -> f64 {
            lines
                .values()
                .filter(|l| l.class == class)
                .map(|l| l.amount)
                .sum()
        };

        let revenue = sum_class(CategoryClass::Revenue);
        let cost_of_sales = sum_class(CategoryClass::CostOfSales);
        let operating_expenses = sum_class(CategoryClass::OperatingExpense);
        let financial_income = sum_class(CategoryClass::FinancialIncome);
        let financial_expense = sum_class(CategoryClass::FinancialExpense);
        let tax = sum_class(CategoryClass::Tax);

        let gross_profit = revenue - cost_of_sales;
        let operating_profit = gross_profit - operating_expenses;
        let profit_before_tax = operating_profit + financial_income - financial_expense;
        let net_income = profit_before_tax - tax;

        let margin = |value: f64| if revenue == 0.0 { 0.0 } else { value / revenue * 100.0 };

        info!(
            "Built income statement {}..{} from {} transactions: net income {:.2}",
            start, end, included, net_income
        );

        Ok(Self {
            period_start: start,
            period_end: end,
            revenue,
            cost_of_sales,
            gross_profit,
            operating_expenses,
            operating_profit,
            financial_income,
            financial_expense,
            profit_before_tax,
            tax,
            net_income,
            gross_margin_percent: margin(gross_profit),
            net_margin_percent: margin(net_income),
            lines: lines.into_values().collect(),
        })
    }
}

fn classify(tx: &Transaction, book: &CategoryBook) -> Option<(String, String, CategoryClass)> {
    if let Some(category) = tx.category_id.as_deref().and_then(|id| book.get(id)) {
        if category.class == CategoryClass::Transfer {
            return None;
        }
        return Some((category.id.clone(), category.name.clone(), category.class));
    }

    match tx.kind {
        TransactionKind::Income => Some((
            UNCATEGORIZED_INCOME.to_string(),
            "Kategorisiz Gelir".to_string(),
            CategoryClass::Revenue,
        )),
        TransactionKind::Expense => Some((
            UNCATEGORIZED_EXPENSE.to_string(),
            "Kategorisiz Gider".to_string(),
            CategoryClass::OperatingExpense,
        )),
        TransactionKind::Transfer => None,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BalanceSheetSection {
    CurrentAsset,
    NonCurrentAsset,
    CurrentLiability,
    LongTermLiability,
    Equity,
}

impl BalanceSheetSection {
    pub fn is_asset(&self) -> bool {
        matches!(self, Self::CurrentAsset | Self::NonCurrentAsset)
    }

    pub fn is_liability(&self) -> bool {
        matches!(self, Self::CurrentLiability | Self::LongTermLiability)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BalanceSheetLine {
    pub name: String,
    pub section: BalanceSheetSection,
    pub amount: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BalanceSheetTotals {
    pub current_assets: f64,
    pub non_current_assets: f64,
    pub total_assets: f64,
    pub current_liabilities: f64,
    pub long_term_liabilities: f64,
    pub total_liabilities: f64,
    pub equity: f64,
    pub current_ratio: Option<f64>,
    pub debt_to_equity: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BalanceSheet {
    pub date: NaiveDate,
    pub lines: Vec<BalanceSheetLine>,
}

impl BalanceSheet {
    pub fn new(date: NaiveDate, lines: Vec<BalanceSheetLine>) -> Self {
        Self { date, lines }
    }

    pub fn section_total(&self, section: BalanceSheetSection) -> f64 {
        self.lines
            .iter()
            .filter(|l| l.section == section)
            .map(|l| l.amount)
            .sum()
    }

    pub fn totals(&self) -> BalanceSheetTotals {
        let current_assets = self.section_total(BalanceSheetSection::CurrentAsset);
        let non_current_assets = self.section_total(BalanceSheetSection::NonCurrentAsset);
        let current_liabilities = self.section_total(BalanceSheetSection::CurrentLiability);
        let long_term_liabilities = self.section_total(BalanceSheetSection::LongTermLiability);
        let equity = self.section_total(BalanceSheetSection::Equity);
        let total_liabilities = current_liabilities + long_term_liabilities;

        BalanceSheetTotals {
            current_assets,
            non_current_assets,
            total_assets: current_assets + non_current_assets,
            current_liabilities,
            long_term_liabilities,
            total_liabilities,
            equity,
            current_ratio: (current_liabilities != 0.0).then(|| current_assets / current_liabilities),
            debt_to_equity: (equity != 0.0).then(|| total_liabilities / equity),
        }
    }

    /// Assets minus (liabilities + equity).
    pub fn imbalance(&self) -> f64 {
        let t = self.totals();
        t.total_assets - (t.total_liabilities + t.equity)
    }

    pub fn verify(&self, tolerance: f64) -> Result<()> {
        let t = self.totals();
        let difference = self.imbalance().abs();
        if difference > tolerance {
            return Err(FinancePlannerError::AccountingEquationViolation {
                date: self.date.to_string(),
                assets: t.total_assets,
                liabilities: t.total_liabilities,
                equity: t.equity,
                difference,
            });
        }
        Ok(())
    }

    /// Closes any gap with an equity plug line and returns the plug amount.
    /// An existing plug line is overwritten rather than duplicated.
    pub fn balance_with_plug(&mut self) -> f64 {
        let existing = self
            .lines
            .iter()
            .position(|l| l.name == BALANCING_LINE && l.section == BalanceSheetSection::Equity);
        let previous_plug = existing.map(|i| self.lines[i].amount).unwrap_or(0.0);
        let required = self.imbalance() + previous_plug;

        match existing {
            Some(i) => self.lines[i].amount = required,
            None if required != 0.0 => self.lines.push(BalanceSheetLine {
                name: BALANCING_LINE.to_string(),
                section: BalanceSheetSection::Equity,
                amount: required,
            }),
            None => {}
        }

        if required != 0.0 {
            debug!("Balance sheet {} plugged with {:.2}", self.date, required);
        }
        required
    }

    /// Carries the period's net income into equity.
    pub fn with_period_result(mut self, net_income: f64) -> Self {
        self.lines.push(BalanceSheetLine {
            name: PERIOD_RESULT_LINE.to_string(),
            section: BalanceSheetSection::Equity,
            amount: net_income,
        });
        self
    }
}
