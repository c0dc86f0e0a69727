//! Quarterly aggregation: splitting annual figures into quarters, summing quarterly
//! records and quarter-over-quarter growth.

use crate::calendar::Quarter;
use crate::currency::ExchangeRates;
use crate::error::{FinancePlannerError, Result};
use crate::schema::{Transaction, TransactionKind};
use crate::statements::{UNCATEGORIZED_EXPENSE, UNCATEGORIZED_INCOME};
use chrono::Datelike;
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::ops::{Add, AddAssign, Sub};

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct QuarterlySeries(pub [f64; 4]);

impl QuarterlySeries {
    pub fn new(q1: f64, q2: f64, q3: f64, q4: f64) -> Self {
        Self([q1, q2, q3, q4])
    }

    pub fn total(&self) -> f64 {
        self.0.iter().sum()
    }

    pub fn get(&self, quarter: Quarter) -> f64 {
        self.0[quarter.index()]
    }

    pub fn add_to(&mut self, quarter: Quarter, amount: f64) {
        self.0[quarter.index()] += amount;
    }

    pub fn scale(&self, factor: f64) -> Self {
        Self(self.0.map(|v| v * factor))
    }
}

impl Add for QuarterlySeries {
    type Output = QuarterlySeries;

    fn add(self, rhs: Self) -> Self::Output {
        let mut out = self;
        out += rhs;
        out
    }
}

impl AddAssign for QuarterlySeries {
    fn add_assign(&mut self, rhs: Self) {
        for (lhs, rhs) in self.0.iter_mut().zip(rhs.0) {
            *lhs += rhs;
        }
    }
}

impl Sub for QuarterlySeries {
    type Output = QuarterlySeries;

    fn sub(self, rhs: Self) -> Self::Output {
        let mut out = self.0;
        for (lhs, rhs) in out.iter_mut().zip(rhs.0) {
            *lhs -= rhs;
        }
        Self(out)
    }
}

/// Even split. Each quarter gets exactly a quarter of the annual amount.
pub fn distribute_even(annual: f64) -> QuarterlySeries {
    let quarter = annual / 4.0;
    QuarterlySeries([quarter; 4])
}

/// Integer split where the remainder goes one unit at a time to the earliest quarters.
/// `distribute_fair_units(10) == [3, 3, 2, 2]`, and the parts always sum to `annual`.
pub fn distribute_fair_units(annual: i64) -> [i64; 4] {
    let base = annual.div_euclid(4);
    let remainder = annual.rem_euclid(4);

    let mut parts = [base; 4];
    for part in parts.iter_mut().take(remainder as usize) {
        *part += 1;
    }
    parts
}

/// Fair split at kuruş precision so the quarters add back to the rounded annual amount.
pub fn distribute_fair(annual: f64) -> QuarterlySeries {
    let cents = (annual * 100.0).round() as i64;
    QuarterlySeries(distribute_fair_units(cents).map(|c| c as f64 / 100.0))
}

/// Weighted split. The last quarter absorbs floating point residue so the total is exact.
pub fn distribute_weighted(annual: f64, weights: [f64; 4]) -> Result<QuarterlySeries> {
    validate_quarter_weights(&weights)?;

    let mut parts = weights.map(|w| annual * w);
    let allocated: f64 = parts[..3].iter().sum();
    parts[3] = annual - allocated;

    Ok(QuarterlySeries(parts))
}

fn validate_quarter_weights(weights: &[f64; 4]) -> Result<()> {
    if weights.iter().any(|w| *w < 0.0 || !w.is_finite()) {
        return Err(FinancePlannerError::InvalidWeights(
            "All quarter weights must be non-negative".to_string(),
        ));
    }

    let sum: f64 = weights.iter().sum();
    if (sum - 1.0).abs() > 0.01 {
        return Err(FinancePlannerError::InvalidWeights(format!(
            "Quarter weights must sum to 1.0 (got {})",
            sum
        )));
    }

    Ok(())
}

/// One row of a quarterly table (a category, a plan line, a scenario line).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuarterlyRecord {
    pub label: String,
    #[serde(default)]
    pub q1: f64,
    #[serde(default)]
    pub q2: f64,
    #[serde(default)]
    pub q3: f64,
    #[serde(default)]
    pub q4: f64,
}

impl QuarterlyRecord {
    pub fn new(label: impl Into<String>, series: QuarterlySeries) -> Self {
        let [q1, q2, q3, q4] = series.0;
        Self {
            label: label.into(),
            q1,
            q2,
            q3,
            q4,
        }
    }

    pub fn series(&self) -> QuarterlySeries {
        QuarterlySeries([self.q1, self.q2, self.q3, self.q4])
    }

    pub fn total(&self) -> f64 {
        self.series().total()
    }
}

pub fn sum_records(records: &[QuarterlyRecord]) -> QuarterlySeries {
    records
        .iter()
        .fold(QuarterlySeries::default(), |acc, r| acc + r.series())
}

/// Percentage change from `previous` to `current`; 0 when there is no base to compare to.
pub fn growth_percent(previous: f64, current: f64) -> f64 {
    if previous == 0.0 {
        return 0.0;
    }
    (current - previous) / previous.abs() * 100.0
}

/// Growth of Q2, Q3 and Q4 over their preceding quarter.
pub fn qoq_growth(series: &QuarterlySeries) -> [f64; 3] {
    let v = series.0;
    [
        growth_percent(v[0], v[1]),
        growth_percent(v[1], v[2]),
        growth_percent(v[2], v[3]),
    ]
}

fn margin_percent(net: f64, revenue: f64) -> f64 {
    if revenue == 0.0 {
        0.0
    } else {
        net / revenue * 100.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuarterlySummary {
    pub revenue: QuarterlySeries,
    pub expenses: QuarterlySeries,
    pub net: QuarterlySeries,
    pub margin_percent: [f64; 4],
    pub revenue_growth: [f64; 3],
    pub net_growth: [f64; 3],
    pub total_revenue: f64,
    pub total_expenses: f64,
    pub total_net: f64,
    pub annual_margin_percent: f64,
}

pub fn summarize(revenue: &[QuarterlyRecord], expenses: &[QuarterlyRecord]) -> QuarterlySummary {
    summarize_series(sum_records(revenue), sum_records(expenses))
}

pub fn summarize_series(revenue: QuarterlySeries, expenses: QuarterlySeries) -> QuarterlySummary {
    let net = revenue - expenses;
    let mut margins = [0.0; 4];
    for (i, margin) in margins.iter_mut().enumerate() {
        *margin = margin_percent(net.0[i], revenue.0[i]);
    }

    QuarterlySummary {
        revenue,
        expenses,
        net,
        margin_percent: margins,
        revenue_growth: qoq_growth(&revenue),
        net_growth: qoq_growth(&net),
        total_revenue: revenue.total(),
        total_expenses: expenses.total(),
        total_net: net.total(),
        annual_margin_percent: margin_percent(net.total(), revenue.total()),
    }
}

/// Per-category quarterly totals in TRY for one calendar year. Transfers are ignored;
/// uncategorized rows are kept apart by kind.
pub fn aggregate_by_quarter(
    transactions: &[Transaction],
    year: i32,
    rates: &ExchangeRates,
) -> Result<BTreeMap<String, QuarterlySeries>> {
    let mut by_category: BTreeMap<String, QuarterlySeries> = BTreeMap::new();

    for tx in transactions.iter().filter(|t| t.date.year() == year) {
        if tx.kind == TransactionKind::Transfer {
            continue;
        }
        let amount = rates.to_try(tx.amount, tx.currency)?;
        let key = match (&tx.category_id, tx.kind) {
            (Some(id), _) => id.clone(),
            (None, TransactionKind::Income) => UNCATEGORIZED_INCOME.to_string(),
            (None, _) => UNCATEGORIZED_EXPENSE.to_string(),
        };
        by_category
            .entry(key)
            .or_default()
            .add_to(Quarter::of(tx.date), amount);
    }

    debug!(
        "Aggregated {} transactions for {} into {} categories",
        transactions.len(),
        year,
        by_category.len()
    );

    Ok(by_category)
}

/// Income and expense totals per quarter, in TRY.
pub fn income_and_expenses_by_quarter(
    transactions: &[Transaction],
    year: i32,
    rates: &ExchangeRates,
) -> Result<(QuarterlySeries, QuarterlySeries)> {
    let mut income = QuarterlySeries::default();
    let mut expenses = QuarterlySeries::default();

    for tx in transactions.iter().filter(|t| t.date.year() == year) {
        let amount = rates.to_try(tx.amount, tx.currency)?;
        match tx.kind {
            TransactionKind::Income => income.add_to(Quarter::of(tx.date), amount),
            TransactionKind::Expense => expenses.add_to(Quarter::of(tx.date), amount),
            TransactionKind::Transfer => {}
        }
    }

    Ok((income, expenses))
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QuarterVariance {
    pub quarter: Quarter,
    pub planned: f64,
    pub actual: f64,
    pub difference: f64,
    pub percent: f64,
}

pub fn plan_vs_actual(planned: &QuarterlySeries, actual: &QuarterlySeries) -> [QuarterVariance; 4] {
    Quarter::ALL.map(|quarter| {
        let p = planned.get(quarter);
        let a = actual.get(quarter);
        QuarterVariance {
            quarter,
            planned: p,
            actual: a,
            difference: a - p,
            percent: growth_percent(p, a),
        }
    })
}
