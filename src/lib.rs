//! # Finance Planner
//!
//! Calculation core and AI-assisted ingestion for a personal finance and daily
//! planning application.
//!
//! ## Core Concepts
//!
//! - **Quarterly Aggregation**: Annual amounts are split into quarters (even, fair-remainder
//!   or weighted), quarterly records are summed and compared quarter over quarter
//! - **Investment Scenarios**: A projected business is evaluated with ROI, payback,
//!   break-even, NPV, IRR and MOIC, and valued with a weighted blend of four methods
//! - **Statements**: Categorized transactions roll up into income statements and
//!   balance sheets that are checked against Assets = Liabilities + Equity
//! - **Planning**: Daily plan items, weekly views and an end-of-week retrospective
//! - **AI Ingestion** (feature `ai`): bank statements, receipt photos and free-text
//!   planning commands are read through an OpenAI-compatible gateway; transactions
//!   are categorized in bounded concurrent batches
//! - **HTTP Functions** (feature `server`): the above behind authenticated JSON endpoints
//!
//! ## Example
//!
//! ```rust
//! use finance_planner::*;
//!
//! let scenario = InvestmentScenario {
//!     name: "Kafe".to_string(),
//!     investment_amount: 1_000_000.0,
//!     equity_share: 0.2,
//!     base_revenue: 2_000_000.0,
//!     base_expenses: 1_600_000.0,
//!     revenue_growth_rate: 0.2,
//!     expense_growth_rate: 0.1,
//!     fixed_cost_share: 0.5,
//!     discount_rate: 0.3,
//!     exit_revenue_multiple: 2.0,
//!     horizon_years: 3,
//! };
//!
//! let roi = analyze(&scenario).unwrap();
//! println!(
//!     "ROI {} / IRR {}",
//!     format_percent(roi.roi_percent, 1),
//!     format_percent(roi.irr_percent, 1)
//! );
//! ```

pub mod calendar;
pub mod categories;
pub mod config;
pub mod currency;
pub mod error;
pub mod format;
pub mod ingestion;
pub mod planning;
pub mod quarterly;
pub mod roi;
pub mod scenario;
pub mod schema;
pub mod simulation;
pub mod statements;
pub mod store;
pub mod valuation;

#[cfg(feature = "ai")]
pub mod llm;

#[cfg(feature = "server")]
pub mod server;

pub use calendar::*;
pub use categories::CategoryBook;
pub use config::ServiceConfig;
pub use currency::{Currency, ExchangeRate, ExchangeRates};
pub use error::{FinancePlannerError, Result};
pub use format::*;
pub use ingestion::*;
pub use planning::*;
pub use quarterly::*;
pub use roi::{analyze, RoiAnalysis};
pub use scenario::{InvestmentScenario, YearProjection, YearQuarters};
pub use schema::*;
pub use simulation::{simulate, SimulationOutcome, SimulationSettings};
pub use statements::*;
pub use store::{AuditEntry, CategoryUpdate, MemoryStore, RecordStore};
pub use valuation::{blend, ValuationInputs, ValuationMethod, ValuationSummary, ValuationWeights};

use chrono::NaiveDate;
use log::info;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One year of a user's transactions rolled up by quarter, with the matching income statement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuarterlyReport {
    pub year: i32,
    pub summary: QuarterlySummary,
    pub by_category: BTreeMap<String, QuarterlySeries>,
    pub income_statement: IncomeStatement,
}

pub fn quarterly_report(
    transactions: &[Transaction],
    book: &CategoryBook,
    year: i32,
    rates: &ExchangeRates,
) -> Result<QuarterlyReport> {
    let start = NaiveDate::from_ymd_opt(year, 1, 1)
        .ok_or_else(|| FinancePlannerError::DateError(format!("invalid year {}", year)))?;
    let end = NaiveDate::from_ymd_opt(year, 12, 31)
        .ok_or_else(|| FinancePlannerError::DateError(format!("invalid year {}", year)))?;

    let (income, expenses) = income_and_expenses_by_quarter(transactions, year, rates)?;
    let summary = summarize_series(income, expenses);
    let by_category = aggregate_by_quarter(transactions, year, rates)?;
    let income_statement = IncomeStatement::from_transactions(transactions, book, start, end, rates)?;

    info!(
        "Quarterly report for {}: {} categories, net {}",
        year,
        by_category.len(),
        format_compact(summary.total_net)
    );

    Ok(QuarterlyReport {
        year,
        summary,
        by_category,
        income_statement,
    })
}
