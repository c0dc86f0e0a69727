use crate::error::{FinancePlannerError, Result};
use chrono::NaiveDate;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    #[default]
    #[schemars(description = "Turkish lira")]
    Try,
    #[schemars(description = "US dollar")]
    Usd,
    #[schemars(description = "Euro")]
    Eur,
    #[schemars(description = "British pound")]
    Gbp,
}

impl Currency {
    pub fn code(&self) -> &'static str {
        match self {
            Currency::Try => "TRY",
            Currency::Usd => "USD",
            Currency::Eur => "EUR",
            Currency::Gbp => "GBP",
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            Currency::Try => "₺",
            Currency::Usd => "$",
            Currency::Eur => "€",
            Currency::Gbp => "£",
        }
    }

    pub fn from_code(code: &str) -> Result<Self> {
        match code.trim().to_uppercase().as_str() {
            "TRY" | "TL" => Ok(Currency::Try),
            "USD" => Ok(Currency::Usd),
            "EUR" => Ok(Currency::Eur),
            "GBP" => Ok(Currency::Gbp),
            other => Err(FinancePlannerError::InvalidInput(format!(
                "Unknown currency code '{}'",
                other
            ))),
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// A stored exchange-rate row: one unit of `currency` costs `rate_to_try` lira.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ExchangeRate {
    pub currency: Currency,
    pub rate_to_try: f64,
    pub date: NaiveDate,
}

/// Rate table keyed by currency, always expressed against TRY.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExchangeRates {
    rates: BTreeMap<Currency, f64>,
}

impl ExchangeRates {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the table from stored rows, keeping the most recent row per currency.
    pub fn from_rows(rows: &[ExchangeRate]) -> Result<Self> {
        let mut latest: BTreeMap<Currency, &ExchangeRate> = BTreeMap::new();
        for row in rows {
            if row.rate_to_try <= 0.0 || !row.rate_to_try.is_finite() {
                return Err(FinancePlannerError::InvalidInput(format!(
                    "Exchange rate for {} must be positive, got {}",
                    row.currency, row.rate_to_try
                )));
            }
            match latest.get(&row.currency) {
                Some(existing) if existing.date >= row.date => {}
                _ => {
                    latest.insert(row.currency, row);
                }
            }
        }

        Ok(Self {
            rates: latest
                .into_iter()
                .map(|(currency, row)| (currency, row.rate_to_try))
                .collect(),
        })
    }

    pub fn with_rate(mut self, currency: Currency, rate_to_try: f64) -> Self {
        self.rates.insert(currency, rate_to_try);
        self
    }

    pub fn rate_to_try(&self, currency: Currency) -> Option<f64> {
        if currency == Currency::Try {
            return Some(1.0);
        }
        self.rates.get(&currency).copied()
    }

    pub fn convert(&self, amount: f64, from: Currency, to: Currency) -> Result<f64> {
        if from == to {
            return Ok(amount);
        }

        let missing = || FinancePlannerError::MissingExchangeRate {
            from: from.code().to_string(),
            to: to.code().to_string(),
        };

        let from_rate = self.rate_to_try(from).ok_or_else(missing)?;
        let to_rate = self.rate_to_try(to).ok_or_else(missing)?;

        Ok(amount * from_rate / to_rate)
    }

    pub fn to_try(&self, amount: f64, from: Currency) -> Result<f64> {
        self.convert(amount, from, Currency::Try)
    }
}
