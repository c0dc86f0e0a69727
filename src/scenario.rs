use crate::error::{FinancePlannerError, Result};
use crate::quarterly::{distribute_even, QuarterlySeries};
use log::debug;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

pub const MAX_HORIZON_YEARS: u32 = 30;

/// A saved investment simulation: an investor buys `equity_share` of a business
/// whose last full year produced `base_revenue` and `base_expenses`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct InvestmentScenario {
    #[schemars(description = "Scenario name shown in the simulation list")]
    pub name: String,

    #[schemars(description = "Cash invested, in TRY")]
    pub investment_amount: f64,

    #[schemars(description = "Ownership bought with the investment, as a fraction between 0 and 1")]
    pub equity_share: f64,

    #[schemars(description = "Revenue of the last full year, in TRY")]
    pub base_revenue: f64,

    #[schemars(description = "Total expenses of the last full year, in TRY")]
    pub base_expenses: f64,

    #[schemars(description = "Expected annual revenue growth as a fraction (0.25 = 25%)")]
    pub revenue_growth_rate: f64,

    #[schemars(description = "Expected annual expense growth as a fraction")]
    pub expense_growth_rate: f64,

    #[serde(default = "default_fixed_cost_share")]
    #[schemars(description = "Share of expenses that are fixed (rent, salaries); the rest scale with revenue")]
    pub fixed_cost_share: f64,

    #[schemars(description = "Discount rate used for NPV, as a fraction")]
    pub discount_rate: f64,

    #[schemars(description = "Exit valuation as a multiple of final-year revenue")]
    pub exit_revenue_multiple: f64,

    #[schemars(description = "Number of projected years until exit (1-30)")]
    pub horizon_years: u32,
}

fn default_fixed_cost_share() -> f64 {
    0.5
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YearProjection {
    pub year: u32,
    pub revenue: f64,
    pub expenses: f64,
    pub net_income: f64,
    pub cumulative_net_income: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YearQuarters {
    pub year: u32,
    pub revenue: QuarterlySeries,
    pub expenses: QuarterlySeries,
}

impl InvestmentScenario {
    pub fn validate(&self) -> Result<()> {
        let invalid = |details: String| {
            Err(FinancePlannerError::InvalidInput(format!(
                "Scenario '{}': {}",
                self.name, details
            )))
        };

        if self.horizon_years == 0 || self.horizon_years > MAX_HORIZON_YEARS {
            return invalid(format!(
                "horizon must be between 1 and {} years, got {}",
                MAX_HORIZON_YEARS, self.horizon_years
            ));
        }
        if !(self.equity_share > 0.0 && self.equity_share <= 1.0) {
            return invalid(format!(
                "equity share must be in (0, 1], got {}",
                self.equity_share
            ));
        }
        if !(0.0..=1.0).contains(&self.fixed_cost_share) {
            return invalid(format!(
                "fixed cost share must be in [0, 1], got {}",
                self.fixed_cost_share
            ));
        }
        for (field, value) in [
            ("investment amount", self.investment_amount),
            ("base revenue", self.base_revenue),
            ("base expenses", self.base_expenses),
            ("exit multiple", self.exit_revenue_multiple),
        ] {
            if value < 0.0 || !value.is_finite() {
                return invalid(format!("{} must be non-negative, got {}", field, value));
            }
        }
        if self.discount_rate <= -1.0 {
            return invalid(format!("discount rate must be above -100%, got {}", self.discount_rate));
        }

        Ok(())
    }

    /// Projects each year with the scenario's constant growth rates.
    /// Year 1 is the first year after the base year. Fixed costs grow at the
    /// expense rate; variable costs keep their base-year share of revenue.
    pub fn project(&self) -> Result<Vec<YearProjection>> {
        let years = self.horizon_years as usize;
        self.project_with_rates(
            &vec![self.revenue_growth_rate; years],
            &vec![self.expense_growth_rate; years],
        )
    }

    /// Projects with an explicit growth rate per year; used by the Monte Carlo simulation.
    pub fn project_with_rates(
        &self,
        revenue_growth: &[f64],
        expense_growth: &[f64],
    ) -> Result<Vec<YearProjection>> {
        self.validate()?;

        let years = self.horizon_years as usize;
        if revenue_growth.len() != years || expense_growth.len() != years {
            return Err(FinancePlannerError::InvalidInput(format!(
                "Expected {} growth rates, got {} revenue / {} expense",
                years,
                revenue_growth.len(),
                expense_growth.len()
            )));
        }

        // Without base revenue there is no cost ratio, so the variable part
        // compounds along with the fixed part.
        let variable_ratio = self.variable_cost_ratio();
        let mut revenue = self.base_revenue;
        let mut fixed = self.fixed_costs();
        let mut unscaled_variable = self.base_expenses - fixed;
        let mut cumulative = 0.0;
        let mut out = Vec::with_capacity(years);

        for (idx, (rg, eg)) in revenue_growth.iter().zip(expense_growth).enumerate() {
            revenue = (revenue * (1.0 + rg)).max(0.0);
            fixed = (fixed * (1.0 + eg)).max(0.0);
            let variable = match variable_ratio {
                Some(ratio) => ratio * revenue,
                None => {
                    unscaled_variable = (unscaled_variable * (1.0 + eg)).max(0.0);
                    unscaled_variable
                }
            };
            let expenses = fixed + variable;
            let net_income = revenue - expenses;
            cumulative += net_income;

            out.push(YearProjection {
                year: idx as u32 + 1,
                revenue,
                expenses,
                net_income,
                cumulative_net_income: cumulative,
            });
        }

        debug!(
            "Projected scenario '{}' over {} years, cumulative net income {:.2}",
            self.name, years, cumulative
        );

        Ok(out)
    }

    pub fn project_quarters(&self) -> Result<Vec<YearQuarters>> {
        Ok(self
            .project()?
            .into_iter()
            .map(|p| YearQuarters {
                year: p.year,
                revenue: distribute_even(p.revenue),
                expenses: distribute_even(p.expenses),
            })
            .collect())
    }

    pub fn fixed_costs(&self) -> f64 {
        self.base_expenses * self.fixed_cost_share
    }

    /// Variable costs as a share of revenue in the base year.
    pub fn variable_cost_ratio(&self) -> Option<f64> {
        if self.base_revenue <= 0.0 {
            return None;
        }
        Some(self.base_expenses * (1.0 - self.fixed_cost_share) / self.base_revenue)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn cafe_scenario() -> InvestmentScenario {
        InvestmentScenario {
            name: "Kafe".to_string(),
            investment_amount: 1_000_000.0,
            equity_share: 0.2,
            base_revenue: 2_000_000.0,
            base_expenses: 1_600_000.0,
            revenue_growth_rate: 0.2,
            expense_growth_rate: 0.1,
            fixed_cost_share: 0.5,
            discount_rate: 0.3,
            exit_revenue_multiple: 2.0,
            horizon_years: 3,
        }
    }

    #[test]
    fn test_projection_compounds_growth() {
        let projections = cafe_scenario().project().unwrap();
        assert_eq!(projections.len(), 3);

        // Fixed 800k * 1.1 plus variable 0.4 * 2.4M.
        let y1 = &projections[0];
        assert!((y1.revenue - 2_400_000.0).abs() < 1e-6);
        assert!((y1.expenses - 1_840_000.0).abs() < 1e-6);
        assert!((y1.net_income - 560_000.0).abs() < 1e-6);

        let y3 = &projections[2];
        assert!((y3.revenue - 3_456_000.0).abs() < 1e-6);
        assert!((y3.expenses - (800_000.0 * 1.1f64.powi(3) + 0.4 * 3_456_000.0)).abs() < 1e-6);
        let cumulative: f64 = projections.iter().map(|p| p.net_income).sum();
        assert!((y3.cumulative_net_income - cumulative).abs() < 1e-6);
    }

    #[test]
    fn test_project_quarters_even_split() {
        let quarters = cafe_scenario().project_quarters().unwrap();
        assert_eq!(quarters[0].revenue.0, [600_000.0; 4]);
    }

    #[test]
    fn test_validation() {
        let mut s = cafe_scenario();
        s.horizon_years = 0;
        assert!(s.project().is_err());

        let mut s = cafe_scenario();
        s.equity_share = 1.5;
        assert!(s.validate().is_err());

        let mut s = cafe_scenario();
        s.base_revenue = -1.0;
        assert!(s.validate().is_err());

        assert!(cafe_scenario()
            .project_with_rates(&[0.1], &[0.1, 0.1, 0.1])
            .is_err());
    }

    #[test]
    fn test_fixed_cost_share_changes_projection() {
        let mut all_fixed = cafe_scenario();
        all_fixed.fixed_cost_share = 1.0;
        let mut all_variable = cafe_scenario();
        all_variable.fixed_cost_share = 0.0;

        let fixed_y1 = &all_fixed.project().unwrap()[0];
        let variable_y1 = &all_variable.project().unwrap()[0];
        assert!((fixed_y1.expenses - 1_760_000.0).abs() < 1e-6);
        assert!((variable_y1.expenses - 1_920_000.0).abs() < 1e-6);
    }

    #[test]
    fn test_projection_without_base_revenue_compounds_all_costs() {
        let mut s = cafe_scenario();
        s.base_revenue = 0.0;
        let y1 = &s.project().unwrap()[0];
        assert_eq!(y1.revenue, 0.0);
        assert!((y1.expenses - 1_760_000.0).abs() < 1e-6);
    }

    #[test]
    fn test_variable_cost_ratio() {
        let s = cafe_scenario();
        assert_eq!(s.fixed_costs(), 800_000.0);
        assert!((s.variable_cost_ratio().unwrap() - 0.4).abs() < 1e-12);

        let mut empty = cafe_scenario();
        empty.base_revenue = 0.0;
        assert_eq!(empty.variable_cost_ratio(), None);
    }
}
