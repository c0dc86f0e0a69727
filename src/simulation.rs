//! Monte Carlo simulation of an investment scenario. Each trial perturbs the yearly
//! growth rates with normal noise and re-runs the investor cash-flow model.

use crate::error::{FinancePlannerError, Result};
use crate::roi::{irr, npv};
use crate::scenario::InvestmentScenario;
use log::info;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};

pub const MAX_TRIALS: usize = 100_000;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationSettings {
    pub trials: usize,
    /// Standard deviation of the yearly revenue growth rate (0.1 = ±10 points).
    pub revenue_volatility: f64,
    pub expense_volatility: f64,
    /// Fixed seed for reproducible runs; random when absent.
    #[serde(default)]
    pub seed: Option<u64>,
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            trials: 1_000,
            revenue_volatility: 0.10,
            expense_volatility: 0.05,
            seed: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationOutcome {
    pub trials: usize,
    pub mean_npv: f64,
    pub p10_npv: f64,
    pub p50_npv: f64,
    pub p90_npv: f64,
    pub probability_positive_npv: f64,
    pub mean_irr_percent: f64,
}

pub fn simulate(scenario: &InvestmentScenario, settings: &SimulationSettings) -> Result<SimulationOutcome> {
    scenario.validate()?;
    if settings.trials == 0 || settings.trials > MAX_TRIALS {
        return Err(FinancePlannerError::InvalidInput(format!(
            "Trial count must be between 1 and {}, got {}",
            MAX_TRIALS, settings.trials
        )));
    }

    let revenue_noise = Normal::new(0.0, settings.revenue_volatility).map_err(|e| {
        FinancePlannerError::InvalidInput(format!("Invalid revenue volatility: {}", e))
    })?;
    let expense_noise = Normal::new(0.0, settings.expense_volatility).map_err(|e| {
        FinancePlannerError::InvalidInput(format!("Invalid expense volatility: {}", e))
    })?;

    let mut rng = match settings.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let years = scenario.horizon_years as usize;
    let mut npvs = Vec::with_capacity(settings.trials);
    let mut irr_sum = 0.0;

    for _ in 0..settings.trials {
        let revenue_growth: Vec<f64> = (0..years)
            .map(|_| scenario.revenue_growth_rate + revenue_noise.sample(&mut rng))
            .collect();
        let expense_growth: Vec<f64> = (0..years)
            .map(|_| scenario.expense_growth_rate + expense_noise.sample(&mut rng))
            .collect();

        let projections = scenario.project_with_rates(&revenue_growth, &expense_growth)?;
        let mut flows: Vec<f64> = projections
            .iter()
            .map(|p| p.net_income * scenario.equity_share)
            .collect();
        let exit = projections.last().map(|p| p.revenue).unwrap_or(0.0)
            * scenario.exit_revenue_multiple
            * scenario.equity_share;
        if let Some(last) = flows.last_mut() {
            *last += exit;
        }

        npvs.push(npv(scenario.discount_rate, scenario.investment_amount, &flows));
        irr_sum += irr(scenario.investment_amount, &flows);
    }

    npvs.sort_by(|a, b| a.total_cmp(b));
    let trials = npvs.len();
    let positive = npvs.iter().filter(|v| **v > 0.0).count();

    let outcome = SimulationOutcome {
        trials,
        mean_npv: npvs.iter().sum::<f64>() / trials as f64,
        p10_npv: percentile(&npvs, 0.10),
        p50_npv: percentile(&npvs, 0.50),
        p90_npv: percentile(&npvs, 0.90),
        probability_positive_npv: positive as f64 / trials as f64,
        mean_irr_percent: irr_sum / trials as f64 * 100.0,
    };

    info!(
        "Simulated '{}' over {} trials: P50 NPV {:.0}, P(NPV>0) {:.2}",
        scenario.name, trials, outcome.p50_npv, outcome.probability_positive_npv
    );

    Ok(outcome)
}

/// Nearest-rank percentile over an ascending slice.
fn percentile(sorted: &[f64], p: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let rank = (p * sorted.len() as f64).ceil() as usize;
    sorted[rank.clamp(1, sorted.len()) - 1]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::roi::analyze;
    use crate::scenario::tests::cafe_scenario;

    #[test]
    fn test_zero_volatility_matches_deterministic_analysis() {
        let scenario = cafe_scenario();
        let settings = SimulationSettings {
            trials: 10,
            revenue_volatility: 0.0,
            expense_volatility: 0.0,
            seed: Some(7),
        };

        let outcome = simulate(&scenario, &settings).unwrap();
        let analysis = analyze(&scenario).unwrap();
        assert!((outcome.p10_npv - analysis.npv).abs() < 1e-6);
        assert!((outcome.p90_npv - analysis.npv).abs() < 1e-6);
        assert!((outcome.mean_irr_percent - analysis.cash_flow_irr_percent).abs() < 1e-6);
    }

    #[test]
    fn test_seeded_runs_are_reproducible() {
        let scenario = cafe_scenario();
        let settings = SimulationSettings {
            trials: 200,
            seed: Some(42),
            ..SimulationSettings::default()
        };

        let a = simulate(&scenario, &settings).unwrap();
        let b = simulate(&scenario, &settings).unwrap();
        assert_eq!(a, b);
        assert!(a.p10_npv <= a.p50_npv && a.p50_npv <= a.p90_npv);
        assert!((0.0..=1.0).contains(&a.probability_positive_npv));
    }

    #[test]
    fn test_rejects_bad_settings() {
        let scenario = cafe_scenario();
        let zero = SimulationSettings {
            trials: 0,
            ..SimulationSettings::default()
        };
        assert!(simulate(&scenario, &zero).is_err());

        let negative = SimulationSettings {
            revenue_volatility: -1.0,
            ..SimulationSettings::default()
        };
        assert!(simulate(&scenario, &negative).is_err());
    }

    #[test]
    fn test_percentile() {
        let values = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 10.0];
        assert_eq!(percentile(&values, 0.10), 1.0);
        assert_eq!(percentile(&values, 0.50), 5.0);
        assert_eq!(percentile(&values, 0.90), 9.0);
        assert_eq!(percentile(&[], 0.5), 0.0);
    }
}
