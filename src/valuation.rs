use crate::error::{FinancePlannerError, Result};
use crate::scenario::InvestmentScenario;
use log::debug;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ValuationMethod {
    RevenueMultiple,
    EbitdaMultiple,
    Dcf,
    VentureCapital,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ValuationInputs {
    pub annual_revenue: f64,
    pub ebitda: f64,
    pub revenue_multiple: f64,
    pub ebitda_multiple: f64,
    /// Free cash flow for each projected year, starting next year.
    pub projected_cash_flows: Vec<f64>,
    pub discount_rate: f64,
    pub terminal_growth_rate: f64,
    /// Expected company value at exit, used by the VC method.
    pub projected_exit_value: f64,
    /// Return multiple the investor targets by exit (e.g. 10x).
    pub vc_target_multiple: f64,
}

impl ValuationInputs {
    /// Derives inputs from a scenario. EBITDA is approximated by base-year operating result.
    pub fn from_scenario(
        scenario: &InvestmentScenario,
        revenue_multiple: f64,
        ebitda_multiple: f64,
        vc_target_multiple: f64,
        terminal_growth_rate: f64,
    ) -> Result<Self> {
        let projections = scenario.project()?;
        let final_revenue = projections
            .last()
            .map(|p| p.revenue)
            .unwrap_or(scenario.base_revenue);

        Ok(Self {
            annual_revenue: scenario.base_revenue,
            ebitda: scenario.base_revenue - scenario.base_expenses,
            revenue_multiple,
            ebitda_multiple,
            projected_cash_flows: projections.iter().map(|p| p.net_income).collect(),
            discount_rate: scenario.discount_rate,
            terminal_growth_rate,
            projected_exit_value: final_revenue * scenario.exit_revenue_multiple,
            vc_target_multiple,
        })
    }
}

pub fn revenue_multiple_valuation(annual_revenue: f64, multiple: f64) -> Option<f64> {
    if annual_revenue <= 0.0 || multiple <= 0.0 {
        return None;
    }
    Some(annual_revenue * multiple)
}

/// Loss-making companies have no meaningful EBITDA multiple.
pub fn ebitda_multiple_valuation(ebitda: f64, multiple: f64) -> Option<f64> {
    if ebitda <= 0.0 || multiple <= 0.0 {
        return None;
    }
    Some(ebitda * multiple)
}

/// Discounted cash flows plus a Gordon-growth terminal value on the final year.
/// `None` without flows or when the discount rate does not exceed terminal growth.
pub fn dcf_valuation(cash_flows: &[f64], discount_rate: f64, terminal_growth_rate: f64) -> Option<f64> {
    let last = *cash_flows.last()?;
    if discount_rate <= terminal_growth_rate || discount_rate <= -1.0 {
        return None;
    }

    let present_value: f64 = cash_flows
        .iter()
        .enumerate()
        .map(|(i, cf)| cf / (1.0 + discount_rate).powi(i as i32 + 1))
        .sum();

    let terminal =
        last * (1.0 + terminal_growth_rate) / (discount_rate - terminal_growth_rate);
    let discounted_terminal = terminal / (1.0 + discount_rate).powi(cash_flows.len() as i32);

    Some(present_value + discounted_terminal)
}

/// Post-money value today such that the exit returns `target_multiple` times the price.
pub fn vc_method_valuation(projected_exit_value: f64, target_multiple: f64) -> Option<f64> {
    if projected_exit_value <= 0.0 || target_multiple <= 0.0 {
        return None;
    }
    Some(projected_exit_value / target_multiple)
}

/// Ownership (percent) an investment buys at the given pre-money valuation.
pub fn implied_equity_percent(investment: f64, pre_money: f64) -> Option<f64> {
    let post_money = pre_money + investment;
    if post_money <= 0.0 || investment < 0.0 {
        return None;
    }
    Some(investment / post_money * 100.0)
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ValuationWeights {
    pub revenue_multiple: f64,
    pub ebitda_multiple: f64,
    pub dcf: f64,
    pub venture_capital: f64,
}

impl Default for ValuationWeights {
    fn default() -> Self {
        Self {
            revenue_multiple: 0.25,
            ebitda_multiple: 0.25,
            dcf: 0.30,
            venture_capital: 0.20,
        }
    }
}

impl ValuationWeights {
    fn weight_for(&self, method: ValuationMethod) -> f64 {
        match method {
            ValuationMethod::RevenueMultiple => self.revenue_multiple,
            ValuationMethod::EbitdaMultiple => self.ebitda_multiple,
            ValuationMethod::Dcf => self.dcf,
            ValuationMethod::VentureCapital => self.venture_capital,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodValuation {
    pub method: ValuationMethod,
    pub value: Option<f64>,
    /// Share of the blended value after renormalizing over usable methods.
    pub effective_weight: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValuationSummary {
    pub methods: Vec<MethodValuation>,
    pub blended_value: f64,
    pub low: f64,
    pub high: f64,
}

pub fn blend(inputs: &ValuationInputs, weights: &ValuationWeights) -> Result<ValuationSummary> {
    let raw = [
        (
            ValuationMethod::RevenueMultiple,
            revenue_multiple_valuation(inputs.annual_revenue, inputs.revenue_multiple),
        ),
        (
            ValuationMethod::EbitdaMultiple,
            ebitda_multiple_valuation(inputs.ebitda, inputs.ebitda_multiple),
        ),
        (
            ValuationMethod::Dcf,
            dcf_valuation(
                &inputs.projected_cash_flows,
                inputs.discount_rate,
                inputs.terminal_growth_rate,
            ),
        ),
        (
            ValuationMethod::VentureCapital,
            vc_method_valuation(inputs.projected_exit_value, inputs.vc_target_multiple),
        ),
    ];

    for (method, _) in &raw {
        let w = weights.weight_for(*method);
        if w < 0.0 || !w.is_finite() {
            return Err(FinancePlannerError::InvalidWeights(format!(
                "Weight for {:?} must be non-negative, got {}",
                method, w
            )));
        }
    }

    let usable_weight: f64 = raw
        .iter()
        .filter(|(_, value)| value.is_some())
        .map(|(method, _)| weights.weight_for(*method))
        .sum();

    if usable_weight <= 0.0 {
        return Err(FinancePlannerError::InvalidWeights(
            "No valuation method produced a value with a non-zero weight".to_string(),
        ));
    }

    let methods: Vec<MethodValuation> = raw
        .iter()
        .map(|(method, value)| MethodValuation {
            method: *method,
            value: *value,
            effective_weight: if value.is_some() {
                weights.weight_for(*method) / usable_weight
            } else {
                0.0
            },
        })
        .collect();

    let blended_value = methods
        .iter()
        .filter_map(|m| m.value.map(|v| v * m.effective_weight))
        .sum();

    let contributing = methods
        .iter()
        .filter(|m| m.effective_weight > 0.0)
        .filter_map(|m| m.value);
    let (low, high) = contributing.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    });

    debug!(
        "Blended valuation {:.2} from {} usable methods",
        blended_value,
        methods.iter().filter(|m| m.effective_weight > 0.0).count()
    );

    Ok(ValuationSummary {
        methods,
        blended_value,
        low,
        high,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inputs() -> ValuationInputs {
        ValuationInputs {
            annual_revenue: 1_000_000.0,
            ebitda: 200_000.0,
            revenue_multiple: 2.0,
            ebitda_multiple: 8.0,
            projected_cash_flows: vec![100_000.0, 100_000.0],
            discount_rate: 0.1,
            terminal_growth_rate: 0.0,
            projected_exit_value: 10_000_000.0,
            vc_target_multiple: 10.0,
        }
    }

    #[test]
    fn test_individual_methods() {
        assert_eq!(revenue_multiple_valuation(1_000_000.0, 2.0), Some(2_000_000.0));
        assert_eq!(revenue_multiple_valuation(0.0, 2.0), None);
        assert_eq!(ebitda_multiple_valuation(200_000.0, 8.0), Some(1_600_000.0));
        assert_eq!(ebitda_multiple_valuation(-5.0, 8.0), None);
        assert_eq!(vc_method_valuation(10_000_000.0, 10.0), Some(1_000_000.0));
        assert_eq!(vc_method_valuation(10_000_000.0, 0.0), None);
    }

    #[test]
    fn test_dcf_flat_perpetuity() {
        // A flat 100k perpetuity at 10% is worth 1M.
        let v = dcf_valuation(&[100_000.0, 100_000.0], 0.1, 0.0).unwrap();
        assert!((v - 1_000_000.0).abs() < 1e-6);

        assert_eq!(dcf_valuation(&[], 0.1, 0.0), None);
        assert_eq!(dcf_valuation(&[100.0], 0.03, 0.05), None);
    }

    #[test]
    fn test_blend_default_weights() {
        let summary = blend(&inputs(), &ValuationWeights::default()).unwrap();
        let expected = 2_000_000.0 * 0.25 + 1_600_000.0 * 0.25 + 1_000_000.0 * 0.30 + 1_000_000.0 * 0.20;
        assert!((summary.blended_value - expected).abs() < 1e-6);
        assert_eq!(summary.low, 1_000_000.0);
        assert_eq!(summary.high, 2_000_000.0);
    }

    #[test]
    fn test_blend_renormalizes_missing_methods() {
        let mut i = inputs();
        i.ebitda = -50_000.0;
        let summary = blend(&i, &ValuationWeights::default()).unwrap();

        let ebitda = &summary.methods[1];
        assert_eq!(ebitda.value, None);
        assert_eq!(ebitda.effective_weight, 0.0);

        let total_weight: f64 = summary.methods.iter().map(|m| m.effective_weight).sum();
        assert!((total_weight - 1.0).abs() < 1e-12);

        let expected = (2_000_000.0 * 0.25 + 1_000_000.0 * 0.30 + 1_000_000.0 * 0.20) / 0.75;
        assert!((summary.blended_value - expected).abs() < 1e-6);
    }

    #[test]
    fn test_blend_rejects_bad_weights() {
        let zero = ValuationWeights {
            revenue_multiple: 0.0,
            ebitda_multiple: 0.0,
            dcf: 0.0,
            venture_capital: 0.0,
        };
        assert!(blend(&inputs(), &zero).is_err());

        let negative = ValuationWeights {
            revenue_multiple: -1.0,
            ..ValuationWeights::default()
        };
        assert!(blend(&inputs(), &negative).is_err());
    }

    #[test]
    fn test_implied_equity() {
        assert_eq!(implied_equity_percent(1_000_000.0, 4_000_000.0), Some(20.0));
        assert_eq!(implied_equity_percent(0.0, 0.0), None);
    }
}
