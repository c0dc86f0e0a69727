//! Return-on-investment formulas and the combined analysis of an investment scenario.

use crate::error::Result;
use crate::scenario::InvestmentScenario;
use log::info;
use serde::{Deserialize, Serialize};

pub const IRR_ITERATIONS: usize = 100;
const IRR_LOWER_BOUND: f64 = -0.99;
const IRR_UPPER_BOUND: f64 = 10.0;

/// ROI in percent: `(total_return - cost) / cost * 100`. 0 when nothing was invested.
pub fn simple_roi(total_return: f64, cost: f64) -> f64 {
    if cost == 0.0 {
        return 0.0;
    }
    (total_return - cost) / cost * 100.0
}

/// Years needed to recover `investment` from a constant annual net cash flow.
pub fn payback_period(investment: f64, annual_net_cash_flow: f64) -> Option<f64> {
    if annual_net_cash_flow <= 0.0 {
        return None;
    }
    Some(investment / annual_net_cash_flow)
}

/// Years until cumulative cash flows cover `investment`, interpolated inside the year
/// in which it happens. `None` if the flows never recover the investment.
pub fn payback_from_cash_flows(investment: f64, cash_flows: &[f64]) -> Option<f64> {
    if investment <= 0.0 {
        return Some(0.0);
    }

    let mut remaining = investment;
    for (year, flow) in cash_flows.iter().enumerate() {
        if *flow > 0.0 && *flow >= remaining {
            return Some(year as f64 + remaining / flow);
        }
        remaining -= flow;
    }
    None
}

/// Revenue at which `revenue - variable_cost_ratio * revenue - fixed_costs == 0`.
pub fn break_even_revenue(fixed_costs: f64, variable_cost_ratio: f64) -> Option<f64> {
    let contribution_margin = 1.0 - variable_cost_ratio;
    if contribution_margin <= 0.0 {
        return None;
    }
    Some(fixed_costs / contribution_margin)
}

/// Net present value with the investment at t=0 and `cash_flows[i]` at t=i+1.
pub fn npv(rate: f64, initial_investment: f64, cash_flows: &[f64]) -> f64 {
    cash_flows
        .iter()
        .enumerate()
        .fold(-initial_investment, |acc, (i, cf)| {
            acc + cf / (1.0 + rate).powi(i as i32 + 1)
        })
}

fn bisect_rate(present_value: impl Fn(f64) -> f64) -> f64 {
    let mut low = IRR_LOWER_BOUND;
    let mut high = IRR_UPPER_BOUND;
    let mut mid = (low + high) / 2.0;

    for _ in 0..IRR_ITERATIONS {
        mid = (low + high) / 2.0;
        if present_value(mid) > 0.0 {
            low = mid;
        } else {
            high = mid;
        }
    }

    mid
}

/// IRR (as a fraction) of investing `investment` today and receiving `future_value`
/// after `years`. Searched by bisection between -99% and 1000%.
pub fn irr_single_cash_flow(investment: f64, future_value: f64, years: u32) -> f64 {
    let years = years.max(1) as i32;
    bisect_rate(|rate| -investment + future_value / (1.0 + rate).powi(years))
}

/// IRR over a series of annual flows. Assumes a conventional profile (one outflow, then inflows).
pub fn irr(investment: f64, cash_flows: &[f64]) -> f64 {
    bisect_rate(|rate| npv(rate, investment, cash_flows))
}

/// Multiple on invested capital.
pub fn moic(total_value_returned: f64, invested: f64) -> f64 {
    if invested == 0.0 {
        return 0.0;
    }
    total_value_returned / invested
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoiAnalysis {
    pub scenario_name: String,
    pub total_net_income: f64,
    /// Investor's share of each projected year's net income.
    pub investor_cash_flows: Vec<f64>,
    pub exit_value: f64,
    pub investor_exit_value: f64,
    pub investor_total_return: f64,
    pub roi_percent: f64,
    pub payback_years: Option<f64>,
    pub break_even_revenue: Option<f64>,
    pub npv: f64,
    /// Single-cash-flow IRR: investment now, total return at exit.
    pub irr_percent: f64,
    /// IRR treating each year's distribution as its own cash flow.
    pub cash_flow_irr_percent: f64,
    pub moic: f64,
}

pub fn analyze(scenario: &InvestmentScenario) -> Result<RoiAnalysis> {
    let projections = scenario.project()?;

    let investor_cash_flows: Vec<f64> = projections
        .iter()
        .map(|p| p.net_income * scenario.equity_share)
        .collect();
    let final_revenue = projections.last().map(|p| p.revenue).unwrap_or(0.0);
    let exit_value = final_revenue * scenario.exit_revenue_multiple;
    let investor_exit_value = exit_value * scenario.equity_share;
    let investor_total_return = investor_cash_flows.iter().sum::<f64>() + investor_exit_value;

    let mut flows_with_exit = investor_cash_flows.clone();
    if let Some(last) = flows_with_exit.last_mut() {
        *last += investor_exit_value;
    }

    let analysis = RoiAnalysis {
        scenario_name: scenario.name.clone(),
        total_net_income: projections.iter().map(|p| p.net_income).sum(),
        exit_value,
        investor_exit_value,
        investor_total_return,
        roi_percent: simple_roi(investor_total_return, scenario.investment_amount),
        payback_years: payback_from_cash_flows(scenario.investment_amount, &flows_with_exit),
        break_even_revenue: scenario
            .variable_cost_ratio()
            .and_then(|ratio| break_even_revenue(scenario.fixed_costs(), ratio)),
        npv: npv(
            scenario.discount_rate,
            scenario.investment_amount,
            &flows_with_exit,
        ),
        irr_percent: irr_single_cash_flow(
            scenario.investment_amount,
            investor_total_return,
            scenario.horizon_years,
        ) * 100.0,
        cash_flow_irr_percent: irr(scenario.investment_amount, &flows_with_exit) * 100.0,
        moic: moic(investor_total_return, scenario.investment_amount),
        investor_cash_flows,
    };

    info!(
        "ROI analysis for '{}': ROI {:.1}%, IRR {:.1}%, MOIC {:.2}x",
        analysis.scenario_name, analysis.roi_percent, analysis.irr_percent, analysis.moic
    );

    Ok(analysis)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenario::tests::cafe_scenario;

    #[test]
    fn test_simple_roi() {
        assert_eq!(simple_roi(150.0, 100.0), 50.0);
        assert_eq!(simple_roi(50.0, 100.0), -50.0);
        assert_eq!(simple_roi(50.0, 0.0), 0.0);
    }

    #[test]
    fn test_payback() {
        assert_eq!(payback_period(100.0, 25.0), Some(4.0));
        assert_eq!(payback_period(100.0, 0.0), None);
        assert_eq!(payback_period(100.0, -5.0), None);

        let p = payback_from_cash_flows(100.0, &[30.0, 30.0, 30.0, 30.0]).unwrap();
        assert!((p - (3.0 + 10.0 / 30.0)).abs() < 1e-12);
        assert_eq!(payback_from_cash_flows(100.0, &[10.0, 10.0]), None);
        assert_eq!(payback_from_cash_flows(0.0, &[]), Some(0.0));
        // Early losses push payback later.
        let p = payback_from_cash_flows(100.0, &[-50.0, 100.0, 100.0]).unwrap();
        assert!((p - 2.5).abs() < 1e-12);
    }

    #[test]
    fn test_break_even_revenue() {
        assert_eq!(break_even_revenue(50_000.0, 0.5), Some(100_000.0));
        assert_eq!(break_even_revenue(50_000.0, 0.0), Some(50_000.0));
        assert_eq!(break_even_revenue(50_000.0, 1.0), None);
        assert_eq!(break_even_revenue(50_000.0, 1.2), None);
    }

    #[test]
    fn test_npv() {
        assert!(npv(0.1, 100.0, &[110.0]).abs() < 1e-9);
        assert!((npv(0.0, 100.0, &[50.0, 50.0, 50.0]) - 50.0).abs() < 1e-9);
        assert!(npv(0.5, 100.0, &[50.0, 50.0]) < 0.0);
    }

    #[test]
    fn test_irr_single_cash_flow() {
        assert!((irr_single_cash_flow(100.0, 200.0, 1) - 1.0).abs() < 1e-6);
        assert!((irr_single_cash_flow(1000.0, 1610.51, 5) - 0.10).abs() < 1e-6);
        assert!((irr_single_cash_flow(100.0, 100.0, 3)).abs() < 1e-6);
        // Total loss pins to the lower search bound.
        assert!((irr_single_cash_flow(100.0, 0.0, 3) - IRR_LOWER_BOUND).abs() < 1e-6);
    }

    #[test]
    fn test_irr_series_matches_npv_root() {
        let flows = [40.0, 40.0, 40.0];
        let rate = irr(100.0, &flows);
        assert!(npv(rate, 100.0, &flows).abs() < 1e-6);
        assert!(rate > 0.09 && rate < 0.10);
    }

    #[test]
    fn test_moic() {
        assert_eq!(moic(250.0, 100.0), 2.5);
        assert_eq!(moic(250.0, 0.0), 0.0);
    }

    #[test]
    fn test_analyze_scenario() {
        let scenario = cafe_scenario();
        let a = analyze(&scenario).unwrap();

        assert_eq!(a.investor_cash_flows.len(), 3);
        assert!((a.investor_cash_flows[0] - 112_000.0).abs() < 1e-6);
        assert!((a.exit_value - 6_912_000.0).abs() < 1e-6);
        assert!((a.investor_exit_value - 1_382_400.0).abs() < 1e-6);

        let expected_total = a.investor_cash_flows.iter().sum::<f64>() + a.investor_exit_value;
        assert!((a.investor_total_return - expected_total).abs() < 1e-6);
        assert!((a.moic - expected_total / 1_000_000.0).abs() < 1e-9);
        assert!(a.roi_percent > 0.0);
        assert!(a.payback_years.unwrap() <= 3.0);
        assert!((a.break_even_revenue.unwrap() - 800_000.0 / 0.6).abs() < 1e-6);

        let implied = 1_000_000.0 * (1.0 + a.irr_percent / 100.0).powi(3);
        assert!((implied - a.investor_total_return).abs() < 1e-3);
    }
}
