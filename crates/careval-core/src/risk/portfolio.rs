use std::collections::BTreeSet;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::CarevalError;
use crate::types::{Money, Rate};
use crate::CarevalResult;

use super::engine::{risk_adjusted_valuation, RiskAdjustedValuationInput, RiskAdjustedValuationOutput};
use super::tables::RiskTables;

/// One facility's contribution to the portfolio roll-up.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FacilityRiskSummary {
    pub facility_name: String,
    pub output: RiskAdjustedValuationOutput,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortfolioRiskOutput {
    pub facilities: Vec<FacilityRiskSummary>,
    pub total_noi: Money,
    /// Sum of per-facility risk-adjusted values
    pub aggregate_value: Money,
    /// Total NOI / aggregate value
    pub weighted_cap_rate: Rate,
    /// Discount earned from facility-count and state spread
    pub diversification_discount_bps: i32,
    pub diversified_cap_rate: Rate,
    pub diversified_value: Money,
    /// Largest single facility's risk-adjusted value / aggregate value
    pub concentration_ratio: Decimal,
    pub warnings: Vec<String>,
}

/// Diversification credit from scale and geographic spread.
fn diversification_bps(facility_count: usize, state_count: usize) -> i32 {
    let scale = if facility_count >= 10 {
        25
    } else if facility_count >= 5 {
        15
    } else if facility_count >= 3 {
        10
    } else {
        0
    };
    let spread = if state_count >= 5 {
        25
    } else if state_count >= 3 {
        15
    } else if state_count >= 2 {
        10
    } else {
        0
    };
    scale + spread
}

/// Risk-adjust every facility and roll the results up to portfolio level.
///
/// Facilities that cannot be adjusted (no income figure) are skipped with a
/// warning; the run fails only when nothing survives.
pub fn portfolio_risk_adjustment(
    inputs: &[RiskAdjustedValuationInput],
    tables: &RiskTables,
) -> CarevalResult<PortfolioRiskOutput> {
    if inputs.is_empty() {
        return Err(CarevalError::InvalidInput {
            field: "inputs".into(),
            reason: "Portfolio risk adjustment requires at least one facility".into(),
        });
    }

    let mut warnings = Vec::new();
    let mut facilities = Vec::new();
    let mut states: BTreeSet<String> = BTreeSet::new();
    let mut total_noi = Decimal::ZERO;

    for input in inputs {
        match risk_adjusted_valuation(input, tables) {
            Ok(output) => {
                states.insert(input.facility.state.to_ascii_uppercase());
                total_noi += input.facility.income_basis().unwrap_or(Decimal::ZERO);
                facilities.push(FacilityRiskSummary {
                    facility_name: input.facility.name.clone(),
                    output,
                });
            }
            Err(e) => warnings.push(format!("{}: skipped — {e}", input.facility.name)),
        }
    }

    if facilities.is_empty() {
        return Err(CarevalError::InsufficientData(
            "No facility in the portfolio could be risk-adjusted".into(),
        ));
    }
    let aggregate_value: Money = facilities
        .iter()
        .map(|f| f.output.risk_adjusted_value)
        .sum();

    let weighted_cap_rate = if aggregate_value.is_zero() {
        Decimal::ZERO
    } else {
        total_noi / aggregate_value
    };

    let diversification_discount_bps = diversification_bps(facilities.len(), states.len());
    let mut diversified_cap_rate =
        weighted_cap_rate - Decimal::from(diversification_discount_bps) / dec!(10000);
    if diversified_cap_rate < tables.cap_rate_floor {
        warnings.push(format!(
            "Diversified cap rate clamped to the {} floor",
            tables.cap_rate_floor
        ));
        diversified_cap_rate = tables.cap_rate_floor;
    }
    let diversified_value = if diversified_cap_rate.is_zero() {
        aggregate_value
    } else {
        total_noi / diversified_cap_rate
    };

    let largest = facilities
        .iter()
        .map(|f| f.output.risk_adjusted_value)
        .max()
        .unwrap_or(Decimal::ZERO);
    let concentration_ratio = if aggregate_value.is_zero() {
        Decimal::ZERO
    } else {
        largest / aggregate_value
    };

    Ok(PortfolioRiskOutput {
        facilities,
        total_noi,
        aggregate_value,
        weighted_cap_rate,
        diversification_discount_bps,
        diversified_cap_rate,
        diversified_value,
        concentration_ratio,
        warnings,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::facility::{ComplianceSnapshot, FacilityFinancialProfile, StarRatings};
    use crate::types::AssetType;
    use pretty_assertions::assert_eq;

    fn facility(name: &str, state: &str, noi: Decimal) -> RiskAdjustedValuationInput {
        RiskAdjustedValuationInput {
            facility: FacilityFinancialProfile {
                name: name.into(),
                asset_type: AssetType::SkilledNursing,
                beds: 100,
                state: state.into(),
                year_built: None,
                location: None,
                revenue: None,
                ebitdar: None,
                noi: Some(noi),
                occupancy_rate: None,
                payer_mix: None,
                staffing: None,
                compliance: ComplianceSnapshot::default(),
                star_ratings: StarRatings::default(),
                capex_needs: None,
            },
            base_cap_rate: Some(dec!(0.10)),
            valuation_year: None,
            market_signal: None,
        }
    }

    #[test]
    fn test_aggregate_is_sum_of_constituents() {
        let inputs = vec![
            facility("A", "OH", dec!(1000000)),
            facility("B", "OH", dec!(2000000)),
            facility("C", "PA", dec!(1500000)),
        ];
        let out = portfolio_risk_adjustment(&inputs, &RiskTables::default()).unwrap();
        let sum: Decimal = out
            .facilities
            .iter()
            .map(|f| f.output.risk_adjusted_value)
            .sum();
        assert_eq!(out.aggregate_value, sum);
    }

    #[test]
    fn test_diversification_steps() {
        assert_eq!(diversification_bps(1, 1), 0);
        assert_eq!(diversification_bps(3, 1), 10);
        assert_eq!(diversification_bps(5, 2), 25);
        assert_eq!(diversification_bps(10, 5), 50);
    }

    #[test]
    fn test_concentration_ratio() {
        let inputs = vec![
            facility("Big", "OH", dec!(3000000)),
            facility("Small", "OH", dec!(1000000)),
        ];
        let out = portfolio_risk_adjustment(&inputs, &RiskTables::default()).unwrap();
        // All at the same cap rate, so the ratio follows NOI: 3/4
        assert_eq!(out.concentration_ratio, dec!(0.75));
    }

    #[test]
    fn test_unpriceable_facility_skipped_with_warning() {
        let mut broken = facility("Broken", "OH", dec!(1));
        broken.facility.noi = None;
        let inputs = vec![facility("A", "OH", dec!(1000000)), broken];

        let out = portfolio_risk_adjustment(&inputs, &RiskTables::default()).unwrap();
        assert_eq!(out.facilities.len(), 1);
        assert!(out.warnings.iter().any(|w| w.contains("Broken")));
    }

    #[test]
    fn test_all_unpriceable_fails() {
        let mut broken = facility("Broken", "OH", dec!(1));
        broken.facility.noi = None;
        let result = portfolio_risk_adjustment(&[broken], &RiskTables::default());
        assert!(result.is_err());
    }

    #[test]
    fn test_diversified_value_exceeds_aggregate() {
        let inputs: Vec<_> = (0..5)
            .map(|i| facility(&format!("F{i}"), ["OH", "PA", "NC"][i % 3], dec!(1000000)))
            .collect();
        let out = portfolio_risk_adjustment(&inputs, &RiskTables::default()).unwrap();
        assert!(out.diversification_discount_bps > 0);
        assert!(out.diversified_value > out.aggregate_value);
    }
}
