//! Independent single-parameter sweeps over the portfolio deal economics,
//! plus the break-even scalars the decision model leans on.

use rust_decimal::Decimal;
use rust_decimal::MathematicalOps;
use serde::{Deserialize, Serialize};

use crate::types::{Money, Rate};

use super::partner::PartnerProfile;
use super::LeaseEngineConfig;

/// One grid point of a sweep that reprices the deal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepPoint {
    /// The swept parameter's value at this point
    pub parameter: Decimal,
    pub purchase_price: Money,
    pub annual_rent: Money,
    pub coverage_ratio: Decimal,
    /// Escalated rent obligation over the initial term
    pub initial_term_obligation: Money,
}

/// One grid point of the escalation sweep; pricing is unchanged, the
/// obligation profile is not.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EscalationPoint {
    pub escalation_rate: Rate,
    pub final_initial_term_rent: Money,
    pub initial_term_obligation: Money,
    pub final_initial_term_coverage: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensitivityAnalysis {
    pub cap_rate_sweep: Vec<SweepPoint>,
    pub noi_shock_sweep: Vec<SweepPoint>,
    pub occupancy_sweep: Vec<SweepPoint>,
    pub escalation_sweep: Vec<EscalationPoint>,
    /// Occupancy at which coverage hits the partner minimum
    pub break_even_occupancy: Rate,
    /// NOI decline that exhausts the coverage cushion
    pub break_even_noi_decline: Rate,
    /// Actual coverage / minimum coverage - 1
    pub coverage_cushion: Decimal,
}

/// Escalated rent obligation over `years` starting from `base_rent`.
fn term_obligation(base_rent: Money, escalation: Rate, years: u32) -> Money {
    let one_plus = Decimal::ONE + escalation;
    let mut total = Decimal::ZERO;
    for t in 0..years {
        total += base_rent * one_plus.powd(Decimal::from(t));
    }
    total
}

/// Run the four fixed parameter sweeps and break-even scalars for a
/// portfolio with the given aggregates, holding everything else constant
/// in each sweep.
pub fn run_sensitivity(
    total_noi: Money,
    total_ebitdar: Money,
    base_cap_rate: Rate,
    current_occupancy: Rate,
    partner: &PartnerProfile,
    config: &LeaseEngineConfig,
) -> SensitivityAnalysis {
    let yield_rate = partner.economics.lease_yield;
    let escalation = partner.lease_terms.effective_escalation();
    let initial_years = partner.lease_terms.initial_term_years;

    let price_out = |noi: Money, ebitdar: Money, cap: Rate| -> SweepPoint {
        let purchase_price = if cap.is_zero() { Decimal::ZERO } else { noi / cap };
        let annual_rent = purchase_price * yield_rate;
        let coverage_ratio = if annual_rent.is_zero() {
            Decimal::ZERO
        } else {
            ebitdar / annual_rent
        };
        SweepPoint {
            parameter: cap,
            purchase_price,
            annual_rent,
            coverage_ratio,
            initial_term_obligation: term_obligation(annual_rent, escalation, initial_years),
        }
    };

    // --- Cap rate sweep ---
    let cap_rate_sweep: Vec<SweepPoint> = config
        .cap_rate_grid
        .points()
        .into_iter()
        .filter(|rate| *rate > Decimal::ZERO)
        .map(|rate| price_out(total_noi, total_ebitdar, rate))
        .collect();

    // --- NOI shock sweep ---
    let noi_shock_sweep: Vec<SweepPoint> = config
        .noi_shock_grid
        .points()
        .into_iter()
        .map(|shock| {
            let factor = Decimal::ONE + shock;
            let mut point = price_out(total_noi * factor, total_ebitdar * factor, base_cap_rate);
            point.parameter = shock;
            point
        })
        .collect();

    // --- Occupancy sweep: income scales proportionally with census ---
    let occupancy_sweep: Vec<SweepPoint> = config
        .occupancy_grid
        .points()
        .into_iter()
        .map(|occupancy| {
            let factor = if current_occupancy.is_zero() {
                Decimal::ONE
            } else {
                occupancy / current_occupancy
            };
            let mut point = price_out(total_noi * factor, total_ebitdar * factor, base_cap_rate);
            point.parameter = occupancy;
            point
        })
        .collect();

    // --- Escalation sweep ---
    let base_point = price_out(total_noi, total_ebitdar, base_cap_rate);
    let base_rent = base_point.annual_rent;
    let growth = Decimal::ONE + config.ebitdar_growth;
    let escalation_sweep: Vec<EscalationPoint> = config
        .escalation_grid
        .points()
        .into_iter()
        .map(|esc| {
            let final_exp = Decimal::from(initial_years.saturating_sub(1));
            let final_rent = base_rent * (Decimal::ONE + esc).powd(final_exp);
            let final_ebitdar = total_ebitdar * growth.powd(final_exp);
            EscalationPoint {
                escalation_rate: esc,
                final_initial_term_rent: final_rent,
                initial_term_obligation: term_obligation(base_rent, esc, initial_years),
                final_initial_term_coverage: if final_rent.is_zero() {
                    Decimal::ZERO
                } else {
                    final_ebitdar / final_rent
                },
            }
        })
        .collect();

    // --- Break-even scalars ---
    let actual_coverage = base_point.coverage_ratio;
    let minimum = partner.economics.minimum_coverage;
    let (break_even_occupancy, break_even_noi_decline, coverage_cushion) =
        if actual_coverage.is_zero() || minimum.is_zero() {
            (Decimal::ZERO, Decimal::ZERO, Decimal::ZERO)
        } else {
            (
                current_occupancy * (minimum / actual_coverage),
                Decimal::ONE - minimum / actual_coverage,
                actual_coverage / minimum - Decimal::ONE,
            )
        };

    SensitivityAnalysis {
        cap_rate_sweep,
        noi_shock_sweep,
        occupancy_sweep,
        escalation_sweep,
        break_even_occupancy,
        break_even_noi_decline,
        coverage_cushion,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    fn run_default() -> SensitivityAnalysis {
        run_sensitivity(
            dec!(5000000),
            dec!(7000000),
            dec!(0.09),
            dec!(0.85),
            &PartnerProfile::default(),
            &LeaseEngineConfig::default(),
        )
    }

    #[test]
    fn test_grid_sizes() {
        let s = run_default();
        assert_eq!(s.cap_rate_sweep.len(), 8);
        assert_eq!(s.noi_shock_sweep.len(), 9);
        assert_eq!(s.occupancy_sweep.len(), 6);
        assert_eq!(s.escalation_sweep.len(), 5);
    }

    #[test]
    fn test_cap_rate_point_arithmetic() {
        let s = run_default();
        let point = &s.cap_rate_sweep[0];
        assert_eq!(point.parameter, dec!(0.065));
        assert_eq!(point.purchase_price, dec!(5000000) / dec!(0.065));
        assert_eq!(point.annual_rent, point.purchase_price * dec!(0.095));
        assert_eq!(point.coverage_ratio, dec!(7000000) / point.annual_rent);
    }

    #[test]
    fn test_higher_cap_rate_means_lower_price_higher_coverage() {
        let s = run_default();
        for pair in s.cap_rate_sweep.windows(2) {
            assert!(pair[1].purchase_price < pair[0].purchase_price);
            assert!(pair[1].coverage_ratio > pair[0].coverage_ratio);
        }
    }

    #[test]
    fn test_noi_shock_is_symmetric_in_coverage() {
        let s = run_default();
        // Coverage = ebitdar*f / (noi*f/cap*yield): the factor cancels, so
        // coverage is flat across NOI shocks while price moves
        let first = &s.noi_shock_sweep[0];
        let last = &s.noi_shock_sweep[8];
        assert_eq!(first.parameter, dec!(-0.20));
        assert_eq!(last.parameter, dec!(0.20));
        assert!(first.purchase_price < last.purchase_price);
        assert!((first.coverage_ratio - last.coverage_ratio).abs() < dec!(0.0001));
    }

    #[test]
    fn test_occupancy_sweep_scales_price() {
        let s = run_default();
        let at_85 = s
            .occupancy_sweep
            .iter()
            .find(|p| p.parameter == dec!(0.85))
            .unwrap();
        // At the current occupancy the sweep reproduces the base pricing
        assert_eq!(at_85.purchase_price, dec!(5000000) / dec!(0.09));
        let at_70 = &s.occupancy_sweep[0];
        assert!(at_70.purchase_price < at_85.purchase_price);
    }

    #[test]
    fn test_break_even_scalars() {
        let s = run_default();
        // Base: price = 55,555,555.6, rent = 5,277,777.8, coverage ≈ 1.3263
        let base_rent = dec!(5000000) / dec!(0.09) * dec!(0.095);
        let actual = dec!(7000000) / base_rent;
        assert_eq!(s.coverage_cushion, actual / dec!(1.3) - Decimal::ONE);
        assert_eq!(s.break_even_noi_decline, Decimal::ONE - dec!(1.3) / actual);
        assert_eq!(s.break_even_occupancy, dec!(0.85) * (dec!(1.3) / actual));
        // Coverage above minimum implies a positive cushion and a break-even
        // occupancy below current
        assert!(s.coverage_cushion > Decimal::ZERO);
        assert!(s.break_even_occupancy < dec!(0.85));
    }

    #[test]
    fn test_escalation_sweep_obligation_grows_with_escalator() {
        let s = run_default();
        for pair in s.escalation_sweep.windows(2) {
            assert!(pair[1].initial_term_obligation > pair[0].initial_term_obligation);
            assert!(pair[1].final_initial_term_rent > pair[0].final_initial_term_rent);
            assert!(
                pair[1].final_initial_term_coverage < pair[0].final_initial_term_coverage
            );
        }
    }

    #[test]
    fn test_term_obligation_closed_form() {
        // 3 years at 10%: 100 + 110 + 121 = 331
        assert_eq!(term_obligation(dec!(100), dec!(0.10), 3), dec!(331));
        assert_eq!(term_obligation(dec!(100), Decimal::ZERO, 4), dec!(400));
    }
}
