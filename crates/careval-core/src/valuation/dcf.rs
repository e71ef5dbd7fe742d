use rust_decimal::Decimal;
use rust_decimal::MathematicalOps;
use rust_decimal_macros::dec;

use crate::error::CarevalError;
use crate::facility::FacilityFinancialProfile;
use crate::types::{Money, Rate};
use crate::CarevalResult;

use super::{
    clamp_confidence, resolve_income, AssumptionSource, MethodKind, ValuationAssumption,
    ValuationCalculation, ValuationMethod, ValuationOptions, ValuationResult,
};

const DEFAULT_FORECAST_YEARS: u32 = 10;

/// Income approach: discounted NOI projection plus a terminal value at an
/// exit capitalisation rate.
pub struct DcfMethod;

/// PV of the NOI path plus the discounted terminal value.
fn value_at(noi_path: &[Money], discount: Rate, terminal_cap: Rate) -> (Money, Money, Money) {
    let one_plus_r = Decimal::ONE + discount;
    let mut pv_sum = Decimal::ZERO;
    let mut discount_factor = Decimal::ONE;

    for noi in noi_path {
        discount_factor /= one_plus_r;
        pv_sum += *noi * discount_factor;
    }

    let terminal_noi = noi_path.last().copied().unwrap_or(Decimal::ZERO);
    // discount_factor is at 1/(1+r)^n after the loop
    let pv_terminal = (terminal_noi / terminal_cap) * discount_factor;

    (pv_sum, pv_terminal, pv_sum + pv_terminal)
}

impl ValuationMethod for DcfMethod {
    fn kind(&self) -> MethodKind {
        MethodKind::DiscountedCashFlow
    }

    fn evaluate(
        &self,
        profile: &FacilityFinancialProfile,
        options: &ValuationOptions,
    ) -> CarevalResult<ValuationResult> {
        let income = resolve_income(profile, options)?;
        let asset = options.defaults.asset(profile.asset_type);

        let years = options.forecast_years.unwrap_or(DEFAULT_FORECAST_YEARS);
        if years == 0 {
            return Err(CarevalError::InvalidInput {
                field: "forecast_years".into(),
                reason: "Forecast period must be at least 1 year".into(),
            });
        }

        let discount = options.discount_rate.unwrap_or(asset.discount_rate);
        let terminal_cap = options.terminal_cap_rate.unwrap_or(asset.terminal_cap_rate);
        if discount <= Decimal::ZERO {
            return Err(CarevalError::InvalidInput {
                field: "discount_rate".into(),
                reason: "Discount rate must be positive".into(),
            });
        }
        if terminal_cap <= Decimal::ZERO {
            return Err(CarevalError::InvalidInput {
                field: "terminal_cap_rate".into(),
                reason: "Terminal cap rate must be positive".into(),
            });
        }

        let mut assumptions = Vec::new();
        let mut notes = Vec::new();
        let mut inputs_used = vec![income.field.to_string()];

        // --- Project the NOI path ---
        let separate = profile.revenue.is_some() && options.operating_expenses.is_some();
        let noi_path: Vec<Money> = if separate {
            let revenue = profile.revenue.expect("checked above");
            let expenses = options.operating_expenses.expect("checked above");
            let rev_growth = options
                .revenue_growth_rate
                .or(options.noi_growth_rate)
                .unwrap_or(asset.noi_growth);
            let exp_growth = options
                .expense_growth_rate
                .unwrap_or(rev_growth + dec!(0.005));
            inputs_used.push("revenue".into());
            inputs_used.push("operating_expenses".into());
            assumptions.push(ValuationAssumption {
                field: "revenue_growth_rate".into(),
                value: rev_growth,
                source: if options.revenue_growth_rate.is_some() {
                    AssumptionSource::Provided
                } else {
                    AssumptionSource::Assumed
                },
                description: "Revenue growth for separate projection".into(),
            });
            assumptions.push(ValuationAssumption {
                field: "expense_growth_rate".into(),
                value: exp_growth,
                source: if options.expense_growth_rate.is_some() {
                    AssumptionSource::Provided
                } else {
                    AssumptionSource::Assumed
                },
                description: "Expense growth for separate projection".into(),
            });
            (1..=years)
                .map(|y| {
                    let t = Decimal::from(y);
                    revenue * (Decimal::ONE + rev_growth).powd(t)
                        - expenses * (Decimal::ONE + exp_growth).powd(t)
                })
                .collect()
        } else {
            let growth = options.noi_growth_rate.unwrap_or(asset.noi_growth);
            assumptions.push(ValuationAssumption {
                field: "noi_growth_rate".into(),
                value: growth,
                source: if options.noi_growth_rate.is_some() {
                    AssumptionSource::Provided
                } else {
                    AssumptionSource::Assumed
                },
                description: format!("{} long-run NOI growth", profile.asset_type),
            });
            (1..=years)
                .map(|y| income.noi * (Decimal::ONE + growth).powd(Decimal::from(y)))
                .collect()
        };

        assumptions.push(ValuationAssumption {
            field: "discount_rate".into(),
            value: discount,
            source: if options.discount_rate.is_some() {
                AssumptionSource::Provided
            } else {
                AssumptionSource::Assumed
            },
            description: "Unlevered discount rate".into(),
        });
        assumptions.push(ValuationAssumption {
            field: "terminal_cap_rate".into(),
            value: terminal_cap,
            source: if options.terminal_cap_rate.is_some() {
                AssumptionSource::Provided
            } else {
                AssumptionSource::Assumed
            },
            description: "Exit capitalisation rate".into(),
        });
        if income.source != AssumptionSource::Provided {
            notes.push(income.description);
        }

        let (pv_sum, pv_terminal, value) = value_at(&noi_path, discount, terminal_cap);

        // --- Range: simultaneous ±100bps shocks to discount and terminal ---
        let shock = dec!(0.01).min(terminal_cap / dec!(2)).min(discount / dec!(2));
        let (_, _, value_low) = value_at(&noi_path, discount + shock, terminal_cap + shock);
        let (_, _, value_high) = value_at(&noi_path, discount - shock, terminal_cap - shock);

        // --- Calculation trail ---
        let mut calculations = Vec::with_capacity(noi_path.len() + 4);
        let one_plus_r = Decimal::ONE + discount;
        let mut df = Decimal::ONE;
        for (i, noi) in noi_path.iter().enumerate() {
            df /= one_plus_r;
            calculations.push(ValuationCalculation {
                label: format!("Year {} NOI", i + 1),
                formula: None,
                value: *noi,
                details: Some(format!("PV {}", *noi * df)),
            });
        }
        calculations.push(ValuationCalculation {
            label: "PV of forecast NOI".into(),
            formula: None,
            value: pv_sum,
            details: None,
        });
        calculations.push(ValuationCalculation {
            label: "PV of terminal value".into(),
            formula: Some("(final NOI / terminal cap) discounted".into()),
            value: pv_terminal,
            details: None,
        });
        calculations.push(ValuationCalculation {
            label: "Indicated value".into(),
            formula: Some("PV(NOI) + PV(terminal)".into()),
            value,
            details: None,
        });

        // --- Confidence: penalize an out-of-band terminal share ---
        let mut confidence = dec!(70);
        if value > Decimal::ZERO {
            let tv_share = pv_terminal / value;
            if tv_share > dec!(0.70) || tv_share < dec!(0.30) {
                confidence -= dec!(15);
                notes.push(format!(
                    "Terminal value is {tv_share} of total; outside the expected band"
                ));
            } else if tv_share > dec!(0.60) || tv_share < dec!(0.40) {
                confidence -= dec!(5);
            }
        }
        confidence += match income.source {
            AssumptionSource::Provided => dec!(5),
            AssumptionSource::Market => Decimal::ZERO,
            AssumptionSource::Derived => dec!(-5),
            AssumptionSource::Assumed => dec!(-15),
        };

        Ok(ValuationResult {
            method: MethodKind::DiscountedCashFlow,
            value,
            value_low,
            value_high,
            confidence: clamp_confidence(confidence, dec!(40), dec!(100)),
            assumptions,
            calculations,
            notes,
            inputs_used,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::facility::{ComplianceSnapshot, StarRatings};
    use crate::types::AssetType;
    use pretty_assertions::assert_eq;

    fn profile() -> FacilityFinancialProfile {
        FacilityFinancialProfile {
            name: "Oak Hill".into(),
            asset_type: AssetType::SkilledNursing,
            beds: 110,
            state: "OH".into(),
            year_built: None,
            location: None,
            revenue: None,
            ebitdar: None,
            noi: Some(dec!(2000000)),
            occupancy_rate: None,
            payer_mix: None,
            staffing: None,
            compliance: ComplianceSnapshot::default(),
            star_ratings: StarRatings::default(),
            capex_needs: None,
        }
    }

    fn options() -> ValuationOptions {
        ValuationOptions {
            forecast_years: Some(5),
            noi_growth_rate: Some(dec!(0.02)),
            discount_rate: Some(dec!(0.12)),
            terminal_cap_rate: Some(dec!(0.12)),
            ..Default::default()
        }
    }

    #[test]
    fn test_basic_dcf_structure() {
        let result = DcfMethod.evaluate(&profile(), &options()).unwrap();

        // 5 year rows + PV of NOI + PV of terminal + indicated value
        assert_eq!(result.calculations.len(), 8);
        assert!(result.value > Decimal::ZERO);
        assert!(result.value_low < result.value);
        assert!(result.value < result.value_high);
    }

    #[test]
    fn test_year_one_noi_growth() {
        let result = DcfMethod.evaluate(&profile(), &options()).unwrap();
        // Year 1 NOI = 2,000,000 * 1.02
        assert_eq!(result.calculations[0].value, dec!(2040000));
    }

    #[test]
    fn test_value_decomposition() {
        let result = DcfMethod.evaluate(&profile(), &options()).unwrap();
        let pv_noi = result
            .calculations
            .iter()
            .find(|c| c.label == "PV of forecast NOI")
            .unwrap()
            .value;
        let pv_tv = result
            .calculations
            .iter()
            .find(|c| c.label == "PV of terminal value")
            .unwrap()
            .value;
        assert_eq!(result.value, pv_noi + pv_tv);
    }

    #[test]
    fn test_range_shocks_are_simultaneous() {
        let result = DcfMethod.evaluate(&profile(), &options()).unwrap();

        let path: Vec<Decimal> = (1..=5)
            .map(|y| dec!(2000000) * dec!(1.02).powd(Decimal::from(y)))
            .collect();
        let (_, _, expected_low) = value_at(&path, dec!(0.13), dec!(0.13));
        let (_, _, expected_high) = value_at(&path, dec!(0.11), dec!(0.11));
        assert_eq!(result.value_low, expected_low);
        assert_eq!(result.value_high, expected_high);
    }

    #[test]
    fn test_separate_revenue_expense_projection() {
        let mut p = profile();
        p.revenue = Some(dec!(12000000));
        let opts = ValuationOptions {
            operating_expenses: Some(dec!(10000000)),
            revenue_growth_rate: Some(dec!(0.03)),
            expense_growth_rate: Some(dec!(0.02)),
            forecast_years: Some(3),
            discount_rate: Some(dec!(0.12)),
            terminal_cap_rate: Some(dec!(0.12)),
            ..Default::default()
        };
        let result = DcfMethod.evaluate(&p, &opts).unwrap();
        // Year 1: 12M*1.03 - 10M*1.02 = 12.36M - 10.2M = 2.16M
        assert_eq!(result.calculations[0].value, dec!(2160000));
        assert!(result.inputs_used.contains(&"revenue".into()));
    }

    #[test]
    fn test_terminal_share_penalty() {
        // A 1-year forecast makes the terminal value dominate
        let opts = ValuationOptions {
            forecast_years: Some(1),
            noi_growth_rate: Some(dec!(0.02)),
            discount_rate: Some(dec!(0.12)),
            terminal_cap_rate: Some(dec!(0.12)),
            ..Default::default()
        };
        let result = DcfMethod.evaluate(&profile(), &opts).unwrap();
        assert!(result
            .notes
            .iter()
            .any(|n| n.contains("Terminal value")));
        // 70 baseline + 5 provided NOI - 15 penalty
        assert_eq!(result.confidence, dec!(60));
    }

    #[test]
    fn test_missing_income_error() {
        let mut p = profile();
        p.noi = None;
        assert!(DcfMethod.evaluate(&p, &options()).is_err());
    }

    #[test]
    fn test_zero_forecast_years_rejected() {
        let opts = ValuationOptions {
            forecast_years: Some(0),
            ..Default::default()
        };
        assert!(DcfMethod.evaluate(&profile(), &opts).is_err());
    }

    #[test]
    fn test_negative_discount_rejected() {
        let opts = ValuationOptions {
            discount_rate: Some(dec!(-0.01)),
            ..Default::default()
        };
        assert!(DcfMethod.evaluate(&profile(), &opts).is_err());
    }
}
