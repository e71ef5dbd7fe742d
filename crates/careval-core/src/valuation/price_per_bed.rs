use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::error::CarevalError;
use crate::facility::FacilityFinancialProfile;
use crate::CarevalResult;

use super::{
    clamp_confidence, AssumptionSource, MethodKind, ValuationAssumption, ValuationCalculation,
    ValuationMethod, ValuationOptions, ValuationResult,
};

/// Market approach: value = beds x adjusted price per bed, where the base
/// price per bed is walked through state, age, quality, and occupancy
/// multipliers in sequence.
pub struct PricePerBedMethod;

impl ValuationMethod for PricePerBedMethod {
    fn kind(&self) -> MethodKind {
        MethodKind::PricePerBed
    }

    fn evaluate(
        &self,
        profile: &FacilityFinancialProfile,
        options: &ValuationOptions,
    ) -> CarevalResult<ValuationResult> {
        if profile.beds == 0 {
            return Err(CarevalError::InvalidInput {
                field: "beds".into(),
                reason: "Bed count must be positive for the price-per-bed method".into(),
            });
        }

        let defaults = &options.defaults;
        let asset = defaults.asset(profile.asset_type);
        let beds = Decimal::from(profile.beds);

        let mut assumptions = Vec::new();
        let mut calculations = Vec::new();
        let mut notes = Vec::new();
        let mut inputs_used = vec!["beds".into(), "state".into()];
        let mut confidence = dec!(65);

        // --- Base price per bed ---
        let (base_ppb, base_source) = match options.price_per_bed {
            Some(ppb) => (ppb, AssumptionSource::Provided),
            None => (asset.price_per_bed, AssumptionSource::Assumed),
        };
        if base_source == AssumptionSource::Provided {
            confidence += dec!(10);
        } else {
            confidence -= dec!(5);
        }
        assumptions.push(ValuationAssumption {
            field: "price_per_bed".into(),
            value: base_ppb,
            source: base_source,
            description: match base_source {
                AssumptionSource::Provided => "Base price per bed as provided".into(),
                _ => format!("{} national average price per bed", profile.asset_type),
            },
        });
        calculations.push(ValuationCalculation {
            label: "Base price per bed".into(),
            formula: None,
            value: base_ppb,
            details: None,
        });

        let mut adjusted = base_ppb;

        // --- State multiplier ---
        let state_mult = defaults.state_multiplier(&profile.state).unwrap_or(Decimal::ONE);
        adjusted *= state_mult;
        calculations.push(ValuationCalculation {
            label: "After state multiplier".into(),
            formula: None,
            value: adjusted,
            details: Some(format!("{} x{state_mult}", profile.state)),
        });

        // --- Age discount: 0.5%/year beyond 30 years, capped at 20% ---
        match (profile.year_built, options.valuation_year) {
            (Some(built), Some(current)) if current > built => {
                let age = current - built;
                let excess = age - defaults.age_discount_threshold_years;
                if excess > 0 {
                    let discount = (defaults.age_discount_per_year * Decimal::from(excess))
                        .min(defaults.age_discount_cap);
                    adjusted *= Decimal::ONE - discount;
                    calculations.push(ValuationCalculation {
                        label: "After age discount".into(),
                        formula: None,
                        value: adjusted,
                        details: Some(format!("{age} years old, discount {discount}")),
                    });
                }
                inputs_used.push("year_built".into());
            }
            _ => {
                confidence -= dec!(5);
                notes.push("Building age unknown; no age adjustment applied".into());
            }
        }

        // --- Quality multiplier ---
        match profile.star_ratings.overall {
            Some(star @ 1..=5) => {
                let mult = defaults.star_value_multiplier[(star - 1) as usize];
                adjusted *= mult;
                inputs_used.push("star_ratings.overall".into());
                confidence += dec!(5);
                calculations.push(ValuationCalculation {
                    label: "After quality multiplier".into(),
                    formula: None,
                    value: adjusted,
                    details: Some(format!("{star}-star x{mult}")),
                });
            }
            _ => {
                confidence -= dec!(5);
                notes.push("No overall star rating; no quality adjustment applied".into());
            }
        }

        // --- Occupancy deviation: 2% of value per 1% occupancy vs. sector average ---
        match profile.occupancy_rate {
            Some(occ) => {
                let deviation = occ - asset.avg_occupancy;
                let mult = Decimal::ONE + defaults.occupancy_value_sensitivity * deviation;
                adjusted *= mult;
                inputs_used.push("occupancy_rate".into());
                confidence += dec!(5);
                assumptions.push(ValuationAssumption {
                    field: "avg_occupancy".into(),
                    value: asset.avg_occupancy,
                    source: AssumptionSource::Assumed,
                    description: format!("{} sector average occupancy", profile.asset_type),
                });
                calculations.push(ValuationCalculation {
                    label: "After occupancy adjustment".into(),
                    formula: None,
                    value: adjusted,
                    details: Some(format!("deviation {deviation} x{mult}")),
                });
            }
            None => {
                confidence -= dec!(10);
                notes.push("Occupancy unknown; no occupancy adjustment applied".into());
            }
        }

        if adjusted <= Decimal::ZERO {
            return Err(CarevalError::FinancialImpossibility(
                "Adjusted price per bed fell to zero or below".into(),
            ));
        }

        let value = beds * adjusted;

        // --- Range: explicit bounds, otherwise ±15% ---
        let (value_low, value_high) = match (options.price_per_bed_low, options.price_per_bed_high)
        {
            (Some(low), Some(high)) => (beds * low, beds * high),
            _ => (
                value * (Decimal::ONE - defaults.ppb_range_pct),
                value * (Decimal::ONE + defaults.ppb_range_pct),
            ),
        };

        calculations.push(ValuationCalculation {
            label: "Indicated value".into(),
            formula: Some("beds x adjusted price per bed".into()),
            value,
            details: Some(format!("{} beds x {adjusted}", profile.beds)),
        });

        Ok(ValuationResult {
            method: MethodKind::PricePerBed,
            value,
            value_low,
            value_high,
            confidence: clamp_confidence(confidence, dec!(40), dec!(90)),
            assumptions,
            calculations,
            notes,
            inputs_used,
        })
    }
}
