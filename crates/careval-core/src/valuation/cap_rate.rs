use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::error::CarevalError;
use crate::facility::FacilityFinancialProfile;
use crate::types::{Money, Rate};
use crate::CarevalResult;

use super::{
    clamp_confidence, resolve_income, AssumptionSource, MethodKind, ValuationAssumption,
    ValuationCalculation, ValuationMethod, ValuationOptions, ValuationResult,
};

/// Direct capitalisation: value = NOI / cap rate.
pub struct CapRateMethod;

/// Resolved cap rate with its provenance.
pub(crate) struct ResolvedCapRate {
    pub rate: Rate,
    pub source: AssumptionSource,
    pub description: String,
}

/// Cap-rate resolution priority: explicit override, market rate,
/// star-rating lookup, asset-type default.
pub(crate) fn resolve_cap_rate(
    profile: &FacilityFinancialProfile,
    options: &ValuationOptions,
) -> CarevalResult<ResolvedCapRate> {
    let resolved = if let Some(rate) = options.cap_rate_override {
        ResolvedCapRate {
            rate,
            source: AssumptionSource::Provided,
            description: "Explicit cap-rate override".into(),
        }
    } else if let Some(rate) = options.market_cap_rate {
        ResolvedCapRate {
            rate,
            source: AssumptionSource::Market,
            description: "Market cap rate as supplied".into(),
        }
    } else {
        let base = options.defaults.asset(profile.asset_type).base_cap_rate;
        match profile.star_ratings.overall {
            Some(star @ 1..=5) => {
                let bps = options.defaults.star_cap_rate_bps[(star - 1) as usize];
                ResolvedCapRate {
                    rate: base + Decimal::from(bps) / dec!(10000),
                    source: AssumptionSource::Derived,
                    description: format!("{star}-star lookup off the asset-type base rate"),
                }
            }
            _ => ResolvedCapRate {
                rate: base,
                source: AssumptionSource::Assumed,
                description: format!("{} default cap rate", profile.asset_type),
            },
        }
    };

    if resolved.rate <= Decimal::ZERO {
        return Err(CarevalError::InvalidInput {
            field: "cap_rate".into(),
            reason: "Cap rate must be positive".into(),
        });
    }
    Ok(resolved)
}

impl ValuationMethod for CapRateMethod {
    fn kind(&self) -> MethodKind {
        MethodKind::CapRate
    }

    fn evaluate(
        &self,
        profile: &FacilityFinancialProfile,
        options: &ValuationOptions,
    ) -> CarevalResult<ValuationResult> {
        let income = resolve_income(profile, options)?;
        let cap = resolve_cap_rate(profile, options)?;

        let mut assumptions = Vec::new();
        let mut calculations = Vec::new();
        let mut notes = Vec::new();
        let mut inputs_used = vec![income.field.to_string()];
        let mut confidence = dec!(70);

        assumptions.push(ValuationAssumption {
            field: income.field.into(),
            value: income.noi,
            source: income.source,
            description: income.description.clone(),
        });
        assumptions.push(ValuationAssumption {
            field: "cap_rate".into(),
            value: cap.rate,
            source: cap.source,
            description: cap.description.clone(),
        });

        // Confidence moves with input provenance
        confidence += match income.source {
            AssumptionSource::Provided => dec!(10),
            AssumptionSource::Market => dec!(5),
            AssumptionSource::Derived => dec!(-5),
            AssumptionSource::Assumed => dec!(-20),
        };
        confidence += match cap.source {
            AssumptionSource::Provided => dec!(15),
            AssumptionSource::Market => dec!(10),
            AssumptionSource::Derived => dec!(-5),
            AssumptionSource::Assumed => dec!(-15),
        };
        if matches!(cap.source, AssumptionSource::Provided | AssumptionSource::Market) {
            inputs_used.push("cap_rate".into());
        }
        if income.source != AssumptionSource::Provided {
            notes.push(income.description);
        }
        if cap.source == AssumptionSource::Assumed {
            notes.push("No quality rating available; asset-type default cap rate applied".into());
        }

        let value: Money = income.noi / cap.rate;

        // Range: ±100bps rate shock, keeping the high-side rate positive
        let shock = {
            let bps = Decimal::from(options.defaults.cap_rate_range_bps) / dec!(10000);
            bps.min(cap.rate / dec!(2))
        };
        let value_low = income.noi / (cap.rate + shock);
        let value_high = income.noi / (cap.rate - shock);

        calculations.push(ValuationCalculation {
            label: "Net operating income".into(),
            formula: None,
            value: income.noi,
            details: None,
        });
        calculations.push(ValuationCalculation {
            label: "Capitalisation rate".into(),
            formula: None,
            value: cap.rate,
            details: None,
        });
        calculations.push(ValuationCalculation {
            label: "Indicated value".into(),
            formula: Some("NOI / cap rate".into()),
            value,
            details: None,
        });
        calculations.push(ValuationCalculation {
            label: "Value range low".into(),
            formula: Some("NOI / (cap rate + shock)".into()),
            value: value_low,
            details: Some(format!("rate shock {shock}")),
        });
        calculations.push(ValuationCalculation {
            label: "Value range high".into(),
            formula: Some("NOI / (cap rate - shock)".into()),
            value: value_high,
            details: Some(format!("rate shock {shock}")),
        });

        Ok(ValuationResult {
            method: MethodKind::CapRate,
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
