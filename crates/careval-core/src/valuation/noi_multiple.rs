use rust_decimal_macros::dec;

use crate::facility::FacilityFinancialProfile;
use crate::CarevalResult;

use super::{
    resolve_income, AssumptionSource, MethodKind, ValuationAssumption, ValuationCalculation,
    ValuationMethod, ValuationOptions, ValuationResult,
};

/// Rule-of-thumb cross-check: value = NOI x multiple. Deliberately held at
/// moderate confidence.
pub struct NoiMultipleMethod;

impl ValuationMethod for NoiMultipleMethod {
    fn kind(&self) -> MethodKind {
        MethodKind::NoiMultiple
    }

    fn evaluate(
        &self,
        profile: &FacilityFinancialProfile,
        options: &ValuationOptions,
    ) -> CarevalResult<ValuationResult> {
        let income = resolve_income(profile, options)?;

        let (multiple, source) = match options.noi_multiple {
            Some(m) => (m, AssumptionSource::Provided),
            None => (
                options.defaults.asset(profile.asset_type).noi_multiple,
                AssumptionSource::Assumed,
            ),
        };

        let value = income.noi * multiple;
        let value_low = income.noi * (multiple - dec!(0.5));
        let value_high = income.noi * (multiple + dec!(0.5));

        let mut notes = Vec::new();
        if income.source != AssumptionSource::Provided {
            notes.push(income.description.clone());
        }

        Ok(ValuationResult {
            method: MethodKind::NoiMultiple,
            value,
            value_low,
            value_high,
            confidence: dec!(65),
            assumptions: vec![
                ValuationAssumption {
                    field: income.field.into(),
                    value: income.noi,
                    source: income.source,
                    description: income.description,
                },
                ValuationAssumption {
                    field: "noi_multiple".into(),
                    value: multiple,
                    source,
                    description: match source {
                        AssumptionSource::Provided => "NOI multiple as provided".into(),
                        _ => format!("{} default NOI multiple", profile.asset_type),
                    },
                },
            ],
            calculations: vec![ValuationCalculation {
                label: "Indicated value".into(),
                formula: Some("NOI x multiple".into()),
                value,
                details: Some(format!("{} x {multiple}", income.noi)),
            }],
            notes,
            inputs_used: vec![income.field.into()],
        })
    }
}
