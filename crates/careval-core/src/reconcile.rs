//! Valuation reconciler: runs the applicable subset of methods, combines
//! surviving point estimates via confidence-scaled fixed base weights, and
//! produces an overall range, a recommended value, and a cap-rate
//! sensitivity sweep.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::CarevalError;
use crate::facility::FacilityFinancialProfile;
use crate::types::{Money, Rate};
use crate::valuation::cap_rate::resolve_cap_rate;
use crate::valuation::{
    resolve_income, CapRateMethod, ComparableSalesMethod, DcfMethod, MethodKind, NoiMultipleMethod,
    PricePerBedMethod, ValuationMethod, ValuationOptions, ValuationResult,
};
use crate::CarevalResult;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Fixed base weights for combining method estimates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MethodWeights {
    pub cap_rate: Decimal,
    pub price_per_bed: Decimal,
    pub comparable_sales: Decimal,
    pub dcf: Decimal,
    pub noi_multiple: Decimal,
}

impl MethodWeights {
    pub fn for_kind(&self, kind: MethodKind) -> Decimal {
        match kind {
            MethodKind::CapRate => self.cap_rate,
            MethodKind::PricePerBed => self.price_per_bed,
            MethodKind::ComparableSales => self.comparable_sales,
            MethodKind::DiscountedCashFlow => self.dcf,
            MethodKind::NoiMultiple => self.noi_multiple,
        }
    }
}

impl Default for MethodWeights {
    fn default() -> Self {
        MethodWeights {
            cap_rate: dec!(0.35),
            price_per_bed: dec!(0.20),
            comparable_sales: dec!(0.25),
            dcf: dec!(0.15),
            noi_multiple: dec!(0.05),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconciliationConfig {
    /// Explicit method subset; `None` selects the default set (cap rate,
    /// price per bed, DCF, plus comps/multiple when their data is supplied)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub methods: Option<Vec<MethodKind>>,
    pub weights: MethodWeights,
    /// Recommended value is rounded to the nearest multiple of this unit
    pub rounding_unit: Money,
    /// Symmetric sensitivity sweep half-width, in basis points
    pub sweep_range_bps: i32,
    pub sweep_step_bps: i32,
}

impl Default for ReconciliationConfig {
    fn default() -> Self {
        ReconciliationConfig {
            methods: None,
            weights: MethodWeights::default(),
            rounding_unit: dec!(100000),
            sweep_range_bps: 200,
            sweep_step_bps: 50,
        }
    }
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

/// A method that could not contribute to the reconciliation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkippedMethod {
    pub method: MethodKind,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CapRateSensitivityPoint {
    pub bps_delta: i32,
    pub cap_rate: Rate,
    pub value: Money,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValuationSummary {
    pub facility_name: String,
    pub results: Vec<ValuationResult>,
    pub skipped: Vec<SkippedMethod>,
    /// Confidence-scaled weighted average of method point estimates
    pub weighted_value: Money,
    /// Confidence-weighted average of method confidences, 0-100
    pub overall_confidence: Decimal,
    /// Lowest method low
    pub value_low: Money,
    /// Highest method high
    pub value_high: Money,
    /// Weighted value rounded to the configured unit
    pub recommended_value: Money,
    /// (method, effective weight) pairs actually applied
    pub weights_used: Vec<(MethodKind, Decimal)>,
    pub cap_rate_sensitivity: Vec<CapRateSensitivityPoint>,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

fn method_instance(kind: MethodKind) -> Box<dyn ValuationMethod> {
    match kind {
        MethodKind::CapRate => Box::new(CapRateMethod),
        MethodKind::PricePerBed => Box::new(PricePerBedMethod),
        MethodKind::ComparableSales => Box::new(ComparableSalesMethod),
        MethodKind::DiscountedCashFlow => Box::new(DcfMethod),
        MethodKind::NoiMultiple => Box::new(NoiMultipleMethod),
    }
}

fn default_method_set(options: &ValuationOptions) -> Vec<MethodKind> {
    let mut methods = vec![
        MethodKind::CapRate,
        MethodKind::PricePerBed,
        MethodKind::DiscountedCashFlow,
    ];
    if !options.comparables.is_empty() {
        methods.push(MethodKind::ComparableSales);
    }
    if options.noi_multiple.is_some() {
        methods.push(MethodKind::NoiMultiple);
    }
    methods
}

/// Run the applicable valuation methods and reconcile their estimates.
///
/// Individual method failures are recorded as skips, never aborting the
/// run; only a run in which every method fails surfaces an error.
pub fn reconcile_valuation(
    profile: &FacilityFinancialProfile,
    options: &ValuationOptions,
    config: &ReconciliationConfig,
) -> CarevalResult<ValuationSummary> {
    let kinds = config
        .methods
        .clone()
        .unwrap_or_else(|| default_method_set(options));

    let mut results: Vec<ValuationResult> = Vec::new();
    let mut skipped: Vec<SkippedMethod> = Vec::new();

    for kind in kinds {
        match method_instance(kind).evaluate(profile, options) {
            Ok(result) => results.push(result),
            Err(e) => skipped.push(SkippedMethod {
                method: kind,
                reason: e.to_string(),
            }),
        }
    }

    if results.is_empty() {
        let reasons: Vec<String> = skipped
            .iter()
            .map(|s| format!("{}: {}", s.method, s.reason))
            .collect();
        return Err(CarevalError::NoApplicableMethod(reasons.join("; ")));
    }

    // --- Confidence-scaled weighted average ---
    let mut weighted_sum = Decimal::ZERO;
    let mut weight_total = Decimal::ZERO;
    let mut confidence_sum = Decimal::ZERO;
    let mut weights_used = Vec::with_capacity(results.len());

    for result in &results {
        let effective = config.weights.for_kind(result.method) * result.confidence / dec!(100);
        weighted_sum += result.value * effective;
        confidence_sum += result.confidence * effective;
        weight_total += effective;
        weights_used.push((result.method, effective));
    }

    if weight_total.is_zero() {
        return Err(CarevalError::DivisionByZero {
            context: "reconciliation weight total".into(),
        });
    }

    let weighted_value = weighted_sum / weight_total;
    let overall_confidence = confidence_sum / weight_total;

    let value_low = results
        .iter()
        .map(|r| r.value_low)
        .min()
        .expect("non-empty results");
    let value_high = results
        .iter()
        .map(|r| r.value_high)
        .max()
        .expect("non-empty results");

    let recommended_value =
        (weighted_value / config.rounding_unit).round() * config.rounding_unit;

    let cap_rate_sensitivity = sensitivity_sweep(profile, options, config);

    Ok(ValuationSummary {
        facility_name: profile.name.clone(),
        results,
        skipped,
        weighted_value,
        overall_confidence,
        value_low,
        value_high,
        recommended_value,
        weights_used,
        cap_rate_sensitivity,
    })
}

/// Fixed symmetric sweep around the resolved base cap rate, excluding
/// non-positive rates. Empty when no income figure can be resolved.
fn sensitivity_sweep(
    profile: &FacilityFinancialProfile,
    options: &ValuationOptions,
    config: &ReconciliationConfig,
) -> Vec<CapRateSensitivityPoint> {
    let (Ok(income), Ok(base)) = (
        resolve_income(profile, options),
        resolve_cap_rate(profile, options),
    ) else {
        return Vec::new();
    };

    let mut points = Vec::new();
    let mut bps = -config.sweep_range_bps;
    while bps <= config.sweep_range_bps {
        let rate = base.rate + Decimal::from(bps) / dec!(10000);
        if rate > Decimal::ZERO {
            points.push(CapRateSensitivityPoint {
                bps_delta: bps,
                cap_rate: rate,
                value: income.noi / rate,
            });
        }
        bps += config.sweep_step_bps;
    }
    points
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::facility::{ComplianceSnapshot, StarRatings};
    use crate::types::AssetType;
    use pretty_assertions::assert_eq;

    fn profile() -> FacilityFinancialProfile {
        FacilityFinancialProfile {
            name: "Willow Creek".into(),
            asset_type: AssetType::SkilledNursing,
            beds: 120,
            state: "OH".into(),
            year_built: Some(2002),
            location: None,
            revenue: Some(dec!(13000000)),
            ebitdar: Some(dec!(2100000)),
            noi: Some(dec!(1900000)),
            occupancy_rate: Some(dec!(0.87)),
            payer_mix: None,
            staffing: None,
            compliance: ComplianceSnapshot::default(),
            star_ratings: StarRatings {
                overall: Some(3),
                staffing: None,
                quality_measures: None,
            },
            capex_needs: None,
        }
    }

    fn options() -> ValuationOptions {
        ValuationOptions {
            cap_rate_override: Some(dec!(0.11)),
            valuation_year: Some(2025),
            ..Default::default()
        }
    }

    #[test]
    fn test_default_set_runs_three_methods() {
        let summary =
            reconcile_valuation(&profile(), &options(), &ReconciliationConfig::default()).unwrap();
        assert_eq!(summary.results.len(), 3);
        assert!(summary.skipped.is_empty());
        let kinds: Vec<MethodKind> = summary.results.iter().map(|r| r.method).collect();
        assert!(kinds.contains(&MethodKind::CapRate));
        assert!(kinds.contains(&MethodKind::PricePerBed));
        assert!(kinds.contains(&MethodKind::DiscountedCashFlow));
    }

    #[test]
    fn test_noi_multiple_joins_when_supplied() {
        let opts = ValuationOptions {
            noi_multiple: Some(dec!(8)),
            ..options()
        };
        let summary =
            reconcile_valuation(&profile(), &opts, &ReconciliationConfig::default()).unwrap();
        assert!(summary
            .results
            .iter()
            .any(|r| r.method == MethodKind::NoiMultiple));
    }

    #[test]
    fn test_weighted_value_within_method_spread() {
        let summary =
            reconcile_valuation(&profile(), &options(), &ReconciliationConfig::default()).unwrap();
        let min = summary
            .results
            .iter()
            .map(|r| r.value)
            .min()
            .unwrap();
        let max = summary
            .results
            .iter()
            .map(|r| r.value)
            .max()
            .unwrap();
        assert!(summary.weighted_value >= min && summary.weighted_value <= max);
    }

    #[test]
    fn test_overall_range_spans_all_methods() {
        let summary =
            reconcile_valuation(&profile(), &options(), &ReconciliationConfig::default()).unwrap();
        for result in &summary.results {
            assert!(summary.value_low <= result.value_low);
            assert!(summary.value_high >= result.value_high);
        }
    }

    #[test]
    fn test_recommended_value_rounded_to_100k() {
        let summary =
            reconcile_valuation(&profile(), &options(), &ReconciliationConfig::default()).unwrap();
        assert_eq!(summary.recommended_value % dec!(100000), Decimal::ZERO);
        // Never more than half a unit from the weighted value
        assert!((summary.recommended_value - summary.weighted_value).abs() <= dec!(50000));
    }

    #[test]
    fn test_failing_method_is_skipped_not_fatal() {
        let mut p = profile();
        p.beds = 0; // sinks price-per-bed, cap rate and DCF still run
        let summary =
            reconcile_valuation(&p, &options(), &ReconciliationConfig::default()).unwrap();
        assert_eq!(summary.results.len(), 2);
        assert_eq!(summary.skipped.len(), 1);
        assert_eq!(summary.skipped[0].method, MethodKind::PricePerBed);
    }

    #[test]
    fn test_all_methods_failing_is_no_applicable_method() {
        let mut p = profile();
        p.noi = None;
        p.ebitdar = None;
        p.revenue = None;
        p.beds = 0;
        let err =
            reconcile_valuation(&p, &options(), &ReconciliationConfig::default()).unwrap_err();
        match err {
            CarevalError::NoApplicableMethod(msg) => {
                assert!(msg.contains("Direct Capitalization"), "{msg}");
            }
            other => panic!("expected NoApplicableMethod, got {other:?}"),
        }
    }

    #[test]
    fn test_explicit_method_subset() {
        let config = ReconciliationConfig {
            methods: Some(vec![MethodKind::CapRate]),
            ..Default::default()
        };
        let summary = reconcile_valuation(&profile(), &options(), &config).unwrap();
        assert_eq!(summary.results.len(), 1);
        assert_eq!(summary.results[0].method, MethodKind::CapRate);
        // Weighted average of one method is that method's value
        assert_eq!(summary.weighted_value, summary.results[0].value);
    }

    #[test]
    fn test_sensitivity_sweep_shape() {
        let summary =
            reconcile_valuation(&profile(), &options(), &ReconciliationConfig::default()).unwrap();
        // ±200bps in 50bps steps = 9 points around the 11% override
        assert_eq!(summary.cap_rate_sensitivity.len(), 9);
        assert_eq!(summary.cap_rate_sensitivity[0].bps_delta, -200);
        assert_eq!(summary.cap_rate_sensitivity[0].cap_rate, dec!(0.09));
        assert_eq!(summary.cap_rate_sensitivity[8].bps_delta, 200);
        assert_eq!(summary.cap_rate_sensitivity[8].cap_rate, dec!(0.13));
        // Center point is the base rate
        assert_eq!(summary.cap_rate_sensitivity[4].value, dec!(1900000) / dec!(0.11));
    }

    #[test]
    fn test_sensitivity_sweep_excludes_non_positive_rates() {
        let opts = ValuationOptions {
            cap_rate_override: Some(dec!(0.015)),
            ..Default::default()
        };
        let summary =
            reconcile_valuation(&profile(), &opts, &ReconciliationConfig::default()).unwrap();
        // -200 and -150 bps would be non-positive
        assert_eq!(summary.cap_rate_sensitivity.len(), 7);
        assert!(summary
            .cap_rate_sensitivity
            .iter()
            .all(|p| p.cap_rate > Decimal::ZERO));
    }

    #[test]
    fn test_idempotent_summary() {
        let a = reconcile_valuation(&profile(), &options(), &ReconciliationConfig::default())
            .unwrap();
        let b = reconcile_valuation(&profile(), &options(), &ReconciliationConfig::default())
            .unwrap();
        assert_eq!(
            serde_json::to_string(&a).unwrap(),
            serde_json::to_string(&b).unwrap()
        );
    }
}
