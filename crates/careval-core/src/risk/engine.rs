use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::CarevalError;
use crate::facility::FacilityFinancialProfile;
use crate::tables::resolve_bracket;
use crate::types::{Money, Rate, SupplyDemandSignal};
use crate::CarevalResult;

use super::tables::RiskTables;

/// Optional data categories feeding the data-quality score.
const MAX_DATA_CATEGORIES: u32 = 12;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AdjustmentCategory {
    Quality,
    Operations,
    Compliance,
    Capital,
    Market,
    Other,
}

/// One signed basis-point contribution to the cap-rate premium.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CapRateAdjustment {
    pub category: AdjustmentCategory,
    pub factor: String,
    pub description: String,
    pub basis_points: i32,
    /// 0-1, how reliable the underlying observation is
    pub confidence: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskTier {
    Low,
    Moderate,
    High,
    Critical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataQuality {
    High,
    Medium,
    Low,
}

/// Qualitative summary of the adjustment set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskProfile {
    /// Three largest positive (premium) adjustments
    pub key_risks: Vec<CapRateAdjustment>,
    /// Three largest negative (discount) adjustments
    pub mitigating_factors: Vec<CapRateAdjustment>,
    pub tier: RiskTier,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskAdjustedValuationInput {
    pub facility: FacilityFinancialProfile,
    /// Override for the asset-type baseline cap rate
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_cap_rate: Option<Rate>,
    /// Year the valuation is performed, for building-age brackets
    #[serde(skip_serializing_if = "Option::is_none")]
    pub valuation_year: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub market_signal: Option<SupplyDemandSignal>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskAdjustedValuationOutput {
    pub baseline_cap_rate: Rate,
    pub baseline_value: Money,
    pub adjustments: Vec<CapRateAdjustment>,
    /// Sum of basis points / 10,000
    pub total_premium: Rate,
    pub risk_adjusted_cap_rate: Rate,
    pub risk_adjusted_value: Money,
    /// Risk-adjusted value minus baseline value
    pub value_delta: Money,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub implied_price_per_bed: Option<Money>,
    pub implied_yield: Rate,
    /// Observed optional data categories / 12
    pub data_quality_score: Decimal,
    pub data_quality: DataQuality,
    pub risk_profile: RiskProfile,
    pub warnings: Vec<String>,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Derive a risk-adjusted cap rate and value for one facility.
///
/// Absent optional fields contribute no adjustment and lower the reported
/// data quality instead of failing; the only hard requirement is an income
/// figure.
pub fn risk_adjusted_valuation(
    input: &RiskAdjustedValuationInput,
    tables: &RiskTables,
) -> CarevalResult<RiskAdjustedValuationOutput> {
    let facility = &input.facility;
    let noi = facility
        .income_basis()
        .ok_or_else(|| CarevalError::MissingInput {
            field: "noi".into(),
            reason: "risk adjustment requires NOI or EBITDAR".into(),
        })?;

    let baseline = input
        .base_cap_rate
        .unwrap_or_else(|| tables.baseline_cap_rate(facility.asset_type));
    if baseline <= Decimal::ZERO {
        return Err(CarevalError::InvalidInput {
            field: "base_cap_rate".into(),
            reason: "Baseline cap rate must be positive".into(),
        });
    }

    let mut warnings = Vec::new();
    let (adjustments, observed) = collect_adjustments(input, tables);

    let total_bps: i32 = adjustments.iter().map(|a| a.basis_points).sum();
    let total_premium = Decimal::from(total_bps) / dec!(10000);

    let mut risk_adjusted_cap_rate = baseline + total_premium;
    if risk_adjusted_cap_rate < tables.cap_rate_floor {
        warnings.push(format!(
            "Risk-adjusted cap rate {risk_adjusted_cap_rate} clamped to the {} floor",
            tables.cap_rate_floor
        ));
        risk_adjusted_cap_rate = tables.cap_rate_floor;
    }

    let baseline_value = noi / baseline;
    let risk_adjusted_value = noi / risk_adjusted_cap_rate;
    let value_delta = risk_adjusted_value - baseline_value;

    let implied_price_per_bed = if facility.beds > 0 {
        Some(risk_adjusted_value / Decimal::from(facility.beds))
    } else {
        None
    };
    let implied_yield = noi / risk_adjusted_value;

    let data_quality_score = Decimal::from(observed) / Decimal::from(MAX_DATA_CATEGORIES);
    let data_quality = if data_quality_score >= dec!(0.8) {
        DataQuality::High
    } else if data_quality_score >= dec!(0.5) {
        DataQuality::Medium
    } else {
        DataQuality::Low
    };
    if data_quality == DataQuality::Low {
        warnings.push(format!(
            "Only {observed} of {MAX_DATA_CATEGORIES} risk data categories observed"
        ));
    }

    let risk_profile = build_risk_profile(&adjustments, total_premium);

    Ok(RiskAdjustedValuationOutput {
        baseline_cap_rate: baseline,
        baseline_value,
        adjustments,
        total_premium,
        risk_adjusted_cap_rate,
        risk_adjusted_value,
        value_delta,
        implied_price_per_bed,
        implied_yield,
        data_quality_score,
        data_quality,
        risk_profile,
        warnings,
    })
}

// ---------------------------------------------------------------------------
// Adjustment rules
// ---------------------------------------------------------------------------

fn star_bps(table: &[i32; 5], star: Option<u8>) -> Option<i32> {
    match star {
        Some(s @ 1..=5) => Some(table[(s - 1) as usize]),
        _ => None,
    }
}

/// Zero-bps contributions are observed but not recorded.
fn push(
    adjustments: &mut Vec<CapRateAdjustment>,
    category: AdjustmentCategory,
    factor: &str,
    description: String,
    bps: i32,
    confidence: Decimal,
) {
    if bps != 0 {
        adjustments.push(CapRateAdjustment {
            category,
            factor: factor.into(),
            description,
            basis_points: bps,
            confidence,
        });
    }
}

fn collect_adjustments(
    input: &RiskAdjustedValuationInput,
    tables: &RiskTables,
) -> (Vec<CapRateAdjustment>, u32) {
    let facility = &input.facility;
    let mut adjustments = Vec::new();
    let mut observed: u32 = 0;

    // --- Star ratings ---
    if let Some(bps) = star_bps(&tables.overall_star_bps, facility.star_ratings.overall) {
        observed += 1;
        push(
            &mut adjustments,
            AdjustmentCategory::Quality,
            "overall_star_rating",
            format!(
                "Overall rating {} stars",
                facility.star_ratings.overall.unwrap_or(0)
            ),
            bps,
            dec!(0.85),
        );
    }
    if let Some(bps) = star_bps(&tables.staffing_star_bps, facility.star_ratings.staffing) {
        observed += 1;
        push(
            &mut adjustments,
            AdjustmentCategory::Quality,
            "staffing_star_rating",
            format!(
                "Staffing rating {} stars",
                facility.star_ratings.staffing.unwrap_or(0)
            ),
            bps,
            dec!(0.85),
        );
    }
    if let Some(bps) = star_bps(
        &tables.quality_star_bps,
        facility.star_ratings.quality_measures,
    ) {
        observed += 1;
        push(
            &mut adjustments,
            AdjustmentCategory::Quality,
            "quality_measure_rating",
            format!(
                "Quality-measure rating {} stars",
                facility.star_ratings.quality_measures.unwrap_or(0)
            ),
            bps,
            dec!(0.80),
        );
    }

    // --- Occupancy ---
    if let Some(occ) = facility.occupancy_rate {
        observed += 1;
        if let Some(bps) = resolve_bracket(&tables.occupancy_bps, occ) {
            push(
                &mut adjustments,
                AdjustmentCategory::Operations,
                "occupancy",
                format!("Occupancy {occ}"),
                bps,
                dec!(0.90),
            );
        }
    }

    // --- Staffing ---
    if let Some(staffing) = &facility.staffing {
        if let Some(agency) = staffing.agency_pct {
            observed += 1;
            if let Some(bps) = resolve_bracket(&tables.agency_pct_bps, agency) {
                push(
                    &mut adjustments,
                    AdjustmentCategory::Operations,
                    "agency_labor",
                    format!("Agency labor at {agency} of nursing hours"),
                    bps,
                    dec!(0.80),
                );
            }
        }
        if let Some(hppd) = staffing.hppd {
            observed += 1;
            let (bps, desc) = if hppd < tables.minimum_hppd {
                (
                    tables.below_min_hppd_bps,
                    format!("HPPD {hppd} below the {} floor", tables.minimum_hppd),
                )
            } else {
                (
                    tables.at_or_above_min_hppd_bps,
                    format!("HPPD {hppd} meets the {} floor", tables.minimum_hppd),
                )
            };
            push(
                &mut adjustments,
                AdjustmentCategory::Operations,
                "hppd",
                desc,
                bps,
                dec!(0.80),
            );
        }
    }

    // --- Payer mix ---
    if let Some(medicare) = facility.payer_mix.as_ref().and_then(|p| p.medicare_pct) {
        observed += 1;
        if let Some(bps) = resolve_bracket(&tables.medicare_pct_bps, medicare) {
            push(
                &mut adjustments,
                AdjustmentCategory::Operations,
                "medicare_mix",
                format!("Medicare at {medicare} of revenue"),
                bps,
                dec!(0.80),
            );
        }
    }

    // --- Compliance ---
    if facility.compliance.immediate_jeopardy {
        push(
            &mut adjustments,
            AdjustmentCategory::Compliance,
            "immediate_jeopardy",
            "Open immediate-jeopardy citation".into(),
            tables.immediate_jeopardy_bps,
            dec!(0.95),
        );
    }
    if facility.compliance.special_focus {
        push(
            &mut adjustments,
            AdjustmentCategory::Compliance,
            "special_focus",
            "Special-focus-facility designation".into(),
            tables.special_focus_bps,
            dec!(0.95),
        );
    }
    if let Some(count) = facility.compliance.deficiency_count {
        observed += 1;
        if let Some(bps) = resolve_bracket(&tables.deficiency_count_bps, Decimal::from(count)) {
            push(
                &mut adjustments,
                AdjustmentCategory::Compliance,
                "survey_deficiencies",
                format!("{count} survey deficiencies"),
                bps,
                dec!(0.85),
            );
        }
    }

    // --- Building age ---
    if let (Some(built), Some(year)) = (facility.year_built, input.valuation_year) {
        if year >= built {
            observed += 1;
            let age = Decimal::from(year - built);
            if let Some(bps) = resolve_bracket(&tables.building_age_bps, age) {
                push(
                    &mut adjustments,
                    AdjustmentCategory::Capital,
                    "building_age",
                    format!("Building is {age} years old"),
                    bps,
                    dec!(0.70),
                );
            }
        }
    }

    // --- Capital needs ---
    if let Some(capex) = facility.capex_needs {
        if facility.beds > 0 {
            observed += 1;
            let per_bed = capex / Decimal::from(facility.beds);
            if let Some(bps) = resolve_bracket(&tables.capex_per_bed_bps, per_bed) {
                push(
                    &mut adjustments,
                    AdjustmentCategory::Capital,
                    "capex_per_bed",
                    format!("Capital needs of {per_bed} per bed"),
                    bps,
                    dec!(0.60),
                );
            }
        }
    }

    // --- State regulatory environment (state is always present; it does not
    // count toward the optional-data score) ---
    let state_bps_val = tables.state_regulatory_bps(&facility.state);
    push(
        &mut adjustments,
        AdjustmentCategory::Market,
        "state_regulatory",
        format!("{} regulatory environment", facility.state),
        state_bps_val,
        dec!(0.60),
    );

    // --- Location ---
    if let Some(location) = facility.location {
        observed += 1;
        push(
            &mut adjustments,
            AdjustmentCategory::Market,
            "location_type",
            format!("{location:?} location"),
            tables.location_bps(location),
            dec!(0.70),
        );
    }

    // --- Supply/demand ---
    if let Some(signal) = input.market_signal {
        observed += 1;
        push(
            &mut adjustments,
            AdjustmentCategory::Market,
            "supply_demand",
            format!("{signal:?} local market"),
            tables.market_signal_bps(signal),
            dec!(0.50),
        );
    }

    (adjustments, observed)
}

fn build_risk_profile(adjustments: &[CapRateAdjustment], total_premium: Rate) -> RiskProfile {
    let mut positives: Vec<CapRateAdjustment> = adjustments
        .iter()
        .filter(|a| a.basis_points > 0)
        .cloned()
        .collect();
    positives.sort_by(|a, b| b.basis_points.cmp(&a.basis_points));
    positives.truncate(3);

    let mut negatives: Vec<CapRateAdjustment> = adjustments
        .iter()
        .filter(|a| a.basis_points < 0)
        .cloned()
        .collect();
    negatives.sort_by(|a, b| a.basis_points.cmp(&b.basis_points));
    negatives.truncate(3);

    let tier = if total_premium >= dec!(0.03) {
        RiskTier::Critical
    } else if total_premium >= dec!(0.015) {
        RiskTier::High
    } else if total_premium >= dec!(0.005) {
        RiskTier::Moderate
    } else {
        RiskTier::Low
    };

    RiskProfile {
        key_risks: positives,
        mitigating_factors: negatives,
        tier,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
