//! The master-lease pipeline: per-facility analysis, inclusion, portfolio
//! roll-up, lease projection, sensitivity, decision. Fixed stage order,
//! nothing persisted between runs.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::CarevalError;
use crate::facility::PortfolioFacility;
use crate::types::{Money, Rate};
use crate::CarevalResult;

use super::decision::{decide, DealDecision, Recommendation};
use super::partner::{DealStructure, PartnerProfile};
use super::projection::{project_lease, LeaseProjection};
use super::sensitivity::{run_sensitivity, SensitivityAnalysis};
use super::underwriting::{analyze_facility, FacilityAnalysis, InclusionRecommendation};
use super::LeaseEngineConfig;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CoverageStatus {
    Healthy,
    Warning,
    Critical,
}

/// Fully derived aggregate over the included facilities; recomputed every
/// run, never carried independently.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortfolioSummary {
    pub facility_count: usize,
    pub total_beds: u32,
    pub total_revenue: Money,
    pub total_ebitdar: Money,
    pub total_noi: Money,
    pub total_purchase_price: Money,
    pub total_annual_rent: Money,
    /// Total NOI / total purchase price
    pub weighted_cap_rate: Rate,
    /// Total rent / total purchase price
    pub weighted_lease_yield: Rate,
    /// Total EBITDAR / total annual rent
    pub portfolio_coverage_ratio: Decimal,
    pub coverage_status: CoverageStatus,
    pub price_per_bed: Money,
    pub rent_per_bed: Money,
    /// Bed-weighted, over facilities reporting occupancy
    #[serde(skip_serializing_if = "Option::is_none")]
    pub average_occupancy: Option<Rate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub average_star_rating: Option<Decimal>,
    /// Mean underwriting score of the included facilities
    pub health_score: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MasterLeaseResult {
    pub summary: PortfolioSummary,
    /// Every facility's analysis, included or not
    pub facility_analyses: Vec<FacilityAnalysis>,
    /// Names of facilities carved out of the deal
    pub excluded_facilities: Vec<String>,
    pub lease_projection: LeaseProjection,
    pub sensitivity: SensitivityAnalysis,
    pub decision: DealDecision,
    pub warnings: Vec<String>,
    pub recommendations: Vec<String>,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Evaluate a portfolio against a partner's underwriting rules and produce
/// the full master-lease analysis.
pub fn analyze_master_lease(
    facilities: &[PortfolioFacility],
    partner: &PartnerProfile,
    config: &LeaseEngineConfig,
) -> CarevalResult<MasterLeaseResult> {
    if facilities.is_empty() {
        return Err(CarevalError::InvalidInput {
            field: "facilities".into(),
            reason: "Portfolio analysis requires at least one facility".into(),
        });
    }

    let mut warnings = Vec::new();

    // --- Stage 1: per-facility analysis ---
    let analyses: Vec<FacilityAnalysis> = facilities
        .iter()
        .map(|f| analyze_facility(f, partner, config))
        .collect();

    // --- Stage 2: inclusion ---
    let excluded_facilities = determine_exclusions(&analyses, partner, &mut warnings);
    let included: Vec<&FacilityAnalysis> = analyses
        .iter()
        .filter(|a| !excluded_facilities.contains(&a.facility.profile.name))
        .collect();

    if (included.len() as u32) < partner.underwriting.min_facilities {
        warnings.push(format!(
            "{} facilities included, below the partner's minimum of {}",
            included.len(),
            partner.underwriting.min_facilities
        ));
    }

    // --- Stage 3: portfolio summary ---
    let summary = build_summary(&included, partner);
    if summary.coverage_status == CoverageStatus::Critical {
        warnings.push(format!(
            "Portfolio coverage {} is critical against the {} warning threshold",
            summary.portfolio_coverage_ratio, partner.economics.warning_coverage
        ));
    }

    // --- Stage 4: lease projection ---
    let lease_projection = project_lease(
        summary.total_annual_rent,
        summary.total_ebitdar,
        &partner.lease_terms,
        config,
    );

    // --- Stage 5: sensitivity ---
    let base_cap = if summary.weighted_cap_rate > Decimal::ZERO {
        summary.weighted_cap_rate
    } else {
        partner.economics.target_cap_rate
    };
    let sensitivity = run_sensitivity(
        summary.total_noi,
        summary.total_ebitdar,
        base_cap,
        summary.average_occupancy.unwrap_or(dec!(0.85)),
        partner,
        config,
    );

    // --- Stage 6: decision ---
    let decision = decide(
        &summary,
        excluded_facilities.len(),
        &sensitivity,
        partner,
        config,
    );

    let recommendations = build_recommendations(&analyses, &excluded_facilities, &decision);

    Ok(MasterLeaseResult {
        summary,
        facility_analyses: analyses,
        excluded_facilities,
        lease_projection,
        sensitivity,
        decision,
        warnings,
        recommendations,
    })
}

// ---------------------------------------------------------------------------
// Stages
// ---------------------------------------------------------------------------

fn determine_exclusions(
    analyses: &[FacilityAnalysis],
    partner: &PartnerProfile,
    warnings: &mut Vec<String>,
) -> Vec<String> {
    let all_or_nothing = partner.deal_structure == DealStructure::AllOrNothing
        && !partner.underwriting.allow_partial_exclusion;

    let candidates: Vec<&FacilityAnalysis> = analyses
        .iter()
        .filter(|a| a.recommendation == InclusionRecommendation::Exclude)
        .collect();

    if all_or_nothing {
        if !candidates.is_empty() {
            warnings.push(format!(
                "{} facility(ies) failed underwriting but the all-or-nothing structure forces them in",
                candidates.len()
            ));
        }
        return Vec::new();
    }

    let cap = partner.underwriting.max_excluded_facilities as usize;
    if candidates.len() > cap {
        warnings.push(format!(
            "{} facilities recommended for exclusion but only {cap} may be carved out",
            candidates.len()
        ));
    }

    candidates
        .iter()
        .take(cap)
        .map(|a| a.facility.profile.name.clone())
        .collect()
}

fn build_summary(included: &[&FacilityAnalysis], partner: &PartnerProfile) -> PortfolioSummary {
    let mut total_beds: u32 = 0;
    let mut total_revenue = Decimal::ZERO;
    let mut total_ebitdar = Decimal::ZERO;
    let mut total_noi = Decimal::ZERO;
    let mut total_purchase_price = Decimal::ZERO;
    let mut total_annual_rent = Decimal::ZERO;
    let mut score_sum = Decimal::ZERO;
    let mut occ_weighted = Decimal::ZERO;
    let mut occ_beds: u32 = 0;
    let mut star_sum = Decimal::ZERO;
    let mut star_count: u32 = 0;

    for analysis in included {
        let profile = &analysis.facility.profile;
        total_beds += profile.beds;
        total_revenue += profile.revenue.unwrap_or(Decimal::ZERO);
        let noi = profile.income_basis().unwrap_or(Decimal::ZERO);
        total_noi += noi;
        // Same EBITDAR basis the per-facility coverage used
        total_ebitdar += profile.ebitdar.unwrap_or(noi);
        total_purchase_price += analysis.economics.purchase_price;
        total_annual_rent += analysis.economics.annual_rent;
        score_sum += analysis.underwriting.score;
        if let Some(occ) = profile.occupancy_rate {
            occ_weighted += occ * Decimal::from(profile.beds);
            occ_beds += profile.beds;
        }
        if let Some(star @ 1..=5) = profile.star_ratings.overall {
            star_sum += Decimal::from(star);
            star_count += 1;
        }
    }

    let weighted_cap_rate = if total_purchase_price.is_zero() {
        Decimal::ZERO
    } else {
        total_noi / total_purchase_price
    };
    let weighted_lease_yield = if total_purchase_price.is_zero() {
        Decimal::ZERO
    } else {
        total_annual_rent / total_purchase_price
    };
    let portfolio_coverage_ratio = if total_annual_rent.is_zero() {
        Decimal::ZERO
    } else {
        total_ebitdar / total_annual_rent
    };

    let coverage_status = if portfolio_coverage_ratio >= partner.economics.target_coverage {
        CoverageStatus::Healthy
    } else if portfolio_coverage_ratio >= partner.economics.warning_coverage {
        CoverageStatus::Warning
    } else {
        CoverageStatus::Critical
    };

    let beds_dec = Decimal::from(total_beds.max(1));
    PortfolioSummary {
        facility_count: included.len(),
        total_beds,
        total_revenue,
        total_ebitdar,
        total_noi,
        total_purchase_price,
        total_annual_rent,
        weighted_cap_rate,
        weighted_lease_yield,
        portfolio_coverage_ratio,
        coverage_status,
        price_per_bed: total_purchase_price / beds_dec,
        rent_per_bed: total_annual_rent / beds_dec,
        average_occupancy: if occ_beds > 0 {
            Some(occ_weighted / Decimal::from(occ_beds))
        } else {
            None
        },
        average_star_rating: if star_count > 0 {
            Some(star_sum / Decimal::from(star_count))
        } else {
            None
        },
        health_score: if included.is_empty() {
            Decimal::ZERO
        } else {
            score_sum / Decimal::from(included.len() as u32)
        },
    }
}

fn build_recommendations(
    analyses: &[FacilityAnalysis],
    excluded: &[String],
    decision: &DealDecision,
) -> Vec<String> {
    let mut recommendations = Vec::new();

    if !excluded.is_empty() {
        recommendations.push(format!("Carve out of the deal: {}", excluded.join(", ")));
    }
    for analysis in analyses {
        if analysis.recommendation == InclusionRecommendation::Negotiate {
            recommendations.push(format!(
                "Renegotiate terms for {} (score {}, coverage {})",
                analysis.facility.profile.name,
                analysis.underwriting.score,
                analysis.economics.coverage_ratio
            ));
        }
    }
    if decision.recommendation == Recommendation::Negotiate {
        recommendations.push(format!(
            "Counter with rent between {} and {}",
            decision.suggested_rent.low, decision.suggested_rent.high
        ));
    }
    recommendations.extend(decision.risk_mitigations.iter().cloned());

    recommendations
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
