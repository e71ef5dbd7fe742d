//! Per-facility deal economics and partner underwriting screens.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::facility::PortfolioFacility;
use crate::risk::{AdjustmentCategory, CapRateAdjustment};
use crate::tables::resolve_bracket;
use crate::types::{Money, Rate};

use super::partner::PartnerProfile;
use super::LeaseEngineConfig;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IssueSeverity {
    /// Excludes the facility outright
    Blocker,
    Advisory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnderwritingIssue {
    pub factor: String,
    pub severity: IssueSeverity,
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnderwritingResult {
    pub passed: bool,
    /// 0-100 after per-issue deductions
    pub score: Decimal,
    pub issues: Vec<UnderwritingIssue>,
}

/// Deal economics at the partner's pricing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DealEconomics {
    pub purchase_price: Money,
    pub annual_rent: Money,
    /// EBITDAR / annual rent
    pub coverage_ratio: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InclusionRecommendation {
    Include,
    Exclude,
    Negotiate,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FacilityAnalysis {
    pub facility: PortfolioFacility,
    pub economics: DealEconomics,
    pub underwriting: UnderwritingResult,
    pub risk_adjusted_cap_rate: Rate,
    pub cap_rate_adjustments: Vec<CapRateAdjustment>,
    pub recommendation: InclusionRecommendation,
}

// ---------------------------------------------------------------------------
// Analysis
// ---------------------------------------------------------------------------

const BLOCKER_DEDUCTION: Decimal = dec!(40);
const ADVISORY_DEDUCTION: Decimal = dec!(15);
const PASSING_SCORE: Decimal = dec!(70);

/// Price one facility at the partner's terms and screen it against the
/// underwriting criteria. Missing optional data is never fatal; a facility
/// without any income figure is priced at zero and blocked.
pub fn analyze_facility(
    facility: &PortfolioFacility,
    partner: &PartnerProfile,
    config: &LeaseEngineConfig,
) -> FacilityAnalysis {
    let profile = &facility.profile;
    let mut issues = Vec::new();

    // --- Risk premiums over the partner's target cap rate ---
    let cap_rate_adjustments = lease_rule_adjustments(facility, config);
    let premium_bps: i32 = cap_rate_adjustments.iter().map(|a| a.basis_points).sum();
    let mut risk_adjusted_cap_rate =
        partner.economics.target_cap_rate + Decimal::from(premium_bps) / dec!(10000);
    if risk_adjusted_cap_rate < config.risk_tables.cap_rate_floor {
        risk_adjusted_cap_rate = config.risk_tables.cap_rate_floor;
    }

    // --- Deal economics ---
    let economics = match profile.income_basis() {
        Some(noi) => {
            let purchase_price = noi / risk_adjusted_cap_rate;
            let annual_rent = purchase_price * partner.economics.lease_yield;
            let ebitdar = profile.ebitdar.unwrap_or(noi);
            let coverage_ratio = if annual_rent.is_zero() {
                Decimal::ZERO
            } else {
                ebitdar / annual_rent
            };
            DealEconomics {
                purchase_price,
                annual_rent,
                coverage_ratio,
            }
        }
        None => {
            issues.push(UnderwritingIssue {
                factor: "financials".into(),
                severity: IssueSeverity::Blocker,
                description: "No NOI, EBITDAR, or revenue reported; facility cannot be priced"
                    .into(),
            });
            DealEconomics {
                purchase_price: Decimal::ZERO,
                annual_rent: Decimal::ZERO,
                coverage_ratio: Decimal::ZERO,
            }
        }
    };

    // --- Partner screens ---
    let criteria = &partner.underwriting;
    if let Some(occ) = profile.occupancy_rate {
        if let Some(hard) = criteria.hard_min_occupancy {
            if occ < hard {
                issues.push(UnderwritingIssue {
                    factor: "occupancy".into(),
                    severity: IssueSeverity::Blocker,
                    description: format!("Occupancy {occ} below the hard floor {hard}"),
                });
            }
        }
        if let Some(min) = criteria.min_occupancy {
            if occ < min && !issues.iter().any(|i| i.factor == "occupancy") {
                issues.push(UnderwritingIssue {
                    factor: "occupancy".into(),
                    severity: IssueSeverity::Advisory,
                    description: format!("Occupancy {occ} below the {min} target"),
                });
            }
        }
    }
    if let (Some(min_star), Some(star)) =
        (criteria.min_overall_star, profile.star_ratings.overall)
    {
        if star < min_star {
            issues.push(UnderwritingIssue {
                factor: "star_rating".into(),
                severity: IssueSeverity::Advisory,
                description: format!("{star}-star overall rating below the {min_star}-star floor"),
            });
        }
    }
    if let (Some(max), Some(count)) =
        (criteria.max_deficiencies, profile.compliance.deficiency_count)
    {
        if count > max {
            issues.push(UnderwritingIssue {
                factor: "deficiencies".into(),
                severity: IssueSeverity::Advisory,
                description: format!("{count} survey deficiencies exceed the {max} ceiling"),
            });
        }
    }
    if criteria.exclude_special_focus && profile.compliance.special_focus {
        issues.push(UnderwritingIssue {
            factor: "special_focus".into(),
            severity: IssueSeverity::Blocker,
            description: "Special-focus-facility designation".into(),
        });
    }
    if criteria.exclude_immediate_jeopardy && profile.compliance.immediate_jeopardy {
        issues.push(UnderwritingIssue {
            factor: "immediate_jeopardy".into(),
            severity: IssueSeverity::Blocker,
            description: "Open immediate-jeopardy citation".into(),
        });
    }
    if let (Some(min_margin), Some(revenue), Some(ebitdar)) =
        (criteria.min_ebitdar_margin, profile.revenue, profile.ebitdar)
    {
        if revenue > Decimal::ZERO {
            let margin = ebitdar / revenue;
            if margin < min_margin {
                issues.push(UnderwritingIssue {
                    factor: "ebitdar_margin".into(),
                    severity: IssueSeverity::Advisory,
                    description: format!("EBITDAR margin {margin} below the {min_margin} floor"),
                });
            }
        }
    }

    // --- Score and recommendation ---
    let mut score = dec!(100);
    for issue in &issues {
        score -= match issue.severity {
            IssueSeverity::Blocker => BLOCKER_DEDUCTION,
            IssueSeverity::Advisory => ADVISORY_DEDUCTION,
        };
    }
    score = score.max(Decimal::ZERO);

    let has_blocker = issues
        .iter()
        .any(|i| i.severity == IssueSeverity::Blocker);
    let passed = !has_blocker && score >= PASSING_SCORE;

    let recommendation = if has_blocker {
        InclusionRecommendation::Exclude
    } else if !passed || economics.coverage_ratio < partner.economics.minimum_coverage {
        InclusionRecommendation::Negotiate
    } else {
        InclusionRecommendation::Include
    };

    FacilityAnalysis {
        facility: facility.clone(),
        economics,
        underwriting: UnderwritingResult {
            passed,
            score,
            issues,
        },
        risk_adjusted_cap_rate,
        cap_rate_adjustments,
        recommendation,
    }
}

/// The lease engine's discrete premium rules: quality rating, occupancy,
/// and immediate jeopardy, priced off the risk engine's tables.
fn lease_rule_adjustments(
    facility: &PortfolioFacility,
    config: &LeaseEngineConfig,
) -> Vec<CapRateAdjustment> {
    let profile = &facility.profile;
    let tables = &config.risk_tables;
    let mut adjustments = Vec::new();

    if let Some(star @ 1..=5) = profile.star_ratings.overall {
        let bps = tables.overall_star_bps[(star - 1) as usize];
        if bps != 0 {
            adjustments.push(CapRateAdjustment {
                category: AdjustmentCategory::Quality,
                factor: "overall_star_rating".into(),
                description: format!("Overall rating {star} stars"),
                basis_points: bps,
                confidence: dec!(0.85),
            });
        }
    }
    if let Some(occ) = profile.occupancy_rate {
        if let Some(bps) = resolve_bracket(&tables.occupancy_bps, occ) {
            if bps != 0 {
                adjustments.push(CapRateAdjustment {
                    category: AdjustmentCategory::Operations,
                    factor: "occupancy".into(),
                    description: format!("Occupancy {occ}"),
                    basis_points: bps,
                    confidence: dec!(0.90),
                });
            }
        }
    }
    if profile.compliance.immediate_jeopardy {
        adjustments.push(CapRateAdjustment {
            category: AdjustmentCategory::Compliance,
            factor: "immediate_jeopardy".into(),
            description: "Open immediate-jeopardy citation".into(),
            basis_points: tables.immediate_jeopardy_bps,
            confidence: dec!(0.95),
        });
    }

    adjustments
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
