//! Scored deal decision: weighted positive/negative factors, negotiation
//! bands, and a buy-vs-lease comparison under a fixed financing scenario.

use rust_decimal::Decimal;
use rust_decimal::MathematicalOps;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::time_value;
use crate::types::{Money, Rate};

use super::engine::PortfolioSummary;
use super::partner::PartnerProfile;
use super::sensitivity::SensitivityAnalysis;
use super::LeaseEngineConfig;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// A weighted consideration for or against the deal. Weights run 1-10.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionFactor {
    pub factor: String,
    pub weight: u8,
    pub description: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Recommendation {
    Proceed,
    Negotiate,
    Pass,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DecisionConfidence {
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceBand {
    pub low: Money,
    pub mid: Money,
    pub high: Money,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FinancingPreference {
    Purchase,
    Lease,
    Either,
}

/// Purchase economics under the fixed financing scenario, set against the
/// lease alternative.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuyVsLease {
    pub loan_to_value: Rate,
    pub interest_rate: Rate,
    pub loan_amount: Money,
    pub equity_required: Money,
    pub annual_interest: Money,
    /// Year-one levered cash yield on equity
    pub year_one_return: Rate,
    /// Simplified hold-and-exit IRR on equity
    #[serde(skip_serializing_if = "Option::is_none")]
    pub five_year_irr: Option<Rate>,
    pub preference: FinancingPreference,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DealDecision {
    pub recommendation: Recommendation,
    pub confidence: DecisionConfidence,
    /// Sum of positive weights minus sum of negative weights
    pub net_score: i32,
    pub positive_factors: Vec<DecisionFactor>,
    pub negative_factors: Vec<DecisionFactor>,
    pub risk_mitigations: Vec<String>,
    pub suggested_purchase_price: PriceBand,
    pub suggested_rent: PriceBand,
    pub buy_vs_lease: BuyVsLease,
}

// ---------------------------------------------------------------------------
// Scoring
// ---------------------------------------------------------------------------

/// Map a net score and the negative-weight total onto the recommendation
/// bands.
fn recommendation_bands(net: i32, negative_total: i32) -> (Recommendation, DecisionConfidence) {
    if net >= 15 {
        (Recommendation::Proceed, DecisionConfidence::High)
    } else if net >= 5 {
        (Recommendation::Proceed, DecisionConfidence::Medium)
    } else if net >= -5 {
        (Recommendation::Negotiate, DecisionConfidence::Medium)
    } else if net >= -15 {
        (Recommendation::Negotiate, DecisionConfidence::Low)
    } else if negative_total > 25 {
        (Recommendation::Pass, DecisionConfidence::High)
    } else {
        (Recommendation::Pass, DecisionConfidence::Medium)
    }
}

fn collect_factors(
    summary: &PortfolioSummary,
    excluded_count: usize,
    sensitivity: &SensitivityAnalysis,
    partner: &PartnerProfile,
    config: &LeaseEngineConfig,
) -> (Vec<DecisionFactor>, Vec<DecisionFactor>) {
    let economics = &partner.economics;
    let mut positive = Vec::new();
    let mut negative = Vec::new();

    // --- Coverage ---
    if summary.portfolio_coverage_ratio >= economics.target_coverage {
        positive.push(DecisionFactor {
            factor: "strong_coverage".into(),
            weight: 8,
            description: format!(
                "Coverage {} meets the {} target",
                summary.portfolio_coverage_ratio, economics.target_coverage
            ),
        });
    } else if summary.portfolio_coverage_ratio < economics.minimum_coverage {
        negative.push(DecisionFactor {
            factor: "insufficient_coverage".into(),
            weight: 9,
            description: format!(
                "Coverage {} below the {} minimum",
                summary.portfolio_coverage_ratio, economics.minimum_coverage
            ),
        });
    }

    // --- Quality ---
    if let Some(avg_star) = summary.average_star_rating {
        if avg_star >= dec!(4) {
            positive.push(DecisionFactor {
                factor: "quality_portfolio".into(),
                weight: 6,
                description: format!("Average rating {avg_star} stars"),
            });
        } else if avg_star < dec!(2.5) {
            negative.push(DecisionFactor {
                factor: "quality_concerns".into(),
                weight: 7,
                description: format!("Average rating {avg_star} stars"),
            });
        }
    }

    // --- Occupancy ---
    if let Some(occ) = summary.average_occupancy {
        if occ >= dec!(0.85) {
            positive.push(DecisionFactor {
                factor: "strong_occupancy".into(),
                weight: 5,
                description: format!("Portfolio occupancy {occ}"),
            });
        }
    }

    // --- Scale ---
    if summary.total_beds >= config.min_scale_beds
        && summary.facility_count as u32 >= partner.underwriting.min_facilities
    {
        positive.push(DecisionFactor {
            factor: "sufficient_scale".into(),
            weight: 4,
            description: format!(
                "{} facilities, {} beds",
                summary.facility_count, summary.total_beds
            ),
        });
    }

    // --- Exclusions ---
    if excluded_count > 0 {
        negative.push(DecisionFactor {
            factor: "excluded_facilities".into(),
            weight: 5,
            description: format!("{excluded_count} facility(ies) carved out of the deal"),
        });
    }

    // --- Cushion ---
    if sensitivity.coverage_cushion < config.thin_cushion_threshold {
        negative.push(DecisionFactor {
            factor: "thin_cushion".into(),
            weight: 6,
            description: format!(
                "Coverage cushion {} below {}",
                sensitivity.coverage_cushion, config.thin_cushion_threshold
            ),
        });
    }

    (positive, negative)
}

fn mitigation_for(factor: &str) -> Option<String> {
    match factor {
        "insufficient_coverage" => {
            Some("Negotiate rent toward the minimum-coverage band or a rent holiday".into())
        }
        "quality_concerns" => {
            Some("Require operator transition plans for low-rated facilities".into())
        }
        "excluded_facilities" => {
            Some("Re-trade excluded facilities separately or under seller financing".into())
        }
        "thin_cushion" => {
            Some("Seek a lower escalator or coverage-based rent resets to widen the cushion".into())
        }
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Buy vs lease
// ---------------------------------------------------------------------------

fn buy_vs_lease(
    summary: &PortfolioSummary,
    partner: &PartnerProfile,
    config: &LeaseEngineConfig,
) -> BuyVsLease {
    let price = summary.total_purchase_price;
    let noi = summary.total_noi;
    let loan_amount = price * config.loan_to_value;
    let equity_required = price - loan_amount;
    let annual_interest = loan_amount * config.interest_rate;

    let year_one_return = if equity_required.is_zero() {
        Decimal::ZERO
    } else {
        (noi - annual_interest) / equity_required
    };

    // Hold-and-exit equity IRR: interest-only debt, exit at the entry cap
    let five_year_irr = if equity_required > Decimal::ZERO && summary.weighted_cap_rate > Decimal::ZERO
    {
        let growth = Decimal::ONE + config.ebitdar_growth;
        let hold = config.hold_years;
        let mut flows: Vec<Money> = Vec::with_capacity(hold as usize + 1);
        flows.push(-equity_required);
        for year in 1..=hold {
            let year_noi = noi * growth.powd(Decimal::from(year - 1));
            let mut cash = year_noi - annual_interest;
            if year == hold {
                let exit_noi = noi * growth.powd(Decimal::from(year));
                let exit_value = exit_noi / summary.weighted_cap_rate;
                cash += exit_value - loan_amount;
            }
            flows.push(cash);
        }
        time_value::irr(&flows, dec!(0.10)).ok()
    } else {
        None
    };

    let preference = if year_one_return > dec!(0.12)
        && five_year_irr.is_some_and(|irr| irr > dec!(0.15))
    {
        FinancingPreference::Purchase
    } else if summary.portfolio_coverage_ratio < partner.economics.minimum_coverage {
        FinancingPreference::Lease
    } else {
        FinancingPreference::Either
    };

    BuyVsLease {
        loan_to_value: config.loan_to_value,
        interest_rate: config.interest_rate,
        loan_amount,
        equity_required,
        annual_interest,
        year_one_return,
        five_year_irr,
        preference,
    }
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Score the deal and derive the recommendation, negotiation bands, and
/// buy-vs-lease preference.
pub fn decide(
    summary: &PortfolioSummary,
    excluded_count: usize,
    sensitivity: &SensitivityAnalysis,
    partner: &PartnerProfile,
    config: &LeaseEngineConfig,
) -> DealDecision {
    let (positive_factors, negative_factors) =
        collect_factors(summary, excluded_count, sensitivity, partner, config);

    let positive_total: i32 = positive_factors.iter().map(|f| f.weight as i32).sum();
    let negative_total: i32 = negative_factors.iter().map(|f| f.weight as i32).sum();
    let net_score = positive_total - negative_total;

    let (recommendation, confidence) = recommendation_bands(net_score, negative_total);

    let risk_mitigations: Vec<String> = negative_factors
        .iter()
        .filter_map(|f| mitigation_for(&f.factor))
        .collect();

    // --- Negotiation bands: rent between target and minimum coverage ---
    let economics = &partner.economics;
    let ebitdar = summary.total_ebitdar;
    let (rent_low, rent_high) =
        if economics.target_coverage > Decimal::ZERO && economics.minimum_coverage > Decimal::ZERO
        {
            (
                ebitdar / economics.target_coverage,
                ebitdar / economics.minimum_coverage,
            )
        } else {
            (Decimal::ZERO, Decimal::ZERO)
        };
    let suggested_rent = PriceBand {
        low: rent_low,
        mid: (rent_low + rent_high) / dec!(2),
        high: rent_high,
    };
    let suggested_purchase_price = if economics.lease_yield > Decimal::ZERO {
        PriceBand {
            low: suggested_rent.low / economics.lease_yield,
            mid: suggested_rent.mid / economics.lease_yield,
            high: suggested_rent.high / economics.lease_yield,
        }
    } else {
        PriceBand {
            low: Decimal::ZERO,
            mid: Decimal::ZERO,
            high: Decimal::ZERO,
        }
    };

    let buy_vs_lease = buy_vs_lease(summary, partner, config);

    DealDecision {
        recommendation,
        confidence,
        net_score,
        positive_factors,
        negative_factors,
        risk_mitigations,
        suggested_purchase_price,
        suggested_rent,
        buy_vs_lease,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lease::engine::CoverageStatus;
    use pretty_assertions::assert_eq;

    fn summary(coverage: Decimal) -> PortfolioSummary {
        let rent = dec!(5000000);
        PortfolioSummary {
            facility_count: 5,
            total_beds: 600,
            total_revenue: dec!(60000000),
            total_ebitdar: coverage * rent,
            total_noi: dec!(6000000),
            total_purchase_price: dec!(60000000),
            total_annual_rent: rent,
            weighted_cap_rate: dec!(0.10),
            weighted_lease_yield: dec!(0.095),
            portfolio_coverage_ratio: coverage,
            coverage_status: CoverageStatus::Healthy,
            price_per_bed: dec!(100000),
            rent_per_bed: dec!(8333),
            average_occupancy: Some(dec!(0.88)),
            average_star_rating: Some(dec!(4.2)),
            health_score: dec!(95),
        }
    }

    fn sensitivity(cushion: Decimal) -> SensitivityAnalysis {
        SensitivityAnalysis {
            cap_rate_sweep: Vec::new(),
            noi_shock_sweep: Vec::new(),
            occupancy_sweep: Vec::new(),
            escalation_sweep: Vec::new(),
            break_even_occupancy: dec!(0.75),
            break_even_noi_decline: dec!(0.15),
            coverage_cushion: cushion,
        }
    }

    #[test]
    fn test_strong_deal_proceeds_high() {
        let decision = decide(
            &summary(dec!(1.6)),
            0,
            &sensitivity(dec!(0.23)),
            &PartnerProfile::default(),
            &LeaseEngineConfig::default(),
        );
        // coverage 8 + quality 6 + occupancy 5 + scale 4 = 23
        assert_eq!(decision.net_score, 23);
        assert_eq!(decision.recommendation, Recommendation::Proceed);
        assert_eq!(decision.confidence, DecisionConfidence::High);
        assert!(decision.negative_factors.is_empty());
    }

    #[test]
    fn test_weak_deal_passes() {
        let mut s = summary(dec!(1.0));
        s.average_star_rating = Some(dec!(2.0));
        s.average_occupancy = Some(dec!(0.70));
        s.total_beds = 200;
        let decision = decide(
            &s,
            2,
            &sensitivity(dec!(-0.23)),
            &PartnerProfile::default(),
            &LeaseEngineConfig::default(),
        );
        // negatives: coverage 9 + quality 7 + exclusions 5 + cushion 6 = 27
        assert_eq!(decision.net_score, -27);
        assert_eq!(decision.recommendation, Recommendation::Pass);
        assert_eq!(decision.confidence, DecisionConfidence::High);
        assert!(!decision.risk_mitigations.is_empty());
    }

    #[test]
    fn test_band_boundaries() {
        assert_eq!(
            recommendation_bands(15, 0),
            (Recommendation::Proceed, DecisionConfidence::High)
        );
        assert_eq!(
            recommendation_bands(5, 0),
            (Recommendation::Proceed, DecisionConfidence::Medium)
        );
        assert_eq!(
            recommendation_bands(-5, 10),
            (Recommendation::Negotiate, DecisionConfidence::Medium)
        );
        assert_eq!(
            recommendation_bands(-15, 20),
            (Recommendation::Negotiate, DecisionConfidence::Low)
        );
        assert_eq!(
            recommendation_bands(-16, 26),
            (Recommendation::Pass, DecisionConfidence::High)
        );
        assert_eq!(
            recommendation_bands(-16, 20),
            (Recommendation::Pass, DecisionConfidence::Medium)
        );
    }

    #[test]
    fn test_adding_negative_factor_never_improves_recommendation() {
        // Recommendation tier is monotone in the net score
        let mut previous = Recommendation::Proceed;
        for net in (-40..=40).rev() {
            let (rec, _) = recommendation_bands(net, 10);
            assert!(rec >= previous, "tier improved as net fell at {net}");
            previous = rec;
        }
    }

    #[test]
    fn test_rent_band_interpolates_coverage_targets() {
        let s = summary(dec!(1.45));
        let decision = decide(
            &s,
            0,
            &sensitivity(dec!(0.11)),
            &PartnerProfile::default(),
            &LeaseEngineConfig::default(),
        );
        // low rent holds the 1.5x target, high rent the 1.3x minimum
        assert_eq!(decision.suggested_rent.low, s.total_ebitdar / dec!(1.5));
        assert_eq!(decision.suggested_rent.high, s.total_ebitdar / dec!(1.3));
        assert!(decision.suggested_rent.low < decision.suggested_rent.high);
        assert_eq!(
            decision.suggested_purchase_price.mid,
            decision.suggested_rent.mid / dec!(0.095)
        );
    }

    #[test]
    fn test_buy_vs_lease_purchase_when_returns_clear_hurdles() {
        // 10% cap on a 70/30 structure at 7.5% interest:
        // y1 = (6M - 3.15M) / 18M = 15.8%, and exit at entry cap keeps the
        // IRR above 15%
        let decision = decide(
            &summary(dec!(1.6)),
            0,
            &sensitivity(dec!(0.23)),
            &PartnerProfile::default(),
            &LeaseEngineConfig::default(),
        );
        let bvl = &decision.buy_vs_lease;
        assert_eq!(bvl.loan_amount, dec!(42000000));
        assert_eq!(bvl.equity_required, dec!(18000000));
        assert_eq!(bvl.annual_interest, dec!(3150000));
        assert!(bvl.year_one_return > dec!(0.12));
        assert!(bvl.five_year_irr.unwrap() > dec!(0.15));
        assert_eq!(bvl.preference, FinancingPreference::Purchase);
    }

    #[test]
    fn test_buy_vs_lease_prefers_lease_below_minimum_coverage() {
        let mut s = summary(dec!(1.1));
        // Blunt the purchase case so the coverage rule decides
        s.total_noi = dec!(3500000);
        let decision = decide(
            &s,
            0,
            &sensitivity(dec!(-0.15)),
            &PartnerProfile::default(),
            &LeaseEngineConfig::default(),
        );
        assert_eq!(
            decision.buy_vs_lease.preference,
            FinancingPreference::Lease
        );
    }
}
