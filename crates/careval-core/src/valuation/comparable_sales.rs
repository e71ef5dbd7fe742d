use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::CarevalError;
use crate::facility::FacilityFinancialProfile;
use crate::tables::{resolve_bracket, Bracket};
use crate::types::{AssetType, Money, Rate};
use crate::CarevalResult;

use super::{
    clamp_confidence, AssumptionSource, MethodKind, ValuationAssumption, ValuationCalculation,
    ValuationMethod, ValuationOptions, ValuationResult,
};

const DEFAULT_MAX_AGE_DAYS: i64 = 730;
const DEFAULT_MIN_COMPARABLES: usize = 3;
const MAX_SELECTED: usize = 10;

/// A closed market transaction used for the sales-comparison approach.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComparableSale {
    pub name: String,
    pub asset_type: AssetType,
    pub state: String,
    pub beds: u32,
    pub sale_price: Money,
    pub sale_date: NaiveDate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub occupancy_rate: Option<Rate>,
}

impl ComparableSale {
    pub fn price_per_bed(&self) -> Option<Money> {
        if self.beds == 0 {
            None
        } else {
            Some(self.sale_price / Decimal::from(self.beds))
        }
    }
}

/// Sales comparison: similarity-scored, recency-weighted average price per
/// bed across qualifying comparables.
pub struct ComparableSalesMethod;

struct ScoredComparable<'a> {
    comp: &'a ComparableSale,
    price_per_bed: Money,
    similarity: Decimal,
    age_days: i64,
    weight: Decimal,
}

/// Fixed point deductions off a 100-point similarity score.
fn score_comparable(
    subject: &FacilityFinancialProfile,
    comp: &ComparableSale,
    age_days: i64,
) -> Decimal {
    let mut deductions: i32 = 0;

    if comp.asset_type != subject.asset_type {
        deductions += 25;
    }
    if !comp.state.eq_ignore_ascii_case(&subject.state) {
        deductions += 10;
    }

    // Bed-count divergence relative to the subject
    if subject.beds > 0 {
        let divergence = (Decimal::from(comp.beds) - Decimal::from(subject.beds)).abs()
            / Decimal::from(subject.beds);
        let table = [
            Bracket::upto(dec!(0.10), 0),
            Bracket::upto(dec!(0.25), 5),
            Bracket::upto(dec!(0.50), 15),
            Bracket::otherwise(25),
        ];
        deductions += resolve_bracket(&table, divergence).unwrap_or(0);
    }

    // Sale age
    let age_table = [
        Bracket::upto(dec!(180), 0),
        Bracket::upto(dec!(365), 5),
        Bracket::upto(dec!(545), 10),
        Bracket::otherwise(15),
    ];
    deductions += resolve_bracket(&age_table, Decimal::from(age_days)).unwrap_or(0);

    // Occupancy divergence, when both sides report it
    if let (Some(subj_occ), Some(comp_occ)) = (subject.occupancy_rate, comp.occupancy_rate) {
        let gap = (subj_occ - comp_occ).abs();
        let table = [
            Bracket::upto(dec!(0.05), 0),
            Bracket::upto(dec!(0.10), 5),
            Bracket::otherwise(10),
        ];
        deductions += resolve_bracket(&table, gap).unwrap_or(0);
    }

    (dec!(100) - Decimal::from(deductions)).max(Decimal::ZERO)
}

impl ValuationMethod for ComparableSalesMethod {
    fn kind(&self) -> MethodKind {
        MethodKind::ComparableSales
    }

    fn evaluate(
        &self,
        profile: &FacilityFinancialProfile,
        options: &ValuationOptions,
    ) -> CarevalResult<ValuationResult> {
        if profile.beds == 0 {
            return Err(CarevalError::InvalidInput {
                field: "beds".into(),
                reason: "Bed count must be positive for the comparable-sales method".into(),
            });
        }
        let min_comparables = options.min_comparables.unwrap_or(DEFAULT_MIN_COMPARABLES);
        if options.comparables.is_empty() {
            return Err(CarevalError::MissingInput {
                field: "comparables".into(),
                reason: format!("comparable-sales method requires at least {min_comparables} comparable sales"),
            });
        }

        let max_age_days = options
            .max_comparable_age_days
            .unwrap_or(DEFAULT_MAX_AGE_DAYS);

        // Analysis date: explicit, else the latest sale date in the set
        let (as_of, as_of_source) = match options.as_of {
            Some(date) => (date, AssumptionSource::Provided),
            None => {
                let latest = options
                    .comparables
                    .iter()
                    .map(|c| c.sale_date)
                    .max()
                    .expect("non-empty comparable set");
                (latest, AssumptionSource::Assumed)
            }
        };

        let mut notes = Vec::new();
        let mut scored: Vec<ScoredComparable<'_>> = Vec::new();

        let use_similarity = options.use_similarity_weighting.unwrap_or(true);
        let use_recency = options.use_recency_decay.unwrap_or(true);

        for comp in &options.comparables {
            let age_days = (as_of - comp.sale_date).num_days().max(0);
            if age_days > max_age_days {
                notes.push(format!(
                    "{}: sale is {age_days} days old, beyond the {max_age_days}-day window",
                    comp.name
                ));
                continue;
            }
            let Some(ppb) = comp.price_per_bed() else {
                notes.push(format!("{}: zero bed count, excluded", comp.name));
                continue;
            };

            let similarity = score_comparable(profile, comp, age_days);
            let similarity_factor = if use_similarity {
                similarity / dec!(100)
            } else {
                Decimal::ONE
            };
            // Linear decay from 1.0 at the analysis date to 0.5 at the window edge
            let recency_factor = if use_recency {
                Decimal::ONE - Decimal::from(age_days) / Decimal::from(2 * max_age_days)
            } else {
                Decimal::ONE
            };
            scored.push(ScoredComparable {
                comp,
                price_per_bed: ppb,
                similarity,
                age_days,
                weight: similarity_factor * recency_factor,
            });
        }

        // Top-weighted comparables, capped at MAX_SELECTED
        scored.sort_by(|a, b| b.weight.cmp(&a.weight));
        scored.truncate(MAX_SELECTED);

        if scored.len() < min_comparables {
            return Err(CarevalError::InsufficientData(format!(
                "only {} qualifying comparables after filtering; {min_comparables} required",
                scored.len()
            )));
        }

        let total_weight: Decimal = scored.iter().map(|s| s.weight).sum();
        let weighted_ppb = if total_weight.is_zero() {
            // All weights zeroed out by similarity: fall back to a simple mean
            notes.push("All comparable weights were zero; unweighted average used".into());
            scored.iter().map(|s| s.price_per_bed).sum::<Decimal>()
                / Decimal::from(scored.len() as u32)
        } else {
            scored
                .iter()
                .map(|s| s.price_per_bed * s.weight)
                .sum::<Decimal>()
                / total_weight
        };

        let beds = Decimal::from(profile.beds);
        let value = beds * weighted_ppb;
        let min_ppb = scored
            .iter()
            .map(|s| s.price_per_bed)
            .min()
            .expect("non-empty selection");
        let max_ppb = scored
            .iter()
            .map(|s| s.price_per_bed)
            .max()
            .expect("non-empty selection");

        let mut calculations: Vec<ValuationCalculation> = scored
            .iter()
            .map(|s| ValuationCalculation {
                label: format!("Comparable: {}", s.comp.name),
                formula: None,
                value: s.price_per_bed,
                details: Some(format!(
                    "similarity {}, age {} days, weight {}",
                    s.similarity, s.age_days, s.weight
                )),
            })
            .collect();
        calculations.push(ValuationCalculation {
            label: "Weighted average price per bed".into(),
            formula: Some("sum(weight x PPB) / sum(weight)".into()),
            value: weighted_ppb,
            details: None,
        });
        calculations.push(ValuationCalculation {
            label: "Indicated value".into(),
            formula: Some("beds x weighted average PPB".into()),
            value,
            details: None,
        });

        let avg_similarity: Decimal = scored.iter().map(|s| s.similarity).sum::<Decimal>()
            / Decimal::from(scored.len() as u32);
        let confidence = clamp_confidence(
            dec!(45) + Decimal::from(scored.len() as u32) * dec!(2) + avg_similarity / dec!(5),
            dec!(40),
            dec!(90),
        );

        let assumptions = vec![
            ValuationAssumption {
                field: "as_of".into(),
                value: Decimal::from(as_of.num_days_from_ce()),
                source: as_of_source,
                description: format!("Analysis date {as_of}"),
            },
            ValuationAssumption {
                field: "max_comparable_age_days".into(),
                value: Decimal::from(max_age_days),
                source: if options.max_comparable_age_days.is_some() {
                    AssumptionSource::Provided
                } else {
                    AssumptionSource::Assumed
                },
                description: "Comparable recency window".into(),
            },
        ];

        Ok(ValuationResult {
            method: MethodKind::ComparableSales,
            value,
            value_low: beds * min_ppb,
            value_high: beds * max_ppb,
            confidence,
            assumptions,
            calculations,
            notes,
            inputs_used: vec!["beds".into(), "comparables".into()],
        })
    }
}
