//! Independent valuation methods.
//!
//! Each method is a pure function from a facility snapshot plus options to
//! a [`ValuationResult`] carrying its own provenance trail. Methods share
//! the [`ValuationMethod`] capability so the reconciler can iterate a list
//! without knowing concrete identities.

pub mod cap_rate;
pub mod comparable_sales;
pub mod config;
pub mod dcf;
pub mod noi_multiple;
pub mod price_per_bed;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::facility::FacilityFinancialProfile;
use crate::types::{Money, Multiple, Rate};
use crate::CarevalResult;

pub use cap_rate::CapRateMethod;
pub use comparable_sales::{ComparableSale, ComparableSalesMethod};
pub use config::{AssetDefaults, MethodDefaults};
pub use dcf::DcfMethod;
pub use noi_multiple::NoiMultipleMethod;
pub use price_per_bed::PricePerBedMethod;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Identity of a valuation method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MethodKind {
    CapRate,
    PricePerBed,
    ComparableSales,
    DiscountedCashFlow,
    NoiMultiple,
}

impl std::fmt::Display for MethodKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MethodKind::CapRate => write!(f, "Direct Capitalization"),
            MethodKind::PricePerBed => write!(f, "Price per Bed"),
            MethodKind::ComparableSales => write!(f, "Comparable Sales"),
            MethodKind::DiscountedCashFlow => write!(f, "Discounted Cash Flow"),
            MethodKind::NoiMultiple => write!(f, "NOI Multiple"),
        }
    }
}

/// Where an assumption's value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AssumptionSource {
    /// Supplied directly by the caller
    Provided,
    /// Taken from supplied market data
    Market,
    /// Computed from other supplied fields
    Derived,
    /// Engine default
    Assumed,
}

/// Append-only provenance record for one input a method relied on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValuationAssumption {
    pub field: String,
    pub value: Decimal,
    pub source: AssumptionSource,
    pub description: String,
}

/// One step of the ordered calculation audit trail. Reproducible
/// byte-for-byte from the same inputs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValuationCalculation {
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub formula: Option<String>,
    pub value: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Read-only output of exactly one valuation method.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValuationResult {
    pub method: MethodKind,
    pub value: Money,
    pub value_low: Money,
    pub value_high: Money,
    /// 0-100
    pub confidence: Decimal,
    pub assumptions: Vec<ValuationAssumption>,
    pub calculations: Vec<ValuationCalculation>,
    pub notes: Vec<String>,
    pub inputs_used: Vec<String>,
}

/// Overrides and method-specific inputs for a valuation run. Anything left
/// unset falls back to [`MethodDefaults`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValuationOptions {
    #[serde(default)]
    pub defaults: MethodDefaults,
    /// Explicit cap-rate override (highest resolution priority)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cap_rate_override: Option<Rate>,
    /// Cap rate observed in the subject's market
    #[serde(skip_serializing_if = "Option::is_none")]
    pub market_cap_rate: Option<Rate>,
    /// Base price per bed override
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_per_bed: Option<Money>,
    /// Explicit price-per-bed range bounds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_per_bed_low: Option<Money>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_per_bed_high: Option<Money>,
    /// Comparable sales for the sales-comparison method
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub comparables: Vec<ComparableSale>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_comparables: Option<usize>,
    /// Maximum comparable sale age in days (default 730)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_comparable_age_days: Option<i64>,
    /// Analysis date for comparable recency. Defaults to the most recent
    /// sale date in the comparable set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub as_of: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub use_similarity_weighting: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub use_recency_decay: Option<bool>,
    /// DCF explicit forecast period (default 10)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub forecast_years: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub noi_growth_rate: Option<Rate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revenue_growth_rate: Option<Rate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expense_growth_rate: Option<Rate>,
    /// Trailing operating expenses; with revenue present, lets the DCF
    /// project revenue and expenses separately
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operating_expenses: Option<Money>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discount_rate: Option<Rate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub terminal_cap_rate: Option<Rate>,
    /// NOI multiple; supplying it also opts the multiple method into
    /// reconciliation runs
    #[serde(skip_serializing_if = "Option::is_none")]
    pub noi_multiple: Option<Multiple>,
    /// Year the valuation is performed, for building-age adjustments
    #[serde(skip_serializing_if = "Option::is_none")]
    pub valuation_year: Option<i32>,
}

// ---------------------------------------------------------------------------
// Capability
// ---------------------------------------------------------------------------

/// Common capability implemented by every valuation method.
pub trait ValuationMethod {
    fn kind(&self) -> MethodKind;

    fn evaluate(
        &self,
        profile: &FacilityFinancialProfile,
        options: &ValuationOptions,
    ) -> CarevalResult<ValuationResult>;
}

// ---------------------------------------------------------------------------
// Shared helpers
// ---------------------------------------------------------------------------

/// Resolved income figure with its provenance.
#[derive(Debug)]
pub(crate) struct ResolvedIncome {
    pub noi: Money,
    pub source: AssumptionSource,
    pub field: &'static str,
    pub description: String,
}

/// Resolve the income basis for capitalisation-style methods:
/// explicit NOI, then EBITDAR, then revenue at the asset-type margin.
pub(crate) fn resolve_income(
    profile: &FacilityFinancialProfile,
    options: &ValuationOptions,
) -> CarevalResult<ResolvedIncome> {
    if let Some(noi) = profile.noi {
        return Ok(ResolvedIncome {
            noi,
            source: AssumptionSource::Provided,
            field: "noi",
            description: "Trailing NOI as provided".into(),
        });
    }
    if let Some(ebitdar) = profile.ebitdar {
        return Ok(ResolvedIncome {
            noi: ebitdar,
            source: AssumptionSource::Derived,
            field: "ebitdar",
            description: "EBITDAR used as NOI proxy".into(),
        });
    }
    if let Some(revenue) = profile.revenue {
        let margin = options.defaults.asset(profile.asset_type).noi_margin;
        return Ok(ResolvedIncome {
            noi: revenue * margin,
            source: AssumptionSource::Assumed,
            field: "revenue",
            description: format!("NOI estimated at {margin} of revenue"),
        });
    }
    Err(crate::CarevalError::MissingInput {
        field: "noi".into(),
        reason: "requires NOI, EBITDAR, or revenue".into(),
    })
}

/// Clamp a confidence score to the given band.
pub(crate) fn clamp_confidence(confidence: Decimal, low: Decimal, high: Decimal) -> Decimal {
    confidence.clamp(low, high)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::facility::{ComplianceSnapshot, StarRatings};
    use crate::types::AssetType;
    use rust_decimal_macros::dec;

    fn bare_profile() -> FacilityFinancialProfile {
        FacilityFinancialProfile {
            name: "Test".into(),
            asset_type: AssetType::SkilledNursing,
            beds: 100,
            state: "OH".into(),
            year_built: None,
            location: None,
            revenue: None,
            ebitdar: None,
            noi: None,
            occupancy_rate: None,
            payer_mix: None,
            staffing: None,
            compliance: ComplianceSnapshot::default(),
            star_ratings: StarRatings::default(),
            capex_needs: None,
        }
    }

    #[test]
    fn test_resolve_income_priority() {
        let options = ValuationOptions::default();
        let mut profile = bare_profile();
        profile.revenue = Some(dec!(10000000));
        profile.ebitdar = Some(dec!(1500000));
        profile.noi = Some(dec!(1200000));

        let resolved = resolve_income(&profile, &options).unwrap();
        assert_eq!(resolved.noi, dec!(1200000));
        assert_eq!(resolved.source, AssumptionSource::Provided);

        profile.noi = None;
        let resolved = resolve_income(&profile, &options).unwrap();
        assert_eq!(resolved.noi, dec!(1500000));
        assert_eq!(resolved.source, AssumptionSource::Derived);

        profile.ebitdar = None;
        let resolved = resolve_income(&profile, &options).unwrap();
        // 10M revenue * 0.11 SNF margin
        assert_eq!(resolved.noi, dec!(1100000));
        assert_eq!(resolved.source, AssumptionSource::Assumed);
    }

    #[test]
    fn test_resolve_income_missing() {
        let options = ValuationOptions::default();
        let profile = bare_profile();
        let err = resolve_income(&profile, &options).unwrap_err();
        assert!(err.to_string().contains("noi"));
    }

    #[test]
    fn test_clamp_confidence() {
        assert_eq!(
            clamp_confidence(dec!(120), dec!(40), dec!(100)),
            dec!(100)
        );
        assert_eq!(clamp_confidence(dec!(10), dec!(40), dec!(100)), dec!(40));
        assert_eq!(clamp_confidence(dec!(75), dec!(40), dec!(100)), dec!(75));
    }
}
