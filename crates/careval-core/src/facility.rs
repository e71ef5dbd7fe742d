use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::{AssetType, LocationType, Money, Rate};

/// Payer-mix percentages as fractions of revenue (0.25 = 25%).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PayerMix {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub medicare_pct: Option<Rate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub medicaid_pct: Option<Rate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub private_pct: Option<Rate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub other_pct: Option<Rate>,
}

/// Staffing metrics from payroll-based journal data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StaffingMetrics {
    /// Nursing hours per patient day
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hppd: Option<Decimal>,
    /// Agency labor as a fraction of total nursing hours
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agency_pct: Option<Rate>,
}

/// Regulatory survey and enforcement snapshot.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ComplianceSnapshot {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deficiency_count: Option<u32>,
    /// Special-focus-facility designation (or candidate status)
    pub special_focus: bool,
    /// Open immediate-jeopardy citation
    pub immediate_jeopardy: bool,
}

/// CMS-style star ratings, each 1-5.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StarRatings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub overall: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub staffing: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quality_measures: Option<u8>,
}

/// Immutable financial/operational snapshot of a single facility.
///
/// Created once per valuation run from normalized collaborator data and
/// never mutated mid-run. Monetary fields are trailing-twelve-month
/// absolute amounts; rates are fractions, not percentages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FacilityFinancialProfile {
    pub name: String,
    pub asset_type: AssetType,
    pub beds: u32,
    /// Two-letter state code
    pub state: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year_built: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<LocationType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revenue: Option<Money>,
    /// Earnings before interest, taxes, depreciation, amortization, and rent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ebitdar: Option<Money>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub noi: Option<Money>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub occupancy_rate: Option<Rate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payer_mix: Option<PayerMix>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub staffing: Option<StaffingMetrics>,
    #[serde(default)]
    pub compliance: ComplianceSnapshot,
    #[serde(default)]
    pub star_ratings: StarRatings,
    /// Estimated near-term capital expenditure requirement
    #[serde(skip_serializing_if = "Option::is_none")]
    pub capex_needs: Option<Money>,
}

impl FacilityFinancialProfile {
    /// Best available income figure for capitalisation: NOI, then EBITDAR.
    pub fn income_basis(&self) -> Option<Money> {
        self.noi.or(self.ebitdar)
    }
}

/// One facility's inputs for portfolio analysis: the financial profile
/// plus any standing obligations the acquirer inherits or replaces.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortfolioFacility {
    pub profile: FacilityFinancialProfile,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub existing_debt: Option<Money>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_rent: Option<Money>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_income_basis_prefers_noi() {
        let profile = FacilityFinancialProfile {
            name: "Maple Grove".into(),
            asset_type: AssetType::SkilledNursing,
            beds: 120,
            state: "OH".into(),
            year_built: Some(1998),
            location: Some(LocationType::Suburban),
            revenue: Some(dec!(12000000)),
            ebitdar: Some(dec!(1800000)),
            noi: Some(dec!(1500000)),
            occupancy_rate: Some(dec!(0.86)),
            payer_mix: None,
            staffing: None,
            compliance: ComplianceSnapshot::default(),
            star_ratings: StarRatings::default(),
            capex_needs: None,
        };
        assert_eq!(profile.income_basis(), Some(dec!(1500000)));
    }

    #[test]
    fn test_income_basis_falls_back_to_ebitdar() {
        let profile = FacilityFinancialProfile {
            name: "Maple Grove".into(),
            asset_type: AssetType::SkilledNursing,
            beds: 120,
            state: "OH".into(),
            year_built: None,
            location: None,
            revenue: None,
            ebitdar: Some(dec!(1800000)),
            noi: None,
            occupancy_rate: None,
            payer_mix: None,
            staffing: None,
            compliance: ComplianceSnapshot::default(),
            star_ratings: StarRatings::default(),
            capex_needs: None,
        };
        assert_eq!(profile.income_basis(), Some(dec!(1800000)));
    }

    #[test]
    fn test_profile_serde_round_trip() {
        let profile = FacilityFinancialProfile {
            name: "Cedar Court".into(),
            asset_type: AssetType::AssistedLiving,
            beds: 80,
            state: "TX".into(),
            year_built: Some(2010),
            location: Some(LocationType::Urban),
            revenue: Some(dec!(6500000)),
            ebitdar: Some(dec!(1400000)),
            noi: Some(dec!(1250000)),
            occupancy_rate: Some(dec!(0.91)),
            payer_mix: Some(PayerMix {
                medicare_pct: None,
                medicaid_pct: Some(dec!(0.10)),
                private_pct: Some(dec!(0.85)),
                other_pct: Some(dec!(0.05)),
            }),
            staffing: Some(StaffingMetrics {
                hppd: Some(dec!(3.6)),
                agency_pct: Some(dec!(0.04)),
            }),
            compliance: ComplianceSnapshot {
                deficiency_count: Some(3),
                special_focus: false,
                immediate_jeopardy: false,
            },
            star_ratings: StarRatings {
                overall: Some(4),
                staffing: Some(4),
                quality_measures: Some(5),
            },
            capex_needs: Some(dec!(400000)),
        };

        let json = serde_json::to_string(&profile).unwrap();
        let back: FacilityFinancialProfile = serde_json::from_str(&json).unwrap();
        assert_eq!(back.noi, profile.noi);
        assert_eq!(back.beds, profile.beds);
        assert_eq!(back.star_ratings.overall, Some(4));
    }
}
