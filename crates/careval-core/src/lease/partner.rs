//! Capital-partner underwriting profile: economics thresholds, master
//! lease terms, and the criteria facilities are screened against.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::types::Rate;

/// Return and coverage thresholds the partner underwrites to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PartnerEconomics {
    /// Going-in cap rate the partner prices acquisitions at
    pub target_cap_rate: Rate,
    /// Initial lease yield: rent = purchase price x lease yield
    pub lease_yield: Rate,
    /// Coverage at or above this is healthy
    pub target_coverage: Decimal,
    /// Coverage at or above this (but below target) is a warning
    pub warning_coverage: Decimal,
    /// Coverage below this fails underwriting
    pub minimum_coverage: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EscalationType {
    /// Fixed annual escalator
    Fixed,
    /// CPI-linked with a floor; modeled at the greater of the assumed CPI
    /// and the floor
    CpiWithFloor,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeaseTerms {
    pub initial_term_years: u32,
    pub renewal_options: u32,
    pub renewal_term_years: u32,
    pub escalation_type: EscalationType,
    /// Fixed escalator, or the assumed CPI for CPI-linked leases
    pub escalation_rate: Rate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub escalation_floor: Option<Rate>,
}

impl LeaseTerms {
    /// Escalator actually applied each year.
    pub fn effective_escalation(&self) -> Rate {
        match self.escalation_type {
            EscalationType::Fixed => self.escalation_rate,
            EscalationType::CpiWithFloor => match self.escalation_floor {
                Some(floor) => self.escalation_rate.max(floor),
                None => self.escalation_rate,
            },
        }
    }

    pub fn total_potential_years(&self) -> u32 {
        self.initial_term_years + self.renewal_options * self.renewal_term_years
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DealStructure {
    /// Every facility trades together
    AllOrNothing,
    /// Facilities can be carved out individually
    FacilityByFacility,
}

/// Screening criteria. Blocker-class checks exclude a facility outright;
/// the rest are advisory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnderwritingCriteria {
    /// Minimum number of facilities for the deal to make sense
    pub min_facilities: u32,
    /// Cap on facilities that may be carved out of the deal
    pub max_excluded_facilities: u32,
    pub allow_partial_exclusion: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_occupancy: Option<Rate>,
    /// Occupancy below this is a blocker, not just advisory
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hard_min_occupancy: Option<Rate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_overall_star: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_deficiencies: Option<u32>,
    pub exclude_special_focus: bool,
    pub exclude_immediate_jeopardy: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_ebitdar_margin: Option<Rate>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PartnerProfile {
    pub name: String,
    pub economics: PartnerEconomics,
    pub lease_terms: LeaseTerms,
    pub deal_structure: DealStructure,
    pub underwriting: UnderwritingCriteria,
}

impl Default for PartnerProfile {
    fn default() -> Self {
        PartnerProfile {
            name: "Default Partner".into(),
            economics: PartnerEconomics {
                target_cap_rate: dec!(0.09),
                lease_yield: dec!(0.095),
                target_coverage: dec!(1.5),
                warning_coverage: dec!(1.4),
                minimum_coverage: dec!(1.3),
            },
            lease_terms: LeaseTerms {
                initial_term_years: 15,
                renewal_options: 2,
                renewal_term_years: 5,
                escalation_type: EscalationType::Fixed,
                escalation_rate: dec!(0.025),
                escalation_floor: None,
            },
            deal_structure: DealStructure::FacilityByFacility,
            underwriting: UnderwritingCriteria {
                min_facilities: 3,
                max_excluded_facilities: 2,
                allow_partial_exclusion: true,
                min_occupancy: Some(dec!(0.80)),
                hard_min_occupancy: Some(dec!(0.60)),
                min_overall_star: Some(2),
                max_deficiencies: Some(15),
                exclude_special_focus: true,
                exclude_immediate_jeopardy: false,
                min_ebitdar_margin: Some(dec!(0.10)),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_total_potential_years() {
        let terms = PartnerProfile::default().lease_terms;
        // 15 initial + 2 x 5 renewal
        assert_eq!(terms.total_potential_years(), 25);
    }

    #[test]
    fn test_cpi_floor_binds() {
        let mut terms = PartnerProfile::default().lease_terms;
        terms.escalation_type = EscalationType::CpiWithFloor;
        terms.escalation_rate = dec!(0.015);
        terms.escalation_floor = Some(dec!(0.02));
        assert_eq!(terms.effective_escalation(), dec!(0.02));

        terms.escalation_rate = dec!(0.03);
        assert_eq!(terms.effective_escalation(), dec!(0.03));
    }

    #[test]
    fn test_fixed_ignores_floor() {
        let mut terms = PartnerProfile::default().lease_terms;
        terms.escalation_floor = Some(dec!(0.05));
        assert_eq!(terms.effective_escalation(), dec!(0.025));
    }
}
