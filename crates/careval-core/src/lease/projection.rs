//! Multi-phase lease cash-flow projection: compounding escalation over the
//! initial term and every renewal option, discounted to present value.

use rust_decimal::Decimal;
use rust_decimal::MathematicalOps;
use serde::{Deserialize, Serialize};

use crate::types::{Money, Rate};

use super::partner::LeaseTerms;
use super::LeaseEngineConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LeasePhase {
    Initial,
    /// 1-based renewal option index
    Renewal(u32),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct YearProjection {
    /// 1-based lease year
    pub year: u32,
    pub phase: LeasePhase,
    pub annual_rent: Money,
    pub cumulative_rent: Money,
    pub discount_factor: Rate,
    pub present_value: Money,
    pub projected_ebitdar: Money,
    /// Projected EBITDAR / escalated rent
    pub coverage_ratio: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeaseProjection {
    pub years: Vec<YearProjection>,
    pub total_years: u32,
    pub escalation_rate: Rate,
    /// Undiscounted rent over the full potential term
    pub total_rent: Money,
    /// Sum of each year's present value
    pub lease_npv: Money,
    /// Present value of the renewal-phase years only
    pub renewal_option_value: Money,
}

/// Project rent, coverage, and present value for every potential lease
/// year. Pure and deterministic; one sequence per analysis.
pub fn project_lease(
    base_rent: Money,
    base_ebitdar: Money,
    terms: &LeaseTerms,
    config: &LeaseEngineConfig,
) -> LeaseProjection {
    let escalation = terms.effective_escalation();
    let total_years = terms.total_potential_years();
    let one_plus_esc = Decimal::ONE + escalation;
    let one_plus_growth = Decimal::ONE + config.ebitdar_growth;
    let one_plus_disc = Decimal::ONE + config.discount_rate;

    let mut years = Vec::with_capacity(total_years as usize);
    let mut cumulative_rent = Decimal::ZERO;
    let mut lease_npv = Decimal::ZERO;
    let mut renewal_option_value = Decimal::ZERO;

    for year in 1..=total_years {
        let phase = if year <= terms.initial_term_years {
            LeasePhase::Initial
        } else {
            LeasePhase::Renewal((year - terms.initial_term_years - 1) / terms.renewal_term_years + 1)
        };

        let annual_rent = base_rent * one_plus_esc.powd(Decimal::from(year - 1));
        cumulative_rent += annual_rent;

        let discount_factor = Decimal::ONE / one_plus_disc.powd(Decimal::from(year));
        let present_value = annual_rent * discount_factor;
        lease_npv += present_value;
        if !matches!(phase, LeasePhase::Initial) {
            renewal_option_value += present_value;
        }

        let projected_ebitdar = base_ebitdar * one_plus_growth.powd(Decimal::from(year - 1));
        let coverage_ratio = if annual_rent.is_zero() {
            Decimal::ZERO
        } else {
            projected_ebitdar / annual_rent
        };

        years.push(YearProjection {
            year,
            phase,
            annual_rent,
            cumulative_rent,
            discount_factor,
            present_value,
            projected_ebitdar,
            coverage_ratio,
        });
    }

    LeaseProjection {
        years,
        total_years,
        escalation_rate: escalation,
        total_rent: cumulative_rent,
        lease_npv,
        renewal_option_value,
    }
}
