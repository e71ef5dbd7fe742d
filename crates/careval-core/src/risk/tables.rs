//! Adjustment tables for the risk engine. All thresholds are ordered
//! bracket arrays resolved by `tables::resolve_bracket`, injected as one
//! configuration struct so alternate tables can be substituted in tests.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::tables::Bracket;
use crate::types::{AssetType, LocationType, Rate, SupplyDemandSignal};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskTables {
    /// Baseline cap rate per asset class for a stabilized asset
    pub snf_baseline_cap_rate: Rate,
    pub al_baseline_cap_rate: Rate,
    pub il_baseline_cap_rate: Rate,
    /// Basis points by star rating, index = star - 1
    pub overall_star_bps: [i32; 5],
    pub staffing_star_bps: [i32; 5],
    pub quality_star_bps: [i32; 5],
    pub occupancy_bps: Vec<Bracket<i32>>,
    pub agency_pct_bps: Vec<Bracket<i32>>,
    /// Staffing floor in nursing hours per patient day
    pub minimum_hppd: Decimal,
    pub below_min_hppd_bps: i32,
    pub at_or_above_min_hppd_bps: i32,
    pub medicare_pct_bps: Vec<Bracket<i32>>,
    pub immediate_jeopardy_bps: i32,
    pub special_focus_bps: i32,
    pub deficiency_count_bps: Vec<Bracket<i32>>,
    pub building_age_bps: Vec<Bracket<i32>>,
    pub capex_per_bed_bps: Vec<Bracket<i32>>,
    /// States with a regulatory environment priced off the baseline
    pub state_bps: Vec<(String, i32)>,
    pub urban_bps: i32,
    pub suburban_bps: i32,
    pub rural_bps: i32,
    pub undersupplied_bps: i32,
    pub balanced_bps: i32,
    pub oversupplied_bps: i32,
    /// Hard floor for any computed cap rate
    pub cap_rate_floor: Rate,
}

impl RiskTables {
    pub fn baseline_cap_rate(&self, asset_type: AssetType) -> Rate {
        match asset_type {
            AssetType::SkilledNursing => self.snf_baseline_cap_rate,
            AssetType::AssistedLiving => self.al_baseline_cap_rate,
            AssetType::IndependentLiving => self.il_baseline_cap_rate,
        }
    }

    pub fn location_bps(&self, location: LocationType) -> i32 {
        match location {
            LocationType::Urban => self.urban_bps,
            LocationType::Suburban => self.suburban_bps,
            LocationType::Rural => self.rural_bps,
        }
    }

    pub fn market_signal_bps(&self, signal: SupplyDemandSignal) -> i32 {
        match signal {
            SupplyDemandSignal::Undersupplied => self.undersupplied_bps,
            SupplyDemandSignal::Balanced => self.balanced_bps,
            SupplyDemandSignal::Oversupplied => self.oversupplied_bps,
        }
    }

    pub fn state_regulatory_bps(&self, state: &str) -> i32 {
        self.state_bps
            .iter()
            .find(|(s, _)| s.eq_ignore_ascii_case(state))
            .map(|(_, bps)| *bps)
            .unwrap_or(0)
    }
}

impl Default for RiskTables {
    fn default() -> Self {
        RiskTables {
            snf_baseline_cap_rate: dec!(0.125),
            al_baseline_cap_rate: dec!(0.08),
            il_baseline_cap_rate: dec!(0.07),
            overall_star_bps: [100, 50, 0, -25, -50],
            staffing_star_bps: [50, 25, 0, -10, -25],
            quality_star_bps: [40, 20, 0, -10, -20],
            occupancy_bps: vec![
                Bracket::upto(dec!(0.70), 100),
                Bracket::upto(dec!(0.80), 50),
                Bracket::upto(dec!(0.85), 25),
                Bracket::upto(dec!(0.92), 0),
                Bracket::otherwise(-25),
            ],
            agency_pct_bps: vec![
                Bracket::upto(dec!(0.05), -10),
                Bracket::upto(dec!(0.15), 25),
                Bracket::upto(dec!(0.25), 50),
                Bracket::otherwise(75),
            ],
            minimum_hppd: dec!(3.2),
            below_min_hppd_bps: 50,
            at_or_above_min_hppd_bps: -10,
            medicare_pct_bps: vec![
                Bracket::upto(dec!(0.10), 25),
                Bracket::upto(dec!(0.20), 0),
                Bracket::upto(dec!(0.30), -25),
                Bracket::otherwise(-50),
            ],
            immediate_jeopardy_bps: 150,
            special_focus_bps: 200,
            deficiency_count_bps: vec![
                Bracket::upto(dec!(0), -25),
                Bracket::upto(dec!(5), 0),
                Bracket::upto(dec!(10), 25),
                Bracket::upto(dec!(20), 75),
                Bracket::otherwise(125),
            ],
            building_age_bps: vec![
                Bracket::upto(dec!(10), -25),
                Bracket::upto(dec!(20), 0),
                Bracket::upto(dec!(30), 25),
                Bracket::upto(dec!(40), 50),
                Bracket::otherwise(75),
            ],
            capex_per_bed_bps: vec![
                Bracket::upto(dec!(1000), -10),
                Bracket::upto(dec!(3000), 0),
                Bracket::upto(dec!(7500), 25),
                Bracket::otherwise(75),
            ],
            state_bps: vec![
                ("NY".into(), 50),
                ("CA".into(), 50),
                ("IL".into(), 25),
                ("NJ".into(), 25),
                ("FL".into(), 0),
                ("TX".into(), -25),
                ("OH".into(), 0),
            ],
            urban_bps: -25,
            suburban_bps: 0,
            rural_bps: 50,
            undersupplied_bps: -50,
            balanced_bps: 0,
            oversupplied_bps: 75,
            cap_rate_floor: dec!(0.01),
        }
    }
}
