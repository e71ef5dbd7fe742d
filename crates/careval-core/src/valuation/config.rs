//! Engine defaults for the valuation methods.
//!
//! Every constant a method falls back on lives here as an injectable
//! configuration struct, so tests (and callers with better market data)
//! can substitute alternate tables deterministically.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::types::{AssetType, Money, Multiple, Rate};

/// Per-asset-class market defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetDefaults {
    /// Market capitalisation rate for a stabilized 3-star asset
    pub base_cap_rate: Rate,
    /// Sector-average occupancy, the anchor for occupancy value adjustments
    pub avg_occupancy: Rate,
    /// NOI as a fraction of revenue, used only when NOI and EBITDAR are absent
    pub noi_margin: Rate,
    /// National average price per bed/unit
    pub price_per_bed: Money,
    /// Long-run NOI growth
    pub noi_growth: Rate,
    /// Unlevered discount rate for DCF
    pub discount_rate: Rate,
    /// Exit capitalisation rate for DCF terminal value
    pub terminal_cap_rate: Rate,
    /// Heuristic NOI multiple
    pub noi_multiple: Multiple,
}

/// Injected defaults shared by all valuation methods.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MethodDefaults {
    pub skilled_nursing: AssetDefaults,
    pub assisted_living: AssetDefaults,
    pub independent_living: AssetDefaults,
    /// Cap-rate adjustment in basis points by overall star rating (index = star - 1)
    pub star_cap_rate_bps: [i32; 5],
    /// Price-per-bed multiplier by overall star rating (index = star - 1)
    pub star_value_multiplier: [Decimal; 5],
    /// Price-per-bed multipliers for states that trade away from the national average
    pub state_price_multipliers: Vec<(String, Decimal)>,
    /// Value discount per year of building age beyond the threshold
    pub age_discount_per_year: Rate,
    pub age_discount_threshold_years: i32,
    /// Maximum total age discount
    pub age_discount_cap: Rate,
    /// Value change per unit of occupancy deviation (2.0 = 2% value per 1% occupancy)
    pub occupancy_value_sensitivity: Decimal,
    /// Default symmetric range around the adjusted price per bed
    pub ppb_range_pct: Rate,
    /// Symmetric cap-rate shock for the income-method range, in basis points
    pub cap_rate_range_bps: u32,
}

impl MethodDefaults {
    pub fn asset(&self, asset_type: AssetType) -> &AssetDefaults {
        match asset_type {
            AssetType::SkilledNursing => &self.skilled_nursing,
            AssetType::AssistedLiving => &self.assisted_living,
            AssetType::IndependentLiving => &self.independent_living,
        }
    }

    pub fn state_multiplier(&self, state: &str) -> Option<Decimal> {
        self.state_price_multipliers
            .iter()
            .find(|(s, _)| s.eq_ignore_ascii_case(state))
            .map(|(_, m)| *m)
    }
}

impl Default for MethodDefaults {
    fn default() -> Self {
        MethodDefaults {
            skilled_nursing: AssetDefaults {
                base_cap_rate: dec!(0.125),
                avg_occupancy: dec!(0.82),
                noi_margin: dec!(0.11),
                price_per_bed: dec!(85000),
                noi_growth: dec!(0.02),
                discount_rate: dec!(0.13),
                terminal_cap_rate: dec!(0.13),
                noi_multiple: dec!(8),
            },
            assisted_living: AssetDefaults {
                base_cap_rate: dec!(0.08),
                avg_occupancy: dec!(0.86),
                noi_margin: dec!(0.25),
                price_per_bed: dec!(160000),
                noi_growth: dec!(0.03),
                discount_rate: dec!(0.105),
                terminal_cap_rate: dec!(0.085),
                noi_multiple: dec!(11),
            },
            independent_living: AssetDefaults {
                base_cap_rate: dec!(0.07),
                avg_occupancy: dec!(0.90),
                noi_margin: dec!(0.28),
                price_per_bed: dec!(140000),
                noi_growth: dec!(0.03),
                discount_rate: dec!(0.095),
                terminal_cap_rate: dec!(0.075),
                noi_multiple: dec!(12),
            },
            star_cap_rate_bps: [100, 50, 0, -25, -75],
            star_value_multiplier: [dec!(0.85), dec!(0.92), dec!(1.00), dec!(1.08), dec!(1.15)],
            state_price_multipliers: vec![
                ("CA".into(), dec!(1.25)),
                ("NY".into(), dec!(1.20)),
                ("MA".into(), dec!(1.15)),
                ("WA".into(), dec!(1.10)),
                ("FL".into(), dec!(1.05)),
                ("TX".into(), dec!(0.95)),
                ("OH".into(), dec!(0.92)),
                ("OK".into(), dec!(0.85)),
            ],
            age_discount_per_year: dec!(0.005),
            age_discount_threshold_years: 30,
            age_discount_cap: dec!(0.20),
            occupancy_value_sensitivity: dec!(2.0),
            ppb_range_pct: dec!(0.15),
            cap_rate_range_bps: 100,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_asset_lookup() {
        let defaults = MethodDefaults::default();
        assert_eq!(
            defaults.asset(AssetType::SkilledNursing).base_cap_rate,
            dec!(0.125)
        );
        assert_eq!(
            defaults.asset(AssetType::IndependentLiving).base_cap_rate,
            dec!(0.07)
        );
    }

    #[test]
    fn test_state_multiplier_case_insensitive() {
        let defaults = MethodDefaults::default();
        assert_eq!(defaults.state_multiplier("ca"), Some(dec!(1.25)));
        assert_eq!(defaults.state_multiplier("ZZ"), None);
    }
}
