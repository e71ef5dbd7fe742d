use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// All monetary values. Wraps Decimal to prevent accidental f64 usage.
pub type Money = Decimal;

/// Rates expressed as decimals (0.05 = 5%). Never as percentages.
pub type Rate = Decimal;

/// Multiples (e.g., 8.5x NOI)
pub type Multiple = Decimal;

/// Year fractions or counts
pub type Years = Decimal;

/// Facility asset class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AssetType {
    SkilledNursing,
    AssistedLiving,
    IndependentLiving,
}

impl std::fmt::Display for AssetType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AssetType::SkilledNursing => write!(f, "Skilled Nursing"),
            AssetType::AssistedLiving => write!(f, "Assisted Living"),
            AssetType::IndependentLiving => write!(f, "Independent Living"),
        }
    }
}

/// Location classification used for market adjustments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LocationType {
    Urban,
    Suburban,
    Rural,
}

/// Local supply/demand balance signal supplied by the market-data collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SupplyDemandSignal {
    Undersupplied,
    Balanced,
    Oversupplied,
}
