//! Portfolio master-lease engine: per-facility underwriting, portfolio
//! roll-up, multi-phase lease projection, sensitivity sweeps, and a scored
//! buy-vs-lease decision with negotiation bands.

pub mod decision;
pub mod engine;
pub mod partner;
pub mod projection;
pub mod sensitivity;
pub mod underwriting;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::risk::RiskTables;
use crate::types::Rate;

pub use decision::{
    BuyVsLease, DealDecision, DecisionConfidence, DecisionFactor, FinancingPreference, PriceBand,
    Recommendation,
};
pub use engine::{analyze_master_lease, CoverageStatus, MasterLeaseResult, PortfolioSummary};
pub use partner::{
    DealStructure, EscalationType, LeaseTerms, PartnerEconomics, PartnerProfile,
    UnderwritingCriteria,
};
pub use projection::{LeasePhase, LeaseProjection, YearProjection};
pub use sensitivity::SensitivityAnalysis;
pub use underwriting::{
    DealEconomics, FacilityAnalysis, InclusionRecommendation, IssueSeverity, UnderwritingIssue,
    UnderwritingResult,
};

/// A sweep grid: min..=max in fixed steps.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepGrid {
    pub min: Decimal,
    pub max: Decimal,
    pub step: Decimal,
}

impl SweepGrid {
    pub fn points(&self) -> Vec<Decimal> {
        let mut points = Vec::new();
        let mut v = self.min;
        while v <= self.max {
            points.push(v);
            v += self.step;
        }
        points
    }
}

/// Injected configuration for the lease engine. Defaults mirror the
/// partner-agnostic engine constants; everything is overridable per call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeaseEngineConfig {
    pub risk_tables: RiskTables,
    /// Discount rate for lease NPV
    pub discount_rate: Rate,
    /// EBITDAR growth used for projected coverage
    pub ebitdar_growth: Rate,
    /// Financing scenario for the buy-vs-lease comparison
    pub loan_to_value: Rate,
    pub interest_rate: Rate,
    pub hold_years: u32,
    pub cap_rate_grid: SweepGrid,
    pub noi_shock_grid: SweepGrid,
    pub occupancy_grid: SweepGrid,
    pub escalation_grid: SweepGrid,
    /// Coverage cushion below this reads as thin
    pub thin_cushion_threshold: Decimal,
    /// Bed count at or above this reads as sufficient scale
    pub min_scale_beds: u32,
}

impl Default for LeaseEngineConfig {
    fn default() -> Self {
        LeaseEngineConfig {
            risk_tables: RiskTables::default(),
            discount_rate: dec!(0.08),
            ebitdar_growth: dec!(0.02),
            loan_to_value: dec!(0.70),
            interest_rate: dec!(0.075),
            hold_years: 5,
            cap_rate_grid: SweepGrid {
                min: dec!(0.065),
                max: dec!(0.10),
                step: dec!(0.005),
            },
            noi_shock_grid: SweepGrid {
                min: dec!(-0.20),
                max: dec!(0.20),
                step: dec!(0.05),
            },
            occupancy_grid: SweepGrid {
                min: dec!(0.70),
                max: dec!(0.95),
                step: dec!(0.05),
            },
            escalation_grid: SweepGrid {
                min: dec!(0.015),
                max: dec!(0.035),
                step: dec!(0.005),
            },
            thin_cushion_threshold: dec!(0.10),
            min_scale_beds: 500,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grid_points_inclusive() {
        let config = LeaseEngineConfig::default();
        assert_eq!(config.cap_rate_grid.points().len(), 8);
        assert_eq!(config.noi_shock_grid.points().len(), 9);
        assert_eq!(config.occupancy_grid.points().len(), 6);
        assert_eq!(config.escalation_grid.points().len(), 5);
    }

    #[test]
    fn test_grid_endpoints() {
        let grid = LeaseEngineConfig::default().cap_rate_grid;
        let points = grid.points();
        assert_eq!(points[0], dec!(0.065));
        assert_eq!(*points.last().unwrap(), dec!(0.10));
    }
}
