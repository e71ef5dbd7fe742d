//! Risk adjustment engine: a signed basis-point premium/discount over a
//! baseline cap rate, accumulated from independent quality, operational,
//! compliance, capital, and market factors.

pub mod engine;
pub mod portfolio;
pub mod tables;

pub use engine::{
    risk_adjusted_valuation, AdjustmentCategory, CapRateAdjustment, DataQuality,
    RiskAdjustedValuationInput, RiskAdjustedValuationOutput, RiskProfile, RiskTier,
};
pub use portfolio::{portfolio_risk_adjustment, FacilityRiskSummary, PortfolioRiskOutput};
pub use tables::RiskTables;
