pub mod error;
pub mod facility;
pub mod tables;
pub mod time_value;
pub mod types;

#[cfg(feature = "valuation")]
pub mod valuation;

#[cfg(feature = "risk")]
pub mod risk;

#[cfg(feature = "reconciliation")]
pub mod reconcile;

#[cfg(feature = "master_lease")]
pub mod lease;

pub use error::CarevalError;
pub use types::*;

/// Standard result type for all careval operations
pub type CarevalResult<T> = Result<T, CarevalError>;
