use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CarevalError {
    #[error("Missing input: {field} — {reason}")]
    MissingInput { field: String, reason: String },

    #[error("Invalid input: {field} — {reason}")]
    InvalidInput { field: String, reason: String },

    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    #[error("No applicable valuation method: {0}")]
    NoApplicableMethod(String),

    #[error("Financial impossibility: {0}")]
    FinancialImpossibility(String),

    #[error("Convergence failure: {function} did not converge after {iterations} iterations (delta: {last_delta})")]
    ConvergenceFailure {
        function: String,
        iterations: u32,
        last_delta: Decimal,
    },

    #[error("Division by zero in {context}")]
    DivisionByZero { context: String },

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl From<serde_json::Error> for CarevalError {
    fn from(e: serde_json::Error) -> Self {
        CarevalError::SerializationError(e.to_string())
    }
}
