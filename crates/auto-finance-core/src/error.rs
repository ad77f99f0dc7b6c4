use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AutoFinanceError {
    #[error("Invalid input: {field} — {reason}")]
    InvalidInput { field: String, reason: String },

    #[error("Numerically degenerate computation in {context}")]
    NumericDegenerate { context: String },

    #[error("Convergence failure: {function} did not converge after {iterations} iterations (delta: {last_delta})")]
    ConvergenceFailure {
        function: String,
        iterations: u32,
        last_delta: Decimal,
    },
}

impl AutoFinanceError {
    pub(crate) fn invalid(field: &str, reason: impl Into<String>) -> Self {
        AutoFinanceError::InvalidInput {
            field: field.into(),
            reason: reason.into(),
        }
    }
}
