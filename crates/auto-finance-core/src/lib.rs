pub mod error;
pub mod time_value;
pub mod types;

#[cfg(feature = "loans")]
pub mod loans;

#[cfg(feature = "collateral")]
pub mod collateral;

pub use error::AutoFinanceError;
pub use types::*;

/// Standard result type for all auto-finance operations
pub type AutoFinanceResult<T> = Result<T, AutoFinanceError>;
