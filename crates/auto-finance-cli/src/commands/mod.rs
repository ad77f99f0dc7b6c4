pub mod collateral;
pub mod loans;
