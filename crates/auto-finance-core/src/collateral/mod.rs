//! Vehicle value projection and loan-versus-collateral (GAP) exposure.

pub mod depreciation;
pub mod gap;
