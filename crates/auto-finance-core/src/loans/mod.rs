//! Fixed-payment auto loans: the standard amortisation schedule and the
//! early-payoff, balloon and multi-offer variants built on top of it.

pub mod amortization;
pub mod balloon;
pub mod comparison;
pub mod early_payoff;
