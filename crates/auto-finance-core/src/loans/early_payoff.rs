//! Early payoff: a recurring extra payment and/or a one-time lump sum on top
//! of the level payment.
//!
//! The lump sum is taken off the balance at the start of its period, before
//! that period's interest accrues. Applying it after accrual would charge one
//! more period of interest on the lump-sum amount.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::loans::amortization::{
    compute_schedule, step_schedule, Acceleration, LoanTerms, Schedule,
};
use crate::time_value::level_payment;
use crate::types::*;
use crate::AutoFinanceResult;

/// Baseline versus accelerated repayment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EarlyPayoffOutput {
    /// Level payment of the original loan.
    pub base_payment: Money,
    /// Level payment plus the recurring extra payment.
    pub accelerated_payment: Money,
    pub payoff_period: u32,
    pub periods_saved: u32,
    pub interest_saved: Money,
    pub baseline: Schedule,
    pub accelerated: Schedule,
}

/// Schedule with the extra payment and lump sum from `terms` applied.
///
/// With no extra payment and no lump sum this is exactly the standard
/// schedule from [`compute_schedule`].
pub fn simulate(terms: &LoanTerms) -> AutoFinanceResult<Schedule> {
    terms.validate()?;

    let rate = terms.periodic_rate();
    let base_payment = level_payment(terms.principal, rate, terms.term_periods)?;

    Ok(step_schedule(
        terms.principal,
        rate,
        terms.term_periods,
        base_payment,
        Acceleration {
            extra_payment: terms.extra_payment(),
            lump_sum: terms.lump_sum(),
        },
    ))
}

/// Run the baseline and accelerated schedules side by side and report the
/// savings.
pub fn analyze_early_payoff(
    terms: &LoanTerms,
) -> AutoFinanceResult<ComputationOutput<EarlyPayoffOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    let accelerated = simulate(terms)?;
    let baseline = compute_schedule(terms.principal, terms.periodic_rate(), terms.term_periods)?;

    if !terms.has_acceleration() {
        warnings.push("No extra payment or lump sum supplied; schedules are identical".into());
    }

    if let Some((period, requested)) = terms.lump_sum() {
        match accelerated.periods.iter().find(|p| p.index == period) {
            Some(p) if p.lump_sum < requested => warnings.push(format!(
                "Period {period}: lump sum {requested} exceeds the outstanding balance; only {} applied",
                p.lump_sum
            )),
            None => warnings.push(format!(
                "Loan is paid off before period {period}; lump sum not applied"
            )),
            _ => {}
        }
    }

    let payoff_period = accelerated.periods_to_payoff;
    let output = EarlyPayoffOutput {
        base_payment: baseline.scheduled_payment,
        accelerated_payment: baseline.scheduled_payment + terms.extra_payment(),
        payoff_period,
        periods_saved: baseline.periods_to_payoff.saturating_sub(payoff_period),
        interest_saved: (baseline.total_interest - accelerated.total_interest).max(Decimal::ZERO),
        baseline,
        accelerated,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Early payoff simulation (lump sum applied before interest accrual)",
        &serde_json::json!({
            "principal": terms.principal.to_string(),
            "annual_rate_percent": terms.annual_rate_percent.to_string(),
            "term_periods": terms.term_periods,
            "extra_payment": terms.extra_payment().to_string(),
            "lump_sum": terms.lump_sum.map(|v| v.to_string()),
            "lump_sum_period": terms.lump_sum_period,
        }),
        warnings,
        elapsed,
        output,
    ))
}
