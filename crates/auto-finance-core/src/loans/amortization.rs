//! Canonical level-payment amortisation.
//!
//! Each period accrues interest on the opening balance, the rest of the level
//! payment retires principal, and the last period absorbs whatever residual
//! is left so the schedule always closes at exactly zero. The same stepping
//! routine drives the early-payoff simulator, which keeps the two in lockstep.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::error::AutoFinanceError;
use crate::time_value::level_payment;
use crate::types::*;
use crate::AutoFinanceResult;

/// Remaining balance below which the loan is treated as retired.
const BALANCE_EPSILON: Decimal = dec!(0.000001);

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Loan parameters as supplied by a host surface.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoanTerms {
    /// Amount financed.
    pub principal: Money,
    /// Nominal annual rate in percent (4.5 = 4.5% APR).
    pub annual_rate_percent: Decimal,
    /// Number of monthly payments.
    pub term_periods: u32,
    /// Recurring extra payment added to every scheduled payment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra_payment: Option<Money>,
    /// One-time principal reduction.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lump_sum: Option<Money>,
    /// 1-based period in which the lump sum lands.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lump_sum_period: Option<u32>,
}

impl LoanTerms {
    /// Plain loan without any acceleration.
    pub fn new(principal: Money, annual_rate_percent: Decimal, term_periods: u32) -> Self {
        LoanTerms {
            principal,
            annual_rate_percent,
            term_periods,
            extra_payment: None,
            lump_sum: None,
            lump_sum_period: None,
        }
    }

    /// Monthly rate as a decimal fraction.
    pub fn periodic_rate(&self) -> Rate {
        self.annual_rate_percent / dec!(100) / Decimal::from(PERIODS_PER_YEAR)
    }

    pub fn extra_payment(&self) -> Money {
        self.extra_payment.unwrap_or(Decimal::ZERO)
    }

    /// Lump sum and its period, if a non-zero lump sum was requested.
    pub fn lump_sum(&self) -> Option<(u32, Money)> {
        match (self.lump_sum, self.lump_sum_period) {
            (Some(amount), Some(period)) if amount > Decimal::ZERO => Some((period, amount)),
            _ => None,
        }
    }

    pub fn has_acceleration(&self) -> bool {
        self.extra_payment() > Decimal::ZERO || self.lump_sum().is_some()
    }

    /// Boundary validation of the whole record.
    pub fn validate(&self) -> AutoFinanceResult<()> {
        if self.principal <= Decimal::ZERO {
            return Err(AutoFinanceError::invalid(
                "principal",
                "Principal must be positive",
            ));
        }
        if self.annual_rate_percent < Decimal::ZERO {
            return Err(AutoFinanceError::invalid(
                "annual_rate_percent",
                "Annual rate cannot be negative",
            ));
        }
        if self.term_periods == 0 {
            return Err(AutoFinanceError::invalid(
                "term_periods",
                "Term must be at least 1 period",
            ));
        }
        if self.extra_payment() < Decimal::ZERO {
            return Err(AutoFinanceError::invalid(
                "extra_payment",
                "Extra payment cannot be negative",
            ));
        }

        if let Some(amount) = self.lump_sum {
            if amount < Decimal::ZERO {
                return Err(AutoFinanceError::invalid(
                    "lump_sum",
                    "Lump sum cannot be negative",
                ));
            }
            if amount > self.principal {
                return Err(AutoFinanceError::invalid(
                    "lump_sum",
                    format!(
                        "Lump sum {amount} exceeds the principal {}",
                        self.principal
                    ),
                ));
            }
            if amount > Decimal::ZERO {
                match self.lump_sum_period {
                    None => {
                        return Err(AutoFinanceError::invalid(
                            "lump_sum_period",
                            "A lump sum requires the period it is paid in",
                        ));
                    }
                    Some(p) if p == 0 || p > self.term_periods => {
                        return Err(AutoFinanceError::invalid(
                            "lump_sum_period",
                            format!("Must be between 1 and {}", self.term_periods),
                        ));
                    }
                    Some(_) => {}
                }
            }
        }

        Ok(())
    }
}

/// A single period in the payment schedule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentPeriod {
    /// 1-based period number.
    pub index: u32,
    pub opening_balance: Money,
    /// Scheduled payment actually made this period (principal + interest).
    pub payment: Money,
    pub principal_portion: Money,
    pub interest_portion: Money,
    /// Lump sum applied at the start of this period, before interest accrues.
    pub lump_sum: Money,
    pub ending_balance: Money,
}

/// Ordered payment schedule with its headline totals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schedule {
    pub periods: Vec<PaymentPeriod>,
    /// Level payment (before any extra payment).
    pub scheduled_payment: Money,
    pub total_interest: Money,
    /// All cash paid: regular payments plus any lump sum.
    pub total_paid: Money,
    pub periods_to_payoff: u32,
}

impl Schedule {
    pub fn total_principal(&self) -> Money {
        self.periods
            .iter()
            .map(|p| p.principal_portion + p.lump_sum)
            .sum()
    }

    /// Ending balance of every period, in order.
    pub fn balances(&self) -> Vec<Money> {
        self.periods.iter().map(|p| p.ending_balance).collect()
    }
}

/// Payment on top of the level payment, and an optional one-time reduction.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct Acceleration {
    pub extra_payment: Money,
    pub lump_sum: Option<(u32, Money)>,
}

// ---------------------------------------------------------------------------
// Computation
// ---------------------------------------------------------------------------

/// Standard fixed-payment schedule for `principal` at `periodic_rate` over
/// `term_periods` periods.
pub fn compute_schedule(
    principal: Money,
    periodic_rate: Rate,
    term_periods: u32,
) -> AutoFinanceResult<Schedule> {
    if principal <= Decimal::ZERO {
        return Err(AutoFinanceError::invalid(
            "principal",
            "Principal must be positive",
        ));
    }
    if term_periods == 0 {
        return Err(AutoFinanceError::invalid(
            "term_periods",
            "Term must be at least 1 period",
        ));
    }
    if periodic_rate < Decimal::ZERO {
        return Err(AutoFinanceError::invalid(
            "periodic_rate",
            "Periodic rate cannot be negative",
        ));
    }

    let payment = level_payment(principal, periodic_rate, term_periods)?;
    Ok(step_schedule(
        principal,
        periodic_rate,
        term_periods,
        payment,
        Acceleration::default(),
    ))
}

/// Walk the balance forward one period at a time.
///
/// A lump sum comes off the balance before that period's interest accrues.
/// Any period whose principal portion would overshoot the balance (and the
/// final period, which absorbs rounding residue) pays exactly what is left.
pub(crate) fn step_schedule(
    principal: Money,
    periodic_rate: Rate,
    term_periods: u32,
    payment: Money,
    acceleration: Acceleration,
) -> Schedule {
    let mut periods = Vec::with_capacity(term_periods as usize);
    let mut balance = principal;
    let mut total_interest = Decimal::ZERO;
    let mut total_paid = Decimal::ZERO;

    for index in 1..=term_periods {
        if balance <= Decimal::ZERO {
            break;
        }
        let opening = balance;

        let lump_applied = match acceleration.lump_sum {
            Some((period, amount)) if period == index => amount.min(balance),
            _ => Decimal::ZERO,
        };
        balance -= lump_applied;

        let interest = balance * periodic_rate;
        let mut principal_portion =
            (payment + acceleration.extra_payment - interest).max(Decimal::ZERO);
        if index == term_periods || balance - principal_portion < BALANCE_EPSILON {
            principal_portion = balance;
        }
        let period_payment = principal_portion + interest;
        balance -= principal_portion;

        total_interest += interest;
        total_paid += period_payment + lump_applied;

        periods.push(PaymentPeriod {
            index,
            opening_balance: opening,
            payment: period_payment,
            principal_portion,
            interest_portion: interest,
            lump_sum: lump_applied,
            ending_balance: balance,
        });
    }

    let periods_to_payoff = periods.len() as u32;
    tracing::trace!(periods_to_payoff, %total_interest, "schedule stepped");

    Schedule {
        periods,
        scheduled_payment: payment,
        total_interest,
        total_paid,
        periods_to_payoff,
    }
}

/// Standard schedule for a validated [`LoanTerms`] record, wrapped in the
/// computation envelope. Acceleration fields are ignored here; see
/// [`crate::loans::early_payoff`].
pub fn amortize(terms: &LoanTerms) -> AutoFinanceResult<ComputationOutput<Schedule>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    terms.validate()?;
    if terms.has_acceleration() {
        warnings.push(
            "Extra payment / lump sum ignored by the standard schedule; use early payoff analysis"
                .into(),
        );
    }

    let schedule = compute_schedule(terms.principal, terms.periodic_rate(), terms.term_periods)?;

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Level-payment amortisation (annuity formula)",
        &serde_json::json!({
            "principal": terms.principal.to_string(),
            "annual_rate_percent": terms.annual_rate_percent.to_string(),
            "periodic_rate": terms.periodic_rate().to_string(),
            "term_periods": terms.term_periods,
        }),
        warnings,
        elapsed,
        schedule,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn car_loan() -> Schedule {
        compute_schedule(dec!(25000), dec!(0.045) / dec!(12), 60).unwrap()
    }

    #[test]
    fn test_car_loan_payment_and_length() {
        let sched = car_loan();
        assert!(
            (sched.scheduled_payment - dec!(466.08)).abs() < dec!(0.01),
            "got {}",
            sched.scheduled_payment
        );
        assert_eq!(sched.periods.len(), 60);
        assert_eq!(sched.periods_to_payoff, 60);
        assert_eq!(sched.periods.last().unwrap().ending_balance, Decimal::ZERO);
    }

    #[test]
    fn test_portions_sum_to_payment() {
        for p in &car_loan().periods {
            assert_eq!(p.principal_portion + p.interest_portion, p.payment);
        }
    }

    #[test]
    fn test_principal_fully_retired() {
        let sched = car_loan();
        let repaid: Decimal = sched.periods.iter().map(|p| p.principal_portion).sum();
        assert!((repaid - dec!(25000)).abs() < dec!(0.000001));
    }

    #[test]
    fn test_balance_non_increasing() {
        let sched = car_loan();
        let mut prev = dec!(25000);
        for p in &sched.periods {
            assert!(p.ending_balance <= prev);
            assert!(p.ending_balance >= Decimal::ZERO);
            prev = p.ending_balance;
        }
    }

    #[test]
    fn test_first_period_interest() {
        let sched = car_loan();
        // 25,000 * 0.00375 = 93.75
        assert_eq!(sched.periods[0].interest_portion, dec!(93.75));
    }

    #[test]
    fn test_zero_rate_straight_line() {
        let sched = compute_schedule(dec!(12000), Decimal::ZERO, 48).unwrap();
        assert_eq!(sched.scheduled_payment, dec!(250));
        assert_eq!(sched.total_interest, Decimal::ZERO);
        assert_eq!(sched.periods.len(), 48);
        assert_eq!(sched.total_paid, dec!(12000));
        assert_eq!(sched.periods[47].ending_balance, Decimal::ZERO);
    }

    #[test]
    fn test_single_period_loan() {
        let sched = compute_schedule(dec!(1000), dec!(0.01), 1).unwrap();
        assert_eq!(sched.periods.len(), 1);
        assert_eq!(sched.periods[0].interest_portion, dec!(10));
        assert_eq!(sched.periods[0].payment, dec!(1010));
        assert_eq!(sched.periods[0].ending_balance, Decimal::ZERO);
    }

    #[test]
    fn test_invalid_inputs() {
        assert!(compute_schedule(Decimal::ZERO, dec!(0.01), 12).is_err());
        assert!(compute_schedule(dec!(-5), dec!(0.01), 12).is_err());
        assert!(compute_schedule(dec!(1000), dec!(0.01), 0).is_err());
        assert!(compute_schedule(dec!(1000), dec!(-0.01), 12).is_err());
    }

    #[test]
    fn test_amortize_envelope_warns_on_ignored_extra() {
        let mut terms = LoanTerms::new(dec!(25000), dec!(4.5), 60);
        terms.extra_payment = Some(dec!(100));
        let out = amortize(&terms).unwrap();
        assert_eq!(out.result.periods.len(), 60);
        assert_eq!(out.warnings.len(), 1);
    }

    #[test]
    fn test_validate_lump_sum_rules() {
        let mut terms = LoanTerms::new(dec!(10000), dec!(5), 36);
        terms.lump_sum = Some(dec!(2000));
        assert!(terms.validate().is_err(), "lump sum without a period");

        terms.lump_sum_period = Some(37);
        assert!(terms.validate().is_err(), "period beyond term");

        terms.lump_sum_period = Some(12);
        assert!(terms.validate().is_ok());

        terms.lump_sum = Some(dec!(10001));
        assert!(terms.validate().is_err(), "lump sum above principal");
    }

    #[test]
    fn test_periodic_rate() {
        let terms = LoanTerms::new(dec!(1), dec!(6), 12);
        assert_eq!(terms.periodic_rate(), dec!(0.005));
    }
}
