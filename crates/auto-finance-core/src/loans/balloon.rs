//! Balloon loan structuring.
//!
//! A fraction of the principal is deferred to a single balloon payment at
//! maturity. The balloon is discounted back to today at the (incentive
//! adjusted) loan rate; only the remainder, the effective principal, is
//! amortised through regular payments.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::error::AutoFinanceError;
use crate::loans::amortization::{compute_schedule, Schedule};
use crate::time_value::{discount_factor, irr};
use crate::types::*;
use crate::AutoFinanceResult;

// ---------------------------------------------------------------------------
// Input types
// ---------------------------------------------------------------------------

/// Balloon loan parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BalloonTerms {
    pub principal: Money,
    /// Nominal annual rate in percent before any incentive.
    pub annual_rate_percent: Decimal,
    pub term_periods: u32,
    /// Share of the principal due as the balloon (0.3 = 30%).
    pub balloon_fraction: Rate,
    /// Percentage points knocked off the rate for taking the balloon option.
    #[serde(default)]
    pub rate_incentive_percent: Decimal,
}

impl BalloonTerms {
    pub fn balloon_amount(&self) -> Money {
        self.principal * self.balloon_fraction
    }

    pub fn adjusted_rate_percent(&self) -> Decimal {
        self.annual_rate_percent - self.rate_incentive_percent
    }

    pub fn periodic_rate(&self) -> Rate {
        self.adjusted_rate_percent() / dec!(100) / Decimal::from(PERIODS_PER_YEAR)
    }
}

/// One loan evaluated under several balloon fractions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BalloonOptionsInput {
    pub principal: Money,
    pub annual_rate_percent: Decimal,
    pub term_periods: u32,
    #[serde(default)]
    pub rate_incentive_percent: Decimal,
    pub balloon_fractions: Vec<Rate>,
}

// ---------------------------------------------------------------------------
// Output types
// ---------------------------------------------------------------------------

/// Balloon loan broken into its amortising part and the deferred balloon.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BalloonStructure {
    /// Regular-payment schedule on the effective principal.
    pub schedule: Schedule,
    pub balloon_amount: Money,
    pub balloon_present_value: Money,
    pub effective_principal: Money,
    pub regular_payment: Money,
    pub adjusted_rate_percent: Decimal,
    /// Sum of regular payments plus the balloon.
    pub total_cost: Money,
    pub total_interest: Money,
    /// Simple annualised cost, `total_interest / principal * 12 / n * 100`.
    /// An approximation, not an internal rate of return.
    pub effective_rate: Decimal,
    /// Annualised IRR of the borrower's cash flows, in percent.
    pub implied_annual_rate_percent: Option<Decimal>,
}

/// One row of a balloon options comparison.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BalloonOption {
    pub balloon_fraction: Rate,
    pub balloon_amount: Money,
    pub regular_payment: Money,
    pub total_cost: Money,
    pub total_interest: Money,
    pub effective_rate: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BalloonOptionsOutput {
    pub options: Vec<BalloonOption>,
    /// Fraction with the lowest regular payment.
    pub lowest_payment_fraction: Rate,
    /// Fraction with the lowest total cost.
    pub lowest_cost_fraction: Rate,
}

// ---------------------------------------------------------------------------
// Computation
// ---------------------------------------------------------------------------

fn validate(terms: &BalloonTerms) -> AutoFinanceResult<()> {
    if terms.principal <= Decimal::ZERO {
        return Err(AutoFinanceError::invalid(
            "principal",
            "Principal must be positive",
        ));
    }
    if terms.term_periods == 0 {
        return Err(AutoFinanceError::invalid(
            "term_periods",
            "Term must be at least 1 period",
        ));
    }
    if terms.annual_rate_percent < Decimal::ZERO {
        return Err(AutoFinanceError::invalid(
            "annual_rate_percent",
            "Annual rate cannot be negative",
        ));
    }
    if terms.balloon_fraction < Decimal::ZERO || terms.balloon_fraction > Decimal::ONE {
        return Err(AutoFinanceError::invalid(
            "balloon_fraction",
            "Balloon fraction must be between 0 and 1",
        ));
    }
    if terms.adjusted_rate_percent() < Decimal::ZERO {
        return Err(AutoFinanceError::invalid(
            "rate_incentive_percent",
            format!(
                "Incentive {}% exceeds the annual rate {}%",
                terms.rate_incentive_percent, terms.annual_rate_percent
            ),
        ));
    }
    Ok(())
}

/// Structure a balloon loan: discount the balloon, amortise the rest.
pub fn structure(terms: &BalloonTerms) -> AutoFinanceResult<BalloonStructure> {
    validate(terms)?;

    let rate = terms.periodic_rate();
    let n = terms.term_periods;
    let balloon_amount = terms.balloon_amount();
    let balloon_present_value = balloon_amount * discount_factor(rate, n)?;
    let effective_principal = terms.principal - balloon_present_value;

    if effective_principal <= Decimal::ZERO {
        return Err(AutoFinanceError::invalid(
            "balloon_fraction",
            "Balloon leaves no principal to amortise through regular payments",
        ));
    }

    let schedule = compute_schedule(effective_principal, rate, n)?;
    let regular_total: Money = schedule.periods.iter().map(|p| p.payment).sum();
    let total_cost = regular_total + balloon_amount;
    let total_interest = total_cost - terms.principal;
    let effective_rate = total_interest / terms.principal
        * (Decimal::from(PERIODS_PER_YEAR) / Decimal::from(n))
        * dec!(100);

    let implied_annual_rate_percent = implied_rate(terms.principal, &schedule, balloon_amount, rate);
    tracing::debug!(
        %balloon_amount,
        %effective_principal,
        %effective_rate,
        "balloon structured"
    );

    Ok(BalloonStructure {
        regular_payment: schedule.scheduled_payment,
        schedule,
        balloon_amount,
        balloon_present_value,
        effective_principal,
        adjusted_rate_percent: terms.adjusted_rate_percent(),
        total_cost,
        total_interest,
        effective_rate,
        implied_annual_rate_percent,
    })
}

/// Solve for the rate that equates the principal with the regular payments
/// plus the balloon, annualised as a nominal percentage.
fn implied_rate(
    principal: Money,
    schedule: &Schedule,
    balloon_amount: Money,
    guess: Rate,
) -> Option<Decimal> {
    let mut flows: Vec<Money> = Vec::with_capacity(schedule.periods.len() + 1);
    flows.push(-principal);
    flows.extend(schedule.periods.iter().map(|p| p.payment));
    if let Some(last) = flows.last_mut() {
        *last += balloon_amount;
    }

    let guess = if guess.is_zero() { dec!(0.005) } else { guess };
    irr(&flows, guess)
        .ok()
        .map(|periodic| periodic * Decimal::from(PERIODS_PER_YEAR) * dec!(100))
}

/// [`structure`] wrapped in the computation envelope.
pub fn structure_balloon(
    terms: &BalloonTerms,
) -> AutoFinanceResult<ComputationOutput<BalloonStructure>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    let result = structure(terms)?;
    warnings.push(
        "effective_rate is a simple annualised approximation; use implied_annual_rate_percent for an exact rate"
            .into(),
    );
    if result.implied_annual_rate_percent.is_none() {
        warnings.push("IRR solver did not converge; implied rate unavailable".into());
    }

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Balloon loan (PV-discounted balloon, amortised remainder)",
        &serde_json::json!({
            "principal": terms.principal.to_string(),
            "annual_rate_percent": terms.annual_rate_percent.to_string(),
            "rate_incentive_percent": terms.rate_incentive_percent.to_string(),
            "balloon_fraction": terms.balloon_fraction.to_string(),
            "term_periods": terms.term_periods,
        }),
        warnings,
        elapsed,
        result,
    ))
}

/// Structure the same loan under each requested balloon fraction.
pub fn compare_balloon_options(
    input: &BalloonOptionsInput,
) -> AutoFinanceResult<ComputationOutput<BalloonOptionsOutput>> {
    let start = Instant::now();
    let warnings: Vec<String> = Vec::new();

    if input.balloon_fractions.is_empty() {
        return Err(AutoFinanceError::invalid(
            "balloon_fractions",
            "At least one balloon fraction is required",
        ));
    }

    let options = input
        .balloon_fractions
        .iter()
        .map(|&fraction| {
            let s = structure(&BalloonTerms {
                principal: input.principal,
                annual_rate_percent: input.annual_rate_percent,
                term_periods: input.term_periods,
                balloon_fraction: fraction,
                rate_incentive_percent: input.rate_incentive_percent,
            })?;
            Ok(BalloonOption {
                balloon_fraction: fraction,
                balloon_amount: s.balloon_amount,
                regular_payment: s.regular_payment,
                total_cost: s.total_cost,
                total_interest: s.total_interest,
                effective_rate: s.effective_rate,
            })
        })
        .collect::<AutoFinanceResult<Vec<_>>>()?;

    // Strict comparison keeps the earliest option on ties.
    let mut lowest_payment = &options[0];
    let mut lowest_cost = &options[0];
    for opt in &options[1..] {
        if opt.regular_payment < lowest_payment.regular_payment {
            lowest_payment = opt;
        }
        if opt.total_cost < lowest_cost.total_cost {
            lowest_cost = opt;
        }
    }

    let output = BalloonOptionsOutput {
        lowest_payment_fraction: lowest_payment.balloon_fraction,
        lowest_cost_fraction: lowest_cost.balloon_fraction,
        options,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Balloon options comparison",
        &serde_json::json!({
            "principal": input.principal.to_string(),
            "annual_rate_percent": input.annual_rate_percent.to_string(),
            "rate_incentive_percent": input.rate_incentive_percent.to_string(),
            "term_periods": input.term_periods,
            "options": input.balloon_fractions.len(),
        }),
        warnings,
        elapsed,
        output,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn terms() -> BalloonTerms {
        BalloonTerms {
            principal: dec!(30000),
            annual_rate_percent: dec!(6),
            term_periods: 48,
            balloon_fraction: dec!(0.30),
            rate_incentive_percent: dec!(1),
        }
    }

    #[test]
    fn test_balloon_amount_and_rate() {
        let s = structure(&terms()).unwrap();
        assert_eq!(s.balloon_amount, dec!(9000));
        assert_eq!(s.adjusted_rate_percent, dec!(5));
        assert!(s.balloon_present_value < dec!(9000));
        assert_eq!(s.effective_principal, dec!(30000) - s.balloon_present_value);
    }

    #[test]
    fn test_accounting_identity() {
        let s = structure(&terms()).unwrap();
        let regular: Decimal = s.schedule.periods.iter().map(|p| p.payment).sum();
        let diff = (regular + s.balloon_amount) - (dec!(30000) + s.total_interest);
        assert!(diff.abs() < dec!(0.0000000001), "diff {diff}");
    }

    #[test]
    fn test_effective_rate_annualises_interest() {
        let s = structure(&terms()).unwrap();
        let expected = s.total_interest / dec!(30000) * (dec!(12) / dec!(48)) * dec!(100);
        assert_eq!(s.effective_rate, expected);
    }

    #[test]
    fn test_effective_rate_single_period_known_value() {
        // 1,000 at 12% for one month: 10 of interest, i.e. 12% a year,
        // with or without half of it deferred to the balloon
        for fraction in [dec!(0), dec!(0.5)] {
            let s = structure(&BalloonTerms {
                principal: dec!(1000),
                annual_rate_percent: dec!(12),
                term_periods: 1,
                balloon_fraction: fraction,
                rate_incentive_percent: Decimal::ZERO,
            })
            .unwrap();
            assert!((s.total_interest - dec!(10)).abs() < dec!(0.000001), "fraction {fraction}");
            assert!((s.effective_rate - dec!(12)).abs() < dec!(0.0001), "fraction {fraction}");
        }
    }

    #[test]
    fn test_rate_beyond_decimal_range_is_degenerate() {
        let mut t = terms();
        t.annual_rate_percent = dec!(600);
        t.rate_incentive_percent = Decimal::ZERO;
        t.term_periods = 360;
        let err = structure(&t).unwrap_err();
        assert!(matches!(err, AutoFinanceError::NumericDegenerate { .. }));
    }

    #[test]
    fn test_balloon_lowers_regular_payment() {
        let mut no_balloon = terms();
        no_balloon.balloon_fraction = Decimal::ZERO;
        let plain = structure(&no_balloon).unwrap();
        let balloon = structure(&terms()).unwrap();
        assert!(balloon.regular_payment < plain.regular_payment);
        assert_eq!(plain.balloon_amount, Decimal::ZERO);
    }

    #[test]
    fn test_implied_rate_matches_adjusted_rate() {
        let s = structure(&terms()).unwrap();
        let implied = s.implied_annual_rate_percent.unwrap();
        assert!((implied - dec!(5)).abs() < dec!(0.001), "got {implied}");
    }

    #[test]
    fn test_zero_rate_balloon() {
        let mut t = terms();
        t.annual_rate_percent = dec!(1);
        t.rate_incentive_percent = dec!(1);
        let s = structure(&t).unwrap();
        assert_eq!(s.effective_principal, dec!(21000));
        assert_eq!(s.total_interest, Decimal::ZERO);
    }

    #[test]
    fn test_incentive_above_rate_rejected() {
        let mut t = terms();
        t.rate_incentive_percent = dec!(7);
        assert!(structure(&t).is_err());
    }

    #[test]
    fn test_fraction_out_of_range_rejected() {
        let mut t = terms();
        t.balloon_fraction = dec!(1.2);
        assert!(structure(&t).is_err());
        t.balloon_fraction = dec!(-0.1);
        assert!(structure(&t).is_err());
    }

    #[test]
    fn test_full_balloon_at_zero_rate_rejected() {
        let mut t = terms();
        t.annual_rate_percent = Decimal::ZERO;
        t.rate_incentive_percent = Decimal::ZERO;
        t.balloon_fraction = Decimal::ONE;
        assert!(structure(&t).is_err());
    }

    #[test]
    fn test_options_comparison() {
        let input = BalloonOptionsInput {
            principal: dec!(30000),
            annual_rate_percent: dec!(6),
            term_periods: 48,
            rate_incentive_percent: Decimal::ZERO,
            balloon_fractions: vec![dec!(0), dec!(0.2), dec!(0.4)],
        };
        let out = compare_balloon_options(&input).unwrap().result;
        assert_eq!(out.options.len(), 3);
        assert_eq!(out.lowest_payment_fraction, dec!(0.4));
        // Deferring principal accrues more interest at the same rate
        assert_eq!(out.lowest_cost_fraction, dec!(0));
    }
}
