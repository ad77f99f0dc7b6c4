use rust_decimal::Decimal;
use rust_decimal::MathematicalOps;
use rust_decimal_macros::dec;

use crate::error::AutoFinanceError;
use crate::types::{Money, Rate};
use crate::AutoFinanceResult;

const CONVERGENCE_THRESHOLD: Decimal = dec!(0.0000001);
const MAX_IRR_ITERATIONS: u32 = 100;

/// Present-value factor `(1 + rate)^-nper` for a single amount due in `nper` periods.
pub fn discount_factor(rate: Rate, nper: u32) -> AutoFinanceResult<Decimal> {
    if rate <= dec!(-1) {
        return Err(AutoFinanceError::invalid(
            "rate",
            "Discount rate must be greater than -100%",
        ));
    }
    if rate.is_zero() {
        return Ok(Decimal::ONE);
    }

    match (Decimal::ONE + rate).checked_powd(Decimal::from(nper)) {
        Some(growth) if !growth.is_zero() => Ok(Decimal::ONE / growth),
        _ => Err(AutoFinanceError::NumericDegenerate {
            context: format!("discount factor for rate {rate} over {nper} periods"),
        }),
    }
}

/// Level payment that retires `principal` over `nper` periods at `rate`.
///
/// Returned as a positive amount, unlike the spreadsheet PMT sign convention.
/// A zero rate takes the straight-line branch instead of dividing by zero.
pub fn level_payment(principal: Money, rate: Rate, nper: u32) -> AutoFinanceResult<Money> {
    if nper == 0 {
        return Err(AutoFinanceError::invalid(
            "nper",
            "Number of periods must be > 0",
        ));
    }
    if rate < Decimal::ZERO {
        return Err(AutoFinanceError::invalid("rate", "Rate must be >= 0"));
    }

    if rate.is_zero() {
        return Ok(principal / Decimal::from(nper));
    }

    let annuity_denominator = Decimal::ONE - discount_factor(rate, nper)?;
    if annuity_denominator <= Decimal::ZERO {
        return Err(AutoFinanceError::NumericDegenerate {
            context: format!("annuity factor for rate {rate} over {nper} periods"),
        });
    }

    principal
        .checked_mul(rate)
        .map(|interest| interest / annuity_denominator)
        .ok_or_else(|| AutoFinanceError::NumericDegenerate {
            context: format!("level payment for rate {rate} over {nper} periods"),
        })
}

/// Net Present Value of a series of cash flows
pub(crate) fn npv(rate: Rate, cash_flows: &[Money]) -> AutoFinanceResult<Money> {
    if rate <= dec!(-1) {
        return Err(AutoFinanceError::invalid(
            "rate",
            "Discount rate must be greater than -100%",
        ));
    }

    let mut result = Decimal::ZERO;
    let one_plus_r = Decimal::ONE + rate;
    let mut discount = Decimal::ONE;

    for (t, cf) in cash_flows.iter().enumerate() {
        if t > 0 {
            discount = discount
                .checked_mul(one_plus_r)
                .filter(|d| !d.is_zero())
                .ok_or_else(|| AutoFinanceError::NumericDegenerate {
                    context: format!("NPV discount factor at period {t}"),
                })?;
        }
        result += cf / discount;
    }

    Ok(result)
}

/// NPV of `cash_flows` at `rate` and its derivative with respect to `rate`.
///
/// Flows whose discount factor exceeds the Decimal range contribute less than
/// its precision and are skipped. A factor that underflows to zero is an error.
fn npv_with_slope(cash_flows: &[Money], rate: Rate) -> AutoFinanceResult<(Decimal, Decimal)> {
    let degenerate = |t: usize| AutoFinanceError::NumericDegenerate {
        context: format!("IRR evaluation at rate {rate}, period {t}"),
    };
    let one_plus_r = Decimal::ONE + rate;
    let mut value = Decimal::ZERO;
    let mut slope = Decimal::ZERO;

    for (t, cf) in cash_flows.iter().enumerate() {
        let t_dec = Decimal::from(t as i64);
        let discount = match one_plus_r.checked_powd(t_dec) {
            Some(d) if d.is_zero() => return Err(degenerate(t)),
            Some(d) => d,
            None => continue,
        };
        let term = cf.checked_div(discount).ok_or_else(|| degenerate(t))?;
        value = value.checked_add(term).ok_or_else(|| degenerate(t))?;
        if t > 0 {
            if let Some(d) = discount.checked_mul(one_plus_r) {
                let dterm = (t_dec * cf).checked_div(d).ok_or_else(|| degenerate(t))?;
                slope = slope.checked_sub(dterm).ok_or_else(|| degenerate(t))?;
            }
        }
    }
    Ok((value, slope))
}

/// Periodic Internal Rate of Return using Newton-Raphson
pub fn irr(cash_flows: &[Money], guess: Rate) -> AutoFinanceResult<Rate> {
    if cash_flows.len() < 2 {
        return Err(AutoFinanceError::invalid(
            "cash_flows",
            "IRR requires at least 2 cash flows",
        ));
    }

    let mut rate = guess;

    for i in 0..MAX_IRR_ITERATIONS {
        let (npv_val, dnpv) = npv_with_slope(cash_flows, rate)?;

        if npv_val.abs() < CONVERGENCE_THRESHOLD {
            return Ok(rate);
        }

        let next = npv_val
            .checked_div(dnpv)
            .and_then(|step| rate.checked_sub(step));
        rate = match next {
            // Guard against divergence
            Some(r) => r.clamp(dec!(-0.99), dec!(100.0)),
            None => {
                return Err(AutoFinanceError::ConvergenceFailure {
                    function: "IRR".into(),
                    iterations: i,
                    last_delta: npv_val,
                })
            }
        };
    }

    Err(AutoFinanceError::ConvergenceFailure {
        function: "IRR".into(),
        iterations: MAX_IRR_ITERATIONS,
        last_delta: npv(rate, cash_flows).unwrap_or(Decimal::MAX),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_level_payment_car_loan() {
        // 25,000 at 4.5% over 60 months => ~466.08
        let pmt = level_payment(dec!(25000), dec!(0.045) / dec!(12), 60).unwrap();
        assert!((pmt - dec!(466.08)).abs() < dec!(0.01), "got {pmt}");
    }

    #[test]
    fn test_level_payment_zero_rate() {
        let pmt = level_payment(dec!(1200), Decimal::ZERO, 12).unwrap();
        assert_eq!(pmt, dec!(100));
    }

    #[test]
    fn test_level_payment_zero_periods() {
        assert!(level_payment(dec!(1000), dec!(0.01), 0).is_err());
    }

    #[test]
    fn test_discount_factor() {
        let df = discount_factor(dec!(0.10), 2).unwrap();
        // 1 / 1.21
        assert!((df - dec!(0.826446)).abs() < dec!(0.000001));
        assert_eq!(discount_factor(Decimal::ZERO, 36).unwrap(), Decimal::ONE);
    }

    #[test]
    fn test_npv_basic() {
        let cfs = vec![dec!(-1000), dec!(300), dec!(400), dec!(500)];
        let result = npv(dec!(0.10), &cfs).unwrap();
        // NPV at 10%: -1000 + 300/1.1 + 400/1.21 + 500/1.331 ≈ -21.04
        assert!((result - dec!(-21.04)).abs() < dec!(1.0));
    }

    #[test]
    fn test_irr_basic() {
        let cfs = vec![dec!(-1000), dec!(400), dec!(400), dec!(400)];
        let result = irr(&cfs, dec!(0.10)).unwrap();
        // IRR should be ~9.7%
        assert!((result - dec!(0.097)).abs() < dec!(0.01));
    }

    #[test]
    fn test_discount_factor_overflow_is_degenerate() {
        // 1.5^360 is far outside the Decimal range
        let err = discount_factor(dec!(0.5), 360).unwrap_err();
        assert!(matches!(err, AutoFinanceError::NumericDegenerate { .. }));
        let err = level_payment(dec!(1000), dec!(0.5), 360).unwrap_err();
        assert!(matches!(err, AutoFinanceError::NumericDegenerate { .. }));
    }

    #[test]
    fn test_npv_overflow_is_degenerate() {
        let cfs = vec![dec!(100); 400];
        let err = npv(dec!(100), &cfs).unwrap_err();
        assert!(matches!(err, AutoFinanceError::NumericDegenerate { .. }));
    }

    #[test]
    fn test_irr_long_series_with_high_guess_does_not_overflow() {
        // A guess of 100 per period puts 101^t beyond Decimal range from t = 15
        let mut cfs = vec![dec!(-1000)];
        cfs.extend(std::iter::repeat(dec!(100)).take(40));
        match irr(&cfs, dec!(100)) {
            Ok(rate) => assert!(rate >= dec!(-0.99) && rate <= dec!(100)),
            Err(e) => assert!(matches!(
                e,
                AutoFinanceError::NumericDegenerate { .. }
                    | AutoFinanceError::ConvergenceFailure { .. }
            )),
        }
    }

    #[test]
    fn test_irr_without_sign_change_fails_to_converge() {
        let err = irr(&[dec!(100), dec!(100)], dec!(0.10)).unwrap_err();
        assert!(matches!(
            err,
            AutoFinanceError::ConvergenceFailure { ref function, .. } if function == "IRR"
        ));
    }

    #[test]
    fn test_irr_needs_two_flows() {
        assert!(irr(&[dec!(-100)], dec!(0.05)).is_err());
    }
}
