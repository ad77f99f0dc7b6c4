//! Two-phase vehicle depreciation.
//!
//! The first twelve months decay at the first-year rate, later months at the
//! subsequent annual rate, both compounded monthly. Two monthly conventions
//! are supported:
//!
//! - `EffectiveAnnual`: monthly factor `(1 - rate)^(1/12)`, so a full year
//!   removes exactly `rate` of the value.
//! - `NominalMonthly`: monthly factor `1 - rate / 12`, which removes slightly
//!   less than `rate` over a year.

use rust_decimal::Decimal;
use rust_decimal::MathematicalOps;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::error::AutoFinanceError;
use crate::types::*;
use crate::AutoFinanceResult;

const FIRST_YEAR_MONTHS: u32 = PERIODS_PER_YEAR;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompoundingConvention {
    #[default]
    EffectiveAnnual,
    NominalMonthly,
}

/// Depreciation curve parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DepreciationParams {
    /// Value at period 0 (purchase).
    pub initial_value: Money,
    /// Annual loss rate for the first year (0.20 = 20%).
    pub first_year_rate: Rate,
    /// Annual loss rate for every later year.
    pub subsequent_annual_rate: Rate,
    #[serde(default)]
    pub convention: CompoundingConvention,
}

/// Projected value for one period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValuePoint {
    pub period: u32,
    pub value: Money,
}

/// Values for periods `0..=n`, non-increasing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValueSeries {
    pub points: Vec<ValuePoint>,
}

impl ValueSeries {
    pub fn values(&self) -> Vec<Money> {
        self.points.iter().map(|p| p.value).collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DepreciationInput {
    pub params: DepreciationParams,
    /// Number of months to project.
    pub periods: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DepreciationOutput {
    pub series: ValueSeries,
    pub final_value: Money,
    pub total_depreciation: Money,
    /// Share of the initial value lost by the final period.
    pub total_depreciation_pct: Rate,
}

fn validate(params: &DepreciationParams) -> AutoFinanceResult<()> {
    if params.initial_value <= Decimal::ZERO {
        return Err(AutoFinanceError::invalid(
            "initial_value",
            "Initial value must be positive",
        ));
    }
    for (field, rate) in [
        ("first_year_rate", params.first_year_rate),
        ("subsequent_annual_rate", params.subsequent_annual_rate),
    ] {
        if rate < Decimal::ZERO || rate >= Decimal::ONE {
            return Err(AutoFinanceError::invalid(
                field,
                format!("Rate {rate} must be in [0, 1)"),
            ));
        }
    }
    Ok(())
}

/// Fraction of value kept each month under `convention`.
fn monthly_retention(
    annual_rate: Rate,
    convention: CompoundingConvention,
) -> AutoFinanceResult<Decimal> {
    if annual_rate.is_zero() {
        return Ok(Decimal::ONE);
    }
    match convention {
        CompoundingConvention::NominalMonthly => {
            Ok(Decimal::ONE - annual_rate / Decimal::from(PERIODS_PER_YEAR))
        }
        CompoundingConvention::EffectiveAnnual => compound(
            Decimal::ONE - annual_rate,
            Decimal::ONE / Decimal::from(PERIODS_PER_YEAR),
        ),
    }
}

fn compound(base: Decimal, exponent: Decimal) -> AutoFinanceResult<Decimal> {
    base.checked_powd(exponent)
        .ok_or_else(|| AutoFinanceError::NumericDegenerate {
            context: format!("depreciation factor {base}^{exponent}"),
        })
}

/// Projected value at `period` months after purchase.
pub fn value_at_period(params: &DepreciationParams, period: u32) -> AutoFinanceResult<Money> {
    validate(params)?;
    if period == 0 {
        return Ok(params.initial_value);
    }

    let first = monthly_retention(params.first_year_rate, params.convention)?;
    let first_months = period.min(FIRST_YEAR_MONTHS);
    let mut value = params.initial_value * compound(first, Decimal::from(first_months))?;

    if period > FIRST_YEAR_MONTHS {
        let later = monthly_retention(params.subsequent_annual_rate, params.convention)?;
        value *= compound(later, Decimal::from(period - FIRST_YEAR_MONTHS))?;
    }

    Ok(value.max(Decimal::ZERO))
}

/// Projected values for periods `0..=periods`.
///
/// Built by repeated monthly multiplication so the series is non-increasing
/// by construction.
pub fn value_series(params: &DepreciationParams, periods: u32) -> AutoFinanceResult<ValueSeries> {
    validate(params)?;

    let first = monthly_retention(params.first_year_rate, params.convention)?;
    let later = monthly_retention(params.subsequent_annual_rate, params.convention)?;

    let mut points = Vec::with_capacity(periods as usize + 1);
    let mut value = params.initial_value;
    points.push(ValuePoint { period: 0, value });

    for period in 1..=periods {
        let retention = if period <= FIRST_YEAR_MONTHS { first } else { later };
        value = (value * retention).max(Decimal::ZERO);
        points.push(ValuePoint { period, value });
    }

    Ok(ValueSeries { points })
}

/// Project the curve and summarise the total loss.
pub fn project_depreciation(
    input: &DepreciationInput,
) -> AutoFinanceResult<ComputationOutput<DepreciationOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    let series = value_series(&input.params, input.periods)?;
    if input.periods == 0 {
        warnings.push("Zero periods requested; series holds only the initial value".into());
    }

    let initial = input.params.initial_value;
    let final_value = series
        .points
        .last()
        .map(|p| p.value)
        .unwrap_or(initial);
    let total_depreciation = initial - final_value;

    let output = DepreciationOutput {
        series,
        final_value,
        total_depreciation,
        total_depreciation_pct: total_depreciation / initial,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Two-phase monthly compounded depreciation",
        &serde_json::json!({
            "initial_value": initial.to_string(),
            "first_year_rate": input.params.first_year_rate.to_string(),
            "subsequent_annual_rate": input.params.subsequent_annual_rate.to_string(),
            "convention": input.params.convention,
            "periods": input.periods,
            "first_year_months": FIRST_YEAR_MONTHS,
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

    fn suv() -> DepreciationParams {
        DepreciationParams {
            initial_value: dec!(40000),
            first_year_rate: dec!(0.20),
            subsequent_annual_rate: dec!(0.10),
            convention: CompoundingConvention::EffectiveAnnual,
        }
    }

    #[test]
    fn test_period_zero_is_initial_value() {
        assert_eq!(value_at_period(&suv(), 0).unwrap(), dec!(40000));
    }

    #[test]
    fn test_first_year_effective_annual() {
        let v12 = value_at_period(&suv(), 12).unwrap();
        assert!((v12 - dec!(32000)).abs() < dec!(320), "got {v12}");
    }

    #[test]
    fn test_nominal_monthly_formula() {
        let mut params = suv();
        params.convention = CompoundingConvention::NominalMonthly;
        let v3 = value_at_period(&params, 3).unwrap();
        // 40,000 * (1 - 0.2/12)^3
        let expected = dec!(40000) * (dec!(1) - dec!(0.2) / dec!(12)).powi(3);
        assert!((v3 - expected).abs() < dec!(0.0001), "got {v3}");

        // Nominal monthly loses less than 20% in the first year
        let v12 = value_at_period(&params, 12).unwrap();
        assert!(v12 > dec!(32000));
    }

    #[test]
    fn test_value_decreases_after_first_year() {
        let series = value_series(&suv(), 60).unwrap();
        assert_eq!(series.points.len(), 61);
        for w in series.points.windows(2) {
            assert!(w[1].value <= w[0].value);
        }
        assert!(series.points[13].value < series.points[12].value);
        // Second year loses ~10% of the month-12 value
        let ratio = series.points[24].value / series.points[12].value;
        assert!((ratio - dec!(0.90)).abs() < dec!(0.001), "got {ratio}");
    }

    #[test]
    fn test_series_agrees_with_point_values() {
        let series = value_series(&suv(), 36).unwrap();
        for p in [1u32, 12, 13, 36] {
            let direct = value_at_period(&suv(), p).unwrap();
            let diff = (series.points[p as usize].value - direct).abs();
            assert!(diff < dec!(0.0001), "period {p}: diff {diff}");
        }
    }

    #[test]
    fn test_zero_rates_hold_value() {
        let mut params = suv();
        params.first_year_rate = Decimal::ZERO;
        params.subsequent_annual_rate = Decimal::ZERO;
        assert_eq!(value_at_period(&params, 48).unwrap(), dec!(40000));
    }

    #[test]
    fn test_rates_out_of_range_rejected() {
        let mut params = suv();
        params.first_year_rate = dec!(1);
        assert!(value_at_period(&params, 1).is_err());
        let mut params = suv();
        params.subsequent_annual_rate = dec!(-0.05);
        assert!(value_series(&params, 12).is_err());
    }

    #[test]
    fn test_project_depreciation_summary() {
        let out = project_depreciation(&DepreciationInput {
            params: suv(),
            periods: 12,
        })
        .unwrap()
        .result;
        assert!((out.total_depreciation_pct - dec!(0.20)).abs() < dec!(0.001));
        assert_eq!(out.final_value, out.series.points[12].value);
    }
}
