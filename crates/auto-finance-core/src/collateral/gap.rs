//! GAP exposure: how far the outstanding loan balance sits above the
//! vehicle's market value, and when that shortfall peaks.
//!
//! Series are aligned by position, position `i` being period `i` (period 0 is
//! origination). When the two series differ in length only the common prefix
//! is analysed and the result is flagged as truncated.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::collateral::depreciation::{value_series, DepreciationParams};
use crate::error::AutoFinanceError;
use crate::loans::amortization::LoanTerms;
use crate::loans::early_payoff::simulate;
use crate::types::*;
use crate::AutoFinanceResult;

/// Balance, value and shortfall for one period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GapPoint {
    pub period: u32,
    pub balance: Money,
    pub value: Money,
    /// `max(0, balance - value)`
    pub gap: Money,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GapResult {
    pub max_gap: Money,
    /// Earliest period at which `max_gap` occurs.
    pub period_of_max_gap: u32,
    pub points: Vec<GapPoint>,
    /// Periods in which the balance exceeds the value.
    pub periods_underwater: u32,
    /// True when the input series had different lengths.
    pub truncated: bool,
}

/// A financed vehicle: the loan and the depreciation curve of its collateral.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GapInput {
    pub loan: LoanTerms,
    pub depreciation: DepreciationParams,
}

/// Compare a balance series with a value series period by period.
pub fn analyze(balance_series: &[Money], value_series: &[Money]) -> AutoFinanceResult<GapResult> {
    let len = balance_series.len().min(value_series.len());
    if len == 0 {
        return Err(AutoFinanceError::invalid(
            "balance_series",
            "Balance and value series must both be non-empty",
        ));
    }

    let mut points = Vec::with_capacity(len);
    let mut max_gap = Decimal::ZERO;
    let mut period_of_max_gap = 0u32;
    let mut periods_underwater = 0u32;

    for (i, (&balance, &value)) in balance_series.iter().zip(value_series).enumerate() {
        let period = i as u32;
        let gap = (balance - value).max(Decimal::ZERO);
        if gap > Decimal::ZERO {
            periods_underwater += 1;
        }
        // Strict comparison keeps the earliest period on ties.
        if gap > max_gap {
            max_gap = gap;
            period_of_max_gap = period;
        }
        points.push(GapPoint {
            period,
            balance,
            value,
            gap,
        });
    }

    Ok(GapResult {
        max_gap,
        period_of_max_gap,
        points,
        periods_underwater,
        truncated: balance_series.len() != value_series.len(),
    })
}

/// Balance after each period, from origination to the end of the term.
/// Periods after an early payoff carry a zero balance.
fn balance_path(loan: &LoanTerms) -> AutoFinanceResult<Vec<Money>> {
    let schedule = simulate(loan)?;
    let mut balances = Vec::with_capacity(loan.term_periods as usize + 1);
    balances.push(loan.principal);
    balances.extend(schedule.periods.iter().map(|p| p.ending_balance));
    balances.resize(loan.term_periods as usize + 1, Decimal::ZERO);
    Ok(balances)
}

/// Run the loan and the depreciation curve over the full term and analyse
/// the exposure between them.
pub fn analyze_loan_gap(input: &GapInput) -> AutoFinanceResult<ComputationOutput<GapResult>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    let balances = balance_path(&input.loan)?;
    let values = value_series(&input.depreciation, input.loan.term_periods)?.values();
    let result = analyze(&balances, &values)?;

    if result.max_gap > Decimal::ZERO {
        warnings.push(format!(
            "Loan balance exceeds vehicle value for {} periods; peak shortfall {} at period {}",
            result.periods_underwater,
            result.max_gap.round_dp(2),
            result.period_of_max_gap
        ));
    }

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "GAP exposure (loan balance vs. depreciated value)",
        &serde_json::json!({
            "principal": input.loan.principal.to_string(),
            "annual_rate_percent": input.loan.annual_rate_percent.to_string(),
            "term_periods": input.loan.term_periods,
            "initial_value": input.depreciation.initial_value.to_string(),
            "first_year_rate": input.depreciation.first_year_rate.to_string(),
            "subsequent_annual_rate": input.depreciation.subsequent_annual_rate.to_string(),
        }),
        warnings,
        elapsed,
        result,
    ))
}
