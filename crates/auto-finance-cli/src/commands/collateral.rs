use clap::Args;
use rust_decimal::Decimal;
use serde_json::Value;

use auto_finance_core::collateral::depreciation::{
    self, CompoundingConvention, DepreciationInput, DepreciationParams,
};
use auto_finance_core::collateral::gap::{self, GapInput};

use crate::input;

/// Arguments for depreciation projection
#[derive(Args)]
pub struct DepreciationArgs {
    /// Path to JSON input file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,

    /// Vehicle value at purchase
    #[arg(long)]
    pub value: Option<Decimal>,

    /// First-year depreciation rate as a fraction (e.g. 0.2)
    #[arg(long)]
    pub first_year_rate: Option<Decimal>,

    /// Depreciation rate for later years as a fraction (e.g. 0.1)
    #[arg(long)]
    pub subsequent_rate: Option<Decimal>,

    /// Months to project
    #[arg(long, default_value = "60")]
    pub periods: u32,

    /// Use the nominal monthly convention (1 - rate/12 per month)
    #[arg(long)]
    pub nominal: bool,
}

pub fn run_depreciation(args: DepreciationArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let flags_given = args.value.is_some()
        || args.first_year_rate.is_some()
        || args.subsequent_rate.is_some();
    let dep_input: DepreciationInput = if let Some(loaded) =
        input::load(args.input.as_deref(), flags_given)?
    {
        loaded
    } else {
        let initial_value = args.value.ok_or("--value is required (or provide --input)")?;
        let first_year_rate = args
            .first_year_rate
            .ok_or("--first-year-rate is required (or provide --input)")?;
        let subsequent_annual_rate = args
            .subsequent_rate
            .ok_or("--subsequent-rate is required (or provide --input)")?;
        DepreciationInput {
            params: DepreciationParams {
                initial_value,
                first_year_rate,
                subsequent_annual_rate,
                convention: if args.nominal {
                    CompoundingConvention::NominalMonthly
                } else {
                    CompoundingConvention::EffectiveAnnual
                },
            },
            periods: args.periods,
        }
    };

    let result = depreciation::project_depreciation(&dep_input)?;
    Ok(serde_json::to_value(result)?)
}

/// Arguments for GAP exposure analysis
#[derive(Args)]
pub struct GapArgs {
    /// Path to JSON input file with `loan` and `depreciation` sections
    #[arg(long)]
    pub input: Option<String>,
}

pub fn run_gap(args: GapArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let gap_input: GapInput = input::load(args.input.as_deref(), false)?
        .ok_or("--input <file.json> or stdin required for GAP analysis")?;
    let result = gap::analyze_loan_gap(&gap_input)?;
    Ok(serde_json::to_value(result)?)
}
