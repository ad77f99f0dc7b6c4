use clap::Args;
use rust_decimal::Decimal;
use serde_json::Value;

use auto_finance_core::loans::amortization::{self, LoanTerms};
use auto_finance_core::loans::balloon::{self, BalloonOptionsInput, BalloonTerms};
use auto_finance_core::loans::comparison::{self, OfferComparisonInput};
use auto_finance_core::loans::early_payoff;

use crate::input;

/// Loan flags shared by the schedule commands
#[derive(Args)]
pub struct LoanFlags {
    /// Amount financed
    #[arg(long)]
    pub principal: Option<Decimal>,

    /// Annual rate in percent (e.g. 4.5)
    #[arg(long)]
    pub rate: Option<Decimal>,

    /// Term in months
    #[arg(long)]
    pub term: Option<u32>,
}

impl LoanFlags {
    fn any(&self) -> bool {
        self.principal.is_some() || self.rate.is_some() || self.term.is_some()
    }

    fn to_terms(&self) -> Result<LoanTerms, Box<dyn std::error::Error>> {
        let principal = self
            .principal
            .ok_or("--principal is required (or provide --input)")?;
        let rate = self.rate.ok_or("--rate is required (or provide --input)")?;
        let term = self.term.ok_or("--term is required (or provide --input)")?;
        Ok(LoanTerms::new(principal, rate, term))
    }
}

/// Arguments for the standard amortisation schedule
#[derive(Args)]
pub struct AmortizeArgs {
    /// Path to JSON input file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,

    #[command(flatten)]
    pub loan: LoanFlags,
}

pub fn run_amortize(args: AmortizeArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let terms: LoanTerms = if let Some(loaded) =
        input::load(args.input.as_deref(), args.loan.any())?
    {
        loaded
    } else {
        args.loan.to_terms()?
    };

    let result = amortization::amortize(&terms)?;
    Ok(serde_json::to_value(result)?)
}

/// Arguments for early payoff simulation
#[derive(Args)]
pub struct EarlyPayoffArgs {
    /// Path to JSON input file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,

    #[command(flatten)]
    pub loan: LoanFlags,

    /// Extra amount paid every month
    #[arg(long)]
    pub extra: Option<Decimal>,

    /// One-time lump sum
    #[arg(long)]
    pub lump_sum: Option<Decimal>,

    /// Month in which the lump sum is paid (1-based)
    #[arg(long)]
    pub lump_sum_period: Option<u32>,
}

pub fn run_early_payoff(args: EarlyPayoffArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let terms: LoanTerms = if let Some(loaded) =
        input::load(args.input.as_deref(), args.loan.any())?
    {
        loaded
    } else {
        let mut terms = args.loan.to_terms()?;
        terms.extra_payment = args.extra;
        terms.lump_sum = args.lump_sum;
        terms.lump_sum_period = args.lump_sum_period;
        terms
    };

    let result = early_payoff::analyze_early_payoff(&terms)?;
    Ok(serde_json::to_value(result)?)
}

/// Arguments for balloon structuring
#[derive(Args)]
pub struct BalloonArgs {
    /// Path to JSON input file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,

    #[command(flatten)]
    pub loan: LoanFlags,

    /// Balloon as a fraction of principal (e.g. 0.3)
    #[arg(long)]
    pub balloon_fraction: Option<Decimal>,

    /// Rate reduction in percentage points for taking the balloon
    #[arg(long, default_value = "0")]
    pub rate_incentive: Decimal,
}

pub fn run_balloon(args: BalloonArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let terms: BalloonTerms = if let Some(loaded) =
        input::load(args.input.as_deref(), args.loan.any())?
    {
        loaded
    } else {
        let loan = args.loan.to_terms()?;
        let balloon_fraction = args
            .balloon_fraction
            .ok_or("--balloon-fraction is required (or provide --input)")?;
        BalloonTerms {
            principal: loan.principal,
            annual_rate_percent: loan.annual_rate_percent,
            term_periods: loan.term_periods,
            balloon_fraction,
            rate_incentive_percent: args.rate_incentive,
        }
    };

    let result = balloon::structure_balloon(&terms)?;
    Ok(serde_json::to_value(result)?)
}

/// Arguments for balloon options comparison
#[derive(Args)]
pub struct BalloonOptionsArgs {
    /// Path to JSON input file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,

    #[command(flatten)]
    pub loan: LoanFlags,

    /// Balloon fractions to compare (comma-separated, e.g. "0,0.2,0.35")
    #[arg(long, value_delimiter = ',')]
    pub fractions: Option<Vec<Decimal>>,

    /// Rate reduction in percentage points for taking the balloon
    #[arg(long, default_value = "0")]
    pub rate_incentive: Decimal,
}

pub fn run_balloon_options(args: BalloonOptionsArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let options_input: BalloonOptionsInput = if let Some(loaded) =
        input::load(args.input.as_deref(), args.loan.any())?
    {
        loaded
    } else {
        let loan = args.loan.to_terms()?;
        BalloonOptionsInput {
            principal: loan.principal,
            annual_rate_percent: loan.annual_rate_percent,
            term_periods: loan.term_periods,
            rate_incentive_percent: args.rate_incentive,
            balloon_fractions: args
                .fractions
                .ok_or("--fractions is required (or provide --input)")?,
        }
    };

    let result = balloon::compare_balloon_options(&options_input)?;
    Ok(serde_json::to_value(result)?)
}

/// Arguments for loan offer comparison
#[derive(Args)]
pub struct CompareArgs {
    /// Path to JSON input file
    #[arg(long)]
    pub input: Option<String>,
}

pub fn run_compare(args: CompareArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let cmp_input: OfferComparisonInput = input::load(args.input.as_deref(), false)?
        .ok_or("--input <file.json> or stdin required for offer comparison")?;
    let result = comparison::compare_offers(&cmp_input)?;
    Ok(serde_json::to_value(result)?)
}
