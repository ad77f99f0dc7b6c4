mod commands;
mod input;
mod output;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::process;
use tracing_subscriber::EnvFilter;

use commands::collateral::{DepreciationArgs, GapArgs};
use commands::loans::{AmortizeArgs, BalloonArgs, BalloonOptionsArgs, CompareArgs, EarlyPayoffArgs};

/// Auto loan amortisation, balloon and GAP exposure calculations
#[derive(Parser)]
#[command(
    name = "afe",
    version,
    about = "Auto loan amortisation, balloon and GAP exposure calculations",
    long_about = "A CLI for auto-finance loan calculations with decimal precision. \
                  Supports level-payment schedules, early payoff with extra and lump-sum \
                  payments, balloon structuring, offer comparison, vehicle depreciation \
                  and loan-versus-value GAP exposure."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,

    /// Log computation details to stderr
    #[arg(long, short, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Standard level-payment amortisation schedule
    Amortize(AmortizeArgs),
    /// Schedule with extra monthly and/or lump-sum payments
    EarlyPayoff(EarlyPayoffArgs),
    /// Structure a balloon loan
    Balloon(BalloonArgs),
    /// Compare several balloon fractions for one loan
    BalloonOptions(BalloonOptionsArgs),
    /// Compare independent loan offers by total cost
    Compare(CompareArgs),
    /// Project a vehicle's value over time
    Depreciation(DepreciationArgs),
    /// Loan balance versus vehicle value exposure
    Gap(GapArgs),
    /// Print version information
    Version,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Csv,
    Minimal,
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result: Result<serde_json::Value, Box<dyn std::error::Error>> = match cli.command {
        Commands::Amortize(args) => commands::loans::run_amortize(args),
        Commands::EarlyPayoff(args) => commands::loans::run_early_payoff(args),
        Commands::Balloon(args) => commands::loans::run_balloon(args),
        Commands::BalloonOptions(args) => commands::loans::run_balloon_options(args),
        Commands::Compare(args) => commands::loans::run_compare(args),
        Commands::Depreciation(args) => commands::collateral::run_depreciation(args),
        Commands::Gap(args) => commands::collateral::run_gap(args),
        Commands::Version => {
            println!("afe {}", env!("CARGO_PKG_VERSION"));
            return;
        }
    };

    match result {
        Ok(value) => {
            output::format_output(&cli.output, &value);
            process::exit(0);
        }
        Err(e) => {
            tracing::debug!(error = %e, "command failed");
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    }
}
