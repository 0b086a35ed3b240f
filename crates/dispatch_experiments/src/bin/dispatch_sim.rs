use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use dispatch_core::auction::{AuctionType, PaymentRule};
use dispatch_core::bidding::BiddingStrategyKind;
use dispatch_core::config::{CityPreset, DispatchConfig};
use dispatch_core::schedule::RouteMode;
use dispatch_experiments::runner::run_parallel_experiments_with_progress;
use dispatch_experiments::{
    export_payoff_history_csv, export_schedules_json, export_to_csv, export_to_json,
    export_to_parquet, init_logging, run_simulation, ParameterSet, ParameterSpace,
};
use log::LevelFilter;

/// Learned policies train once per simulated day unless told otherwise.
const DEFAULT_TRAIN_EVERY_HOURS: u32 = 24;

// ── CLI definition ─────────────────────────────────────────────────

#[derive(Parser)]
#[command(
    name = "dispatch_sim",
    about = "Auction-based taxi dispatch simulator",
    long_about = "Simulates taxi dispatch on a Manhattan-metric city where every\n\
                  request is auctioned among the available vehicles."
)]
struct Cli {
    /// Log level for terminal and file output
    #[arg(long, default_value_t = LevelFilter::Info, global = true)]
    log_level: LevelFilter,
    /// Also write the log to this file
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Simulate the default city and export schedules, payoffs and a summary
    Run {
        /// JSON file with a dispatch config; flags below override it
        #[arg(long)]
        config: Option<PathBuf>,
        /// first-price or second-price
        #[arg(long)]
        auction_type: Option<AuctionType>,
        /// cost-minus-bid, value-proportional or blended
        #[arg(long)]
        payment_rule: Option<PaymentRule>,
        /// truthful, shaded or learned
        #[arg(long)]
        strategy: Option<BiddingStrategyKind>,
        /// Simulated days
        #[arg(long, default_value_t = 1)]
        days: u32,
        #[arg(long, default_value_t = 0)]
        seed: u64,
        /// Train learned policies every this many hours
        #[arg(long)]
        train_every_hours: Option<u32>,
        /// Output directory
        #[arg(long, default_value = "dispatch_output")]
        output: PathBuf,
        /// Export routes relative to their first waypoint
        #[arg(long)]
        relative_routes: bool,
    },
    /// Sweep every auction type and payment rule in parallel
    Sweep {
        /// Runs per parameter combination
        #[arg(long, default_value_t = 1)]
        runs: usize,
        #[arg(long, default_value_t = 1)]
        days: u32,
        /// Bidding strategies to cross with the auction rules
        #[arg(long, value_delimiter = ',', default_value = "truthful")]
        strategies: Vec<BiddingStrategyKind>,
        /// Worker threads (defaults to the number of cores)
        #[arg(long)]
        threads: Option<usize>,
        #[arg(value_enum, long, default_value_t = SweepFormat::Parquet)]
        format: SweepFormat,
        /// Output file
        #[arg(long, default_value = "auction_sweep.parquet")]
        output: PathBuf,
        /// Hide the progress bar
        #[arg(long)]
        quiet: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum SweepFormat {
    Parquet,
    Csv,
    Json,
}

// ── Commands ───────────────────────────────────────────────────────

fn load_config(path: Option<&Path>) -> Result<DispatchConfig> {
    let Some(path) = path else {
        return Ok(DispatchConfig::default());
    };
    let file = File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    let config: DispatchConfig = serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("invalid dispatch config in {}", path.display()))?;
    Ok(config)
}

#[allow(clippy::too_many_arguments)]
fn run(
    config: Option<PathBuf>,
    auction_type: Option<AuctionType>,
    payment_rule: Option<PaymentRule>,
    strategy: Option<BiddingStrategyKind>,
    days: u32,
    seed: u64,
    train_every_hours: Option<u32>,
    output: PathBuf,
    relative_routes: bool,
) -> Result<()> {
    let mut config = load_config(config.as_deref())?;
    if let Some(auction_type) = auction_type {
        config = config.with_auction_type(auction_type);
    }
    if let Some(payment_rule) = payment_rule {
        config = config.with_payment_rule(payment_rule);
    }
    if let Some(strategy) = strategy {
        config = config.with_bidding_strategy(strategy);
    }
    config.validate().context("invalid dispatch config")?;

    let mut param_set = ParameterSet::new(config, "run".to_string(), 0, seed).with_days(days);
    if param_set.config.bidding_strategy == BiddingStrategyKind::Learned {
        param_set = param_set.with_training(train_every_hours.unwrap_or(DEFAULT_TRAIN_EVERY_HOURS));
    }

    log::info!(
        "Simulating {days} day(s): {} auction, {} payment, {} bids, seed {seed}",
        param_set.config.auction_type,
        param_set.config.payment_rule,
        param_set.config.bidding_strategy
    );
    let run = run_simulation(&CityPreset::default(), &param_set)?;

    let mode = if relative_routes {
        RouteMode::Relative
    } else {
        RouteMode::Absolute
    };
    let schedules = run
        .coordinator
        .complete_schedules(f64::from(param_set.hours()), mode)
        .context("failed to complete vehicle schedules")?;

    export_schedules_json(&schedules, output.join("schedules.json"))?;
    export_payoff_history_csv(&run.coordinator, output.join("payoffs.csv"))?;
    export_to_json(std::slice::from_ref(&run.metrics), output.join("summary.json"))?;

    log::info!(
        "Accepted {}/{} requests, coordinator payoff {:.2}, vehicle payoff {:.2}",
        run.metrics.accepted_requests,
        run.metrics.total_requests,
        run.metrics.coordinator_payoff,
        run.metrics.vehicle_payoff_total
    );
    log::info!("Results written to {}", output.display());
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn sweep(
    runs: usize,
    days: u32,
    strategies: Vec<BiddingStrategyKind>,
    threads: Option<usize>,
    format: SweepFormat,
    output: PathBuf,
    quiet: bool,
) -> Result<()> {
    let learned = strategies.contains(&BiddingStrategyKind::Learned);
    let space = ParameterSpace::all_auction_rules()
        .bidding_strategy(strategies)
        .runs(runs)
        .days(days)
        .train_every_hours(learned.then_some(DEFAULT_TRAIN_EVERY_HOURS));
    let parameter_sets = space.generate();
    log::info!("Running {} simulations", parameter_sets.len());

    let results =
        run_parallel_experiments_with_progress(&CityPreset::default(), &parameter_sets, threads, !quiet)?;

    match format {
        SweepFormat::Parquet => export_to_parquet(&results, &output)?,
        SweepFormat::Csv => export_to_csv(&results, &parameter_sets, &output)?,
        SweepFormat::Json => export_to_json(&results, &output)?,
    }

    if let Some(best) = results
        .iter()
        .max_by(|a, b| a.coordinator_payoff.total_cmp(&b.coordinator_payoff))
    {
        log::info!(
            "Highest coordinator payoff {:.2}: {} / {} / {} ({})",
            best.coordinator_payoff,
            best.auction_type,
            best.payment_rule,
            best.bidding_strategy,
            best.experiment_id
        );
    }
    log::info!("Results written to {}", output.display());
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_level, cli.log_file.as_deref())?;

    match cli.command {
        Commands::Run {
            config,
            auction_type,
            payment_rule,
            strategy,
            days,
            seed,
            train_every_hours,
            output,
            relative_routes,
        } => run(
            config,
            auction_type,
            payment_rule,
            strategy,
            days,
            seed,
            train_every_hours,
            output,
            relative_routes,
        ),
        Commands::Sweep {
            runs,
            days,
            strategies,
            threads,
            format,
            output,
            quiet,
        } => sweep(runs, days, strategies, threads, format, output, quiet),
    }
}
