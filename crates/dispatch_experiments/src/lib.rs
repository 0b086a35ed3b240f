//! Experiment tooling for the auction-based dispatch simulator.
//!
//! This crate drives [`dispatch_core`] over whole simulated days: it generates
//! hourly demand, allocates it, trains learned bidding policies, and exports
//! schedules, payoff histories and per-run metrics. Sweeps over auction
//! rules run in parallel, one independent simulation per rayon task.
//!
//! # Quick Start
//!
//! ```no_run
//! use dispatch_core::config::CityPreset;
//! use dispatch_experiments::{export_to_parquet, run_parallel_experiments, ParameterSpace};
//!
//! // Every auction type crossed with every payment rule, three runs each.
//! let parameter_sets = ParameterSpace::all_auction_rules().runs(3).generate();
//!
//! let results = run_parallel_experiments(&CityPreset::default(), &parameter_sets, None)?;
//! export_to_parquet(&results, "auction_sweep.parquet")?;
//! # Ok::<(), anyhow::Error>(())
//! ```
//!
//! # Architecture
//!
//! - [`parameters`]: parameter grids over auction settings
//! - [`runner`]: the hourly simulation loop and parallel sweeps
//! - [`policy`]: a linear-Gaussian bidding policy for learned strategies
//! - [`metrics`]: per-run metrics extraction
//! - [`export`]: Parquet/CSV/JSON writers
//! - [`logging`]: terminal and file logger setup

pub mod export;
pub mod logging;
pub mod metrics;
pub mod parameters;
pub mod policy;
pub mod runner;

pub use export::{
    export_payoff_history_csv, export_schedules_json, export_to_csv, export_to_json,
    export_to_parquet,
};
pub use logging::init_logging;
pub use metrics::SimulationResult;
pub use parameters::{ParameterSet, ParameterSpace};
pub use policy::LinearGaussianPolicy;
pub use runner::{run_parallel_experiments, run_simulation, SimulationRun};
