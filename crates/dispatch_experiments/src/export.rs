//! Result export.
//!
//! Sweep results go to Parquet, CSV or JSON; a single run's schedules go to
//! JSON and its payoff histories to CSV.

use std::path::Path;

use anyhow::Result;
use dispatch_core::coordinator::DispatchCoordinator;
use dispatch_core::schedule::VehicleSchedule;

use crate::metrics::SimulationResult;
use crate::parameters::ParameterSet;

#[path = "export/csv.rs"]
mod csv;
#[path = "export/json.rs"]
mod json;
#[path = "export/parquet.rs"]
mod parquet;
#[path = "export/writer_utils.rs"]
mod writer_utils;

/// Export simulation results to Parquet, one row per run.
///
/// # Errors
///
/// Fails on an empty result set, or if file creation or Parquet writing fails.
pub fn export_to_parquet(results: &[SimulationResult], path: impl AsRef<Path>) -> Result<()> {
    writer_utils::ensure_not_empty(results)?;
    let file = writer_utils::create_output_file(path)?;
    parquet::export_to_parquet_impl(results, file)
}

/// Export simulation results as a pretty-printed JSON array.
pub fn export_to_json(results: &[SimulationResult], path: impl AsRef<Path>) -> Result<()> {
    let file = writer_utils::create_output_file(path)?;
    json::write_pretty(results, file)
}

/// Export simulation results with their parameters to CSV.
///
/// `results[i]` must belong to `parameter_sets[i]`.
///
/// # Errors
///
/// Fails on an empty result set, on a length mismatch, or if writing fails.
pub fn export_to_csv(
    results: &[SimulationResult],
    parameter_sets: &[ParameterSet],
    path: impl AsRef<Path>,
) -> Result<()> {
    writer_utils::ensure_not_empty(results)?;
    let file = writer_utils::create_output_file(path)?;
    csv::export_to_csv_impl(results, parameter_sets, file)
}

/// Export gap-filled vehicle schedules as JSON.
pub fn export_schedules_json(schedules: &[VehicleSchedule], path: impl AsRef<Path>) -> Result<()> {
    let file = writer_utils::create_output_file(path)?;
    json::write_pretty(schedules, file)
}

/// Export coordinator and vehicle payoff histories to CSV.
///
/// One row per booked payment: `owner,step,payoff,cumulative`.
pub fn export_payoff_history_csv(
    coordinator: &DispatchCoordinator,
    path: impl AsRef<Path>,
) -> Result<()> {
    let file = writer_utils::create_output_file(path)?;
    csv::export_payoff_history_impl(coordinator, file)
}
