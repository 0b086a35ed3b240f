use anyhow::{ensure, Result};
use dispatch_core::coordinator::DispatchCoordinator;

use crate::metrics::SimulationResult;
use crate::parameters::ParameterSet;

pub(crate) fn export_to_csv_impl(
    results: &[SimulationResult],
    parameter_sets: &[ParameterSet],
    file: std::fs::File,
) -> Result<()> {
    ensure!(
        results.len() == parameter_sets.len(),
        "results length ({}) doesn't match parameter_sets length ({})",
        results.len(),
        parameter_sets.len()
    );

    let mut wtr = csv::Writer::from_writer(file);

    wtr.write_record([
        "experiment_id",
        "run_id",
        "seed",
        "days",
        "auction_type",
        "payment_rule",
        "bidding_strategy",
        "payment_ratio",
        "charge_rate_per_kilometer",
        "gas_cost_per_kilometer",
        "driving_velocity",
        "waiting_time_threshold",
        "value_ratio",
        "train_every_hours",
        "total_vehicles",
        "total_requests",
        "accepted_requests",
        "dropped_requests",
        "acceptance_rate",
        "coordinator_payoff",
        "vehicle_payoff_total",
        "vehicle_payoff_min",
        "vehicle_payoff_max",
        "avg_waiting_time",
        "median_waiting_time",
        "p90_waiting_time",
        "trained_experiences",
    ])?;

    for (result, param_set) in results.iter().zip(parameter_sets) {
        let config = &param_set.config;
        wtr.write_record([
            &param_set.experiment_id,
            &param_set.run_id.to_string(),
            &param_set.seed.to_string(),
            &param_set.days.to_string(),
            &config.auction_type.to_string(),
            &config.payment_rule.to_string(),
            &config.bidding_strategy.to_string(),
            &config.payment_ratio.to_string(),
            &config.charge_rate_per_kilometer.to_string(),
            &config.gas_cost_per_kilometer.to_string(),
            &config.driving_velocity.to_string(),
            &config.waiting_time_threshold.to_string(),
            &config.value_ratio.to_string(),
            &param_set
                .train_every_hours
                .map(|h| h.to_string())
                .unwrap_or_default(),
            &result.total_vehicles.to_string(),
            &result.total_requests.to_string(),
            &result.accepted_requests.to_string(),
            &result.dropped_requests.to_string(),
            &result.acceptance_rate.to_string(),
            &result.coordinator_payoff.to_string(),
            &result.vehicle_payoff_total.to_string(),
            &result.vehicle_payoff_min.to_string(),
            &result.vehicle_payoff_max.to_string(),
            &result.avg_waiting_time.to_string(),
            &result.median_waiting_time.to_string(),
            &result.p90_waiting_time.to_string(),
            &result.trained_experiences.to_string(),
        ])?;
    }

    wtr.flush()?;
    Ok(())
}

/// Coordinator rows first, then each vehicle in arena order. Both histories
/// hold one entry per booked call; the cumulative column is summed here.
pub(crate) fn export_payoff_history_impl(
    coordinator: &DispatchCoordinator,
    file: std::fs::File,
) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(file);
    wtr.write_record(["owner", "step", "payoff", "cumulative"])?;

    write_history(&mut wtr, "coordinator", coordinator.payoff_history())?;
    for vehicle in coordinator.vehicles() {
        write_history(&mut wtr, &vehicle.id().to_string(), vehicle.payoff_history())?;
    }

    wtr.flush()?;
    Ok(())
}

fn write_history<W: std::io::Write>(
    wtr: &mut csv::Writer<W>,
    owner: &str,
    history: &[f64],
) -> Result<()> {
    let mut cumulative = 0.0;
    for (step, &payoff) in history.iter().enumerate() {
        if !payoff.is_finite() {
            log::warn!("skipping non-finite payoff {payoff} of {owner} at step {step}");
            continue;
        }
        cumulative += payoff;
        wtr.write_record([
            owner,
            &step.to_string(),
            &payoff.to_string(),
            &cumulative.to_string(),
        ])?;
    }
    Ok(())
}
