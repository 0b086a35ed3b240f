//! Metrics extraction from finished simulation runs.

use dispatch_core::coordinator::DispatchCoordinator;
use serde::{Deserialize, Serialize};

/// Aggregated metrics from a single simulation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationResult {
    pub experiment_id: String,
    pub run_id: usize,
    pub auction_type: String,
    pub payment_rule: String,
    pub bidding_strategy: String,
    pub payment_ratio: f64,
    pub simulated_hours: u32,
    pub total_vehicles: usize,
    /// Requests that reached the coordinator.
    pub total_requests: usize,
    pub accepted_requests: usize,
    pub dropped_requests: usize,
    /// accepted / total; zero when no request arrived.
    pub acceptance_rate: f64,
    pub coordinator_payoff: f64,
    /// Sum of all vehicle payoffs.
    pub vehicle_payoff_total: f64,
    pub vehicle_payoff_min: f64,
    pub vehicle_payoff_max: f64,
    /// Customer waiting times, hours.
    pub avg_waiting_time: f64,
    pub median_waiting_time: f64,
    pub p90_waiting_time: f64,
    pub trained_experiences: usize,
}

impl SimulationResult {
    /// Average, median and P90 of `values`; zeros for an empty slice.
    pub(crate) fn calculate_stats(values: &[f64]) -> (f64, f64, f64) {
        if values.is_empty() {
            return (0.0, 0.0, 0.0);
        }

        let mut sorted = values.to_vec();
        sorted.sort_by(f64::total_cmp);

        let n = sorted.len();
        let avg = sorted.iter().sum::<f64>() / n as f64;
        let median = if n % 2 == 0 {
            (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
        } else {
            sorted[n / 2]
        };
        let p90_idx = ((n - 1) as f64 * 0.9) as usize;
        let p90 = sorted[p90_idx.min(n - 1)];

        (avg, median, p90)
    }
}

/// Identification of the run a result belongs to.
#[derive(Debug, Clone)]
pub struct RunLabel {
    pub experiment_id: String,
    pub run_id: usize,
    pub simulated_hours: u32,
    pub trained_experiences: usize,
}

pub fn extract_metrics(coordinator: &DispatchCoordinator, label: RunLabel) -> SimulationResult {
    let summary = coordinator.summary();
    let config = coordinator.config();

    let payoffs: Vec<f64> = coordinator.vehicles().iter().map(|v| v.payoff()).collect();
    let waits: Vec<f64> = coordinator
        .vehicles()
        .iter()
        .flat_map(|v| v.waiting_times())
        .collect();
    let (avg_wait, median_wait, p90_wait) = SimulationResult::calculate_stats(&waits);

    let total = summary.total();
    SimulationResult {
        experiment_id: label.experiment_id,
        run_id: label.run_id,
        auction_type: config.auction_type.to_string(),
        payment_rule: config.payment_rule.to_string(),
        bidding_strategy: config.bidding_strategy.to_string(),
        payment_ratio: config.payment_ratio,
        simulated_hours: label.simulated_hours,
        total_vehicles: payoffs.len(),
        total_requests: total,
        accepted_requests: summary.accepted,
        dropped_requests: summary.dropped,
        acceptance_rate: if total == 0 {
            0.0
        } else {
            summary.accepted as f64 / total as f64
        },
        coordinator_payoff: coordinator.payoff(),
        vehicle_payoff_total: payoffs.iter().sum(),
        vehicle_payoff_min: payoffs.iter().copied().reduce(f64::min).unwrap_or(0.0),
        vehicle_payoff_max: payoffs.iter().copied().reduce(f64::max).unwrap_or(0.0),
        avg_waiting_time: avg_wait,
        median_waiting_time: median_wait,
        p90_waiting_time: p90_wait,
        trained_experiences: label.trained_experiences,
    }
}
