//! Simulation runs: the hourly demand/allocation loop and parallel sweeps.
//!
//! Each run builds its own city graph, coordinator and policy, so runs share
//! nothing and can execute on any rayon worker.

use std::cell::RefCell;
use std::rc::Rc;

use anyhow::{Context, Result};
use dispatch_core::bidding::{BiddingStrategyKind, PolicyHandle};
use dispatch_core::clock::SimulationClock;
use dispatch_core::config::CityPreset;
use dispatch_core::coordinator::DispatchCoordinator;
use dispatch_core::demand::CallGenerator;
use dispatch_core::distributions::{derive_seed, POLICY_STREAM};
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;

use crate::metrics::{extract_metrics, RunLabel, SimulationResult};
use crate::parameters::ParameterSet;
use crate::policy::LinearGaussianPolicy;

/// A finished run: the coordinator (for schedule and payoff export) and its metrics.
#[derive(Debug)]
pub struct SimulationRun {
    pub coordinator: DispatchCoordinator,
    pub metrics: SimulationResult,
}

/// Run one parameter set over `preset` for `param_set.hours()` simulated hours.
///
/// Every hour, calls arriving during that hour are generated and allocated.
/// Learned policies are trained every `train_every_hours` hours.
pub fn run_simulation(preset: &CityPreset, param_set: &ParameterSet) -> Result<SimulationRun> {
    let config = param_set.dispatch_config();
    let policy: Option<PolicyHandle> = match config.bidding_strategy {
        BiddingStrategyKind::Learned => Some(Rc::new(RefCell::new(LinearGaussianPolicy::new(
            derive_seed(param_set.seed, POLICY_STREAM),
        )))),
        _ => None,
    };

    let mut coordinator = DispatchCoordinator::from_preset(preset, config, policy)
        .with_context(|| format!("failed to set up run {}", param_set.experiment_id))?;
    let mut generator = CallGenerator::new(preset.demand.clone(), param_set.seed);
    let mut clock = SimulationClock::default();
    let mut trained = 0;

    for hour in 1..=param_set.hours() {
        let calls = generator.generate_hour(coordinator.graph(), &clock);
        let pass = coordinator
            .allocate(&calls)
            .with_context(|| format!("allocation failed at {clock}"))?;
        log::debug!(
            "{clock}: {} calls, {} accepted, {} dropped",
            calls.len(),
            pass.accepted,
            pass.dropped
        );

        if let Some(every) = param_set.train_every_hours {
            if hour % every == 0 {
                trained += coordinator.train();
            }
        }
        clock.step(1.0);
        if hour % 24 == 0 {
            log::info!(
                "[{}] {clock}: coordinator payoff {:.2}, {} requests served so far",
                param_set.experiment_id,
                coordinator.payoff(),
                coordinator.summary().accepted
            );
        }
    }

    let metrics = extract_metrics(
        &coordinator,
        RunLabel {
            experiment_id: param_set.experiment_id.clone(),
            run_id: param_set.run_id,
            simulated_hours: param_set.hours(),
            trained_experiences: trained,
        },
    );
    Ok(SimulationRun {
        coordinator,
        metrics,
    })
}

/// Run a single simulation and keep only its metrics.
pub fn run_single_simulation(
    preset: &CityPreset,
    param_set: &ParameterSet,
) -> Result<SimulationResult> {
    run_simulation(preset, param_set).map(|run| run.metrics)
}

/// Run multiple simulations in parallel with a progress bar.
pub fn run_parallel_experiments(
    preset: &CityPreset,
    parameter_sets: &[ParameterSet],
    num_threads: Option<usize>,
) -> Result<Vec<SimulationResult>> {
    run_parallel_experiments_with_progress(preset, parameter_sets, num_threads, true)
}

/// Run multiple simulations in parallel with an optional progress bar.
///
/// Results come back in the order of `parameter_sets`. The first failing run
/// fails the sweep.
pub fn run_parallel_experiments_with_progress(
    preset: &CityPreset,
    parameter_sets: &[ParameterSet],
    num_threads: Option<usize>,
    show_progress: bool,
) -> Result<Vec<SimulationResult>> {
    let total = parameter_sets.len();
    let pb = if show_progress && total > 0 {
        let bar = ProgressBar::new(total as u64);
        bar.set_style(
            ProgressStyle::default_bar()
                .template(
                    "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})",
                )
                .context("invalid progress bar template")?
                .progress_chars("#>-"),
        );
        Some(bar)
    } else {
        None
    };

    let mut builder = rayon::ThreadPoolBuilder::new();
    if let Some(threads) = num_threads {
        builder = builder.num_threads(threads);
    }
    let pool = builder.build().context("failed to create thread pool")?;

    let results = pool.install(|| {
        parameter_sets
            .par_iter()
            .map(|param_set| {
                let result = run_single_simulation(preset, param_set);
                if let Some(progress_bar) = &pb {
                    progress_bar.inc(1);
                }
                result
            })
            .collect::<Result<Vec<_>>>()
    });

    if let Some(progress_bar) = &pb {
        progress_bar.finish_with_message("Completed");
    }

    results
}
