mod support;

use dispatch_core::clock::SimulationClock;
use dispatch_core::config::{CityPreset, DispatchConfig};
use dispatch_core::coordinator::DispatchCoordinator;
use dispatch_core::demand::CallGenerator;
use dispatch_core::schedule::RouteMode;
use dispatch_core::timeline::{IntervalKind, TimedInterval};

fn simulated_day(seed: u64) -> DispatchCoordinator {
    let preset = CityPreset::default();
    let config = DispatchConfig::default().with_seed(seed);
    let mut coordinator = DispatchCoordinator::from_preset(&preset, config, None).expect("coordinator");
    let mut generator = CallGenerator::new(preset.demand.clone(), seed);
    let mut clock = SimulationClock::default();
    for _ in 0..24 {
        let calls = generator.generate_hour(coordinator.graph(), &clock);
        coordinator.allocate(&calls).expect("allocate");
        clock.step(1.0);
    }
    coordinator
}

fn assert_partitions(intervals: &[TimedInterval], horizon: f64) {
    assert_eq!(intervals.first().map(|i| i.start_time), Some(0.0));
    assert_eq!(intervals.last().map(|i| i.end_time), Some(horizon));
    for pair in intervals.windows(2) {
        assert_eq!(pair[0].end_time, pair[1].start_time, "gap or overlap");
    }
    for interval in intervals {
        assert!(interval.start_time < interval.end_time);
    }
    let total: f64 = intervals.iter().map(TimedInterval::duration).sum();
    assert!((total - horizon).abs() < 1e-9, "durations sum to {total}");
}

#[test]
fn exported_schedules_partition_the_horizon() {
    let coordinator = simulated_day(7);
    assert!(coordinator.summary().accepted > 0);

    for horizon in [24.0, 12.5] {
        let schedules = coordinator
            .complete_schedules(horizon, RouteMode::Absolute)
            .expect("consistent schedules");
        assert_eq!(schedules.len(), coordinator.vehicles().len());
        for schedule in &schedules {
            assert_partitions(&schedule.intervals, horizon);
        }
    }
}

#[test]
fn every_shift_after_a_call_is_preceded_by_a_return_home() {
    let coordinator = simulated_day(3);
    let schedules = coordinator
        .complete_schedules(24.0, RouteMode::Absolute)
        .expect("consistent schedules");
    let home = CityPreset::default().home;

    for schedule in schedules {
        for (i, interval) in schedule.intervals.iter().enumerate() {
            if interval.kind != IntervalKind::Return {
                continue;
            }
            let next = &schedule.intervals[i + 1];
            assert_eq!(next.kind, IntervalKind::Shift);
            assert_eq!(interval.end_time, next.start_time);
            let route = interval.route.as_ref().expect("return route");
            assert_eq!(route.last(), Some(&home));
        }
    }
}

#[test]
fn relative_export_keeps_partition() {
    let coordinator = simulated_day(11);
    let schedules = coordinator
        .complete_schedules(24.0, RouteMode::Relative)
        .expect("consistent schedules");
    for schedule in &schedules {
        assert_partitions(&schedule.intervals, 24.0);
        for interval in &schedule.intervals {
            if let Some(route) = &interval.route {
                assert_eq!(route.first().map(|p| (p.x, p.y)), Some((0.0, 0.0)));
            }
        }
    }
}

#[test]
fn served_calls_respect_the_waiting_threshold() {
    let coordinator = simulated_day(5);
    let threshold = coordinator.config().waiting_time_threshold;
    for vehicle in coordinator.vehicles() {
        for wait in vehicle.waiting_times() {
            assert!(wait < threshold);
        }
    }
}
