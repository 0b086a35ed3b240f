//! Customer requests and the Poisson call generator that produces them.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use crate::city_graph::{CityGraph, VertexId};
use crate::clock::SimulationClock;
use crate::distributions::{derive_seed, ExponentialInterArrival, PositiveNormal, DEMAND_STREAM};
use crate::geometry::Position;

/// Mean trip length in kilometres.
const DEFAULT_TRIP_MEAN: f64 = 2.0;
const DEFAULT_TRIP_STD_DEV: f64 = 1.5;
/// Trip-length draws per call before the call is skipped.
const MAX_DESTINATION_ATTEMPTS: usize = 32;

/// A customer call: be picked up at `pickup` and driven to `dropoff`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Request {
    pub pickup: Position,
    pub dropoff: Position,
    /// Arrival time in hours.
    pub time: f64,
}

impl Request {
    pub fn new(pickup: Position, dropoff: Position, time: f64) -> Self {
        Self {
            pickup,
            dropoff,
            time,
        }
    }
}

/// Call rate (per intersection per hour) within an hour-of-day window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DemandWindow {
    pub start_hour: f64,
    pub end_hour: f64,
    pub rate_per_hour: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DemandSchedule {
    pub windows: Vec<DemandWindow>,
    /// Rate outside every window.
    pub default_rate_per_hour: f64,
}

impl Default for DemandSchedule {
    fn default() -> Self {
        Self::constant(3.0)
    }
}

impl DemandSchedule {
    pub fn constant(rate_per_hour: f64) -> Self {
        Self {
            windows: Vec::new(),
            default_rate_per_hour: rate_per_hour,
        }
    }

    /// Three calls an hour during the morning and evening peaks (7-9, 17-19),
    /// two during the day (9-17) and evening (19-23), three otherwise.
    pub fn rush_hours() -> Self {
        Self::constant(3.0)
            .with_window(7.0, 9.0, 3.0)
            .with_window(17.0, 19.0, 3.0)
            .with_window(9.0, 17.0, 2.0)
            .with_window(19.0, 23.0, 2.0)
    }

    pub fn with_window(mut self, start_hour: f64, end_hour: f64, rate_per_hour: f64) -> Self {
        self.windows.push(DemandWindow {
            start_hour,
            end_hour,
            rate_per_hour,
        });
        self
    }

    /// Rate at `hour_of_day`. The first matching window wins.
    pub fn rate_at(&self, hour_of_day: f64) -> f64 {
        self.windows
            .iter()
            .find(|w| hour_of_day >= w.start_hour && hour_of_day < w.end_hour)
            .map_or(self.default_rate_per_hour, |w| w.rate_per_hour)
    }
}

/// Seeded generator of calls arriving at every intersection.
#[derive(Debug)]
pub struct CallGenerator {
    schedule: DemandSchedule,
    trip_length: PositiveNormal,
    rng: StdRng,
}

impl CallGenerator {
    pub fn new(schedule: DemandSchedule, seed: u64) -> Self {
        Self {
            schedule,
            trip_length: PositiveNormal::new(DEFAULT_TRIP_MEAN, DEFAULT_TRIP_STD_DEV),
            rng: StdRng::seed_from_u64(derive_seed(seed, DEMAND_STREAM)),
        }
    }

    pub fn with_trip_length(mut self, trip_length: PositiveNormal) -> Self {
        self.trip_length = trip_length;
        self
    }

    pub fn schedule(&self) -> &DemandSchedule {
        &self.schedule
    }

    /// Calls arriving during the hour that starts at `clock.now()`, sorted by time.
    pub fn generate_hour(&mut self, graph: &CityGraph, clock: &SimulationClock) -> Vec<Request> {
        let now = clock.now();
        let arrivals = ExponentialInterArrival::new(self.schedule.rate_at(clock.hour_of_day()));
        let mut calls = Vec::new();

        for vertex in 0..graph.vertex_count() {
            let pickup = graph.position(VertexId(vertex));
            let mut offset = 0.0;
            loop {
                offset += arrivals.sample_hours(&mut self.rng);
                if offset >= 1.0 {
                    break;
                }
                if let Some(dropoff) = self.draw_destination(graph, VertexId(vertex)) {
                    calls.push(Request::new(pickup, dropoff, now + offset));
                }
            }
        }

        calls.sort_by(|a, b| a.time.total_cmp(&b.time));
        calls
    }

    fn draw_destination(&mut self, graph: &CityGraph, from: VertexId) -> Option<Position> {
        for _ in 0..MAX_DESTINATION_ATTEMPTS {
            let distance = self.trip_length.sample(&mut self.rng);
            let candidates = graph.positions_at_distance(from, distance);
            if let Some(dropoff) = candidates.choose(&mut self.rng) {
                return Some(*dropoff);
            }
        }
        log::warn!(
            "no destination found from {} after {MAX_DESTINATION_ATTEMPTS} draws",
            graph.position(from)
        );
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bidding::BiddingStrategy;
    use crate::config::DispatchConfig;
    use crate::plan::TripPlanner;
    use crate::test_helpers::{default_city, unit_square};
    use crate::vehicle::{Vehicle, VehicleId};
    use rand::Rng;

    #[test]
    fn schedule_windows_take_precedence() {
        let schedule = DemandSchedule::constant(3.0).with_window(9.0, 17.0, 2.0);
        assert_eq!(schedule.rate_at(8.0), 3.0);
        assert_eq!(schedule.rate_at(9.0), 2.0);
        assert_eq!(schedule.rate_at(17.0), 3.0);
    }

    #[test]
    fn rush_hour_schedule_lowers_off_peak_rates() {
        let schedule = DemandSchedule::rush_hours();
        assert_eq!(schedule.rate_at(8.0), 3.0);
        assert_eq!(schedule.rate_at(12.0), 2.0);
        assert_eq!(schedule.rate_at(18.5), 3.0);
        assert_eq!(schedule.rate_at(20.0), 2.0);
        assert_eq!(schedule.rate_at(23.5), 3.0);
    }

    #[test]
    fn generated_calls_are_sorted_within_the_hour() {
        let graph = default_city();
        let mut generator = CallGenerator::new(DemandSchedule::default(), 5);
        let clock = SimulationClock::starting_at(7.0);
        let calls = generator.generate_hour(&graph, &clock);

        assert!(!calls.is_empty());
        for pair in calls.windows(2) {
            assert!(pair[0].time <= pair[1].time);
        }
        for call in &calls {
            assert!(call.time >= 7.0 && call.time < 8.0);
            assert!(graph.vertex_id(&call.pickup).is_some());
            assert!(graph.position_distance(&call.pickup, &call.dropoff).is_ok());
        }
    }

    #[test]
    fn same_seed_same_calls() {
        let graph = default_city();
        let clock = SimulationClock::default();
        let a = CallGenerator::new(DemandSchedule::default(), 11).generate_hour(&graph, &clock);
        let b = CallGenerator::new(DemandSchedule::default(), 11).generate_hour(&graph, &clock);
        assert_eq!(a, b);
    }

    #[test]
    fn zero_rate_generates_nothing() {
        let graph = default_city();
        let mut generator = CallGenerator::new(DemandSchedule::constant(0.0), 1);
        assert!(generator
            .generate_hour(&graph, &SimulationClock::default())
            .is_empty());
    }

    #[test]
    fn demand_and_shaded_bids_draw_from_separate_streams() {
        let seed = 42;
        let mut generator = CallGenerator::new(DemandSchedule::default(), seed);
        let first_uniform: f64 = generator.rng.gen();

        let graph = unit_square();
        let planner = TripPlanner::from_config(&DispatchConfig::default());
        let mut vehicle = Vehicle::new(
            VehicleId(0),
            Position::new(0.0, 0.0),
            &[],
            BiddingStrategy::Shaded,
            seed,
        )
        .expect("vehicle");
        let request = Request::new(Position::new(0.0, 0.0), Position::new(1.0, 0.0), 0.0);
        let plan = vehicle
            .generate_plan(&graph, &planner, &request)
            .expect("plan");
        let fraction = plan.bid / plan.value;

        assert!(
            (fraction - first_uniform).abs() > 1e-9,
            "shaded fraction {fraction} replays the demand stream"
        );
    }
}
