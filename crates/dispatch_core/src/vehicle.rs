//! Vehicles: committed plans, the interval timeline and the payoff ledger.

use std::fmt;

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use crate::bidding::{BiddingStrategy, Experience};
use crate::city_graph::CityGraph;
use crate::config::ShiftWindow;
use crate::demand::Request;
use crate::distributions::{derive_seed, VEHICLE_STREAM};
use crate::error::{DispatchError, Result};
use crate::geometry::Position;
use crate::plan::{Plan, TripPlanner};
use crate::timeline::{IntervalKind, IntervalTimeline, TimedInterval};

/// Stable index of a vehicle in its coordinator's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VehicleId(pub usize);

impl fmt::Display for VehicleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "vehicle#{}", self.0)
    }
}

#[derive(Debug)]
pub struct Vehicle {
    id: VehicleId,
    home: Position,
    plans: Vec<Plan>,
    timeline: IntervalTimeline,
    payoff: f64,
    payoff_history: Vec<f64>,
    experiences: Vec<Experience>,
    strategy: BiddingStrategy,
    rng: StdRng,
}

impl Vehicle {
    /// Create a vehicle whose shifts are loaded into its timeline. Overlapping
    /// or degenerate shifts are a configuration error.
    pub fn new(
        id: VehicleId,
        home: Position,
        shifts: &[ShiftWindow],
        strategy: BiddingStrategy,
        seed: u64,
    ) -> Result<Self> {
        let mut timeline = IntervalTimeline::new();
        for &(start, end) in shifts {
            let inserted = timeline
                .add_event(TimedInterval::new(start, end, IntervalKind::Shift))
                .map_err(|_| {
                    DispatchError::Configuration(format!(
                        "{id}: shift ({start}, {end}) must end after it starts"
                    ))
                })?;
            if !inserted {
                return Err(DispatchError::Configuration(format!(
                    "{id}: shift ({start}, {end}) overlaps another shift"
                )));
            }
        }

        Ok(Self {
            id,
            home,
            plans: Vec::new(),
            timeline,
            payoff: 0.0,
            payoff_history: Vec::new(),
            experiences: Vec::new(),
            strategy,
            rng: StdRng::seed_from_u64(derive_seed(seed, VEHICLE_STREAM + id.0 as u64)),
        })
    }

    pub fn id(&self) -> VehicleId {
        self.id
    }

    pub fn home(&self) -> Position {
        self.home
    }

    pub fn plans(&self) -> &[Plan] {
        &self.plans
    }

    pub fn timeline(&self) -> &IntervalTimeline {
        &self.timeline
    }

    pub fn strategy(&self) -> &BiddingStrategy {
        &self.strategy
    }

    pub fn payoff(&self) -> f64 {
        self.payoff
    }

    pub fn payoff_history(&self) -> &[f64] {
        &self.payoff_history
    }

    pub fn pending_experiences(&self) -> usize {
        self.experiences.len()
    }

    /// Where and when the vehicle would set off to serve `request`.
    ///
    /// A vehicle with no history, or coming off a shift, leaves home at the
    /// request time. Otherwise it leaves its last dropoff once that trip ends.
    pub fn resume_point(&self, request: &Request) -> (Position, f64) {
        let after_shift = matches!(
            self.timeline.nearest_before(request.time),
            Some(interval) if interval.kind == IntervalKind::Shift
        );
        match self.plans.last() {
            Some(last) if !after_shift => (last.dropoff, last.end_time.max(request.time)),
            _ => (self.home, request.time),
        }
    }

    pub fn generate_plan(
        &mut self,
        graph: &CityGraph,
        planner: &TripPlanner,
        request: &Request,
    ) -> Result<Plan> {
        let (start, start_time) = self.resume_point(request);
        planner.plan(graph, start, start_time, request, &self.strategy, &mut self.rng)
    }

    /// A vehicle still driving its latest customer cannot take part in an auction.
    pub fn is_restricted(&self, planner: &TripPlanner, request: &Request) -> bool {
        self.plans.last().is_some_and(|latest| {
            request.time < latest.start_time + planner.travel_time(latest.requested_distance)
        })
    }

    /// The plan fits the timeline, and if a shift follows, the vehicle can
    /// still drive home before it starts.
    pub fn is_available(&self, graph: &CityGraph, planner: &TripPlanner, plan: &Plan) -> bool {
        let call = TimedInterval::new(plan.start_time, plan.end_time, IntervalKind::Call);
        if !self.timeline.is_valid(&call) {
            return false;
        }

        match self.timeline.nearest_after(plan.start_time) {
            Some(next) if next.kind == IntervalKind::Shift => {
                match graph.position_distance(&plan.dropoff, &self.home) {
                    Ok(route) => plan.end_time + planner.travel_time(route.distance) <= next.start_time,
                    Err(_) => false,
                }
            }
            _ => true,
        }
    }

    /// Commit a won plan and book the payoff `plan.margin - payment`.
    ///
    /// The unclamped margin is booked so that a loss-making trip admitted
    /// with the value filter off shows up as a loss.
    pub fn assign(&mut self, plan: Plan, payment: f64) -> Result<f64> {
        let call = TimedInterval::new(plan.start_time, plan.end_time, IntervalKind::Call)
            .with_route(plan.route.clone());
        if !self.timeline.add_event(call)? {
            return Err(DispatchError::SchedulingInvariant {
                start: plan.start_time,
                end: plan.end_time,
            });
        }

        let payoff = plan.margin - payment;
        self.payoff += payoff;
        self.payoff_history.push(payoff);

        if self.strategy.is_learned() {
            self.experiences.push(Experience {
                state: plan.bid_state(),
                bid: plan.bid,
                auxiliary: plan.auxiliary.clone(),
                reward: payoff,
                terminal: false,
            });
        }

        log::debug!(
            "{} assigned call {:.3}h-{:.3}h from {} to {}, payoff {payoff:.2}",
            self.id,
            plan.start_time,
            plan.end_time,
            plan.pickup,
            plan.dropoff
        );
        self.plans.push(plan);
        Ok(payoff)
    }

    pub fn waiting_times(&self) -> Vec<f64> {
        self.plans.iter().map(|plan| plan.waiting_time).collect()
    }

    /// Hand queued experience tuples to a training pass.
    pub fn drain_experiences(&mut self) -> Vec<Experience> {
        std::mem::take(&mut self.experiences)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DispatchConfig;
    use crate::test_helpers::unit_square;

    fn planner() -> TripPlanner {
        TripPlanner::from_config(&DispatchConfig::default())
    }

    fn vehicle(shifts: &[ShiftWindow]) -> Vehicle {
        Vehicle::new(
            VehicleId(0),
            Position::new(0.0, 0.0),
            shifts,
            BiddingStrategy::Truthful,
            0,
        )
        .expect("vehicle")
    }

    #[test]
    fn overlapping_shifts_are_rejected() {
        let err = Vehicle::new(
            VehicleId(3),
            Position::new(0.0, 0.0),
            &[(0.0, 10.0), (5.0, 12.0)],
            BiddingStrategy::Truthful,
            0,
        )
        .expect_err("overlap");
        assert!(matches!(err, DispatchError::Configuration(_)));
    }

    #[test]
    fn idle_vehicle_starts_from_home_at_request_time() {
        let graph = unit_square();
        let mut v = vehicle(&[]);
        let request = Request::new(Position::new(1.0, 0.0), Position::new(1.0, 1.0), 2.5);
        let plan = v.generate_plan(&graph, &planner(), &request).expect("plan");
        assert_eq!(plan.start, v.home());
        assert_eq!(plan.start_time, 2.5);
    }

    #[test]
    fn busy_vehicle_resumes_from_last_dropoff() {
        let graph = unit_square();
        let planner = planner();
        let mut v = vehicle(&[]);
        let first = Request::new(Position::new(0.0, 0.0), Position::new(1.0, 0.0), 0.0);
        let plan = v.generate_plan(&graph, &planner, &first).expect("plan");
        let end = plan.end_time;
        v.assign(plan, 0.0).expect("assign");

        let second = Request::new(Position::new(1.0, 1.0), Position::new(0.0, 1.0), 0.01);
        assert!(v.is_restricted(&planner, &second));
        let (start, start_time) = v.resume_point(&second);
        assert_eq!(start, Position::new(1.0, 0.0));
        assert_eq!(start_time, end);

        let later = Request::new(Position::new(1.0, 1.0), Position::new(0.0, 1.0), 1.0);
        assert!(!v.is_restricted(&planner, &later));
        assert_eq!(v.resume_point(&later), (Position::new(1.0, 0.0), 1.0));
    }

    #[test]
    fn vehicle_returns_home_after_shift() {
        let graph = unit_square();
        let planner = planner();
        let mut v = vehicle(&[(1.0, 2.0)]);
        let call = Request::new(Position::new(0.0, 0.0), Position::new(1.0, 0.0), 0.0);
        let plan = v.generate_plan(&graph, &planner, &call).expect("plan");
        v.assign(plan, 0.0).expect("assign");

        let after = Request::new(Position::new(1.0, 1.0), Position::new(0.0, 1.0), 3.0);
        assert_eq!(v.resume_point(&after), (v.home(), 3.0));
    }

    #[test]
    fn plan_must_leave_time_to_drive_home_before_shift() {
        let graph = unit_square();
        let planner = planner();
        // dropoff at (1, 1) is 2 km from home: 4 minutes of driving
        let mut v = vehicle(&[(0.1, 1.0)]);
        let request = Request::new(Position::new(0.0, 0.0), Position::new(1.0, 1.0), 0.0);
        let plan = v.generate_plan(&graph, &planner, &request).expect("plan");
        assert!((plan.end_time - 2.0 / 30.0).abs() < 1e-12);
        assert!(!v.is_available(&graph, &planner, &plan));

        let mut relaxed = vehicle(&[(0.2, 1.0)]);
        let plan = relaxed.generate_plan(&graph, &planner, &request).expect("plan");
        assert!(relaxed.is_available(&graph, &planner, &plan));
    }

    #[test]
    fn plan_overlapping_a_shift_is_unavailable() {
        let graph = unit_square();
        let planner = planner();
        let mut v = vehicle(&[(0.0, 5.0)]);
        let request = Request::new(Position::new(0.0, 0.0), Position::new(1.0, 0.0), 0.0);
        let plan = v.generate_plan(&graph, &planner, &request).expect("plan");
        assert!(!v.is_available(&graph, &planner, &plan));
    }

    #[test]
    fn assignment_books_payoff_and_waiting_time() {
        let graph = unit_square();
        let planner = planner();
        let mut v = vehicle(&[]);
        let request = Request::new(Position::new(1.0, 0.0), Position::new(1.0, 1.0), 0.0);
        let plan = v.generate_plan(&graph, &planner, &request).expect("plan");
        let value = plan.value;
        let payoff = v.assign(plan, 10.0).expect("assign");
        assert_eq!(payoff, value - 10.0);
        assert_eq!(v.payoff(), payoff);
        assert_eq!(v.payoff_history(), &[payoff]);
        assert_eq!(v.waiting_times(), vec![1.0 / 30.0]);
        assert_eq!(v.timeline().len(), 1);
        assert!(v.drain_experiences().is_empty());
    }

    #[test]
    fn loss_making_trip_books_its_negative_margin() {
        let graph = unit_square();
        let planner = TripPlanner::from_config(&DispatchConfig::default().with_value_ratio(0.3));
        let mut v = vehicle(&[]);
        // 2 km to the pickup, then a 0 km trip: margin = 0.3 * (0 - 2 * 4)
        let request = Request::new(Position::new(1.0, 1.0), Position::new(1.0, 1.0), 0.0);
        let plan = v.generate_plan(&graph, &planner, &request).expect("plan");
        assert!((plan.margin - -2.4).abs() < 1e-9);
        assert_eq!(plan.value, 0.0);

        let payoff = v.assign(plan, 0.5).expect("assign");
        assert!((payoff - -2.9).abs() < 1e-9);
        assert_eq!(v.payoff(), payoff);
    }
}
