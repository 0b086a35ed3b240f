//! Trip plans: what a vehicle would do, and earn, if it won a request.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::bidding::{BidAuxiliary, BidState, BiddingStrategy};
use crate::city_graph::CityGraph;
use crate::config::DispatchConfig;
use crate::demand::Request;
use crate::error::Result;
use crate::geometry::Position;

/// Candidate assignment of one request to one vehicle. Immutable once built;
/// it becomes part of a vehicle's history only when the vehicle wins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    pub start_time: f64,
    pub end_time: f64,
    pub start: Position,
    pub pickup: Position,
    pub dropoff: Position,
    /// Hours the customer waits: delay before the vehicle sets off plus the pickup leg.
    pub waiting_time: f64,
    pub pickup_distance: f64,
    pub requested_distance: f64,
    pub bid: f64,
    pub auxiliary: BidAuxiliary,
    /// Margin clamped to be non-negative.
    pub value: f64,
    /// Unclamped economic estimate.
    pub margin: f64,
    /// Waypoints from `start` through `pickup` to `dropoff`.
    pub route: Vec<Position>,
}

impl Plan {
    pub fn bid_state(&self) -> BidState {
        BidState {
            start: self.start,
            pickup: self.pickup,
            dropoff: self.dropoff,
            start_time: self.start_time,
        }
    }

    pub fn duration(&self) -> f64 {
        self.end_time - self.start_time
    }
}

/// Timing and economics shared by every vehicle of a coordinator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TripPlanner {
    pub driving_velocity: f64,
    pub charge_rate_per_kilometer: f64,
    pub gas_cost_per_kilometer: f64,
    pub value_ratio: f64,
}

impl TripPlanner {
    pub fn from_config(config: &DispatchConfig) -> Self {
        Self {
            driving_velocity: config.driving_velocity,
            charge_rate_per_kilometer: config.charge_rate_per_kilometer,
            gas_cost_per_kilometer: config.gas_cost_per_kilometer,
            value_ratio: config.value_ratio,
        }
    }

    /// Hours needed to drive `distance` kilometres.
    pub fn travel_time(&self, distance: f64) -> f64 {
        distance / self.driving_velocity
    }

    pub fn margin(&self, pickup_distance: f64, requested_distance: f64) -> f64 {
        let fare = requested_distance
            * (self.charge_rate_per_kilometer - self.gas_cost_per_kilometer);
        self.value_ratio * (fare - pickup_distance * self.gas_cost_per_kilometer)
    }

    /// Build the plan for serving `request` from `start`, setting off at `start_time`.
    pub fn plan<R: Rng>(
        &self,
        graph: &CityGraph,
        start: Position,
        start_time: f64,
        request: &Request,
        strategy: &BiddingStrategy,
        rng: &mut R,
    ) -> Result<Plan> {
        let pickup_leg = graph.position_distance(&start, &request.pickup)?;
        let requested_leg = graph.position_distance(&request.pickup, &request.dropoff)?;

        let pickup_distance = pickup_leg.distance;
        let requested_distance = requested_leg.distance;
        let waiting_time = (start_time - request.time).abs() + self.travel_time(pickup_distance);
        let end_time = start_time + self.travel_time(pickup_distance + requested_distance);

        let margin = self.margin(pickup_distance, requested_distance);
        let value = margin.max(0.0);

        let state = BidState {
            start,
            pickup: request.pickup,
            dropoff: request.dropoff,
            start_time,
        };
        let (bid, auxiliary) = strategy.compute_bid(&state, value, rng);

        let mut route = pickup_leg.waypoints;
        let mut rest = requested_leg.waypoints.into_iter().peekable();
        if rest.peek() == route.last() {
            rest.next();
        }
        route.extend(rest);

        Ok(Plan {
            start_time,
            end_time,
            start,
            pickup: request.pickup,
            dropoff: request.dropoff,
            waiting_time,
            pickup_distance,
            requested_distance,
            bid,
            auxiliary,
            value,
            margin,
            route,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::unit_square;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn planner() -> TripPlanner {
        TripPlanner::from_config(&DispatchConfig::default())
    }

    #[test]
    fn plan_from_home_to_adjacent_corner() {
        let graph = unit_square();
        let request = Request::new(Position::new(0.0, 0.0), Position::new(1.0, 0.0), 0.0);
        let mut rng = StdRng::seed_from_u64(0);
        let plan = planner()
            .plan(&graph, Position::new(0.0, 0.0), 0.0, &request, &BiddingStrategy::Truthful, &mut rng)
            .expect("plan");

        assert_eq!(plan.pickup_distance, 0.0);
        assert_eq!(plan.requested_distance, 1.0);
        assert_eq!(plan.waiting_time, 0.0);
        assert!((plan.end_time - 1.0 / 30.0).abs() < 1e-12);
        assert_eq!(plan.value, 56.0);
        assert_eq!(plan.bid, plan.value);
        assert_eq!(plan.route, vec![Position::new(0.0, 0.0), Position::new(1.0, 0.0)]);
    }

    #[test]
    fn long_pickup_leg_gives_negative_margin_and_zero_value() {
        let graph = unit_square();
        let request = Request::new(Position::new(1.0, 1.0), Position::new(1.0, 0.99), 0.0);
        let mut rng = StdRng::seed_from_u64(0);
        let plan = planner()
            .plan(&graph, Position::new(0.0, 0.0), 0.5, &request, &BiddingStrategy::Truthful, &mut rng)
            .expect("plan");

        assert!(plan.margin < 0.0);
        assert_eq!(plan.value, 0.0);
        assert!((plan.waiting_time - (0.5 + 2.0 / 30.0)).abs() < 1e-12);
        assert_eq!(plan.route.first(), Some(&Position::new(0.0, 0.0)));
        assert_eq!(plan.route.last(), Some(&Position::new(1.0, 0.99)));
    }
}
