//! The dispatch coordinator: runs one auction per incoming request.

use std::ops::AddAssign;

use serde::{Deserialize, Serialize};

use crate::auction::{adjusted_bid, select_winner};
use crate::bidding::{BiddingStrategy, PolicyHandle};
use crate::city_graph::CityGraph;
use crate::clock::SimulationClock;
use crate::config::{CityPreset, DispatchConfig, ShiftWindow};
use crate::demand::Request;
use crate::error::Result;
use crate::geometry::Position;
use crate::plan::{Plan, TripPlanner};
use crate::schedule::{RouteMode, VehicleSchedule};
use crate::vehicle::{Vehicle, VehicleId};

/// Outcome counts of allocation passes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocationSummary {
    pub accepted: usize,
    pub dropped: usize,
}

impl AllocationSummary {
    pub fn total(&self) -> usize {
        self.accepted + self.dropped
    }
}

impl AddAssign for AllocationSummary {
    fn add_assign(&mut self, other: Self) {
        self.accepted += other.accepted;
        self.dropped += other.dropped;
    }
}

/// Owns the fleet and the city graph and allocates requests by auction.
///
/// `allocate` takes `&mut self`: allocation passes never interleave with each
/// other or with `train`.
#[derive(Debug)]
pub struct DispatchCoordinator {
    graph: CityGraph,
    config: DispatchConfig,
    planner: TripPlanner,
    vehicles: Vec<Vehicle>,
    payoff: f64,
    payoff_history: Vec<f64>,
    clock: SimulationClock,
    summary: AllocationSummary,
}

impl DispatchCoordinator {
    pub fn new(graph: CityGraph, config: DispatchConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            planner: TripPlanner::from_config(&config),
            graph,
            config,
            vehicles: Vec::new(),
            payoff: 0.0,
            payoff_history: Vec::new(),
            clock: SimulationClock::default(),
            summary: AllocationSummary::default(),
        })
    }

    /// Build the preset's city and one vehicle per shift list. All vehicles
    /// share `policy` when the configured strategy is learned.
    pub fn from_preset(
        preset: &CityPreset,
        config: DispatchConfig,
        policy: Option<PolicyHandle>,
    ) -> Result<Self> {
        let graph = CityGraph::new(&preset.intersections)?;
        let mut coordinator = Self::new(graph, config)?;
        for shifts in &preset.vehicle_shifts {
            coordinator.add_vehicle(preset.home, shifts, policy.clone())?;
        }
        Ok(coordinator)
    }

    /// Add a vehicle living at `home`. Its id is its index in the arena.
    pub fn add_vehicle(
        &mut self,
        home: Position,
        shifts: &[ShiftWindow],
        policy: Option<PolicyHandle>,
    ) -> Result<VehicleId> {
        // home must be on the street network
        self.graph.position_distance(&home, &home)?;
        let strategy = BiddingStrategy::from_kind(self.config.bidding_strategy, policy)?;
        let id = VehicleId(self.vehicles.len());
        self.vehicles
            .push(Vehicle::new(id, home, shifts, strategy, self.config.seed)?);
        Ok(id)
    }

    /// Allocate time-ordered requests, one auction each.
    ///
    /// Requests must not go back in time, within a call or across calls; the
    /// first one that does aborts the pass with an ordering error. Requests
    /// nobody can serve are dropped and counted.
    pub fn allocate(&mut self, requests: &[Request]) -> Result<AllocationSummary> {
        let mut pass = AllocationSummary::default();
        for request in requests {
            self.clock.advance_to(request.time)?;
            if self.allocate_one(request)? {
                pass.accepted += 1;
            } else {
                pass.dropped += 1;
            }
        }
        self.summary += pass;
        Ok(pass)
    }

    fn allocate_one(&mut self, request: &Request) -> Result<bool> {
        let candidates = self.admissible_plans(request)?;
        if candidates.is_empty() {
            log::debug!(
                "request dropped: {} -> {} at {:.3}h, no admissible vehicle",
                request.pickup,
                request.dropoff,
                request.time
            );
            return Ok(false);
        }

        let adjusted: Vec<f64> = candidates
            .iter()
            .map(|(id, plan)| {
                let kind = self.vehicles[id.0].strategy().kind();
                adjusted_bid(kind, plan.value, plan.bid)
            })
            .collect();
        let direction = self.config.payment_rule.ranking_direction();
        let Some(result) = select_winner(&adjusted, self.config.auction_type, direction) else {
            return Ok(false);
        };

        let mut candidates = candidates;
        let (winner, plan) = candidates.swap_remove(result.winner);
        let payment = self.config.payment_rule.payment(
            &self.config.payment_terms(),
            plan.requested_distance,
            result.reference_bid,
        );

        self.vehicles[winner.0].assign(plan, payment)?;
        self.payoff += payment;
        self.payoff_history.push(payment);
        log::info!(
            "{} won request at {:.3}h ({} {}): reference bid {:.2}, payment {:.2}, coordinator payoff {:.2}",
            winner,
            request.time,
            self.config.auction_type,
            self.config.payment_rule,
            result.reference_bid,
            payment,
            self.payoff
        );
        Ok(true)
    }

    /// Plans of unrestricted vehicles that fit their timeline, keep waiting
    /// under the threshold and, if required, have a non-negative margin.
    /// Arena order is preserved.
    fn admissible_plans(&mut self, request: &Request) -> Result<Vec<(VehicleId, Plan)>> {
        let graph = &self.graph;
        let planner = &self.planner;
        let config = &self.config;

        let mut candidates = Vec::new();
        for vehicle in self.vehicles.iter_mut() {
            if vehicle.is_restricted(planner, request) {
                continue;
            }
            let plan = vehicle.generate_plan(graph, planner, request)?;
            let admissible = vehicle.is_available(graph, planner, &plan)
                && plan.waiting_time < config.waiting_time_threshold
                && (!config.require_non_negative_value || plan.margin >= 0.0);
            if admissible {
                log::debug!(
                    "{} bids {:.2} (value {:.2}, waiting {:.3}h)",
                    vehicle.id(),
                    plan.bid,
                    plan.value,
                    plan.waiting_time
                );
                candidates.push((vehicle.id(), plan));
            }
        }
        Ok(candidates)
    }

    /// Run one training pass per vehicle holding learned experience.
    /// Returns how many experience tuples were consumed.
    pub fn train(&mut self) -> usize {
        let mut consumed = 0;
        for vehicle in self.vehicles.iter_mut() {
            let Some(policy) = vehicle.strategy().policy().cloned() else {
                continue;
            };
            let experiences = vehicle.drain_experiences();
            if experiences.is_empty() {
                continue;
            }
            policy.borrow_mut().train(&experiences);
            consumed += experiences.len();
        }
        if consumed > 0 {
            log::debug!("trained bidding policy on {consumed} experiences");
        }
        consumed
    }

    pub fn complete_schedules(&self, horizon: f64, mode: RouteMode) -> Result<Vec<VehicleSchedule>> {
        self.vehicles
            .iter()
            .map(|vehicle| {
                Ok(VehicleSchedule {
                    vehicle: vehicle.id(),
                    intervals: vehicle.complete_schedule(&self.graph, &self.planner, horizon, mode)?,
                })
            })
            .collect()
    }

    pub fn payoff(&self) -> f64 {
        self.payoff
    }

    /// Running coordinator payoff after each committed request.
    pub fn payoff_history(&self) -> &[f64] {
        &self.payoff_history
    }

    pub fn vehicles(&self) -> &[Vehicle] {
        &self.vehicles
    }

    pub fn vehicle(&self, id: VehicleId) -> Option<&Vehicle> {
        self.vehicles.get(id.0)
    }

    pub fn graph(&self) -> &CityGraph {
        &self.graph
    }

    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    pub fn planner(&self) -> &TripPlanner {
        &self.planner
    }

    pub fn clock(&self) -> &SimulationClock {
        &self.clock
    }

    pub fn summary(&self) -> AllocationSummary {
        self.summary
    }
}
