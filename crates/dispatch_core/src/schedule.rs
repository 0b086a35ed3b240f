//! Gap-filled schedule export.
//!
//! A vehicle's timeline only holds shifts and calls. The exported schedule
//! adds the drive home ahead of each shift that follows a call, fills every
//! gap with `Free`, and clips the result so that it partitions `[0, horizon]`.

use serde::{Deserialize, Serialize};

use crate::city_graph::CityGraph;
use crate::error::{DispatchError, Result};
use crate::geometry::Position;
use crate::plan::TripPlanner;
use crate::timeline::{IntervalKind, TimedInterval};
use crate::vehicle::{Vehicle, VehicleId};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RouteMode {
    /// Waypoints in city coordinates.
    #[default]
    Absolute,
    /// First waypoint at the origin, then one offset per step.
    Relative,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VehicleSchedule {
    pub vehicle: VehicleId,
    pub intervals: Vec<TimedInterval>,
}

impl Vehicle {
    pub fn complete_schedule(
        &self,
        graph: &CityGraph,
        planner: &TripPlanner,
        horizon: f64,
        mode: RouteMode,
    ) -> Result<Vec<TimedInterval>> {
        let with_returns = insert_returns(self, graph, planner)?;

        let mut schedule = Vec::with_capacity(with_returns.len() * 2 + 1);
        let mut cursor = 0.0;
        for mut interval in with_returns {
            if interval.start_time >= horizon || interval.end_time <= cursor {
                continue;
            }
            interval.start_time = interval.start_time.max(cursor);
            interval.end_time = interval.end_time.min(horizon);
            if interval.start_time > cursor {
                schedule.push(TimedInterval::new(cursor, interval.start_time, IntervalKind::Free));
            }
            cursor = interval.end_time;
            if mode == RouteMode::Relative {
                if let Some(route) = interval.route.as_mut() {
                    *route = relative_route(route);
                }
            }
            schedule.push(interval);
        }
        if cursor < horizon {
            schedule.push(TimedInterval::new(cursor, horizon, IntervalKind::Free));
        }

        Ok(schedule)
    }
}

/// Timeline intervals plus a `Return` ahead of every shift that directly
/// follows a call.
fn insert_returns(
    vehicle: &Vehicle,
    graph: &CityGraph,
    planner: &TripPlanner,
) -> Result<Vec<TimedInterval>> {
    let events = vehicle.timeline().events();
    let mut out = Vec::with_capacity(events.len() * 2);

    for (i, interval) in events.iter().enumerate() {
        let previous_call = i
            .checked_sub(1)
            .map(|j| &events[j])
            .filter(|prev| prev.kind == IntervalKind::Call);

        if let (IntervalKind::Shift, Some(call)) = (interval.kind, previous_call) {
            let dropoff = call
                .route
                .as_ref()
                .and_then(|route| route.last().copied())
                .ok_or(DispatchError::SchedulingInvariant {
                    start: call.start_time,
                    end: call.end_time,
                })?;
            let home_route = graph.position_distance(&dropoff, &vehicle.home())?;
            let return_start = interval.start_time - planner.travel_time(home_route.distance);
            if return_start < call.end_time {
                return Err(DispatchError::ScheduleConsistency {
                    call_end: call.end_time,
                    return_start,
                    shift_start: interval.start_time,
                });
            }
            if return_start < interval.start_time {
                out.push(
                    TimedInterval::new(return_start, interval.start_time, IntervalKind::Return)
                        .with_route(home_route.waypoints),
                );
            }
        }
        out.push(interval.clone());
    }

    Ok(out)
}

fn relative_route(route: &[Position]) -> Vec<Position> {
    let mut relative = Vec::with_capacity(route.len());
    if !route.is_empty() {
        relative.push(Position::new(0.0, 0.0));
    }
    relative.extend(route.windows(2).map(|step| step[1].relative_to(&step[0])));
    relative
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bidding::BiddingStrategy;
    use crate::config::DispatchConfig;
    use crate::demand::Request;
    use crate::test_helpers::unit_square;

    fn planner() -> TripPlanner {
        TripPlanner::from_config(&DispatchConfig::default())
    }

    fn busy_vehicle(shifts: &[(f64, f64)]) -> Vehicle {
        let graph = unit_square();
        let planner = planner();
        let mut vehicle = Vehicle::new(
            VehicleId(0),
            Position::new(0.0, 0.0),
            shifts,
            BiddingStrategy::Truthful,
            0,
        )
        .expect("vehicle");
        let request = Request::new(Position::new(0.0, 0.0), Position::new(1.0, 1.0), 0.5);
        let plan = vehicle.generate_plan(&graph, &planner, &request).expect("plan");
        vehicle.assign(plan, 0.0).expect("assign");
        vehicle
    }

    #[test]
    fn return_is_inserted_before_shift_after_call() {
        let graph = unit_square();
        let vehicle = busy_vehicle(&[(2.0, 4.0)]);
        let schedule = vehicle
            .complete_schedule(&graph, &planner(), 6.0, RouteMode::Absolute)
            .expect("schedule");

        let kinds: Vec<_> = schedule.iter().map(|i| i.kind).collect();
        assert_eq!(
            kinds,
            vec![
                IntervalKind::Free,
                IntervalKind::Call,
                IntervalKind::Free,
                IntervalKind::Return,
                IntervalKind::Shift,
                IntervalKind::Free,
            ]
        );
        let ret = &schedule[3];
        assert!((ret.duration() - 2.0 / 30.0).abs() < 1e-12);
        assert_eq!(ret.end_time, 2.0);
        assert_eq!(
            ret.route.as_ref().and_then(|r| r.last().copied()),
            Some(Position::new(0.0, 0.0))
        );
    }

    #[test]
    fn infeasible_return_is_a_consistency_error() {
        let graph = unit_square();
        let vehicle = busy_vehicle(&[(0.6, 1.0)]);
        let err = vehicle
            .complete_schedule(&graph, &planner(), 2.0, RouteMode::Absolute)
            .expect_err("no time to drive home");
        assert!(matches!(err, DispatchError::ScheduleConsistency { .. }));
    }

    #[test]
    fn schedule_is_clipped_to_horizon() {
        let graph = unit_square();
        let vehicle = busy_vehicle(&[(2.0, 4.0), (10.0, 12.0)]);
        let schedule = vehicle
            .complete_schedule(&graph, &planner(), 3.0, RouteMode::Absolute)
            .expect("schedule");
        let last = schedule.last().expect("non-empty");
        assert_eq!(last.kind, IntervalKind::Shift);
        assert_eq!(last.end_time, 3.0);
        assert_eq!(schedule[0].start_time, 0.0);
    }

    #[test]
    fn relative_routes_start_at_origin() {
        let graph = unit_square();
        let vehicle = busy_vehicle(&[]);
        let schedule = vehicle
            .complete_schedule(&graph, &planner(), 1.0, RouteMode::Relative)
            .expect("schedule");
        let call = schedule
            .iter()
            .find(|i| i.kind == IntervalKind::Call)
            .expect("call");
        let route = call.route.as_ref().expect("route");
        assert_eq!(route[0], Position::new(0.0, 0.0));
        let sum = route
            .iter()
            .fold(Position::new(0.0, 0.0), |acc, p| Position::new(acc.x + p.x, acc.y + p.y));
        assert_eq!(sum, Position::new(1.0, 1.0));
    }

    #[test]
    fn empty_vehicle_is_free_all_horizon() {
        let graph = unit_square();
        let vehicle = Vehicle::new(
            VehicleId(1),
            Position::new(0.0, 0.0),
            &[],
            BiddingStrategy::Truthful,
            0,
        )
        .expect("vehicle");
        let schedule = vehicle
            .complete_schedule(&graph, &planner(), 5.0, RouteMode::Absolute)
            .expect("schedule");
        assert_eq!(schedule, vec![TimedInterval::new(0.0, 5.0, IntervalKind::Free)]);
    }
}
