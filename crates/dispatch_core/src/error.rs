//! Error taxonomy for the dispatch engine.
//!
//! Configuration, ordering and graph-construction errors are fatal to a run.
//! A request that no vehicle can serve is not an error; the coordinator
//! records it as dropped and moves on.

use std::fmt;

use crate::geometry::Position;

pub type Result<T> = std::result::Result<T, DispatchError>;

/// Failures of distance queries on the city graph.
#[derive(Debug, Clone, PartialEq)]
pub enum GraphError {
    /// The position is neither an intersection nor strictly inside a street segment.
    UnknownPosition(Position),
    /// No street path connects the two positions.
    Unreachable { from: Position, to: Position },
}

impl fmt::Display for GraphError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GraphError::UnknownPosition(pos) => {
                write!(f, "position {pos} is not on any street of the city graph")
            }
            GraphError::Unreachable { from, to } => {
                write!(f, "no route from {from} to {to}")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DispatchError {
    /// Invalid auction type, payment rule, parameter value or intersection set.
    Configuration(String),
    /// Requests handed to the coordinator were not sorted by arrival time.
    Ordering { previous: f64, current: f64 },
    Graph(GraphError),
    /// A return trip cannot fit between a call and the following shift.
    ScheduleConsistency {
        call_end: f64,
        return_start: f64,
        shift_start: f64,
    },
    /// An interval with `start >= end` was handed to a timeline.
    SchedulingInvariant { start: f64, end: f64 },
}

impl fmt::Display for DispatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DispatchError::Configuration(msg) => write!(f, "configuration error: {msg}"),
            DispatchError::Ordering { previous, current } => write!(
                f,
                "requests must be sorted by time ({previous} > {current})"
            ),
            DispatchError::Graph(err) => write!(f, "graph error: {err}"),
            DispatchError::ScheduleConsistency {
                call_end,
                return_start,
                shift_start,
            } => write!(
                f,
                "return trip starting at {return_start} overlaps call ending at {call_end} \
                 (shift starts at {shift_start})"
            ),
            DispatchError::SchedulingInvariant { start, end } => {
                write!(f, "interval start {start} must be before end {end}")
            }
        }
    }
}

impl std::error::Error for DispatchError {}

impl From<GraphError> for DispatchError {
    fn from(err: GraphError) -> Self {
        DispatchError::Graph(err)
    }
}
