//! Per-vehicle timeline of non-overlapping, tagged time intervals.

use serde::{Deserialize, Serialize};

use crate::error::{DispatchError, Result};
use crate::geometry::Position;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IntervalKind {
    /// Pre-scheduled blackout window; the vehicle must be home when it starts.
    Shift,
    /// Serving a won request (pickup leg plus requested leg).
    Call,
    /// Idle.
    Free,
    /// Driving home ahead of a shift.
    Return,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimedInterval {
    pub start_time: f64,
    pub end_time: f64,
    pub kind: IntervalKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub route: Option<Vec<Position>>,
}

impl TimedInterval {
    pub fn new(start_time: f64, end_time: f64, kind: IntervalKind) -> Self {
        Self {
            start_time,
            end_time,
            kind,
            route: None,
        }
    }

    pub fn with_route(mut self, route: Vec<Position>) -> Self {
        self.route = Some(route);
        self
    }

    pub fn duration(&self) -> f64 {
        self.end_time - self.start_time
    }

    /// Equal starts overlap; otherwise the earlier interval must end strictly
    /// after the later one starts. Touching endpoints do not overlap.
    pub fn overlaps(&self, other: &TimedInterval) -> bool {
        if self.start_time == other.start_time {
            true
        } else if self.start_time < other.start_time {
            self.end_time > other.start_time
        } else {
            other.end_time > self.start_time
        }
    }

    fn is_well_formed(&self) -> bool {
        self.start_time < self.end_time
    }
}

/// Intervals kept sorted by start time. Stored intervals never overlap.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IntervalTimeline {
    events: Vec<TimedInterval>,
}

impl IntervalTimeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `event` if it does not overlap anything stored.
    ///
    /// Returns whether the interval was inserted; an interval with
    /// `start_time >= end_time` is an error.
    pub fn add_event(&mut self, event: TimedInterval) -> Result<bool> {
        if !event.is_well_formed() {
            return Err(DispatchError::SchedulingInvariant {
                start: event.start_time,
                end: event.end_time,
            });
        }
        if !self.is_valid(&event) {
            return Ok(false);
        }
        let at = self
            .events
            .partition_point(|existing| existing.start_time < event.start_time);
        self.events.insert(at, event);
        Ok(true)
    }

    /// True iff `event` is well formed and overlaps no stored interval.
    pub fn is_valid(&self, event: &TimedInterval) -> bool {
        if !event.is_well_formed() {
            return false;
        }
        for existing in &self.events {
            if existing.start_time > event.end_time {
                break;
            }
            if event.overlaps(existing) {
                return false;
            }
        }
        true
    }

    /// The stored interval with the greatest start strictly before `time`.
    pub fn nearest_before(&self, time: f64) -> Option<&TimedInterval> {
        let at = self.events.partition_point(|e| e.start_time < time);
        at.checked_sub(1).map(|i| &self.events[i])
    }

    /// The stored interval with the smallest start strictly after `time`.
    pub fn nearest_after(&self, time: f64) -> Option<&TimedInterval> {
        let at = self.events.partition_point(|e| e.start_time <= time);
        self.events.get(at)
    }

    pub fn events(&self) -> &[TimedInterval] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}
