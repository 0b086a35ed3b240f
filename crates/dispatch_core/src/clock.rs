//! Explicit simulation clock. Time is measured in hours from the start of the
//! simulation and only moves forward.

use std::fmt;

use crate::error::{DispatchError, Result};

pub const HOURS_PER_DAY: f64 = 24.0;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SimulationClock {
    now: f64,
}

impl SimulationClock {
    pub fn starting_at(hour: f64) -> Self {
        Self { now: hour }
    }

    pub fn now(&self) -> f64 {
        self.now
    }

    /// Move the clock to `time`. Moving backwards is an ordering error and
    /// leaves the clock untouched.
    pub fn advance_to(&mut self, time: f64) -> Result<()> {
        if time < self.now {
            return Err(DispatchError::Ordering {
                previous: self.now,
                current: time,
            });
        }
        self.now = time;
        Ok(())
    }

    pub fn step(&mut self, hours: f64) {
        debug_assert!(hours >= 0.0, "clock step must not be negative");
        self.now += hours.max(0.0);
    }

    /// Completed days since the start.
    pub fn day(&self) -> u64 {
        (self.now / HOURS_PER_DAY).floor().max(0.0) as u64
    }

    /// Hour within the current day, in `[0, 24)`.
    pub fn hour_of_day(&self) -> f64 {
        self.now.rem_euclid(HOURS_PER_DAY)
    }
}

impl fmt::Display for SimulationClock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hour = self.hour_of_day().floor() as u32;
        let suffix = if hour < 12 { "AM" } else { "PM" };
        write!(f, "day {} {}{}", self.day(), hour % 12, suffix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clock_only_moves_forward() {
        let mut clock = SimulationClock::default();
        clock.advance_to(5.0).expect("forward");
        assert_eq!(clock.now(), 5.0);

        let err = clock.advance_to(3.0).expect_err("backwards");
        assert_eq!(
            err,
            DispatchError::Ordering {
                previous: 5.0,
                current: 3.0
            }
        );
        assert_eq!(clock.now(), 5.0);

        clock.advance_to(5.0).expect("same time is allowed");
    }

    #[test]
    fn hour_of_day_wraps() {
        let mut clock = SimulationClock::starting_at(22.0);
        clock.step(3.0);
        assert_eq!(clock.day(), 1);
        assert_eq!(clock.hour_of_day(), 1.0);
        assert_eq!(clock.to_string(), "day 1 1AM");
    }
}
