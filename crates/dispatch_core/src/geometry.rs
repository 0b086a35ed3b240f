//! Continuous positions on the city grid.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Tolerance used when comparing computed (not user-supplied) coordinates.
pub const EPSILON: f64 = 1e-9;

/// A point in grid coordinates. Streets run along the axes, so a position is
/// either an intersection or lies strictly inside one horizontal or vertical
/// street segment.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Exact hashable key. `-0.0` and `0.0` map to the same key.
    pub fn key(&self) -> (u64, u64) {
        ((self.x + 0.0).to_bits(), (self.y + 0.0).to_bits())
    }

    pub fn manhattan(&self, other: &Position) -> f64 {
        (self.x - other.x).abs() + (self.y - other.y).abs()
    }

    pub fn approx_eq(&self, other: &Position) -> bool {
        (self.x - other.x).abs() <= EPSILON && (self.y - other.y).abs() <= EPSILON
    }

    /// Offset from `origin` to `self`.
    pub fn relative_to(&self, origin: &Position) -> Position {
        Position::new(self.x - origin.x, self.y - origin.y)
    }
}

impl From<(f64, f64)> for Position {
    fn from((x, y): (f64, f64)) -> Self {
        Position::new(x, y)
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.2}, {:.2})", self.x, self.y)
    }
}
