#![allow(dead_code)]

use dispatch_core::demand::Request;
use dispatch_core::geometry::Position;

pub fn p(x: f64, y: f64) -> Position {
    Position::new(x, y)
}

pub fn request(from: (f64, f64), to: (f64, f64), time: f64) -> Request {
    Request::new(Position::from(from), Position::from(to), time)
}

/// Assert two reals agree to within `1e-9`.
pub fn assert_close(actual: f64, expected: f64, what: &str) {
    assert!(
        (actual - expected).abs() < 1e-9,
        "{what}: expected {expected}, got {actual}"
    );
}
