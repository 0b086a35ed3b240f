pub mod auction;
pub mod bidding;
pub mod city_graph;
pub mod clock;
pub mod config;
pub mod coordinator;
pub mod demand;
pub mod distributions;
pub mod error;
pub mod geometry;
pub mod plan;
pub mod schedule;
pub mod timeline;
pub mod vehicle;

#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers;
