//! Test helpers for common test setup.
//!
//! Shared by unit tests, the integration tests under `tests/` and the benches.

use crate::auction::{AuctionType, PaymentRule};
use crate::bidding::BiddingStrategyKind;
use crate::city_graph::CityGraph;
use crate::config::{CityPreset, DispatchConfig};
use crate::coordinator::DispatchCoordinator;
use crate::geometry::Position;

/// Four intersections at the corners of a 1 km square.
///
/// # Panics
///
/// Never in practice: the corner set is a valid city.
pub fn unit_square() -> CityGraph {
    CityGraph::new(&[
        Position::new(0.0, 0.0),
        Position::new(0.0, 1.0),
        Position::new(1.0, 0.0),
        Position::new(1.0, 1.0),
    ])
    .expect("unit square is a valid city")
}

/// The 42-intersection default city.
pub fn default_city() -> CityGraph {
    CityGraph::new(&CityPreset::default().intersections).expect("default preset is a valid city")
}

/// Economics of the unit-square scenario: first-price, cost-minus-bid,
/// truthful bids, waiting threshold of 10 hours and value at the payment ratio.
pub fn unit_square_scenario_config() -> DispatchConfig {
    DispatchConfig::default()
        .with_auction_type(AuctionType::FirstPrice)
        .with_payment_rule(PaymentRule::CostMinusBid)
        .with_bidding_strategy(BiddingStrategyKind::Truthful)
        .with_waiting_time_threshold(10.0)
        .with_value_ratio(0.3)
}

/// A coordinator on the unit square with one shift-free vehicle per home.
pub fn unit_square_coordinator(config: DispatchConfig, homes: &[Position]) -> DispatchCoordinator {
    let mut coordinator =
        DispatchCoordinator::new(unit_square(), config).expect("valid scenario config");
    for home in homes {
        coordinator
            .add_vehicle(*home, &[], None)
            .expect("home on the unit square");
    }
    coordinator
}
