//! Coordinator configuration and the default city preset.

use serde::{Deserialize, Serialize};

use crate::auction::{AuctionType, PaymentRule, PaymentTerms};
use crate::bidding::BiddingStrategyKind;
use crate::demand::DemandSchedule;
use crate::error::{DispatchError, Result};
use crate::geometry::Position;

/// Share of the fare the coordinator claims in the payment formulas.
const DEFAULT_PAYMENT_RATIO: f64 = 0.3;
const DEFAULT_CHARGE_RATE_PER_KM: f64 = 60.0;
const DEFAULT_GAS_COST_PER_KM: f64 = 4.0;
/// km/h
const DEFAULT_DRIVING_VELOCITY: f64 = 30.0;
/// Five minutes, in hours.
const DEFAULT_WAITING_TIME_THRESHOLD: f64 = 1.0 / 12.0;

/// Auction and economic parameters of a coordinator run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    pub auction_type: AuctionType,
    pub payment_rule: PaymentRule,
    pub bidding_strategy: BiddingStrategyKind,
    pub payment_ratio: f64,
    pub charge_rate_per_kilometer: f64,
    pub gas_cost_per_kilometer: f64,
    pub driving_velocity: f64,
    /// Plans whose customer waiting time reaches this many hours are not admissible.
    pub waiting_time_threshold: f64,
    /// Multiplier applied to a plan's economic margin to obtain its value.
    pub value_ratio: f64,
    /// Reject plans whose unclamped margin is negative. Applies under every payment rule.
    pub require_non_negative_value: bool,
    /// Seed for shaded bids; vehicle `i` draws from `seed + i`.
    pub seed: u64,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            auction_type: AuctionType::FirstPrice,
            payment_rule: PaymentRule::CostMinusBid,
            bidding_strategy: BiddingStrategyKind::Truthful,
            payment_ratio: DEFAULT_PAYMENT_RATIO,
            charge_rate_per_kilometer: DEFAULT_CHARGE_RATE_PER_KM,
            gas_cost_per_kilometer: DEFAULT_GAS_COST_PER_KM,
            driving_velocity: DEFAULT_DRIVING_VELOCITY,
            waiting_time_threshold: DEFAULT_WAITING_TIME_THRESHOLD,
            value_ratio: 1.0,
            require_non_negative_value: true,
            seed: 0,
        }
    }
}

impl DispatchConfig {
    /// Reject non-positive or non-finite economic parameters.
    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("payment_ratio", self.payment_ratio),
            ("charge_rate_per_kilometer", self.charge_rate_per_kilometer),
            ("gas_cost_per_kilometer", self.gas_cost_per_kilometer),
            ("driving_velocity", self.driving_velocity),
            ("waiting_time_threshold", self.waiting_time_threshold),
            ("value_ratio", self.value_ratio),
        ];
        for (name, value) in positive {
            if !value.is_finite() || value <= 0.0 {
                return Err(DispatchError::Configuration(format!(
                    "{name} must be a positive real, got {value}"
                )));
            }
        }
        Ok(())
    }

    pub fn payment_terms(&self) -> PaymentTerms {
        PaymentTerms {
            payment_ratio: self.payment_ratio,
            charge_rate_per_kilometer: self.charge_rate_per_kilometer,
            gas_cost_per_kilometer: self.gas_cost_per_kilometer,
        }
    }

    pub fn with_auction_type(mut self, auction_type: AuctionType) -> Self {
        self.auction_type = auction_type;
        self
    }

    pub fn with_payment_rule(mut self, payment_rule: PaymentRule) -> Self {
        self.payment_rule = payment_rule;
        self
    }

    pub fn with_bidding_strategy(mut self, strategy: BiddingStrategyKind) -> Self {
        self.bidding_strategy = strategy;
        self
    }

    pub fn with_payment_ratio(mut self, ratio: f64) -> Self {
        self.payment_ratio = ratio;
        self
    }

    pub fn with_waiting_time_threshold(mut self, hours: f64) -> Self {
        self.waiting_time_threshold = hours;
        self
    }

    pub fn with_value_ratio(mut self, ratio: f64) -> Self {
        self.value_ratio = ratio;
        self
    }

    pub fn with_driving_velocity(mut self, velocity: f64) -> Self {
        self.driving_velocity = velocity;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }
}

/// A shift as `(start_hour, end_hour)`; the end may pass midnight (e.g. `(18, 28)`).
pub type ShiftWindow = (f64, f64);

/// Repeat each vehicle's daily shifts on all seven days of a week.
pub fn daily_to_weekly(daily: &[Vec<ShiftWindow>]) -> Vec<Vec<ShiftWindow>> {
    daily
        .iter()
        .map(|shifts| {
            (0..7)
                .flat_map(|day| {
                    let offset = 24.0 * day as f64;
                    shifts
                        .iter()
                        .map(move |&(start, end)| (offset + start, offset + end))
                })
                .collect()
        })
        .collect()
}

/// City layout, fleet and demand used by the simulation runner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CityPreset {
    pub intersections: Vec<Position>,
    pub home: Position,
    /// Shift windows per vehicle; one entry per vehicle.
    pub vehicle_shifts: Vec<Vec<ShiftWindow>>,
    pub demand: DemandSchedule,
}

impl Default for CityPreset {
    fn default() -> Self {
        const GRID: &[(f64, f64)] = &[
            (0.0, 0.0), (0.0, 2.0), (0.0, 6.0), (0.0, 8.0), (0.0, 12.0), (0.0, 14.0),
            (2.0, 0.0), (2.0, 2.0), (2.0, 6.0), (2.0, 7.0), (2.0, 8.0), (2.0, 12.0), (2.0, 14.0),
            (3.0, 0.0), (3.0, 2.0), (3.0, 6.0), (3.0, 7.0), (3.0, 8.0), (3.0, 12.0), (3.0, 14.0),
            (4.0, 0.0), (4.0, 2.0), (4.0, 4.0), (4.0, 6.0), (4.0, 7.0), (4.0, 8.0), (4.0, 12.0), (4.0, 14.0),
            (5.0, 0.0), (5.0, 2.0), (5.0, 4.0), (5.0, 6.0), (5.0, 8.0), (5.0, 12.0), (5.0, 14.0),
            (7.0, 0.0), (7.0, 2.0), (7.0, 4.0), (7.0, 6.0), (7.0, 8.0), (7.0, 12.0), (7.0, 14.0),
        ];

        let mut daily: Vec<Vec<ShiftWindow>> = Vec::new();
        for shift in [(3.0, 13.0), (9.0, 19.0), (18.0, 28.0)] {
            daily.extend((0..4).map(|_| vec![shift]));
        }

        Self {
            intersections: GRID.iter().map(|&p| Position::from(p)).collect(),
            home: Position::new(4.0, 8.0),
            vehicle_shifts: daily_to_weekly(&daily),
            demand: DemandSchedule::default(),
        }
    }
}

impl CityPreset {
    pub fn with_vehicle_shifts(mut self, shifts: Vec<Vec<ShiftWindow>>) -> Self {
        self.vehicle_shifts = shifts;
        self
    }

    pub fn with_home(mut self, home: Position) -> Self {
        self.home = home;
        self
    }

    pub fn with_demand(mut self, demand: DemandSchedule) -> Self {
        self.demand = demand;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        DispatchConfig::default().validate().expect("valid defaults");
    }

    #[test]
    fn non_positive_parameters_are_rejected() {
        let config = DispatchConfig::default().with_driving_velocity(0.0);
        assert!(matches!(
            config.validate(),
            Err(DispatchError::Configuration(_))
        ));
        let config = DispatchConfig::default().with_waiting_time_threshold(f64::NAN);
        assert!(config.validate().is_err());
    }

    #[test]
    fn config_deserializes_with_defaults() {
        let config: DispatchConfig = serde_json::from_str(
            r#"{"auction_type": "second-price", "payment_rule": "value-proportional"}"#,
        )
        .expect("json");
        assert_eq!(config.auction_type, AuctionType::SecondPrice);
        assert_eq!(config.payment_rule, PaymentRule::ValueProportional);
        assert_eq!(config.charge_rate_per_kilometer, 60.0);

        let bad = serde_json::from_str::<DispatchConfig>(r#"{"auction_type": "dutch"}"#);
        assert!(bad.is_err());
    }

    #[test]
    fn weekly_schedule_repeats_daily_shifts() {
        let weekly = daily_to_weekly(&[vec![(18.0, 28.0)]]);
        assert_eq!(weekly.len(), 1);
        assert_eq!(weekly[0].len(), 7);
        assert_eq!(weekly[0][0], (18.0, 28.0));
        assert_eq!(weekly[0][6], (162.0, 172.0));
    }

    #[test]
    fn default_preset_fleet_and_demand() {
        let preset = CityPreset::default();
        assert_eq!(preset.intersections.len(), 42);
        assert_eq!(preset.vehicle_shifts.len(), 12);
        for hour in [2.0, 8.0, 12.0, 18.0, 21.0] {
            assert_eq!(preset.demand.rate_at(hour), 3.0);
        }
    }
}
