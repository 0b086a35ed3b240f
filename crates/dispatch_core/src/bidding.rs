//! Bidding strategies used by vehicles when they price a candidate plan.
//!
//! Truthful and shaded bids are computed locally. A learned strategy hands the
//! decision to an external trainable [`BidPolicy`] and, after every won
//! auction, queues an [`Experience`] for the policy's next training pass.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use std::str::FromStr;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::DispatchError;
use crate::geometry::Position;

/// What a bidding policy observes about a candidate trip.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BidState {
    pub start: Position,
    pub pickup: Position,
    pub dropoff: Position,
    pub start_time: f64,
}

impl BidState {
    pub const FEATURES: usize = 7;

    /// Flat feature vector: start, pickup, dropoff coordinates then start time.
    pub fn features(&self) -> [f64; Self::FEATURES] {
        [
            self.start.x,
            self.start.y,
            self.pickup.x,
            self.pickup.y,
            self.dropoff.x,
            self.dropoff.y,
            self.start_time,
        ]
    }
}

/// Policy-specific data attached to a bid (for example the log-probability
/// of the sampled action). Passed through to training untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BidAuxiliary(pub Vec<f64>);

/// One training sample recorded after a vehicle wins an auction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Experience {
    pub state: BidState,
    pub bid: f64,
    pub auxiliary: BidAuxiliary,
    pub reward: f64,
    pub terminal: bool,
}

/// External trainable bidding policy.
///
/// `act` returns a raw action which the coordinator later converts into an
/// adjusted bid relative to the plan value. `train` is only ever called
/// between allocation passes.
pub trait BidPolicy {
    fn act(&mut self, state: &BidState) -> (f64, BidAuxiliary);

    fn train(&mut self, experiences: &[Experience]);
}

/// Shared handle to a policy. All vehicles of one coordinator may share it.
pub type PolicyHandle = Rc<RefCell<dyn BidPolicy>>;

/// Strategy names as they appear in configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BiddingStrategyKind {
    #[default]
    Truthful,
    Shaded,
    Learned,
}

impl FromStr for BiddingStrategyKind {
    type Err = DispatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "truthful" => Ok(Self::Truthful),
            "shaded" | "shade" => Ok(Self::Shaded),
            "learned" | "lookahead" => Ok(Self::Learned),
            other => Err(DispatchError::Configuration(format!(
                "unknown bidding strategy '{other}'"
            ))),
        }
    }
}

impl fmt::Display for BiddingStrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Truthful => "truthful",
            Self::Shaded => "shaded",
            Self::Learned => "learned",
        };
        f.write_str(name)
    }
}

#[derive(Clone)]
pub enum BiddingStrategy {
    /// Bid the plan value.
    Truthful,
    /// Bid a uniformly random fraction of the plan value.
    Shaded,
    /// Delegate to an external policy.
    Learned(PolicyHandle),
}

impl fmt::Debug for BiddingStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Truthful => f.write_str("Truthful"),
            Self::Shaded => f.write_str("Shaded"),
            Self::Learned(_) => f.write_str("Learned(..)"),
        }
    }
}

impl BiddingStrategy {
    /// Build a strategy from its configured kind. `Learned` needs a policy.
    pub fn from_kind(
        kind: BiddingStrategyKind,
        policy: Option<PolicyHandle>,
    ) -> Result<Self, DispatchError> {
        match (kind, policy) {
            (BiddingStrategyKind::Truthful, _) => Ok(Self::Truthful),
            (BiddingStrategyKind::Shaded, _) => Ok(Self::Shaded),
            (BiddingStrategyKind::Learned, Some(policy)) => Ok(Self::Learned(policy)),
            (BiddingStrategyKind::Learned, None) => Err(DispatchError::Configuration(
                "learned bidding requires a policy".to_string(),
            )),
        }
    }

    pub fn kind(&self) -> BiddingStrategyKind {
        match self {
            Self::Truthful => BiddingStrategyKind::Truthful,
            Self::Shaded => BiddingStrategyKind::Shaded,
            Self::Learned(_) => BiddingStrategyKind::Learned,
        }
    }

    pub fn is_learned(&self) -> bool {
        matches!(self, Self::Learned(_))
    }

    pub fn policy(&self) -> Option<&PolicyHandle> {
        match self {
            Self::Learned(policy) => Some(policy),
            _ => None,
        }
    }

    /// Produce a raw bid for a plan worth `value`.
    pub fn compute_bid<R: Rng>(
        &self,
        state: &BidState,
        value: f64,
        rng: &mut R,
    ) -> (f64, BidAuxiliary) {
        match self {
            Self::Truthful => (value, BidAuxiliary::default()),
            Self::Shaded => {
                let fraction: f64 = rng.gen();
                (fraction * value, BidAuxiliary::default())
            }
            Self::Learned(policy) => policy.borrow_mut().act(state),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    struct FixedPolicy {
        action: f64,
        trained_on: usize,
    }

    impl BidPolicy for FixedPolicy {
        fn act(&mut self, _state: &BidState) -> (f64, BidAuxiliary) {
            (self.action, BidAuxiliary(vec![-0.5]))
        }

        fn train(&mut self, experiences: &[Experience]) {
            self.trained_on += experiences.len();
        }
    }

    fn state() -> BidState {
        BidState {
            start: Position::new(0.0, 0.0),
            pickup: Position::new(1.0, 0.0),
            dropoff: Position::new(1.0, 1.0),
            start_time: 3.0,
        }
    }

    #[test]
    fn truthful_bids_value() {
        let mut rng = StdRng::seed_from_u64(1);
        let (bid, aux) = BiddingStrategy::Truthful.compute_bid(&state(), 16.8, &mut rng);
        assert_eq!(bid, 16.8);
        assert_eq!(aux, BidAuxiliary::default());
    }

    #[test]
    fn shaded_bid_stays_below_value() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..100 {
            let (bid, _) = BiddingStrategy::Shaded.compute_bid(&state(), 10.0, &mut rng);
            assert!((0.0..10.0).contains(&bid));
        }
    }

    #[test]
    fn learned_delegates_to_policy() {
        let policy = Rc::new(RefCell::new(FixedPolicy {
            action: 0.25,
            trained_on: 0,
        }));
        let strategy = BiddingStrategy::Learned(policy.clone());
        let mut rng = StdRng::seed_from_u64(1);
        let (bid, aux) = strategy.compute_bid(&state(), 10.0, &mut rng);
        assert_eq!(bid, 0.25);
        assert_eq!(aux.0, vec![-0.5]);
        assert!(strategy.is_learned());
        assert_eq!(policy.borrow().trained_on, 0);
    }

    #[test]
    fn learned_kind_requires_policy() {
        assert!(BiddingStrategy::from_kind(BiddingStrategyKind::Learned, None).is_err());
        assert_eq!(
            "shade".parse::<BiddingStrategyKind>().expect("legacy name"),
            BiddingStrategyKind::Shaded
        );
    }

    #[test]
    fn features_follow_state_layout() {
        assert_eq!(state().features(), [0.0, 0.0, 1.0, 0.0, 1.0, 1.0, 3.0]);
    }
}
