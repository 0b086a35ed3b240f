//! Auction rules: who wins a request and what the winner pays.
//!
//! Each payment rule fixes the direction in which adjusted bids are ranked.
//! The table lives in [`PaymentRule::ranking_direction`] and nowhere else:
//!
//! | payment rule         | ranking                          |
//! |----------------------|----------------------------------|
//! | `cost-minus-bid`     | [`RankingDirection::MinimizesBid`] |
//! | `value-proportional` | [`RankingDirection::MaximizesBid`] |
//! | `blended`            | [`RankingDirection::MinimizesBid`] |

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::bidding::BiddingStrategyKind;
use crate::error::DispatchError;

/// Upper bound of an adjusted bid; also what a NaN learned bid maps to.
pub const MAX_ADJUSTED_BID: f64 = 1e6;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AuctionType {
    /// The winner's own bid is the reference bid.
    #[default]
    FirstPrice,
    /// The runner-up's bid is the reference bid.
    SecondPrice,
}

impl FromStr for AuctionType {
    type Err = DispatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "first-price" => Ok(Self::FirstPrice),
            "second-price" => Ok(Self::SecondPrice),
            other => Err(DispatchError::Configuration(format!(
                "invalid auction type '{other}'"
            ))),
        }
    }
}

impl fmt::Display for AuctionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::FirstPrice => "first-price",
            Self::SecondPrice => "second-price",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RankingDirection {
    /// Lowest adjusted bid wins.
    MinimizesBid,
    /// Highest adjusted bid wins.
    MaximizesBid,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PaymentRule {
    /// `ρ(c − g)·rd − b`
    #[default]
    CostMinusBid,
    /// `ρ·b`
    ValueProportional,
    /// `ρ(c − g)·rd − (1 − ρ)·b`
    Blended,
}

impl PaymentRule {
    pub const ALL: [PaymentRule; 3] = [
        PaymentRule::CostMinusBid,
        PaymentRule::ValueProportional,
        PaymentRule::Blended,
    ];

    pub fn ranking_direction(self) -> RankingDirection {
        match self {
            PaymentRule::CostMinusBid => RankingDirection::MinimizesBid,
            PaymentRule::ValueProportional => RankingDirection::MaximizesBid,
            PaymentRule::Blended => RankingDirection::MinimizesBid,
        }
    }

    /// Payment owed to the coordinator for a trip of `requested_distance`
    /// given the reference bid.
    pub fn payment(self, terms: &PaymentTerms, requested_distance: f64, reference_bid: f64) -> f64 {
        let ratio = terms.payment_ratio;
        let fare_share =
            ratio * (terms.charge_rate_per_kilometer - terms.gas_cost_per_kilometer) * requested_distance;
        match self {
            PaymentRule::CostMinusBid => fare_share - reference_bid,
            PaymentRule::ValueProportional => ratio * reference_bid,
            PaymentRule::Blended => fare_share - (1.0 - ratio) * reference_bid,
        }
    }
}

impl FromStr for PaymentRule {
    type Err = DispatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cost-minus-bid" | "type-1" => Ok(Self::CostMinusBid),
            "value-proportional" | "type-2" => Ok(Self::ValueProportional),
            "blended" | "type-3" => Ok(Self::Blended),
            other => Err(DispatchError::Configuration(format!(
                "invalid payment rule '{other}'"
            ))),
        }
    }
}

impl fmt::Display for PaymentRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::CostMinusBid => "cost-minus-bid",
            Self::ValueProportional => "value-proportional",
            Self::Blended => "blended",
        })
    }
}

/// Economic parameters the payment formulas read.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PaymentTerms {
    pub payment_ratio: f64,
    pub charge_rate_per_kilometer: f64,
    pub gas_cost_per_kilometer: f64,
}

/// Ranking value of a raw bid.
///
/// Truthful and shaded bids rank as they are. A learned action is read as a
/// relative adjustment of the plan value, clamped to `[0, MAX_ADJUSTED_BID]`;
/// a NaN action ranks as `MAX_ADJUSTED_BID`.
pub fn adjusted_bid(strategy: BiddingStrategyKind, value: f64, bid: f64) -> f64 {
    match strategy {
        BiddingStrategyKind::Truthful | BiddingStrategyKind::Shaded => bid,
        BiddingStrategyKind::Learned => {
            if bid.is_nan() {
                return MAX_ADJUSTED_BID;
            }
            let adjusted = value + bid * 0.5 * value;
            if adjusted.is_nan() {
                MAX_ADJUSTED_BID
            } else {
                adjusted.clamp(0.0, MAX_ADJUSTED_BID)
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AuctionResult {
    /// Index of the winning bid in the slice handed to [`select_winner`].
    pub winner: usize,
    pub reference_bid: f64,
}

/// Rank adjusted bids and pick the winner and the reference bid.
///
/// Ties keep their input order. A lone bidder is its own reference under
/// both auction types. Returns `None` for an empty auction.
pub fn select_winner(
    adjusted_bids: &[f64],
    auction_type: AuctionType,
    direction: RankingDirection,
) -> Option<AuctionResult> {
    let mut ranking: Vec<usize> = (0..adjusted_bids.len()).collect();
    match direction {
        RankingDirection::MinimizesBid => {
            ranking.sort_by(|&a, &b| adjusted_bids[a].total_cmp(&adjusted_bids[b]))
        }
        RankingDirection::MaximizesBid => {
            ranking.sort_by(|&a, &b| adjusted_bids[b].total_cmp(&adjusted_bids[a]))
        }
    }

    let winner = *ranking.first()?;
    let reference = match (auction_type, ranking.get(1)) {
        (AuctionType::SecondPrice, Some(&runner_up)) => runner_up,
        _ => winner,
    };

    Some(AuctionResult {
        winner,
        reference_bid: adjusted_bids[reference],
    })
}
