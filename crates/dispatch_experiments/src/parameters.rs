//! Parameter variation framework for auction experiments.
//!
//! A [`ParameterSpace`] lists the values to explore per dimension; `generate`
//! expands them into one [`ParameterSet`] per combination (grid search).

use dispatch_core::auction::{AuctionType, PaymentRule};
use dispatch_core::bidding::BiddingStrategyKind;
use dispatch_core::config::DispatchConfig;
use serde::Serialize;

/// A single configuration for one simulation run.
#[derive(Debug, Clone, Serialize)]
pub struct ParameterSet {
    pub config: DispatchConfig,
    /// Unique experiment ID for this parameter configuration.
    pub experiment_id: String,
    /// Run ID within the experiment (for repeated runs with the same config).
    pub run_id: usize,
    /// Master seed; demand, vehicles and policies derive their own streams from it.
    pub seed: u64,
    /// Simulated days.
    pub days: u32,
    /// Train learned policies every this many simulated hours.
    pub train_every_hours: Option<u32>,
}

impl ParameterSet {
    pub fn new(config: DispatchConfig, experiment_id: String, run_id: usize, seed: u64) -> Self {
        Self {
            config,
            experiment_id,
            run_id,
            seed,
            days: 1,
            train_every_hours: None,
        }
    }

    pub fn with_days(mut self, days: u32) -> Self {
        self.days = days;
        self
    }

    pub fn with_training(mut self, every_hours: u32) -> Self {
        self.train_every_hours = Some(every_hours.max(1));
        self
    }

    /// The dispatch config with this run's seed applied.
    pub fn dispatch_config(&self) -> DispatchConfig {
        self.config.clone().with_seed(self.seed)
    }

    pub fn hours(&self) -> u32 {
        self.days * 24
    }
}

/// Values to explore per dimension. An empty dimension falls back to the base config.
#[derive(Debug, Clone)]
pub struct ParameterSpace {
    base: DispatchConfig,
    auction_types: Vec<AuctionType>,
    payment_rules: Vec<PaymentRule>,
    bidding_strategies: Vec<BiddingStrategyKind>,
    payment_ratios: Vec<f64>,
    waiting_time_thresholds: Vec<f64>,
    runs_per_combination: usize,
    days: u32,
    train_every_hours: Option<u32>,
}

impl Default for ParameterSpace {
    fn default() -> Self {
        Self::new()
    }
}

impl ParameterSpace {
    pub fn new() -> Self {
        Self {
            base: DispatchConfig::default(),
            auction_types: vec![],
            payment_rules: vec![],
            bidding_strategies: vec![],
            payment_ratios: vec![],
            waiting_time_thresholds: vec![],
            runs_per_combination: 1,
            days: 1,
            train_every_hours: None,
        }
    }

    pub fn grid() -> Self {
        Self::new()
    }

    /// Every auction type crossed with every payment rule.
    pub fn all_auction_rules() -> Self {
        Self::grid()
            .auction_type(vec![AuctionType::FirstPrice, AuctionType::SecondPrice])
            .payment_rule(PaymentRule::ALL.to_vec())
    }

    pub fn auction_type(mut self, types: Vec<AuctionType>) -> Self {
        self.auction_types = types;
        self
    }

    pub fn payment_rule(mut self, rules: Vec<PaymentRule>) -> Self {
        self.payment_rules = rules;
        self
    }

    pub fn bidding_strategy(mut self, strategies: Vec<BiddingStrategyKind>) -> Self {
        self.bidding_strategies = strategies;
        self
    }

    pub fn payment_ratio(mut self, ratios: Vec<f64>) -> Self {
        self.payment_ratios = ratios;
        self
    }

    pub fn waiting_time_threshold(mut self, thresholds: Vec<f64>) -> Self {
        self.waiting_time_thresholds = thresholds;
        self
    }

    pub fn runs(mut self, runs_per_combination: usize) -> Self {
        self.runs_per_combination = runs_per_combination.max(1);
        self
    }

    pub fn days(mut self, days: u32) -> Self {
        self.days = days;
        self
    }

    pub fn train_every_hours(mut self, hours: Option<u32>) -> Self {
        self.train_every_hours = hours;
        self
    }

    pub fn with_base(mut self, base: DispatchConfig) -> Self {
        self.base = base;
        self
    }

    /// Cartesian product of all dimensions, `runs` sets per combination.
    pub fn generate(&self) -> Vec<ParameterSet> {
        let auction_types = or_base(&self.auction_types, self.base.auction_type);
        let payment_rules = or_base(&self.payment_rules, self.base.payment_rule);
        let strategies = or_base(&self.bidding_strategies, self.base.bidding_strategy);
        let ratios = or_base(&self.payment_ratios, self.base.payment_ratio);
        let thresholds = or_base(&self.waiting_time_thresholds, self.base.waiting_time_threshold);

        let mut configs = Vec::new();
        for &auction_type in &auction_types {
            for &payment_rule in &payment_rules {
                for &strategy in &strategies {
                    for &ratio in &ratios {
                        for &threshold in &thresholds {
                            configs.push(
                                self.base
                                    .clone()
                                    .with_auction_type(auction_type)
                                    .with_payment_rule(payment_rule)
                                    .with_bidding_strategy(strategy)
                                    .with_payment_ratio(ratio)
                                    .with_waiting_time_threshold(threshold),
                            );
                        }
                    }
                }
            }
        }

        configs
            .into_iter()
            .enumerate()
            .flat_map(|(experiment_id, config)| {
                (0..self.runs_per_combination).map(move |run_id| {
                    let seed = (experiment_id as u64)
                        .wrapping_mul(0x9e3779b9)
                        .wrapping_add(run_id as u64);
                    let mut set =
                        ParameterSet::new(config.clone(), format!("exp_{experiment_id}"), run_id, seed)
                            .with_days(self.days);
                    set.train_every_hours = self.train_every_hours;
                    set
                })
            })
            .collect()
    }
}

fn or_base<T: Copy>(values: &[T], base: T) -> Vec<T> {
    if values.is_empty() {
        vec![base]
    } else {
        values.to_vec()
    }
}
