//! Linear-Gaussian bidding policy trained with REINFORCE.
//!
//! The action is a relative bid adjustment: the coordinator ranks it as
//! `value * (1 + 0.5 * action)`. The policy samples it from a normal
//! distribution whose mean is linear in the bid state.

use dispatch_core::bidding::{BidAuxiliary, BidPolicy, BidState, Experience};
use dispatch_core::distributions::standard_normal;
use rand::rngs::StdRng;
use rand::SeedableRng;

const FEATURES: usize = BidState::FEATURES + 1;
/// Coordinates of the preset cities stay within a few tens of kilometres.
const COORDINATE_SCALE: f64 = 10.0;
const MAX_GRADIENT: f64 = 1.0;

#[derive(Debug, Clone)]
pub struct LinearGaussianPolicy {
    weights: [f64; FEATURES],
    std_dev: f64,
    learning_rate: f64,
    rng: StdRng,
}

impl LinearGaussianPolicy {
    pub fn new(seed: u64) -> Self {
        Self {
            weights: [0.0; FEATURES],
            std_dev: 0.3,
            learning_rate: 0.01,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn with_learning_rate(mut self, learning_rate: f64) -> Self {
        self.learning_rate = learning_rate;
        self
    }

    pub fn with_std_dev(mut self, std_dev: f64) -> Self {
        self.std_dev = std_dev.max(1e-6);
        self
    }

    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    /// Scaled state features followed by a bias term.
    fn features(state: &BidState) -> [f64; FEATURES] {
        let raw = state.features();
        let mut out = [1.0; FEATURES];
        for (i, value) in raw.iter().enumerate() {
            out[i] = if i + 1 == BidState::FEATURES {
                value.rem_euclid(24.0) / 24.0
            } else {
                value / COORDINATE_SCALE
            };
        }
        out
    }

    fn mean(&self, features: &[f64; FEATURES]) -> f64 {
        self.weights.iter().zip(features).map(|(w, x)| w * x).sum()
    }

    fn log_prob(&self, action: f64, mean: f64) -> f64 {
        let z = (action - mean) / self.std_dev;
        -0.5 * z * z - self.std_dev.ln() - 0.5 * (2.0 * std::f64::consts::PI).ln()
    }
}

impl BidPolicy for LinearGaussianPolicy {
    fn act(&mut self, state: &BidState) -> (f64, BidAuxiliary) {
        let features = Self::features(state);
        let mean = self.mean(&features);
        let action = mean + self.std_dev * standard_normal(&mut self.rng);
        (action, BidAuxiliary(vec![self.log_prob(action, mean), mean]))
    }

    fn train(&mut self, experiences: &[Experience]) {
        if experiences.is_empty() {
            return;
        }
        let baseline =
            experiences.iter().map(|e| e.reward).sum::<f64>() / experiences.len() as f64;

        let mut gradient = [0.0; FEATURES];
        for experience in experiences {
            let features = Self::features(&experience.state);
            let mean = experience
                .auxiliary
                .0
                .get(1)
                .copied()
                .unwrap_or_else(|| self.mean(&features));
            let score = (experience.bid - mean) / (self.std_dev * self.std_dev);
            let advantage = experience.reward - baseline;
            for (g, x) in gradient.iter_mut().zip(features) {
                *g += score * advantage * x;
            }
        }

        let n = experiences.len() as f64;
        for (w, g) in self.weights.iter_mut().zip(gradient) {
            let step = (g / n).clamp(-MAX_GRADIENT, MAX_GRADIENT);
            if step.is_finite() {
                *w += self.learning_rate * step;
            }
        }
        log::debug!(
            "policy update on {} experiences, baseline reward {baseline:.2}",
            experiences.len()
        );
    }
}
