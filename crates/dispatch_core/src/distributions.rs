//! Probability distributions for call arrivals and trip lengths.
//!
//! Samplers take the caller's RNG so a generator seeded once stays
//! reproducible across the whole run.

use rand::Rng;

/// Exponential inter-arrival times: a Poisson process with a constant rate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExponentialInterArrival {
    /// Expected number of events per hour.
    pub rate_per_hour: f64,
}

impl ExponentialInterArrival {
    pub fn new(rate_per_hour: f64) -> Self {
        Self {
            rate_per_hour: rate_per_hour.max(0.0),
        }
    }

    /// Next inter-arrival time in hours. A zero rate never fires.
    pub fn sample_hours<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        if self.rate_per_hour <= 0.0 {
            return f64::INFINITY;
        }
        // -ln(U) / lambda, with U in (0, 1]
        let u: f64 = rng.gen();
        let u = u.max(1e-10);
        -u.ln() / self.rate_per_hour
    }
}

/// Normal distribution restricted to strictly positive samples.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PositiveNormal {
    pub mean: f64,
    pub std_dev: f64,
}

/// Draws before giving up on a positive normal sample and returning the mean.
const MAX_RESAMPLES: usize = 1_000;

impl PositiveNormal {
    pub fn new(mean: f64, std_dev: f64) -> Self {
        Self {
            mean,
            std_dev: std_dev.abs(),
        }
    }

    /// Box–Muller draw; non-positive draws are resampled.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        for _ in 0..MAX_RESAMPLES {
            let value = self.mean + self.std_dev * standard_normal(rng);
            if value > 0.0 {
                return value;
            }
        }
        self.mean.max(f64::MIN_POSITIVE)
    }
}

/// Stream of the call generator.
pub const DEMAND_STREAM: u64 = 1;
/// Stream of a learned bidding policy.
pub const POLICY_STREAM: u64 = 2;
/// First vehicle stream; vehicle `i` draws from `VEHICLE_STREAM + i`.
pub const VEHICLE_STREAM: u64 = 1 << 32;

/// Seed of one random stream derived from a run's master seed.
///
/// Distinct streams of the same master seed are decorrelated by the
/// SplitMix64 finalizer, so no two consumers replay each other's draws.
pub fn derive_seed(seed: u64, stream: u64) -> u64 {
    let mut z = seed.wrapping_add(stream.wrapping_add(1).wrapping_mul(0x9e37_79b9_7f4a_7c15));
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    z ^ (z >> 31)
}

/// One N(0, 1) draw by the Box–Muller transform.
pub fn standard_normal<R: Rng + ?Sized>(rng: &mut R) -> f64 {
    let u1: f64 = rng.gen::<f64>().max(1e-12);
    let u2: f64 = rng.gen();
    (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
}
