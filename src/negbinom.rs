//! Negative-Binomial survival probabilities for over-dispersed event counts.

use std::ops::RangeInclusive;

use anyhow::anyhow;
use tracing::debug;

use crate::error::ValidationError;

/// Generalised binomial coefficient `C(n, k)` for real `n` and non-negative integer `k`, computed
/// as the falling-factorial product over exactly `k` terms.
///
/// The `k ↔ n − k` symmetry holds only for integer `n` and is not applied here.
#[inline]
pub fn generalised_binomial(n: f64, k: u32) -> f64 {
    let mut product = 1.0;
    for i in 0..k {
        product *= (n - i as f64) / (i + 1) as f64;
    }
    product
}

/// Probability mass at `x` of a Negative-Binomial with `r` successes and success probability `p`.
#[inline]
pub fn pmf(x: u32, r: f64, p: f64) -> f64 {
    generalised_binomial(x as f64 + r - 1.0, x) * p.powf(r) * (1.0 - p).powi(x as i32)
}

/// `P(X ≥ target)`.
pub fn survival(target: u32, r: f64, p: f64) -> f64 {
    let cumulative = (0..target).map(|x| pmf(x, r, p)).sum::<f64>();
    f64::min(1.0, f64::max(0.0, 1.0 - cumulative))
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub k_bounds: RangeInclusive<f64>,
    pub poisson_k: f64,
    pub max_odds: f64,
}
impl Config {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if *self.k_bounds.start() <= 0.0 || self.k_bounds.start() > self.k_bounds.end() {
            return Err(anyhow!("dispersion bounds {:?} must be positive and ordered", self.k_bounds).into());
        }
        if self.poisson_k <= 0.0 {
            return Err(anyhow!("near-Poisson dispersion ({}) must be positive", self.poisson_k).into());
        }
        if self.max_odds <= 1.0 {
            return Err(anyhow!("maximum odds ({}) must exceed 1", self.max_odds).into());
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            k_bounds: 0.1..=50.0,
            poisson_k: 1000.0,
            max_odds: 1000.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProbabilityResult {
    pub probability: f64,
    pub decimal_odds: f64,
    pub mean: f64,
    pub variance: f64,
    pub dispersion_k: f64,
    max_odds: f64,
}
impl ProbabilityResult {
    /// The "under" side of the same line: `1 − probability`, with odds re-derived.
    pub fn complement(&self) -> ProbabilityResult {
        let probability = f64::max(0.0, 1.0 - self.probability);
        Self {
            probability,
            decimal_odds: decimal_odds(probability, self.max_odds),
            ..self.clone()
        }
    }
}

/// Fair decimal odds, capped when the event is priced at zero probability.
#[inline]
pub fn decimal_odds(probability: f64, max_odds: f64) -> f64 {
    if probability > 0.0 {
        1.0 / probability
    } else {
        max_odds
    }
}

#[derive(Debug)]
pub struct Fitter {
    config: Config,
}
impl Fitter {
    /// Method-of-moments dispersion, clamped to the configured bounds.
    pub fn dispersion(&self, sample_mean: f64, sample_variance: f64) -> f64 {
        let k = if sample_variance > sample_mean {
            sample_mean.powi(2) / (sample_variance - sample_mean)
        } else {
            self.config.poisson_k
        };
        f64::min(*self.config.k_bounds.end(), f64::max(*self.config.k_bounds.start(), k))
    }

    pub fn fit(&self, sample_mean: f64, sample_variance: f64, lambda: f64, target: u32) -> ProbabilityResult {
        let k = self.dispersion(sample_mean, sample_variance);
        let p = k / (k + lambda);
        let probability = survival(target, k, p);
        debug!("fitted k={k:.3}, p={p:.4} for lambda={lambda:.3}; P(X ≥ {target})={probability:.4}");
        ProbabilityResult {
            probability,
            decimal_odds: decimal_odds(probability, self.config.max_odds),
            mean: sample_mean,
            variance: sample_variance,
            dispersion_k: k,
            max_odds: self.config.max_odds,
        }
    }
}

impl TryFrom<Config> for Fitter {
    type Error = ValidationError;

    fn try_from(config: Config) -> Result<Self, Self::Error> {
        config.validate()?;
        Ok(Self { config })
    }
}

impl Default for Fitter {
    fn default() -> Self {
        Self {
            config: Config::default(),
        }
    }
}
