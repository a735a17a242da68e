//! Recency-weighted aggregation of an observation history into an expected rate.
//!
//! Observations are weighted by an exponential schedule that grows towards the most recent entry.
//! The rate (lambda) is conditioned on the venue of the next fixture whenever that venue has
//! supporting data; otherwise the overall weighted average is used. An unweighted sample mean and
//! Bessel-corrected variance are computed over the same series for dispersion fitting.

use std::ops::RangeFrom;

use anyhow::anyhow;
use thiserror::Error;
use tracing::trace;

use crate::error::ValidationError;
use crate::observation::{TemporalObservation, Venue};

pub const MIN_OBSERVATIONS: usize = 4;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("insufficient data: {supplied} observations supplied, at least {required} required")]
pub struct InsufficientData {
    pub required: usize,
    pub supplied: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub half_life: f64,
    pub min_observations: usize,
}
impl Config {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !self.half_life.is_finite() || self.half_life <= 0.0 {
            return Err(anyhow!("half life ({}) must be a positive number", self.half_life).into());
        }
        const MIN_OBSERVATIONS_RANGE: RangeFrom<usize> = MIN_OBSERVATIONS..;
        if !MIN_OBSERVATIONS_RANGE.contains(&self.min_observations) {
            return Err(anyhow!(
                "minimum observations ({}) cannot be less than {MIN_OBSERVATIONS}",
                self.min_observations
            )
            .into());
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            half_life: 6.0,
            min_observations: MIN_OBSERVATIONS,
        }
    }
}

/// The outcome of a single aggregation. Recomputed on every call.
#[derive(Debug, Clone, PartialEq)]
pub struct WeightedStatistic {
    pub lambda: f64,
    pub sample_mean: f64,
    pub sample_variance: f64,
}

#[derive(Debug, Default, Clone, Copy)]
struct WeightedSum {
    sum: f64,
    total_weight: f64,
    count: usize,
}
impl WeightedSum {
    #[inline]
    fn add(&mut self, value: f64, weight: f64) {
        self.sum += value * weight;
        self.total_weight += weight;
        self.count += 1;
    }

    fn average(&self) -> Option<f64> {
        if self.count == 0 || self.total_weight <= 0.0 {
            None
        } else {
            Some(self.sum / self.total_weight)
        }
    }
}

#[derive(Debug)]
pub struct Aggregator {
    config: Config,
}
impl Aggregator {
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Recency weight of the observation at `index`, where the oldest observation has index 0.
    #[inline]
    pub fn weight(&self, index: usize) -> f64 {
        f64::powf(2.0, (index + 1) as f64 / self.config.half_life)
    }

    pub fn aggregate(
        &self,
        observations: &[TemporalObservation],
        next_venue: Venue,
        normalise_by_minutes: bool,
    ) -> Result<WeightedStatistic, InsufficientData> {
        if observations.len() < self.config.min_observations {
            return Err(InsufficientData {
                required: self.config.min_observations,
                supplied: observations.len(),
            });
        }

        let series = values(observations, normalise_by_minutes);
        let (mut overall, mut home, mut away) = (WeightedSum::default(), WeightedSum::default(), WeightedSum::default());
        for (index, (&value, obs)) in series.iter().zip(observations).enumerate() {
            let weight = self.weight(index);
            overall.add(value, weight);
            match obs.venue {
                Venue::Home => home.add(value, weight),
                Venue::Away => away.add(value, weight),
            }
        }

        let venue_sum = match next_venue {
            Venue::Home => &home,
            Venue::Away => &away,
        };
        let overall_average = overall.average().unwrap_or(0.0);
        let lambda = match venue_sum.average() {
            Some(average) => {
                trace!("using {next_venue} average {average:.3} from {} observations", venue_sum.count);
                average
            }
            None => {
                trace!("no {next_venue} observations; using overall average {overall_average:.3}");
                overall_average
            }
        };

        let (sample_mean, sample_variance) = mean_variance(&series);
        Ok(WeightedStatistic {
            lambda,
            sample_mean,
            sample_variance,
        })
    }
}

impl TryFrom<Config> for Aggregator {
    type Error = ValidationError;

    fn try_from(config: Config) -> Result<Self, Self::Error> {
        config.validate()?;
        Ok(Self { config })
    }
}

impl Default for Aggregator {
    fn default() -> Self {
        Self {
            config: Config::default(),
        }
    }
}

fn values(observations: &[TemporalObservation], normalise_by_minutes: bool) -> Vec<f64> {
    observations
        .iter()
        .map(|obs| {
            if normalise_by_minutes {
                obs.per_90().unwrap_or(obs.count as f64)
            } else {
                obs.count as f64
            }
        })
        .collect()
}

/// Unweighted mean and Bessel-corrected variance.
pub fn mean_variance(series: &[f64]) -> (f64, f64) {
    let n = series.len();
    if n == 0 {
        return (0.0, 0.0);
    }
    let mean = series.iter().sum::<f64>() / n as f64;
    if n == 1 {
        return (mean, 0.0);
    }
    let sum_sq = series.iter().map(|value| (value - mean).powi(2)).sum::<f64>();
    (mean, sum_sq / (n - 1) as f64)
}
