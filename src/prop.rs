//! End-to-end pricing of a player or team prop: history → weighted rate → survival probability.

use serde::{Deserialize, Serialize};
use strum_macros::Display;
use thiserror::Error;
use tracing::debug;

use crate::aggregate::{Aggregator, InsufficientData};
use crate::negbinom::{Fitter, ProbabilityResult};
use crate::observation::{TemporalObservation, Venue};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EstimateError {
    #[error("{0}")]
    InsufficientData(#[from] InsufficientData),
}

#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, Display, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    #[strum(serialize = "at least")]
    AtLeast,
    #[strum(serialize = "under")]
    Under,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PropRequest {
    pub next_venue: Venue,
    pub target: u32,
    pub direction: Direction,
    pub normalise_by_minutes: bool,
}

/// The smallest count that clears a half-point line, e.g. 2.5 → 3.
pub fn target_for_line(line: f64) -> u32 {
    if line <= 0.0 {
        0
    } else {
        line.floor() as u32 + 1
    }
}

#[derive(Debug, Default)]
pub struct Estimator {
    pub aggregator: Aggregator,
    pub fitter: Fitter,
}
impl Estimator {
    pub fn new(aggregator: Aggregator, fitter: Fitter) -> Self {
        Self { aggregator, fitter }
    }

    pub fn estimate(
        &self,
        observations: &[TemporalObservation],
        request: &PropRequest,
    ) -> Result<ProbabilityResult, EstimateError> {
        let stat = self.aggregator.aggregate(
            observations,
            request.next_venue,
            request.normalise_by_minutes,
        )?;
        debug!("aggregated {stat:?} from {} observations", observations.len());
        let at_least = self.fitter.fit(
            stat.sample_mean,
            stat.sample_variance,
            stat.lambda,
            request.target,
        );
        Ok(match request.direction {
            Direction::AtLeast => at_least,
            Direction::Under => at_least.complement(),
        })
    }
}
