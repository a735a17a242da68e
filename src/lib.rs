//! Recency-weighted player prop pricing, team scoring rankings and randomised squad composition
//! for football statistics.
//!
//! Player counting stats are aggregated with an exponential recency weighting, fitted to a
//! negative binomial distribution and priced as fair decimal odds.

pub mod aggregate;
pub mod error;
pub mod file;
pub mod names;
pub mod negbinom;
pub mod observation;
pub mod print;
pub mod prop;
pub mod rank;
pub mod sample;
pub mod snapshot;
pub mod squad;

#[cfg(test)]
pub(crate) mod testing;

#[doc = include_str!("../README.md")]
#[cfg(doc)]
fn readme() {}
