//! Per-match observations of a discrete event count, as supplied by a weekly statistics feed.

use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter, EnumString};

/// Minutes in a full match, used to scale partial appearances up to a per-90 rate.
pub const FULL_MATCH_MINUTES: f64 = 90.0;

#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, PartialOrd, Ord, Display, EnumIter, EnumString, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Venue {
    #[strum(serialize = "home")]
    Home,
    #[strum(serialize = "away")]
    Away,
}
impl Venue {
    pub fn from_is_home(is_home: bool) -> Self {
        if is_home {
            Venue::Home
        } else {
            Venue::Away
        }
    }

    pub fn is_home(&self) -> bool {
        matches!(self, Venue::Home)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TemporalObservation {
    pub count: u32,
    pub venue: Venue,
    #[serde(default)]
    pub minutes_played: Option<f64>,
    #[serde(default)]
    pub week_index: u32,
}
impl TemporalObservation {
    pub fn new(count: u32, venue: Venue, minutes_played: f64, week_index: u32) -> Self {
        Self {
            count,
            venue,
            minutes_played: Some(minutes_played),
            week_index,
        }
    }

    /// The count scaled to a full match. Zero when no minutes were played.
    pub fn per_90(&self) -> Option<f64> {
        self.minutes_played.map(|minutes| {
            if minutes <= 0.0 {
                0.0
            } else {
                self.count as f64 * FULL_MATCH_MINUTES / minutes
            }
        })
    }
}

/// The raw feed shape: `{count, isHome, minutesPlayed}`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedObservation {
    pub count: u32,
    pub is_home: bool,
    #[serde(default)]
    pub minutes_played: Option<f64>,
}

/// Converts feed tuples (oldest first) into observations, numbering weeks from zero.
pub fn from_feed(feed: &[FeedObservation]) -> Vec<TemporalObservation> {
    feed.iter()
        .enumerate()
        .map(|(week_index, obs)| TemporalObservation {
            count: obs.count,
            venue: Venue::from_is_home(obs.is_home),
            minutes_played: obs.minutes_played,
            week_index: week_index as u32,
        })
        .collect()
}
