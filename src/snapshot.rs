//! Typed per-match statistics, parsed at the boundary from flat dotted-key feed records.
//!
//! A record carries, for each side, an "overall" and a "detailed" bag of percentages/averages plus a
//! goals-timing histogram in 15-minute buckets:
//!
//! ```text
//! home_name                                   "Arsenal"
//! overall_home_infos.stats.over_2_5_percentage "64%"
//! home_infos.stats.over_2_5_percentage         "58%"
//! home.goals_timing.76-90.scored              3
//! ```

use std::fmt::{Display, Formatter};

use rustc_hash::FxHashMap;
use serde_json::{Map, Value};
use strum::{EnumCount, IntoEnumIterator};
use strum_macros::{EnumCount as EnumCountMacro, EnumIter};
use thiserror::Error;

use crate::observation::Venue;

pub type FlatRecord = Map<String, Value>;

#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, PartialOrd, Ord, EnumIter, EnumCountMacro)]
pub enum Bucket {
    UpTo15,
    UpTo30,
    UpTo45,
    UpTo60,
    UpTo75,
    UpTo90,
}
impl Bucket {
    pub fn label(&self) -> &'static str {
        match self {
            Bucket::UpTo15 => "0-15",
            Bucket::UpTo30 => "16-30",
            Bucket::UpTo45 => "31-45",
            Bucket::UpTo60 => "46-60",
            Bucket::UpTo75 => "61-75",
            Bucket::UpTo90 => "76-90",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        Self::iter().find(|bucket| bucket.label() == label)
    }

    pub fn half(&self) -> Half {
        match self {
            Bucket::UpTo15 | Bucket::UpTo30 | Bucket::UpTo45 => Half::First,
            Bucket::UpTo60 | Bucket::UpTo75 | Bucket::UpTo90 => Half::Second,
        }
    }

    #[inline]
    fn index(&self) -> usize {
        *self as usize
    }
}

#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq)]
pub enum Half {
    First,
    Second,
}
impl Display for Half {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Half::First => write!(f, "1st half"),
            Half::Second => write!(f, "2nd half"),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BucketGoals {
    pub scored: u32,
    pub against: u32,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GoalsTiming {
    buckets: [BucketGoals; Bucket::COUNT],
}
impl GoalsTiming {
    pub fn get(&self, bucket: Bucket) -> &BucketGoals {
        &self.buckets[bucket.index()]
    }

    pub fn get_mut(&mut self, bucket: Bucket) -> &mut BucketGoals {
        &mut self.buckets[bucket.index()]
    }

    pub fn add(&mut self, other: &GoalsTiming) {
        for (mine, theirs) in self.buckets.iter_mut().zip(other.buckets.iter()) {
            mine.scored += theirs.scored;
            mine.against += theirs.against;
        }
    }

    pub fn total_scored(&self) -> u32 {
        self.buckets.iter().map(|goals| goals.scored).sum()
    }

    pub fn total_against(&self) -> u32 {
        self.buckets.iter().map(|goals| goals.against).sum()
    }

    /// The bucket with the most goals scored; the earliest wins ties. `None` if nothing was scored.
    pub fn top_scoring(&self) -> Option<Bucket> {
        Self::top(|bucket| self.get(bucket).scored)
    }

    /// The bucket with the most goals conceded; the earliest wins ties. `None` if nothing was conceded.
    pub fn top_conceding(&self) -> Option<Bucket> {
        Self::top(|bucket| self.get(bucket).against)
    }

    /// Fraction of all goals scored that fell in `bucket`.
    pub fn scored_share(&self, bucket: Bucket) -> f64 {
        share(self.get(bucket).scored, self.total_scored())
    }

    /// Fraction of all goals conceded that fell in `bucket`.
    pub fn against_share(&self, bucket: Bucket) -> f64 {
        share(self.get(bucket).against, self.total_against())
    }

    fn top(mut count: impl FnMut(Bucket) -> u32) -> Option<Bucket> {
        let mut top = None;
        let mut top_count = 0;
        for bucket in Bucket::iter() {
            let count = count(bucket);
            if count > top_count {
                top_count = count;
                top = Some(bucket);
            }
        }
        top
    }
}

fn share(part: u32, total: u32) -> f64 {
    if total == 0 {
        0.0
    } else {
        part as f64 / total as f64
    }
}

/// Named statistics; missing entries read as zero.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StatBag(FxHashMap<String, f64>);
impl StatBag {
    pub fn get(&self, key: &str) -> f64 {
        self.0.get(key).copied().unwrap_or(0.0)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: f64) {
        self.0.insert(key.into(), value);
    }

    /// Overwrites entries with those of `other`.
    pub fn merge(&mut self, other: &StatBag) {
        for (key, &value) in &other.0 {
            self.0.insert(key.clone(), value);
        }
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>> FromIterator<(K, f64)> for StatBag {
    fn from_iter<T: IntoIterator<Item = (K, f64)>>(iter: T) -> Self {
        Self(iter.into_iter().map(|(key, value)| (key.into(), value)).collect())
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct SideStats {
    pub team: String,
    pub overall: StatBag,
    pub detailed: StatBag,
    pub timing: GoalsTiming,
}

#[derive(Clone, Debug, PartialEq)]
pub struct MatchStatSnapshot {
    pub home: SideStats,
    pub away: SideStats,
}
impl MatchStatSnapshot {
    pub fn side(&self, venue: Venue) -> &SideStats {
        match venue {
            Venue::Home => &self.home,
            Venue::Away => &self.away,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("missing team name for {0} side")]
    MissingTeam(Venue),
}

/// Reads a number, or a numeric string with an optional `%` suffix. Anything else is zero.
pub fn parse_number(value: &Value) -> f64 {
    match value {
        Value::Number(number) => number.as_f64().unwrap_or(0.0),
        Value::String(str) => str
            .trim()
            .trim_end_matches('%')
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|number| number.is_finite())
            .unwrap_or(0.0),
        _ => 0.0,
    }
}

fn parse_side(record: &FlatRecord, venue: Venue) -> Result<SideStats, ParseError> {
    let team = record
        .get(&format!("{venue}_name"))
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .ok_or(ParseError::MissingTeam(venue))?
        .to_string();

    let overall_prefix = format!("overall_{venue}_infos.stats.");
    let detailed_prefix = format!("{venue}_infos.stats.");
    let timing_prefix = format!("{venue}.goals_timing.");

    let mut side = SideStats {
        team,
        ..SideStats::default()
    };
    for (key, value) in record {
        if let Some(stat) = key.strip_prefix(&overall_prefix) {
            side.overall.insert(stat, parse_number(value));
        } else if let Some(stat) = key.strip_prefix(&detailed_prefix) {
            side.detailed.insert(stat, parse_number(value));
        } else if let Some(timing) = key.strip_prefix(&timing_prefix) {
            let Some((label, field)) = timing.split_once('.') else {
                continue;
            };
            let Some(bucket) = Bucket::from_label(label) else {
                continue;
            };
            let goals = parse_number(value).max(0.0).round() as u32;
            match field {
                "scored" => side.timing.get_mut(bucket).scored = goals,
                "against" => side.timing.get_mut(bucket).against = goals,
                _ => {}
            }
        }
    }
    Ok(side)
}

impl TryFrom<&FlatRecord> for MatchStatSnapshot {
    type Error = ParseError;

    fn try_from(record: &FlatRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            home: parse_side(record, Venue::Home)?,
            away: parse_side(record, Venue::Away)?,
        })
    }
}
