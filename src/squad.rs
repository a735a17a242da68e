//! Constraint-satisfying squad composition from a scored candidate pool.
//!
//! Candidates are scored by a strategy, ranked per position, and the required number is sampled
//! uniformly from the top of each ranking. Starters and bench are filled under two invariants: no
//! candidate occupies more than one slot, and no position exceeds its limit. Slots that cannot be
//! filled are left empty and reported in [SquadOutcome::unfilled].

use std::collections::BTreeMap;
use std::fmt::Formatter;
use std::str::FromStr;

use anyhow::anyhow;
use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};
use strum::{EnumCount, IntoEnumIterator};
use strum_macros::{Display, EnumCount as EnumCountMacro, EnumIter, EnumString};
use thiserror::Error;
use tinyrand::Rand;
use tracing::{debug, trace};

use crate::error::ValidationError;
use crate::sample;

#[derive(
    Clone, Copy, Debug, Hash, PartialEq, Eq, PartialOrd, Ord, Display, EnumIter, EnumCountMacro, Serialize, Deserialize,
)]
pub enum Position {
    #[strum(serialize = "GK")]
    #[serde(rename = "GK", alias = "goalkeeper")]
    Goalkeeper,
    #[strum(serialize = "CB")]
    #[serde(rename = "CB", alias = "centre-back", alias = "center-back")]
    CentreBack,
    #[strum(serialize = "FB")]
    #[serde(rename = "FB", alias = "fullback", alias = "full-back")]
    Fullback,
    #[strum(serialize = "MID")]
    #[serde(rename = "MID", alias = "midfielder")]
    Midfielder,
    #[strum(serialize = "FWD")]
    #[serde(rename = "FWD", alias = "forward")]
    Forward,
}
impl Position {
    pub fn is_defensive(&self) -> bool {
        matches!(self, Position::Goalkeeper | Position::CentreBack | Position::Fullback)
    }

    #[inline]
    fn index(&self) -> usize {
        *self as usize
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PositionLimits {
    counts: [usize; Position::COUNT],
}
impl PositionLimits {
    pub fn new(goalkeepers: usize, centre_backs: usize, fullbacks: usize, midfielders: usize, forwards: usize) -> Self {
        Self {
            counts: [goalkeepers, centre_backs, fullbacks, midfielders, forwards],
        }
    }

    pub fn get(&self, position: Position) -> usize {
        self.counts[position.index()]
    }

    pub fn total(&self) -> usize {
        self.counts.iter().sum()
    }
}

pub type BenchLimits = PositionLimits;

impl BenchLimits {
    /// One slot per position.
    pub fn one_each() -> Self {
        Self::new(1, 1, 1, 1, 1)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FormationError {
    #[error("malformed formation code '{0}'")]
    Malformed(String),

    #[error("unsupported back line of {0} in formation '{1}'")]
    UnsupportedBackLine(usize, String),

    #[error("formation '{1}' has {0} outfield players, expected 10")]
    WrongOutfieldCount(usize, String),
}

/// A formation code such as `4-3-3` or `4-2-3-1`. The first line is the defence, the last is the
/// attack, and everything between is midfield. A goalkeeper is implied.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Formation {
    pub code: String,
    pub limits: PositionLimits,
}

impl FromStr for Formation {
    type Err = FormationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        const OUTFIELD_PLAYERS: usize = 10;
        let code = s.trim().to_string();
        let lines = code
            .split('-')
            .map(|line| line.trim().parse::<usize>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|_| FormationError::Malformed(code.clone()))?;
        if lines.len() < 3 || lines.iter().any(|&line| line == 0) {
            return Err(FormationError::Malformed(code));
        }

        let outfield = lines.iter().sum::<usize>();
        if outfield != OUTFIELD_PLAYERS {
            return Err(FormationError::WrongOutfieldCount(outfield, code));
        }

        let (centre_backs, fullbacks) = match lines[0] {
            3 => (3, 0),
            4 => (2, 2),
            5 => (3, 2),
            other => return Err(FormationError::UnsupportedBackLine(other, code)),
        };
        let forwards = lines[lines.len() - 1];
        let midfielders = lines[1..lines.len() - 1].iter().sum();
        Ok(Self {
            limits: PositionLimits::new(1, centre_backs, fullbacks, midfielders, forwards),
            code,
        })
    }
}

#[derive(Clone, Copy, Debug, Default, Hash, PartialEq, Eq, Display, EnumIter, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    Defensive,
    #[default]
    Balanced,
    Offensive,
}
impl Strategy {
    pub fn score(&self, candidate: &PlayerCandidate) -> f64 {
        match self {
            Strategy::Defensive => {
                2.0 * candidate.stat("tackles")
                    + 2.0 * candidate.stat("interceptions")
                    + 3.0 * candidate.stat("clean_sheet_rate")
                    + 2.0 * candidate.stat("saves")
            }
            Strategy::Offensive => {
                2.0 * candidate.stat("shots_per_game")
                    + 4.0 * candidate.stat("goals")
                    + 1.5 * candidate.stat("shots_on_target")
                    + candidate.stat("shots_off_target")
            }
            Strategy::Balanced => {
                let values = candidate.stats.values().filter(|value| value.is_finite()).collect::<Vec<_>>();
                if values.is_empty() {
                    0.0
                } else {
                    values.iter().copied().sum::<f64>() / values.len() as f64
                }
            }
        }
    }
}

#[derive(Clone, Copy, Debug, Default, Hash, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Availability {
    /// Expected to play.
    #[default]
    #[serde(alias = "available", alias = "fit")]
    Likely,
    /// Doubtful; may or may not feature.
    #[serde(alias = "doubtful")]
    Uncertain,
    /// Injured or suspended; never selected.
    #[serde(alias = "injured", alias = "suspended")]
    Unavailable,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlayerCandidate {
    pub id: u32,
    #[serde(default)]
    pub name: String,
    pub position: Position,
    pub club: String,
    #[serde(default)]
    pub stats: FxHashMap<String, f64>,
    #[serde(default)]
    pub availability: Availability,
}
impl PlayerCandidate {
    pub fn stat(&self, key: &str) -> f64 {
        self.stats.get(key).copied().filter(|value| value.is_finite()).unwrap_or(0.0)
    }
}

#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SlotKey {
    pub position: Position,
    /// One-based.
    pub number: usize,
}
impl SlotKey {
    pub fn new(position: Position, number: usize) -> Self {
        Self { position, number }
    }
}

impl std::fmt::Display for SlotKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}", self.position, self.number)
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct SquadAssignment {
    slots: BTreeMap<SlotKey, PlayerCandidate>,
}
impl SquadAssignment {
    pub fn get(&self, slot: &SlotKey) -> Option<&PlayerCandidate> {
        self.slots.get(slot)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&SlotKey, &PlayerCandidate)> {
        self.slots.iter()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn count(&self, position: Position) -> usize {
        self.slots.keys().filter(|slot| slot.position == position).count()
    }

    pub fn contains(&self, id: u32) -> bool {
        self.slots.values().any(|candidate| candidate.id == id)
    }

    /// Places `candidate` in the next free slot for its position.
    fn push(&mut self, candidate: PlayerCandidate) -> SlotKey {
        let slot = SlotKey::new(candidate.position, self.count(candidate.position) + 1);
        self.slots.insert(slot, candidate);
        slot
    }
}

#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, PartialOrd, Ord, Display)]
pub enum Role {
    #[strum(serialize = "starter")]
    Starter,
    #[strum(serialize = "bench")]
    Bench,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct SquadOutcome {
    pub starters: SquadAssignment,
    pub bench: SquadAssignment,
    pub unfilled: Vec<(Role, SlotKey)>,
}
impl SquadOutcome {
    pub fn is_complete(&self) -> bool {
        self.unfilled.is_empty()
    }

    fn assignment_mut(&mut self, role: Role) -> &mut SquadAssignment {
        match role {
            Role::Starter => &mut self.starters,
            Role::Bench => &mut self.bench,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Request<'a> {
    pub formation: &'a Formation,
    /// Eligible clubs, in the order they are considered for defensive pairing.
    pub clubs: &'a [String],
    pub strategy: Strategy,
    pub use_bench_strategy: bool,
    pub pair_defense_same_club: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// How many of the best-ranked candidates each draw is made from.
    pub pool_size: usize,
    pub bench: BenchLimits,
}
impl Config {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.pool_size == 0 {
            return Err(anyhow!("pool size must be at least 1").into());
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            pool_size: 5,
            bench: BenchLimits::one_each(),
        }
    }
}

struct Scored<'a> {
    candidate: &'a PlayerCandidate,
    score: f64,
}

struct Selection<'a, 'r> {
    pool: &'a [PlayerCandidate],
    request: &'r Request<'r>,
    clubs: FxHashSet<&'r str>,
    taken: FxHashSet<u32>,
    outcome: SquadOutcome,
}
impl<'a, 'r> Selection<'a, 'r> {
    /// Untaken candidates for `position` from whitelisted clubs that also satisfy `predicate`.
    fn eligible(
        &self,
        position: Position,
        mut predicate: impl FnMut(&PlayerCandidate) -> bool,
    ) -> Vec<&'a PlayerCandidate> {
        self.pool
            .iter()
            .filter(|candidate| {
                candidate.position == position
                    && candidate.availability != Availability::Unavailable
                    && self.clubs.contains(candidate.club.as_str())
                    && !self.taken.contains(&candidate.id)
                    && predicate(candidate)
            })
            .collect()
    }

    /// Candidates ranked by score, highest first; ties go to the lower id. An id listed more than
    /// once keeps only its best-ranked entry.
    fn ranked(&self, candidates: Vec<&'a PlayerCandidate>) -> Vec<Scored<'a>> {
        let mut scored = candidates
            .into_iter()
            .map(|candidate| Scored {
                candidate,
                score: self.request.strategy.score(candidate),
            })
            .collect::<Vec<_>>();
        scored.sort_by(|a, b| b.score.total_cmp(&a.score).then_with(|| a.candidate.id.cmp(&b.candidate.id)));
        let mut seen = FxHashSet::default();
        scored.retain(|entry| seen.insert(entry.candidate.id));
        scored
    }

    fn place(&mut self, role: Role, candidate: &PlayerCandidate) {
        self.taken.insert(candidate.id);
        let slot = self.outcome.assignment_mut(role).push(candidate.clone());
        trace!("{role} {slot}: {} ({}, {})", candidate.id, candidate.name, candidate.club);
    }

    fn remaining(&self, role: Role, position: Position, limits: &PositionLimits) -> usize {
        let filled = match role {
            Role::Starter => self.outcome.starters.count(position),
            Role::Bench => self.outcome.bench.count(position),
        };
        limits.get(position).saturating_sub(filled)
    }
}

#[derive(Debug, Default)]
pub struct Composer {
    config: Config,
}
impl Composer {
    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn compose(&self, pool: &[PlayerCandidate], request: &Request, rand: &mut impl Rand) -> SquadOutcome {
        let mut selection = Selection {
            pool,
            request,
            clubs: request.clubs.iter().map(String::as_str).collect(),
            taken: FxHashSet::default(),
            outcome: SquadOutcome::default(),
        };
        let starters = &request.formation.limits;
        let bench = &self.config.bench;

        if request.pair_defense_same_club {
            self.pair_defense(&mut selection, starters);
        }
        if request.use_bench_strategy {
            for position in Position::iter() {
                self.fill_by_availability(&mut selection, Role::Starter, position, starters, Availability::Uncertain, rand);
            }
        }
        for position in Position::iter() {
            self.fill(&mut selection, Role::Starter, position, starters, rand);
        }
        if request.use_bench_strategy {
            for position in Position::iter() {
                self.fill_by_availability(&mut selection, Role::Bench, position, bench, Availability::Likely, rand);
            }
        }
        for position in Position::iter() {
            self.fill(&mut selection, Role::Bench, position, bench, rand);
        }

        let mut outcome = selection.outcome;
        for (role, limits) in [(Role::Starter, starters), (Role::Bench, bench)] {
            for position in Position::iter() {
                let filled = match role {
                    Role::Starter => outcome.starters.count(position),
                    Role::Bench => outcome.bench.count(position),
                };
                for number in filled + 1..=limits.get(position) {
                    outcome.unfilled.push((role, SlotKey::new(position, number)));
                }
            }
        }
        if !outcome.is_complete() {
            debug!(
                "{} slot(s) left unfilled: {}",
                outcome.unfilled.len(),
                outcome
                    .unfilled
                    .iter()
                    .map(|(role, slot)| format!("{role} {slot}"))
                    .collect::<Vec<_>>()
                    .join(", ")
            );
        }
        outcome
    }

    /// Fills every defensive starting slot from one club, if some whitelisted club can cover all of
    /// them at once. Returns the club used.
    fn pair_defense<'a>(&self, selection: &mut Selection<'a, '_>, limits: &PositionLimits) -> Option<String> {
        let defensive = Position::iter()
            .filter(|position| position.is_defensive() && limits.get(*position) > 0)
            .collect::<Vec<_>>();
        let request = selection.request;
        let club = request.clubs.iter().find(|club| {
            defensive.iter().all(|&position| {
                selection
                    .ranked(selection.eligible(position, |candidate| &candidate.club == *club))
                    .len()
                    >= limits.get(position)
            })
        });
        let Some(club) = club else {
            debug!("no club covers every defensive position; filling defence by position");
            return None;
        };
        debug!("pairing defence from {club}");

        for &position in &defensive {
            let ranked = selection.ranked(selection.eligible(position, |candidate| &candidate.club == club));
            let picks = ranked
                .iter()
                .take(limits.get(position))
                .map(|scored| scored.candidate)
                .collect::<Vec<_>>();
            for candidate in picks {
                selection.place(Role::Starter, candidate);
            }
        }
        Some(club.clone())
    }

    /// Fills one slot for `position` preferring candidates of the given availability, falling back
    /// to any eligible candidate.
    fn fill_by_availability(
        &self,
        selection: &mut Selection,
        role: Role,
        position: Position,
        limits: &PositionLimits,
        preferred: Availability,
        rand: &mut impl Rand,
    ) {
        if selection.remaining(role, position, limits) == 0 {
            return;
        }
        let mut ranked = selection.ranked(selection.eligible(position, |candidate| candidate.availability == preferred));
        if ranked.is_empty() {
            trace!("no {preferred:?} {position} for {role}; using the whole pool");
            ranked = selection.ranked(selection.eligible(position, |_| true));
        }
        self.draw(selection, role, ranked, 1, rand);
    }

    fn fill(
        &self,
        selection: &mut Selection,
        role: Role,
        position: Position,
        limits: &PositionLimits,
        rand: &mut impl Rand,
    ) {
        let required = selection.remaining(role, position, limits);
        if required == 0 {
            return;
        }
        let ranked = selection.ranked(selection.eligible(position, |_| true));
        self.draw(selection, role, ranked, required, rand);
    }

    /// Samples `required` candidates uniformly from the top of `ranked`. The top is at least
    /// `required` deep so a thin pool is never artificially short.
    fn draw<'a>(
        &self,
        selection: &mut Selection<'a, '_>,
        role: Role,
        ranked: Vec<Scored<'a>>,
        required: usize,
        rand: &mut impl Rand,
    ) {
        let top = usize::min(ranked.len(), usize::max(self.config.pool_size, required));
        let picks = sample::choose(&ranked[..top], required, rand)
            .into_iter()
            .map(|scored| scored.candidate)
            .collect::<Vec<_>>();
        for candidate in picks {
            selection.place(role, candidate);
        }
    }
}

impl TryFrom<Config> for Composer {
    type Error = ValidationError;

    fn try_from(config: Config) -> Result<Self, Self::Error> {
        config.validate()?;
        Ok(Self { config })
    }
}
