//! Ranks teams by their likelihood to score, from aggregated per-match statistics.
//!
//! Each team's stat bags are overwritten by every match it appears in, its goals-timing histogram is
//! summed, and a reference to the opponent as of that match is retained. The composite score blends
//! five sub-signals; estimated goals scale the composite by the team's own goal difference.

use std::cmp::Ordering;
use std::fmt::{Display, Formatter};

use anyhow::anyhow;
use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::error::ValidationError;
use crate::observation::Venue;
use crate::snapshot::{GoalsTiming, Half, MatchStatSnapshot, SideStats, StatBag};

const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;
const MIN_GOAL_FACTOR: f64 = 0.1;

#[derive(Debug, Clone, PartialEq)]
pub struct Weights {
    pub goals_percentage: f64,
    pub goals_scored: f64,
    pub opponent_weakness: f64,
    pub timing_alignment: f64,
    pub consistency: f64,
}
impl Weights {
    fn as_array(&self) -> [f64; 5] {
        [
            self.goals_percentage,
            self.goals_scored,
            self.opponent_weakness,
            self.timing_alignment,
            self.consistency,
        ]
    }
}

impl Default for Weights {
    fn default() -> Self {
        Self {
            goals_percentage: 0.25,
            goals_scored: 0.20,
            opponent_weakness: 0.15,
            timing_alignment: 0.20,
            consistency: 0.20,
        }
    }
}

/// How the opponent-derived signals are sourced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OpponentMode {
    /// Only the most recently processed opponent counts.
    #[default]
    MostRecent,
    /// Every opponent faced counts equally.
    Averaged,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub weights: Weights,
    /// Share of the overall bag in each blended stat; the detailed bag takes the rest.
    pub overall_blend: f64,
    pub over_goals_keys: [String; 3],
    pub goals_scored_keys: [String; 3],
    pub opponent_keys: [String; 3],
    pub opponent_mode: OpponentMode,
}
impl Config {
    pub fn validate(&self) -> Result<(), ValidationError> {
        let weights = self.weights.as_array();
        if weights.iter().any(|&weight| weight < 0.0 || !weight.is_finite()) {
            return Err(anyhow!("weights {:?} must be non-negative", self.weights).into());
        }
        let sum = weights.iter().sum::<f64>();
        if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(anyhow!("weights must sum to 1, got {sum}").into());
        }
        if !(0.0..=1.0).contains(&self.overall_blend) {
            return Err(anyhow!("overall blend ({}) outside of [0, 1]", self.overall_blend).into());
        }
        Ok(())
    }
}

fn keys(keys: [&str; 3]) -> [String; 3] {
    keys.map(String::from)
}

impl Default for Config {
    fn default() -> Self {
        Self {
            weights: Weights::default(),
            overall_blend: 0.6,
            over_goals_keys: keys(["over_1_5_percentage", "over_2_5_percentage", "over_3_5_percentage"]),
            goals_scored_keys: keys([
                "scored_over_0_5_percentage",
                "scored_over_1_5_percentage",
                "scored_over_2_5_percentage",
            ]),
            opponent_keys: keys([
                "conceded_over_0_5_percentage",
                "conceded_over_1_5_percentage",
                "conceded_over_2_5_percentage",
            ]),
            opponent_mode: OpponentMode::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScoringWindow {
    #[serde(rename = "1st half")]
    FirstHalf,
    #[serde(rename = "2nd half")]
    SecondHalf,
    #[serde(rename = "none")]
    None,
}
impl From<Option<Half>> for ScoringWindow {
    fn from(half: Option<Half>) -> Self {
        match half {
            Some(Half::First) => ScoringWindow::FirstHalf,
            Some(Half::Second) => ScoringWindow::SecondHalf,
            None => ScoringWindow::None,
        }
    }
}

impl Display for ScoringWindow {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ScoringWindow::FirstHalf => write!(f, "{}", Half::First),
            ScoringWindow::SecondHalf => write!(f, "{}", Half::Second),
            ScoringWindow::None => write!(f, "none"),
        }
    }
}

/// A team's bags and timing as they stood after a given match.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OpponentView {
    pub team: String,
    pub overall: StatBag,
    pub detailed: StatBag,
    pub timing: GoalsTiming,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SubScores {
    pub goals_percentage: f64,
    pub goals_scored: f64,
    pub opponent_weakness: f64,
    pub timing_alignment: f64,
    pub consistency: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TeamScoreProfile {
    pub team: String,
    pub matches: usize,
    pub overall: StatBag,
    pub detailed: StatBag,
    pub timing: GoalsTiming,
    pub opponent: Option<OpponentView>,
    pub opponents: Vec<OpponentView>,
    pub sub_scores: SubScores,
    pub composite_score: f64,
    pub estimated_goals: f64,
    pub scoring_window: ScoringWindow,
}
impl TeamScoreProfile {
    fn new(team: String) -> Self {
        Self {
            team,
            matches: 0,
            overall: StatBag::default(),
            detailed: StatBag::default(),
            timing: GoalsTiming::default(),
            opponent: None,
            opponents: vec![],
            sub_scores: SubScores::default(),
            composite_score: 0.0,
            estimated_goals: 0.0,
            scoring_window: ScoringWindow::None,
        }
    }

    fn absorb(&mut self, side: &SideStats) {
        self.matches += 1;
        self.overall.merge(&side.overall);
        self.detailed.merge(&side.detailed);
        self.timing.add(&side.timing);
    }

    fn view(&self) -> OpponentView {
        OpponentView {
            team: self.team.clone(),
            overall: self.overall.clone(),
            detailed: self.detailed.clone(),
            timing: self.timing.clone(),
        }
    }

    fn face(&mut self, opponent: OpponentView) {
        self.opponents.push(opponent.clone());
        self.opponent = Some(opponent);
    }

    /// `max(0.1, (scored − conceded + 1) / 10)` over the team's own timing totals.
    pub fn goal_factor(&self) -> f64 {
        let diff = self.timing.total_scored() as f64 - self.timing.total_against() as f64;
        f64::max(MIN_GOAL_FACTOR, (diff + 1.0) / 10.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamRanking {
    pub team: String,
    pub estimated_goals: f64,
    pub scoring_window: ScoringWindow,
}

impl From<&TeamScoreProfile> for TeamRanking {
    fn from(profile: &TeamScoreProfile) -> Self {
        Self {
            team: profile.team.clone(),
            estimated_goals: profile.estimated_goals,
            scoring_window: profile.scoring_window,
        }
    }
}

/// Rounds to the nearest 0.1 below 0.5, the nearest 0.5 below 1, and the nearest integer otherwise.
pub fn round_goals(goals: f64) -> f64 {
    if goals < 0.5 {
        (goals * 10.0).round() / 10.0
    } else if goals < 1.0 {
        (goals * 2.0).round() / 2.0
    } else {
        goals.round()
    }
}

/// `composite × 3 × goal_factor`, rounded.
pub fn estimate_goals(composite_score: f64, goal_factor: f64) -> f64 {
    round_goals(composite_score * 3.0 * goal_factor)
}

#[inline]
fn fraction(percentage: f64) -> f64 {
    f64::min(1.0, f64::max(0.0, percentage / 100.0))
}

#[derive(Debug, Default)]
pub struct Ranker {
    config: Config,
}
impl Ranker {
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Mean over `keys` of each stat blended across the overall and detailed bags.
    pub fn blend(&self, overall: &StatBag, detailed: &StatBag, keys: &[String]) -> f64 {
        if keys.is_empty() {
            return 0.0;
        }
        let blend = self.config.overall_blend;
        keys.iter()
            .map(|key| blend * fraction(overall.get(key)) + (1.0 - blend) * fraction(detailed.get(key)))
            .sum::<f64>()
            / keys.len() as f64
    }

    fn opponent_weakness(&self, opponent: &OpponentView) -> f64 {
        self.blend(&opponent.overall, &opponent.detailed, &self.config.opponent_keys)
    }

    fn timing_alignment(timing: &GoalsTiming, opponent: &OpponentView) -> f64 {
        match (timing.top_scoring(), opponent.timing.top_conceding()) {
            (Some(scoring), Some(conceding)) if scoring.half() == conceding.half() => {
                (timing.scored_share(scoring) + opponent.timing.against_share(conceding)) / 2.0
            }
            _ => 0.0,
        }
    }

    fn opponents<'a>(&self, profile: &'a TeamScoreProfile) -> Vec<&'a OpponentView> {
        match self.config.opponent_mode {
            OpponentMode::MostRecent => profile.opponent.iter().collect(),
            OpponentMode::Averaged => profile.opponents.iter().collect(),
        }
    }

    pub fn sub_scores(&self, profile: &TeamScoreProfile) -> SubScores {
        let goals_percentage = self.blend(&profile.overall, &profile.detailed, &self.config.over_goals_keys);
        let goals_scored = self.blend(&profile.overall, &profile.detailed, &self.config.goals_scored_keys);

        let opponents = self.opponents(profile);
        let (opponent_weakness, timing_alignment) = if opponents.is_empty() {
            (0.0, 0.0)
        } else {
            let count = opponents.len() as f64;
            (
                opponents.iter().map(|opponent| self.opponent_weakness(opponent)).sum::<f64>() / count,
                opponents
                    .iter()
                    .map(|opponent| Self::timing_alignment(&profile.timing, opponent))
                    .sum::<f64>()
                    / count,
            )
        };

        let signals = [goals_percentage, goals_scored, opponent_weakness];
        let mean = signals.iter().sum::<f64>() / signals.len() as f64;
        let variance = signals.iter().map(|signal| (signal - mean).powi(2)).sum::<f64>() / signals.len() as f64;
        SubScores {
            goals_percentage,
            goals_scored,
            opponent_weakness,
            timing_alignment,
            consistency: 1.0 - variance.sqrt(),
        }
    }

    pub fn composite(&self, sub_scores: &SubScores) -> f64 {
        let weights = &self.config.weights;
        weights.goals_percentage * sub_scores.goals_percentage
            + weights.goals_scored * sub_scores.goals_scored
            + weights.opponent_weakness * sub_scores.opponent_weakness
            + weights.timing_alignment * sub_scores.timing_alignment
            + weights.consistency * sub_scores.consistency
    }

    /// Aggregates and scores every recognised team, ordered by estimated goals (highest first).
    pub fn profile(&self, snapshots: &[MatchStatSnapshot], recognised: &FxHashSet<String>) -> Vec<TeamScoreProfile> {
        let mut profiles: FxHashMap<String, TeamScoreProfile> = FxHashMap::default();
        for snapshot in snapshots {
            let (home, away) = (&snapshot.home.team, &snapshot.away.team);
            if !recognised.contains(home) || !recognised.contains(away) {
                debug!("skipping {home} v {away}: unrecognised team");
                continue;
            }
            for venue in [Venue::Home, Venue::Away] {
                let side = snapshot.side(venue);
                profiles
                    .entry(side.team.clone())
                    .or_insert_with(|| TeamScoreProfile::new(side.team.clone()))
                    .absorb(side);
            }
            let home_view = profiles.get(home).map(TeamScoreProfile::view);
            let away_view = profiles.get(away).map(TeamScoreProfile::view);
            if let (Some(home_view), Some(away_view)) = (home_view, away_view) {
                if let Some(profile) = profiles.get_mut(home) {
                    profile.face(away_view);
                }
                if let Some(profile) = profiles.get_mut(away) {
                    profile.face(home_view);
                }
            }
        }

        let mut profiles = profiles.into_values().collect::<Vec<_>>();
        for profile in &mut profiles {
            profile.sub_scores = self.sub_scores(profile);
            profile.composite_score = self.composite(&profile.sub_scores);
            profile.estimated_goals = estimate_goals(profile.composite_score, profile.goal_factor());
            profile.scoring_window = profile.timing.top_scoring().map(|bucket| bucket.half()).into();
            trace!(
                "{}: {:?}, composite {:.3}, estimated goals {}",
                profile.team,
                profile.sub_scores,
                profile.composite_score,
                profile.estimated_goals
            );
        }
        profiles.sort_by(|a, b| {
            b.estimated_goals
                .partial_cmp(&a.estimated_goals)
                .unwrap_or(Ordering::Equal)
                .then_with(|| b.composite_score.partial_cmp(&a.composite_score).unwrap_or(Ordering::Equal))
                .then_with(|| a.team.cmp(&b.team))
        });
        debug!("profiled {} teams from {} matches", profiles.len(), snapshots.len());
        profiles
    }

    pub fn rank(&self, snapshots: &[MatchStatSnapshot], recognised: &FxHashSet<String>) -> Vec<TeamRanking> {
        self.profile(snapshots, recognised)
            .iter()
            .map(TeamRanking::from)
            .collect()
    }
}

impl TryFrom<Config> for Ranker {
    type Error = ValidationError;

    fn try_from(config: Config) -> Result<Self, Self::Error> {
        config.validate()?;
        Ok(Self { config })
    }
}

#[cfg(test)]
mod tests;
