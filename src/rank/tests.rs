use assert_float_eq::*;
use rustc_hash::FxHashSet;

use super::*;
use crate::snapshot::{Bucket, GoalsTiming, MatchStatSnapshot, SideStats, StatBag};

const EPSILON: f64 = 1e-9;

fn stat_bag(over: [f64; 3], scored: [f64; 3], conceded: [f64; 3]) -> StatBag {
    let config = Config::default();
    config
        .over_goals_keys
        .iter()
        .zip(over)
        .chain(config.goals_scored_keys.iter().zip(scored))
        .chain(config.opponent_keys.iter().zip(conceded))
        .map(|(key, value)| (key.clone(), value))
        .collect()
}

fn timing(entries: &[(Bucket, u32, u32)]) -> GoalsTiming {
    let mut timing = GoalsTiming::default();
    for &(bucket, scored, against) in entries {
        let goals = timing.get_mut(bucket);
        goals.scored = scored;
        goals.against = against;
    }
    timing
}

fn team_a_first() -> SideStats {
    SideStats {
        team: "A".into(),
        overall: stat_bag([80.0, 60.0, 40.0], [90.0, 70.0, 50.0], [60.0, 30.0, 10.0]),
        detailed: stat_bag([70.0, 50.0, 30.0], [80.0, 60.0, 40.0], [50.0, 20.0, 10.0]),
        timing: timing(&[(Bucket::UpTo15, 1, 0), (Bucket::UpTo45, 0, 1), (Bucket::UpTo90, 3, 0)]),
    }
}

fn team_b_first() -> SideStats {
    SideStats {
        team: "B".into(),
        overall: stat_bag([50.0, 40.0, 20.0], [40.0, 20.0, 10.0], [50.0, 30.0, 10.0]),
        detailed: stat_bag([40.0, 30.0, 10.0], [30.0, 10.0, 0.0], [40.0, 20.0, 0.0]),
        timing: timing(&[(Bucket::UpTo15, 0, 1), (Bucket::UpTo45, 1, 0), (Bucket::UpTo75, 0, 2)]),
    }
}

fn team_c_second() -> SideStats {
    SideStats {
        team: "C".into(),
        overall: stat_bag([90.0, 80.0, 70.0], [95.0, 85.0, 75.0], [80.0, 70.0, 60.0]),
        detailed: stat_bag([90.0, 80.0, 70.0], [95.0, 85.0, 75.0], [80.0, 70.0, 60.0]),
        timing: timing(&[(Bucket::UpTo30, 0, 3), (Bucket::UpTo60, 2, 1)]),
    }
}

fn team_a_second() -> SideStats {
    SideStats {
        team: "A".into(),
        overall: [("over_1_5_percentage", 100.0)].into_iter().collect(),
        detailed: StatBag::default(),
        timing: timing(&[(Bucket::UpTo30, 3, 0), (Bucket::UpTo60, 0, 2)]),
    }
}

fn recognised(teams: &[&str]) -> FxHashSet<String> {
    teams.iter().map(|&team| team.to_string()).collect()
}

fn two_matches() -> Vec<MatchStatSnapshot> {
    vec![
        MatchStatSnapshot {
            home: team_a_first(),
            away: team_b_first(),
        },
        MatchStatSnapshot {
            home: team_c_second(),
            away: team_a_second(),
        },
    ]
}

fn find<'a>(profiles: &'a [TeamScoreProfile], team: &str) -> &'a TeamScoreProfile {
    profiles.iter().find(|profile| profile.team == team).unwrap()
}

#[test]
fn single_match_sub_scores() {
    let ranker = Ranker::default();
    let snapshots = vec![MatchStatSnapshot {
        home: team_a_first(),
        away: team_b_first(),
    }];
    let profiles = ranker.profile(&snapshots, &recognised(&["A", "B"]));
    assert_eq!(2, profiles.len());

    let a = find(&profiles, "A");
    assert_float_relative_eq!(0.56, a.sub_scores.goals_percentage, EPSILON);
    assert_float_relative_eq!(0.66, a.sub_scores.goals_scored, EPSILON);
    assert_float_relative_eq!(0.26, a.sub_scores.opponent_weakness, EPSILON);
    assert_float_relative_eq!(0.7083333333333333, a.sub_scores.timing_alignment, EPSILON);
    assert_float_relative_eq!(0.8300326828802405, a.sub_scores.consistency, EPSILON);
    assert_float_relative_eq!(0.6186732032427148, a.composite_score, EPSILON);
    assert_float_relative_eq!(0.4, a.goal_factor(), EPSILON);
    assert_eq!(0.5, a.estimated_goals);
    assert_eq!(ScoringWindow::SecondHalf, a.scoring_window);

    let b = find(&profiles, "B");
    assert_float_relative_eq!(1.0, b.sub_scores.timing_alignment, EPSILON);
    assert_float_relative_eq!(0.5545912490545575, b.composite_score, EPSILON);
    assert_float_relative_eq!(0.1, b.goal_factor(), EPSILON);
    assert_eq!(0.2, b.estimated_goals);
    assert_eq!(ScoringWindow::FirstHalf, b.scoring_window);

    assert_eq!(vec!["A", "B"], profiles.iter().map(|profile| profile.team.as_str()).collect::<Vec<_>>());
}

#[test]
fn last_write_wins_and_most_recent_opponent() {
    let ranker = Ranker::default();
    let profiles = ranker.profile(&two_matches(), &recognised(&["A", "B", "C"]));

    let a = find(&profiles, "A");
    assert_eq!(2, a.matches);
    assert_eq!(100.0, a.overall.get("over_1_5_percentage"));
    assert_eq!(60.0, a.overall.get("over_2_5_percentage"));
    assert_eq!(7, a.timing.total_scored());
    assert_eq!(3, a.timing.total_against());
    assert_eq!("C", a.opponent.as_ref().unwrap().team);
    assert_eq!(2, a.opponents.len());
    assert_float_relative_eq!(0.6, a.sub_scores.goals_percentage, EPSILON);
    assert_float_relative_eq!(0.7, a.sub_scores.opponent_weakness, EPSILON);
    assert_float_relative_eq!(0.5892857142857143, a.sub_scores.timing_alignment, EPSILON);
    assert_float_relative_eq!(0.6966379241865176, a.composite_score, EPSILON);
    assert_eq!(1.0, a.estimated_goals);
    assert_eq!(ScoringWindow::FirstHalf, a.scoring_window);

    let c = find(&profiles, "C");
    assert_float_relative_eq!(0.7336275036826512, c.composite_score, EPSILON);
    assert_eq!(ScoringWindow::SecondHalf, c.scoring_window);

    let rankings = ranker.rank(&two_matches(), &recognised(&["A", "B", "C"]));
    assert_eq!(
        vec![
            TeamRanking {
                team: "A".into(),
                estimated_goals: 1.0,
                scoring_window: ScoringWindow::FirstHalf
            },
            TeamRanking {
                team: "C".into(),
                estimated_goals: 0.2,
                scoring_window: ScoringWindow::SecondHalf
            },
            TeamRanking {
                team: "B".into(),
                estimated_goals: 0.2,
                scoring_window: ScoringWindow::FirstHalf
            },
        ],
        rankings
    );
}

#[test]
fn averaged_opponents() {
    let ranker = Ranker::try_from(Config {
        opponent_mode: OpponentMode::Averaged,
        ..Config::default()
    })
    .unwrap();
    let profiles = ranker.profile(&two_matches(), &recognised(&["A", "B", "C"]));
    let a = find(&profiles, "A");
    assert_float_relative_eq!(0.48, a.sub_scores.opponent_weakness, EPSILON);
    assert_float_relative_eq!(0.29464285714285715, a.sub_scores.timing_alignment, EPSILON);
    assert_float_relative_eq!(0.5979619418814757, a.composite_score, EPSILON);
}

#[test]
fn skips_unrecognised_matches() {
    let ranker = Ranker::default();
    let profiles = ranker.profile(&two_matches(), &recognised(&["A", "B"]));
    assert_eq!(2, profiles.len());
    let a = find(&profiles, "A");
    assert_eq!(1, a.matches);
    assert_eq!("B", a.opponent.as_ref().unwrap().team);

    assert!(ranker.rank(&two_matches(), &recognised(&[])).is_empty());
}

#[test]
fn no_timing_data() {
    let ranker = Ranker::default();
    let snapshots = vec![MatchStatSnapshot {
        home: SideStats {
            team: "X".into(),
            ..SideStats::default()
        },
        away: SideStats {
            team: "Y".into(),
            ..SideStats::default()
        },
    }];
    let profiles = ranker.profile(&snapshots, &recognised(&["X", "Y"]));
    for profile in &profiles {
        assert_eq!(ScoringWindow::None, profile.scoring_window);
        assert_eq!(0.0, profile.sub_scores.timing_alignment);
        assert_float_relative_eq!(1.0, profile.sub_scores.consistency, EPSILON);
        assert_float_relative_eq!(0.2, profile.composite_score, EPSILON);
        assert_float_relative_eq!(0.1, profile.goal_factor(), EPSILON);
        assert_eq!(0.1, profile.estimated_goals);
    }
}

#[test]
fn rounding() {
    assert_eq!(0.0, round_goals(0.04));
    assert_eq!(0.4, round_goals(0.44));
    assert_eq!(0.5, round_goals(0.6));
    assert_eq!(1.0, round_goals(0.8));
    assert_eq!(1.0, round_goals(1.4));
    assert_eq!(2.0, round_goals(1.5));
    assert_eq!(3.0, round_goals(3.2));
}

#[test]
fn estimated_goals_monotonic_in_composite() {
    for &goal_factor in &[0.1, 0.4, 1.0, 2.3] {
        let mut prev = 0.0;
        for step in 0..=1000 {
            let composite = step as f64 / 1000.0;
            let goals = estimate_goals(composite, goal_factor);
            assert!(goals >= prev, "{goals} < {prev} at composite {composite}, goal factor {goal_factor}");
            prev = goals;
        }
    }
}

#[test]
fn scoring_window_labels() {
    assert_eq!("1st half", ScoringWindow::FirstHalf.to_string());
    assert_eq!("2nd half", ScoringWindow::SecondHalf.to_string());
    assert_eq!("none", ScoringWindow::None.to_string());
    assert_eq!(r#""2nd half""#, serde_json::to_string(&ScoringWindow::SecondHalf).unwrap());
}

#[test]
fn config_validation() {
    assert!(Ranker::try_from(Config::default()).is_ok());
    assert_eq!(
        "weights must sum to 1, got 1.1",
        Ranker::try_from(Config {
            weights: Weights {
                consistency: 0.3,
                ..Weights::default()
            },
            ..Config::default()
        })
        .unwrap_err()
        .to_string()
    );
    assert!(Ranker::try_from(Config {
        weights: Weights {
            goals_percentage: -0.25,
            consistency: 0.7,
            ..Weights::default()
        },
        ..Config::default()
    })
    .is_err());
    assert!(Ranker::try_from(Config {
        overall_blend: 1.5,
        ..Config::default()
    })
    .is_err());
}
