use stanza::style::HAlign::Left;
use stanza::style::{HAlign, Header, MinWidth, Styles};
use stanza::table::{Col, Row, Table};

use crate::negbinom::ProbabilityResult;
use crate::rank::TeamRanking;
use crate::squad::{SquadAssignment, SquadOutcome};

pub fn tabulate_probability(result: &ProbabilityResult) -> Table {
    let mut table = Table::default().with_cols(vec![
        Col::new(Styles::default().with(MinWidth(12)).with(Left)),
        Col::new(Styles::default().with(MinWidth(10)).with(HAlign::Right)),
    ]);
    for (label, value) in [
        ("Probability", format!("{:.6}", result.probability)),
        ("Odds", format!("{:.2}", result.decimal_odds)),
        ("Mean", format!("{:.3}", result.mean)),
        ("Variance", format!("{:.3}", result.variance)),
        ("Dispersion", format!("{:.3}", result.dispersion_k)),
    ] {
        table.push_row(Row::new(Styles::default(), vec![label.into(), value.into()]));
    }
    table
}

pub fn tabulate_rankings(rankings: &[TeamRanking]) -> Table {
    let mut table = Table::default()
        .with_cols(vec![
            Col::new(Styles::default().with(MinWidth(4)).with(HAlign::Right)),
            Col::new(Styles::default().with(MinWidth(20)).with(Left)),
            Col::new(Styles::default().with(MinWidth(6)).with(HAlign::Right)),
            Col::new(Styles::default().with(MinWidth(10)).with(Left)),
        ])
        .with_row(Row::new(
            Styles::default().with(Header(true)),
            vec!["Rank".into(), "Team".into(), "Goals".into(), "Window".into()],
        ));
    for (index, ranking) in rankings.iter().enumerate() {
        table.push_row(Row::new(
            Styles::default(),
            vec![
                format!("{}", index + 1).into(),
                ranking.team.clone().into(),
                format!("{:.1}", ranking.estimated_goals).into(),
                ranking.scoring_window.to_string().into(),
            ],
        ));
    }
    table
}

pub fn tabulate_squad(outcome: &SquadOutcome) -> Table {
    let mut table = Table::default()
        .with_cols(vec![
            Col::new(Styles::default().with(MinWidth(8)).with(Left)),
            Col::new(Styles::default().with(MinWidth(6)).with(Left)),
            Col::new(Styles::default().with(MinWidth(20)).with(Left)),
            Col::new(Styles::default().with(MinWidth(8)).with(Left)),
        ])
        .with_row(Row::new(
            Styles::default().with(Header(true)),
            vec!["Role".into(), "Slot".into(), "Player".into(), "Club".into()],
        ));
    push_assignment(&mut table, "starter", &outcome.starters);
    push_assignment(&mut table, "bench", &outcome.bench);
    for (role, slot) in &outcome.unfilled {
        table.push_row(Row::new(
            Styles::default(),
            vec![
                role.to_string().into(),
                slot.to_string().into(),
                "(unfilled)".into(),
                "".into(),
            ],
        ));
    }
    table
}

fn push_assignment(table: &mut Table, role: &str, assignment: &SquadAssignment) {
    for (slot, candidate) in assignment.iter() {
        table.push_row(Row::new(
            Styles::default(),
            vec![
                role.into(),
                slot.to_string().into(),
                candidate.name.clone().into(),
                candidate.club.clone().into(),
            ],
        ));
    }
}
