use std::env;
use std::error::Error;
use std::path::PathBuf;

use anyhow::bail;
use clap::{Parser, Subcommand};
use stanza::renderer::console::Console;
use stanza::renderer::Renderer;
use tinyrand::{Seeded, StdRand};
use tracing::{debug, info};

use tipster::file::read_json;
use tipster::names::TeamNames;
use tipster::observation::{from_feed, FeedObservation, Venue};
use tipster::print;
use tipster::prop::{target_for_line, Direction, Estimator, PropRequest};
use tipster::rank::Ranker;
use tipster::snapshot::{FlatRecord, MatchStatSnapshot};
use tipster::squad::{Composer, Formation, PlayerCandidate, Request, Strategy};

#[derive(Debug, clap::Parser, Clone)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand, Clone)]
enum Command {
    /// Prices a player prop from a history of per-match counts.
    Prop {
        /// JSON array of `{"count", "isHome", "minutesPlayed"}` observations, oldest first.
        #[clap(short = 'f', long)]
        file: PathBuf,

        #[clap(short = 't', long)]
        target: Option<u32>,

        /// Half-point line, e.g. 2.5.
        #[clap(short = 'l', long)]
        line: Option<f64>,

        #[clap(long, default_value = "home")]
        venue: Venue,

        #[clap(long)]
        under: bool,

        #[clap(long)]
        normalise: bool,
    },

    /// Ranks teams by estimated goals from flat match statistics records.
    Rank {
        #[clap(short = 'f', long)]
        file: PathBuf,

        /// JSON object mapping feed names to display names.
        #[clap(short = 't', long)]
        teams: PathBuf,
    },

    /// Composes a starting eleven and bench from a player pool.
    Squad {
        #[clap(short = 'f', long)]
        file: PathBuf,

        #[clap(long, default_value = "4-3-3")]
        formation: Formation,

        #[clap(long, default_value = "balanced")]
        strategy: Strategy,

        /// Comma-separated club codes, in order of preference.
        #[clap(long, value_delimiter = ',')]
        clubs: Vec<String>,

        #[clap(long, default_value_t = 0)]
        seed: u64,

        #[clap(long = "bench-strategy")]
        bench_strategy: bool,

        #[clap(long = "pair-defense")]
        pair_defense: bool,
    },
}
impl Command {
    fn validate(&self) -> anyhow::Result<()> {
        match self {
            Command::Prop { target, line, .. } => {
                if target.is_none() == line.is_none() {
                    bail!("exactly one of --target or --line must be specified");
                }
            }
            Command::Squad { clubs, .. } => {
                if clubs.is_empty() {
                    bail!("at least one club must be specified");
                }
            }
            Command::Rank { .. } => {}
        }
        Ok(())
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    if env::var("RUST_LOG").is_err() {
        env::set_var("RUST_LOG", "info")
    }
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    args.command.validate()?;
    debug!("args: {args:?}");

    match args.command {
        Command::Prop {
            file,
            target,
            line,
            venue,
            under,
            normalise,
        } => {
            let feed: Vec<FeedObservation> = read_json(file)?;
            let observations = from_feed(&feed);
            let target = match (target, line) {
                (Some(target), _) => target,
                (None, Some(line)) => target_for_line(line),
                (None, None) => unreachable!(),
            };
            let request = PropRequest {
                next_venue: venue,
                target,
                direction: if under {
                    Direction::Under
                } else {
                    Direction::AtLeast
                },
                normalise_by_minutes: normalise,
            };
            let result = Estimator::default().estimate(&observations, &request)?;
            info!(
                "{} {target} at {venue} from {} observations",
                request.direction,
                observations.len()
            );
            println!("{}", Console::default().render(&print::tabulate_probability(&result)));
        }
        Command::Rank { file, teams } => {
            let names = TeamNames::from_json(&std::fs::read_to_string(teams)?)?;
            let records: Vec<FlatRecord> = read_json(file)?;
            let mut snapshots = records
                .iter()
                .map(MatchStatSnapshot::try_from)
                .collect::<Result<Vec<_>, _>>()?;
            for snapshot in &mut snapshots {
                names.normalise_snapshot(snapshot);
            }
            let rankings = Ranker::default().rank(&snapshots, &names.recognised());
            info!("ranked {} teams from {} matches", rankings.len(), snapshots.len());
            println!("{}", Console::default().render(&print::tabulate_rankings(&rankings)));
        }
        Command::Squad {
            file,
            formation,
            strategy,
            clubs,
            seed,
            bench_strategy,
            pair_defense,
        } => {
            let pool: Vec<PlayerCandidate> = read_json(file)?;
            let request = Request {
                formation: &formation,
                clubs: &clubs,
                strategy,
                use_bench_strategy: bench_strategy,
                pair_defense_same_club: pair_defense,
            };
            let mut rand = StdRand::seed(seed);
            let outcome = Composer::default().compose(&pool, &request, &mut rand);
            if outcome.is_complete() {
                info!("composed {} squad from {} candidates", formation.code, pool.len());
            } else {
                info!("{} slots could not be filled", outcome.unfilled.len());
            }
            println!("{}", Console::default().render(&print::tabulate_squad(&outcome)));
        }
    }
    Ok(())
}
