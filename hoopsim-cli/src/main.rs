//! HOOPSIM CLI - Command-line interface
//!
//! Commands:
//! - league: Generate a synthetic league file
//! - game: Simulate one game and print its box score
//! - season: Run a whole season layout

mod game_cmd;
mod league_cmd;
mod season_cmd;

use clap::{Parser, Subcommand};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "hoopsim")]
#[command(about = "HOOPSIM basketball tournament simulator")]
struct Cli {
    /// Seed for reproducible runs
    #[arg(long, global = true)]
    seed: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a synthetic league
    League(league_cmd::LeagueArgs),
    /// Simulate a single game
    Game(game_cmd::GameArgs),
    /// Run a season
    Season(season_cmd::SeasonArgs),
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut rng = create_rng(cli.seed);

    match cli.command {
        Commands::League(args) => league_cmd::run(args, &mut rng),
        Commands::Game(args) => game_cmd::run(args, &mut rng),
        Commands::Season(args) => season_cmd::run(args, &mut rng),
    }
}

/// Create RNG from seed or random
fn create_rng(seed: Option<u64>) -> ChaCha8Rng {
    match seed {
        Some(s) => ChaCha8Rng::seed_from_u64(s),
        None => ChaCha8Rng::from_entropy(),
    }
}
