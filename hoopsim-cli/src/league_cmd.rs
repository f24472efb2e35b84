//! League command - generate a synthetic league

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use hoopsim_core::League;
use rand_chacha::ChaCha8Rng;

#[derive(Args)]
pub struct LeagueArgs {
    /// Number of teams
    #[arg(long, default_value = "32")]
    pub teams: usize,

    /// Players per team (at least five to take the floor)
    #[arg(long, default_value = "12")]
    pub players: usize,

    /// Write the league to this JSON file
    #[arg(long, value_name = "FILE")]
    pub output: Option<PathBuf>,
}

pub fn run(args: LeagueArgs, rng: &mut ChaCha8Rng) -> Result<()> {
    let league = League::generate(rng, args.teams, args.players);
    tracing::info!(teams = league.teams.len(), players = args.players, "league generated");

    if let Some(path) = &args.output {
        league
            .save(path)
            .with_context(|| format!("Failed to write league: {}", path.display()))?;
        println!("Wrote {} teams to {}", league.teams.len(), path.display());
    } else {
        print_league(&league);
    }
    Ok(())
}

fn print_league(league: &League) {
    println!("\n=== {} ===", league.name);
    for team in &league.teams {
        let venue = league
            .venues
            .iter()
            .find(|v| v.id == team.venue)
            .map(|v| format!("{}, {}", v.name, v.city))
            .unwrap_or_default();
        println!(
            "  {:>5}  {:<28} {:>2} players  {}",
            team.id.0,
            team.name,
            team.roster.players.len(),
            venue
        );
    }
}
