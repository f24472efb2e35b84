//! Game command - simulate one game and print the box score
//!
//! ## Architecture (4-layer granularity)
//!
//! - Level 1: run() - orchestration
//! - Level 2: load_league(), pick_teams(), report_game()
//! - Level 3: team_lines()
//! - Level 4: formatting utilities

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Args;
use rand_chacha::ChaCha8Rng;
use serde::Serialize;

use hoopsim_core::{
    simulate_match, BoxScore, League, MatchFixture, MatchId, PersonId, PlayerLine, Roster,
    RosterProvider, SimulatedMatch, TeamId,
};
use hoopsim_tournament::{SeasonConfig, DEFAULT_FIRST_MATCH_ID};

// ============================================================================
// COMMAND ARGUMENTS (Level 4 - Configuration)
// ============================================================================

#[derive(Args)]
pub struct GameArgs {
    /// League JSON file (a two-team league is generated when omitted)
    #[arg(long, value_name = "FILE")]
    pub league: Option<PathBuf>,

    /// Home team id (defaults to the league's first team)
    #[arg(long)]
    pub home: Option<u32>,

    /// Away team id (defaults to the league's second team)
    #[arg(long)]
    pub away: Option<u32>,

    /// Print every event
    #[arg(long)]
    pub events: bool,

    /// Output the box score as JSON
    #[arg(long)]
    pub json: bool,
}

// ============================================================================
// LEVEL 1 - ORCHESTRATION
// ============================================================================

pub fn run(args: GameArgs, rng: &mut ChaCha8Rng) -> Result<()> {
    let league = load_league(&args, rng)?;
    let (home, away) = pick_teams(&league, &args)?;
    let home_roster = roster(&league, home)?;
    let away_roster = roster(&league, away)?;

    let config = SeasonConfig::default();
    let venue = league
        .venue_of(home)
        .with_context(|| format!("Team {} has no venue", home))?;
    let fixture = MatchFixture::new(
        MatchId(DEFAULT_FIRST_MATCH_ID),
        home,
        away,
        config.start.and_time(config.tip_off),
        1,
        1,
        venue,
    );

    tracing::info!(
        "Tip-off: {} vs {}",
        league.team_name(home),
        league.team_name(away)
    );
    let sim = simulate_match(&fixture, &home_roster, &away_roster, &config.rules, rng)
        .context("Simulation failed")?;

    report_game(&league, &fixture, &sim, &home_roster, &away_roster, &args)
}

// ============================================================================
// LEVEL 2 - PHASES
// ============================================================================

fn load_league(args: &GameArgs, rng: &mut ChaCha8Rng) -> Result<League> {
    match &args.league {
        Some(path) => League::load(path)
            .with_context(|| format!("Failed to load league: {}", path.display())),
        None => Ok(League::generate(rng, 2, 12)),
    }
}

fn pick_teams(league: &League, args: &GameArgs) -> Result<(TeamId, TeamId)> {
    let ids = league.team_ids();
    let home = args
        .home
        .map(TeamId)
        .or_else(|| ids.first().copied())
        .context("League has no teams")?;
    let away = args
        .away
        .map(TeamId)
        .or_else(|| ids.iter().copied().find(|&t| t != home))
        .context("League needs a second team")?;
    if home == away {
        bail!("A team cannot play itself ({})", home);
    }
    Ok((home, away))
}

fn report_game(
    league: &League,
    fixture: &MatchFixture,
    sim: &SimulatedMatch,
    home: &Roster,
    away: &Roster,
    args: &GameArgs,
) -> Result<()> {
    let score = BoxScore::from_events(&sim.events, home, away);
    if args.json {
        print_json(league, fixture, sim, &score, home, away)?;
    } else {
        if args.events {
            print_events(sim);
        }
        print_text(league, fixture, sim, &score, home, away);
    }
    Ok(())
}

// ============================================================================
// LEVEL 3 - STEPS
// ============================================================================

fn roster(league: &League, team: TeamId) -> Result<Roster> {
    league
        .roster_of(team)
        .with_context(|| format!("Team {} is not in the league", team))
}

/// Lines of everyone on a roster who recorded an event, in roster order
fn team_lines<'a>(score: &'a BoxScore, roster: &Roster) -> Vec<(PersonId, &'a PlayerLine)> {
    roster
        .players
        .iter()
        .chain(&roster.coaches)
        .filter_map(|&p| score.line(p).map(|line| (p, line)))
        .collect()
}

// ============================================================================
// LEVEL 4 - UTILITIES
// ============================================================================

fn print_events(sim: &SimulatedMatch) {
    for event in &sim.events {
        println!(
            "  {:>4}  {}  {:<28} {}",
            event.sequence,
            event.at.format("%H:%M:%S"),
            event.kind.as_str(),
            event.actor
        );
    }
}

fn print_json(
    league: &League,
    fixture: &MatchFixture,
    sim: &SimulatedMatch,
    score: &BoxScore,
    home: &Roster,
    away: &Roster,
) -> Result<()> {
    #[derive(Serialize)]
    struct JsonTeam<'a> {
        id: TeamId,
        name: String,
        points: u32,
        players: Vec<(PersonId, &'a PlayerLine)>,
    }

    #[derive(Serialize)]
    struct JsonGame<'a> {
        match_id: MatchId,
        winner: TeamId,
        events: usize,
        overtime_credits: u32,
        home: JsonTeam<'a>,
        away: JsonTeam<'a>,
    }

    let output = JsonGame {
        match_id: fixture.id,
        winner: sim.result.winner,
        events: sim.events.len(),
        overtime_credits: sim.overtime_credits,
        home: JsonTeam {
            id: fixture.home,
            name: league.team_name(fixture.home),
            points: score.home_points,
            players: team_lines(score, home),
        },
        away: JsonTeam {
            id: fixture.away,
            name: league.team_name(fixture.away),
            points: score.away_points,
            players: team_lines(score, away),
        },
    };

    let json = serde_json::to_string_pretty(&output).context("Failed to serialize box score")?;
    println!("{}", json);
    Ok(())
}

fn print_text(
    league: &League,
    fixture: &MatchFixture,
    sim: &SimulatedMatch,
    score: &BoxScore,
    home: &Roster,
    away: &Roster,
) {
    println!("\n=== Final ===");
    println!(
        "{} {} - {} {}",
        league.team_name(fixture.home),
        score.home_points,
        score.away_points,
        league.team_name(fixture.away)
    );
    if sim.overtime_credits > 0 {
        println!("Overtime credits: {}", sim.overtime_credits);
    }

    for (team, roster) in [(fixture.home, home), (fixture.away, away)] {
        println!("\n{}", league.team_name(team));
        println!("  {:>6}  {:>3}  {:>5}  {:>5}  {:>3}  {:>3}  {:>2}", "player", "pts", "fg", "ft", "reb", "ast", "pf");
        for (player, line) in team_lines(score, roster) {
            println!(
                "  {:>6}  {:>3}  {:>5}  {:>5}  {:>3}  {:>3}  {:>2}",
                player.0,
                line.points,
                format!("{}/{}", line.field_goals_made, line.field_goals_attempted),
                format!("{}/{}", line.free_throws_made, line.free_throws_attempted),
                line.rebounds,
                line.assists,
                line.fouls
            );
        }
    }

    if let Some((player, points)) = score.top_scorer() {
        println!("\nTop scorer: {} with {} points", player, points);
    }
}
