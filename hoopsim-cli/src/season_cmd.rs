//! Season command - run every stage of a layout and report the podium
//!
//! ## Architecture (4-layer granularity)
//!
//! - Level 1: run() - orchestration
//! - Level 2: season_config(), load_league(), open_sink(), play_season(), report_season()
//! - Level 3: resolve_layout(), stage line formatting
//! - Level 4: progress bar and printing utilities

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};
use rand_chacha::ChaCha8Rng;

use hoopsim_core::{League, SimRules};
use hoopsim_tournament::{
    run_season_with, JsonLinesSink, MemoryStore, SeasonConfig, SeasonLayout, SeasonSummary,
    StageReport, StorageSink,
};

// ============================================================================
// COMMAND ARGUMENTS (Level 4 - Configuration)
// ============================================================================

#[derive(Args)]
pub struct SeasonArgs {
    /// League JSON file (generated to fit the layout when omitted)
    #[arg(long, value_name = "FILE")]
    pub league: Option<PathBuf>,

    /// Layout: "champions-league", "compact" or a layout JSON file
    #[arg(long, default_value = "champions-league")]
    pub layout: String,

    /// Season year (first stage opens on October 1st)
    #[arg(long, default_value = "2024")]
    pub year: i32,

    /// First day of the season, overriding October 1st (YYYY-MM-DD)
    #[arg(long)]
    pub start: Option<NaiveDate>,

    /// Simulation rules JSON file (missing fields keep their defaults)
    #[arg(long, value_name = "FILE")]
    pub rules: Option<PathBuf>,

    /// Players per generated team
    #[arg(long, default_value = "12")]
    pub players: usize,

    /// First match id of the run
    #[arg(long)]
    pub first_match_id: Option<u64>,

    /// Write fixtures, events and results as JSON lines into this directory
    #[arg(long, value_name = "DIR")]
    pub output: Option<PathBuf>,

    /// Print group tables
    #[arg(long)]
    pub tables: bool,

    /// Output the summary as JSON
    #[arg(long)]
    pub json: bool,
}

// ============================================================================
// LEVEL 1 - ORCHESTRATION
// ============================================================================

/// Run season command
///
/// 1. Resolve the layout and league
/// 2. Open the storage sink
/// 3. Play every stage
/// 4. Report the summary
pub fn run(args: SeasonArgs, rng: &mut ChaCha8Rng) -> Result<()> {
    let config = season_config(&args)?;
    let league = load_league(&args, &config.layout, rng)?;

    let mut sink = open_sink(args.output.as_deref())?;
    let summary = play_season(&league, &config, sink.as_mut(), rng)?;

    report_season(&league, &summary, &args)
}

// ============================================================================
// LEVEL 2 - PHASES
// ============================================================================

fn season_config(args: &SeasonArgs) -> Result<SeasonConfig> {
    let layout = resolve_layout(&args.layout)?;
    let mut config = SeasonConfig::for_year(args.year).with_layout(layout);
    if let Some(start) = args.start {
        config = config.with_start(start);
    }
    if let Some(path) = &args.rules {
        let rules = SimRules::load(path)
            .with_context(|| format!("Failed to load rules: {}", path.display()))?;
        config = config.with_rules(rules);
    }
    if let Some(id) = args.first_match_id {
        config = config.with_first_match_id(id);
    }
    Ok(config)
}

fn load_league(args: &SeasonArgs, layout: &SeasonLayout, rng: &mut ChaCha8Rng) -> Result<League> {
    if let Some(path) = &args.league {
        return League::load(path)
            .with_context(|| format!("Failed to load league: {}", path.display()));
    }
    let teams = layout
        .team_count()
        .with_context(|| format!("Layout '{}' accepts no field size", layout.name))?;
    Ok(League::generate(rng, teams, args.players))
}

fn open_sink(output: Option<&Path>) -> Result<Box<dyn StorageSink>> {
    match output {
        Some(dir) => {
            let sink = JsonLinesSink::open(dir)
                .with_context(|| format!("Failed to open output directory: {}", dir.display()))?;
            tracing::info!("Writing JSON lines to {}", dir.display());
            Ok(Box::new(sink))
        }
        None => Ok(Box::new(MemoryStore::new())),
    }
}

fn play_season(
    league: &League,
    config: &SeasonConfig,
    sink: &mut dyn StorageSink,
    rng: &mut ChaCha8Rng,
) -> Result<SeasonSummary> {
    let progress = stage_progress(config.layout.stages.len());
    if let Some(first) = config.layout.stages.first() {
        progress.set_message(first.name.clone());
    }

    let stages = &config.layout.stages;
    let summary = run_season_with(league, config, sink, rng, |report| {
        progress.inc(1);
        if let Some(next) = stages.get(report.number as usize) {
            progress.set_message(next.name.clone());
        }
    });
    match summary {
        Ok(summary) => {
            progress.finish_with_message("done");
            Ok(summary)
        }
        Err(e) => {
            progress.abandon();
            Err(e).context("Season aborted")
        }
    }
}

fn report_season(league: &League, summary: &SeasonSummary, args: &SeasonArgs) -> Result<()> {
    if args.json {
        let json = serde_json::to_string_pretty(summary).context("Failed to serialize summary")?;
        println!("{}", json);
    } else {
        print_text(league, summary, args.tables);
    }
    Ok(())
}

// ============================================================================
// LEVEL 3 - STEPS
// ============================================================================

/// Built-in layout by name, otherwise a layout file
fn resolve_layout(name: &str) -> Result<SeasonLayout> {
    match name {
        "champions-league" => Ok(SeasonLayout::champions_league()),
        "compact" => Ok(SeasonLayout::compact()),
        path => SeasonLayout::load(Path::new(path))
            .with_context(|| format!("Failed to load layout: {}", path)),
    }
}

fn stage_line(report: &StageReport) -> String {
    let mut line = format!(
        "{}. {:<16} {}  {:>3} teams  {:>3} played",
        report.number, report.name, report.start, report.entrants, report.completed
    );
    if report.reused > 0 {
        line.push_str(&format!("  {} reused", report.reused));
    }
    if report.skipped > 0 {
        line.push_str(&format!("  {} skipped", report.skipped));
    }
    line
}

// ============================================================================
// LEVEL 4 - UTILITIES
// ============================================================================

fn stage_progress(stages: usize) -> ProgressBar {
    let bar = ProgressBar::new(stages as u64);
    if let Ok(style) = ProgressStyle::with_template("{bar:30} {pos}/{len} stages  {msg}") {
        bar.set_style(style);
    }
    bar
}

fn print_text(league: &League, summary: &SeasonSummary, tables: bool) {
    println!("\n=== {} {} ===", summary.layout, summary.year);
    for report in &summary.stages {
        println!("{}", stage_line(report));
        if tables {
            for group in &report.groups {
                println!("   Group {}", group.name);
                for (team, record) in &group.rows {
                    println!(
                        "     {:<28} {:>2}-{:<2} {:>+5}",
                        league.team_name(*team),
                        record.wins,
                        record.losses,
                        record.point_difference()
                    );
                }
            }
        }
    }

    println!("\nMatches played: {}", summary.matches_played());
    println!("Events stored:  {}", summary.events_written());
    println!("\nChampion:    {}", league.team_name(summary.champion));
    println!("Runner-up:   {}", league.team_name(summary.runner_up));
    if let Some(third) = summary.third_place {
        println!("Third place: {}", league.team_name(third));
    }
}
