//! Season orchestration - stages, qualification and the podium
//!
//! Level 1 - Orchestration and Level 2 - Phases
//!
//! Every stage runs the same five steps: build fixtures, run them as one batch
//! (or one batch per series wave), aggregate standings, apply the stage's
//! qualification rule, drop the standings.

use chrono::{Duration, NaiveDate};
use hoopsim_core::{League, MatchFixture, MatchId, TeamId};
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::Serialize;
use tracing::{debug, info};

use crate::batch::{run_batch, BatchReport};
use crate::config::{SeasonConfig, DEFAULT_FIRST_MATCH_ID};
use crate::layout::{LayoutError, LoserRoute, Qualify, StageFormat, StageSpec};
use crate::schedule::{round_robin, Pairing, ScheduleError, Series};
use crate::standings::{Record, StageStandings};
use crate::storage::{StorageError, StorageSink};

// ============================================================================
// IDS AND ERRORS
// ============================================================================

/// Match ids handed out during one run
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IdSequence {
    next: u64,
}

impl Default for IdSequence {
    fn default() -> Self {
        Self::starting_at(DEFAULT_FIRST_MATCH_ID)
    }
}

impl IdSequence {
    pub fn starting_at(first: u64) -> Self {
        Self { next: first }
    }

    pub fn next_id(&mut self) -> MatchId {
        let id = MatchId(self.next);
        self.next += 1;
        id
    }

    /// Id the next fixture will get
    pub fn peek(&self) -> MatchId {
        MatchId(self.next)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SeasonError {
    #[error("invalid layout: {0}")]
    Layout(#[from] LayoutError),

    #[error("schedule error: {0}")]
    Schedule(#[from] ScheduleError),

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("team {0} is not in the league")]
    UnknownTeam(TeamId),

    #[error("stage '{stage}': series {high} v {low} could not be decided")]
    UndecidedSeries {
        stage: String,
        high: TeamId,
        low: TeamId,
    },
}

// ============================================================================
// REPORTS
// ============================================================================

/// Final table of one group
#[derive(Clone, Debug, Serialize)]
pub struct GroupTable {
    pub name: String,
    pub rows: Vec<(TeamId, Record)>,
}

/// How one series ended
#[derive(Clone, Debug, Serialize)]
pub struct SeriesReport {
    pub high_seed: TeamId,
    pub low_seed: TeamId,
    pub high_wins: u32,
    pub low_wins: u32,
    pub winner: TeamId,
    pub third_place: bool,
}

/// What happened in one stage
#[derive(Clone, Debug, Serialize)]
pub struct StageReport {
    pub number: u32,
    pub name: String,
    pub phase: u32,
    pub start: NaiveDate,
    pub entrants: usize,
    pub fixtures: usize,
    pub completed: usize,
    /// Completed games taken from storage instead of simulated
    pub reused: usize,
    pub skipped: usize,
    pub events: usize,
    pub overtime_credits: u32,
    pub groups: Vec<GroupTable>,
    pub series: Vec<SeriesReport>,
    /// Field carried into the next stage
    pub advanced: Vec<TeamId>,
}

impl StageReport {
    fn new(stage: &StageContext<'_>, entrants: usize) -> Self {
        Self {
            number: stage.number,
            name: stage.spec.name.clone(),
            phase: stage.spec.format.phase(),
            start: stage.start,
            entrants,
            fixtures: 0,
            completed: 0,
            reused: 0,
            skipped: 0,
            events: 0,
            overtime_credits: 0,
            groups: Vec::new(),
            series: Vec::new(),
            advanced: Vec::new(),
        }
    }

    fn add_batch(&mut self, fixtures: &[MatchFixture], batch: &BatchReport) {
        self.fixtures += fixtures.len();
        self.completed += batch.results.len();
        self.reused += batch.reused;
        self.skipped += batch.skipped.len();
        self.events += batch.events_written;
        self.overtime_credits += batch.overtime_credits;
    }
}

/// Outcome of a whole season
#[derive(Clone, Debug, Serialize)]
pub struct SeasonSummary {
    pub year: i32,
    pub layout: String,
    pub champion: TeamId,
    pub runner_up: TeamId,
    pub third_place: Option<TeamId>,
    pub stages: Vec<StageReport>,
}

impl SeasonSummary {
    pub fn matches_played(&self) -> usize {
        self.stages.iter().map(|s| s.completed).sum()
    }

    pub fn events_written(&self) -> usize {
        self.stages.iter().map(|s| s.events).sum()
    }
}

// ============================================================================
// Level 1 - Orchestration
// ============================================================================

/// Run every stage of a season (Level 1 orchestration)
pub fn run_season<S, R>(
    league: &League,
    config: &SeasonConfig,
    sink: &mut S,
    rng: &mut R,
) -> Result<SeasonSummary, SeasonError>
where
    S: StorageSink + ?Sized,
    R: Rng + ?Sized,
{
    run_season_with(league, config, sink, rng, |_| {})
}

/// Run a season, handing each finished stage's report to `on_stage`
pub fn run_season_with<S, R, F>(
    league: &League,
    config: &SeasonConfig,
    sink: &mut S,
    rng: &mut R,
    mut on_stage: F,
) -> Result<SeasonSummary, SeasonError>
where
    S: StorageSink + ?Sized,
    R: Rng + ?Sized,
    F: FnMut(&StageReport),
{
    config.layout.validate(league.teams.len())?;
    info!(
        year = config.year,
        layout = %config.layout.name,
        teams = league.teams.len(),
        "season starting"
    );

    let mut season = Season::new(league, config, sink);
    let mut reports = Vec::with_capacity(config.layout.stages.len());
    let mut start = config.start;

    for (i, spec) in config.layout.stages.iter().enumerate() {
        start += Duration::days(i64::from(spec.days_after_previous));
        let stage = StageContext {
            number: i as u32 + 1,
            spec,
            start,
        };
        // One generator per stage: reused games leave later stages' draws unchanged
        let mut stage_rng = ChaCha8Rng::seed_from_u64(rng.gen());
        let report = season.play_stage(&stage, &mut stage_rng)?;
        info!(
            stage = %report.name,
            completed = report.completed,
            reused = report.reused,
            skipped = report.skipped,
            advanced = report.advanced.len(),
            "stage finished"
        );
        on_stage(&report);
        reports.push(report);
    }

    season.finish(reports)
}

// ============================================================================
// Level 2 - Phases
// ============================================================================

struct StageContext<'a> {
    number: u32,
    spec: &'a StageSpec,
    start: NaiveDate,
}

#[derive(Default)]
struct Podium {
    champion: Option<TeamId>,
    runner_up: Option<TeamId>,
    third_place: Option<TeamId>,
}

/// Mutable state carried from stage to stage
struct Season<'a, S: ?Sized> {
    league: &'a League,
    config: &'a SeasonConfig,
    sink: &'a mut S,
    ids: IdSequence,
    field: Vec<TeamId>,
    play_in: Vec<(TeamId, TeamId)>,
    third_place: Option<(TeamId, TeamId)>,
    podium: Podium,
}

impl<'a, S: StorageSink + ?Sized> Season<'a, S> {
    fn new(league: &'a League, config: &'a SeasonConfig, sink: &'a mut S) -> Self {
        Self {
            league,
            config,
            sink,
            ids: IdSequence::starting_at(config.first_match_id),
            field: league.team_ids(),
            play_in: Vec::new(),
            third_place: None,
            podium: Podium::default(),
        }
    }

    fn play_stage<R: Rng + ?Sized>(
        &mut self,
        stage: &StageContext<'_>,
        rng: &mut R,
    ) -> Result<StageReport, SeasonError> {
        if stage.spec.redraw {
            self.field.shuffle(rng);
        }

        let mut report = match stage.spec.format {
            StageFormat::Groups {
                group_size,
                legs,
                qualify,
            } => self.play_groups(stage, group_size, legs, qualify, rng)?,
            StageFormat::PlayIn { best_of } => self.play_ins(stage, best_of, rng)?,
            StageFormat::Knockout { best_of, losers } => {
                self.play_knockout(stage, best_of, losers, rng)?
            }
        };
        report.advanced = self.field.clone();
        Ok(report)
    }

    fn play_groups<R: Rng + ?Sized>(
        &mut self,
        stage: &StageContext<'_>,
        group_size: usize,
        legs: u32,
        qualify: Qualify,
        rng: &mut R,
    ) -> Result<StageReport, SeasonError> {
        info!(stage = %stage.spec.name, teams = self.field.len(), "group stage");
        let mut report = StageReport::new(stage, self.field.len());
        let groups = deal(&self.field, group_size);

        let mut fixtures = Vec::new();
        for group in &groups {
            for pairing in round_robin(group, legs, self.config.shuffle_home_away, rng)? {
                let offset = (pairing.round - 1) * stage.spec.days_between_rounds;
                fixtures.push(self.fixture(stage, pairing, offset)?);
            }
        }
        let batch = self.run(&mut fixtures, rng)?;
        report.add_batch(&fixtures, &batch);

        let standings = StageStandings::from_results(&self.field, &fixtures, &batch.results);
        report.groups = groups
            .iter()
            .enumerate()
            .map(|(g, group)| GroupTable {
                name: group_name(g),
                rows: standings.table(group),
            })
            .collect();
        let ranked: Vec<Vec<TeamId>> = groups.iter().map(|g| standings.rank(g)).collect();

        self.field = match qualify {
            Qualify::Top(k) => place_major(&ranked, k),
            Qualify::TopWithPlayIn { direct } => {
                self.play_in = ranked
                    .iter()
                    .filter_map(|g| Some((*g.get(direct)?, *g.get(direct + 1)?)))
                    .collect();
                place_major(&ranked, direct)
            }
        };
        Ok(report)
    }

    fn play_ins<R: Rng + ?Sized>(
        &mut self,
        stage: &StageContext<'_>,
        best_of: u32,
        rng: &mut R,
    ) -> Result<StageReport, SeasonError> {
        let pairs = std::mem::take(&mut self.play_in);
        info!(stage = %stage.spec.name, series = pairs.len(), "play-ins");
        let mut report = StageReport::new(stage, pairs.len() * 2);

        let mut series = pairs
            .iter()
            .map(|&(high, low)| Series::new(high, low, best_of))
            .collect::<Result<Vec<_>, _>>()?;
        self.play_series(stage, &mut series, &mut report, rng)?;

        for s in &series {
            let (winner, _) = decided(stage, s)?;
            self.field.push(winner);
            report.series.push(series_report(s, winner, false));
        }
        Ok(report)
    }

    fn play_knockout<R: Rng + ?Sized>(
        &mut self,
        stage: &StageContext<'_>,
        best_of: u32,
        losers: LoserRoute,
        rng: &mut R,
    ) -> Result<StageReport, SeasonError> {
        info!(stage = %stage.spec.name, teams = self.field.len(), "knockout round");
        let mut report = StageReport::new(stage, self.field.len());

        let mut series = seed_pairs(&self.field)
            .into_iter()
            .map(|(high, low)| Series::new(high, low, best_of))
            .collect::<Result<Vec<_>, _>>()?;
        let bracket = series.len();
        if let Some((high, low)) = self.third_place.take() {
            series.push(Series::new(high, low, 1)?);
        }
        self.play_series(stage, &mut series, &mut report, rng)?;

        let mut winners = Vec::with_capacity(bracket);
        let mut beaten = Vec::with_capacity(bracket);
        for s in &series[..bracket] {
            let (winner, loser) = decided(stage, s)?;
            winners.push(winner);
            beaten.push(loser);
            report.series.push(series_report(s, winner, false));
        }
        if let Some(s) = series.get(bracket) {
            let (winner, _) = decided(stage, s)?;
            self.podium.third_place = Some(winner);
            report.series.push(series_report(s, winner, true));
        }

        if losers == LoserRoute::ThirdPlace {
            if let [a, b] = beaten[..] {
                self.third_place = Some((a, b));
            }
        }
        if let ([champion], [runner_up]) = (&winners[..], &beaten[..]) {
            self.podium.champion = Some(*champion);
            self.podium.runner_up = Some(*runner_up);
        }
        self.field = winners;
        Ok(report)
    }

    /// Play series in waves: every open series' next game goes into one batch
    fn play_series<R: Rng + ?Sized>(
        &mut self,
        stage: &StageContext<'_>,
        series: &mut [Series],
        report: &mut StageReport,
        rng: &mut R,
    ) -> Result<(), SeasonError> {
        loop {
            let wave: Vec<(usize, Pairing)> = series
                .iter()
                .enumerate()
                .filter_map(|(i, s)| s.next_game().map(|game| (i, game)))
                .collect();
            if wave.is_empty() {
                return Ok(());
            }

            let mut fixtures = Vec::with_capacity(wave.len());
            for &(_, game) in &wave {
                let offset = (game.round - 1) * stage.spec.days_between_games;
                fixtures.push(self.fixture(stage, game, offset)?);
            }
            let batch = self.run(&mut fixtures, rng)?;
            report.add_batch(&fixtures, &batch);

            for (&(i, _), fixture) in wave.iter().zip(&fixtures) {
                let s = &mut series[i];
                let result = batch.result_for(fixture.id).ok_or_else(|| {
                    SeasonError::UndecidedSeries {
                        stage: stage.spec.name.clone(),
                        high: s.high_seed,
                        low: s.low_seed,
                    }
                })?;
                s.record(result.winner)?;
                if let Some(winner) = s.winner() {
                    debug!(
                        stage = %stage.spec.name,
                        %winner,
                        high = s.wins(s.high_seed),
                        low = s.wins(s.low_seed),
                        "series decided"
                    );
                }
            }
        }
    }

    // ========================================================================
    // Level 3 - Steps
    // ========================================================================

    /// Fixture at the home team's venue, `days` after the stage start
    fn fixture(
        &mut self,
        stage: &StageContext<'_>,
        pairing: Pairing,
        days: u32,
    ) -> Result<MatchFixture, SeasonError> {
        let venue = self
            .league
            .venue_of(pairing.home)
            .ok_or(SeasonError::UnknownTeam(pairing.home))?;
        let date = stage.start + Duration::days(i64::from(days));
        Ok(MatchFixture::new(
            self.ids.next_id(),
            pairing.home,
            pairing.away,
            date.and_time(self.config.tip_off),
            stage.number,
            pairing.round,
            venue,
        ))
    }

    fn run<R: Rng + ?Sized>(
        &mut self,
        fixtures: &mut [MatchFixture],
        rng: &mut R,
    ) -> Result<BatchReport, SeasonError> {
        Ok(run_batch(
            fixtures,
            self.league,
            &mut *self.sink,
            &self.config.rules,
            rng,
        )?)
    }

    fn finish(self, stages: Vec<StageReport>) -> Result<SeasonSummary, SeasonError> {
        let remaining = self.field.len();
        let (champion, runner_up) = match (self.podium.champion, self.podium.runner_up) {
            (Some(c), Some(r)) => (c, r),
            _ => return Err(LayoutError::NoChampion { remaining }.into()),
        };
        info!(%champion, %runner_up, "season finished");
        Ok(SeasonSummary {
            year: self.config.year,
            layout: self.config.layout.name.clone(),
            champion,
            runner_up,
            third_place: self.podium.third_place,
            stages,
        })
    }
}

// ============================================================================
// Level 4 - Utilities
// ============================================================================

/// Deal the field into groups by pots: group g takes entries g, g+G, g+2G, ...
pub fn deal(field: &[TeamId], group_size: usize) -> Vec<Vec<TeamId>> {
    let groups = (field.len() / group_size.max(1)).max(1);
    (0..groups)
        .map(|g| field.iter().skip(g).step_by(groups).copied().collect())
        .collect()
}

/// Place-major qualifiers: every group's 1st in group order, then every 2nd, ...
pub fn place_major(ranked: &[Vec<TeamId>], places: usize) -> Vec<TeamId> {
    (0..places)
        .flat_map(|p| ranked.iter().filter_map(move |g| g.get(p).copied()))
        .collect()
}

/// Seed i meets seed n+1-i, better seed first
pub fn seed_pairs(field: &[TeamId]) -> Vec<(TeamId, TeamId)> {
    let n = field.len();
    (0..n / 2).map(|i| (field[i], field[n - 1 - i])).collect()
}

fn group_name(index: usize) -> String {
    char::from(b'A' + (index % 26) as u8).to_string()
}

fn decided(stage: &StageContext<'_>, series: &Series) -> Result<(TeamId, TeamId), SeasonError> {
    match (series.winner(), series.loser()) {
        (Some(winner), Some(loser)) => Ok((winner, loser)),
        _ => Err(SeasonError::UndecidedSeries {
            stage: stage.spec.name.clone(),
            high: series.high_seed,
            low: series.low_seed,
        }),
    }
}

fn series_report(series: &Series, winner: TeamId, third_place: bool) -> SeriesReport {
    SeriesReport {
        high_seed: series.high_seed,
        low_seed: series.low_seed,
        high_wins: series.wins(series.high_seed),
        low_wins: series.wins(series.low_seed),
        winner,
        third_place,
    }
}
