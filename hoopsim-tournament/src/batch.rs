//! Match batch runner - simulate a batch of fixtures and persist the output
//!
//! Level 2 - Phases
//!
//! Write checkpoints per batch: fixtures before anything else, `Ongoing` for
//! every fixture that tips off, then events, results and `Completed` after the
//! whole batch has run. Fixtures the sink already holds as completed are not
//! played again; their stored results stand.

use hoopsim_core::{
    simulate_match, FixtureStatus, MatchFixture, MatchId, MatchResult, Roster, RosterProvider,
    SimError, SimRules, TeamId, STARTERS,
};
use rand::Rng;
use tracing::{debug, info, warn};

use crate::storage::{StorageError, StorageSink};

/// Why a fixture was not played
#[derive(Debug, thiserror::Error)]
pub enum SkipReason {
    #[error("no roster for team {0}")]
    MissingRoster(TeamId),

    #[error(transparent)]
    Sim(#[from] SimError),
}

/// Outcome of one batch
#[derive(Debug, Default)]
pub struct BatchReport {
    /// Results of every completed fixture, reused ones included
    pub results: Vec<MatchResult>,
    /// Fixtures not played: `Scheduled` when a roster was unusable,
    /// `Ongoing` when the simulation failed after tip-off
    pub skipped: Vec<(MatchId, SkipReason)>,
    /// Completed fixtures taken from the sink instead of simulated
    pub reused: usize,
    /// Event rows the sink actually stored
    pub events_written: usize,
    /// Scoring events added after regulation, summed over the batch
    pub overtime_credits: u32,
}

impl BatchReport {
    pub fn result_for(&self, id: MatchId) -> Option<&MatchResult> {
        self.results.iter().find(|r| r.match_id == id)
    }

    pub fn was_skipped(&self, id: MatchId) -> bool {
        self.skipped.iter().any(|(skipped, _)| *skipped == id)
    }
}

/// Simulate and persist a batch of fixtures (Level 2 phase)
///
/// 1. Adopt the sink's copy of fixtures it already holds
/// 2. Store new fixtures
/// 3. Reuse stored results, check rosters of the rest
/// 4. Mark playable fixtures `Ongoing`, simulate them
/// 5. Store events and results, mark `Completed`
///
/// Fixtures whose rosters are missing or too short are logged and skipped;
/// they stay `Scheduled`. The fixtures slice follows every status change.
pub fn run_batch<P, S, R>(
    fixtures: &mut [MatchFixture],
    rosters: &P,
    sink: &mut S,
    rules: &SimRules,
    rng: &mut R,
) -> Result<BatchReport, StorageError>
where
    P: RosterProvider + ?Sized,
    S: StorageSink + ?Sized,
    R: Rng + ?Sized,
{
    adopt_stored(fixtures, &*sink)?;
    sink.insert_fixtures(fixtures)?;

    let mut report = BatchReport::default();
    let mut playable = Vec::new();
    for (i, fixture) in fixtures.iter().enumerate() {
        if fixture.is_completed() {
            let result = sink
                .stored_result(fixture.id)
                .ok_or(StorageError::MissingResult(fixture.id))?;
            debug!(match_id = %fixture.id, "stored result reused");
            report.results.push(result);
            report.reused += 1;
            continue;
        }
        if sink.has_events(fixture.id) {
            return Err(StorageError::PartialMatch(fixture.id));
        }
        match team_rosters(fixture, rosters) {
            Ok(teams) => playable.push((i, teams)),
            Err(reason) => {
                warn!(match_id = %fixture.id, %reason, "fixture skipped");
                report.skipped.push((fixture.id, reason));
            }
        }
    }

    let tipped_off: Vec<MatchId> = playable.iter().map(|(i, _)| fixtures[*i].id).collect();
    sink.update_status(&tipped_off, FixtureStatus::Ongoing)?;
    for (i, _) in &playable {
        fixtures[*i].advance(FixtureStatus::Ongoing);
    }

    let mut events = Vec::new();
    let mut played = Vec::with_capacity(playable.len());
    for (i, (home, away)) in playable {
        let fixture = &fixtures[i];
        match simulate_match(fixture, &home, &away, rules, rng) {
            Ok(sim) => {
                debug!(
                    match_id = %fixture.id,
                    home = sim.result.home_score,
                    away = sim.result.away_score,
                    events = sim.events.len(),
                    "match simulated"
                );
                report.overtime_credits += sim.overtime_credits;
                events.extend(sim.events);
                played.push(sim.result);
            }
            Err(e) => {
                warn!(match_id = %fixture.id, reason = %e, "simulation failed after tip-off");
                report.skipped.push((fixture.id, e.into()));
            }
        }
    }

    report.events_written = sink.insert_events(&events)?.len();
    sink.insert_results(&played)?;
    let completed: Vec<MatchId> = played.iter().map(|r| r.match_id).collect();
    sink.update_status(&completed, FixtureStatus::Completed)?;

    for fixture in fixtures.iter_mut() {
        if completed.contains(&fixture.id) {
            fixture.advance(FixtureStatus::Completed);
        }
    }
    report.results.extend(played);

    info!(
        fixtures = fixtures.len(),
        completed = completed.len(),
        reused = report.reused,
        skipped = report.skipped.len(),
        events = report.events_written,
        "batch stored"
    );
    Ok(report)
}

/// Replace fixtures the sink already holds with the stored copy (Level 3 step)
///
/// The stored copy may have home and away swapped; any other difference in
/// the pairing is a conflict.
fn adopt_stored<S>(fixtures: &mut [MatchFixture], sink: &S) -> Result<(), StorageError>
where
    S: StorageSink + ?Sized,
{
    for fixture in fixtures.iter_mut() {
        let stored = match sink.stored_fixture(fixture.id) {
            Some(stored) => stored,
            None => continue,
        };
        let pair = (stored.home, stored.away);
        if pair != (fixture.home, fixture.away) && pair != (fixture.away, fixture.home) {
            return Err(StorageError::FixtureConflict {
                id: fixture.id,
                stored_home: stored.home,
                stored_away: stored.away,
                home: fixture.home,
                away: fixture.away,
            });
        }
        *fixture = stored;
    }
    Ok(())
}

/// Snapshot both rosters and check each can start a game (Level 3 step)
fn team_rosters<P>(fixture: &MatchFixture, rosters: &P) -> Result<(Roster, Roster), SkipReason>
where
    P: RosterProvider + ?Sized,
{
    let home = rosters
        .roster_of(fixture.home)
        .ok_or(SkipReason::MissingRoster(fixture.home))?;
    let away = rosters
        .roster_of(fixture.away)
        .ok_or(SkipReason::MissingRoster(fixture.away))?;
    for (team, roster) in [(fixture.home, &home), (fixture.away, &away)] {
        if !roster.can_field_team() {
            return Err(SimError::ShortRoster {
                team,
                players: roster.players.len(),
                required: STARTERS,
            }
            .into());
        }
    }
    Ok((home, away))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{JsonLinesSink, MemoryStore, StatusRow, STATUS_FILE};
    use chrono::NaiveDate;
    use hoopsim_core::rules::OutcomeWeights;
    use hoopsim_core::{BoxScore, PersonId, VenueId};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use rustc_hash::FxHashMap;

    fn rosters() -> FxHashMap<TeamId, Roster> {
        let mut map = FxHashMap::default();
        for t in 0..3u32 {
            let base = 50000 + t * 100;
            map.insert(
                TeamId(1000 + t),
                Roster::new((1..=10).map(|i| PersonId(base + i)).collect(), vec![PersonId(base)]),
            );
        }
        // Team 1003 cannot field five
        map.insert(
            TeamId(1003),
            Roster::new((1..=3).map(|i| PersonId(50900 + i)).collect(), vec![]),
        );
        map
    }

    fn fixture(id: u64, home: u32, away: u32) -> MatchFixture {
        let at = NaiveDate::from_ymd_opt(2024, 10, 1)
            .unwrap()
            .and_hms_opt(20, 0, 0)
            .unwrap();
        MatchFixture::new(MatchId(id), TeamId(home), TeamId(away), at, 1, 1, VenueId(1))
    }

    fn assert_scores_match_events(store: &MemoryStore, rosters: &FxHashMap<TeamId, Roster>) {
        for result in store.results() {
            let f = store.fixture(result.match_id).unwrap();
            let home = rosters.roster_of(f.home).unwrap();
            let away = rosters.roster_of(f.away).unwrap();
            let score = BoxScore::from_events(&store.events_for(f.id), &home, &away);
            assert_eq!(score.home_points, result.home_score);
            assert_eq!(score.away_points, result.away_score);
        }
    }

    #[test]
    fn test_batch_persists_everything() {
        let rosters = rosters();
        let mut store = MemoryStore::new();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let mut fixtures = vec![fixture(70000, 1000, 1001), fixture(70001, 1001, 1002)];

        let report = run_batch(&mut fixtures, &rosters, &mut store, &SimRules::default(), &mut rng).unwrap();

        assert_eq!(report.results.len(), 2);
        assert_eq!(report.reused, 0);
        assert!(report.skipped.is_empty());
        assert_eq!(report.events_written, store.events().len());
        assert!(fixtures.iter().all(|f| f.is_completed()));
        assert!(store.fixtures().iter().all(|f| f.is_completed()));
        assert_scores_match_events(&store, &rosters);
    }

    #[test]
    fn test_unplayable_fixtures_stay_scheduled() {
        let rosters = rosters();
        let mut store = MemoryStore::new();
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        let mut fixtures = vec![
            fixture(1, 1000, 1003),
            fixture(2, 1000, 1999),
            fixture(3, 1000, 1001),
        ];

        let report = run_batch(&mut fixtures, &rosters, &mut store, &SimRules::default(), &mut rng).unwrap();

        assert_eq!(report.results.len(), 1);
        assert!(report.was_skipped(MatchId(1)));
        assert!(matches!(report.skipped[1].1, SkipReason::MissingRoster(TeamId(1999))));
        assert!(matches!(
            report.skipped[0].1,
            SkipReason::Sim(SimError::ShortRoster { team: TeamId(1003), players: 3, required: 5 })
        ));

        assert_eq!(store.fixtures().len(), 3);
        assert_eq!(store.fixture(MatchId(1)).unwrap().status, FixtureStatus::Scheduled);
        assert_eq!(store.fixture(MatchId(2)).unwrap().status, FixtureStatus::Scheduled);
        assert_eq!(store.fixture(MatchId(3)).unwrap().status, FixtureStatus::Completed);
        assert!(store.events_for(MatchId(1)).is_empty());
    }

    #[test]
    fn test_fixtures_pass_through_ongoing() {
        let tmp = tempfile::tempdir().unwrap();
        let mut sink = JsonLinesSink::open(tmp.path()).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let mut fixtures = vec![fixture(20, 1000, 1001), fixture(21, 1000, 1003)];

        run_batch(&mut fixtures, &rosters(), &mut sink, &SimRules::default(), &mut rng).unwrap();

        let rows: Vec<StatusRow> = sink.read_rows(STATUS_FILE).unwrap();
        let played = |id: u64| -> Vec<FixtureStatus> {
            rows.iter()
                .filter(|r| r.match_id == MatchId(id))
                .map(|r| r.status)
                .collect()
        };
        assert_eq!(played(20), vec![FixtureStatus::Ongoing, FixtureStatus::Completed]);
        assert!(played(21).is_empty());
    }

    #[test]
    fn test_failed_simulation_stays_ongoing() {
        let rules = SimRules::default().with_outcome_weights(OutcomeWeights {
            turnover: 0.0,
            foul: 0.0,
            shot: 0.0,
        });
        let mut store = MemoryStore::new();
        let mut rng = ChaCha8Rng::seed_from_u64(6);
        let mut fixtures = vec![fixture(30, 1000, 1001)];

        let report = run_batch(&mut fixtures, &rosters(), &mut store, &rules, &mut rng).unwrap();

        assert!(matches!(report.skipped[0].1, SkipReason::Sim(SimError::Weights(_))));
        assert_eq!(fixtures[0].status, FixtureStatus::Ongoing);
        assert_eq!(store.fixture(MatchId(30)).unwrap().status, FixtureStatus::Ongoing);
        assert!(store.results().is_empty());
    }

    #[test]
    fn test_rerun_is_duplicate_safe() {
        let rosters = rosters();
        let mut store = MemoryStore::new();
        let rules = SimRules::default();

        let mut first = vec![fixture(10, 1000, 1001)];
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        run_batch(&mut first, &rosters, &mut store, &rules, &mut rng).unwrap();
        let stored = store.events().len();

        let mut again = vec![fixture(10, 1000, 1001)];
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let report = run_batch(&mut again, &rosters, &mut store, &rules, &mut rng).unwrap();

        assert_eq!(report.events_written, 0);
        assert_eq!(report.reused, 1);
        assert_eq!(store.events().len(), stored);
        assert_eq!(store.results().len(), 1);
    }

    #[test]
    fn test_rerun_with_other_seed_reuses_stored_results() {
        let rosters = rosters();
        let mut store = MemoryStore::new();
        let rules = SimRules::default();

        let mut first = vec![fixture(40, 1000, 1001), fixture(41, 1001, 1002)];
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let original = run_batch(&mut first, &rosters, &mut store, &rules, &mut rng).unwrap();
        let stored = store.events().len();

        // Second pass draws differently, with one pairing turned around
        let mut again = vec![
            fixture(40, 1001, 1000),
            fixture(41, 1001, 1002),
            fixture(42, 1000, 1002),
        ];
        let mut rng = ChaCha8Rng::seed_from_u64(99);
        let rerun = run_batch(&mut again, &rosters, &mut store, &rules, &mut rng).unwrap();

        assert_eq!(rerun.reused, 2);
        for id in [MatchId(40), MatchId(41)] {
            assert_eq!(rerun.result_for(id), original.result_for(id));
            assert_eq!(rerun.result_for(id), store.result(id));
        }
        assert_eq!(again[0].home, TeamId(1000));
        assert!(again.iter().all(|f| f.is_completed()));

        // Only the new fixture added events, and every stream still adds up
        assert_eq!(store.events().len(), stored + rerun.events_written);
        assert_eq!(store.events_for(MatchId(42)).len(), rerun.events_written);
        assert_scores_match_events(&store, &rosters);
    }

    #[test]
    fn test_rerun_survives_reopening_the_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let rosters = rosters();
        let rules = SimRules::default();

        let original = {
            let mut sink = JsonLinesSink::open(tmp.path()).unwrap();
            let mut rng = ChaCha8Rng::seed_from_u64(8);
            run_batch(&mut [fixture(50, 1000, 1001)], &rosters, &mut sink, &rules, &mut rng).unwrap()
        };

        let mut sink = JsonLinesSink::open(tmp.path()).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        let rerun = run_batch(&mut [fixture(50, 1000, 1001)], &rosters, &mut sink, &rules, &mut rng).unwrap();

        assert_eq!(rerun.reused, 1);
        assert_eq!(rerun.events_written, 0);
        assert_eq!(rerun.result_for(MatchId(50)), original.result_for(MatchId(50)));
    }

    #[test]
    fn test_conflicting_fixture_is_rejected() {
        let rosters = rosters();
        let mut store = MemoryStore::new();
        let rules = SimRules::default();
        let mut rng = ChaCha8Rng::seed_from_u64(10);

        run_batch(&mut [fixture(60, 1000, 1001)], &rosters, &mut store, &rules, &mut rng).unwrap();
        let err = run_batch(&mut [fixture(60, 1000, 1002)], &rosters, &mut store, &rules, &mut rng)
            .unwrap_err();
        assert!(matches!(err, StorageError::FixtureConflict { id: MatchId(60), .. }));
    }

    #[test]
    fn test_completed_fixture_without_result_is_an_error() {
        let mut store = MemoryStore::new();
        store.insert_fixtures(&[fixture(70, 1000, 1001)]).unwrap();
        store.update_status(&[MatchId(70)], FixtureStatus::Completed).unwrap();

        let rules = SimRules::default();
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let err = run_batch(&mut [fixture(70, 1000, 1001)], &rosters(), &mut store, &rules, &mut rng)
            .unwrap_err();
        assert!(matches!(err, StorageError::MissingResult(MatchId(70))));
    }

    #[test]
    fn test_interrupted_match_is_an_error() {
        let rosters = rosters();
        let mut store = MemoryStore::new();
        let rules = SimRules::default();
        let mut rng = ChaCha8Rng::seed_from_u64(12);

        // Events landed but the result and status writes never happened
        let f = fixture(80, 1000, 1001);
        let home = rosters.roster_of(f.home).unwrap();
        let away = rosters.roster_of(f.away).unwrap();
        let sim = simulate_match(&f, &home, &away, &rules, &mut rng).unwrap();
        store.insert_fixtures(&[f.clone()]).unwrap();
        store.insert_events(&sim.events).unwrap();

        let err = run_batch(&mut [f], &rosters, &mut store, &rules, &mut rng).unwrap_err();
        assert!(matches!(err, StorageError::PartialMatch(MatchId(80))));
    }

    #[test]
    fn test_strict_sink_aborts_batch() {
        let rosters = rosters();
        let mut store = MemoryStore::strict();
        let rules = SimRules::default();
        let mut rng = ChaCha8Rng::seed_from_u64(4);

        run_batch(&mut [fixture(10, 1000, 1001)], &rosters, &mut store, &rules, &mut rng).unwrap();
        let err = run_batch(&mut [fixture(10, 1000, 1001)], &rosters, &mut store, &rules, &mut rng)
            .unwrap_err();
        assert!(matches!(err, StorageError::Duplicate { table: "fixture", .. }));
    }
}
