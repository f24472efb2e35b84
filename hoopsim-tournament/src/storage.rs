//! Storage sinks - where fixtures, events and results end up
//!
//! Level 4 - Utilities
//!
//! The engine only needs something that accepts rows in bulk, assigns event
//! row ids and refuses to store the same identity twice. Identities: fixture
//! and result by match id, and a match's event stream as a whole by match id.
//! A stream is stored in one piece or not at all, so a re-run can never splice
//! a second simulation onto the first.

use std::fs::{self, File, OpenOptions};
use std::io::{self, BufRead, BufWriter, Write};
use std::path::{Path, PathBuf};

use hoopsim_core::{FixtureStatus, GameEvent, MatchFixture, MatchId, MatchResult, TeamId};
use rustc_hash::{FxHashMap, FxHashSet};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Surrogate key assigned to a stored event row
pub type EventRowId = u64;

pub const FIXTURES_FILE: &str = "fixtures.jsonl";
pub const EVENTS_FILE: &str = "events.jsonl";
pub const RESULTS_FILE: &str = "results.jsonl";
pub const STATUS_FILE: &str = "status.jsonl";

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("duplicate {table} row: {key}")]
    Duplicate { table: &'static str, key: String },

    #[error("unknown fixture {0}")]
    UnknownFixture(MatchId),

    #[error("fixture {id} cannot move from {from} back to {to}")]
    StatusRegression {
        id: MatchId,
        from: FixtureStatus,
        to: FixtureStatus,
    },

    #[error("fixture {id} is stored as {stored_home} v {stored_away}, not {home} v {away}")]
    FixtureConflict {
        id: MatchId,
        stored_home: TeamId,
        stored_away: TeamId,
        home: TeamId,
        away: TeamId,
    },

    #[error("fixture {0} is completed but has no stored result")]
    MissingResult(MatchId),

    #[error("fixture {0} has stored events but never completed")]
    PartialMatch(MatchId),

    #[error("{file} line {line}: malformed row: {source}")]
    Corrupt {
        file: String,
        line: usize,
        source: serde_json::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Bulk row sink the batch runner writes through
pub trait StorageSink {
    /// Store new fixtures; returns how many were written
    fn insert_fixtures(&mut self, fixtures: &[MatchFixture]) -> Result<usize, StorageError>;

    /// Store the event streams of matches that have none yet; returns the row
    /// ids assigned to the rows actually written
    fn insert_events(&mut self, events: &[GameEvent]) -> Result<Vec<EventRowId>, StorageError>;

    /// Store results; returns how many were written
    fn insert_results(&mut self, results: &[MatchResult]) -> Result<usize, StorageError>;

    /// Move fixtures forward to `status`; returns how many changed
    fn update_status(&mut self, ids: &[MatchId], status: FixtureStatus)
        -> Result<usize, StorageError>;

    /// Stored copy of a fixture, carrying its current status
    fn stored_fixture(&self, id: MatchId) -> Option<MatchFixture>;

    fn stored_result(&self, id: MatchId) -> Option<MatchResult>;

    /// Whether the match's event stream is already stored
    fn has_events(&self, id: MatchId) -> bool;
}

/// Event plus its surrogate row id
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredEvent {
    pub row_id: EventRowId,
    #[serde(flatten)]
    pub event: GameEvent,
}

/// One status change, as written to `status.jsonl`
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusRow {
    pub match_id: MatchId,
    pub status: FixtureStatus,
}

/// Check a status change; `Ok(false)` when it is a repeat
fn check_transition(
    id: MatchId,
    current: Option<FixtureStatus>,
    to: FixtureStatus,
) -> Result<bool, StorageError> {
    let from = current.ok_or(StorageError::UnknownFixture(id))?;
    if to < from {
        return Err(StorageError::StatusRegression { id, from, to });
    }
    Ok(to > from)
}

/// Events of matches with no stored stream; strict sinks fail on the first stored one
fn fresh_streams<'a>(
    strict: bool,
    events: &'a [GameEvent],
    stored: &FxHashSet<MatchId>,
) -> Result<Vec<&'a GameEvent>, StorageError> {
    if strict {
        if let Some(event) = events.iter().find(|e| stored.contains(&e.match_id)) {
            return Err(StorageError::Duplicate {
                table: "event",
                key: event.match_id.to_string(),
            });
        }
    }
    Ok(events
        .iter()
        .filter(|e| !stored.contains(&e.match_id))
        .collect())
}

// ============================================================================
// MEMORY STORE
// ============================================================================

/// In-memory sink
///
/// Idempotent by default: rows whose identity is already stored are skipped.
/// A strict store rejects the whole batch instead.
#[derive(Debug, Default)]
pub struct MemoryStore {
    strict: bool,
    fixtures: Vec<MatchFixture>,
    fixture_index: FxHashMap<MatchId, usize>,
    events: Vec<StoredEvent>,
    event_matches: FxHashSet<MatchId>,
    results: Vec<MatchResult>,
    result_keys: FxHashSet<MatchId>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store that surfaces duplicates as `StorageError::Duplicate`
    pub fn strict() -> Self {
        Self {
            strict: true,
            ..Self::default()
        }
    }

    pub fn fixtures(&self) -> &[MatchFixture] {
        &self.fixtures
    }

    pub fn fixture(&self, id: MatchId) -> Option<&MatchFixture> {
        self.fixture_index.get(&id).map(|&i| &self.fixtures[i])
    }

    pub fn events(&self) -> &[StoredEvent] {
        &self.events
    }

    /// Events of one match in stored order
    pub fn events_for(&self, id: MatchId) -> Vec<GameEvent> {
        self.events
            .iter()
            .filter(|row| row.event.match_id == id)
            .map(|row| row.event.clone())
            .collect()
    }

    pub fn results(&self) -> &[MatchResult] {
        &self.results
    }

    pub fn result(&self, id: MatchId) -> Option<&MatchResult> {
        self.results.iter().find(|r| r.match_id == id)
    }

    /// Rows of `items` whose identity is new; strict stores fail on the first repeat
    fn fresh<'a, T, K>(
        strict: bool,
        table: &'static str,
        items: &'a [T],
        key: impl Fn(&T) -> K,
        stored: impl Fn(&K) -> bool,
    ) -> Result<Vec<&'a T>, StorageError>
    where
        K: std::hash::Hash + Eq + std::fmt::Debug,
    {
        let mut batch = FxHashSet::default();
        let mut rows = Vec::with_capacity(items.len());
        for item in items {
            let k = key(item);
            if stored(&k) || batch.contains(&k) {
                if strict {
                    return Err(StorageError::Duplicate {
                        table,
                        key: format!("{:?}", k),
                    });
                }
                continue;
            }
            rows.push(item);
            batch.insert(k);
        }
        Ok(rows)
    }
}

impl StorageSink for MemoryStore {
    fn insert_fixtures(&mut self, fixtures: &[MatchFixture]) -> Result<usize, StorageError> {
        let index = &self.fixture_index;
        let rows = Self::fresh(self.strict, "fixture", fixtures, |f| f.id, |k| index.contains_key(k))?;
        let written = rows.len();
        for fixture in rows {
            self.fixture_index.insert(fixture.id, self.fixtures.len());
            self.fixtures.push(fixture.clone());
        }
        Ok(written)
    }

    fn insert_events(&mut self, events: &[GameEvent]) -> Result<Vec<EventRowId>, StorageError> {
        let rows = fresh_streams(self.strict, events, &self.event_matches)?;
        let mut ids = Vec::with_capacity(rows.len());
        for event in rows {
            let row_id = self.events.len() as EventRowId + 1;
            self.events.push(StoredEvent {
                row_id,
                event: event.clone(),
            });
            ids.push(row_id);
        }
        self.event_matches.extend(events.iter().map(|e| e.match_id));
        Ok(ids)
    }

    fn insert_results(&mut self, results: &[MatchResult]) -> Result<usize, StorageError> {
        let keys = &self.result_keys;
        let rows = Self::fresh(self.strict, "result", results, |r| r.match_id, |k| keys.contains(k))?;
        let written = rows.len();
        for result in rows {
            self.result_keys.insert(result.match_id);
            self.results.push(result.clone());
        }
        Ok(written)
    }

    fn update_status(
        &mut self,
        ids: &[MatchId],
        status: FixtureStatus,
    ) -> Result<usize, StorageError> {
        // Validate everything before touching any row
        let mut changes = Vec::with_capacity(ids.len());
        for &id in ids {
            let current = self.fixture(id).map(|f| f.status);
            if check_transition(id, current, status)? {
                changes.push(self.fixture_index[&id]);
            }
        }
        for &i in &changes {
            self.fixtures[i].advance(status);
        }
        Ok(changes.len())
    }

    fn stored_fixture(&self, id: MatchId) -> Option<MatchFixture> {
        self.fixture(id).cloned()
    }

    fn stored_result(&self, id: MatchId) -> Option<MatchResult> {
        self.result(id).cloned()
    }

    fn has_events(&self, id: MatchId) -> bool {
        self.event_matches.contains(&id)
    }
}

// ============================================================================
// JSON LINES SINK
// ============================================================================

/// Directory of append-only JSON-lines files
///
/// Opening an existing directory reloads the rows already written, so a
/// re-run against the same directory only appends what is new. A last line
/// cut short by an interrupted append is dropped on open; any other malformed
/// line is an error.
#[derive(Debug)]
pub struct JsonLinesSink {
    dir: PathBuf,
    fixtures: FxHashMap<MatchId, MatchFixture>,
    event_matches: FxHashSet<MatchId>,
    results: FxHashMap<MatchId, MatchResult>,
    next_row: EventRowId,
}

impl JsonLinesSink {
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, StorageError> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;

        let mut sink = Self {
            dir,
            fixtures: FxHashMap::default(),
            event_matches: FxHashSet::default(),
            results: FxHashMap::default(),
            next_row: 1,
        };
        for file in [FIXTURES_FILE, EVENTS_FILE, RESULTS_FILE, STATUS_FILE] {
            sink.trim_partial_line(file)?;
        }

        for fixture in sink.read_rows::<MatchFixture>(FIXTURES_FILE)? {
            sink.fixtures.insert(fixture.id, fixture);
        }
        for row in sink.read_rows::<StatusRow>(STATUS_FILE)? {
            if let Some(fixture) = sink.fixtures.get_mut(&row.match_id) {
                fixture.advance(row.status);
            }
        }
        for row in sink.read_rows::<StoredEvent>(EVENTS_FILE)? {
            sink.event_matches.insert(row.event.match_id);
            sink.next_row = sink.next_row.max(row.row_id + 1);
        }
        for result in sink.read_rows::<MatchResult>(RESULTS_FILE)? {
            sink.results.insert(result.match_id, result);
        }
        Ok(sink)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path(&self, file: &str) -> PathBuf {
        self.dir.join(file)
    }

    /// All rows of one file; blank lines are skipped, malformed ones are an error
    pub fn read_rows<T: DeserializeOwned>(&self, file: &str) -> Result<Vec<T>, StorageError> {
        let path = self.path(file);
        if !path.exists() {
            return Ok(Vec::new());
        }
        let reader = io::BufReader::new(File::open(&path)?);
        let mut rows = Vec::new();
        for (i, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let row = serde_json::from_str::<T>(&line).map_err(|source| StorageError::Corrupt {
                file: file.to_string(),
                line: i + 1,
                source,
            })?;
            rows.push(row);
        }
        Ok(rows)
    }

    /// Cut the file back to its last newline
    fn trim_partial_line(&self, file: &str) -> Result<(), StorageError> {
        let path = self.path(file);
        if !path.exists() {
            return Ok(());
        }
        let bytes = fs::read(&path)?;
        if bytes.is_empty() || bytes.ends_with(b"\n") {
            return Ok(());
        }
        let keep = bytes.iter().rposition(|&b| b == b'\n').map_or(0, |i| i + 1);
        warn!(
            file = %path.display(),
            dropped = bytes.len() - keep,
            "dropping partial last line"
        );
        OpenOptions::new()
            .write(true)
            .open(&path)?
            .set_len(keep as u64)?;
        Ok(())
    }

    fn append<'a, T: Serialize + 'a>(
        &self,
        file: &str,
        rows: impl IntoIterator<Item = &'a T>,
    ) -> Result<(), StorageError> {
        let handle = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.path(file))?;
        let mut writer = BufWriter::new(handle);
        for row in rows {
            serde_json::to_writer(&mut writer, row)?;
            writer.write_all(b"\n")?;
        }
        writer.flush()?;
        Ok(())
    }
}

impl StorageSink for JsonLinesSink {
    fn insert_fixtures(&mut self, fixtures: &[MatchFixture]) -> Result<usize, StorageError> {
        let mut rows = Vec::new();
        for fixture in fixtures {
            if self.fixtures.contains_key(&fixture.id) {
                continue;
            }
            self.fixtures.insert(fixture.id, fixture.clone());
            rows.push(fixture);
        }
        self.append(FIXTURES_FILE, rows.iter().copied())?;
        Ok(rows.len())
    }

    fn insert_events(&mut self, events: &[GameEvent]) -> Result<Vec<EventRowId>, StorageError> {
        let rows: Vec<StoredEvent> = fresh_streams(false, events, &self.event_matches)?
            .into_iter()
            .zip(self.next_row..)
            .map(|(event, row_id)| StoredEvent {
                row_id,
                event: event.clone(),
            })
            .collect();
        self.append(EVENTS_FILE, &rows)?;
        self.next_row += rows.len() as EventRowId;
        self.event_matches.extend(events.iter().map(|e| e.match_id));
        Ok(rows.iter().map(|r| r.row_id).collect())
    }

    fn insert_results(&mut self, results: &[MatchResult]) -> Result<usize, StorageError> {
        let mut rows = Vec::new();
        for result in results {
            if self.results.contains_key(&result.match_id) {
                continue;
            }
            self.results.insert(result.match_id, result.clone());
            rows.push(result);
        }
        self.append(RESULTS_FILE, rows.iter().copied())?;
        Ok(rows.len())
    }

    fn update_status(
        &mut self,
        ids: &[MatchId],
        status: FixtureStatus,
    ) -> Result<usize, StorageError> {
        let mut rows = Vec::new();
        for &id in ids {
            let current = self.fixtures.get(&id).map(|f| f.status);
            if check_transition(id, current, status)? {
                rows.push(StatusRow { match_id: id, status });
            }
        }
        for row in &rows {
            if let Some(fixture) = self.fixtures.get_mut(&row.match_id) {
                fixture.advance(row.status);
            }
        }
        self.append(STATUS_FILE, &rows)?;
        Ok(rows.len())
    }

    fn stored_fixture(&self, id: MatchId) -> Option<MatchFixture> {
        self.fixtures.get(&id).cloned()
    }

    fn stored_result(&self, id: MatchId) -> Option<MatchResult> {
        self.results.get(&id).cloned()
    }

    fn has_events(&self, id: MatchId) -> bool {
        self.event_matches.contains(&id)
    }
}
