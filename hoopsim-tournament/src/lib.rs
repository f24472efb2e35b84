//! HOOPSIM Tournament - Season scheduling and batch persistence
//!
//! This crate turns a league into a played season:
//! - Round-robin and best-of-N series schedules
//! - Multi-stage layouts (groups, play-ins, knockouts)
//! - Batch simulation with storage sinks
//!
//! ## Architecture (4-layer granularity)
//!
//! - Level 1: run_season (orchestration)
//! - Level 2: stage phases, run_batch (phases)
//! - Level 3: standings, fixture building (steps)
//! - Level 4: schedules, layouts, configuration

mod batch;
mod config;
mod layout;
mod schedule;
mod season;
mod standings;
mod storage;

pub use batch::{run_batch, BatchReport, SkipReason};
pub use config::{season_opening, SeasonConfig, DEFAULT_FIRST_MATCH_ID};
pub use layout::{LayoutError, LoserRoute, Qualify, SeasonLayout, StageFormat, StageSpec};
pub use schedule::{
    double_round_robin, mirror, round_count, round_robin, shuffle_home_away, single_round_robin,
    Pairing, ScheduleError, Series,
};
pub use season::{
    deal, place_major, run_season, run_season_with, seed_pairs, GroupTable, IdSequence,
    SeasonError, SeasonSummary, SeriesReport, StageReport,
};
pub use standings::{Record, StageStandings};
pub use storage::{
    EventRowId, JsonLinesSink, MemoryStore, StatusRow, StorageError, StorageSink, StoredEvent,
    EVENTS_FILE, FIXTURES_FILE, RESULTS_FILE, STATUS_FILE,
};
