//! HOOPSIM Core - Match model and possession simulator
//!
//! This crate provides the core basketball model:
//! - Identifiers, teams and rosters (with a synthetic league seeder)
//! - The closed event vocabulary and play-by-play records
//! - Fixtures, fixture status and match results
//! - Lineups (on-court / bench) with foul-out and rotation
//! - Possession-by-possession match simulation
//! - Box-score replay of an event stream

pub mod ids;
pub mod roster;
pub mod league;
pub mod event;
pub mod fixture;
pub mod lineup;
pub mod outcome;
pub mod rules;
pub mod sim;
pub mod boxscore;
mod error;

// Re-exports for convenient access
pub use ids::{MatchId, PersonId, TeamId, VenueId};
pub use roster::{Roster, RosterProvider, STARTERS};
pub use league::{League, Team, Venue};
pub use event::{EventKind, GameEvent, UnknownEventKind};
pub use fixture::{FixtureStatus, MatchFixture, MatchResult, Side};
pub use lineup::{Exit, Lineup, LineupError};
pub use outcome::{FoulKind, PossessionOutcome, Rebound, ShotKind, TurnoverKind, WeightedTable};
pub use rules::SimRules;
pub use sim::{simulate_match, MatchSim, SimulatedMatch, QUARTERS};
pub use boxscore::{BoxScore, PlayerLine};
pub use error::SimError;
