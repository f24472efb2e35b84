//! Fixtures and match results

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::ids::{MatchId, TeamId, VenueId};

/// Home or away side of a fixture
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    Home = 0,
    Away = 1,
}

impl Side {
    pub fn other(self) -> Self {
        match self {
            Side::Home => Side::Away,
            Side::Away => Side::Home,
        }
    }

    pub fn index(self) -> usize {
        self as usize
    }
}

/// Lifecycle of a fixture
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum FixtureStatus {
    Scheduled,
    Ongoing,
    Completed,
}

impl fmt::Display for FixtureStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FixtureStatus::Scheduled => "Scheduled",
            FixtureStatus::Ongoing => "Ongoing",
            FixtureStatus::Completed => "Completed",
        };
        f.write_str(s)
    }
}

/// A scheduled match between two teams
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchFixture {
    pub id: MatchId,
    pub home: TeamId,
    pub away: TeamId,
    /// Tip-off time
    pub scheduled: NaiveDateTime,
    /// Stage number within the season (1-based)
    pub stage: u32,
    /// Round number within the stage (1-based)
    pub round: u32,
    pub venue: VenueId,
    pub status: FixtureStatus,
}

impl MatchFixture {
    /// New fixture in `Scheduled` state
    pub fn new(
        id: MatchId,
        home: TeamId,
        away: TeamId,
        scheduled: NaiveDateTime,
        stage: u32,
        round: u32,
        venue: VenueId,
    ) -> Self {
        debug_assert_ne!(home, away, "a team cannot play itself");
        Self {
            id,
            home,
            away,
            scheduled,
            stage,
            round,
            venue,
            status: FixtureStatus::Scheduled,
        }
    }

    pub fn team(&self, side: Side) -> TeamId {
        match side {
            Side::Home => self.home,
            Side::Away => self.away,
        }
    }

    pub fn involves(&self, team: TeamId) -> bool {
        self.home == team || self.away == team
    }

    /// Move the status forward; backward or repeated transitions are refused
    pub fn advance(&mut self, status: FixtureStatus) -> bool {
        if status > self.status {
            self.status = status;
            true
        } else {
            false
        }
    }

    pub fn is_completed(&self) -> bool {
        self.status == FixtureStatus::Completed
    }
}

/// Final score of one simulated match
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchResult {
    pub match_id: MatchId,
    pub winner: TeamId,
    pub loser: TeamId,
    pub home_score: u32,
    pub away_score: u32,
}

impl MatchResult {
    /// Build from a fixture and a non-tied score
    pub fn from_scores(fixture: &MatchFixture, home_score: u32, away_score: u32) -> Self {
        debug_assert_ne!(home_score, away_score, "results are never tied");
        let (winner, loser) = if home_score > away_score {
            (fixture.home, fixture.away)
        } else {
            (fixture.away, fixture.home)
        };
        Self {
            match_id: fixture.id,
            winner,
            loser,
            home_score,
            away_score,
        }
    }

    pub fn margin(&self) -> u32 {
        self.home_score.abs_diff(self.away_score)
    }

    pub fn points_for(&self, team: TeamId, fixture: &MatchFixture) -> u32 {
        if fixture.home == team {
            self.home_score
        } else {
            self.away_score
        }
    }
}
