//! Event vocabulary and play-by-play records
//!
//! The event names are a closed set read verbatim by the statistics side.
//! Points are derived only from the three "Made" kinds.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::ids::{MatchId, PersonId};

// ============================================================================
// EVENT KIND
// ============================================================================

/// Kind of an in-game event
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    #[serde(rename = "Turnover")]
    Turnover,
    #[serde(rename = "Steal")]
    Steal,
    #[serde(rename = "Block")]
    Block,
    #[serde(rename = "Offensive Rebound")]
    OffensiveRebound,
    #[serde(rename = "Defensive Rebound")]
    DefensiveRebound,
    #[serde(rename = "Personal Foul")]
    PersonalFoul,
    #[serde(rename = "Technical Foul")]
    TechnicalFoul,
    #[serde(rename = "Flagrant Foul")]
    FlagrantFoul,
    #[serde(rename = "Offensive Foul")]
    OffensiveFoul,
    #[serde(rename = "Substitution")]
    Substitution,
    #[serde(rename = "Free Throw Made")]
    FreeThrowMade,
    #[serde(rename = "Free Throw Attempt")]
    FreeThrowAttempt,
    #[serde(rename = "2-Point Field Goal Made")]
    TwoPointMade,
    #[serde(rename = "2-Point Field Goal Attempt")]
    TwoPointAttempt,
    #[serde(rename = "3-Point Field Goal Made")]
    ThreePointMade,
    #[serde(rename = "3-Point Field Goal Attempt")]
    ThreePointAttempt,
    #[serde(rename = "Assist")]
    Assist,
    #[serde(rename = "Time running out")]
    TimeRunningOut,
}

impl EventKind {
    /// Catalog order; `code()` is the 1-based position in this list
    pub const ALL: [EventKind; 18] = [
        EventKind::Turnover,
        EventKind::Steal,
        EventKind::Block,
        EventKind::OffensiveRebound,
        EventKind::DefensiveRebound,
        EventKind::PersonalFoul,
        EventKind::TechnicalFoul,
        EventKind::FlagrantFoul,
        EventKind::OffensiveFoul,
        EventKind::Substitution,
        EventKind::FreeThrowMade,
        EventKind::FreeThrowAttempt,
        EventKind::TwoPointMade,
        EventKind::TwoPointAttempt,
        EventKind::ThreePointMade,
        EventKind::ThreePointAttempt,
        EventKind::Assist,
        EventKind::TimeRunningOut,
    ];

    /// Name as stored in the event catalog
    pub fn as_str(self) -> &'static str {
        match self {
            EventKind::Turnover => "Turnover",
            EventKind::Steal => "Steal",
            EventKind::Block => "Block",
            EventKind::OffensiveRebound => "Offensive Rebound",
            EventKind::DefensiveRebound => "Defensive Rebound",
            EventKind::PersonalFoul => "Personal Foul",
            EventKind::TechnicalFoul => "Technical Foul",
            EventKind::FlagrantFoul => "Flagrant Foul",
            EventKind::OffensiveFoul => "Offensive Foul",
            EventKind::Substitution => "Substitution",
            EventKind::FreeThrowMade => "Free Throw Made",
            EventKind::FreeThrowAttempt => "Free Throw Attempt",
            EventKind::TwoPointMade => "2-Point Field Goal Made",
            EventKind::TwoPointAttempt => "2-Point Field Goal Attempt",
            EventKind::ThreePointMade => "3-Point Field Goal Made",
            EventKind::ThreePointAttempt => "3-Point Field Goal Attempt",
            EventKind::Assist => "Assist",
            EventKind::TimeRunningOut => "Time running out",
        }
    }

    /// Catalog code (1..=18)
    pub fn code(self) -> u8 {
        Self::ALL
            .iter()
            .position(|&k| k == self)
            .map(|i| i as u8 + 1)
            .unwrap_or(0)
    }

    pub fn from_code(code: u8) -> Option<Self> {
        if code == 0 {
            return None;
        }
        Self::ALL.get(code as usize - 1).copied()
    }

    /// Points credited to the actor's team
    pub fn points(self) -> u32 {
        match self {
            EventKind::ThreePointMade => 3,
            EventKind::TwoPointMade => 2,
            EventKind::FreeThrowMade => 1,
            _ => 0,
        }
    }

    /// Fouls charged to the actor
    pub fn is_foul(self) -> bool {
        matches!(
            self,
            EventKind::PersonalFoul
                | EventKind::OffensiveFoul
                | EventKind::TechnicalFoul
                | EventKind::FlagrantFoul
        )
    }

    pub fn is_made_basket(self) -> bool {
        matches!(self, EventKind::TwoPointMade | EventKind::ThreePointMade)
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Event name outside the catalog
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown event kind: {0:?}")]
pub struct UnknownEventKind(pub String);

impl FromStr for EventKind {
    type Err = UnknownEventKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| UnknownEventKind(s.to_string()))
    }
}

// ============================================================================
// GAME EVENT
// ============================================================================

/// One play-by-play row
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameEvent {
    pub match_id: MatchId,
    /// Position in the match's event stream; `(match_id, sequence)` is the row identity
    pub sequence: u32,
    /// Player or coach credited with the event
    pub actor: PersonId,
    pub kind: EventKind,
    /// Wall-clock game time
    pub at: NaiveDateTime,
}
