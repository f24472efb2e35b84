//! Rosters and the roster provider seam

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::ids::{PersonId, TeamId};

/// Players needed on court at all times
pub const STARTERS: usize = 5;

/// One team's active personnel, snapshotted per match
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Roster {
    /// Players in rotation order; the first five start, the rest form the bench
    pub players: Vec<PersonId>,
    /// Coaching staff (only ever charged with technical fouls)
    #[serde(default)]
    pub coaches: Vec<PersonId>,
}

impl Roster {
    pub fn new(players: Vec<PersonId>, coaches: Vec<PersonId>) -> Self {
        Self { players, coaches }
    }

    /// Whether there are enough players for a starting five
    pub fn can_field_team(&self) -> bool {
        self.players.len() >= STARTERS
    }

    pub fn starters(&self) -> &[PersonId] {
        &self.players[..self.players.len().min(STARTERS)]
    }

    pub fn bench(&self) -> &[PersonId] {
        &self.players[self.players.len().min(STARTERS)..]
    }

    pub fn has_player(&self, person: PersonId) -> bool {
        self.players.contains(&person)
    }

    pub fn has_coach(&self, person: PersonId) -> bool {
        self.coaches.contains(&person)
    }

    /// Player or coach of this team
    pub fn contains(&self, person: PersonId) -> bool {
        self.has_player(person) || self.has_coach(person)
    }
}

/// Read-only source of team rosters
pub trait RosterProvider {
    /// Fresh snapshot of a team's roster, `None` when no roster data exists
    fn roster_of(&self, team: TeamId) -> Option<Roster>;
}

impl RosterProvider for FxHashMap<TeamId, Roster> {
    fn roster_of(&self, team: TeamId) -> Option<Roster> {
        self.get(&team).cloned()
    }
}
