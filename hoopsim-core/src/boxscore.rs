//! Box score - per-player and per-team totals replayed from an event stream

use rustc_hash::FxHashMap;
use serde::Serialize;

use crate::event::{EventKind, GameEvent};
use crate::fixture::Side;
use crate::ids::PersonId;
use crate::roster::Roster;

/// Counting stats for one player (or coach, for technicals)
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct PlayerLine {
    pub points: u32,
    pub field_goals_made: u32,
    pub field_goals_attempted: u32,
    pub threes_made: u32,
    pub free_throws_made: u32,
    pub free_throws_attempted: u32,
    pub rebounds: u32,
    pub assists: u32,
    pub steals: u32,
    pub blocks: u32,
    pub turnovers: u32,
    pub fouls: u32,
}

impl PlayerLine {
    fn record(&mut self, kind: EventKind) {
        self.points += kind.points();
        match kind {
            EventKind::TwoPointMade => {
                self.field_goals_made += 1;
                self.field_goals_attempted += 1;
            }
            EventKind::ThreePointMade => {
                self.field_goals_made += 1;
                self.field_goals_attempted += 1;
                self.threes_made += 1;
            }
            EventKind::TwoPointAttempt | EventKind::ThreePointAttempt => {
                self.field_goals_attempted += 1;
            }
            EventKind::FreeThrowMade => {
                self.free_throws_made += 1;
                self.free_throws_attempted += 1;
            }
            EventKind::FreeThrowAttempt => self.free_throws_attempted += 1,
            EventKind::OffensiveRebound | EventKind::DefensiveRebound => self.rebounds += 1,
            EventKind::Assist => self.assists += 1,
            EventKind::Steal => self.steals += 1,
            EventKind::Block => self.blocks += 1,
            EventKind::Turnover | EventKind::TimeRunningOut => self.turnovers += 1,
            k if k.is_foul() => self.fouls += 1,
            _ => {}
        }
    }
}

/// Totals for both sides of one match
#[derive(Clone, Debug, Default, Serialize)]
pub struct BoxScore {
    pub home_points: u32,
    pub away_points: u32,
    pub players: FxHashMap<PersonId, PlayerLine>,
    /// Events whose actor belongs to neither roster
    pub unattributed: usize,
}

impl BoxScore {
    /// Replay events against the two rosters that took part
    pub fn from_events(events: &[GameEvent], home: &Roster, away: &Roster) -> Self {
        let mut score = Self::default();
        for event in events {
            let side = if home.contains(event.actor) {
                Side::Home
            } else if away.contains(event.actor) {
                Side::Away
            } else {
                score.unattributed += 1;
                continue;
            };
            match side {
                Side::Home => score.home_points += event.kind.points(),
                Side::Away => score.away_points += event.kind.points(),
            }
            score.players.entry(event.actor).or_default().record(event.kind);
        }
        score
    }

    pub fn points(&self, side: Side) -> u32 {
        match side {
            Side::Home => self.home_points,
            Side::Away => self.away_points,
        }
    }

    pub fn line(&self, player: PersonId) -> Option<&PlayerLine> {
        self.players.get(&player)
    }

    /// Highest scorer and points, ties broken by lower id
    pub fn top_scorer(&self) -> Option<(PersonId, u32)> {
        self.players
            .iter()
            .map(|(&id, line)| (id, line.points))
            .max_by(|a, b| a.1.cmp(&b.1).then(b.0.cmp(&a.0)))
    }
}
