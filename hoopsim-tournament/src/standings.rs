//! Stage standings - win/loss records from completed fixtures
//!
//! Level 3 - Steps
//!
//! Standings live for one stage only: they rank the field for qualification
//! and are dropped once the next stage's field is fixed.

use hoopsim_core::{MatchFixture, MatchResult, TeamId};
use rustc_hash::FxHashMap;
use serde::Serialize;
use std::cmp::Ordering;

/// One team's record within a stage
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Record {
    pub wins: u32,
    pub losses: u32,
    pub points_for: u32,
    pub points_against: u32,
}

impl Record {
    pub fn games(&self) -> u32 {
        self.wins + self.losses
    }

    pub fn point_difference(&self) -> i64 {
        i64::from(self.points_for) - i64::from(self.points_against)
    }

    /// Better record first: wins, then point difference, then points scored
    fn compare(&self, other: &Record) -> Ordering {
        other
            .wins
            .cmp(&self.wins)
            .then(other.point_difference().cmp(&self.point_difference()))
            .then(other.points_for.cmp(&self.points_for))
    }
}

/// Records of every team in one stage
#[derive(Clone, Debug, Default)]
pub struct StageStandings {
    records: FxHashMap<TeamId, Record>,
}

impl StageStandings {
    /// Empty records for `teams`
    pub fn new(teams: &[TeamId]) -> Self {
        Self {
            records: teams.iter().map(|&t| (t, Record::default())).collect(),
        }
    }

    /// Aggregate results of the completed fixtures among `fixtures`
    pub fn from_results(teams: &[TeamId], fixtures: &[MatchFixture], results: &[MatchResult]) -> Self {
        let mut standings = Self::new(teams);
        let by_id: FxHashMap<_, _> = results.iter().map(|r| (r.match_id, r)).collect();
        for fixture in fixtures.iter().filter(|f| f.is_completed()) {
            if let Some(result) = by_id.get(&fixture.id) {
                standings.record(fixture, result);
            }
        }
        standings
    }

    /// Add one result to both teams' records
    pub fn record(&mut self, fixture: &MatchFixture, result: &MatchResult) {
        let home = self.records.entry(fixture.home).or_default();
        home.points_for += result.home_score;
        home.points_against += result.away_score;
        if result.winner == fixture.home {
            home.wins += 1;
        } else {
            home.losses += 1;
        }

        let away = self.records.entry(fixture.away).or_default();
        away.points_for += result.away_score;
        away.points_against += result.home_score;
        if result.winner == fixture.away {
            away.wins += 1;
        } else {
            away.losses += 1;
        }
    }

    pub fn get(&self, team: TeamId) -> Record {
        self.records.get(&team).copied().unwrap_or_default()
    }

    /// `teams` best first; full ties keep their given order
    pub fn rank(&self, teams: &[TeamId]) -> Vec<TeamId> {
        let mut ranked = teams.to_vec();
        ranked.sort_by(|a, b| self.get(*a).compare(&self.get(*b)));
        ranked
    }

    /// Ranked `(team, record)` rows for reporting
    pub fn table(&self, teams: &[TeamId]) -> Vec<(TeamId, Record)> {
        self.rank(teams).into_iter().map(|t| (t, self.get(t))).collect()
    }
}
