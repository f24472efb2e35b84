//! Lineup - on-court five and bench for one side of a match
//!
//! On-court and bench are disjoint owned collections. Every change goes through
//! `substitute`, which moves both players in one step.

use rand::Rng;
use std::collections::VecDeque;

use crate::ids::PersonId;
use crate::roster::{Roster, STARTERS};

/// Where the outgoing player goes
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Exit {
    /// Back of the bench, eligible to return
    Bench,
    /// Disqualified for the rest of the match
    FouledOut,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LineupError {
    #[error("player {0} is not on court")]
    NotOnCourt(PersonId),

    #[error("player {0} is not on the bench")]
    NotOnBench(PersonId),
}

/// One side's players during a match
#[derive(Clone, Debug)]
pub struct Lineup {
    on_court: Vec<PersonId>,
    bench: VecDeque<PersonId>,
    fouled_out: Vec<PersonId>,
}

impl Lineup {
    /// Starting five from the roster order, remainder on the bench
    ///
    /// Returns `None` when the roster cannot field five players.
    pub fn from_roster(roster: &Roster) -> Option<Self> {
        if !roster.can_field_team() {
            return None;
        }
        Some(Self {
            on_court: roster.starters().to_vec(),
            bench: roster.bench().iter().copied().collect(),
            fouled_out: Vec::new(),
        })
    }

    pub fn on_court(&self) -> &[PersonId] {
        &self.on_court
    }

    pub fn bench(&self) -> &VecDeque<PersonId> {
        &self.bench
    }

    pub fn fouled_out(&self) -> &[PersonId] {
        &self.fouled_out
    }

    pub fn is_on_court(&self, player: PersonId) -> bool {
        self.on_court.contains(&player)
    }

    pub fn has_bench(&self) -> bool {
        !self.bench.is_empty()
    }

    /// Swap `out` (on court) for `incoming` (on bench)
    pub fn substitute(
        &mut self,
        out: PersonId,
        incoming: PersonId,
        exit: Exit,
    ) -> Result<(), LineupError> {
        let slot = self
            .on_court
            .iter()
            .position(|&p| p == out)
            .ok_or(LineupError::NotOnCourt(out))?;
        let bench_pos = self
            .bench
            .iter()
            .position(|&p| p == incoming)
            .ok_or(LineupError::NotOnBench(incoming))?;

        self.bench.remove(bench_pos);
        self.on_court[slot] = incoming;
        match exit {
            Exit::Bench => self.bench.push_back(out),
            Exit::FouledOut => self.fouled_out.push(out),
        }
        Ok(())
    }

    /// Replace a disqualified player with the front of the bench
    ///
    /// Returns the replacement, or `None` when the bench is empty and the player
    /// has to stay on court.
    pub fn foul_out(&mut self, out: PersonId) -> Result<Option<PersonId>, LineupError> {
        let Some(&incoming) = self.bench.front() else {
            return Ok(None);
        };
        self.substitute(out, incoming, Exit::FouledOut)?;
        Ok(Some(incoming))
    }

    /// Rotation change: front of the bench comes in, `out` goes to the back
    pub fn rotate(&mut self, out: PersonId) -> Result<Option<PersonId>, LineupError> {
        let Some(&incoming) = self.bench.front() else {
            return Ok(None);
        };
        self.substitute(out, incoming, Exit::Bench)?;
        Ok(Some(incoming))
    }

    /// Random on-court player
    pub fn pick<R: Rng + ?Sized>(&self, rng: &mut R) -> PersonId {
        self.on_court[rng.gen_range(0..self.on_court.len())]
    }

    /// Random on-court player other than `excluding`
    pub fn pick_teammate<R: Rng + ?Sized>(&self, rng: &mut R, excluding: PersonId) -> PersonId {
        let candidates: Vec<PersonId> = self
            .on_court
            .iter()
            .copied()
            .filter(|&p| p != excluding)
            .collect();
        candidates[rng.gen_range(0..candidates.len())]
    }

    /// Invariant check: five on court, no player in two places
    pub fn is_consistent(&self) -> bool {
        if self.on_court.len() != STARTERS {
            return false;
        }
        let mut seen: Vec<PersonId> = self
            .on_court
            .iter()
            .chain(self.bench.iter())
            .chain(self.fouled_out.iter())
            .copied()
            .collect();
        let total = seen.len();
        seen.sort();
        seen.dedup();
        seen.len() == total
    }
}
