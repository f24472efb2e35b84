//! Schedule generation - round-robin pairings and best-of-N series
//!
//! Level 3 - Steps

use hoopsim_core::TeamId;
use rand::Rng;
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};

/// One scheduled game between two competitors
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Pairing {
    /// Round number (1-based)
    pub round: u32,
    pub home: TeamId,
    pub away: TeamId,
}

impl Pairing {
    pub fn reversed(self) -> Self {
        Self {
            round: self.round,
            home: self.away,
            away: self.home,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScheduleError {
    #[error("at least 2 competitors are needed, got {0}")]
    TooFewCompetitors(usize),

    #[error("competitor {0} appears more than once")]
    DuplicateCompetitor(TeamId),

    #[error("best-of must be odd, got {0}")]
    EvenBestOf(u32),

    #[error("team {0} is not part of this series")]
    NotInSeries(TeamId),

    #[error("series between {0} and {1} is already decided")]
    SeriesOver(TeamId, TeamId),
}

fn validate(competitors: &[TeamId]) -> Result<(), ScheduleError> {
    if competitors.len() < 2 {
        return Err(ScheduleError::TooFewCompetitors(competitors.len()));
    }
    let mut seen = FxHashSet::default();
    for &team in competitors {
        if !seen.insert(team) {
            return Err(ScheduleError::DuplicateCompetitor(team));
        }
    }
    Ok(())
}

// ============================================================================
// ROUND ROBIN
// ============================================================================

/// Rounds in a single round robin over `competitors` teams (a bye pads odd fields)
pub fn round_count(competitors: usize) -> u32 {
    let padded = competitors + competitors % 2;
    padded.saturating_sub(1) as u32
}

/// Single round robin by the circle method
///
/// Index 0 stays fixed and alternates home/away between rounds; the other slots
/// rotate by one each round. An odd field is padded with a bye, and bye pairings
/// are dropped.
pub fn single_round_robin(competitors: &[TeamId]) -> Result<Vec<Pairing>, ScheduleError> {
    validate(competitors)?;

    let mut slots: Vec<Option<TeamId>> = competitors.iter().copied().map(Some).collect();
    if slots.len() % 2 == 1 {
        slots.push(None);
    }
    let n = slots.len();
    let mut pairings = Vec::with_capacity(n / 2 * (n - 1));

    for r in 0..n - 1 {
        let round = r as u32 + 1;
        for i in 0..n / 2 {
            let (a, b) = (slots[i], slots[n - 1 - i]);
            let (home, away) = if i == 0 && r % 2 == 1 { (b, a) } else { (a, b) };
            if let (Some(home), Some(away)) = (home, away) {
                pairings.push(Pairing { round, home, away });
            }
        }
        if let Some(last) = slots.pop() {
            slots.insert(1, last);
        }
    }
    Ok(pairings)
}

/// Second leg: every pairing reversed, rounds continuing after the first leg
pub fn mirror(first_leg: &[Pairing]) -> Vec<Pairing> {
    let offset = first_leg.iter().map(|p| p.round).max().unwrap_or(0);
    first_leg
        .iter()
        .map(|p| Pairing {
            round: p.round + offset,
            ..p.reversed()
        })
        .collect()
}

/// Single round robin followed by its mirror
pub fn double_round_robin(competitors: &[TeamId]) -> Result<Vec<Pairing>, ScheduleError> {
    let mut pairings = single_round_robin(competitors)?;
    let second_leg = mirror(&pairings);
    pairings.extend(second_leg);
    Ok(pairings)
}

/// Flip home/away of each pairing independently with probability 1/2
pub fn shuffle_home_away<R: Rng + ?Sized>(pairings: &mut [Pairing], rng: &mut R) {
    for pairing in pairings.iter_mut() {
        if rng.gen_bool(0.5) {
            *pairing = pairing.reversed();
        }
    }
}

/// Round robin with one or two legs, optionally shuffling home/away before mirroring
pub fn round_robin<R: Rng + ?Sized>(
    competitors: &[TeamId],
    legs: u32,
    shuffle: bool,
    rng: &mut R,
) -> Result<Vec<Pairing>, ScheduleError> {
    let mut pairings = single_round_robin(competitors)?;
    if shuffle {
        shuffle_home_away(&mut pairings, rng);
    }
    if legs >= 2 {
        let second_leg = mirror(&pairings);
        pairings.extend(second_leg);
    }
    Ok(pairings)
}

// ============================================================================
// SERIES
// ============================================================================

/// Best-of-N series between two seeds
///
/// The high seed hosts odd-numbered games, the low seed even ones. No game is
/// generated once either side has the clinching number of wins.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Series {
    pub high_seed: TeamId,
    pub low_seed: TeamId,
    pub best_of: u32,
    high_wins: u32,
    low_wins: u32,
}

impl Series {
    pub fn new(high_seed: TeamId, low_seed: TeamId, best_of: u32) -> Result<Self, ScheduleError> {
        if high_seed == low_seed {
            return Err(ScheduleError::DuplicateCompetitor(high_seed));
        }
        if best_of % 2 == 0 {
            return Err(ScheduleError::EvenBestOf(best_of));
        }
        Ok(Self {
            high_seed,
            low_seed,
            best_of,
            high_wins: 0,
            low_wins: 0,
        })
    }

    /// Default best-of-3
    pub fn best_of_three(high_seed: TeamId, low_seed: TeamId) -> Result<Self, ScheduleError> {
        Self::new(high_seed, low_seed, 3)
    }

    pub fn wins_needed(&self) -> u32 {
        self.best_of / 2 + 1
    }

    pub fn games_played(&self) -> u32 {
        self.high_wins + self.low_wins
    }

    pub fn wins(&self, team: TeamId) -> u32 {
        if team == self.high_seed {
            self.high_wins
        } else if team == self.low_seed {
            self.low_wins
        } else {
            0
        }
    }

    pub fn is_decided(&self) -> bool {
        self.winner().is_some()
    }

    pub fn winner(&self) -> Option<TeamId> {
        let needed = self.wins_needed();
        if self.high_wins >= needed {
            Some(self.high_seed)
        } else if self.low_wins >= needed {
            Some(self.low_seed)
        } else {
            None
        }
    }

    pub fn loser(&self) -> Option<TeamId> {
        self.winner().map(|w| if w == self.high_seed { self.low_seed } else { self.high_seed })
    }

    /// Next game to schedule, `None` once the series is decided
    pub fn next_game(&self) -> Option<Pairing> {
        if self.is_decided() {
            return None;
        }
        let game = self.games_played() + 1;
        let (home, away) = if game % 2 == 1 {
            (self.high_seed, self.low_seed)
        } else {
            (self.low_seed, self.high_seed)
        };
        Some(Pairing { round: game, home, away })
    }

    /// Record the winner of the latest game
    pub fn record(&mut self, winner: TeamId) -> Result<(), ScheduleError> {
        if self.is_decided() {
            return Err(ScheduleError::SeriesOver(self.high_seed, self.low_seed));
        }
        if winner == self.high_seed {
            self.high_wins += 1;
        } else if winner == self.low_seed {
            self.low_wins += 1;
        } else {
            return Err(ScheduleError::NotInSeries(winner));
        }
        Ok(())
    }
}
