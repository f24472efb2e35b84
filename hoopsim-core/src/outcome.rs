//! Possession outcome kinds and weighted draws
//!
//! Every random branch of a possession is a closed enum drawn from a
//! `WeightedTable`, so the simulator dispatches on values instead of float
//! thresholds and tests can call a branch with a chosen value.

use rand::distributions::{Distribution, WeightedError, WeightedIndex};
use rand::Rng;

use crate::event::EventKind;

/// Top-level result class of one possession
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PossessionOutcome {
    Turnover,
    Foul,
    Shot,
}

/// How the ball was lost
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TurnoverKind {
    /// Defender steal, logged with the matching turnover
    Steal,
    Unforced,
    /// Shot clock violation
    ShotClock,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FoulKind {
    Personal,
    Offensive,
    Technical,
    Flagrant,
}

impl FoulKind {
    pub fn event(self) -> EventKind {
        match self {
            FoulKind::Personal => EventKind::PersonalFoul,
            FoulKind::Offensive => EventKind::OffensiveFoul,
            FoulKind::Technical => EventKind::TechnicalFoul,
            FoulKind::Flagrant => EventKind::FlagrantFoul,
        }
    }

    /// Whether the foul counts toward the team foul total
    pub fn counts_for_team(self) -> bool {
        !matches!(self, FoulKind::Technical)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ShotKind {
    TwoPointer,
    ThreePointer,
}

impl ShotKind {
    pub fn points(self) -> u32 {
        match self {
            ShotKind::TwoPointer => 2,
            ShotKind::ThreePointer => 3,
        }
    }

    pub fn made_event(self) -> EventKind {
        match self {
            ShotKind::TwoPointer => EventKind::TwoPointMade,
            ShotKind::ThreePointer => EventKind::ThreePointMade,
        }
    }

    pub fn attempt_event(self) -> EventKind {
        match self {
            ShotKind::TwoPointer => EventKind::TwoPointAttempt,
            ShotKind::ThreePointer => EventKind::ThreePointAttempt,
        }
    }
}

/// Who secures a missed shot
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Rebound {
    Defensive,
    Offensive,
}

/// Weighted draw over a closed set of values
#[derive(Clone, Debug)]
pub struct WeightedTable<T: Copy> {
    items: Vec<T>,
    index: WeightedIndex<f64>,
}

impl<T: Copy> WeightedTable<T> {
    /// Build from `(value, weight)` pairs; weights need not sum to one
    pub fn new(entries: &[(T, f64)]) -> Result<Self, WeightedError> {
        let index = WeightedIndex::new(entries.iter().map(|&(_, w)| w))?;
        Ok(Self {
            items: entries.iter().map(|&(item, _)| item).collect(),
            index,
        })
    }

    /// Equal weight for every value
    pub fn uniform(items: &[T]) -> Result<Self, WeightedError> {
        let entries: Vec<(T, f64)> = items.iter().map(|&item| (item, 1.0)).collect();
        Self::new(&entries)
    }

    pub fn draw<R: Rng + ?Sized>(&self, rng: &mut R) -> T {
        self.items[self.index.sample(rng)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_table_respects_weights() {
        let table = WeightedTable::new(&[
            (PossessionOutcome::Turnover, 0.15),
            (PossessionOutcome::Foul, 0.15),
            (PossessionOutcome::Shot, 0.70),
        ])
        .unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(42);

        let draws = 10_000;
        let shots = (0..draws)
            .filter(|_| table.draw(&mut rng) == PossessionOutcome::Shot)
            .count();
        let rate = shots as f64 / draws as f64;
        assert!((rate - 0.70).abs() < 0.03, "shot rate {}", rate);
    }

    #[test]
    fn test_zero_weight_never_drawn() {
        let table = WeightedTable::new(&[(FoulKind::Personal, 1.0), (FoulKind::Flagrant, 0.0)]).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        for _ in 0..500 {
            assert_eq!(table.draw(&mut rng), FoulKind::Personal);
        }
    }

    #[test]
    fn test_invalid_weights() {
        assert!(WeightedTable::<Rebound>::new(&[]).is_err());
        assert!(WeightedTable::new(&[(Rebound::Defensive, 0.0)]).is_err());
        assert!(WeightedTable::new(&[(Rebound::Defensive, -1.0)]).is_err());
    }

    #[test]
    fn test_shot_events() {
        assert_eq!(ShotKind::ThreePointer.points(), 3);
        assert_eq!(ShotKind::TwoPointer.made_event(), EventKind::TwoPointMade);
        assert_eq!(ShotKind::ThreePointer.attempt_event(), EventKind::ThreePointAttempt);
        assert_eq!(ShotKind::TwoPointer.made_event().points(), ShotKind::TwoPointer.points());
    }

    #[test]
    fn test_technical_is_not_a_team_foul() {
        assert!(!FoulKind::Technical.counts_for_team());
        assert!(FoulKind::Flagrant.counts_for_team());
        assert_eq!(FoulKind::Offensive.event(), EventKind::OffensiveFoul);
    }
}
