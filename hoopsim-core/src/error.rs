//! Simulator errors

use rand::distributions::WeightedError;

use crate::ids::TeamId;
use crate::lineup::LineupError;

/// Error types for match simulation
#[derive(Debug, thiserror::Error)]
pub enum SimError {
    #[error("team {team} has {players} players, {required} needed to start")]
    ShortRoster {
        team: TeamId,
        players: usize,
        required: usize,
    },

    #[error("invalid outcome weights: {0}")]
    Weights(#[from] WeightedError),

    #[error(transparent)]
    Lineup(#[from] LineupError),
}
