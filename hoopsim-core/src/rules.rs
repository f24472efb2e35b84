//! Simulation rules - clock lengths and outcome probabilities
//!
//! Level 4 - Configuration

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Relative weights of the three possession outcome classes
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct OutcomeWeights {
    pub turnover: f64,
    pub foul: f64,
    pub shot: f64,
}

impl Default for OutcomeWeights {
    fn default() -> Self {
        Self {
            turnover: 0.15,
            foul: 0.15,
            shot: 0.70,
        }
    }
}

/// Relative weights of foul types, most to least likely
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct FoulWeights {
    pub personal: f64,
    pub offensive: f64,
    pub technical: f64,
    pub flagrant: f64,
}

impl Default for FoulWeights {
    fn default() -> Self {
        Self {
            personal: 70.0,
            offensive: 15.0,
            technical: 10.0,
            flagrant: 5.0,
        }
    }
}

/// Rules and probabilities for one simulated match
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimRules {
    /// Length of each quarter
    pub quarter_minutes: u32,
    /// Inclusive range of seconds one possession consumes
    pub possession_seconds: (u32, u32),
    pub outcome_weights: OutcomeWeights,
    pub foul_weights: FoulWeights,
    /// Personal fouls that disqualify a player
    pub foul_out: u32,
    /// Team fouls in a quarter after which personal fouls award free throws
    pub bonus_threshold: u32,
    pub bonus_free_throws: u32,
    pub flagrant_free_throws: u32,
    pub technical_free_throws: u32,
    /// Chance a technical foul is charged to a coach instead of a player
    pub coach_technical_rate: f64,
    pub three_point_rate: f64,
    pub field_goal_rate: f64,
    pub free_throw_rate: f64,
    pub and_one_rate: f64,
    pub block_rate: f64,
    pub defensive_rebound_rate: f64,
    /// Chance per possession of a rotation substitution
    pub rotation_rate: f64,
}

impl Default for SimRules {
    fn default() -> Self {
        Self {
            quarter_minutes: 10,
            possession_seconds: (8, 24),
            outcome_weights: OutcomeWeights::default(),
            foul_weights: FoulWeights::default(),
            foul_out: 5,
            bonus_threshold: 4,
            bonus_free_throws: 2,
            flagrant_free_throws: 2,
            technical_free_throws: 1,
            coach_technical_rate: 0.2,
            three_point_rate: 0.35,
            field_goal_rate: 0.5,
            free_throw_rate: 0.5,
            and_one_rate: 0.05,
            block_rate: 0.10,
            defensive_rebound_rate: 0.75,
            rotation_rate: 0.04,
        }
    }
}

impl SimRules {
    /// Set quarter length
    pub fn with_quarter_minutes(mut self, minutes: u32) -> Self {
        self.quarter_minutes = minutes;
        self
    }

    /// Set the personal-foul disqualification threshold
    pub fn with_foul_out(mut self, fouls: u32) -> Self {
        self.foul_out = fouls;
        self
    }

    /// Set outcome class weights
    pub fn with_outcome_weights(mut self, weights: OutcomeWeights) -> Self {
        self.outcome_weights = weights;
        self
    }

    /// Load from JSON file; fields left out keep their defaults
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let rules: SimRules = serde_json::from_str(&content)?;
        Ok(rules)
    }

    pub fn quarter_seconds(&self) -> i64 {
        i64::from(self.quarter_minutes) * 60
    }

    /// Possession length range, ordered and at least one second
    pub fn possession_range(&self) -> (i64, i64) {
        let (a, b) = self.possession_seconds;
        let lo = a.min(b).max(1);
        let hi = a.max(b).max(1);
        (i64::from(lo), i64::from(hi))
    }
}
