//! Configuration types for a season run
//!
//! Level 4 - Utilities and configuration

use chrono::{NaiveDate, NaiveTime};
use hoopsim_core::SimRules;
use serde::{Deserialize, Serialize};

use crate::layout::SeasonLayout;

/// First match id handed out when none is configured
pub const DEFAULT_FIRST_MATCH_ID: u64 = 70000;

/// Opening day of a season: October 1st
pub fn season_opening(year: i32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, 10, 1).unwrap_or_default()
}

fn default_tip_off() -> NaiveTime {
    NaiveTime::from_hms_opt(20, 0, 0).unwrap_or_default()
}

/// Everything needed to run one season
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeasonConfig {
    pub year: i32,
    /// First day of the first stage
    pub start: NaiveDate,
    /// Local tip-off time of every fixture
    pub tip_off: NaiveTime,
    pub layout: SeasonLayout,
    pub rules: SimRules,
    pub first_match_id: u64,
    /// Randomize home/away of first-leg group pairings
    pub shuffle_home_away: bool,
}

impl Default for SeasonConfig {
    fn default() -> Self {
        Self::for_year(2024)
    }
}

impl SeasonConfig {
    /// Default champions-league season opening on October 1st of `year`
    pub fn for_year(year: i32) -> Self {
        Self {
            year,
            start: season_opening(year),
            tip_off: default_tip_off(),
            layout: SeasonLayout::champions_league(),
            rules: SimRules::default(),
            first_match_id: DEFAULT_FIRST_MATCH_ID,
            shuffle_home_away: true,
        }
    }

    /// Set layout
    pub fn with_layout(mut self, layout: SeasonLayout) -> Self {
        self.layout = layout;
        self
    }

    /// Set simulation rules
    pub fn with_rules(mut self, rules: SimRules) -> Self {
        self.rules = rules;
        self
    }

    /// Set first match id
    pub fn with_first_match_id(mut self, id: u64) -> Self {
        self.first_match_id = id;
        self
    }

    /// Set the first day of the season
    pub fn with_start(mut self, start: NaiveDate) -> Self {
        self.start = start;
        self
    }
}
