//! Season layouts - the ordered stages of one competition format
//!
//! Level 4 - Configuration
//!
//! A layout only describes how the field flows from stage to stage; the
//! orchestrator is layout-agnostic and runs whatever validates here.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Who leaves a group stage
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Qualify {
    /// Top `k` of each group advance
    Top(usize),
    /// Top `direct` advance; places `direct+1` and `direct+2` meet in a play-in
    TopWithPlayIn { direct: usize },
}

/// What happens to knockout losers
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum LoserRoute {
    Eliminated,
    /// Losers meet in a third-place match played with the next stage
    ThirdPlace,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum StageFormat {
    Groups {
        group_size: usize,
        /// 1 = single round robin, 2 = double
        legs: u32,
        qualify: Qualify,
    },
    PlayIn {
        best_of: u32,
    },
    Knockout {
        best_of: u32,
        losers: LoserRoute,
    },
}

impl StageFormat {
    /// Season phase: 1 for group play, 2 for knockout play
    pub fn phase(&self) -> u32 {
        match self {
            StageFormat::Groups { .. } => 1,
            StageFormat::PlayIn { .. } | StageFormat::Knockout { .. } => 2,
        }
    }
}

/// One stage of a season
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageSpec {
    pub name: String,
    pub format: StageFormat,
    /// Days from the previous stage's start (the season start for the first stage)
    #[serde(default)]
    pub days_after_previous: u32,
    #[serde(default = "default_round_gap")]
    pub days_between_rounds: u32,
    #[serde(default = "default_game_gap")]
    pub days_between_games: u32,
    /// Shuffle the incoming field before drawing groups or pairs
    #[serde(default)]
    pub redraw: bool,
}

fn default_round_gap() -> u32 {
    7
}

fn default_game_gap() -> u32 {
    3
}

impl StageSpec {
    pub fn new(name: &str, format: StageFormat) -> Self {
        Self {
            name: name.to_string(),
            format,
            days_after_previous: 0,
            days_between_rounds: default_round_gap(),
            days_between_games: default_game_gap(),
            redraw: false,
        }
    }

    pub fn after(mut self, days: u32) -> Self {
        self.days_after_previous = days;
        self
    }

    pub fn games_apart(mut self, days: u32) -> Self {
        self.days_between_games = days;
        self
    }

    pub fn redrawn(mut self) -> Self {
        self.redraw = true;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LayoutError {
    #[error("layout has no stages")]
    Empty,

    #[error("stage '{stage}': {field} teams cannot be split into groups of {group_size}")]
    UnevenGroups {
        stage: String,
        field: usize,
        group_size: usize,
    },

    #[error("stage '{stage}': {places} places do not fit groups of {group_size}")]
    QualifyOutOfRange {
        stage: String,
        places: usize,
        group_size: usize,
    },

    #[error("stage '{stage}': no play-in pairs to play")]
    PlayInWithoutSource { stage: String },

    #[error("stage '{stage}': play-in pairs from the previous stage are never played")]
    PlayInNotConsumed { stage: String },

    #[error("stage '{stage}': knockout needs an even field of at least 2, got {field}")]
    BadKnockoutField { stage: String, field: usize },

    #[error("stage '{stage}': best-of must be odd, got {best_of}")]
    EvenBestOf { stage: String, best_of: u32 },

    #[error("stage '{stage}': third-place routing needs 4 teams and a following final")]
    ThirdPlaceWithoutFinal { stage: String },

    #[error("layout ends with {remaining} teams instead of one champion")]
    NoChampion { remaining: usize },
}

/// Ordered stages of one competition format
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeasonLayout {
    pub name: String,
    pub stages: Vec<StageSpec>,
}

impl Default for SeasonLayout {
    fn default() -> Self {
        Self::champions_league()
    }
}

impl SeasonLayout {
    /// 32 teams: 8 groups of 4 (double round robin, winners through, 2nd v 3rd
    /// play-ins), 4 groups of 4 (top 2), best-of-3 quarter-finals, Final Four
    pub fn champions_league() -> Self {
        Self {
            name: "Champions League".to_string(),
            stages: vec![
                StageSpec::new(
                    "Regular Season",
                    StageFormat::Groups {
                        group_size: 4,
                        legs: 2,
                        qualify: Qualify::TopWithPlayIn { direct: 1 },
                    },
                )
                .redrawn(),
                StageSpec::new("Play-Ins", StageFormat::PlayIn { best_of: 3 }).after(70),
                StageSpec::new(
                    "Round of 16",
                    StageFormat::Groups {
                        group_size: 4,
                        legs: 2,
                        qualify: Qualify::Top(2),
                    },
                )
                .after(20)
                .redrawn(),
                StageSpec::new(
                    "Quarter-Finals",
                    StageFormat::Knockout {
                        best_of: 3,
                        losers: LoserRoute::Eliminated,
                    },
                )
                .after(60)
                .redrawn(),
                StageSpec::new(
                    "Semi-Finals",
                    StageFormat::Knockout {
                        best_of: 1,
                        losers: LoserRoute::ThirdPlace,
                    },
                )
                .after(30),
                StageSpec::new(
                    "Final",
                    StageFormat::Knockout {
                        best_of: 1,
                        losers: LoserRoute::Eliminated,
                    },
                )
                .after(2),
            ],
        }
    }

    /// 8 teams: 2 groups of 4 (single round robin, top 2), semis, final
    pub fn compact() -> Self {
        Self {
            name: "Compact Cup".to_string(),
            stages: vec![
                StageSpec::new(
                    "Groups",
                    StageFormat::Groups {
                        group_size: 4,
                        legs: 1,
                        qualify: Qualify::Top(2),
                    },
                ),
                StageSpec::new(
                    "Semi-Finals",
                    StageFormat::Knockout {
                        best_of: 1,
                        losers: LoserRoute::ThirdPlace,
                    },
                )
                .after(28),
                StageSpec::new(
                    "Final",
                    StageFormat::Knockout {
                        best_of: 1,
                        losers: LoserRoute::Eliminated,
                    },
                )
                .after(2),
            ],
        }
    }

    /// Smallest field this layout accepts
    pub fn team_count(&self) -> Option<usize> {
        (2..=1024).find(|&n| self.validate(n).is_ok())
    }

    /// Check the field flows through every stage down to one champion
    ///
    /// Returns the field size entering each stage.
    pub fn validate(&self, team_count: usize) -> Result<Vec<usize>, LayoutError> {
        if self.stages.is_empty() {
            return Err(LayoutError::Empty);
        }

        let mut field = team_count;
        let mut play_in_pairs = 0usize;
        let mut third_place_pending = false;
        let mut entering = Vec::with_capacity(self.stages.len());

        for spec in &self.stages {
            let stage = || spec.name.clone();
            entering.push(field);

            if third_place_pending {
                if !matches!(spec.format, StageFormat::Knockout { .. }) || field != 2 {
                    return Err(LayoutError::ThirdPlaceWithoutFinal { stage: stage() });
                }
                third_place_pending = false;
            }
            if play_in_pairs > 0 && !matches!(spec.format, StageFormat::PlayIn { .. }) {
                return Err(LayoutError::PlayInNotConsumed { stage: stage() });
            }

            match spec.format {
                StageFormat::Groups {
                    group_size,
                    qualify,
                    ..
                } => {
                    if group_size < 2 || field < group_size || field % group_size != 0 {
                        return Err(LayoutError::UnevenGroups {
                            stage: stage(),
                            field,
                            group_size,
                        });
                    }
                    let groups = field / group_size;
                    let places = match qualify {
                        Qualify::Top(k) => k,
                        Qualify::TopWithPlayIn { direct } => direct + 2,
                    };
                    if places == 0 || places > group_size {
                        return Err(LayoutError::QualifyOutOfRange {
                            stage: stage(),
                            places,
                            group_size,
                        });
                    }
                    match qualify {
                        Qualify::Top(k) => field = groups * k,
                        Qualify::TopWithPlayIn { direct } => {
                            field = groups * direct;
                            play_in_pairs = groups;
                        }
                    }
                }
                StageFormat::PlayIn { best_of } => {
                    if play_in_pairs == 0 {
                        return Err(LayoutError::PlayInWithoutSource { stage: stage() });
                    }
                    check_best_of(spec, best_of)?;
                    field += play_in_pairs;
                    play_in_pairs = 0;
                }
                StageFormat::Knockout { best_of, losers } => {
                    if field < 2 || field % 2 != 0 {
                        return Err(LayoutError::BadKnockoutField {
                            stage: stage(),
                            field,
                        });
                    }
                    check_best_of(spec, best_of)?;
                    if losers == LoserRoute::ThirdPlace {
                        if field != 4 {
                            return Err(LayoutError::ThirdPlaceWithoutFinal { stage: stage() });
                        }
                        third_place_pending = true;
                    }
                    field /= 2;
                }
            }
        }

        if let Some(last) = self.stages.last() {
            if third_place_pending {
                return Err(LayoutError::ThirdPlaceWithoutFinal {
                    stage: last.name.clone(),
                });
            }
            if play_in_pairs > 0 {
                return Err(LayoutError::PlayInNotConsumed {
                    stage: last.name.clone(),
                });
            }
        }
        if field != 1 {
            return Err(LayoutError::NoChampion { remaining: field });
        }
        Ok(entering)
    }

    /// Load a layout from a JSON file
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Save a layout to a JSON file
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

fn check_best_of(spec: &StageSpec, best_of: u32) -> Result<(), LayoutError> {
    if best_of % 2 == 0 {
        return Err(LayoutError::EvenBestOf {
            stage: spec.name.clone(),
            best_of,
        });
    }
    Ok(())
}
