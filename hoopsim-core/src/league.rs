//! League - teams, venues and rosters for one run
//!
//! A league is the roster provider the engine reads from. It can be loaded from
//! JSON or generated synthetically (one coach and N players per team, one home
//! venue per team).

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::ids::{PersonId, TeamId, VenueId};
use crate::roster::{Roster, RosterProvider};

/// First team id handed out by the generator
pub const FIRST_TEAM_ID: u32 = 1000;

/// First person id handed out by the generator
pub const FIRST_PERSON_ID: u32 = 50000;

/// Default squad size for generated teams
pub const PLAYERS_PER_TEAM: usize = 12;

const CITIES: [&str; 32] = [
    "Athens", "Belgrade", "Madrid", "Istanbul", "Kaunas", "Milan", "Tel Aviv", "Munich",
    "Barcelona", "Vitoria", "Valencia", "Piraeus", "Bologna", "Berlin", "Monaco", "Paris",
    "Lyon", "Zagreb", "Podgorica", "Malaga", "Tenerife", "Bursa", "Ankara", "Riga",
    "Vilnius", "Bamberg", "Ulm", "Venice", "Sassari", "Strasbourg", "Dijon", "Ljubljana",
];

const SPONSORS: [&str; 16] = [
    "Harbor", "Summit", "Aurora", "Granite", "Meridian", "Beacon", "Cedar", "Atlas",
    "Orion", "Falcon", "Pioneer", "Crescent", "Vertex", "Sterling", "Horizon", "Northwind",
];

/// Stadium a team hosts its home fixtures in
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Venue {
    pub id: VenueId,
    pub name: String,
    pub city: String,
    pub capacity: u32,
}

/// A competitor and the roster it owns
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Team {
    pub id: TeamId,
    pub name: String,
    /// Assigned home venue
    pub venue: VenueId,
    pub roster: Roster,
}

/// All teams and venues taking part in a run
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct League {
    pub name: String,
    pub venues: Vec<Venue>,
    pub teams: Vec<Team>,
}

impl League {
    /// Generate a synthetic league
    ///
    /// Team ids start at 1000 and person ids at 50000. Each team gets one coach
    /// followed by `players_per_team` players, and its own venue.
    pub fn generate<R: Rng>(rng: &mut R, team_count: usize, players_per_team: usize) -> Self {
        let mut next_person = FIRST_PERSON_ID;
        let mut venues = Vec::with_capacity(team_count);
        let mut teams = Vec::with_capacity(team_count);

        for i in 0..team_count {
            let city = CITIES[i % CITIES.len()];
            let venue = Venue {
                id: VenueId(i as u32 + 1),
                name: format!("{} Arena", SPONSORS[rng.gen_range(0..SPONSORS.len())]),
                city: city.to_string(),
                capacity: rng.gen_range(10_000..=90_000),
            };

            let coach = PersonId(next_person);
            next_person += 1;
            let players: Vec<PersonId> = (0..players_per_team)
                .map(|k| PersonId(next_person + k as u32))
                .collect();
            next_person += players_per_team as u32;

            teams.push(Team {
                id: TeamId(FIRST_TEAM_ID + i as u32),
                name: team_name(city, i / CITIES.len()),
                venue: venue.id,
                roster: Roster::new(players, vec![coach]),
            });
            venues.push(venue);
        }

        Self {
            name: "Synthetic League".to_string(),
            venues,
            teams,
        }
    }

    pub fn team(&self, id: TeamId) -> Option<&Team> {
        self.teams.iter().find(|t| t.id == id)
    }

    pub fn team_ids(&self) -> Vec<TeamId> {
        self.teams.iter().map(|t| t.id).collect()
    }

    /// Display name for a team, falling back to its id
    pub fn team_name(&self, id: TeamId) -> String {
        self.team(id)
            .map(|t| t.name.clone())
            .unwrap_or_else(|| format!("team {}", id))
    }

    /// Home venue of a team
    pub fn venue_of(&self, id: TeamId) -> Option<VenueId> {
        self.team(id).map(|t| t.venue)
    }

    /// Load from JSON file
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let league: League = serde_json::from_str(&content)?;
        Ok(league)
    }

    /// Save to JSON file
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

impl RosterProvider for League {
    fn roster_of(&self, team: TeamId) -> Option<Roster> {
        self.team(team).map(|t| t.roster.clone())
    }
}

fn team_name(city: &str, cycle: usize) -> String {
    if cycle == 0 {
        format!("{} BC", city)
    } else {
        format!("{} BC {}", city, cycle + 1)
    }
}
