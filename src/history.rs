use std::collections::HashMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SplitRecord {
    pub games: u32,
    pub average: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContextAdjustments {
    pub role: f64,
    pub tag_risk: f64,
    pub weather: f64,
    pub pace: f64,
    pub team_dynamics: f64,
    pub injury_return: f64,
}

impl Default for ContextAdjustments {
    fn default() -> Self {
        Self {
            role: 1.0,
            tag_risk: 1.0,
            weather: 1.0,
            pace: 1.0,
            team_dynamics: 1.0,
            injury_return: 1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerProfile {
    pub name: String,
    pub team: String,
    pub position: String,
    #[serde(default)]
    pub last_3: Vec<f64>,
    #[serde(default)]
    pub last_5: Vec<f64>,
    #[serde(default)]
    pub season_average: f64,
    #[serde(default)]
    pub games_played: u32,
    #[serde(default)]
    pub ceiling: f64,
    /// Keyed by opponent, any spelling the team directory resolves.
    #[serde(default)]
    pub vs_opponent: HashMap<String, SplitRecord>,
    #[serde(default)]
    pub at_venue: HashMap<String, SplitRecord>,
    #[serde(default)]
    pub adjustments: ContextAdjustments,
}

impl PlayerProfile {
    pub fn new(name: &str, team: &str, position: &str) -> Self {
        Self {
            name: name.to_string(),
            team: team.to_string(),
            position: position.to_string(),
            last_3: Vec::new(),
            last_5: Vec::new(),
            season_average: 0.0,
            games_played: 0,
            ceiling: 0.0,
            vs_opponent: HashMap::new(),
            at_venue: HashMap::new(),
            adjustments: ContextAdjustments::default(),
        }
    }

    pub fn has_season_average(&self) -> bool {
        self.season_average.is_finite() && self.season_average > 0.0
    }

    pub fn venue_record(&self, venue: &str) -> Option<SplitRecord> {
        let wanted = normalize_name(venue);
        self.at_venue
            .iter()
            .find(|(k, _)| normalize_name(k) == wanted)
            .map(|(_, v)| *v)
    }
}

pub trait PlayerHistoryProvider: Send + Sync {
    fn find_player(&self, name: &str) -> Option<PlayerProfile>;

    fn all_players(&self) -> Vec<PlayerProfile>;
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryHistory {
    players: Vec<PlayerProfile>,
    by_key: HashMap<String, usize>,
}

impl InMemoryHistory {
    pub fn from_profiles(profiles: Vec<PlayerProfile>) -> Self {
        let mut players: Vec<PlayerProfile> = Vec::with_capacity(profiles.len());
        let mut by_key = HashMap::with_capacity(profiles.len());
        for profile in profiles {
            let key = normalize_name(&profile.name);
            if key.is_empty() {
                warn!("player history: skipping profile with empty name");
                continue;
            }
            if let Some(&idx) = by_key.get(&key) {
                warn!("player history: duplicate profile for '{}', keeping latest", profile.name);
                players[idx] = profile;
            } else {
                by_key.insert(key, players.len());
                players.push(profile);
            }
        }
        Self { players, by_key }
    }

    pub fn from_json_str(raw: &str) -> Result<Self> {
        let profiles =
            serde_json::from_str::<Vec<PlayerProfile>>(raw).context("parse player history json")?;
        Ok(Self::from_profiles(profiles))
    }

    pub fn load_json(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("read player history {}", path.display()))?;
        Self::from_json_str(&raw)
            .with_context(|| format!("load player history {}", path.display()))
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }
}

impl PlayerHistoryProvider for InMemoryHistory {
    fn find_player(&self, name: &str) -> Option<PlayerProfile> {
        self.by_key
            .get(&normalize_name(name))
            .map(|&idx| self.players[idx].clone())
    }

    fn all_players(&self) -> Vec<PlayerProfile> {
        self.players.clone()
    }
}

pub fn normalize_name(input: &str) -> String {
    let lower = input.trim().to_lowercase();
    let mut out = String::with_capacity(lower.len());
    let mut prev_us = false;
    for ch in lower.chars() {
        if ch.is_alphanumeric() {
            out.push(ch);
            prev_us = false;
        } else if !prev_us && !out.is_empty() {
            out.push('_');
            prev_us = true;
        }
    }
    while out.ends_with('_') {
        out.pop();
    }
    out
}
