use std::collections::HashMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::history::normalize_name;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerOverride {
    pub player: String,
    #[serde(default)]
    pub round: Option<u32>,
    pub score: f64,
    #[serde(default)]
    pub note: Option<String>,
}

/// Overrides replace the formulaic score outright; they are never blended.
#[derive(Debug, Clone, Default)]
pub struct ProjectionOverrides {
    by_player: HashMap<String, Vec<PlayerOverride>>,
}

impl ProjectionOverrides {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_entries(entries: Vec<PlayerOverride>) -> Self {
        let mut out = Self::empty();
        for entry in entries {
            out.insert(entry);
        }
        out
    }

    pub fn from_json_str(raw: &str) -> Result<Self> {
        let entries = serde_json::from_str::<Vec<PlayerOverride>>(raw)
            .context("parse projection overrides json")?;
        Ok(Self::from_entries(entries))
    }

    pub fn load_json(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("read projection overrides {}", path.display()))?;
        Self::from_json_str(&raw)
    }

    pub fn insert(&mut self, entry: PlayerOverride) {
        if !entry.score.is_finite() || entry.score < 0.0 {
            warn!("overrides: ignoring invalid score {} for {}", entry.score, entry.player);
            return;
        }
        let key = normalize_name(&entry.player);
        if key.is_empty() {
            return;
        }
        let slot = self.by_player.entry(key).or_default();
        slot.retain(|e| e.round != entry.round);
        slot.push(entry);
    }

    pub fn lookup(&self, player: &str, round: u32) -> Option<&PlayerOverride> {
        let entries = self.by_player.get(&normalize_name(player))?;
        entries
            .iter()
            .find(|e| e.round == Some(round))
            .or_else(|| entries.iter().find(|e| e.round.is_none()))
    }

    pub fn is_empty(&self) -> bool {
        self.by_player.is_empty()
    }
}
