use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Position {
    Fwd,
    Mid,
    Def,
    Ruck,
}

/// Resolution order for compound positions: the first entry the player holds wins.
pub const POSITION_PRIORITY: [Position; 4] =
    [Position::Ruck, Position::Mid, Position::Def, Position::Fwd];

impl Position {
    pub const ALL: [Position; 4] = [Position::Fwd, Position::Mid, Position::Def, Position::Ruck];

    pub fn index(self) -> usize {
        match self {
            Position::Fwd => 0,
            Position::Mid => 1,
            Position::Def => 2,
            Position::Ruck => 3,
        }
    }

    pub fn tag(self) -> &'static str {
        match self {
            Position::Fwd => "FWD",
            Position::Mid => "MID",
            Position::Def => "DEF",
            Position::Ruck => "RUCK",
        }
    }

    pub fn from_tag(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "FWD" | "F" | "FORWARD" => Some(Position::Fwd),
            "MID" | "M" | "MIDFIELD" | "MIDFIELDER" => Some(Position::Mid),
            "DEF" | "D" | "DEFENDER" | "BACK" => Some(Position::Def),
            "RUCK" | "RUC" | "R" | "RUCKMAN" => Some(Position::Ruck),
            _ => None,
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.tag())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PositionTags {
    tags: Vec<String>,
}

impl PositionTags {
    pub fn parse(raw: &str) -> Self {
        let mut tags: Vec<String> = Vec::new();
        for part in raw.split(|c: char| matches!(c, '/' | ',' | '|' | '-') || c.is_whitespace()) {
            let tag = part.trim().to_ascii_uppercase();
            if tag.is_empty() || tags.contains(&tag) {
                continue;
            }
            tags.push(tag);
        }
        Self { tags }
    }

    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    pub fn canonical_tag(&self) -> Option<&str> {
        resolve_priority(&self.tags)
    }

    pub fn canonical(&self) -> Option<Position> {
        self.canonical_tag().and_then(Position::from_tag)
    }
}

/// Picks the tag that outranks the others in `POSITION_PRIORITY`. When no tag
/// is a recognised position the first listed tag is returned as-is.
pub fn resolve_priority<S: AsRef<str>>(tags: &[S]) -> Option<&str> {
    for wanted in POSITION_PRIORITY {
        if let Some(tag) = tags
            .iter()
            .map(|t| t.as_ref())
            .find(|t| Position::from_tag(t) == Some(wanted))
        {
            return Some(tag);
        }
    }
    tags.first().map(|t| t.as_ref())
}

pub fn canonical_position(raw: &str) -> Option<Position> {
    PositionTags::parse(raw).canonical()
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PositionTuning {
    pub floor: f64,
    pub stdev: f64,
    pub range_multiplier: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TuningTable {
    entries: [PositionTuning; 4],
}

impl Default for TuningTable {
    fn default() -> Self {
        let mut entries = [PositionTuning {
            floor: 0.0,
            stdev: 0.0,
            range_multiplier: 1.0,
        }; 4];
        entries[Position::Fwd.index()] = PositionTuning {
            floor: 40.0,
            stdev: 22.0,
            range_multiplier: 0.9,
        };
        entries[Position::Mid.index()] = PositionTuning {
            floor: 60.0,
            stdev: 20.0,
            range_multiplier: 0.8,
        };
        entries[Position::Def.index()] = PositionTuning {
            floor: 50.0,
            stdev: 18.0,
            range_multiplier: 0.8,
        };
        entries[Position::Ruck.index()] = PositionTuning {
            floor: 65.0,
            stdev: 24.0,
            range_multiplier: 0.9,
        };
        Self { entries }
    }
}

impl TuningTable {
    pub fn with_entry(mut self, position: Position, tuning: PositionTuning) -> Self {
        self.entries[position.index()] = tuning;
        self
    }

    pub fn get(&self, position: Position) -> PositionTuning {
        self.entries[position.index()]
    }
}
