use std::env;

use crate::position::TuningTable;

pub const DEFAULT_MAX_ROUND: u32 = 24;
pub const DEFAULT_FALLBACK_CONFIDENCE: f64 = 0.5;
pub const DEFAULT_MATCHUP_SENSITIVITY: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RecencyWeights {
    pub last_3: f64,
    pub last_5: f64,
    pub season: f64,
}

impl Default for RecencyWeights {
    fn default() -> Self {
        Self {
            last_3: 0.5,
            last_5: 0.3,
            season: 0.2,
        }
    }
}

impl RecencyWeights {
    pub fn parse(raw: &str) -> Option<Self> {
        let parts: Vec<f64> = raw
            .split(',')
            .map(|p| p.trim().parse::<f64>().ok())
            .collect::<Option<Vec<_>>>()?;
        let [last_3, last_5, season] = parts.as_slice() else {
            return None;
        };
        let weights = Self {
            last_3: *last_3,
            last_5: *last_5,
            season: *season,
        };
        let all = [weights.last_3, weights.last_5, weights.season];
        if all.iter().any(|w| !w.is_finite() || *w < 0.0) || all.iter().sum::<f64>() <= 0.0 {
            return None;
        }
        Some(weights)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    pub max_round: u32,
    pub recency: RecencyWeights,
    pub matchup_sensitivity: f64,
    pub fallback_confidence_factor: f64,
    pub tuning: TuningTable,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_round: DEFAULT_MAX_ROUND,
            recency: RecencyWeights::default(),
            matchup_sensitivity: DEFAULT_MATCHUP_SENSITIVITY,
            fallback_confidence_factor: DEFAULT_FALLBACK_CONFIDENCE,
            tuning: TuningTable::default(),
        }
    }
}

impl EngineConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let max_round = env::var("PROJECTION_MAX_ROUND")
            .ok()
            .and_then(|val| val.trim().parse::<u32>().ok())
            .filter(|r| *r > 0)
            .unwrap_or(defaults.max_round);
        let fallback_confidence_factor = env::var("PROJECTION_FALLBACK_CONFIDENCE")
            .ok()
            .and_then(|val| val.trim().parse::<f64>().ok())
            .filter(|f| f.is_finite())
            .unwrap_or(defaults.fallback_confidence_factor)
            .clamp(0.0, 1.0);
        let matchup_sensitivity = env::var("PROJECTION_MATCHUP_SENSITIVITY")
            .ok()
            .and_then(|val| val.trim().parse::<f64>().ok())
            .filter(|f| f.is_finite())
            .unwrap_or(defaults.matchup_sensitivity)
            .clamp(0.0, 1.0);
        let recency = env::var("PROJECTION_RECENCY_WEIGHTS")
            .ok()
            .and_then(|val| RecencyWeights::parse(&val))
            .unwrap_or(defaults.recency);
        Self {
            max_round,
            recency,
            matchup_sensitivity,
            fallback_confidence_factor,
            tuning: defaults.tuning,
        }
    }
}
