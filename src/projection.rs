use std::sync::Arc;

use serde::Serialize;
use tracing::debug;

use crate::config::{EngineConfig, RecencyWeights};
use crate::error::EngineError;
use crate::history::{ContextAdjustments, PlayerHistoryProvider, PlayerProfile};
use crate::matchup_catalog::{DEFAULT_DIFFICULTY, MatchupCatalog, MatchupDifficulty, Matchups};
use crate::overrides::ProjectionOverrides;
use crate::position::{Position, canonical_position};

/// Tuning used when a profile's position string has no recognised tag.
pub const UNRESOLVED_POSITION: Position = Position::Mid;

const CONFIDENCE_BASE: f64 = 0.35;
const CONFIDENCE_SAMPLE_WEIGHT: f64 = 0.30;
const CONFIDENCE_COMPLETENESS_WEIGHT: f64 = 0.35;
// Sample size at which the sample term reaches half its weight.
const SAMPLE_HALF_GAMES: f64 = 4.0;

// Completeness scale for profiles whose position string could not be resolved.
const UNRESOLVED_POSITION_COMPLETENESS: f64 = 0.75;

const VENUE_SHRINK_GAMES: f64 = 5.0;
const VENUE_MIN: f64 = 0.90;
const VENUE_MAX: f64 = 1.10;
// Swing at the extremes of the DVP scale.
const DEFENCE_SWING: f64 = 0.05;
const ADJUSTMENT_MIN: f64 = 0.5;
const ADJUSTMENT_MAX: f64 = 1.5;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ContextFactors {
    pub venue: f64,
    pub defence: f64,
    pub role: f64,
    pub tag_risk: f64,
    pub weather: f64,
    pub pace: f64,
    pub team_dynamics: f64,
    pub injury_return: f64,
}

impl ContextFactors {
    pub fn neutral() -> Self {
        Self::from_adjustments(1.0, 1.0, &ContextAdjustments::default())
    }

    fn from_adjustments(venue: f64, defence: f64, adj: &ContextAdjustments) -> Self {
        Self {
            venue,
            defence,
            role: sane_multiplier(adj.role),
            tag_risk: sane_multiplier(adj.tag_risk),
            weather: sane_multiplier(adj.weather),
            pace: sane_multiplier(adj.pace),
            team_dynamics: sane_multiplier(adj.team_dynamics),
            injury_return: sane_multiplier(adj.injury_return),
        }
    }

    pub fn combined(&self) -> f64 {
        self.venue
            * self.defence
            * self.role
            * self.tag_risk
            * self.weather
            * self.pace
            * self.team_dynamics
            * self.injury_return
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectionResult {
    pub player: String,
    pub team: String,
    pub position: Position,
    pub round: u32,
    /// None on a bye.
    pub opponent: Option<String>,
    pub venue: Option<String>,
    pub projected_score: f64,
    pub range_low: f64,
    pub range_high: f64,
    pub confidence: f64,
    pub floor_applied: bool,
    pub override_applied: bool,
    pub difficulty: MatchupDifficulty,
    pub factors: ContextFactors,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct RecencyBase {
    score: f64,
    completeness: f64,
}

pub struct ProjectionEngine {
    catalog: Arc<MatchupCatalog>,
    history: Arc<dyn PlayerHistoryProvider>,
    overrides: ProjectionOverrides,
    config: EngineConfig,
}

impl ProjectionEngine {
    pub fn new(catalog: Arc<MatchupCatalog>, history: Arc<dyn PlayerHistoryProvider>) -> Self {
        Self {
            catalog,
            history,
            overrides: ProjectionOverrides::empty(),
            config: EngineConfig::default(),
        }
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_overrides(mut self, overrides: ProjectionOverrides) -> Self {
        self.overrides = overrides;
        self
    }

    pub fn catalog(&self) -> &MatchupCatalog {
        &self.catalog
    }

    pub fn history(&self) -> &dyn PlayerHistoryProvider {
        self.history.as_ref()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn validate_round(&self, round: u32) -> Result<(), EngineError> {
        if round == 0 || round > self.config.max_round {
            return Err(EngineError::InvalidRound {
                round,
                max: self.config.max_round,
            });
        }
        Ok(())
    }

    /// `Ok(None)` when the history provider does not know the player.
    pub fn project(
        &self,
        player: &str,
        round: u32,
    ) -> Result<Option<ProjectionResult>, EngineError> {
        self.validate_round(round)?;
        let Some(profile) = self.history.find_player(player) else {
            debug!(player, "no history for player, skipping projection");
            return Ok(None);
        };
        self.project_profile(&profile, round).map(Some)
    }

    pub fn project_profile(
        &self,
        profile: &PlayerProfile,
        round: u32,
    ) -> Result<ProjectionResult, EngineError> {
        self.validate_round(round)?;
        let matchups = self.catalog.load()?;
        Ok(self.project_against(&matchups, profile, round))
    }

    pub fn project_batch<S: AsRef<str>>(
        &self,
        players: &[S],
        round: u32,
    ) -> Result<Vec<ProjectionResult>, EngineError> {
        self.validate_round(round)?;
        let matchups = self.catalog.load()?;
        let mut out = Vec::with_capacity(players.len());
        for name in players {
            match self.history.find_player(name.as_ref()) {
                Some(profile) => out.push(self.project_against(&matchups, &profile, round)),
                None => debug!(player = name.as_ref(), "no history for player, skipping"),
            }
        }
        Ok(out)
    }

    /// Projects against one catalog snapshot. The caller has validated `round`.
    pub fn project_against(
        &self,
        matchups: &Matchups,
        profile: &PlayerProfile,
        round: u32,
    ) -> ProjectionResult {
        let resolved = canonical_position(&profile.position);
        let position = resolved.unwrap_or(UNRESOLVED_POSITION);
        let tuning = self.config.tuning.get(position);

        let team = matchups.resolve_team(&profile.team);
        let slot = matchups.fixtures(&team).and_then(|f| f.rounds.get(&round));
        let opponent = slot.map(|s| s.opponent.clone());
        let venue = slot.and_then(|s| s.venue.clone());

        let base = recency_base(profile, self.config.recency);
        let difficulty = matchups.matchup_difficulty(&team, &profile.position, round);
        let adjusted = (base.score
            + matchup_adjustment(difficulty.value, tuning.stdev, self.config.matchup_sensitivity))
        .max(0.0);

        let venue_mult = venue
            .as_deref()
            .map(|v| venue_factor(profile, v))
            .unwrap_or(1.0);
        let defence_mult = opponent
            .as_deref()
            .and_then(|opp| matchups.dvp_rating(opp))
            .and_then(|r| r.for_position(position))
            .map(defence_factor)
            .unwrap_or(1.0);
        let factors =
            ContextFactors::from_adjustments(venue_mult, defence_mult, &profile.adjustments);
        let raw_score = adjusted * factors.combined();

        let mut floor_applied = false;
        let override_entry = self.overrides.lookup(&profile.name, round);
        let projected_score = match override_entry {
            Some(entry) => entry.score,
            None if raw_score < tuning.floor
                && profile.has_season_average()
                && profile.season_average >= tuning.floor =>
            {
                floor_applied = true;
                tuning.floor
            }
            None => raw_score,
        };

        let band = tuning.stdev * tuning.range_multiplier;
        let range_low = (projected_score - band).max(0.0);
        let range_high = projected_score + band;

        let sample_games = opponent
            .as_deref()
            .map(|opp| opponent_games(matchups, profile, opp))
            .unwrap_or(0)
            + venue
                .as_deref()
                .and_then(|v| profile.venue_record(v))
                .map(|r| r.games)
                .unwrap_or(0);
        let completeness = if resolved.is_some() {
            base.completeness
        } else {
            base.completeness * UNRESOLVED_POSITION_COMPLETENESS
        };
        let mut confidence = confidence_score(sample_games, completeness);
        if difficulty.fallback {
            confidence *= self.config.fallback_confidence_factor;
        }

        ProjectionResult {
            player: profile.name.clone(),
            team,
            position,
            round,
            opponent,
            venue,
            projected_score,
            range_low,
            range_high,
            confidence: confidence.clamp(0.0, 1.0),
            floor_applied,
            override_applied: override_entry.is_some(),
            difficulty,
            factors,
        }
    }
}

fn recency_base(profile: &PlayerProfile, weights: RecencyWeights) -> RecencyBase {
    let last_3 = mean(&profile.last_3);
    let last_5 = mean(&profile.last_5);
    let season = profile
        .has_season_average()
        .then_some(profile.season_average);

    let mut total = 0.0;
    let mut weight = 0.0;
    for (value, w) in [
        (last_3, weights.last_3),
        (last_5, weights.last_5),
        (season, weights.season),
    ] {
        if let Some(v) = value {
            total += v * w;
            weight += w;
        }
    }
    let score = if weight > 0.0 { total / weight } else { 0.0 };

    let completeness = ((profile.last_3.len().min(3) as f64) / 3.0
        + (profile.last_5.len().min(5) as f64) / 5.0
        + if season.is_some() { 1.0 } else { 0.0 })
        / 3.0;

    RecencyBase {
        score,
        completeness,
    }
}

/// Harder than the midpoint lowers the score. Bounded by `stdev` because the
/// normalised distance and the sensitivity both stay within 0..=1.
pub fn matchup_adjustment(difficulty: f64, stdev: f64, sensitivity: f64) -> f64 {
    let distance = ((difficulty - DEFAULT_DIFFICULTY) / DEFAULT_DIFFICULTY).clamp(-1.0, 1.0);
    -distance * stdev * sensitivity.clamp(0.0, 1.0)
}

fn venue_factor(profile: &PlayerProfile, venue: &str) -> f64 {
    let Some(record) = profile.venue_record(venue) else {
        return 1.0;
    };
    if record.games == 0 || !profile.has_season_average() {
        return 1.0;
    }
    let ratio = record.average / profile.season_average;
    if !ratio.is_finite() {
        return 1.0;
    }
    let games = record.games as f64;
    let w = games / (games + VENUE_SHRINK_GAMES);
    (1.0 + w * (ratio - 1.0)).clamp(VENUE_MIN, VENUE_MAX)
}

fn defence_factor(rating: f64) -> f64 {
    let distance = ((rating - DEFAULT_DIFFICULTY) / DEFAULT_DIFFICULTY).clamp(-1.0, 1.0);
    1.0 - DEFENCE_SWING * distance
}

fn opponent_games(matchups: &Matchups, profile: &PlayerProfile, opponent: &str) -> u32 {
    let teams = matchups.teams();
    profile
        .vs_opponent
        .iter()
        .filter(|(name, _)| teams.same_team(name, opponent))
        .map(|(_, r)| r.games)
        .sum()
}

fn confidence_score(sample_games: u32, completeness: f64) -> f64 {
    let n = sample_games as f64;
    let sample = n / (n + SAMPLE_HALF_GAMES);
    CONFIDENCE_BASE
        + CONFIDENCE_SAMPLE_WEIGHT * sample
        + CONFIDENCE_COMPLETENESS_WEIGHT * completeness.clamp(0.0, 1.0)
}

fn sane_multiplier(value: f64) -> f64 {
    if value.is_finite() {
        value.clamp(ADJUSTMENT_MIN, ADJUSTMENT_MAX)
    } else {
        1.0
    }
}

fn mean(values: &[f64]) -> Option<f64> {
    let finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if finite.is_empty() {
        return None;
    }
    Some(finite.iter().sum::<f64>() / finite.len() as f64)
}
