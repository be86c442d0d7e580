use std::cmp::Ordering;
use std::sync::Arc;

use rayon::prelude::*;
use tracing::debug;

use crate::error::EngineError;
use crate::projection::{ProjectionEngine, ProjectionResult};

pub struct QueryService {
    engine: Arc<ProjectionEngine>,
}

impl QueryService {
    pub fn new(engine: Arc<ProjectionEngine>) -> Self {
        Self { engine }
    }

    pub fn engine(&self) -> &ProjectionEngine {
        &self.engine
    }

    pub fn all_projections(&self, round: u32) -> Result<Vec<ProjectionResult>, EngineError> {
        self.engine.validate_round(round)?;
        let matchups = self.engine.catalog().load()?;
        let players = self.engine.history().all_players();
        let mut out: Vec<ProjectionResult> = players
            .par_iter()
            .map(|profile| self.engine.project_against(&matchups, profile, round))
            .collect();
        out.sort_by(compare_projections);
        debug!(round, players = out.len(), "projected player universe");
        Ok(out)
    }

    pub fn top_scorers(&self, n: usize, round: u32) -> Result<Vec<ProjectionResult>, EngineError> {
        let mut out = self.all_projections(round)?;
        out.truncate(n);
        Ok(out)
    }

    pub fn team_projections(
        &self,
        team: &str,
        round: u32,
    ) -> Result<Vec<ProjectionResult>, EngineError> {
        let wanted = self.engine.catalog().resolve_team(team);
        let out = self
            .all_projections(round)?
            .into_iter()
            .filter(|p| p.team.eq_ignore_ascii_case(&wanted))
            .collect();
        Ok(out)
    }
}

/// Score descending, then confidence descending, then name ascending.
pub fn compare_projections(a: &ProjectionResult, b: &ProjectionResult) -> Ordering {
    b.projected_score
        .total_cmp(&a.projected_score)
        .then_with(|| b.confidence.total_cmp(&a.confidence))
        .then_with(|| a.player.to_lowercase().cmp(&b.player.to_lowercase()))
        .then_with(|| a.player.cmp(&b.player))
}
