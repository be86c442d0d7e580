use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum EngineError {
    /// Raw matchup source missing or structurally invalid. The catalog stays
    /// unloaded, so the caller may retry.
    #[error("matchup data unavailable: {reason}")]
    DataUnavailable { reason: String },

    #[error("round {round} is outside the supported range 1..={max}")]
    InvalidRound { round: u32, max: u32 },
}

impl EngineError {
    pub fn data_unavailable(reason: impl Into<String>) -> Self {
        Self::DataUnavailable {
            reason: reason.into(),
        }
    }
}
