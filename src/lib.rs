pub mod config;
pub mod error;
pub mod history;
pub mod matchup_catalog;
pub mod overrides;
pub mod position;
pub mod projection;
pub mod query;
pub mod raw_tables;
pub mod teams;

pub use config::EngineConfig;
pub use error::EngineError;
pub use history::{InMemoryHistory, PlayerHistoryProvider, PlayerProfile};
pub use matchup_catalog::{MatchupCatalog, MatchupDifficulty, Matchups};
pub use position::Position;
pub use projection::{ProjectionEngine, ProjectionResult};
pub use query::QueryService;
