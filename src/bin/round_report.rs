use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use footy_projections::overrides::ProjectionOverrides;
use footy_projections::raw_tables::CsvDirectoryLoader;
use footy_projections::{
    EngineConfig, InMemoryHistory, MatchupCatalog, ProjectionEngine, QueryService,
};

// Usage: round_report <round> [team] [limit]
// Data comes from FOOTY_DATA_DIR (raw matchup csv files), FOOTY_PLAYERS_JSON and the
// optional FOOTY_OVERRIDES_JSON. Nothing here touches the network.
fn main() -> anyhow::Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let mut args = std::env::args().skip(1);
    let round: u32 = args
        .next()
        .context("missing round argument")?
        .parse()
        .context("round must be a number")?;
    let team = args.next().filter(|t| !t.trim().is_empty());
    let limit: usize = args
        .next()
        .and_then(|v| v.parse().ok())
        .unwrap_or(20);

    let data_dir = env_path("FOOTY_DATA_DIR").unwrap_or_else(|| PathBuf::from("data"));
    let players_path =
        env_path("FOOTY_PLAYERS_JSON").unwrap_or_else(|| data_dir.join("players.json"));

    let catalog = Arc::new(MatchupCatalog::new(Arc::new(CsvDirectoryLoader::new(&data_dir))));
    let history = Arc::new(InMemoryHistory::load_json(&players_path)?);
    let mut engine = ProjectionEngine::new(catalog, history).with_config(EngineConfig::from_env());
    if let Some(path) = env_path("FOOTY_OVERRIDES_JSON") {
        engine = engine.with_overrides(ProjectionOverrides::load_json(&path)?);
    }
    let queries = QueryService::new(Arc::new(engine));

    let rows = match team.as_deref() {
        Some(team) => {
            let mut rows = queries.team_projections(team, round)?;
            rows.truncate(limit);
            rows
        }
        None => queries.top_scorers(limit, round)?,
    };

    println!(
        "{:<24} {:<18} {:<5} {:<18} {:>6} {:>13} {:>5}",
        "Player", "Team", "Pos", "Opponent", "Proj", "Range", "Conf"
    );
    for p in rows {
        let mut flags = String::new();
        if p.floor_applied {
            flags.push('F');
        }
        if p.override_applied {
            flags.push('O');
        }
        if p.difficulty.fallback {
            flags.push('?');
        }
        println!(
            "{:<24} {:<18} {:<5} {:<18} {:>6.1} {:>6.1}-{:<6.1} {:>5.2} {}",
            p.player,
            p.team,
            p.position,
            p.opponent.as_deref().unwrap_or("BYE"),
            p.projected_score,
            p.range_low,
            p.range_high,
            p.confidence,
            flags
        );
    }

    Ok(())
}

fn env_path(key: &str) -> Option<PathBuf> {
    std::env::var(key)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .map(PathBuf::from)
}
