use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, PoisonError, RwLock};

use once_cell::sync::OnceCell;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::EngineError;
use crate::position::{Position, canonical_position};
use crate::raw_tables::{DifficultyRow, RawTableLoader, RawTables};
use crate::teams::TeamDirectory;

/// Scale midpoint, returned whenever a (team, round) pair has no graded entry.
pub const DEFAULT_DIFFICULTY: f64 = 5.0;
pub const DIFFICULTY_MIN: f64 = 0.0;
pub const DIFFICULTY_MAX: f64 = 10.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MatchupDifficulty {
    pub value: f64,
    /// True when `value` is `DEFAULT_DIFFICULTY` because no entry existed.
    pub fallback: bool,
}

impl MatchupDifficulty {
    fn stored(value: f64) -> Self {
        Self {
            value,
            fallback: false,
        }
    }

    fn default_fallback() -> Self {
        Self {
            value: DEFAULT_DIFFICULTY,
            fallback: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FixtureSlot {
    pub opponent: String,
    pub venue: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Fixture {
    pub team: String,
    pub rounds: BTreeMap<u32, FixtureSlot>,
}

impl Fixture {
    pub fn opponent(&self, round: u32) -> Option<&str> {
        self.rounds.get(&round).map(|s| s.opponent.as_str())
    }

    pub fn is_bye(&self, round: u32) -> bool {
        !self.rounds.contains_key(&round)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DvpRating {
    pub team: String,
    pub by_position: BTreeMap<Position, f64>,
}

impl DvpRating {
    pub fn for_position(&self, position: Position) -> Option<f64> {
        self.by_position.get(&position).copied()
    }
}

#[derive(Debug, Clone, Default)]
pub struct PositionMatchupTable {
    by_team: HashMap<String, BTreeMap<u32, f64>>,
}

impl PositionMatchupTable {
    fn get(&self, team_key: &str, round: u32) -> Option<f64> {
        self.by_team.get(team_key)?.get(&round).copied()
    }

    pub fn len(&self) -> usize {
        self.by_team.values().map(|r| r.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FixtureDifficulty {
    pub round: u32,
    pub opponent: String,
    pub difficulty: MatchupDifficulty,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoundDifficulty {
    pub round: u32,
    pub opponent: String,
    pub average: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TeamFixtureDifficulty {
    pub team: String,
    pub rounds: Vec<RoundDifficulty>,
    pub season_average: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct Matchups {
    teams: TeamDirectory,
    dvp: HashMap<String, DvpRating>,
    fixtures: HashMap<String, Fixture>,
    tables: HashMap<Position, PositionMatchupTable>,
}

impl Matchups {
    pub fn from_raw(mut raw: RawTables, teams: TeamDirectory) -> Result<Self, EngineError> {
        let mut tables = HashMap::new();
        for position in Position::ALL {
            let rows = raw.difficulty.remove(&position).ok_or_else(|| {
                EngineError::data_unavailable(format!("missing {position} matchup table"))
            })?;
            let table = build_table(position, rows, &teams);
            if table.is_empty() {
                warn!("{position} matchup table has no usable rows, lookups read the default");
            }
            debug!(position = %position, entries = table.len(), "parsed matchup table");
            tables.insert(position, table);
        }

        let mut fixtures: HashMap<String, Fixture> = HashMap::new();
        for row in raw.fixtures {
            let team = teams.resolve(&row.team);
            if team.is_empty() {
                warn!("fixtures: skipping row with empty team");
                continue;
            }
            let fixture = fixtures
                .entry(lookup_key(&team))
                .or_insert_with(|| Fixture {
                    team: team.clone(),
                    rounds: BTreeMap::new(),
                });
            let slot = FixtureSlot {
                opponent: teams.resolve(&row.opponent),
                venue: row
                    .venue
                    .map(|v| v.trim().to_string())
                    .filter(|v| !v.is_empty()),
            };
            if fixture.rounds.insert(row.round, slot).is_some() {
                warn!("fixtures: duplicate entry for {team} round {}, keeping latest", row.round);
            }
        }
        if fixtures.is_empty() {
            warn!("fixture table has no usable rows");
        }

        let mut dvp: HashMap<String, DvpRating> = HashMap::new();
        for row in raw.dvp {
            let Some(position) = canonical_position(&row.position) else {
                warn!("dvp: skipping row with unknown position '{}'", row.position);
                continue;
            };
            if !row.rating.is_finite() {
                warn!("dvp: skipping non-finite rating for {}", row.team);
                continue;
            }
            let team = teams.resolve(&row.team);
            dvp.entry(lookup_key(&team))
                .or_insert_with(|| DvpRating {
                    team: team.clone(),
                    by_position: BTreeMap::new(),
                })
                .by_position
                .insert(position, row.rating);
        }
        if dvp.is_empty() {
            warn!("dvp table has no usable rows");
        }

        Ok(Self {
            teams,
            dvp,
            fixtures,
            tables,
        })
    }

    pub fn resolve_team(&self, identifier: &str) -> String {
        self.teams.resolve(identifier)
    }

    pub fn teams(&self) -> &TeamDirectory {
        &self.teams
    }

    pub fn team_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.fixtures.values().map(|f| f.team.as_str()).collect();
        names.sort_unstable();
        names
    }

    pub fn dvp_rating(&self, team: &str) -> Option<&DvpRating> {
        self.dvp.get(&self.key(team))
    }

    pub fn fixtures(&self, team: &str) -> Option<&Fixture> {
        self.fixtures.get(&self.key(team))
    }

    /// `position` may be compound ("RUC/FWD"); it is narrowed by priority first.
    pub fn matchup_difficulty(&self, team: &str, position: &str, round: u32) -> MatchupDifficulty {
        match canonical_position(position) {
            Some(pos) => self.difficulty_for(team, pos, round),
            None => MatchupDifficulty::default_fallback(),
        }
    }

    pub fn difficulty_for(&self, team: &str, position: Position, round: u32) -> MatchupDifficulty {
        self.tables
            .get(&position)
            .and_then(|t| t.get(&self.key(team), round))
            .map(MatchupDifficulty::stored)
            .unwrap_or_else(MatchupDifficulty::default_fallback)
    }

    pub fn fixture_difficulty(
        &self,
        team: &str,
        position: &str,
        rounds: &[u32],
    ) -> Vec<FixtureDifficulty> {
        let Some(fixture) = self.fixtures(team) else {
            return Vec::new();
        };
        rounds
            .iter()
            .filter_map(|&round| {
                let slot = fixture.rounds.get(&round)?;
                Some(FixtureDifficulty {
                    round,
                    opponent: slot.opponent.clone(),
                    difficulty: self.matchup_difficulty(&fixture.team, position, round),
                })
            })
            .collect()
    }

    pub fn all_team_fixture_difficulty(&self) -> Vec<TeamFixtureDifficulty> {
        let mut out: Vec<TeamFixtureDifficulty> = self
            .fixtures
            .values()
            .map(|fixture| {
                let rounds: Vec<RoundDifficulty> = fixture
                    .rounds
                    .iter()
                    .map(|(&round, slot)| {
                        let sum: f64 = Position::ALL
                            .iter()
                            .map(|&p| self.difficulty_for(&fixture.team, p, round).value)
                            .sum();
                        RoundDifficulty {
                            round,
                            opponent: slot.opponent.clone(),
                            average: round1(sum / Position::ALL.len() as f64),
                        }
                    })
                    .collect();
                let season_average = if rounds.is_empty() {
                    None
                } else {
                    let total: f64 = rounds.iter().map(|r| r.average).sum();
                    Some(round1(total / rounds.len() as f64))
                };
                TeamFixtureDifficulty {
                    team: fixture.team.clone(),
                    rounds,
                    season_average,
                }
            })
            .collect();
        out.sort_by(|a, b| a.team.cmp(&b.team));
        out
    }

    fn key(&self, team: &str) -> String {
        lookup_key(&self.teams.resolve(team))
    }
}

type Generation = Arc<OnceCell<Arc<Matchups>>>;

/// Owns the raw loader and parses it at most once per generation. Concurrent
/// first callers block on the in-flight parse; a failed parse leaves the cell
/// empty. `refresh` starts a new generation, and snapshots handed out earlier
/// stay valid.
pub struct MatchupCatalog {
    loader: Arc<dyn RawTableLoader>,
    teams: TeamDirectory,
    current: RwLock<Generation>,
}

impl MatchupCatalog {
    pub fn new(loader: Arc<dyn RawTableLoader>) -> Self {
        Self::with_teams(loader, TeamDirectory::league())
    }

    pub fn with_teams(loader: Arc<dyn RawTableLoader>, teams: TeamDirectory) -> Self {
        Self {
            loader,
            teams,
            current: RwLock::new(Arc::new(OnceCell::new())),
        }
    }

    pub fn load(&self) -> Result<Arc<Matchups>, EngineError> {
        let generation = self.generation();
        self.init(&generation)
    }

    pub fn is_loaded(&self) -> bool {
        self.generation().get().is_some()
    }

    /// Drops the cached tables and parses the source again. Works through a
    /// shared handle; callers racing the refresh wait on the new parse.
    pub fn refresh(&self) -> Result<Arc<Matchups>, EngineError> {
        let generation: Generation = Arc::new(OnceCell::new());
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = generation.clone();
        info!("matchup catalog refresh requested");
        self.init(&generation)
    }

    pub fn resolve_team(&self, identifier: &str) -> String {
        self.teams.resolve(identifier)
    }

    fn generation(&self) -> Generation {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn init(&self, generation: &OnceCell<Arc<Matchups>>) -> Result<Arc<Matchups>, EngineError> {
        generation
            .get_or_try_init(|| {
                let raw = self.loader.load_tables()?;
                let matchups = Matchups::from_raw(raw, self.teams.clone())?;
                info!(
                    teams = matchups.fixtures.len(),
                    dvp_teams = matchups.dvp.len(),
                    "matchup catalog loaded"
                );
                Ok(Arc::new(matchups))
            })
            .cloned()
    }
}

fn build_table(
    position: Position,
    rows: Vec<DifficultyRow>,
    teams: &TeamDirectory,
) -> PositionMatchupTable {
    let mut table = PositionMatchupTable::default();
    for row in rows {
        if !row.difficulty.is_finite() {
            warn!(
                "{position}: skipping non-finite difficulty for {} round {}",
                row.team, row.round
            );
            continue;
        }
        let value = row.difficulty.clamp(DIFFICULTY_MIN, DIFFICULTY_MAX);
        if value != row.difficulty {
            warn!(
                "{position}: difficulty {} for {} round {} clamped to {value}",
                row.difficulty, row.team, row.round
            );
        }
        table
            .by_team
            .entry(lookup_key(&teams.resolve(&row.team)))
            .or_default()
            .insert(row.round, value);
    }
    table
}

fn lookup_key(team: &str) -> String {
    team.to_lowercase()
}

fn round1(x: f64) -> f64 {
    (x * 10.0).round() / 10.0
}
