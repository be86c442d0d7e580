// Raw tabular rows handed to the matchup catalog, and the loaders that produce them.

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::EngineError;
use crate::position::Position;

pub const DVP_FILE: &str = "dvp.csv";
pub const FIXTURES_FILE: &str = "fixtures.csv";

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DvpRow {
    #[serde(alias = "Team")]
    pub team: String,
    #[serde(alias = "Position")]
    pub position: String,
    #[serde(alias = "Rating")]
    pub rating: f64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FixtureRow {
    #[serde(alias = "Team")]
    pub team: String,
    #[serde(alias = "Round")]
    pub round: u32,
    #[serde(alias = "Opponent")]
    pub opponent: String,
    #[serde(default, alias = "Venue")]
    pub venue: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DifficultyRow {
    #[serde(alias = "Team")]
    pub team: String,
    #[serde(alias = "Round")]
    pub round: u32,
    #[serde(alias = "Difficulty")]
    pub difficulty: f64,
}

#[derive(Debug, Clone, Default)]
pub struct RawTables {
    pub dvp: Vec<DvpRow>,
    pub fixtures: Vec<FixtureRow>,
    pub difficulty: HashMap<Position, Vec<DifficultyRow>>,
}

pub trait RawTableLoader: Send + Sync {
    fn load_tables(&self) -> Result<RawTables, EngineError>;
}

#[derive(Debug, Clone, Default)]
pub struct StaticTables {
    tables: RawTables,
}

impl StaticTables {
    pub fn new(tables: RawTables) -> Self {
        Self { tables }
    }
}

impl RawTableLoader for StaticTables {
    fn load_tables(&self) -> Result<RawTables, EngineError> {
        Ok(self.tables.clone())
    }
}

/// Reads `dvp.csv`, `fixtures.csv` and `matchups_<pos>.csv` from one directory.
#[derive(Debug, Clone)]
pub struct CsvDirectoryLoader {
    dir: PathBuf,
}

impl CsvDirectoryLoader {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn matchup_file(position: Position) -> String {
        format!("matchups_{}.csv", position.tag().to_ascii_lowercase())
    }

    fn open(&self, name: &str) -> Result<File, EngineError> {
        let path = self.dir.join(name);
        File::open(&path).map_err(|e| {
            EngineError::data_unavailable(format!("cannot read {}: {e}", path.display()))
        })
    }
}

impl RawTableLoader for CsvDirectoryLoader {
    fn load_tables(&self) -> Result<RawTables, EngineError> {
        debug!(dir = %self.dir.display(), "reading raw matchup tables");
        let dvp = read_rows::<DvpRow, _>(self.open(DVP_FILE)?, DVP_FILE)?;
        let fixtures = read_rows::<FixtureRow, _>(self.open(FIXTURES_FILE)?, FIXTURES_FILE)?;
        let mut difficulty = HashMap::new();
        for position in Position::ALL {
            let name = Self::matchup_file(position);
            let rows = read_rows::<DifficultyRow, _>(self.open(&name)?, &name)?;
            difficulty.insert(position, rows);
        }
        Ok(RawTables {
            dvp,
            fixtures,
            difficulty,
        })
    }
}

/// Deserializes every well-formed row; malformed rows are skipped with a warning.
/// A missing or unreadable header is treated as a structural failure.
pub fn read_rows<T, R>(rdr: R, label: &str) -> Result<Vec<T>, EngineError>
where
    T: for<'de> Deserialize<'de>,
    R: Read,
{
    let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(rdr);
    let headers = reader
        .headers()
        .map_err(|e| EngineError::data_unavailable(format!("{label}: bad header: {e}")))?;
    if headers.is_empty() {
        return Err(EngineError::data_unavailable(format!("{label}: empty table")));
    }
    let mut rows = Vec::new();
    for result in reader.deserialize::<T>() {
        match result {
            Ok(row) => rows.push(row),
            Err(e) => warn!("{label}: skipping malformed row: {e}"),
        }
    }
    Ok(rows)
}
