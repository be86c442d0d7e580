use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

use footy_projections::matchup_catalog::DEFAULT_DIFFICULTY;
use footy_projections::raw_tables::{
    CsvDirectoryLoader, DifficultyRow, DvpRow, FixtureRow, RawTableLoader, RawTables, StaticTables,
};
use footy_projections::{
    EngineError, InMemoryHistory, MatchupCatalog, PlayerProfile, Position, ProjectionEngine,
};

fn fixture_dir() -> PathBuf {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests");
    path.push("fixtures");
    path.push("round_data");
    path
}

fn csv_catalog() -> MatchupCatalog {
    MatchupCatalog::new(Arc::new(CsvDirectoryLoader::new(fixture_dir())))
}

struct CountingLoader {
    inner: CsvDirectoryLoader,
    calls: AtomicUsize,
    fail_first: usize,
    delay: Duration,
}

impl CountingLoader {
    fn new(fail_first: usize, delay: Duration) -> Self {
        Self {
            inner: CsvDirectoryLoader::new(fixture_dir()),
            calls: AtomicUsize::new(0),
            fail_first,
            delay,
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl RawTableLoader for CountingLoader {
    fn load_tables(&self) -> Result<RawTables, EngineError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        thread::sleep(self.delay);
        if n < self.fail_first {
            return Err(EngineError::data_unavailable("source offline"));
        }
        self.inner.load_tables()
    }
}

#[test]
fn load_twice_parses_once() {
    let loader = Arc::new(CountingLoader::new(0, Duration::ZERO));
    let catalog = MatchupCatalog::new(loader.clone());
    assert!(!catalog.is_loaded());
    catalog.load().expect("first load");
    catalog.load().expect("second load");
    assert_eq!(loader.calls(), 1);
    assert!(catalog.is_loaded());
}

#[test]
fn concurrent_first_callers_share_one_parse() {
    let loader = Arc::new(CountingLoader::new(0, Duration::from_millis(50)));
    let catalog = MatchupCatalog::new(loader.clone());
    thread::scope(|s| {
        for _ in 0..8 {
            s.spawn(|| {
                let m = catalog.load().expect("load");
                assert_eq!(m.matchup_difficulty("GEE", "FWD", 1).value, 4.0);
            });
        }
    });
    assert_eq!(loader.calls(), 1);
}

#[test]
fn failed_load_leaves_cache_unset_and_retry_succeeds() {
    let loader = Arc::new(CountingLoader::new(1, Duration::ZERO));
    let catalog = MatchupCatalog::new(loader.clone());
    let err = catalog.load().unwrap_err();
    assert!(matches!(err, EngineError::DataUnavailable { .. }));
    assert!(!catalog.is_loaded());
    catalog.load().expect("retry succeeds");
    assert_eq!(loader.calls(), 2);
}

#[test]
fn refresh_parses_again() {
    let loader = Arc::new(CountingLoader::new(0, Duration::ZERO));
    let catalog = MatchupCatalog::new(loader.clone());
    catalog.load().expect("load");
    catalog.refresh().expect("refresh");
    catalog.load().expect("cached after refresh");
    assert_eq!(loader.calls(), 2);
}

// Grades GEE forwards in round 1 with the number of parses so far.
struct RegradingLoader {
    calls: AtomicUsize,
}

impl RawTableLoader for RegradingLoader {
    fn load_tables(&self) -> Result<RawTables, EngineError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        let mut tables = single_round_tables();
        tables.difficulty.insert(
            Position::Fwd,
            vec![DifficultyRow {
                team: "GEE".into(),
                round: 1,
                difficulty: n as f64,
            }],
        );
        Ok(tables)
    }
}

#[test]
fn refresh_through_shared_engine() {
    let catalog = Arc::new(MatchupCatalog::new(Arc::new(RegradingLoader {
        calls: AtomicUsize::new(0),
    })));
    let mut profile = PlayerProfile::new("Sample", "GEE", "FWD");
    profile.season_average = 80.0;
    let history = InMemoryHistory::from_profiles(vec![profile]);
    let engine = ProjectionEngine::new(catalog.clone(), Arc::new(history));

    let before = engine.project("Sample", 1).unwrap().unwrap();
    assert_eq!(before.difficulty.value, 1.0);
    let snapshot = catalog.load().expect("load");

    engine.catalog().refresh().expect("refresh");
    let after = engine.project("Sample", 1).unwrap().unwrap();
    assert_eq!(after.difficulty.value, 2.0);
    assert!(after.projected_score < before.projected_score);

    // Earlier snapshots keep the tables they were loaded with.
    assert_eq!(snapshot.difficulty_for("GEE", Position::Fwd, 1).value, 1.0);
    assert_eq!(catalog.load().unwrap().difficulty_for("GEE", Position::Fwd, 1).value, 2.0);
}

#[test]
fn failed_refresh_leaves_catalog_unloaded() {
    let failing = MatchupCatalog::new(Arc::new(CountingLoader::new(2, Duration::ZERO)));
    assert!(failing.load().is_err());
    assert!(failing.refresh().is_err());
    assert!(!failing.is_loaded());
    failing.load().expect("third parse succeeds");
    assert!(failing.is_loaded());
}

#[test]
fn missing_source_is_data_unavailable() {
    let catalog = MatchupCatalog::new(Arc::new(CsvDirectoryLoader::new(
        fixture_dir().join("does_not_exist"),
    )));
    assert!(matches!(
        catalog.load(),
        Err(EngineError::DataUnavailable { .. })
    ));
    assert!(!catalog.is_loaded());
}

fn single_round_tables() -> RawTables {
    let mut difficulty = HashMap::new();
    for pos in Position::ALL {
        difficulty.insert(
            pos,
            vec![DifficultyRow {
                team: "GEE".into(),
                round: 1,
                difficulty: 6.0,
            }],
        );
    }
    RawTables {
        dvp: vec![DvpRow {
            team: "GEE".into(),
            position: "MID".into(),
            rating: 5.0,
        }],
        fixtures: vec![FixtureRow {
            team: "GEE".into(),
            round: 1,
            opponent: "COL".into(),
            venue: None,
        }],
        difficulty,
    }
}

#[test]
fn missing_positional_table_is_data_unavailable() {
    let mut tables = single_round_tables();
    tables.difficulty.remove(&Position::Ruck);
    let catalog = MatchupCatalog::new(Arc::new(StaticTables::new(tables)));
    assert!(matches!(
        catalog.load(),
        Err(EngineError::DataUnavailable { .. })
    ));
}

#[test]
fn empty_positional_table_loads_with_default_difficulty() {
    let mut tables = single_round_tables();
    tables.difficulty.insert(Position::Ruck, Vec::new());
    let catalog = MatchupCatalog::new(Arc::new(StaticTables::new(tables)));
    let m = catalog.load().expect("header-only table still loads");
    for round in 1..=3 {
        let d = m.matchup_difficulty("GEE", "RUCK", round);
        assert_eq!(d.value, DEFAULT_DIFFICULTY);
        assert!(d.fallback);
    }
    let graded = m.matchup_difficulty("GEE", "MID", 1);
    assert_eq!(graded.value, 6.0);
    assert!(!graded.fallback);
}

#[test]
fn stored_pairs_return_stored_values_and_absent_pairs_return_default() {
    let grid: Vec<(&str, u32, f64)> = vec![
        ("GEE", 1, 2.5),
        ("GEE", 2, 9.0),
        ("COL", 1, 0.0),
        ("SYD", 3, 10.0),
    ];
    let mut difficulty = HashMap::new();
    for pos in Position::ALL {
        difficulty.insert(
            pos,
            grid.iter()
                .map(|(team, round, d)| DifficultyRow {
                    team: team.to_string(),
                    round: *round,
                    difficulty: *d,
                })
                .collect(),
        );
    }
    let tables = RawTables {
        dvp: vec![DvpRow {
            team: "GEE".into(),
            position: "MID".into(),
            rating: 5.0,
        }],
        fixtures: vec![FixtureRow {
            team: "GEE".into(),
            round: 1,
            opponent: "COL".into(),
            venue: None,
        }],
        difficulty,
    };
    let catalog = MatchupCatalog::new(Arc::new(StaticTables::new(tables)));
    let m = catalog.load().expect("load");

    for pos in ["FWD", "MID", "DEF", "RUCK", "RUC/FWD"] {
        for team in ["GEE", "COL", "SYD", "CAR"] {
            for round in 1..=4 {
                let got = m.matchup_difficulty(team, pos, round);
                match grid.iter().find(|(t, r, _)| *t == team && *r == round) {
                    Some((_, _, want)) => {
                        assert_eq!(got.value, *want, "{team} {pos} r{round}");
                        assert!(!got.fallback);
                    }
                    None => {
                        assert_eq!(got.value, DEFAULT_DIFFICULTY, "{team} {pos} r{round}");
                        assert_eq!(got.value, 5.0);
                        assert!(got.fallback);
                    }
                }
            }
        }
    }
}

#[test]
fn team_variants_resolve_for_queries() {
    let catalog = csv_catalog();
    let m = catalog.load().expect("load");
    assert_eq!(catalog.resolve_team("geelong cats"), "Geelong");
    assert_eq!(m.resolve_team("Unknown FC"), "Unknown FC");
    assert_eq!(m.matchup_difficulty("Cats", "mid", 1).value, 6.0);
    let fixture = m.fixtures("sydney").expect("sydney fixtures");
    assert_eq!(fixture.opponent(1), Some("Carlton"));
    assert!(m.fixtures("Tasmania").is_none());
    let rating = m.dvp_rating("pies").expect("collingwood dvp");
    assert_eq!(rating.for_position(Position::Mid), Some(7.0));
    assert_eq!(rating.for_position(Position::Ruck), Some(6.0));
    assert!(m.dvp_rating("Tasmania").is_none());
}

#[test]
fn fixture_difficulty_skips_bye_rounds() {
    let catalog = csv_catalog();
    let m = catalog.load().expect("load");
    let rows = m.fixture_difficulty("GEE", "FWD", &[1, 2, 3]);
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].round, 1);
    assert_eq!(rows[0].opponent, "Collingwood");
    assert_eq!(rows[0].difficulty.value, 4.0);
    assert_eq!(rows[1].round, 2);
    assert_eq!(rows[1].opponent, "Sydney");
    assert_eq!(rows[1].difficulty.value, 3.0);
}

#[test]
fn all_team_fixture_difficulty_averages_positions() {
    let catalog = csv_catalog();
    let m = catalog.load().expect("load");
    let all = m.all_team_fixture_difficulty();
    let names: Vec<&str> = all.iter().map(|t| t.team.as_str()).collect();
    assert_eq!(names, vec!["Carlton", "Collingwood", "Geelong", "Sydney"]);

    let geelong = all.iter().find(|t| t.team == "Geelong").unwrap();
    let rounds: Vec<u32> = geelong.rounds.iter().map(|r| r.round).collect();
    assert_eq!(rounds, vec![1, 2]);
    // FWD=4, MID=6, DEF=5, RUCK=7
    assert_eq!(geelong.rounds[0].average, 5.5);
    assert_eq!(geelong.rounds[1].average, 4.0);
    assert_eq!(geelong.season_average, Some(4.8));

    // Round 2 is ungraded for Carlton, so every position reads the default.
    let carlton = all.iter().find(|t| t.team == "Carlton").unwrap();
    assert_eq!(carlton.rounds[0].average, 6.5);
    assert_eq!(carlton.rounds[1].average, DEFAULT_DIFFICULTY);
    assert_eq!(carlton.season_average, Some(5.8));

    for team in &all {
        assert!(team.rounds.windows(2).all(|w| w[0].round < w[1].round));
    }
}
