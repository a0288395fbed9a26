use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};
use tracing_subscriber::EnvFilter;

use tennis_edge::config::EngineConfig;
use tennis_edge::live::EngineSnapshot;
use tennis_edge::match_log::{self, PlayerBook, Surface, parse_match_date, surface_from_tourney};
use tennis_edge::match_store;
use tennis_edge::rankings::RankingLookup;

#[derive(Debug, serde::Deserialize)]
struct LiveCase {
    p1_id: u32,
    p2_id: u32,
    #[serde(default)]
    surface: Option<String>,
    #[serde(default)]
    tourney_name: Option<String>,
    date: String,
    #[serde(default)]
    match_id: Option<String>,
}

/// Answers one upcoming-match feature query: replay the stored history
/// into a snapshot, build the vector for the case file, print it as JSON.
/// No state is persisted.
fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let case_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("tests/fixtures/live_case.json"));
    let db_path = std::env::args()
        .nth(2)
        .map(PathBuf::from)
        .or_else(|| std::env::var("TENNIS_EDGE_DB").ok().map(PathBuf::from))
        .ok_or_else(|| anyhow!("usage: live_probe <case.json> <matches.sqlite>"))?;

    let raw = fs::read_to_string(&case_path)
        .with_context(|| format!("read live case {}", case_path.display()))?;
    let case: LiveCase = serde_json::from_str(&raw)
        .with_context(|| format!("parse live case {}", case_path.display()))?;

    let date = parse_match_date(&case.date)
        .ok_or_else(|| anyhow!("live case date {:?} does not parse", case.date))?;
    let surface = match (&case.surface, &case.tourney_name) {
        (Some(explicit), _) => Surface::parse(explicit),
        (None, Some(tourney)) => surface_from_tourney(tourney),
        (None, None) => Surface::Unknown,
    };

    let cfg = match std::env::var("TENNIS_EDGE_CONFIG") {
        Ok(path) => EngineConfig::load(std::path::Path::new(&path))?,
        Err(_) => EngineConfig::from_env(),
    };
    let conn = match_store::open_db(&db_path)?;
    let prepared = match_log::prepare_matches(match_store::load_match_rows(&conn)?);
    let rankings = RankingLookup::new(match_store::load_ranking_rows(&conn)?, cfg.default_rank);
    let players = PlayerBook::from_rows(match_store::load_players(&conn)?);

    let snapshot = EngineSnapshot::build(cfg, &prepared.matches, rankings, players)?;
    let match_id = case.match_id.as_deref().unwrap_or("live-query");
    let features = snapshot.query(case.p1_id, case.p2_id, surface, date, match_id);

    println!(
        "{}",
        serde_json::to_string_pretty(&features).context("serialize feature vector")?
    );
    Ok(())
}
