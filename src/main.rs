use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use tracing_subscriber::EnvFilter;

use tennis_edge::config::EngineConfig;
use tennis_edge::export;
use tennis_edge::match_log::{self, PlayerBook};
use tennis_edge::match_store;
use tennis_edge::rankings::RankingLookup;
use tennis_edge::replay::{TrackerSet, run_replay};

/// Batch entry point: full chronological replay over the stored match
/// log, feature table out, derived per-match Elo back into the store.
fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let mut args = std::env::args().skip(1);
    let db_path = args
        .next()
        .map(PathBuf::from)
        .or_else(|| std::env::var("TENNIS_EDGE_DB").ok().map(PathBuf::from))
        .ok_or_else(|| anyhow!("usage: tennis_edge <matches.sqlite> [features.csv]"))?;
    let out_path = args
        .next()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("features.csv"));

    let cfg = match std::env::var("TENNIS_EDGE_CONFIG") {
        Ok(path) => EngineConfig::load(Path::new(&path))?,
        Err(_) => EngineConfig::from_env(),
    };

    let mut conn = match_store::open_db(&db_path)?;
    let raw_rows = match_store::load_match_rows(&conn).context("load match log")?;
    let prepared = match_log::prepare_matches(raw_rows);

    let ranking_rows = match_store::load_ranking_rows(&conn).context("load ranking history")?;
    let rankings = RankingLookup::new(ranking_rows, cfg.default_rank);
    let players = PlayerBook::from_rows(match_store::load_players(&conn).context("load players")?);

    let mut trackers = TrackerSet::new(&cfg);
    let output = run_replay(&cfg, &prepared.matches, &rankings, &players, &mut trackers)
        .context("chronological replay")?;

    export::write_feature_table(&out_path, &output.rows).context("write feature table")?;
    match_store::replace_match_elo(&mut conn, &output.match_elo)
        .context("persist derived match elo")?;

    println!("Matches replayed: {}", prepared.matches.len());
    println!("Rows dropped before the pass: {}", prepared.dropped);
    println!("Players tracked: {}", trackers.form.players_tracked());
    println!("Feature table: {}", out_path.display());

    Ok(())
}
