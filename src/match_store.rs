use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::Utc;
use rusqlite::{Connection, params};
use tracing::warn;

use crate::match_log::{Hand, PlayerInfo, RawMatchRow};
use crate::rankings::RankingRow;
use crate::replay::MatchEloRow;

pub fn open_db(path: &Path) -> Result<Connection> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).ok();
    }
    let conn =
        Connection::open(path).with_context(|| format!("open sqlite db {}", path.display()))?;
    init_schema(&conn)?;
    Ok(conn)
}

pub fn open_in_memory() -> Result<Connection> {
    let conn = Connection::open_in_memory().context("open in-memory sqlite db")?;
    init_schema(&conn)?;
    Ok(conn)
}

pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        PRAGMA journal_mode = WAL;
        CREATE TABLE IF NOT EXISTS matches (
            match_id TEXT PRIMARY KEY,
            date TEXT NULL,
            tourney_name TEXT NOT NULL,
            surface TEXT NULL,
            winner_id INTEGER NULL,
            loser_id INTEGER NULL,
            score TEXT NOT NULL DEFAULT '',
            updated_at TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_matches_date ON matches(date);

        CREATE TABLE IF NOT EXISTS rankings (
            ranking_date TEXT NOT NULL,
            player_id INTEGER NOT NULL,
            rank INTEGER NOT NULL,
            PRIMARY KEY (ranking_date, player_id)
        );

        CREATE TABLE IF NOT EXISTS players (
            player_id INTEGER PRIMARY KEY,
            hand TEXT NOT NULL
        );

        -- Derived output of the replay. Deliberately unconstrained:
        -- repeated or merged runs can leave duplicate match_ids, which the
        -- loader resolves first-wins.
        CREATE TABLE IF NOT EXISTS match_elo (
            match_id TEXT NOT NULL,
            p1_elo REAL NOT NULL,
            p2_elo REAL NOT NULL
        );
        "#,
    )
    .context("create sqlite schema")?;
    Ok(())
}

/// Upserts the raw match log as handed over by the ingestion collaborator.
/// Rows are stored as-is; validation happens at load time.
pub fn store_matches(conn: &mut Connection, rows: &[RawMatchRow]) -> Result<usize> {
    let tx = conn.transaction().context("begin match store transaction")?;
    for row in rows {
        tx.execute(
            r#"
            INSERT INTO matches (match_id, date, tourney_name, surface, winner_id, loser_id, score, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            ON CONFLICT(match_id) DO UPDATE SET
                date = excluded.date,
                tourney_name = excluded.tourney_name,
                surface = excluded.surface,
                winner_id = excluded.winner_id,
                loser_id = excluded.loser_id,
                score = excluded.score,
                updated_at = excluded.updated_at
            "#,
            params![
                row.match_id,
                row.date,
                row.tourney_name,
                row.surface,
                row.winner_id,
                row.loser_id,
                row.score,
                Utc::now().to_rfc3339(),
            ],
        )
        .context("upsert match")?;
    }
    tx.commit().context("commit match store transaction")?;
    Ok(rows.len())
}

/// Loads the full raw match log in the replay's `(date, match_id)` order.
pub fn load_match_rows(conn: &Connection) -> Result<Vec<RawMatchRow>> {
    let mut stmt = conn
        .prepare(
            r#"
            SELECT match_id, date, tourney_name, surface, winner_id, loser_id, score
            FROM matches
            ORDER BY date ASC, match_id ASC
            "#,
        )
        .context("prepare load matches query")?;

    let rows = stmt
        .query_map([], |row| {
            Ok(RawMatchRow {
                match_id: row.get(0)?,
                date: row.get(1)?,
                tourney_name: row.get(2)?,
                surface: row.get(3)?,
                winner_id: row.get(4)?,
                loser_id: row.get(5)?,
                score: row.get(6)?,
            })
        })
        .context("query load matches")?;

    let mut out = Vec::new();
    for row in rows {
        out.push(row.context("decode match row")?);
    }
    Ok(out)
}

pub fn store_rankings(conn: &mut Connection, rows: &[RankingRow]) -> Result<usize> {
    let tx = conn
        .transaction()
        .context("begin ranking store transaction")?;
    for row in rows {
        tx.execute(
            r#"
            INSERT INTO rankings (ranking_date, player_id, rank)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(ranking_date, player_id) DO UPDATE SET rank = excluded.rank
            "#,
            params![row.date.to_rfc3339(), row.player_id, row.rank],
        )
        .context("upsert ranking row")?;
    }
    tx.commit().context("commit ranking store transaction")?;
    Ok(rows.len())
}

pub fn load_ranking_rows(conn: &Connection) -> Result<Vec<RankingRow>> {
    let mut stmt = conn
        .prepare("SELECT ranking_date, player_id, rank FROM rankings")
        .context("prepare load rankings query")?;

    let rows = stmt
        .query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, u32>(1)?,
                row.get::<_, u32>(2)?,
            ))
        })
        .context("query load rankings")?;

    let mut out = Vec::new();
    for row in rows {
        let (raw_date, player_id, rank) = row.context("decode ranking row")?;
        match crate::match_log::parse_match_date(&raw_date) {
            Some(date) => out.push(RankingRow {
                date,
                player_id,
                rank,
            }),
            None => warn!(player_id, %raw_date, "dropping ranking row with unparseable date"),
        }
    }
    Ok(out)
}

pub fn store_players(conn: &mut Connection, rows: &[PlayerInfo]) -> Result<usize> {
    let tx = conn
        .transaction()
        .context("begin player store transaction")?;
    for row in rows {
        tx.execute(
            r#"
            INSERT INTO players (player_id, hand)
            VALUES (?1, ?2)
            ON CONFLICT(player_id) DO UPDATE SET hand = excluded.hand
            "#,
            params![row.player_id, row.hand.as_str()],
        )
        .context("upsert player row")?;
    }
    tx.commit().context("commit player store transaction")?;
    Ok(rows.len())
}

pub fn load_players(conn: &Connection) -> Result<Vec<PlayerInfo>> {
    let mut stmt = conn
        .prepare("SELECT player_id, hand FROM players")
        .context("prepare load players query")?;

    let rows = stmt
        .query_map([], |row| {
            Ok((row.get::<_, u32>(0)?, row.get::<_, String>(1)?))
        })
        .context("query load players")?;

    let mut out = Vec::new();
    for row in rows {
        let (player_id, hand) = row.context("decode player row")?;
        out.push(PlayerInfo {
            player_id,
            hand: Hand::parse(&hand),
        });
    }
    Ok(out)
}

/// Replaces the derived per-match Elo table with the rows of a fresh
/// replay, inside one transaction so a failed run never leaves a mix of
/// old and new rows.
pub fn replace_match_elo(conn: &mut Connection, rows: &[MatchEloRow]) -> Result<usize> {
    let tx = conn.transaction().context("begin match elo transaction")?;
    tx.execute("DELETE FROM match_elo", [])
        .context("clear match elo table")?;
    for row in rows {
        tx.execute(
            "INSERT INTO match_elo (match_id, p1_elo, p2_elo) VALUES (?1, ?2, ?3)",
            params![row.match_id, row.p1_elo, row.p2_elo],
        )
        .context("insert match elo row")?;
    }
    tx.commit().context("commit match elo transaction")?;
    Ok(rows.len())
}

/// Loads the auxiliary per-match Elo lookup. A duplicated match_id keeps
/// the first row encountered and logs the rest; duplicates are never
/// averaged or silently merged.
pub fn load_match_elo(conn: &Connection) -> Result<HashMap<String, (f64, f64)>> {
    let mut stmt = conn
        .prepare("SELECT match_id, p1_elo, p2_elo FROM match_elo ORDER BY rowid ASC")
        .context("prepare load match elo query")?;

    let rows = stmt
        .query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, f64>(1)?,
                row.get::<_, f64>(2)?,
            ))
        })
        .context("query load match elo")?;

    let mut out = HashMap::new();
    for row in rows {
        let (match_id, p1_elo, p2_elo) = row.context("decode match elo row")?;
        if out.contains_key(&match_id) {
            warn!(%match_id, "duplicate match_id in match_elo table, keeping first row");
            continue;
        }
        out.insert(match_id, (p1_elo, p2_elo));
    }
    Ok(out)
}
