use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Court surface. `Unknown` is a real partition: ratings and form on an
/// unknown surface never bleed into the named ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Surface {
    Hard,
    Clay,
    Grass,
    Unknown,
}

impl Surface {
    pub const ALL: [Surface; 4] = [
        Surface::Hard,
        Surface::Clay,
        Surface::Grass,
        Surface::Unknown,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Surface::Hard => "Hard",
            Surface::Clay => "Clay",
            Surface::Grass => "Grass",
            Surface::Unknown => "Unknown",
        }
    }

    /// Parses an explicit surface value coming from the store. Anything
    /// unrecognized maps to `Unknown` rather than being collapsed into
    /// `Hard` or rejected.
    pub fn parse(raw: &str) -> Surface {
        match raw.trim().to_ascii_lowercase().as_str() {
            "hard" => Surface::Hard,
            "clay" => Surface::Clay,
            "grass" => Surface::Grass,
            _ => Surface::Unknown,
        }
    }
}

const CLAY_KEYWORDS: &[&str] = &["roland garros", "french open", "monte carlo", "madrid", "rome"];
const GRASS_KEYWORDS: &[&str] = &[
    "wimbledon",
    "queens club",
    "halle",
    "'s-hertogenbosch",
    "newport",
];

/// Derives the surface from a tournament name. An explicit `(clay)` style
/// tag wins over the keyword lists; a name matching nothing is treated as
/// a hard-court event, and a missing name stays `Unknown`.
pub fn surface_from_tourney(tourney_name: &str) -> Surface {
    let name = tourney_name.trim().to_ascii_lowercase();
    if name.is_empty() {
        return Surface::Unknown;
    }

    if name.contains("(clay)") {
        return Surface::Clay;
    }
    if name.contains("(grass)") {
        return Surface::Grass;
    }
    if name.contains("(hard)") {
        return Surface::Hard;
    }

    if GRASS_KEYWORDS.iter().any(|kw| name.contains(kw)) {
        return Surface::Grass;
    }
    if CLAY_KEYWORDS.iter().any(|kw| name.contains(kw)) {
        return Surface::Clay;
    }

    Surface::Hard
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Hand {
    #[serde(rename = "R")]
    Right,
    #[serde(rename = "L")]
    Left,
    #[serde(rename = "U")]
    Unknown,
}

impl Hand {
    pub fn as_str(self) -> &'static str {
        match self {
            Hand::Right => "R",
            Hand::Left => "L",
            Hand::Unknown => "U",
        }
    }

    pub fn parse(raw: &str) -> Hand {
        match raw.trim() {
            "R" | "r" => Hand::Right,
            "L" | "l" => Hand::Left,
            _ => Hand::Unknown,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerInfo {
    pub player_id: u32,
    pub hand: Hand,
}

/// Per-player attribute lookup used by the assembler. Unseen players get
/// an unknown handedness instead of a missing value.
#[derive(Debug, Clone, Default)]
pub struct PlayerBook {
    players: HashMap<u32, PlayerInfo>,
}

impl PlayerBook {
    pub fn from_rows(rows: Vec<PlayerInfo>) -> Self {
        let players = rows.into_iter().map(|p| (p.player_id, p)).collect();
        Self { players }
    }

    pub fn hand(&self, player_id: u32) -> Hand {
        self.players
            .get(&player_id)
            .map(|p| p.hand)
            .unwrap_or(Hand::Unknown)
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }
}

/// One row of the match log exactly as the upstream store hands it over.
/// Ids and date are optional here; validation turns rows into
/// `MatchRecord`s or drops them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawMatchRow {
    pub match_id: String,
    pub date: Option<String>,
    pub tourney_name: String,
    #[serde(default)]
    pub surface: Option<String>,
    pub winner_id: Option<u32>,
    pub loser_id: Option<u32>,
    #[serde(default)]
    pub score: String,
}

/// A validated match, constructed once at load time. The canonical pair is
/// order-independent: `p1` is always the smaller id.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchRecord {
    pub match_id: String,
    pub date: DateTime<Utc>,
    pub surface: Surface,
    pub winner_id: u32,
    pub loser_id: u32,
    pub sets_played: u32,
}

impl MatchRecord {
    pub fn p1_id(&self) -> u32 {
        self.winner_id.min(self.loser_id)
    }

    pub fn p2_id(&self) -> u32 {
        self.winner_id.max(self.loser_id)
    }

    /// Ground-truth label: 1 when the canonical `p1` won.
    pub fn p1_won(&self) -> u8 {
        u8::from(self.winner_id <= self.loser_id)
    }
}

/// Accepts RFC 3339 timestamps plus the date-only forms tennis archives
/// use (`2023-01-05`, `20230105`). Date-only values land at UTC midnight.
pub fn parse_match_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(raw, "%Y%m%d"))
        .ok()?;
    Some(date.and_time(NaiveTime::MIN).and_utc())
}

/// Whitespace-delimited score groups, e.g. `"6-4 3-6 7-6(4)"` -> 3.
pub fn sets_played(score: &str) -> u32 {
    score.split_whitespace().count() as u32
}

#[derive(Debug, Clone)]
pub struct PreparedMatches {
    pub matches: Vec<MatchRecord>,
    pub dropped: usize,
}

/// Validates raw rows into `MatchRecord`s and sorts them into the
/// non-decreasing `(date, match_id)` order the replay requires. Malformed
/// rows (unparseable date, missing ids, self-match) are dropped with a
/// warning, never propagated into the chronological pass.
pub fn prepare_matches(rows: Vec<RawMatchRow>) -> PreparedMatches {
    let mut matches = Vec::with_capacity(rows.len());
    let mut dropped = 0usize;

    for row in rows {
        match validate_row(&row) {
            Some(record) => matches.push(record),
            None => {
                dropped += 1;
                warn!(match_id = %row.match_id, "dropping malformed match row");
            }
        }
    }

    matches.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.match_id.cmp(&b.match_id)));
    PreparedMatches { matches, dropped }
}

fn validate_row(row: &RawMatchRow) -> Option<MatchRecord> {
    let date = parse_match_date(row.date.as_deref()?)?;
    let winner_id = row.winner_id?;
    let loser_id = row.loser_id?;
    if winner_id == loser_id {
        return None;
    }
    let surface = match row.surface.as_deref() {
        Some(explicit) if !explicit.trim().is_empty() => Surface::parse(explicit),
        _ => surface_from_tourney(&row.tourney_name),
    };
    Some(MatchRecord {
        match_id: row.match_id.clone(),
        date,
        surface,
        winner_id,
        loser_id,
        sets_played: sets_played(&row.score),
    })
}
