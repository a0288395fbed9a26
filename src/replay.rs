use anyhow::{Result, ensure};
use tracing::info;

use crate::config::EngineConfig;
use crate::elo::EloTracker;
use crate::features::{FeatureAssembler, FeatureRow};
use crate::form::FormTracker;
use crate::h2h::H2hTracker;
use crate::match_log::{MatchRecord, PlayerBook};
use crate::rankings::RankingLookup;

/// The mutable engine state for one replay. Constructed empty at the
/// start of a pass and owned by the caller; there is no process-wide
/// tracker state anywhere.
#[derive(Debug, Clone)]
pub struct TrackerSet {
    pub elo: EloTracker,
    pub form: FormTracker,
    pub h2h: H2hTracker,
}

impl TrackerSet {
    pub fn new(cfg: &EngineConfig) -> Self {
        Self {
            elo: EloTracker::new(cfg.elo),
            form: FormTracker::new(cfg.default_rank, cfg.default_rest_days),
            h2h: H2hTracker::new(),
        }
    }
}

/// Derived per-match pre-update surface ratings, persisted so downstream
/// joins can reuse them without replaying.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchEloRow {
    pub match_id: String,
    pub p1_elo: f64,
    pub p2_elo: f64,
}

#[derive(Debug, Clone)]
pub struct ReplayOutput {
    pub rows: Vec<FeatureRow>,
    pub match_elo: Vec<MatchEloRow>,
}

/// Walks the sorted match stream once. For every match, strictly in this
/// order: (1) assemble features from current tracker state, (2) emit the
/// labeled row, (3) apply this match's result to every tracker. Any error
/// aborts the whole pass, so a partial feature table is never returned.
pub fn run_replay(
    cfg: &EngineConfig,
    matches: &[MatchRecord],
    rankings: &RankingLookup,
    players: &PlayerBook,
    trackers: &mut TrackerSet,
) -> Result<ReplayOutput> {
    let mut rows = Vec::with_capacity(matches.len());
    let mut match_elo = Vec::with_capacity(matches.len());
    let mut prev_date = None;

    for m in matches {
        check_stream_invariants(m, &mut prev_date)?;

        let assembler = FeatureAssembler {
            cfg,
            elo: &trackers.elo,
            form: &trackers.form,
            h2h: &trackers.h2h,
            rankings,
            players,
        };
        let features = assembler.build(m.p1_id(), m.p2_id(), m.surface, m.date, &m.match_id);

        match_elo.push(MatchEloRow {
            match_id: m.match_id.clone(),
            p1_elo: features.p1_elo,
            p2_elo: features.p2_elo,
        });
        let (winner_rank, loser_rank) = if m.winner_id == m.p1_id() {
            (features.p1_rank, features.p2_rank)
        } else {
            (features.p2_rank, features.p1_rank)
        };
        rows.push(FeatureRow {
            features,
            winner: m.p1_won(),
        });

        apply_updates(trackers, m, winner_rank, loser_rank);
    }

    info!(
        matches = matches.len(),
        players = trackers.form.players_tracked(),
        "chronological replay finished"
    );
    Ok(ReplayOutput { rows, match_elo })
}

/// Replays the stream for state only, skipping feature assembly. Used to
/// warm a live snapshot; the update sequence is identical to
/// `run_replay`, so the resulting trackers are too.
pub fn warm_trackers(
    matches: &[MatchRecord],
    rankings: &RankingLookup,
    trackers: &mut TrackerSet,
) -> Result<()> {
    let mut prev_date = None;
    for m in matches {
        check_stream_invariants(m, &mut prev_date)?;
        // Pre-match ranks feed the opponent-quality history, so they are
        // resolved before this match touches any tracker.
        let winner_rank = rankings.most_recent_rank(m.winner_id, m.date);
        let loser_rank = rankings.most_recent_rank(m.loser_id, m.date);
        apply_updates(trackers, m, winner_rank, loser_rank);
    }
    Ok(())
}

fn check_stream_invariants(
    m: &MatchRecord,
    prev_date: &mut Option<chrono::DateTime<chrono::Utc>>,
) -> Result<()> {
    ensure!(
        m.winner_id != m.loser_id,
        "match {} pairs player {} with itself",
        m.match_id,
        m.winner_id
    );
    if let Some(prev) = *prev_date {
        ensure!(
            m.date >= prev,
            "match {} breaks chronological order ({} after {})",
            m.match_id,
            m.date,
            prev
        );
    }
    *prev_date = Some(m.date);
    Ok(())
}

fn apply_updates(trackers: &mut TrackerSet, m: &MatchRecord, winner_rank: u32, loser_rank: u32) {
    trackers.elo.update(m.winner_id, m.loser_id, m.surface);
    trackers.form.update(
        m.winner_id,
        m.loser_id,
        m.surface,
        m.date,
        m.sets_played,
        loser_rank,
        winner_rank,
    );
    trackers.h2h.update(m.winner_id, m.loser_id);
}
