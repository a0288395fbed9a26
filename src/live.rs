use std::sync::{Arc, RwLock};

use anyhow::Result;
use chrono::{DateTime, Utc};
use tracing::info;

use crate::config::EngineConfig;
use crate::features::{FeatureAssembler, FeatureVector};
use crate::match_log::{MatchRecord, PlayerBook, Surface};
use crate::rankings::RankingLookup;
use crate::replay::{TrackerSet, warm_trackers};

/// Everything a live feature query needs, frozen at build time. The only
/// way to construct one is a full chronological replay, so a snapshot can
/// never drift from what the batch table would have contained.
#[derive(Debug, Clone)]
pub struct EngineSnapshot {
    cfg: EngineConfig,
    trackers: TrackerSet,
    rankings: RankingLookup,
    players: PlayerBook,
}

impl EngineSnapshot {
    pub fn build(
        cfg: EngineConfig,
        matches: &[MatchRecord],
        rankings: RankingLookup,
        players: PlayerBook,
    ) -> Result<Self> {
        let mut trackers = TrackerSet::new(&cfg);
        warm_trackers(matches, &rankings, &mut trackers)?;
        info!(
            matches = matches.len(),
            players = trackers.form.players_tracked(),
            "live snapshot built"
        );
        Ok(Self {
            cfg,
            trackers,
            rankings,
            players,
        })
    }

    /// One-off feature build against the frozen state. Same assembler as
    /// the batch replay; no side effect on the snapshot.
    pub fn query(
        &self,
        p1_id: u32,
        p2_id: u32,
        surface: Surface,
        date: DateTime<Utc>,
        match_id: &str,
    ) -> FeatureVector {
        let assembler = FeatureAssembler {
            cfg: &self.cfg,
            elo: &self.trackers.elo,
            form: &self.trackers.form,
            h2h: &self.trackers.h2h,
            rankings: &self.rankings,
            players: &self.players,
        };
        assembler.build(p1_id, p2_id, surface, date, match_id)
    }

    pub fn config(&self) -> &EngineConfig {
        &self.cfg
    }
}

/// Shared handle for concurrent readers. A refresh never mutates the live
/// snapshot in place: a replacement is built offline and the `Arc` is
/// swapped under a short write lock, so in-flight readers keep the
/// snapshot they already cloned.
pub struct LiveQueryService {
    snapshot: RwLock<Arc<EngineSnapshot>>,
}

impl LiveQueryService {
    pub fn new(snapshot: EngineSnapshot) -> Self {
        Self {
            snapshot: RwLock::new(Arc::new(snapshot)),
        }
    }

    pub fn snapshot(&self) -> Arc<EngineSnapshot> {
        match self.snapshot.read() {
            Ok(guard) => Arc::clone(&guard),
            // A poisoned lock only means a panic elsewhere mid-read; the
            // snapshot itself is immutable and still safe to hand out.
            Err(poisoned) => Arc::clone(&poisoned.into_inner()),
        }
    }

    pub fn query(
        &self,
        p1_id: u32,
        p2_id: u32,
        surface: Surface,
        date: DateTime<Utc>,
        match_id: &str,
    ) -> FeatureVector {
        self.snapshot().query(p1_id, p2_id, surface, date, match_id)
    }

    pub fn refresh(&self, snapshot: EngineSnapshot) {
        let next = Arc::new(snapshot);
        match self.snapshot.write() {
            Ok(mut guard) => *guard = next,
            Err(poisoned) => *poisoned.into_inner() = next,
        }
    }
}
