use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

pub const DEFAULT_RANK: u32 = 500;

/// One row of the official ranking history as loaded from the store.
/// Rows arrive in no particular order; the lookup sorts and partitions
/// them on construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankingRow {
    pub date: DateTime<Utc>,
    pub player_id: u32,
    pub rank: u32,
}

/// Point-in-time rank resolution. Rows are partitioned per player and kept
/// date-ascending so each query is a single binary search; a linear scan
/// would not survive a query per match over a multi-decade history.
#[derive(Debug, Clone)]
pub struct RankingLookup {
    by_player: HashMap<u32, Vec<(DateTime<Utc>, u32)>>,
    default_rank: u32,
}

impl RankingLookup {
    pub fn new(mut rows: Vec<RankingRow>, default_rank: u32) -> Self {
        rows.par_sort_unstable_by(|a, b| {
            a.date
                .cmp(&b.date)
                .then_with(|| a.player_id.cmp(&b.player_id))
                .then_with(|| a.rank.cmp(&b.rank))
        });

        let mut by_player: HashMap<u32, Vec<(DateTime<Utc>, u32)>> = HashMap::new();
        for row in rows {
            by_player
                .entry(row.player_id)
                .or_default()
                .push((row.date, row.rank));
        }
        Self {
            by_player,
            default_rank,
        }
    }

    pub fn empty(default_rank: u32) -> Self {
        Self {
            by_player: HashMap::new(),
            default_rank,
        }
    }

    /// Rank from the latest row strictly before `date`. A ranking published
    /// on the match day itself is not used; the previous publication wins.
    pub fn most_recent_rank(&self, player_id: u32, date: DateTime<Utc>) -> u32 {
        let Some(rows) = self.by_player.get(&player_id) else {
            return self.default_rank;
        };
        let idx = rows.partition_point(|(row_date, _)| *row_date < date);
        if idx == 0 {
            self.default_rank
        } else {
            rows[idx - 1].1
        }
    }

    pub fn default_rank(&self) -> u32 {
        self.default_rank
    }

    pub fn players_tracked(&self) -> usize {
        self.by_player.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::match_log::parse_match_date;

    fn lookup() -> RankingLookup {
        let rows = vec![
            // Deliberately out of order; construction must sort.
            RankingRow {
                date: parse_match_date("2023-03-01").unwrap(),
                player_id: 7,
                rank: 10,
            },
            RankingRow {
                date: parse_match_date("2023-01-01").unwrap(),
                player_id: 7,
                rank: 30,
            },
            RankingRow {
                date: parse_match_date("2023-02-01").unwrap(),
                player_id: 7,
                rank: 20,
            },
        ];
        RankingLookup::new(rows, DEFAULT_RANK)
    }

    #[test]
    fn query_between_rows_takes_the_earlier_row() {
        let lk = lookup();
        let date = parse_match_date("2023-02-02").unwrap();
        assert_eq!(lk.most_recent_rank(7, date), 20);
    }

    #[test]
    fn same_day_ranking_is_not_visible() {
        // Strict inequality: a query exactly on D2 sees the D1 rank.
        let lk = lookup();
        let d2 = parse_match_date("2023-02-01").unwrap();
        assert_eq!(lk.most_recent_rank(7, d2), 30);
    }

    #[test]
    fn before_first_row_and_unknown_player_use_default() {
        let lk = lookup();
        let early = parse_match_date("2022-12-31").unwrap();
        assert_eq!(lk.most_recent_rank(7, early), DEFAULT_RANK);
        assert_eq!(lk.most_recent_rank(999, early), DEFAULT_RANK);
    }

    #[test]
    fn latest_row_applies_after_all_publications() {
        let lk = lookup();
        let late = parse_match_date("2024-01-01").unwrap();
        assert_eq!(lk.most_recent_rank(7, late), 10);
    }
}
