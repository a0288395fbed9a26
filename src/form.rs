use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::match_log::Surface;

/// One finished match from a single player's perspective.
#[derive(Debug, Clone, Copy)]
struct Outcome {
    date: DateTime<Utc>,
    won: bool,
    sets_played: u32,
    opponent_rank: u32,
}

#[derive(Debug, Clone, Default)]
struct FormEntry {
    matches_played: u32,
    wins: u32,
    surface_matches: HashMap<Surface, u32>,
    surface_wins: HashMap<Surface, u32>,
    /// Append-only, in replay order (non-decreasing dates). Retained in
    /// full: every trailing-window query filters this history, so pruning
    /// would be an optimization, not a correctness requirement.
    outcomes: Vec<Outcome>,
}

/// Per-player win rates, recent form, fatigue windows, rest and opponent
/// quality. All query methods read state accumulated strictly before the
/// querying match and fall back to documented defaults for unseen players.
#[derive(Debug, Clone)]
pub struct FormTracker {
    default_rank: u32,
    default_rest_days: i64,
    entries: HashMap<u32, FormEntry>,
}

impl FormTracker {
    pub fn new(default_rank: u32, default_rest_days: i64) -> Self {
        Self {
            default_rank,
            default_rest_days,
            entries: HashMap::new(),
        }
    }

    pub fn win_perc(&self, player_id: u32) -> f64 {
        match self.entries.get(&player_id) {
            Some(entry) if entry.matches_played > 0 => {
                f64::from(entry.wins) / f64::from(entry.matches_played)
            }
            _ => 0.0,
        }
    }

    pub fn surface_win_perc(&self, player_id: u32, surface: Surface) -> f64 {
        let Some(entry) = self.entries.get(&player_id) else {
            return 0.0;
        };
        let played = entry.surface_matches.get(&surface).copied().unwrap_or(0);
        if played == 0 {
            return 0.0;
        }
        let won = entry.surface_wins.get(&surface).copied().unwrap_or(0);
        f64::from(won) / f64::from(played)
    }

    /// Win rate over the last `n` matches (any surface); 0.0 with no
    /// history. Used for both short-term form (n=10) and the longer
    /// rolling windows (n=20, n=50).
    pub fn form_last_n(&self, player_id: u32, n: usize) -> f64 {
        let Some(entry) = self.entries.get(&player_id) else {
            return 0.0;
        };
        if entry.outcomes.is_empty() || n == 0 {
            return 0.0;
        }
        let tail = &entry.outcomes[entry.outcomes.len().saturating_sub(n)..];
        let wins = tail.iter().filter(|o| o.won).count();
        wins as f64 / tail.len() as f64
    }

    /// Matches inside the trailing window, same-day included:
    /// `(date - outcome.date) <= days` in whole days.
    pub fn matches_in_window(&self, player_id: u32, date: DateTime<Utc>, days: i64) -> u32 {
        self.window(player_id, date, days).count() as u32
    }

    pub fn sets_in_window(&self, player_id: u32, date: DateTime<Utc>, days: i64) -> u32 {
        self.window(player_id, date, days)
            .map(|o| o.sets_played)
            .sum()
    }

    /// Whole days since the previous match, or the configured default for
    /// a debut.
    pub fn rest_days(&self, player_id: u32, date: DateTime<Utc>) -> i64 {
        match self
            .entries
            .get(&player_id)
            .and_then(|entry| entry.outcomes.last())
        {
            Some(last) => (date - last.date).num_days(),
            None => self.default_rest_days,
        }
    }

    /// Mean rank of the opponents faced over the last `n` matches;
    /// defaults to the configured rank for a player with no history.
    pub fn avg_opponent_rank(&self, player_id: u32, n: usize) -> f64 {
        let Some(entry) = self.entries.get(&player_id) else {
            return f64::from(self.default_rank);
        };
        if entry.outcomes.is_empty() || n == 0 {
            return f64::from(self.default_rank);
        }
        let tail = &entry.outcomes[entry.outcomes.len().saturating_sub(n)..];
        let total: u64 = tail.iter().map(|o| u64::from(o.opponent_rank)).sum();
        total as f64 / tail.len() as f64
    }

    /// Records one finished match for both players. `winner_opponent_rank`
    /// is the loser's pre-match rank and vice versa, as resolved by the
    /// caller before this match mutated anything.
    #[allow(clippy::too_many_arguments)]
    pub fn update(
        &mut self,
        winner_id: u32,
        loser_id: u32,
        surface: Surface,
        date: DateTime<Utc>,
        sets_played: u32,
        winner_opponent_rank: u32,
        loser_opponent_rank: u32,
    ) {
        self.record(winner_id, surface, date, true, sets_played, winner_opponent_rank);
        self.record(loser_id, surface, date, false, sets_played, loser_opponent_rank);
    }

    fn record(
        &mut self,
        player_id: u32,
        surface: Surface,
        date: DateTime<Utc>,
        won: bool,
        sets_played: u32,
        opponent_rank: u32,
    ) {
        let entry = self.entries.entry(player_id).or_default();
        entry.matches_played += 1;
        *entry.surface_matches.entry(surface).or_insert(0) += 1;
        if won {
            entry.wins += 1;
            *entry.surface_wins.entry(surface).or_insert(0) += 1;
        }
        entry.outcomes.push(Outcome {
            date,
            won,
            sets_played,
            opponent_rank,
        });
    }

    fn window(
        &self,
        player_id: u32,
        date: DateTime<Utc>,
        days: i64,
    ) -> impl Iterator<Item = &Outcome> {
        self.entries
            .get(&player_id)
            .map(|entry| entry.outcomes.as_slice())
            .unwrap_or(&[])
            .iter()
            .filter(move |o| (date - o.date).num_days() <= days)
    }

    pub fn players_tracked(&self) -> usize {
        self.entries.len()
    }
}
