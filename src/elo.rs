use std::collections::{HashMap, VecDeque};

use serde::{Deserialize, Serialize};

use crate::match_log::Surface;

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct EloConfig {
    pub k_factor: f64,
    pub rating_diff_factor: f64,
    pub initial_rating: f64,
    /// How many pre-match ratings to retain per entry for the momentum
    /// feature.
    pub momentum_window: usize,
}

impl Default for EloConfig {
    fn default() -> Self {
        Self {
            k_factor: 32.0,
            rating_diff_factor: 400.0,
            initial_rating: 1500.0,
            momentum_window: 5,
        }
    }
}

#[derive(Debug, Clone)]
struct RatingEntry {
    rating: f64,
    /// Last `momentum_window` pre-match ratings, oldest first.
    history: VecDeque<f64>,
}

/// Per (player, surface) skill rating. Each surface is an independent
/// partition: a clay result never moves a hard-court rating.
#[derive(Debug, Clone)]
pub struct EloTracker {
    cfg: EloConfig,
    ratings: HashMap<(u32, Surface), RatingEntry>,
}

impl EloTracker {
    pub fn new(cfg: EloConfig) -> Self {
        Self {
            cfg,
            ratings: HashMap::new(),
        }
    }

    /// Current rating, or the configured initial rating for an unseen
    /// (player, surface). Reads never insert into the backing store, so a
    /// live query leaves the tracker bit-identical.
    pub fn rating(&self, player_id: u32, surface: Surface) -> f64 {
        self.ratings
            .get(&(player_id, surface))
            .map(|entry| entry.rating)
            .unwrap_or(self.cfg.initial_rating)
    }

    /// Current rating minus the oldest retained pre-match rating; 0.0
    /// until the player has a history on this surface. Positive means the
    /// rating has been climbing.
    pub fn momentum(&self, player_id: u32, surface: Surface) -> f64 {
        match self.ratings.get(&(player_id, surface)) {
            Some(entry) => match entry.history.front() {
                Some(oldest) => entry.rating - oldest,
                None => 0.0,
            },
            None => 0.0,
        }
    }

    /// Applies one result. Mutates exactly the two touched
    /// (player, surface) entries; both pre-match ratings are pushed into
    /// the bounded momentum histories before the delta is applied.
    pub fn update(&mut self, winner_id: u32, loser_id: u32, surface: Surface) {
        let winner_rating = self.rating(winner_id, surface);
        let loser_rating = self.rating(loser_id, surface);

        let expected_win = expected_score(winner_rating, loser_rating, self.cfg.rating_diff_factor);
        let delta = self.cfg.k_factor * (1.0 - expected_win);

        self.write_back(winner_id, surface, winner_rating, winner_rating + delta);
        self.write_back(loser_id, surface, loser_rating, loser_rating - delta);
    }

    fn write_back(&mut self, player_id: u32, surface: Surface, pre_rating: f64, new_rating: f64) {
        let window = self.cfg.momentum_window;
        let initial = self.cfg.initial_rating;
        let entry = self
            .ratings
            .entry((player_id, surface))
            .or_insert_with(|| RatingEntry {
                rating: initial,
                history: VecDeque::with_capacity(window),
            });
        if window > 0 {
            if entry.history.len() == window {
                entry.history.pop_front();
            }
            entry.history.push_back(pre_rating);
        }
        entry.rating = new_rating;
    }

    pub fn entries_tracked(&self) -> usize {
        self.ratings.len()
    }

    pub fn config(&self) -> &EloConfig {
        &self.cfg
    }
}

fn expected_score(r_winner: f64, r_loser: f64, diff_factor: f64) -> f64 {
    1.0 / (1.0 + 10.0_f64.powf((r_loser - r_winner) / diff_factor))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unseen_player_has_initial_rating_and_no_momentum() {
        let elo = EloTracker::new(EloConfig::default());
        assert_eq!(elo.rating(1, Surface::Hard), 1500.0);
        assert_eq!(elo.momentum(1, Surface::Hard), 0.0);
        assert_eq!(elo.entries_tracked(), 0);
    }

    #[test]
    fn reads_do_not_create_entries() {
        let elo = EloTracker::new(EloConfig::default());
        let _ = elo.rating(1, Surface::Clay);
        let _ = elo.momentum(1, Surface::Clay);
        assert_eq!(elo.entries_tracked(), 0);
    }

    #[test]
    fn even_rating_update_splits_the_k_factor() {
        let mut elo = EloTracker::new(EloConfig::default());
        elo.update(1, 2, Surface::Hard);
        // Both at 1500, K=32: expected = 0.5, so exactly +-16.
        assert_eq!(elo.rating(1, Surface::Hard), 1516.0);
        assert_eq!(elo.rating(2, Surface::Hard), 1484.0);
    }

    #[test]
    fn surfaces_are_independent() {
        let mut elo = EloTracker::new(EloConfig::default());
        elo.update(1, 2, Surface::Clay);
        assert_eq!(elo.rating(1, Surface::Hard), 1500.0);
        assert_eq!(elo.rating(1, Surface::Clay), 1516.0);
        assert_eq!(elo.rating(1, Surface::Unknown), 1500.0);
    }

    #[test]
    fn momentum_tracks_the_bounded_history() {
        let mut elo = EloTracker::new(EloConfig {
            momentum_window: 2,
            ..EloConfig::default()
        });
        elo.update(1, 2, Surface::Hard); // pre 1500.0
        elo.update(1, 3, Surface::Hard); // pre 1516.0
        let rating = elo.rating(1, Surface::Hard);
        assert!((elo.momentum(1, Surface::Hard) - (rating - 1500.0)).abs() < 1e-9);

        // Third update evicts the 1500.0 entry from the window.
        elo.update(1, 4, Surface::Hard);
        let rating = elo.rating(1, Surface::Hard);
        assert!((elo.momentum(1, Surface::Hard) - (rating - 1516.0)).abs() < 1e-9);
    }

    #[test]
    fn favorite_gains_less_than_half_k() {
        let mut elo = EloTracker::new(EloConfig::default());
        elo.update(1, 2, Surface::Hard);
        elo.update(1, 2, Surface::Hard);
        let gain_second = elo.rating(1, Surface::Hard) - 1516.0;
        assert!(gain_second < 16.0);
        assert!(gain_second > 0.0);
        // Zero-sum within the pair.
        let total = elo.rating(1, Surface::Hard) + elo.rating(2, Surface::Hard);
        assert!((total - 3000.0).abs() < 1e-9);
    }
}
