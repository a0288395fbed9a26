use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::elo::EloTracker;
use crate::form::FormTracker;
use crate::h2h::H2hTracker;
use crate::match_log::{Hand, PlayerBook, Surface};
use crate::rankings::RankingLookup;

/// The symmetric pre-match feature set for one (p1, p2) pairing.
/// Swapping the two players mirrors every p1/p2 field and negates every
/// diff; nothing in here is ever null, unseen players resolve to the
/// documented defaults instead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    pub match_id: String,
    pub date: DateTime<Utc>,
    pub surface: Surface,
    pub p1_id: u32,
    pub p2_id: u32,

    pub p1_rank: u32,
    pub p2_rank: u32,
    pub rank_diff: i64,

    pub p1_elo: f64,
    pub p2_elo: f64,
    pub elo_diff: f64,
    pub p1_elo_momentum: f64,
    pub p2_elo_momentum: f64,

    pub p1_win_perc: f64,
    pub p2_win_perc: f64,
    pub p1_surface_win_perc: f64,
    pub p2_surface_win_perc: f64,
    pub p1_form_last_10: f64,
    pub p2_form_last_10: f64,
    pub p1_rolling_win_perc_20: f64,
    pub p2_rolling_win_perc_20: f64,
    pub p1_rolling_win_perc_50: f64,
    pub p2_rolling_win_perc_50: f64,

    pub p1_matches_last_7_days: u32,
    pub p2_matches_last_7_days: u32,
    pub p1_matches_last_14_days: u32,
    pub p2_matches_last_14_days: u32,
    pub fatigue_diff_7_days: i64,
    pub fatigue_diff_14_days: i64,
    pub p1_sets_last_7_days: u32,
    pub p2_sets_last_7_days: u32,
    pub p1_sets_last_14_days: u32,
    pub p2_sets_last_14_days: u32,
    pub fatigue_sets_diff_7_days: i64,
    pub fatigue_sets_diff_14_days: i64,
    pub p1_rest_days: i64,
    pub p2_rest_days: i64,

    pub p1_avg_opp_rank_last_10: f64,
    pub p2_avg_opp_rank_last_10: f64,

    pub p1_h2h_wins: u32,
    pub p2_h2h_wins: u32,

    pub p1_hand: Hand,
    pub p2_hand: Hand,
}

/// A batch feature-table row: the vector plus the ground-truth label
/// (1 when p1 won). The live path never sees this type.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureRow {
    pub features: FeatureVector,
    pub winner: u8,
}

/// Reads tracker state, never mutates it. The exact same `build` serves
/// the chronological batch replay and the live one-off query, which is
/// what keeps the training table and live features from drifting apart.
#[derive(Debug, Clone, Copy)]
pub struct FeatureAssembler<'a> {
    pub cfg: &'a EngineConfig,
    pub elo: &'a EloTracker,
    pub form: &'a FormTracker,
    pub h2h: &'a H2hTracker,
    pub rankings: &'a RankingLookup,
    pub players: &'a PlayerBook,
}

impl<'a> FeatureAssembler<'a> {
    pub fn build(
        &self,
        p1_id: u32,
        p2_id: u32,
        surface: Surface,
        date: DateTime<Utc>,
        match_id: &str,
    ) -> FeatureVector {
        let cfg = self.cfg;
        let [fatigue_short, fatigue_long] = cfg.fatigue_windows_days;
        let [rolling_short, rolling_long] = cfg.rolling_windows;

        let p1_rank = self.rankings.most_recent_rank(p1_id, date);
        let p2_rank = self.rankings.most_recent_rank(p2_id, date);

        let p1_elo = self.elo.rating(p1_id, surface);
        let p2_elo = self.elo.rating(p2_id, surface);

        let p1_matches_last_7_days = self.form.matches_in_window(p1_id, date, fatigue_short);
        let p2_matches_last_7_days = self.form.matches_in_window(p2_id, date, fatigue_short);
        let p1_matches_last_14_days = self.form.matches_in_window(p1_id, date, fatigue_long);
        let p2_matches_last_14_days = self.form.matches_in_window(p2_id, date, fatigue_long);
        let p1_sets_last_7_days = self.form.sets_in_window(p1_id, date, fatigue_short);
        let p2_sets_last_7_days = self.form.sets_in_window(p2_id, date, fatigue_short);
        let p1_sets_last_14_days = self.form.sets_in_window(p1_id, date, fatigue_long);
        let p2_sets_last_14_days = self.form.sets_in_window(p2_id, date, fatigue_long);

        let (p1_h2h_wins, p2_h2h_wins) = self.h2h.get(p1_id, p2_id);

        FeatureVector {
            match_id: match_id.to_string(),
            date,
            surface,
            p1_id,
            p2_id,

            p1_rank,
            p2_rank,
            rank_diff: i64::from(p1_rank) - i64::from(p2_rank),

            p1_elo,
            p2_elo,
            elo_diff: p1_elo - p2_elo,
            p1_elo_momentum: self.elo.momentum(p1_id, surface),
            p2_elo_momentum: self.elo.momentum(p2_id, surface),

            p1_win_perc: self.form.win_perc(p1_id),
            p2_win_perc: self.form.win_perc(p2_id),
            p1_surface_win_perc: self.form.surface_win_perc(p1_id, surface),
            p2_surface_win_perc: self.form.surface_win_perc(p2_id, surface),
            p1_form_last_10: self.form.form_last_n(p1_id, cfg.form_window),
            p2_form_last_10: self.form.form_last_n(p2_id, cfg.form_window),
            p1_rolling_win_perc_20: self.form.form_last_n(p1_id, rolling_short),
            p2_rolling_win_perc_20: self.form.form_last_n(p2_id, rolling_short),
            p1_rolling_win_perc_50: self.form.form_last_n(p1_id, rolling_long),
            p2_rolling_win_perc_50: self.form.form_last_n(p2_id, rolling_long),

            p1_matches_last_7_days,
            p2_matches_last_7_days,
            p1_matches_last_14_days,
            p2_matches_last_14_days,
            fatigue_diff_7_days: i64::from(p1_matches_last_7_days)
                - i64::from(p2_matches_last_7_days),
            fatigue_diff_14_days: i64::from(p1_matches_last_14_days)
                - i64::from(p2_matches_last_14_days),
            p1_sets_last_7_days,
            p2_sets_last_7_days,
            p1_sets_last_14_days,
            p2_sets_last_14_days,
            fatigue_sets_diff_7_days: i64::from(p1_sets_last_7_days)
                - i64::from(p2_sets_last_7_days),
            fatigue_sets_diff_14_days: i64::from(p1_sets_last_14_days)
                - i64::from(p2_sets_last_14_days),
            p1_rest_days: self.form.rest_days(p1_id, date),
            p2_rest_days: self.form.rest_days(p2_id, date),

            p1_avg_opp_rank_last_10: self.form.avg_opponent_rank(p1_id, cfg.opponent_rank_window),
            p2_avg_opp_rank_last_10: self.form.avg_opponent_rank(p2_id, cfg.opponent_rank_window),

            p1_h2h_wins,
            p2_h2h_wins,

            p1_hand: self.players.hand(p1_id),
            p2_hand: self.players.hand(p2_id),
        }
    }
}
