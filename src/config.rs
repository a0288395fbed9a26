use std::fs;
use std::path::Path;
use std::str::FromStr;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::elo::EloConfig;

/// Engine-wide knobs. Every field has a default, so a config file only
/// needs to name what it changes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub elo: EloConfig,
    pub default_rank: u32,
    /// Short-term form window (matches).
    pub form_window: usize,
    /// Longer rolling win-rate windows (matches).
    pub rolling_windows: [usize; 2],
    /// Trailing fatigue windows (days).
    pub fatigue_windows_days: [i64; 2],
    /// How many recent opponents feed the average-opponent-rank feature.
    pub opponent_rank_window: usize,
    /// Rest days assumed for a player's first recorded match.
    pub default_rest_days: i64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            elo: EloConfig::default(),
            default_rank: 500,
            form_window: 10,
            rolling_windows: [20, 50],
            fatigue_windows_days: [7, 14],
            opponent_rank_window: 10,
            default_rest_days: 30,
        }
    }
}

impl EngineConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("read engine config {}", path.display()))?;
        let mut cfg: EngineConfig = serde_json::from_str(&raw)
            .with_context(|| format!("parse engine config {}", path.display()))?;
        cfg.apply_env_overrides();
        Ok(cfg)
    }

    /// Defaults plus whatever the environment overrides; used when no
    /// config file is given.
    pub fn from_env() -> Self {
        let mut cfg = Self::default();
        cfg.apply_env_overrides();
        cfg
    }

    fn apply_env_overrides(&mut self) {
        self.elo.k_factor = parse_env_or("TENNIS_EDGE_K_FACTOR", self.elo.k_factor);
        self.elo.initial_rating = parse_env_or("TENNIS_EDGE_INITIAL_RATING", self.elo.initial_rating);
        self.default_rank = parse_env_or("TENNIS_EDGE_DEFAULT_RANK", self.default_rank);
    }
}

fn parse_env_or<T: FromStr + Copy>(key: &str, fallback: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|raw| raw.trim().parse::<T>().ok())
        .unwrap_or(fallback)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_documented_constants() {
        let cfg = EngineConfig::default();
        assert_eq!(cfg.elo.k_factor, 32.0);
        assert_eq!(cfg.elo.rating_diff_factor, 400.0);
        assert_eq!(cfg.elo.initial_rating, 1500.0);
        assert_eq!(cfg.default_rank, 500);
        assert_eq!(cfg.form_window, 10);
        assert_eq!(cfg.fatigue_windows_days, [7, 14]);
    }

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let cfg: EngineConfig =
            serde_json::from_str(r#"{"default_rank": 250}"#).expect("partial config parses");
        assert_eq!(cfg.default_rank, 250);
        assert_eq!(cfg.elo.k_factor, 32.0);
        assert_eq!(cfg.rolling_windows, [20, 50]);
    }

    #[test]
    fn config_round_trips_through_json() {
        let cfg = EngineConfig::default();
        let json = serde_json::to_string(&cfg).expect("serialize config");
        let back: EngineConfig = serde_json::from_str(&json).expect("parse config");
        assert_eq!(back.default_rank, cfg.default_rank);
        assert_eq!(back.elo.momentum_window, cfg.elo.momentum_window);
    }
}
