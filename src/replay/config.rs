//! Replay configuration
//!
//! Period structure, validation limits, grading thresholds and batch concurrency.

use crate::replay::clock::PeriodTiming;
use crate::replay::validator::MAX_MINUTES_PLAYED;
use crate::replay::verifier::GradeThresholds;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Replay engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplayConfig {
    /// Compare the final snapshot against ground truth
    #[serde(default = "default_true")]
    pub verify: bool,

    /// Run the snapshot validator on every snapshot
    #[serde(default = "default_true")]
    pub validate: bool,

    /// Games replayed concurrently by the batch runner
    #[serde(default = "default_max_concurrent_games")]
    pub max_concurrent_games: usize,

    /// Period lengths
    #[serde(default)]
    pub timing: PeriodTiming,

    /// Per-player minutes ceiling used by the validator
    #[serde(default = "default_max_minutes_played")]
    pub max_minutes_played: f64,

    /// Discrepancy bounds for grades B/C/D
    #[serde(default)]
    pub grading: GradeThresholds,
}

fn default_true() -> bool {
    true
}

fn default_max_concurrent_games() -> usize {
    4
}

fn default_max_minutes_played() -> f64 {
    MAX_MINUTES_PLAYED
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            verify: true,
            validate: true,
            max_concurrent_games: default_max_concurrent_games(),
            timing: PeriodTiming::default(),
            max_minutes_played: MAX_MINUTES_PLAYED,
            grading: GradeThresholds::default(),
        }
    }
}

impl ReplayConfig {
    /// Load from TOML file
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Load from environment or default path
    pub fn from_env() -> Self {
        let path =
            std::env::var("REPLAY_CONFIG_PATH").unwrap_or_else(|_| "replay.toml".to_string());

        Self::load(&path).unwrap_or_else(|e| {
            tracing::debug!("Using default replay config ({}): {}", path, e);
            Self::default()
        })
    }

    /// Save to TOML file
    pub fn save(&self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        let contents = toml::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Concurrency bound, never below one.
    pub fn worker_count(&self) -> usize {
        self.max_concurrent_games.max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ReplayConfig::default();
        assert!(config.verify);
        assert_eq!(config.timing.regulation_period_secs, 720.0);
        assert_eq!(config.grading.d_max, 30);
    }

    #[test]
    fn test_toml_roundtrip() {
        let config = ReplayConfig::default();
        let toml = toml::to_string_pretty(&config).unwrap();
        let parsed: ReplayConfig = toml::from_str(&toml).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let parsed: ReplayConfig = toml::from_str(
            r#"
            verify = false
            max_concurrent_games = 0

            [timing]
            regulation_period_secs = 600.0
            "#,
        )
        .unwrap();
        assert!(!parsed.verify);
        assert!(parsed.validate);
        assert_eq!(parsed.worker_count(), 1);
        assert_eq!(parsed.timing.regulation_period_secs, 600.0);
        assert_eq!(parsed.timing.overtime_period_secs, 300.0);
        assert_eq!(parsed.grading.b_max, 5);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("replay.toml");
        let mut config = ReplayConfig::default();
        config.max_concurrent_games = 8;
        config.save(&path).unwrap();
        assert_eq!(ReplayConfig::load(&path).unwrap().max_concurrent_games, 8);
    }
}
