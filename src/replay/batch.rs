//! Multi-Game Batch Replay
//!
//! Games are independent, so they replay concurrently: one task per game, bounded by a
//! semaphore sized from `max_concurrent_games`. Within a game replay is strictly sequential.
//!
//! Cancellation is cooperative and only takes effect between games. A game that has started
//! always runs to completion; a partial snapshot sequence would break the one-snapshot-per-
//! record contract.

use crate::replay::adapter::{GroundTruth, RawGameData, SourceAdapter};
use crate::replay::config::ReplayConfig;
use crate::replay::driver::{ReplayDriver, ReplayOutcome};
use crate::replay::error::ReplayError;
use crate::replay::events::GameId;
use crate::replay::verifier::QualityGrade;
use chrono::{DateTime, Utc};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{info, warn};
use uuid::Uuid;

/// Per-game result inside a batch. A failed game never affects the others.
#[derive(Debug)]
pub enum GameResult {
    Completed(Box<ReplayOutcome>),
    Failed(ReplayError),
    /// Not started because the batch was cancelled first.
    Cancelled,
    /// The replay task panicked.
    Panicked(String),
}

#[derive(Debug)]
pub struct GameReport {
    pub game_id: GameId,
    pub result: GameResult,
}

impl GameReport {
    pub fn outcome(&self) -> Option<&ReplayOutcome> {
        match &self.result {
            GameResult::Completed(outcome) => Some(outcome.as_ref()),
            _ => None,
        }
    }
}

/// Serializable roll-up of a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub total_games: usize,
    pub completed: usize,
    pub failed: usize,
    pub cancelled: usize,
    pub total_snapshots: usize,
    pub grades: BTreeMap<QualityGrade, usize>,
    /// game id -> error kind
    pub failures: BTreeMap<GameId, String>,
}

#[derive(Debug)]
pub struct BatchReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Same order as the requested game ids.
    pub games: Vec<GameReport>,
}

impl BatchReport {
    pub fn completed(&self) -> impl Iterator<Item = &ReplayOutcome> {
        self.games.iter().filter_map(GameReport::outcome)
    }

    pub fn failed_count(&self) -> usize {
        self.games
            .iter()
            .filter(|g| matches!(g.result, GameResult::Failed(_) | GameResult::Panicked(_)))
            .count()
    }

    pub fn cancelled_count(&self) -> usize {
        self.games
            .iter()
            .filter(|g| matches!(g.result, GameResult::Cancelled))
            .count()
    }

    pub fn grade_histogram(&self) -> BTreeMap<QualityGrade, usize> {
        let mut grades = BTreeMap::new();
        for outcome in self.completed() {
            if let Some(v) = &outcome.verification {
                *grades.entry(v.quality_grade).or_insert(0) += 1;
            }
        }
        grades
    }

    pub fn summary(&self) -> BatchSummary {
        let failures = self
            .games
            .iter()
            .filter_map(|g| match &g.result {
                GameResult::Failed(e) => Some((g.game_id.clone(), e.kind().to_string())),
                GameResult::Panicked(_) => Some((g.game_id.clone(), "panicked".to_string())),
                _ => None,
            })
            .collect();
        BatchSummary {
            run_id: self.run_id,
            started_at: self.started_at,
            finished_at: self.finished_at,
            total_games: self.games.len(),
            completed: self.completed().count(),
            failed: self.failed_count(),
            cancelled: self.cancelled_count(),
            total_snapshots: self.completed().map(|o| o.snapshots.len()).sum(),
            grades: self.grade_histogram(),
            failures,
        }
    }
}

/// Replays many games against one shared adapter.
pub struct BatchRunner {
    adapter: Arc<dyn SourceAdapter>,
    config: Arc<ReplayConfig>,
    cancelled: Arc<AtomicBool>,
}

impl BatchRunner {
    pub fn new(adapter: Arc<dyn SourceAdapter>, config: ReplayConfig) -> Self {
        Self {
            adapter,
            config: Arc::new(config),
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Shared flag; setting it stops new games from starting.
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        self.cancelled.clone()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Load and replay every game, at most `max_concurrent_games` at a time.
    pub async fn run(&self, game_ids: Vec<GameId>) -> BatchReport {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        let workers = self.config.worker_count();
        info!(%run_id, games = game_ids.len(), workers, "Starting replay batch");

        let semaphore = Arc::new(Semaphore::new(workers));
        let mut handles = Vec::with_capacity(game_ids.len());
        let mut skipped = Vec::new();

        for game_id in game_ids {
            let permit = match semaphore.clone().acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => {
                    skipped.push(game_id);
                    continue;
                }
            };
            if self.is_cancelled() {
                skipped.push(game_id);
                continue;
            }

            let adapter = self.adapter.clone();
            let config = self.config.clone();
            let id = game_id.clone();
            let handle = tokio::spawn(async move {
                let _permit = permit;
                ReplayDriver::new(adapter.as_ref(), &config).run(&id).await
            });
            handles.push((game_id, handle));
        }

        let mut games = Vec::with_capacity(handles.len() + skipped.len());
        for (game_id, handle) in handles {
            let result = match handle.await {
                Ok(Ok(outcome)) => GameResult::Completed(Box::new(outcome)),
                Ok(Err(e)) => {
                    warn!(%run_id, game_id = %game_id, error = %e, "Game failed");
                    GameResult::Failed(e)
                }
                Err(e) => {
                    warn!(%run_id, game_id = %game_id, error = %e, "Replay task panicked");
                    GameResult::Panicked(e.to_string())
                }
            };
            games.push(GameReport { game_id, result });
        }
        if !skipped.is_empty() {
            info!(%run_id, skipped = skipped.len(), "Batch cancelled before all games started");
        }
        games.extend(skipped.into_iter().map(|game_id| GameReport {
            game_id,
            result: GameResult::Cancelled,
        }));

        self.finish(run_id, started_at, games)
    }

    /// Replay games whose data is already loaded. CPU-bound, parallelized with rayon.
    pub fn replay_preloaded(&self, games: Vec<(RawGameData, Option<GroundTruth>)>) -> BatchReport {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        info!(%run_id, games = games.len(), "Starting preloaded replay batch");

        let games: Vec<GameReport> = games
            .into_par_iter()
            .map(|(raw, truth)| {
                let game_id = raw.game_id.clone();
                if self.is_cancelled() {
                    return GameReport {
                        game_id,
                        result: GameResult::Cancelled,
                    };
                }
                let result = match ReplayDriver::new(self.adapter.as_ref(), &self.config)
                    .run_preloaded(&raw, truth)
                {
                    Ok(outcome) => GameResult::Completed(Box::new(outcome)),
                    Err(e) => GameResult::Failed(e),
                };
                GameReport { game_id, result }
            })
            .collect();

        self.finish(run_id, started_at, games)
    }

    fn finish(
        &self,
        run_id: Uuid,
        started_at: DateTime<Utc>,
        games: Vec<GameReport>,
    ) -> BatchReport {
        let report = BatchReport {
            run_id,
            started_at,
            finished_at: Utc::now(),
            games,
        };
        info!(
            %run_id,
            completed = report.completed().count(),
            failed = report.failed_count(),
            cancelled = report.cancelled_count(),
            "Replay batch finished"
        );
        report
    }
}
