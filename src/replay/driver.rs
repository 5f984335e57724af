//! Replay Driver
//!
//! Orchestrates one game: load -> initialize -> (parse -> apply -> snapshot -> validate)* ->
//! verify.
//!
//! # Phases
//!
//! ```text
//! NotStarted -> Loading -> Replaying -> Verifying -> Done
//!                  │            └─────────────────────▲   (verification disabled)
//!                  └-> Aborted
//! ```
//!
//! Only `Loading` can fail. Once replay starts, every raw record yields exactly one snapshot,
//! and missing ground truth degrades to an F-graded verification result.

use crate::replay::accumulator::{ApplyOutcome, StateAccumulator};
use crate::replay::adapter::{GroundTruth, InitialState, RawGameData, SourceAdapter};
use crate::replay::config::ReplayConfig;
use crate::replay::error::ReplayError;
use crate::replay::events::{GameId, ParsedEvent};
use crate::replay::fingerprint::fingerprint_snapshots;
use crate::replay::snapshot::{BoxScoreSnapshot, SnapshotFactory};
use crate::replay::validator::{validate_sequence, SnapshotValidator, ValidationReport, Violation};
use crate::replay::verifier::{VerificationResult, Verifier};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Lifecycle of one game's replay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReplayPhase {
    NotStarted,
    Loading,
    Replaying,
    Verifying,
    Done,
    Aborted,
}

impl ReplayPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Aborted)
    }

    pub fn can_transition_to(&self, next: ReplayPhase) -> bool {
        matches!(
            (self, next),
            (Self::NotStarted, Self::Loading)
                | (Self::Loading, Self::Replaying)
                | (Self::Loading, Self::Aborted)
                | (Self::Replaying, Self::Verifying)
                | (Self::Replaying, Self::Done)
                | (Self::Verifying, Self::Done)
        )
    }
}

/// A raw record that could not be parsed and was replayed as a no-op.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DegradedRecord {
    pub sequence_number: u64,
    pub reason: String,
}

/// Everything one successful replay produces.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplayOutcome {
    pub game_id: GameId,
    pub source_identifier: String,
    /// One per raw record, ordered by sequence number.
    pub snapshots: Vec<BoxScoreSnapshot>,
    pub verification: Option<VerificationResult>,
    /// Reports for snapshots that broke at least one invariant.
    pub diagnostics: Vec<ValidationReport>,
    pub sequence_violations: Vec<Violation>,
    pub degraded_records: Vec<DegradedRecord>,
    pub no_op_updates: u64,
    pub fingerprint: Option<String>,
    pub phase_history: Vec<ReplayPhase>,
}

impl ReplayOutcome {
    pub fn final_snapshot(&self) -> Option<&BoxScoreSnapshot> {
        self.snapshots.last()
    }

    /// No per-snapshot or sequence-level invariant was broken.
    pub fn is_fully_valid(&self) -> bool {
        self.diagnostics.is_empty() && self.sequence_violations.is_empty()
    }

    pub fn into_parts(self) -> (Vec<BoxScoreSnapshot>, Option<VerificationResult>) {
        (self.snapshots, self.verification)
    }
}

/// Output of the CPU-bound replay loop.
struct ReplayRun {
    snapshots: Vec<BoxScoreSnapshot>,
    diagnostics: Vec<ValidationReport>,
    degraded_records: Vec<DegradedRecord>,
    no_op_updates: u64,
    /// Final state used for verification; the tip-off state when there were no records.
    final_state: BoxScoreSnapshot,
}

/// Ground-truth lookup result, failures folded into a note.
struct TruthLookup {
    truth: Option<GroundTruth>,
    note: Option<String>,
}

/// Single-game replay state machine. Consumed by `run`.
pub struct ReplayDriver<'a> {
    adapter: &'a dyn SourceAdapter,
    config: &'a ReplayConfig,
    phase: ReplayPhase,
    history: Vec<ReplayPhase>,
}

impl<'a> ReplayDriver<'a> {
    pub fn new(adapter: &'a dyn SourceAdapter, config: &'a ReplayConfig) -> Self {
        Self {
            adapter,
            config,
            phase: ReplayPhase::NotStarted,
            history: vec![ReplayPhase::NotStarted],
        }
    }

    pub fn phase(&self) -> ReplayPhase {
        self.phase
    }

    fn transition(&mut self, next: ReplayPhase) {
        debug_assert!(
            self.phase.can_transition_to(next),
            "ReplayDriver: illegal transition {:?} -> {:?}",
            self.phase,
            next
        );
        debug!(from = ?self.phase, to = ?next, "Replay phase transition");
        self.phase = next;
        self.history.push(next);
    }

    fn abort(&mut self, err: ReplayError) -> ReplayError {
        self.transition(ReplayPhase::Aborted);
        warn!(game_id = %err.game_id(), error = %err, "Replay aborted");
        err
    }

    /// Replay `game_id` end to end, fetching data and ground truth through the adapter.
    pub async fn run(mut self, game_id: &str) -> Result<ReplayOutcome, ReplayError> {
        self.transition(ReplayPhase::Loading);
        let raw = match self.adapter.load_game_data(game_id).await {
            Ok(raw) => raw,
            Err(e) => return Err(self.abort(ReplayError::from_adapter(game_id, e))),
        };
        let run = self.replay_loaded(game_id, &raw)?;

        let lookup = if self.config.verify {
            self.transition(ReplayPhase::Verifying);
            Some(self.fetch_truth(game_id).await)
        } else {
            None
        };
        Ok(self.finish(game_id, run, lookup))
    }

    /// Replay data that is already in memory. No I/O; used by the parallel batch path.
    pub fn run_preloaded(
        mut self,
        raw: &RawGameData,
        truth: Option<GroundTruth>,
    ) -> Result<ReplayOutcome, ReplayError> {
        let game_id = raw.game_id.clone();
        self.transition(ReplayPhase::Loading);
        let run = self.replay_loaded(&game_id, raw)?;

        let lookup = if self.config.verify {
            self.transition(ReplayPhase::Verifying);
            Some(TruthLookup { truth, note: None })
        } else {
            None
        };
        Ok(self.finish(&game_id, run, lookup))
    }

    fn initial_state(
        &mut self,
        game_id: &str,
        raw: &RawGameData,
    ) -> Result<InitialState, ReplayError> {
        let initial = match self.adapter.get_initial_state(raw) {
            Ok(initial) => initial,
            Err(e) => return Err(self.abort(ReplayError::from_adapter(game_id, e))),
        };
        if let Err(reason) = initial.validate() {
            return Err(self.abort(ReplayError::MalformedGameData {
                game_id: game_id.to_string(),
                reason,
            }));
        }
        Ok(initial)
    }

    fn replay_loaded(
        &mut self,
        game_id: &str,
        raw: &RawGameData,
    ) -> Result<ReplayRun, ReplayError> {
        let initial = self.initial_state(game_id, raw)?;
        self.transition(ReplayPhase::Replaying);

        let source = self.adapter.source_identifier();
        info!(
            game_id,
            source,
            records = raw.records.len(),
            "Replaying game"
        );

        let mut acc = StateAccumulator::initialize(game_id, source, &initial, self.config.timing);
        let validator = SnapshotValidator::new(self.config.max_minutes_played);

        let mut snapshots = Vec::with_capacity(raw.records.len());
        let mut diagnostics = Vec::new();
        let mut degraded_records = Vec::new();

        for (index, record) in raw.records.iter().enumerate() {
            let sequence_number = index as u64;
            let parsed = ParsedEvent::from_result(
                sequence_number,
                self.adapter.parse_event(record, sequence_number),
            );
            if let ParsedEvent::Degraded { reason, .. } = &parsed {
                warn!(
                    game_id,
                    sequence_number,
                    reason = %reason,
                    "Unparseable record replayed as no-op"
                );
                degraded_records.push(DegradedRecord {
                    sequence_number,
                    reason: reason.clone(),
                });
            }

            let outcome = acc.apply(&parsed);
            let snapshot = SnapshotFactory::capture(
                &acc,
                sequence_number,
                outcome == ApplyOutcome::Degraded,
            );

            if self.config.validate {
                let report = validator.validate(&snapshot);
                if !report.is_valid() {
                    debug!(
                        game_id,
                        sequence_number,
                        violations = report.violation_count(),
                        "Snapshot failed validation"
                    );
                    diagnostics.push(report);
                }
            }
            snapshots.push(snapshot);
        }

        let final_state = match snapshots.last() {
            Some(last) => last.clone(),
            None => SnapshotFactory::capture(&acc, 0, false),
        };

        Ok(ReplayRun {
            snapshots,
            diagnostics,
            degraded_records,
            no_op_updates: acc.no_op_updates(),
            final_state,
        })
    }

    async fn fetch_truth(&self, game_id: &str) -> TruthLookup {
        match self.adapter.get_actual_box_score(game_id).await {
            Ok(truth) => TruthLookup { truth, note: None },
            Err(e) => {
                warn!(game_id, error = %e, "Ground truth lookup failed; verifying without it");
                TruthLookup {
                    truth: None,
                    note: Some(format!("ground truth lookup failed: {}", e)),
                }
            }
        }
    }

    fn finish(
        mut self,
        game_id: &str,
        run: ReplayRun,
        lookup: Option<TruthLookup>,
    ) -> ReplayOutcome {
        let verification = lookup.map(|lookup| {
            let mut result =
                Verifier::new(self.config.grading).verify(&run.final_state, lookup.truth.as_ref());
            result.notes.extend(lookup.note);
            result
        });

        let sequence_violations = if self.config.validate {
            validate_sequence(&run.snapshots)
        } else {
            Vec::new()
        };

        let fingerprint = match fingerprint_snapshots(&run.snapshots) {
            Ok(fp) => Some(fp),
            Err(e) => {
                warn!(game_id, error = %e, "Could not fingerprint snapshots");
                None
            }
        };

        self.transition(ReplayPhase::Done);

        if !run.diagnostics.is_empty() || !sequence_violations.is_empty() {
            warn!(
                game_id,
                invalid_snapshots = run.diagnostics.len(),
                sequence_violations = sequence_violations.len(),
                "Replay produced invariant violations"
            );
        }
        info!(
            game_id,
            snapshots = run.snapshots.len(),
            degraded = run.degraded_records.len(),
            no_op_updates = run.no_op_updates,
            grade = verification.as_ref().map(|v| v.quality_grade.as_str()).unwrap_or("-"),
            "Replay complete"
        );

        ReplayOutcome {
            game_id: game_id.to_string(),
            source_identifier: self.adapter.source_identifier().to_string(),
            snapshots: run.snapshots,
            verification,
            diagnostics: run.diagnostics,
            sequence_violations,
            degraded_records: run.degraded_records,
            no_op_updates: run.no_op_updates,
            fingerprint,
            phase_history: self.history,
        }
    }
}

/// Replay one game with default configuration.
pub async fn replay_game(
    game_id: &str,
    adapter: &dyn SourceAdapter,
    verify: bool,
) -> Result<(Vec<BoxScoreSnapshot>, Option<VerificationResult>), ReplayError> {
    let config = ReplayConfig {
        verify,
        ..ReplayConfig::default()
    };
    let outcome = ReplayDriver::new(adapter, &config).run(game_id).await?;
    Ok(outcome.into_parts())
}
