//! Box Score Replay Engine
//!
//! Deterministic play-by-play replay for basketball games. Each game's ordered event
//! records are folded into a running box score, one snapshot per record, and the final
//! snapshot is graded against an independently sourced box score.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                         BatchRunner                             │
//! │  (one task per game, Semaphore-bounded, cooperative cancel)     │
//! └─────────────────────────────────────────────────────────────────┘
//!                                │
//!                                ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                         ReplayDriver                            │
//! │  Loading -> Replaying -> Verifying -> Done   (or Aborted)       │
//! └─────────────────────────────────────────────────────────────────┘
//!        │                       │                       │
//!        ▼                       ▼                       ▼
//! ┌─────────────┐        ┌──────────────┐        ┌─────────────┐
//! │ Source      │───────▶│ State        │───────▶│ Snapshot    │
//! │ Adapter     │ Event  │ Accumulator  │        │ Factory     │
//! │ (trait)     │        │ (sequential) │        └──────┬──────┘
//! └─────────────┘        └──────────────┘               │
//!                                              ┌────────┴────────┐
//!                                              ▼                 ▼
//!                                       ┌─────────────┐   ┌─────────────┐
//!                                       │ Snapshot    │   │ Verifier    │
//!                                       │ Validator   │   │ (grade A-F) │
//!                                       └─────────────┘   └─────────────┘
//! ```
//!
//! # Determinism Guarantees
//!
//! - **Clock**: Only feed-provided period/clock values; no wall-clock reads in snapshots
//! - **Ordering**: Records replayed strictly in source order, one snapshot each
//! - **Maps**: `BTreeMap`/`BTreeSet` everywhere so serialized snapshots are byte-stable
//! - **Fingerprint**: SHA-256 over the snapshot sequence for replay comparison

pub mod accumulator;
pub mod adapter;
pub mod batch;
pub mod clock;
pub mod config;
pub mod driver;
pub mod error;
pub mod events;
pub mod fingerprint;
pub mod json_adapter;
pub mod snapshot;
pub mod stats;
pub mod validator;
pub mod verifier;

#[cfg(test)]
mod validator_tests;
#[cfg(test)]
mod verifier_tests;

pub use accumulator::{ApplyOutcome, StateAccumulator};
pub use adapter::{
    ActualPlayerLine, AdapterError, AdapterResult, GroundTruth, InitialState, PlayerInfo,
    RawGameData, SourceAdapter,
};
pub use batch::{BatchReport, BatchRunner, BatchSummary, GameReport, GameResult};
pub use clock::{clock_display, PeriodTiming};
pub use config::ReplayConfig;
pub use driver::{replay_game, DegradedRecord, ReplayDriver, ReplayOutcome, ReplayPhase};
pub use error::ReplayError;
pub use events::{
    Event, EventKind, EventParseError, GameId, ParsedEvent, PlayerId, ReboundKind, StatDeltas,
    TeamId,
};
pub use fingerprint::{fingerprint_snapshots, FINGERPRINT_VERSION};
pub use json_adapter::{GameDocument, JsonGameAdapter, RosterEntry, TeamInfo};
pub use snapshot::{BoxScoreSnapshot, SnapshotFactory};
pub use stats::{PlayerStats, StatKey, StatLine, TeamStats};
pub use validator::{
    validate_sequence, SnapshotValidator, ValidationReport, Violation, ViolationCategory,
    MAX_MINUTES_PLAYED,
};
pub use verifier::{
    Discrepancy, GradeThresholds, MeanAbsoluteErrors, QualityGrade, VerificationResult, Verifier,
};
