//! Replay Error Taxonomy
//!
//! Only failures that make a whole game unreplayable live here. Per-record parse failures,
//! missing ground truth and invariant violations are recoverable and never surface as errors.

use crate::replay::adapter::AdapterError;
use crate::replay::events::GameId;

/// Fatal error for one game's replay. No snapshots are returned when this is produced.
#[derive(Debug)]
pub enum ReplayError {
    /// The source adapter has no such game.
    GameNotFound { game_id: GameId },
    /// Initial roster/team state could not be extracted or failed validation.
    MalformedGameData { game_id: GameId, reason: String },
    /// The adapter failed for a reason other than a missing game (I/O, decoding).
    SourceUnavailable {
        game_id: GameId,
        source: anyhow::Error,
    },
}

impl ReplayError {
    pub fn game_id(&self) -> &str {
        match self {
            Self::GameNotFound { game_id }
            | Self::MalformedGameData { game_id, .. }
            | Self::SourceUnavailable { game_id, .. } => game_id,
        }
    }

    /// Map an adapter failure for `game_id` into the fatal taxonomy.
    pub fn from_adapter(game_id: &str, err: AdapterError) -> Self {
        match err {
            AdapterError::GameNotFound(_) => Self::GameNotFound {
                game_id: game_id.to_string(),
            },
            AdapterError::Malformed(reason) => Self::MalformedGameData {
                game_id: game_id.to_string(),
                reason,
            },
            AdapterError::Io(source) => Self::SourceUnavailable {
                game_id: game_id.to_string(),
                source,
            },
        }
    }

    /// Short machine-friendly label, used in batch reports.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::GameNotFound { .. } => "game_not_found",
            Self::MalformedGameData { .. } => "malformed_game_data",
            Self::SourceUnavailable { .. } => "source_unavailable",
        }
    }
}

impl std::fmt::Display for ReplayError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::GameNotFound { game_id } => write!(f, "game {} not found", game_id),
            Self::MalformedGameData { game_id, reason } => {
                write!(f, "malformed game data for {}: {}", game_id, reason)
            }
            Self::SourceUnavailable { game_id, source } => {
                write!(f, "source unavailable for {}: {:#}", game_id, source)
            }
        }
    }
}

impl std::error::Error for ReplayError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::SourceUnavailable { source, .. } => Some(&**source),
            _ => None,
        }
    }
}
