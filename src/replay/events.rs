//! Event Model
//!
//! Source-agnostic play-by-play events. Adapters produce these from provider records; the
//! accumulator only ever sees this representation.

use crate::replay::stats::StatKey;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Provider-scoped game identifier.
pub type GameId = String;

/// Provider-scoped player identifier.
pub type PlayerId = String;

/// Provider-scoped team identifier.
pub type TeamId = String;

/// Stat name -> delta. Ordered so iteration (and therefore logging) is deterministic.
pub type StatDeltas = BTreeMap<String, i32>;

/// Rebound type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReboundKind {
    Offensive,
    Defensive,
}

/// What happened on a play.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventKind {
    ShotMade {
        #[serde(default)]
        is_three: bool,
    },
    ShotMissed {
        #[serde(default)]
        is_three: bool,
    },
    /// Made iff `points_scored > 0`.
    FreeThrow,
    Rebound {
        rebound: ReboundKind,
    },
    Assist,
    Steal,
    Block,
    Turnover,
    Foul,
    Substitution {
        player_in: PlayerId,
        player_out: PlayerId,
    },
    Timeout,
    JumpBall,
    PeriodStart,
    PeriodEnd,
    Unknown,
}

impl EventKind {
    pub fn label(&self) -> &'static str {
        match self {
            Self::ShotMade { .. } => "shot_made",
            Self::ShotMissed { .. } => "shot_missed",
            Self::FreeThrow => "free_throw",
            Self::Rebound { .. } => "rebound",
            Self::Assist => "assist",
            Self::Steal => "steal",
            Self::Block => "block",
            Self::Turnover => "turnover",
            Self::Foul => "foul",
            Self::Substitution { .. } => "substitution",
            Self::Timeout => "timeout",
            Self::JumpBall => "jump_ball",
            Self::PeriodStart => "period_start",
            Self::PeriodEnd => "period_end",
            Self::Unknown => "unknown",
        }
    }
}

/// One standardized play-by-play occurrence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub sequence_number: u64,
    pub kind: EventKind,
    /// Absent when the feed omits it; the accumulator keeps its previous value.
    #[serde(default)]
    pub period: Option<u32>,
    #[serde(default)]
    pub clock_seconds_remaining_in_period: Option<f64>,
    #[serde(default)]
    pub primary_player_id: Option<PlayerId>,
    #[serde(default)]
    pub team_id: Option<TeamId>,
    #[serde(default)]
    pub points_scored: u32,
    #[serde(default)]
    pub stat_deltas: StatDeltas,
    #[serde(default)]
    pub description: String,
}

impl Event {
    pub fn new(sequence_number: u64, kind: EventKind) -> Self {
        Self {
            sequence_number,
            kind,
            period: None,
            clock_seconds_remaining_in_period: None,
            primary_player_id: None,
            team_id: None,
            points_scored: 0,
            stat_deltas: StatDeltas::new(),
            description: String::new(),
        }
    }

    pub fn at(mut self, period: u32, clock_seconds_remaining: f64) -> Self {
        self.period = Some(period);
        self.clock_seconds_remaining_in_period = Some(clock_seconds_remaining);
        self
    }

    pub fn by(mut self, player_id: impl Into<PlayerId>, team_id: impl Into<TeamId>) -> Self {
        self.primary_player_id = Some(player_id.into());
        self.team_id = Some(team_id.into());
        self
    }

    pub fn scoring(mut self, points: u32) -> Self {
        self.points_scored = points;
        self
    }

    pub fn with_delta(mut self, stat: StatKey, delta: i32) -> Self {
        let slot = self.stat_deltas.entry(stat.as_str().to_string()).or_insert(0);
        *slot = slot.saturating_add(delta);
        self
    }

    /// Fill `stat_deltas` from the event kind when none were supplied.
    pub fn with_implied_deltas(mut self) -> Self {
        if self.stat_deltas.is_empty() {
            self.stat_deltas = self.implied_deltas();
        }
        self
    }

    #[inline]
    pub fn is_scoring(&self) -> bool {
        self.points_scored > 0
    }

    /// Standard box-score deltas for this event's kind.
    ///
    /// `points` is never included: scoring is credited from `points_scored`.
    pub fn implied_deltas(&self) -> StatDeltas {
        let mut deltas: Vec<StatKey> = Vec::new();
        match &self.kind {
            EventKind::ShotMade { is_three } => {
                deltas.extend([StatKey::Fgm, StatKey::Fga]);
                if *is_three || self.points_scored == 3 {
                    deltas.extend([StatKey::Fg3m, StatKey::Fg3a]);
                }
            }
            EventKind::ShotMissed { is_three } => {
                deltas.push(StatKey::Fga);
                if *is_three {
                    deltas.push(StatKey::Fg3a);
                }
            }
            EventKind::FreeThrow => {
                deltas.push(StatKey::Fta);
                if self.is_scoring() {
                    deltas.push(StatKey::Ftm);
                }
            }
            EventKind::Rebound { rebound } => {
                deltas.push(match rebound {
                    ReboundKind::Offensive => StatKey::Oreb,
                    ReboundKind::Defensive => StatKey::Dreb,
                });
                deltas.push(StatKey::Reb);
            }
            EventKind::Assist => deltas.push(StatKey::Ast),
            EventKind::Steal => deltas.push(StatKey::Stl),
            EventKind::Block => deltas.push(StatKey::Blk),
            EventKind::Turnover => deltas.push(StatKey::Tov),
            EventKind::Foul => deltas.push(StatKey::Pf),
            EventKind::Substitution { .. }
            | EventKind::Timeout
            | EventKind::JumpBall
            | EventKind::PeriodStart
            | EventKind::PeriodEnd
            | EventKind::Unknown => {}
        }
        deltas
            .into_iter()
            .map(|k| (k.as_str().to_string(), 1))
            .collect()
    }
}

/// Why a raw record could not be turned into an [`Event`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventParseError {
    pub reason: String,
}

impl EventParseError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl std::fmt::Display for EventParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "event parse error: {}", self.reason)
    }
}

impl std::error::Error for EventParseError {}

/// Outcome of parsing one raw record. Both arms flow through apply-and-snapshot, so every
/// record yields exactly one snapshot.
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedEvent {
    Parsed(Event),
    Degraded { sequence_number: u64, reason: String },
}

impl ParsedEvent {
    pub fn from_result(sequence_number: u64, result: Result<Event, EventParseError>) -> Self {
        match result {
            Ok(mut event) => {
                // The driver owns numbering; adapters may not renumber.
                event.sequence_number = sequence_number;
                Self::Parsed(event)
            }
            Err(err) => Self::Degraded {
                sequence_number,
                reason: err.reason,
            },
        }
    }

    pub fn sequence_number(&self) -> u64 {
        match self {
            Self::Parsed(event) => event.sequence_number,
            Self::Degraded {
                sequence_number, ..
            } => *sequence_number,
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, Self::Degraded { .. })
    }
}
