//! Snapshot Invariant Validation
//!
//! Validation is diagnostic only. Every check runs (no short-circuit) and violations are
//! reported alongside the snapshot; nothing is corrected or dropped, since every event must
//! keep its snapshot.
//!
//! # Categories
//!
//! - **GameState**: period >= 1, non-negative clock/elapsed time and scores
//! - **Player**: non-negative counts, made <= attempted, reb == oreb + dreb, minutes cap
//! - **Consistency**: team totals equal the sum of that team's player lines

use crate::replay::events::{PlayerId, TeamId};
use crate::replay::snapshot::BoxScoreSnapshot;
use crate::replay::stats::{PlayerStats, StatKey};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Default ceiling for minutes played (covers multi-overtime games).
pub const MAX_MINUTES_PLAYED: f64 = 65.0;

const SHOOTING_PAIRS: [(StatKey, StatKey); 3] = [
    (StatKey::Fgm, StatKey::Fga),
    (StatKey::Fg3m, StatKey::Fg3a),
    (StatKey::Ftm, StatKey::Fta),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ViolationCategory {
    GameState,
    Player,
    Consistency,
    Sequence,
}

/// A single broken invariant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Violation {
    InvalidPeriod {
        period: u32,
    },
    NegativeClock {
        field: String,
        value: f64,
    },
    NegativeScore {
        team_id: TeamId,
        score: i32,
    },
    NegativeStat {
        player_id: PlayerId,
        stat: StatKey,
        value: i32,
    },
    MadeExceedsAttempted {
        player_id: PlayerId,
        made: StatKey,
        made_value: i32,
        attempted_value: i32,
    },
    ReboundSplitMismatch {
        player_id: PlayerId,
        oreb: i32,
        dreb: i32,
        reb: i32,
    },
    MinutesExceeded {
        player_id: PlayerId,
        minutes: f64,
        max: f64,
    },
    TeamPlayerSumMismatch {
        team_id: TeamId,
        stat: StatKey,
        team_total: i32,
        player_sum: i64,
    },
    ScoreDecreased {
        sequence_number: u64,
        team_id: TeamId,
        previous: i32,
        current: i32,
    },
    ElapsedRegressed {
        sequence_number: u64,
        previous: f64,
        current: f64,
    },
    SequenceNotIncreasing {
        previous: u64,
        current: u64,
    },
}

impl Violation {
    pub fn category(&self) -> ViolationCategory {
        match self {
            Self::InvalidPeriod { .. }
            | Self::NegativeClock { .. }
            | Self::NegativeScore { .. } => ViolationCategory::GameState,
            Self::NegativeStat { .. }
            | Self::MadeExceedsAttempted { .. }
            | Self::ReboundSplitMismatch { .. }
            | Self::MinutesExceeded { .. } => ViolationCategory::Player,
            Self::TeamPlayerSumMismatch { .. } => ViolationCategory::Consistency,
            Self::ScoreDecreased { .. }
            | Self::ElapsedRegressed { .. }
            | Self::SequenceNotIncreasing { .. } => ViolationCategory::Sequence,
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidPeriod { period } => write!(f, "period {} < 1", period),
            Self::NegativeClock { field, value } => write!(f, "{} is negative ({})", field, value),
            Self::NegativeScore { team_id, score } => {
                write!(f, "score for {} is negative ({})", team_id, score)
            }
            Self::NegativeStat {
                player_id,
                stat,
                value,
            } => write!(f, "{}: {} is negative ({})", player_id, stat, value),
            Self::MadeExceedsAttempted {
                player_id,
                made,
                made_value,
                attempted_value,
            } => write!(
                f,
                "{}: {} {} exceeds attempts {}",
                player_id, made, made_value, attempted_value
            ),
            Self::ReboundSplitMismatch {
                player_id,
                oreb,
                dreb,
                reb,
            } => write!(
                f,
                "{}: reb {} != oreb {} + dreb {}",
                player_id, reb, oreb, dreb
            ),
            Self::MinutesExceeded {
                player_id,
                minutes,
                max,
            } => write!(f, "{}: {:.1} minutes exceeds {:.0}", player_id, minutes, max),
            Self::TeamPlayerSumMismatch {
                team_id,
                stat,
                team_total,
                player_sum,
            } => write!(
                f,
                "consistency: {} {} total {} != player sum {}",
                team_id, stat, team_total, player_sum
            ),
            Self::ScoreDecreased {
                sequence_number,
                team_id,
                previous,
                current,
            } => write!(
                f,
                "seq {}: score for {} fell from {} to {}",
                sequence_number, team_id, previous, current
            ),
            Self::ElapsedRegressed {
                sequence_number,
                previous,
                current,
            } => write!(
                f,
                "seq {}: elapsed time went back from {} to {}",
                sequence_number, previous, current
            ),
            Self::SequenceNotIncreasing { previous, current } => {
                write!(f, "sequence number {} follows {}", current, previous)
            }
        }
    }
}

/// Violations for one snapshot, grouped by check category.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub event_sequence_number: u64,
    pub game_state: Vec<Violation>,
    pub player: Vec<Violation>,
    pub consistency: Vec<Violation>,
}

impl ValidationReport {
    /// True iff every category is empty.
    pub fn is_valid(&self) -> bool {
        self.game_state.is_empty() && self.player.is_empty() && self.consistency.is_empty()
    }

    pub fn violation_count(&self) -> usize {
        self.game_state.len() + self.player.len() + self.consistency.len()
    }

    pub fn violations(&self) -> impl Iterator<Item = &Violation> {
        self.game_state
            .iter()
            .chain(self.player.iter())
            .chain(self.consistency.iter())
    }
}

/// Snapshot invariant checker.
#[derive(Debug, Clone)]
pub struct SnapshotValidator {
    max_minutes_played: f64,
    consistency_stats: Vec<StatKey>,
}

impl Default for SnapshotValidator {
    fn default() -> Self {
        Self::new(MAX_MINUTES_PLAYED)
    }
}

impl SnapshotValidator {
    pub fn new(max_minutes_played: f64) -> Self {
        Self {
            max_minutes_played,
            consistency_stats: StatKey::all().to_vec(),
        }
    }

    /// Restrict the team/player-sum check to the given stats.
    pub fn with_consistency_stats(mut self, stats: &[StatKey]) -> Self {
        self.consistency_stats = stats.to_vec();
        self
    }

    pub fn validate(&self, snapshot: &BoxScoreSnapshot) -> ValidationReport {
        let mut report = ValidationReport {
            event_sequence_number: snapshot.event_sequence_number,
            ..Default::default()
        };
        self.check_game_state(snapshot, &mut report.game_state);
        for player in snapshot.players.values() {
            self.check_player(player, &mut report.player);
        }
        self.check_consistency(snapshot, &mut report.consistency);
        report
    }

    fn check_game_state(&self, snapshot: &BoxScoreSnapshot, out: &mut Vec<Violation>) {
        if snapshot.period < 1 {
            out.push(Violation::InvalidPeriod {
                period: snapshot.period,
            });
        }
        if snapshot.clock_seconds_remaining < 0.0 {
            out.push(Violation::NegativeClock {
                field: "clock_seconds_remaining".into(),
                value: snapshot.clock_seconds_remaining,
            });
        }
        if snapshot.game_clock_seconds_elapsed < 0.0 {
            out.push(Violation::NegativeClock {
                field: "game_clock_seconds_elapsed".into(),
                value: snapshot.game_clock_seconds_elapsed,
            });
        }
        for (team_id, score) in [
            (&snapshot.home_team_id, snapshot.home_score),
            (&snapshot.away_team_id, snapshot.away_score),
        ] {
            if score < 0 {
                out.push(Violation::NegativeScore {
                    team_id: team_id.clone(),
                    score,
                });
            }
        }
    }

    fn check_player(&self, player: &PlayerStats, out: &mut Vec<Violation>) {
        let stats = &player.stats;
        for key in StatKey::all() {
            let value = stats.get(*key);
            if value < 0 {
                out.push(Violation::NegativeStat {
                    player_id: player.player_id.clone(),
                    stat: *key,
                    value,
                });
            }
        }
        for (made, attempted) in SHOOTING_PAIRS {
            if stats.get(made) > stats.get(attempted) {
                out.push(Violation::MadeExceedsAttempted {
                    player_id: player.player_id.clone(),
                    made,
                    made_value: stats.get(made),
                    attempted_value: stats.get(attempted),
                });
            }
        }
        if i64::from(stats.reb) != i64::from(stats.oreb) + i64::from(stats.dreb) {
            out.push(Violation::ReboundSplitMismatch {
                player_id: player.player_id.clone(),
                oreb: stats.oreb,
                dreb: stats.dreb,
                reb: stats.reb,
            });
        }
        if player.minutes_played > self.max_minutes_played {
            out.push(Violation::MinutesExceeded {
                player_id: player.player_id.clone(),
                minutes: player.minutes_played,
                max: self.max_minutes_played,
            });
        }
    }

    fn check_consistency(&self, snapshot: &BoxScoreSnapshot, out: &mut Vec<Violation>) {
        for (team_id, team) in &snapshot.teams {
            for key in &self.consistency_stats {
                let player_sum: i64 = snapshot
                    .players
                    .values()
                    .filter(|p| &p.team_id == team_id)
                    .map(|p| i64::from(p.stats.get(*key)))
                    .sum();
                let team_total = team.stats.get(*key);
                if player_sum != i64::from(team_total) {
                    out.push(Violation::TeamPlayerSumMismatch {
                        team_id: team_id.clone(),
                        stat: *key,
                        team_total,
                        player_sum,
                    });
                }
            }
        }
    }
}

/// Cross-snapshot checks: non-decreasing scores and elapsed time, strictly increasing
/// sequence numbers. Diagnostic only.
pub fn validate_sequence(snapshots: &[BoxScoreSnapshot]) -> Vec<Violation> {
    let mut out = Vec::new();
    for pair in snapshots.windows(2) {
        let (prev, cur) = (&pair[0], &pair[1]);
        if cur.event_sequence_number <= prev.event_sequence_number {
            out.push(Violation::SequenceNotIncreasing {
                previous: prev.event_sequence_number,
                current: cur.event_sequence_number,
            });
        }
        for (team_id, previous, current) in [
            (&cur.home_team_id, prev.home_score, cur.home_score),
            (&cur.away_team_id, prev.away_score, cur.away_score),
        ] {
            if current < previous {
                out.push(Violation::ScoreDecreased {
                    sequence_number: cur.event_sequence_number,
                    team_id: team_id.clone(),
                    previous,
                    current,
                });
            }
        }
        if cur.game_clock_seconds_elapsed < prev.game_clock_seconds_elapsed {
            out.push(Violation::ElapsedRegressed {
                sequence_number: cur.event_sequence_number,
                previous: prev.game_clock_seconds_elapsed,
                current: cur.game_clock_seconds_elapsed,
            });
        }
    }
    out
}
