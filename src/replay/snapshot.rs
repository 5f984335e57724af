//! Box Score Snapshots
//!
//! A snapshot is an independent value: every map is cloned out of the accumulator, so later
//! events can never change an emitted snapshot.

use crate::replay::accumulator::StateAccumulator;
use crate::replay::clock::clock_display;
use crate::replay::events::{GameId, PlayerId, TeamId};
use crate::replay::stats::{PlayerStats, TeamStats};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Complete running box score as of one processed event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoxScoreSnapshot {
    pub game_id: GameId,
    pub event_sequence_number: u64,
    pub source_identifier: String,
    pub period: u32,
    pub clock_display: String,
    pub clock_seconds_remaining: f64,
    pub game_clock_seconds_elapsed: f64,
    pub home_team_id: TeamId,
    pub away_team_id: TeamId,
    pub home_score: i32,
    pub away_score: i32,
    pub players: BTreeMap<PlayerId, PlayerStats>,
    pub teams: BTreeMap<TeamId, TeamStats>,
    /// The record behind this snapshot could not be parsed; state equals the previous snapshot.
    #[serde(default)]
    pub degraded: bool,
}

impl BoxScoreSnapshot {
    pub fn player(&self, player_id: &str) -> Option<&PlayerStats> {
        self.players.get(player_id)
    }

    pub fn team(&self, team_id: &str) -> Option<&TeamStats> {
        self.teams.get(team_id)
    }

    /// Players of `team_id` on the floor at this instant.
    pub fn on_court(&self, team_id: &str) -> Vec<&PlayerStats> {
        self.teams
            .get(team_id)
            .map(|team| {
                team.on_court
                    .iter()
                    .filter_map(|id| self.players.get(id))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// True when every stat-bearing field matches `other` (sequence number and the degraded
    /// flag are bookkeeping and ignored).
    pub fn same_state_as(&self, other: &BoxScoreSnapshot) -> bool {
        self.game_id == other.game_id
            && self.period == other.period
            && self.clock_seconds_remaining == other.clock_seconds_remaining
            && self.game_clock_seconds_elapsed == other.game_clock_seconds_elapsed
            && self.home_score == other.home_score
            && self.away_score == other.away_score
            && self.players == other.players
            && self.teams == other.teams
    }
}

/// Freezes accumulator state into snapshots. Pure: no I/O, no clock reads.
pub struct SnapshotFactory;

impl SnapshotFactory {
    pub fn capture(
        acc: &StateAccumulator,
        event_sequence_number: u64,
        degraded: bool,
    ) -> BoxScoreSnapshot {
        BoxScoreSnapshot {
            game_id: acc.game_id().to_string(),
            event_sequence_number,
            source_identifier: acc.source_identifier().to_string(),
            period: acc.period(),
            clock_display: clock_display(acc.clock_remaining()),
            clock_seconds_remaining: acc.clock_remaining(),
            game_clock_seconds_elapsed: acc.elapsed(),
            home_team_id: acc.home_team_id().to_string(),
            away_team_id: acc.away_team_id().to_string(),
            home_score: acc.home_score(),
            away_score: acc.away_score(),
            players: acc.players().clone(),
            teams: acc.teams().clone(),
            degraded,
        }
    }
}
