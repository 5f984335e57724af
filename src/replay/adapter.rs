//! Source Adapter Contract
//!
//! The capability the replay engine consumes from each data provider. Concrete providers
//! (wire formats, storage access) implement [`SourceAdapter`]; the engine never sees their
//! raw layout beyond opaque JSON records.

use crate::replay::events::{Event, EventParseError, GameId, PlayerId, TeamId};
use crate::replay::stats::StatKey;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Failure reported by an adapter.
#[derive(Debug)]
pub enum AdapterError {
    /// No game with this id exists at the source.
    GameNotFound(GameId),
    /// The game exists but its data cannot be interpreted.
    Malformed(String),
    /// Transport or storage failure.
    Io(anyhow::Error),
}

impl std::fmt::Display for AdapterError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::GameNotFound(id) => write!(f, "game not found: {}", id),
            Self::Malformed(reason) => write!(f, "malformed game data: {}", reason),
            Self::Io(err) => write!(f, "source I/O error: {:#}", err),
        }
    }
}

impl std::error::Error for AdapterError {}

impl From<anyhow::Error> for AdapterError {
    fn from(err: anyhow::Error) -> Self {
        Self::Io(err)
    }
}

pub type AdapterResult<T> = Result<T, AdapterError>;

/// Everything a source returns for one game before replay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawGameData {
    pub game_id: GameId,
    /// Ordered, opaque provider records.
    pub records: Vec<serde_json::Value>,
    /// Provider-specific game metadata.
    #[serde(default)]
    pub metadata: BTreeMap<String, serde_json::Value>,
}

/// Directory entry for a player known before tip-off.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerInfo {
    pub name: String,
    pub team_id: TeamId,
}

/// Teams, starters and roster directory at tip-off.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InitialState {
    pub home_team_id: TeamId,
    pub away_team_id: TeamId,
    pub home_team_name: String,
    pub away_team_name: String,
    #[serde(default)]
    pub starting_lineups: BTreeMap<TeamId, Vec<PlayerId>>,
    #[serde(default)]
    pub player_directory: BTreeMap<PlayerId, PlayerInfo>,
}

impl InitialState {
    /// Structural checks. A failure here is fatal for the game.
    pub fn validate(&self) -> Result<(), String> {
        if self.home_team_id.is_empty() || self.away_team_id.is_empty() {
            return Err("home and away team ids must be non-empty".into());
        }
        if self.home_team_id == self.away_team_id {
            return Err(format!(
                "home and away team ids are identical ({})",
                self.home_team_id
            ));
        }
        for (team_id, lineup) in &self.starting_lineups {
            if !self.is_game_team(team_id) {
                return Err(format!("starting lineup for unknown team {}", team_id));
            }
            for player_id in lineup {
                if let Some(info) = self.player_directory.get(player_id) {
                    if &info.team_id != team_id {
                        return Err(format!(
                            "starter {} listed for {} but belongs to {}",
                            player_id, team_id, info.team_id
                        ));
                    }
                }
            }
        }
        for (player_id, info) in &self.player_directory {
            if !self.is_game_team(&info.team_id) {
                return Err(format!(
                    "player {} belongs to team {} which is not in this game",
                    player_id, info.team_id
                ));
            }
        }
        Ok(())
    }

    pub fn is_game_team(&self, team_id: &str) -> bool {
        team_id == self.home_team_id || team_id == self.away_team_id
    }
}

/// Ground-truth counts for one player. A stat the source does not report stays `None`
/// and is left out of the diff.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActualPlayerLine {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub points: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reb: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ast: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stl: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blk: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tov: Option<i32>,
}

impl ActualPlayerLine {
    /// Reported value for a verified stat; `None` when unreported or not a verified stat.
    pub fn get(&self, key: StatKey) -> Option<i32> {
        match key {
            StatKey::Points => self.points,
            StatKey::Reb => self.reb,
            StatKey::Ast => self.ast,
            StatKey::Stl => self.stl,
            StatKey::Blk => self.blk,
            StatKey::Tov => self.tov,
            _ => None,
        }
    }
}

/// Independently sourced final box score.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroundTruth {
    pub home_score: u32,
    pub away_score: u32,
    #[serde(default)]
    pub players: BTreeMap<PlayerId, ActualPlayerLine>,
}

/// Provider capability consumed by the replay engine.
///
/// Implementations must be safe to share across concurrently replaying games and must hold
/// no per-game mutable state.
#[async_trait::async_trait]
pub trait SourceAdapter: Send + Sync {
    /// Identifier stamped on every snapshot and verification result.
    fn source_identifier(&self) -> &str;

    /// Fetch the raw record list for a game.
    async fn load_game_data(&self, game_id: &str) -> AdapterResult<RawGameData>;

    /// Extract teams, starters and roster directory.
    fn get_initial_state(&self, raw: &RawGameData) -> AdapterResult<InitialState>;

    /// Convert one raw record. Failures are local to the record.
    fn parse_event(
        &self,
        raw_record: &serde_json::Value,
        sequence_number: u64,
    ) -> Result<Event, EventParseError>;

    /// Final box score from an independent source, if any.
    async fn get_actual_box_score(&self, game_id: &str) -> AdapterResult<Option<GroundTruth>>;
}
