//! JSON Game Document Adapter
//!
//! Concrete [`SourceAdapter`] over a standardized JSON document per game: teams, roster,
//! ordered play-by-play records and an optional final box score. Documents are held in
//! memory behind a `parking_lot::RwLock`, so one adapter serves many concurrent replays.
//!
//! # Record format
//!
//! ```json
//! {"type": "shot_made", "period": 1, "clock": "11:32", "player_id": "p1",
//!  "team_id": "home", "is_three": true, "description": "Jump shot"}
//! ```
//!
//! `clock` is seconds remaining (number) or `"M:SS"` / `"M:SS.s"`. `stat_deltas` may be given
//! explicitly; otherwise they are derived from the event type. `points` defaults to 2/3 for
//! made field goals and 1 for a free throw with `"made": true`.

use crate::replay::adapter::{
    AdapterError, AdapterResult, GroundTruth, InitialState, PlayerInfo, RawGameData,
    SourceAdapter,
};
use crate::replay::events::{
    Event, EventKind, EventParseError, GameId, PlayerId, ReboundKind, StatDeltas, TeamId,
};
use anyhow::Context;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamInfo {
    pub id: TeamId,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterEntry {
    pub player_id: PlayerId,
    pub name: String,
    pub team_id: TeamId,
    #[serde(default)]
    pub starter: bool,
}

/// One game as stored on disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameDocument {
    pub game_id: GameId,
    pub home_team: TeamInfo,
    pub away_team: TeamInfo,
    #[serde(default)]
    pub players: Vec<RosterEntry>,
    #[serde(default)]
    pub events: Vec<serde_json::Value>,
    #[serde(default)]
    pub box_score: Option<GroundTruth>,
}

/// Clock as either seconds remaining or a "M:SS" display string.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum ClockValue {
    Seconds(f64),
    Display(String),
}

impl ClockValue {
    fn seconds(&self) -> Result<f64, EventParseError> {
        match self {
            Self::Seconds(s) => Ok(*s),
            Self::Display(text) => parse_clock(text),
        }
    }
}

#[derive(Debug, Deserialize)]
struct StandardRecord {
    #[serde(rename = "type")]
    event_type: String,
    #[serde(default)]
    period: Option<u32>,
    #[serde(default)]
    clock: Option<ClockValue>,
    #[serde(default)]
    player_id: Option<PlayerId>,
    #[serde(default)]
    team_id: Option<TeamId>,
    #[serde(default)]
    points: Option<u32>,
    #[serde(default)]
    made: Option<bool>,
    #[serde(default)]
    is_three: bool,
    #[serde(default)]
    rebound: Option<ReboundKind>,
    #[serde(default)]
    player_in: Option<PlayerId>,
    #[serde(default)]
    player_out: Option<PlayerId>,
    #[serde(default)]
    stat_deltas: Option<StatDeltas>,
    #[serde(default)]
    description: String,
}

/// Parse "M:SS", "MM:SS" or "M:SS.s" into seconds.
pub fn parse_clock(text: &str) -> Result<f64, EventParseError> {
    let (minutes, seconds) = text
        .trim()
        .split_once(':')
        .ok_or_else(|| EventParseError::new(format!("clock '{}' is not M:SS", text)))?;
    let minutes: u32 = minutes
        .parse()
        .map_err(|_| EventParseError::new(format!("bad clock minutes in '{}'", text)))?;
    let seconds: f64 = seconds
        .parse()
        .map_err(|_| EventParseError::new(format!("bad clock seconds in '{}'", text)))?;
    if !(0.0..60.0).contains(&seconds) {
        return Err(EventParseError::new(format!("clock seconds out of range in '{}'", text)));
    }
    Ok(minutes as f64 * 60.0 + seconds)
}

/// Infer rebound type from free text.
///
/// Heuristic with an unknown false-negative rate; only used when the record has no
/// structured `rebound` field. Text mentioning both or neither yields `None`.
pub fn rebound_kind_from_description(description: &str) -> Option<ReboundKind> {
    let text = description.to_ascii_lowercase();
    let offensive = text.contains("offensive");
    let defensive = text.contains("defensive");
    match (offensive, defensive) {
        (true, false) => Some(ReboundKind::Offensive),
        (false, true) => Some(ReboundKind::Defensive),
        _ => None,
    }
}

fn parse_kind(record: &StandardRecord) -> Result<EventKind, EventParseError> {
    let kind = match record.event_type.as_str() {
        "shot_made" => EventKind::ShotMade {
            is_three: record.is_three,
        },
        "shot_missed" => EventKind::ShotMissed {
            is_three: record.is_three,
        },
        "free_throw" => EventKind::FreeThrow,
        "rebound" => {
            let rebound = record
                .rebound
                .or_else(|| rebound_kind_from_description(&record.description))
                .ok_or_else(|| EventParseError::new("rebound without offensive/defensive type"))?;
            EventKind::Rebound { rebound }
        }
        "assist" => EventKind::Assist,
        "steal" => EventKind::Steal,
        "block" => EventKind::Block,
        "turnover" => EventKind::Turnover,
        "foul" => EventKind::Foul,
        "substitution" => match (&record.player_in, &record.player_out) {
            (Some(player_in), Some(player_out)) => EventKind::Substitution {
                player_in: player_in.clone(),
                player_out: player_out.clone(),
            },
            _ => return Err(EventParseError::new("substitution missing player_in/player_out")),
        },
        "timeout" => EventKind::Timeout,
        "jump_ball" => EventKind::JumpBall,
        "period_start" => EventKind::PeriodStart,
        "period_end" => EventKind::PeriodEnd,
        other => {
            debug!(event_type = other, "Unrecognised event type");
            EventKind::Unknown
        }
    };
    Ok(kind)
}

fn default_points(kind: &EventKind, record: &StandardRecord) -> u32 {
    match kind {
        EventKind::ShotMade { is_three: true } => 3,
        EventKind::ShotMade { is_three: false } => 2,
        EventKind::FreeThrow if record.made == Some(true) => 1,
        _ => 0,
    }
}

/// In-memory adapter over [`GameDocument`]s.
pub struct JsonGameAdapter {
    source: String,
    games: RwLock<BTreeMap<GameId, GameDocument>>,
}

impl JsonGameAdapter {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            games: RwLock::new(BTreeMap::new()),
        }
    }

    pub fn insert(&self, document: GameDocument) {
        self.games.write().insert(document.game_id.clone(), document);
    }

    pub fn game_ids(&self) -> Vec<GameId> {
        self.games.read().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.games.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.games.read().is_empty()
    }

    /// Read one document from disk and register it. Returns its game id.
    pub async fn load_file(&self, path: impl AsRef<Path>) -> anyhow::Result<GameId> {
        let path = path.as_ref();
        let contents = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let document: GameDocument = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to decode game document {}", path.display()))?;
        let game_id = document.game_id.clone();
        self.insert(document);
        Ok(game_id)
    }

    /// Register every `*.json` document in `dir`. Returns the loaded game ids, sorted.
    pub async fn load_dir(&self, dir: impl AsRef<Path>) -> anyhow::Result<Vec<GameId>> {
        let dir = dir.as_ref();
        let mut entries = tokio::fs::read_dir(dir)
            .await
            .with_context(|| format!("Failed to list {}", dir.display()))?;
        let mut paths = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) == Some("json") {
                paths.push(path);
            }
        }
        paths.sort();

        let mut ids = Vec::with_capacity(paths.len());
        for path in paths {
            ids.push(self.load_file(&path).await?);
        }
        info!(dir = %dir.display(), games = ids.len(), "Loaded game documents");
        Ok(ids)
    }
}

#[async_trait::async_trait]
impl SourceAdapter for JsonGameAdapter {
    fn source_identifier(&self) -> &str {
        &self.source
    }

    async fn load_game_data(&self, game_id: &str) -> AdapterResult<RawGameData> {
        let document = self
            .games
            .read()
            .get(game_id)
            .cloned()
            .ok_or_else(|| AdapterError::GameNotFound(game_id.to_string()))?;

        let mut metadata = BTreeMap::new();
        metadata.insert("home_team".to_string(), encode_field(&document.home_team)?);
        metadata.insert("away_team".to_string(), encode_field(&document.away_team)?);
        metadata.insert("players".to_string(), encode_field(&document.players)?);

        Ok(RawGameData {
            game_id: document.game_id,
            records: document.events,
            metadata,
        })
    }

    fn get_initial_state(&self, raw: &RawGameData) -> AdapterResult<InitialState> {
        let home: TeamInfo = metadata_field(raw, "home_team")?;
        let away: TeamInfo = metadata_field(raw, "away_team")?;
        let players: Vec<RosterEntry> = metadata_field(raw, "players")?;

        let mut starting_lineups: BTreeMap<TeamId, Vec<PlayerId>> = BTreeMap::new();
        let mut player_directory = BTreeMap::new();
        for entry in players {
            if entry.starter {
                starting_lineups
                    .entry(entry.team_id.clone())
                    .or_default()
                    .push(entry.player_id.clone());
            }
            player_directory.insert(
                entry.player_id,
                PlayerInfo {
                    name: entry.name,
                    team_id: entry.team_id,
                },
            );
        }

        Ok(InitialState {
            home_team_id: home.id,
            away_team_id: away.id,
            home_team_name: home.name,
            away_team_name: away.name,
            starting_lineups,
            player_directory,
        })
    }

    fn parse_event(
        &self,
        raw_record: &serde_json::Value,
        sequence_number: u64,
    ) -> Result<Event, EventParseError> {
        let record: StandardRecord = serde_json::from_value(raw_record.clone())
            .map_err(|e| EventParseError::new(e.to_string()))?;
        let kind = parse_kind(&record)?;
        let clock = record.clock.as_ref().map(ClockValue::seconds).transpose()?;
        let points_scored = record
            .points
            .unwrap_or_else(|| default_points(&kind, &record));

        let mut event = Event::new(sequence_number, kind);
        event.period = record.period;
        event.clock_seconds_remaining_in_period = clock;
        event.primary_player_id = record.player_id;
        event.team_id = record.team_id;
        event.points_scored = points_scored;
        event.description = record.description;
        event.stat_deltas = record.stat_deltas.unwrap_or_default();
        Ok(event.with_implied_deltas())
    }

    async fn get_actual_box_score(&self, game_id: &str) -> AdapterResult<Option<GroundTruth>> {
        self.games
            .read()
            .get(game_id)
            .map(|document| document.box_score.clone())
            .ok_or_else(|| AdapterError::GameNotFound(game_id.to_string()))
    }
}

fn encode_field<T: Serialize>(value: &T) -> AdapterResult<serde_json::Value> {
    serde_json::to_value(value).map_err(|e| AdapterError::Malformed(e.to_string()))
}

fn metadata_field<T: serde::de::DeserializeOwned>(
    raw: &RawGameData,
    key: &str,
) -> AdapterResult<T> {
    let value = raw
        .metadata
        .get(key)
        .ok_or_else(|| AdapterError::Malformed(format!("missing {}", key)))?;
    serde_json::from_value(value.clone())
        .map_err(|e| AdapterError::Malformed(format!("invalid {}: {}", key, e)))
}
