//! Running Box Score Statistics
//!
//! Counting stats are signed so a bad feed delta shows up as a negative count the validator
//! can report, rather than wrapping or saturating silently.

use crate::replay::events::{PlayerId, TeamId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// Closed set of counting stats tracked per player and per team.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatKey {
    Points,
    Fgm,
    Fga,
    Fg3m,
    Fg3a,
    Ftm,
    Fta,
    Oreb,
    Dreb,
    Reb,
    Ast,
    Stl,
    Blk,
    Tov,
    Pf,
}

impl StatKey {
    pub fn all() -> &'static [StatKey] {
        &[
            Self::Points,
            Self::Fgm,
            Self::Fga,
            Self::Fg3m,
            Self::Fg3a,
            Self::Ftm,
            Self::Fta,
            Self::Oreb,
            Self::Dreb,
            Self::Reb,
            Self::Ast,
            Self::Stl,
            Self::Blk,
            Self::Tov,
            Self::Pf,
        ]
    }

    /// Stats diffed against ground truth at the end of a game.
    pub fn verified() -> &'static [StatKey] {
        &[
            Self::Points,
            Self::Reb,
            Self::Ast,
            Self::Stl,
            Self::Blk,
            Self::Tov,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Points => "points",
            Self::Fgm => "fgm",
            Self::Fga => "fga",
            Self::Fg3m => "fg3m",
            Self::Fg3a => "fg3a",
            Self::Ftm => "ftm",
            Self::Fta => "fta",
            Self::Oreb => "oreb",
            Self::Dreb => "dreb",
            Self::Reb => "reb",
            Self::Ast => "ast",
            Self::Stl => "stl",
            Self::Blk => "blk",
            Self::Tov => "tov",
            Self::Pf => "pf",
        }
    }
}

impl fmt::Display for StatKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StatKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        StatKey::all()
            .iter()
            .copied()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| format!("unknown stat '{}'", s))
    }
}

/// Cumulative counting stats. Shared by players and teams.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatLine {
    pub points: i32,
    pub fgm: i32,
    pub fga: i32,
    pub fg3m: i32,
    pub fg3a: i32,
    pub ftm: i32,
    pub fta: i32,
    pub oreb: i32,
    pub dreb: i32,
    pub reb: i32,
    pub ast: i32,
    pub stl: i32,
    pub blk: i32,
    pub tov: i32,
    pub pf: i32,
}

impl StatLine {
    pub fn get(&self, key: StatKey) -> i32 {
        match key {
            StatKey::Points => self.points,
            StatKey::Fgm => self.fgm,
            StatKey::Fga => self.fga,
            StatKey::Fg3m => self.fg3m,
            StatKey::Fg3a => self.fg3a,
            StatKey::Ftm => self.ftm,
            StatKey::Fta => self.fta,
            StatKey::Oreb => self.oreb,
            StatKey::Dreb => self.dreb,
            StatKey::Reb => self.reb,
            StatKey::Ast => self.ast,
            StatKey::Stl => self.stl,
            StatKey::Blk => self.blk,
            StatKey::Tov => self.tov,
            StatKey::Pf => self.pf,
        }
    }

    fn slot(&mut self, key: StatKey) -> &mut i32 {
        match key {
            StatKey::Points => &mut self.points,
            StatKey::Fgm => &mut self.fgm,
            StatKey::Fga => &mut self.fga,
            StatKey::Fg3m => &mut self.fg3m,
            StatKey::Fg3a => &mut self.fg3a,
            StatKey::Ftm => &mut self.ftm,
            StatKey::Fta => &mut self.fta,
            StatKey::Oreb => &mut self.oreb,
            StatKey::Dreb => &mut self.dreb,
            StatKey::Reb => &mut self.reb,
            StatKey::Ast => &mut self.ast,
            StatKey::Stl => &mut self.stl,
            StatKey::Blk => &mut self.blk,
            StatKey::Tov => &mut self.tov,
            StatKey::Pf => &mut self.pf,
        }
    }

    #[inline]
    pub fn add(&mut self, key: StatKey, delta: i32) {
        let slot = self.slot(key);
        *slot = slot.saturating_add(delta);
    }
}

/// One player's line at a point in the game.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerStats {
    pub player_id: PlayerId,
    pub display_name: String,
    pub team_id: TeamId,
    #[serde(flatten)]
    pub stats: StatLine,
    pub plus_minus: i32,
    pub minutes_played: f64,
    pub on_court: bool,
}

impl PlayerStats {
    pub fn new(
        player_id: impl Into<PlayerId>,
        display_name: impl Into<String>,
        team_id: impl Into<TeamId>,
    ) -> Self {
        Self {
            player_id: player_id.into(),
            display_name: display_name.into(),
            team_id: team_id.into(),
            stats: StatLine::default(),
            plus_minus: 0,
            minutes_played: 0.0,
            on_court: false,
        }
    }
}

/// One team's aggregate line. `stats.points` is the team's current score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamStats {
    pub team_id: TeamId,
    pub team_name: String,
    #[serde(flatten)]
    pub stats: StatLine,
    pub on_court: BTreeSet<PlayerId>,
}

impl TeamStats {
    pub fn new(team_id: impl Into<TeamId>, team_name: impl Into<String>) -> Self {
        Self {
            team_id: team_id.into(),
            team_name: team_name.into(),
            stats: StatLine::default(),
            on_court: BTreeSet::new(),
        }
    }

    #[inline]
    pub fn points(&self) -> i32 {
        self.stats.points
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stat_key_names_round_trip() {
        for key in StatKey::all() {
            assert_eq!(key.as_str().parse::<StatKey>().unwrap(), *key);
        }
        assert!("plus_minus".parse::<StatKey>().is_err());
    }

    #[test]
    fn test_stat_line_add_and_get() {
        let mut line = StatLine::default();
        line.add(StatKey::Fg3a, 2);
        line.add(StatKey::Fg3m, 1);
        line.add(StatKey::Tov, -1);
        assert_eq!(line.get(StatKey::Fg3a), 2);
        assert_eq!(line.get(StatKey::Fg3m), 1);
        assert_eq!(line.tov, -1);
    }

    #[test]
    fn test_player_stats_serialize_flat() {
        let mut p = PlayerStats::new("p1", "Player One", "home");
        p.stats.points = 7;
        let json = serde_json::to_value(&p).unwrap();
        assert_eq!(json["points"], 7);
        assert_eq!(json["reb"], 0);
        assert_eq!(json["on_court"], false);
    }
}
