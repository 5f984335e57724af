//! State Accumulator
//!
//! The single mutable working box score for one game. Events are folded in strictly in
//! sequence order; nothing outside the replay driver holds a reference into this state.
//!
//! # Degradation
//!
//! Player-attributed events without a usable team, or naming a team that is not playing,
//! leave all counters untouched but still move the game clock. Quirky historical rows must
//! never abort a replay.

use crate::replay::adapter::{InitialState, PlayerInfo};
use crate::replay::clock::PeriodTiming;
use crate::replay::events::{Event, EventKind, ParsedEvent, PlayerId, TeamId};
use crate::replay::stats::{PlayerStats, StatKey, TeamStats};
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// What applying one event did to the counters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// Stat/roster/clock state updated as the event describes.
    Applied,
    /// Clock fields were honoured; stat update skipped.
    NoOp { reason: String },
    /// Unparseable record; nothing changed.
    Degraded,
}

impl ApplyOutcome {
    fn no_op(reason: impl Into<String>) -> Self {
        Self::NoOp {
            reason: reason.into(),
        }
    }
}

/// Running game state for one replay.
#[derive(Debug, Clone)]
pub struct StateAccumulator {
    game_id: String,
    source_identifier: String,
    timing: PeriodTiming,
    home_team_id: TeamId,
    away_team_id: TeamId,
    period: u32,
    clock_remaining: f64,
    players: BTreeMap<PlayerId, PlayerStats>,
    teams: BTreeMap<TeamId, TeamStats>,
    directory: BTreeMap<PlayerId, PlayerInfo>,
    events_applied: u64,
    no_op_updates: u64,
}

impl StateAccumulator {
    /// Tip-off state: starters on court, all counts zero, period 1 with a full clock.
    pub fn initialize(
        game_id: impl Into<String>,
        source_identifier: impl Into<String>,
        initial: &InitialState,
        timing: PeriodTiming,
    ) -> Self {
        let mut teams = BTreeMap::new();
        teams.insert(
            initial.home_team_id.clone(),
            TeamStats::new(initial.home_team_id.clone(), initial.home_team_name.clone()),
        );
        teams.insert(
            initial.away_team_id.clone(),
            TeamStats::new(initial.away_team_id.clone(), initial.away_team_name.clone()),
        );

        let mut acc = Self {
            game_id: game_id.into(),
            source_identifier: source_identifier.into(),
            timing,
            home_team_id: initial.home_team_id.clone(),
            away_team_id: initial.away_team_id.clone(),
            period: 1,
            clock_remaining: timing.period_length(1),
            players: BTreeMap::new(),
            teams,
            directory: initial.player_directory.clone(),
            events_applied: 0,
            no_op_updates: 0,
        };

        for (team_id, lineup) in &initial.starting_lineups {
            for player_id in lineup {
                acc.ensure_player(player_id, team_id);
                acc.set_on_court(player_id, true);
            }
        }
        acc
    }

    // -------------------------------------------------------------------------
    // Read-only view (used by the snapshot factory)
    // -------------------------------------------------------------------------

    pub fn game_id(&self) -> &str {
        &self.game_id
    }

    pub fn source_identifier(&self) -> &str {
        &self.source_identifier
    }

    pub fn home_team_id(&self) -> &str {
        &self.home_team_id
    }

    pub fn away_team_id(&self) -> &str {
        &self.away_team_id
    }

    pub fn period(&self) -> u32 {
        self.period
    }

    pub fn clock_remaining(&self) -> f64 {
        self.clock_remaining
    }

    pub fn elapsed(&self) -> f64 {
        self.timing.elapsed(self.period, self.clock_remaining)
    }

    pub fn players(&self) -> &BTreeMap<PlayerId, PlayerStats> {
        &self.players
    }

    pub fn teams(&self) -> &BTreeMap<TeamId, TeamStats> {
        &self.teams
    }

    pub fn score(&self, team_id: &str) -> i32 {
        self.teams.get(team_id).map(|t| t.points()).unwrap_or(0)
    }

    pub fn home_score(&self) -> i32 {
        self.score(&self.home_team_id)
    }

    pub fn away_score(&self) -> i32 {
        self.score(&self.away_team_id)
    }

    pub fn events_applied(&self) -> u64 {
        self.events_applied
    }

    pub fn no_op_updates(&self) -> u64 {
        self.no_op_updates
    }

    // -------------------------------------------------------------------------
    // Apply
    // -------------------------------------------------------------------------

    /// Fold one parsed record into the running state.
    pub fn apply(&mut self, parsed: &ParsedEvent) -> ApplyOutcome {
        let event = match parsed {
            ParsedEvent::Parsed(event) => event,
            ParsedEvent::Degraded { .. } => return ApplyOutcome::Degraded,
        };

        self.events_applied += 1;
        self.advance_clock(event);

        let outcome = match &event.kind {
            EventKind::Substitution {
                player_in,
                player_out,
            } => self.apply_substitution(event, player_in, player_out),
            _ => self.apply_stats(event),
        };

        if let ApplyOutcome::NoOp { reason } = &outcome {
            self.no_op_updates += 1;
            warn!(
                game_id = %self.game_id,
                sequence_number = event.sequence_number,
                kind = event.kind.label(),
                reason = %reason,
                "Stat update skipped"
            );
        }
        outcome
    }

    fn advance_clock(&mut self, event: &Event) {
        let period = match event.period {
            Some(0) => {
                debug!(sequence_number = event.sequence_number, "Ignoring period 0");
                self.period
            }
            Some(p) => p,
            None => self.period,
        };

        // Only a period change rewinds the clock; a bare PeriodStart keeps it.
        let clock = match event.clock_seconds_remaining_in_period {
            Some(c) => c,
            None if matches!(event.kind, EventKind::PeriodStart) && period != self.period => {
                self.timing.period_length(period)
            }
            None => self.clock_remaining,
        };

        let before = self.elapsed();
        self.period = period;
        self.clock_remaining = clock;
        let delta = self.elapsed() - before;
        if delta > 0.0 {
            self.credit_court_time(delta);
        }
    }

    fn credit_court_time(&mut self, secs: f64) {
        let minutes = secs / 60.0;
        for player in self.players.values_mut().filter(|p| p.on_court) {
            player.minutes_played += minutes;
        }
    }

    fn apply_substitution(
        &mut self,
        event: &Event,
        player_in: &PlayerId,
        player_out: &PlayerId,
    ) -> ApplyOutcome {
        let Some(team_id) = self
            .resolve_team(player_in, event.team_id.as_deref())
            .or_else(|| self.resolve_team(player_out, event.team_id.as_deref()))
        else {
            return ApplyOutcome::no_op("substitution without a resolvable team");
        };
        if !self.teams.contains_key(&team_id) {
            return ApplyOutcome::no_op(format!("substitution for unknown team {}", team_id));
        }

        self.ensure_player(player_out, &team_id);
        self.set_on_court(player_out, false);
        self.ensure_player(player_in, &team_id);
        self.set_on_court(player_in, true);
        ApplyOutcome::Applied
    }

    fn apply_stats(&mut self, event: &Event) -> ApplyOutcome {
        let carries_stats = event.primary_player_id.is_some() || event.is_scoring();
        let Some(team_id) = event.team_id.clone() else {
            if carries_stats {
                return ApplyOutcome::no_op("missing team_id");
            }
            return ApplyOutcome::Applied;
        };
        if !self.teams.contains_key(&team_id) {
            if carries_stats {
                return ApplyOutcome::no_op(format!("team {} is not in this game", team_id));
            }
            return ApplyOutcome::Applied;
        }

        let points = if event.is_scoring() {
            match i32::try_from(event.points_scored) {
                Ok(points) => points,
                Err(_) => {
                    return ApplyOutcome::no_op(format!(
                        "points_scored {} out of range",
                        event.points_scored
                    ));
                }
            }
        } else {
            0
        };

        if let Some(player_id) = &event.primary_player_id {
            if let Some(known_team) = self.resolve_team(player_id, None) {
                if known_team != team_id {
                    return ApplyOutcome::no_op(format!(
                        "player {} belongs to {} but event names {}",
                        player_id, known_team, team_id
                    ));
                }
            }
            self.ensure_player(player_id, &team_id);

            for (name, delta) in &event.stat_deltas {
                match name.parse::<StatKey>() {
                    Ok(StatKey::Points) => {
                        debug!(
                            sequence_number = event.sequence_number,
                            "Ignoring points delta; scoring comes from points_scored"
                        );
                    }
                    Ok(key) => self.add_stat(player_id, &team_id, key, *delta),
                    Err(_) => {
                        debug!(
                            sequence_number = event.sequence_number,
                            stat = %name,
                            "Ignoring unknown stat"
                        );
                    }
                }
            }

            if event.is_scoring() {
                self.add_stat(player_id, &team_id, StatKey::Points, points);
            }
        } else if event.is_scoring() {
            // Team-only scoring still moves the score; the validator flags the player-sum gap.
            if let Some(team) = self.teams.get_mut(&team_id) {
                team.stats.add(StatKey::Points, points);
            }
        }

        if event.is_scoring() {
            self.apply_plus_minus(&team_id, points);
        }
        ApplyOutcome::Applied
    }

    fn add_stat(&mut self, player_id: &str, team_id: &str, key: StatKey, delta: i32) {
        if let Some(player) = self.players.get_mut(player_id) {
            player.stats.add(key, delta);
        }
        if let Some(team) = self.teams.get_mut(team_id) {
            team.stats.add(key, delta);
        }
    }

    fn apply_plus_minus(&mut self, scoring_team: &str, points: i32) {
        for player in self.players.values_mut().filter(|p| p.on_court) {
            if player.team_id == scoring_team {
                player.plus_minus = player.plus_minus.saturating_add(points);
            } else {
                player.plus_minus = player.plus_minus.saturating_sub(points);
            }
        }
    }

    // -------------------------------------------------------------------------
    // Roster bookkeeping
    // -------------------------------------------------------------------------

    /// Team for `player_id`: existing record, then roster directory, then the event's team.
    fn resolve_team(&self, player_id: &str, event_team: Option<&str>) -> Option<TeamId> {
        self.players
            .get(player_id)
            .map(|p| p.team_id.clone())
            .or_else(|| self.directory.get(player_id).map(|i| i.team_id.clone()))
            .or_else(|| event_team.map(str::to_string))
    }

    /// Create a zeroed record for a first-seen player.
    fn ensure_player(&mut self, player_id: &str, team_id: &str) {
        if self.players.contains_key(player_id) {
            return;
        }
        let name = self
            .directory
            .get(player_id)
            .map(|i| i.name.clone())
            .unwrap_or_else(|| player_id.to_string());
        debug!(game_id = %self.game_id, player_id, team_id, "First sighting of player");
        self.players.insert(
            player_id.to_string(),
            PlayerStats::new(player_id, name, team_id),
        );
    }

    fn set_on_court(&mut self, player_id: &str, on_court: bool) {
        let Some(player) = self.players.get_mut(player_id) else {
            return;
        };
        player.on_court = on_court;
        if let Some(team) = self.teams.get_mut(&player.team_id) {
            if on_court {
                team.on_court.insert(player_id.to_string());
            } else {
                team.on_court.remove(player_id);
            }
        }
    }
}
