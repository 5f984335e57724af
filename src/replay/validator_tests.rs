//! Snapshot Validator Tests
//!
//! Each test injects one broken invariant into an otherwise clean snapshot and checks that
//! it is reported in the right category without hiding the others.

use crate::replay::snapshot::BoxScoreSnapshot;
use crate::replay::stats::{PlayerStats, StatKey, TeamStats};
use crate::replay::validator::*;
use std::collections::BTreeMap;

fn clean_snapshot(seq: u64) -> BoxScoreSnapshot {
    let mut h1 = PlayerStats::new("h1", "Home One", "HOM");
    h1.stats.add(StatKey::Fgm, 1);
    h1.stats.add(StatKey::Fga, 2);
    h1.stats.add(StatKey::Points, 2);
    h1.stats.add(StatKey::Dreb, 1);
    h1.stats.add(StatKey::Reb, 1);
    h1.minutes_played = 10.0;
    let a1 = PlayerStats::new("a1", "Away One", "AWY");

    let mut home = TeamStats::new("HOM", "Home");
    home.stats = h1.stats;
    let away = TeamStats::new("AWY", "Away");

    let mut players = BTreeMap::new();
    players.insert("h1".to_string(), h1);
    players.insert("a1".to_string(), a1);
    let mut teams = BTreeMap::new();
    teams.insert("HOM".to_string(), home);
    teams.insert("AWY".to_string(), away);

    BoxScoreSnapshot {
        game_id: "g1".into(),
        event_sequence_number: seq,
        source_identifier: "test".into(),
        period: 1,
        clock_display: "10:00".into(),
        clock_seconds_remaining: 600.0,
        game_clock_seconds_elapsed: 120.0,
        home_team_id: "HOM".into(),
        away_team_id: "AWY".into(),
        home_score: 2,
        away_score: 0,
        players,
        teams,
        degraded: false,
    }
}

fn player_mut<'a>(snapshot: &'a mut BoxScoreSnapshot, id: &str) -> &'a mut PlayerStats {
    snapshot.players.get_mut(id).unwrap()
}

// =============================================================================
// SINGLE SNAPSHOT
// =============================================================================

#[test]
fn test_clean_snapshot_is_valid() {
    let report = SnapshotValidator::default().validate(&clean_snapshot(0));
    assert!(report.is_valid(), "unexpected: {:?}", report);
    assert_eq!(report.violation_count(), 0);
}

#[test]
fn test_game_state_violations() {
    let mut snapshot = clean_snapshot(3);
    snapshot.period = 0;
    snapshot.clock_seconds_remaining = -1.0;
    snapshot.away_score = -2;

    let report = SnapshotValidator::default().validate(&snapshot);
    assert_eq!(report.event_sequence_number, 3);
    assert_eq!(report.game_state.len(), 3);
    assert!(report
        .game_state
        .iter()
        .all(|v| v.category() == ViolationCategory::GameState));
    assert!(report
        .game_state
        .contains(&Violation::InvalidPeriod { period: 0 }));
    assert!(report.game_state.contains(&Violation::NegativeScore {
        team_id: "AWY".into(),
        score: -2
    }));
}

#[test]
fn test_made_exceeds_attempted() {
    let mut snapshot = clean_snapshot(0);
    player_mut(&mut snapshot, "h1").stats.fgm = 3;
    snapshot.teams.get_mut("HOM").unwrap().stats.fgm = 3;

    let report = SnapshotValidator::default().validate(&snapshot);
    assert_eq!(
        report.player,
        vec![Violation::MadeExceedsAttempted {
            player_id: "h1".into(),
            made: StatKey::Fgm,
            made_value: 3,
            attempted_value: 2,
        }]
    );
    assert!(report.consistency.is_empty());
}

#[test]
fn test_negative_stat_and_rebound_split_reported_together() {
    let mut snapshot = clean_snapshot(0);
    let a1 = player_mut(&mut snapshot, "a1");
    a1.stats.tov = -1;
    a1.stats.reb = 2;
    let away = snapshot.teams.get_mut("AWY").unwrap();
    away.stats.tov = -1;
    away.stats.reb = 2;

    let report = SnapshotValidator::default().validate(&snapshot);
    assert_eq!(report.player.len(), 2);
    assert!(report.player.iter().any(|v| matches!(
        v,
        Violation::NegativeStat {
            stat: StatKey::Tov,
            value: -1,
            ..
        }
    )));
    assert!(report.player.iter().any(|v| matches!(
        v,
        Violation::ReboundSplitMismatch { reb: 2, .. }
    )));
}

#[test]
fn test_minutes_cap() {
    let mut snapshot = clean_snapshot(0);
    player_mut(&mut snapshot, "h1").minutes_played = 70.0;

    assert!(!SnapshotValidator::default().validate(&snapshot).is_valid());
    assert!(SnapshotValidator::new(80.0).validate(&snapshot).is_valid());
}

#[test]
fn test_team_player_sum_mismatch() {
    let mut snapshot = clean_snapshot(0);
    snapshot.teams.get_mut("HOM").unwrap().stats.points = 4;

    let report = SnapshotValidator::default().validate(&snapshot);
    assert_eq!(
        report.consistency,
        vec![Violation::TeamPlayerSumMismatch {
            team_id: "HOM".into(),
            stat: StatKey::Points,
            team_total: 4,
            player_sum: 2,
        }]
    );
    assert!(report.violations().all(|v| v.category() == ViolationCategory::Consistency));
}

#[test]
fn test_extreme_counts_are_reported_not_overflowed() {
    let mut snapshot = clean_snapshot(0);
    player_mut(&mut snapshot, "h1").stats.ast = i32::MAX;
    let mut h2 = PlayerStats::new("h2", "Home Two", "HOM");
    h2.stats.ast = 5;
    h2.stats.oreb = i32::MAX;
    h2.stats.dreb = 1;
    h2.stats.reb = i32::MAX;
    snapshot.players.insert("h2".to_string(), h2);
    let home = &mut snapshot.teams.get_mut("HOM").unwrap().stats;
    home.add(StatKey::Ast, i32::MAX);
    home.add(StatKey::Ast, 5);

    let report = SnapshotValidator::default()
        .with_consistency_stats(&[StatKey::Ast])
        .validate(&snapshot);
    assert_eq!(
        report.consistency,
        vec![Violation::TeamPlayerSumMismatch {
            team_id: "HOM".into(),
            stat: StatKey::Ast,
            team_total: i32::MAX,
            player_sum: i64::from(i32::MAX) + 5,
        }]
    );
    let split = report.player.iter().find_map(|v| match v {
        Violation::ReboundSplitMismatch { player_id, .. } => Some(player_id.as_str()),
        _ => None,
    });
    assert_eq!(split, Some("h2"));
}

#[test]
fn test_consistency_stats_can_be_restricted() {
    let mut snapshot = clean_snapshot(0);
    snapshot.teams.get_mut("HOM").unwrap().stats.pf = 1;

    let all = SnapshotValidator::default().validate(&snapshot);
    assert_eq!(all.consistency.len(), 1);

    let verified_only = SnapshotValidator::default()
        .with_consistency_stats(StatKey::verified())
        .validate(&snapshot);
    assert!(verified_only.is_valid());
}

#[test]
fn test_violation_display() {
    let v = Violation::TeamPlayerSumMismatch {
        team_id: "HOM".into(),
        stat: StatKey::Points,
        team_total: 4,
        player_sum: 2,
    };
    assert_eq!(v.to_string(), "consistency: HOM points total 4 != player sum 2");
}

// =============================================================================
// SEQUENCE
// =============================================================================

#[test]
fn test_sequence_clean() {
    let mut second = clean_snapshot(1);
    second.game_clock_seconds_elapsed = 130.0;
    assert!(validate_sequence(&[clean_snapshot(0), second]).is_empty());
    assert!(validate_sequence(&[]).is_empty());
}

#[test]
fn test_sequence_violations() {
    let first = clean_snapshot(5);
    let mut second = clean_snapshot(5);
    second.home_score = 1;
    second.game_clock_seconds_elapsed = 100.0;

    let violations = validate_sequence(&[first, second]);
    assert_eq!(violations.len(), 3);
    assert!(violations
        .iter()
        .all(|v| v.category() == ViolationCategory::Sequence));
    assert!(violations.contains(&Violation::SequenceNotIncreasing {
        previous: 5,
        current: 5
    }));
    assert!(violations.contains(&Violation::ScoreDecreased {
        sequence_number: 5,
        team_id: "HOM".into(),
        previous: 2,
        current: 1,
    }));
}
