//! Verifier Tests
//!
//! Grade boundaries, discrepancy accounting, mean absolute error and missing ground truth.

use crate::replay::adapter::{ActualPlayerLine, GroundTruth};
use crate::replay::snapshot::BoxScoreSnapshot;
use crate::replay::stats::{PlayerStats, StatKey, TeamStats};
use crate::replay::verifier::*;
use std::collections::BTreeMap;

fn player(id: &str, team: &str, points: i32, reb: i32, ast: i32) -> PlayerStats {
    let mut p = PlayerStats::new(id, id, team);
    p.stats.points = points;
    p.stats.reb = reb;
    p.stats.dreb = reb;
    p.stats.ast = ast;
    p
}

fn final_snapshot(players: Vec<PlayerStats>, home_score: i32, away_score: i32) -> BoxScoreSnapshot {
    let mut teams = BTreeMap::new();
    teams.insert("HOM".to_string(), TeamStats::new("HOM", "Home"));
    teams.insert("AWY".to_string(), TeamStats::new("AWY", "Away"));
    BoxScoreSnapshot {
        game_id: "g1".into(),
        event_sequence_number: 99,
        source_identifier: "test".into(),
        period: 4,
        clock_display: "0:00".into(),
        clock_seconds_remaining: 0.0,
        game_clock_seconds_elapsed: 2880.0,
        home_team_id: "HOM".into(),
        away_team_id: "AWY".into(),
        home_score,
        away_score,
        players: players
            .into_iter()
            .map(|p| (p.player_id.clone(), p))
            .collect(),
        teams,
        degraded: false,
    }
}

fn line(points: i32, reb: i32, ast: i32) -> ActualPlayerLine {
    ActualPlayerLine {
        points: Some(points),
        reb: Some(reb),
        ast: Some(ast),
        ..Default::default()
    }
}

fn truth(home: u32, away: u32, players: &[(&str, ActualPlayerLine)]) -> GroundTruth {
    GroundTruth {
        home_score: home,
        away_score: away,
        players: players
            .iter()
            .map(|(id, l)| (id.to_string(), *l))
            .collect(),
    }
}

// =============================================================================
// GRADING
// =============================================================================

#[test]
fn test_grade_boundaries() {
    let t = GradeThresholds::default();
    assert_eq!(t.grade(true, 0), QualityGrade::A);
    assert_eq!(t.grade(true, 1), QualityGrade::B);
    assert_eq!(t.grade(true, 5), QualityGrade::B);
    assert_eq!(t.grade(true, 6), QualityGrade::C);
    assert_eq!(t.grade(true, 15), QualityGrade::C);
    assert_eq!(t.grade(true, 16), QualityGrade::D);
    assert_eq!(t.grade(true, 30), QualityGrade::D);
    assert_eq!(t.grade(true, 31), QualityGrade::F);
}

#[test]
fn test_score_mismatch_is_always_f() {
    let t = GradeThresholds::default();
    assert_eq!(t.grade(false, 0), QualityGrade::F);
    assert_eq!(t.grade(false, 3), QualityGrade::F);
}

#[test]
fn test_custom_thresholds() {
    let t = GradeThresholds {
        b_max: 1,
        c_max: 2,
        d_max: 3,
    };
    assert_eq!(t.grade(true, 2), QualityGrade::C);
    assert_eq!(t.grade(true, 4), QualityGrade::F);
}

// =============================================================================
// VERIFICATION
// =============================================================================

#[test]
fn test_perfect_match_is_a() {
    let snapshot = final_snapshot(vec![player("h1", "HOM", 10, 4, 2)], 10, 0);
    let truth = truth(10, 0, &[("h1", line(10, 4, 2))]);

    let result = Verifier::default().verify(&snapshot, Some(&truth));
    assert!(result.final_score_match);
    assert!(result.has_ground_truth());
    assert_eq!(result.total_discrepancy_count, 0);
    assert_eq!(result.quality_grade, QualityGrade::A);
    assert_eq!(result.mean_absolute_error, MeanAbsoluteErrors::default());
    assert!(result.notes.is_empty());
}

#[test]
fn test_discrepancies_and_mae() {
    let snapshot = final_snapshot(
        vec![
            player("h1", "HOM", 12, 4, 2),
            player("h2", "HOM", 8, 3, 1),
            player("h3", "HOM", 0, 0, 0),
        ],
        20,
        0,
    );
    let truth = truth(
        20,
        0,
        &[
            ("h1", line(10, 5, 2)),
            ("h2", line(10, 3, 1)),
            ("h3", line(0, 0, 0)),
        ],
    );

    let result = Verifier::default().verify(&snapshot, Some(&truth));
    assert!(result.final_score_match);
    assert_eq!(result.total_discrepancy_count, 3);
    assert_eq!(result.quality_grade, QualityGrade::B);

    let h1_points = result
        .discrepancy_details
        .iter()
        .find(|d| d.player_id == "h1" && d.stat == StatKey::Points)
        .unwrap();
    assert_eq!(h1_points.generated, 12);
    assert_eq!(h1_points.actual, 10);
    assert_eq!(h1_points.diff, 2);

    // Two players with discrepancies: points |2| + |-2| over 2, rebounds |-1| over 2.
    assert!((result.mean_absolute_error.points - 2.0).abs() < 1e-9);
    assert!((result.mean_absolute_error.rebounds - 0.5).abs() < 1e-9);
    assert_eq!(result.mean_absolute_error.assists, 0.0);
}

#[test]
fn test_unreported_stats_are_not_diffed() {
    let mut h1 = player("h1", "HOM", 4, 2, 1);
    h1.stats.stl = 3;
    let snapshot = final_snapshot(vec![h1], 4, 0);
    let truth: GroundTruth = serde_json::from_value(serde_json::json!({
        "home_score": 4,
        "away_score": 0,
        "players": {"h1": {"points": 4, "ast": 2}}
    }))
    .unwrap();
    assert_eq!(truth.players["h1"].get(StatKey::Reb), None);

    let result = Verifier::default().verify(&snapshot, Some(&truth));
    assert_eq!(result.total_discrepancy_count, 1);
    assert_eq!(result.discrepancy_details[0].stat, StatKey::Ast);
    assert_eq!(result.discrepancy_details[0].diff, -1);
    assert_eq!(result.quality_grade, QualityGrade::B);
}

#[test]
fn test_extreme_values_diff_without_overflow() {
    let snapshot = final_snapshot(vec![player("h1", "HOM", i32::MAX, 0, 0)], 0, 0);
    let mut actual = line(0, 0, 0);
    actual.points = Some(i32::MIN);
    let truth = truth(0, 0, &[("h1", actual)]);

    let result = Verifier::default().verify(&snapshot, Some(&truth));
    let d = &result.discrepancy_details[0];
    assert_eq!(d.diff, i64::from(i32::MAX) - i64::from(i32::MIN));
    assert!(result.mean_absolute_error.points > 0.0);
}

#[test]
fn test_final_score_mismatch() {
    let snapshot = final_snapshot(vec![player("h1", "HOM", 2, 0, 0)], 2, 0);
    let truth = truth(4, 0, &[("h1", line(2, 0, 0))]);

    let result = Verifier::default().verify(&snapshot, Some(&truth));
    assert!(!result.final_score_match);
    assert_eq!(result.total_discrepancy_count, 0);
    assert_eq!(result.quality_grade, QualityGrade::F);
    assert_eq!(result.actual_home_score, Some(4));
    assert!(result.notes[0].contains("final score mismatch"));
}

#[test]
fn test_one_sided_players_are_noted_not_counted() {
    let snapshot = final_snapshot(vec![player("h1", "HOM", 2, 0, 0)], 2, 0);
    let truth = truth(2, 0, &[("h1", line(2, 0, 0)), ("h9", line(0, 1, 0))]);

    let result = Verifier::default().verify(&snapshot, Some(&truth));
    assert_eq!(result.total_discrepancy_count, 0);
    assert_eq!(result.quality_grade, QualityGrade::A);
    assert_eq!(result.notes.len(), 1);
    assert!(result.notes[0].contains("h9"));
}

#[test]
fn test_missing_ground_truth_is_f_with_note() {
    let snapshot = final_snapshot(vec![player("h1", "HOM", 2, 0, 0)], 2, 0);

    let result = Verifier::default().verify(&snapshot, None);
    assert!(!result.final_score_match);
    assert!(!result.has_ground_truth());
    assert_eq!(result.quality_grade, QualityGrade::F);
    assert_eq!(result.generated_home_score, 2);
    assert_eq!(result.notes, vec![NO_GROUND_TRUTH_NOTE.to_string()]);
}
