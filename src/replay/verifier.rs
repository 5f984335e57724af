//! Final Box Score Verification
//!
//! Diffs the last snapshot of a replay against an independently sourced box score and
//! assigns a quality grade.
//!
//! # Grading
//!
//! | Condition | Grade |
//! |-----------|-------|
//! | final score differs (or no ground truth) | F |
//! | 0 discrepancies | A |
//! | <= 5 | B |
//! | <= 15 | C |
//! | <= 30 | D |
//! | more | F |

use crate::replay::adapter::GroundTruth;
use crate::replay::events::{GameId, PlayerId};
use crate::replay::snapshot::BoxScoreSnapshot;
use crate::replay::stats::StatKey;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Note attached when the adapter has no final box score for the game.
pub const NO_GROUND_TRUTH_NOTE: &str = "no ground truth available";

/// Letter grade for a replayed game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum QualityGrade {
    A,
    B,
    C,
    D,
    F,
}

impl QualityGrade {
    pub fn all() -> &'static [QualityGrade] {
        &[Self::A, Self::B, Self::C, Self::D, Self::F]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::A => "A",
            Self::B => "B",
            Self::C => "C",
            Self::D => "D",
            Self::F => "F",
        }
    }
}

impl fmt::Display for QualityGrade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Upper discrepancy bounds (inclusive) for grades B, C and D.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GradeThresholds {
    #[serde(default = "default_b_max")]
    pub b_max: u32,
    #[serde(default = "default_c_max")]
    pub c_max: u32,
    #[serde(default = "default_d_max")]
    pub d_max: u32,
}

fn default_b_max() -> u32 {
    5
}

fn default_c_max() -> u32 {
    15
}

fn default_d_max() -> u32 {
    30
}

impl Default for GradeThresholds {
    fn default() -> Self {
        Self {
            b_max: default_b_max(),
            c_max: default_c_max(),
            d_max: default_d_max(),
        }
    }
}

impl GradeThresholds {
    /// A score mismatch is an F regardless of discrepancy count.
    pub fn grade(&self, final_score_match: bool, total_discrepancy_count: u32) -> QualityGrade {
        if !final_score_match {
            return QualityGrade::F;
        }
        match total_discrepancy_count {
            0 => QualityGrade::A,
            n if n <= self.b_max => QualityGrade::B,
            n if n <= self.c_max => QualityGrade::C,
            n if n <= self.d_max => QualityGrade::D,
            _ => QualityGrade::F,
        }
    }
}

/// One player/stat mismatch. `diff = generated - actual`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Discrepancy {
    pub player_id: PlayerId,
    pub stat: StatKey,
    pub generated: i32,
    pub actual: i32,
    pub diff: i64,
}

/// Mean absolute error per verified stat, over players with at least one discrepancy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MeanAbsoluteErrors {
    pub points: f64,
    pub rebounds: f64,
    pub assists: f64,
    pub steals: f64,
    pub blocks: f64,
    pub turnovers: f64,
}

impl MeanAbsoluteErrors {
    fn slot(&mut self, key: StatKey) -> Option<&mut f64> {
        match key {
            StatKey::Points => Some(&mut self.points),
            StatKey::Reb => Some(&mut self.rebounds),
            StatKey::Ast => Some(&mut self.assists),
            StatKey::Stl => Some(&mut self.steals),
            StatKey::Blk => Some(&mut self.blocks),
            StatKey::Tov => Some(&mut self.turnovers),
            _ => None,
        }
    }
}

/// End-of-game comparison against ground truth.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationResult {
    pub game_id: GameId,
    pub source_identifier: String,
    pub final_score_match: bool,
    pub generated_home_score: i32,
    pub generated_away_score: i32,
    pub actual_home_score: Option<u32>,
    pub actual_away_score: Option<u32>,
    pub total_discrepancy_count: u32,
    pub discrepancy_details: Vec<Discrepancy>,
    pub mean_absolute_error: MeanAbsoluteErrors,
    pub quality_grade: QualityGrade,
    pub notes: Vec<String>,
}

impl VerificationResult {
    pub fn has_ground_truth(&self) -> bool {
        self.actual_home_score.is_some()
    }
}

/// Ground-truth comparator.
#[derive(Debug, Clone, Default)]
pub struct Verifier {
    thresholds: GradeThresholds,
}

impl Verifier {
    pub fn new(thresholds: GradeThresholds) -> Self {
        Self { thresholds }
    }

    /// Compare `final_snapshot` with `truth`. Missing truth is a reporting outcome (grade F),
    /// not an error.
    pub fn verify(
        &self,
        final_snapshot: &BoxScoreSnapshot,
        truth: Option<&GroundTruth>,
    ) -> VerificationResult {
        let mut result = VerificationResult {
            game_id: final_snapshot.game_id.clone(),
            source_identifier: final_snapshot.source_identifier.clone(),
            final_score_match: false,
            generated_home_score: final_snapshot.home_score,
            generated_away_score: final_snapshot.away_score,
            actual_home_score: None,
            actual_away_score: None,
            total_discrepancy_count: 0,
            discrepancy_details: Vec::new(),
            mean_absolute_error: MeanAbsoluteErrors::default(),
            quality_grade: QualityGrade::F,
            notes: Vec::new(),
        };

        let Some(truth) = truth else {
            result.notes.push(NO_GROUND_TRUTH_NOTE.to_string());
            return result;
        };

        result.actual_home_score = Some(truth.home_score);
        result.actual_away_score = Some(truth.away_score);
        result.final_score_match = i64::from(final_snapshot.home_score)
            == i64::from(truth.home_score)
            && i64::from(final_snapshot.away_score) == i64::from(truth.away_score);
        if !result.final_score_match {
            result.notes.push(format!(
                "final score mismatch: generated {}-{}, actual {}-{}",
                final_snapshot.home_score,
                final_snapshot.away_score,
                truth.home_score,
                truth.away_score
            ));
        }

        let mut players_with_discrepancy: BTreeSet<&str> = BTreeSet::new();
        for (player_id, generated) in &final_snapshot.players {
            let Some(actual) = truth.players.get(player_id) else {
                continue;
            };
            for key in StatKey::verified() {
                let Some(actual_value) = actual.get(*key) else {
                    continue;
                };
                let generated_value = generated.stats.get(*key);
                if generated_value != actual_value {
                    players_with_discrepancy.insert(player_id.as_str());
                    result.discrepancy_details.push(Discrepancy {
                        player_id: player_id.clone(),
                        stat: *key,
                        generated: generated_value,
                        actual: actual_value,
                        diff: i64::from(generated_value) - i64::from(actual_value),
                    });
                }
            }
        }
        result.total_discrepancy_count = result.discrepancy_details.len() as u32;

        if !players_with_discrepancy.is_empty() {
            let denominator = players_with_discrepancy.len() as f64;
            for d in &result.discrepancy_details {
                if let Some(slot) = result.mean_absolute_error.slot(d.stat) {
                    *slot += d.diff.abs() as f64 / denominator;
                }
            }
        }

        let generated_only: Vec<&str> = final_snapshot
            .players
            .keys()
            .filter(|id| !truth.players.contains_key(*id))
            .map(String::as_str)
            .collect();
        if !generated_only.is_empty() {
            result.notes.push(format!(
                "{} replayed player(s) absent from ground truth: {}",
                generated_only.len(),
                generated_only.join(", ")
            ));
        }
        let truth_only: Vec<&str> = truth
            .players
            .keys()
            .filter(|id| !final_snapshot.players.contains_key(*id))
            .map(String::as_str)
            .collect();
        if !truth_only.is_empty() {
            result.notes.push(format!(
                "{} ground-truth player(s) never appeared in replay: {}",
                truth_only.len(),
                truth_only.join(", ")
            ));
        }

        result.quality_grade = self
            .thresholds
            .grade(result.final_score_match, result.total_discrepancy_count);
        result
    }
}
