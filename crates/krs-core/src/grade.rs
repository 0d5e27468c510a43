//! Grade records and the fixed score-to-letter scale.

use std::{collections::HashSet, fmt};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;

use crate::error::ValidationError;

pub const MIN_SCORE: f64 = 0.0;
pub const MAX_SCORE: f64 = 100.0;

// ─── Letter grades ───────────────────────────────────────────────────────────

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  Display,
  EnumString,
)]
pub enum LetterGrade {
  A,
  AB,
  B,
  BC,
  C,
  CD,
  D,
  E,
}

/// Lower score bound of each letter, highest first.
const SCALE: [(f64, LetterGrade); 7] = [
  (91.0, LetterGrade::A),
  (81.0, LetterGrade::AB),
  (74.0, LetterGrade::B),
  (68.0, LetterGrade::BC),
  (60.0, LetterGrade::C),
  (51.0, LetterGrade::CD),
  (41.0, LetterGrade::D),
];

impl LetterGrade {
  /// Convert a score in `[0, 100]`. Callers validate the range first.
  pub fn from_score(score: f64) -> Self {
    SCALE
      .iter()
      .find(|(floor, _)| score >= *floor)
      .map_or(LetterGrade::E, |(_, letter)| *letter)
  }

  /// Grade point on the 4.0 scale.
  pub fn points(&self) -> f64 {
    match self {
      Self::A => 4.0,
      Self::AB => 3.5,
      Self::B => 3.0,
      Self::BC => 2.5,
      Self::C => 2.0,
      Self::CD => 1.5,
      Self::D => 1.0,
      Self::E => 0.0,
    }
  }
}

// ─── Score input ─────────────────────────────────────────────────────────────

/// One student's numeric score in a batch.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreEntry {
  pub student_id: Uuid,
  pub score:      f64,
}

impl fmt::Display for ScoreEntry {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "student {} scored {}", self.student_id, self.score)
  }
}

/// Check a whole batch before anything is written. Every out-of-range score is
/// reported; a batch naming a student twice is rejected outright.
pub fn validate_batch(entries: &[ScoreEntry]) -> Result<(), ValidationError> {
  let out_of_range: Vec<ScoreEntry> = entries
    .iter()
    .filter(|e| !(MIN_SCORE..=MAX_SCORE).contains(&e.score))
    .copied()
    .collect();
  if !out_of_range.is_empty() {
    return Err(ValidationError::ScoresOutOfRange(out_of_range));
  }

  let mut seen = HashSet::with_capacity(entries.len());
  for e in entries {
    if !seen.insert(e.student_id) {
      return Err(ValidationError::DuplicateStudent { student_id: e.student_id });
    }
  }
  Ok(())
}

// ─── GradeRecord ─────────────────────────────────────────────────────────────

/// One student's grade for one section. Unique per `(student, section)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradeRecord {
  pub grade_id:     Uuid,
  pub student_id:   Uuid,
  pub section_id:   Uuid,
  pub score:        f64,
  pub letter:       LetterGrade,
  pub points:       f64,
  pub finalized:    bool,
  pub recorded_at:  DateTime<Utc>,
  pub finalized_at: Option<DateTime<Utc>>,
}

impl GradeRecord {
  /// A fresh, unfinalized record. The letter and points are derived here and
  /// nowhere else.
  pub fn scored(
    student_id: Uuid,
    section_id: Uuid,
    score: f64,
    at: DateTime<Utc>,
  ) -> Self {
    let letter = LetterGrade::from_score(score);
    Self {
      grade_id: Uuid::new_v4(),
      student_id,
      section_id,
      score,
      letter,
      points: letter.points(),
      finalized: false,
      recorded_at: at,
      finalized_at: None,
    }
  }

  /// Overwrite the score of an unfinalized record, keeping its id.
  pub fn rescore(&mut self, score: f64, at: DateTime<Utc>) {
    self.score = score;
    self.letter = LetterGrade::from_score(score);
    self.points = self.letter.points();
    self.recorded_at = at;
  }
}
