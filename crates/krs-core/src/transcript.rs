//! Transcripts (KHS) and credit-weighted GPA arithmetic.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A student's derived summary for one term. Rebuilt, never edited.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transcript {
  pub transcript_id:      Uuid,
  pub student_id:         Uuid,
  pub term_id:            Uuid,
  /// IPS: credit-weighted average over this term's finalized grades.
  pub semester_gpa:       f64,
  /// IPK: credit-weighted average over every term through this one.
  pub cumulative_gpa:     f64,
  pub semester_credits:   u32,
  pub cumulative_credits: u32,
  pub computed_at:        DateTime<Utc>,
}

/// A finalized grade joined with the credit weight of its course.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeightedGrade {
  pub section_id: Uuid,
  pub term_id:    Uuid,
  pub credits:    u32,
  pub points:     f64,
}

/// The result of averaging a set of weighted grades.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GpaSummary {
  pub gpa:     f64,
  pub credits: u32,
}

/// Σ(credits × points) / Σ(credits), rounded to two decimals; zero when there
/// are no credits. Grades are summed in section order so repeated runs over
/// the same rows produce identical bits.
pub fn weighted_average<'a>(
  grades: impl IntoIterator<Item = &'a WeightedGrade>,
) -> GpaSummary {
  let mut grades: Vec<&WeightedGrade> = grades.into_iter().collect();
  grades.sort_by_key(|g| (g.term_id, g.section_id));

  let (weighted, credits) = grades.iter().fold((0.0_f64, 0_u32), |(w, c), g| {
    (w + f64::from(g.credits) * g.points, c + g.credits)
  });

  let gpa = if credits == 0 {
    0.0
  } else {
    round2(weighted / f64::from(credits))
  };
  GpaSummary { gpa, credits }
}

pub fn round2(x: f64) -> f64 { (x * 100.0).round() / 100.0 }
