//! Credit-load limits derived from a student's most recent semester GPA.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  error::ValidationError,
  term::{Term, chronological_cmp},
  transcript::Transcript,
};

/// Institutional minimum load, independent of GPA.
pub const CREDIT_FLOOR: u32 = 12;
/// Cap for a student with no prior transcript.
pub const FIRST_TERM_CAP: u32 = 24;

/// Map a semester GPA to the maximum credits for the following term.
pub fn cap_for_gpa(gpa: f64) -> u32 {
  match gpa {
    g if g >= 3.0 => 24,
    g if g >= 2.5 => 21,
    g if g >= 2.0 => 18,
    _ => 15,
  }
}

/// The transcript a cap was derived from.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LoadBasis {
  pub term_id:      Uuid,
  pub semester_gpa: f64,
}

/// The admissible credit range for one student in one term.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LoadLimit {
  pub student_id: Uuid,
  pub term_id:    Uuid,
  pub floor:      u32,
  pub cap:        u32,
  /// `None` when the student has no earlier transcript.
  pub basis:      Option<LoadBasis>,
}

impl LoadLimit {
  /// Derive the limit for `target` from the student's transcripts. Only
  /// transcripts of terms strictly earlier than `target` are considered, and
  /// "most recent" follows the academic calendar.
  pub fn from_history(
    student_id: Uuid,
    target: &Term,
    terms: &[Term],
    transcripts: &[Transcript],
  ) -> Self {
    let by_id: HashMap<Uuid, &Term> =
      terms.iter().map(|t| (t.term_id, t)).collect();

    let latest = transcripts
      .iter()
      .filter(|tr| tr.student_id == student_id)
      .filter_map(|tr| by_id.get(&tr.term_id).map(|term| (*term, tr)))
      .filter(|(term, _)| chronological_cmp(term, target).is_lt())
      .max_by(|(a, _), (b, _)| chronological_cmp(a, b));

    let basis = latest.map(|(term, tr)| LoadBasis {
      term_id:      term.term_id,
      semester_gpa: tr.semester_gpa,
    });

    Self {
      student_id,
      term_id: target.term_id,
      floor: CREDIT_FLOOR,
      cap: basis.map_or(FIRST_TERM_CAP, |b| cap_for_gpa(b.semester_gpa)),
      basis,
    }
  }

  /// Check a registration's total credits against the floor and the cap.
  pub fn check(&self, total_credits: u32) -> Result<(), ValidationError> {
    if total_credits < self.floor {
      return Err(ValidationError::BelowCreditFloor {
        total: total_credits,
        floor: self.floor,
      });
    }
    if total_credits > self.cap {
      return Err(ValidationError::AboveCreditCap {
        total: total_credits,
        cap:   self.cap,
      });
    }
    Ok(())
  }
}
