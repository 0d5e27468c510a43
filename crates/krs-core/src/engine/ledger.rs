//! The grade ledger of a section: batch saves, finalize and unlock.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{aggregate, require_section};
use crate::{
  Result,
  error::{StateError, ValidationError},
  grade::{GradeRecord, ScoreEntry, validate_batch},
  transcript::Transcript,
  unit::UnitOfWork,
};

/// What a successful finalize changed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalizeOutcome {
  pub section_id:  Uuid,
  pub term_id:     Uuid,
  /// Number of grade records that were locked.
  pub finalized:   usize,
  /// Transcripts rebuilt for every graded student.
  pub transcripts: Vec<Transcript>,
}

/// Insert or overwrite a batch of scores. The batch is applied whole or not
/// at all.
pub fn save_grades(
  uow: &mut impl UnitOfWork,
  section_id: Uuid,
  entries: &[ScoreEntry],
  at: DateTime<Utc>,
) -> Result<Vec<GradeRecord>> {
  require_section(uow, section_id)?;
  validate_batch(entries)?;

  let existing = uow.grades_for_section(section_id)?;
  if existing.iter().any(|g| g.finalized) {
    return Err(ValidationError::LedgerLocked { section_id }.into());
  }

  let enrolled: HashSet<Uuid> =
    uow.approved_students(section_id)?.into_iter().collect();
  let strangers: Vec<Uuid> = entries
    .iter()
    .map(|e| e.student_id)
    .filter(|id| !enrolled.contains(id))
    .collect();
  if !strangers.is_empty() {
    return Err(
      ValidationError::NotEnrolled { section_id, students: strangers }.into(),
    );
  }

  let mut by_student: HashMap<Uuid, GradeRecord> =
    existing.into_iter().map(|g| (g.student_id, g)).collect();

  let mut saved = Vec::with_capacity(entries.len());
  for entry in entries {
    let record = match by_student.remove(&entry.student_id) {
      Some(mut record) => {
        record.rescore(entry.score, at);
        record
      }
      None => GradeRecord::scored(entry.student_id, section_id, entry.score, at),
    };
    uow.upsert_grade(&record)?;
    saved.push(record);
  }
  Ok(saved)
}

/// Lock every grade of the section and rebuild the transcripts of its
/// students for the section's term. Refused while any approved student is
/// still ungraded.
pub fn finalize(
  uow: &mut impl UnitOfWork,
  section_id: Uuid,
  at: DateTime<Utc>,
) -> Result<FinalizeOutcome> {
  let detail = require_section(uow, section_id)?;
  let grades = uow.grades_for_section(section_id)?;
  if grades.iter().any(|g| g.finalized) {
    return Err(StateError::LedgerAlreadyFinalized { section_id }.into());
  }

  let approved = uow.approved_students(section_id)?;
  if grades.is_empty() && approved.is_empty() {
    return Err(StateError::LedgerEmpty { section_id }.into());
  }

  let graded: HashSet<Uuid> = grades.iter().map(|g| g.student_id).collect();
  let missing = approved.iter().filter(|s| !graded.contains(*s)).count();
  if missing > 0 {
    return Err(ValidationError::MissingGrades { section_id, missing }.into());
  }

  let finalized = uow.set_finalized(section_id, Some(at))?;

  let term_id = detail.section.term_id;
  let students: Vec<Uuid> = grades.iter().map(|g| g.student_id).collect();
  let transcripts = aggregate::recompute(uow, &students, term_id, at)?;

  Ok(FinalizeOutcome { section_id, term_id, finalized, transcripts })
}

/// Clear the finalized flag on every grade of the section. Transcripts are
/// left as they are until the next finalize.
pub fn unlock(uow: &mut impl UnitOfWork, section_id: Uuid) -> Result<usize> {
  require_section(uow, section_id)?;
  uow.set_finalized(section_id, None)
}
