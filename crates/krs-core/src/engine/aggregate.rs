//! Transcript aggregation: semester and cumulative GPA per student per term.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::{require_student, require_term};
use crate::{
  Result,
  term::terms_through,
  transcript::{Transcript, weighted_average},
  unit::UnitOfWork,
};

/// Rebuild the transcript of each student for `term_id` from finalized
/// grades. Cumulative figures cover every term up to and including
/// `term_id` in calendar order. Running this twice over the same grades
/// stores the same figures.
pub fn recompute(
  uow: &mut impl UnitOfWork,
  student_ids: &[Uuid],
  term_id: Uuid,
  at: DateTime<Utc>,
) -> Result<Vec<Transcript>> {
  let target = require_term(uow, term_id)?;
  let terms = uow.terms()?;
  let through = terms_through(&terms, &target);

  let mut students = student_ids.to_vec();
  students.sort_unstable();
  students.dedup();

  let mut transcripts = Vec::with_capacity(students.len());
  for student_id in students {
    require_student(uow, student_id)?;
    let grades = uow.finalized_grades(student_id, &through)?;

    let semester = weighted_average(grades.iter().filter(|g| g.term_id == term_id));
    let cumulative = weighted_average(&grades);

    let transcript = uow.upsert_transcript(&Transcript {
      transcript_id: Uuid::new_v4(),
      student_id,
      term_id,
      semester_gpa: semester.gpa,
      cumulative_gpa: cumulative.gpa,
      semester_credits: semester.credits,
      cumulative_credits: cumulative.credits,
      computed_at: at,
    })?;
    transcripts.push(transcript);
  }
  Ok(transcripts)
}
