//! The registration state machine and the checks it orchestrates.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::{
  load_sections, require_registration, require_section, require_student,
  require_term,
};
use crate::{
  Result,
  catalog::Section,
  conflict::{ScheduleConflict, detect_conflicts},
  error::{NotFound, StateError, ValidationError},
  load::LoadLimit,
  quota::{SEAT_HOLDING, SeatUsage},
  registration::Registration,
  term::Term,
  unit::UnitOfWork,
};

// ─── Advisory checks ─────────────────────────────────────────────────────────

/// Pairwise schedule conflicts among the given sections.
pub fn conflicts_among(
  uow: &mut impl UnitOfWork,
  section_ids: &[Uuid],
) -> Result<Vec<ScheduleConflict>> {
  let sections: Vec<Section> = load_sections(uow, section_ids)?
    .into_iter()
    .map(|d| d.section)
    .collect();
  Ok(detect_conflicts(&sections))
}

fn load_limit(
  uow: &mut impl UnitOfWork,
  student_id: Uuid,
  term: &Term,
) -> Result<LoadLimit> {
  let terms = uow.terms()?;
  let transcripts = uow.transcripts_for(student_id)?;
  Ok(LoadLimit::from_history(student_id, term, &terms, &transcripts))
}

/// The admissible credit range for a student registering in `term_id`.
pub fn max_load(
  uow: &mut impl UnitOfWork,
  student_id: Uuid,
  term_id: Uuid,
) -> Result<LoadLimit> {
  require_student(uow, student_id)?;
  let term = require_term(uow, term_id)?;
  load_limit(uow, student_id, &term)
}

fn usage_of(uow: &mut impl UnitOfWork, section: &Section) -> Result<SeatUsage> {
  Ok(SeatUsage {
    section_id: section.section_id,
    enrolled:   uow.count_lines(section.section_id, &SEAT_HOLDING)?,
    seat_cap:   section.seat_cap,
  })
}

/// Committed enrollment for a section.
pub fn seat_usage(uow: &mut impl UnitOfWork, section_id: Uuid) -> Result<SeatUsage> {
  let detail = require_section(uow, section_id)?;
  usage_of(uow, &detail.section)
}

// ─── Creation ────────────────────────────────────────────────────────────────

fn require_active_term(uow: &mut impl UnitOfWork, term_id: Uuid) -> Result<Term> {
  let term = require_term(uow, term_id)?;
  if !term.active {
    return Err(StateError::TermNotActive { term_id }.into());
  }
  Ok(term)
}

/// Refuse a second registration of `(student, term)`. Rejected registrations
/// stay on record and do not count.
fn ensure_unregistered(
  uow: &mut impl UnitOfWork,
  student_id: Uuid,
  term_id: Uuid,
) -> Result<()> {
  match uow.registration_for(student_id, term_id)? {
    None => Ok(()),
    Some(existing) => Err(
      StateError::AlreadyRegistered {
        student_id,
        term_id,
        registration_id: existing.registration_id,
      }
      .into(),
    ),
  }
}

/// Create an empty draft in the active term.
pub fn create_draft(
  uow: &mut impl UnitOfWork,
  student_id: Uuid,
  term_id: Uuid,
  at: DateTime<Utc>,
) -> Result<Registration> {
  require_student(uow, student_id)?;
  let term = require_active_term(uow, term_id)?;
  ensure_unregistered(uow, student_id, term.term_id)?;

  let registration = Registration::draft(student_id, term.term_id, at);
  uow.insert_registration(&registration)?;
  Ok(registration)
}

/// Create a draft seeded with a package's sections. Nothing beyond the line
/// set itself is validated; the draft must still be submitted.
pub fn create_from_package(
  uow: &mut impl UnitOfWork,
  student_id: Uuid,
  package_id: Uuid,
  at: DateTime<Utc>,
) -> Result<Registration> {
  require_student(uow, student_id)?;
  let package = uow
    .package(package_id)?
    .ok_or(NotFound::Package(package_id))?;
  let term = require_active_term(uow, package.term_id)?;
  ensure_unregistered(uow, student_id, term.term_id)?;

  let sections = load_sections(uow, &package.section_ids)?;
  let mut registration = Registration::draft(student_id, term.term_id, at);
  registration.package_id = Some(package.package_id);
  registration.replace_lines(&sections)?;

  uow.insert_registration(&registration)?;
  Ok(registration)
}

// ─── Draft edits ─────────────────────────────────────────────────────────────

/// Atomically replace a draft's line set.
pub fn replace_lines(
  uow: &mut impl UnitOfWork,
  registration_id: Uuid,
  section_ids: &[Uuid],
) -> Result<Registration> {
  let mut registration = require_registration(uow, registration_id)?;
  registration.ensure_draft()?;

  let sections = load_sections(uow, section_ids)?;
  registration.replace_lines(&sections)?;

  uow.replace_lines(&registration)?;
  uow.update_registration(&registration)?;
  Ok(registration)
}

pub fn delete_draft(uow: &mut impl UnitOfWork, registration_id: Uuid) -> Result<()> {
  let registration = require_registration(uow, registration_id)?;
  registration.ensure_draft()?;
  uow.delete_registration(registration_id)
}

// ─── Transitions ─────────────────────────────────────────────────────────────

/// Validate a draft and move it to `Submitted`.
///
/// Checks run by category and stop at the first failing category: window,
/// schedule conflicts, credit load, seat quota. Within a category every
/// offender is reported. Quota is read from committed state inside the same
/// unit that flips the status, so two drafts racing for a last seat cannot
/// both commit.
pub fn submit(
  uow: &mut impl UnitOfWork,
  registration_id: Uuid,
  at: DateTime<Utc>,
) -> Result<Registration> {
  let mut registration = require_registration(uow, registration_id)?;
  registration.ensure_draft()?;
  let term = require_active_term(uow, registration.term_id)?;

  if !term.accepts_submission_at(at) {
    return Err(ValidationError::WindowClosed { term_id: term.term_id, at }.into());
  }

  let details = load_sections(uow, &registration.section_ids())?;
  let sections: Vec<Section> = details.iter().map(|d| d.section.clone()).collect();

  let conflicts = detect_conflicts(&sections);
  if !conflicts.is_empty() {
    return Err(ValidationError::ScheduleConflicts(conflicts).into());
  }

  let total: u32 = details.iter().map(|d| d.credits()).sum();
  registration.total_credits = total;
  load_limit(uow, registration.student_id, &term)?.check(total)?;

  let mut shortfalls = Vec::new();
  for section in &sections {
    shortfalls.extend(usage_of(uow, section)?.claim_one());
  }
  if !shortfalls.is_empty() {
    return Err(ValidationError::QuotaExceeded(shortfalls).into());
  }

  registration.mark_submitted(at)?;
  uow.update_registration(&registration)?;
  Ok(registration)
}

pub fn approve(
  uow: &mut impl UnitOfWork,
  registration_id: Uuid,
  approver_id: Uuid,
  at: DateTime<Utc>,
) -> Result<Registration> {
  let mut registration = require_registration(uow, registration_id)?;
  registration.approve(approver_id, at)?;
  uow.update_registration(&registration)?;
  Ok(registration)
}

pub fn reject(
  uow: &mut impl UnitOfWork,
  registration_id: Uuid,
  approver_id: Uuid,
  reason: String,
  at: DateTime<Utc>,
) -> Result<Registration> {
  let mut registration = require_registration(uow, registration_id)?;
  registration.reject(approver_id, reason, at)?;
  uow.update_registration(&registration)?;
  Ok(registration)
}
