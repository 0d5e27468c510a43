//! Error types for `krs-core`.
//!
//! Callers see three categories: the input is invalid ([`ValidationError`]),
//! the object is in the wrong lifecycle state ([`StateError`]), or a
//! referenced entity does not exist ([`NotFound`]). None are retried.

use std::fmt::Display;

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::{
  catalog::ClashResource, conflict::ScheduleConflict, grade::ScoreEntry,
  quota::QuotaShortfall, registration::RegistrationStatus,
};

// ─── Categories ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ErrorCategory {
  Validation,
  State,
  NotFound,
  /// The persistence collaborator itself failed.
  Store,
}

/// Implemented by every error type that can surface an engine error, so outer
/// layers can map categories without knowing the backend.
pub trait Categorize {
  fn category(&self) -> ErrorCategory;
}

// ─── Top-level error ─────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum Error {
  #[error("validation failed: {0}")]
  Validation(#[from] ValidationError),

  #[error("invalid state: {0}")]
  State(#[from] StateError),

  #[error("{0} not found")]
  NotFound(#[from] NotFound),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
  pub fn store(e: impl std::error::Error + Send + Sync + 'static) -> Self {
    Self::Store(Box::new(e))
  }
}

impl Categorize for Error {
  fn category(&self) -> ErrorCategory {
    match self {
      Self::Validation(_) => ErrorCategory::Validation,
      Self::State(_) => ErrorCategory::State,
      Self::NotFound(_) => ErrorCategory::NotFound,
      Self::Store(_) => ErrorCategory::Store,
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

fn list<T: Display>(items: &[T]) -> String {
  items
    .iter()
    .map(ToString::to_string)
    .collect::<Vec<_>>()
    .join("; ")
}

// ─── Validation ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
  #[error("registration window for term {term_id} is closed at {at}")]
  WindowClosed { term_id: Uuid, at: DateTime<Utc> },

  #[error("schedule conflicts: {}", list(.0))]
  ScheduleConflicts(Vec<ScheduleConflict>),

  #[error("total credits {total} are below the minimum load of {floor}")]
  BelowCreditFloor { total: u32, floor: u32 },

  #[error("total credits {total} exceed the maximum load of {cap}")]
  AboveCreditCap { total: u32, cap: u32 },

  #[error("seat quota exceeded: {}", list(.0))]
  QuotaExceeded(Vec<QuotaShortfall>),

  #[error(
    "cannot finalize section {section_id}: {missing} approved student(s) have no grade"
  )]
  MissingGrades { section_id: Uuid, missing: usize },

  #[error("scores outside [0, 100]: {}", list(.0))]
  ScoresOutOfRange(Vec<ScoreEntry>),

  #[error("student {student_id} appears more than once in the batch")]
  DuplicateStudent { student_id: Uuid },

  #[error("students without an approved registration for section {section_id}: {students:?}")]
  NotEnrolled { section_id: Uuid, students: Vec<Uuid> },

  #[error("grade ledger for section {section_id} is locked")]
  LedgerLocked { section_id: Uuid },

  #[error("section {section_id} is listed more than once")]
  DuplicateSection { section_id: Uuid },

  #[error("section {section_id} belongs to term {actual}, not {expected}")]
  SectionOutsideTerm { section_id: Uuid, expected: Uuid, actual: Uuid },

  #[error("{resource} is double-booked: {conflict}")]
  SectionClash { resource: ClashResource, conflict: ScheduleConflict },

  #[error("invalid time slot {start}..{end}")]
  InvalidTimeSlot { start: u16, end: u16 },

  #[error("seat cap must be positive")]
  InvalidSeatCap,

  #[error("course credits must be positive")]
  InvalidCredits,

  #[error("invalid academic year {0:?}, expected YYYY/YYYY")]
  InvalidAcademicYear(String),

  #[error("invalid term label {0:?}")]
  InvalidTermLabel(String),

  #[error("window opens after it closes")]
  InvalidWindow,

  #[error("rejection reason must not be empty")]
  EmptyReason,

  #[error("invalid query: {0}")]
  InvalidQuery(String),
}

// ─── State ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StateError {
  #[error("registration {registration_id} is {status}; only drafts can change")]
  NotDraft { registration_id: Uuid, status: RegistrationStatus },

  #[error("registration {registration_id} cannot move from {from} to {to}")]
  InvalidTransition {
    registration_id: Uuid,
    from:            RegistrationStatus,
    to:              RegistrationStatus,
  },

  #[error(
    "student {student_id} already has registration {registration_id} for term {term_id}"
  )]
  AlreadyRegistered { student_id: Uuid, term_id: Uuid, registration_id: Uuid },

  #[error("term {term_id} is not the active term")]
  TermNotActive { term_id: Uuid },

  #[error("grade ledger for section {section_id} is already finalized")]
  LedgerAlreadyFinalized { section_id: Uuid },

  #[error("section {section_id} has no approved students and no grades")]
  LedgerEmpty { section_id: Uuid },
}

// ─── Not found ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum NotFound {
  #[error("student {0}")]
  Student(Uuid),
  #[error("term {0}")]
  Term(Uuid),
  #[error("course {0}")]
  Course(Uuid),
  #[error("section {0}")]
  Section(Uuid),
  #[error("package {0}")]
  Package(Uuid),
  #[error("registration {0}")]
  Registration(Uuid),
}
