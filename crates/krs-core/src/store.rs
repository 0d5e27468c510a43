//! The `AcademicStore` trait and supporting query types.
//!
//! The trait is implemented by storage backends (e.g. `krs-store-sqlite`).
//! Higher layers (`krs-api`, `krs-server`) depend on this abstraction, not on
//! any concrete backend. Every mutating method is one atomic unit: it commits
//! all of its row changes or none of them.

use std::future::Future;

use serde::Deserialize;
use uuid::Uuid;

use crate::{
  catalog::{
    Course, NewCourse, NewPackage, NewSection, NewStudent, Package, Section,
    SectionDetail, Student,
  },
  conflict::ScheduleConflict,
  engine::FinalizeOutcome,
  error::{Categorize, ValidationError},
  grade::{GradeRecord, ScoreEntry},
  load::LoadLimit,
  quota::SeatUsage,
  registration::{Registration, RegistrationStatus},
  term::{NewTerm, Term},
  transcript::Transcript,
};

// ─── Query types ─────────────────────────────────────────────────────────────

pub const MAX_PAGE_SIZE: usize = 500;
pub const DEFAULT_PAGE_SIZE: usize = 100;

/// Parameters for [`AcademicStore::list_registrations`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RegistrationQuery {
  pub student_id: Option<Uuid>,
  pub term_id:    Option<Uuid>,
  pub status:     Option<RegistrationStatus>,
  pub limit:      Option<usize>,
  pub offset:     Option<usize>,
}

impl RegistrationQuery {
  pub fn validate(&self) -> Result<(), ValidationError> {
    match self.limit {
      Some(0) => Err(ValidationError::InvalidQuery("limit must be positive".into())),
      Some(n) if n > MAX_PAGE_SIZE => Err(ValidationError::InvalidQuery(format!(
        "limit {n} exceeds {MAX_PAGE_SIZE}"
      ))),
      _ => Ok(()),
    }
  }

  pub fn page_size(&self) -> usize { self.limit.unwrap_or(DEFAULT_PAGE_SIZE) }
}

/// Parameters for [`AcademicStore::list_sections`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SectionQuery {
  pub term_id:       Option<Uuid>,
  pub course_id:     Option<Uuid>,
  pub instructor_id: Option<Uuid>,
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over an academic-records backend.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes (e.g. tokio with `axum`).
pub trait AcademicStore: Send + Sync {
  type Error: std::error::Error + Categorize + Send + Sync + 'static;

  // ── Students ──────────────────────────────────────────────────────────

  fn add_student(
    &self,
    input: NewStudent,
  ) -> impl Future<Output = Result<Student, Self::Error>> + Send + '_;

  fn get_student(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Student>, Self::Error>> + Send + '_;

  // ── Terms ─────────────────────────────────────────────────────────────

  /// Create an inactive term.
  fn add_term(
    &self,
    input: NewTerm,
  ) -> impl Future<Output = Result<Term, Self::Error>> + Send + '_;

  fn get_term(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Term>, Self::Error>> + Send + '_;

  /// All terms, earliest first by academic calendar.
  fn list_terms(
    &self,
  ) -> impl Future<Output = Result<Vec<Term>, Self::Error>> + Send + '_;

  /// The term whose `active` flag is set, if any.
  fn active_term(
    &self,
  ) -> impl Future<Output = Result<Option<Term>, Self::Error>> + Send + '_;

  /// Make `id` the only active term.
  fn activate_term(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Term, Self::Error>> + Send + '_;

  // ── Courses and sections ──────────────────────────────────────────────

  fn add_course(
    &self,
    input: NewCourse,
  ) -> impl Future<Output = Result<Course, Self::Error>> + Send + '_;

  fn get_course(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Course>, Self::Error>> + Send + '_;

  /// Schedule a section. Fails if its room or instructor is already booked
  /// for an overlapping slot in the same term.
  fn add_section(
    &self,
    input: NewSection,
  ) -> impl Future<Output = Result<Section, Self::Error>> + Send + '_;

  fn get_section(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<SectionDetail>, Self::Error>> + Send + '_;

  fn list_sections<'a>(
    &'a self,
    query: &'a SectionQuery,
  ) -> impl Future<Output = Result<Vec<SectionDetail>, Self::Error>> + Send + 'a;

  fn add_package(
    &self,
    input: NewPackage,
  ) -> impl Future<Output = Result<Package, Self::Error>> + Send + '_;

  // ── Advisory checks ───────────────────────────────────────────────────

  /// Pairwise schedule conflicts among `section_ids`. No side effects.
  fn detect_conflicts(
    &self,
    section_ids: Vec<Uuid>,
  ) -> impl Future<Output = Result<Vec<ScheduleConflict>, Self::Error>> + Send + '_;

  /// The credit range `student_id` may register for in `term_id`.
  fn max_load(
    &self,
    student_id: Uuid,
    term_id: Uuid,
  ) -> impl Future<Output = Result<LoadLimit, Self::Error>> + Send + '_;

  /// Committed seats of a section. Advisory: submit re-checks it.
  fn seat_usage(
    &self,
    section_id: Uuid,
  ) -> impl Future<Output = Result<SeatUsage, Self::Error>> + Send + '_;

  // ── Registrations ─────────────────────────────────────────────────────

  /// Create an empty draft for the active term.
  fn create_registration(
    &self,
    student_id: Uuid,
    term_id: Uuid,
  ) -> impl Future<Output = Result<Registration, Self::Error>> + Send + '_;

  /// Create a draft seeded from a package.
  fn create_from_package(
    &self,
    student_id: Uuid,
    package_id: Uuid,
  ) -> impl Future<Output = Result<Registration, Self::Error>> + Send + '_;

  fn get_registration(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Registration>, Self::Error>> + Send + '_;

  fn list_registrations<'a>(
    &'a self,
    query: &'a RegistrationQuery,
  ) -> impl Future<Output = Result<Vec<Registration>, Self::Error>> + Send + 'a;

  /// Replace a draft's line set.
  fn replace_lines(
    &self,
    registration_id: Uuid,
    section_ids: Vec<Uuid>,
  ) -> impl Future<Output = Result<Registration, Self::Error>> + Send + '_;

  /// Validate and move a draft to `Submitted`.
  fn submit_registration(
    &self,
    registration_id: Uuid,
  ) -> impl Future<Output = Result<Registration, Self::Error>> + Send + '_;

  fn approve_registration(
    &self,
    registration_id: Uuid,
    approver_id: Uuid,
  ) -> impl Future<Output = Result<Registration, Self::Error>> + Send + '_;

  fn reject_registration(
    &self,
    registration_id: Uuid,
    approver_id: Uuid,
    reason: String,
  ) -> impl Future<Output = Result<Registration, Self::Error>> + Send + '_;

  /// Delete a draft.
  fn delete_registration(
    &self,
    registration_id: Uuid,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  // ── Grades ────────────────────────────────────────────────────────────

  fn save_grades(
    &self,
    section_id: Uuid,
    entries: Vec<ScoreEntry>,
  ) -> impl Future<Output = Result<Vec<GradeRecord>, Self::Error>> + Send + '_;

  fn list_grades(
    &self,
    section_id: Uuid,
  ) -> impl Future<Output = Result<Vec<GradeRecord>, Self::Error>> + Send + '_;

  fn finalize_section(
    &self,
    section_id: Uuid,
  ) -> impl Future<Output = Result<FinalizeOutcome, Self::Error>> + Send + '_;

  /// Returns the number of grade records unlocked.
  fn unlock_section(
    &self,
    section_id: Uuid,
  ) -> impl Future<Output = Result<usize, Self::Error>> + Send + '_;

  // ── Transcripts ───────────────────────────────────────────────────────

  fn recompute_transcripts(
    &self,
    student_ids: Vec<Uuid>,
    term_id: Uuid,
  ) -> impl Future<Output = Result<Vec<Transcript>, Self::Error>> + Send + '_;

  /// A student's transcripts, earliest term first.
  fn list_transcripts(
    &self,
    student_id: Uuid,
  ) -> impl Future<Output = Result<Vec<Transcript>, Self::Error>> + Send + '_;
}
