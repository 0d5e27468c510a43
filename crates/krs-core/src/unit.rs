//! The [`UnitOfWork`] trait: one atomic transaction against the store.
//!
//! Engine operations in [`crate::engine`] are written against this trait. A
//! backend opens a transaction, hands the engine a `UnitOfWork` over it, and
//! commits only if the engine returns `Ok`. Dropping the unit without
//! committing discards every write made through it.
//!
//! Methods are synchronous: a unit of work lives entirely on the thread that
//! owns the transaction.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
  Result,
  catalog::{Course, Package, Section, SectionDetail, Student},
  grade::GradeRecord,
  registration::{Registration, RegistrationStatus},
  term::Term,
  transcript::{Transcript, WeightedGrade},
};

pub trait UnitOfWork {
  // ── Catalog reads ─────────────────────────────────────────────────────

  fn student(&mut self, id: Uuid) -> Result<Option<Student>>;

  fn term(&mut self, id: Uuid) -> Result<Option<Term>>;

  /// Every term, in no particular order.
  fn terms(&mut self) -> Result<Vec<Term>>;

  fn course(&mut self, id: Uuid) -> Result<Option<Course>>;

  /// A section with its course embedded.
  fn section(&mut self, id: Uuid) -> Result<Option<SectionDetail>>;

  /// Every section scheduled in `term_id`.
  fn sections_in_term(&mut self, term_id: Uuid) -> Result<Vec<Section>>;

  fn package(&mut self, id: Uuid) -> Result<Option<Package>>;

  /// Number of registration lines for `section_id` whose parent registration
  /// has one of `statuses`.
  fn count_lines(
    &mut self,
    section_id: Uuid,
    statuses: &[RegistrationStatus],
  ) -> Result<u32>;

  /// Students holding an approved line for `section_id` in that section's
  /// own term.
  fn approved_students(&mut self, section_id: Uuid) -> Result<Vec<Uuid>>;

  // ── Catalog writes ────────────────────────────────────────────────────

  fn insert_section(&mut self, section: &Section) -> Result<()>;

  fn insert_package(&mut self, package: &Package) -> Result<()>;

  // ── Registrations ─────────────────────────────────────────────────────

  /// A registration with its lines.
  fn registration(&mut self, id: Uuid) -> Result<Option<Registration>>;

  /// The student's registration for the term that has not been rejected.
  fn registration_for(
    &mut self,
    student_id: Uuid,
    term_id: Uuid,
  ) -> Result<Option<Registration>>;

  /// Insert the header row and every line.
  fn insert_registration(&mut self, registration: &Registration) -> Result<()>;

  /// Write back the header fields (status, totals, timestamps, decision).
  fn update_registration(&mut self, registration: &Registration) -> Result<()>;

  /// Delete every line of the registration and insert `registration.lines`.
  fn replace_lines(&mut self, registration: &Registration) -> Result<()>;

  /// Delete the registration and its lines.
  fn delete_registration(&mut self, id: Uuid) -> Result<()>;

  // ── Grades ────────────────────────────────────────────────────────────

  fn grades_for_section(&mut self, section_id: Uuid) -> Result<Vec<GradeRecord>>;

  /// Insert or overwrite by `(student_id, section_id)`.
  fn upsert_grade(&mut self, grade: &GradeRecord) -> Result<()>;

  /// `Some(at)` finalizes every grade of the section; `None` clears the flag.
  /// Returns the number of rows whose flag changed.
  fn set_finalized(
    &mut self,
    section_id: Uuid,
    finalized_at: Option<DateTime<Utc>>,
  ) -> Result<usize>;

  /// Finalized grades of `student_id` in any of `term_ids`, joined with the
  /// credit weight of each section's course.
  fn finalized_grades(
    &mut self,
    student_id: Uuid,
    term_ids: &[Uuid],
  ) -> Result<Vec<WeightedGrade>>;

  // ── Transcripts ───────────────────────────────────────────────────────

  fn transcripts_for(&mut self, student_id: Uuid) -> Result<Vec<Transcript>>;

  /// Insert or overwrite by `(student_id, term_id)`. An existing row keeps
  /// its `transcript_id`.
  fn upsert_transcript(&mut self, transcript: &Transcript) -> Result<Transcript>;
}
