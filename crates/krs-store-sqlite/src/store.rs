//! [`SqliteStore`]: the SQLite implementation of [`AcademicStore`].

use std::{
  collections::HashMap,
  path::Path,
  sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use chrono::Utc;
use rusqlite::TransactionBehavior;
use tokio::sync::OwnedMutexGuard;
use uuid::Uuid;

use krs_core::{
  catalog::{
    Course, NewCourse, NewPackage, NewSection, NewStudent, Package, Section,
    SectionDetail, Student,
  },
  conflict::ScheduleConflict,
  engine::{self, FinalizeOutcome},
  error::{NotFound, ValidationError},
  grade::{GradeRecord, ScoreEntry},
  load::LoadLimit,
  quota::SeatUsage,
  registration::Registration,
  store::{AcademicStore, RegistrationQuery, SectionQuery},
  term::{NewTerm, Term, sort_chronologically},
  transcript::Transcript,
  unit::UnitOfWork,
};

use crate::{Error, Result, schema::SCHEMA, unit::SqliteUnit};

// ─── Section locks ───────────────────────────────────────────────────────────

/// One async mutex per section, created on first use and dropped once the
/// last holder releases it. Grade saves, finalize and unlock of the same
/// section queue behind each other; other sections are unaffected.
#[derive(Clone, Default)]
struct SectionLocks {
  inner: Arc<Mutex<LockTable>>,
}

type LockTable = HashMap<Uuid, Arc<tokio::sync::Mutex<()>>>;

impl SectionLocks {
  async fn acquire(&self, section_id: Uuid) -> SectionGuard {
    // Built before waiting so a cancelled wait still cleans up its entry.
    let mut held = SectionGuard { locks: self.clone(), section_id, guard: None };
    let lock = self.table().entry(section_id).or_default().clone();
    held.guard = Some(lock.lock_owned().await);
    held
  }

  fn table(&self) -> MutexGuard<'_, LockTable> {
    self.inner.lock().unwrap_or_else(PoisonError::into_inner)
  }

  #[cfg(test)]
  fn len(&self) -> usize { self.table().len() }
}

/// Holds a section's mutex. On drop the table entry is removed unless another
/// task has cloned it in the meantime.
struct SectionGuard {
  locks:      SectionLocks,
  section_id: Uuid,
  guard:      Option<OwnedMutexGuard<()>>,
}

impl Drop for SectionGuard {
  fn drop(&mut self) {
    self.guard.take();
    let mut map = self.locks.table();
    if map
      .get(&self.section_id)
      .is_some_and(|lock| Arc::strong_count(lock) == 1)
    {
      map.remove(&self.section_id);
    }
  }
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// An academic-records store backed by a single SQLite file.
///
/// Cloning is cheap: the connection handle and the lock table are shared.
#[derive(Clone)]
pub struct SqliteStore {
  conn:  tokio_rusqlite::Connection,
  locks: SectionLocks,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    Self::init(conn).await
  }

  /// Open an in-memory store, useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    Self::init(conn).await
  }

  async fn init(conn: tokio_rusqlite::Connection) -> Result<Self> {
    conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(Self { conn, locks: SectionLocks::default() })
  }

  /// Run `work` inside one IMMEDIATE transaction, committing only if it
  /// returns `Ok`. The write lock is taken up front, so reads made by `work`
  /// (seat counts in particular) cannot go stale before its writes land.
  async fn in_unit<T, F>(&self, work: F) -> Result<T>
  where
    F: FnOnce(&mut SqliteUnit<'_>) -> krs_core::Result<T> + Send + 'static,
    T: Send + 'static,
  {
    let outcome = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let outcome = work(&mut SqliteUnit::new(&tx));
        if outcome.is_ok() {
          tx.commit()?;
        }
        Ok(outcome)
      })
      .await?;
    Ok(outcome?)
  }

  /// Run read-only `work` against one consistent snapshot.
  async fn read<T, F>(&self, work: F) -> Result<T>
  where
    F: FnOnce(&mut SqliteUnit<'_>) -> krs_core::Result<T> + Send + 'static,
    T: Send + 'static,
  {
    let outcome = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let outcome = work(&mut SqliteUnit::new(&tx));
        Ok(outcome)
      })
      .await?;
    Ok(outcome?)
  }
}

#[cfg(test)]
impl SqliteStore {
  /// Number of sections with a live lock entry.
  pub(crate) fn section_lock_count(&self) -> usize { self.locks.len() }
}

fn invalid(e: ValidationError) -> Error { Error::Core(e.into()) }

// ─── AcademicStore impl ──────────────────────────────────────────────────────

impl AcademicStore for SqliteStore {
  type Error = Error;

  // ── Students ──────────────────────────────────────────────────────────────

  async fn add_student(&self, input: NewStudent) -> Result<Student> {
    let student = Student {
      student_id:     Uuid::new_v4(),
      student_number: input.student_number,
      name:           input.name,
      program:        input.program,
      cohort:         input.cohort,
    };
    self
      .in_unit(move |unit| {
        unit.insert_student(&student)?;
        Ok(student)
      })
      .await
  }

  async fn get_student(&self, id: Uuid) -> Result<Option<Student>> {
    self.read(move |unit| unit.student(id)).await
  }

  // ── Terms ─────────────────────────────────────────────────────────────────

  async fn add_term(&self, input: NewTerm) -> Result<Term> {
    input.validate().map_err(invalid)?;
    let term = Term {
      term_id:             Uuid::new_v4(),
      academic_year:       input.academic_year,
      period:              input.period,
      active:              false,
      registration_window: input.registration_window,
      amendment_window:    input.amendment_window,
    };
    self
      .in_unit(move |unit| {
        unit.insert_term(&term)?;
        Ok(term)
      })
      .await
  }

  async fn get_term(&self, id: Uuid) -> Result<Option<Term>> {
    self.read(move |unit| unit.term(id)).await
  }

  async fn list_terms(&self) -> Result<Vec<Term>> {
    let mut terms = self.read(|unit| unit.terms()).await?;
    sort_chronologically(&mut terms);
    Ok(terms)
  }

  async fn active_term(&self) -> Result<Option<Term>> {
    self.read(|unit| unit.active_term()).await
  }

  async fn activate_term(&self, id: Uuid) -> Result<Term> {
    let term = self
      .in_unit(move |unit| {
        if !unit.activate_term(id)? {
          return Err(NotFound::Term(id).into());
        }
        unit.term(id)?.ok_or_else(|| NotFound::Term(id).into())
      })
      .await?;
    tracing::info!(term_id = %term.term_id, "activated term {}", term.label());
    Ok(term)
  }

  // ── Courses and sections ──────────────────────────────────────────────────

  async fn add_course(&self, input: NewCourse) -> Result<Course> {
    input.validate().map_err(invalid)?;
    let course = Course {
      course_id:    Uuid::new_v4(),
      code:         input.code,
      name:         input.name,
      credits:      input.credits,
      nominal_term: input.nominal_term,
    };
    self
      .in_unit(move |unit| {
        unit.insert_course(&course)?;
        Ok(course)
      })
      .await
  }

  async fn get_course(&self, id: Uuid) -> Result<Option<Course>> {
    self.read(move |unit| unit.course(id)).await
  }

  async fn add_section(&self, input: NewSection) -> Result<Section> {
    self
      .in_unit(move |unit| engine::catalog::add_section(unit, input))
      .await
  }

  async fn get_section(&self, id: Uuid) -> Result<Option<SectionDetail>> {
    self.read(move |unit| unit.section(id)).await
  }

  async fn list_sections(&self, query: &SectionQuery) -> Result<Vec<SectionDetail>> {
    let query = query.clone();
    self.read(move |unit| unit.list_sections(&query)).await
  }

  async fn add_package(&self, input: NewPackage) -> Result<Package> {
    self
      .in_unit(move |unit| engine::catalog::add_package(unit, input))
      .await
  }

  // ── Advisory checks ───────────────────────────────────────────────────────

  async fn detect_conflicts(
    &self,
    section_ids: Vec<Uuid>,
  ) -> Result<Vec<ScheduleConflict>> {
    self
      .read(move |unit| engine::registration::conflicts_among(unit, &section_ids))
      .await
  }

  async fn max_load(&self, student_id: Uuid, term_id: Uuid) -> Result<LoadLimit> {
    self
      .read(move |unit| engine::registration::max_load(unit, student_id, term_id))
      .await
  }

  async fn seat_usage(&self, section_id: Uuid) -> Result<SeatUsage> {
    self
      .read(move |unit| engine::registration::seat_usage(unit, section_id))
      .await
  }

  // ── Registrations ─────────────────────────────────────────────────────────

  async fn create_registration(
    &self,
    student_id: Uuid,
    term_id: Uuid,
  ) -> Result<Registration> {
    self
      .in_unit(move |unit| {
        engine::registration::create_draft(unit, student_id, term_id, Utc::now())
      })
      .await
  }

  async fn create_from_package(
    &self,
    student_id: Uuid,
    package_id: Uuid,
  ) -> Result<Registration> {
    self
      .in_unit(move |unit| {
        engine::registration::create_from_package(
          unit,
          student_id,
          package_id,
          Utc::now(),
        )
      })
      .await
  }

  async fn get_registration(&self, id: Uuid) -> Result<Option<Registration>> {
    self.read(move |unit| unit.registration(id)).await
  }

  async fn list_registrations(
    &self,
    query: &RegistrationQuery,
  ) -> Result<Vec<Registration>> {
    query.validate().map_err(invalid)?;
    let query = query.clone();
    self.read(move |unit| unit.list_registrations(&query)).await
  }

  async fn replace_lines(
    &self,
    registration_id: Uuid,
    section_ids: Vec<Uuid>,
  ) -> Result<Registration> {
    self
      .in_unit(move |unit| {
        engine::registration::replace_lines(unit, registration_id, &section_ids)
      })
      .await
  }

  async fn submit_registration(&self, registration_id: Uuid) -> Result<Registration> {
    let result = self
      .in_unit(move |unit| {
        engine::registration::submit(unit, registration_id, Utc::now())
      })
      .await;

    match &result {
      Ok(registration) => tracing::info!(
        %registration_id,
        credits = registration.total_credits,
        "registration submitted"
      ),
      Err(Error::Core(krs_core::Error::Validation(
        ValidationError::QuotaExceeded(shortfalls),
      ))) => tracing::warn!(
        %registration_id,
        full_sections = shortfalls.len(),
        "submission refused: section quota exhausted"
      ),
      Err(_) => {}
    }
    result
  }

  async fn approve_registration(
    &self,
    registration_id: Uuid,
    approver_id: Uuid,
  ) -> Result<Registration> {
    let registration = self
      .in_unit(move |unit| {
        engine::registration::approve(unit, registration_id, approver_id, Utc::now())
      })
      .await?;
    tracing::info!(%registration_id, %approver_id, "registration approved");
    Ok(registration)
  }

  async fn reject_registration(
    &self,
    registration_id: Uuid,
    approver_id: Uuid,
    reason: String,
  ) -> Result<Registration> {
    let registration = self
      .in_unit(move |unit| {
        engine::registration::reject(
          unit,
          registration_id,
          approver_id,
          reason,
          Utc::now(),
        )
      })
      .await?;
    tracing::info!(%registration_id, %approver_id, "registration rejected");
    Ok(registration)
  }

  async fn delete_registration(&self, registration_id: Uuid) -> Result<()> {
    self
      .in_unit(move |unit| engine::registration::delete_draft(unit, registration_id))
      .await
  }

  // ── Grades ────────────────────────────────────────────────────────────────

  async fn save_grades(
    &self,
    section_id: Uuid,
    entries: Vec<ScoreEntry>,
  ) -> Result<Vec<GradeRecord>> {
    let _guard = self.locks.acquire(section_id).await;
    self
      .in_unit(move |unit| {
        engine::ledger::save_grades(unit, section_id, &entries, Utc::now())
      })
      .await
  }

  async fn list_grades(&self, section_id: Uuid) -> Result<Vec<GradeRecord>> {
    self
      .read(move |unit| {
        unit.section(section_id)?.ok_or(NotFound::Section(section_id))?;
        unit.grades_for_section(section_id)
      })
      .await
  }

  async fn finalize_section(&self, section_id: Uuid) -> Result<FinalizeOutcome> {
    let _guard = self.locks.acquire(section_id).await;
    let outcome = self
      .in_unit(move |unit| engine::ledger::finalize(unit, section_id, Utc::now()))
      .await?;
    tracing::info!(
      %section_id,
      grades = outcome.finalized,
      "section ledger finalized"
    );
    tracing::debug!(
      %section_id,
      term_id = %outcome.term_id,
      transcripts = outcome.transcripts.len(),
      "transcripts recomputed after finalize"
    );
    Ok(outcome)
  }

  async fn unlock_section(&self, section_id: Uuid) -> Result<usize> {
    let _guard = self.locks.acquire(section_id).await;
    let unlocked = self
      .in_unit(move |unit| engine::ledger::unlock(unit, section_id))
      .await?;
    tracing::info!(%section_id, grades = unlocked, "section ledger unlocked");
    Ok(unlocked)
  }

  // ── Transcripts ───────────────────────────────────────────────────────────

  async fn recompute_transcripts(
    &self,
    student_ids: Vec<Uuid>,
    term_id: Uuid,
  ) -> Result<Vec<Transcript>> {
    let transcripts = self
      .in_unit(move |unit| {
        engine::aggregate::recompute(unit, &student_ids, term_id, Utc::now())
      })
      .await?;
    tracing::debug!(%term_id, students = transcripts.len(), "transcripts recomputed");
    Ok(transcripts)
  }

  async fn list_transcripts(&self, student_id: Uuid) -> Result<Vec<Transcript>> {
    self
      .read(move |unit| {
        unit.student(student_id)?.ok_or(NotFound::Student(student_id))?;
        let mut terms = unit.terms()?;
        sort_chronologically(&mut terms);
        let position: HashMap<Uuid, usize> = terms
          .iter()
          .enumerate()
          .map(|(i, t)| (t.term_id, i))
          .collect();

        let mut transcripts = unit.transcripts_for(student_id)?;
        transcripts.sort_by_key(|t| position.get(&t.term_id).copied());
        Ok(transcripts)
      })
      .await
  }
}
