//! [`SqliteUnit`]: the [`UnitOfWork`] implementation over one open SQLite
//! transaction.
//!
//! A unit borrows the connection of a `rusqlite::Transaction`; the caller in
//! [`crate::store`] decides whether to commit.

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension as _, params, params_from_iter};
use uuid::Uuid;

use krs_core::{
  catalog::{Course, Package, Section, SectionDetail, Student},
  grade::GradeRecord,
  registration::{Registration, RegistrationStatus},
  store::{RegistrationQuery, SectionQuery},
  term::Term,
  transcript::{Transcript, WeightedGrade},
  unit::UnitOfWork,
};

use crate::encode::{
  RawCourse, RawGrade, RawLine, RawPackage, RawRegistration, RawSection,
  RawSectionDetail, RawStudent, RawTerm, RawTranscript, decode_uuid, encode_dt,
  encode_ids, encode_status, encode_uuid, encode_weekday,
};

type CoreResult<T> = krs_core::Result<T>;

/// Lift any backend error into the opaque store category of the core error.
trait IntoCore<T> {
  fn core(self) -> CoreResult<T>;
}

impl<T, E> IntoCore<T> for Result<T, E>
where
  E: std::error::Error + Send + Sync + 'static,
{
  fn core(self) -> CoreResult<T> { self.map_err(krs_core::Error::store) }
}

const SECTION_DETAIL_FROM: &str = "FROM sections s
  JOIN courses c ON c.course_id = s.course_id";

fn section_detail_select(filter: &str) -> String {
  format!(
    "SELECT {}, c.course_id, c.code, c.name, c.credits, c.nominal_term
     {SECTION_DETAIL_FROM}
     {filter}",
    RawSection::COLUMNS
  )
}

pub struct SqliteUnit<'c> {
  conn: &'c Connection,
}

impl<'c> SqliteUnit<'c> {
  pub fn new(conn: &'c Connection) -> Self { Self { conn } }

  // ─── Writes outside the engine ─────────────────────────────────────────────

  pub fn insert_student(&mut self, student: &Student) -> CoreResult<()> {
    self
      .conn
      .execute(
        "INSERT INTO students (student_id, student_number, name, program, cohort)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
          encode_uuid(student.student_id),
          student.student_number,
          student.name,
          student.program,
          student.cohort,
        ],
      )
      .core()?;
    Ok(())
  }

  pub fn insert_term(&mut self, term: &Term) -> CoreResult<()> {
    let amendment = term.amendment_window.as_ref();
    self
      .conn
      .execute(
        "INSERT INTO terms (
           term_id, academic_year, period, active,
           registration_opens_at, registration_closes_at,
           amendment_opens_at, amendment_closes_at
         ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
          encode_uuid(term.term_id),
          term.academic_year.start(),
          term.period.to_string(),
          term.active,
          encode_dt(term.registration_window.opens_at),
          encode_dt(term.registration_window.closes_at),
          amendment.map(|w| encode_dt(w.opens_at)),
          amendment.map(|w| encode_dt(w.closes_at)),
        ],
      )
      .core()?;
    Ok(())
  }

  pub fn insert_course(&mut self, course: &Course) -> CoreResult<()> {
    self
      .conn
      .execute(
        "INSERT INTO courses (course_id, code, name, credits, nominal_term)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
          encode_uuid(course.course_id),
          course.code,
          course.name,
          course.credits,
          course.nominal_term,
        ],
      )
      .core()?;
    Ok(())
  }

  /// Clear every active flag, then set the one on `term_id`. Returns `false`
  /// if no such term exists; the caller must then discard the unit.
  pub fn activate_term(&mut self, term_id: Uuid) -> CoreResult<bool> {
    self
      .conn
      .execute("UPDATE terms SET active = 0 WHERE active = 1", [])
      .core()?;
    let changed = self
      .conn
      .execute(
        "UPDATE terms SET active = 1 WHERE term_id = ?1",
        params![encode_uuid(term_id)],
      )
      .core()?;
    Ok(changed == 1)
  }

  pub fn active_term(&mut self) -> CoreResult<Option<Term>> {
    let raw = self
      .conn
      .query_row(
        &format!("SELECT {} FROM terms WHERE active = 1", RawTerm::COLUMNS),
        [],
        RawTerm::from_row,
      )
      .optional()
      .core()?;
    raw.map(RawTerm::into_term).transpose().core()
  }

  // ─── Filtered listings ─────────────────────────────────────────────────────

  pub fn list_sections(&mut self, query: &SectionQuery) -> CoreResult<Vec<SectionDetail>> {
    let sql = section_detail_select(
      "WHERE (?1 IS NULL OR s.term_id = ?1)
         AND (?2 IS NULL OR s.course_id = ?2)
         AND (?3 IS NULL OR s.instructor_id = ?3)
       ORDER BY c.code, s.label",
    );
    let mut stmt = self.conn.prepare(&sql).core()?;
    let raws = stmt
      .query_map(
        params![
          query.term_id.map(encode_uuid),
          query.course_id.map(encode_uuid),
          query.instructor_id.map(encode_uuid),
        ],
        RawSectionDetail::from_row,
      )
      .core()?
      .collect::<rusqlite::Result<Vec<_>>>()
      .core()?;
    raws
      .into_iter()
      .map(RawSectionDetail::into_detail)
      .collect::<crate::Result<_>>()
      .core()
  }

  pub fn list_registrations(
    &mut self,
    query: &RegistrationQuery,
  ) -> CoreResult<Vec<Registration>> {
    let sql = format!(
      "SELECT {} FROM registrations
       WHERE (?1 IS NULL OR student_id = ?1)
         AND (?2 IS NULL OR term_id = ?2)
         AND (?3 IS NULL OR status = ?3)
       ORDER BY created_at, registration_id
       LIMIT ?4 OFFSET ?5",
      RawRegistration::COLUMNS
    );
    let limit = query.page_size() as i64;
    let offset = query.offset.unwrap_or(0) as i64;

    let mut stmt = self.conn.prepare(&sql).core()?;
    let raws = stmt
      .query_map(
        params![
          query.student_id.map(encode_uuid),
          query.term_id.map(encode_uuid),
          query.status.map(encode_status),
          limit,
          offset,
        ],
        RawRegistration::from_row,
      )
      .core()?
      .collect::<rusqlite::Result<Vec<_>>>()
      .core()?;

    raws
      .into_iter()
      .map(|raw| self.with_lines(raw))
      .collect()
  }

  // ─── Helpers ───────────────────────────────────────────────────────────────

  fn lines_of(&self, registration_id: &str) -> CoreResult<Vec<RawLine>> {
    let mut stmt = self
      .conn
      .prepare(
        "SELECT line_id, registration_id, section_id
         FROM registration_lines
         WHERE registration_id = ?1
         ORDER BY rowid",
      )
      .core()?;
    let lines = stmt
      .query_map(params![registration_id], |row| {
        Ok(RawLine {
          line_id:         row.get(0)?,
          registration_id: row.get(1)?,
          section_id:      row.get(2)?,
        })
      })
      .core()?
      .collect::<rusqlite::Result<Vec<_>>>()
      .core()?;
    Ok(lines)
  }

  fn with_lines(&self, raw: RawRegistration) -> CoreResult<Registration> {
    let lines = self.lines_of(&raw.registration_id)?;
    raw.into_registration(lines).core()
  }

  fn insert_lines(&self, registration: &Registration) -> CoreResult<()> {
    let mut stmt = self
      .conn
      .prepare(
        "INSERT INTO registration_lines (line_id, registration_id, section_id)
         VALUES (?1, ?2, ?3)",
      )
      .core()?;
    for line in &registration.lines {
      stmt
        .execute(params![
          encode_uuid(line.line_id),
          encode_uuid(line.registration_id),
          encode_uuid(line.section_id),
        ])
        .core()?;
    }
    Ok(())
  }

  fn one_registration(
    &self,
    filter: &str,
    args: impl rusqlite::Params,
  ) -> CoreResult<Option<Registration>> {
    let raw = self
      .conn
      .query_row(
        &format!("SELECT {} FROM registrations {filter}", RawRegistration::COLUMNS),
        args,
        RawRegistration::from_row,
      )
      .optional()
      .core()?;
    raw.map(|raw| self.with_lines(raw)).transpose()
  }
}

// ─── UnitOfWork impl ─────────────────────────────────────────────────────────

impl UnitOfWork for SqliteUnit<'_> {
  // ── Catalog reads ─────────────────────────────────────────────────────────

  fn student(&mut self, id: Uuid) -> CoreResult<Option<Student>> {
    let raw = self
      .conn
      .query_row(
        &format!("SELECT {} FROM students WHERE student_id = ?1", RawStudent::COLUMNS),
        params![encode_uuid(id)],
        RawStudent::from_row,
      )
      .optional()
      .core()?;
    raw.map(RawStudent::into_student).transpose().core()
  }

  fn term(&mut self, id: Uuid) -> CoreResult<Option<Term>> {
    let raw = self
      .conn
      .query_row(
        &format!("SELECT {} FROM terms WHERE term_id = ?1", RawTerm::COLUMNS),
        params![encode_uuid(id)],
        RawTerm::from_row,
      )
      .optional()
      .core()?;
    raw.map(RawTerm::into_term).transpose().core()
  }

  fn terms(&mut self) -> CoreResult<Vec<Term>> {
    let mut stmt = self
      .conn
      .prepare(&format!("SELECT {} FROM terms", RawTerm::COLUMNS))
      .core()?;
    let raws = stmt
      .query_map([], RawTerm::from_row)
      .core()?
      .collect::<rusqlite::Result<Vec<_>>>()
      .core()?;
    raws
      .into_iter()
      .map(RawTerm::into_term)
      .collect::<crate::Result<_>>()
      .core()
  }

  fn course(&mut self, id: Uuid) -> CoreResult<Option<Course>> {
    let raw = self
      .conn
      .query_row(
        &format!("SELECT {} FROM courses WHERE course_id = ?1", RawCourse::COLUMNS),
        params![encode_uuid(id)],
        |row| RawCourse::from_row_at(row, 0),
      )
      .optional()
      .core()?;
    raw.map(RawCourse::into_course).transpose().core()
  }

  fn section(&mut self, id: Uuid) -> CoreResult<Option<SectionDetail>> {
    let raw = self
      .conn
      .query_row(
        &section_detail_select("WHERE s.section_id = ?1"),
        params![encode_uuid(id)],
        RawSectionDetail::from_row,
      )
      .optional()
      .core()?;
    raw.map(RawSectionDetail::into_detail).transpose().core()
  }

  fn sections_in_term(&mut self, term_id: Uuid) -> CoreResult<Vec<Section>> {
    let mut stmt = self
      .conn
      .prepare(&format!(
        "SELECT {} FROM sections s WHERE s.term_id = ?1",
        RawSection::COLUMNS
      ))
      .core()?;
    let raws = stmt
      .query_map(params![encode_uuid(term_id)], RawSection::from_row)
      .core()?
      .collect::<rusqlite::Result<Vec<_>>>()
      .core()?;
    raws
      .into_iter()
      .map(RawSection::into_section)
      .collect::<crate::Result<_>>()
      .core()
  }

  fn package(&mut self, id: Uuid) -> CoreResult<Option<Package>> {
    let raw = self
      .conn
      .query_row(
        "SELECT package_id, name, program, cohort, term_id, section_ids
         FROM packages WHERE package_id = ?1",
        params![encode_uuid(id)],
        |row| {
          Ok(RawPackage {
            package_id:  row.get(0)?,
            name:        row.get(1)?,
            program:     row.get(2)?,
            cohort:      row.get(3)?,
            term_id:     row.get(4)?,
            section_ids: row.get(5)?,
          })
        },
      )
      .optional()
      .core()?;
    raw.map(RawPackage::into_package).transpose().core()
  }

  fn count_lines(
    &mut self,
    section_id: Uuid,
    statuses: &[RegistrationStatus],
  ) -> CoreResult<u32> {
    if statuses.is_empty() {
      return Ok(0);
    }
    let placeholders = (0..statuses.len())
      .map(|i| format!("?{}", i + 2))
      .collect::<Vec<_>>()
      .join(", ");
    let sql = format!(
      "SELECT COUNT(*)
       FROM registration_lines l
       JOIN registrations r ON r.registration_id = l.registration_id
       WHERE l.section_id = ?1 AND r.status IN ({placeholders})"
    );

    let mut values = vec![encode_uuid(section_id)];
    values.extend(statuses.iter().copied().map(encode_status));

    self
      .conn
      .query_row(&sql, params_from_iter(values), |row| row.get::<_, u32>(0))
      .core()
  }

  fn approved_students(&mut self, section_id: Uuid) -> CoreResult<Vec<Uuid>> {
    let mut stmt = self
      .conn
      .prepare(
        "SELECT r.student_id
         FROM registration_lines l
         JOIN registrations r ON r.registration_id = l.registration_id
         JOIN sections s      ON s.section_id      = l.section_id
         WHERE l.section_id = ?1
           AND r.status     = ?2
           AND r.term_id    = s.term_id
         ORDER BY r.student_id",
      )
      .core()?;
    let ids = stmt
      .query_map(
        params![
          encode_uuid(section_id),
          encode_status(RegistrationStatus::Approved),
        ],
        |row| row.get::<_, String>(0),
      )
      .core()?
      .collect::<rusqlite::Result<Vec<_>>>()
      .core()?;
    ids
      .iter()
      .map(|s| decode_uuid(s))
      .collect::<crate::Result<_>>()
      .core()
  }

  // ── Catalog writes ────────────────────────────────────────────────────────

  fn insert_section(&mut self, section: &Section) -> CoreResult<()> {
    self
      .conn
      .execute(
        "INSERT INTO sections (
           section_id, term_id, course_id, instructor_id, room, label,
           day, start_minute, end_minute, seat_cap
         ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        params![
          encode_uuid(section.section_id),
          encode_uuid(section.term_id),
          encode_uuid(section.course_id),
          encode_uuid(section.instructor_id),
          section.room,
          section.label,
          encode_weekday(section.slot.day),
          section.slot.start_minute,
          section.slot.end_minute,
          section.seat_cap,
        ],
      )
      .core()?;
    Ok(())
  }

  fn insert_package(&mut self, package: &Package) -> CoreResult<()> {
    let section_ids = encode_ids(&package.section_ids).core()?;
    self
      .conn
      .execute(
        "INSERT INTO packages (package_id, name, program, cohort, term_id, section_ids)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
          encode_uuid(package.package_id),
          package.name,
          package.program,
          package.cohort,
          encode_uuid(package.term_id),
          section_ids,
        ],
      )
      .core()?;
    Ok(())
  }

  // ── Registrations ─────────────────────────────────────────────────────────

  fn registration(&mut self, id: Uuid) -> CoreResult<Option<Registration>> {
    self.one_registration("WHERE registration_id = ?1", params![encode_uuid(id)])
  }

  fn registration_for(
    &mut self,
    student_id: Uuid,
    term_id: Uuid,
  ) -> CoreResult<Option<Registration>> {
    self.one_registration(
      "WHERE student_id = ?1 AND term_id = ?2 AND status <> ?3",
      params![
        encode_uuid(student_id),
        encode_uuid(term_id),
        encode_status(RegistrationStatus::Rejected),
      ],
    )
  }

  fn insert_registration(&mut self, registration: &Registration) -> CoreResult<()> {
    self
      .conn
      .execute(
        "INSERT INTO registrations (
           registration_id, student_id, term_id, status, total_credits,
           package_id, created_at, submitted_at, decided_at, decided_by,
           rejection_reason
         ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        params![
          encode_uuid(registration.registration_id),
          encode_uuid(registration.student_id),
          encode_uuid(registration.term_id),
          encode_status(registration.status),
          registration.total_credits,
          registration.package_id.map(encode_uuid),
          encode_dt(registration.created_at),
          registration.submitted_at.map(encode_dt),
          registration.decided_at.map(encode_dt),
          registration.decided_by.map(encode_uuid),
          registration.rejection_reason,
        ],
      )
      .core()?;
    self.insert_lines(registration)
  }

  fn update_registration(&mut self, registration: &Registration) -> CoreResult<()> {
    self
      .conn
      .execute(
        "UPDATE registrations SET
           status           = ?2,
           total_credits    = ?3,
           package_id       = ?4,
           submitted_at     = ?5,
           decided_at       = ?6,
           decided_by       = ?7,
           rejection_reason = ?8
         WHERE registration_id = ?1",
        params![
          encode_uuid(registration.registration_id),
          encode_status(registration.status),
          registration.total_credits,
          registration.package_id.map(encode_uuid),
          registration.submitted_at.map(encode_dt),
          registration.decided_at.map(encode_dt),
          registration.decided_by.map(encode_uuid),
          registration.rejection_reason,
        ],
      )
      .core()?;
    Ok(())
  }

  fn replace_lines(&mut self, registration: &Registration) -> CoreResult<()> {
    self
      .conn
      .execute(
        "DELETE FROM registration_lines WHERE registration_id = ?1",
        params![encode_uuid(registration.registration_id)],
      )
      .core()?;
    self.insert_lines(registration)
  }

  fn delete_registration(&mut self, id: Uuid) -> CoreResult<()> {
    let id = encode_uuid(id);
    self
      .conn
      .execute(
        "DELETE FROM registration_lines WHERE registration_id = ?1",
        params![id],
      )
      .core()?;
    self
      .conn
      .execute("DELETE FROM registrations WHERE registration_id = ?1", params![id])
      .core()?;
    Ok(())
  }

  // ── Grades ────────────────────────────────────────────────────────────────

  fn grades_for_section(&mut self, section_id: Uuid) -> CoreResult<Vec<GradeRecord>> {
    let mut stmt = self
      .conn
      .prepare(&format!(
        "SELECT {} FROM grades WHERE section_id = ?1 ORDER BY rowid",
        RawGrade::COLUMNS
      ))
      .core()?;
    let raws = stmt
      .query_map(params![encode_uuid(section_id)], RawGrade::from_row)
      .core()?
      .collect::<rusqlite::Result<Vec<_>>>()
      .core()?;
    raws
      .into_iter()
      .map(RawGrade::into_grade)
      .collect::<crate::Result<_>>()
      .core()
  }

  fn upsert_grade(&mut self, grade: &GradeRecord) -> CoreResult<()> {
    self
      .conn
      .execute(
        "INSERT INTO grades (
           grade_id, student_id, section_id, score, letter, points,
           finalized, recorded_at, finalized_at
         ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
         ON CONFLICT (student_id, section_id) DO UPDATE SET
           score        = excluded.score,
           letter       = excluded.letter,
           points       = excluded.points,
           finalized    = excluded.finalized,
           recorded_at  = excluded.recorded_at,
           finalized_at = excluded.finalized_at",
        params![
          encode_uuid(grade.grade_id),
          encode_uuid(grade.student_id),
          encode_uuid(grade.section_id),
          grade.score,
          grade.letter.to_string(),
          grade.points,
          grade.finalized,
          encode_dt(grade.recorded_at),
          grade.finalized_at.map(encode_dt),
        ],
      )
      .core()?;
    Ok(())
  }

  fn set_finalized(
    &mut self,
    section_id: Uuid,
    finalized_at: Option<DateTime<Utc>>,
  ) -> CoreResult<usize> {
    let section_id = encode_uuid(section_id);
    let changed = match finalized_at {
      Some(at) => self.conn.execute(
        "UPDATE grades SET finalized = 1, finalized_at = ?2
         WHERE section_id = ?1 AND finalized = 0",
        params![section_id, encode_dt(at)],
      ),
      None => self.conn.execute(
        "UPDATE grades SET finalized = 0, finalized_at = NULL
         WHERE section_id = ?1 AND finalized = 1",
        params![section_id],
      ),
    };
    changed.core()
  }

  fn finalized_grades(
    &mut self,
    student_id: Uuid,
    term_ids: &[Uuid],
  ) -> CoreResult<Vec<WeightedGrade>> {
    let mut stmt = self
      .conn
      .prepare(
        "SELECT g.section_id, s.term_id, c.credits, g.points
         FROM grades g
         JOIN sections s ON s.section_id = g.section_id
         JOIN courses  c ON c.course_id  = s.course_id
         WHERE g.student_id = ?1 AND g.finalized = 1",
      )
      .core()?;
    let rows = stmt
      .query_map(params![encode_uuid(student_id)], |row| {
        Ok((
          row.get::<_, String>(0)?,
          row.get::<_, String>(1)?,
          row.get::<_, u32>(2)?,
          row.get::<_, f64>(3)?,
        ))
      })
      .core()?
      .collect::<rusqlite::Result<Vec<_>>>()
      .core()?;

    let mut grades = Vec::with_capacity(rows.len());
    for (section_id, term_id, credits, points) in rows {
      let term_id = decode_uuid(&term_id).core()?;
      if !term_ids.contains(&term_id) {
        continue;
      }
      grades.push(WeightedGrade {
        section_id: decode_uuid(&section_id).core()?,
        term_id,
        credits,
        points,
      });
    }
    Ok(grades)
  }

  // ── Transcripts ───────────────────────────────────────────────────────────

  fn transcripts_for(&mut self, student_id: Uuid) -> CoreResult<Vec<Transcript>> {
    let mut stmt = self
      .conn
      .prepare(&format!(
        "SELECT {} FROM transcripts WHERE student_id = ?1",
        RawTranscript::COLUMNS
      ))
      .core()?;
    let raws = stmt
      .query_map(params![encode_uuid(student_id)], RawTranscript::from_row)
      .core()?
      .collect::<rusqlite::Result<Vec<_>>>()
      .core()?;
    raws
      .into_iter()
      .map(RawTranscript::into_transcript)
      .collect::<crate::Result<_>>()
      .core()
  }

  fn upsert_transcript(&mut self, transcript: &Transcript) -> CoreResult<Transcript> {
    let kept_id: String = self
      .conn
      .query_row(
        "INSERT INTO transcripts (
           transcript_id, student_id, term_id, semester_gpa, cumulative_gpa,
           semester_credits, cumulative_credits, computed_at
         ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
         ON CONFLICT (student_id, term_id) DO UPDATE SET
           semester_gpa       = excluded.semester_gpa,
           cumulative_gpa     = excluded.cumulative_gpa,
           semester_credits   = excluded.semester_credits,
           cumulative_credits = excluded.cumulative_credits,
           computed_at        = excluded.computed_at
         RETURNING transcript_id",
        params![
          encode_uuid(transcript.transcript_id),
          encode_uuid(transcript.student_id),
          encode_uuid(transcript.term_id),
          transcript.semester_gpa,
          transcript.cumulative_gpa,
          transcript.semester_credits,
          transcript.cumulative_credits,
          encode_dt(transcript.computed_at),
        ],
        |row| row.get(0),
      )
      .core()?;

    Ok(Transcript {
      transcript_id: decode_uuid(&kept_id).core()?,
      ..transcript.clone()
    })
  }
}
