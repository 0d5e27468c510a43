//! Encoding and decoding helpers between Rust domain types and the plain
//! representations stored in SQLite columns.
//!
//! Timestamps are RFC 3339 strings, UUIDs hyphenated lowercase strings, and
//! enums their `strum` names. Package section lists are compact JSON.

use chrono::{DateTime, Utc, Weekday};
use krs_core::{
  catalog::{Course, Package, Section, SectionDetail, Student, TimeSlot},
  grade::{GradeRecord, LetterGrade},
  registration::{Registration, RegistrationLine, RegistrationStatus},
  term::{AcademicYear, Period, Term, Window},
  transcript::Transcript,
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Scalars ─────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::Decode(e.to_string()))
}

fn decode_opt_dt(s: Option<&str>) -> Result<Option<DateTime<Utc>>> {
  s.map(decode_dt).transpose()
}

fn decode_opt_uuid(s: Option<&str>) -> Result<Option<Uuid>> {
  s.map(decode_uuid).transpose()
}

pub fn encode_weekday(day: Weekday) -> u32 { day.num_days_from_monday() }

pub fn decode_weekday(n: u32) -> Result<Weekday> {
  Ok(match n {
    0 => Weekday::Mon,
    1 => Weekday::Tue,
    2 => Weekday::Wed,
    3 => Weekday::Thu,
    4 => Weekday::Fri,
    5 => Weekday::Sat,
    6 => Weekday::Sun,
    other => return Err(Error::Decode(format!("unknown weekday: {other}"))),
  })
}

pub fn encode_status(s: RegistrationStatus) -> String { s.to_string() }

pub fn decode_status(s: &str) -> Result<RegistrationStatus> {
  s.parse()
    .map_err(|_| Error::Decode(format!("unknown registration status: {s:?}")))
}

fn decode_period(s: &str) -> Result<Period> {
  s.parse()
    .map_err(|_| Error::Decode(format!("unknown period: {s:?}")))
}

fn decode_letter(s: &str) -> Result<LetterGrade> {
  s.parse()
    .map_err(|_| Error::Decode(format!("unknown letter grade: {s:?}")))
}

pub fn encode_ids(ids: &[Uuid]) -> Result<String> {
  Ok(serde_json::to_string(ids)?)
}

pub fn decode_ids(s: &str) -> Result<Vec<Uuid>> { Ok(serde_json::from_str(s)?) }

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw values read directly from a `students` row.
pub struct RawStudent {
  pub student_id:     String,
  pub student_number: String,
  pub name:           String,
  pub program:        String,
  pub cohort:         u16,
}

impl RawStudent {
  pub const COLUMNS: &'static str = "student_id, student_number, name, program, cohort";

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      student_id:     row.get(0)?,
      student_number: row.get(1)?,
      name:           row.get(2)?,
      program:        row.get(3)?,
      cohort:         row.get(4)?,
    })
  }

  pub fn into_student(self) -> Result<Student> {
    Ok(Student {
      student_id:     decode_uuid(&self.student_id)?,
      student_number: self.student_number,
      name:           self.name,
      program:        self.program,
      cohort:         self.cohort,
    })
  }
}

/// Raw values read directly from a `terms` row.
pub struct RawTerm {
  pub term_id:                String,
  pub academic_year:          u16,
  pub period:                 String,
  pub active:                 bool,
  pub registration_opens_at:  String,
  pub registration_closes_at: String,
  pub amendment_opens_at:     Option<String>,
  pub amendment_closes_at:    Option<String>,
}

impl RawTerm {
  pub const COLUMNS: &'static str = "term_id, academic_year, period, active,
    registration_opens_at, registration_closes_at,
    amendment_opens_at, amendment_closes_at";

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      term_id:                row.get(0)?,
      academic_year:          row.get(1)?,
      period:                 row.get(2)?,
      active:                 row.get(3)?,
      registration_opens_at:  row.get(4)?,
      registration_closes_at: row.get(5)?,
      amendment_opens_at:     row.get(6)?,
      amendment_closes_at:    row.get(7)?,
    })
  }

  pub fn into_term(self) -> Result<Term> {
    let amendment_window = match (self.amendment_opens_at, self.amendment_closes_at)
    {
      (Some(opens), Some(closes)) => Some(Window {
        opens_at:  decode_dt(&opens)?,
        closes_at: decode_dt(&closes)?,
      }),
      _ => None,
    };
    Ok(Term {
      term_id: decode_uuid(&self.term_id)?,
      academic_year: AcademicYear::new(self.academic_year)
        .map_err(|e| Error::Decode(e.to_string()))?,
      period: decode_period(&self.period)?,
      active: self.active,
      registration_window: Window {
        opens_at:  decode_dt(&self.registration_opens_at)?,
        closes_at: decode_dt(&self.registration_closes_at)?,
      },
      amendment_window,
    })
  }
}

/// Raw values read directly from a `courses` row.
pub struct RawCourse {
  pub course_id:    String,
  pub code:         String,
  pub name:         String,
  pub credits:      u32,
  pub nominal_term: u8,
}

impl RawCourse {
  pub const COLUMNS: &'static str = "course_id, code, name, credits, nominal_term";

  /// Read the five course columns starting at `offset`.
  pub fn from_row_at(row: &rusqlite::Row<'_>, offset: usize) -> rusqlite::Result<Self> {
    Ok(Self {
      course_id:    row.get(offset)?,
      code:         row.get(offset + 1)?,
      name:         row.get(offset + 2)?,
      credits:      row.get(offset + 3)?,
      nominal_term: row.get(offset + 4)?,
    })
  }

  pub fn into_course(self) -> Result<Course> {
    Ok(Course {
      course_id:    decode_uuid(&self.course_id)?,
      code:         self.code,
      name:         self.name,
      credits:      self.credits,
      nominal_term: self.nominal_term,
    })
  }
}

/// Raw values read directly from a `sections` row.
pub struct RawSection {
  pub section_id:    String,
  pub term_id:       String,
  pub course_id:     String,
  pub instructor_id: String,
  pub room:          String,
  pub label:         String,
  pub day:           u32,
  pub start_minute:  u16,
  pub end_minute:    u16,
  pub seat_cap:      u32,
}

impl RawSection {
  /// Section columns, qualified with the `s` alias.
  pub const COLUMNS: &'static str = "s.section_id, s.term_id, s.course_id,
    s.instructor_id, s.room, s.label, s.day, s.start_minute, s.end_minute,
    s.seat_cap";
  pub const WIDTH: usize = 10;

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      section_id:    row.get(0)?,
      term_id:       row.get(1)?,
      course_id:     row.get(2)?,
      instructor_id: row.get(3)?,
      room:          row.get(4)?,
      label:         row.get(5)?,
      day:           row.get(6)?,
      start_minute:  row.get(7)?,
      end_minute:    row.get(8)?,
      seat_cap:      row.get(9)?,
    })
  }

  pub fn into_section(self) -> Result<Section> {
    Ok(Section {
      section_id:    decode_uuid(&self.section_id)?,
      term_id:       decode_uuid(&self.term_id)?,
      course_id:     decode_uuid(&self.course_id)?,
      instructor_id: decode_uuid(&self.instructor_id)?,
      room:          self.room,
      label:         self.label,
      slot:          TimeSlot {
        day:          decode_weekday(self.day)?,
        start_minute: self.start_minute,
        end_minute:   self.end_minute,
      },
      seat_cap:      self.seat_cap,
    })
  }
}

/// A `sections` row joined with its course.
pub struct RawSectionDetail {
  pub section: RawSection,
  pub course:  RawCourse,
}

impl RawSectionDetail {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      section: RawSection::from_row(row)?,
      course:  RawCourse::from_row_at(row, RawSection::WIDTH)?,
    })
  }

  pub fn into_detail(self) -> Result<SectionDetail> {
    Ok(SectionDetail {
      section: self.section.into_section()?,
      course:  self.course.into_course()?,
    })
  }
}

/// Raw values read directly from a `packages` row.
pub struct RawPackage {
  pub package_id:  String,
  pub name:        String,
  pub program:     String,
  pub cohort:      u16,
  pub term_id:     String,
  pub section_ids: String,
}

impl RawPackage {
  pub fn into_package(self) -> Result<Package> {
    Ok(Package {
      package_id:  decode_uuid(&self.package_id)?,
      name:        self.name,
      program:     self.program,
      cohort:      self.cohort,
      term_id:     decode_uuid(&self.term_id)?,
      section_ids: decode_ids(&self.section_ids)?,
    })
  }
}

/// Raw values read directly from a `registrations` row. Lines are loaded
/// separately.
pub struct RawRegistration {
  pub registration_id:  String,
  pub student_id:       String,
  pub term_id:          String,
  pub status:           String,
  pub total_credits:    u32,
  pub package_id:       Option<String>,
  pub created_at:       String,
  pub submitted_at:     Option<String>,
  pub decided_at:       Option<String>,
  pub decided_by:       Option<String>,
  pub rejection_reason: Option<String>,
}

impl RawRegistration {
  pub const COLUMNS: &'static str = "registration_id, student_id, term_id,
    status, total_credits, package_id, created_at, submitted_at, decided_at,
    decided_by, rejection_reason";

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      registration_id:  row.get(0)?,
      student_id:       row.get(1)?,
      term_id:          row.get(2)?,
      status:           row.get(3)?,
      total_credits:    row.get(4)?,
      package_id:       row.get(5)?,
      created_at:       row.get(6)?,
      submitted_at:     row.get(7)?,
      decided_at:       row.get(8)?,
      decided_by:       row.get(9)?,
      rejection_reason: row.get(10)?,
    })
  }

  pub fn into_registration(self, lines: Vec<RawLine>) -> Result<Registration> {
    Ok(Registration {
      registration_id:  decode_uuid(&self.registration_id)?,
      student_id:       decode_uuid(&self.student_id)?,
      term_id:          decode_uuid(&self.term_id)?,
      status:           decode_status(&self.status)?,
      total_credits:    self.total_credits,
      lines:            lines
        .into_iter()
        .map(RawLine::into_line)
        .collect::<Result<_>>()?,
      package_id:       decode_opt_uuid(self.package_id.as_deref())?,
      created_at:       decode_dt(&self.created_at)?,
      submitted_at:     decode_opt_dt(self.submitted_at.as_deref())?,
      decided_at:       decode_opt_dt(self.decided_at.as_deref())?,
      decided_by:       decode_opt_uuid(self.decided_by.as_deref())?,
      rejection_reason: self.rejection_reason,
    })
  }
}

/// Raw values read directly from a `registration_lines` row.
pub struct RawLine {
  pub line_id:         String,
  pub registration_id: String,
  pub section_id:      String,
}

impl RawLine {
  pub fn into_line(self) -> Result<RegistrationLine> {
    Ok(RegistrationLine {
      line_id:         decode_uuid(&self.line_id)?,
      registration_id: decode_uuid(&self.registration_id)?,
      section_id:      decode_uuid(&self.section_id)?,
    })
  }
}

/// Raw values read directly from a `grades` row.
pub struct RawGrade {
  pub grade_id:     String,
  pub student_id:   String,
  pub section_id:   String,
  pub score:        f64,
  pub letter:       String,
  pub points:       f64,
  pub finalized:    bool,
  pub recorded_at:  String,
  pub finalized_at: Option<String>,
}

impl RawGrade {
  pub const COLUMNS: &'static str = "grade_id, student_id, section_id, score,
    letter, points, finalized, recorded_at, finalized_at";

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      grade_id:     row.get(0)?,
      student_id:   row.get(1)?,
      section_id:   row.get(2)?,
      score:        row.get(3)?,
      letter:       row.get(4)?,
      points:       row.get(5)?,
      finalized:    row.get(6)?,
      recorded_at:  row.get(7)?,
      finalized_at: row.get(8)?,
    })
  }

  pub fn into_grade(self) -> Result<GradeRecord> {
    Ok(GradeRecord {
      grade_id:     decode_uuid(&self.grade_id)?,
      student_id:   decode_uuid(&self.student_id)?,
      section_id:   decode_uuid(&self.section_id)?,
      score:        self.score,
      letter:       decode_letter(&self.letter)?,
      points:       self.points,
      finalized:    self.finalized,
      recorded_at:  decode_dt(&self.recorded_at)?,
      finalized_at: decode_opt_dt(self.finalized_at.as_deref())?,
    })
  }
}

/// Raw values read directly from a `transcripts` row.
pub struct RawTranscript {
  pub transcript_id:      String,
  pub student_id:         String,
  pub term_id:            String,
  pub semester_gpa:       f64,
  pub cumulative_gpa:     f64,
  pub semester_credits:   u32,
  pub cumulative_credits: u32,
  pub computed_at:        String,
}

impl RawTranscript {
  pub const COLUMNS: &'static str = "transcript_id, student_id, term_id,
    semester_gpa, cumulative_gpa, semester_credits, cumulative_credits,
    computed_at";

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      transcript_id:      row.get(0)?,
      student_id:         row.get(1)?,
      term_id:            row.get(2)?,
      semester_gpa:       row.get(3)?,
      cumulative_gpa:     row.get(4)?,
      semester_credits:   row.get(5)?,
      cumulative_credits: row.get(6)?,
      computed_at:        row.get(7)?,
    })
  }

  pub fn into_transcript(self) -> Result<Transcript> {
    Ok(Transcript {
      transcript_id:      decode_uuid(&self.transcript_id)?,
      student_id:         decode_uuid(&self.student_id)?,
      term_id:            decode_uuid(&self.term_id)?,
      semester_gpa:       self.semester_gpa,
      cumulative_gpa:     self.cumulative_gpa,
      semester_credits:   self.semester_credits,
      cumulative_credits: self.cumulative_credits,
      computed_at:        decode_dt(&self.computed_at)?,
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn weekdays_survive_the_column() {
    for day in [Weekday::Mon, Weekday::Wed, Weekday::Sun] {
      assert_eq!(decode_weekday(encode_weekday(day)).unwrap(), day);
    }
    assert!(decode_weekday(7).is_err());
  }

  #[test]
  fn statuses_use_snake_case() {
    assert_eq!(encode_status(RegistrationStatus::Submitted), "submitted");
    assert_eq!(decode_status("approved").unwrap(), RegistrationStatus::Approved);
    assert!(decode_status("pending").is_err());
  }
}
