//! Catalog entities: students, courses, sections and registration packages.
//!
//! The catalog is read-only from the engine's point of view. Sections are
//! referenced by id everywhere else and never copied into other records.

use std::fmt;

use chrono::Weekday;
use serde::{Deserialize, Serialize};
use strum::Display;
use uuid::Uuid;

use crate::error::ValidationError;

// ─── Students ────────────────────────────────────────────────────────────────

/// A student as supplied by the identity collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Student {
  pub student_id:     Uuid,
  /// Institutional student number (NIM).
  pub student_number: String,
  pub name:           String,
  pub program:        String,
  /// Year of intake.
  pub cohort:         u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewStudent {
  pub student_number: String,
  pub name:           String,
  pub program:        String,
  pub cohort:         u16,
}

// ─── Courses ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Course {
  pub course_id:    Uuid,
  pub code:         String,
  pub name:         String,
  /// Credit weight (SKS); always positive.
  pub credits:      u32,
  /// Nominal term in the curriculum. Informational only.
  pub nominal_term: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewCourse {
  pub code:         String,
  pub name:         String,
  pub credits:      u32,
  pub nominal_term: u8,
}

impl NewCourse {
  pub fn validate(&self) -> Result<(), ValidationError> {
    if self.credits == 0 {
      return Err(ValidationError::InvalidCredits);
    }
    Ok(())
  }
}

// ─── Time slots ──────────────────────────────────────────────────────────────

/// A weekly meeting: a day and a half-open `[start, end)` interval in minutes
/// after midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSlot {
  pub day:          Weekday,
  pub start_minute: u16,
  pub end_minute:   u16,
}

impl TimeSlot {
  pub fn new(
    day: Weekday,
    start_minute: u16,
    end_minute: u16,
  ) -> Result<Self, ValidationError> {
    if start_minute >= end_minute || end_minute > 24 * 60 {
      return Err(ValidationError::InvalidTimeSlot {
        start: start_minute,
        end:   end_minute,
      });
    }
    Ok(Self { day, start_minute, end_minute })
  }

  /// Build a slot from `(hour, minute)` pairs. Out-of-range parts saturate
  /// and are then rejected by [`TimeSlot::new`].
  pub fn from_hm(
    day: Weekday,
    start: (u16, u16),
    end: (u16, u16),
  ) -> Result<Self, ValidationError> {
    let minutes = |(h, m): (u16, u16)| h.saturating_mul(60).saturating_add(m);
    Self::new(day, minutes(start), minutes(end))
  }

  /// The shared `[start, end)` window if both slots meet on the same day and
  /// their intervals intersect. Touching endpoints do not overlap.
  pub fn overlap(&self, other: &TimeSlot) -> Option<(u16, u16)> {
    if self.day != other.day {
      return None;
    }
    if self.start_minute < other.end_minute && other.start_minute < self.end_minute
    {
      Some((
        self.start_minute.max(other.start_minute),
        self.end_minute.min(other.end_minute),
      ))
    } else {
      None
    }
  }
}

impl fmt::Display for TimeSlot {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(
      f,
      "{} {}-{}",
      self.day,
      ClockTime(self.start_minute),
      ClockTime(self.end_minute)
    )
  }
}

/// Minutes after midnight rendered as `HH:MM`.
pub struct ClockTime(pub u16);

impl fmt::Display for ClockTime {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{:02}:{:02}", self.0 / 60, self.0 % 60)
  }
}

// ─── Sections ────────────────────────────────────────────────────────────────

/// A scheduled offering of a course in one term.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
  pub section_id:    Uuid,
  pub term_id:       Uuid,
  pub course_id:     Uuid,
  pub instructor_id: Uuid,
  pub room:          String,
  /// Class label within the course, e.g. "A".
  pub label:         String,
  pub slot:          TimeSlot,
  pub seat_cap:      u32,
}

/// A section with its course embedded, as returned by catalog lookups.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionDetail {
  pub section: Section,
  pub course:  Course,
}

impl SectionDetail {
  pub fn credits(&self) -> u32 { self.course.credits }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewSection {
  pub term_id:       Uuid,
  pub course_id:     Uuid,
  pub instructor_id: Uuid,
  pub room:          String,
  pub label:         String,
  pub slot:          TimeSlot,
  pub seat_cap:      u32,
}

impl NewSection {
  pub fn validate(&self) -> Result<(), ValidationError> {
    TimeSlot::new(self.slot.day, self.slot.start_minute, self.slot.end_minute)?;
    if self.seat_cap == 0 {
      return Err(ValidationError::InvalidSeatCap);
    }
    Ok(())
  }
}

/// The shared resource behind a section-creation clash.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ClashResource {
  Room,
  Instructor,
}

// ─── Packages ────────────────────────────────────────────────────────────────

/// A named, pre-built bundle of sections for a program cohort in one term.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Package {
  pub package_id:  Uuid,
  pub name:        String,
  pub program:     String,
  pub cohort:      u16,
  pub term_id:     Uuid,
  pub section_ids: Vec<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPackage {
  pub name:        String,
  pub program:     String,
  pub cohort:      u16,
  pub term_id:     Uuid,
  pub section_ids: Vec<Uuid>,
}
