//! Schedule conflict detection over already-fetched sections.

use std::fmt;

use chrono::Weekday;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::catalog::{ClashResource, ClockTime, Section};

/// Two sections that meet on the same day with intersecting time ranges.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleConflict {
  pub first_section_id:  Uuid,
  pub second_section_id: Uuid,
  pub day:               Weekday,
  /// Start of the overlapping window, minutes after midnight.
  pub start_minute:      u16,
  pub end_minute:        u16,
}

impl fmt::Display for ScheduleConflict {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(
      f,
      "sections {} and {} overlap on {} {}-{}",
      self.first_section_id,
      self.second_section_id,
      self.day,
      ClockTime(self.start_minute),
      ClockTime(self.end_minute)
    )
  }
}

fn conflict_between(a: &Section, b: &Section) -> Option<ScheduleConflict> {
  a.slot
    .overlap(&b.slot)
    .map(|(start_minute, end_minute)| ScheduleConflict {
      first_section_id: a.section_id,
      second_section_id: b.section_id,
      day: a.slot.day,
      start_minute,
      end_minute,
    })
}

/// Every overlapping pair among `sections`, in input order. The input is a
/// single student's load, so the quadratic scan stays small.
pub fn detect_conflicts(sections: &[Section]) -> Vec<ScheduleConflict> {
  let mut conflicts = Vec::new();
  for (i, a) in sections.iter().enumerate() {
    for b in &sections[i + 1..] {
      conflicts.extend(conflict_between(a, b));
    }
  }
  conflicts
}

/// The first existing section that shares `resource` with `candidate` and
/// overlaps it in time. Used to keep rooms and instructors single-booked.
pub fn find_clash<'a>(
  candidate: &Section,
  existing: impl IntoIterator<Item = &'a Section>,
  resource: ClashResource,
) -> Option<ScheduleConflict> {
  existing
    .into_iter()
    .filter(|s| s.section_id != candidate.section_id)
    .filter(|s| match resource {
      ClashResource::Room => s.room == candidate.room,
      ClashResource::Instructor => s.instructor_id == candidate.instructor_id,
    })
    .find_map(|s| conflict_between(candidate, s))
}
