//! Academic terms and their chronological order.
//!
//! A term is labelled `2024/2025-GANJIL`: the academic year followed by the
//! half-year period. Terms are ordered by the `(start year, period)` tuple.
//! Labels are never compared as strings.

use std::{cmp::Ordering, fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;

use crate::error::ValidationError;

// ─── Period ──────────────────────────────────────────────────────────────────

/// Half of an academic year. `Ganjil` (first half) precedes `Genap`.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  PartialOrd,
  Ord,
  Hash,
  Serialize,
  Deserialize,
  Display,
  EnumString,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE", ascii_case_insensitive)]
pub enum Period {
  Ganjil,
  Genap,
}

// ─── AcademicYear ────────────────────────────────────────────────────────────

/// An academic year spanning two calendar years, e.g. `2024/2025`.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(try_from = "String", into = "String")]
pub struct AcademicYear {
  start: u16,
}

impl AcademicYear {
  /// The year starting in `start`. Fails when the following calendar year is
  /// not representable.
  pub fn new(start: u16) -> Result<Self, ValidationError> {
    match start.checked_add(1) {
      Some(_) => Ok(Self { start }),
      None => Err(ValidationError::InvalidAcademicYear(start.to_string())),
    }
  }

  pub fn start(&self) -> u16 { self.start }

  // `new` and `from_str` both guarantee `start < u16::MAX`.
  pub fn end(&self) -> u16 { self.start + 1 }
}

impl fmt::Display for AcademicYear {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}/{}", self.start, self.end())
  }
}

impl FromStr for AcademicYear {
  type Err = ValidationError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let invalid = || ValidationError::InvalidAcademicYear(s.to_owned());
    let (start, end) = s.trim().split_once('/').ok_or_else(invalid)?;
    let start: u16 = start.parse().map_err(|_| invalid())?;
    let end: u16 = end.parse().map_err(|_| invalid())?;
    if start.checked_add(1) != Some(end) {
      return Err(invalid());
    }
    Ok(Self { start })
  }
}

impl TryFrom<String> for AcademicYear {
  type Error = ValidationError;

  fn try_from(s: String) -> Result<Self, Self::Error> { s.parse() }
}

impl From<AcademicYear> for String {
  fn from(y: AcademicYear) -> Self { y.to_string() }
}

// ─── TermKey ─────────────────────────────────────────────────────────────────

/// The chronological identity of a term. The derived `Ord` compares the year
/// first and the period second, which is the academic calendar order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TermKey {
  pub year:   AcademicYear,
  pub period: Period,
}

impl fmt::Display for TermKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}-{}", self.year, self.period)
  }
}

impl FromStr for TermKey {
  type Err = ValidationError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let (year, period) = s
      .trim()
      .rsplit_once('-')
      .ok_or_else(|| ValidationError::InvalidTermLabel(s.to_owned()))?;
    let period = period
      .parse()
      .map_err(|_| ValidationError::InvalidTermLabel(s.to_owned()))?;
    Ok(Self { year: year.parse()?, period })
  }
}

// ─── Window ──────────────────────────────────────────────────────────────────

/// A closed time interval during which an activity is permitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Window {
  pub opens_at:  DateTime<Utc>,
  pub closes_at: DateTime<Utc>,
}

impl Window {
  pub fn new(
    opens_at: DateTime<Utc>,
    closes_at: DateTime<Utc>,
  ) -> Result<Self, ValidationError> {
    if opens_at > closes_at {
      return Err(ValidationError::InvalidWindow);
    }
    Ok(Self { opens_at, closes_at })
  }

  pub fn contains(&self, at: DateTime<Utc>) -> bool {
    self.opens_at <= at && at <= self.closes_at
  }
}

// ─── Term ────────────────────────────────────────────────────────────────────

/// One academic semester.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Term {
  pub term_id:             Uuid,
  pub academic_year:       AcademicYear,
  pub period:              Period,
  /// At most one term is active institution-wide; enforced by the store.
  pub active:              bool,
  pub registration_window: Window,
  /// Late amendments are accepted here when the main window has closed.
  pub amendment_window:    Option<Window>,
}

impl Term {
  pub fn key(&self) -> TermKey {
    TermKey { year: self.academic_year, period: self.period }
  }

  pub fn label(&self) -> String { self.key().to_string() }

  /// Whether a registration may be submitted at `at`: inside the registration
  /// window, or failing that inside the amendment window.
  pub fn accepts_submission_at(&self, at: DateTime<Utc>) -> bool {
    self.registration_window.contains(at)
      || self.amendment_window.is_some_and(|w| w.contains(at))
  }
}

/// Input to [`crate::store::AcademicStore::add_term`]. New terms are never
/// active; activation is a separate operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTerm {
  pub academic_year:       AcademicYear,
  pub period:              Period,
  pub registration_window: Window,
  pub amendment_window:    Option<Window>,
}

impl NewTerm {
  pub fn validate(&self) -> Result<(), ValidationError> {
    for w in std::iter::once(&self.registration_window)
      .chain(self.amendment_window.as_ref())
    {
      Window::new(w.opens_at, w.closes_at)?;
    }
    Ok(())
  }
}

// ─── Ordering ────────────────────────────────────────────────────────────────

/// The academic-calendar comparator shared by every caller that needs
/// "earlier" or "later" terms.
pub fn chronological_cmp(a: &Term, b: &Term) -> Ordering {
  a.key().cmp(&b.key()).then_with(|| a.term_id.cmp(&b.term_id))
}

/// Sort terms in place, earliest first.
pub fn sort_chronologically(terms: &mut [Term]) {
  terms.sort_by(chronological_cmp);
}

/// The ids of every term up to and including `target`, earliest first.
pub fn terms_through(terms: &[Term], target: &Term) -> Vec<Uuid> {
  let mut earlier: Vec<&Term> = terms
    .iter()
    .filter(|t| chronological_cmp(t, target) != Ordering::Greater)
    .collect();
  earlier.sort_by(|a, b| chronological_cmp(a, b));
  earlier.into_iter().map(|t| t.term_id).collect()
}
