//! Registrations (KRS) and their lifecycle.
//!
//! ```text
//! Draft ──submit──▶ Submitted ──approve──▶ Approved
//!                       │
//!                       └────reject────▶ Rejected
//! ```
//!
//! Only a draft can change its lines. Once submitted the line set is frozen.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;

use crate::{
  catalog::SectionDetail,
  error::{StateError, ValidationError},
};

// ─── Status ──────────────────────────────────────────────────────────────────

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  Display,
  EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RegistrationStatus {
  Draft,
  Submitted,
  Approved,
  Rejected,
}

impl RegistrationStatus {
  pub fn can_transition_to(self, next: RegistrationStatus) -> bool {
    use RegistrationStatus::*;
    matches!(
      (self, next),
      (Draft, Submitted) | (Submitted, Approved) | (Submitted, Rejected)
    )
  }

  pub fn is_mutable(self) -> bool { self == Self::Draft }
}

// ─── Lines ───────────────────────────────────────────────────────────────────

/// One section claimed by a registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrationLine {
  pub line_id:         Uuid,
  pub registration_id: Uuid,
  pub section_id:      Uuid,
}

// ─── Registration ────────────────────────────────────────────────────────────

/// A student's claimed set of sections for one term. Unique per
/// `(student, term)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Registration {
  pub registration_id:  Uuid,
  pub student_id:       Uuid,
  pub term_id:          Uuid,
  pub status:           RegistrationStatus,
  /// Σ credits of `lines`; recomputed whenever the lines change.
  pub total_credits:    u32,
  pub lines:            Vec<RegistrationLine>,
  /// Package the draft was seeded from, if any.
  pub package_id:       Option<Uuid>,
  pub created_at:       DateTime<Utc>,
  pub submitted_at:     Option<DateTime<Utc>>,
  pub decided_at:       Option<DateTime<Utc>>,
  pub decided_by:       Option<Uuid>,
  pub rejection_reason: Option<String>,
}

impl Registration {
  /// An empty draft.
  pub fn draft(student_id: Uuid, term_id: Uuid, at: DateTime<Utc>) -> Self {
    Self {
      registration_id: Uuid::new_v4(),
      student_id,
      term_id,
      status: RegistrationStatus::Draft,
      total_credits: 0,
      lines: Vec::new(),
      package_id: None,
      created_at: at,
      submitted_at: None,
      decided_at: None,
      decided_by: None,
      rejection_reason: None,
    }
  }

  pub fn section_ids(&self) -> Vec<Uuid> {
    self.lines.iter().map(|l| l.section_id).collect()
  }

  pub fn ensure_draft(&self) -> Result<(), StateError> {
    if self.status.is_mutable() {
      Ok(())
    } else {
      Err(StateError::NotDraft {
        registration_id: self.registration_id,
        status:          self.status,
      })
    }
  }

  /// Replace the whole line set and recompute total credits from it. Every
  /// section must belong to this registration's term and appear only once.
  pub fn replace_lines(
    &mut self,
    sections: &[SectionDetail],
  ) -> Result<(), crate::Error> {
    self.ensure_draft()?;

    let mut lines = Vec::with_capacity(sections.len());
    for detail in sections {
      let section = &detail.section;
      if section.term_id != self.term_id {
        return Err(
          ValidationError::SectionOutsideTerm {
            section_id: section.section_id,
            expected:   self.term_id,
            actual:     section.term_id,
          }
          .into(),
        );
      }
      if lines
        .iter()
        .any(|l: &RegistrationLine| l.section_id == section.section_id)
      {
        return Err(
          ValidationError::DuplicateSection { section_id: section.section_id }
            .into(),
        );
      }
      lines.push(RegistrationLine {
        line_id:         Uuid::new_v4(),
        registration_id: self.registration_id,
        section_id:      section.section_id,
      });
    }

    self.total_credits = sections.iter().map(SectionDetail::credits).sum();
    self.lines = lines;
    Ok(())
  }

  fn transition(&mut self, next: RegistrationStatus) -> Result<(), StateError> {
    if !self.status.can_transition_to(next) {
      return Err(StateError::InvalidTransition {
        registration_id: self.registration_id,
        from:            self.status,
        to:              next,
      });
    }
    self.status = next;
    Ok(())
  }

  /// Freeze the line set. Validation happens before this is called.
  pub fn mark_submitted(&mut self, at: DateTime<Utc>) -> Result<(), StateError> {
    self.transition(RegistrationStatus::Submitted)?;
    self.submitted_at = Some(at);
    Ok(())
  }

  pub fn approve(
    &mut self,
    approver_id: Uuid,
    at: DateTime<Utc>,
  ) -> Result<(), StateError> {
    self.transition(RegistrationStatus::Approved)?;
    self.decided_at = Some(at);
    self.decided_by = Some(approver_id);
    Ok(())
  }

  pub fn reject(
    &mut self,
    approver_id: Uuid,
    reason: String,
    at: DateTime<Utc>,
  ) -> Result<(), crate::Error> {
    if reason.trim().is_empty() {
      return Err(ValidationError::EmptyReason.into());
    }
    self.transition(RegistrationStatus::Rejected)?;
    self.decided_at = Some(at);
    self.decided_by = Some(approver_id);
    self.rejection_reason = Some(reason);
    Ok(())
  }
}
