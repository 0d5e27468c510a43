//! Seat capacity accounting.
//!
//! Only registrations that have been submitted or approved hold a seat. There
//! is no reservation: usage is always computed from committed state.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::registration::RegistrationStatus;

/// Parent statuses whose lines consume a seat.
pub const SEAT_HOLDING: [RegistrationStatus; 2] =
  [RegistrationStatus::Submitted, RegistrationStatus::Approved];

/// Committed enrollment for one section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeatUsage {
  pub section_id: Uuid,
  pub enrolled:   u32,
  pub seat_cap:   u32,
}

impl SeatUsage {
  pub fn available(&self) -> bool { self.enrolled < self.seat_cap }

  pub fn remaining(&self) -> u32 { self.seat_cap.saturating_sub(self.enrolled) }

  /// The shortfall if one more seat were claimed.
  pub fn claim_one(&self) -> Option<QuotaShortfall> {
    (!self.available()).then_some(QuotaShortfall {
      section_id: self.section_id,
      enrolled:   self.enrolled,
      seat_cap:   self.seat_cap,
    })
  }
}

/// A section with no seat left for the registration being submitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotaShortfall {
  pub section_id: Uuid,
  pub enrolled:   u32,
  pub seat_cap:   u32,
}

impl fmt::Display for QuotaShortfall {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(
      f,
      "section {} is full ({}/{})",
      self.section_id, self.enrolled, self.seat_cap
    )
  }
}
