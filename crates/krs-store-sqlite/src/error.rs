//! Error type for `krs-store-sqlite`.

use krs_core::{Categorize, ErrorCategory};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error(transparent)]
  Core(#[from] krs_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  /// A stored value could not be mapped back onto a domain type.
  #[error("decode error: {0}")]
  Decode(String),
}

impl Categorize for Error {
  fn category(&self) -> ErrorCategory {
    match self {
      Error::Core(e) => e.category(),
      _ => ErrorCategory::Store,
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
