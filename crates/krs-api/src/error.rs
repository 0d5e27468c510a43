//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  extract::rejection::{JsonRejection, PathRejection, QueryRejection},
  http::StatusCode,
  response::{IntoResponse, Response},
};
use krs_core::{Categorize, ErrorCategory};
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("{0}")]
  Validation(String),

  #[error("{0}")]
  Conflict(String),

  #[error("{0}")]
  NotFound(String),

  #[error("bad request: {0}")]
  BadRequest(String),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl ApiError {
  /// Map a store error by its category.
  pub fn store<E>(e: E) -> Self
  where
    E: std::error::Error + Categorize + Send + Sync + 'static,
  {
    match e.category() {
      ErrorCategory::Validation => Self::Validation(e.to_string()),
      ErrorCategory::State => Self::Conflict(e.to_string()),
      ErrorCategory::NotFound => Self::NotFound(e.to_string()),
      ErrorCategory::Store => Self::Store(Box::new(e)),
    }
  }

  fn category(&self) -> &'static str {
    match self {
      Self::Validation(_) => "validation",
      Self::Conflict(_) => "state",
      Self::NotFound(_) => "not_found",
      Self::BadRequest(_) => "bad_request",
      Self::Store(_) => "store",
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let status = match &self {
      ApiError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
      ApiError::Conflict(_) => StatusCode::CONFLICT,
      ApiError::NotFound(_) => StatusCode::NOT_FOUND,
      ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
      ApiError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    let body = json!({ "error": self.to_string(), "category": self.category() });
    (status, Json(body)).into_response()
  }
}

impl From<JsonRejection> for ApiError {
  fn from(rejection: JsonRejection) -> Self { Self::BadRequest(rejection.body_text()) }
}

impl From<PathRejection> for ApiError {
  fn from(rejection: PathRejection) -> Self { Self::BadRequest(rejection.body_text()) }
}

impl From<QueryRejection> for ApiError {
  fn from(rejection: QueryRejection) -> Self { Self::BadRequest(rejection.body_text()) }
}
