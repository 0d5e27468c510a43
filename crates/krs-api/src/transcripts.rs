//! Handlers for transcripts (KHS).
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/students/{id}/transcripts` | Earliest term first |
//! | `POST` | `/transcripts/recompute` | Body: `{"student_ids":[...],"term_id":...}` |

use std::sync::Arc;

use axum::{Json, extract::State};
use krs_core::{store::AcademicStore, transcript::Transcript};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
  error::ApiError,
  extract::{Body, Id},
};

/// `GET /students/{id}/transcripts`
pub async fn list<S: AcademicStore>(
  State(store): State<Arc<S>>,
  Id(student_id): Id<Uuid>,
) -> Result<Json<Vec<Transcript>>, ApiError> {
  let transcripts = store
    .list_transcripts(student_id)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(transcripts))
}

#[derive(Debug, Deserialize)]
pub struct RecomputeBody {
  pub student_ids: Vec<Uuid>,
  pub term_id:     Uuid,
}

/// `POST /transcripts/recompute`
pub async fn recompute<S: AcademicStore>(
  State(store): State<Arc<S>>,
  Body(body): Body<RecomputeBody>,
) -> Result<Json<Vec<Transcript>>, ApiError> {
  let transcripts = store
    .recompute_transcripts(body.student_ids, body.term_id)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(transcripts))
}
