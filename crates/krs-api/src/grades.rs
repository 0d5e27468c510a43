//! Handlers for a section's grade ledger.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/sections/{id}/grades` | |
//! | `PUT`  | `/sections/{id}/grades` | Body: `{"entries":[{"student_id":..,"score":..}]}`; all or nothing |
//! | `POST` | `/sections/{id}/finalize` | Locks the ledger and rebuilds transcripts |
//! | `POST` | `/sections/{id}/unlock` | Returns `{"unlocked": n}` |

use std::sync::Arc;

use axum::{Json, extract::State};
use krs_core::{
  engine::FinalizeOutcome,
  grade::{GradeRecord, ScoreEntry},
  store::AcademicStore,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  error::ApiError,
  extract::{Body, Id},
};

/// `GET /sections/{id}/grades`
pub async fn list<S: AcademicStore>(
  State(store): State<Arc<S>>,
  Id(section_id): Id<Uuid>,
) -> Result<Json<Vec<GradeRecord>>, ApiError> {
  let grades = store.list_grades(section_id).await.map_err(ApiError::store)?;
  Ok(Json(grades))
}

#[derive(Debug, Deserialize)]
pub struct SaveBody {
  pub entries: Vec<ScoreEntry>,
}

/// `PUT /sections/{id}/grades`
pub async fn save<S: AcademicStore>(
  State(store): State<Arc<S>>,
  Id(section_id): Id<Uuid>,
  Body(body): Body<SaveBody>,
) -> Result<Json<Vec<GradeRecord>>, ApiError> {
  let grades = store
    .save_grades(section_id, body.entries)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(grades))
}

/// `POST /sections/{id}/finalize`
pub async fn finalize<S: AcademicStore>(
  State(store): State<Arc<S>>,
  Id(section_id): Id<Uuid>,
) -> Result<Json<FinalizeOutcome>, ApiError> {
  let outcome = store
    .finalize_section(section_id)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(outcome))
}

#[derive(Debug, Serialize)]
pub struct Unlocked {
  pub unlocked: usize,
}

/// `POST /sections/{id}/unlock`
pub async fn unlock<S: AcademicStore>(
  State(store): State<Arc<S>>,
  Id(section_id): Id<Uuid>,
) -> Result<Json<Unlocked>, ApiError> {
  let unlocked = store
    .unlock_section(section_id)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(Unlocked { unlocked }))
}
