//! Handlers for `/registrations` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/registrations` | [`RegistrationQuery`] filters; `limit` 1..=500 |
//! | `POST`   | `/registrations` | Body: `student_id` plus `term_id` or `package_id` |
//! | `GET`    | `/registrations/{id}` | |
//! | `DELETE` | `/registrations/{id}` | Drafts only |
//! | `PUT`    | `/registrations/{id}/lines` | Body: `{"section_ids":[...]}` |
//! | `POST`   | `/registrations/{id}/submit` | |
//! | `POST`   | `/registrations/{id}/approve` | Body: `{"approver_id":...}` |
//! | `POST`   | `/registrations/{id}/reject` | Body: `{"approver_id":...,"reason":"..."}` |

use std::sync::Arc;

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use krs_core::{
  registration::Registration,
  store::{AcademicStore, RegistrationQuery},
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
  error::ApiError,
  extract::{Body, Id, Params},
};

/// `GET /registrations[?student_id=..][&term_id=..][&status=..][&limit=..][&offset=..]`
pub async fn list<S: AcademicStore>(
  State(store): State<Arc<S>>,
  Params(query): Params<RegistrationQuery>,
) -> Result<Json<Vec<Registration>>, ApiError> {
  let registrations = store
    .list_registrations(&query)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(registrations))
}

#[derive(Debug, Deserialize)]
pub struct CreateBody {
  pub student_id: Uuid,
  /// Create an empty draft in this term.
  pub term_id:    Option<Uuid>,
  /// Or seed the draft from this package.
  pub package_id: Option<Uuid>,
}

/// `POST /registrations`
pub async fn create<S: AcademicStore>(
  State(store): State<Arc<S>>,
  Body(body): Body<CreateBody>,
) -> Result<impl IntoResponse, ApiError> {
  let registration = match (body.term_id, body.package_id) {
    (Some(term_id), None) => store.create_registration(body.student_id, term_id).await,
    (None, Some(package_id)) => {
      store.create_from_package(body.student_id, package_id).await
    }
    _ => {
      return Err(ApiError::BadRequest(
        "exactly one of term_id and package_id is required".into(),
      ));
    }
  }
  .map_err(ApiError::store)?;
  Ok((StatusCode::CREATED, Json(registration)))
}

/// `GET /registrations/{id}`
pub async fn get_one<S: AcademicStore>(
  State(store): State<Arc<S>>,
  Id(id): Id<Uuid>,
) -> Result<Json<Registration>, ApiError> {
  let registration = store
    .get_registration(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("registration {id} not found")))?;
  Ok(Json(registration))
}

/// `DELETE /registrations/{id}`
pub async fn delete_one<S: AcademicStore>(
  State(store): State<Arc<S>>,
  Id(id): Id<Uuid>,
) -> Result<StatusCode, ApiError> {
  store.delete_registration(id).await.map_err(ApiError::store)?;
  Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
pub struct LinesBody {
  pub section_ids: Vec<Uuid>,
}

/// `PUT /registrations/{id}/lines`
pub async fn replace_lines<S: AcademicStore>(
  State(store): State<Arc<S>>,
  Id(id): Id<Uuid>,
  Body(body): Body<LinesBody>,
) -> Result<Json<Registration>, ApiError> {
  let registration = store
    .replace_lines(id, body.section_ids)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(registration))
}

/// `POST /registrations/{id}/submit`
pub async fn submit<S: AcademicStore>(
  State(store): State<Arc<S>>,
  Id(id): Id<Uuid>,
) -> Result<Json<Registration>, ApiError> {
  let registration = store
    .submit_registration(id)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(registration))
}

#[derive(Debug, Deserialize)]
pub struct ApproveBody {
  pub approver_id: Uuid,
}

/// `POST /registrations/{id}/approve`
pub async fn approve<S: AcademicStore>(
  State(store): State<Arc<S>>,
  Id(id): Id<Uuid>,
  Body(body): Body<ApproveBody>,
) -> Result<Json<Registration>, ApiError> {
  let registration = store
    .approve_registration(id, body.approver_id)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(registration))
}

#[derive(Debug, Deserialize)]
pub struct RejectBody {
  pub approver_id: Uuid,
  pub reason:      String,
}

/// `POST /registrations/{id}/reject`
pub async fn reject<S: AcademicStore>(
  State(store): State<Arc<S>>,
  Id(id): Id<Uuid>,
  Body(body): Body<RejectBody>,
) -> Result<Json<Registration>, ApiError> {
  let registration = store
    .reject_registration(id, body.approver_id, body.reason)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(registration))
}
