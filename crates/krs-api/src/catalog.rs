//! Handlers for the catalog: terms, students, courses, sections and
//! packages, plus the advisory conflict and load checks.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/terms` | Calendar order |
//! | `POST` | `/terms` | Body: [`NewTerm`]; created inactive |
//! | `GET`  | `/terms/active` | 404 if no term is active |
//! | `POST` | `/terms/{id}/activate` | Deactivates every other term |
//! | `POST` | `/students` | Body: [`NewStudent`] |
//! | `GET`  | `/students/{id}` | |
//! | `GET`  | `/students/{id}/load` | `?term_id=` required |
//! | `POST` | `/courses` | Body: [`NewCourse`] |
//! | `GET`  | `/courses/{id}` | |
//! | `GET`  | `/sections` | Optional `term_id`, `course_id`, `instructor_id` |
//! | `POST` | `/sections` | Body: [`NewSection`]; 422 on room or instructor clash |
//! | `GET`  | `/sections/{id}` | Section with its course |
//! | `GET`  | `/sections/{id}/seats` | Committed seat usage |
//! | `POST` | `/packages` | Body: [`NewPackage`] |
//! | `POST` | `/conflicts` | Body: `{"section_ids":[...]}` |

use std::sync::Arc;

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use krs_core::{
  catalog::{
    Course, NewCourse, NewPackage, NewSection, NewStudent, SectionDetail, Student,
  },
  conflict::ScheduleConflict,
  load::LoadLimit,
  quota::SeatUsage,
  store::{AcademicStore, SectionQuery},
  term::{NewTerm, Term},
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
  error::ApiError,
  extract::{Body, Id, Params},
};

// ─── Terms ───────────────────────────────────────────────────────────────────

/// `GET /terms`
pub async fn list_terms<S: AcademicStore>(
  State(store): State<Arc<S>>,
) -> Result<Json<Vec<Term>>, ApiError> {
  let terms = store.list_terms().await.map_err(ApiError::store)?;
  Ok(Json(terms))
}

/// `POST /terms`
pub async fn create_term<S: AcademicStore>(
  State(store): State<Arc<S>>,
  Body(body): Body<NewTerm>,
) -> Result<impl IntoResponse, ApiError> {
  let term = store.add_term(body).await.map_err(ApiError::store)?;
  Ok((StatusCode::CREATED, Json(term)))
}

/// `GET /terms/active`
pub async fn active_term<S: AcademicStore>(
  State(store): State<Arc<S>>,
) -> Result<Json<Term>, ApiError> {
  let term = store
    .active_term()
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound("no term is active".into()))?;
  Ok(Json(term))
}

/// `POST /terms/{id}/activate`
pub async fn activate_term<S: AcademicStore>(
  State(store): State<Arc<S>>,
  Id(id): Id<Uuid>,
) -> Result<Json<Term>, ApiError> {
  let term = store.activate_term(id).await.map_err(ApiError::store)?;
  Ok(Json(term))
}

// ─── Students ────────────────────────────────────────────────────────────────

/// `POST /students`
pub async fn create_student<S: AcademicStore>(
  State(store): State<Arc<S>>,
  Body(body): Body<NewStudent>,
) -> Result<impl IntoResponse, ApiError> {
  let student = store.add_student(body).await.map_err(ApiError::store)?;
  Ok((StatusCode::CREATED, Json(student)))
}

/// `GET /students/{id}`
pub async fn get_student<S: AcademicStore>(
  State(store): State<Arc<S>>,
  Id(id): Id<Uuid>,
) -> Result<Json<Student>, ApiError> {
  let student = store
    .get_student(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("student {id} not found")))?;
  Ok(Json(student))
}

#[derive(Debug, Deserialize)]
pub struct LoadParams {
  pub term_id: Uuid,
}

/// `GET /students/{id}/load?term_id=<id>`
pub async fn student_load<S: AcademicStore>(
  State(store): State<Arc<S>>,
  Id(id): Id<Uuid>,
  Params(params): Params<LoadParams>,
) -> Result<Json<LoadLimit>, ApiError> {
  let limit = store
    .max_load(id, params.term_id)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(limit))
}

// ─── Courses ─────────────────────────────────────────────────────────────────

/// `POST /courses`
pub async fn create_course<S: AcademicStore>(
  State(store): State<Arc<S>>,
  Body(body): Body<NewCourse>,
) -> Result<impl IntoResponse, ApiError> {
  let course = store.add_course(body).await.map_err(ApiError::store)?;
  Ok((StatusCode::CREATED, Json(course)))
}

/// `GET /courses/{id}`
pub async fn get_course<S: AcademicStore>(
  State(store): State<Arc<S>>,
  Id(id): Id<Uuid>,
) -> Result<Json<Course>, ApiError> {
  let course = store
    .get_course(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("course {id} not found")))?;
  Ok(Json(course))
}

// ─── Sections ────────────────────────────────────────────────────────────────

/// `GET /sections[?term_id=..][&course_id=..][&instructor_id=..]`
pub async fn list_sections<S: AcademicStore>(
  State(store): State<Arc<S>>,
  Params(query): Params<SectionQuery>,
) -> Result<Json<Vec<SectionDetail>>, ApiError> {
  let sections = store.list_sections(&query).await.map_err(ApiError::store)?;
  Ok(Json(sections))
}

/// `POST /sections`
pub async fn create_section<S: AcademicStore>(
  State(store): State<Arc<S>>,
  Body(body): Body<NewSection>,
) -> Result<impl IntoResponse, ApiError> {
  let section = store.add_section(body).await.map_err(ApiError::store)?;
  Ok((StatusCode::CREATED, Json(section)))
}

/// `GET /sections/{id}`
pub async fn get_section<S: AcademicStore>(
  State(store): State<Arc<S>>,
  Id(id): Id<Uuid>,
) -> Result<Json<SectionDetail>, ApiError> {
  let section = store
    .get_section(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("section {id} not found")))?;
  Ok(Json(section))
}

/// `GET /sections/{id}/seats`
pub async fn seat_usage<S: AcademicStore>(
  State(store): State<Arc<S>>,
  Id(id): Id<Uuid>,
) -> Result<Json<SeatUsage>, ApiError> {
  let usage = store.seat_usage(id).await.map_err(ApiError::store)?;
  Ok(Json(usage))
}

// ─── Packages and advisory checks ────────────────────────────────────────────

/// `POST /packages`
pub async fn create_package<S: AcademicStore>(
  State(store): State<Arc<S>>,
  Body(body): Body<NewPackage>,
) -> Result<impl IntoResponse, ApiError> {
  let package = store.add_package(body).await.map_err(ApiError::store)?;
  Ok((StatusCode::CREATED, Json(package)))
}

#[derive(Debug, Deserialize)]
pub struct ConflictBody {
  pub section_ids: Vec<Uuid>,
}

/// `POST /conflicts`
pub async fn conflicts<S: AcademicStore>(
  State(store): State<Arc<S>>,
  Body(body): Body<ConflictBody>,
) -> Result<Json<Vec<ScheduleConflict>>, ApiError> {
  let conflicts = store
    .detect_conflicts(body.section_ids)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(conflicts))
}
