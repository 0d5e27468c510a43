//! JSON REST API for course registration and grade finalization.
//!
//! Exposes an axum [`Router`] backed by any
//! [`krs_core::store::AcademicStore`]. Authentication and TLS are the
//! caller's responsibility; actor identities (approvers) arrive in request
//! bodies.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", krs_api::api_router(store.clone()))
//! ```

pub mod catalog;
pub mod error;
pub mod extract;
pub mod grades;
pub mod registrations;
pub mod transcripts;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, post, put},
};
use krs_core::store::AcademicStore;

pub use error::ApiError;

/// Build a fully-materialised API router for `store`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(store: Arc<S>) -> Router<()>
where
  S: AcademicStore + 'static,
{
  Router::new()
    // Terms
    .route("/terms", get(catalog::list_terms::<S>).post(catalog::create_term::<S>))
    .route("/terms/active", get(catalog::active_term::<S>))
    .route("/terms/{id}/activate", post(catalog::activate_term::<S>))
    // Students
    .route("/students", post(catalog::create_student::<S>))
    .route("/students/{id}", get(catalog::get_student::<S>))
    .route("/students/{id}/load", get(catalog::student_load::<S>))
    .route("/students/{id}/transcripts", get(transcripts::list::<S>))
    // Courses, sections, packages
    .route("/courses", post(catalog::create_course::<S>))
    .route("/courses/{id}", get(catalog::get_course::<S>))
    .route(
      "/sections",
      get(catalog::list_sections::<S>).post(catalog::create_section::<S>),
    )
    .route("/sections/{id}", get(catalog::get_section::<S>))
    .route("/sections/{id}/seats", get(catalog::seat_usage::<S>))
    .route("/packages", post(catalog::create_package::<S>))
    .route("/conflicts", post(catalog::conflicts::<S>))
    // Registrations
    .route(
      "/registrations",
      get(registrations::list::<S>).post(registrations::create::<S>),
    )
    .route(
      "/registrations/{id}",
      get(registrations::get_one::<S>).delete(registrations::delete_one::<S>),
    )
    .route("/registrations/{id}/lines", put(registrations::replace_lines::<S>))
    .route("/registrations/{id}/submit", post(registrations::submit::<S>))
    .route("/registrations/{id}/approve", post(registrations::approve::<S>))
    .route("/registrations/{id}/reject", post(registrations::reject::<S>))
    // Grade ledgers
    .route(
      "/sections/{id}/grades",
      get(grades::list::<S>).put(grades::save::<S>),
    )
    .route("/sections/{id}/finalize", post(grades::finalize::<S>))
    .route("/sections/{id}/unlock", post(grades::unlock::<S>))
    // Transcripts
    .route("/transcripts/recompute", post(transcripts::recompute::<S>))
    .with_state(store)
}
