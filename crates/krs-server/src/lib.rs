//! HTTP server assembly for the registration API.
//!
//! The binary in `main.rs` only parses arguments and wires these pieces
//! together.

use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use axum::Router;
use krs_core::store::AcademicStore;
use serde::Deserialize;
use tower_http::trace::TraceLayer;

// ─── Configuration ───────────────────────────────────────────────────────────

/// Runtime server configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
  pub host:       String,
  pub port:       u16,
  pub store_path: PathBuf,
}

/// Layer defaults, the optional TOML file at `path`, and `KRS_*` environment
/// variables, in increasing precedence.
pub fn load_config(path: &Path) -> Result<ServerConfig, config::ConfigError> {
  config::Config::builder()
    .set_default("host", "127.0.0.1")?
    .set_default("port", 8080)?
    .set_default("store_path", "krs.sqlite3")?
    .add_source(config::File::from(path).required(false))
    .add_source(config::Environment::with_prefix("KRS"))
    .build()?
    .try_deserialize()
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}

// ─── Router ──────────────────────────────────────────────────────────────────

/// The full application: the JSON API under `/api`, with request tracing.
pub fn app<S>(store: Arc<S>) -> Router
where
  S: AcademicStore + 'static,
{
  Router::new()
    .nest("/api", krs_api::api_router(store))
    .layer(TraceLayer::new_for_http())
}

#[cfg(test)]
mod tests {
  use axum::{
    body::Body,
    http::{Request, StatusCode},
  };
  use krs_store_sqlite::SqliteStore;
  use tower::ServiceExt as _;

  use super::*;

  #[test]
  fn missing_config_file_falls_back_to_defaults() {
    let cfg = load_config(Path::new("definitely-not-here.toml")).unwrap();
    assert_eq!(cfg.host, "127.0.0.1");
    assert_eq!(cfg.port, 8080);
    assert_eq!(cfg.store_path, PathBuf::from("krs.sqlite3"));
  }

  #[test]
  fn only_a_leading_tilde_is_expanded() {
    assert_eq!(expand_tilde(Path::new("data/krs.db")), PathBuf::from("data/krs.db"));
    assert_eq!(expand_tilde(Path::new("a/~/b")), PathBuf::from("a/~/b"));
    if std::env::var("HOME").is_ok() {
      assert!(!expand_tilde(Path::new("~/krs.db")).starts_with("~"));
    }
  }

  #[tokio::test]
  async fn api_is_mounted_under_prefix() {
    let store = SqliteStore::open_in_memory().await.unwrap();
    let router = app(Arc::new(store));

    let req = Request::builder().uri("/api/terms").body(Body::empty()).unwrap();
    let resp = router.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
      .await
      .unwrap();
    let terms: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(terms, serde_json::json!([]));

    let req = Request::builder().uri("/terms").body(Body::empty()).unwrap();
    let resp = router.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
  }
}
