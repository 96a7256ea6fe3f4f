//! HTTP server assembly for Perch.
//!
//! Combines the public and administrative routers of `perch-api`, guards the
//! latter with HTTP Basic auth when admin credentials are configured, and adds
//! request tracing.

pub mod auth;
pub mod error;
pub mod journal;

pub use error::Error;

use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use axum::{Router, middleware};
use perch_core::{OccupancyService, journal::Journal};
use serde::Deserialize;
use tower_http::trace::TraceLayer;

use auth::AuthConfig;

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` and
/// `PERCH_*` environment variables.
#[derive(Deserialize, Clone, Debug)]
pub struct ServerConfig {
  #[serde(default = "default_host")]
  pub host:                String,
  #[serde(default = "default_port")]
  pub port:                u16,
  #[serde(default = "default_store_path")]
  pub store_path:          PathBuf,
  /// The fixed set of stations. Order is irrelevant; names must be unique.
  #[serde(default = "default_stations")]
  pub stations:            Vec<String>,
  /// History entries kept in memory and restored at start-up; 0 keeps all.
  #[serde(default = "default_history_limit")]
  pub history_limit:       usize,
  /// Newest history entries embedded in `/status`; `/history` serves the rest.
  #[serde(default = "default_status_history")]
  pub status_history:      usize,
  pub admin_username:      Option<String>,
  pub admin_password_hash: Option<String>,
}

fn default_host() -> String { "127.0.0.1".to_string() }

fn default_port() -> u16 { 5005 }

fn default_store_path() -> PathBuf { PathBuf::from("perch.db") }

fn default_stations() -> Vec<String> {
  (1..=4).map(|n| format!("Station {n}")).collect()
}

fn default_history_limit() -> usize { 1000 }

fn default_status_history() -> usize { perch_core::registry::STATUS_HISTORY }

impl ServerConfig {
  /// Read `path` (if it exists) and overlay `PERCH_*` environment variables.
  /// `PERCH_STATIONS` is a comma-separated list.
  pub fn load(path: &Path) -> Result<Self, config::ConfigError> {
    config::Config::builder()
      .add_source(config::File::from(path).required(false))
      .add_source(
        config::Environment::with_prefix("PERCH")
          .try_parsing(true)
          .list_separator(",")
          .with_list_parse_key("stations"),
      )
      .build()?
      .try_deserialize()
  }

  /// `store_path` with a leading `~` replaced by `$HOME`.
  pub fn resolved_store_path(&self) -> PathBuf {
    match (self.store_path.strip_prefix("~"), std::env::var_os("HOME")) {
      (Ok(rest), Some(home)) => PathBuf::from(home).join(rest),
      _ => self.store_path.clone(),
    }
  }

  /// Admin credentials, if configured. Both fields must be set together.
  pub fn auth(&self) -> Result<Option<AuthConfig>, String> {
    match (&self.admin_username, &self.admin_password_hash) {
      (Some(username), Some(password_hash)) => Ok(Some(AuthConfig {
        username:      username.clone(),
        password_hash: password_hash.clone(),
      })),
      (None, None) => Ok(None),
      _ => Err(
        "admin_username and admin_password_hash must be set together".to_string(),
      ),
    }
  }
}

// ─── Application state ────────────────────────────────────────────────────────

/// Everything the router needs.
pub struct AppState<J> {
  pub service: Arc<OccupancyService<J>>,
  /// `None` leaves the admin routes open.
  pub auth:    Option<Arc<AuthConfig>>,
}

impl<J> Clone for AppState<J> {
  fn clone(&self) -> Self {
    Self { service: self.service.clone(), auth: self.auth.clone() }
  }
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build the complete axum [`Router`] for the server.
pub fn router<J>(state: AppState<J>) -> Router
where
  J: Journal + 'static,
{
  let mut admin = perch_api::admin_router(state.service.clone());
  if let Some(credentials) = state.auth {
    admin =
      admin.layer(middleware::from_fn_with_state(credentials, auth::require_admin));
  }

  Router::new()
    .merge(perch_api::api_router(state.service))
    .merge(admin)
    .layer(TraceLayer::new_for_http())
}

// ─── Integration tests ────────────────────────────────────────────────────────
