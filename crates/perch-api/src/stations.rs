//! Occupancy commands: badge events, leave times, reset.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/entry` | Body: `{"station","uid"}`; returns the `enter` entry |
//! | `POST` | `/exit` | Body: `{"station"}`; returns the `leave` entry |
//! | `POST` | `/scan` | Body: `{"station","uid"}`; enters or leaves |
//! | `POST` | `/set_leave_time` | Body: `{"station","leave_time"}` |
//! | `POST` | `/reset` | Admin; frees every station and clears history |
//!
//! Missing body fields deserialise as empty strings so that they surface as
//! validation errors rather than extractor rejections.

use std::sync::Arc;

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use perch_core::{OccupancyService, history::HistoryEntry, journal::Journal};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::error::ApiError;

// ─── Badge events ─────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct BadgeBody {
  #[serde(default)]
  pub station: String,
  #[serde(default)]
  pub uid:     String,
}

/// `POST /entry`: 201 + the appended history entry.
pub async fn entry<J: Journal>(
  State(service): State<Arc<OccupancyService<J>>>,
  Json(body): Json<BadgeBody>,
) -> Result<impl IntoResponse, ApiError> {
  let entry = service.record_entry(&body.station, &body.uid)?;
  Ok((StatusCode::CREATED, Json(entry)))
}

#[derive(Debug, Deserialize)]
pub struct ExitBody {
  #[serde(default)]
  pub station: String,
}

/// `POST /exit`: 201 + the appended history entry.
pub async fn exit<J: Journal>(
  State(service): State<Arc<OccupancyService<J>>>,
  Json(body): Json<ExitBody>,
) -> Result<impl IntoResponse, ApiError> {
  let entry = service.record_exit(&body.station)?;
  Ok((StatusCode::CREATED, Json(entry)))
}

/// `POST /scan`: the reader decides nothing; the registry picks the action.
pub async fn scan<J: Journal>(
  State(service): State<Arc<OccupancyService<J>>>,
  Json(body): Json<BadgeBody>,
) -> Result<Json<HistoryEntry>, ApiError> {
  Ok(Json(service.scan(&body.station, &body.uid)?))
}

// ─── Leave time ───────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct LeaveTimeBody {
  /// Required; estimates are kept per station.
  #[serde(default)]
  pub station:    String,
  #[serde(default)]
  pub leave_time: String,
}

/// `POST /set_leave_time`: `{"success":true,"station":...,"time":"HH:MM"}`
pub async fn set_leave_time<J: Journal>(
  State(service): State<Arc<OccupancyService<J>>>,
  Json(body): Json<LeaveTimeBody>,
) -> Result<Json<Value>, ApiError> {
  let estimate = service.set_estimate(&body.station, &body.leave_time)?;
  Ok(Json(json!({
    "success": true,
    "station": estimate.station,
    "time":    estimate.time.format("%H:%M").to_string(),
  })))
}

// ─── Reset ────────────────────────────────────────────────────────────────────

/// `POST /reset`
pub async fn reset<J: Journal>(
  State(service): State<Arc<OccupancyService<J>>>,
) -> Json<Value> {
  service.reset();
  Json(json!({ "message": "all stations freed and history cleared" }))
}
