//! Read endpoints polled by display clients.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/status` | Full [`Snapshot`] |
//! | `GET`  | `/stations/{name}` | Unknown names answer `{"status":"unknown"}` |
//! | `GET`  | `/history` | Optional `?order=newest\|oldest&limit=N` |
//! | `GET`  | `/estimates` | Active leave-time estimates |
//!
//! All of these read the published snapshot and never wait on a writer.

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, Query, State},
};
use perch_core::{
  OccupancyService, Snapshot,
  estimate::LeaveEstimate,
  history::{HistoryEntry, Order},
  journal::Journal,
  snapshot::StationView,
};
use serde::Deserialize;

/// `GET /status`
pub async fn status<J: Journal>(
  State(service): State<Arc<OccupancyService<J>>>,
) -> Json<Arc<Snapshot>> {
  Json(service.snapshot())
}

/// `GET /stations/{name}`
pub async fn station<J: Journal>(
  State(service): State<Arc<OccupancyService<J>>>,
  Path(name): Path<String>,
) -> Json<StationView> {
  Json(service.station(&name))
}

#[derive(Debug, Deserialize, Default)]
pub struct HistoryParams {
  #[serde(default)]
  pub order: Order,
  pub limit: Option<usize>,
}

/// `GET /history[?order=newest|oldest][&limit=N]`
pub async fn history<J: Journal>(
  State(service): State<Arc<OccupancyService<J>>>,
  Query(params): Query<HistoryParams>,
) -> Json<Vec<HistoryEntry>> {
  Json(service.history(params.order, params.limit))
}

/// `GET /estimates`
pub async fn estimates<J: Journal>(
  State(service): State<Arc<OccupancyService<J>>>,
) -> Json<Vec<LeaveEstimate>> {
  Json(service.active_estimates())
}
