//! JSON HTTP API for Perch.
//!
//! Exposes axum [`Router`]s backed by a shared [`OccupancyService`].
//! Auth, TLS, and transport concerns are the caller's responsibility: the
//! routes of [`admin_router`] are expected to be wrapped in an auth layer.
//!
//! # Mounting
//!
//! ```rust,ignore
//! Router::new()
//!   .merge(perch_api::api_router(service.clone()))
//!   .merge(perch_api::admin_router(service).layer(auth_layer))
//! ```

pub mod cards;
pub mod error;
pub mod stations;
pub mod status;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, post},
};
use perch_core::{OccupancyService, journal::Journal};

pub use error::ApiError;

/// Routes used by display clients and badge readers.
pub fn api_router<J>(service: Arc<OccupancyService<J>>) -> Router<()>
where
  J: Journal + 'static,
{
  Router::new()
    // Reads
    .route("/status", get(status::status::<J>))
    .route("/stations/{name}", get(status::station::<J>))
    .route("/history", get(status::history::<J>))
    .route("/estimates", get(status::estimates::<J>))
    // Occupancy
    .route("/entry", post(stations::entry::<J>))
    .route("/exit", post(stations::exit::<J>))
    .route("/scan", post(stations::scan::<J>))
    .route("/set_leave_time", post(stations::set_leave_time::<J>))
    // Cards
    .route("/check_uid", post(cards::check_uid::<J>))
    .route("/personalize_rfid", post(cards::personalize_rfid::<J>))
    .route("/save_name", post(cards::save_name::<J>))
    .with_state(service)
}

/// Administrative routes: card registration, card listing, reset.
pub fn admin_router<J>(service: Arc<OccupancyService<J>>) -> Router<()>
where
  J: Journal + 'static,
{
  Router::new()
    .route("/add_rfid", post(cards::add_rfid::<J>))
    .route("/set_card_name", post(cards::set_card_name::<J>))
    .route("/cards", get(cards::list::<J>))
    .route("/reset", post(stations::reset::<J>))
    .with_state(service)
}
