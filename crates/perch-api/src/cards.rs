//! RFID card endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/check_uid` | Body: `{"uid"}`; sights the card |
//! | `POST` | `/personalize_rfid` | Body: `{"rfid","name"}`; card must have been scanned |
//! | `POST` | `/save_name` | Body: `{"uid","name"}`; same rules as `/personalize_rfid` |
//! | `POST` | `/add_rfid` | Admin. Body: `{"rfid_uid","name"}`; creates the card if needed |
//! | `POST` | `/set_card_name` | Admin. Body: `{"card_uid","name"}`; same rules as `/add_rfid` |
//! | `GET`  | `/cards` | Admin. All known cards |

use std::sync::Arc;

use axum::{Json, extract::State};
use perch_core::{
  OccupancyService,
  card::{Card, Resolution},
  journal::Journal,
};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::error::ApiError;

// ─── Lookup ───────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct CheckBody {
  #[serde(default)]
  pub uid: String,
}

/// Response of `POST /check_uid`.
#[derive(Debug, Serialize, Deserialize)]
pub struct CheckResponse {
  #[serde(flatten)]
  pub resolution: Resolution,
  pub uid:        String,
}

/// `POST /check_uid`: `{"status":"known","uid":...,"name":...}` or
/// `{"status":"unknown","uid":...}`
pub async fn check_uid<J: Journal>(
  State(service): State<Arc<OccupancyService<J>>>,
  Json(body): Json<CheckBody>,
) -> Result<Json<CheckResponse>, ApiError> {
  let resolution = service.resolve(&body.uid)?;
  Ok(Json(CheckResponse { resolution, uid: body.uid.trim().to_owned() }))
}

// ─── Self-service naming ──────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct PersonalizeBody {
  #[serde(default)]
  pub rfid: String,
  #[serde(default)]
  pub name: String,
}

/// `POST /personalize_rfid`: `{"message":...}`
pub async fn personalize_rfid<J: Journal>(
  State(service): State<Arc<OccupancyService<J>>>,
  Json(body): Json<PersonalizeBody>,
) -> Result<Json<Value>, ApiError> {
  let card = service.personalize(&body.rfid, &body.name)?;
  Ok(Json(json!({ "message": named(&card) })))
}

#[derive(Debug, Deserialize)]
pub struct SaveNameBody {
  #[serde(default)]
  pub uid:  String,
  #[serde(default)]
  pub name: String,
}

/// `POST /save_name`: `{"message":...}`
pub async fn save_name<J: Journal>(
  State(service): State<Arc<OccupancyService<J>>>,
  Json(body): Json<SaveNameBody>,
) -> Result<Json<Value>, ApiError> {
  let card = service.personalize(&body.uid, &body.name)?;
  Ok(Json(json!({ "message": named(&card) })))
}

// ─── Administrative registration ──────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct AddCardBody {
  #[serde(default)]
  pub rfid_uid: String,
  #[serde(default)]
  pub name:     String,
}

/// `POST /add_rfid`: `{"success":true,"message":...}`
pub async fn add_rfid<J: Journal>(
  State(service): State<Arc<OccupancyService<J>>>,
  Json(body): Json<AddCardBody>,
) -> Result<Json<Value>, ApiError> {
  let card = service.add_card(&body.rfid_uid, &body.name)?;
  Ok(Json(json!({ "success": true, "message": named(&card) })))
}

#[derive(Debug, Deserialize)]
pub struct CardNameBody {
  #[serde(default)]
  pub card_uid: String,
  #[serde(default)]
  pub name:     String,
}

/// `POST /set_card_name`: `{"success":true}`
pub async fn set_card_name<J: Journal>(
  State(service): State<Arc<OccupancyService<J>>>,
  Json(body): Json<CardNameBody>,
) -> Result<Json<Value>, ApiError> {
  service.add_card(&body.card_uid, &body.name)?;
  Ok(Json(json!({ "success": true })))
}

/// `GET /cards`
pub async fn list<J: Journal>(
  State(service): State<Arc<OccupancyService<J>>>,
) -> Json<Vec<Card>> {
  Json(service.cards())
}

fn named(card: &Card) -> String {
  format!(
    "card {} is now registered to {}",
    card.uid,
    card.name.as_deref().unwrap_or_default()
  )
}
