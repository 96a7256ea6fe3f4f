//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use perch_core::Error as RegistryError;
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error(transparent)]
  Registry(#[from] RegistryError),
}

impl ApiError {
  pub fn status(&self) -> StatusCode {
    match self {
      ApiError::Registry(e) => match e {
        RegistryError::Validation(_) => StatusCode::BAD_REQUEST,
        RegistryError::StationNotFound(_) | RegistryError::UidNotFound(_) => {
          StatusCode::NOT_FOUND
        }
        RegistryError::StationAlreadyOccupied { .. }
        | RegistryError::StationNotOccupied(_) => StatusCode::CONFLICT,
      },
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let status = self.status();
    let body = match &self {
      ApiError::Registry(RegistryError::StationAlreadyOccupied { occupant, .. }) => {
        json!({ "error": self.to_string(), "occupant": occupant })
      }
      _ => json!({ "error": self.to_string() }),
    };
    (status, Json(body)).into_response()
  }
}
