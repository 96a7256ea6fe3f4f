//! Error types for `perch-core`.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
  #[error("{0}")]
  Validation(String),

  #[error("station {station:?} is already occupied by {occupant:?}")]
  StationAlreadyOccupied { station: String, occupant: String },

  #[error("station {0:?} is not occupied")]
  StationNotOccupied(String),

  #[error("card {0:?} has never been scanned")]
  UidNotFound(String),

  #[error("unknown station: {0:?}")]
  StationNotFound(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Trim `value` and fail with [`Error::Validation`] if nothing is left.
pub(crate) fn require(field: &str, value: &str) -> Result<String> {
  let trimmed = value.trim();
  if trimmed.is_empty() {
    return Err(Error::Validation(format!("{field} must not be empty")));
  }
  Ok(trimmed.to_owned())
}
