//! Error type for `perch-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  #[error("unknown history action: {0:?}")]
  UnknownAction(String),

  #[error("corrupt history counter: {0:?}")]
  BadCounter(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
