//! SQLite persistence for the Perch registry.
//!
//! [`SqliteStore`] replays journal changes into four tables and reads them
//! back at start-up. Queries run on the [`tokio_rusqlite`] connection thread.

mod encode;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::SqliteStore;
