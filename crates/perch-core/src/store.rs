//! The `OccupancyStore` trait: persistence for journal changes.
//!
//! The trait is implemented by storage backends (e.g. `perch-store-sqlite`).
//! The registry never calls it directly: changes reach a store through a
//! [`Journal`](crate::journal::Journal), and the server restores the registry
//! from [`OccupancyStore::load`] at start-up.

use std::future::Future;

use crate::{card::Card, history::HistoryEntry, journal::Change, station::Station};

/// Everything needed to rebuild a [`Registry`](crate::Registry).
#[derive(Debug, Clone, Default)]
pub struct RegistryState {
  pub stations:      Vec<Station>,
  pub cards:         Vec<Card>,
  /// Oldest first.
  pub history:       Vec<HistoryEntry>,
  pub last_detected: Option<String>,
  /// Persisted history counter; `0` when none was saved.
  pub next_seq:      u64,
}

/// Abstraction over a Perch storage backend.
///
/// All methods return `Send` futures so the trait can be used in multi-threaded
/// async runtimes (e.g. tokio with `axum`).
pub trait OccupancyStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Read back the persisted state, keeping at most `history_limit` of the
  /// newest history entries (`None` keeps all).
  fn load(
    &self,
    history_limit: Option<usize>,
  ) -> impl Future<Output = Result<RegistryState, Self::Error>> + Send + '_;

  /// Persist the changes of one or more transitions atomically, in order.
  fn apply(
    &self,
    changes: Vec<Change>,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;
}
