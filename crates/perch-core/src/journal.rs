//! Change records emitted by registry transitions.
//!
//! Every successful mutation of the [`Registry`](crate::Registry) yields one
//! or more [`Change`]s. A [`Journal`] receives them while the writer lock is
//! held, which fixes their order, so implementations must not block.

use serde::{Deserialize, Serialize};

use crate::{card::Card, history::HistoryEntry, station::Station};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Change {
  /// A card was sighted for the first time or (re)named.
  CardUpserted(Card),
  /// Occupant or estimate of a station changed; carries the full new state.
  StationUpdated(Station),
  HistoryAppended(HistoryEntry),
  LastDetected { uid: String },
  /// Administrative reset: stations freed and history cleared. Numbering
  /// resumes at `next_seq`.
  Reset { next_seq: u64 },
}

/// Receives the changes of one transition, in order.
pub trait Journal: Send + Sync {
  fn record(&self, changes: &[Change]);
}

/// A journal that forgets everything; the registry is then purely in-memory.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullJournal;

impl Journal for NullJournal {
  fn record(&self, _changes: &[Change]) {}
}
