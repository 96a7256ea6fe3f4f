//! Background persistence of registry changes.
//!
//! [`ChannelJournal`] hands each transition's changes to an unbounded channel,
//! so the registry lock is never held across I/O. A single writer task drains
//! the channel in order and applies each transition's batch in its own
//! transaction, so a failed batch loses only that transition. Dropping every
//! journal handle closes the channel; the task then finishes what is queued
//! and exits.

use perch_core::{
  journal::{Change, Journal},
  store::OccupancyStore,
};
use tokio::{sync::mpsc, task::JoinHandle};

pub struct ChannelJournal {
  tx: mpsc::UnboundedSender<Vec<Change>>,
}

impl Journal for ChannelJournal {
  fn record(&self, changes: &[Change]) {
    if self.tx.send(changes.to_vec()).is_err() {
      tracing::error!(changes = changes.len(), "journal writer has stopped; changes not persisted");
    }
  }
}

/// Start the writer task for `store`.
///
/// Must be called from within a tokio runtime.
pub fn spawn<S>(store: S) -> (ChannelJournal, JoinHandle<()>)
where
  S: OccupancyStore + 'static,
{
  let (tx, mut rx) = mpsc::unbounded_channel::<Vec<Change>>();

  let handle = tokio::spawn(async move {
    while let Some(batch) = rx.recv().await {
      let count = batch.len();
      if let Err(e) = store.apply(batch).await {
        tracing::error!(error = %e, changes = count, "failed to persist changes");
      }
    }
    tracing::debug!("journal writer stopped");
  });

  (ChannelJournal { tx }, handle)
}
