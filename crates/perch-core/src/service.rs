//! [`OccupancyService`]: the shared, single-writer front of the registry.
//!
//! Writes take one exclusive lock for the duration of a single transition.
//! After each successful transition a fresh [`Snapshot`] and a shared
//! [`HistoryView`] are published through [`ArcSwap`]s, so readers never wait
//! on a writer. Neither copies the whole history: the snapshot carries a
//! bounded window and the view shares the log's sealed chunks.

use std::sync::Arc;

use arc_swap::ArcSwap;
use parking_lot::Mutex;

use crate::{
  Registry, Result,
  card::{Card, Resolution},
  estimate::LeaveEstimate,
  history::{HistoryEntry, HistoryView, Order},
  journal::{Journal, NullJournal},
  snapshot::{Snapshot, StationView},
};

pub struct OccupancyService<J = NullJournal> {
  registry:  Mutex<Registry>,
  published: ArcSwap<Snapshot>,
  history:   ArcSwap<HistoryView>,
  journal:   J,
}

impl OccupancyService<NullJournal> {
  /// A service that keeps its state in memory only.
  pub fn in_memory(registry: Registry) -> Self { Self::new(registry, NullJournal) }
}

impl<J: Journal> OccupancyService<J> {
  pub fn new(registry: Registry, journal: J) -> Self {
    let published = ArcSwap::from_pointee(registry.snapshot());
    let history = ArcSwap::from_pointee(registry.history().view());
    Self { registry: Mutex::new(registry), published, history, journal }
  }

  // ── Reads (lock-free) ─────────────────────────────────────────────────────

  /// The most recently published state.
  pub fn snapshot(&self) -> Arc<Snapshot> { self.published.load_full() }

  pub fn station(&self, name: &str) -> StationView {
    self.published.load().station(name.trim())
  }

  pub fn history(&self, order: Order, limit: Option<usize>) -> Vec<HistoryEntry> {
    self.history.load().list(order, limit)
  }

  pub fn active_estimates(&self) -> Vec<LeaveEstimate> {
    self.published.load().estimated_times.clone()
  }

  /// All known cards. Takes the writer lock briefly; not on the poll path.
  pub fn cards(&self) -> Vec<Card> { self.registry.lock().cards() }

  // ── Writes ────────────────────────────────────────────────────────────────

  pub fn record_entry(&self, station: &str, uid: &str) -> Result<HistoryEntry> {
    let entry = self.write(|r| r.record_entry(station, uid))?;
    tracing::info!(station, uid, seq = entry.seq, "station entered");
    Ok(entry)
  }

  pub fn record_exit(&self, station: &str) -> Result<HistoryEntry> {
    let entry = self.write(|r| r.record_exit(station))?;
    tracing::info!(station, uid = %entry.uid, seq = entry.seq, "station left");
    Ok(entry)
  }

  pub fn scan(&self, station: &str, uid: &str) -> Result<HistoryEntry> {
    let entry = self.write(|r| r.scan(station, uid))?;
    tracing::info!(station, uid, action = %entry.action, seq = entry.seq, "badge scanned");
    Ok(entry)
  }

  pub fn reset(&self) {
    let mut registry = self.registry.lock();
    registry.reset();
    self.publish(&mut registry);
    tracing::info!("registry reset");
  }

  pub fn resolve(&self, uid: &str) -> Result<Resolution> {
    self.write(|r| r.resolve(uid))
  }

  pub fn personalize(&self, uid: &str, name: &str) -> Result<Card> {
    let card = self.write(|r| r.personalize(uid, name))?;
    tracing::info!(uid = %card.uid, "card personalised");
    Ok(card)
  }

  pub fn add_card(&self, uid: &str, name: &str) -> Result<Card> {
    let card = self.write(|r| r.add_card(uid, name))?;
    tracing::info!(uid = %card.uid, "card registered");
    Ok(card)
  }

  pub fn set_estimate(&self, station: &str, time: &str) -> Result<LeaveEstimate> {
    let estimate = self.write(|r| r.set_estimate(station, time))?;
    tracing::info!(station, time = %estimate.time, "leave time set");
    Ok(estimate)
  }

  pub fn clear_estimate(&self, station: &str) -> Result<Option<LeaveEstimate>> {
    self.write(|r| r.clear_estimate(station))
  }

  /// Run one transition under the lock, then publish and journal its changes.
  fn write<T>(&self, op: impl FnOnce(&mut Registry) -> Result<T>) -> Result<T> {
    let mut registry = self.registry.lock();
    let outcome = op(&mut registry);
    if let Err(e) = &outcome {
      tracing::debug!(error = %e, "transition rejected");
    }
    self.publish(&mut registry);
    outcome
  }

  /// Publish the state behind `registry` and journal its queued changes.
  /// Must be called with the lock held so journal order is transition order.
  fn publish(&self, registry: &mut Registry) {
    let changes = registry.take_changes();
    if changes.is_empty() {
      return;
    }
    self.published.store(Arc::new(registry.snapshot()));
    self.history.store(Arc::new(registry.history().view()));
    self.journal.record(&changes);
  }
}
