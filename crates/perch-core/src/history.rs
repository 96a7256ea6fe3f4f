//! The append-only log of entry and exit events.
//!
//! Entries are never edited once appended. The in-memory log applies a
//! retention cap with oldest-first eviction; ordering for display is a
//! parameter of the read, not a property of storage.

use std::{collections::VecDeque, sync::Arc};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// What happened at a station.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Action {
  Enter,
  Leave,
}

/// One observed entry or exit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
  /// Position in the log; strictly increasing.
  pub seq:       u64,
  pub uid:       String,
  /// The card's display name at the time of the event.
  pub name:      Option<String>,
  pub station:   String,
  pub action:    Action,
  pub timestamp: DateTime<Utc>,
}

/// Read direction for [`HistoryLog::list`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Order {
  /// Display order.
  #[default]
  Newest,
  /// Audit order.
  Oldest,
}

/// How many entries the in-memory log keeps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Retention {
  KeepAll,
  /// Keep the newest `n` entries.
  Cap(usize),
}

impl Retention {
  /// `0` means unlimited.
  pub fn from_limit(limit: usize) -> Self {
    if limit == 0 { Self::KeepAll } else { Self::Cap(limit) }
  }

  pub fn limit(self) -> Option<usize> {
    match self {
      Self::KeepAll => None,
      Self::Cap(n) => Some(n),
    }
  }
}

/// Entries per sealed chunk.
const CHUNK: usize = 256;

/// An immutable, cheaply cloned copy of the log's contents.
///
/// Full chunks are shared between the log and every view taken from it, so
/// taking a view copies at most one partial chunk.
#[derive(Debug, Clone, Default)]
pub struct HistoryView {
  /// Full chunks, oldest first.
  sealed: VecDeque<Arc<[HistoryEntry]>>,
  /// Entries of `sealed[0]` that have been evicted.
  skip:   usize,
  /// The chunk being filled.
  tail:   Vec<HistoryEntry>,
  len:    usize,
}

impl HistoryView {
  /// All entries, oldest first.
  pub fn iter(&self) -> impl DoubleEndedIterator<Item = &HistoryEntry> {
    let skip = self.skip;
    self
      .sealed
      .iter()
      .enumerate()
      .flat_map(move |(i, chunk)| &chunk[if i == 0 { skip } else { 0 }..])
      .chain(self.tail.iter())
  }

  /// Up to `limit` entries in the requested direction.
  pub fn list(&self, order: Order, limit: Option<usize>) -> Vec<HistoryEntry> {
    let limit = limit.unwrap_or(usize::MAX);
    match order {
      Order::Oldest => self.iter().take(limit).cloned().collect(),
      Order::Newest => self.iter().rev().take(limit).cloned().collect(),
    }
  }

  pub fn len(&self) -> usize { self.len }

  pub fn is_empty(&self) -> bool { self.len == 0 }

  fn push(&mut self, entry: HistoryEntry) {
    self.tail.push(entry);
    self.len += 1;
    if self.tail.len() == CHUNK {
      let full = std::mem::replace(&mut self.tail, Vec::with_capacity(CHUNK));
      self.sealed.push_back(full.into());
    }
  }

  fn pop_oldest(&mut self) {
    match self.sealed.front() {
      Some(chunk) => {
        self.skip += 1;
        if self.skip == chunk.len() {
          self.sealed.pop_front();
          self.skip = 0;
        }
      }
      None if !self.tail.is_empty() => {
        self.tail.remove(0);
      }
      None => return,
    }
    self.len -= 1;
  }
}

#[derive(Debug, Clone)]
pub struct HistoryLog {
  entries:   HistoryView,
  retention: Retention,
  next_seq:  u64,
}

impl HistoryLog {
  pub fn new(retention: Retention) -> Self {
    Self { entries: HistoryView::default(), retention, next_seq: 1 }
  }

  /// Rebuild a log from persisted entries (oldest first).
  ///
  /// `next_seq` is the persisted counter; numbering resumes after whichever
  /// is higher, it or the newest entry.
  pub fn restore(retention: Retention, entries: Vec<HistoryEntry>, next_seq: u64) -> Self {
    let after_last = entries.last().map_or(1, |e| e.seq + 1);
    let mut log = Self {
      entries: HistoryView::default(),
      retention,
      next_seq: next_seq.max(after_last),
    };
    for entry in entries {
      log.entries.push(entry);
    }
    log.evict();
    log
  }

  /// Append an event stamped with the current time and return the stored entry.
  pub fn append(
    &mut self,
    uid: &str,
    name: Option<String>,
    station: &str,
    action: Action,
  ) -> HistoryEntry {
    let entry = HistoryEntry {
      seq: self.next_seq,
      uid: uid.to_owned(),
      name,
      station: station.to_owned(),
      action,
      timestamp: Utc::now(),
    };
    self.next_seq += 1;
    self.entries.push(entry.clone());
    self.evict();
    entry
  }

  /// Up to `limit` entries in the requested direction.
  pub fn list(&self, order: Order, limit: Option<usize>) -> Vec<HistoryEntry> {
    self.entries.list(order, limit)
  }

  /// A shared copy of the current contents.
  pub fn view(&self) -> HistoryView { self.entries.clone() }

  pub fn len(&self) -> usize { self.entries.len() }

  pub fn is_empty(&self) -> bool { self.entries.is_empty() }

  /// The sequence number the next entry will get.
  pub fn next_seq(&self) -> u64 { self.next_seq }

  /// Drop every entry. Sequence numbers keep counting.
  pub(crate) fn clear(&mut self) { self.entries = HistoryView::default(); }

  fn evict(&mut self) {
    if let Retention::Cap(cap) = self.retention {
      while self.entries.len() > cap {
        self.entries.pop_oldest();
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn log_with(retention: Retention, n: usize) -> HistoryLog {
    let mut log = HistoryLog::new(retention);
    for i in 0..n {
      let action = if i % 2 == 0 { Action::Enter } else { Action::Leave };
      log.append("card-1", None, "Station 1", action);
    }
    log
  }

  #[test]
  fn sequence_numbers_increase() {
    let log = log_with(Retention::KeepAll, 5);
    let seqs: Vec<u64> =
      log.list(Order::Oldest, None).iter().map(|e| e.seq).collect();
    assert_eq!(seqs, vec![1, 2, 3, 4, 5]);
  }

  #[test]
  fn order_is_chosen_by_reader() {
    let log = log_with(Retention::KeepAll, 3);
    let newest = log.list(Order::Newest, Some(2));
    assert_eq!(newest.iter().map(|e| e.seq).collect::<Vec<_>>(), vec![3, 2]);
    let oldest = log.list(Order::Oldest, Some(2));
    assert_eq!(oldest.iter().map(|e| e.seq).collect::<Vec<_>>(), vec![1, 2]);
  }

  #[test]
  fn cap_evicts_oldest_first() {
    let log = log_with(Retention::Cap(3), 5);
    assert_eq!(log.len(), 3);
    let seqs: Vec<u64> =
      log.list(Order::Oldest, None).iter().map(|e| e.seq).collect();
    assert_eq!(seqs, vec![3, 4, 5]);
  }

  #[test]
  fn restore_continues_sequence() {
    let original = log_with(Retention::KeepAll, 4);
    let mut restored =
      HistoryLog::restore(Retention::Cap(2), original.list(Order::Oldest, None), 0);
    assert_eq!(restored.len(), 2);
    let next = restored.append("card-2", None, "Station 2", Action::Enter);
    assert_eq!(next.seq, 5);
  }

  #[test]
  fn clear_keeps_counting() {
    let mut log = log_with(Retention::KeepAll, 2);
    log.clear();
    assert!(log.is_empty());
    assert_eq!(log.append("card-1", None, "Station 1", Action::Enter).seq, 3);
  }

  #[test]
  fn restore_honours_persisted_counter() {
    let restored = HistoryLog::restore(Retention::KeepAll, Vec::new(), 42);
    assert!(restored.is_empty());
    assert_eq!(restored.next_seq(), 42);

    let entries = log_with(Retention::KeepAll, 3).list(Order::Oldest, None);
    assert_eq!(HistoryLog::restore(Retention::KeepAll, entries, 2).next_seq(), 4);
  }

  #[test]
  fn eviction_crosses_chunk_boundaries() {
    let log = log_with(Retention::Cap(300), 1000);
    assert_eq!(log.len(), 300);
    let oldest = log.list(Order::Oldest, None);
    assert_eq!(oldest.first().map(|e| e.seq), Some(701));
    assert_eq!(oldest.last().map(|e| e.seq), Some(1000));
    let seqs: Vec<u64> = oldest.iter().map(|e| e.seq).collect();
    assert_eq!(seqs, (701..=1000).collect::<Vec<_>>());

    let newest = log.list(Order::Newest, Some(3));
    assert_eq!(newest.iter().map(|e| e.seq).collect::<Vec<_>>(), vec![1000, 999, 998]);
  }

  #[test]
  fn views_are_unaffected_by_later_appends() {
    let mut log = log_with(Retention::Cap(400), 600);
    let view = log.view();
    for _ in 0..300 {
      log.append("card-2", None, "Station 2", Action::Enter);
    }
    assert_eq!(view.len(), 400);
    assert_eq!(view.list(Order::Newest, Some(1))[0].seq, 600);
    assert_eq!(view.list(Order::Oldest, Some(1))[0].seq, 201);
    assert_eq!(log.list(Order::Newest, Some(1))[0].seq, 900);
  }

  #[test]
  fn retention_from_limit() {
    assert_eq!(Retention::from_limit(0), Retention::KeepAll);
    assert_eq!(Retention::from_limit(10).limit(), Some(10));
  }
}
