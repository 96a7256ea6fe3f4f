//! [`Registry`]: the authoritative occupancy state.
//!
//! Owns stations, cards, the history log and leave-time estimates. Every
//! operation either fails without touching state or applies completely and
//! queues the resulting [`Change`]s, which the caller drains with
//! [`Registry::take_changes`].

use std::collections::{BTreeMap, HashMap};

use chrono::Utc;

use crate::{
  Error, Result,
  card::{Card, Resolution},
  error::require,
  estimate::{LeaveEstimate, parse_leave_time},
  history::{Action, HistoryEntry, HistoryLog, Order, Retention},
  journal::Change,
  snapshot::{Snapshot, StationView},
  station::Station,
  store::RegistryState,
};

#[derive(Debug, Clone)]
pub struct Registry {
  stations:      BTreeMap<String, Station>,
  cards:         HashMap<String, Card>,
  history:       HistoryLog,
  last_detected: Option<String>,
  /// History entries carried by each [`Snapshot`].
  status_window: usize,
  pending:       Vec<Change>,
}

/// Default number of recent history entries in a [`Snapshot`].
pub const STATUS_HISTORY: usize = 50;

impl Registry {
  /// Create a registry with every station free.
  ///
  /// Station names must be non-empty and unique.
  pub fn new<I, S>(stations: I, retention: Retention) -> Result<Self>
  where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
  {
    let mut map = BTreeMap::new();
    for name in stations {
      let name = require("station name", name.as_ref())?;
      if map.insert(name.clone(), Station::new(name.clone())).is_some() {
        return Err(Error::Validation(format!("duplicate station name {name:?}")));
      }
    }
    if map.is_empty() {
      return Err(Error::Validation("at least one station is required".into()));
    }

    Ok(Self {
      stations: map,
      cards: HashMap::new(),
      history: HistoryLog::new(retention),
      last_detected: None,
      status_window: STATUS_HISTORY,
      pending: Vec::new(),
    })
  }

  /// Create a registry for `stations` and fill it from persisted state.
  ///
  /// The configured names stay authoritative: persisted rows for stations
  /// that are no longer configured are returned so the caller can report them.
  pub fn restore<I, S>(
    stations: I,
    retention: Retention,
    state: RegistryState,
  ) -> Result<(Self, Vec<String>)>
  where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
  {
    let mut registry = Self::new(stations, retention)?;
    let mut orphaned = Vec::new();

    for saved in state.stations {
      match registry.stations.get_mut(&saved.name) {
        Some(station) => *station = saved,
        None => orphaned.push(saved.name),
      }
    }
    registry.cards =
      state.cards.into_iter().map(|c| (c.uid.clone(), c)).collect();
    registry.history = HistoryLog::restore(retention, state.history, state.next_seq);
    registry.last_detected = state.last_detected;

    Ok((registry, orphaned))
  }

  /// Carry the newest `entries` history entries in each snapshot instead of
  /// [`STATUS_HISTORY`]. The full log stays available through [`Self::history`].
  pub fn with_status_history(mut self, entries: usize) -> Self {
    self.status_window = entries;
    self
  }

  /// Drain the changes queued by operations since the last call.
  pub fn take_changes(&mut self) -> Vec<Change> { std::mem::take(&mut self.pending) }

  // ── Station state machine ─────────────────────────────────────────────────

  /// Bind `uid` to a free station and log an `enter` event.
  pub fn record_entry(&mut self, station: &str, uid: &str) -> Result<HistoryEntry> {
    let station = &require("station", station)?;
    let uid = require("uid", uid)?;
    let current = self.station(station)?;
    if let Some(occupant) = &current.occupant {
      return Err(Error::StationAlreadyOccupied {
        station:  current.name.clone(),
        occupant: occupant.clone(),
      });
    }

    let name = self.sight(&uid);
    let slot = self.station_mut(station)?;
    slot.occupant = Some(uid.clone());
    slot.since = Some(Utc::now());
    let updated = slot.clone();

    let entry = self.history.append(&uid, name, station, Action::Enter);
    self.pending.push(Change::StationUpdated(updated));
    self.pending.push(Change::HistoryAppended(entry.clone()));
    Ok(entry)
  }

  /// Free an occupied station, dropping its estimate, and log a `leave` event.
  pub fn record_exit(&mut self, station: &str) -> Result<HistoryEntry> {
    let station = &require("station", station)?;
    let slot = self.station_mut(station)?;
    let Some(uid) = slot.occupant.clone() else {
      return Err(Error::StationNotOccupied(station.to_owned()));
    };
    slot.vacate();
    let updated = slot.clone();

    let name = self.cards.get(&uid).and_then(|c| c.name.clone());
    let entry = self.history.append(&uid, name, station, Action::Leave);
    self.pending.push(Change::StationUpdated(updated));
    self.pending.push(Change::HistoryAppended(entry.clone()));
    Ok(entry)
  }

  /// Handle a badge presented at a station's reader.
  ///
  /// The reader does not know the direction: a free station is entered, the
  /// occupant's own card leaves, anyone else's card is rejected.
  pub fn scan(&mut self, station: &str, uid: &str) -> Result<HistoryEntry> {
    let station = &require("station", station)?;
    let uid = require("uid", uid)?;
    match self.station(station)?.occupant.clone() {
      None => self.record_entry(station, &uid),
      Some(occupant) if occupant == uid => {
        self.sight(&uid);
        self.record_exit(station)
      }
      Some(occupant) => Err(Error::StationAlreadyOccupied {
        station: station.to_owned(),
        occupant,
      }),
    }
  }

  /// Free every station, drop all estimates and clear the history.
  /// Cards are kept.
  pub fn reset(&mut self) {
    for station in self.stations.values_mut() {
      station.vacate();
    }
    self.history.clear();
    self.pending.push(Change::Reset { next_seq: self.history.next_seq() });
  }

  /// The read model served to display clients.
  pub fn snapshot(&self) -> Snapshot {
    let mut card_names = BTreeMap::new();
    let stations = self
      .stations
      .values()
      .map(|station| {
        let name = station
          .occupant
          .as_ref()
          .and_then(|uid| self.cards.get(uid))
          .and_then(|card| card.name.clone());
        if let Some(name) = &name {
          card_names.insert(station.name.clone(), name.clone());
        }
        let view = StationView {
          status: station.status(),
          occupant: station.occupant.clone(),
          name,
          since: station.since,
          estimated_free_at: station.estimate.as_ref().map(|e| e.time),
        };
        (station.name.clone(), view)
      })
      .collect();

    Snapshot {
      stations,
      occupied_stations: self.stations.values().filter(|s| s.is_occupied()).count(),
      history: self.history.list(Order::Newest, Some(self.status_window)),
      estimated_times: self.active_estimates(),
      card_names,
      last_detected_card: self.last_detected.clone(),
    }
  }

  /// Look up a registered station.
  pub fn station(&self, name: &str) -> Result<&Station> {
    self
      .stations
      .get(name)
      .ok_or_else(|| Error::StationNotFound(name.to_owned()))
  }

  fn station_mut(&mut self, name: &str) -> Result<&mut Station> {
    self
      .stations
      .get_mut(name)
      .ok_or_else(|| Error::StationNotFound(name.to_owned()))
  }

  // ── RFID identities ───────────────────────────────────────────────────────

  /// Look a card up, recording it unnamed on first sight.
  pub fn resolve(&mut self, uid: &str) -> Result<Resolution> {
    let uid = require("uid", uid)?;
    self.sight(&uid);
    Ok(self.cards.get(&uid).map_or(Resolution::Unknown, Resolution::of))
  }

  /// Self-service naming: the card must have been scanned before.
  pub fn personalize(&mut self, uid: &str, name: &str) -> Result<Card> {
    let uid = require("uid", uid)?;
    let name = require("name", name)?;
    let card = self
      .cards
      .get_mut(&uid)
      .ok_or_else(|| Error::UidNotFound(uid.clone()))?;
    card.name = Some(name);
    let card = card.clone();
    self.pending.push(Change::CardUpserted(card.clone()));
    Ok(card)
  }

  /// Administrative naming: creates the card if it was never scanned.
  pub fn add_card(&mut self, uid: &str, name: &str) -> Result<Card> {
    let uid = require("uid", uid)?;
    let name = require("name", name)?;
    let card = self
      .cards
      .entry(uid.clone())
      .or_insert_with(|| Card::sighted(uid, Utc::now()));
    card.name = Some(name);
    let card = card.clone();
    self.pending.push(Change::CardUpserted(card.clone()));
    Ok(card)
  }

  pub fn card(&self, uid: &str) -> Option<&Card> { self.cards.get(uid) }

  /// All known cards, ordered by UID.
  pub fn cards(&self) -> Vec<Card> {
    let mut cards: Vec<Card> = self.cards.values().cloned().collect();
    cards.sort_by(|a, b| a.uid.cmp(&b.uid));
    cards
  }

  /// Record a sighting and return the card's current display name.
  fn sight(&mut self, uid: &str) -> Option<String> {
    if !self.cards.contains_key(uid) {
      let card = Card::sighted(uid, Utc::now());
      self.pending.push(Change::CardUpserted(card.clone()));
      self.cards.insert(uid.to_owned(), card);
    }
    if self.last_detected.as_deref() != Some(uid) {
      self.last_detected = Some(uid.to_owned());
      self.pending.push(Change::LastDetected { uid: uid.to_owned() });
    }
    self.cards.get(uid).and_then(|c| c.name.clone())
  }

  // ── History ───────────────────────────────────────────────────────────────

  pub fn history(&self) -> &HistoryLog { &self.history }

  // ── Leave-time estimates ──────────────────────────────────────────────────

  /// Announce when the current occupant of `station` plans to leave.
  /// Replaces any earlier estimate for the station.
  pub fn set_estimate(&mut self, station: &str, time: &str) -> Result<LeaveEstimate> {
    let station = &require("station", station)?;
    let time = parse_leave_time(time)?;
    let slot = self.station_mut(station)?;
    let Some(occupant) = slot.occupant.clone() else {
      return Err(Error::StationNotOccupied(station.to_owned()));
    };

    let estimate = LeaveEstimate {
      station: slot.name.clone(),
      time,
      occupant,
      set_at: Utc::now(),
    };
    slot.estimate = Some(estimate.clone());
    let updated = slot.clone();
    self.pending.push(Change::StationUpdated(updated));
    Ok(estimate)
  }

  /// Drop the estimate for `station`, returning it if there was one.
  pub fn clear_estimate(&mut self, station: &str) -> Result<Option<LeaveEstimate>> {
    let station = &require("station", station)?;
    let slot = self.station_mut(station)?;
    let removed = slot.estimate.take();
    if removed.is_some() {
      let updated = slot.clone();
      self.pending.push(Change::StationUpdated(updated));
    }
    Ok(removed)
  }

  /// Estimates of all occupied stations, in station order.
  pub fn active_estimates(&self) -> Vec<LeaveEstimate> {
    self
      .stations
      .values()
      .filter_map(|s| s.estimate.clone())
      .collect()
  }
}

#[cfg(test)]
mod tests {
  use chrono::NaiveTime;

  use super::*;
  use crate::station::StationStatus;

  fn registry() -> Registry {
    Registry::new(["A", "B", "C"], Retention::KeepAll).unwrap()
  }

  fn assert_invariant(registry: &Registry) {
    for station in registry.stations.values() {
      assert_eq!(
        station.status() == StationStatus::Occupied,
        station.occupant.is_some(),
        "station {}",
        station.name
      );
      if station.occupant.is_none() {
        assert!(station.estimate.is_none(), "free station {} has estimate", station.name);
      }
    }
  }

  // ─── Construction ──────────────────────────────────────────────────────────

  #[test]
  fn rejects_duplicate_and_empty_station_names() {
    assert!(matches!(
      Registry::new(["A", "A"], Retention::KeepAll),
      Err(Error::Validation(_))
    ));
    assert!(matches!(
      Registry::new(["A", " "], Retention::KeepAll),
      Err(Error::Validation(_))
    ));
    assert!(matches!(
      Registry::new(Vec::<String>::new(), Retention::KeepAll),
      Err(Error::Validation(_))
    ));
  }

  // ─── Entry / exit ──────────────────────────────────────────────────────────

  #[test]
  fn entry_estimate_exit_scenario() {
    let mut r = registry();

    let entered = r.record_entry("A", "card-1").unwrap();
    assert_eq!(entered.action, Action::Enter);
    let snap = r.snapshot();
    assert_eq!(snap.stations["A"].status, StationStatus::Occupied);
    assert_eq!(snap.stations["A"].occupant.as_deref(), Some("card-1"));
    assert_eq!(snap.occupied_stations, 1);
    assert_eq!(snap.history.len(), 1);
    assert_invariant(&r);

    let estimate = r.set_estimate("A", "18:00").unwrap();
    assert_eq!(estimate.time, NaiveTime::from_hms_opt(18, 0, 0).unwrap());
    assert_eq!(estimate.occupant, "card-1");

    r.record_exit("A").unwrap();
    let snap = r.snapshot();
    assert_eq!(snap.stations["A"].status, StationStatus::Free);
    assert!(snap.stations["A"].occupant.is_none());
    assert!(snap.estimated_times.is_empty());
    let actions: Vec<Action> =
      r.history().list(Order::Oldest, None).iter().map(|e| e.action).collect();
    assert_eq!(actions, vec![Action::Enter, Action::Leave]);
    assert_invariant(&r);
  }

  #[test]
  fn entry_on_occupied_station_fails_without_change() {
    let mut r = registry();
    r.record_entry("A", "card-1").unwrap();
    r.take_changes();
    let before = r.snapshot();

    let err = r.record_entry("A", "card-2").unwrap_err();
    assert_eq!(
      err,
      Error::StationAlreadyOccupied { station: "A".into(), occupant: "card-1".into() }
    );
    assert_eq!(r.snapshot(), before);
    assert!(r.card("card-2").is_none(), "failed entry must not sight the card");
    assert!(r.take_changes().is_empty());
  }

  #[test]
  fn exit_on_free_station_fails_without_change() {
    let mut r = registry();
    let before = r.snapshot();
    assert_eq!(r.record_exit("B").unwrap_err(), Error::StationNotOccupied("B".into()));
    assert_eq!(r.snapshot(), before);
    assert!(r.take_changes().is_empty());
  }

  #[test]
  fn unknown_station_is_not_found() {
    let mut r = registry();
    assert_eq!(
      r.record_entry("Z", "card-1").unwrap_err(),
      Error::StationNotFound("Z".into())
    );
    assert_eq!(r.record_exit("Z").unwrap_err(), Error::StationNotFound("Z".into()));
    assert_eq!(r.snapshot().station("Z").status, StationStatus::Unknown);
  }

  #[test]
  fn entry_requires_uid() {
    let mut r = registry();
    assert!(matches!(r.record_entry("A", "  "), Err(Error::Validation(_))));
  }

  #[test]
  fn entry_records_name_of_personalised_card() {
    let mut r = registry();
    r.add_card("card-1", "Alice").unwrap();
    let entry = r.record_entry("A", "card-1").unwrap();
    assert_eq!(entry.name.as_deref(), Some("Alice"));
    assert_eq!(r.snapshot().card_names.get("A").map(String::as_str), Some("Alice"));
    assert_eq!(r.snapshot().stations["A"].name.as_deref(), Some("Alice"));
  }

  // ─── Scan ──────────────────────────────────────────────────────────────────

  #[test]
  fn scan_toggles_for_the_occupant() {
    let mut r = registry();
    assert_eq!(r.scan("A", "card-1").unwrap().action, Action::Enter);
    assert!(matches!(
      r.scan("A", "card-2"),
      Err(Error::StationAlreadyOccupied { .. })
    ));
    assert_eq!(r.scan("A", "card-1").unwrap().action, Action::Leave);
    assert_eq!(r.snapshot().occupied_stations, 0);
    assert_invariant(&r);
  }

  // ─── History ───────────────────────────────────────────────────────────────

  #[test]
  fn history_is_append_only() {
    let mut r = registry();
    let mut seen: Vec<HistoryEntry> = Vec::new();

    for i in 0..4 {
      let uid = format!("card-{i}");
      r.record_entry("A", &uid).unwrap();
      let _ = r.record_entry("A", "intruder");
      let _ = r.record_exit("B");
      r.record_exit("A").unwrap();

      let now = r.history().list(Order::Oldest, None);
      assert!(now.len() >= seen.len());
      assert_eq!(&now[..seen.len()], &seen[..], "earlier entries changed");
      seen = now;
    }
    assert_eq!(seen.len(), 8);
    assert!(seen.windows(2).all(|w| w[0].seq < w[1].seq));
    assert!(seen.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
  }

  // ─── Estimates ─────────────────────────────────────────────────────────────

  #[test]
  fn estimate_on_free_station_fails() {
    let mut r = registry();
    assert_eq!(
      r.set_estimate("B", "18:00").unwrap_err(),
      Error::StationNotOccupied("B".into())
    );
    assert!(r.active_estimates().is_empty());
  }

  #[test]
  fn estimate_is_last_write_wins() {
    let mut r = registry();
    r.record_entry("A", "card-1").unwrap();
    r.set_estimate("A", "17:00").unwrap();
    r.set_estimate("A", "17:30").unwrap();
    let estimates = r.active_estimates();
    assert_eq!(estimates.len(), 1);
    assert_eq!(estimates[0].time, NaiveTime::from_hms_opt(17, 30, 0).unwrap());
  }

  #[test]
  fn estimate_validation_precedes_state_checks() {
    let mut r = registry();
    assert!(matches!(r.set_estimate("A", ""), Err(Error::Validation(_))));
    assert!(matches!(r.set_estimate("A", "later"), Err(Error::Validation(_))));
  }

  #[test]
  fn clear_estimate_reports_removed() {
    let mut r = registry();
    r.record_entry("C", "card-1").unwrap();
    r.set_estimate("C", "09:15").unwrap();
    assert!(r.clear_estimate("C").unwrap().is_some());
    assert!(r.clear_estimate("C").unwrap().is_none());
    assert!(r.station("C").unwrap().is_occupied());
  }

  // ─── Identities ────────────────────────────────────────────────────────────

  #[test]
  fn personalize_then_resolve_round_trip() {
    let mut r = registry();
    assert_eq!(r.resolve("card-9").unwrap(), Resolution::Unknown);
    r.personalize("card-9", "Alice").unwrap();
    assert_eq!(
      r.resolve("card-9").unwrap(),
      Resolution::Known { name: "Alice".into() }
    );
  }

  #[test]
  fn unseen_uid_needs_admin_path() {
    let mut r = registry();
    assert_eq!(
      r.personalize("unseen-uid", "Bob").unwrap_err(),
      Error::UidNotFound("unseen-uid".into())
    );
    r.add_card("unseen-uid", "Bob").unwrap();
    assert_eq!(
      r.resolve("unseen-uid").unwrap(),
      Resolution::Known { name: "Bob".into() }
    );
  }

  #[test]
  fn resolve_is_idempotent_and_tracks_last_card() {
    let mut r = registry();
    r.resolve("card-1").unwrap();
    let changes = r.take_changes();
    assert_eq!(changes.len(), 2);

    r.resolve("card-1").unwrap();
    assert!(r.take_changes().is_empty());
    assert_eq!(r.cards().len(), 1);
    assert_eq!(r.snapshot().last_detected_card.as_deref(), Some("card-1"));
  }

  #[test]
  fn naming_requires_a_name() {
    let mut r = registry();
    r.resolve("card-1").unwrap();
    assert!(matches!(r.personalize("card-1", ""), Err(Error::Validation(_))));
    assert!(matches!(r.add_card("card-1", "   "), Err(Error::Validation(_))));
    assert!(r.card("card-1").unwrap().name.is_none());
  }

  #[test]
  fn renaming_overwrites() {
    let mut r = registry();
    r.add_card("card-1", "Alice").unwrap();
    r.personalize("card-1", "Alicia").unwrap();
    assert_eq!(r.card("card-1").unwrap().name.as_deref(), Some("Alicia"));
  }

  // ─── Reset / restore ───────────────────────────────────────────────────────

  #[test]
  fn reset_frees_everything_but_keeps_cards() {
    let mut r = registry();
    r.add_card("card-1", "Alice").unwrap();
    r.record_entry("A", "card-1").unwrap();
    r.record_entry("B", "card-2").unwrap();
    r.set_estimate("A", "12:00").unwrap();
    r.take_changes();

    r.reset();
    assert!(matches!(r.take_changes().as_slice(), [Change::Reset { next_seq: 3 }]));
    let snap = r.snapshot();
    assert_eq!(snap.occupied_stations, 0);
    assert!(snap.history.is_empty());
    assert!(snap.estimated_times.is_empty());
    assert_eq!(r.cards().len(), 2);
    assert_invariant(&r);
  }

  #[test]
  fn restore_keeps_configured_stations_authoritative() {
    let mut original = registry();
    original.record_entry("A", "card-1").unwrap();
    original.set_estimate("A", "18:00").unwrap();
    let state = RegistryState {
      stations:      original.stations.values().cloned().collect(),
      cards:         original.cards(),
      history:       original.history().list(Order::Oldest, None),
      last_detected: Some("card-1".into()),
      next_seq:      0,
    };

    let (restored, orphaned) =
      Registry::restore(["A", "B"], Retention::KeepAll, state).unwrap();
    assert_eq!(orphaned, vec!["C".to_string()]);
    assert_eq!(restored.snapshot().stations["A"].occupant.as_deref(), Some("card-1"));
    assert_eq!(restored.active_estimates().len(), 1);
    assert_eq!(restored.history().len(), 1);
    assert!(restored.station("C").is_err());
  }

  #[test]
  fn numbering_survives_reset_and_restore() {
    let mut r = registry();
    r.record_entry("A", "card-1").unwrap();
    r.record_exit("A").unwrap();
    r.reset();
    let next_seq = match r.take_changes().as_slice() {
      [.., Change::Reset { next_seq }] => *next_seq,
      other => panic!("unexpected changes {other:?}"),
    };

    let state = RegistryState { next_seq, ..RegistryState::default() };
    let (mut restored, _) = Registry::restore(["A"], Retention::KeepAll, state).unwrap();
    assert_eq!(restored.record_entry("A", "card-1").unwrap().seq, 3);
  }

  // ─── Station names ─────────────────────────────────────────────────────────

  #[test]
  fn blank_station_is_a_validation_error() {
    let mut r = registry();
    for blank in ["", "   "] {
      assert!(matches!(r.record_entry(blank, "card-1"), Err(Error::Validation(_))));
      assert!(matches!(r.record_exit(blank), Err(Error::Validation(_))));
      assert!(matches!(r.scan(blank, "card-1"), Err(Error::Validation(_))));
      assert!(matches!(r.set_estimate(blank, "18:00"), Err(Error::Validation(_))));
      assert!(matches!(r.clear_estimate(blank), Err(Error::Validation(_))));
    }
    assert!(r.take_changes().is_empty());
    assert!(r.card("card-1").is_none());
  }

  #[test]
  fn padded_station_names_are_trimmed() {
    let mut r = registry();
    let entry = r.record_entry(" A ", "card-1").unwrap();
    assert_eq!(entry.station, "A");
    r.set_estimate("A  ", "18:00").unwrap();
    assert_eq!(r.active_estimates()[0].station, "A");
    assert_eq!(r.scan("\tA", "card-1").unwrap().action, Action::Leave);
    assert_invariant(&r);
  }

  // ─── Snapshot size ─────────────────────────────────────────────────────────

  #[test]
  fn snapshot_carries_a_bounded_history_window() {
    let mut r = Registry::new(["A"], Retention::KeepAll).unwrap().with_status_history(5);
    for _ in 0..40 {
      r.scan("A", "card-1").unwrap();
    }
    let snap = r.snapshot();
    assert_eq!(snap.history.len(), 5);
    assert_eq!(snap.history[0].seq, 40);
    assert_eq!(r.history().len(), 40);

    let default_window = Registry::new(["A"], Retention::KeepAll).unwrap();
    assert_eq!(default_window.status_window, STATUS_HISTORY);
  }
}
