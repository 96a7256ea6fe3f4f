//! Plain-text rendering of registry state for terminal displays.

use std::fmt::Write as _;

use chrono::{DateTime, Local, Utc};
use perch_core::{
  history::HistoryEntry,
  snapshot::{Snapshot, StationView},
  station::StationStatus,
};

/// How many history lines the board shows.
pub const RECENT: usize = 10;

fn local(at: DateTime<Utc>) -> String { at.with_timezone(&Local).format("%H:%M").to_string() }

fn who(uid: &str, name: Option<&str>) -> String {
  match name {
    Some(name) => format!("{name} ({uid})"),
    None => uid.to_owned(),
  }
}

pub fn station_line(name: &str, view: &StationView) -> String {
  let mut line = format!("{name:<12} {:<9}", view.status.to_string());
  if view.status == StationStatus::Occupied
    && let Some(uid) = &view.occupant
  {
    let _ = write!(line, " {}", who(uid, view.name.as_deref()));
    if let Some(since) = view.since {
      let _ = write!(line, " since {}", local(since));
    }
    if let Some(free_at) = view.estimated_free_at {
      let _ = write!(line, ", free at ~{}", free_at.format("%H:%M"));
    }
  }
  line
}

pub fn history_line(entry: &HistoryEntry) -> String {
  format!(
    "{}  {:<5}  {:<12} {}",
    local(entry.timestamp),
    entry.action.to_string(),
    entry.station,
    who(&entry.uid, entry.name.as_deref()),
  )
}

/// A display name for `uid`, if the snapshot carries one.
fn known_name<'a>(snapshot: &'a Snapshot, uid: &str) -> Option<&'a str> {
  let occupying = snapshot
    .stations
    .values()
    .find(|view| view.occupant.as_deref() == Some(uid))
    .and_then(|view| view.name.as_deref());
  occupying.or_else(|| {
    snapshot
      .history
      .iter()
      .find(|entry| entry.uid == uid)
      .and_then(|entry| entry.name.as_deref())
  })
}

/// The full status board: stations, last detected card, recent activity.
pub fn board(snapshot: &Snapshot) -> String {
  let mut out = format!(
    "Stations ({}/{} occupied)\n",
    snapshot.occupied_stations,
    snapshot.stations.len()
  );
  for (name, view) in &snapshot.stations {
    let _ = writeln!(out, "  {}", station_line(name, view));
  }

  if let Some(uid) = &snapshot.last_detected_card {
    let _ = writeln!(out, "\nLast card: {}", who(uid, known_name(snapshot, uid)));
  }

  if !snapshot.history.is_empty() {
    out.push_str("\nRecent activity\n");
    for entry in snapshot.history.iter().take(RECENT) {
      let _ = writeln!(out, "  {}", history_line(entry));
    }
  }
  out
}

#[cfg(test)]
mod tests {
  use std::collections::BTreeMap;

  use chrono::NaiveTime;
  use perch_core::history::Action;

  use super::*;

  fn occupied() -> StationView {
    StationView {
      status:            StationStatus::Occupied,
      occupant:          Some("card-1".into()),
      name:              Some("Alice".into()),
      since:             None,
      estimated_free_at: NaiveTime::from_hms_opt(17, 30, 0),
    }
  }

  #[test]
  fn occupied_station_shows_occupant_and_estimate() {
    let line = station_line("Station 1", &occupied());
    assert!(line.starts_with("Station 1"));
    assert!(line.contains("occupied"));
    assert!(line.contains("Alice (card-1)"));
    assert!(line.ends_with("free at ~17:30"));
  }

  #[test]
  fn unlisted_station_is_a_bare_line() {
    let line = station_line("Station 2", &StationView::unknown());
    assert_eq!(line.trim_end(), "Station 2    unknown");
  }

  #[test]
  fn board_lists_every_station_and_recent_history() {
    let mut stations = BTreeMap::new();
    stations.insert("Station 1".to_owned(), occupied());
    stations.insert("Station 2".to_owned(), StationView::unknown());
    let snapshot = Snapshot {
      stations,
      occupied_stations: 1,
      history: vec![HistoryEntry {
        seq:       1,
        uid:       "card-1".into(),
        name:      Some("Alice".into()),
        station:   "Station 1".into(),
        action:    Action::Enter,
        timestamp: Utc::now(),
      }],
      estimated_times: Vec::new(),
      card_names: BTreeMap::from([("Station 1".to_owned(), "Alice".to_owned())]),
      last_detected_card: Some("card-1".into()),
    };

    let text = board(&snapshot);
    assert!(text.starts_with("Stations (1/2 occupied)"));
    assert!(text.contains("Last card: Alice (card-1)"));
    assert!(text.contains("enter"));
    assert_eq!(text.matches("Station 2").count(), 1);
  }
}
