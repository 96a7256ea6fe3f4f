//! The immutable read model published after every transition.
//!
//! This is exactly what `GET /status` returns. Readers hold an `Arc` to one
//! snapshot and never observe a half-applied transition.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
  estimate::{LeaveEstimate, wall_clock},
  history::HistoryEntry,
  station::StationStatus,
};

/// One station as seen by a display client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StationView {
  pub status:            StationStatus,
  pub occupant:          Option<String>,
  /// Display name of the occupant, if the card has been personalised.
  pub name:              Option<String>,
  pub since:             Option<DateTime<Utc>>,
  #[serde(with = "wall_clock::option", default)]
  pub estimated_free_at: Option<NaiveTime>,
}

impl StationView {
  /// The lenient answer for a station name the registry does not know.
  pub fn unknown() -> Self {
    Self {
      status:            StationStatus::Unknown,
      occupant:          None,
      name:              None,
      since:             None,
      estimated_free_at: None,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
  pub stations:           BTreeMap<String, StationView>,
  pub occupied_stations:  usize,
  /// The most recent entries, newest first. The full log is served
  /// separately.
  pub history:            Vec<HistoryEntry>,
  pub estimated_times:    Vec<LeaveEstimate>,
  /// Station → display name, for occupied stations with a named occupant.
  pub card_names:         BTreeMap<String, String>,
  #[serde(rename = "lastDetectedCard")]
  pub last_detected_card: Option<String>,
}

impl Snapshot {
  /// Look a station up; names that are not stations read as `unknown`.
  pub fn station(&self, name: &str) -> StationView {
    self.stations.get(name).cloned().unwrap_or_else(StationView::unknown)
  }

  pub fn estimate(&self, station: &str) -> Option<&LeaveEstimate> {
    self.estimated_times.iter().find(|e| e.station == station)
  }
}
