//! Stations: the fixed set of physical places a badge can occupy.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::estimate::LeaveEstimate;

/// The externally visible state of a station.
///
/// `Unknown` is never stored; it is what a read returns for a name that is
/// not a registered station.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum StationStatus {
  Free,
  Occupied,
  Unknown,
}

/// A station and its current occupant.
///
/// The status is derived from `occupant`, so "occupied iff an occupant is
/// bound" cannot be violated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Station {
  pub name:     String,
  /// UID of the card currently bound to the station.
  pub occupant: Option<String>,
  /// When the current occupant entered.
  pub since:    Option<DateTime<Utc>>,
  pub estimate: Option<LeaveEstimate>,
}

impl Station {
  pub fn new(name: impl Into<String>) -> Self {
    Self { name: name.into(), occupant: None, since: None, estimate: None }
  }

  pub fn status(&self) -> StationStatus {
    if self.occupant.is_some() {
      StationStatus::Occupied
    } else {
      StationStatus::Free
    }
  }

  pub fn is_occupied(&self) -> bool { self.occupant.is_some() }

  /// Return the station to free, dropping occupant and estimate together.
  pub(crate) fn vacate(&mut self) {
    self.occupant = None;
    self.since = None;
    self.estimate = None;
  }
}
