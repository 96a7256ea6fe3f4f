//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! All timestamps are stored as RFC 3339 strings, wall-clock leave times as
//! `HH:MM:SS`, history actions by their lowercase name.

use std::str::FromStr as _;

use chrono::{DateTime, NaiveTime, Utc};
use perch_core::{
  card::Card,
  estimate::LeaveEstimate,
  history::{Action, HistoryEntry},
  journal::Change,
  station::Station,
};

use crate::{Error, Result};

// ─── DateTime<Utc> / NaiveTime ────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

pub fn encode_time(t: NaiveTime) -> String { t.format("%H:%M:%S").to_string() }

pub fn decode_time(s: &str) -> Result<NaiveTime> {
  NaiveTime::parse_from_str(s, "%H:%M:%S").map_err(|e| Error::DateParse(e.to_string()))
}

// ─── Action ───────────────────────────────────────────────────────────────────

pub fn decode_action(s: &str) -> Result<Action> {
  Action::from_str(s).map_err(|_| Error::UnknownAction(s.to_owned()))
}

// ─── Counters ─────────────────────────────────────────────────────────────────

pub fn decode_seq(s: &str) -> Result<u64> {
  s.parse().map_err(|_| Error::BadCounter(s.to_owned()))
}

// ─── Raw rows ─────────────────────────────────────────────────────────────────

/// Row of the `cards` table.
pub struct RawCard {
  pub uid:        String,
  pub name:       Option<String>,
  pub first_seen: String,
}

impl RawCard {
  pub fn encode(card: &Card) -> Self {
    Self {
      uid:        card.uid.clone(),
      name:       card.name.clone(),
      first_seen: encode_dt(card.first_seen),
    }
  }

  pub fn into_card(self) -> Result<Card> {
    Ok(Card {
      uid:        self.uid,
      name:       self.name,
      first_seen: decode_dt(&self.first_seen)?,
    })
  }
}

/// Row of the `stations` table.
pub struct RawStation {
  pub name:           String,
  pub occupant:       Option<String>,
  pub since:          Option<String>,
  pub leave_time:     Option<String>,
  pub leave_occupant: Option<String>,
  pub leave_set_at:   Option<String>,
}

impl RawStation {
  pub fn encode(station: &Station) -> Self {
    let estimate = station.estimate.as_ref();
    Self {
      name:           station.name.clone(),
      occupant:       station.occupant.clone(),
      since:          station.since.map(encode_dt),
      leave_time:     estimate.map(|e| encode_time(e.time)),
      leave_occupant: estimate.map(|e| e.occupant.clone()),
      leave_set_at:   estimate.map(|e| encode_dt(e.set_at)),
    }
  }

  pub fn into_station(self) -> Result<Station> {
    let estimate = match (self.leave_time, self.leave_occupant, self.leave_set_at) {
      (Some(time), Some(occupant), Some(set_at)) => Some(LeaveEstimate {
        station: self.name.clone(),
        time: decode_time(&time)?,
        occupant,
        set_at: decode_dt(&set_at)?,
      }),
      _ => None,
    };

    Ok(Station {
      name: self.name,
      occupant: self.occupant,
      since: self.since.as_deref().map(decode_dt).transpose()?,
      estimate,
    })
  }
}

/// Row of the `history` table.
pub struct RawHistory {
  pub seq:       i64,
  pub uid:       String,
  pub name:      Option<String>,
  pub station:   String,
  pub action:    String,
  pub timestamp: String,
}

impl RawHistory {
  pub fn encode(entry: &HistoryEntry) -> Self {
    Self {
      seq:       entry.seq as i64,
      uid:       entry.uid.clone(),
      name:      entry.name.clone(),
      station:   entry.station.clone(),
      action:    entry.action.to_string(),
      timestamp: encode_dt(entry.timestamp),
    }
  }

  pub fn into_entry(self) -> Result<HistoryEntry> {
    Ok(HistoryEntry {
      seq:       self.seq as u64,
      uid:       self.uid,
      name:      self.name,
      station:   self.station,
      action:    decode_action(&self.action)?,
      timestamp: decode_dt(&self.timestamp)?,
    })
  }
}

/// A [`Change`] reduced to column values, ready to move onto the database
/// thread.
pub enum RawChange {
  Card(RawCard),
  Station(RawStation),
  History(RawHistory),
  LastDetected(String),
  Reset { next_seq: i64 },
}

impl From<&Change> for RawChange {
  fn from(change: &Change) -> Self {
    match change {
      Change::CardUpserted(card) => Self::Card(RawCard::encode(card)),
      Change::StationUpdated(station) => Self::Station(RawStation::encode(station)),
      Change::HistoryAppended(entry) => Self::History(RawHistory::encode(entry)),
      Change::LastDetected { uid } => Self::LastDetected(uid.clone()),
      Change::Reset { next_seq } => Self::Reset { next_seq: *next_seq as i64 },
    }
  }
}
