//! Planned departure times announced by a station's occupant.

use chrono::{DateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// When the current occupant of `station` expects to leave.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaveEstimate {
  pub station:  String,
  #[serde(with = "wall_clock")]
  pub time:     NaiveTime,
  /// UID that occupied the station when the estimate was set.
  pub occupant: String,
  pub set_at:   DateTime<Utc>,
}

/// Parse a wall-clock time as submitted by a client (`HH:MM` or `HH:MM:SS`).
pub fn parse_leave_time(input: &str) -> Result<NaiveTime> {
  let input = input.trim();
  if input.is_empty() {
    return Err(Error::Validation("leave_time must not be empty".into()));
  }
  NaiveTime::parse_from_str(input, "%H:%M")
    .or_else(|_| NaiveTime::parse_from_str(input, "%H:%M:%S"))
    .map_err(|_| {
      Error::Validation(format!("invalid leave_time {input:?}, expected HH:MM"))
    })
}

/// `HH:MM` on the wire; seconds are dropped on output.
pub mod wall_clock {
  use chrono::NaiveTime;
  use serde::{Deserialize, Deserializer, Serializer, de};

  pub fn serialize<S: Serializer>(
    time: &NaiveTime,
    serializer: S,
  ) -> Result<S::Ok, S::Error> {
    serializer.collect_str(&time.format("%H:%M"))
  }

  pub fn deserialize<'de, D: Deserializer<'de>>(
    deserializer: D,
  ) -> Result<NaiveTime, D::Error> {
    let raw = String::deserialize(deserializer)?;
    super::parse_leave_time(&raw).map_err(de::Error::custom)
  }

  /// Same as the parent module, for `Option<NaiveTime>` fields.
  pub mod option {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer, de};

    pub fn serialize<S: Serializer>(
      time: &Option<NaiveTime>,
      serializer: S,
    ) -> Result<S::Ok, S::Error> {
      match time {
        Some(t) => serializer.collect_str(&t.format("%H:%M")),
        None => serializer.serialize_none(),
      }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
      deserializer: D,
    ) -> Result<Option<NaiveTime>, D::Error> {
      Option::<String>::deserialize(deserializer)?
        .map(|raw| crate::estimate::parse_leave_time(&raw).map_err(de::Error::custom))
        .transpose()
    }
  }
}
