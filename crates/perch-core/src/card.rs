//! RFID cards: the identities that occupy stations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A badge registration keyed by its UID.
///
/// A card exists unnamed from its first sighting until it is personalised.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Card {
  pub uid:        String,
  pub name:       Option<String>,
  pub first_seen: DateTime<Utc>,
}

impl Card {
  pub fn sighted(uid: impl Into<String>, at: DateTime<Utc>) -> Self {
    Self { uid: uid.into(), name: None, first_seen: at }
  }
}

/// Outcome of looking a UID up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum Resolution {
  Known { name: String },
  Unknown,
}

impl Resolution {
  pub fn of(card: &Card) -> Self {
    match &card.name {
      Some(name) => Self::Known { name: name.clone() },
      None => Self::Unknown,
    }
  }

  pub fn name(&self) -> Option<&str> {
    match self {
      Self::Known { name } => Some(name),
      Self::Unknown => None,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn resolution_json_shape() {
    let known = Resolution::Known { name: "Alice".into() };
    assert_eq!(
      serde_json::to_value(&known).unwrap(),
      serde_json::json!({ "status": "known", "name": "Alice" })
    );
    assert_eq!(
      serde_json::to_value(Resolution::Unknown).unwrap(),
      serde_json::json!({ "status": "unknown" })
    );
  }
}
