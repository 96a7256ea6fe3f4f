//! [`SqliteStore`]: the SQLite implementation of [`OccupancyStore`].

use std::path::Path;

use rusqlite::OptionalExtension as _;

use perch_core::{
  journal::Change,
  store::{OccupancyStore, RegistryState},
};

use crate::{
  Result,
  encode::{RawCard, RawChange, RawHistory, RawStation, decode_seq},
  schema::SCHEMA,
};

const LAST_DETECTED_KEY: &str = "last_detected_card";
const NEXT_SEQ_KEY: &str = "next_history_seq";

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Perch registry journal backed by a single SQLite file.
///
/// Cloning is cheap: the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store: useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Number of history rows on disk, including those the registry evicted.
  pub async fn history_len(&self) -> Result<u64> {
    let n: i64 = self
      .conn
      .call(|conn| Ok(conn.query_row("SELECT COUNT(*) FROM history", [], |r| r.get(0))?))
      .await?;
    Ok(n as u64)
  }
}

fn write_change(tx: &rusqlite::Transaction<'_>, change: RawChange) -> rusqlite::Result<()> {
  match change {
    RawChange::Card(c) => {
      tx.execute(
        "INSERT INTO cards (uid, name, first_seen) VALUES (?1, ?2, ?3)
         ON CONFLICT (uid) DO UPDATE SET name = excluded.name",
        rusqlite::params![c.uid, c.name, c.first_seen],
      )?;
    }
    RawChange::Station(s) => {
      tx.execute(
        "INSERT INTO stations (name, occupant, since, leave_time, leave_occupant, leave_set_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)
         ON CONFLICT (name) DO UPDATE SET
           occupant       = excluded.occupant,
           since          = excluded.since,
           leave_time     = excluded.leave_time,
           leave_occupant = excluded.leave_occupant,
           leave_set_at   = excluded.leave_set_at",
        rusqlite::params![
          s.name,
          s.occupant,
          s.since,
          s.leave_time,
          s.leave_occupant,
          s.leave_set_at,
        ],
      )?;
    }
    RawChange::History(h) => {
      tx.execute(
        "INSERT INTO history (seq, uid, name, station, action, timestamp)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        rusqlite::params![h.seq, h.uid, h.name, h.station, h.action, h.timestamp],
      )?;
    }
    RawChange::LastDetected(uid) => {
      tx.execute(
        "INSERT INTO meta (key, value) VALUES (?1, ?2)
         ON CONFLICT (key) DO UPDATE SET value = excluded.value",
        rusqlite::params![LAST_DETECTED_KEY, uid],
      )?;
    }
    RawChange::Reset { next_seq } => {
      tx.execute_batch(
        "UPDATE stations SET occupant = NULL, since = NULL,
           leave_time = NULL, leave_occupant = NULL, leave_set_at = NULL;
         DELETE FROM history;",
      )?;
      tx.execute(
        "INSERT INTO meta (key, value) VALUES (?1, ?2)
         ON CONFLICT (key) DO UPDATE SET value = excluded.value",
        rusqlite::params![NEXT_SEQ_KEY, next_seq.to_string()],
      )?;
    }
  }
  Ok(())
}

// ─── OccupancyStore impl ─────────────────────────────────────────────────────

impl OccupancyStore for SqliteStore {
  type Error = crate::Error;

  async fn load(&self, history_limit: Option<usize>) -> Result<RegistryState> {
    // SQLite treats a negative LIMIT as "no limit".
    let limit = history_limit.map_or(-1, |n| n as i64);

    let (raw_stations, raw_cards, mut raw_history, last_detected, next_seq) = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT name, occupant, since, leave_time, leave_occupant, leave_set_at
           FROM stations",
        )?;
        let stations = stmt
          .query_map([], |row| {
            Ok(RawStation {
              name:           row.get(0)?,
              occupant:       row.get(1)?,
              since:          row.get(2)?,
              leave_time:     row.get(3)?,
              leave_occupant: row.get(4)?,
              leave_set_at:   row.get(5)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut stmt = conn.prepare("SELECT uid, name, first_seen FROM cards")?;
        let cards = stmt
          .query_map([], |row| {
            Ok(RawCard {
              uid:        row.get(0)?,
              name:       row.get(1)?,
              first_seen: row.get(2)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut stmt = conn.prepare(
          "SELECT seq, uid, name, station, action, timestamp
           FROM history ORDER BY seq DESC LIMIT ?1",
        )?;
        let history = stmt
          .query_map(rusqlite::params![limit], |row| {
            Ok(RawHistory {
              seq:       row.get(0)?,
              uid:       row.get(1)?,
              name:      row.get(2)?,
              station:   row.get(3)?,
              action:    row.get(4)?,
              timestamp: row.get(5)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;

        let meta = |key: &str| {
          conn
            .query_row("SELECT value FROM meta WHERE key = ?1", rusqlite::params![key], |r| {
              r.get::<_, String>(0)
            })
            .optional()
        };
        let last_detected = meta(LAST_DETECTED_KEY)?;
        let next_seq = meta(NEXT_SEQ_KEY)?;

        Ok((stations, cards, history, last_detected, next_seq))
      })
      .await?;

    raw_history.reverse();

    Ok(RegistryState {
      stations: raw_stations
        .into_iter()
        .map(RawStation::into_station)
        .collect::<Result<_>>()?,
      cards: raw_cards.into_iter().map(RawCard::into_card).collect::<Result<_>>()?,
      history: raw_history
        .into_iter()
        .map(RawHistory::into_entry)
        .collect::<Result<_>>()?,
      last_detected,
      next_seq: next_seq.as_deref().map(decode_seq).transpose()?.unwrap_or(0),
    })
  }

  async fn apply(&self, changes: Vec<Change>) -> Result<()> {
    if changes.is_empty() {
      return Ok(());
    }
    let raws: Vec<RawChange> = changes.iter().map(RawChange::from).collect();

    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        for raw in raws {
          write_change(&tx, raw)?;
        }
        tx.commit()?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}
