//! Station occupancy registry for Perch.
//!
//! Holds stations, RFID cards, the entry/exit history and leave-time
//! estimates. Has no HTTP or database code: persistence is reached through
//! the [`journal::Journal`] and [`store::OccupancyStore`] seams.

pub mod card;
pub mod error;
pub mod estimate;
pub mod history;
pub mod journal;
pub mod registry;
pub mod service;
pub mod snapshot;
pub mod station;
pub mod store;

pub use error::{Error, Result};
pub use registry::Registry;
pub use service::OccupancyService;
pub use snapshot::Snapshot;
