//! `tripdo` - a todo list and a trip log persisted in a local key-value store
//!
//! Both features keep an ordered list under one store key. Every change is
//! reduced in memory, written back as a whole, and adopted only once the
//! write succeeds. Writes are guarded by a revision stamp so concurrent
//! writers get a conflict instead of silently overwriting each other.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod cli;
pub mod config;
pub mod detail;
pub mod error;
pub mod id;
pub mod list_store;
pub mod logging;
pub mod storage;
pub mod todo;
pub mod trip;

#[cfg(test)]
mod test_support;

pub use config::Config;
pub use detail::TripDetail;
pub use error::{Error, Result};
pub use list_store::{ListStore, Versioned};
pub use logging::init_logging;
pub use storage::{KeyValueStore, Revision, SqliteStore, StoreStats};
pub use todo::{TodoId, TodoItem, Todos};
pub use trip::{TripDraft, TripForm, TripId, TripPolicy, TripRecord, Trips};
