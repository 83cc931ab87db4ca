//! Shared helpers for unit tests.

use std::cell::Cell;

use crate::error::Result;
use crate::storage::{KeyValueStore, Revision, SqliteStore};

/// An in-memory store whose writes can be made to fail on demand.
#[derive(Debug)]
pub struct FlakyStore {
    inner: SqliteStore,
    fail_writes: Cell<bool>,
}

impl FlakyStore {
    pub fn new() -> Self {
        Self {
            inner: SqliteStore::open_in_memory().expect("failed to create test store"),
            fail_writes: Cell::new(false),
        }
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.set(fail);
    }

    fn check(&self) -> Result<()> {
        if self.fail_writes.get() {
            return Err(rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_FULL),
                Some("database or disk is full".to_string()),
            )
            .into());
        }
        Ok(())
    }
}

impl KeyValueStore for FlakyStore {
    fn get_item(&self, key: &str) -> Result<Option<String>> {
        self.inner.get_item(key)
    }

    fn set_item(&self, key: &str, value: &str) -> Result<()> {
        self.check()?;
        self.inner.set_item(key, value)
    }

    fn remove_item(&self, key: &str) -> Result<()> {
        self.check()?;
        self.inner.remove_item(key)
    }

    fn swap_item(
        &self,
        key: &str,
        expected: Option<&Revision>,
        value: Option<&str>,
    ) -> Result<bool> {
        self.check()?;
        self.inner.swap_item(key, expected, value)
    }
}
