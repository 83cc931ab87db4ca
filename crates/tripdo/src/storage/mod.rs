//! Key-value storage for tripdo.
//!
//! Lists are persisted as whole serialized values under a named key. The
//! [`KeyValueStore`] trait is the boundary the list store talks to;
//! [`SqliteStore`] is the durable implementation backed by a single `SQLite`
//! file.

pub mod schema;

use std::fmt;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use tracing::{debug, info};

use crate::error::{Error, Result};

/// Content stamp of a stored value.
///
/// Two reads returning the same revision saw the same bytes. Used to detect
/// lost updates in the load-modify-save cycle.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Revision(String);

impl Revision {
    /// Compute the revision of a stored value.
    #[must_use]
    pub fn of(value: &str) -> Self {
        Self(blake3::hash(value.as_bytes()).to_hex().to_string())
    }

    /// The hex digest.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0[..12])
    }
}

/// Durable string-valued key-value storage.
pub trait KeyValueStore {
    /// Read the value stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be read.
    fn get_item(&self, key: &str) -> Result<Option<String>>;

    /// Store `value` under `key`, replacing any prior value.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be written.
    fn set_item(&self, key: &str, value: &str) -> Result<()>;

    /// Remove the value under `key`. Removing an absent key succeeds.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be written.
    fn remove_item(&self, key: &str) -> Result<()>;

    /// Atomically replace the value under `key` if its current revision
    /// equals `expected` (`None` meaning absent). A `value` of `None` removes
    /// the key.
    ///
    /// Returns `false` without writing when the revision did not match.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be read or written.
    fn swap_item(&self, key: &str, expected: Option<&Revision>, value: Option<&str>)
        -> Result<bool>;
}

impl<S: KeyValueStore + ?Sized> KeyValueStore for &S {
    fn get_item(&self, key: &str) -> Result<Option<String>> {
        (**self).get_item(key)
    }

    fn set_item(&self, key: &str, value: &str) -> Result<()> {
        (**self).set_item(key, value)
    }

    fn remove_item(&self, key: &str) -> Result<()> {
        (**self).remove_item(key)
    }

    fn swap_item(
        &self,
        key: &str,
        expected: Option<&Revision>,
        value: Option<&str>,
    ) -> Result<bool> {
        (**self).swap_item(key, expected, value)
    }
}

/// `SQLite`-backed key-value store.
#[derive(Debug)]
pub struct SqliteStore {
    /// Path to the database file.
    path: PathBuf,
    /// Database connection.
    conn: Connection,
}

impl SqliteStore {
    /// Open or create a store at the given path.
    ///
    /// Creates the parent directories and database file if they don't exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or the schema cannot
    /// be initialized.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|source| Error::DirectoryCreate {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
        }

        debug!("Opening database at {}", path.display());
        let conn = Connection::open(&path).map_err(|source| Error::DatabaseOpen {
            path: path.clone(),
            source,
        })?;

        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;
        schema::initialize(&conn)?;

        info!("Database opened at {}", path.display());
        Ok(Self { path, conn })
    }

    /// Create an in-memory store.
    ///
    /// # Errors
    ///
    /// Returns an error if the in-memory database cannot be created.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|source| Error::DatabaseOpen {
            path: PathBuf::from(":memory:"),
            source,
        })?;

        schema::initialize(&conn)?;

        Ok(Self {
            path: PathBuf::from(":memory:"),
            conn,
        })
    }

    /// Get the path to the database file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Get the revision of the value under `key`, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn revision(&self, key: &str) -> Result<Option<Revision>> {
        read_revision(&self.conn, key)
    }

    /// List all stored keys in alphabetical order.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn keys(&self) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare("SELECT key FROM kv_items ORDER BY key")?;
        let keys = stmt
            .query_map([], |row| row.get(0))?
            .collect::<std::result::Result<Vec<String>, _>>()?;
        Ok(keys)
    }

    /// Get store statistics.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn stats(&self) -> Result<StoreStats> {
        let (keys, bytes, last): (i64, i64, Option<String>) = self.conn.query_row(
            "SELECT COUNT(*), COALESCE(SUM(LENGTH(value)), 0), MAX(updated_at) FROM kv_items",
            [],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )?;

        let last_updated = last
            .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
            .map(|dt| dt.with_timezone(&Utc));

        let db_size_bytes = if self.path.to_string_lossy() == ":memory:" {
            0
        } else {
            std::fs::metadata(&self.path).map(|m| m.len()).unwrap_or(0)
        };

        Ok(StoreStats {
            keys: usize::try_from(keys).unwrap_or(0),
            value_bytes: u64::try_from(bytes).unwrap_or(0),
            last_updated,
            db_size_bytes,
        })
    }
}

impl KeyValueStore for SqliteStore {
    fn get_item(&self, key: &str) -> Result<Option<String>> {
        let value = self
            .conn
            .query_row("SELECT value FROM kv_items WHERE key = ?1", [key], |row| {
                row.get(0)
            })
            .optional()?;
        debug!(key, found = value.is_some(), "Read item");
        Ok(value)
    }

    fn set_item(&self, key: &str, value: &str) -> Result<()> {
        write_value(&self.conn, key, value)
    }

    fn remove_item(&self, key: &str) -> Result<()> {
        delete_value(&self.conn, key)
    }

    fn swap_item(
        &self,
        key: &str,
        expected: Option<&Revision>,
        value: Option<&str>,
    ) -> Result<bool> {
        let tx = self.conn.unchecked_transaction()?;

        let current = read_revision(&tx, key)?;
        if current.as_ref() != expected {
            debug!(key, "Revision mismatch, refusing to write");
            return Ok(false);
        }

        match value {
            Some(value) => write_value(&tx, key, value)?,
            None => delete_value(&tx, key)?,
        }
        tx.commit()?;
        Ok(true)
    }
}

fn read_revision(conn: &Connection, key: &str) -> Result<Option<Revision>> {
    let revision = conn
        .query_row(
            "SELECT revision FROM kv_items WHERE key = ?1",
            [key],
            |row| row.get(0),
        )
        .optional()?;
    Ok(revision.map(Revision))
}

fn write_value(conn: &Connection, key: &str, value: &str) -> Result<()> {
    let revision = Revision::of(value);
    conn.execute(
        r"
        INSERT INTO kv_items (key, value, revision, updated_at)
        VALUES (?1, ?2, ?3, ?4)
        ON CONFLICT(key) DO UPDATE SET
            value = excluded.value,
            revision = excluded.revision,
            updated_at = excluded.updated_at
        ",
        params![key, value, revision.as_str(), Utc::now().to_rfc3339()],
    )?;
    debug!(key, bytes = value.len(), %revision, "Wrote item");
    Ok(())
}

fn delete_value(conn: &Connection, key: &str) -> Result<()> {
    let affected = conn.execute("DELETE FROM kv_items WHERE key = ?1", [key])?;
    debug!(key, removed = affected > 0, "Removed item");
    Ok(())
}

/// Statistics about the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreStats {
    /// Number of stored keys.
    pub keys: usize,
    /// Total size of all stored values in bytes.
    pub value_bytes: u64,
    /// When any value was last written.
    pub last_updated: Option<DateTime<Utc>>,
    /// Size of the database file in bytes.
    pub db_size_bytes: u64,
}
