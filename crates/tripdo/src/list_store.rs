//! Whole-value persistence of record lists.
//!
//! A [`ListStore`] reads and writes one ordered list under one key. Every
//! save serializes the entire list; there are no partial updates.

use std::marker::PhantomData;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::storage::{KeyValueStore, Revision};

/// A list loaded together with the revision it was read at.
#[derive(Debug, Clone, PartialEq)]
pub struct Versioned<T> {
    /// The loaded records.
    pub items: Vec<T>,
    /// Revision of the stored value, `None` when nothing was stored.
    pub revision: Option<Revision>,
}

impl<T> Default for Versioned<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            revision: None,
        }
    }
}

/// Typed load/save/clear of the list stored under a single key.
#[derive(Debug)]
pub struct ListStore<S, T> {
    store: S,
    key: String,
    _record: PhantomData<fn() -> T>,
}

impl<S, T> ListStore<S, T>
where
    S: KeyValueStore,
    T: Serialize + DeserializeOwned,
{
    /// Bind a list of `T` to `key` in `store`.
    pub fn new(store: S, key: impl Into<String>) -> Self {
        Self {
            store,
            key: key.into(),
            _record: PhantomData,
        }
    }

    /// The storage key this list lives under.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Load the list. An absent value is an empty list.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CorruptedStore`] if the stored text does not parse,
    /// or a storage error if the backend cannot be read.
    pub fn load(&self) -> Result<Vec<T>> {
        self.load_versioned().map(|v| v.items)
    }

    /// Load the list along with its revision.
    ///
    /// # Errors
    ///
    /// Same as [`ListStore::load`].
    pub fn load_versioned(&self) -> Result<Versioned<T>> {
        let Some(raw) = self.store.get_item(&self.key)? else {
            debug!(key = %self.key, "No stored list, starting empty");
            return Ok(Versioned::default());
        };

        let items = serde_json::from_str(&raw).map_err(|source| Error::CorruptedStore {
            key: self.key.clone(),
            source,
        })?;
        Ok(Versioned {
            items,
            revision: Some(Revision::of(&raw)),
        })
    }

    /// Load the list, treating a corrupted value as an empty list.
    ///
    /// The returned revision is that of the corrupted text, so the next
    /// versioned save overwrites it.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the backend cannot be read.
    pub fn load_lenient(&self) -> Result<Versioned<T>> {
        let Some(raw) = self.store.get_item(&self.key)? else {
            return Ok(Versioned::default());
        };

        let revision = Some(Revision::of(&raw));
        match serde_json::from_str(&raw) {
            Ok(items) => Ok(Versioned { items, revision }),
            Err(e) => {
                warn!(key = %self.key, error = %e, "Stored list is corrupted, starting empty");
                Ok(Versioned {
                    items: Vec::new(),
                    revision,
                })
            }
        }
    }

    /// Replace the stored list unconditionally.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the write fails.
    pub fn save(&self, items: &[T]) -> Result<Revision> {
        let raw = serde_json::to_string(items)?;
        self.store.set_item(&self.key, &raw)?;
        Ok(Revision::of(&raw))
    }

    /// Replace the stored list only if it is still at `expected`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Conflict`] if another writer changed the value since
    /// `expected` was read, or an error if serialization or the write fails.
    pub fn save_versioned(&self, items: &[T], expected: Option<&Revision>) -> Result<Revision> {
        let raw = serde_json::to_string(items)?;
        if !self.store.swap_item(&self.key, expected, Some(&raw))? {
            return Err(Error::conflict(&self.key));
        }
        debug!(key = %self.key, count = items.len(), "Saved list");
        Ok(Revision::of(&raw))
    }

    /// Remove the stored list. Subsequent loads return an empty list.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be written.
    pub fn clear(&self) -> Result<()> {
        self.store.remove_item(&self.key)?;
        info!(key = %self.key, "Cleared list");
        Ok(())
    }

    /// Remove the stored list only if it is still at `expected`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Conflict`] if another writer changed the value, or an
    /// error if the backend cannot be written.
    pub fn clear_versioned(&self, expected: Option<&Revision>) -> Result<()> {
        if !self.store.swap_item(&self.key, expected, None)? {
            return Err(Error::conflict(&self.key));
        }
        info!(key = %self.key, "Cleared list");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::SqliteStore;
    use serde::Deserialize;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Note {
        id: i64,
        body: String,
    }

    fn note(id: i64, body: &str) -> Note {
        Note {
            id,
            body: body.to_string(),
        }
    }

    fn create_test_store() -> SqliteStore {
        SqliteStore::open_in_memory().expect("failed to create test store")
    }

    #[test]
    fn test_load_empty_store() {
        let store = create_test_store();
        let list: ListStore<_, Note> = ListStore::new(&store, "notes");

        assert!(list.load().unwrap().is_empty());
        assert_eq!(list.load_versioned().unwrap().revision, None);
    }

    #[test]
    fn test_save_then_load() {
        let store = create_test_store();
        let list = ListStore::new(&store, "notes");
        let notes = vec![note(1, "first"), note(2, "second")];

        list.save(&notes).unwrap();
        assert_eq!(list.load().unwrap(), notes);
    }

    #[test]
    fn test_save_replaces_whole_list() {
        let store = create_test_store();
        let list = ListStore::new(&store, "notes");

        list.save(&[note(1, "a"), note(2, "b")]).unwrap();
        list.save(&[note(3, "c")]).unwrap();

        assert_eq!(list.load().unwrap(), vec![note(3, "c")]);
    }

    #[test]
    fn test_clear() {
        let store = create_test_store();
        let list = ListStore::new(&store, "notes");

        list.save(&[note(1, "a")]).unwrap();
        list.clear().unwrap();

        assert!(list.load().unwrap().is_empty());
        assert_eq!(store.get_item("notes").unwrap(), None);
    }

    #[test]
    fn test_corrupted_value() {
        let store = create_test_store();
        store.set_item("notes", "{not json").unwrap();
        let list: ListStore<_, Note> = ListStore::new(&store, "notes");

        let err = list.load().unwrap_err();
        assert!(err.is_corrupted());
        assert!(err.to_string().contains("notes"));
    }

    #[test]
    fn test_wrong_shape_is_corrupted() {
        let store = create_test_store();
        store.set_item("notes", r#"{"id": 1}"#).unwrap();
        let list: ListStore<_, Note> = ListStore::new(&store, "notes");

        assert!(list.load().unwrap_err().is_corrupted());
    }

    #[test]
    fn test_lists_are_independent() {
        let store = create_test_store();
        let a = ListStore::new(&store, "a");
        let b: ListStore<_, Note> = ListStore::new(&store, "b");

        a.save(&[note(1, "only in a")]).unwrap();
        assert!(b.load().unwrap().is_empty());
    }

    #[test]
    fn test_save_versioned_detects_stale_revision() {
        let store = create_test_store();
        let list = ListStore::new(&store, "notes");
        list.save(&[note(1, "a")]).unwrap();

        let seen = list.load_versioned().unwrap();
        list.save(&[note(1, "a"), note(2, "from elsewhere")]).unwrap();

        let err = list
            .save_versioned(&[note(9, "stale")], seen.revision.as_ref())
            .unwrap_err();
        assert!(err.is_conflict());
        assert_eq!(list.load().unwrap().len(), 2);
    }

    #[test]
    fn test_save_versioned_returns_new_revision() {
        let store = create_test_store();
        let list = ListStore::new(&store, "notes");

        let first = list.save_versioned(&[note(1, "a")], None).unwrap();
        let second = list
            .save_versioned(&[note(1, "b")], Some(&first))
            .unwrap();

        assert_ne!(first, second);
        assert_eq!(list.load_versioned().unwrap().revision, Some(second));
    }

    #[test]
    fn test_revision_matches_loaded_text() {
        let store = create_test_store();
        let list = ListStore::new(&store, "notes");

        let saved = list.save(&[note(1, "a")]).unwrap();
        assert_eq!(list.load_versioned().unwrap().revision, Some(saved));
    }

    #[test]
    fn test_load_lenient_recovers_from_corruption() {
        let store = create_test_store();
        store.set_item("notes", "[{]").unwrap();
        let list: ListStore<_, Note> = ListStore::new(&store, "notes");

        let loaded = list.load_lenient().unwrap();
        assert!(loaded.items.is_empty());
        assert_eq!(loaded.revision, Some(Revision::of("[{]")));

        list.save_versioned(&[note(1, "fresh")], loaded.revision.as_ref())
            .unwrap();
        assert_eq!(list.load().unwrap(), vec![note(1, "fresh")]);
    }

    #[test]
    fn test_load_lenient_valid_value() {
        let store = create_test_store();
        let list = ListStore::new(&store, "notes");
        list.save(&[note(1, "a")]).unwrap();

        assert_eq!(list.load_lenient().unwrap().items, vec![note(1, "a")]);
    }

    #[test]
    fn test_clear_versioned() {
        let store = create_test_store();
        let list = ListStore::new(&store, "notes");
        let rev = list.save(&[note(1, "a")]).unwrap();

        list.save(&[note(2, "b")]).unwrap();
        assert!(list.clear_versioned(Some(&rev)).unwrap_err().is_conflict());

        let current = list.load_versioned().unwrap().revision;
        list.clear_versioned(current.as_ref()).unwrap();
        assert!(list.load().unwrap().is_empty());
    }

    #[test]
    fn test_key_accessor() {
        let store = create_test_store();
        let list: ListStore<_, Note> = ListStore::new(&store, "@todos");
        assert_eq!(list.key(), "@todos");
    }
}
