//! The todo list feature.
//!
//! State transitions are pure: [`reduce`] takes the current items and a
//! [`TodoAction`] and returns the next items, or `None` when the action
//! changes nothing. [`Todos`] wraps those transitions with persistence: it
//! writes the next list first and only then adopts it in memory, so a failed
//! write leaves the visible state untouched.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::Result;
use crate::id::next_id;
use crate::list_store::ListStore;
use crate::storage::{KeyValueStore, Revision};

/// Identifier of a todo item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TodoId(i64);

impl TodoId {
    /// Wrap a raw id.
    #[must_use]
    pub const fn new(raw: i64) -> Self {
        Self(raw)
    }

    /// The raw id value.
    #[must_use]
    pub const fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for TodoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A single todo item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TodoItem {
    /// Unique identifier.
    pub id: TodoId,
    /// The text as entered.
    pub text: String,
    /// Whether the item is done.
    pub completed: bool,
}

impl TodoItem {
    /// Create an open item.
    #[must_use]
    pub fn new(id: TodoId, text: impl Into<String>) -> Self {
        Self {
            id,
            text: text.into(),
            completed: false,
        }
    }
}

/// A change to the todo list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TodoAction {
    /// Append a new item.
    Add {
        /// Id for the new item.
        id: TodoId,
        /// Item text.
        text: String,
    },
    /// Remove an item.
    Delete {
        /// Item to remove.
        id: TodoId,
    },
    /// Replace an item's text.
    Rename {
        /// Item to rename.
        id: TodoId,
        /// New text.
        text: String,
    },
    /// Flip an item's completed flag.
    Toggle {
        /// Item to toggle.
        id: TodoId,
    },
}

/// Apply `action` to `items`, returning the next list.
///
/// Returns `None` when the action is a no-op: blank text, or an id that is
/// not in the list.
#[must_use]
pub fn reduce(items: &[TodoItem], action: &TodoAction) -> Option<Vec<TodoItem>> {
    match action {
        TodoAction::Add { id, text } => {
            if text.trim().is_empty() {
                return None;
            }
            let mut next = items.to_vec();
            next.push(TodoItem::new(*id, text.clone()));
            Some(next)
        }
        TodoAction::Delete { id } => {
            if !items.iter().any(|t| t.id == *id) {
                return None;
            }
            Some(items.iter().filter(|t| t.id != *id).cloned().collect())
        }
        TodoAction::Rename { id, text } => {
            if text.trim().is_empty() || !items.iter().any(|t| t.id == *id) {
                return None;
            }
            Some(
                items
                    .iter()
                    .map(|t| {
                        if t.id == *id {
                            TodoItem {
                                text: text.clone(),
                                ..t.clone()
                            }
                        } else {
                            t.clone()
                        }
                    })
                    .collect(),
            )
        }
        TodoAction::Toggle { id } => {
            if !items.iter().any(|t| t.id == *id) {
                return None;
            }
            Some(
                items
                    .iter()
                    .map(|t| {
                        if t.id == *id {
                            TodoItem {
                                completed: !t.completed,
                                ..t.clone()
                            }
                        } else {
                            t.clone()
                        }
                    })
                    .collect(),
            )
        }
    }
}

/// An in-progress text edit. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditSession {
    /// The item being edited.
    pub id: TodoId,
    /// The edit buffer.
    pub buffer: String,
}

/// The todo list, mirrored from its persisted copy.
#[derive(Debug)]
pub struct Todos<S> {
    list: ListStore<S, TodoItem>,
    items: Vec<TodoItem>,
    revision: Option<Revision>,
    editing: Option<EditSession>,
}

impl<S: KeyValueStore> Todos<S> {
    /// Load the todo list from `list`.
    ///
    /// A corrupted stored value is logged and treated as an empty list.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub fn open(list: ListStore<S, TodoItem>) -> Result<Self> {
        let loaded = list.load_lenient()?;
        debug!(count = loaded.items.len(), "Loaded todos");
        Ok(Self {
            list,
            items: loaded.items,
            revision: loaded.revision,
            editing: None,
        })
    }

    /// The current items in insertion order.
    #[must_use]
    pub fn items(&self) -> &[TodoItem] {
        &self.items
    }

    /// Look up an item.
    #[must_use]
    pub fn get(&self, id: TodoId) -> Option<&TodoItem> {
        self.items.iter().find(|t| t.id == id)
    }

    /// Number of items.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the list is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Number of completed items.
    #[must_use]
    pub fn completed_count(&self) -> usize {
        self.items.iter().filter(|t| t.completed).count()
    }

    /// Persist the result of `action`, then adopt it.
    ///
    /// Returns `false` if the action was a no-op.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails or the stored list changed since
    /// it was loaded. In-memory state is unchanged on error.
    pub fn apply(&mut self, action: &TodoAction) -> Result<bool> {
        let Some(next) = reduce(&self.items, action) else {
            debug!(?action, "Todo action was a no-op");
            return Ok(false);
        };

        let revision = self.list.save_versioned(&next, self.revision.as_ref())?;
        self.items = next;
        self.revision = Some(revision);
        Ok(true)
    }

    /// Add an item with `text`. Blank text is ignored.
    ///
    /// # Errors
    ///
    /// See [`Todos::apply`].
    pub fn add(&mut self, text: &str) -> Result<Option<TodoId>> {
        let id = TodoId(next_id(self.items.iter().map(|t| t.id.0)));
        let added = self.apply(&TodoAction::Add {
            id,
            text: text.to_string(),
        })?;
        if added {
            info!(%id, "Added todo");
        }
        Ok(added.then_some(id))
    }

    /// Delete an item. Unknown ids are ignored.
    ///
    /// # Errors
    ///
    /// See [`Todos::apply`].
    pub fn delete(&mut self, id: TodoId) -> Result<bool> {
        let deleted = self.apply(&TodoAction::Delete { id })?;
        if deleted && self.editing.as_ref().is_some_and(|e| e.id == id) {
            self.editing = None;
        }
        Ok(deleted)
    }

    /// Flip an item's completed flag. Unknown ids are ignored.
    ///
    /// # Errors
    ///
    /// See [`Todos::apply`].
    pub fn toggle_completed(&mut self, id: TodoId) -> Result<bool> {
        self.apply(&TodoAction::Toggle { id })
    }

    /// Start editing an item, seeding the buffer with its text.
    ///
    /// Returns `false` if the id is unknown.
    pub fn begin_edit(&mut self, id: TodoId) -> bool {
        let Some(item) = self.get(id) else {
            return false;
        };
        self.editing = Some(EditSession {
            id,
            buffer: item.text.clone(),
        });
        true
    }

    /// The edit in progress, if any.
    #[must_use]
    pub fn editing(&self) -> Option<&EditSession> {
        self.editing.as_ref()
    }

    /// Replace the edit buffer. Ignored when no edit is in progress.
    pub fn set_edit_text(&mut self, text: impl Into<String>) {
        if let Some(session) = self.editing.as_mut() {
            session.buffer = text.into();
        }
    }

    /// Abandon the edit in progress.
    pub fn cancel_edit(&mut self) {
        self.editing = None;
    }

    /// Save the edit buffer as the item's new text and end the edit.
    ///
    /// A blank buffer is a no-op and keeps the edit open.
    ///
    /// # Errors
    ///
    /// See [`Todos::apply`]. The edit stays open on error.
    pub fn commit_edit(&mut self) -> Result<bool> {
        let Some(session) = self.editing.as_ref() else {
            return Ok(false);
        };
        if session.buffer.trim().is_empty() {
            return Ok(false);
        }

        let action = TodoAction::Rename {
            id: session.id,
            text: session.buffer.clone(),
        };
        let renamed = self.apply(&action)?;
        self.editing = None;
        Ok(renamed)
    }

    /// Re-read the list from the store, dropping unsaved edit state for
    /// items that no longer exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub fn reload(&mut self) -> Result<()> {
        let loaded = self.list.load_lenient()?;
        self.items = loaded.items;
        self.revision = loaded.revision;
        if self
            .editing
            .as_ref()
            .is_some_and(|e| self.get(e.id).is_none())
        {
            self.editing = None;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::SqliteStore;
    use crate::test_support::FlakyStore;
    use proptest::prelude::*;

    const KEY: &str = "@todos";

    fn create_test_store() -> SqliteStore {
        SqliteStore::open_in_memory().expect("failed to create test store")
    }

    fn open<S: KeyValueStore>(store: S) -> Todos<S> {
        Todos::open(ListStore::new(store, KEY)).expect("failed to open todos")
    }

    fn persisted(store: &SqliteStore) -> Vec<TodoItem> {
        ListStore::new(store, KEY).load().unwrap()
    }

    #[test]
    fn test_reduce_add_appends() {
        let items = vec![TodoItem::new(TodoId(1), "a")];
        let next = reduce(
            &items,
            &TodoAction::Add {
                id: TodoId(2),
                text: "b".to_string(),
            },
        )
        .unwrap();
        assert_eq!(next.len(), 2);
        assert_eq!(next[1], TodoItem::new(TodoId(2), "b"));
    }

    #[test]
    fn test_reduce_blank_add_is_noop() {
        for text in ["", "   ", "\t\n"] {
            let action = TodoAction::Add {
                id: TodoId(1),
                text: text.to_string(),
            };
            assert_eq!(reduce(&[], &action), None);
        }
    }

    #[test]
    fn test_reduce_rename_keeps_completed() {
        let mut item = TodoItem::new(TodoId(1), "old");
        item.completed = true;
        let next = reduce(
            &[item],
            &TodoAction::Rename {
                id: TodoId(1),
                text: "new".to_string(),
            },
        )
        .unwrap();
        assert_eq!(next[0].text, "new");
        assert!(next[0].completed);
    }

    #[test]
    fn test_reduce_unknown_id_is_noop() {
        let items = vec![TodoItem::new(TodoId(1), "a")];
        assert_eq!(reduce(&items, &TodoAction::Delete { id: TodoId(9) }), None);
        assert_eq!(reduce(&items, &TodoAction::Toggle { id: TodoId(9) }), None);
    }

    #[test]
    fn test_open_empty_store() {
        let store = create_test_store();
        let todos = open(&store);
        assert!(todos.is_empty());
    }

    #[test]
    fn test_add_buy_milk() {
        let store = create_test_store();
        let mut todos = open(&store);

        let id = todos.add("Buy milk").unwrap().unwrap();

        assert_eq!(todos.len(), 1);
        assert_eq!(todos.items()[0].text, "Buy milk");
        assert!(!todos.items()[0].completed);
        assert_eq!(persisted(&store), vec![TodoItem::new(id, "Buy milk")]);
    }

    #[test]
    fn test_add_keeps_text_as_entered() {
        let store = create_test_store();
        let mut todos = open(&store);

        todos.add("  padded  ").unwrap();
        assert_eq!(todos.items()[0].text, "  padded  ");
    }

    #[test]
    fn test_add_blank_is_noop() {
        let store = create_test_store();
        let mut todos = open(&store);

        assert_eq!(todos.add("").unwrap(), None);
        assert_eq!(todos.add("   ").unwrap(), None);
        assert!(todos.is_empty());
        assert_eq!(store.get_item(KEY).unwrap(), None);
    }

    #[test]
    fn test_ids_are_unique_and_ordered() {
        let store = create_test_store();
        let mut todos = open(&store);

        let a = todos.add("a").unwrap().unwrap();
        let b = todos.add("b").unwrap().unwrap();
        let c = todos.add("c").unwrap().unwrap();

        assert!(a < b && b < c);
        let texts: Vec<_> = todos.items().iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, ["a", "b", "c"]);
    }

    #[test]
    fn test_delete_keeps_order() {
        let store = create_test_store();
        let mut todos = open(&store);
        todos.add("a").unwrap();
        let b = todos.add("b").unwrap().unwrap();
        todos.add("c").unwrap();

        assert!(todos.delete(b).unwrap());

        let texts: Vec<_> = todos.items().iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, ["a", "c"]);
        assert_eq!(persisted(&store), todos.items());
    }

    #[test]
    fn test_delete_missing_id() {
        let store = create_test_store();
        let mut todos = open(&store);
        todos.add("a").unwrap();

        assert!(!todos.delete(TodoId::new(-1)).unwrap());
        assert_eq!(todos.len(), 1);
    }

    #[test]
    fn test_toggle_twice_restores() {
        let store = create_test_store();
        let mut todos = open(&store);
        let id = todos.add("a").unwrap().unwrap();
        let before = todos.items().to_vec();

        todos.toggle_completed(id).unwrap();
        assert!(todos.get(id).unwrap().completed);
        assert_eq!(todos.completed_count(), 1);

        todos.toggle_completed(id).unwrap();
        assert_eq!(todos.items(), before.as_slice());
        assert_eq!(persisted(&store), before);
    }

    #[test]
    fn test_toggle_missing_id() {
        let store = create_test_store();
        let mut todos = open(&store);
        assert!(!todos.toggle_completed(TodoId::new(7)).unwrap());
    }

    #[test]
    fn test_edit_flow() {
        let store = create_test_store();
        let mut todos = open(&store);
        let id = todos.add("Buy milk").unwrap().unwrap();
        todos.toggle_completed(id).unwrap();

        assert!(todos.begin_edit(id));
        assert_eq!(todos.editing().unwrap().buffer, "Buy milk");

        todos.set_edit_text("Buy oat milk");
        assert!(todos.commit_edit().unwrap());

        assert!(todos.editing().is_none());
        let item = todos.get(id).unwrap();
        assert_eq!(item.text, "Buy oat milk");
        assert!(item.completed);
        assert_eq!(persisted(&store), todos.items());
    }

    #[test]
    fn test_commit_blank_edit_keeps_session() {
        let store = create_test_store();
        let mut todos = open(&store);
        let id = todos.add("a").unwrap().unwrap();

        todos.begin_edit(id);
        todos.set_edit_text("  ");
        assert!(!todos.commit_edit().unwrap());

        assert_eq!(todos.get(id).unwrap().text, "a");
        assert!(todos.editing().is_some());
    }

    #[test]
    fn test_begin_edit_unknown_id() {
        let store = create_test_store();
        let mut todos = open(&store);
        assert!(!todos.begin_edit(TodoId::new(3)));
        assert!(todos.editing().is_none());
    }

    #[test]
    fn test_commit_without_session() {
        let store = create_test_store();
        let mut todos = open(&store);
        assert!(!todos.commit_edit().unwrap());
    }

    #[test]
    fn test_cancel_edit() {
        let store = create_test_store();
        let mut todos = open(&store);
        let id = todos.add("a").unwrap().unwrap();

        todos.begin_edit(id);
        todos.set_edit_text("b");
        todos.cancel_edit();

        assert!(todos.editing().is_none());
        assert_eq!(todos.get(id).unwrap().text, "a");
    }

    #[test]
    fn test_delete_ends_edit_of_that_item() {
        let store = create_test_store();
        let mut todos = open(&store);
        let id = todos.add("a").unwrap().unwrap();

        todos.begin_edit(id);
        todos.delete(id).unwrap();
        assert!(todos.editing().is_none());
    }

    #[test]
    fn test_failed_write_leaves_state_unchanged() {
        let store = FlakyStore::new();
        let mut todos = open(&store);
        let id = todos.add("a").unwrap().unwrap();

        store.fail_writes(true);
        let err = todos.add("b").unwrap_err();
        assert!(err.is_store_unavailable());
        assert!(todos.toggle_completed(id).is_err());

        assert_eq!(todos.len(), 1);
        assert!(!todos.get(id).unwrap().completed);

        store.fail_writes(false);
        todos.reload().unwrap();
        assert_eq!(todos.len(), 1);
    }

    #[test]
    fn test_failed_commit_keeps_session() {
        let store = FlakyStore::new();
        let mut todos = open(&store);
        let id = todos.add("a").unwrap().unwrap();

        todos.begin_edit(id);
        todos.set_edit_text("b");
        store.fail_writes(true);

        assert!(todos.commit_edit().is_err());
        assert_eq!(todos.editing().unwrap().buffer, "b");
        assert_eq!(todos.get(id).unwrap().text, "a");
    }

    #[test]
    fn test_concurrent_writer_is_detected() {
        let store = create_test_store();
        let mut first = open(&store);
        let mut second = open(&store);

        first.add("from first").unwrap();
        let err = second.add("from second").unwrap_err();
        assert!(err.is_conflict());
        assert!(second.is_empty());

        second.reload().unwrap();
        second.add("from second").unwrap();
        assert_eq!(persisted(&store).len(), 2);
    }

    #[test]
    fn test_corrupted_store_opens_empty() {
        crate::logging::init_test_logging();
        let store = create_test_store();
        store.set_item(KEY, "definitely not json").unwrap();

        let mut todos = open(&store);
        assert!(todos.is_empty());

        todos.add("fresh start").unwrap();
        assert_eq!(persisted(&store).len(), 1);
    }

    #[test]
    fn test_reads_legacy_json() {
        let store = create_test_store();
        store
            .set_item(
                KEY,
                r#"[{"id":1690000000000,"text":"Walk dog","completed":true}]"#,
            )
            .unwrap();

        let todos = open(&store);
        assert_eq!(todos.items()[0].id, TodoId::new(1_690_000_000_000));
        assert!(todos.items()[0].completed);
    }

    #[test]
    fn test_serialized_shape() {
        let json = serde_json::to_string(&TodoItem::new(TodoId::new(5), "x")).unwrap();
        assert_eq!(json, r#"{"id":5,"text":"x","completed":false}"#);
    }

    #[derive(Debug, Clone)]
    enum Op {
        Add(String),
        Delete(prop::sample::Index),
        Toggle(prop::sample::Index),
    }

    fn op_strategy() -> impl Strategy<Value = Op> {
        prop_oneof![
            "[a-z ]{0,6}".prop_map(Op::Add),
            any::<prop::sample::Index>().prop_map(Op::Delete),
            any::<prop::sample::Index>().prop_map(Op::Toggle),
        ]
    }

    fn pick(todos: &Todos<&SqliteStore>, index: &prop::sample::Index) -> TodoId {
        if todos.is_empty() {
            TodoId::new(-1)
        } else {
            todos.items()[index.index(todos.len())].id
        }
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn prop_persisted_matches_memory(ops in prop::collection::vec(op_strategy(), 0..24)) {
            let store = create_test_store();
            let mut todos = open(&store);

            for op in &ops {
                match op {
                    Op::Add(text) => { todos.add(text).unwrap(); }
                    Op::Delete(i) => { let id = pick(&todos, i); todos.delete(id).unwrap(); }
                    Op::Toggle(i) => { let id = pick(&todos, i); todos.toggle_completed(id).unwrap(); }
                }
                prop_assert_eq!(persisted(&store), todos.items().to_vec());
            }
        }

        #[test]
        fn prop_toggle_is_an_involution(texts in prop::collection::vec("[a-z]{1,5}", 1..6), i in any::<prop::sample::Index>()) {
            let store = create_test_store();
            let mut todos = open(&store);
            for text in &texts {
                todos.add(text).unwrap();
            }
            let before = todos.items().to_vec();
            let id = pick(&todos, &i);

            todos.toggle_completed(id).unwrap();
            todos.toggle_completed(id).unwrap();
            prop_assert_eq!(todos.items(), before.as_slice());
        }
    }
}
