//! The trip log feature.
//!
//! Trips carry a stable [`TripId`]. The positional operations
//! ([`Trips::edit_at`], [`Trips::delete_at`]) resolve the index against the
//! current list once and then act on the id, so a stale index can never
//! rewrite a different record than the one it resolved to.
//!
//! Lists written before ids existed are upgraded on open: records without an
//! id get one and the upgraded list is written back.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::id::next_id;
use crate::list_store::ListStore;
use crate::storage::{KeyValueStore, Revision};

/// Threshold above which "clear all" is offered, unless configured.
pub const DEFAULT_CLEAR_ALL_THRESHOLD: usize = 100;

/// Identifier of a trip record.
///
/// Zero means "not yet assigned" and only appears in legacy data.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct TripId(i64);

impl TripId {
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

    fn is_assigned(self) -> bool {
        self.0 != 0
    }
}

impl fmt::Display for TripId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A logged trip.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TripRecord {
    /// Stable identifier.
    #[serde(default)]
    pub id: TripId,
    /// Who the trip belongs to.
    pub owner: String,
    /// Pickup location.
    pub pickup: String,
    /// Destination.
    pub destination: String,
    /// Number of people, as entered.
    pub people: String,
    /// Pickup time, as entered.
    pub time: String,
}

impl TripRecord {
    /// Build a record from form contents.
    #[must_use]
    pub fn from_draft(id: TripId, draft: TripDraft) -> Self {
        Self {
            id,
            owner: draft.owner,
            pickup: draft.pickup,
            destination: draft.destination,
            people: draft.people,
            time: draft.time,
        }
    }

    /// The list heading for this trip.
    #[must_use]
    pub fn title(&self) -> String {
        format!("{}'s Trip", self.owner)
    }
}

/// The editable fields of a trip.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TripDraft {
    /// Who the trip belongs to.
    pub owner: String,
    /// Pickup location.
    pub pickup: String,
    /// Destination.
    pub destination: String,
    /// Number of people.
    pub people: String,
    /// Pickup time.
    pub time: String,
}

impl TripDraft {
    /// Check that the required fields are filled in and `people` is a
    /// positive whole number.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] naming the first offending field.
    pub fn validate(&self) -> Result<()> {
        for (field, value) in [
            ("owner", &self.owner),
            ("pickup", &self.pickup),
            ("destination", &self.destination),
        ] {
            if value.trim().is_empty() {
                return Err(Error::validation(field, "must not be empty"));
            }
        }

        match self.people.trim().parse::<u32>() {
            Ok(n) if n > 0 => Ok(()),
            _ => Err(Error::validation(
                "people",
                format!("expected a positive number, got '{}'", self.people),
            )),
        }
    }
}

impl From<&TripRecord> for TripDraft {
    fn from(trip: &TripRecord) -> Self {
        Self {
            owner: trip.owner.clone(),
            pickup: trip.pickup.clone(),
            destination: trip.destination.clone(),
            people: trip.people.clone(),
            time: trip.time.clone(),
        }
    }
}

/// Rules applied by [`Trips`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TripPolicy {
    /// "Clear all" is offered only when the log holds more trips than this.
    pub clear_all_threshold: usize,
    /// Validate drafts on add and edit.
    pub validate_fields: bool,
}

impl Default for TripPolicy {
    fn default() -> Self {
        Self {
            clear_all_threshold: DEFAULT_CLEAR_ALL_THRESHOLD,
            validate_fields: false,
        }
    }
}

/// A change to the trip log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TripAction {
    /// Append a trip.
    Add(TripRecord),
    /// Replace the fields of a trip, keeping its id and position.
    Replace {
        /// Trip to replace.
        id: TripId,
        /// New field values.
        draft: TripDraft,
    },
    /// Remove a trip.
    Remove {
        /// Trip to remove.
        id: TripId,
    },
}

/// Apply `action` to `trips`, returning the next list.
///
/// Returns `None` when the action targets an id not in the list.
#[must_use]
pub fn reduce(trips: &[TripRecord], action: &TripAction) -> Option<Vec<TripRecord>> {
    match action {
        TripAction::Add(record) => {
            let mut next = trips.to_vec();
            next.push(record.clone());
            Some(next)
        }
        TripAction::Replace { id, draft } => {
            let index = trips.iter().position(|t| t.id == *id)?;
            let mut next = trips.to_vec();
            next[index] = TripRecord::from_draft(*id, draft.clone());
            Some(next)
        }
        TripAction::Remove { id } => {
            let index = trips.iter().position(|t| t.id == *id)?;
            let mut next = trips.to_vec();
            next.remove(index);
            Some(next)
        }
    }
}

/// Give every unassigned or duplicated id a fresh one.
///
/// Returns `true` if anything changed.
fn assign_missing_ids(trips: &mut [TripRecord]) -> bool {
    let mut seen = HashSet::new();
    let mut changed = false;
    for i in 0..trips.len() {
        let id = trips[i].id;
        if id.is_assigned() && seen.insert(id) {
            continue;
        }
        let fresh = TripId(next_id(trips.iter().map(|t| t.id.0)));
        trips[i].id = fresh;
        seen.insert(fresh);
        changed = true;
    }
    changed
}

/// The trip log, mirrored from its persisted copy.
#[derive(Debug)]
pub struct Trips<S> {
    list: ListStore<S, TripRecord>,
    trips: Vec<TripRecord>,
    revision: Option<Revision>,
    policy: TripPolicy,
}

impl<S: KeyValueStore> Trips<S> {
    /// Load the trip log from `list`.
    ///
    /// A corrupted stored value is logged and treated as an empty log.
    /// Records without ids are assigned ids and written back.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read, or if writing back
    /// upgraded records fails.
    pub fn open(list: ListStore<S, TripRecord>, policy: TripPolicy) -> Result<Self> {
        let mut trips = Self {
            list,
            trips: Vec::new(),
            revision: None,
            policy,
        };
        trips.refresh()?;
        Ok(trips)
    }

    /// Re-read the log from the store.
    ///
    /// # Errors
    ///
    /// See [`Trips::open`].
    pub fn refresh(&mut self) -> Result<()> {
        let loaded = self.list.load_lenient()?;
        let mut records = loaded.items;
        let mut revision = loaded.revision;

        if assign_missing_ids(&mut records) {
            revision = Some(self.list.save_versioned(&records, revision.as_ref())?);
            info!(count = records.len(), "Assigned ids to legacy trip records");
        }

        debug!(count = records.len(), "Loaded trips");
        self.trips = records;
        self.revision = revision;
        Ok(())
    }

    /// The current trips in insertion order.
    #[must_use]
    pub fn trips(&self) -> &[TripRecord] {
        &self.trips
    }

    /// Look up a trip.
    #[must_use]
    pub fn get(&self, id: TripId) -> Option<&TripRecord> {
        self.trips.iter().find(|t| t.id == id)
    }

    /// The trip at `index`.
    #[must_use]
    pub fn at(&self, index: usize) -> Option<&TripRecord> {
        self.trips.get(index)
    }

    /// Number of trips.
    #[must_use]
    pub fn len(&self) -> usize {
        self.trips.len()
    }

    /// Whether the log is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.trips.is_empty()
    }

    /// The active policy.
    #[must_use]
    pub fn policy(&self) -> TripPolicy {
        self.policy
    }

    /// Whether "clear all" should be offered.
    #[must_use]
    pub fn can_clear_all(&self) -> bool {
        self.trips.len() > self.policy.clear_all_threshold
    }

    /// Persist the result of `action`, then adopt it.
    ///
    /// Returns `false` if the action targeted an unknown id.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails or the stored log changed since
    /// it was loaded. In-memory state is unchanged on error.
    pub fn apply(&mut self, action: &TripAction) -> Result<bool> {
        let Some(next) = reduce(&self.trips, action) else {
            return Ok(false);
        };

        let revision = self.list.save_versioned(&next, self.revision.as_ref())?;
        self.trips = next;
        self.revision = Some(revision);
        Ok(true)
    }

    fn check(&self, draft: &TripDraft) -> Result<()> {
        if self.policy.validate_fields {
            draft.validate()?;
        }
        Ok(())
    }

    /// Append a new trip.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] when field validation is enabled and
    /// the draft is incomplete, or an error from [`Trips::apply`].
    pub fn add(&mut self, draft: TripDraft) -> Result<TripId> {
        self.check(&draft)?;
        let id = TripId(next_id(self.trips.iter().map(|t| t.id.0)));
        self.apply(&TripAction::Add(TripRecord::from_draft(id, draft)))?;
        info!(%id, "Added trip");
        Ok(id)
    }

    /// Replace the fields of the trip with `id`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TripNotFound`] if no such trip exists, plus the
    /// errors of [`Trips::add`].
    pub fn edit(&mut self, id: TripId, draft: TripDraft) -> Result<()> {
        self.check(&draft)?;
        if !self.apply(&TripAction::Replace { id, draft })? {
            return Err(Error::TripNotFound { id: id.get() });
        }
        info!(%id, "Edited trip");
        Ok(())
    }

    /// Replace the fields of the trip at `index`.
    ///
    /// Returns the id of the trip that was edited.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IndexOutOfRange`] if `index` is past the end, plus
    /// the errors of [`Trips::edit`].
    pub fn edit_at(&mut self, index: usize, draft: TripDraft) -> Result<TripId> {
        let id = self
            .at(index)
            .map(|t| t.id)
            .ok_or(Error::IndexOutOfRange {
                index,
                len: self.trips.len(),
            })?;
        self.edit(id, draft)?;
        Ok(id)
    }

    /// Remove the trip with `id`. Unknown ids are ignored.
    ///
    /// # Errors
    ///
    /// See [`Trips::apply`].
    pub fn delete(&mut self, id: TripId) -> Result<bool> {
        let deleted = self.apply(&TripAction::Remove { id })?;
        if deleted {
            info!(%id, "Deleted trip");
        } else {
            debug!(%id, "No trip to delete");
        }
        Ok(deleted)
    }

    /// Remove the trip at `index`, returning it.
    ///
    /// An out-of-range index is logged and ignored.
    ///
    /// # Errors
    ///
    /// See [`Trips::apply`].
    pub fn delete_at(&mut self, index: usize) -> Result<Option<TripRecord>> {
        let Some(trip) = self.at(index).cloned() else {
            warn!(index, len = self.trips.len(), "Trip index out of range, nothing deleted");
            return Ok(None);
        };
        self.delete(trip.id)?;
        Ok(Some(trip))
    }

    /// Remove every trip and the stored value.
    ///
    /// Returns the number of trips removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails or the stored log changed since
    /// it was loaded.
    pub fn clear_all(&mut self) -> Result<usize> {
        self.list.clear_versioned(self.revision.as_ref())?;
        let removed = self.trips.len();
        self.trips.clear();
        self.revision = None;
        info!(removed, "Cleared all trips");
        Ok(removed)
    }
}

/// The add/edit trip form.
///
/// A blank form adds a trip on submit; a form opened for an existing trip
/// replaces that trip.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TripForm {
    /// Field values.
    pub draft: TripDraft,
    editing: Option<TripId>,
}

impl TripForm {
    /// An empty form for a new trip.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A form seeded from an existing trip.
    #[must_use]
    pub fn for_trip(trip: &TripRecord) -> Self {
        Self {
            draft: TripDraft::from(trip),
            editing: Some(trip.id),
        }
    }

    /// The trip this form edits, if any.
    #[must_use]
    pub fn editing(&self) -> Option<TripId> {
        self.editing
    }

    /// Save the form, returning the id of the added or edited trip.
    ///
    /// # Errors
    ///
    /// See [`Trips::add`] and [`Trips::edit`].
    pub fn submit<S: KeyValueStore>(&self, trips: &mut Trips<S>) -> Result<TripId> {
        match self.editing {
            Some(id) => trips.edit(id, self.draft.clone()).map(|()| id),
            None => trips.add(self.draft.clone()),
        }
    }
}
