//! Read-only trip detail view.

use std::fmt;

use crate::error::{Error, Result};
use crate::trip::TripRecord;

/// Labels shown on the detail view, in display order.
pub const FIELD_LABELS: [&str; 5] = [
    "Trip Owner",
    "Pickup Position",
    "Destination",
    "Number of People",
    "Pickup Time",
];

/// A trip prepared for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TripDetail<'a> {
    trip: &'a TripRecord,
}

impl<'a> TripDetail<'a> {
    /// Open the view for `trip`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingTrip`] when no trip is given.
    pub fn open(trip: Option<&'a TripRecord>) -> Result<Self> {
        trip.map(|trip| Self { trip }).ok_or(Error::MissingTrip)
    }

    /// The trip being shown.
    #[must_use]
    pub fn trip(&self) -> &'a TripRecord {
        self.trip
    }

    /// Label/value pairs in display order.
    #[must_use]
    pub fn fields(&self) -> [(&'static str, &'a str); 5] {
        let t = self.trip;
        [
            (FIELD_LABELS[0], t.owner.as_str()),
            (FIELD_LABELS[1], t.pickup.as_str()),
            (FIELD_LABELS[2], t.destination.as_str()),
            (FIELD_LABELS[3], t.people.as_str()),
            (FIELD_LABELS[4], t.time.as_str()),
        ]
    }
}

impl fmt::Display for TripDetail<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (label, value) in self.fields() {
            writeln!(f, "{label}:")?;
            writeln!(f, "  {value}")?;
        }
        Ok(())
    }
}
