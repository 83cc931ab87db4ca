//! CLI command definitions.

use std::path::PathBuf;

use clap::{Args, Subcommand};

use crate::trip::TripDraft;

/// Todo list commands.
#[derive(Debug, Subcommand)]
pub enum TodoCommand {
    /// List todos
    List {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Add a todo
    Add {
        /// The todo text
        text: String,
    },

    /// Replace the text of a todo
    Edit {
        /// Todo id
        id: i64,
        /// New text
        text: String,
    },

    /// Mark a todo complete, or open again
    Toggle {
        /// Todo id
        id: i64,
    },

    /// Delete a todo
    Delete {
        /// Todo id
        id: i64,
    },
}

/// Trip form fields. Omitted fields keep their current value when editing
/// and are left empty when adding.
#[derive(Debug, Clone, Default, Args)]
pub struct TripFields {
    /// Trip owner
    #[arg(long)]
    pub owner: Option<String>,

    /// Pickup position
    #[arg(long)]
    pub pickup: Option<String>,

    /// Destination
    #[arg(long)]
    pub destination: Option<String>,

    /// Number of people
    #[arg(long)]
    pub people: Option<String>,

    /// Pickup time
    #[arg(long)]
    pub time: Option<String>,
}

impl TripFields {
    /// Overwrite the fields of `draft` that were given on the command line.
    pub fn apply_to(&self, draft: &mut TripDraft) {
        let pairs = [
            (&self.owner, &mut draft.owner),
            (&self.pickup, &mut draft.pickup),
            (&self.destination, &mut draft.destination),
            (&self.people, &mut draft.people),
            (&self.time, &mut draft.time),
        ];
        for (given, field) in pairs {
            if let Some(value) = given {
                field.clone_from(value);
            }
        }
    }
}

/// Trip log commands.
#[derive(Debug, Subcommand)]
pub enum TripCommand {
    /// List trips
    List {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Log a new trip
    Add(TripFields),

    /// Edit a trip by id
    Edit {
        /// Trip id
        id: i64,
        #[command(flatten)]
        fields: TripFields,
    },

    /// Edit the trip at a list position
    EditAt {
        /// Zero-based position in the list
        index: usize,
        #[command(flatten)]
        fields: TripFields,
    },

    /// Show a trip
    Show {
        /// Trip id
        id: i64,
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Delete a trip by id
    Delete {
        /// Trip id
        id: i64,
        /// Confirm the deletion
        #[arg(short, long)]
        yes: bool,
    },

    /// Delete the trip at a list position
    DeleteAt {
        /// Zero-based position in the list
        index: usize,
        /// Confirm the deletion
        #[arg(short, long)]
        yes: bool,
    },

    /// Delete every trip
    Clear {
        /// Confirm the deletion
        #[arg(short, long)]
        yes: bool,
    },
}

/// Status command arguments.
#[derive(Debug, Args)]
pub struct StatusCommand {
    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Configuration commands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Show the configuration file path
    Path,

    /// Validate configuration
    Validate {
        /// Path to configuration file to validate
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
}
