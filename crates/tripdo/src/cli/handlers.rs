//! Command handlers.
//!
//! Each handler drives one feature and writes human or JSON output to `out`.

use std::io::Write;

use crate::config::Config;
use crate::detail::TripDetail;
use crate::error::{Error, Result};
use crate::storage::{KeyValueStore, SqliteStore};
use crate::todo::{TodoId, Todos};
use crate::trip::{TripDraft, TripForm, TripId, Trips};

use super::commands::{ConfigCommand, TodoCommand, TripCommand};

/// Run a todo command.
///
/// # Errors
///
/// Returns an error if the store rejects a write or `out` fails.
pub fn todo<S: KeyValueStore>(
    cmd: TodoCommand,
    todos: &mut Todos<S>,
    out: &mut impl Write,
) -> Result<()> {
    match cmd {
        TodoCommand::List { json } => {
            if json {
                writeln!(out, "{}", serde_json::to_string_pretty(todos.items())?)?;
            } else if todos.is_empty() {
                writeln!(out, "No todos.")?;
            } else {
                for item in todos.items() {
                    let mark = if item.completed { 'x' } else { ' ' };
                    writeln!(out, "[{mark}] {:>14}  {}", item.id, item.text)?;
                }
                writeln!(
                    out,
                    "{} of {} completed",
                    todos.completed_count(),
                    todos.len()
                )?;
            }
        }
        TodoCommand::Add { text } => match todos.add(&text)? {
            Some(id) => writeln!(out, "Added todo {id}")?,
            None => writeln!(out, "Nothing to add.")?,
        },
        TodoCommand::Edit { id, text } => {
            let id = TodoId::new(id);
            if !todos.begin_edit(id) {
                writeln!(out, "No todo with id {id}.")?;
                return Ok(());
            }
            todos.set_edit_text(text);
            if todos.commit_edit()? {
                writeln!(out, "Updated todo {id}")?;
            } else {
                todos.cancel_edit();
                writeln!(out, "Todo text cannot be blank.")?;
            }
        }
        TodoCommand::Toggle { id } => {
            let id = TodoId::new(id);
            if todos.toggle_completed(id)? {
                let done = todos.get(id).is_some_and(|item| item.completed);
                let state = if done { "completed" } else { "open" };
                writeln!(out, "Todo {id} is {state}")?;
            } else {
                writeln!(out, "No todo with id {id}.")?;
            }
        }
        TodoCommand::Delete { id } => {
            let id = TodoId::new(id);
            if todos.delete(id)? {
                writeln!(out, "Deleted todo {id}")?;
            } else {
                writeln!(out, "No todo with id {id}.")?;
            }
        }
    }
    Ok(())
}

/// Run a trip command.
///
/// # Errors
///
/// Returns an error if a trip is missing, the form fails validation, the
/// store rejects a write, or `out` fails.
pub fn trip<S: KeyValueStore>(
    cmd: TripCommand,
    trips: &mut Trips<S>,
    out: &mut impl Write,
) -> Result<()> {
    match cmd {
        TripCommand::List { json } => list_trips(trips, json, out)?,
        TripCommand::Add(fields) => {
            let mut form = TripForm::new();
            fields.apply_to(&mut form.draft);
            let id = form.submit(trips)?;
            writeln!(out, "Logged trip {id}")?;
        }
        TripCommand::Edit { id, fields } => {
            let id = TripId::new(id);
            let mut form = trips
                .get(id)
                .map(TripForm::for_trip)
                .ok_or(Error::TripNotFound { id: id.get() })?;
            fields.apply_to(&mut form.draft);
            form.submit(trips)?;
            writeln!(out, "Updated trip {id}")?;
        }
        TripCommand::EditAt { index, fields } => {
            let mut draft = trips
                .at(index)
                .map(TripDraft::from)
                .ok_or(Error::IndexOutOfRange {
                    index,
                    len: trips.len(),
                })?;
            fields.apply_to(&mut draft);
            let id = trips.edit_at(index, draft)?;
            writeln!(out, "Updated trip {id}")?;
        }
        TripCommand::Show { id, json } => {
            let detail = TripDetail::open(trips.get(TripId::new(id)))?;
            if json {
                writeln!(out, "{}", serde_json::to_string_pretty(detail.trip())?)?;
            } else {
                writeln!(out, "{}", detail.trip().title())?;
                write!(out, "{detail}")?;
            }
        }
        TripCommand::Delete { id, yes } => {
            let id = TripId::new(id);
            if !yes {
                confirm_hint(out, "Are you sure you want to delete this trip?")?;
            } else if trips.delete(id)? {
                writeln!(out, "Deleted trip {id}")?;
            } else {
                writeln!(out, "No trip with id {id}.")?;
            }
        }
        TripCommand::DeleteAt { index, yes } => {
            if !yes {
                confirm_hint(out, "Are you sure you want to delete this trip?")?;
            } else if let Some(removed) = trips.delete_at(index)? {
                writeln!(out, "Deleted {}", removed.title())?;
            } else {
                writeln!(out, "No trip at position {index}.")?;
            }
        }
        TripCommand::Clear { yes } => {
            let threshold = trips.policy().clear_all_threshold;
            if !trips.can_clear_all() {
                writeln!(
                    out,
                    "Clear all is offered once more than {threshold} trips are logged ({} now).",
                    trips.len()
                )?;
            } else if !yes {
                confirm_hint(out, "Are you sure you want to delete all trips?")?;
            } else {
                let removed = trips.clear_all()?;
                writeln!(out, "Deleted {removed} trips")?;
            }
        }
    }
    Ok(())
}

fn list_trips<S: KeyValueStore>(trips: &Trips<S>, json: bool, out: &mut impl Write) -> Result<()> {
    if json {
        writeln!(out, "{}", serde_json::to_string_pretty(trips.trips())?)?;
        return Ok(());
    }
    if trips.is_empty() {
        writeln!(out, "No trips available. Logs are empty.")?;
        return Ok(());
    }
    for (index, trip) in trips.trips().iter().enumerate() {
        writeln!(out, "{index:>4}  {:>14}  {}", trip.id, trip.title())?;
    }
    if trips.can_clear_all() {
        writeln!(out, "Run `tripdo trip clear --yes` to delete all trips.")?;
    }
    Ok(())
}

fn confirm_hint(out: &mut impl Write, question: &str) -> Result<()> {
    writeln!(out, "{question}")?;
    writeln!(out, "Use --yes to confirm.")?;
    Ok(())
}

/// Print store and feature status.
///
/// # Errors
///
/// Returns an error if the store cannot report statistics or `out` fails.
pub fn status<S: KeyValueStore>(
    store: &SqliteStore,
    todos: &Todos<S>,
    trips: &Trips<S>,
    json: bool,
    out: &mut impl Write,
) -> Result<()> {
    let stats = store.stats()?;
    if json {
        let status = serde_json::json!({
            "database_path": store.path(),
            "todos": {
                "count": todos.len(),
                "completed": todos.completed_count(),
            },
            "trips": {
                "count": trips.len(),
                "can_clear_all": trips.can_clear_all(),
            },
            "store": {
                "keys": stats.keys,
                "value_bytes": stats.value_bytes,
                "db_size_bytes": stats.db_size_bytes,
                "last_updated": stats.last_updated.map(|t| t.to_rfc3339()),
            },
        });
        writeln!(out, "{}", serde_json::to_string_pretty(&status)?)?;
    } else {
        writeln!(out, "tripdo status")?;
        writeln!(out, "-------------")?;
        writeln!(out, "Database:      {}", store.path().display())?;
        writeln!(
            out,
            "Todos:         {} ({} completed)",
            todos.len(),
            todos.completed_count()
        )?;
        writeln!(out, "Trips:         {}", trips.len())?;
        writeln!(out, "Stored keys:   {}", stats.keys)?;
        writeln!(out, "Value bytes:   {}", stats.value_bytes)?;
        match stats.last_updated {
            Some(at) => writeln!(out, "Last write:    {}", at.to_rfc3339())?,
            None => writeln!(out, "Last write:    never")?,
        }
    }
    Ok(())
}

/// Run a configuration command.
///
/// # Errors
///
/// Returns an error if the configuration cannot be serialized or `out`
/// fails.
pub fn config(config: &Config, cmd: ConfigCommand, out: &mut impl Write) -> Result<()> {
    match cmd {
        ConfigCommand::Show { json } => {
            if json {
                writeln!(out, "{}", serde_json::to_string_pretty(config)?)?;
            } else {
                writeln!(out, "Current Configuration")?;
                writeln!(out, "=====================")?;
                writeln!(out)?;
                writeln!(out, "[Storage]")?;
                writeln!(
                    out,
                    "  Database path:       {}",
                    config.database_path().display()
                )?;
                writeln!(out, "  Todos key:           {}", config.storage.todos_key)?;
                writeln!(out, "  Trips key:           {}", config.storage.trips_key)?;
                writeln!(out)?;
                writeln!(out, "[Trips]")?;
                writeln!(
                    out,
                    "  Clear-all threshold: {}",
                    config.trips.clear_all_threshold
                )?;
                writeln!(
                    out,
                    "  Validate fields:     {}",
                    config.trips.validate_fields
                )?;
            }
        }
        ConfigCommand::Path => {
            writeln!(out, "{}", Config::default_config_path().display())?;
        }
        ConfigCommand::Validate { file } => {
            let path = file.unwrap_or_else(Config::default_config_path);
            writeln!(out, "Validating configuration: {}", path.display())?;
            match Config::load_from(Some(path)) {
                Ok(_) => writeln!(out, "Configuration is valid.")?,
                Err(e) => writeln!(out, "Configuration error: {e}")?,
            }
        }
    }
    Ok(())
}
