//! `tripdo` - CLI for the todo list and trip log
//!
//! This binary loads configuration, opens the local store and dispatches to
//! the command handlers.

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use std::io::Write;

use anyhow::Context;
use clap::Parser;
use tracing::debug;

use tripdo::cli::{handlers, Cli, Command};
use tripdo::{init_logging, Config, ListStore, SqliteStore, Todos, Trips};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    init_logging(cli.verbosity());

    // Load configuration
    let mut config = Config::load_from(cli.config.clone()).context("loading configuration")?;
    if let Some(path) = cli.database {
        config.storage.database_path = Some(path);
    }

    let mut out = std::io::stdout().lock();

    match cli.command {
        Command::Config(cmd) => handlers::config(&config, cmd, &mut out)?,
        Command::Todo(cmd) => {
            let store = open_store(&config)?;
            let mut todos = Todos::open(ListStore::new(&store, config.storage.todos_key.as_str()))?;
            handlers::todo(cmd, &mut todos, &mut out)?;
        }
        Command::Trip(cmd) => {
            let store = open_store(&config)?;
            let mut trips = Trips::open(
                ListStore::new(&store, config.storage.trips_key.as_str()),
                config.trip_policy(),
            )?;
            handlers::trip(cmd, &mut trips, &mut out)?;
        }
        Command::Status(cmd) => {
            let store = open_store(&config)?;
            let todos = Todos::open(ListStore::new(&store, config.storage.todos_key.as_str()))?;
            let trips = Trips::open(
                ListStore::new(&store, config.storage.trips_key.as_str()),
                config.trip_policy(),
            )?;
            handlers::status(&store, &todos, &trips, cmd.json, &mut out)?;
        }
    }

    out.flush()?;
    Ok(())
}

fn open_store(config: &Config) -> anyhow::Result<SqliteStore> {
    let path = config.database_path();
    debug!(path = %path.display(), "Opening store");
    SqliteStore::open(&path).with_context(|| format!("opening store at {}", path.display()))
}
