//! Connection bootstrap utilities for SQLite.
//!
//! # Responsibility
//! - Open file or in-memory SQLite connections.
//! - Configure connection pragmas required by core behavior.
//! - Trigger schema migrations before returning a usable connection.
//!
//! # Invariants
//! - Returned connections have `foreign_keys=ON`.
//! - File connections use WAL journaling so readers never block the writer.
//! - Returned connections have migrations fully applied.

use super::migrations::{apply_migrations, latest_version};
use super::DbResult;
use crate::config::{CoreConfig, DEFAULT_BUSY_TIMEOUT_MS};
use crate::logging::{EventLine, EventStatus};
use log::{error, info};
use rusqlite::Connection;
use std::path::Path;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy)]
enum OpenMode {
    File,
    Memory,
}

impl OpenMode {
    fn as_str(self) -> &'static str {
        match self {
            Self::File => "file",
            Self::Memory => "memory",
        }
    }
}

/// Opens a SQLite database file and applies all pending migrations.
///
/// # Side effects
/// - Performs connection bootstrap and migration checks.
/// - Emits `db_open` logging events with duration and status.
pub fn open_db(path: impl AsRef<Path>) -> DbResult<Connection> {
    open_with(
        Some(path.as_ref()),
        Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS),
    )
}

/// Opens an in-memory SQLite database and applies all pending migrations.
///
/// Each call returns an independent, empty database.
pub fn open_db_in_memory() -> DbResult<Connection> {
    open_with(None, Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS))
}

/// Opens the store described by `config`.
///
/// `db_path = None` selects an in-memory database.
pub fn open_store(config: &CoreConfig) -> DbResult<Connection> {
    open_with(
        config.db_path.as_deref(),
        Duration::from_millis(config.busy_timeout_ms),
    )
}

fn open_with(path: Option<&Path>, busy_timeout: Duration) -> DbResult<Connection> {
    let mode = if path.is_some() {
        OpenMode::File
    } else {
        OpenMode::Memory
    };
    let started_at = Instant::now();
    info!("{}", open_event(EventStatus::Start, mode));

    let opened = match path {
        Some(path) => Connection::open(path),
        None => Connection::open_in_memory(),
    };
    let mut conn = match opened {
        Ok(conn) => conn,
        Err(err) => {
            error!(
                "{}",
                open_event(EventStatus::Error, mode)
                    .elapsed(started_at)
                    .error_code("db_open_failed")
                    .field("error", &err)
            );
            return Err(err.into());
        }
    };

    match bootstrap_connection(&mut conn, mode, busy_timeout) {
        Ok(()) => {
            info!(
                "{}",
                open_event(EventStatus::Ok, mode)
                    .elapsed(started_at)
                    .field("schema_version", latest_version())
            );
            Ok(conn)
        }
        Err(err) => {
            error!(
                "{}",
                open_event(EventStatus::Error, mode)
                    .elapsed(started_at)
                    .error_code("db_bootstrap_failed")
                    .field("error", &err)
            );
            Err(err)
        }
    }
}

fn open_event(status: EventStatus, mode: OpenMode) -> EventLine {
    EventLine::new("db_open", "db", status).field("mode", mode.as_str())
}

fn bootstrap_connection(
    conn: &mut Connection,
    mode: OpenMode,
    busy_timeout: Duration,
) -> DbResult<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(busy_timeout)?;
    if let OpenMode::File = mode {
        // journal_mode returns the resulting mode as a row.
        let _: String = conn.query_row("PRAGMA journal_mode = WAL;", [], |row| row.get(0))?;
    }
    apply_migrations(conn)?;
    Ok(())
}
