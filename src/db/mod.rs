//! SQLite database management.
//!
//! Opening a database always leaves it ready to use: parent directories are
//! created, WAL mode and foreign keys are enabled, and any pending schema
//! migrations run before the connection is handed back.

pub mod migrations;
pub mod schema;

use std::path::Path;

use anyhow::{Context, Result};
use rusqlite::Connection;

/// Open (or create) the database at `path` and bring it up to the current
/// schema version.
pub fn open_database(path: &Path) -> Result<Connection> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating database directory {}", parent.display()))?;
    }

    let mut conn = Connection::open(path)
        .with_context(|| format!("opening database at {}", path.display()))?;

    // WAL keeps readers unblocked during writes; FK enforcement is off by
    // default in SQLite and the cascade rules depend on it.
    conn.pragma_update(None, "journal_mode", "WAL")
        .context("enabling WAL mode")?;
    conn.pragma_update(None, "foreign_keys", "ON")
        .context("enabling foreign key enforcement")?;

    let version = migrations::migrate(&mut conn).context("running schema migrations")?;
    tracing::debug!(path = %path.display(), %version, "database ready");

    Ok(conn)
}

/// In-memory database with the full schema applied. Test-only.
#[cfg(test)]
pub fn open_memory_database() -> Result<Connection> {
    let mut conn = Connection::open_in_memory().context("opening in-memory database")?;
    conn.pragma_update(None, "foreign_keys", "ON")
        .context("enabling foreign key enforcement")?;
    migrations::migrate(&mut conn).context("running schema migrations")?;
    Ok(conn)
}
