//! Forward-only schema migration framework.
//!
//! The `schema_migrations` ledger is the single source of truth for what
//! structure the database currently has. A fresh database gets the full
//! baseline schema in one transaction; an existing database gets every
//! pending migration, each in its own transaction, with the version recorded
//! only on success. Migrations are additive — none of them drop or rewrite
//! existing data.

use rusqlite::{params, Connection, OptionalExtension};

use super::schema;

/// The schema version a freshly initialized database is stamped with.
pub const SCHEMA_VERSION: &str = "1.1";

/// Pending migrations for databases created by older binaries, in ascending
/// version order. The baseline schema already includes everything here.
const MIGRATIONS: &[(&str, &str)] = &[(
    // Natural-language summary columns for activity display
    "1.1",
    "ALTER TABLE activities ADD COLUMN summary TEXT;\n\
     ALTER TABLE activities ADD COLUMN summary_detail TEXT;",
)];

/// Get the most recently applied schema version, or `None` for a database
/// that has never been initialized (no ledger table yet).
pub fn current_version(conn: &Connection) -> rusqlite::Result<Option<String>> {
    let ledger_exists: bool = conn.query_row(
        "SELECT COUNT(*) > 0 FROM sqlite_master WHERE type = 'table' AND name = 'schema_migrations'",
        [],
        |row| row.get(0),
    )?;
    if !ledger_exists {
        return Ok(None);
    }

    conn.query_row(
        "SELECT version FROM schema_migrations ORDER BY applied_at DESC, version DESC LIMIT 1",
        [],
        |row| row.get(0),
    )
    .optional()
}

/// Bring the database up to [`SCHEMA_VERSION`]. Returns the final version.
///
/// Safe to call repeatedly — a database that is already current is left
/// untouched.
pub fn migrate(conn: &mut Connection) -> rusqlite::Result<String> {
    let Some(mut current) = current_version(conn)? else {
        // Fresh database: full baseline, one transaction
        let tx = conn.transaction()?;
        tx.execute_batch(schema::SCHEMA_SQL)?;
        record_version(&tx, SCHEMA_VERSION)?;
        tx.commit()?;
        tracing::info!(version = SCHEMA_VERSION, "applied baseline schema");
        return Ok(SCHEMA_VERSION.to_string());
    };

    for (version, sql) in MIGRATIONS {
        if version_newer(version, &current) {
            let tx = conn.transaction()?;
            tx.execute_batch(sql)?;
            record_version(&tx, version)?;
            tx.commit()?;
            tracing::info!(from = %current, to = %version, "applied migration");
            current = version.to_string();
        }
    }

    Ok(current)
}

fn record_version(conn: &Connection, version: &str) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO schema_migrations (version, applied_at) VALUES (?1, ?2)",
        params![version, chrono::Utc::now().to_rfc3339()],
    )?;
    Ok(())
}

/// Componentwise dotted-version comparison, so "1.10" sorts after "1.2".
fn version_newer(candidate: &str, current: &str) -> bool {
    let parse = |v: &str| -> Vec<u32> {
        v.split('.')
            .map(|part| part.parse::<u32>().unwrap_or(0))
            .collect()
    };
    parse(candidate) > parse(current)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_database_gets_baseline_and_version() {
        let mut conn = Connection::open_in_memory().unwrap();
        assert_eq!(current_version(&conn).unwrap(), None);

        let version = migrate(&mut conn).unwrap();
        assert_eq!(version, SCHEMA_VERSION);
        assert_eq!(
            current_version(&conn).unwrap(),
            Some(SCHEMA_VERSION.to_string())
        );
    }

    #[test]
    fn migrate_is_idempotent() {
        let mut conn = Connection::open_in_memory().unwrap();
        migrate(&mut conn).unwrap();
        let version = migrate(&mut conn).unwrap(); // second call should not error
        assert_eq!(version, SCHEMA_VERSION);

        // Exactly one ledger row — nothing re-applied
        let rows: i64 = conn
            .query_row("SELECT COUNT(*) FROM schema_migrations", [], |row| {
                row.get(0)
            })
            .unwrap();
        assert_eq!(rows, 1);
    }

    #[test]
    fn legacy_database_is_upgraded() {
        let mut conn = Connection::open_in_memory().unwrap();

        // Simulate a 1.0-era database: activities without summary columns.
        conn.execute_batch(
            "CREATE TABLE activities (
                id TEXT PRIMARY KEY,
                session_id TEXT,
                agent_id TEXT,
                timestamp TEXT NOT NULL,
                event_type TEXT NOT NULL,
                tool_name TEXT,
                tool_input TEXT,
                tool_output TEXT,
                duration_ms INTEGER,
                success INTEGER NOT NULL DEFAULT 1,
                error_message TEXT,
                project_path TEXT,
                file_path TEXT
            );
            CREATE TABLE schema_migrations (
                version TEXT PRIMARY KEY,
                applied_at TEXT NOT NULL
            );
            INSERT INTO schema_migrations (version, applied_at)
            VALUES ('1.0', '2026-01-01T00:00:00Z');",
        )
        .unwrap();

        let version = migrate(&mut conn).unwrap();
        assert_eq!(version, "1.1");

        // New columns exist
        conn.execute(
            "UPDATE activities SET summary = 'x', summary_detail = 'y'",
            [],
        )
        .unwrap();
    }

    #[test]
    fn version_comparison_is_componentwise() {
        assert!(version_newer("1.1", "1.0"));
        assert!(version_newer("1.10", "1.2"));
        assert!(version_newer("2.0", "1.9"));
        assert!(!version_newer("1.0", "1.0"));
        assert!(!version_newer("1.0", "1.1"));
    }
}
