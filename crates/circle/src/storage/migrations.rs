//! Database migration system for circle.
//!
//! Version 1 is the base schema from [`SCHEMA_STATEMENTS`]. Version 2 brings
//! databases written by the earlier order tool up to date: their timestamps
//! are stored as `YYYY-MM-DD HH:MM:SS` and their orders have no history.

use rusqlite::{Connection, OptionalExtension};
use tracing::info;

use crate::error::{Error, Result};

use super::schema::SCHEMA_STATEMENTS;

/// A schema step: the version it produces and the function applying it.
type Migration = (i32, fn(&Connection) -> Result<()>);

/// Every migration, oldest first. Version 1 is the base schema itself.
const MIGRATIONS: &[Migration] = &[(1, migrate_v1), (2, migrate_v2)];

/// The current schema version.
pub const CURRENT_VERSION: i32 = 2;

/// Metadata key holding the schema version.
const VERSION_KEY: &str = "schema_version";

/// Create missing tables and indexes, then apply pending migrations.
///
/// # Errors
///
/// Returns an error if a statement fails or the stored version is unreadable.
pub fn initialize_schema(conn: &Connection) -> Result<()> {
    SCHEMA_STATEMENTS
        .iter()
        .try_for_each(|statement| conn.execute(statement, []).map(drop))?;

    let stored = read_version(conn)?;
    if stored < CURRENT_VERSION {
        migrate(conn, stored)?;
    }
    Ok(())
}

/// The stored schema version, 0 for a database that has none.
fn read_version(conn: &Connection) -> Result<i32> {
    let raw: Option<String> = conn
        .query_row(
            "SELECT value FROM metadata WHERE key = ?1",
            [VERSION_KEY],
            |row| row.get(0),
        )
        .optional()?;

    raw.map_or(Ok(0), |value| {
        value.parse().map_err(|_| Error::DatabaseMigration {
            message: format!("invalid schema version: {value}"),
        })
    })
}

fn write_version(conn: &Connection, version: i32) -> Result<()> {
    conn.execute(
        "INSERT INTO metadata (key, value) VALUES (?1, ?2) \
         ON CONFLICT(key) DO UPDATE SET value = excluded.value",
        (VERSION_KEY, version.to_string()),
    )?;
    Ok(())
}

/// Apply every migration newer than `stored` in one transaction.
fn migrate(conn: &Connection, stored: i32) -> Result<()> {
    let tx = conn.unchecked_transaction()?;
    for version in (stored + 1)..=CURRENT_VERSION {
        apply(&tx, version)?;
        write_version(&tx, version)?;
    }
    tx.commit()?;

    if stored > 0 {
        info!("Migrated database schema from v{stored} to v{CURRENT_VERSION}");
    }
    Ok(())
}

/// Apply one migration by version.
fn apply(conn: &Connection, version: i32) -> Result<()> {
    let (_, step) = MIGRATIONS
        .iter()
        .find(|(v, _)| *v == version)
        .ok_or_else(|| Error::DatabaseMigration {
            message: format!("unknown migration version: {version}"),
        })?;
    step(conn)
}

fn migrate_v1(_conn: &Connection) -> Result<()> {
    Ok(())
}

/// Normalize `CURRENT_TIMESTAMP` values and give every order a `created`
/// history entry.
fn migrate_v2(conn: &Connection) -> Result<()> {
    for column in ["created_at", "updated_at"] {
        conn.execute(
            &format!(
                "UPDATE orders SET {column} = replace({column}, ' ', 'T') || '.000000000Z' \
                 WHERE {column} NOT LIKE '%T%'"
            ),
            [],
        )?;
    }

    let backfilled = conn.execute(
        r"
        INSERT INTO order_history (cle, timestamp, actor, action, changed_data)
        SELECT cle, created_at, created_by, 'created', circle_data FROM orders
        WHERE cle NOT IN (SELECT DISTINCT cle FROM order_history)
        ",
        [],
    )?;
    if backfilled > 0 {
        info!("Backfilled history for {backfilled} orders");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_db() -> Connection {
        Connection::open_in_memory().expect("failed to create in-memory database")
    }

    fn table_exists(conn: &Connection, name: &str) -> bool {
        let count: i32 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name=?1",
                [name],
                |row| row.get(0),
            )
            .unwrap();
        count == 1
    }

    #[test]
    fn test_initialize_schema_creates_tables() {
        let conn = create_test_db();
        initialize_schema(&conn).expect("failed to initialize schema");

        assert!(table_exists(&conn, "orders"));
        assert!(table_exists(&conn, "order_history"));
        assert!(table_exists(&conn, "metadata"));
    }

    #[test]
    fn test_initialize_schema_sets_version() {
        let conn = create_test_db();
        initialize_schema(&conn).expect("failed to initialize schema");

        assert_eq!(read_version(&conn).unwrap(), CURRENT_VERSION);
    }

    #[test]
    fn test_initialize_schema_idempotent() {
        let conn = create_test_db();

        initialize_schema(&conn).expect("first init failed");
        initialize_schema(&conn).expect("second init failed");

        assert_eq!(read_version(&conn).unwrap(), CURRENT_VERSION);
    }

    #[test]
    fn test_get_schema_version_fresh_db() {
        let conn = create_test_db();
        conn.execute(
            "CREATE TABLE metadata (key TEXT PRIMARY KEY, value TEXT NOT NULL)",
            [],
        )
        .unwrap();

        assert_eq!(read_version(&conn).unwrap(), 0);
    }

    #[test]
    fn test_invalid_schema_version() {
        let conn = create_test_db();
        initialize_schema(&conn).unwrap();
        conn.execute(
            "UPDATE metadata SET value = 'two' WHERE key = ?1",
            [VERSION_KEY],
        )
        .unwrap();

        let err = read_version(&conn).unwrap_err();
        assert!(err.to_string().contains("invalid schema version"));
    }

    #[test]
    fn test_apply_unknown_version() {
        let conn = create_test_db();
        initialize_schema(&conn).unwrap();

        let err = apply(&conn, 999).unwrap_err();
        assert!(err.to_string().contains("unknown migration version"));
    }

    #[test]
    fn test_migrate_legacy_orders() {
        let conn = create_test_db();
        for statement in SCHEMA_STATEMENTS {
            conn.execute(statement, []).unwrap();
        }
        write_version(&conn, 1).unwrap();
        conn.execute(
            r#"INSERT INTO orders VALUES ('CLE-OLD', 'castle_a', 'pending_castle_review',
               'broker_a', 'broker_a', '2024-03-01 09:30:00', '2024-03-02 10:00:00', '{"C1":"A0"}')"#,
            [],
        )
        .unwrap();

        initialize_schema(&conn).unwrap();

        let created_at: String = conn
            .query_row("SELECT created_at FROM orders", [], |row| row.get(0))
            .unwrap();
        assert_eq!(created_at, "2024-03-01T09:30:00.000000000Z");

        let (actor, action): (String, String) = conn
            .query_row(
                "SELECT actor, action FROM order_history WHERE cle = 'CLE-OLD'",
                [],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .unwrap();
        assert_eq!(actor, "broker_a");
        assert_eq!(action, "created");
        assert_eq!(read_version(&conn).unwrap(), CURRENT_VERSION);
    }

    #[test]
    fn test_indexes_created() {
        let conn = create_test_db();
        initialize_schema(&conn).expect("failed to initialize schema");

        let indexes: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='index' AND name LIKE 'idx_%'")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .filter_map(|r| r.ok())
            .collect();

        assert!(indexes.iter().any(|n| n.contains("holder")));
        assert!(indexes.iter().any(|n| n.contains("creator")));
        assert!(indexes.iter().any(|n| n.contains("history")));
    }
}
