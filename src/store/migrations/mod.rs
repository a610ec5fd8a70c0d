//! Schema migrations, tracked with `PRAGMA user_version`.

use calbridge_core::{BridgeError, BridgeResult};
use rusqlite::Connection;

use super::link_error;

struct Migration {
    version: u32,
    sql: &'static str,
}

const MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    sql: include_str!("0001_init.sql"),
}];

pub fn latest_version() -> u32 {
    MIGRATIONS.last().map_or(0, |m| m.version)
}

/// Apply all pending migrations in one transaction.
pub fn apply_migrations(conn: &mut Connection) -> BridgeResult<()> {
    let current = current_user_version(conn)?;
    let latest = latest_version();

    if current > latest {
        return Err(BridgeError::Link(format!(
            "database schema version {current} is newer than supported version {latest}"
        )));
    }
    if current == latest {
        return Ok(());
    }

    let tx = conn.transaction().map_err(link_error)?;
    for migration in MIGRATIONS.iter().filter(|m| m.version > current) {
        tx.execute_batch(migration.sql).map_err(link_error)?;
        tx.execute_batch(&format!("PRAGMA user_version = {};", migration.version))
            .map_err(link_error)?;
    }
    tx.commit().map_err(link_error)
}

fn current_user_version(conn: &Connection) -> BridgeResult<u32> {
    conn.query_row("PRAGMA user_version;", [], |row| row.get(0))
        .map_err(link_error)
}
