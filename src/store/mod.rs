//! Persistent state: the link table and the calendar credential.

mod migrations;
mod sqlite;

use calbridge_core::BridgeError;

pub use sqlite::SqliteStore;

fn link_error(e: rusqlite::Error) -> BridgeError {
    BridgeError::Link(e.to_string())
}
