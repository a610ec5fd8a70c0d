use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use calbridge_core::credential::{CredentialStore, TokenRecord};
use calbridge_core::{BridgeError, BridgeResult, LinkRecord, LinkStore};
use chrono::{DateTime, Utc};
use rusqlite::{Connection, ErrorCode, OptionalExtension, params};
use tracing::{debug, info};

use super::link_error;
use super::migrations::apply_migrations;
use crate::config::DatabaseLocation;

/// A link row together with when it was written.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredLink {
    pub link: LinkRecord,
    pub created_at: String,
}

/// SQLite-backed [`LinkStore`] and [`CredentialStore`].
///
/// Every operation is a single statement, so the table never holds a
/// partially applied change.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn open(location: &DatabaseLocation) -> BridgeResult<Self> {
        match location {
            DatabaseLocation::File(path) => Self::open_file(path),
            DatabaseLocation::Memory => Self::open_in_memory(),
        }
    }

    pub fn open_file(path: &Path) -> BridgeResult<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                BridgeError::Link(format!("Failed to create {}: {}", parent.display(), e))
            })?;
        }

        let conn = Connection::open(path).map_err(|e| {
            BridgeError::Link(format!("Failed to open {}: {}", path.display(), e))
        })?;
        let store = Self::bootstrap(conn)?;

        info!(path = %path.display(), "Opened link database");
        Ok(store)
    }

    pub fn open_in_memory() -> BridgeResult<Self> {
        let conn = Connection::open_in_memory().map_err(link_error)?;
        Self::bootstrap(conn)
    }

    fn bootstrap(mut conn: Connection) -> BridgeResult<Self> {
        conn.busy_timeout(Duration::from_secs(5))
            .map_err(link_error)?;
        apply_migrations(&mut conn)?;

        Ok(SqliteStore {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> BridgeResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| BridgeError::Link("link database lock poisoned".to_string()))
    }

    /// All links with their creation time, oldest first.
    pub fn list_detailed(&self) -> BridgeResult<Vec<StoredLink>> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare("SELECT source_id, sink_id, created_at FROM links ORDER BY rowid")
            .map_err(link_error)?;

        let rows = stmt
            .query_map([], |row| {
                Ok(StoredLink {
                    link: LinkRecord::new(row.get::<_, String>(0)?, row.get::<_, String>(1)?),
                    created_at: row.get(2)?,
                })
            })
            .map_err(link_error)?;

        rows.collect::<Result<Vec<_>, _>>().map_err(link_error)
    }
}

#[async_trait]
impl LinkStore for SqliteStore {
    async fn list_all(&self) -> BridgeResult<Vec<LinkRecord>> {
        Ok(self
            .list_detailed()?
            .into_iter()
            .map(|stored| stored.link)
            .collect())
    }

    async fn find_by_sink_id(&self, sink_id: &str) -> BridgeResult<Option<LinkRecord>> {
        let conn = self.conn()?;
        conn.query_row(
            "SELECT source_id, sink_id FROM links WHERE sink_id = ?1",
            params![sink_id],
            |row| Ok(LinkRecord::new(row.get::<_, String>(0)?, row.get::<_, String>(1)?)),
        )
        .optional()
        .map_err(link_error)
    }

    async fn create(&self, source_id: &str, sink_id: &str) -> BridgeResult<LinkRecord> {
        let conn = self.conn()?;
        let result = conn.execute(
            "INSERT INTO links (source_id, sink_id, created_at) VALUES (?1, ?2, ?3)",
            params![source_id, sink_id, Utc::now().to_rfc3339()],
        );

        match result {
            Ok(_) => {
                debug!(source_id, sink_id, "Stored link");
                Ok(LinkRecord::new(source_id, sink_id))
            }
            Err(rusqlite::Error::SqliteFailure(e, _)) if e.code == ErrorCode::ConstraintViolation => {
                Err(BridgeError::DuplicateLink {
                    source_id: source_id.to_string(),
                    sink_id: sink_id.to_string(),
                })
            }
            Err(e) => Err(link_error(e)),
        }
    }

    async fn delete_by_source_id(&self, source_id: &str) -> BridgeResult<bool> {
        let conn = self.conn()?;
        let removed = conn
            .execute("DELETE FROM links WHERE source_id = ?1", params![source_id])
            .map_err(link_error)?;
        Ok(removed > 0)
    }

    async fn delete_by_sink_id(&self, sink_id: &str) -> BridgeResult<bool> {
        let conn = self.conn()?;
        let removed = conn
            .execute("DELETE FROM links WHERE sink_id = ?1", params![sink_id])
            .map_err(link_error)?;
        Ok(removed > 0)
    }
}

#[async_trait]
impl CredentialStore for SqliteStore {
    async fn load(&self) -> BridgeResult<Option<TokenRecord>> {
        let conn = self.conn()?;
        let row = conn
            .query_row(
                "SELECT access_token, refresh_token, expires_at FROM token WHERE id = 1",
                [],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, Option<String>>(2)?,
                    ))
                },
            )
            .optional()
            .map_err(link_error)?;

        let Some((access_token, refresh_token, expires_at)) = row else {
            return Ok(None);
        };

        let expires_at = match expires_at {
            Some(s) => Some(
                DateTime::parse_from_rfc3339(&s)
                    .map_err(|e| BridgeError::Link(format!("Invalid token expiry '{s}': {e}")))?
                    .with_timezone(&Utc),
            ),
            None => None,
        };

        Ok(Some(TokenRecord {
            access_token,
            refresh_token,
            expires_at,
        }))
    }

    async fn save(&self, record: &TokenRecord) -> BridgeResult<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO token (id, access_token, refresh_token, expires_at)
             VALUES (1, ?1, ?2, ?3)
             ON CONFLICT(id) DO UPDATE SET
                 access_token = excluded.access_token,
                 refresh_token = excluded.refresh_token,
                 expires_at = excluded.expires_at",
            params![
                record.access_token,
                record.refresh_token,
                record.expires_at.map(|t| t.to_rfc3339())
            ],
        )
        .map_err(link_error)?;
        Ok(())
    }
}
