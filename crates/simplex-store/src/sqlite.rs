//! SQLite implementation of the Store trait.
//!
//! rusqlite with bundled SQLite, wrapped in async via `spawn_blocking`.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use simplex_core::{ChainNonce, Digest};
use tracing::debug;

use crate::error::{Result, StoreError};
use crate::migration;
use crate::traits::{AppendResult, Store, StoredSeal};

/// SQLite-based store.
///
/// One connection behind a mutex. Every operation runs on the blocking pool.
#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open a SQLite database at the given path.
    ///
    /// Creates the file and runs migrations if needed.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let mut conn = Connection::open(path)?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open an in-memory SQLite database.
    pub fn open_memory() -> Result<Self> {
        let mut conn = Connection::open_in_memory()?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run `f` against the connection on the blocking pool.
    async fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = conn.lock();
            f(&mut conn)
        })
        .await?
    }
}

fn digest_from_blob(bytes: Vec<u8>, column: &str) -> Result<Digest> {
    Digest::try_from(bytes.as_slice())
        .map_err(|_| StoreError::InvalidData(format!("{} is {} bytes, expected 32", column, bytes.len())))
}

fn position_param(position: u64) -> Result<i64> {
    i64::try_from(position)
        .map_err(|_| StoreError::InvalidData(format!("seal position {} out of range", position)))
}

#[async_trait]
impl Store for SqliteStore {
    async fn save_nonce(&self, nonce: &ChainNonce) -> Result<()> {
        let nonce = *nonce;
        self.with_conn(move |conn| {
            let existing: Option<Vec<u8>> = conn
                .query_row("SELECT nonce FROM chain_meta WHERE id = 1", [], |row| row.get(0))
                .optional()?;

            match existing {
                Some(bytes) if bytes.as_slice() == nonce.as_bytes().as_slice() => Ok(()),
                Some(bytes) => Err(StoreError::InvalidData(format!(
                    "store already holds chain nonce {}",
                    hex::encode(&bytes)
                ))),
                None => {
                    conn.execute(
                        "INSERT INTO chain_meta (id, nonce) VALUES (1, ?1)",
                        params![nonce.as_bytes().as_slice()],
                    )?;
                    Ok(())
                }
            }
        })
        .await
    }

    async fn load_nonce(&self) -> Result<Option<ChainNonce>> {
        self.with_conn(|conn| {
            let bytes: Option<Vec<u8>> = conn
                .query_row("SELECT nonce FROM chain_meta WHERE id = 1", [], |row| row.get(0))
                .optional()?;

            bytes
                .map(|bytes| {
                    ChainNonce::from_slice(&bytes).map_err(|e| StoreError::InvalidData(e.to_string()))
                })
                .transpose()
        })
        .await
    }

    async fn append_seal(&self, position: u64, link: &Digest, payload: &[u8]) -> Result<AppendResult> {
        let link = *link;
        let payload = payload.to_vec();
        let position_sql = position_param(position)?;

        self.with_conn(move |conn| {
            let tx = conn.transaction()?;

            let existing: Option<(Vec<u8>, Vec<u8>)> = tx
                .query_row(
                    "SELECT link, payload FROM seals WHERE position = ?1",
                    params![position_sql],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                )
                .optional()?;

            if let Some((stored_link, stored_payload)) = existing {
                let stored_link = digest_from_blob(stored_link, "link")?;
                if stored_link == link && stored_payload == payload {
                    return Ok(AppendResult::AlreadyExists);
                }
                return Ok(AppendResult::Conflict {
                    existing: stored_link,
                });
            }

            let count: i64 = tx.query_row("SELECT COUNT(*) FROM seals", [], |row| row.get(0))?;
            if position_sql != count + 1 {
                return Err(StoreError::InvalidData(format!(
                    "seal position {} is not contiguous, next position is {}",
                    position,
                    count + 1
                )));
            }

            tx.execute(
                "INSERT INTO seals (position, link, payload) VALUES (?1, ?2, ?3)",
                params![position_sql, link.as_bytes().as_slice(), payload],
            )?;
            tx.commit()?;

            debug!(position, "persisted seal");
            Ok(AppendResult::Appended)
        })
        .await
    }

    async fn load_seals(&self) -> Result<Vec<StoredSeal>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT position, link, payload FROM seals ORDER BY position")?;
            let rows = stmt
                .query_map([], |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, Vec<u8>>(1)?,
                        row.get::<_, Vec<u8>>(2)?,
                    ))
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            rows.into_iter()
                .map(|(position, link, payload)| {
                    let position = u64::try_from(position).map_err(|_| {
                        StoreError::InvalidData(format!("negative seal position {}", position))
                    })?;
                    Ok(StoredSeal {
                        position,
                        link: digest_from_blob(link, "link")?,
                        payload: Bytes::from(payload),
                    })
                })
                .collect()
        })
        .await
    }

    async fn seal_count(&self) -> Result<u64> {
        self.with_conn(|conn| {
            let count: i64 = conn.query_row("SELECT COUNT(*) FROM seals", [], |row| row.get(0))?;
            Ok(count as u64)
        })
        .await
    }
}
