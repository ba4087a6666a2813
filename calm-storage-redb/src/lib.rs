//! # CALM storage (redb)
//!
//! `redb`-backed implementation of [`calm_core::metadata_store::MetadataStore`]:
//! sessions/active-GHAP, terminal GHAP entries, gate passes, journal
//! entries, counters, and validated values.
//!
//! Grounded directly in the teacher's `memory-storage-redb` crate: typed
//! `TableDefinition<&str, &[u8]>` tables, a size-capped
//! deserialization path, and a `spawn_blocking` + timeout wrapper
//! (`with_db_timeout`) around every blocking redb call so the async
//! `MetadataStore` trait never blocks its caller's executor thread. The
//! teacher serializes with `postcard`; this crate does the same.
//!
//! The single-active-entry-per-session invariant (spec.md §5, §8 invariant
//! 1) is enforced by `insert_active` performing its existence check and
//! insert inside one redb write transaction — redb's single-writer model
//! serializes concurrent callers, so exactly one insert for a given session
//! can win.

mod store;
mod tables;

use std::sync::Arc;
use std::time::Duration;

use calm_core::error::{Error, Result};
use redb::Database;
use tracing::info;

pub use tables::{
    ACTIVE_TABLE, COUNTERS_TABLE, GATE_PASSES_TABLE, JOURNAL_TABLE, SESSION_TOUCH_TABLE,
    TERMINAL_TABLE, VALUES_TABLE,
};

/// Deserialization size cap: refuses to decode a payload larger than this,
/// defending against a corrupted or maliciously oversized on-disk value
/// (teacher's `MAX_EPISODE_SIZE` pattern, sized down for CALM's smaller
/// per-record payloads).
pub const MAX_PAYLOAD_SIZE: usize = 1_000_000;

const DB_OPERATION_TIMEOUT: Duration = Duration::from_secs(10);

/// Runs a blocking redb operation on the blocking pool, bounded by
/// [`DB_OPERATION_TIMEOUT`].
pub(crate) async fn with_db_timeout<T, F>(operation: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    match tokio::time::timeout(DB_OPERATION_TIMEOUT, tokio::task::spawn_blocking(operation)).await {
        Ok(Ok(result)) => result,
        Ok(Err(join_err)) => Err(Error::Storage(format!("task join error: {join_err}"))),
        Err(_) => Err(Error::Storage(format!(
            "metadata store operation timed out after {DB_OPERATION_TIMEOUT:?}"
        ))),
    }
}

pub(crate) fn encode<T: serde::Serialize>(value: &T) -> Result<Vec<u8>> {
    postcard::to_allocvec(value).map_err(|e| Error::Storage(format!("serialize failed: {e}")))
}

pub(crate) fn decode<T: serde::de::DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    if bytes.len() > MAX_PAYLOAD_SIZE {
        return Err(Error::Storage(format!(
            "payload of {} bytes exceeds {MAX_PAYLOAD_SIZE} byte cap",
            bytes.len()
        )));
    }
    postcard::from_bytes(bytes).map_err(|e| Error::Storage(format!("deserialize failed: {e}")))
}

/// A `redb`-backed [`calm_core::metadata_store::MetadataStore`].
pub struct RedbMetadataStore {
    db: Arc<Database>,
}

impl RedbMetadataStore {
    /// Opens (creating if absent) the database file at `path` and ensures
    /// every table exists.
    ///
    /// # Errors
    /// [`Error::Storage`] if the file cannot be created/opened or a table
    /// cannot be initialized.
    pub async fn open(path: &std::path::Path) -> Result<Self> {
        let path_buf = path.to_path_buf();
        let db = with_db_timeout(move || {
            Database::create(&path_buf).map_err(|e| Error::Storage(format!("failed to open database: {e}")))
        })
        .await?;
        let store = Self { db: Arc::new(db) };
        store.initialize_tables().await?;
        info!(path = %path.display(), "opened CALM metadata store");
        Ok(store)
    }

    async fn initialize_tables(&self) -> Result<()> {
        let db = Arc::clone(&self.db);
        with_db_timeout(move || {
            let write_txn = db
                .begin_write()
                .map_err(|e| Error::Storage(format!("failed to begin write transaction: {e}")))?;
            {
                write_txn
                    .open_table(ACTIVE_TABLE)
                    .map_err(|e| Error::Storage(format!("failed to open active table: {e}")))?;
                write_txn
                    .open_table(TERMINAL_TABLE)
                    .map_err(|e| Error::Storage(format!("failed to open terminal table: {e}")))?;
                write_txn
                    .open_table(GATE_PASSES_TABLE)
                    .map_err(|e| Error::Storage(format!("failed to open gate passes table: {e}")))?;
                write_txn
                    .open_table(JOURNAL_TABLE)
                    .map_err(|e| Error::Storage(format!("failed to open journal table: {e}")))?;
                write_txn
                    .open_table(COUNTERS_TABLE)
                    .map_err(|e| Error::Storage(format!("failed to open counters table: {e}")))?;
                write_txn
                    .open_table(VALUES_TABLE)
                    .map_err(|e| Error::Storage(format!("failed to open values table: {e}")))?;
                write_txn
                    .open_table(SESSION_TOUCH_TABLE)
                    .map_err(|e| Error::Storage(format!("failed to open session touch table: {e}")))?;
            }
            write_txn
                .commit()
                .map_err(|e| Error::Storage(format!("failed to commit transaction: {e}")))?;
            Ok(())
        })
        .await
    }
}
