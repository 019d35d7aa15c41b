//! DuckDB-backed storage layer for NoteVault.
//!
//! Persists the note metadata index, the append-only encrypted version log,
//! and the master metadata singleton, and hosts the encryption policy engine
//! that ties them to the crypto layer.
//!
//! # Architecture
//!
//! - `NoteStore` — metadata index keyed by note id (plaintext by design)
//! - `VersionStore` — ordered, immutable, encrypted version records
//! - `MasterMetaStore` — unlock-secret hash + default policy singleton
//! - `NoteService` — per-write policy resolution and the crypto pipeline

mod engine;
mod error;
mod master_meta;
mod note_store;
mod version_store;

pub use engine::{HybridWrap, KeyWrap, NoteService, NoteServiceConfig, VersionView};
pub use error::{StoreError, StoreResult};
pub use master_meta::{MasterMeta, MasterMetaStore, MIN_SECRET_LENGTH, SCHEMA_VERSION};
pub use note_store::{NotePatch, NoteStore};
pub use version_store::VersionStore;

/// Open a DuckDB connection with stale WAL recovery and resource limits.
///
/// If the initial open fails and a `.wal` file exists alongside the database,
/// it is removed and the open retried once — an unclean shutdown can leave a
/// WAL file that prevents reopening. `memory_limit` and `threads` cap
/// per-database resource usage (DuckDB defaults to ~80% of system RAM).
pub fn open_duckdb_with_wal_recovery(
    path: &std::path::Path,
    memory_limit: &str,
    threads: u32,
) -> StoreResult<duckdb::Connection> {
    let conn = match duckdb::Connection::open(path) {
        Ok(c) => c,
        Err(first_err) => {
            let wal_path = path.with_extension(
                path.extension()
                    .map(|ext| format!("{}.wal", ext.to_string_lossy()))
                    .unwrap_or_else(|| "wal".to_string()),
            );
            if wal_path.exists() {
                tracing::warn!(
                    wal = %wal_path.display(),
                    "DuckDB open failed, removing stale WAL and retrying"
                );
                if std::fs::remove_file(&wal_path).is_ok() {
                    let c = duckdb::Connection::open(path)?;
                    apply_resource_limits(&c, memory_limit, threads)?;
                    return Ok(c);
                }
            }
            return Err(first_err.into());
        }
    };
    apply_resource_limits(&conn, memory_limit, threads)?;
    Ok(conn)
}

fn apply_resource_limits(
    conn: &duckdb::Connection,
    memory_limit: &str,
    threads: u32,
) -> StoreResult<()> {
    conn.execute_batch(&format!(
        "PRAGMA memory_limit='{}'; PRAGMA threads={};",
        memory_limit, threads
    ))?;
    Ok(())
}
