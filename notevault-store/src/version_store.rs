//! Append-only version log, ordered per note.
//!
//! Each version is an independent, self-contained unit: appending never
//! rewrites prior rows, so a failed write leaves earlier versions untouched
//! and no rollback is ever needed. Ordering is by creation time with a
//! per-note monotonic sequence counter breaking same-millisecond ties.

use crate::error::{StoreError, StoreResult};
use chrono::Utc;
use duckdb::{params, Connection};
use notevault_types::{EncryptionPolicy, NoteId, VersionRecord, VersionSummary, NONCE_SIZE};
use std::sync::{Arc, Mutex};

/// Versioned blob store backed by DuckDB.
#[derive(Clone)]
pub struct VersionStore {
    conn: Arc<Mutex<Connection>>,
}

impl VersionStore {
    pub fn open(conn: Arc<Mutex<Connection>>) -> StoreResult<Self> {
        let store = Self { conn };
        {
            let guard = store
                .conn
                .lock()
                .map_err(|e| StoreError::Storage(e.to_string()))?;
            guard.execute_batch(
                "CREATE TABLE IF NOT EXISTS note_versions (
                    note_id VARCHAR NOT NULL,
                    seq BIGINT NOT NULL,
                    created_at BIGINT NOT NULL,
                    policy VARCHAR NOT NULL,
                    nonce BLOB NOT NULL,
                    ciphertext BLOB NOT NULL,
                    checksum VARCHAR NOT NULL,
                    aux_meta TEXT NOT NULL DEFAULT '{}',
                    PRIMARY KEY (note_id, seq)
                );
                CREATE INDEX IF NOT EXISTS idx_versions_order
                    ON note_versions(note_id, created_at, seq);",
            )?;
        }
        Ok(store)
    }

    /// Append a new version.
    ///
    /// The creation timestamp is assigned here, at acceptance — after
    /// encryption has already completed — so a retried write never stores a
    /// timestamp older than its content. Sequence assignment and the insert
    /// share one critical section, making the append atomic per version.
    pub fn append(
        &self,
        note_id: &NoteId,
        policy: EncryptionPolicy,
        nonce: [u8; NONCE_SIZE],
        ciphertext: Vec<u8>,
        checksum: String,
        aux_meta: serde_json::Value,
    ) -> StoreResult<VersionRecord> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| StoreError::Storage(e.to_string()))?;

        let seq: i64 = conn.query_row(
            "SELECT COALESCE(MAX(seq) + 1, 0) FROM note_versions WHERE note_id = ?",
            params![note_id.to_string()],
            |row| row.get(0),
        )?;
        let created_at = Utc::now().timestamp_millis();
        let aux_json = serde_json::to_string(&aux_meta)?;

        conn.execute(
            "INSERT INTO note_versions (note_id, seq, created_at, policy, nonce, ciphertext, checksum, aux_meta)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
            params![
                note_id.to_string(),
                seq,
                created_at,
                policy.as_str(),
                nonce.to_vec(),
                ciphertext,
                checksum,
                aux_json,
            ],
        )?;

        Ok(VersionRecord {
            note_id: *note_id,
            seq,
            created_at,
            policy,
            nonce,
            ciphertext,
            checksum,
            aux_meta,
        })
    }

    /// Version summaries for a note, newest first.
    ///
    /// Metadata only — no ciphertext, no nonce, no decryption. Servable even
    /// when the server holds no key for this note.
    pub fn list(&self, note_id: &NoteId) -> StoreResult<Vec<VersionSummary>> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| StoreError::Storage(e.to_string()))?;
        let mut stmt = conn.prepare(
            "SELECT seq, created_at, policy, checksum, aux_meta
             FROM note_versions WHERE note_id = ?
             ORDER BY created_at DESC, seq DESC",
        )?;
        let summaries = stmt
            .query_map(params![note_id.to_string()], |row| {
                let policy_str: String = row.get(2)?;
                let aux_json: String = row.get(4)?;
                Ok(VersionSummary {
                    seq: row.get(0)?,
                    created_at: row.get(1)?,
                    policy: policy_str.parse().unwrap_or_default(),
                    checksum: row.get(3)?,
                    aux_meta: serde_json::from_str(&aux_json)
                        .unwrap_or(serde_json::Value::Null),
                })
            })?
            .filter_map(|r| r.ok())
            .collect();
        Ok(summaries)
    }

    /// Read one version by sequence number.
    pub fn read(&self, note_id: &NoteId, seq: i64) -> StoreResult<VersionRecord> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| StoreError::Storage(e.to_string()))?;
        let result = conn.query_row(
            "SELECT note_id, seq, created_at, policy, nonce, ciphertext, checksum, aux_meta
             FROM note_versions WHERE note_id = ? AND seq = ?",
            params![note_id.to_string(), seq],
            row_to_version,
        );
        match result {
            Ok(record) => Ok(record),
            Err(duckdb::Error::QueryReturnedNoRows) => {
                Err(StoreError::VersionNotFound(*note_id, seq))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// The most recent version, if any.
    pub fn latest(&self, note_id: &NoteId) -> StoreResult<Option<VersionRecord>> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| StoreError::Storage(e.to_string()))?;
        let result = conn.query_row(
            "SELECT note_id, seq, created_at, policy, nonce, ciphertext, checksum, aux_meta
             FROM note_versions WHERE note_id = ?
             ORDER BY created_at DESC, seq DESC LIMIT 1",
            params![note_id.to_string()],
            row_to_version,
        );
        match result {
            Ok(record) => Ok(Some(record)),
            Err(duckdb::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Delete every version of a note. Irreversible.
    pub fn delete_all(&self, note_id: &NoteId) -> StoreResult<usize> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| StoreError::Storage(e.to_string()))?;
        let affected = conn.execute(
            "DELETE FROM note_versions WHERE note_id = ?",
            params![note_id.to_string()],
        )?;
        Ok(affected)
    }
}

fn row_to_version(row: &duckdb::Row<'_>) -> duckdb::Result<VersionRecord> {
    let note_id_str: String = row.get(0)?;
    let policy_str: String = row.get(3)?;
    let nonce_bytes: Vec<u8> = row.get(4)?;
    let aux_json: String = row.get(7)?;

    let mut nonce = [0u8; NONCE_SIZE];
    if nonce_bytes.len() == NONCE_SIZE {
        nonce.copy_from_slice(&nonce_bytes);
    }

    Ok(VersionRecord {
        note_id: note_id_str.parse().unwrap_or_default(),
        seq: row.get(1)?,
        created_at: row.get(2)?,
        policy: policy_str.parse().unwrap_or_default(),
        nonce,
        ciphertext: row.get(5)?,
        checksum: row.get(6)?,
        aux_meta: serde_json::from_str(&aux_json).unwrap_or(serde_json::Value::Null),
    })
}
