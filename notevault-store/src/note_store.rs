//! Note metadata index.
//!
//! Metadata (title, type, tags, summary, timestamps) is deliberately not
//! confidential; it stays queryable without any key so listings work for
//! notes the server cannot decrypt.

use crate::error::{StoreError, StoreResult};
use chrono::Utc;
use duckdb::{params, Connection};
use notevault_types::{NoteId, NoteRecord};
use std::sync::{Arc, Mutex};

/// Partial metadata update; `None` fields are left untouched.
#[derive(Debug, Clone, Default)]
pub struct NotePatch {
    pub title: Option<String>,
    pub note_type: Option<String>,
    pub tags: Option<Vec<String>>,
    pub summary: Option<Option<String>>,
}

/// Metadata store keyed by note id, backed by DuckDB.
#[derive(Clone)]
pub struct NoteStore {
    conn: Arc<Mutex<Connection>>,
}

impl NoteStore {
    pub fn open(conn: Arc<Mutex<Connection>>) -> StoreResult<Self> {
        let store = Self { conn };
        {
            let guard = store
                .conn
                .lock()
                .map_err(|e| StoreError::Storage(e.to_string()))?;
            guard.execute_batch(
                "CREATE TABLE IF NOT EXISTS notes (
                    id VARCHAR PRIMARY KEY,
                    title VARCHAR NOT NULL,
                    note_type VARCHAR NOT NULL,
                    tags_json TEXT NOT NULL DEFAULT '[]',
                    summary VARCHAR,
                    created_at BIGINT NOT NULL,
                    modified_at BIGINT NOT NULL
                );",
            )?;
        }
        Ok(store)
    }

    /// Insert a new note record. The id must not already exist.
    pub fn insert(&self, record: &NoteRecord) -> StoreResult<()> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| StoreError::Storage(e.to_string()))?;
        let tags_json = serde_json::to_string(&record.tags)?;
        conn.execute(
            "INSERT INTO notes (id, title, note_type, tags_json, summary, created_at, modified_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
            params![
                record.id.to_string(),
                record.title,
                record.note_type,
                tags_json,
                record.summary,
                record.created_at,
                record.modified_at,
            ],
        )?;
        Ok(())
    }

    pub fn get(&self, id: &NoteId) -> StoreResult<Option<NoteRecord>> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| StoreError::Storage(e.to_string()))?;
        let result = conn.query_row(
            "SELECT id, title, note_type, tags_json, summary, created_at, modified_at
             FROM notes WHERE id = ?",
            params![id.to_string()],
            row_to_note,
        );
        match result {
            Ok(record) => Ok(Some(record)),
            Err(duckdb::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// All notes, most recently modified first.
    pub fn list(&self) -> StoreResult<Vec<NoteRecord>> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| StoreError::Storage(e.to_string()))?;
        let mut stmt = conn.prepare(
            "SELECT id, title, note_type, tags_json, summary, created_at, modified_at
             FROM notes ORDER BY modified_at DESC",
        )?;
        let notes = stmt
            .query_map([], row_to_note)?
            .filter_map(|r| r.ok())
            .collect();
        Ok(notes)
    }

    /// Apply a partial metadata update, bumping `modified_at`.
    pub fn patch(&self, id: &NoteId, patch: &NotePatch) -> StoreResult<NoteRecord> {
        let mut record = self
            .get(id)?
            .ok_or(StoreError::NoteNotFound(*id))?;

        if let Some(title) = &patch.title {
            record.title = title.clone();
        }
        if let Some(note_type) = &patch.note_type {
            record.note_type = note_type.clone();
        }
        if let Some(tags) = &patch.tags {
            record.tags = tags.clone();
        }
        if let Some(summary) = &patch.summary {
            record.summary = summary.clone();
        }
        record.modified_at = Utc::now().timestamp_millis();

        let conn = self
            .conn
            .lock()
            .map_err(|e| StoreError::Storage(e.to_string()))?;
        let tags_json = serde_json::to_string(&record.tags)?;
        conn.execute(
            "UPDATE notes SET title = ?, note_type = ?, tags_json = ?, summary = ?, modified_at = ?
             WHERE id = ?",
            params![
                record.title,
                record.note_type,
                tags_json,
                record.summary,
                record.modified_at,
                id.to_string(),
            ],
        )?;
        Ok(record)
    }

    /// Bump `modified_at` (called when a new version is appended).
    pub fn touch(&self, id: &NoteId, modified_at: i64) -> StoreResult<()> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| StoreError::Storage(e.to_string()))?;
        conn.execute(
            "UPDATE notes SET modified_at = ? WHERE id = ?",
            params![modified_at, id.to_string()],
        )?;
        Ok(())
    }

    /// Delete a note record. Returns whether a row existed.
    pub fn delete(&self, id: &NoteId) -> StoreResult<bool> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| StoreError::Storage(e.to_string()))?;
        let affected = conn.execute(
            "DELETE FROM notes WHERE id = ?",
            params![id.to_string()],
        )?;
        Ok(affected > 0)
    }
}

fn row_to_note(row: &duckdb::Row<'_>) -> duckdb::Result<NoteRecord> {
    let id_str: String = row.get(0)?;
    let tags_json: String = row.get(3)?;
    Ok(NoteRecord {
        id: id_str.parse().unwrap_or_default(),
        title: row.get(1)?,
        note_type: row.get(2)?,
        tags: serde_json::from_str(&tags_json).unwrap_or_default(),
        summary: row.get(4)?,
        created_at: row.get(5)?,
        modified_at: row.get(6)?,
    })
}
