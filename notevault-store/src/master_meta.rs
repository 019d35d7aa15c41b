//! Process-wide master metadata.
//!
//! One mutable singleton row holding the schema version tag, the hashed
//! unlock secret (never the secret itself), and the default encryption
//! policy. All updates run as load-modify-save inside a single critical
//! section on the shared connection, so writers are serialized and every
//! read observes the latest committed value.

use crate::error::{StoreError, StoreResult};
use chrono::Utc;
use duckdb::{params, Connection};
use notevault_crypto::{hash_unlock_secret, verify_unlock_secret};
use notevault_types::EncryptionPolicy;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};

/// Schema version tag written at first run.
pub const SCHEMA_VERSION: &str = "notevault-v1";

/// Minimum unlock secret length.
pub const MIN_SECRET_LENGTH: usize = 6;

const META_KEY: &str = "master_meta";

/// The singleton master metadata record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MasterMeta {
    pub created_at: i64,
    pub schema_version: String,
    /// Argon2id PHC hash of the unlock secret; the raw secret is never stored.
    pub unlock_secret_hash: Option<String>,
    pub default_policy: EncryptionPolicy,
}

impl MasterMeta {
    fn first_run() -> Self {
        Self {
            created_at: Utc::now().timestamp_millis(),
            schema_version: SCHEMA_VERSION.to_string(),
            unlock_secret_hash: None,
            default_policy: EncryptionPolicy::ClientOnly,
        }
    }
}

/// Load/save boundary for [`MasterMeta`].
#[derive(Clone)]
pub struct MasterMetaStore {
    conn: Arc<Mutex<Connection>>,
}

impl MasterMetaStore {
    /// Opens the meta table on a shared connection, seeding defaults on
    /// first run (policy `client-only`, no unlock secret).
    pub fn open(conn: Arc<Mutex<Connection>>) -> StoreResult<Self> {
        let store = Self { conn };
        {
            let guard = store
                .conn
                .lock()
                .map_err(|e| StoreError::Storage(e.to_string()))?;
            guard.execute_batch(
                "CREATE TABLE IF NOT EXISTS meta (
                    key VARCHAR PRIMARY KEY,
                    value TEXT NOT NULL
                );",
            )?;
            if Self::read_row(&guard)?.is_none() {
                Self::write_row(&guard, &MasterMeta::first_run())?;
            }
        }
        Ok(store)
    }

    fn read_row(conn: &Connection) -> StoreResult<Option<MasterMeta>> {
        let result: Result<String, _> = conn.query_row(
            "SELECT value FROM meta WHERE key = ?",
            params![META_KEY],
            |row| row.get(0),
        );
        match result {
            Ok(json) => Ok(Some(serde_json::from_str(&json)?)),
            Err(duckdb::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn write_row(conn: &Connection, meta: &MasterMeta) -> StoreResult<()> {
        let json = serde_json::to_string(meta)?;
        conn.execute(
            "INSERT OR REPLACE INTO meta (key, value) VALUES (?, ?)",
            params![META_KEY, json],
        )?;
        Ok(())
    }

    /// Current committed master metadata.
    pub fn load(&self) -> StoreResult<MasterMeta> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| StoreError::Storage(e.to_string()))?;
        Self::read_row(&conn)?
            .ok_or_else(|| StoreError::Storage("master meta row missing".into()))
    }

    /// First-time unlock secret setup.
    ///
    /// Stores only the Argon2id PHC hash. Fails with [`StoreError::SecretAlreadySet`]
    /// if a secret exists — changing it requires proving the prior one.
    pub fn set_unlock_secret(&self, secret: &str) -> StoreResult<()> {
        if secret.len() < MIN_SECRET_LENGTH {
            return Err(StoreError::SecretTooShort(MIN_SECRET_LENGTH));
        }
        let conn = self
            .conn
            .lock()
            .map_err(|e| StoreError::Storage(e.to_string()))?;
        let mut meta = Self::read_row(&conn)?
            .ok_or_else(|| StoreError::Storage("master meta row missing".into()))?;
        if meta.unlock_secret_hash.is_some() {
            return Err(StoreError::SecretAlreadySet);
        }
        meta.unlock_secret_hash = Some(hash_unlock_secret(secret)?);
        Self::write_row(&conn, &meta)
    }

    /// Replace the unlock secret after proving knowledge of the old one.
    pub fn change_unlock_secret(&self, old: &str, new: &str) -> StoreResult<()> {
        if new.len() < MIN_SECRET_LENGTH {
            return Err(StoreError::SecretTooShort(MIN_SECRET_LENGTH));
        }
        let conn = self
            .conn
            .lock()
            .map_err(|e| StoreError::Storage(e.to_string()))?;
        let mut meta = Self::read_row(&conn)?
            .ok_or_else(|| StoreError::Storage("master meta row missing".into()))?;
        let current = meta
            .unlock_secret_hash
            .as_deref()
            .ok_or(StoreError::SecretInvalid)?;
        if !verify_unlock_secret(old, current)? {
            return Err(StoreError::SecretInvalid);
        }
        meta.unlock_secret_hash = Some(hash_unlock_secret(new)?);
        Self::write_row(&conn, &meta)
    }

    /// Check a candidate unlock secret against the stored hash.
    pub fn verify_unlock_secret(&self, secret: &str) -> StoreResult<bool> {
        let meta = self.load()?;
        match meta.unlock_secret_hash.as_deref() {
            Some(phc) => Ok(verify_unlock_secret(secret, phc)?),
            None => Ok(false),
        }
    }

    /// Reconfigure the default encryption policy. Last writer wins.
    pub fn set_default_policy(&self, policy: EncryptionPolicy) -> StoreResult<()> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| StoreError::Storage(e.to_string()))?;
        let mut meta = Self::read_row(&conn)?
            .ok_or_else(|| StoreError::Storage("master meta row missing".into()))?;
        meta.default_policy = policy;
        Self::write_row(&conn, &meta)
    }
}
