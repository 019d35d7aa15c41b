//! Encryption policy engine.
//!
//! Resolves which trust model applies to each write and drives the
//! compress/derive/encrypt pipeline accordingly. Every successful write
//! yields exactly one new version record; a failure at any stage aborts
//! before anything is appended.

use crate::error::{StoreError, StoreResult};
use crate::master_meta::{MasterMeta, MasterMetaStore};
use crate::note_store::{NotePatch, NoteStore};
use crate::version_store::VersionStore;
use chrono::Utc;
use notevault_crypto::{
    checksum, compress, decompress, decrypt, derive_key, encrypt, verify, CryptoResult,
    DerivedKey, EncryptedData, KdfParams, MASTER_SALT,
};
use notevault_types::{
    AppendEvent, EncryptionPolicy, NewNote, NoteId, NoteRecord, VersionRecord, VersionSummary,
    WritePayload, NONCE_SIZE,
};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tokio::sync::{broadcast, OnceCell};

/// Pluggable post-processing stage for the `hybrid` policy.
///
/// Kept outside the core encrypt path so the client-only guarantee (the
/// server never sees inner plaintext) stays trivial to verify: a wrap stage
/// only ever receives ciphertext.
pub trait HybridWrap: Send + Sync {
    fn wrap(&self, note_id: &NoteId, ciphertext: &[u8]) -> CryptoResult<EncryptedData>;
    fn unwrap(&self, note_id: &NoteId, wrapped: &EncryptedData) -> CryptoResult<Vec<u8>>;
}

/// Default wrap stage: one extra ChaCha20-Poly1305 layer under a key.
pub struct KeyWrap {
    key: DerivedKey,
}

impl KeyWrap {
    pub fn new(key: DerivedKey) -> Self {
        Self { key }
    }
}

impl HybridWrap for KeyWrap {
    fn wrap(&self, _note_id: &NoteId, ciphertext: &[u8]) -> CryptoResult<EncryptedData> {
        // Ciphertext in, ciphertext out — no compression at this stage
        encrypt(&self.key, ciphertext)
    }

    fn unwrap(&self, _note_id: &NoteId, wrapped: &EncryptedData) -> CryptoResult<Vec<u8>> {
        decrypt(&self.key, wrapped)
    }
}

/// Service configuration.
///
/// `server_secret` feeds the server-assisted master key derivation under a
/// fixed domain salt. There is no rotation story for this key — a known
/// limitation carried over deliberately.
#[derive(Debug, Clone)]
pub struct NoteServiceConfig {
    pub server_secret: String,
    pub kdf: KdfParams,
}

impl NoteServiceConfig {
    pub fn new(server_secret: impl Into<String>) -> Self {
        Self {
            server_secret: server_secret.into(),
            kdf: KdfParams::default(),
        }
    }

    pub fn with_kdf(mut self, kdf: KdfParams) -> Self {
        self.kdf = kdf;
        self
    }
}

/// What a version read returns: stored (or unwrapped) ciphertext plus the
/// nonce the holder of the matching key needs. Never auto-decrypted.
#[derive(Debug, Clone)]
pub struct VersionView {
    pub seq: i64,
    pub created_at: i64,
    pub policy: EncryptionPolicy,
    pub ciphertext: Vec<u8>,
    pub nonce: [u8; NONCE_SIZE],
    pub aux_meta: serde_json::Value,
}

/// The note storage engine: metadata index + version log + policy layer.
pub struct NoteService {
    notes: NoteStore,
    versions: VersionStore,
    meta: MasterMetaStore,
    config: NoteServiceConfig,
    master_key: OnceCell<DerivedKey>,
    wrap_stage: Option<Arc<dyn HybridWrap>>,
    events: broadcast::Sender<AppendEvent>,
}

impl NoteService {
    /// Opens (or creates) the store at the given path.
    pub fn open(path: &Path, config: NoteServiceConfig) -> StoreResult<Self> {
        let conn = crate::open_duckdb_with_wal_recovery(path, "128MB", 1)?;
        Self::open_with_conn(Arc::new(Mutex::new(conn)), config)
    }

    /// Opens an in-memory store (for testing).
    pub fn open_in_memory(config: NoteServiceConfig) -> StoreResult<Self> {
        let conn = duckdb::Connection::open_in_memory()?;
        Self::open_with_conn(Arc::new(Mutex::new(conn)), config)
    }

    /// Opens over an existing shared connection.
    pub fn open_with_conn(
        conn: Arc<Mutex<duckdb::Connection>>,
        config: NoteServiceConfig,
    ) -> StoreResult<Self> {
        let notes = NoteStore::open(conn.clone())?;
        let versions = VersionStore::open(conn.clone())?;
        let meta = MasterMetaStore::open(conn)?;
        let (events, _) = broadcast::channel(64);
        Ok(Self {
            notes,
            versions,
            meta,
            config,
            master_key: OnceCell::new(),
            wrap_stage: None,
            events,
        })
    }

    /// Replace the default hybrid wrap stage.
    pub fn with_wrap_stage(mut self, stage: Arc<dyn HybridWrap>) -> Self {
        self.wrap_stage = Some(stage);
        self
    }

    /// Subscribe to append audit events.
    pub fn subscribe(&self) -> broadcast::Receiver<AppendEvent> {
        self.events.subscribe()
    }

    /// The server-assisted master key, derived once and cached.
    ///
    /// Argon2id is CPU-bound and deliberately slow, so the derivation runs on
    /// the blocking pool — one cold unlock never stalls unrelated reads.
    async fn master_key(&self) -> StoreResult<&DerivedKey> {
        self.master_key
            .get_or_try_init(|| async {
                tracing::debug!("deriving server master key");
                let secret = self.config.server_secret.clone();
                let params = self.config.kdf.clone();
                tokio::task::spawn_blocking(move || derive_key(&secret, &MASTER_SALT, &params))
                    .await
                    .map_err(|e| StoreError::Storage(format!("kdf task failed: {e}")))?
                    .map_err(StoreError::from)
            })
            .await
    }

    fn resolve_policy(&self, hint: Option<EncryptionPolicy>) -> StoreResult<EncryptionPolicy> {
        match hint {
            Some(policy) => Ok(policy),
            None => Ok(self.meta.load()?.default_policy),
        }
    }

    /// Run the policy state machine over one write payload.
    ///
    /// Returns the bytes to persist: `(nonce, ciphertext, aux_meta)`.
    async fn seal_payload(
        &self,
        note_id: &NoteId,
        policy: EncryptionPolicy,
        payload: WritePayload,
    ) -> StoreResult<([u8; NONCE_SIZE], Vec<u8>, serde_json::Value)> {
        match (payload, policy) {
            (WritePayload::Plaintext(plaintext), EncryptionPolicy::ServerAssisted) => {
                let compressed = compress(&plaintext)?;
                let key = self.master_key().await?;
                let sealed = encrypt(key, &compressed)?;
                Ok((
                    sealed.nonce,
                    sealed.ciphertext,
                    serde_json::json!({ "compressed": true }),
                ))
            }
            // Plaintext must never be persisted unencrypted; fail closed
            // instead of silently encrypting server-side.
            (WritePayload::Plaintext(_), other) => Err(StoreError::PolicyMismatch(format!(
                "plaintext payload not accepted under {other} policy"
            ))),
            (WritePayload::Encrypted { ciphertext, nonce }, EncryptionPolicy::ClientOnly) => {
                // Accepted opaquely; no server key material touches this path
                Ok((nonce, ciphertext, serde_json::json!({})))
            }
            (WritePayload::Encrypted { ciphertext, nonce }, EncryptionPolicy::Hybrid) => {
                Ok(self.wrap_best_effort(note_id, ciphertext, nonce).await)
            }
            (WritePayload::Encrypted { .. }, EncryptionPolicy::ServerAssisted) => {
                Err(StoreError::PolicyMismatch(
                    "pre-encrypted payload not accepted under server-assisted policy".into(),
                ))
            }
        }
    }

    /// Hybrid wrap, best-effort: on any failure the unwrapped client
    /// ciphertext is stored as the durable fallback.
    async fn wrap_best_effort(
        &self,
        note_id: &NoteId,
        ciphertext: Vec<u8>,
        inner_nonce: [u8; NONCE_SIZE],
    ) -> ([u8; NONCE_SIZE], Vec<u8>, serde_json::Value) {
        let wrapped = match &self.wrap_stage {
            Some(stage) => stage.wrap(note_id, &ciphertext),
            None => match self.master_key().await {
                Ok(key) => encrypt(key, &ciphertext),
                Err(e) => {
                    tracing::warn!(note_id = %note_id, error = %e, "hybrid wrap skipped: no master key");
                    return (inner_nonce, ciphertext, serde_json::json!({ "wrapped": false }));
                }
            },
        };

        match wrapped {
            Ok(outer) => {
                let aux = serde_json::json!({
                    "wrapped": true,
                    "inner_nonce": inner_nonce.to_vec(),
                });
                (outer.nonce, outer.ciphertext, aux)
            }
            Err(e) => {
                tracing::warn!(note_id = %note_id, error = %e, "hybrid wrap failed, storing client ciphertext");
                (inner_nonce, ciphertext, serde_json::json!({ "wrapped": false }))
            }
        }
    }

    fn validate_payload(payload: &WritePayload) -> StoreResult<()> {
        let empty = match payload {
            WritePayload::Plaintext(p) => p.is_empty(),
            WritePayload::Encrypted { ciphertext, .. } => ciphertext.is_empty(),
        };
        if empty {
            return Err(StoreError::InputInvalid("payload must not be empty".into()));
        }
        Ok(())
    }

    /// Create a note with its first version.
    pub async fn create_note(&self, request: NewNote) -> StoreResult<NoteRecord> {
        // Input validation happens before any cryptographic work
        if request.title.trim().is_empty() {
            return Err(StoreError::InputInvalid("title must not be empty".into()));
        }
        Self::validate_payload(&request.payload)?;

        let policy = self.resolve_policy(request.policy)?;
        let note_id = NoteId::new();
        let (nonce, ciphertext, aux) = self
            .seal_payload(&note_id, policy, request.payload)
            .await?;

        let now = Utc::now().timestamp_millis();
        let record = NoteRecord {
            id: note_id,
            title: request.title,
            note_type: request.note_type,
            tags: request.tags,
            summary: request.summary,
            created_at: now,
            modified_at: now,
        };

        // The metadata row is the note's version container; create it
        // idempotently before the first append, roll it back if the append
        // itself cannot be persisted.
        self.notes.insert(&record)?;
        let digest = checksum(&ciphertext);
        let version = match self
            .versions
            .append(&note_id, policy, nonce, ciphertext, digest, aux)
        {
            Ok(v) => v,
            Err(e) => {
                let _ = self.notes.delete(&note_id);
                return Err(e);
            }
        };

        self.emit_append(&version);
        Ok(record)
    }

    /// Append a new version to an existing note.
    pub async fn append_version(
        &self,
        note_id: &NoteId,
        policy_hint: Option<EncryptionPolicy>,
        payload: WritePayload,
    ) -> StoreResult<VersionRecord> {
        Self::validate_payload(&payload)?;
        self.notes
            .get(note_id)?
            .ok_or(StoreError::NoteNotFound(*note_id))?;

        let policy = self.resolve_policy(policy_hint)?;
        let (nonce, ciphertext, aux) = self.seal_payload(note_id, policy, payload).await?;
        let digest = checksum(&ciphertext);
        let version = self
            .versions
            .append(note_id, policy, nonce, ciphertext, digest, aux)?;

        self.notes.touch(note_id, version.created_at)?;
        self.emit_append(&version);
        Ok(version)
    }

    fn emit_append(&self, version: &VersionRecord) {
        tracing::info!(
            note_id = %version.note_id,
            seq = version.seq,
            policy = %version.policy,
            checksum = %version.checksum,
            "version appended"
        );
        let _ = self.events.send(AppendEvent {
            note_id: version.note_id,
            seq: version.seq,
            created_at: version.created_at,
            policy: version.policy,
            checksum: version.checksum.clone(),
        });
    }

    /// Version summaries, newest first. Requires no key.
    pub fn list_versions(&self, note_id: &NoteId) -> StoreResult<Vec<VersionSummary>> {
        self.versions.list(note_id)
    }

    /// Read one version's stored bytes.
    ///
    /// Never auto-decrypts. For hybrid versions the server strips its own
    /// outer wrap (it holds that key) and hands back the inner client
    /// ciphertext; for client-only versions the stored bytes come back
    /// unchanged even if corrupt — integrity is the audit path's concern.
    pub async fn read_version(&self, note_id: &NoteId, seq: i64) -> StoreResult<VersionView> {
        let record = self.versions.read(note_id, seq)?;

        let (ciphertext, nonce, aux) = match record.policy {
            EncryptionPolicy::Hybrid if record.aux_meta["wrapped"] == true => {
                let inner_nonce = inner_nonce_from_aux(&record.aux_meta)?;
                let inner = match &self.wrap_stage {
                    Some(stage) => stage.unwrap(
                        note_id,
                        &EncryptedData {
                            nonce: record.nonce,
                            ciphertext: record.ciphertext,
                        },
                    )?,
                    None => {
                        let key = self.master_key().await?;
                        decrypt(
                            key,
                            &EncryptedData {
                                nonce: record.nonce,
                                ciphertext: record.ciphertext,
                            },
                        )?
                    }
                };
                (inner, inner_nonce, record.aux_meta)
            }
            _ => (record.ciphertext, record.nonce, record.aux_meta),
        };

        Ok(VersionView {
            seq: record.seq,
            created_at: record.created_at,
            policy: record.policy,
            ciphertext,
            nonce,
            aux_meta: aux,
        })
    }

    /// Decrypt a server-assisted version back to plaintext.
    ///
    /// Only valid for `server-assisted` versions — the server holds no key
    /// for the other policies. Tamper surfaces as `AuthenticationFailure`;
    /// a malformed compressed stream after a clean decrypt surfaces as
    /// `CorruptStream`.
    pub async fn read_decrypted(&self, note_id: &NoteId, seq: i64) -> StoreResult<Vec<u8>> {
        let record = self.versions.read(note_id, seq)?;
        if record.policy != EncryptionPolicy::ServerAssisted {
            return Err(StoreError::PolicyMismatch(format!(
                "server cannot decrypt a {} version",
                record.policy
            )));
        }

        let key = self.master_key().await?;
        let compressed = decrypt(
            key,
            &EncryptedData {
                nonce: record.nonce,
                ciphertext: record.ciphertext,
            },
        )?;
        Ok(decompress(&compressed)?)
    }

    /// Keyless integrity audit of one stored version.
    pub fn verify_version(&self, note_id: &NoteId, seq: i64) -> StoreResult<bool> {
        let record = self.versions.read(note_id, seq)?;
        Ok(verify(&record.ciphertext, &record.checksum))
    }

    /// Delete a note and all its versions. Irreversible.
    pub fn delete_note(&self, note_id: &NoteId) -> StoreResult<()> {
        let existed = self.notes.delete(note_id)?;
        self.versions.delete_all(note_id)?;
        if !existed {
            return Err(StoreError::NoteNotFound(*note_id));
        }
        Ok(())
    }

    pub fn get_note(&self, note_id: &NoteId) -> StoreResult<Option<NoteRecord>> {
        self.notes.get(note_id)
    }

    pub fn list_notes(&self) -> StoreResult<Vec<NoteRecord>> {
        self.notes.list()
    }

    pub fn patch_note(&self, note_id: &NoteId, patch: &NotePatch) -> StoreResult<NoteRecord> {
        self.notes.patch(note_id, patch)
    }

    // ── Master meta passthroughs ─────────────────────────────────

    pub fn master_meta(&self) -> StoreResult<MasterMeta> {
        self.meta.load()
    }

    pub fn set_unlock_secret(&self, secret: &str) -> StoreResult<()> {
        self.meta.set_unlock_secret(secret)
    }

    pub fn change_unlock_secret(&self, old: &str, new: &str) -> StoreResult<()> {
        self.meta.change_unlock_secret(old, new)
    }

    pub fn verify_unlock_secret(&self, secret: &str) -> StoreResult<bool> {
        self.meta.verify_unlock_secret(secret)
    }

    pub fn set_default_policy(&self, policy: EncryptionPolicy) -> StoreResult<()> {
        self.meta.set_default_policy(policy)
    }
}

fn inner_nonce_from_aux(aux: &serde_json::Value) -> StoreResult<[u8; NONCE_SIZE]> {
    let bytes: Vec<u8> = serde_json::from_value(aux["inner_nonce"].clone())
        .map_err(|e| StoreError::Storage(format!("wrapped version missing inner nonce: {e}")))?;
    if bytes.len() != NONCE_SIZE {
        return Err(StoreError::Storage("invalid inner nonce length".into()));
    }
    let mut nonce = [0u8; NONCE_SIZE];
    nonce.copy_from_slice(&bytes);
    Ok(nonce)
}
