//! Durable idempotency ledger.
//!
//! Committed booking keys are remembered for a short TTL so retried requests
//! collapse onto the original booking instead of double-seating. Each entry
//! carries an HMAC-SHA256 signature of its key; a mismatch on lookup means
//! the snapshot was altered and is surfaced as an integrity violation, never
//! treated as a cache miss.

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::model::Ms;
use crate::observability;

type HmacSha256 = Hmac<Sha256>;

/// Default entry lifetime, matching the duplicate-submission window.
pub const DEFAULT_TTL_MS: Ms = 10_000;

#[derive(Debug)]
pub enum LedgerError {
    /// The key is already registered and unexpired.
    DuplicateKey(String),
    /// An entry's signature does not match its key.
    IntegrityViolation(String),
    Io(std::io::Error),
}

impl fmt::Display for LedgerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LedgerError::DuplicateKey(key) => write!(f, "duplicate idempotency key: {key}"),
            LedgerError::IntegrityViolation(key) => {
                write!(f, "ledger integrity violation for key: {key}")
            }
            LedgerError::Io(e) => write!(f, "ledger io error: {e}"),
        }
    }
}

impl std::error::Error for LedgerError {}

impl From<std::io::Error> for LedgerError {
    fn from(e: std::io::Error) -> Self {
        LedgerError::Io(e)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub key_signature: String,
    pub created_at: Ms,
}

pub struct IdempotencyLedger {
    path: PathBuf,
    secret: Vec<u8>,
    ttl_ms: Ms,
    entries: Mutex<HashMap<String, LedgerEntry>>,
}

pub fn now_ms() -> Ms {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as Ms
}

impl IdempotencyLedger {
    /// Loads the snapshot at `path` (if any), dropping entries already past
    /// their TTL. A snapshot that fails to parse is logged and replaced by an
    /// empty ledger rather than blocking startup.
    pub fn open(path: impl Into<PathBuf>, secret: &str, ttl_ms: Ms) -> Result<Self, LedgerError> {
        let path = path.into();
        let mut entries = match fs::read(&path) {
            Ok(bytes) => match serde_json::from_slice::<HashMap<String, LedgerEntry>>(&bytes) {
                Ok(map) => map,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "unreadable ledger snapshot, starting empty");
                    HashMap::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(e) => return Err(e.into()),
        };

        let cutoff = now_ms() - ttl_ms;
        let before = entries.len();
        entries.retain(|_, entry| entry.created_at > cutoff);
        if before > 0 {
            info!(
                loaded = entries.len(),
                expired = before - entries.len(),
                "idempotency ledger restored"
            );
        }
        metrics::gauge!(observability::LEDGER_ENTRIES).set(entries.len() as f64);

        Ok(Self {
            path,
            secret: secret.as_bytes().to_vec(),
            ttl_ms,
            entries: Mutex::new(entries),
        })
    }

    fn sign(&self, key: &str) -> HmacSha256 {
        let mut mac = HmacSha256::new_from_slice(&self.secret)
            .expect("hmac accepts any key length");
        mac.update(key.as_bytes());
        mac
    }

    /// Looks up `key`, returning whether an unexpired entry exists. An entry
    /// past its TTL is purged on the way out. A stored signature that fails
    /// verification is an integrity violation.
    pub async fn check_existing(&self, key: &str) -> Result<bool, LedgerError> {
        let mut entries = self.entries.lock().await;
        let Some(entry) = entries.get(key) else {
            return Ok(false);
        };
        if now_ms() - entry.created_at > self.ttl_ms {
            entries.remove(key);
            metrics::gauge!(observability::LEDGER_ENTRIES).set(entries.len() as f64);
            self.persist(&entries)?;
            return Ok(false);
        }
        let sig = hex::decode(&entry.key_signature)
            .map_err(|_| LedgerError::IntegrityViolation(key.to_owned()))?;
        self.sign(key)
            .verify_slice(&sig)
            .map_err(|_| LedgerError::IntegrityViolation(key.to_owned()))?;
        Ok(true)
    }

    /// Registers `key`, persisting the updated snapshot before returning.
    /// Fails with `DuplicateKey` if an unexpired entry already exists.
    pub async fn register(&self, key: &str) -> Result<(), LedgerError> {
        let mut entries = self.entries.lock().await;
        let now = now_ms();
        if let Some(entry) = entries.get(key)
            && now - entry.created_at <= self.ttl_ms
        {
            return Err(LedgerError::DuplicateKey(key.to_owned()));
        }
        let signature = hex::encode(self.sign(key).finalize().into_bytes());
        entries.insert(
            key.to_owned(),
            LedgerEntry { key_signature: signature, created_at: now },
        );
        metrics::gauge!(observability::LEDGER_ENTRIES).set(entries.len() as f64);
        self.persist(&entries)?;
        debug!(key, "idempotency key registered");
        Ok(())
    }

    /// Non-failing check-and-set. True only when no unexpired entry existed
    /// and the key is now registered.
    pub async fn try_register(&self, key: &str) -> Result<bool, LedgerError> {
        match self.register(key).await {
            Ok(()) => Ok(true),
            Err(LedgerError::DuplicateKey(_)) => Ok(false),
            Err(other) => Err(other),
        }
    }

    /// Drops expired entries and persists when any were removed. Returns the
    /// number purged.
    pub async fn purge_expired(&self) -> Result<usize, LedgerError> {
        let mut entries = self.entries.lock().await;
        let cutoff = now_ms() - self.ttl_ms;
        let before = entries.len();
        entries.retain(|_, entry| entry.created_at > cutoff);
        let purged = before - entries.len();
        if purged > 0 {
            metrics::counter!(observability::LEDGER_KEYS_PURGED_TOTAL).increment(purged as u64);
            metrics::gauge!(observability::LEDGER_ENTRIES).set(entries.len() as f64);
            self.persist(&entries)?;
            debug!(purged, "expired idempotency keys dropped");
        }
        Ok(purged)
    }

    // Snapshot-and-swap: write the full map to a sibling tmp file, fsync,
    // then rename over the live snapshot.
    fn persist(&self, entries: &HashMap<String, LedgerEntry>) -> Result<(), LedgerError> {
        let tmp = self.path.with_extension("tmp");
        let mut file = fs::File::create(&tmp)?;
        file.write_all(&serde_json::to_vec(entries).map_err(std::io::Error::other)?)?;
        file.sync_all()?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    pub fn ttl_ms(&self) -> Ms {
        self.ttl_ms
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Periodic sweep evicting expired keys so the snapshot stays bounded.
pub async fn run_sweeper(ledger: Arc<IdempotencyLedger>, period: std::time::Duration) {
    let mut tick = tokio::time::interval(period);
    loop {
        tick.tick().await;
        if let Err(e) = ledger.purge_expired().await {
            warn!(error = %e, "ledger sweep failed");
        }
    }
}
