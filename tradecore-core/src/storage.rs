//! Obfuscated key/value store
//!
//! Values are serialized to JSON, XOR-ed byte by byte against a fixed repeating
//! key, and base64 encoded before they hit the database.
//!
//! **This is obfuscation, not encryption.** The key ships inside the binary
//! and anyone holding a copy of it can decode every stored value. It only keeps
//! casual readers of the database file from seeing plain text.
//!
//! Reads accept two layouts under the same key:
//! - the obfuscated form written by [`SecureStore::put`]
//! - plain JSON written by earlier versions (legacy)

use crate::db::Database;
use crate::error::Result;
use base64::{engine::general_purpose::STANDARD, Engine};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;

/// Fixed XOR key. Public knowledge; see module docs.
pub const OBFUSCATION_KEY: &[u8] = b"TRADEORE_SECURE_KEY_X99";

/// Logical keys of the persisted application state
pub mod keys {
    pub const SETTINGS: &str = "tradecore_settings_v1";
    pub const SESSIONS: &str = "tradecore_sessions_v1";
    pub const TEMPLATES: &str = "tradecore_templates_v1";
}

/// Which layout a value was read from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoredForm {
    Obfuscated,
    Legacy,
}

/// XOR `bytes` against the repeating [`OBFUSCATION_KEY`]. Self-inverse.
pub fn xor_with_key(bytes: &[u8]) -> Vec<u8> {
    bytes
        .iter()
        .zip(OBFUSCATION_KEY.iter().cycle())
        .map(|(b, k)| b ^ k)
        .collect()
}

/// Encode text into its stored form.
pub fn obfuscate(text: &str) -> String {
    STANDARD.encode(xor_with_key(text.as_bytes()))
}

/// Reverse [`obfuscate`]. Returns `None` if `encoded` is not a valid stored form.
pub fn deobfuscate(encoded: &str) -> Option<String> {
    let bytes = STANDARD.decode(encoded.trim()).ok()?;
    String::from_utf8(xor_with_key(&bytes)).ok()
}

/// Best-effort persistent store with obfuscated values.
pub struct SecureStore {
    db: Database,
}

impl SecureStore {
    /// Wrap an already migrated database
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Open (and migrate) the database file at `path`
    pub fn open(path: &Path) -> Result<Self> {
        let db = Database::open(path)?;
        db.migrate()?;
        Ok(Self::new(db))
    }

    /// In-memory store (for testing)
    pub fn open_in_memory() -> Result<Self> {
        let db = Database::open_in_memory()?;
        db.migrate()?;
        Ok(Self::new(db))
    }

    /// The backing database
    pub fn database(&self) -> &Database {
        &self.db
    }

    /// Serialize, obfuscate and write `value` under `key`.
    ///
    /// Failures are logged and swallowed: persistence never fails the caller.
    pub fn put<T: Serialize + ?Sized>(&self, key: &str, value: &T) {
        let text = match serde_json::to_string(value) {
            Ok(text) => text,
            Err(e) => {
                tracing::error!(key, error = %e, "Storage encoding failed");
                return;
            }
        };

        if let Err(e) = self.db.set_value(key, &obfuscate(&text)) {
            tracing::error!(key, error = %e, "Storage write failed");
        }
    }

    /// Read the value under `key`, or `None` if absent or unreadable.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.get_with_form(key).map(|(value, _)| value)
    }

    /// Like [`get`](Self::get), also reporting which layout the value came from.
    pub fn get_with_form<T: DeserializeOwned>(&self, key: &str) -> Option<(T, StoredForm)> {
        let raw = match self.db.get_value(key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                tracing::warn!(key, error = %e, "Storage read failed");
                return None;
            }
        };

        if let Some(value) = deobfuscate(&raw).and_then(|text| serde_json::from_str(&text).ok()) {
            return Some((value, StoredForm::Obfuscated));
        }

        match serde_json::from_str(&raw) {
            Ok(value) => {
                tracing::debug!(key, "Read legacy plain-text value");
                Some((value, StoredForm::Legacy))
            }
            Err(e) => {
                tracing::warn!(key, error = %e, "Stored value is unreadable, treating as absent");
                None
            }
        }
    }

    /// Remove `key`. Failures are logged and swallowed.
    pub fn remove(&self, key: &str) {
        if let Err(e) = self.db.delete_value(key) {
            tracing::error!(key, error = %e, "Storage delete failed");
        }
    }
}
