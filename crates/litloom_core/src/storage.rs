//! crates/litloom_core/src/storage.rs
//!
//! The keyed storage adapter. Logical keys are translated into
//! `{prefix}:{email-or-guest}:{key}` physical keys on a shared key/value
//! backend, and values are (de)serialised as JSON. Reads fail soft.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};
use tracing::{debug, warn};

use crate::ports::{KeyValueStore, PortError, PortResult};
use crate::session::SessionStore;

pub const APP_PREFIX: &str = "litloom";
pub const GUEST_NAMESPACE: &str = "guest";

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Storage backend error: {0}")]
    Backend(#[from] PortError),
    #[error("Malformed value stored under '{key}': {source}")]
    Malformed {
        key: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("Could not serialise value for '{key}': {source}")]
    Serialize {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

//=========================================================================================
// Keyed Storage Adapter
//=========================================================================================

/// Per-user view over the shared backend. Owns no domain semantics.
pub struct UserStorage {
    backend: Arc<dyn KeyValueStore>,
    session: Arc<SessionStore>,
}

impl UserStorage {
    pub fn new(backend: Arc<dyn KeyValueStore>, session: Arc<SessionStore>) -> Self {
        Self { backend, session }
    }

    /// Lower-cased email of the current user, or `guest`.
    pub fn namespace(&self) -> String {
        self.session
            .current_user()
            .map(|u| u.email.trim().to_lowercase())
            .filter(|email| !email.is_empty())
            .unwrap_or_else(|| GUEST_NAMESPACE.to_string())
    }

    pub fn is_authenticated(&self) -> bool {
        self.session.is_authenticated()
    }

    pub fn physical_key(&self, key: &str) -> String {
        format!("{APP_PREFIX}:{}:{key}", self.namespace())
    }

    fn namespace_prefix(&self) -> String {
        format!("{APP_PREFIX}:{}:", self.namespace())
    }

    /// Strict read: `Ok(None)` when nothing (or an empty string) is stored.
    pub fn try_get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StorageError> {
        let physical = self.physical_key(key);
        let Some(raw) = self.backend.get(&physical)? else {
            return Ok(None);
        };
        if raw.trim().is_empty() {
            return Ok(None);
        }
        serde_json::from_str(&raw)
            .map(Some)
            .map_err(|source| StorageError::Malformed {
                key: physical,
                source,
            })
    }

    /// Fail-soft read: missing or malformed data yields `fallback`.
    pub fn get<T: DeserializeOwned>(&self, key: &str, fallback: T) -> T {
        match self.try_get(key) {
            Ok(Some(value)) => value,
            Ok(None) => fallback,
            Err(e) => {
                warn!("Falling back for '{}': {}", key, e);
                fallback
            }
        }
    }

    pub fn get_or_default<T: DeserializeOwned + Default>(&self, key: &str) -> T {
        self.get(key, T::default())
    }

    pub fn try_set<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<(), StorageError> {
        let physical = self.physical_key(key);
        let raw = serde_json::to_string(value).map_err(|source| StorageError::Serialize {
            key: physical.clone(),
            source,
        })?;
        self.backend.set(&physical, &raw)?;
        Ok(())
    }

    /// Last write wins; failures are logged and swallowed.
    pub fn set<T: Serialize + ?Sized>(&self, key: &str, value: &T) {
        if let Err(e) = self.try_set(key, value) {
            warn!("Failed to persist '{}': {}", key, e);
        }
    }

    pub fn remove(&self, key: &str) {
        if let Err(e) = self.backend.remove(&self.physical_key(key)) {
            warn!("Failed to remove '{}': {}", key, e);
        }
    }

    /// Deletes every key of the current namespace and nothing else.
    /// Returns how many keys were removed.
    pub fn clear_user_space(&self) -> usize {
        let prefix = self.namespace_prefix();
        let keys = match self.backend.keys() {
            Ok(keys) => keys,
            Err(e) => {
                warn!("Could not enumerate keys for '{}': {}", prefix, e);
                return 0;
            }
        };
        let doomed: Vec<String> = keys.into_iter().filter(|k| k.starts_with(&prefix)).collect();
        let mut removed = 0;
        for key in &doomed {
            match self.backend.remove(key) {
                Ok(()) => removed += 1,
                Err(e) => warn!("Failed to remove '{}': {}", key, e),
            }
        }
        debug!("Cleared {} keys under '{}'", removed, prefix);
        removed
    }
}

//=========================================================================================
// In-Memory Backend
//=========================================================================================

/// A process-local backend. Also used for tab-scoped data such as the
/// deferred intent.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<BTreeMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> PortResult<Option<String>> {
        Ok(self
            .entries
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(key)
            .cloned())
    }

    fn set(&self, key: &str, value: &str) -> PortResult<()> {
        self.entries
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> PortResult<()> {
        self.entries
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .remove(key);
        Ok(())
    }

    fn keys(&self) -> PortResult<Vec<String>> {
        Ok(self
            .entries
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .keys()
            .cloned()
            .collect())
    }
}
