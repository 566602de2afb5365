//! Binary object references.
//!
//! The engine stores and compares opaque keys, never binary payloads. A
//! world's objects live under the prefix `worlds/<world_id>/`, which is what
//! lets conflict analysis find orphans with one prefix scan.

use std::collections::BTreeSet;
use std::sync::{Arc, RwLock};

use tessera_core::{BlobKey, StorageError, TesseraError, TesseraResult, WorldId};

/// Key prefix for one world's binary objects.
pub fn world_blob_prefix(world_id: WorldId) -> String {
    format!("worlds/{}/", world_id)
}

/// Reference registry for binary objects.
///
/// Implementations track which keys exist and resolve keys to downloadable
/// pointers; the payload bytes themselves never pass through the engine.
pub trait BlobStore: Send + Sync {
    fn exists(&self, key: &str) -> TesseraResult<bool>;

    fn register(&self, key: &str) -> TesseraResult<()>;

    fn remove(&self, key: &str) -> TesseraResult<()>;

    /// All registered keys under a prefix, sorted.
    fn list_prefix(&self, prefix: &str) -> TesseraResult<Vec<BlobKey>>;

    /// Downloadable pointer for a key. Resolution is pure addressing; it does
    /// not imply the object exists.
    fn resolve_url(&self, key: &str) -> String;
}

/// In-memory reference registry.
#[derive(Debug, Default)]
pub struct MemoryBlobStore {
    keys: Arc<RwLock<BTreeSet<BlobKey>>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.keys.read().map(|k| k.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl BlobStore for MemoryBlobStore {
    fn exists(&self, key: &str) -> TesseraResult<bool> {
        let keys = self
            .keys
            .read()
            .map_err(|_| TesseraError::Storage(StorageError::LockPoisoned))?;
        Ok(keys.contains(key))
    }

    fn register(&self, key: &str) -> TesseraResult<()> {
        let mut keys = self
            .keys
            .write()
            .map_err(|_| TesseraError::Storage(StorageError::LockPoisoned))?;
        keys.insert(key.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> TesseraResult<()> {
        let mut keys = self
            .keys
            .write()
            .map_err(|_| TesseraError::Storage(StorageError::LockPoisoned))?;
        keys.remove(key);
        Ok(())
    }

    fn list_prefix(&self, prefix: &str) -> TesseraResult<Vec<BlobKey>> {
        let keys = self
            .keys
            .read()
            .map_err(|_| TesseraError::Storage(StorageError::LockPoisoned))?;
        Ok(keys
            .iter()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect())
    }

    fn resolve_url(&self, key: &str) -> String {
        format!("memory://{}", key)
    }
}

// =============================================================================
// TESTS
// =============================================================================
