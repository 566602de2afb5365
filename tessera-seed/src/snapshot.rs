//! Snapshot manifest format.
//!
//! A snapshot is a directory holding one `manifest.json`: the whole world
//! bundle plus provenance. It must be fully reconstructible by import with no
//! external state beyond the referenced binary objects.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tessera_core::{
    Artifact, BlobKey, Chat, Environment, SeedError, Timestamp, UserAccount, WorldMeta,
};

/// Manifest file name inside a snapshot directory.
pub const MANIFEST_FILE: &str = "manifest.json";

/// Pointer to one binary object: its registry key plus a downloadable URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlobRef {
    pub key: BlobKey,
    pub url: String,
}

/// One world's complete data set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorldBundle {
    pub metadata: WorldMeta,
    pub users: Vec<UserAccount>,
    pub artifacts: Vec<Artifact>,
    pub chats: Vec<Chat>,
    #[serde(default)]
    pub blobs: Vec<BlobRef>,
}

/// Where and when the snapshot was taken.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotSource {
    pub environment: Environment,
    pub timestamp: Timestamp,
}

/// The self-contained snapshot document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeedSnapshot {
    pub world: WorldBundle,
    pub source: SnapshotSource,
}

impl SeedSnapshot {
    /// Write the manifest into `dir`, creating the directory if needed.
    /// Returns the snapshot directory path.
    pub fn write_to(&self, dir: &Path) -> Result<PathBuf, SeedError> {
        fs::create_dir_all(dir).map_err(|e| SeedError::SnapshotIo {
            path: dir.display().to_string(),
            reason: e.to_string(),
        })?;
        let manifest_path = dir.join(MANIFEST_FILE);
        let body = serde_json::to_string_pretty(self).map_err(|e| SeedError::SnapshotIo {
            path: manifest_path.display().to_string(),
            reason: e.to_string(),
        })?;
        fs::write(&manifest_path, body).map_err(|e| SeedError::SnapshotIo {
            path: manifest_path.display().to_string(),
            reason: e.to_string(),
        })?;
        Ok(dir.to_path_buf())
    }

    /// Read a snapshot from a directory or a manifest file path.
    pub fn read_from(path: &Path) -> Result<Self, SeedError> {
        let manifest_path = if path.is_dir() {
            path.join(MANIFEST_FILE)
        } else {
            path.to_path_buf()
        };
        let body = fs::read_to_string(&manifest_path).map_err(|e| SeedError::SnapshotIo {
            path: manifest_path.display().to_string(),
            reason: e.to_string(),
        })?;
        serde_json::from_str(&body).map_err(|e| SeedError::ManifestParse {
            path: manifest_path.display().to_string(),
            reason: e.to_string(),
        })
    }
}

// =============================================================================
// TESTS
// =============================================================================
