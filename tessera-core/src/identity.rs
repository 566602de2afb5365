//! Identity types for Tessera entities

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// Entity identifier using UUIDv7 for timestamp-sortable IDs.
/// UUIDv7 embeds a Unix timestamp, making IDs naturally sortable by creation time.
pub type EntityId = Uuid;

/// Logical artifact identifier, shared by every version row of one artifact.
pub type ArtifactId = EntityId;

/// Conversation identifier.
pub type ChatId = EntityId;

/// User account identifier.
pub type UserId = EntityId;

/// Isolated world identifier. `Option<WorldId>` with `None` is the production tenant.
pub type WorldId = EntityId;

/// Opaque key for a binary object in the blob store. The engine stores and
/// compares keys, never payloads.
pub type BlobKey = String;

/// Timestamp type using UTC timezone.
pub type Timestamp = DateTime<Utc>;

/// SHA-256 content hash for conflict comparison and integrity verification.
pub type ContentHash = [u8; 32];

/// Generate a new UUIDv7 EntityId (timestamp-sortable).
pub fn new_entity_id() -> EntityId {
    Uuid::now_v7()
}

/// Compute SHA-256 hash of content.
pub fn compute_content_hash(content: &[u8]) -> ContentHash {
    let mut hasher = Sha256::new();
    hasher.update(content);
    let result = hasher.finalize();
    let mut hash = [0u8; 32];
    hash.copy_from_slice(&result);
    hash
}
