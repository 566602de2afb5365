//! Error types for Tessera operations

use crate::enums::{ArtifactKind, EntityType};
use thiserror::Error;
use uuid::Uuid;

/// Storage layer errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StorageError {
    #[error("Entity not found: {entity_type} with id {id}")]
    NotFound { entity_type: EntityType, id: Uuid },

    #[error("Version not found for artifact {id}: {requested}")]
    VersionNotFound { id: Uuid, requested: String },

    #[error("Permission denied: user {user_id} does not own {entity_type} {id}")]
    PermissionDenied {
        entity_type: EntityType,
        id: Uuid,
        user_id: Uuid,
    },

    #[error("Insert failed for {entity_type}: {reason}")]
    InsertFailed {
        entity_type: EntityType,
        reason: String,
    },

    #[error("Storage lock poisoned")]
    LockPoisoned,

    #[error("Storage unavailable: {reason}")]
    Unavailable { reason: String },
}

/// Validation errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Invalid content for {kind} artifact: {reason}")]
    InvalidContent { kind: ArtifactKind, reason: String },

    #[error("Invalid import strategy for {category}: {value}")]
    InvalidStrategy { category: String, value: String },

    #[error("Required field missing: {field}")]
    RequiredFieldMissing { field: String },

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },
}

/// World-context resolution errors.
///
/// A missing or unknown world is NOT an error (resolution fails open to
/// production); only a token the caller handed us that cannot be read at all
/// surfaces here.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ContextError {
    #[error("Malformed world token: {reason}")]
    MalformedToken { reason: String },
}

/// Seed pipeline errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SeedError {
    #[error("World '{world_id}' not found")]
    WorldNotFound { world_id: Uuid },

    #[error("Snapshot I/O failed at {path}: {reason}")]
    SnapshotIo { path: String, reason: String },

    #[error("Snapshot manifest unreadable at {path}: {reason}")]
    ManifestParse { path: String, reason: String },
}

/// Master error type for all Tessera errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TesseraError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Context error: {0}")]
    Context(#[from] ContextError),

    #[error("Seed error: {0}")]
    Seed(#[from] SeedError),
}

/// Result type alias for Tessera operations.
pub type TesseraResult<T> = Result<T, TesseraError>;

// =============================================================================
// TESTS
// =============================================================================
