//! Tessera Core - Entity Types
//!
//! Pure data structures with no behavior. All other crates depend on this.
//! This crate contains ONLY data types - no business logic.

pub mod config;
pub mod content;
pub mod entities;
pub mod enums;
pub mod error;
pub mod identity;

pub use config::TesseraConfig;
pub use content::{ContentPayload, SiteBlock, SiteDefinition, SitePage};
pub use entities::{
    Artifact, Chat, PublicationInfo, UserAccount, WorldMeta,
};
pub use enums::{ArtifactKind, EntityType, Environment, PublicationSource, WorldCategory};
pub use error::{
    ContextError, SeedError, StorageError, TesseraError, TesseraResult, ValidationError,
};
pub use identity::{
    compute_content_hash, new_entity_id, ArtifactId, BlobKey, ChatId, ContentHash, EntityId,
    Timestamp, UserId, WorldId,
};
