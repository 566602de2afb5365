//! Tessera Seed - World Snapshot Pipeline
//!
//! Exports a world's full data set (metadata + users + artifacts + chats +
//! binary references) to a self-contained snapshot directory, analyzes a
//! target store for collisions against a snapshot, and performs policy-driven
//! import under per-category strategies.
//!
//! This is the one part of the system that crosses worlds on purpose: it is
//! told the target world explicitly and performs bulk reads/writes through
//! the storage layer's dedicated bulk operations, bypassing per-request world
//! resolution.

pub mod blob;
pub mod conflict;
pub mod manager;
pub mod snapshot;
pub mod strategy;

pub use blob::{world_blob_prefix, BlobStore, MemoryBlobStore};
pub use conflict::{classify_risk, ConflictReport, ConflictRisk, EntityConflict};
pub use manager::{CategoryOutcome, ImportReport, SeedManager};
pub use snapshot::{BlobRef, SeedSnapshot, SnapshotSource, WorldBundle, MANIFEST_FILE};
pub use strategy::{EntityStrategy, ImportStrategy, WorldStrategy};
