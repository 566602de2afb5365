//! Per-category import strategies.
//!
//! The strategy payload is an external interface; invalid values must be
//! rejected before any mutation occurs. World metadata only accepts the
//! three-way form, because a metadata row has no partial-overwrite or rename
//! semantics that make sense.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tessera_core::ValidationError;

/// Strategy for the world-metadata category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorldStrategy {
    /// Overwrite the existing metadata row with the snapshot's.
    Replace,
    /// Insert if absent, keep the existing row untouched otherwise.
    Merge,
    /// Insert if absent, skip otherwise.
    Skip,
}

/// Strategy for users, artifacts, chats and blobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityStrategy {
    /// Delete every existing row of the category for the target world, then
    /// insert all snapshot rows.
    Replace,
    /// Insert non-colliding rows, leave colliding rows untouched.
    Merge,
    /// Insert non-colliding rows, skip colliding rows.
    Skip,
    /// Update colliding entities in place with snapshot values, insert the
    /// rest. For artifacts this swaps the whole version set of the id.
    Overwrite,
    /// Insert colliding entities under freshly generated ids. Cross-references
    /// are not remapped.
    Rename,
}

/// Full per-category strategy payload consumed by import.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportStrategy {
    pub world: WorldStrategy,
    pub users: EntityStrategy,
    pub artifacts: EntityStrategy,
    pub chats: EntityStrategy,
    pub blobs: EntityStrategy,
}

impl ImportStrategy {
    /// The same strategy for every entity category.
    pub fn uniform(world: WorldStrategy, entities: EntityStrategy) -> Self {
        Self {
            world,
            users: entities,
            artifacts: entities,
            chats: entities,
            blobs: entities,
        }
    }

    /// `{all: replace}`.
    pub fn replace_all() -> Self {
        Self::uniform(WorldStrategy::Replace, EntityStrategy::Replace)
    }

    /// Parse the external payload, rejecting invalid enum values before any
    /// mutation can happen.
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        serde_json::from_str(raw).map_err(|e| ValidationError::InvalidStrategy {
            category: "payload".to_string(),
            value: e.to_string(),
        })
    }
}

impl fmt::Display for WorldStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = match self {
            WorldStrategy::Replace => "replace",
            WorldStrategy::Merge => "merge",
            WorldStrategy::Skip => "skip",
        };
        write!(f, "{}", value)
    }
}

impl FromStr for WorldStrategy {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "replace" => Ok(WorldStrategy::Replace),
            "merge" => Ok(WorldStrategy::Merge),
            "skip" => Ok(WorldStrategy::Skip),
            _ => Err(ValidationError::InvalidStrategy {
                category: "world".to_string(),
                value: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for EntityStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = match self {
            EntityStrategy::Replace => "replace",
            EntityStrategy::Merge => "merge",
            EntityStrategy::Skip => "skip",
            EntityStrategy::Overwrite => "overwrite",
            EntityStrategy::Rename => "rename",
        };
        write!(f, "{}", value)
    }
}

impl FromStr for EntityStrategy {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "replace" => Ok(EntityStrategy::Replace),
            "merge" => Ok(EntityStrategy::Merge),
            "skip" => Ok(EntityStrategy::Skip),
            "overwrite" => Ok(EntityStrategy::Overwrite),
            "rename" => Ok(EntityStrategy::Rename),
            _ => Err(ValidationError::InvalidStrategy {
                category: "entity".to_string(),
                value: s.to_string(),
            }),
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
