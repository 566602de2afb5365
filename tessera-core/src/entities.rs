//! Core entity structures

use crate::content::ContentPayload;
use crate::enums::{ArtifactKind, Environment, PublicationSource, WorldCategory};
use crate::identity::{
    new_entity_id, ArtifactId, ChatId, EntityId, Timestamp, UserId, WorldId,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};

/// One time-bounded grant of public visibility, from one source.
///
/// An artifact's publication state is an ordered list of these; an empty list
/// means never published. Entries are independent: the same artifact can be
/// published directly and via two different conversations at once, each
/// expiring on its own schedule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicationInfo {
    pub source: PublicationSource,
    /// Identifier of the causing entity: conversation id, site id, or the
    /// artifact's own id for direct publication.
    pub source_id: EntityId,
    pub published_at: Timestamp,
    /// `None` = never expires.
    pub expires_at: Option<Timestamp>,
}

/// One version row of a logical artifact.
///
/// `artifact_id` is shared by all versions; `created_at` doubles as the
/// version key, with `seq` as a per-logical-id monotonic tie-breaker so
/// "latest" stays deterministic when two saves land on the same timestamp.
/// Rows are immutable history: a save always appends, never updates in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Artifact {
    pub artifact_id: ArtifactId,
    pub created_at: Timestamp,
    pub seq: i64,
    pub kind: ArtifactKind,
    pub content: ContentPayload,
    pub title: String,
    pub user_id: UserId,
    /// `None` = machine/AI authored.
    pub author_id: Option<UserId>,
    /// Derived summary, may be filled asynchronously after save.
    pub summary: Option<String>,
    /// Soft-delete marker; hides the artifact from normal reads but keeps it
    /// restorable.
    pub deleted_at: Option<Timestamp>,
    pub publications: Vec<PublicationInfo>,
    /// `None` = production tenant.
    pub world_id: Option<WorldId>,
}

impl Artifact {
    /// Ordering key for version selection.
    pub fn version_key(&self) -> (Timestamp, i64) {
        (self.created_at, self.seq)
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

/// Conversation. Publication is a simpler single-deadline model than the
/// artifact's multi-source list. The transcript is opaque to the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chat {
    pub chat_id: ChatId,
    pub user_id: UserId,
    pub title: String,
    #[serde(default)]
    pub transcript: Option<serde_json::Value>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    /// Published iff non-null and in the future.
    pub published_until: Option<Timestamp>,
    pub deleted_at: Option<Timestamp>,
    pub world_id: Option<WorldId>,
}

impl Chat {
    pub fn new(user_id: UserId, title: impl Into<String>, world_id: Option<WorldId>) -> Self {
        let now = Utc::now();
        Self {
            chat_id: new_entity_id(),
            user_id,
            title: title.into(),
            transcript: None,
            created_at: now,
            updated_at: now,
            published_until: None,
            deleted_at: None,
            world_id,
        }
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

/// User account row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserAccount {
    pub user_id: UserId,
    pub handle: String,
    pub display_name: String,
    pub email: Option<String>,
    pub created_at: Timestamp,
    pub world_id: Option<WorldId>,
}

impl UserAccount {
    pub fn new(
        handle: impl Into<String>,
        display_name: impl Into<String>,
        world_id: Option<WorldId>,
    ) -> Self {
        Self {
            user_id: new_entity_id(),
            handle: handle.into(),
            display_name: display_name.into(),
            email: None,
            created_at: Utc::now(),
            world_id,
        }
    }
}

/// Metadata describing one isolated world.
///
/// The `seed_*` fields are embedded definitions used to (re)hydrate the
/// world's users/artifacts/chats. Row cleanup for a deleted world is a
/// separately-invoked operation, not atomic with deleting this row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorldMeta {
    pub world_id: WorldId,
    pub name: String,
    pub description: String,
    pub environment: Environment,
    pub category: WorldCategory,
    pub is_template: bool,
    pub is_active: bool,
    pub auto_cleanup: bool,
    /// Idle hours after which an auto-cleanup world becomes purge-eligible.
    pub cleanup_after_hours: Option<i64>,
    pub usage_count: i64,
    pub last_used_at: Option<Timestamp>,
    pub created_at: Timestamp,
    #[serde(default)]
    pub seed_users: serde_json::Value,
    #[serde(default)]
    pub seed_artifacts: serde_json::Value,
    #[serde(default)]
    pub seed_chats: serde_json::Value,
}

impl WorldMeta {
    pub fn new(
        name: impl Into<String>,
        environment: Environment,
        category: WorldCategory,
    ) -> Self {
        Self {
            world_id: new_entity_id(),
            name: name.into(),
            description: String::new(),
            environment,
            category,
            is_template: false,
            is_active: true,
            auto_cleanup: false,
            cleanup_after_hours: None,
            usage_count: 0,
            last_used_at: None,
            created_at: Utc::now(),
            seed_users: serde_json::Value::Null,
            seed_artifacts: serde_json::Value::Null,
            seed_chats: serde_json::Value::Null,
        }
    }

    /// Whether this world is purge-eligible at `now` under its own policy.
    pub fn cleanup_due(&self, now: Timestamp) -> bool {
        if !self.auto_cleanup {
            return false;
        }
        let Some(hours) = self.cleanup_after_hours else {
            return false;
        };
        let reference = self.last_used_at.unwrap_or(self.created_at);
        now - reference > chrono::Duration::hours(hours)
    }
}

// =============================================================================
// TESTS
// =============================================================================
