//! Tessera Storage - Storage Trait and In-Memory Engine
//!
//! Defines the storage abstraction layer for Tessera entities and ships the
//! in-memory reference engine. Every operation that touches world-tagged rows
//! takes an explicit [`WorldScope`]; there is no ambient tenant state and no
//! implicit cross-world read. The seed pipeline's bulk operations are the one
//! documented exception: they take a target world id explicitly.

pub mod memory;
pub mod scope;

pub use memory::MemoryStore;
pub use scope::WorldScope;

use std::fmt;

use tessera_core::{
    Artifact, ArtifactId, ArtifactKind, Chat, ChatId, ContentPayload, EntityId, PublicationInfo,
    TesseraResult, Timestamp, UserAccount, UserId, WorldId, WorldMeta,
};

// ============================================================================
// REQUEST / RESULT TYPES
// ============================================================================

/// Input for appending one artifact version.
///
/// A save NEVER updates a row in place: with `artifact_id` present a new
/// version row is appended; with it absent a fresh logical artifact is
/// created. Concurrent saves to the same id simply produce two new versions -
/// no write is lost, no optimistic-lock token exists.
#[derive(Debug, Clone, PartialEq)]
pub struct NewArtifactVersion {
    pub artifact_id: Option<ArtifactId>,
    pub kind: ArtifactKind,
    pub content: ContentPayload,
    pub title: String,
    pub user_id: UserId,
    pub author_id: Option<UserId>,
}

/// Which version of a logical artifact to fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionSelector {
    /// 1-based position over the ascending `(created_at, seq)` ordering of
    /// all rows sharing the id, soft-deleted rows included.
    Index(usize),
    /// Exact `created_at` match, not "as-of".
    At(Timestamp),
}

impl fmt::Display for VersionSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VersionSelector::Index(i) => write!(f, "index {}", i),
            VersionSelector::At(ts) => write!(f, "timestamp {}", ts.to_rfc3339()),
        }
    }
}

/// Paged artifact listing request.
#[derive(Debug, Clone, PartialEq)]
pub struct ArtifactQuery {
    pub user_id: UserId,
    /// 1-based page number.
    pub page: usize,
    pub page_size: usize,
    /// Case-insensitive substring over title and summary.
    pub search: Option<String>,
    pub kind: Option<ArtifactKind>,
    /// When true, results collapse to one row per logical id (its latest
    /// live version). When false, every live version row is a distinct
    /// result. A grouped listing must never show two rows for one id.
    pub group_by_versions: bool,
}

impl ArtifactQuery {
    pub fn for_user(user_id: UserId) -> Self {
        Self {
            user_id,
            page: 1,
            page_size: 20,
            search: None,
            kind: None,
            group_by_versions: true,
        }
    }
}

/// One page of artifact results plus the pre-pagination total.
#[derive(Debug, Clone, PartialEq)]
pub struct PagedArtifacts {
    pub data: Vec<Artifact>,
    pub total_count: usize,
}

/// Everything tagged with one world, collected for export.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct WorldDataSet {
    pub users: Vec<UserAccount>,
    pub artifacts: Vec<Artifact>,
    pub chats: Vec<Chat>,
}

/// All-or-nothing mutation plan for one import category.
///
/// The importer computes the full plan up front; an apply either commits the
/// whole plan under one write lock or nothing. For artifacts, `remove_ids`
/// names logical ids (every version row goes), and `upsert` carries version
/// rows to append.
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryPlan<T> {
    pub delete_all: bool,
    pub remove_ids: Vec<EntityId>,
    pub upsert: Vec<T>,
}

impl<T> Default for CategoryPlan<T> {
    fn default() -> Self {
        Self {
            delete_all: false,
            remove_ids: Vec::new(),
            upsert: Vec::new(),
        }
    }
}

/// Row counts removed by a world purge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PurgeCounts {
    pub users: usize,
    pub artifact_rows: usize,
    pub chats: usize,
}

// ============================================================================
// STORAGE TRAIT
// ============================================================================

/// Storage trait for Tessera entities.
///
/// All operations are synchronous request/response calls and may block on
/// backend I/O; callers must not hold in-process locks across them. World
/// metadata rows are global (they describe worlds, they are not inside one);
/// everything else is scoped.
pub trait StorageTrait: Send + Sync {
    // === Artifact Operations ===

    /// Append one version row. `created_at` is stamped by the store and a
    /// per-logical-id monotonic `seq` breaks timestamp ties. Publication
    /// state carries forward from the previous latest row.
    fn artifact_append(
        &self,
        new: NewArtifactVersion,
        scope: &WorldScope,
    ) -> TesseraResult<Artifact>;

    /// Latest live version: the maximal `(created_at, seq)` row. `NotFound`
    /// if the id is unknown in this scope or its latest row is soft-deleted.
    fn artifact_latest(&self, id: ArtifactId, scope: &WorldScope) -> TesseraResult<Artifact>;

    /// One specific version, by 1-based index or exact timestamp.
    fn artifact_version(
        &self,
        id: ArtifactId,
        selector: VersionSelector,
        scope: &WorldScope,
    ) -> TesseraResult<Artifact>;

    /// Every version row, ascending `(created_at, seq)`, soft-deleted rows
    /// included. Empty for an unknown id - listing never errors on empty.
    fn artifact_versions(&self, id: ArtifactId, scope: &WorldScope)
        -> TesseraResult<Vec<Artifact>>;

    /// Soft-delete the latest row. Ownership is checked; deleting an already
    /// deleted artifact is a no-op success.
    fn artifact_soft_delete(
        &self,
        id: ArtifactId,
        user_id: UserId,
        scope: &WorldScope,
    ) -> TesseraResult<()>;

    /// Clear the latest row's soft-delete marker. Ownership is checked;
    /// restoring a live artifact is a no-op success.
    fn artifact_restore(
        &self,
        id: ArtifactId,
        user_id: UserId,
        scope: &WorldScope,
    ) -> TesseraResult<()>;

    /// Paged listing. See [`ArtifactQuery::group_by_versions`].
    fn artifact_page(
        &self,
        query: &ArtifactQuery,
        scope: &WorldScope,
    ) -> TesseraResult<PagedArtifacts>;

    /// Fill the derived summary on one specific version row.
    fn artifact_set_summary(
        &self,
        id: ArtifactId,
        seq: i64,
        summary: String,
        scope: &WorldScope,
    ) -> TesseraResult<()>;

    /// Persist publication state onto the latest live row. The publish layer
    /// owns the values; storage only stores them.
    fn artifact_set_publications(
        &self,
        id: ArtifactId,
        publications: Vec<PublicationInfo>,
        scope: &WorldScope,
    ) -> TesseraResult<Artifact>;

    // === Chat Operations ===

    fn chat_insert(&self, chat: &Chat, scope: &WorldScope) -> TesseraResult<()>;

    fn chat_get(&self, id: ChatId, scope: &WorldScope) -> TesseraResult<Chat>;

    /// Non-deleted chats in scope, newest first.
    fn chat_list(&self, scope: &WorldScope) -> TesseraResult<Vec<Chat>>;

    fn chat_set_published_until(
        &self,
        id: ChatId,
        until: Option<Timestamp>,
        scope: &WorldScope,
    ) -> TesseraResult<Chat>;

    fn chat_soft_delete(
        &self,
        id: ChatId,
        user_id: UserId,
        scope: &WorldScope,
    ) -> TesseraResult<()>;

    // === User Operations ===

    fn user_insert(&self, user: &UserAccount, scope: &WorldScope) -> TesseraResult<()>;

    fn user_get(&self, id: UserId, scope: &WorldScope) -> TesseraResult<UserAccount>;

    fn user_list(&self, scope: &WorldScope) -> TesseraResult<Vec<UserAccount>>;

    // === World Metadata (global) ===

    fn world_insert(&self, meta: &WorldMeta) -> TesseraResult<()>;

    /// Insert-or-replace, used by seed import's replace strategy.
    fn world_upsert(&self, meta: &WorldMeta) -> TesseraResult<()>;

    fn world_get(&self, id: WorldId) -> TesseraResult<Option<WorldMeta>>;

    fn world_list(&self) -> TesseraResult<Vec<WorldMeta>>;

    /// Delete the metadata row only. Row cleanup is `world_purge_data`,
    /// scheduled separately.
    fn world_delete(&self, id: WorldId) -> TesseraResult<()>;

    /// Bump `usage_count` and `last_used_at` after a successful resolution.
    fn world_touch(&self, id: WorldId) -> TesseraResult<()>;

    fn world_set_active(&self, id: WorldId, active: bool) -> TesseraResult<()>;

    /// Worlds whose auto-cleanup policy makes them purge-eligible at `now`.
    fn worlds_due_cleanup(&self, now: Timestamp) -> TesseraResult<Vec<WorldMeta>>;

    // === Seed Bulk Operations (explicit cross-world exception) ===

    /// Collect every row tagged with `world_id` for export.
    fn world_data_collect(&self, world_id: WorldId) -> TesseraResult<WorldDataSet>;

    /// Apply one import plan to the users of `world_id`, all-or-nothing.
    fn users_apply(
        &self,
        world_id: WorldId,
        plan: CategoryPlan<UserAccount>,
    ) -> TesseraResult<()>;

    /// Apply one import plan to the artifact rows of `world_id`,
    /// all-or-nothing.
    fn artifacts_apply(&self, world_id: WorldId, plan: CategoryPlan<Artifact>)
        -> TesseraResult<()>;

    /// Apply one import plan to the chats of `world_id`, all-or-nothing.
    fn chats_apply(&self, world_id: WorldId, plan: CategoryPlan<Chat>) -> TesseraResult<()>;

    /// Delete every row tagged with the world. The documented
    /// separately-scheduled cascade after a world delete.
    fn world_purge_data(&self, world_id: WorldId) -> TesseraResult<PurgeCounts>;
}
