//! In-memory storage engine.
//!
//! Artifact rows live in an arena keyed by logical id, each entry holding the
//! full version history sorted ascending by `(created_at, seq)`. "Latest" is
//! the tail of an entry, not a pointer chase. Lock poisoning surfaces as
//! `StorageError::LockPoisoned` instead of panicking.

use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::Utc;
use tessera_core::{
    new_entity_id, Artifact, ArtifactId, Chat, ChatId, EntityType, PublicationInfo, StorageError,
    TesseraError, TesseraResult, Timestamp, UserAccount, UserId, WorldId, WorldMeta,
};

use crate::{
    ArtifactQuery, CategoryPlan, NewArtifactVersion, PagedArtifacts, PurgeCounts, StorageTrait,
    VersionSelector, WorldDataSet, WorldScope,
};

type Arena = HashMap<ArtifactId, Vec<Artifact>>;

/// In-memory reference engine implementing [`StorageTrait`].
#[derive(Debug, Default)]
pub struct MemoryStore {
    artifacts: Arc<RwLock<Arena>>,
    chats: Arc<RwLock<HashMap<ChatId, Chat>>>,
    users: Arc<RwLock<HashMap<UserId, UserAccount>>>,
    worlds: Arc<RwLock<HashMap<WorldId, WorldMeta>>>,
}

fn read<T>(lock: &RwLock<T>) -> TesseraResult<RwLockReadGuard<'_, T>> {
    lock.read()
        .map_err(|_| TesseraError::Storage(StorageError::LockPoisoned))
}

fn write<T>(lock: &RwLock<T>) -> TesseraResult<RwLockWriteGuard<'_, T>> {
    lock.write()
        .map_err(|_| TesseraError::Storage(StorageError::LockPoisoned))
}

fn not_found(entity_type: EntityType, id: uuid::Uuid) -> TesseraError {
    TesseraError::Storage(StorageError::NotFound { entity_type, id })
}

/// The version rows for `id` visible under `scope`. An id whose rows belong
/// to another world is indistinguishable from an unknown id.
fn scoped_rows<'a>(
    arena: &'a Arena,
    id: ArtifactId,
    scope: &WorldScope,
) -> Option<&'a Vec<Artifact>> {
    arena
        .get(&id)
        .filter(|rows| rows.first().is_some_and(|r| scope.matches(r.world_id)))
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total version rows stored, across all worlds.
    pub fn artifact_row_count(&self) -> usize {
        self.artifacts
            .read()
            .map(|a| a.values().map(Vec::len).sum())
            .unwrap_or(0)
    }

    pub fn chat_count(&self) -> usize {
        self.chats.read().map(|c| c.len()).unwrap_or(0)
    }

    pub fn user_count(&self) -> usize {
        self.users.read().map(|u| u.len()).unwrap_or(0)
    }

    pub fn world_count(&self) -> usize {
        self.worlds.read().map(|w| w.len()).unwrap_or(0)
    }
}

impl StorageTrait for MemoryStore {
    // === Artifact Operations ===

    fn artifact_append(
        &self,
        new: NewArtifactVersion,
        scope: &WorldScope,
    ) -> TesseraResult<Artifact> {
        if !new.content.matches_kind(new.kind) {
            return Err(tessera_core::ValidationError::InvalidContent {
                kind: new.kind,
                reason: "content slot does not match artifact kind".to_string(),
            }
            .into());
        }

        let mut arena = write(&self.artifacts)?;
        let id = new.artifact_id.unwrap_or_else(new_entity_id);

        let (seq, publications) = match arena.get(&id) {
            Some(rows) if !rows.is_empty() => {
                // An id whose history lives in another world does not exist
                // from this scope's point of view.
                if !scope.matches(rows[0].world_id) {
                    return Err(not_found(EntityType::Artifact, id));
                }
                let last = rows.last().expect("non-empty history");
                (last.seq + 1, last.publications.clone())
            }
            _ => (1, Vec::new()),
        };

        let row = Artifact {
            artifact_id: id,
            created_at: Utc::now(),
            seq,
            kind: new.kind,
            content: new.content,
            title: new.title,
            user_id: new.user_id,
            author_id: new.author_id,
            summary: None,
            deleted_at: None,
            publications,
            world_id: scope.world_id(),
        };

        let rows = arena.entry(id).or_default();
        rows.push(row.clone());
        rows.sort_by_key(|r| (r.created_at, r.seq));
        Ok(row)
    }

    fn artifact_latest(&self, id: ArtifactId, scope: &WorldScope) -> TesseraResult<Artifact> {
        let arena = read(&self.artifacts)?;
        let rows = scoped_rows(&arena, id, scope).ok_or_else(|| not_found(EntityType::Artifact, id))?;
        let latest = rows.last().ok_or_else(|| not_found(EntityType::Artifact, id))?;
        if latest.is_deleted() {
            return Err(not_found(EntityType::Artifact, id));
        }
        Ok(latest.clone())
    }

    fn artifact_version(
        &self,
        id: ArtifactId,
        selector: VersionSelector,
        scope: &WorldScope,
    ) -> TesseraResult<Artifact> {
        let arena = read(&self.artifacts)?;
        let rows = scoped_rows(&arena, id, scope).ok_or_else(|| not_found(EntityType::Artifact, id))?;

        let row = match selector {
            VersionSelector::Index(i) => {
                if i == 0 {
                    None
                } else {
                    rows.get(i - 1)
                }
            }
            VersionSelector::At(ts) => rows
                .iter()
                .filter(|r| r.created_at == ts)
                .max_by_key(|r| r.seq),
        };

        row.cloned().ok_or_else(|| {
            TesseraError::Storage(StorageError::VersionNotFound {
                id,
                requested: selector.to_string(),
            })
        })
    }

    fn artifact_versions(
        &self,
        id: ArtifactId,
        scope: &WorldScope,
    ) -> TesseraResult<Vec<Artifact>> {
        let arena = read(&self.artifacts)?;
        Ok(scoped_rows(&arena, id, scope).cloned().unwrap_or_default())
    }

    fn artifact_soft_delete(
        &self,
        id: ArtifactId,
        user_id: UserId,
        scope: &WorldScope,
    ) -> TesseraResult<()> {
        let mut arena = write(&self.artifacts)?;
        let rows = arena
            .get_mut(&id)
            .filter(|rows| rows.first().is_some_and(|r| scope.matches(r.world_id)))
            .ok_or_else(|| not_found(EntityType::Artifact, id))?;
        let latest = rows.last_mut().ok_or_else(|| not_found(EntityType::Artifact, id))?;

        if latest.user_id != user_id {
            return Err(TesseraError::Storage(StorageError::PermissionDenied {
                entity_type: EntityType::Artifact,
                id,
                user_id,
            }));
        }
        if latest.deleted_at.is_none() {
            latest.deleted_at = Some(Utc::now());
        }
        Ok(())
    }

    fn artifact_restore(
        &self,
        id: ArtifactId,
        user_id: UserId,
        scope: &WorldScope,
    ) -> TesseraResult<()> {
        let mut arena = write(&self.artifacts)?;
        let rows = arena
            .get_mut(&id)
            .filter(|rows| rows.first().is_some_and(|r| scope.matches(r.world_id)))
            .ok_or_else(|| not_found(EntityType::Artifact, id))?;
        let latest = rows.last_mut().ok_or_else(|| not_found(EntityType::Artifact, id))?;

        if latest.user_id != user_id {
            return Err(TesseraError::Storage(StorageError::PermissionDenied {
                entity_type: EntityType::Artifact,
                id,
                user_id,
            }));
        }
        // Restoring a live artifact is a no-op success, not an error.
        latest.deleted_at = None;
        Ok(())
    }

    fn artifact_page(
        &self,
        query: &ArtifactQuery,
        scope: &WorldScope,
    ) -> TesseraResult<PagedArtifacts> {
        let arena = read(&self.artifacts)?;
        let needle = query.search.as_ref().map(|s| s.to_lowercase());

        let matches = |row: &Artifact| -> bool {
            if row.user_id != query.user_id {
                return false;
            }
            if let Some(kind) = query.kind {
                if row.kind != kind {
                    return false;
                }
            }
            if let Some(needle) = &needle {
                let in_title = row.title.to_lowercase().contains(needle);
                let in_summary = row
                    .summary
                    .as_ref()
                    .is_some_and(|s| s.to_lowercase().contains(needle));
                if !in_title && !in_summary {
                    return false;
                }
            }
            true
        };

        let mut results: Vec<Artifact> = Vec::new();
        for rows in arena.values() {
            if !rows.first().is_some_and(|r| scope.matches(r.world_id)) {
                continue;
            }
            if query.group_by_versions {
                // One result per logical id: its latest row, hidden entirely
                // while that row is soft-deleted.
                if let Some(latest) = rows.last() {
                    if !latest.is_deleted() && matches(latest) {
                        results.push(latest.clone());
                    }
                }
            } else {
                results.extend(rows.iter().filter(|r| !r.is_deleted() && matches(r)).cloned());
            }
        }

        results.sort_by(|a, b| b.version_key().cmp(&a.version_key()));
        let total_count = results.len();

        let page = query.page.max(1);
        let data = results
            .into_iter()
            .skip((page - 1) * query.page_size)
            .take(query.page_size)
            .collect();

        Ok(PagedArtifacts { data, total_count })
    }

    fn artifact_set_summary(
        &self,
        id: ArtifactId,
        seq: i64,
        summary: String,
        scope: &WorldScope,
    ) -> TesseraResult<()> {
        let mut arena = write(&self.artifacts)?;
        let rows = arena
            .get_mut(&id)
            .filter(|rows| rows.first().is_some_and(|r| scope.matches(r.world_id)))
            .ok_or_else(|| not_found(EntityType::Artifact, id))?;
        let row = rows.iter_mut().find(|r| r.seq == seq).ok_or_else(|| {
            TesseraError::Storage(StorageError::VersionNotFound {
                id,
                requested: format!("seq {}", seq),
            })
        })?;
        row.summary = Some(summary);
        Ok(())
    }

    fn artifact_set_publications(
        &self,
        id: ArtifactId,
        publications: Vec<PublicationInfo>,
        scope: &WorldScope,
    ) -> TesseraResult<Artifact> {
        let mut arena = write(&self.artifacts)?;
        let rows = arena
            .get_mut(&id)
            .filter(|rows| rows.first().is_some_and(|r| scope.matches(r.world_id)))
            .ok_or_else(|| not_found(EntityType::Artifact, id))?;
        let latest = rows.last_mut().ok_or_else(|| not_found(EntityType::Artifact, id))?;
        if latest.is_deleted() {
            return Err(not_found(EntityType::Artifact, id));
        }
        latest.publications = publications;
        Ok(latest.clone())
    }

    // === Chat Operations ===

    fn chat_insert(&self, chat: &Chat, scope: &WorldScope) -> TesseraResult<()> {
        if !scope.matches(chat.world_id) {
            return Err(TesseraError::Storage(StorageError::InsertFailed {
                entity_type: EntityType::Chat,
                reason: "world tag does not match scope".to_string(),
            }));
        }
        let mut chats = write(&self.chats)?;
        if chats.contains_key(&chat.chat_id) {
            return Err(TesseraError::Storage(StorageError::InsertFailed {
                entity_type: EntityType::Chat,
                reason: "already exists".to_string(),
            }));
        }
        chats.insert(chat.chat_id, chat.clone());
        Ok(())
    }

    fn chat_get(&self, id: ChatId, scope: &WorldScope) -> TesseraResult<Chat> {
        let chats = read(&self.chats)?;
        chats
            .get(&id)
            .filter(|c| scope.matches(c.world_id) && !c.is_deleted())
            .cloned()
            .ok_or_else(|| not_found(EntityType::Chat, id))
    }

    fn chat_list(&self, scope: &WorldScope) -> TesseraResult<Vec<Chat>> {
        let chats = read(&self.chats)?;
        let mut list: Vec<Chat> = chats
            .values()
            .filter(|c| scope.matches(c.world_id) && !c.is_deleted())
            .cloned()
            .collect();
        list.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(list)
    }

    fn chat_set_published_until(
        &self,
        id: ChatId,
        until: Option<Timestamp>,
        scope: &WorldScope,
    ) -> TesseraResult<Chat> {
        let mut chats = write(&self.chats)?;
        let chat = chats
            .get_mut(&id)
            .filter(|c| scope.matches(c.world_id) && !c.is_deleted())
            .ok_or_else(|| not_found(EntityType::Chat, id))?;
        chat.published_until = until;
        chat.updated_at = Utc::now();
        Ok(chat.clone())
    }

    fn chat_soft_delete(
        &self,
        id: ChatId,
        user_id: UserId,
        scope: &WorldScope,
    ) -> TesseraResult<()> {
        let mut chats = write(&self.chats)?;
        let chat = chats
            .get_mut(&id)
            .filter(|c| scope.matches(c.world_id))
            .ok_or_else(|| not_found(EntityType::Chat, id))?;
        if chat.user_id != user_id {
            return Err(TesseraError::Storage(StorageError::PermissionDenied {
                entity_type: EntityType::Chat,
                id,
                user_id,
            }));
        }
        if chat.deleted_at.is_none() {
            chat.deleted_at = Some(Utc::now());
        }
        Ok(())
    }

    // === User Operations ===

    fn user_insert(&self, user: &UserAccount, scope: &WorldScope) -> TesseraResult<()> {
        if !scope.matches(user.world_id) {
            return Err(TesseraError::Storage(StorageError::InsertFailed {
                entity_type: EntityType::User,
                reason: "world tag does not match scope".to_string(),
            }));
        }
        let mut users = write(&self.users)?;
        if users.contains_key(&user.user_id) {
            return Err(TesseraError::Storage(StorageError::InsertFailed {
                entity_type: EntityType::User,
                reason: "already exists".to_string(),
            }));
        }
        users.insert(user.user_id, user.clone());
        Ok(())
    }

    fn user_get(&self, id: UserId, scope: &WorldScope) -> TesseraResult<UserAccount> {
        let users = read(&self.users)?;
        users
            .get(&id)
            .filter(|u| scope.matches(u.world_id))
            .cloned()
            .ok_or_else(|| not_found(EntityType::User, id))
    }

    fn user_list(&self, scope: &WorldScope) -> TesseraResult<Vec<UserAccount>> {
        let users = read(&self.users)?;
        let mut list: Vec<UserAccount> = users
            .values()
            .filter(|u| scope.matches(u.world_id))
            .cloned()
            .collect();
        list.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(list)
    }

    // === World Metadata ===

    fn world_insert(&self, meta: &WorldMeta) -> TesseraResult<()> {
        let mut worlds = write(&self.worlds)?;
        if worlds.contains_key(&meta.world_id) {
            return Err(TesseraError::Storage(StorageError::InsertFailed {
                entity_type: EntityType::World,
                reason: "already exists".to_string(),
            }));
        }
        worlds.insert(meta.world_id, meta.clone());
        Ok(())
    }

    fn world_upsert(&self, meta: &WorldMeta) -> TesseraResult<()> {
        let mut worlds = write(&self.worlds)?;
        worlds.insert(meta.world_id, meta.clone());
        Ok(())
    }

    fn world_get(&self, id: WorldId) -> TesseraResult<Option<WorldMeta>> {
        let worlds = read(&self.worlds)?;
        Ok(worlds.get(&id).cloned())
    }

    fn world_list(&self) -> TesseraResult<Vec<WorldMeta>> {
        let worlds = read(&self.worlds)?;
        let mut list: Vec<WorldMeta> = worlds.values().cloned().collect();
        list.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(list)
    }

    fn world_delete(&self, id: WorldId) -> TesseraResult<()> {
        let mut worlds = write(&self.worlds)?;
        worlds
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| not_found(EntityType::World, id))
    }

    fn world_touch(&self, id: WorldId) -> TesseraResult<()> {
        let mut worlds = write(&self.worlds)?;
        let meta = worlds
            .get_mut(&id)
            .ok_or_else(|| not_found(EntityType::World, id))?;
        meta.usage_count += 1;
        meta.last_used_at = Some(Utc::now());
        Ok(())
    }

    fn world_set_active(&self, id: WorldId, active: bool) -> TesseraResult<()> {
        let mut worlds = write(&self.worlds)?;
        let meta = worlds
            .get_mut(&id)
            .ok_or_else(|| not_found(EntityType::World, id))?;
        meta.is_active = active;
        Ok(())
    }

    fn worlds_due_cleanup(&self, now: Timestamp) -> TesseraResult<Vec<WorldMeta>> {
        let worlds = read(&self.worlds)?;
        Ok(worlds
            .values()
            .filter(|w| w.cleanup_due(now))
            .cloned()
            .collect())
    }

    // === Seed Bulk Operations ===

    fn world_data_collect(&self, world_id: WorldId) -> TesseraResult<WorldDataSet> {
        let tag = Some(world_id);

        let users = {
            let users = read(&self.users)?;
            let mut list: Vec<UserAccount> =
                users.values().filter(|u| u.world_id == tag).cloned().collect();
            list.sort_by(|a, b| a.created_at.cmp(&b.created_at));
            list
        };

        let artifacts = {
            let arena = read(&self.artifacts)?;
            let mut list: Vec<Artifact> = arena
                .values()
                .filter(|rows| rows.first().is_some_and(|r| r.world_id == tag))
                .flat_map(|rows| rows.iter().cloned())
                .collect();
            list.sort_by_key(|r| (r.artifact_id, r.created_at, r.seq));
            list
        };

        let chats = {
            let chats = read(&self.chats)?;
            let mut list: Vec<Chat> =
                chats.values().filter(|c| c.world_id == tag).cloned().collect();
            list.sort_by(|a, b| a.created_at.cmp(&b.created_at));
            list
        };

        Ok(WorldDataSet {
            users,
            artifacts,
            chats,
        })
    }

    fn users_apply(
        &self,
        world_id: WorldId,
        plan: CategoryPlan<UserAccount>,
    ) -> TesseraResult<()> {
        let tag = Some(world_id);
        // Validate the full plan before touching anything; the mutation below
        // commits under one write lock or not at all.
        for user in &plan.upsert {
            if user.world_id != tag {
                return Err(TesseraError::Storage(StorageError::InsertFailed {
                    entity_type: EntityType::User,
                    reason: "import row tagged with a different world".to_string(),
                }));
            }
        }

        let mut users = write(&self.users)?;
        if plan.delete_all {
            users.retain(|_, u| u.world_id != tag);
        }
        for id in &plan.remove_ids {
            if users.get(id).is_some_and(|u| u.world_id == tag) {
                users.remove(id);
            }
        }
        for user in plan.upsert {
            users.insert(user.user_id, user);
        }
        Ok(())
    }

    fn artifacts_apply(
        &self,
        world_id: WorldId,
        plan: CategoryPlan<Artifact>,
    ) -> TesseraResult<()> {
        let tag = Some(world_id);
        for row in &plan.upsert {
            if row.world_id != tag {
                return Err(TesseraError::Storage(StorageError::InsertFailed {
                    entity_type: EntityType::Artifact,
                    reason: "import row tagged with a different world".to_string(),
                }));
            }
        }

        let mut arena = write(&self.artifacts)?;

        // A logical id already owned by another world cannot be imported
        // into this one; surface it before any mutation.
        for row in &plan.upsert {
            let foreign = arena
                .get(&row.artifact_id)
                .is_some_and(|rows| rows.first().is_some_and(|r| r.world_id != tag));
            if foreign {
                return Err(TesseraError::Storage(StorageError::InsertFailed {
                    entity_type: EntityType::Artifact,
                    reason: "logical id exists in another world".to_string(),
                }));
            }
        }

        if plan.delete_all {
            arena.retain(|_, rows| !rows.first().is_some_and(|r| r.world_id == tag));
        }
        for id in &plan.remove_ids {
            if arena
                .get(id)
                .is_some_and(|rows| rows.first().is_some_and(|r| r.world_id == tag))
            {
                arena.remove(id);
            }
        }
        let mut touched = Vec::new();
        for row in plan.upsert {
            touched.push(row.artifact_id);
            arena.entry(row.artifact_id).or_default().push(row);
        }
        for id in touched {
            if let Some(rows) = arena.get_mut(&id) {
                rows.sort_by_key(|r| (r.created_at, r.seq));
            }
        }
        Ok(())
    }

    fn chats_apply(&self, world_id: WorldId, plan: CategoryPlan<Chat>) -> TesseraResult<()> {
        let tag = Some(world_id);
        for chat in &plan.upsert {
            if chat.world_id != tag {
                return Err(TesseraError::Storage(StorageError::InsertFailed {
                    entity_type: EntityType::Chat,
                    reason: "import row tagged with a different world".to_string(),
                }));
            }
        }

        let mut chats = write(&self.chats)?;
        if plan.delete_all {
            chats.retain(|_, c| c.world_id != tag);
        }
        for id in &plan.remove_ids {
            if chats.get(id).is_some_and(|c| c.world_id == tag) {
                chats.remove(id);
            }
        }
        for chat in plan.upsert {
            chats.insert(chat.chat_id, chat);
        }
        Ok(())
    }

    fn world_purge_data(&self, world_id: WorldId) -> TesseraResult<PurgeCounts> {
        let tag = Some(world_id);
        let mut counts = PurgeCounts::default();

        {
            let mut users = write(&self.users)?;
            let before = users.len();
            users.retain(|_, u| u.world_id != tag);
            counts.users = before - users.len();
        }
        {
            let mut arena = write(&self.artifacts)?;
            let removed: usize = arena
                .values()
                .filter(|rows| rows.first().is_some_and(|r| r.world_id == tag))
                .map(Vec::len)
                .sum();
            arena.retain(|_, rows| !rows.first().is_some_and(|r| r.world_id == tag));
            counts.artifact_rows = removed;
        }
        {
            let mut chats = write(&self.chats)?;
            let before = chats.len();
            chats.retain(|_, c| c.world_id != tag);
            counts.chats = before - chats.len();
        }

        tracing::debug!(
            world_id = %world_id,
            users = counts.users,
            artifact_rows = counts.artifact_rows,
            chats = counts.chats,
            "purged world rows"
        );
        Ok(counts)
    }
}

// =============================================================================
// TESTS
// =============================================================================
