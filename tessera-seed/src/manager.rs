//! Export / analyze / import pipeline.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tessera_core::{
    compute_content_hash, new_entity_id, Artifact, ArtifactId, Chat, ContentHash, EntityId,
    Environment, SeedError, TesseraResult, UserAccount, WorldId,
};
use tessera_storage::{CategoryPlan, StorageTrait};

use crate::blob::{world_blob_prefix, BlobStore};
use crate::conflict::{classify_risk, ConflictReport, EntityConflict};
use crate::snapshot::{BlobRef, SeedSnapshot, SnapshotSource, WorldBundle};
use crate::strategy::{EntityStrategy, ImportStrategy, WorldStrategy};

// ============================================================================
// IMPORT REPORT
// ============================================================================

/// What happened to one category during import.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CategoryOutcome {
    pub inserted: usize,
    /// Existing entities removed wholesale by a replace.
    pub replaced: usize,
    pub overwritten: usize,
    pub renamed: usize,
    /// Colliding entities left untouched under merge.
    pub kept: usize,
    /// Colliding entities left untouched under skip.
    pub skipped: usize,
}

/// Per-category import results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ImportReport {
    pub world: CategoryOutcome,
    pub users: CategoryOutcome,
    pub artifacts: CategoryOutcome,
    pub chats: CategoryOutcome,
    pub blobs: CategoryOutcome,
}

// ============================================================================
// SEED MANAGER
// ============================================================================

/// Orchestrates the snapshot pipeline against one storage + blob registry.
///
/// Categories import as independent transactions: each one commits
/// all-or-nothing, and a failure does not roll back categories already
/// committed. Callers serialize imports into the same world.
pub struct SeedManager {
    storage: Arc<dyn StorageTrait>,
    blobs: Arc<dyn BlobStore>,
    environment: Environment,
}

fn fingerprint<T: Serialize>(value: &T) -> ContentHash {
    compute_content_hash(&serde_json::to_vec(value).unwrap_or_default())
}

/// Diverging id collisions between snapshot rows and target rows.
/// Byte-identical collisions are the same entity already present, not
/// conflicts.
fn diff_by_id<T: Serialize>(
    snapshot: &[T],
    target: &[T],
    id_of: impl Fn(&T) -> EntityId,
) -> Vec<EntityConflict> {
    let target_by_id: HashMap<EntityId, &T> =
        target.iter().map(|t| (id_of(t), t)).collect();
    snapshot
        .iter()
        .filter_map(|s| {
            let id = id_of(s);
            let existing = target_by_id.get(&id)?;
            (fingerprint(s) != fingerprint(*existing)).then_some(EntityConflict { id })
        })
        .collect()
}

fn group_versions(rows: &[Artifact]) -> BTreeMap<ArtifactId, Vec<&Artifact>> {
    let mut groups: BTreeMap<ArtifactId, Vec<&Artifact>> = BTreeMap::new();
    for row in rows {
        groups.entry(row.artifact_id).or_default().push(row);
    }
    groups
}

/// Artifact conflicts compare whole version sets per logical id.
fn diff_artifacts(snapshot: &[Artifact], target: &[Artifact]) -> Vec<EntityConflict> {
    let snapshot_groups = group_versions(snapshot);
    let target_groups = group_versions(target);
    snapshot_groups
        .iter()
        .filter_map(|(id, versions)| {
            let existing = target_groups.get(id)?;
            (fingerprint(versions) != fingerprint(existing)).then_some(EntityConflict { id: *id })
        })
        .collect()
}

/// Build the all-or-nothing plan for a flat entity category.
fn entity_plan<T>(
    rows: Vec<T>,
    existing: &HashSet<EntityId>,
    strategy: EntityStrategy,
    id_of: impl Fn(&T) -> EntityId,
    set_id: impl Fn(&mut T, EntityId),
) -> (CategoryPlan<T>, CategoryOutcome) {
    let mut plan = CategoryPlan::default();
    let mut outcome = CategoryOutcome::default();

    match strategy {
        EntityStrategy::Replace => {
            plan.delete_all = true;
            outcome.replaced = existing.len();
            outcome.inserted = rows.len();
            plan.upsert = rows;
        }
        EntityStrategy::Merge | EntityStrategy::Skip => {
            for row in rows {
                if existing.contains(&id_of(&row)) {
                    if strategy == EntityStrategy::Merge {
                        outcome.kept += 1;
                    } else {
                        outcome.skipped += 1;
                    }
                } else {
                    outcome.inserted += 1;
                    plan.upsert.push(row);
                }
            }
        }
        EntityStrategy::Overwrite => {
            for row in rows {
                let id = id_of(&row);
                if existing.contains(&id) {
                    outcome.overwritten += 1;
                    plan.remove_ids.push(id);
                } else {
                    outcome.inserted += 1;
                }
                plan.upsert.push(row);
            }
        }
        EntityStrategy::Rename => {
            for mut row in rows {
                if existing.contains(&id_of(&row)) {
                    set_id(&mut row, new_entity_id());
                    outcome.renamed += 1;
                } else {
                    outcome.inserted += 1;
                }
                plan.upsert.push(row);
            }
        }
    }
    (plan, outcome)
}

/// Same, but per logical artifact: the unit of collision is the id, the unit
/// of data is its whole version set.
fn artifact_plan(
    rows: Vec<Artifact>,
    existing: &HashSet<ArtifactId>,
    strategy: EntityStrategy,
) -> (CategoryPlan<Artifact>, CategoryOutcome) {
    let mut groups: BTreeMap<ArtifactId, Vec<Artifact>> = BTreeMap::new();
    for row in rows {
        groups.entry(row.artifact_id).or_default().push(row);
    }

    let mut plan = CategoryPlan::default();
    let mut outcome = CategoryOutcome::default();

    match strategy {
        EntityStrategy::Replace => {
            plan.delete_all = true;
            outcome.replaced = existing.len();
            outcome.inserted = groups.len();
            plan.upsert = groups.into_values().flatten().collect();
        }
        EntityStrategy::Merge | EntityStrategy::Skip => {
            for (id, versions) in groups {
                if existing.contains(&id) {
                    if strategy == EntityStrategy::Merge {
                        outcome.kept += 1;
                    } else {
                        outcome.skipped += 1;
                    }
                } else {
                    outcome.inserted += 1;
                    plan.upsert.extend(versions);
                }
            }
        }
        EntityStrategy::Overwrite => {
            for (id, versions) in groups {
                if existing.contains(&id) {
                    outcome.overwritten += 1;
                    plan.remove_ids.push(id);
                } else {
                    outcome.inserted += 1;
                }
                plan.upsert.extend(versions);
            }
        }
        EntityStrategy::Rename => {
            for (id, mut versions) in groups {
                if existing.contains(&id) {
                    let fresh = new_entity_id();
                    for row in &mut versions {
                        row.artifact_id = fresh;
                    }
                    outcome.renamed += 1;
                } else {
                    outcome.inserted += 1;
                }
                plan.upsert.extend(versions);
            }
        }
    }
    (plan, outcome)
}

impl SeedManager {
    pub fn new(
        storage: Arc<dyn StorageTrait>,
        blobs: Arc<dyn BlobStore>,
        environment: Environment,
    ) -> Self {
        Self {
            storage,
            blobs,
            environment,
        }
    }

    /// Export one world to `<out_dir>/<snapshot_name>/manifest.json`.
    ///
    /// With `include_binaries`, every URL content slot is resolved to a
    /// downloadable pointer and recorded in the manifest's blob list.
    pub fn export(
        &self,
        world_id: WorldId,
        snapshot_name: &str,
        include_binaries: bool,
        out_dir: &Path,
    ) -> TesseraResult<PathBuf> {
        let metadata = self
            .storage
            .world_get(world_id)?
            .ok_or(SeedError::WorldNotFound { world_id })?;
        let data = self.storage.world_data_collect(world_id)?;

        let blobs = if include_binaries {
            let mut seen = HashSet::new();
            data.artifacts
                .iter()
                .filter_map(|row| row.content.as_url())
                .filter(|key| seen.insert(key.to_string()))
                .map(|key| BlobRef {
                    key: key.to_string(),
                    url: self.blobs.resolve_url(key),
                })
                .collect()
        } else {
            Vec::new()
        };

        let snapshot = SeedSnapshot {
            world: WorldBundle {
                metadata,
                users: data.users,
                artifacts: data.artifacts,
                chats: data.chats,
                blobs,
            },
            source: SnapshotSource {
                environment: self.environment,
                timestamp: Utc::now(),
            },
        };

        let path = snapshot.write_to(&out_dir.join(snapshot_name))?;
        tracing::info!(world_id = %world_id, path = %path.display(), "world exported");
        Ok(path)
    }

    /// Diff a snapshot against the current target store and blob registry.
    pub fn analyze(&self, snapshot_path: &Path) -> TesseraResult<ConflictReport> {
        let snapshot = SeedSnapshot::read_from(snapshot_path)?;
        let world_id = snapshot.world.metadata.world_id;

        let world_exists = self.storage.world_get(world_id)?.is_some();
        let target = self.storage.world_data_collect(world_id)?;

        let user_conflicts = diff_by_id(&snapshot.world.users, &target.users, |u| u.user_id);
        let chat_conflicts = diff_by_id(&snapshot.world.chats, &target.chats, |c| c.chat_id);
        let artifact_conflicts = diff_artifacts(&snapshot.world.artifacts, &target.artifacts);

        let mut missing_blobs = Vec::new();
        for blob in &snapshot.world.blobs {
            if !self.blobs.exists(&blob.key)? {
                missing_blobs.push(blob.key.clone());
            }
        }
        let referenced: HashSet<&str> =
            snapshot.world.blobs.iter().map(|b| b.key.as_str()).collect();
        let orphaned_blobs = self
            .blobs
            .list_prefix(&world_blob_prefix(world_id))?
            .into_iter()
            .filter(|key| !referenced.contains(key.as_str()))
            .collect();

        let total =
            user_conflicts.len() + artifact_conflicts.len() + chat_conflicts.len();
        Ok(ConflictReport {
            world_exists,
            user_conflicts,
            artifact_conflicts,
            chat_conflicts,
            missing_blobs,
            orphaned_blobs,
            risk: classify_risk(world_exists, total),
        })
    }

    /// Import a snapshot under per-category strategies.
    ///
    /// Category order: world metadata, users, artifacts, chats, blobs. Each
    /// category commits all-or-nothing; a failure propagates without rolling
    /// back categories already committed.
    pub fn import(
        &self,
        snapshot_path: &Path,
        strategy: &ImportStrategy,
    ) -> TesseraResult<ImportReport> {
        let snapshot = SeedSnapshot::read_from(snapshot_path)?;
        let world_id = snapshot.world.metadata.world_id;
        let target = self.storage.world_data_collect(world_id)?;
        let mut report = ImportReport::default();

        let world_exists = self.storage.world_get(world_id)?.is_some();
        match strategy.world {
            WorldStrategy::Replace => {
                self.storage.world_upsert(&snapshot.world.metadata)?;
                if world_exists {
                    report.world.replaced += 1;
                } else {
                    report.world.inserted += 1;
                }
            }
            WorldStrategy::Merge | WorldStrategy::Skip => {
                if world_exists {
                    if strategy.world == WorldStrategy::Merge {
                        report.world.kept += 1;
                    } else {
                        report.world.skipped += 1;
                    }
                } else {
                    self.storage.world_insert(&snapshot.world.metadata)?;
                    report.world.inserted += 1;
                }
            }
        }

        {
            let existing: HashSet<EntityId> =
                target.users.iter().map(|u| u.user_id).collect();
            let (plan, outcome) = entity_plan(
                snapshot.world.users,
                &existing,
                strategy.users,
                |u: &UserAccount| u.user_id,
                |u, id| u.user_id = id,
            );
            self.storage.users_apply(world_id, plan)?;
            report.users = outcome;
        }

        {
            let existing: HashSet<ArtifactId> =
                target.artifacts.iter().map(|r| r.artifact_id).collect();
            let (plan, outcome) =
                artifact_plan(snapshot.world.artifacts, &existing, strategy.artifacts);
            self.storage.artifacts_apply(world_id, plan)?;
            report.artifacts = outcome;
        }

        {
            let existing: HashSet<EntityId> =
                target.chats.iter().map(|c| c.chat_id).collect();
            let (plan, outcome) = entity_plan(
                snapshot.world.chats,
                &existing,
                strategy.chats,
                |c: &Chat| c.chat_id,
                |c, id| c.chat_id = id,
            );
            self.storage.chats_apply(world_id, plan)?;
            report.chats = outcome;
        }

        report.blobs = self.apply_blobs(world_id, &snapshot.world.blobs, strategy.blobs)?;

        tracing::info!(
            world_id = %world_id,
            users = report.users.inserted,
            artifacts = report.artifacts.inserted,
            chats = report.chats.inserted,
            "world imported"
        );
        Ok(report)
    }

    fn apply_blobs(
        &self,
        world_id: WorldId,
        refs: &[BlobRef],
        strategy: EntityStrategy,
    ) -> TesseraResult<CategoryOutcome> {
        let mut outcome = CategoryOutcome::default();
        match strategy {
            EntityStrategy::Replace => {
                for key in self.blobs.list_prefix(&world_blob_prefix(world_id))? {
                    self.blobs.remove(&key)?;
                    outcome.replaced += 1;
                }
                for blob in refs {
                    self.blobs.register(&blob.key)?;
                    outcome.inserted += 1;
                }
            }
            EntityStrategy::Merge | EntityStrategy::Skip => {
                for blob in refs {
                    if self.blobs.exists(&blob.key)? {
                        if strategy == EntityStrategy::Merge {
                            outcome.kept += 1;
                        } else {
                            outcome.skipped += 1;
                        }
                    } else {
                        self.blobs.register(&blob.key)?;
                        outcome.inserted += 1;
                    }
                }
            }
            EntityStrategy::Overwrite => {
                for blob in refs {
                    let existed = self.blobs.exists(&blob.key)?;
                    self.blobs.register(&blob.key)?;
                    if existed {
                        outcome.overwritten += 1;
                    } else {
                        outcome.inserted += 1;
                    }
                }
            }
            EntityStrategy::Rename => {
                for blob in refs {
                    if self.blobs.exists(&blob.key)? {
                        let fresh = format!("{}{}", world_blob_prefix(world_id), new_entity_id());
                        self.blobs.register(&fresh)?;
                        outcome.renamed += 1;
                    } else {
                        self.blobs.register(&blob.key)?;
                        outcome.inserted += 1;
                    }
                }
            }
        }
        Ok(outcome)
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blob::MemoryBlobStore;
    use crate::conflict::ConflictRisk;
    use tessera_core::{
        ArtifactKind, ContentPayload, TesseraError, WorldCategory, WorldMeta,
    };
    use tessera_storage::{MemoryStore, NewArtifactVersion, VersionSelector, WorldScope};

    struct Fixture {
        store: Arc<MemoryStore>,
        blobs: Arc<MemoryBlobStore>,
        manager: SeedManager,
    }

    fn fixture(environment: Environment) -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let blobs = Arc::new(MemoryBlobStore::new());
        let manager = SeedManager::new(store.clone(), blobs.clone(), environment);
        Fixture {
            store,
            blobs,
            manager,
        }
    }

    fn text_version(
        id: Option<ArtifactId>,
        title: &str,
        body: &str,
        user: EntityId,
    ) -> NewArtifactVersion {
        NewArtifactVersion {
            artifact_id: id,
            kind: ArtifactKind::Text,
            content: ContentPayload::Text(body.to_string()),
            title: title.to_string(),
            user_id: user,
            author_id: Some(user),
        }
    }

    /// A world with one user, a two-version text artifact, an image artifact
    /// backed by a registered blob, and one chat.
    fn seeded_world(fx: &Fixture, environment: Environment) -> WorldMeta {
        let meta = WorldMeta::new("demo", environment, WorldCategory::Demo);
        fx.store.world_insert(&meta).unwrap();
        let scope = WorldScope::world(meta.world_id);

        let user = UserAccount::new("ada", "Ada", Some(meta.world_id));
        fx.store.user_insert(&user, &scope).unwrap();

        let doc = fx
            .store
            .artifact_append(text_version(None, "notes", "v1", user.user_id), &scope)
            .unwrap();
        fx.store
            .artifact_append(
                text_version(Some(doc.artifact_id), "notes", "v2", user.user_id),
                &scope,
            )
            .unwrap();

        let key = format!("{}hero.png", world_blob_prefix(meta.world_id));
        fx.blobs.register(&key).unwrap();
        fx.store
            .artifact_append(
                NewArtifactVersion {
                    artifact_id: None,
                    kind: ArtifactKind::Image,
                    content: ContentPayload::Url(key),
                    title: "hero".to_string(),
                    user_id: user.user_id,
                    author_id: None,
                },
                &scope,
            )
            .unwrap();

        fx.store
            .chat_insert(&Chat::new(user.user_id, "support", Some(meta.world_id)), &scope)
            .unwrap();
        meta
    }

    #[test]
    fn test_export_unknown_world_fails() {
        let fx = fixture(Environment::LocalDev);
        let dir = tempfile::tempdir().unwrap();
        let ghost = new_entity_id();

        let err = fx
            .manager
            .export(ghost, "nope", true, dir.path())
            .unwrap_err();
        let TesseraError::Seed(seed) = &err else {
            panic!("expected seed error, got {:?}", err);
        };
        assert_eq!(seed.to_string(), format!("World '{}' not found", ghost));
    }

    #[test]
    fn test_export_manifest_contents() {
        let fx = fixture(Environment::SharedTest);
        let meta = seeded_world(&fx, Environment::SharedTest);
        let dir = tempfile::tempdir().unwrap();

        let path = fx
            .manager
            .export(meta.world_id, "demo-seed", true, dir.path())
            .unwrap();
        let snapshot = SeedSnapshot::read_from(&path).unwrap();

        assert_eq!(snapshot.world.metadata.world_id, meta.world_id);
        assert_eq!(snapshot.world.users.len(), 1);
        assert_eq!(snapshot.world.artifacts.len(), 3); // two text versions + one image
        assert_eq!(snapshot.world.chats.len(), 1);
        assert_eq!(snapshot.world.blobs.len(), 1);
        assert!(snapshot.world.blobs[0].url.starts_with("memory://"));
        assert_eq!(snapshot.source.environment, Environment::SharedTest);
    }

    #[test]
    fn test_export_without_binaries_has_no_refs() {
        let fx = fixture(Environment::LocalDev);
        let meta = seeded_world(&fx, Environment::LocalDev);
        let dir = tempfile::tempdir().unwrap();

        let path = fx
            .manager
            .export(meta.world_id, "lean", false, dir.path())
            .unwrap();
        let snapshot = SeedSnapshot::read_from(&path).unwrap();
        assert!(snapshot.world.blobs.is_empty());
    }

    #[test]
    fn test_round_trip_into_empty_target() {
        let source = fixture(Environment::SharedTest);
        let meta = seeded_world(&source, Environment::SharedTest);
        let dir = tempfile::tempdir().unwrap();
        let path = source
            .manager
            .export(meta.world_id, "demo-seed", true, dir.path())
            .unwrap();

        let target = fixture(Environment::SharedTest);
        let report = target
            .manager
            .import(&path, &ImportStrategy::replace_all())
            .unwrap();
        assert_eq!(report.world.inserted, 1);
        assert_eq!(report.users.inserted, 1);
        assert_eq!(report.artifacts.inserted, 2); // two logical artifacts
        assert_eq!(report.chats.inserted, 1);
        assert_eq!(report.blobs.inserted, 1);

        // The imported entity set equals the original, by id and content.
        let original = source.store.world_data_collect(meta.world_id).unwrap();
        let imported = target.store.world_data_collect(meta.world_id).unwrap();
        assert_eq!(original, imported);
        assert_eq!(
            target.store.world_get(meta.world_id).unwrap().unwrap(),
            meta
        );

        // Re-analyzing against the freshly imported target: the world exists
        // and nothing conflicts.
        let analysis = target.manager.analyze(&path).unwrap();
        assert!(analysis.world_exists);
        assert_eq!(analysis.total_entity_conflicts(), 0);
        assert!(analysis.missing_blobs.is_empty());
        assert!(analysis.orphaned_blobs.is_empty());
        assert_eq!(analysis.risk, ConflictRisk::Medium);
    }

    #[test]
    fn test_analyze_empty_target_is_low_risk() {
        let source = fixture(Environment::LocalDev);
        let meta = seeded_world(&source, Environment::LocalDev);
        let dir = tempfile::tempdir().unwrap();
        let path = source
            .manager
            .export(meta.world_id, "s", true, dir.path())
            .unwrap();

        let target = fixture(Environment::LocalDev);
        let analysis = target.manager.analyze(&path).unwrap();
        assert!(!analysis.world_exists);
        assert_eq!(analysis.total_entity_conflicts(), 0);
        assert_eq!(analysis.risk, ConflictRisk::Low);
        // The referenced binary is nowhere in the target registry yet.
        assert_eq!(analysis.missing_blobs.len(), 1);
    }

    #[test]
    fn test_analyze_flags_divergence_and_orphans() {
        let source = fixture(Environment::LocalDev);
        let meta = seeded_world(&source, Environment::LocalDev);
        let dir = tempfile::tempdir().unwrap();
        let path = source
            .manager
            .export(meta.world_id, "s", true, dir.path())
            .unwrap();

        // Target = imported copy, then diverge one artifact and plant a
        // stray blob under the world prefix.
        let target = fixture(Environment::LocalDev);
        target
            .manager
            .import(&path, &ImportStrategy::replace_all())
            .unwrap();
        let snapshot = SeedSnapshot::read_from(&path).unwrap();
        let doc_id = snapshot
            .world
            .artifacts
            .iter()
            .find(|r| r.kind == ArtifactKind::Text)
            .unwrap()
            .artifact_id;
        let owner = snapshot.world.users[0].user_id;
        target
            .store
            .artifact_append(
                text_version(Some(doc_id), "notes", "diverged", owner),
                &WorldScope::world(meta.world_id),
            )
            .unwrap();
        let stray = format!("{}stray.bin", world_blob_prefix(meta.world_id));
        target.blobs.register(&stray).unwrap();

        let analysis = target.manager.analyze(&path).unwrap();
        assert!(analysis.world_exists);
        assert_eq!(analysis.artifact_conflicts.len(), 1);
        assert_eq!(analysis.artifact_conflicts[0].id, doc_id);
        assert!(analysis.user_conflicts.is_empty());
        assert!(analysis.chat_conflicts.is_empty());
        assert_eq!(analysis.orphaned_blobs, vec![stray]);
        assert_eq!(analysis.risk, ConflictRisk::Medium);
    }

    #[test]
    fn test_four_artifact_conflicts_without_world_is_high_risk() {
        let source = fixture(Environment::LocalDev);
        let meta = WorldMeta::new("w", Environment::LocalDev, WorldCategory::Test);
        source.store.world_insert(&meta).unwrap();
        let scope = WorldScope::world(meta.world_id);
        let user = new_entity_id();
        let mut ids = Vec::new();
        for i in 0..4 {
            let row = source
                .store
                .artifact_append(
                    text_version(None, &format!("doc {}", i), "original", user),
                    &scope,
                )
                .unwrap();
            ids.push(row.artifact_id);
        }
        let dir = tempfile::tempdir().unwrap();
        let path = source
            .manager
            .export(meta.world_id, "s", false, dir.path())
            .unwrap();

        // Target holds the same four ids with diverged content but has no
        // metadata row for the world.
        let target = fixture(Environment::LocalDev);
        for id in &ids {
            let row = Artifact {
                artifact_id: *id,
                created_at: Utc::now(),
                seq: 1,
                kind: ArtifactKind::Text,
                content: ContentPayload::Text("diverged".to_string()),
                title: "doc".to_string(),
                user_id: user,
                author_id: None,
                summary: None,
                deleted_at: None,
                publications: Vec::new(),
                world_id: Some(meta.world_id),
            };
            target
                .store
                .artifacts_apply(
                    meta.world_id,
                    CategoryPlan {
                        delete_all: false,
                        remove_ids: vec![],
                        upsert: vec![row],
                    },
                )
                .unwrap();
        }

        let analysis = target.manager.analyze(&path).unwrap();
        assert!(!analysis.world_exists);
        assert_eq!(analysis.artifact_conflicts.len(), 4);
        assert_eq!(analysis.user_conflicts.len(), 0);
        assert_eq!(analysis.chat_conflicts.len(), 0);
        assert_eq!(analysis.risk, ConflictRisk::High);
    }

    #[test]
    fn test_merge_keeps_colliding_skip_labels_differently() {
        let source = fixture(Environment::LocalDev);
        let meta = seeded_world(&source, Environment::LocalDev);
        let dir = tempfile::tempdir().unwrap();
        let path = source
            .manager
            .export(meta.world_id, "s", true, dir.path())
            .unwrap();
        let snapshot = SeedSnapshot::read_from(&path).unwrap();
        let doc_id = snapshot
            .world
            .artifacts
            .iter()
            .find(|r| r.kind == ArtifactKind::Text)
            .unwrap()
            .artifact_id;
        let owner = snapshot.world.users[0].user_id;

        for strategy in [EntityStrategy::Merge, EntityStrategy::Skip] {
            // Target already holds a diverged version of the text artifact.
            let target = fixture(Environment::LocalDev);
            target.store.world_insert(&meta).unwrap();
            let scope = WorldScope::world(meta.world_id);
            target
                .store
                .artifact_append(
                    text_version(Some(doc_id), "notes", "local edit", owner),
                    &scope,
                )
                .unwrap();

            let report = target
                .manager
                .import(
                    &path,
                    &ImportStrategy::uniform(WorldStrategy::Merge, strategy),
                )
                .unwrap();

            // Colliding id untouched: the local edit survives.
            let latest = target.store.artifact_latest(doc_id, &scope).unwrap();
            assert_eq!(latest.content.as_text(), Some("local edit"));
            assert_eq!(
                target.store.artifact_versions(doc_id, &scope).unwrap().len(),
                1
            );
            // The image artifact did not collide and was inserted.
            assert_eq!(report.artifacts.inserted, 1);
            match strategy {
                EntityStrategy::Merge => {
                    assert_eq!(report.artifacts.kept, 1);
                    assert_eq!(report.artifacts.skipped, 0);
                }
                _ => {
                    assert_eq!(report.artifacts.skipped, 1);
                    assert_eq!(report.artifacts.kept, 0);
                }
            }
            // World already existed: merge keeps it.
            assert_eq!(report.world.inserted, 0);
        }
    }

    #[test]
    fn test_overwrite_swaps_whole_version_set() {
        let source = fixture(Environment::LocalDev);
        let meta = seeded_world(&source, Environment::LocalDev);
        let dir = tempfile::tempdir().unwrap();
        let path = source
            .manager
            .export(meta.world_id, "s", true, dir.path())
            .unwrap();
        let snapshot = SeedSnapshot::read_from(&path).unwrap();
        let doc_id = snapshot
            .world
            .artifacts
            .iter()
            .find(|r| r.kind == ArtifactKind::Text)
            .unwrap()
            .artifact_id;
        let owner = snapshot.world.users[0].user_id;

        let target = fixture(Environment::LocalDev);
        target.store.world_insert(&meta).unwrap();
        let scope = WorldScope::world(meta.world_id);
        target
            .store
            .artifact_append(text_version(Some(doc_id), "notes", "local", owner), &scope)
            .unwrap();

        let report = target
            .manager
            .import(
                &path,
                &ImportStrategy::uniform(WorldStrategy::Merge, EntityStrategy::Overwrite),
            )
            .unwrap();
        assert_eq!(report.artifacts.overwritten, 1);

        // The single local version was swapped for the snapshot's two.
        let versions = target.store.artifact_versions(doc_id, &scope).unwrap();
        assert_eq!(versions.len(), 2);
        assert_eq!(
            target
                .store
                .artifact_version(doc_id, VersionSelector::Index(2), &scope)
                .unwrap()
                .content
                .as_text(),
            Some("v2")
        );
    }

    #[test]
    fn test_rename_inserts_under_fresh_ids() {
        let source = fixture(Environment::LocalDev);
        let meta = seeded_world(&source, Environment::LocalDev);
        let dir = tempfile::tempdir().unwrap();
        let path = source
            .manager
            .export(meta.world_id, "s", false, dir.path())
            .unwrap();
        let snapshot = SeedSnapshot::read_from(&path).unwrap();
        let doc_id = snapshot
            .world
            .artifacts
            .iter()
            .find(|r| r.kind == ArtifactKind::Text)
            .unwrap()
            .artifact_id;
        let owner = snapshot.world.users[0].user_id;

        let target = fixture(Environment::LocalDev);
        target.store.world_insert(&meta).unwrap();
        let scope = WorldScope::world(meta.world_id);
        target
            .store
            .artifact_append(text_version(Some(doc_id), "notes", "local", owner), &scope)
            .unwrap();

        let report = target
            .manager
            .import(
                &path,
                &ImportStrategy::uniform(WorldStrategy::Merge, EntityStrategy::Rename),
            )
            .unwrap();
        assert_eq!(report.artifacts.renamed, 1);
        assert_eq!(report.artifacts.inserted, 1);

        // The local row is untouched and the snapshot copy landed elsewhere.
        let local = target.store.artifact_versions(doc_id, &scope).unwrap();
        assert_eq!(local.len(), 1);
        assert_eq!(local[0].content.as_text(), Some("local"));

        let all = target.store.world_data_collect(meta.world_id).unwrap();
        let renamed_id = all
            .artifacts
            .iter()
            .map(|r| r.artifact_id)
            .find(|id| {
                *id != doc_id
                    && all
                        .artifacts
                        .iter()
                        .any(|r| r.artifact_id == *id && r.kind == ArtifactKind::Text)
            })
            .unwrap();
        let renamed_versions: Vec<_> = all
            .artifacts
            .iter()
            .filter(|r| r.artifact_id == renamed_id)
            .collect();
        assert_eq!(renamed_versions.len(), 2);
        assert_eq!(renamed_versions[1].content.as_text(), Some("v2"));
    }

    #[test]
    fn test_blob_replace_clears_strays() {
        let source = fixture(Environment::LocalDev);
        let meta = seeded_world(&source, Environment::LocalDev);
        let dir = tempfile::tempdir().unwrap();
        let path = source
            .manager
            .export(meta.world_id, "s", true, dir.path())
            .unwrap();

        let target = fixture(Environment::LocalDev);
        let stray = format!("{}stray.bin", world_blob_prefix(meta.world_id));
        target.blobs.register(&stray).unwrap();

        let report = target
            .manager
            .import(&path, &ImportStrategy::replace_all())
            .unwrap();
        assert_eq!(report.blobs.replaced, 1);
        assert_eq!(report.blobs.inserted, 1);
        assert!(!target.blobs.exists(&stray).unwrap());

        let analysis = target.manager.analyze(&path).unwrap();
        assert!(analysis.missing_blobs.is_empty());
        assert!(analysis.orphaned_blobs.is_empty());
    }

    #[test]
    fn test_failed_category_leaves_it_untouched_but_earlier_ones_commit() {
        let source = fixture(Environment::LocalDev);
        let meta = seeded_world(&source, Environment::LocalDev);
        let dir = tempfile::tempdir().unwrap();
        let path = source
            .manager
            .export(meta.world_id, "s", false, dir.path())
            .unwrap();
        let snapshot = SeedSnapshot::read_from(&path).unwrap();
        let doc_id = snapshot
            .world
            .artifacts
            .iter()
            .find(|r| r.kind == ArtifactKind::Text)
            .unwrap()
            .artifact_id;

        // Poison the target: the snapshot's artifact id already belongs to a
        // DIFFERENT world there, which the artifact category must refuse.
        let target = fixture(Environment::LocalDev);
        let other_world = new_entity_id();
        let foreign = Artifact {
            artifact_id: doc_id,
            created_at: Utc::now(),
            seq: 1,
            kind: ArtifactKind::Text,
            content: ContentPayload::Text("foreign".to_string()),
            title: "foreign".to_string(),
            user_id: new_entity_id(),
            author_id: None,
            summary: None,
            deleted_at: None,
            publications: Vec::new(),
            world_id: Some(other_world),
        };
        target
            .store
            .artifacts_apply(
                other_world,
                CategoryPlan {
                    delete_all: false,
                    remove_ids: vec![],
                    upsert: vec![foreign],
                },
            )
            .unwrap();

        let err = target
            .manager
            .import(&path, &ImportStrategy::replace_all())
            .unwrap_err();
        assert!(matches!(err, TesseraError::Storage(_)));

        // Earlier categories committed: world metadata and users are in.
        assert!(target.store.world_get(meta.world_id).unwrap().is_some());
        assert_eq!(
            target
                .store
                .user_list(&WorldScope::world(meta.world_id))
                .unwrap()
                .len(),
            1
        );
        // The failed category wrote nothing into the target world...
        assert!(target
            .store
            .world_data_collect(meta.world_id)
            .unwrap()
            .artifacts
            .is_empty());
        // ...and later categories never ran.
        assert!(target
            .store
            .chat_list(&WorldScope::world(meta.world_id))
            .unwrap()
            .is_empty());
        // The foreign world's row survived untouched.
        let foreign_rows = target.store.world_data_collect(other_world).unwrap();
        assert_eq!(foreign_rows.artifacts.len(), 1);
        assert_eq!(
            foreign_rows.artifacts[0].content.as_text(),
            Some("foreign")
        );
    }
}
