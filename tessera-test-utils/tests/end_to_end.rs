//! End-to-end flows across the resolver, content service and seed pipeline.

use std::sync::Arc;

use tessera_api::{ContentService, SaveArtifact};
use tessera_context::{ContextDiagnostics, FallbackReason, WorldContextResolver, WorldToken};
use tessera_core::{new_entity_id, ArtifactKind, Environment, PublicationSource};
use tessera_seed::{ImportStrategy, MemoryBlobStore, SeedManager};
use tessera_storage::{ArtifactQuery, StorageTrait};
use tessera_test_utils::{
    active_world, populate_scope, site_definition_json, MemoryStore, RecordingDiagnostics,
};

#[test]
fn token_resolution_scopes_the_whole_request_path() {
    let store = Arc::new(MemoryStore::new());
    let world = active_world(store.as_ref(), Environment::LocalDev);
    let populated = populate_scope(store.as_ref(), Some(world.world_id));

    let recorder = Arc::new(RecordingDiagnostics::new());
    let resolver = WorldContextResolver::new(Environment::LocalDev, store.clone())
        .with_diagnostics(recorder.clone() as Arc<dyn ContextDiagnostics>);
    let service = ContentService::new(store.clone());

    // A request carrying the world token sees the world's data.
    let ctx = resolver.resolve(&WorldToken::for_world(world.world_id));
    assert!(ctx.test_mode);
    let mut query = ArtifactQuery::for_user(populated.user.user_id);
    query.page_size = 50;
    let page = service.list_artifacts(&query, &ctx).unwrap();
    assert_eq!(page.total_count, 1);
    assert_eq!(page.data[0].artifact_id, populated.doc_id);

    // A request with no token sees production, which is empty here.
    let prod_ctx = resolver.resolve(&WorldToken::absent());
    let prod_page = service.list_artifacts(&query, &prod_ctx).unwrap();
    assert_eq!(prod_page.total_count, 0);

    // A stale token falls back to production and leaves a diagnostic trail.
    let stale_ctx = resolver.resolve(&WorldToken::for_world(new_entity_id()));
    assert!(!stale_ctx.test_mode);
    let events = recorder.take();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].reason, FallbackReason::UnknownWorld);
}

#[test]
fn exported_world_promotes_into_a_fresh_store() {
    let source_store = Arc::new(MemoryStore::new());
    let source_blobs = Arc::new(MemoryBlobStore::new());
    let world = active_world(source_store.as_ref(), Environment::SharedTest);
    let populated = populate_scope(source_store.as_ref(), Some(world.world_id));

    let source_seed = SeedManager::new(
        source_store.clone(),
        source_blobs.clone(),
        Environment::SharedTest,
    );
    let dir = tempfile::tempdir().unwrap();
    let snapshot = source_seed
        .export(world.world_id, "promotion", true, dir.path())
        .unwrap();

    // Fresh target: import, then resolve and read through the normal path.
    let target_store = Arc::new(MemoryStore::new());
    let target_blobs = Arc::new(MemoryBlobStore::new());
    let target_seed = SeedManager::new(
        target_store.clone(),
        target_blobs,
        Environment::SharedTest,
    );
    target_seed
        .import(&snapshot, &ImportStrategy::replace_all())
        .unwrap();

    let resolver = WorldContextResolver::new(Environment::SharedTest, target_store.clone());
    let ctx = resolver.resolve(&WorldToken::for_world(world.world_id));
    assert_eq!(ctx.world_id, Some(world.world_id));

    let service = ContentService::new(target_store.clone());
    let doc = service.get_artifact(populated.doc_id, None, &ctx).unwrap();
    assert_eq!(doc.content.as_text(), Some("v2"));

    // The resolution bumped usage on the imported metadata row.
    let meta = target_store.world_get(world.world_id).unwrap().unwrap();
    assert_eq!(meta.usage_count, 1);
}

#[test]
fn site_artifact_publishes_and_gates_by_source() {
    let store = Arc::new(MemoryStore::new());
    let service = ContentService::new(store);
    let resolver_ctx = tessera_context::WorldContext::production();
    let user = new_entity_id();

    let site = service
        .save_artifact(
            SaveArtifact {
                artifact_id: None,
                kind: ArtifactKind::Site,
                content: site_definition_json().to_string(),
                title: "fixture site".to_string(),
                user_id: user,
                author_id: Some(user),
            },
            &resolver_ctx,
        )
        .unwrap();

    let site_grant = new_entity_id();
    service
        .publish_artifact(
            site.artifact_id,
            PublicationSource::Site,
            site_grant,
            None,
            &resolver_ctx,
        )
        .unwrap();
    assert!(service
        .is_artifact_published_as_site(site.artifact_id, &resolver_ctx)
        .unwrap());

    service
        .revoke_artifact_publication(
            site.artifact_id,
            PublicationSource::Site,
            site_grant,
            &resolver_ctx,
        )
        .unwrap();
    assert!(!service
        .is_artifact_published(site.artifact_id, &resolver_ctx)
        .unwrap());
}
