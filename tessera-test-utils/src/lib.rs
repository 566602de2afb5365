//! Tessera Test Utilities
//!
//! Centralized test infrastructure for the Tessera workspace:
//! - Fixtures for worlds, users, artifacts and chats
//! - A recording diagnostics sink for asserting fail-open resolution
//! - A mock summarizer for the content service
//! - Proptest generators for kinds and publication entries

// Re-export the engines tests drive
pub use tessera_seed::MemoryBlobStore;
pub use tessera_storage::MemoryStore;

// Re-export core types for convenience
pub use tessera_core::{
    new_entity_id, Artifact, ArtifactId, ArtifactKind, Chat, ChatId, ContentPayload, Environment,
    PublicationInfo, PublicationSource, TesseraConfig, TesseraError, TesseraResult, Timestamp,
    UserAccount, UserId, WorldCategory, WorldId, WorldMeta,
};

use std::sync::Mutex;

use chrono::Utc;
use proptest::prelude::*;
use tessera_api::Summarizer;
use tessera_context::{ContextDiagnostics, FallbackEvent};
use tessera_storage::{NewArtifactVersion, StorageTrait, WorldScope};

// ============================================================================
// DIAGNOSTICS RECORDER
// ============================================================================

/// Captures fallback events so tests can assert that fail-open resolution
/// stays observable.
#[derive(Debug, Default)]
pub struct RecordingDiagnostics {
    events: Mutex<Vec<FallbackEvent>>,
}

impl RecordingDiagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drain and return everything recorded so far.
    pub fn take(&self) -> Vec<FallbackEvent> {
        std::mem::take(&mut self.events.lock().unwrap())
    }

    pub fn len(&self) -> usize {
        self.events.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ContextDiagnostics for RecordingDiagnostics {
    fn world_fallback(&self, event: &FallbackEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}

// ============================================================================
// MOCK SUMMARIZER
// ============================================================================

/// Deterministic summarizer for content-service tests.
#[derive(Debug, Clone)]
pub struct MockSummarizer {
    prefix: String,
}

impl MockSummarizer {
    pub fn new() -> Self {
        Self {
            prefix: "Summary: ".to_string(),
        }
    }

    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }
}

impl Default for MockSummarizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Summarizer for MockSummarizer {
    fn summarize(&self, title: &str, _content: &str) -> TesseraResult<String> {
        Ok(format!("{}{}", self.prefix, title))
    }
}

// ============================================================================
// FIXTURES
// ============================================================================

/// A valid site definition payload for site-kind saves.
pub fn site_definition_json() -> &'static str {
    r#"{
        "title": "Fixture Site",
        "pages": [
            {"slug": "home", "heading": "Home", "blocks": [
                {"block_type": "paragraph", "body": "welcome"}
            ]}
        ]
    }"#
}

/// A first text version for a fresh logical artifact.
pub fn text_version(title: &str, body: &str, user: UserId) -> NewArtifactVersion {
    NewArtifactVersion {
        artifact_id: None,
        kind: ArtifactKind::Text,
        content: ContentPayload::Text(body.to_string()),
        title: title.to_string(),
        user_id: user,
        author_id: Some(user),
    }
}

/// A follow-up text version for an existing logical artifact.
pub fn next_text_version(id: ArtifactId, body: &str, user: UserId) -> NewArtifactVersion {
    NewArtifactVersion {
        artifact_id: Some(id),
        kind: ArtifactKind::Text,
        content: ContentPayload::Text(body.to_string()),
        title: "untitled".to_string(),
        user_id: user,
        author_id: Some(user),
    }
}

/// An image version referencing an opaque blob key.
pub fn image_version(title: &str, key: &str, user: UserId) -> NewArtifactVersion {
    NewArtifactVersion {
        artifact_id: None,
        kind: ArtifactKind::Image,
        content: ContentPayload::Url(key.to_string()),
        title: title.to_string(),
        user_id: user,
        author_id: None,
    }
}

/// An active world registered for the given environment.
pub fn active_world(store: &dyn StorageTrait, environment: Environment) -> WorldMeta {
    let meta = WorldMeta::new("fixture-world", environment, WorldCategory::Test);
    store.world_insert(&meta).expect("world fixture insert");
    meta
}

/// Handles to the rows a populated world contains.
#[derive(Debug, Clone)]
pub struct PopulatedWorld {
    pub world_id: Option<WorldId>,
    pub user: UserAccount,
    pub doc_id: ArtifactId,
    pub chat_id: ChatId,
}

/// Seed a scope with one user, a two-version text artifact and a chat.
pub fn populate_scope(store: &dyn StorageTrait, world_id: Option<WorldId>) -> PopulatedWorld {
    let scope = WorldScope::from_world_id(world_id);
    let user = UserAccount::new("fixture", "Fixture User", world_id);
    store.user_insert(&user, &scope).expect("user fixture insert");

    let doc = store
        .artifact_append(text_version("fixture doc", "v1", user.user_id), &scope)
        .expect("artifact fixture insert");
    store
        .artifact_append(
            next_text_version(doc.artifact_id, "v2", user.user_id),
            &scope,
        )
        .expect("artifact fixture version");

    let chat = Chat::new(user.user_id, "fixture chat", world_id);
    store.chat_insert(&chat, &scope).expect("chat fixture insert");

    PopulatedWorld {
        world_id,
        user,
        doc_id: doc.artifact_id,
        chat_id: chat.chat_id,
    }
}

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

/// Any artifact kind.
pub fn arb_kind() -> impl Strategy<Value = ArtifactKind> {
    prop_oneof![
        Just(ArtifactKind::Text),
        Just(ArtifactKind::Code),
        Just(ArtifactKind::Sheet),
        Just(ArtifactKind::Diagram),
        Just(ArtifactKind::Image),
        Just(ArtifactKind::Site),
    ]
}

/// Any publication source.
pub fn arb_source() -> impl Strategy<Value = PublicationSource> {
    prop_oneof![
        Just(PublicationSource::Direct),
        Just(PublicationSource::Conversation),
        Just(PublicationSource::Site),
    ]
}

/// A publication entry whose expiry is offset from now by up to an hour in
/// either direction, or absent.
pub fn arb_publication() -> impl Strategy<Value = PublicationInfo> {
    (arb_source(), prop::option::of(-3600i64..3600)).prop_map(|(source, offset)| {
        let now = Utc::now();
        PublicationInfo {
            source,
            source_id: new_entity_id(),
            published_at: now,
            expires_at: offset.map(|secs| now + chrono::Duration::seconds(secs)),
        }
    })
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tessera_storage::VersionSelector;

    #[test]
    fn test_populate_scope_builds_consistent_rows() {
        let store = MemoryStore::new();
        let world = new_entity_id();
        let populated = populate_scope(&store, Some(world));
        let scope = WorldScope::world(world);

        let versions = store.artifact_versions(populated.doc_id, &scope).unwrap();
        assert_eq!(versions.len(), 2);
        assert_eq!(
            store
                .artifact_version(populated.doc_id, VersionSelector::Index(2), &scope)
                .unwrap()
                .content
                .as_text(),
            Some("v2")
        );
        assert!(store.chat_get(populated.chat_id, &scope).is_ok());
        assert!(store.user_get(populated.user.user_id, &scope).is_ok());
    }

    #[test]
    fn test_site_fixture_parses() {
        let payload = ContentPayload::for_kind(ArtifactKind::Site, site_definition_json()).unwrap();
        assert!(payload.as_site().is_some());
    }

    #[test]
    fn test_mock_summarizer_is_deterministic() {
        let summarizer = MockSummarizer::with_prefix("TL;DR: ");
        assert_eq!(
            summarizer.summarize("roadmap", "ignored").unwrap(),
            "TL;DR: roadmap"
        );
    }
}
