//! Tessera API - Content Service
//!
//! The operation surface exposed to collaborators (AI tools, UI layers).
//! Every call takes a resolved [`WorldContext`] and threads its scope into
//! storage; nothing here reads ambient tenant state. Rendering, chat UI and
//! authentication live outside; this facade only stores, versions, lists and
//! publishes content.

use std::sync::Arc;

use chrono::Utc;
use tessera_context::WorldContext;
use tessera_core::{
    Artifact, ArtifactId, ArtifactKind, Chat, ChatId, ContentPayload, EntityId,
    PublicationSource, TesseraConfig, TesseraResult, Timestamp, UserId,
};
use tessera_storage::{
    ArtifactQuery, NewArtifactVersion, PagedArtifacts, StorageTrait, VersionSelector,
};

/// Derived-summary generation hook.
///
/// Invoked after a save on a detached thread: at most once, best-effort,
/// non-blocking. A summarizer failure is logged and never rolls back the
/// save that triggered it.
pub trait Summarizer: Send + Sync {
    fn summarize(&self, title: &str, content: &str) -> TesseraResult<String>;
}

/// Input for one save call.
#[derive(Debug, Clone, PartialEq)]
pub struct SaveArtifact {
    /// Omitted = create a fresh logical artifact.
    pub artifact_id: Option<ArtifactId>,
    pub kind: ArtifactKind,
    /// Raw content, routed into the slot `kind` requires.
    pub content: String,
    pub title: String,
    pub user_id: UserId,
    pub author_id: Option<UserId>,
}

/// The content API surface.
pub struct ContentService {
    storage: Arc<dyn StorageTrait>,
    summarizer: Option<Arc<dyn Summarizer>>,
    config: Option<TesseraConfig>,
}

impl ContentService {
    pub fn new(storage: Arc<dyn StorageTrait>) -> Self {
        Self {
            storage,
            summarizer: None,
            config: None,
        }
    }

    pub fn with_summarizer(mut self, summarizer: Arc<dyn Summarizer>) -> Self {
        self.summarizer = Some(summarizer);
        self
    }

    /// Attach the configuration that bounds caller-requested page sizes.
    pub fn with_config(mut self, config: TesseraConfig) -> Self {
        self.config = Some(config);
        self
    }

    // === Artifacts ===

    /// Latest version, or one specific version when a selector is given.
    pub fn get_artifact(
        &self,
        id: ArtifactId,
        version: Option<VersionSelector>,
        ctx: &WorldContext,
    ) -> TesseraResult<Artifact> {
        match version {
            None => self.storage.artifact_latest(id, &ctx.scope()),
            Some(selector) => self.storage.artifact_version(id, selector, &ctx.scope()),
        }
    }

    /// Save one version. Content that does not fit the kind's slot fails
    /// validation before anything is written.
    pub fn save_artifact(&self, save: SaveArtifact, ctx: &WorldContext) -> TesseraResult<Artifact> {
        let content = ContentPayload::for_kind(save.kind, &save.content)?;
        let saved = self.storage.artifact_append(
            NewArtifactVersion {
                artifact_id: save.artifact_id,
                kind: save.kind,
                content,
                title: save.title,
                user_id: save.user_id,
                author_id: save.author_id,
            },
            &ctx.scope(),
        )?;
        self.spawn_summary(&saved, ctx);
        Ok(saved)
    }

    pub fn list_artifacts(
        &self,
        query: &ArtifactQuery,
        ctx: &WorldContext,
    ) -> TesseraResult<PagedArtifacts> {
        let mut query = query.clone();
        if let Some(config) = &self.config {
            query.page_size = config.clamp_page_size(Some(query.page_size));
        }
        self.storage.artifact_page(&query, &ctx.scope())
    }

    pub fn list_versions(&self, id: ArtifactId, ctx: &WorldContext) -> TesseraResult<Vec<Artifact>> {
        self.storage.artifact_versions(id, &ctx.scope())
    }

    pub fn delete_artifact(
        &self,
        id: ArtifactId,
        user_id: UserId,
        ctx: &WorldContext,
    ) -> TesseraResult<()> {
        self.storage.artifact_soft_delete(id, user_id, &ctx.scope())
    }

    pub fn restore_artifact(
        &self,
        id: ArtifactId,
        user_id: UserId,
        ctx: &WorldContext,
    ) -> TesseraResult<()> {
        self.storage.artifact_restore(id, user_id, &ctx.scope())
    }

    // === Publication ===

    /// Grant visibility from one source. Existing grants from other sources
    /// are untouched; each expires on its own schedule.
    pub fn publish_artifact(
        &self,
        id: ArtifactId,
        source: PublicationSource,
        source_id: EntityId,
        expires_at: Option<Timestamp>,
        ctx: &WorldContext,
    ) -> TesseraResult<Artifact> {
        let mut artifact = self.storage.artifact_latest(id, &ctx.scope())?;
        tessera_publish::add_publication(&mut artifact, source, source_id, expires_at);
        self.storage
            .artifact_set_publications(id, artifact.publications, &ctx.scope())
    }

    pub fn revoke_artifact_publication(
        &self,
        id: ArtifactId,
        source: PublicationSource,
        source_id: EntityId,
        ctx: &WorldContext,
    ) -> TesseraResult<Artifact> {
        let mut artifact = self.storage.artifact_latest(id, &ctx.scope())?;
        tessera_publish::revoke_publication(&mut artifact, source, source_id);
        self.storage
            .artifact_set_publications(id, artifact.publications, &ctx.scope())
    }

    pub fn is_artifact_published(&self, id: ArtifactId, ctx: &WorldContext) -> TesseraResult<bool> {
        let artifact = self.storage.artifact_latest(id, &ctx.scope())?;
        Ok(tessera_publish::is_published(&artifact, Utc::now()))
    }

    pub fn is_artifact_published_as_site(
        &self,
        id: ArtifactId,
        ctx: &WorldContext,
    ) -> TesseraResult<bool> {
        let artifact = self.storage.artifact_latest(id, &ctx.scope())?;
        Ok(tessera_publish::is_published_as_site(&artifact, Utc::now()))
    }

    // === Chats ===

    pub fn publish_chat(
        &self,
        id: ChatId,
        until: Option<Timestamp>,
        ctx: &WorldContext,
    ) -> TesseraResult<Chat> {
        self.storage.chat_set_published_until(id, until, &ctx.scope())
    }

    pub fn is_chat_published(&self, id: ChatId, ctx: &WorldContext) -> TesseraResult<bool> {
        let chat = self.storage.chat_get(id, &ctx.scope())?;
        Ok(tessera_publish::is_chat_published(&chat, Utc::now()))
    }

    // === Internals ===

    /// Fire summary generation for one saved version and return immediately.
    /// Only text-slot content is summarized.
    fn spawn_summary(&self, saved: &Artifact, ctx: &WorldContext) {
        let Some(summarizer) = &self.summarizer else {
            return;
        };
        let Some(text) = saved.content.as_text() else {
            return;
        };

        let summarizer = Arc::clone(summarizer);
        let storage = Arc::clone(&self.storage);
        let scope = ctx.scope();
        let id = saved.artifact_id;
        let seq = saved.seq;
        let title = saved.title.clone();
        let text = text.to_string();

        std::thread::spawn(move || match summarizer.summarize(&title, &text) {
            Ok(summary) => {
                if let Err(e) = storage.artifact_set_summary(id, seq, summary, &scope) {
                    tracing::warn!(artifact_id = %id, seq, error = %e, "summary write failed");
                }
            }
            Err(e) => {
                tracing::warn!(artifact_id = %id, seq, error = %e, "summary generation failed");
            }
        });
    }
}

// =============================================================================
// TESTS
// =============================================================================
