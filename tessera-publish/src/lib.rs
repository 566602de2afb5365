//! Tessera Publish - Publication State
//!
//! Computes and mutates the publication state attached to artifacts and
//! chats. This crate owns no storage: callers hand it entities, it evaluates
//! or rewrites their embedded publication lists, and the storage layer
//! persists the result.
//!
//! Every evaluation takes an explicit `now`. All expiry comparisons within
//! one call use that single captured instant, so a boundary entry cannot
//! flip state mid-check.

use chrono::Utc;
use tessera_core::{
    Artifact, Chat, EntityId, PublicationInfo, PublicationSource, Timestamp,
};

/// Whether one entry grants visibility at `now`.
///
/// `expires_at == None` never expires; otherwise strict `>`: an entry whose
/// deadline equals `now` is already expired.
fn entry_active(entry: &PublicationInfo, now: Timestamp) -> bool {
    match entry.expires_at {
        None => true,
        Some(expires_at) => expires_at > now,
    }
}

/// An artifact is published iff at least one entry is active at `now`.
pub fn is_published(artifact: &Artifact, now: Timestamp) -> bool {
    artifact.publications.iter().any(|e| entry_active(e, now))
}

/// Published specifically as a standalone site. Same expiry rule, filtered
/// to the `as-site` source; only meaningful for site-kind artifacts.
pub fn is_published_as_site(artifact: &Artifact, now: Timestamp) -> bool {
    artifact
        .publications
        .iter()
        .any(|e| e.source == PublicationSource::Site && entry_active(e, now))
}

/// A chat is published iff its single deadline is set and in the future.
pub fn is_chat_published(chat: &Chat, now: Timestamp) -> bool {
    match chat.published_until {
        None => false,
        Some(until) => until > now,
    }
}

/// The entries currently granting visibility. For UI/audit, not for gating.
pub fn active_publications(artifact: &Artifact, now: Timestamp) -> Vec<&PublicationInfo> {
    artifact
        .publications
        .iter()
        .filter(|e| entry_active(e, now))
        .collect()
}

/// Append one publication entry.
///
/// No deduplication by source: simultaneous publications from different
/// sources (direct plus two different conversations, say) are legal and
/// independently trackable, each expiring on its own schedule.
pub fn add_publication(
    artifact: &mut Artifact,
    source: PublicationSource,
    source_id: EntityId,
    expires_at: Option<Timestamp>,
) {
    artifact.publications.push(PublicationInfo {
        source,
        source_id,
        published_at: Utc::now(),
        expires_at,
    });
}

/// Remove every entry matching `(source, source_id)`. Entries are deleted
/// rather than marked expired; returns how many were removed.
pub fn revoke_publication(
    artifact: &mut Artifact,
    source: PublicationSource,
    source_id: EntityId,
) -> usize {
    let before = artifact.publications.len();
    artifact
        .publications
        .retain(|e| !(e.source == source && e.source_id == source_id));
    before - artifact.publications.len()
}

// =============================================================================
// TESTS
// =============================================================================


#[cfg(test)]
mod prop_tests {
    use super::*;
    use chrono::Duration;
    use proptest::prelude::*;
    use tessera_core::{new_entity_id, ArtifactKind, ContentPayload};

    fn artifact_with_offsets(offsets: &[Option<i64>]) -> (Artifact, Timestamp) {
        let now = Utc::now();
        let user = new_entity_id();
        let mut a = Artifact {
            artifact_id: new_entity_id(),
            created_at: now,
            seq: 1,
            kind: ArtifactKind::Text,
            content: ContentPayload::Text("x".to_string()),
            title: "t".to_string(),
            user_id: user,
            author_id: None,
            summary: None,
            deleted_at: None,
            publications: Vec::new(),
            world_id: None,
        };
        for offset in offsets {
            a.publications.push(PublicationInfo {
                source: PublicationSource::Direct,
                source_id: a.artifact_id,
                published_at: now,
                expires_at: offset.map(|secs| now + Duration::seconds(secs)),
            });
        }
        (a, now)
    }

    proptest! {
        #[test]
        fn prop_published_iff_some_entry_active(
            offsets in prop::collection::vec(prop::option::of(-3600i64..3600), 0..6)
        ) {
            let (a, now) = artifact_with_offsets(&offsets);
            let expected = offsets.iter().any(|o| match o {
                None => true,
                Some(secs) => *secs > 0,
            });
            prop_assert_eq!(is_published(&a, now), expected);
            prop_assert_eq!(
                active_publications(&a, now).len(),
                offsets.iter().filter(|o| match o {
                    None => true,
                    Some(secs) => *secs > 0,
                }).count()
            );
        }
    }
}
