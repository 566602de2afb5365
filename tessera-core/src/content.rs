//! Typed content payloads for artifact versions
//!
//! A version row carries exactly one content slot, selected by its kind.
//! Modeling the slots as a tagged union makes "exactly one slot populated"
//! a compile-time guarantee instead of a runtime check.

use crate::enums::ArtifactKind;
use crate::error::ValidationError;
use serde::{Deserialize, Serialize};

/// Content slot for one artifact version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "slot", content = "data", rename_all = "snake_case")]
pub enum ContentPayload {
    /// Plain text: prose, source code, tabular text, diagram source.
    Text(String),
    /// Opaque URL reference to a binary object. The engine never stores
    /// the binary payload itself.
    Url(String),
    /// Structured site definition.
    Site(SiteDefinition),
}

/// Structured definition of a published site.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SiteDefinition {
    pub title: String,
    pub pages: Vec<SitePage>,
}

/// One page of a site definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SitePage {
    pub slug: String,
    pub heading: String,
    #[serde(default)]
    pub blocks: Vec<SiteBlock>,
}

/// One content block on a site page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SiteBlock {
    pub block_type: String,
    pub body: String,
}

impl ContentPayload {
    /// Route raw content into the slot required by `kind`.
    ///
    /// A `Site` kind must parse as a `SiteDefinition` JSON document; anything
    /// else fails the save with a validation error rather than silently
    /// nulling the slot. An `Image` kind requires a non-empty URL reference.
    pub fn for_kind(kind: ArtifactKind, raw: &str) -> Result<Self, ValidationError> {
        match kind {
            ArtifactKind::Text
            | ArtifactKind::Code
            | ArtifactKind::Sheet
            | ArtifactKind::Diagram => Ok(ContentPayload::Text(raw.to_string())),
            ArtifactKind::Image => {
                let url = raw.trim();
                if url.is_empty() {
                    return Err(ValidationError::InvalidContent {
                        kind,
                        reason: "image content must be a non-empty URL reference".to_string(),
                    });
                }
                Ok(ContentPayload::Url(url.to_string()))
            }
            ArtifactKind::Site => {
                let site: SiteDefinition =
                    serde_json::from_str(raw).map_err(|e| ValidationError::InvalidContent {
                        kind,
                        reason: format!("site definition is not valid JSON: {}", e),
                    })?;
                Ok(ContentPayload::Site(site))
            }
        }
    }

    /// Whether this payload lives in the slot `kind` requires.
    pub fn matches_kind(&self, kind: ArtifactKind) -> bool {
        matches!(
            (self, kind),
            (
                ContentPayload::Text(_),
                ArtifactKind::Text | ArtifactKind::Code | ArtifactKind::Sheet | ArtifactKind::Diagram
            ) | (ContentPayload::Url(_), ArtifactKind::Image)
                | (ContentPayload::Site(_), ArtifactKind::Site)
        )
    }

    /// Text slot accessor.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            ContentPayload::Text(t) => Some(t),
            _ => None,
        }
    }

    /// URL slot accessor.
    pub fn as_url(&self) -> Option<&str> {
        match self {
            ContentPayload::Url(u) => Some(u),
            _ => None,
        }
    }

    /// Site slot accessor.
    pub fn as_site(&self) -> Option<&SiteDefinition> {
        match self {
            ContentPayload::Site(s) => Some(s),
            _ => None,
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
