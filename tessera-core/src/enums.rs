//! Enum types for Tessera entities

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

fn normalize_token(input: &str) -> String {
    input
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '_' && *c != '-')
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

// ============================================================================
// CORE ENUMS
// ============================================================================

/// Entity type discriminator for polymorphic references and error reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityType {
    Artifact,
    Chat,
    User,
    World,
    Blob,
}

/// Artifact kind. Determines which content slot a version row populates:
/// `Text`, `Code`, `Sheet` and `Diagram` carry plain text, `Image` carries a
/// URL reference, `Site` carries a structured site definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ArtifactKind {
    /// Prose documents
    Text,
    /// Source code
    Code,
    /// Tabular data, serialized as CSV-style text
    Sheet,
    /// Diagram source (rendered by collaborators, stored as text)
    Diagram,
    /// Binary image, referenced by URL
    Image,
    /// Structured multi-page site definition
    Site,
}

/// What caused a publication entry to exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PublicationSource {
    /// Published directly by its owner
    #[serde(rename = "direct")]
    Direct,
    /// Published as part of a shared conversation
    #[serde(rename = "via-conversation")]
    Conversation,
    /// Published as a standalone site
    #[serde(rename = "as-site")]
    Site,
}

/// Deployment tier. Passed explicitly into the context resolver; never read
/// from ambient process state inside deep logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Environment {
    Production,
    LocalDev,
    SharedTest,
}

/// What a world is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WorldCategory {
    Test,
    Demo,
    Promotion,
    Scratch,
}

// ============================================================================
// DISPLAY / FROMSTR
// ============================================================================

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = match self {
            EntityType::Artifact => "Artifact",
            EntityType::Chat => "Chat",
            EntityType::User => "User",
            EntityType::World => "World",
            EntityType::Blob => "Blob",
        };
        write!(f, "{}", value)
    }
}

impl FromStr for EntityType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize_token(s).as_str() {
            "artifact" => Ok(EntityType::Artifact),
            "chat" | "conversation" => Ok(EntityType::Chat),
            "user" => Ok(EntityType::User),
            "world" => Ok(EntityType::World),
            "blob" => Ok(EntityType::Blob),
            _ => Err(format!("Invalid EntityType: {}", s)),
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = match self {
            ArtifactKind::Text => "text",
            ArtifactKind::Code => "code",
            ArtifactKind::Sheet => "sheet",
            ArtifactKind::Diagram => "diagram",
            ArtifactKind::Image => "image",
            ArtifactKind::Site => "site",
        };
        write!(f, "{}", value)
    }
}

impl FromStr for ArtifactKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize_token(s).as_str() {
            "text" => Ok(ArtifactKind::Text),
            "code" => Ok(ArtifactKind::Code),
            "sheet" => Ok(ArtifactKind::Sheet),
            "diagram" => Ok(ArtifactKind::Diagram),
            "image" => Ok(ArtifactKind::Image),
            "site" => Ok(ArtifactKind::Site),
            _ => Err(format!("Invalid ArtifactKind: {}", s)),
        }
    }
}

impl fmt::Display for PublicationSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = match self {
            PublicationSource::Direct => "direct",
            PublicationSource::Conversation => "via-conversation",
            PublicationSource::Site => "as-site",
        };
        write!(f, "{}", value)
    }
}

impl FromStr for PublicationSource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize_token(s).as_str() {
            "direct" => Ok(PublicationSource::Direct),
            "viaconversation" | "conversation" => Ok(PublicationSource::Conversation),
            "assite" | "site" => Ok(PublicationSource::Site),
            _ => Err(format!("Invalid PublicationSource: {}", s)),
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = match self {
            Environment::Production => "production",
            Environment::LocalDev => "local-dev",
            Environment::SharedTest => "shared-test",
        };
        write!(f, "{}", value)
    }
}

impl FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize_token(s).as_str() {
            "production" | "prod" => Ok(Environment::Production),
            "localdev" | "local" | "dev" => Ok(Environment::LocalDev),
            "sharedtest" | "test" | "staging" => Ok(Environment::SharedTest),
            _ => Err(format!("Invalid Environment: {}", s)),
        }
    }
}

impl fmt::Display for WorldCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = match self {
            WorldCategory::Test => "test",
            WorldCategory::Demo => "demo",
            WorldCategory::Promotion => "promotion",
            WorldCategory::Scratch => "scratch",
        };
        write!(f, "{}", value)
    }
}

impl FromStr for WorldCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize_token(s).as_str() {
            "test" => Ok(WorldCategory::Test),
            "demo" => Ok(WorldCategory::Demo),
            "promotion" | "promo" => Ok(WorldCategory::Promotion),
            "scratch" => Ok(WorldCategory::Scratch),
            _ => Err(format!("Invalid WorldCategory: {}", s)),
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
