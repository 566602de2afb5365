//! World-scoped query filter for multi-tenant isolation.
//!
//! The key insight is that `WorldScope`'s private inner makes an unscoped
//! query UNCOMPILABLE. You cannot call a storage operation without first
//! deciding which world (or production) it belongs to.

use tessera_core::WorldId;

/// The world filter attached to every scoped storage operation.
///
/// `production()` matches only rows with no world tag; `world(id)` matches
/// only that world's rows. There is deliberately no "all worlds" scope:
/// cross-world reads are never permitted implicitly, and the seed pipeline's
/// bulk operations take their target world id explicitly instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WorldScope {
    /// Private inner data - cannot be constructed externally.
    inner: ScopeInner,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum ScopeInner {
    Production,
    World(WorldId),
}

impl WorldScope {
    /// The production tenant: rows with `world_id == None`.
    pub fn production() -> Self {
        Self {
            inner: ScopeInner::Production,
        }
    }

    /// One isolated world's rows.
    pub fn world(id: WorldId) -> Self {
        Self {
            inner: ScopeInner::World(id),
        }
    }

    /// Build from an already-resolved optional world id.
    pub fn from_world_id(world_id: Option<WorldId>) -> Self {
        match world_id {
            Some(id) => Self::world(id),
            None => Self::production(),
        }
    }

    /// The world this scope selects, `None` for production.
    pub fn world_id(&self) -> Option<WorldId> {
        match self.inner {
            ScopeInner::Production => None,
            ScopeInner::World(id) => Some(id),
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self.inner, ScopeInner::Production)
    }

    /// Whether a row with the given tag is visible under this scope.
    pub fn matches(&self, row_world: Option<WorldId>) -> bool {
        self.world_id() == row_world
    }
}

// =============================================================================
// TESTS
// =============================================================================
