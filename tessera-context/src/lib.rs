//! Tessera Context - World Resolution
//!
//! Determines, for any given operation, which isolated world (or production)
//! the operation belongs to. The resolver owns no persistent rows; it derives
//! one in-memory [`WorldContext`] per operation and threads it into every
//! storage call.
//!
//! Policy: production never infers a world from ambient state, and a
//! missing/inactive world never blocks an operation - resolution fails open
//! to production and emits a structured diagnostic so silent cross-world
//! leakage stays observable.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tessera_core::{ContextError, Environment, WorldId, WorldMeta};
use tessera_storage::{StorageTrait, WorldScope};

// ============================================================================
// TOKEN
// ============================================================================

/// The caller-supplied world identifier, the equivalent of a signed cookie.
/// An absent token is equivalent to `world_id: None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct WorldToken {
    pub world_id: Option<WorldId>,
}

impl WorldToken {
    /// No token supplied.
    pub fn absent() -> Self {
        Self::default()
    }

    pub fn for_world(world_id: WorldId) -> Self {
        Self {
            world_id: Some(world_id),
        }
    }

    /// Parse the serialized token payload. A token we cannot read at all is
    /// the one context failure that surfaces to the caller; an unknown world
    /// inside a well-formed token is handled by fail-open resolution instead.
    pub fn parse(raw: &str) -> Result<Self, ContextError> {
        serde_json::from_str(raw).map_err(|e| ContextError::MalformedToken {
            reason: e.to_string(),
        })
    }
}

// ============================================================================
// RESOLVED CONTEXT
// ============================================================================

/// The resolution result threaded into every scoped storage operation.
#[derive(Debug, Clone, PartialEq)]
pub struct WorldContext {
    /// `None` = production tenant.
    pub world_id: Option<WorldId>,
    /// True iff the operation runs inside an isolated world.
    pub test_mode: bool,
    /// The resolved world's metadata, when one was found.
    pub meta: Option<WorldMeta>,
}

impl WorldContext {
    pub fn production() -> Self {
        Self {
            world_id: None,
            test_mode: false,
            meta: None,
        }
    }

    /// The storage scope this context selects.
    pub fn scope(&self) -> WorldScope {
        WorldScope::from_world_id(self.world_id)
    }
}

// ============================================================================
// DIAGNOSTICS
// ============================================================================

/// Why a requested world fell back to production.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackReason {
    UnknownWorld,
    Inactive,
    WrongEnvironment,
    StoreUnavailable,
}

/// Structured record of one fail-open resolution.
#[derive(Debug, Clone, PartialEq)]
pub struct FallbackEvent {
    pub requested: WorldId,
    pub environment: Environment,
    pub reason: FallbackReason,
}

/// Sink for fallback diagnostics. The default logs; tests install a
/// recording sink so fail-open stays observable.
pub trait ContextDiagnostics: Send + Sync {
    fn world_fallback(&self, event: &FallbackEvent);
}

/// Default sink: structured warning via `tracing`.
#[derive(Debug, Default)]
pub struct TracingDiagnostics;

impl ContextDiagnostics for TracingDiagnostics {
    fn world_fallback(&self, event: &FallbackEvent) {
        tracing::warn!(
            world_id = %event.requested,
            environment = %event.environment,
            reason = ?event.reason,
            "world resolution fell back to production"
        );
    }
}

// ============================================================================
// RESOLVER
// ============================================================================

/// Resolves one world context per operation.
///
/// The deployment environment is injected at construction; deep logic never
/// reads ambient process configuration.
pub struct WorldContextResolver {
    environment: Environment,
    storage: Arc<dyn StorageTrait>,
    diagnostics: Arc<dyn ContextDiagnostics>,
}

impl WorldContextResolver {
    pub fn new(environment: Environment, storage: Arc<dyn StorageTrait>) -> Self {
        Self {
            environment,
            storage,
            diagnostics: Arc::new(TracingDiagnostics),
        }
    }

    pub fn with_diagnostics(mut self, diagnostics: Arc<dyn ContextDiagnostics>) -> Self {
        self.diagnostics = diagnostics;
        self
    }

    pub fn environment(&self) -> Environment {
        self.environment
    }

    /// Resolve from the caller-supplied token.
    ///
    /// In production the token is ignored outright: production never infers a
    /// world from ambient state. Elsewhere, a token naming a usable world
    /// selects it; anything else fails open to production.
    pub fn resolve(&self, token: &WorldToken) -> WorldContext {
        if self.environment == Environment::Production {
            return WorldContext::production();
        }
        match token.world_id {
            Some(world_id) => self.lookup(world_id),
            None => WorldContext::production(),
        }
    }

    /// Resolve an operator-supplied explicit world id. Honored in every
    /// environment, under the same lookup and fail-open rules.
    pub fn resolve_explicit(&self, world_id: WorldId) -> WorldContext {
        self.lookup(world_id)
    }

    fn lookup(&self, world_id: WorldId) -> WorldContext {
        let meta = match self.storage.world_get(world_id) {
            Ok(meta) => meta,
            Err(e) => {
                tracing::warn!(world_id = %world_id, error = %e, "world lookup failed");
                return self.fall_back(world_id, FallbackReason::StoreUnavailable);
            }
        };

        let Some(meta) = meta else {
            return self.fall_back(world_id, FallbackReason::UnknownWorld);
        };
        if !meta.is_active {
            return self.fall_back(world_id, FallbackReason::Inactive);
        }
        if meta.environment != self.environment {
            return self.fall_back(world_id, FallbackReason::WrongEnvironment);
        }

        // Usage accounting is best-effort; a failed bump never blocks the
        // operation it was triggered from.
        if let Err(e) = self.storage.world_touch(world_id) {
            tracing::warn!(world_id = %world_id, error = %e, "usage bump failed");
        }

        WorldContext {
            world_id: Some(world_id),
            test_mode: true,
            meta: Some(meta),
        }
    }

    fn fall_back(&self, requested: WorldId, reason: FallbackReason) -> WorldContext {
        self.diagnostics.world_fallback(&FallbackEvent {
            requested,
            environment: self.environment,
            reason,
        });
        WorldContext::production()
    }
}

// =============================================================================
// TESTS
// =============================================================================
