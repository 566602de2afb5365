//! Configuration types

use crate::enums::Environment;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Master configuration struct.
/// ALL values are required - no defaults anywhere. The composition root
/// decides them once; deep logic never reads ambient configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TesseraConfig {
    /// Deployment tier, passed explicitly into the context resolver.
    pub environment: Environment,

    /// Page size used when a listing request does not specify one.
    pub default_page_size: usize,
    /// Hard ceiling on requested page sizes.
    pub max_page_size: usize,

    /// Directory under which seed snapshots are written.
    pub seed_root: PathBuf,
}

impl TesseraConfig {
    /// Build the standard configuration for an environment.
    ///
    /// This centralizes the "sane defaults" that callers can reuse without
    /// hardcoding policy at the call site.
    pub fn for_environment(environment: Environment) -> Self {
        Self {
            environment,
            default_page_size: 20,
            max_page_size: 100,
            seed_root: PathBuf::from("seeds"),
        }
    }

    /// Clamp a caller-requested page size to the configured bounds.
    pub fn clamp_page_size(&self, requested: Option<usize>) -> usize {
        match requested {
            Some(0) | None => self.default_page_size,
            Some(n) => n.min(self.max_page_size),
        }
    }
}
