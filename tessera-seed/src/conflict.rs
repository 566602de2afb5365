//! Conflict analysis report types.
//!
//! A conflict is an id collision whose content differs. A collision with
//! byte-identical content is the same entity already present - re-analyzing a
//! snapshot against a target it was just imported into reports zero
//! conflicts. Risk is derived from the counts alone, never stored.

use serde::{Deserialize, Serialize};
use std::fmt;
use tessera_core::{BlobKey, EntityId};

/// Derived severity of applying a snapshot to a target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConflictRisk {
    Low,
    Medium,
    High,
}

impl fmt::Display for ConflictRisk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = match self {
            ConflictRisk::Low => "low",
            ConflictRisk::Medium => "medium",
            ConflictRisk::High => "high",
        };
        write!(f, "{}", value)
    }
}

/// One diverging id collision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityConflict {
    pub id: EntityId,
}

/// What applying a snapshot to the current target would collide with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConflictReport {
    pub world_exists: bool,
    pub user_conflicts: Vec<EntityConflict>,
    pub artifact_conflicts: Vec<EntityConflict>,
    pub chat_conflicts: Vec<EntityConflict>,
    /// Referenced by the snapshot, absent from target storage.
    pub missing_blobs: Vec<BlobKey>,
    /// Present under the world's prefix, unreferenced by the snapshot.
    pub orphaned_blobs: Vec<BlobKey>,
    pub risk: ConflictRisk,
}

impl ConflictReport {
    pub fn total_entity_conflicts(&self) -> usize {
        self.user_conflicts.len() + self.artifact_conflicts.len() + self.chat_conflicts.len()
    }
}

/// Pure function of the counts: `low` iff the world is absent and nothing
/// collides, `high` once entity conflicts exceed 3, `medium` otherwise.
pub fn classify_risk(world_exists: bool, entity_conflicts: usize) -> ConflictRisk {
    if entity_conflicts > 3 {
        ConflictRisk::High
    } else if !world_exists && entity_conflicts == 0 {
        ConflictRisk::Low
    } else {
        ConflictRisk::Medium
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_risk_thresholds() {
        assert_eq!(classify_risk(false, 0), ConflictRisk::Low);
        assert_eq!(classify_risk(true, 0), ConflictRisk::Medium);
        assert_eq!(classify_risk(false, 1), ConflictRisk::Medium);
        assert_eq!(classify_risk(true, 3), ConflictRisk::Medium);
        assert_eq!(classify_risk(false, 4), ConflictRisk::High);
        assert_eq!(classify_risk(true, 100), ConflictRisk::High);
    }

    #[test]
    fn test_risk_display() {
        assert_eq!(ConflictRisk::High.to_string(), "high");
        assert_eq!(ConflictRisk::Low.to_string(), "low");
    }
}

#[cfg(test)]
mod prop_tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn prop_risk_matches_count_rules(world_exists in any::<bool>(), conflicts in 0usize..50) {
            let risk = classify_risk(world_exists, conflicts);
            if conflicts > 3 {
                prop_assert_eq!(risk, ConflictRisk::High);
            } else if !world_exists && conflicts == 0 {
                prop_assert_eq!(risk, ConflictRisk::Low);
            } else {
                prop_assert_eq!(risk, ConflictRisk::Medium);
            }
        }
    }
}
