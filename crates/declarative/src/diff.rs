//! Diff computation for resources

use crate::resource::Resource;
use crate::types::{PropertyChange, ResourceState};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A diff between current and desired state of a resource
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceDiff {
    /// Unique identifier of the resource
    pub resource_id: String,
    /// Type of the resource
    pub resource_type: String,
    /// Human-readable description
    pub description: String,
    /// Current state
    pub current: ResourceState,
    /// Desired state
    pub desired: ResourceState,
}

impl ResourceDiff {
    /// Create a diff from a resource, returning None if no changes needed
    pub fn from_resource(resource: &dyn Resource) -> Result<Option<Self>> {
        let current = resource.current_state()?;
        let desired = resource.desired_state();

        if current == desired {
            return Ok(None);
        }

        Ok(Some(Self {
            resource_id: resource.id(),
            resource_type: resource.resource_type().to_string(),
            description: resource.description(),
            current,
            desired,
        }))
    }

    /// Check if this diff represents an addition
    pub fn is_addition(&self) -> bool {
        matches!(
            (&self.current, &self.desired),
            (ResourceState::Absent, ResourceState::Present { .. })
        )
    }

    /// Check if this diff represents a removal
    pub fn is_removal(&self) -> bool {
        matches!(
            (&self.current, &self.desired),
            (ResourceState::Present { .. } | ResourceState::Drifted { .. }, ResourceState::Absent)
        )
    }

    /// Check if this diff represents a modification
    pub fn is_modification(&self) -> bool {
        matches!(
            (&self.current, &self.desired),
            (ResourceState::Drifted { .. }, ResourceState::Present { .. })
        )
    }

    /// Property-level changes of a modification
    pub fn changes(&self) -> &[PropertyChange] {
        self.current.changes()
    }
}

/// Compute diffs for a list of resources
///
/// Returns only resources that have differences between current and desired state.
/// Resources whose state cannot be read are logged and left out.
pub fn compute_diffs(resources: &[Box<dyn Resource>]) -> Vec<ResourceDiff> {
    resources
        .iter()
        .filter_map(|r| match ResourceDiff::from_resource(r.as_ref()) {
            Ok(diff) => diff,
            Err(e) => {
                log::warn!("Could not determine state of {}: {e}", r.id());
                None
            }
        })
        .collect()
}

/// Diff summary statistics
#[derive(Debug, Clone, Default)]
pub struct DiffSummary {
    /// Number of resources to add
    pub additions: usize,
    /// Number of resources to remove
    pub removals: usize,
    /// Number of resources to modify
    pub modifications: usize,
}

impl DiffSummary {
    /// Create a summary from a list of diffs
    pub fn from_diffs(diffs: &[ResourceDiff]) -> Self {
        let mut summary = Self::default();
        for diff in diffs {
            if diff.is_addition() {
                summary.additions += 1;
            } else if diff.is_removal() {
                summary.removals += 1;
            } else {
                summary.modifications += 1;
            }
        }
        summary
    }

    /// Total number of changes
    pub fn total(&self) -> usize {
        self.additions + self.removals + self.modifications
    }

    /// Check if there are any changes
    pub fn has_changes(&self) -> bool {
        self.total() > 0
    }
}

/// Group diffs by resource type, in type order
pub fn group_by_type(diffs: &[ResourceDiff]) -> BTreeMap<String, Vec<&ResourceDiff>> {
    let mut groups: BTreeMap<String, Vec<&ResourceDiff>> = BTreeMap::new();
    for diff in diffs {
        groups
            .entry(diff.resource_type.clone())
            .or_default()
            .push(diff);
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;

    fn diff(current: ResourceState, desired: ResourceState) -> ResourceDiff {
        ResourceDiff {
            resource_id: "cache1".into(),
            resource_type: "bucket".into(),
            description: "Bucket cache1".into(),
            current,
            desired,
        }
    }

    fn present() -> ResourceState {
        ResourceState::Present { details: None }
    }

    fn drifted() -> ResourceState {
        ResourceState::Drifted {
            changes: vec![PropertyChange::new("flush_enabled", false, true)],
        }
    }

    #[test]
    fn test_diff_kinds() {
        assert!(diff(ResourceState::Absent, present()).is_addition());
        assert!(diff(present(), ResourceState::Absent).is_removal());
        assert!(diff(drifted(), ResourceState::Absent).is_removal());

        let modification = diff(drifted(), present());
        assert!(modification.is_modification());
        assert_eq!(modification.changes().len(), 1);
    }

    #[test]
    fn test_diff_summary() {
        let diffs = vec![
            diff(ResourceState::Absent, present()),
            diff(drifted(), present()),
            diff(present(), ResourceState::Absent),
        ];
        let summary = DiffSummary::from_diffs(&diffs);
        assert_eq!(summary.additions, 1);
        assert_eq!(summary.modifications, 1);
        assert_eq!(summary.removals, 1);
        assert!(summary.has_changes());
    }

    #[test]
    fn test_group_by_type() {
        let diffs = vec![diff(ResourceState::Absent, present()), diff(drifted(), present())];
        let groups = group_by_type(&diffs);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups["bucket"].len(), 2);
    }
}
