//! Execution planner - builds resource execution plans

use crate::resource::{BoxedResource, Resource};

/// An ordered set of resources to converge
#[derive(Default)]
pub struct ExecutionPlan {
    /// Resources, applied in insertion order when running sequentially
    pub resources: Vec<BoxedResource>,
}

impl ExecutionPlan {
    /// Create a new empty plan
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a resource to the plan
    pub fn push(&mut self, resource: BoxedResource) {
        self.resources.push(resource);
    }

    /// Filter plan to only include resources matching a predicate
    pub fn filter<F>(self, predicate: F) -> Self
    where
        F: Fn(&dyn Resource) -> bool,
    {
        Self {
            resources: self
                .resources
                .into_iter()
                .filter(|r| predicate(r.as_ref()))
                .collect(),
        }
    }

    /// Filter plan to only include resources matching a target pattern
    ///
    /// Target format: "type", "type.name" or a bare name. Names may contain
    /// dots, so only the first dot separates the type.
    pub fn filter_by_target(self, target: Option<&str>) -> Self {
        match target {
            None => self,
            Some(t) => {
                let types: Vec<&'static str> =
                    self.resources.iter().map(|r| r.resource_type()).collect();
                let (resource_type, name) = parse_target(t, &types);
                self.filter(|r| matches_filter(r, resource_type.as_deref(), name.as_deref()))
            }
        }
    }

    /// Total number of resources in the plan
    pub fn total_resources(&self) -> usize {
        self.resources.len()
    }

    /// Check if plan is empty
    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }
}

/// Parse a target string into (type, name)
///
/// A leading segment only counts as a type when some resource has that type,
/// otherwise the whole target is taken as a name.
fn parse_target(target: &str, known_types: &[&str]) -> (Option<String>, Option<String>) {
    match target.split_once('.') {
        Some((ty, name)) if known_types.contains(&ty) => {
            (Some(ty.to_string()), Some(name.to_string()))
        }
        None if known_types.contains(&target) => (Some(target.to_string()), None),
        _ => (None, Some(target.to_string())),
    }
}

/// Check if a resource matches the filter criteria
fn matches_filter(
    resource: &dyn Resource,
    resource_type: Option<&str>,
    name: Option<&str>,
) -> bool {
    if let Some(rt) = resource_type
        && resource.resource_type() != rt
    {
        return false;
    }

    if let Some(n) = name
        && resource.id() != n
    {
        return false;
    }

    true
}
