//! Core types for declarative resource management

use serde::{Deserialize, Serialize};
use std::fmt;

/// One property whose current value differs from the desired one
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyChange {
    /// Property name as the operator writes it (e.g. "ram_quota_mb")
    pub property: String,
    /// Current value, rendered for display
    pub current: String,
    /// Desired value, rendered for display
    pub desired: String,
}

impl PropertyChange {
    pub fn new(
        property: impl Into<String>,
        current: impl fmt::Display,
        desired: impl fmt::Display,
    ) -> Self {
        Self {
            property: property.into(),
            current: current.to_string(),
            desired: desired.to_string(),
        }
    }
}

impl fmt::Display for PropertyChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} → {}", self.property, self.current, self.desired)
    }
}

/// Current or desired state of a resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResourceState {
    /// Resource exists/is configured
    Present { details: Option<String> },
    /// Resource does not exist/is not configured
    Absent,
    /// Resource exists but some properties differ from desired
    Drifted { changes: Vec<PropertyChange> },
    /// State cannot be determined
    Unknown,
}

impl ResourceState {
    /// Check if state represents presence
    pub fn is_present(&self) -> bool {
        matches!(self, Self::Present { .. })
    }

    /// Check if state represents absence
    pub fn is_absent(&self) -> bool {
        matches!(self, Self::Absent)
    }

    /// Property changes, empty unless drifted
    pub fn changes(&self) -> &[PropertyChange] {
        match self {
            Self::Drifted { changes } => changes,
            _ => &[],
        }
    }
}

/// Result of applying a resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ApplyResult {
    /// No changes needed
    NoChange,
    /// Resource was created
    Created,
    /// Resource was modified in place
    Modified,
    /// Resource was destroyed and created again
    Recreated,
    /// Resource was removed
    Removed,
    /// Apply failed
    Failed { error: String },
    /// Apply was skipped
    Skipped { reason: String },
}

impl ApplyResult {
    /// Check if the result represents success (no failure)
    pub fn is_success(&self) -> bool {
        !matches!(self, Self::Failed { .. })
    }

    /// Check if the result represents a change
    pub fn is_change(&self) -> bool {
        matches!(
            self,
            Self::Created | Self::Modified | Self::Recreated | Self::Removed
        )
    }

    /// Short status symbol for terminal output
    pub fn symbol(&self) -> &'static str {
        match self {
            Self::NoChange => "○",
            Self::Created | Self::Modified | Self::Recreated | Self::Removed => "✓",
            Self::Failed { .. } => "✗",
            Self::Skipped { .. } => "⊘",
        }
    }
}

/// Summary of execution results
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExecuteSummary {
    pub created: usize,
    pub modified: usize,
    pub recreated: usize,
    pub removed: usize,
    pub skipped: usize,
    pub failed: usize,
    pub no_change: usize,
    /// Error messages of failed resources, keyed by resource id
    pub failures: Vec<(String, String)>,
}

impl ExecuteSummary {
    /// Total number of actual changes made
    pub fn total_changes(&self) -> usize {
        self.created + self.modified + self.recreated + self.removed
    }

    /// Check if execution was fully successful (no failures)
    pub fn is_success(&self) -> bool {
        self.failed == 0
    }

    /// Total number of resources processed
    pub fn total(&self) -> usize {
        self.total_changes() + self.skipped + self.failed + self.no_change
    }

    /// Merge another summary into this one
    pub fn merge(&mut self, other: &ExecuteSummary) {
        self.created += other.created;
        self.modified += other.modified;
        self.recreated += other.recreated;
        self.removed += other.removed;
        self.skipped += other.skipped;
        self.failed += other.failed;
        self.no_change += other.no_change;
        self.failures.extend(other.failures.iter().cloned());
    }

    /// Add a result to the summary
    pub fn add_result(&mut self, id: &str, result: &ApplyResult) {
        match result {
            ApplyResult::NoChange => self.no_change += 1,
            ApplyResult::Created => self.created += 1,
            ApplyResult::Modified => self.modified += 1,
            ApplyResult::Recreated => self.recreated += 1,
            ApplyResult::Removed => self.removed += 1,
            ApplyResult::Failed { error } => {
                self.failed += 1;
                self.failures.push((id.to_string(), error.clone()));
            }
            ApplyResult::Skipped { .. } => self.skipped += 1,
        }
    }
}

/// Options for execution
#[derive(Debug, Clone)]
pub struct ExecuteOptions {
    /// Don't make changes, just show what would happen
    pub dry_run: bool,
    /// Number of parallel jobs
    pub jobs: usize,
    /// Verbose output
    pub verbose: bool,
}

impl Default for ExecuteOptions {
    fn default() -> Self {
        Self {
            dry_run: false,
            jobs: 1,
            verbose: false,
        }
    }
}
