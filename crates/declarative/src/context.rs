//! Apply context and callback traits
//!
//! These traits keep the declarative crate free of any particular UI:
//! callers plug in their own progress display and confirmation prompt.

use crate::types::ApplyResult;
use anyhow::Result;

/// Progress callback for execution operations
///
/// Must be `Send + Sync`: with `jobs > 1` it is called from worker threads.
pub trait ProgressCallback: Send + Sync {
    /// Called when starting to apply a batch of resources
    fn on_batch_start(&self, count: usize);

    /// Called when starting to apply a single resource
    fn on_resource_start(&self, id: &str, description: &str);

    /// Called when a resource application completes
    fn on_resource_complete(&self, id: &str, result: &ApplyResult);

    /// Called when a batch completes
    fn on_batch_complete(&self);
}

/// Confirmation callback for user interaction
pub trait ConfirmCallback: Send {
    /// Ask the user to confirm an action
    ///
    /// Returns `true` if the user confirmed, `false` otherwise
    fn confirm(&mut self, prompt: &str) -> Result<bool>;
}

/// No-op progress callback
pub struct NoProgress;

impl ProgressCallback for NoProgress {
    fn on_batch_start(&self, _count: usize) {}
    fn on_resource_start(&self, _id: &str, _description: &str) {}
    fn on_resource_complete(&self, _id: &str, _result: &ApplyResult) {}
    fn on_batch_complete(&self) {}
}

/// Auto-confirm callback (always returns true)
pub struct AutoConfirm;

impl ConfirmCallback for AutoConfirm {
    fn confirm(&mut self, _prompt: &str) -> Result<bool> {
        Ok(true)
    }
}

/// Auto-decline callback (always returns false)
pub struct AutoDecline;

impl ConfirmCallback for AutoDecline {
    fn confirm(&mut self, _prompt: &str) -> Result<bool> {
        Ok(false)
    }
}

/// Context passed to resource apply operations
#[derive(Debug, Clone, Copy, Default)]
pub struct ApplyContext {
    /// Whether this is a dry run (no actual changes)
    pub dry_run: bool,
    /// Whether to output verbose information
    pub verbose: bool,
}

impl ApplyContext {
    /// Create a new apply context
    pub fn new(dry_run: bool, verbose: bool) -> Self {
        Self { dry_run, verbose }
    }
}
