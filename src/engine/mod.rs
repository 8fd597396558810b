//! Execution engine for couchbucket
//!
//! The engine orchestrates:
//! 1. Planning - Discover the cluster and pair buckets with the manifest
//! 2. Diffing - Compute observed vs declared state
//! 3. Executing - Apply changes with progress and confirmation

pub mod differ;
pub mod executor;
pub mod planner;

pub use executor::{ExecuteOptions, execute};
pub use planner::build_plan;
