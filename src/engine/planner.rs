//! Execution planner - turns a manifest into a bucket plan

use anyhow::{Context, Result};
use cbadmin::Backend;
use declarative::{ExecutionPlan, Resource};
use std::collections::HashSet;
use std::sync::Arc;

use crate::provider::{self, BucketProvider, Effect};
use crate::resource::BucketResource;
use crate::schema::{Ensure, Manifest};

/// A plan plus what the engine needs to warn about it.
pub struct BucketPlan {
    pub plan: ExecutionPlan,
    /// Planned buckets whose drift can only be fixed by delete and create
    pub recreates: Vec<String>,
}

/// Discover the cluster once and pair its buckets with the manifest.
///
/// `target` narrows the plan after discovery; see
/// [`ExecutionPlan::filter_by_target`].
pub fn build_plan(
    backend: &Arc<dyn Backend>,
    manifest: &Manifest,
    purge: bool,
    target: Option<&str>,
) -> Result<BucketPlan> {
    let providers = discover(backend, manifest, purge)?;
    let mut recreates: Vec<String> = providers
        .iter()
        .filter(|p| p.desired().ensure == Ensure::Present)
        .filter(|p| p.effect_of(&p.divergent()) == Some(Effect::Recreate))
        .map(|p| p.name().to_string())
        .collect();

    let mut plan = ExecutionPlan::new();
    for provider in providers {
        plan.push(Box::new(BucketResource::new(provider)));
    }
    let plan = plan.filter_by_target(target);

    let planned: HashSet<String> = plan.resources.iter().map(|r| r.id()).collect();
    recreates.retain(|name| planned.contains(name));

    Ok(BucketPlan { plan, recreates })
}

/// List the cluster and build one provider per declared bucket.
pub fn discover(
    backend: &Arc<dyn Backend>,
    manifest: &Manifest,
    purge: bool,
) -> Result<Vec<BucketProvider>> {
    let observed = provider::list_all(backend.as_ref()).context("Could not list buckets")?;
    Ok(provider::prefetch(
        backend,
        manifest.buckets.clone(),
        observed,
        purge,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use cbadmin::{BucketSettings, Call, MockBackend};

    fn manifest() -> Manifest {
        Manifest::parse(
            r#"
[buckets.cache1]
type = "memcached"
ram_quota_mb = 128

[buckets.sessions]
type = "couchbase"
"#,
        )
        .unwrap()
    }

    #[test]
    fn test_build_plan_lists_once() {
        let mock = MockBackend::with_buckets([BucketSettings::new("cache1")]);
        let backend: Arc<dyn Backend> = Arc::new(mock.clone());

        let built = build_plan(&backend, &manifest(), false, None).unwrap();
        assert_eq!(built.plan.total_resources(), 2);
        // memcached resize
        assert_eq!(built.recreates, vec!["cache1".to_string()]);
        assert_eq!(mock.calls(), vec![Call::List]);
    }

    #[test]
    fn test_build_plan_target() {
        let backend: Arc<dyn Backend> = Arc::new(MockBackend::new());
        let built = build_plan(&backend, &manifest(), false, Some("bucket.sessions")).unwrap();
        assert_eq!(built.plan.total_resources(), 1);
        assert_eq!(built.plan.resources[0].id(), "sessions");
        assert!(built.recreates.is_empty());
    }

    #[test]
    fn test_build_plan_purge() {
        let mock = MockBackend::with_buckets([BucketSettings::new("legacy")]);
        let backend: Arc<dyn Backend> = Arc::new(mock);

        assert_eq!(
            build_plan(&backend, &manifest(), false, None)
                .unwrap()
                .plan
                .total_resources(),
            2
        );
        assert_eq!(
            build_plan(&backend, &manifest(), true, None)
                .unwrap()
                .plan
                .total_resources(),
            3
        );
    }

    #[test]
    fn test_listing_failure_has_context() {
        let mock = MockBackend::new();
        mock.fail_next(cbadmin::CallKind::List, 401, "Unauthorized");
        let backend: Arc<dyn Backend> = Arc::new(mock);

        let err = build_plan(&backend, &manifest(), false, None).err().unwrap();
        let message = format!("{err:#}");
        assert!(message.starts_with("Could not list buckets"));
        assert!(message.contains("HTTP 401"));
    }
}
