//! `couchbucket apply`

use anyhow::{Result, bail};
use cbadmin::Backend;
use declarative::ExecuteSummary;
use std::sync::Arc;

use crate::Context;
use crate::cli::ApplyArgs;
use crate::engine::{self, ExecuteOptions};
use crate::schema::Manifest;
use crate::ui;

pub fn run(ctx: &Context, args: &ApplyArgs) -> Result<()> {
    let manifest = super::load_manifest(ctx)?;
    let client = super::connect(ctx)?;

    let opts = ExecuteOptions {
        dry_run: args.dry_run,
        jobs: usize::from(args.jobs),
        yes: args.yes,
        verbose: ctx.verbose > 0,
    };
    let summary = reconcile(
        &client.backend(),
        &manifest,
        args.target.as_deref(),
        args.purge,
        &opts,
    )?;

    if !summary.is_success() {
        bail!("{} of {} buckets failed", summary.failed, summary.total());
    }
    if !ctx.quiet && summary.total() == 0 {
        ui::success("All buckets match the manifest");
    }
    Ok(())
}

/// One reconciliation pass: discover, diff, apply
pub fn reconcile(
    backend: &Arc<dyn Backend>,
    manifest: &Manifest,
    target: Option<&str>,
    purge: bool,
    opts: &ExecuteOptions,
) -> Result<ExecuteSummary> {
    let built = engine::build_plan(backend, manifest, purge, target)?;
    if built.plan.is_empty() {
        if let Some(target) = target {
            ui::warn(&format!("No bucket matches '{target}'"));
        }
        return Ok(ExecuteSummary::default());
    }
    engine::execute(built.plan, &built.recreates, opts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use cbadmin::{BucketSettings, BucketType, Call, CallKind, MockBackend};

    fn yes() -> ExecuteOptions {
        ExecuteOptions {
            yes: true,
            ..Default::default()
        }
    }

    fn backend(mock: &MockBackend) -> Arc<dyn Backend> {
        Arc::new(mock.clone())
    }

    #[test]
    fn test_create_declared_memcached_bucket() {
        let mock = MockBackend::new();
        let manifest = Manifest::parse(
            r#"
[buckets.cache1]
ensure = "present"
type = "memcached"
port = 21212
ram_quota_mb = 128
"#,
        )
        .unwrap();

        let summary = reconcile(&backend(&mock), &manifest, None, false, &yes()).unwrap();
        assert_eq!(summary.created, 1);

        let mutations = mock.mutations();
        assert_eq!(mutations.len(), 1);
        assert_eq!(mutations[0].method(), "POST");
        assert_eq!(mutations[0].path(), "/pools/default/buckets");
        let Call::Create(sent) = &mutations[0] else {
            panic!("expected a create");
        };
        let form = sent.to_form();
        assert!(form.contains(&("name", "cache1".to_string())));
        assert!(form.contains(&("bucketType", "memcached".to_string())));
        assert!(form.contains(&("proxyPort", "21212".to_string())));
        assert!(form.contains(&("ramQuotaMB", "128".to_string())));

        // A second pass sees the bucket and does nothing
        let again = reconcile(&backend(&mock), &manifest, None, false, &yes()).unwrap();
        assert_eq!(again.total(), 0);
        assert_eq!(mock.mutations().len(), 1);
    }

    #[test]
    fn test_remove_declared_absent_bucket() {
        let mock = MockBackend::with_buckets([BucketSettings::new("cache1")]);
        let manifest = Manifest::parse("[buckets.cache1]\nensure = \"absent\"\n").unwrap();

        let summary = reconcile(&backend(&mock), &manifest, None, false, &yes()).unwrap();
        assert_eq!(summary.removed, 1);
        assert_eq!(mock.mutations(), vec![Call::Delete("cache1".into())]);
        assert_eq!(mock.mutations()[0].path(), "/pools/default/buckets/cache1");
        assert!(mock.bucket("cache1").is_none());
    }

    #[test]
    fn test_mixed_plan_in_parallel() {
        let mut data = BucketSettings::new("data");
        data.bucket_type = BucketType::Couchbase;
        let mock = MockBackend::with_buckets([data, BucketSettings::new("old")]);
        let manifest = Manifest::parse(
            r#"
[buckets.data]
type = "couchbase"
replica_number = 2

[buckets.fresh]

[buckets.old]
ensure = "absent"
"#,
        )
        .unwrap();

        let opts = ExecuteOptions {
            jobs: 3,
            ..yes()
        };
        let summary = reconcile(&backend(&mock), &manifest, None, false, &opts).unwrap();
        assert_eq!(summary.modified, 1);
        assert_eq!(summary.created, 1);
        assert_eq!(summary.removed, 1);
        assert_eq!(mock.bucket("data").unwrap().replica_number, 2);
    }

    #[test]
    fn test_failure_is_reported_per_bucket() {
        let mock = MockBackend::new();
        mock.fail_next(CallKind::Create, 400, "ramQuotaMB: invalid");
        let manifest = Manifest::parse("[buckets.a]\n[buckets.b]\n").unwrap();

        let summary = reconcile(&backend(&mock), &manifest, None, false, &yes()).unwrap();
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.created, 1);
        assert_eq!(summary.failures[0].0, "a");
        assert!(!summary.is_success());
    }

    #[test]
    fn test_purge_removes_undeclared() {
        let mock = MockBackend::with_buckets([BucketSettings::new("stray")]);
        let manifest = Manifest::parse("").unwrap();

        let kept = reconcile(&backend(&mock), &manifest, None, false, &yes()).unwrap();
        assert_eq!(kept.total(), 0);
        assert!(mock.bucket("stray").is_some());

        let purged = reconcile(&backend(&mock), &manifest, None, true, &yes()).unwrap();
        assert_eq!(purged.removed, 1);
        assert!(mock.bucket("stray").is_none());
    }

    #[test]
    fn test_unknown_target_is_noop() {
        let mock = MockBackend::new();
        let manifest = Manifest::parse("[buckets.a]\n").unwrap();
        let summary = reconcile(&backend(&mock), &manifest, Some("bucket.zzz"), false, &yes()).unwrap();
        assert_eq!(summary.total(), 0);
        assert!(mock.mutations().is_empty());
    }
}
