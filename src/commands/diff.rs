//! `couchbucket diff`

use anyhow::Result;
use cbadmin::Backend;
use declarative::{ResourceDiff, compute_diffs};
use std::sync::Arc;

use crate::Context;
use crate::cli::DiffArgs;
use crate::engine::{self, differ};
use crate::schema::Manifest;

pub fn run(ctx: &Context, args: &DiffArgs) -> Result<()> {
    let manifest = super::load_manifest(ctx)?;
    let client = super::connect(ctx)?;

    let (diffs, recreates) = plan_diffs(
        &client.backend(),
        &manifest,
        args.target.as_deref(),
        args.purge,
    )?;
    differ::display_diff(&diffs);
    differ::display_data_loss_warning(&diffs, &recreates);
    Ok(())
}

/// Diffs apply would act on, plus the buckets it would recreate
pub fn plan_diffs(
    backend: &Arc<dyn Backend>,
    manifest: &Manifest,
    target: Option<&str>,
    purge: bool,
) -> Result<(Vec<ResourceDiff>, Vec<String>)> {
    let built = engine::build_plan(backend, manifest, purge, target)?;
    Ok((compute_diffs(&built.plan.resources), built.recreates))
}

#[cfg(test)]
mod tests {
    use super::*;
    use cbadmin::{BucketSettings, MockBackend};

    #[test]
    fn test_diff_makes_no_changes() {
        let mut cache = BucketSettings::new("cache1");
        cache.port = Some(11211);
        let mock = MockBackend::with_buckets([cache, BucketSettings::new("stray")]);
        let backend: Arc<dyn Backend> = Arc::new(mock.clone());
        let manifest = Manifest::parse(
            r#"
[buckets.cache1]
port = 21212
flush_enabled = true

[buckets.new]
"#,
        )
        .unwrap();

        let (diffs, recreates) = plan_diffs(&backend, &manifest, None, true).unwrap();
        assert_eq!(diffs.len(), 3);
        assert_eq!(recreates, vec!["cache1".to_string()]);

        let cache = diffs.iter().find(|d| d.resource_id == "cache1").unwrap();
        assert!(cache.is_modification());
        let props: Vec<&str> = cache.changes().iter().map(|c| c.property.as_str()).collect();
        assert_eq!(props, vec!["flush_enabled", "port"]);

        assert!(diffs.iter().any(|d| d.resource_id == "new" && d.is_addition()));
        assert!(diffs.iter().any(|d| d.resource_id == "stray" && d.is_removal()));

        assert!(mock.mutations().is_empty());
    }
}
