//! `couchbucket status`

use anyhow::Result;
use cbadmin::Backend;
use colored::Colorize;
use std::sync::Arc;

use crate::Context;
use crate::engine::planner;
use crate::provider::BucketProvider;
use crate::schema::{Ensure, Manifest};
use crate::ui;

/// Where a declared bucket stands
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BucketStatus {
    /// Present and matching
    InSync,
    /// Declared present, not on the cluster
    Missing,
    /// Present with differing properties
    Drifted(Vec<String>),
    /// Declared absent but still on the cluster
    Unwanted,
    /// Declared absent and gone
    Absent,
}

impl BucketStatus {
    fn of(provider: &BucketProvider) -> Self {
        match (provider.desired().ensure, provider.exists()) {
            (Ensure::Present, false) => Self::Missing,
            (Ensure::Absent, true) => Self::Unwanted,
            (Ensure::Absent, false) => Self::Absent,
            (Ensure::Present, true) => {
                let divergent = provider.divergent();
                if divergent.is_empty() {
                    Self::InSync
                } else {
                    Self::Drifted(divergent.iter().map(ToString::to_string).collect())
                }
            }
        }
    }

    fn render(&self) -> String {
        match self {
            Self::InSync => format!("{} in sync", "✓".green()),
            Self::Missing => format!("{} missing", "+".green()),
            Self::Drifted(props) => format!("{} drifted: {}", "~".yellow(), props.join(", ")),
            Self::Unwanted => format!("{} to delete", "-".red()),
            Self::Absent => format!("{} absent", "○".dimmed()),
        }
    }
}

pub fn run(ctx: &Context) -> Result<()> {
    let manifest = super::load_manifest(ctx)?;
    let client = super::connect(ctx)?;

    ui::header("Bucket Status");
    let rows = collect(&client.backend(), &manifest)?;
    if rows.is_empty() {
        ui::info("No buckets declared");
        return Ok(());
    }

    let width = rows.iter().map(|(name, _)| name.len()).max().unwrap_or(0);
    for (name, status) in &rows {
        println!("  {} {}", ui::pad(name, width), status.render());
    }

    let in_sync = rows
        .iter()
        .filter(|(_, s)| matches!(s, BucketStatus::InSync | BucketStatus::Absent))
        .count();
    println!();
    ui::kv("Converged", &format!("{in_sync}/{}", rows.len()));
    Ok(())
}

/// Status of every declared bucket, in manifest order
pub fn collect(backend: &Arc<dyn Backend>, manifest: &Manifest) -> Result<Vec<(String, BucketStatus)>> {
    let providers = planner::discover(backend, manifest, false)?;
    Ok(providers
        .iter()
        .map(|p| (p.name().to_string(), BucketStatus::of(p)))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use cbadmin::{BucketSettings, MockBackend};

    #[test]
    fn test_collect_statuses() {
        let mut big = BucketSettings::new("big");
        big.ram_quota_mb = 1024;
        let mock = MockBackend::with_buckets([
            BucketSettings::new("ok"),
            big,
            BucketSettings::new("unwanted"),
        ]);
        let backend: Arc<dyn Backend> = Arc::new(mock.clone());
        let manifest = Manifest::parse(
            r#"
[buckets.ok]
[buckets.big]
[buckets.missing]
[buckets.unwanted]
ensure = "absent"
[buckets.gone]
ensure = "absent"
"#,
        )
        .unwrap();

        let rows = collect(&backend, &manifest).unwrap();
        assert_eq!(
            rows,
            vec![
                ("big".to_string(), BucketStatus::Drifted(vec!["ram_quota_mb".into()])),
                ("gone".to_string(), BucketStatus::Absent),
                ("missing".to_string(), BucketStatus::Missing),
                ("ok".to_string(), BucketStatus::InSync),
                ("unwanted".to_string(), BucketStatus::Unwanted),
            ]
        );
        assert!(mock.mutations().is_empty());
    }
}
