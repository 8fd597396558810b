//! `couchbucket validate`

use anyhow::Result;

use crate::Context;
use crate::schema::{Ensure, Manifest};
use crate::ui;

pub fn run(ctx: &Context) -> Result<()> {
    let manifest = super::load_manifest(ctx)?;
    if manifest.is_empty() {
        ui::warn("Manifest declares no buckets");
        return Ok(());
    }

    if !ctx.quiet {
        ui::header("Manifest");
        for line in describe(&manifest) {
            ui::dim(&line);
        }
        println!();
    }
    ui::success(&format!("{} buckets declared, manifest is valid", manifest.len()));
    Ok(())
}

/// One line per declared bucket
fn describe(manifest: &Manifest) -> Vec<String> {
    manifest
        .buckets
        .iter()
        .map(|b| match b.ensure {
            Ensure::Present => format!(
                "{}: {} {} MB",
                b.name(),
                b.settings.bucket_type,
                b.settings.ram_quota_mb
            ),
            Ensure::Absent => format!("{}: absent", b.name()),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe() {
        let manifest = Manifest::parse(
            "[buckets.a]\ntype = \"couchbase\"\nram_quota_mb = 256\n[buckets.b]\nensure = \"absent\"\n",
        )
        .unwrap();
        assert_eq!(describe(&manifest), vec!["a: couchbase 256 MB", "b: absent"]);
    }
}
