//! `couchbucket list`

use anyhow::{Context as AnyhowContext, Result};
use cbadmin::BucketSettings;
use colored::Colorize;

use crate::Context;
use crate::cli::ListArgs;
use crate::provider;
use crate::ui;

pub fn run(ctx: &Context, args: &ListArgs) -> Result<()> {
    let client = super::connect(ctx)?;
    let buckets = provider::list_all(client.backend().as_ref()).context("Could not list buckets")?;

    if args.json {
        println!("{}", render_json(&buckets)?);
        return Ok(());
    }

    ui::header(&format!("Buckets ({})", buckets.len()));
    if buckets.is_empty() {
        ui::dim("(none)");
        return Ok(());
    }
    for bucket in &buckets {
        print_bucket(bucket, ctx.verbose > 0);
    }
    Ok(())
}

/// Listing as pretty JSON, with passwords masked
pub fn render_json(buckets: &[BucketSettings]) -> Result<String> {
    let masked: Vec<BucketSettings> = buckets
        .iter()
        .cloned()
        .map(|mut b| {
            b.password = ui::mask(&b.password).to_string();
            b
        })
        .collect();
    serde_json::to_string_pretty(&masked).context("Failed to serialize bucket listing")
}

fn print_bucket(bucket: &BucketSettings, verbose: bool) {
    println!();
    println!("  {}", bucket.name.cyan().bold());
    ui::kv("type", bucket.bucket_type.as_str());
    ui::kv("ram_quota_mb", &bucket.ram_quota_mb.to_string());
    ui::kv("auth", bucket.auth.as_str());
    if let Some(port) = bucket.port {
        ui::kv("port", &port.to_string());
    }
    if verbose {
        ui::kv("password", ui::mask(&bucket.password));
        ui::kv("flush_enabled", &bucket.flush_enabled.to_string());
        ui::kv("replica_index", &bucket.replica_index.to_string());
        ui::kv("replica_number", &bucket.replica_number.to_string());
        ui::kv("threads_number", &bucket.threads_number.to_string());
        ui::kv("parallel_compaction", &bucket.parallel_compaction.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_json_masks_passwords() {
        let mut secret = BucketSettings::new("secure");
        secret.password = "hunter2".into();
        let json = render_json(&[secret, BucketSettings::new("open")]).unwrap();

        assert!(!json.contains("hunter2"));
        let parsed: Vec<serde_json::Value> = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed[0]["name"], "secure");
        assert_eq!(parsed[0]["password"], "********");
        assert_eq!(parsed[0]["type"], "memcached");
        assert_eq!(parsed[1]["password"], "(none)");
    }
}
