//! Diff display for bucket plans

use colored::Colorize;
use declarative::{DiffSummary, ResourceDiff, ResourceState};

/// Render the marker and state text of one diff line.
fn describe(diff: &ResourceDiff) -> (colored::ColoredString, String) {
    match (&diff.current, &diff.desired) {
        (ResourceState::Absent, ResourceState::Present { .. }) => {
            ("+".green(), "(will create)".to_string())
        }
        (ResourceState::Present { details }, ResourceState::Absent) => (
            "-".red(),
            match details {
                Some(d) => format!("(will delete: {d})"),
                None => "(will delete)".to_string(),
            },
        ),
        (ResourceState::Drifted { .. }, ResourceState::Absent) => {
            ("-".red(), "(will delete)".to_string())
        }
        (ResourceState::Drifted { .. }, _) => ("~".yellow(), String::new()),
        _ => ("?".dimmed(), String::new()),
    }
}

/// Display a list of diffs in a user-friendly format
pub fn display_diff(diffs: &[ResourceDiff]) {
    if diffs.is_empty() {
        println!();
        println!("  {} No changes needed", "✓".green());
        return;
    }

    println!();
    println!(
        "┌─ {} ─────────────────────────────────────────┐",
        "Bucket Diff".bold()
    );
    println!("│");

    for (resource_type, type_diffs) in declarative::group_by_type(diffs) {
        let type_name = match resource_type.as_str() {
            "bucket" => "Buckets",
            other => other,
        };
        println!("│ {}", type_name.bold());

        for diff in type_diffs {
            let (symbol, state_desc) = describe(diff);
            println!("│   {} {:<30} {}", symbol, diff.resource_id, state_desc.dimmed());
            for change in diff.changes() {
                println!(
                    "│       {} {} → {}",
                    format!("{}:", change.property).dimmed(),
                    change.current.red(),
                    change.desired.green()
                );
            }
        }
        println!("│");
    }

    let summary = DiffSummary::from_diffs(diffs);
    println!("├─────────────────────────────────────────────────────┤");
    println!(
        "│ Summary: {} changes ({} to create, {} to modify, {} to delete)",
        summary.total().to_string().bold(),
        summary.additions.to_string().green(),
        summary.modifications.to_string().yellow(),
        summary.removals.to_string().red()
    );
    println!("└─────────────────────────────────────────────────────┘");
}

/// Display the destructive-change warning
///
/// Recreating a bucket deletes its data just like removing it.
pub fn display_data_loss_warning(diffs: &[ResourceDiff], recreates: &[String]) {
    let removals: Vec<&str> = diffs
        .iter()
        .filter(|d| d.is_removal())
        .map(|d| d.resource_id.as_str())
        .collect();
    if removals.is_empty() && recreates.is_empty() {
        return;
    }

    println!();
    println!(
        "  {}  The following buckets will lose all of their data:",
        "⚠".yellow()
    );
    for name in &removals {
        println!("    • {name} (delete)");
    }
    for name in recreates {
        println!("    • {name} (delete and recreate)");
    }
}
