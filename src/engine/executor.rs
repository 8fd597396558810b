//! Execution engine - couchbucket executor with UI integration

use anyhow::Result;
use colored::Colorize;
use declarative::{
    ApplyResult, ConfirmCallback, ExecuteSummary, ExecutionPlan, ProgressCallback, compute_diffs,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Mutex;

use super::differ::{display_data_loss_warning, display_diff};

/// Options for execution (includes `yes` for confirmation skip)
#[derive(Debug, Clone)]
pub struct ExecuteOptions {
    /// Don't make changes, just show what would happen
    pub dry_run: bool,
    /// Number of parallel jobs
    pub jobs: usize,
    /// Skip confirmation prompts
    pub yes: bool,
    /// Verbose output
    pub verbose: bool,
}

impl Default for ExecuteOptions {
    fn default() -> Self {
        Self {
            dry_run: false,
            jobs: 1,
            yes: false,
            verbose: false,
        }
    }
}

/// Execute the plan with terminal output
///
/// `recreates` names buckets whose changes delete their data; they are
/// called out before the confirmation prompt.
pub fn execute(
    plan: ExecutionPlan,
    recreates: &[String],
    opts: &ExecuteOptions,
) -> Result<ExecuteSummary> {
    let diffs = compute_diffs(&plan.resources);
    display_diff(&diffs);

    if diffs.is_empty() {
        return Ok(ExecuteSummary::default());
    }
    display_data_loss_warning(&diffs, recreates);

    let progress = BarProgress::new(opts.verbose);
    let mut confirm = PromptConfirm { yes: opts.yes };
    let engine_opts = declarative::ExecuteOptions {
        dry_run: opts.dry_run,
        jobs: opts.jobs,
        verbose: opts.verbose,
    };

    let summary = declarative::execute(plan, engine_opts, &progress, &mut confirm)?;

    if opts.dry_run {
        println!();
        println!("  {} Dry run - no changes made", "ℹ".blue());
    } else if summary.total() == summary.skipped {
        println!();
        println!("  {} Aborted", "✗".red());
    } else {
        print_summary(&summary);
    }

    Ok(summary)
}

/// Progress bar over the applied buckets
struct BarProgress {
    bar: Mutex<Option<ProgressBar>>,
    verbose: bool,
}

impl BarProgress {
    fn new(verbose: bool) -> Self {
        Self {
            bar: Mutex::new(None),
            verbose,
        }
    }

    fn with_bar(&self, f: impl FnOnce(&ProgressBar)) {
        let guard = match self.bar.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Some(bar) = guard.as_ref() {
            f(bar);
        }
    }
}

impl ProgressCallback for BarProgress {
    fn on_batch_start(&self, count: usize) {
        let bar = ProgressBar::new(count as u64);
        if let Ok(style) =
            ProgressStyle::default_bar().template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
        {
            bar.set_style(style.progress_chars("=>-"));
        }
        let mut guard = match self.bar.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *guard = Some(bar);
    }

    fn on_resource_start(&self, id: &str, description: &str) {
        self.with_bar(|bar| bar.set_message(id.to_string()));
        if self.verbose {
            log::info!("{description}");
        }
    }

    fn on_resource_complete(&self, id: &str, result: &ApplyResult) {
        self.with_bar(|bar| {
            let line = match result {
                ApplyResult::NoChange => None,
                ApplyResult::Created => Some(format!("    {} {id} created", "✓".green())),
                ApplyResult::Modified => Some(format!("    {} {id} updated", "✓".green())),
                ApplyResult::Recreated => Some(format!("    {} {id} recreated", "✓".green())),
                ApplyResult::Removed => Some(format!("    {} {id} deleted", "✓".green())),
                ApplyResult::Failed { error } => Some(format!("    {} {id}: {error}", "✗".red())),
                ApplyResult::Skipped { reason } => {
                    Some(format!("    {} {id} ({reason})", "⊘".dimmed()))
                }
            };
            if let Some(line) = line {
                bar.println(line);
            }
            bar.inc(1);
        });
    }

    fn on_batch_complete(&self) {
        self.with_bar(ProgressBar::finish_and_clear);
    }
}

/// Confirm with user unless `--yes` was given
struct PromptConfirm {
    yes: bool,
}

impl ConfirmCallback for PromptConfirm {
    fn confirm(&mut self, prompt: &str) -> Result<bool> {
        if self.yes {
            return Ok(true);
        }

        let confirmed = dialoguer::Confirm::new()
            .with_prompt(prompt)
            .default(false)
            .interact()?;

        Ok(confirmed)
    }
}

/// Print final summary
fn print_summary(summary: &ExecuteSummary) {
    println!();
    if summary.is_success() {
        println!("  {} Buckets reconciled successfully!", "✓".green().bold());
    } else {
        println!("  {} Buckets reconciled with errors", "⚠".yellow().bold());
    }

    if summary.created > 0 {
        println!("    • {} buckets created", summary.created);
    }
    if summary.modified > 0 {
        println!("    • {} buckets updated", summary.modified);
    }
    if summary.recreated > 0 {
        println!("    • {} buckets recreated", summary.recreated);
    }
    if summary.removed > 0 {
        println!("    • {} buckets deleted", summary.removed);
    }
    if summary.skipped > 0 {
        println!("    • {} buckets skipped", summary.skipped);
    }
    if summary.failed > 0 {
        println!("    • {} {} failed", summary.failed, "buckets".red());
        for (id, error) in &summary.failures {
            println!("      {} {}: {}", "✗".red(), id, error);
        }
    }
}
