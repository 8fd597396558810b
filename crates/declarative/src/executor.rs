//! Execution engine - applies resources, optionally in parallel

use crate::context::{ApplyContext, ConfirmCallback, ProgressCallback};
use crate::diff::compute_diffs;
use crate::planner::ExecutionPlan;
use crate::resource::Resource;
use crate::types::{ApplyResult, ExecuteOptions, ExecuteSummary};
use anyhow::Result;
use rayon::prelude::*;

/// Execute a plan with the given options and callbacks
///
/// # Type Parameters
/// * `P` - Progress callback type
/// * `C` - Confirm callback type
///
/// # Arguments
/// * `plan` - The execution plan to run
/// * `opts` - Execution options (dry_run, jobs, verbose)
/// * `progress` - Progress callback
/// * `confirm` - Confirmation callback, not consulted on dry runs
///
/// # Returns
/// Summary of execution results. A failing resource does not stop the
/// others; it is counted in the summary instead.
pub fn execute<P, C>(
    plan: ExecutionPlan,
    opts: ExecuteOptions,
    progress: &P,
    confirm: &mut C,
) -> Result<ExecuteSummary>
where
    P: ProgressCallback,
    C: ConfirmCallback,
{
    let diffs = compute_diffs(&plan.resources);
    if diffs.is_empty() {
        log::debug!("Nothing to apply across {} resources", plan.total_resources());
        return Ok(ExecuteSummary::default());
    }

    if !opts.dry_run && !confirm.confirm("Apply changes?")? {
        return Ok(ExecuteSummary {
            skipped: diffs.len(),
            ..Default::default()
        });
    }

    let mut summary = ExecuteSummary::default();

    progress.on_batch_start(plan.resources.len());
    let results = execute_batch(&plan.resources, &opts, progress)?;
    for (id, result) in &results {
        summary.add_result(id, result);
    }
    progress.on_batch_complete();

    Ok(summary)
}

/// Execute a batch of resources
fn execute_batch<P: ProgressCallback>(
    resources: &[Box<dyn Resource>],
    opts: &ExecuteOptions,
    progress: &P,
) -> Result<Vec<(String, ApplyResult)>> {
    let ctx = ApplyContext::new(opts.dry_run, opts.verbose);
    let serial = resources.iter().any(|r| !r.can_parallelize());

    if opts.jobs <= 1 || resources.len() == 1 || serial {
        Ok(resources
            .iter()
            .map(|resource| apply_tracked(resource.as_ref(), ctx, progress))
            .collect())
    } else {
        execute_parallel(resources, opts.jobs, ctx, progress)
    }
}

/// Execute resources in parallel using rayon
///
/// Results keep the plan order regardless of completion order.
fn execute_parallel<P: ProgressCallback>(
    resources: &[Box<dyn Resource>],
    jobs: usize,
    ctx: ApplyContext,
    progress: &P,
) -> Result<Vec<(String, ApplyResult)>> {
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(jobs)
        .build()
        .map_err(|e| anyhow::anyhow!("Failed to create thread pool: {e}"))?;

    Ok(pool.install(|| {
        resources
            .par_iter()
            .map(|resource| apply_tracked(resource.as_ref(), ctx, progress))
            .collect()
    }))
}

fn apply_tracked<P: ProgressCallback>(
    resource: &dyn Resource,
    ctx: ApplyContext,
    progress: &P,
) -> (String, ApplyResult) {
    let id = resource.id();
    progress.on_resource_start(&id, &resource.description());
    let result = apply_resource(resource, ctx);
    progress.on_resource_complete(&id, &result);
    (id, result)
}

/// Apply a single resource
fn apply_resource(resource: &dyn Resource, mut ctx: ApplyContext) -> ApplyResult {
    match resource.apply(&mut ctx) {
        Ok(result) => result,
        Err(e) => {
            log::debug!("Apply of {} failed: {e:#}", resource.id());
            ApplyResult::Failed {
                error: format!("{e:#}"),
            }
        }
    }
}

/// Simple execution without callbacks
///
/// For basic use cases where you don't need progress or confirmation.
pub fn execute_simple(plan: ExecutionPlan, opts: ExecuteOptions) -> Result<ExecuteSummary> {
    use crate::context::{AutoConfirm, NoProgress};

    execute(plan, opts, &NoProgress, &mut AutoConfirm)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{AutoConfirm, AutoDecline, NoProgress};
    use crate::types::ResourceState;
    use std::sync::Mutex;

    #[derive(Debug)]
    struct TestResource {
        id: String,
        should_change: bool,
        fail: bool,
    }

    impl TestResource {
        fn boxed(id: &str, should_change: bool) -> Box<Self> {
            Box::new(Self {
                id: id.into(),
                should_change,
                fail: false,
            })
        }
    }

    impl Resource for TestResource {
        fn id(&self) -> String {
            self.id.clone()
        }

        fn description(&self) -> String {
            format!("Test resource {}", self.id)
        }

        fn resource_type(&self) -> &'static str {
            "test"
        }

        fn current_state(&self) -> Result<ResourceState> {
            if self.should_change {
                Ok(ResourceState::Absent)
            } else {
                Ok(ResourceState::Present { details: None })
            }
        }

        fn desired_state(&self) -> ResourceState {
            ResourceState::Present { details: None }
        }

        fn apply(&self, ctx: &mut ApplyContext) -> Result<ApplyResult> {
            if !self.should_change {
                return Ok(ApplyResult::NoChange);
            }
            if ctx.dry_run {
                return Ok(ApplyResult::Skipped {
                    reason: "Dry run".into(),
                });
            }
            if self.fail {
                anyhow::bail!("POST /pools/default/buckets failed (HTTP 400)");
            }
            Ok(ApplyResult::Created)
        }
    }

    #[derive(Default)]
    struct Recorder(Mutex<Vec<String>>);

    impl ProgressCallback for Recorder {
        fn on_batch_start(&self, count: usize) {
            self.0.lock().unwrap().push(format!("batch {count}"));
        }
        fn on_resource_start(&self, id: &str, _description: &str) {
            self.0.lock().unwrap().push(format!("start {id}"));
        }
        fn on_resource_complete(&self, id: &str, result: &ApplyResult) {
            self.0
                .lock()
                .unwrap()
                .push(format!("done {id} {}", result.symbol()));
        }
        fn on_batch_complete(&self) {
            self.0.lock().unwrap().push("end".into());
        }
    }

    #[test]
    fn test_execute_empty_plan() {
        let result = execute_simple(ExecutionPlan::new(), ExecuteOptions::default()).unwrap();
        assert_eq!(result.total(), 0);
    }

    #[test]
    fn test_execute_no_changes() {
        let mut plan = ExecutionPlan::new();
        plan.push(TestResource::boxed("test1", false));

        let result = execute_simple(plan, ExecuteOptions::default()).unwrap();

        // No diff means no execution
        assert_eq!(result.total(), 0);
    }

    #[test]
    fn test_execute_with_changes() {
        let mut plan = ExecutionPlan::new();
        plan.push(TestResource::boxed("test1", true));
        plan.push(TestResource::boxed("test2", false));

        let progress = Recorder::default();
        let result = execute(plan, ExecuteOptions::default(), &progress, &mut AutoConfirm).unwrap();

        assert_eq!(result.created, 1);
        assert_eq!(result.no_change, 1);
        assert_eq!(
            *progress.0.lock().unwrap(),
            vec![
                "batch 2",
                "start test1",
                "done test1 ✓",
                "start test2",
                "done test2 ○",
                "end"
            ]
        );
    }

    #[test]
    fn test_execute_declined() {
        let mut plan = ExecutionPlan::new();
        plan.push(TestResource::boxed("test1", true));

        let result = execute(plan, ExecuteOptions::default(), &NoProgress, &mut AutoDecline).unwrap();
        assert_eq!(result.skipped, 1);
        assert_eq!(result.created, 0);
    }

    #[test]
    fn test_execute_dry_run_skips_without_confirm() {
        let mut plan = ExecutionPlan::new();
        plan.push(TestResource::boxed("test1", true));

        let opts = ExecuteOptions {
            dry_run: true,
            ..Default::default()
        };
        let result = execute(plan, opts, &NoProgress, &mut AutoDecline).unwrap();
        assert_eq!(result.skipped, 1);
        assert_eq!(result.total_changes(), 0);
    }

    #[test]
    fn test_execute_failure_is_isolated() {
        let mut plan = ExecutionPlan::new();
        plan.push(Box::new(TestResource {
            id: "broken".into(),
            should_change: true,
            fail: true,
        }));
        plan.push(TestResource::boxed("fine", true));

        let opts = ExecuteOptions {
            jobs: 4,
            ..Default::default()
        };
        let result = execute_simple(plan, opts).unwrap();
        assert_eq!(result.created, 1);
        assert_eq!(result.failed, 1);
        assert_eq!(result.failures[0].0, "broken");
        assert!(result.failures[0].1.contains("HTTP 400"));
    }
}
