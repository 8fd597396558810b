//! Bucket resource for the declarative engine
//!
//! Wraps a [`BucketProvider`] so the executor can diff and apply it. The
//! provider sits behind a mutex: state queries are reads, `apply` mutates
//! the working record, and the executor may run resources on a thread pool.

use anyhow::Result;
use declarative::{ApplyContext, ApplyResult, Resource, ResourceState};
use std::sync::{Mutex, MutexGuard};

use crate::provider::BucketProvider;
use crate::schema::Ensure;

pub const RESOURCE_TYPE: &str = "bucket";

#[derive(Debug)]
pub struct BucketResource {
    provider: Mutex<BucketProvider>,
}

impl BucketResource {
    pub fn new(provider: BucketProvider) -> Self {
        Self {
            provider: Mutex::new(provider),
        }
    }

    fn provider(&self) -> MutexGuard<'_, BucketProvider> {
        match self.provider.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

/// One-line summary of a bucket, e.g. `memcached, 128 MB`.
fn summary(settings: &cbadmin::BucketSettings) -> String {
    format!("{}, {} MB", settings.bucket_type, settings.ram_quota_mb)
}

impl Resource for BucketResource {
    fn id(&self) -> String {
        self.provider().name().to_string()
    }

    fn description(&self) -> String {
        let provider = self.provider();
        match provider.desired().ensure {
            Ensure::Present => format!(
                "Bucket {} ({})",
                provider.name(),
                summary(&provider.desired().settings)
            ),
            Ensure::Absent => format!("Remove bucket {}", provider.name()),
        }
    }

    fn resource_type(&self) -> &'static str {
        RESOURCE_TYPE
    }

    fn current_state(&self) -> Result<ResourceState> {
        let provider = self.provider();
        if !provider.exists() {
            return Ok(ResourceState::Absent);
        }

        match provider.desired().ensure {
            Ensure::Absent => Ok(ResourceState::Present {
                details: provider.record().observed.as_ref().map(summary),
            }),
            Ensure::Present => {
                let changes = provider.changes();
                if changes.is_empty() {
                    Ok(ResourceState::Present { details: None })
                } else {
                    Ok(ResourceState::Drifted { changes })
                }
            }
        }
    }

    fn desired_state(&self) -> ResourceState {
        match self.provider().desired().ensure {
            Ensure::Present => ResourceState::Present { details: None },
            Ensure::Absent => ResourceState::Absent,
        }
    }

    fn apply(&self, ctx: &mut ApplyContext) -> Result<ApplyResult> {
        Ok(self.provider().reconcile(ctx.dry_run)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::BucketDesiredState;
    use cbadmin::{Backend, BucketSettings, BucketType, CallKind, MockBackend};
    use std::sync::Arc;

    fn resource(mock: &MockBackend, desired: BucketDesiredState) -> BucketResource {
        let observed = mock.bucket(desired.name());
        let backend: Arc<dyn Backend> = Arc::new(mock.clone());
        BucketResource::new(BucketProvider::new(backend, desired, observed))
    }

    #[test]
    fn test_states() {
        let mock = MockBackend::with_buckets([BucketSettings::new("old")]);

        let missing = resource(&mock, BucketDesiredState::present("new"));
        assert_eq!(missing.current_state().unwrap(), ResourceState::Absent);
        assert!(missing.needs_apply().unwrap());

        let in_sync = resource(&mock, BucketDesiredState::present("old"));
        assert!(!in_sync.needs_apply().unwrap());

        let doomed = resource(&mock, BucketDesiredState::absent("old"));
        assert_eq!(
            doomed.current_state().unwrap(),
            ResourceState::Present {
                details: Some("memcached, 64 MB".into())
            }
        );
        assert_eq!(doomed.description(), "Remove bucket old");

        let mut wanted = BucketDesiredState::present("old");
        wanted.settings.bucket_type = BucketType::Couchbase;
        let drifted = resource(&mock, wanted);
        assert_eq!(drifted.current_state().unwrap().changes().len(), 1);
    }

    #[test]
    fn test_apply_converges() {
        let mock = MockBackend::new();
        let r = resource(&mock, BucketDesiredState::present("cache1"));

        let mut ctx = ApplyContext::new(false, false);
        assert_eq!(r.apply(&mut ctx).unwrap(), ApplyResult::Created);
        assert!(!r.needs_apply().unwrap());
        assert_eq!(r.apply(&mut ctx).unwrap(), ApplyResult::NoChange);
    }

    #[test]
    fn test_apply_error_surfaces() {
        let mock = MockBackend::new();
        mock.fail_next(CallKind::Create, 400, "ramQuotaMB: RAM quota cannot be less than 100 MB");
        let r = resource(&mock, BucketDesiredState::present("tiny"));

        let err = r.apply(&mut ApplyContext::default()).unwrap_err();
        assert_eq!(
            err.to_string(),
            "POST /pools/default/buckets failed (HTTP 400): ramQuotaMB: RAM quota cannot be less than 100 MB"
        );
    }
}
