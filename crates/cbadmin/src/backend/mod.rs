//! Backend trait and implementations for the bucket REST endpoints.
//!
//! [`http::HttpBackend`] talks to a real cluster. [`MockBackend`] keeps
//! buckets in memory and records every call, so reconciliation logic can
//! be tested without a cluster:
//!
//! ```
//! use cbadmin::backend::{Backend, Call, MockBackend};
//! use cbadmin::BucketSettings;
//!
//! let mock = MockBackend::new();
//! mock.create_bucket(&BucketSettings::new("cache1")).unwrap();
//!
//! assert_eq!(mock.list_buckets().unwrap().len(), 1);
//! assert!(matches!(mock.calls()[0], Call::Create(_)));
//! ```

pub mod http;

use crate::error::{Error, Result};
use crate::types::{BUCKETS_PATH, BucketSettings, bucket_path};
use std::collections::{BTreeMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};

/// Bucket lifecycle operations of the admin REST API.
pub trait Backend: Send + Sync {
    /// `GET /pools/default/buckets`.
    fn list_buckets(&self) -> Result<Vec<BucketSettings>>;

    /// `POST /pools/default/buckets` with the full settings.
    fn create_bucket(&self, settings: &BucketSettings) -> Result<()>;

    /// `POST /pools/default/buckets/{name}` with the full settings.
    ///
    /// The server ignores fields that cannot change in place.
    fn update_bucket(&self, settings: &BucketSettings) -> Result<()>;

    /// `DELETE /pools/default/buckets/{name}`.
    fn delete_bucket(&self, name: &str) -> Result<()>;
}

/// A request observed by [`MockBackend`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    /// Listing of all buckets.
    List,
    /// Creation with the given settings.
    Create(BucketSettings),
    /// In-place update with the given settings.
    Update(BucketSettings),
    /// Deletion of the named bucket.
    Delete(String),
}

impl Call {
    /// HTTP method of the equivalent REST call.
    #[must_use]
    pub fn method(&self) -> &'static str {
        match self {
            Self::List => "GET",
            Self::Create(_) | Self::Update(_) => "POST",
            Self::Delete(_) => "DELETE",
        }
    }

    /// Request path of the equivalent REST call.
    #[must_use]
    pub fn path(&self) -> String {
        match self {
            Self::List | Self::Create(_) => BUCKETS_PATH.to_string(),
            Self::Update(settings) => bucket_path(&settings.name),
            Self::Delete(name) => bucket_path(name),
        }
    }

    fn kind(&self) -> CallKind {
        match self {
            Self::List => CallKind::List,
            Self::Create(_) => CallKind::Create,
            Self::Update(_) => CallKind::Update,
            Self::Delete(_) => CallKind::Delete,
        }
    }
}

/// Call kinds that can be told to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum CallKind {
    List,
    Create,
    Update,
    Delete,
}

#[derive(Debug, Default)]
struct MockState {
    buckets: BTreeMap<String, BucketSettings>,
    calls: Vec<Call>,
    failures: VecDeque<(CallKind, u16, String)>,
}

/// In-memory backend for tests.
///
/// Mirrors the server's behavior closely enough for reconciliation tests:
/// creating an existing bucket, or updating/deleting a missing one, is
/// rejected.
#[derive(Debug, Clone, Default)]
pub struct MockBackend {
    state: Arc<Mutex<MockState>>,
}

impl MockBackend {
    /// Create an empty mock cluster.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mock cluster that already holds `buckets`.
    #[must_use]
    pub fn with_buckets(buckets: impl IntoIterator<Item = BucketSettings>) -> Self {
        let mock = Self::new();
        {
            let mut state = mock.lock();
            for bucket in buckets {
                state.buckets.insert(bucket.name.clone(), bucket);
            }
        }
        mock
    }

    /// Make the next call of `kind` fail with `status` and `body`.
    ///
    /// Queued failures are consumed in order.
    pub fn fail_next(&self, kind: CallKind, status: u16, body: impl Into<String>) {
        self.lock().failures.push_back((kind, status, body.into()));
    }

    /// All calls made so far, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<Call> {
        self.lock().calls.clone()
    }

    /// Calls other than listings, in order.
    #[must_use]
    pub fn mutations(&self) -> Vec<Call> {
        self.lock()
            .calls
            .iter()
            .filter(|c| !matches!(c, Call::List))
            .cloned()
            .collect()
    }

    /// Current settings of a bucket, if it exists.
    #[must_use]
    pub fn bucket(&self, name: &str) -> Option<BucketSettings> {
        self.lock().buckets.get(name).cloned()
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn record(&self, call: Call) -> Result<MutexGuard<'_, MockState>> {
        let mut state = self.lock();
        let kind = call.kind();
        let method = call.method();
        let path = call.path();
        state.calls.push(call);

        if let Some(pos) = state.failures.iter().position(|(k, _, _)| *k == kind) {
            let (_, status, body) = state.failures.remove(pos).unwrap_or((kind, 500, String::new()));
            return Err(Error::request_failed(method, path, Some(status), body));
        }
        Ok(state)
    }
}

impl Backend for MockBackend {
    fn list_buckets(&self) -> Result<Vec<BucketSettings>> {
        let state = self.record(Call::List)?;
        Ok(state.buckets.values().cloned().collect())
    }

    fn create_bucket(&self, settings: &BucketSettings) -> Result<()> {
        let mut state = self.record(Call::Create(settings.clone()))?;
        if state.buckets.contains_key(&settings.name) {
            return Err(Error::request_failed(
                "POST",
                BUCKETS_PATH,
                Some(400),
                r#"{"errors":{"name":"Bucket with given name already exists"}}"#,
            ));
        }
        state.buckets.insert(settings.name.clone(), settings.clone());
        Ok(())
    }

    fn update_bucket(&self, settings: &BucketSettings) -> Result<()> {
        let mut state = self.record(Call::Update(settings.clone()))?;
        match state.buckets.get_mut(&settings.name) {
            Some(existing) => {
                // Fields fixed at creation are silently kept, like the server does.
                let mut updated = settings.clone();
                updated.bucket_type = existing.bucket_type;
                updated.auth = existing.auth;
                updated.port = existing.port;
                *existing = updated;
                Ok(())
            }
            None => Err(Error::request_failed(
                "POST",
                bucket_path(&settings.name),
                Some(404),
                "Requested resource not found.",
            )),
        }
    }

    fn delete_bucket(&self, name: &str) -> Result<()> {
        let mut state = self.record(Call::Delete(name.to_string()))?;
        if state.buckets.remove(name).is_none() {
            return Err(Error::request_failed(
                "DELETE",
                bucket_path(name),
                Some(404),
                "Requested resource not found.",
            ));
        }
        Ok(())
    }
}
