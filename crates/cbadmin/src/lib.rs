//! # cbadmin
//!
//! Blocking client for the bucket lifecycle part of the Couchbase cluster
//! administration REST API.
//!
//! This crate provides:
//! - Connection settings, including the `/opt/couchbase/.cb.cnf` defaults file
//! - The [`BucketSettings`] record and its wire mapping (listing JSON in,
//!   form body out)
//! - A [`Backend`] trait with an HTTP implementation and an in-memory mock
//!
//! It does not speak the data protocol and knows nothing about
//! multi-node topology.
//!
//! ## Example
//!
//! ```no_run
//! use cbadmin::{Client, ConnectionConfig, config::DEFAULTS_FILE};
//! use std::path::Path;
//!
//! let config = ConnectionConfig::load(Path::new(DEFAULTS_FILE)).expect("unreadable defaults file");
//! let client = Client::new(&config);
//!
//! for bucket in client.list_buckets().expect("listing failed") {
//!     println!("{} ({}, {} MB)", bucket.name, bucket.bucket_type, bucket.ram_quota_mb);
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod backend;
pub mod config;
pub mod error;
pub mod types;

pub use backend::{Backend, Call, CallKind, MockBackend};
pub use config::ConnectionConfig;
pub use error::{Error, ErrorCategory, Result};
pub use types::{AuthType, BucketSettings, BucketType};

use backend::http::HttpBackend;
use std::sync::Arc;

/// High-level client for bucket administration.
///
/// Wraps a shared backend so it can be handed to several reconcilers.
#[derive(Clone)]
pub struct Client {
    backend: Arc<dyn Backend>,
}

impl Client {
    /// Create a client talking HTTP to the configured cluster.
    #[must_use]
    pub fn new(config: &ConnectionConfig) -> Self {
        Self {
            backend: Arc::new(HttpBackend::new(config)),
        }
    }

    /// Create a client with a custom backend (useful for testing).
    pub fn with_backend(backend: Arc<dyn Backend>) -> Self {
        Self { backend }
    }

    /// Shared handle to the backend.
    #[must_use]
    pub fn backend(&self) -> Arc<dyn Backend> {
        Arc::clone(&self.backend)
    }

    /// List every bucket on the cluster.
    pub fn list_buckets(&self) -> Result<Vec<BucketSettings>> {
        self.backend.list_buckets()
    }
}
