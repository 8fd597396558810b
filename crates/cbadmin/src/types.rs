//! Bucket types shared by the REST layer and its callers.
//!
//! [`BucketSettings`] is the full property record of a bucket. It is what
//! gets POSTed on create/update and what a listing entry is mapped to.
//! [`RestBucket`] mirrors the subset of the listing JSON that is consumed.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Collection endpoint for buckets.
pub const BUCKETS_PATH: &str = "/pools/default/buckets";

/// Path of a single bucket.
///
/// The name is percent-encoded: the server decodes the path, so a raw `%`
/// in a name would address a different bucket.
#[must_use]
pub fn bucket_path(name: &str) -> String {
    format!("{BUCKETS_PATH}/{}", urlencoding::encode(name))
}

/// Default per-node RAM quota in megabytes.
pub const DEFAULT_RAM_QUOTA_MB: u64 = 64;
/// Default replica count.
pub const DEFAULT_REPLICA_NUMBER: u8 = 1;
/// Default reader/writer thread count.
pub const DEFAULT_THREADS_NUMBER: u8 = 3;

const BYTES_PER_MB: u64 = 1024 * 1024;

/// Kind of bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BucketType {
    /// In-memory cache bucket. Cannot be resized in place.
    #[default]
    Memcached,
    /// Persistent bucket. The REST API reports it as `membase`.
    Couchbase,
}

impl BucketType {
    /// Value sent in the `bucketType` form field.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Memcached => "memcached",
            Self::Couchbase => "couchbase",
        }
    }

    /// Parse the `bucketType` value of a listing entry.
    pub fn from_wire(value: &str) -> Option<Self> {
        match value {
            "memcached" => Some(Self::Memcached),
            "couchbase" | "membase" => Some(Self::Couchbase),
            _ => None,
        }
    }
}

impl fmt::Display for BucketType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BucketType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "memcached" => Ok(Self::Memcached),
            "couchbase" => Ok(Self::Couchbase),
            other => Err(format!(
                "unknown bucket type '{other}' (expected memcached or couchbase)"
            )),
        }
    }
}

/// Bucket authentication mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthType {
    /// No authentication.
    #[default]
    None,
    /// SASL authentication with `password`.
    Sasl,
}

impl AuthType {
    /// Value sent in the `authType` form field.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Sasl => "sasl",
        }
    }
}

impl fmt::Display for AuthType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AuthType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "none" => Ok(Self::None),
            "sasl" => Ok(Self::Sasl),
            other => Err(format!("unknown auth type '{other}' (expected none or sasl)")),
        }
    }
}

/// Full property record of a bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketSettings {
    /// Bucket name, unique cluster-wide.
    pub name: String,
    /// Bucket kind.
    #[serde(rename = "type")]
    pub bucket_type: BucketType,
    /// Authentication mode.
    pub auth: AuthType,
    /// SASL password.
    pub password: String,
    /// Whether "flush all" is enabled.
    pub flush_enabled: bool,
    /// Dedicated ASCII-protocol port. `None` means "not managed".
    pub port: Option<u16>,
    /// Whether replica indexes are built.
    pub replica_index: bool,
    /// Number of replica copies.
    pub replica_number: u8,
    /// Concurrent readers/writers.
    pub threads_number: u8,
    /// Per-node RAM quota in megabytes.
    pub ram_quota_mb: u64,
    /// Whether database and view files compact in parallel.
    pub parallel_compaction: bool,
}

impl BucketSettings {
    /// Settings with every property at its default.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            bucket_type: BucketType::default(),
            auth: AuthType::default(),
            password: String::new(),
            flush_enabled: false,
            port: None,
            replica_index: true,
            replica_number: DEFAULT_REPLICA_NUMBER,
            threads_number: DEFAULT_THREADS_NUMBER,
            ram_quota_mb: DEFAULT_RAM_QUOTA_MB,
            parallel_compaction: false,
        }
    }

    /// Form body for `POST /pools/default/buckets[/{name}]`.
    ///
    /// The admin API wants `1`/`0` for most booleans but the literal
    /// `true`/`false` for `parallelDBAndViewCompaction`. Keep it that way.
    #[must_use]
    pub fn to_form(&self) -> Vec<(&'static str, String)> {
        vec![
            ("name", self.name.clone()),
            ("bucketType", self.bucket_type.as_str().to_string()),
            ("authType", self.auth.as_str().to_string()),
            ("saslPassword", self.password.clone()),
            ("flushEnabled", flag(self.flush_enabled).to_string()),
            ("proxyPort", self.port.unwrap_or(0).to_string()),
            ("replicaIndex", flag(self.replica_index).to_string()),
            ("replicaNumber", self.replica_number.to_string()),
            ("threadsNumber", self.threads_number.to_string()),
            ("ramQuotaMB", self.ram_quota_mb.to_string()),
            (
                "parallelDBAndViewCompaction",
                self.parallel_compaction.to_string(),
            ),
        ]
    }
}

fn flag(value: bool) -> &'static str {
    if value { "1" } else { "0" }
}

// =============================================================================
// Listing response types
// =============================================================================

/// One element of `GET /pools/default/buckets`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
#[allow(missing_docs)]
pub struct RestBucket {
    pub name: String,
    /// `memcached` or `membase`.
    pub bucket_type: String,
    #[serde(default)]
    pub auth_type: Option<String>,
    #[serde(default)]
    pub sasl_password: Option<String>,
    #[serde(default)]
    pub controllers: RestControllers,
    #[serde(default)]
    pub proxy_port: Option<u16>,
    #[serde(default)]
    pub replica_index: Option<bool>,
    #[serde(default)]
    pub replica_number: Option<u8>,
    #[serde(default)]
    pub threads_number: Option<u8>,
    #[serde(default)]
    pub quota: RestQuota,
    /// `false`, `true`, or an object of custom settings.
    #[serde(default)]
    pub auto_compaction_settings: serde_json::Value,
}

/// Controller URIs of a bucket; `flush` is present only when flush is enabled.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RestControllers {
    /// URI of the flush controller.
    #[serde(default)]
    pub flush: Option<serde_json::Value>,
}

/// Quota block of a listing entry.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RestQuota {
    /// RAM quota in bytes (cluster-wide view of the per-node quota).
    #[serde(default)]
    pub ram: u64,
}

impl RestBucket {
    /// True when `autoCompactionSettings` reads as the literal `true`.
    ///
    /// The cluster reports `false` for default settings and an object for
    /// custom ones, so an object reads as `false` here even if it enables
    /// parallel compaction. Known brittle contract, kept on purpose.
    #[must_use]
    pub fn parallel_compaction(&self) -> bool {
        match &self.auto_compaction_settings {
            serde_json::Value::Bool(b) => *b,
            serde_json::Value::String(s) => s == "true",
            _ => false,
        }
    }
}

impl TryFrom<RestBucket> for BucketSettings {
    type Error = Error;

    fn try_from(rest: RestBucket) -> Result<Self> {
        let bucket_type = BucketType::from_wire(&rest.bucket_type).ok_or_else(|| {
            Error::InvalidResponse(format!(
                "bucket '{}' has unsupported type '{}'",
                rest.name, rest.bucket_type
            ))
        })?;
        let auth = match rest.auth_type.as_deref() {
            None => AuthType::None,
            Some(value) => value.parse().map_err(|e: String| {
                Error::InvalidResponse(format!("bucket '{}': {e}", rest.name))
            })?,
        };
        let parallel_compaction = rest.parallel_compaction();
        let defaults = BucketSettings::new(rest.name.clone());

        Ok(Self {
            bucket_type,
            auth,
            password: rest.sasl_password.unwrap_or_default(),
            flush_enabled: rest.controllers.flush.is_some_and(|f| !f.is_null()),
            port: rest.proxy_port,
            replica_index: rest.replica_index.unwrap_or(defaults.replica_index),
            replica_number: rest.replica_number.unwrap_or(defaults.replica_number),
            threads_number: rest.threads_number.unwrap_or(defaults.threads_number),
            ram_quota_mb: rest.quota.ram / BYTES_PER_MB,
            parallel_compaction,
            name: rest.name,
        })
    }
}

/// Parse a listing response body into bucket settings.
pub fn parse_listing(body: &str) -> Result<Vec<BucketSettings>> {
    let buckets: Vec<RestBucket> = serde_json::from_str(body)?;
    buckets.into_iter().map(BucketSettings::try_from).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const LISTING: &str = r#"[
        {
            "name": "cache1",
            "bucketType": "memcached",
            "authType": "sasl",
            "saslPassword": "s3cret",
            "proxyPort": 21212,
            "replicaIndex": false,
            "replicaNumber": 0,
            "threadsNumber": 3,
            "quota": { "ram": 134217728, "rawRAM": 134217728 },
            "autoCompactionSettings": false,
            "controllers": {
                "flush": "/pools/default/buckets/cache1/controller/doFlush"
            }
        },
        {
            "name": "store",
            "bucketType": "membase",
            "authType": "none",
            "saslPassword": "",
            "proxyPort": 0,
            "replicaIndex": true,
            "replicaNumber": 2,
            "threadsNumber": 8,
            "quota": { "ram": 268435456 },
            "autoCompactionSettings": true,
            "controllers": { "compactAll": "/x" }
        }
    ]"#;

    #[test]
    fn test_bucket_path() {
        assert_eq!(bucket_path("cache1"), "/pools/default/buckets/cache1");
        assert_eq!(bucket_path("cache-1.v2_x"), "/pools/default/buckets/cache-1.v2_x");
        assert_eq!(bucket_path("cache%41"), "/pools/default/buckets/cache%2541");
    }

    #[test]
    fn test_defaults() {
        let settings = BucketSettings::new("b");
        assert_eq!(settings.bucket_type, BucketType::Memcached);
        assert_eq!(settings.auth, AuthType::None);
        assert!(settings.password.is_empty());
        assert!(!settings.flush_enabled);
        assert_eq!(settings.port, None);
        assert!(settings.replica_index);
        assert_eq!(settings.replica_number, 1);
        assert_eq!(settings.threads_number, 3);
        assert_eq!(settings.ram_quota_mb, 64);
        assert!(!settings.parallel_compaction);
    }

    #[test]
    fn test_parse_listing() {
        let buckets = parse_listing(LISTING).unwrap();
        assert_eq!(buckets.len(), 2);

        let cache = &buckets[0];
        assert_eq!(cache.name, "cache1");
        assert_eq!(cache.bucket_type, BucketType::Memcached);
        assert_eq!(cache.auth, AuthType::Sasl);
        assert_eq!(cache.password, "s3cret");
        assert!(cache.flush_enabled);
        assert_eq!(cache.port, Some(21212));
        assert!(!cache.replica_index);
        assert_eq!(cache.replica_number, 0);
        assert_eq!(cache.ram_quota_mb, 128);
        assert!(!cache.parallel_compaction);

        let store = &buckets[1];
        assert_eq!(store.bucket_type, BucketType::Couchbase);
        assert!(!store.flush_enabled);
        assert_eq!(store.ram_quota_mb, 256);
        assert!(store.parallel_compaction);
    }

    #[test]
    fn test_ram_quota_integer_division() {
        let body = r#"[{"name":"b","bucketType":"memcached","quota":{"ram":134217729}}]"#;
        let buckets = parse_listing(body).unwrap();
        assert_eq!(buckets[0].ram_quota_mb, 128);
    }

    #[test]
    fn test_missing_fields_fall_back() {
        let body = r#"[{"name":"b","bucketType":"memcached"}]"#;
        let bucket = &parse_listing(body).unwrap()[0];
        assert_eq!(bucket.auth, AuthType::None);
        assert!(!bucket.flush_enabled);
        assert_eq!(bucket.port, None);
        assert!(bucket.replica_index);
        assert_eq!(bucket.replica_number, 1);
        assert_eq!(bucket.threads_number, 3);
        assert_eq!(bucket.ram_quota_mb, 0);
    }

    #[test]
    fn test_null_flush_controller_is_disabled() {
        let body = r#"[{"name":"b","bucketType":"memcached","controllers":{"flush":null}}]"#;
        assert!(!parse_listing(body).unwrap()[0].flush_enabled);
    }

    #[test]
    fn test_compaction_object_reads_as_false() {
        let body = r#"[{"name":"b","bucketType":"membase",
            "autoCompactionSettings":{"parallelDBAndViewCompaction":true}}]"#;
        assert!(!parse_listing(body).unwrap()[0].parallel_compaction);

        let body = r#"[{"name":"b","bucketType":"membase","autoCompactionSettings":"true"}]"#;
        assert!(parse_listing(body).unwrap()[0].parallel_compaction);
    }

    #[test]
    fn test_unknown_bucket_type_is_invalid_response() {
        let body = r#"[{"name":"b","bucketType":"ephemeral"}]"#;
        let err = parse_listing(body).unwrap_err();
        assert!(matches!(err, Error::InvalidResponse(msg) if msg.contains("ephemeral")));
    }

    #[test]
    fn test_unknown_auth_type_is_invalid_response() {
        let body = r#"[{"name":"b","bucketType":"memcached","authType":"ldap"}]"#;
        assert!(matches!(parse_listing(body), Err(Error::InvalidResponse(_))));
    }

    #[test]
    fn test_malformed_listing() {
        assert!(matches!(
            parse_listing("{\"not\":\"an array\"}"),
            Err(Error::InvalidResponse(_))
        ));
    }

    #[test]
    fn test_form_encoding() {
        let mut settings = BucketSettings::new("cache1");
        settings.port = Some(21212);
        settings.ram_quota_mb = 128;
        settings.flush_enabled = true;
        settings.parallel_compaction = true;

        let form = settings.to_form();
        let get = |key: &str| {
            form.iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| v.as_str())
                .unwrap()
        };

        assert_eq!(get("name"), "cache1");
        assert_eq!(get("bucketType"), "memcached");
        assert_eq!(get("authType"), "none");
        assert_eq!(get("saslPassword"), "");
        assert_eq!(get("flushEnabled"), "1");
        assert_eq!(get("proxyPort"), "21212");
        assert_eq!(get("replicaIndex"), "1");
        assert_eq!(get("replicaNumber"), "1");
        assert_eq!(get("threadsNumber"), "3");
        assert_eq!(get("ramQuotaMB"), "128");
        assert_eq!(get("parallelDBAndViewCompaction"), "true");
        assert_eq!(form.len(), 11);
    }

    #[test]
    fn test_form_unset_port_is_zero() {
        let mut settings = BucketSettings::new("b");
        settings.replica_index = false;
        let form = settings.to_form();
        assert!(form.contains(&("proxyPort", "0".to_string())));
        assert!(form.contains(&("replicaIndex", "0".to_string())));
        assert!(form.contains(&("parallelDBAndViewCompaction", "false".to_string())));
    }

    #[test]
    fn test_enum_parsing() {
        assert_eq!("couchbase".parse::<BucketType>(), Ok(BucketType::Couchbase));
        assert!("membase".parse::<BucketType>().is_err());
        assert_eq!(BucketType::from_wire("membase"), Some(BucketType::Couchbase));
        assert_eq!("sasl".parse::<AuthType>(), Ok(AuthType::Sasl));
        assert!("SASL".parse::<AuthType>().is_err());
    }
}
