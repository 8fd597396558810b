//! Bucket manifest schema
//!
//! Validates operator input and turns it into typed desired state. Every
//! value goes through [`validate`] as text first, whatever TOML type it was
//! written in, so `port = 21212` and `port = "21212"` are equivalent.
//!
//! ```toml
//! [buckets.cache1]
//! ensure = "present"
//! type = "memcached"
//! port = 21212
//! ram_quota_mb = 128
//! ```

use anyhow::{Context, Result};
use cbadmin::{AuthType, BucketSettings, BucketType};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

// ============================================================================
// Validation
// ============================================================================

/// A value that falls outside its field's domain.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error("invalid value '{value}' for {field}: {reason}")]
    InvalidValue {
        field: Field,
        value: String,
        reason: String,
    },
}

impl SchemaError {
    fn invalid(field: Field, value: &str, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            field,
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}

/// Declarable bucket fields, named as they appear in the manifest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Name,
    Ensure,
    Type,
    Auth,
    Password,
    FlushEnabled,
    Port,
    ReplicaIndex,
    ReplicaNumber,
    ThreadsNumber,
    RamQuotaMb,
    ParallelCompaction,
}

impl Field {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Ensure => "ensure",
            Self::Type => "type",
            Self::Auth => "auth",
            Self::Password => "password",
            Self::FlushEnabled => "flush_enabled",
            Self::Port => "port",
            Self::ReplicaIndex => "replica_index",
            Self::ReplicaNumber => "replica_number",
            Self::ThreadsNumber => "threads_number",
            Self::RamQuotaMb => "ram_quota_mb",
            Self::ParallelCompaction => "parallel_compaction",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

const BOOLEANS: &[&str] = &["true", "false"];

/// Check `value` against the domain of `field`.
///
/// Pure; no network I/O. An empty port means "unset" and is accepted.
pub fn validate(field: Field, value: &str) -> Result<(), SchemaError> {
    match field {
        Field::Name => validate_name(value),
        Field::Ensure => one_of(field, value, &["present", "absent"]),
        Field::Type => one_of(field, value, &["memcached", "couchbase"]),
        Field::Auth => one_of(field, value, &["none", "sasl"]),
        Field::FlushEnabled | Field::ReplicaIndex | Field::ParallelCompaction => {
            one_of(field, value, BOOLEANS)
        }
        Field::Password => Ok(()),
        Field::Port if value.is_empty() => Ok(()),
        Field::Port => in_range(field, value, 0, u64::from(u16::MAX)),
        Field::ReplicaNumber => in_range(field, value, 0, 3),
        Field::ThreadsNumber => in_range(field, value, 2, 8),
        Field::RamQuotaMb => in_range(field, value, 0, u64::MAX),
    }
}

fn one_of(field: Field, value: &str, allowed: &[&str]) -> Result<(), SchemaError> {
    if allowed.contains(&value) {
        Ok(())
    } else {
        Err(SchemaError::invalid(
            field,
            value,
            format!("expected one of {}", allowed.join(", ")),
        ))
    }
}

fn in_range(field: Field, value: &str, min: u64, max: u64) -> Result<(), SchemaError> {
    let reason = if max == u64::MAX {
        "expected a non-negative integer".to_string()
    } else {
        format!("expected an integer between {min} and {max}")
    };

    match value.parse::<u64>() {
        Ok(n) if (min..=max).contains(&n) => Ok(()),
        _ => Err(SchemaError::invalid(field, value, reason)),
    }
}

fn validate_name(value: &str) -> Result<(), SchemaError> {
    if value.is_empty() {
        return Err(SchemaError::invalid(Field::Name, value, "must not be empty"));
    }
    let valid = value
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '%' | '-'));
    if !valid {
        return Err(SchemaError::invalid(
            Field::Name,
            value,
            "only letters, digits, '.', '_', '%' and '-' are allowed",
        ));
    }
    Ok(())
}

// ============================================================================
// Desired State
// ============================================================================

/// Whether a bucket should exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Ensure {
    #[default]
    Present,
    Absent,
}

impl fmt::Display for Ensure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Present => f.write_str("present"),
            Self::Absent => f.write_str("absent"),
        }
    }
}

/// Validated declaration of one bucket, immutable for a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BucketDesiredState {
    pub ensure: Ensure,
    pub settings: BucketSettings,
}

impl BucketDesiredState {
    /// Desired state with every property at its default.
    pub fn present(name: impl Into<String>) -> Self {
        Self {
            ensure: Ensure::Present,
            settings: BucketSettings::new(name),
        }
    }

    /// Desired absence of `name`.
    pub fn absent(name: impl Into<String>) -> Self {
        Self {
            ensure: Ensure::Absent,
            settings: BucketSettings::new(name),
        }
    }

    pub fn name(&self) -> &str {
        &self.settings.name
    }
}

// ============================================================================
// Manifest
// ============================================================================

/// A manifest value as written: TOML integer, boolean or string.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum Scalar {
    Bool(bool),
    Int(i64),
    Text(String),
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawBucket {
    ensure: Option<Scalar>,
    #[serde(rename = "type")]
    bucket_type: Option<Scalar>,
    auth: Option<Scalar>,
    password: Option<Scalar>,
    flush_enabled: Option<Scalar>,
    port: Option<Scalar>,
    replica_index: Option<Scalar>,
    replica_number: Option<Scalar>,
    threads_number: Option<Scalar>,
    ram_quota_mb: Option<Scalar>,
    parallel_compaction: Option<Scalar>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawManifest {
    #[serde(default)]
    buckets: BTreeMap<String, RawBucket>,
}

/// Validate an optional value and parse it, or fall back to `default`.
fn field<T>(
    field: Field,
    value: Option<&Scalar>,
    default: T,
    parse: impl FnOnce(&str) -> Option<T>,
) -> Result<T, SchemaError> {
    let Some(value) = value else {
        return Ok(default);
    };
    let text = value.to_string();
    validate(field, &text)?;
    parse(&text).ok_or_else(|| SchemaError::invalid(field, &text, "could not be parsed"))
}

impl RawBucket {
    fn into_desired(self, name: &str) -> Result<BucketDesiredState, SchemaError> {
        validate(Field::Name, name)?;
        let mut desired = BucketDesiredState::present(name);

        desired.ensure = field(Field::Ensure, self.ensure.as_ref(), desired.ensure, |s| {
            match s {
                "present" => Some(Ensure::Present),
                "absent" => Some(Ensure::Absent),
                _ => None,
            }
        })?;

        let s = &mut desired.settings;
        s.bucket_type = field(Field::Type, self.bucket_type.as_ref(), s.bucket_type, |v| {
            BucketType::from_str(v).ok()
        })?;
        s.auth = field(Field::Auth, self.auth.as_ref(), s.auth, |v| {
            AuthType::from_str(v).ok()
        })?;
        if let Some(password) = &self.password {
            let text = password.to_string();
            validate(Field::Password, &text)?;
            s.password = text;
        }
        s.flush_enabled = field(
            Field::FlushEnabled,
            self.flush_enabled.as_ref(),
            s.flush_enabled,
            |v| v.parse().ok(),
        )?;
        s.port = field(Field::Port, self.port.as_ref(), s.port, |v| {
            if v.is_empty() {
                Some(None)
            } else {
                v.parse().ok().map(Some)
            }
        })?;
        s.replica_index = field(
            Field::ReplicaIndex,
            self.replica_index.as_ref(),
            s.replica_index,
            |v| v.parse().ok(),
        )?;
        s.replica_number = field(
            Field::ReplicaNumber,
            self.replica_number.as_ref(),
            s.replica_number,
            |v| v.parse().ok(),
        )?;
        s.threads_number = field(
            Field::ThreadsNumber,
            self.threads_number.as_ref(),
            s.threads_number,
            |v| v.parse().ok(),
        )?;
        s.ram_quota_mb = field(
            Field::RamQuotaMb,
            self.ram_quota_mb.as_ref(),
            s.ram_quota_mb,
            |v| v.parse().ok(),
        )?;
        s.parallel_compaction = field(
            Field::ParallelCompaction,
            self.parallel_compaction.as_ref(),
            s.parallel_compaction,
            |v| v.parse().ok(),
        )?;

        if s.auth != AuthType::Sasl && !s.password.is_empty() {
            log::warn!("bucket '{name}': password is ignored unless auth = \"sasl\"");
            s.password.clear();
        }

        Ok(desired)
    }
}

/// All buckets declared in a manifest, sorted by name.
#[derive(Debug, Clone, Default)]
pub struct Manifest {
    pub buckets: Vec<BucketDesiredState>,
}

impl Manifest {
    /// Load and validate a manifest file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Could not read manifest: {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("Invalid manifest: {}", path.display()))
    }

    /// Parse and validate manifest text.
    ///
    /// Fails on the first invalid declaration.
    pub fn parse(content: &str) -> Result<Self> {
        let raw: RawManifest = toml::from_str(content).context("Invalid TOML format")?;

        let mut buckets = Vec::with_capacity(raw.buckets.len());
        for (name, bucket) in raw.buckets {
            let desired = bucket
                .into_desired(&name)
                .with_context(|| format!("bucket '{name}'"))?;
            buckets.push(desired);
        }

        // BTreeMap iteration already yields names in order
        Ok(Self { buckets })
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    pub fn len(&self) -> usize {
        self.buckets.len()
    }
}

// ============================================================================
// Tests
// ============================================================================
