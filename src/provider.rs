//! Bucket provider: reconciles one declared bucket against the cluster
//!
//! A reconciliation pass lists the cluster once ([`list_all`]), pairs each
//! declaration with what was observed ([`prefetch`]) and then lets every
//! [`BucketProvider`] issue the REST calls its bucket needs.
//!
//! Properties differ in how they can change:
//!
//! | Property | Effect on divergence |
//! |---|---|
//! | type, auth, port | recreate |
//! | ram_quota_mb | recreate on memcached buckets, update otherwise |
//! | everything else | update in place |
//!
//! A recreate deletes the bucket and all of its data.

use cbadmin::{AuthType, Backend, BucketSettings, BucketType};
use declarative::{ApplyResult, PropertyChange};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

use crate::schema::{BucketDesiredState, Ensure};

/// Errors from applying a provider's changes.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error(transparent)]
    Request(#[from] cbadmin::Error),

    #[error(
        "recreating bucket '{name}' failed after it was deleted: {source} ({})",
        restore_note(.restored)
    )]
    RecreateFailed {
        name: String,
        #[source]
        source: cbadmin::Error,
        restored: bool,
    },
}

fn restore_note(restored: &bool) -> &'static str {
    if *restored {
        "previous bucket restored"
    } else {
        "previous bucket could not be restored"
    }
}

// ============================================================================
// Mutation policy
// ============================================================================

/// A managed bucket property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Property {
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

impl Property {
    pub const ALL: [Self; 10] = [
        Self::Type,
        Self::Auth,
        Self::Password,
        Self::FlushEnabled,
        Self::Port,
        Self::ReplicaIndex,
        Self::ReplicaNumber,
        Self::ThreadsNumber,
        Self::RamQuotaMb,
        Self::ParallelCompaction,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
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

    /// What changing this property takes, given the bucket's current type.
    pub fn effect(&self, current_type: BucketType) -> Effect {
        match self {
            Self::Type | Self::Auth | Self::Port => Effect::Recreate,
            // memcached buckets cannot be resized in place
            Self::RamQuotaMb if current_type == BucketType::Memcached => Effect::Recreate,
            Self::RamQuotaMb
            | Self::Password
            | Self::FlushEnabled
            | Self::ReplicaIndex
            | Self::ReplicaNumber
            | Self::ThreadsNumber
            | Self::ParallelCompaction => Effect::Update,
        }
    }

    /// Whether `observed` differs from `desired` on this property.
    ///
    /// An unset desired port is not managed and never differs. The password
    /// only counts for SASL buckets; the cluster keeps none otherwise.
    pub fn differs(&self, desired: &BucketSettings, observed: &BucketSettings) -> bool {
        match self {
            Self::Type => desired.bucket_type != observed.bucket_type,
            Self::Auth => desired.auth != observed.auth,
            Self::Password => {
                desired.auth == AuthType::Sasl && desired.password != observed.password
            }
            Self::FlushEnabled => desired.flush_enabled != observed.flush_enabled,
            Self::Port => desired
                .port
                .is_some_and(|port| observed.port.unwrap_or(0) != port),
            Self::ReplicaIndex => desired.replica_index != observed.replica_index,
            Self::ReplicaNumber => desired.replica_number != observed.replica_number,
            Self::ThreadsNumber => desired.threads_number != observed.threads_number,
            Self::RamQuotaMb => desired.ram_quota_mb != observed.ram_quota_mb,
            Self::ParallelCompaction => desired.parallel_compaction != observed.parallel_compaction,
        }
    }

    /// Display value of this property in `settings`.
    pub fn value(&self, settings: &BucketSettings) -> String {
        match self {
            Self::Type => settings.bucket_type.to_string(),
            Self::Auth => settings.auth.to_string(),
            Self::Password if settings.password.is_empty() => "(empty)".to_string(),
            Self::Password => "********".to_string(),
            Self::FlushEnabled => settings.flush_enabled.to_string(),
            Self::Port => settings
                .port
                .map_or_else(|| "(unset)".to_string(), |p| p.to_string()),
            Self::ReplicaIndex => settings.replica_index.to_string(),
            Self::ReplicaNumber => settings.replica_number.to_string(),
            Self::ThreadsNumber => settings.threads_number.to_string(),
            Self::RamQuotaMb => settings.ram_quota_mb.to_string(),
            Self::ParallelCompaction => settings.parallel_compaction.to_string(),
        }
    }
}

impl fmt::Display for Property {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// REST calls needed to bring a property in line. Ordered by strength.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Effect {
    /// Re-post the full settings to the bucket path.
    Update,
    /// Delete the bucket, then create it with the full settings.
    Recreate,
}

// ============================================================================
// Discovery
// ============================================================================

/// List every bucket on the cluster. One GET per call.
pub fn list_all(backend: &dyn Backend) -> cbadmin::Result<Vec<BucketSettings>> {
    let buckets = backend.list_buckets()?;
    log::debug!("Discovered {} buckets", buckets.len());
    Ok(buckets)
}

/// Pair each declared bucket with its observed counterpart.
///
/// With `purge`, observed buckets nobody declared get a provider that
/// removes them.
pub fn prefetch(
    backend: &Arc<dyn Backend>,
    declared: Vec<BucketDesiredState>,
    observed: Vec<BucketSettings>,
    purge: bool,
) -> Vec<BucketProvider> {
    let mut observed: HashMap<String, BucketSettings> = observed
        .into_iter()
        .map(|bucket| (bucket.name.clone(), bucket))
        .collect();

    let mut providers: Vec<BucketProvider> = declared
        .into_iter()
        .map(|desired| {
            let current = observed.remove(desired.name());
            BucketProvider::new(Arc::clone(backend), desired, current)
        })
        .collect();

    if purge {
        let mut undeclared: Vec<BucketSettings> = observed.into_values().collect();
        undeclared.sort_by(|a, b| a.name.cmp(&b.name));
        for bucket in undeclared {
            log::info!("Bucket '{}' is not declared and will be purged", bucket.name);
            let desired = BucketDesiredState::absent(bucket.name.clone());
            providers.push(BucketProvider::new(Arc::clone(backend), desired, Some(bucket)));
        }
    }

    providers
}

// ============================================================================
// Provider
// ============================================================================

/// What the provider believes about its bucket during one pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkingRecord {
    pub ensure: Ensure,
    pub observed: Option<BucketSettings>,
}

impl WorkingRecord {
    fn from_observed(observed: Option<BucketSettings>) -> Self {
        Self {
            ensure: if observed.is_some() {
                Ensure::Present
            } else {
                Ensure::Absent
            },
            observed,
        }
    }
}

/// Reconciler for a single bucket.
pub struct BucketProvider {
    backend: Arc<dyn Backend>,
    desired: BucketDesiredState,
    record: WorkingRecord,
}

impl fmt::Debug for BucketProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BucketProvider")
            .field("desired", &self.desired)
            .field("record", &self.record)
            .finish_non_exhaustive()
    }
}

impl BucketProvider {
    pub fn new(
        backend: Arc<dyn Backend>,
        desired: BucketDesiredState,
        observed: Option<BucketSettings>,
    ) -> Self {
        Self {
            backend,
            desired,
            record: WorkingRecord::from_observed(observed),
        }
    }

    pub fn name(&self) -> &str {
        self.desired.name()
    }

    pub fn desired(&self) -> &BucketDesiredState {
        &self.desired
    }

    pub fn record(&self) -> &WorkingRecord {
        &self.record
    }

    /// Whether the bucket is believed to exist. No I/O.
    pub fn exists(&self) -> bool {
        self.record.ensure == Ensure::Present
    }

    /// Type the bucket has now, falling back to the declared one.
    fn current_type(&self) -> BucketType {
        self.record
            .observed
            .as_ref()
            .map_or(self.desired.settings.bucket_type, |o| o.bucket_type)
    }

    /// Properties whose observed value differs from the declared one.
    ///
    /// Empty when the bucket is not observed.
    pub fn divergent(&self) -> Vec<Property> {
        let Some(observed) = &self.record.observed else {
            return Vec::new();
        };
        Property::ALL
            .into_iter()
            .filter(|p| p.differs(&self.desired.settings, observed))
            .collect()
    }

    /// Divergent properties with their current and desired values.
    pub fn changes(&self) -> Vec<PropertyChange> {
        let Some(observed) = &self.record.observed else {
            return Vec::new();
        };
        self.divergent()
            .into_iter()
            .map(|p| PropertyChange::new(p.as_str(), p.value(observed), p.value(&self.desired.settings)))
            .collect()
    }

    /// Strongest effect needed for `properties`, if any.
    pub fn effect_of(&self, properties: &[Property]) -> Option<Effect> {
        let current_type = self.current_type();
        properties.iter().map(|p| p.effect(current_type)).max()
    }

    /// Create the bucket with the full declared settings.
    ///
    /// Posts to the bucket collection when the bucket is believed absent and
    /// to the bucket's own path otherwise, which updates it in place.
    pub fn create(&mut self) -> Result<(), ProviderError> {
        let settings = &self.desired.settings;
        if self.exists() {
            log::info!("Updating bucket '{}'", settings.name);
            self.backend.update_bucket(settings)?;
        } else {
            log::info!("Creating bucket '{}'", settings.name);
            self.backend.create_bucket(settings)?;
        }
        self.record.ensure = Ensure::Present;
        self.record.observed = Some(settings.clone());
        Ok(())
    }

    /// Delete the bucket and its data. Not idempotent: check [`Self::exists`] first.
    pub fn destroy(&mut self) -> Result<(), ProviderError> {
        log::info!("Deleting bucket '{}'", self.name());
        self.backend.delete_bucket(self.desired.name())?;
        self.record.ensure = Ensure::Absent;
        self.record.observed = None;
        Ok(())
    }

    /// Bring one property in line.
    pub fn set_property(&mut self, property: Property) -> Result<Effect, ProviderError> {
        let effect = property.effect(self.current_type());
        self.apply_effect(effect)?;
        Ok(effect)
    }

    /// Bring several properties in line with a single effect.
    ///
    /// Every call posts the full settings, so the setter of the property
    /// with the strongest effect fixes all of them. Mixing both kinds still
    /// results in one delete and one create.
    pub fn sync(&mut self, properties: &[Property]) -> Result<Option<Effect>, ProviderError> {
        let current_type = self.current_type();
        let Some(strongest) = properties.iter().copied().max_by_key(|p| p.effect(current_type))
        else {
            return Ok(None);
        };
        log::debug!(
            "Bucket '{}': {} via {} for {}",
            self.name(),
            match strongest.effect(current_type) {
                Effect::Update => "update",
                Effect::Recreate => "recreate",
            },
            strongest,
            properties
                .iter()
                .map(Property::as_str)
                .collect::<Vec<_>>()
                .join(", ")
        );
        self.set_property(strongest).map(Some)
    }

    fn apply_effect(&mut self, effect: Effect) -> Result<(), ProviderError> {
        match effect {
            Effect::Update => self.create(),
            Effect::Recreate => self.recreate(),
        }
    }

    /// Delete, then create with the declared settings.
    ///
    /// If the create fails, one attempt is made to put the previous bucket
    /// back. The data is gone either way.
    fn recreate(&mut self) -> Result<(), ProviderError> {
        let pre_image = self.record.observed.clone();
        if self.exists() {
            self.destroy()?;
        }

        let source = match self.create() {
            Ok(()) => return Ok(()),
            Err(ProviderError::Request(e)) => e,
            Err(other) => return Err(other),
        };

        let restored = match pre_image {
            Some(previous) => {
                log::warn!(
                    "Creating bucket '{}' failed, restoring previous settings",
                    previous.name
                );
                match self.backend.create_bucket(&previous) {
                    Ok(()) => {
                        self.record.ensure = Ensure::Present;
                        self.record.observed = Some(previous);
                        true
                    }
                    Err(e) => {
                        log::warn!("Restoring bucket '{}' failed: {e}", previous.name);
                        false
                    }
                }
            }
            None => false,
        };

        Err(ProviderError::RecreateFailed {
            name: self.name().to_string(),
            source,
            restored,
        })
    }

    /// Converge the bucket to its declared state.
    ///
    /// A dry run reports [`ApplyResult::Skipped`] for pending work and
    /// performs no I/O.
    pub fn reconcile(&mut self, dry_run: bool) -> Result<ApplyResult, ProviderError> {
        let pending = match (self.desired.ensure, self.exists()) {
            (Ensure::Present, false) | (Ensure::Absent, true) => true,
            (Ensure::Present, true) => !self.divergent().is_empty(),
            (Ensure::Absent, false) => false,
        };
        if !pending {
            return Ok(ApplyResult::NoChange);
        }
        if dry_run {
            return Ok(ApplyResult::Skipped {
                reason: "Dry run".into(),
            });
        }

        match (self.desired.ensure, self.exists()) {
            (Ensure::Present, false) => {
                self.create()?;
                Ok(ApplyResult::Created)
            }
            (Ensure::Absent, _) => {
                self.destroy()?;
                Ok(ApplyResult::Removed)
            }
            (Ensure::Present, true) => {
                let divergent = self.divergent();
                match self.sync(&divergent)? {
                    Some(Effect::Recreate) => Ok(ApplyResult::Recreated),
                    Some(Effect::Update) => Ok(ApplyResult::Modified),
                    None => Ok(ApplyResult::NoChange),
                }
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
