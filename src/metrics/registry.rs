//! Process-wide table of active metrics.
//!
//! Every handle lives under `compound_key(name, fingerprint(labels))`.
//! Gauges carry no fixed label values and are keyed with the empty label
//! set, so `unregister(name)` and `unregister_collector(name, {})` address
//! the same entry.
//!
//! Handles sharing a name form one exposition family. They must agree on
//! kind, help text and label names, otherwise the scrape would carry
//! duplicate series or conflicting metadata.
//!
//! All key transitions happen under the write lock. Scrapes take a snapshot
//! of the handles under the read lock and collect after releasing it, so a
//! slow value function never blocks registration and a handle removed
//! before the snapshot is never reported.

use std::collections::hash_map::Entry;
use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard};
use std::time::Duration;

use tracing::debug;

use super::handle::{DynamicCollector, MetricHandle, StaticGauge};
use crate::error::MetricsError;
use crate::labels::{Labels, compound_key, fingerprint};
use crate::utils::log_throttle::LogThrottle;

const DUPLICATE_LOG_WINDOW: Duration = Duration::from_secs(30);

/// What every handle registered under one name has in common.
#[derive(Debug, PartialEq)]
struct FamilySchema {
    kind: &'static str,
    help: String,
    label_names: BTreeSet<String>,
}

impl FamilySchema {
    fn of(handle: &MetricHandle) -> Self {
        let identity = handle.describe();
        let label_names = match handle {
            MetricHandle::Gauge(_) => identity.label_names.into_iter().collect(),
            MetricHandle::Collector(_) => identity.labels.into_keys().collect(),
        };
        Self {
            kind: handle.kind(),
            help: identity.help,
            label_names,
        }
    }

    /// Describes the first mismatch against `other`, if any.
    fn conflict_with(&self, other: &FamilySchema) -> Option<String> {
        if self.kind != other.kind {
            Some(format!("registered as a {}, not a {}", self.kind, other.kind))
        } else if self.help != other.help {
            Some(format!("registered with help '{}'", self.help))
        } else if self.label_names != other.label_names {
            Some(format!("registered with label names {:?}", self.label_names))
        } else {
            None
        }
    }
}

struct Family {
    schema: FamilySchema,
    members: usize,
}

#[derive(Default)]
struct Entries {
    metrics: HashMap<String, Arc<MetricHandle>>,
    families: HashMap<String, Family>,
}

/// Owns every registered metric handle.
pub struct MetricRegistry {
    entries: RwLock<Entries>,
    duplicate_logs: LogThrottle,
}

impl Default for MetricRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricRegistry {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(Entries::default()),
            duplicate_logs: LogThrottle::new(DUPLICATE_LOG_WINDOW),
        }
    }

    /// Registers a gauge with the given label dimensions.
    ///
    /// Returns `Ok(false)` without touching the registry if a gauge with
    /// this name is already registered, even if its dimensions differ.
    /// Fails with [`MetricsError::InconsistentFamily`] if collectors are
    /// registered under the same name.
    pub fn register_gauge(
        &self,
        name: &str,
        label_names: &[&str],
        help: &str,
    ) -> Result<bool, MetricsError> {
        let key = gauge_key(name);
        if self.read().metrics.contains_key(&key) {
            self.log_duplicate(name, &key);
            return Ok(false);
        }
        let gauge = StaticGauge::new(name, help, label_names)?;
        self.insert_if_absent(name, key, MetricHandle::Gauge(gauge))
    }

    /// Registers a collector whose value is computed by `value_fn` on every scrape.
    ///
    /// Returns `Ok(false)` if the same name and label set is already
    /// registered; `value_fn` is then dropped without being called.
    /// Other collectors under the same name must share the help text and
    /// label names, see [`MetricsError::InconsistentFamily`].
    pub fn register_collector<F>(
        &self,
        name: &str,
        labels: Labels,
        help: &str,
        value_fn: F,
    ) -> Result<bool, MetricsError>
    where
        F: Fn(&Labels) -> f64 + Send + Sync + 'static,
    {
        let key = compound_key(name, &fingerprint(&labels));
        if self.read().metrics.contains_key(&key) {
            self.log_duplicate(name, &key);
            return Ok(false);
        }
        let collector = DynamicCollector::new(name, help, labels, value_fn)?;
        self.insert_if_absent(name, key, MetricHandle::Collector(collector))
    }

    /// Removes the gauge registered under `name`. Returns whether anything was removed.
    pub fn unregister(&self, name: &str) -> bool {
        self.remove(name, gauge_key(name))
    }

    /// Removes the collector registered under `name` and `labels`.
    pub fn unregister_collector(&self, name: &str, labels: &Labels) -> bool {
        self.remove(name, compound_key(name, &fingerprint(labels)))
    }

    /// Increases the gauge series identified by `label_values` by one.
    pub fn increment(&self, name: &str, label_values: &Labels) -> Result<(), MetricsError> {
        let handle = self
            .read()
            .metrics
            .get(&gauge_key(name))
            .cloned()
            .ok_or_else(|| MetricsError::UnknownGauge(name.to_string()))?;

        match handle.as_ref() {
            MetricHandle::Gauge(gauge) => gauge.inc(label_values),
            MetricHandle::Collector(_) => Err(MetricsError::NotAGauge(name.to_string())),
        }
    }

    /// Current value of one gauge series, `None` if the gauge or the series does not exist.
    pub fn gauge_value(&self, name: &str, label_values: &Labels) -> Option<f64> {
        let entries = self.read();
        match entries.metrics.get(&gauge_key(name))?.as_ref() {
            MetricHandle::Gauge(gauge) => gauge.value(label_values),
            MetricHandle::Collector(_) => None,
        }
    }

    pub fn contains(&self, name: &str, labels: &Labels) -> bool {
        self.read()
            .metrics
            .contains_key(&compound_key(name, &fingerprint(labels)))
    }

    pub fn len(&self) -> usize {
        self.read().metrics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().metrics.is_empty()
    }

    /// Snapshot of every handle registered at the time of the call.
    pub fn handles(&self) -> Vec<Arc<MetricHandle>> {
        self.read().metrics.values().cloned().collect()
    }

    fn insert_if_absent(
        &self,
        name: &str,
        key: String,
        handle: MetricHandle,
    ) -> Result<bool, MetricsError> {
        let kind = handle.kind();
        let schema = FamilySchema::of(&handle);
        let inserted = {
            let mut guard = self.entries.write().unwrap_or_else(PoisonError::into_inner);
            let entries = &mut *guard;
            match entries.metrics.entry(key.clone()) {
                Entry::Occupied(_) => false,
                Entry::Vacant(slot) => {
                    match entries.families.entry(name.to_string()) {
                        Entry::Occupied(mut family) => {
                            if let Some(reason) = family.get().schema.conflict_with(&schema) {
                                return Err(MetricsError::InconsistentFamily {
                                    name: name.to_string(),
                                    reason,
                                });
                            }
                            family.get_mut().members += 1;
                        }
                        Entry::Vacant(family) => {
                            family.insert(Family { schema, members: 1 });
                        }
                    }
                    slot.insert(Arc::new(handle));
                    true
                }
            }
        };

        if inserted {
            debug!(
                event_name = "metrics.registry.registered",
                event_domain = "metrics",
                metric_name = name,
                metric_kind = kind,
                key = key.as_str(),
                "metric registered"
            );
        } else {
            // Lost a race against a concurrent registration of the same key.
            self.log_duplicate(name, &key);
        }
        Ok(inserted)
    }

    fn remove(&self, name: &str, key: String) -> bool {
        let removed = {
            let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
            let removed = entries.metrics.remove(&key).is_some();
            if removed {
                if let Entry::Occupied(mut family) = entries.families.entry(name.to_string()) {
                    family.get_mut().members -= 1;
                    if family.get().members == 0 {
                        family.remove();
                    }
                }
            }
            removed
        };
        if removed {
            self.duplicate_logs.forget(&key);
            debug!(
                event_name = "metrics.registry.unregistered",
                event_domain = "metrics",
                metric_name = name,
                key = key.as_str(),
                "metric unregistered"
            );
        }
        removed
    }

    fn log_duplicate(&self, name: &str, key: &str) {
        if let Some(suppressed_count) = self.duplicate_logs.should_emit(key) {
            debug!(
                event_name = "metrics.registry.duplicate",
                event_domain = "metrics",
                metric_name = name,
                key,
                suppressed_count,
                "metric already registered, registration ignored"
            );
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, Entries> {
        self.entries.read().unwrap_or_else(PoisonError::into_inner)
    }
}

fn gauge_key(name: &str) -> String {
    compound_key(name, &fingerprint(&Labels::new()))
}
