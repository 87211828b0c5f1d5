//! Scrape-time serialization of the registry.

use std::collections::BTreeMap;

use prometheus::core::Collector;
use prometheus::proto::{LabelPair, Metric, MetricFamily};
use prometheus::{Encoder, TextEncoder};

use super::registry::MetricRegistry;
use crate::error::MetricsError;

/// Collects every handle registered at the time of the call.
///
/// Dynamic collectors compute their value here. Families sharing a name
/// (one collector per label set) are merged; the registry guarantees they
/// agree on type, help and label names. Output is sorted by family name,
/// then by label pairs.
pub fn gather(registry: &MetricRegistry) -> Vec<MetricFamily> {
    let mut families: BTreeMap<String, MetricFamily> = BTreeMap::new();

    for handle in registry.handles() {
        for family in handle.collect() {
            match families.get_mut(family.get_name()) {
                Some(existing) => {
                    for metric in family.get_metric() {
                        existing.mut_metric().push(metric.clone());
                    }
                }
                None => {
                    families.insert(family.get_name().to_string(), family);
                }
            }
        }
    }

    families
        .into_values()
        .filter(|family| !family.get_metric().is_empty())
        .map(|mut family| {
            family
                .mut_metric()
                .sort_by(|a, b| label_values(a).cmp(&label_values(b)));
            family
        })
        .collect()
}

/// Renders all metrics in Prometheus text format.
pub fn render(registry: &MetricRegistry) -> Result<String, MetricsError> {
    let families = gather(registry);
    let mut buffer = Vec::new();
    TextEncoder::new()
        .encode(&families, &mut buffer)
        .map_err(|e| MetricsError::Encoding(e.to_string()))?;
    String::from_utf8(buffer).map_err(|e| MetricsError::Encoding(e.to_string()))
}

fn label_values(metric: &Metric) -> Vec<(&str, &str)> {
    metric
        .get_label()
        .iter()
        .map(|pair: &LabelPair| (pair.get_name(), pair.get_value()))
        .collect()
}
