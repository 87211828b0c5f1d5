//! The two kinds of metric handle the registry can hold.

use std::collections::HashMap;
use std::fmt;

use prometheus::core::{Collector, Desc};
use prometheus::proto::{self, MetricFamily, MetricType};
use prometheus::{GaugeVec, Opts};

use crate::error::MetricsError;
use crate::labels::Labels;

/// Value-producing callback of a dynamic collector, invoked on every scrape.
pub type ValueFn = Box<dyn Fn(&Labels) -> f64 + Send + Sync>;

/// Name, help and label assignment of a registered metric.
#[derive(Clone, Debug, PartialEq)]
pub struct MetricIdentity {
    pub name: String,
    pub help: String,
    /// Fixed label assignment. Empty for gauges, whose values vary per call.
    pub labels: Labels,
    /// Declared label dimensions. Empty for dynamic collectors.
    pub label_names: Vec<String>,
}

/// A label-parameterized gauge whose value callers mutate directly.
pub struct StaticGauge {
    identity: MetricIdentity,
    vec: GaugeVec,
}

impl StaticGauge {
    pub fn new(name: &str, help: &str, label_names: &[&str]) -> Result<Self, MetricsError> {
        let vec = GaugeVec::new(Opts::new(name, help), label_names)?;
        Ok(Self {
            identity: MetricIdentity {
                name: name.to_string(),
                help: help.to_string(),
                labels: Labels::new(),
                label_names: label_names.iter().map(|s| s.to_string()).collect(),
            },
            vec,
        })
    }

    pub fn describe(&self) -> MetricIdentity {
        self.identity.clone()
    }

    /// Increases the value of the series identified by `label_values` by one.
    /// The series starts at zero the first time it is touched.
    pub fn inc(&self, label_values: &Labels) -> Result<(), MetricsError> {
        let values: HashMap<&str, &str> = label_values
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();
        self.vec.get_metric_with(&values)?.inc();
        Ok(())
    }

    /// Current value of one series, or `None` if it was never touched.
    /// Reading does not create the series.
    pub fn value(&self, label_values: &Labels) -> Option<f64> {
        self.vec
            .collect()
            .iter()
            .flat_map(|family| family.get_metric())
            .find(|metric| {
                let pairs = metric.get_label();
                pairs.len() == label_values.len()
                    && pairs.iter().all(|pair| {
                        label_values.get(pair.get_name()).map(String::as_str)
                            == Some(pair.get_value())
                    })
            })
            .map(|metric| metric.get_gauge().get_value())
    }
}

impl Collector for StaticGauge {
    fn desc(&self) -> Vec<&Desc> {
        self.vec.desc()
    }

    fn collect(&self) -> Vec<MetricFamily> {
        self.vec.collect()
    }
}

/// A metric whose value is computed by a caller-supplied function at scrape time.
///
/// Nothing is cached: every collection calls the function again with the
/// handle's fixed label assignment. A panicking function is not caught.
pub struct DynamicCollector {
    identity: MetricIdentity,
    desc: Desc,
    value_fn: ValueFn,
}

impl DynamicCollector {
    pub fn new<F>(name: &str, help: &str, labels: Labels, value_fn: F) -> Result<Self, MetricsError>
    where
        F: Fn(&Labels) -> f64 + Send + Sync + 'static,
    {
        let desc = Desc::new(name.to_string(), help.to_string(), vec![], labels.clone())?;
        Ok(Self {
            identity: MetricIdentity {
                name: name.to_string(),
                help: help.to_string(),
                labels,
                label_names: Vec::new(),
            },
            desc,
            value_fn: Box::new(value_fn),
        })
    }

    pub fn describe(&self) -> MetricIdentity {
        self.identity.clone()
    }

    /// Invokes the value function and pairs the result with the identity.
    pub fn sample(&self) -> (MetricIdentity, f64) {
        (self.describe(), (self.value_fn)(&self.identity.labels))
    }
}

impl fmt::Debug for DynamicCollector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DynamicCollector")
            .field("identity", &self.identity)
            .finish_non_exhaustive()
    }
}

impl Collector for DynamicCollector {
    fn desc(&self) -> Vec<&Desc> {
        vec![&self.desc]
    }

    fn collect(&self) -> Vec<MetricFamily> {
        let value = (self.value_fn)(&self.identity.labels);

        let mut gauge = proto::Gauge::default();
        gauge.set_value(value);

        let mut metric = proto::Metric::default();
        // Desc keeps const label pairs sorted by name.
        metric.set_label(self.desc.const_label_pairs.clone().into());
        metric.set_gauge(gauge);

        let mut family = MetricFamily::default();
        family.set_name(self.desc.fq_name.clone());
        family.set_help(self.desc.help.clone());
        family.set_field_type(MetricType::GAUGE);
        family.set_metric(vec![metric].into());
        vec![family]
    }
}

/// A registered metric, selected at registration time.
pub enum MetricHandle {
    Gauge(StaticGauge),
    Collector(DynamicCollector),
}

impl MetricHandle {
    pub fn describe(&self) -> MetricIdentity {
        match self {
            MetricHandle::Gauge(gauge) => gauge.describe(),
            MetricHandle::Collector(collector) => collector.describe(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            MetricHandle::Gauge(_) => "gauge",
            MetricHandle::Collector(_) => "collector",
        }
    }
}

impl Collector for MetricHandle {
    fn desc(&self) -> Vec<&Desc> {
        match self {
            MetricHandle::Gauge(gauge) => gauge.desc(),
            MetricHandle::Collector(collector) => collector.desc(),
        }
    }

    fn collect(&self) -> Vec<MetricFamily> {
        match self {
            MetricHandle::Gauge(gauge) => gauge.collect(),
            MetricHandle::Collector(collector) => collector.collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::labels::labels_from;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn collector_reports_value_and_fixed_labels() {
        let collector = DynamicCollector::new(
            "queue_depth",
            "Jobs waiting in the queue",
            labels_from([("queue", "default")]),
            |_| 7.0,
        )
        .unwrap();

        let (identity, value) = collector.sample();
        assert_eq!(identity.name, "queue_depth");
        assert_eq!(identity.labels.get("queue").map(String::as_str), Some("default"));
        assert_eq!(value, 7.0);

        let families = Collector::collect(&collector);
        assert_eq!(families.len(), 1);
        let family = &families[0];
        assert_eq!(family.get_name(), "queue_depth");
        assert_eq!(family.get_field_type(), MetricType::GAUGE);
        let metric = &family.get_metric()[0];
        assert_eq!(metric.get_label()[0].get_name(), "queue");
        assert_eq!(metric.get_label()[0].get_value(), "default");
        assert_eq!(metric.get_gauge().get_value(), 7.0);
    }

    #[test]
    fn collector_calls_value_fn_on_every_collection() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counted = calls.clone();
        let collector = DynamicCollector::new("ticks", "Ticks", Labels::new(), move |_| {
            counted.fetch_add(1, Ordering::SeqCst) as f64
        })
        .unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 0);
        Collector::collect(&collector);
        Collector::collect(&collector);
        let (_, value) = collector.sample();
        assert_eq!(value, 2.0);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn collector_passes_its_labels_to_the_value_fn() {
        let collector = DynamicCollector::new(
            "worker_load",
            "Load per worker",
            labels_from([("worker", "3")]),
            |labels| labels["worker"].parse::<f64>().unwrap_or(-1.0),
        )
        .unwrap();
        assert_eq!(collector.sample().1, 3.0);
    }

    #[test]
    #[should_panic(expected = "value source gone")]
    fn collector_panics_propagate() {
        let collector =
            DynamicCollector::new("broken", "Broken", Labels::new(), |_| panic!("value source gone"))
                .unwrap();
        Collector::collect(&collector);
    }

    #[test]
    fn collector_rejects_invalid_names() {
        let result = DynamicCollector::new("bad name", "help", Labels::new(), |_| 0.0);
        assert!(matches!(result, Err(MetricsError::Prometheus(_))));
    }

    #[test]
    fn gauge_series_start_at_zero_and_increment_independently() {
        let gauge = StaticGauge::new("requests", "Requests seen", &["method"]).unwrap();
        let get = labels_from([("method", "GET")]);
        let post = labels_from([("method", "POST")]);

        assert_eq!(gauge.value(&get), None);
        gauge.inc(&get).unwrap();
        gauge.inc(&get).unwrap();
        gauge.inc(&post).unwrap();

        assert_eq!(gauge.value(&get), Some(2.0));
        assert_eq!(gauge.value(&post), Some(1.0));
        assert_eq!(gauge.value(&labels_from([("method", "PUT")])), None);
    }

    #[test]
    fn gauge_rejects_wrong_label_dimensions() {
        let gauge = StaticGauge::new("requests", "Requests seen", &["method"]).unwrap();
        let result = gauge.inc(&labels_from([("verb", "GET")]));
        assert!(matches!(result, Err(MetricsError::Prometheus(_))));
    }

    #[test]
    fn handle_describes_its_variant() {
        let gauge = MetricHandle::Gauge(
            StaticGauge::new("requests", "Requests seen", &["method", "code"]).unwrap(),
        );
        let identity = gauge.describe();
        assert_eq!(gauge.kind(), "gauge");
        assert_eq!(identity.label_names, vec!["method", "code"]);
        assert!(identity.labels.is_empty());
    }
}
