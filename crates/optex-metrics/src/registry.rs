//! Metric registry — name → definition, in registration order.
//!
//! The registry is filled once during startup and only read afterwards, so
//! it carries no locking of its own; share it behind an `Arc`.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::error::{MetricsError, MetricsResult};
use crate::sample::SeriesData;

/// Computes a metric's data on demand at scrape time.
///
/// Called with the metric name. `Ok(None)` means "no data".
pub type DataCallback =
    Arc<dyn Fn(&str) -> anyhow::Result<Option<SeriesData>> + Send + Sync>;

/// Metadata for one registered metric.
#[derive(Clone, Default)]
pub struct MetricDefinition {
    /// Text after `# HELP <name> `.
    pub help: Option<String>,
    /// Text after `# TYPE <name> `, e.g. "counter" or "gauge".
    pub metric_type: Option<String>,
    /// Stamp every update with the time its handle was created.
    pub has_timestamp: bool,
    /// When set, data is computed by this callback and never stored.
    pub data_callback: Option<DataCallback>,
}

impl MetricDefinition {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn counter(help: impl Into<String>) -> Self {
        Self::new().help(help).metric_type("counter")
    }

    pub fn gauge(help: impl Into<String>) -> Self {
        Self::new().help(help).metric_type("gauge")
    }

    pub fn help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    pub fn metric_type(mut self, metric_type: impl Into<String>) -> Self {
        self.metric_type = Some(metric_type.into());
        self
    }

    pub fn with_timestamp(mut self) -> Self {
        self.has_timestamp = true;
        self
    }

    pub fn data_callback<F>(mut self, callback: F) -> Self
    where
        F: Fn(&str) -> anyhow::Result<Option<SeriesData>> + Send + Sync + 'static,
    {
        self.data_callback = Some(Arc::new(callback));
        self
    }

    pub fn is_computed(&self) -> bool {
        self.data_callback.is_some()
    }
}

impl fmt::Debug for MetricDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MetricDefinition")
            .field("help", &self.help)
            .field("metric_type", &self.metric_type)
            .field("has_timestamp", &self.has_timestamp)
            .field("data_callback", &self.data_callback.is_some())
            .finish()
    }
}

/// Table of registered metrics.
#[derive(Debug, Default)]
pub struct Registry {
    /// Definitions in registration order.
    metrics: Vec<(String, MetricDefinition)>,
    /// name → index into `metrics`.
    index: HashMap<String, usize>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a metric, replacing any earlier definition under `name`.
    ///
    /// A replaced metric keeps its original position in render order.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        definition: MetricDefinition,
    ) -> MetricsResult<()> {
        let name = name.into();
        if name.is_empty() {
            return Err(MetricsError::InvalidMetric(
                "metric name must not be empty".to_string(),
            ));
        }

        match self.index.get(&name) {
            Some(&i) => {
                debug!(metric = %name, "metric re-registered");
                self.metrics[i].1 = definition;
            }
            None => {
                debug!(metric = %name, computed = definition.is_computed(), "metric registered");
                self.index.insert(name.clone(), self.metrics.len());
                self.metrics.push((name, definition));
            }
        }
        Ok(())
    }

    /// Look up a metric's definition.
    pub fn lookup(&self, name: &str) -> MetricsResult<&MetricDefinition> {
        self.index
            .get(name)
            .map(|&i| &self.metrics[i].1)
            .ok_or_else(|| MetricsError::UnregisteredMetric(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.metrics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.metrics.is_empty()
    }

    /// Iterate `(name, definition)` in registration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &MetricDefinition)> {
        self.metrics.iter().map(|(name, def)| (name.as_str(), def))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_and_lookup() {
        let mut registry = Registry::new();
        registry
            .register("http_requests_total", MetricDefinition::counter("Requests"))
            .unwrap();

        let def = registry.lookup("http_requests_total").unwrap();
        assert_eq!(def.help.as_deref(), Some("Requests"));
        assert_eq!(def.metric_type.as_deref(), Some("counter"));
        assert!(!def.has_timestamp);
        assert!(!def.is_computed());
    }

    #[test]
    fn lookup_unknown_fails() {
        let registry = Registry::new();
        let err = registry.lookup("missing").unwrap_err();
        assert!(matches!(err, MetricsError::UnregisteredMetric(name) if name == "missing"));
    }

    #[test]
    fn empty_name_rejected() {
        let mut registry = Registry::new();
        let err = registry.register("", MetricDefinition::new()).unwrap_err();
        assert!(matches!(err, MetricsError::InvalidMetric(_)));
        assert!(registry.is_empty());
    }

    #[test]
    fn reregistration_overwrites_in_place() {
        let mut registry = Registry::new();
        registry.register("a", MetricDefinition::gauge("first")).unwrap();
        registry.register("b", MetricDefinition::new()).unwrap();
        registry.register("a", MetricDefinition::gauge("second")).unwrap();

        assert_eq!(registry.len(), 2);
        let names: Vec<_> = registry.iter().map(|(name, _)| name).collect();
        assert_eq!(names, ["a", "b"]);
        assert_eq!(registry.lookup("a").unwrap().help.as_deref(), Some("second"));
    }

    #[test]
    fn iteration_follows_registration_order() {
        let mut registry = Registry::new();
        for name in ["zeta", "alpha", "mid"] {
            registry.register(name, MetricDefinition::new()).unwrap();
        }
        let names: Vec<_> = registry.iter().map(|(name, _)| name).collect();
        assert_eq!(names, ["zeta", "alpha", "mid"]);
    }

    #[test]
    fn callback_definition_is_computed() {
        let def = MetricDefinition::gauge("Posts")
            .data_callback(|_| Ok(Some(SeriesData::scalar("1"))));
        assert!(def.is_computed());
        assert!(format!("{def:?}").contains("data_callback: true"));
    }
}
