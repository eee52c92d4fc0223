//! Exporter — the registry bound to its option store.
//!
//! This is the value handed to request handlers and metric producers. It is
//! `Clone` (both halves are behind `Arc`) and can be shared across tasks.

use std::sync::Arc;

use optex_state::OptionStore;

use crate::error::MetricsResult;
use crate::labels::LabelSet;
use crate::prometheus::render_prometheus;
use crate::registry::Registry;
use crate::series::Series;

#[derive(Clone)]
pub struct Exporter {
    registry: Arc<Registry>,
    store: Arc<dyn OptionStore>,
}

impl Exporter {
    /// Freeze `registry` and bind it to `store`.
    pub fn new(registry: Registry, store: Arc<dyn OptionStore>) -> Self {
        Self {
            registry: Arc::new(registry),
            store,
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn store(&self) -> &dyn OptionStore {
        self.store.as_ref()
    }

    /// Handle for one series of a registered metric.
    pub fn series(&self, name: &str, labels: Option<&LabelSet>) -> MetricsResult<Series<'_>> {
        Series::new(&self.registry, self.store.as_ref(), name, labels)
    }

    /// Render the full registry in the text exposition format.
    pub fn render(&self) -> String {
        render_prometheus(&self.registry, self.store.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::MetricDefinition;
    use optex_state::{Scope, StateStore};

    #[test]
    fn counter_end_to_end() {
        let mut registry = Registry::new();
        registry
            .register("http_requests_total", MetricDefinition::new().metric_type("counter"))
            .unwrap();
        let store = StateStore::open_in_memory(Scope::Site).unwrap();
        let exporter = Exporter::new(registry, Arc::new(store));

        let series = exporter.series("http_requests_total", None).unwrap();
        series.update("5").unwrap();

        assert_eq!(series.fetch().unwrap(), "5");
        assert!(exporter.render().lines().any(|line| line == "http_requests_total 5"));
    }

    #[test]
    fn clones_share_state() {
        let mut registry = Registry::new();
        registry.register("up", MetricDefinition::gauge("Up")).unwrap();
        let exporter = Exporter::new(
            registry,
            Arc::new(StateStore::open_in_memory(Scope::Network).unwrap()),
        );
        let other = exporter.clone();

        exporter.series("up", None).unwrap().update("1").unwrap();

        assert_eq!(other.series("up", None).unwrap().fetch().unwrap(), "1");
        assert!(other.store().is_network_scope());
    }
}
