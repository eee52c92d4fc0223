//! Startup wiring: open the store, fill the registry, freeze the exporter.

use std::sync::Arc;

use optex_metrics::{Exporter, MetricDefinition, Registry, builtin};
use optex_state::{OptionStore, StateStore};
use tracing::info;

use crate::config::{MetricConfig, OptexConfig};

/// Open the on-disk store described by `config`, creating the data directory.
pub fn open_store(config: &OptexConfig) -> anyhow::Result<StateStore> {
    std::fs::create_dir_all(&config.store.data_dir)?;
    let db_path = config.store.db_path();
    let store = StateStore::open(&db_path, &config.store.slug, config.store.scope)?;
    info!(path = ?db_path, scope = %config.store.scope, "option store opened");
    Ok(store)
}

fn definition(metric: &MetricConfig) -> MetricDefinition {
    let mut def = MetricDefinition::new();
    if let Some(help) = &metric.help {
        def = def.help(help.as_str());
    }
    if let Some(metric_type) = &metric.metric_type {
        def = def.metric_type(metric_type.as_str());
    }
    if metric.has_timestamp {
        def = def.with_timestamp();
    }
    def
}

/// Register the configured metrics (and the built-ins) over `store`.
pub fn build_exporter(config: &OptexConfig, store: Arc<dyn OptionStore>) -> anyhow::Result<Exporter> {
    let mut registry = Registry::new();
    for metric in &config.metrics {
        registry.register(metric.name.as_str(), definition(metric))?;
    }
    if config.builtin.enabled {
        builtin::register_builtin_metrics(&mut registry, Arc::clone(&store))?;
    }
    info!(metrics = registry.len(), "metric registry ready");
    Ok(Exporter::new(registry, store))
}

/// Open the store from `config` and build the exporter over it.
pub fn exporter_from_config(config: &OptexConfig) -> anyhow::Result<Exporter> {
    let store = open_store(config)?;
    build_exporter(config, Arc::new(store))
}
