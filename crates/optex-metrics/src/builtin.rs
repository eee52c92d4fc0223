//! Built-in computed metrics.
//!
//! These are ordinary data-callback metrics and double as examples of the
//! callback contract: `optex_registered_metrics` returns a scalar and
//! `optex_stored_series` returns one labeled line per stored metric.

use std::sync::Arc;

use optex_state::OptionStore;

use crate::error::MetricsResult;
use crate::labels::LabelSet;
use crate::registry::{MetricDefinition, Registry};
use crate::sample::SeriesData;

pub const REGISTERED_METRICS: &str = "optex_registered_metrics";
pub const STORED_SERIES: &str = "optex_stored_series";

/// Register the built-in metrics.
///
/// Call this after every other metric is registered: both callbacks work on
/// the registry as it looks at that point.
pub fn register_builtin_metrics(
    registry: &mut Registry,
    store: Arc<dyn OptionStore>,
) -> MetricsResult<()> {
    let stored: Vec<String> = registry
        .iter()
        .filter(|(_, def)| !def.is_computed())
        .map(|(name, _)| name.to_string())
        .collect();

    let mut total = registry.len();
    for name in [REGISTERED_METRICS, STORED_SERIES] {
        if !registry.contains(name) {
            total += 1;
        }
    }

    registry.register(
        REGISTERED_METRICS,
        MetricDefinition::gauge("Number of metrics known to this exporter.")
            .data_callback(move |_| Ok(Some(SeriesData::scalar(total.to_string())))),
    )?;

    registry.register(
        STORED_SERIES,
        MetricDefinition::gauge("Number of stored series per metric.").data_callback(
            move |_| {
                let mut entries = Vec::with_capacity(stored.len());
                for name in &stored {
                    let count = store.load(name)?.map_or(0, |value| value.series_count());
                    entries.push((LabelSet::new().with("metric", name.as_str()), count.to_string()));
                }
                if entries.is_empty() {
                    return Ok(None);
                }
                Ok(Some(SeriesData::labeled(entries)))
            },
        ),
    )?;

    Ok(())
}
