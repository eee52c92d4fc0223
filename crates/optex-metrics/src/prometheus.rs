//! Prometheus text exposition format.
//!
//! Renders every registered metric, in registration order, for scraping by a
//! Prometheus server or compatible agent. Each metric produces one block:
//! optional `# HELP` and `# TYPE` lines, then its samples (or `# No data`),
//! then a blank line.
//!
//! Stored timestamps are forwarded: a stamped sample renders as
//! `name{labels} value timestamp`.

use optex_state::OptionStore;
use tracing::warn;

use crate::registry::{MetricDefinition, Registry};
use crate::sample::SeriesData;

/// Content type of the rendered body.
pub const CONTENT_TYPE: &str = "text/plain; version=0.0.4";

/// Escape `# HELP` text: backslash and newline only.
fn escape_help(help: &str) -> String {
    help.replace('\\', "\\\\").replace('\n', "\\n")
}

/// Render the whole registry.
///
/// A metric whose data cannot be resolved (store failure or callback error)
/// degrades to `# No data`; the remaining metrics are still rendered.
pub fn render_prometheus(registry: &Registry, store: &dyn OptionStore) -> String {
    let mut out = String::new();
    for (name, definition) in registry.iter() {
        render_metric(name, definition, store, &mut out);
        out.push('\n');
    }
    out
}

fn render_metric(
    name: &str,
    definition: &MetricDefinition,
    store: &dyn OptionStore,
    out: &mut String,
) {
    if let Some(help) = &definition.help {
        out.push_str(&format!("# HELP {} {}\n", name, escape_help(help)));
    }
    if let Some(metric_type) = &definition.metric_type {
        out.push_str(&format!("# TYPE {} {}\n", name, metric_type));
    }

    let data = match resolve(name, definition, store) {
        Ok(data) => data,
        Err(e) => {
            warn!(metric = %name, error = %e, "failed to resolve metric data");
            None
        }
    };

    match data {
        Some(SeriesData::Scalar(sample)) => {
            out.push_str(&format!("{} {}\n", name, sample));
        }
        Some(SeriesData::Labeled(entries)) if !entries.is_empty() => {
            for (labels, sample) in &entries {
                out.push_str(&format!("{}{{{}}} {}\n", name, labels, sample));
            }
        }
        _ => out.push_str("# No data\n"),
    }
}

/// Callback data for computed metrics, stored state for everything else.
fn resolve(
    name: &str,
    definition: &MetricDefinition,
    store: &dyn OptionStore,
) -> anyhow::Result<Option<SeriesData>> {
    match &definition.data_callback {
        Some(callback) => callback(name),
        None => Ok(store.load(name)?.map(SeriesData::from)),
    }
}
