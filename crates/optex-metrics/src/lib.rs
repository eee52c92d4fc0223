//! optex-metrics — persistent Prometheus metrics over an option store.
//!
//! Metrics are registered once at startup into a [`Registry`]. Producers
//! update individual series through short-lived [`Series`] handles, which
//! persist values in an [`OptionStore`](optex_state::OptionStore). A scrape
//! renders every registered metric in the Prometheus text format.
//!
//! # Architecture
//!
//! ```text
//! Exporter
//!   ├── Registry (name → MetricDefinition, registration order)
//!   ├── series(name, labels) → Series
//!   │   ├── fetch()  ← load option, pick label slot, strip timestamp
//!   │   └── update() → save option (read-modify-write when labeled)
//!   └── render() → text/plain for /metrics endpoint
//! ```

pub mod builtin;
pub mod error;
pub mod exporter;
pub mod labels;
pub mod prometheus;
pub mod registry;
pub mod sample;
pub mod series;

pub use error::{MetricsError, MetricsResult};
pub use exporter::Exporter;
pub use labels::{LabelSet, is_valid_label_name};
pub use prometheus::{CONTENT_TYPE, render_prometheus};
pub use registry::{DataCallback, MetricDefinition, Registry};
pub use sample::{Sample, SeriesData};
pub use series::Series;
