//! Series handle — one metric plus one label combination.
//!
//! A handle is cheap and short-lived: build one, `update()` or `fetch()` it,
//! drop it. All label combinations of a metric share a single option, so a
//! labeled update rewrites the whole map inside one store transaction.

use std::collections::BTreeMap;

use optex_state::{OptionStore, StoredValue};
use tracing::{debug, warn};

use crate::error::{MetricsError, MetricsResult};
use crate::labels::LabelSet;
use crate::registry::{MetricDefinition, Registry};
use crate::sample::{Sample, now_millis};

/// Access to one time series of a registered metric.
pub struct Series<'a> {
    name: String,
    definition: &'a MetricDefinition,
    store: &'a dyn OptionStore,
    /// Canonical label string; `None` for an unlabeled series.
    labels: Option<String>,
    /// Captured once at construction when the metric is stamped.
    timestamp_ms: Option<i64>,
}

impl<'a> Series<'a> {
    /// Bind a handle to `name` and `labels`.
    ///
    /// Fails with `UnregisteredMetric` or `InvalidLabel` before touching the
    /// store. An empty label set addresses the unlabeled series.
    ///
    /// For metrics registered with a timestamp, the current time is taken
    /// here, once. Every `update()` through this handle reuses it, so a
    /// handle kept alive across updates reports the time it was created,
    /// not the time of the last write.
    pub fn new(
        registry: &'a Registry,
        store: &'a dyn OptionStore,
        name: &str,
        labels: Option<&LabelSet>,
    ) -> MetricsResult<Self> {
        let definition = registry.lookup(name)?;
        if let Some(labels) = labels {
            labels.validate().map_err(MetricsError::InvalidLabel)?;
        }
        let timestamp_ms = definition.has_timestamp.then(now_millis);
        let labels = labels
            .filter(|set| !set.is_empty())
            .map(LabelSet::canonical);

        Ok(Self {
            name: name.to_string(),
            definition,
            store,
            labels,
            timestamp_ms,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Canonical label string, empty when unlabeled.
    pub fn labels(&self) -> &str {
        self.labels.as_deref().unwrap_or("")
    }

    /// Timestamp attached to updates made through this handle.
    pub fn timestamp_ms(&self) -> Option<i64> {
        self.timestamp_ms
    }

    /// Read the current value of this series, without its timestamp.
    pub fn fetch(&self) -> MetricsResult<String> {
        let stored = self.store.load(&self.name)?;
        let raw = match (self.labels.as_deref(), stored) {
            (None, Some(StoredValue::Scalar(raw))) => Some(raw),
            (Some(labels), Some(StoredValue::Map(mut map))) => map.remove(labels),
            _ => None,
        };
        let raw = raw.ok_or_else(|| self.no_such_series())?;
        Ok(Sample::decode(&raw).value)
    }

    /// Store `value` for this series.
    ///
    /// The value must be non-empty and free of whitespace; it becomes one
    /// token of a sample line.
    pub fn update(&self, value: impl Into<String>) -> MetricsResult<()> {
        if self.definition.is_computed() {
            return Err(MetricsError::DataCallbackConflict(self.name.clone()));
        }

        let value = value.into();
        if value.is_empty() || value.contains(char::is_whitespace) {
            return Err(MetricsError::InvalidValue {
                metric: self.name.clone(),
                value,
            });
        }

        let sample = Sample {
            value,
            timestamp_ms: self.timestamp_ms,
        };
        let encoded = sample.encode();

        match self.labels.as_deref() {
            None => {
                self.store
                    .save(&self.name, &StoredValue::Scalar(encoded))?;
            }
            Some(labels) => {
                let name = self.name.as_str();
                self.store.read_modify_write(name, &mut |current| {
                    let mut map = match current {
                        Some(StoredValue::Map(map)) => map,
                        Some(StoredValue::Scalar(_)) => {
                            warn!(metric = %name, "replacing unlabeled value with labeled series");
                            BTreeMap::new()
                        }
                        None => BTreeMap::new(),
                    };
                    map.insert(labels.to_string(), encoded.clone());
                    StoredValue::Map(map)
                })?;
            }
        }

        debug!(metric = %self.name, labels = %self.labels(), value = %sample, "series updated");
        Ok(())
    }

    fn no_such_series(&self) -> MetricsError {
        MetricsError::NoSuchSeries {
            metric: self.name.clone(),
            labels: self.labels().to_string(),
        }
    }
}
