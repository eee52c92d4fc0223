//! Samples and the data a metric resolves to at scrape time.
//!
//! A [`Sample`] is a value plus an optional millisecond timestamp. On disk it
//! is kept in the legacy space-joined form `"<value> <timestamp>"`; that
//! encoding only exists at the storage boundary.

use std::collections::BTreeMap;
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use optex_state::StoredValue;

use crate::labels::LabelSet;

/// Milliseconds since the Unix epoch.
pub fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

/// One value of a series, optionally stamped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sample {
    pub value: String,
    pub timestamp_ms: Option<i64>,
}

impl Sample {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            timestamp_ms: None,
        }
    }

    pub fn with_timestamp(value: impl Into<String>, timestamp_ms: i64) -> Self {
        Self {
            value: value.into(),
            timestamp_ms: Some(timestamp_ms),
        }
    }

    /// Decode the stored form, splitting on the first space.
    ///
    /// Anything after the space that is not an integer is dropped.
    pub fn decode(raw: &str) -> Self {
        match raw.split_once(' ') {
            Some((value, rest)) => Self {
                value: value.to_string(),
                timestamp_ms: rest.trim().parse().ok(),
            },
            None => Self::new(raw),
        }
    }

    /// Encode to the stored form.
    pub fn encode(&self) -> String {
        self.to_string()
    }
}

/// Prints `value` or `value timestamp`, which is also valid exposition syntax.
impl fmt::Display for Sample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.timestamp_ms {
            Some(ts) => write!(f, "{} {}", self.value, ts),
            None => f.write_str(&self.value),
        }
    }
}

/// Everything a metric has to show for one scrape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SeriesData {
    /// The single series of an unlabeled metric.
    Scalar(Sample),
    /// Canonical label string → sample.
    Labeled(BTreeMap<String, Sample>),
}

impl SeriesData {
    pub fn scalar(value: impl Into<String>) -> Self {
        SeriesData::Scalar(Sample::new(value))
    }

    /// Build labeled data from label sets, canonicalizing each one.
    pub fn labeled<I, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (LabelSet, V)>,
        V: Into<String>,
    {
        SeriesData::Labeled(
            entries
                .into_iter()
                .map(|(labels, value)| (labels.canonical(), Sample::new(value)))
                .collect(),
        )
    }

    pub fn is_empty(&self) -> bool {
        match self {
            SeriesData::Scalar(_) => false,
            SeriesData::Labeled(map) => map.is_empty(),
        }
    }
}

impl From<StoredValue> for SeriesData {
    fn from(value: StoredValue) -> Self {
        match value {
            StoredValue::Scalar(raw) => SeriesData::Scalar(Sample::decode(&raw)),
            StoredValue::Map(map) => SeriesData::Labeled(
                map.into_iter()
                    .map(|(labels, raw)| (labels, Sample::decode(&raw)))
                    .collect(),
            ),
        }
    }
}
