//! Domain types for the optex option store.
//!
//! An option holds one [`StoredValue`]: either a bare sample string or a map
//! of sample strings keyed by canonical label string. Samples are kept in
//! their on-disk form (`"<value>"` or `"<value> <timestamp>"`) at this layer;
//! structured parsing happens in `optex-metrics`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Default plugin slug used in option names.
pub const DEFAULT_SLUG: &str = "prometheus_exporter";

// ── Scope ──────────────────────────────────────────────────────────

/// Which option namespace a process reads and writes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
    /// Options private to a single site.
    #[default]
    Site,
    /// Options shared by every site of a network deployment.
    Network,
}

impl Scope {
    pub fn is_network(self) -> bool {
        matches!(self, Scope::Network)
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::Site => f.write_str("site"),
            Scope::Network => f.write_str("network"),
        }
    }
}

impl FromStr for Scope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "site" => Ok(Scope::Site),
            "network" => Ok(Scope::Network),
            other => Err(format!("unknown scope `{other}` (expected `site` or `network`)")),
        }
    }
}

// ── Option names ───────────────────────────────────────────────────

/// Build the persisted option name for `key`.
///
/// The layout `plugin:{slug}[:network]:{key}` must stay stable: renaming it
/// orphans every value written by earlier versions.
pub fn option_name(slug: &str, scope: Scope, key: &str) -> String {
    match scope {
        Scope::Network => format!("plugin:{slug}:network:{key}"),
        Scope::Site => format!("plugin:{slug}:{key}"),
    }
}

// ── Stored values ──────────────────────────────────────────────────

/// The blob stored under one option name.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum StoredValue {
    /// Single sample of an unlabeled metric.
    Scalar(String),
    /// Samples of a labeled metric, keyed by canonical label string.
    Map(BTreeMap<String, String>),
}

impl StoredValue {
    /// Number of series held by this value.
    pub fn series_count(&self) -> usize {
        match self {
            StoredValue::Scalar(_) => 1,
            StoredValue::Map(map) => map.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn option_name_site_and_network() {
        assert_eq!(
            option_name(DEFAULT_SLUG, Scope::Site, "http_requests_total"),
            "plugin:prometheus_exporter:http_requests_total"
        );
        assert_eq!(
            option_name(DEFAULT_SLUG, Scope::Network, "http_requests_total"),
            "plugin:prometheus_exporter:network:http_requests_total"
        );
    }

    #[test]
    fn scope_parses_from_str() {
        assert_eq!("site".parse::<Scope>().unwrap(), Scope::Site);
        assert_eq!("network".parse::<Scope>().unwrap(), Scope::Network);
        assert!("global".parse::<Scope>().is_err());
    }

    #[test]
    fn stored_value_json_shapes() {
        let scalar = StoredValue::Scalar("5 1000".to_string());
        assert_eq!(serde_json::to_string(&scalar).unwrap(), "\"5 1000\"");

        let mut map = BTreeMap::new();
        map.insert("code=\"200\"".to_string(), "7".to_string());
        let labeled = StoredValue::Map(map);
        let json = serde_json::to_string(&labeled).unwrap();
        assert_eq!(json, r#"{"code=\"200\"":"7"}"#);

        let back: StoredValue = serde_json::from_str(&json).unwrap();
        assert_eq!(back.series_count(), 1);
    }
}
