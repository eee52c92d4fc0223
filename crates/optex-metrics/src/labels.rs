//! Label sets and their canonical string form.
//!
//! The canonical form `k1="v1",k2="v2"` (keys sorted) is both the storage
//! sub-key of a series and the text placed between braces on the wire, so
//! two label sets with the same pairs always land in the same slot.

use std::collections::BTreeMap;
use std::fmt;

/// Escape a label value for the text exposition format.
fn escape_label(v: &str) -> String {
    v.replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
}

/// Whether `key` is a legal label name: `[a-zA-Z_][a-zA-Z0-9_]*`.
pub fn is_valid_label_name(key: &str) -> bool {
    let mut chars = key.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// An ordered set of label pairs. Keys are unique; inserting an existing key
/// replaces its value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelSet {
    labels: BTreeMap<String, String>,
}

impl LabelSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.labels.insert(key.into(), value.into());
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.labels.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Check every key against [`is_valid_label_name`], returning the first
    /// offending key.
    pub fn validate(&self) -> Result<(), String> {
        match self.labels.keys().find(|key| !is_valid_label_name(key)) {
            Some(key) => Err(key.clone()),
            None => Ok(()),
        }
    }

    /// Render the key-sorted `k="v"` list, comma separated.
    pub fn canonical(&self) -> String {
        self.labels
            .iter()
            .map(|(k, v)| format!("{}=\"{}\"", k, escape_label(v)))
            .collect::<Vec<_>>()
            .join(",")
    }
}

impl fmt::Display for LabelSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.canonical())
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for LabelSet {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut set = LabelSet::new();
        for (k, v) in iter {
            set.insert(k, v);
        }
        set
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_sorts_by_key() {
        let labels = LabelSet::new().with("status", "publish").with("posttype", "page");
        assert_eq!(labels.canonical(), r#"posttype="page",status="publish""#);
    }

    #[test]
    fn permutations_share_canonical_form() {
        let pairs = [("method", "GET"), ("code", "200"), ("path", "/")];
        let forward: LabelSet = pairs.iter().copied().collect();
        let backward: LabelSet = pairs.iter().rev().copied().collect();
        let rotated: LabelSet = [pairs[1], pairs[2], pairs[0]].into_iter().collect();

        assert_eq!(forward.canonical(), backward.canonical());
        assert_eq!(forward.canonical(), rotated.canonical());
        assert_eq!(forward, backward);
    }

    #[test]
    fn duplicate_key_keeps_last_value() {
        let labels: LabelSet = [("code", "200"), ("code", "500")].into_iter().collect();
        assert_eq!(labels.len(), 1);
        assert_eq!(labels.canonical(), r#"code="500""#);
    }

    #[test]
    fn values_are_escaped() {
        let labels = LabelSet::new().with("path", "a\"b\\c\nd");
        assert_eq!(labels.canonical(), r#"path="a\"b\\c\nd""#);
    }

    #[test]
    fn label_name_rules() {
        for ok in ["code", "_hidden", "http_status2", "A"] {
            assert!(is_valid_label_name(ok), "{ok}");
        }
        for bad in ["", "2xx", "bad key", "quo\"te", "dash-ed", "a.b", "métrique"] {
            assert!(!is_valid_label_name(bad), "{bad}");
        }
    }

    #[test]
    fn validate_reports_offending_key() {
        assert!(LabelSet::new().validate().is_ok());
        assert!(LabelSet::new().with("code", "a b \"c\"").validate().is_ok());

        let labels = LabelSet::new().with("code", "200").with("bad key", "v");
        assert_eq!(labels.validate().unwrap_err(), "bad key");
        assert_eq!(LabelSet::new().with("", "v").validate().unwrap_err(), "");
    }

    #[test]
    fn empty_set_renders_empty() {
        let labels = LabelSet::new();
        assert!(labels.is_empty());
        assert_eq!(labels.to_string(), "");
    }
}
