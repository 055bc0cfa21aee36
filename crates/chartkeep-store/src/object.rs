//! Stored object model
//!
//! `StoredObject` mirrors the shape of a ConfigMap: a labeled, namespaced
//! bag of string and binary entries. `ValuesDocument` is a named
//! configuration document that may reference other documents by alias.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;

/// One labeled key/value object
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredObject {
    pub name: String,
    pub namespace: String,
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    #[serde(default)]
    pub data: BTreeMap<String, String>,
    #[serde(default)]
    pub binary_data: BTreeMap<String, Vec<u8>>,
    #[serde(default)]
    pub immutable: bool,
}

impl StoredObject {
    pub fn new(name: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
            ..Default::default()
        }
    }

    /// Builder: add a label
    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }

    /// Insert a file entry into `binary_data`, text included
    pub fn insert_entry(&mut self, key: impl Into<String>, content: Vec<u8>) {
        self.binary_data.insert(key.into(), content);
    }

    /// All entries as bytes, ordered by key
    pub fn entries(&self) -> BTreeMap<&str, Vec<u8>> {
        let mut entries: BTreeMap<&str, Vec<u8>> = self
            .data
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_bytes().to_vec()))
            .collect();
        for (k, v) in &self.binary_data {
            entries.insert(k.as_str(), v.clone());
        }
        entries
    }

    /// Number of entries held
    pub fn len(&self) -> usize {
        self.data.len() + self.binary_data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Bytes counted against the object size limit
    ///
    /// Binary entries count at their base64 length, as the API server
    /// stores them.
    pub fn payload_size(&self) -> usize {
        let text: usize = self.data.iter().map(|(k, v)| k.len() + v.len()).sum();
        let binary: usize = self
            .binary_data
            .iter()
            .map(|(k, v)| k.len() + base64_len(v.len()))
            .sum();
        text + binary
    }

    /// Check whether the object carries every label of the selector
    pub fn matches(&self, selector: &LabelSelector) -> bool {
        selector.matches(&self.labels)
    }
}

fn base64_len(raw: usize) -> usize {
    raw.div_ceil(3) * 4
}

/// Equality-based label selector
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelSelector(BTreeMap<String, String>);

impl LabelSelector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: require a label value
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn matches(&self, labels: &BTreeMap<String, String>) -> bool {
        self.0.iter().all(|(k, v)| labels.get(k) == Some(v))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::fmt::Display for LabelSelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let parts: Vec<String> = self.0.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
        write!(f, "{}", parts.join(","))
    }
}

/// A named configuration document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValuesDocument {
    pub name: String,

    /// Raw payload: a mapping, or a string holding YAML/JSON
    #[serde(default)]
    pub values: JsonValue,

    /// Alias to referenced document name, in declared order
    #[serde(default)]
    pub refs: IndexMap<String, String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selector: Option<String>,
}

impl ValuesDocument {
    pub fn new(name: impl Into<String>, values: JsonValue) -> Self {
        Self {
            name: name.into(),
            values,
            ..Default::default()
        }
    }

    /// Builder: reference another document under an alias
    pub fn with_ref(mut self, alias: impl Into<String>, document: impl Into<String>) -> Self {
        self.refs.insert(alias.into(), document.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_insert_entry_writes_binary_data() {
        let mut obj = StoredObject::new("helm-tmpl-app-0.1.0", "default");
        obj.insert_entry("cm.yaml", b"kind: ConfigMap".to_vec());
        obj.insert_entry("logo.png", vec![0x89, 0x50, 0xff, 0x00]);

        assert!(obj.data.is_empty());
        assert_eq!(obj.binary_data.get("cm.yaml").unwrap(), &b"kind: ConfigMap".to_vec());
        assert_eq!(obj.binary_data.get("logo.png").unwrap(), &vec![0x89, 0x50, 0xff, 0x00]);
        assert_eq!(obj.len(), 2);
        assert_eq!(obj.entries().keys().copied().collect::<Vec<_>>(), vec!["cm.yaml", "logo.png"]);
    }

    #[test]
    fn test_entries_reads_data_and_binary_data() {
        let mut obj = StoredObject::new("helm-tmpl-app-0.1.0", "default");
        obj.data.insert("a.yaml".to_string(), "kind: Service".to_string());
        obj.insert_entry("b.yaml", b"kind: Deployment".to_vec());

        let entries = obj.entries();
        assert_eq!(entries.get("a.yaml").unwrap(), b"kind: Service");
        assert_eq!(entries.get("b.yaml").unwrap(), b"kind: Deployment");
    }

    #[test]
    fn test_payload_size_counts_binary_as_base64() {
        let mut obj = StoredObject::new("x", "default");
        obj.data.insert("ab".to_string(), "cde".to_string());
        obj.insert_entry("f", vec![0xff]);
        obj.insert_entry("g", vec![0; 6]);
        // 2 + 3, then 1 + 4, then 1 + 8
        assert_eq!(obj.payload_size(), 19);
    }

    #[test]
    fn test_binary_payload_near_limit_counts_encoded_size() {
        let mut obj = StoredObject::new("x", "default");
        obj.insert_entry("big.bin", vec![0; 900_000]);
        assert_eq!(obj.payload_size(), 7 + 1_200_000);
    }

    #[test]
    fn test_selector_matching() {
        let obj = StoredObject::new("x", "default")
            .with_label("repo", "stable")
            .with_label("chart", "app");

        assert!(obj.matches(&LabelSelector::new()));
        assert!(obj.matches(&LabelSelector::new().with("repo", "stable")));
        assert!(!obj.matches(&LabelSelector::new().with("repo", "stable").with("chart", "db")));
        assert!(!obj.matches(&LabelSelector::new().with("repoGroup", "infra")));
    }

    #[test]
    fn test_selector_display() {
        let selector = LabelSelector::new().with("repo", "stable").with("chart", "app");
        assert_eq!(selector.to_string(), "chart=app,repo=stable");
    }

    #[test]
    fn test_values_document_refs_keep_order() {
        let doc: ValuesDocument = serde_json::from_str(
            r#"{"name": "a", "values": {"foo": "bar"}, "refs": {"zeta": "Z", "alpha": "A"}}"#,
        )
        .unwrap();

        assert_eq!(doc.refs.keys().collect::<Vec<_>>(), vec!["zeta", "alpha"]);
        assert_eq!(doc.values, json!({"foo": "bar"}));
    }
}
