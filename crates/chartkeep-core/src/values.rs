//! Values handling with deep merge support

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::error::{CoreError, Result};

/// Values container with deep merge capability
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Values(pub JsonValue);

impl Values {
    /// Create empty values
    pub fn new() -> Self {
        Self(JsonValue::Object(serde_json::Map::new()))
    }

    /// Parse values from YAML string
    ///
    /// An empty document yields empty values.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let value: JsonValue = serde_yaml::from_str(yaml)?;
        Ok(Self::from_value(value))
    }

    /// Parse values from JSON string
    pub fn from_json(json: &str) -> Result<Self> {
        let value: JsonValue = serde_json::from_str(json)?;
        Ok(Self::from_value(value))
    }

    fn from_value(value: JsonValue) -> Self {
        match value {
            JsonValue::Null => Self::new(),
            other => Self(other),
        }
    }

    /// Deep merge another Values into this one
    ///
    /// Rules:
    /// - Objects on both sides: recursive merge
    /// - Anything else: overlay replaces base
    pub fn merge(&mut self, overlay: &Values) {
        deep_merge(&mut self.0, &overlay.0);
    }

    /// Merge multiple values in order, later entries win
    pub fn merge_all(values: Vec<Values>) -> Self {
        let mut result = Values::new();
        for v in values {
            result.merge(&v);
        }
        result
    }

    /// Wrap these values under a single key
    ///
    /// `{"a": 1}.nested_under("svc")` yields `{"svc": {"a": 1}}`.
    pub fn nested_under(&self, key: &str) -> Values {
        let mut map = serde_json::Map::new();
        map.insert(key.to_string(), self.0.clone());
        Values(JsonValue::Object(map))
    }

    /// Set a value by dotted path (e.g., "image.tag")
    pub fn set(&mut self, path: &str, value: JsonValue) -> Result<()> {
        let parts: Vec<&str> = path.split('.').collect();
        if parts.iter().any(|p| p.is_empty()) {
            return Err(CoreError::ValuesMerge {
                message: format!("Invalid values path: '{}'", path),
            });
        }
        set_nested(&mut self.0, &parts, value);
        Ok(())
    }

    /// Get a value by dotted path
    pub fn get(&self, path: &str) -> Option<&JsonValue> {
        let parts: Vec<&str> = path.split('.').collect();
        get_nested(&self.0, &parts)
    }

    /// Get the inner JSON value
    pub fn inner(&self) -> &JsonValue {
        &self.0
    }

    /// Convert to JSON value
    pub fn into_inner(self) -> JsonValue {
        self.0
    }

    /// Check if values are empty
    pub fn is_empty(&self) -> bool {
        match &self.0 {
            JsonValue::Object(map) => map.is_empty(),
            JsonValue::Null => true,
            _ => false,
        }
    }

    /// Serialize to a compact JSON string
    ///
    /// Object keys are emitted in sorted order, so equal values always
    /// produce identical bytes.
    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.0)?)
    }

    // =========================================================================
    // Dependency Value Scoping
    // =========================================================================

    /// Scope parent values for a dependency
    ///
    /// The dependency only sees:
    /// 1. Values under `<dependency_name>.*` in the parent, as its root values
    /// 2. Global values under `global.*` preserved as-is
    ///
    /// # Example
    ///
    /// Parent values:
    /// ```yaml
    /// global:
    ///   imageRegistry: docker.io
    /// redis:
    ///   enabled: true
    ///   replicas: 3
    /// ```
    ///
    /// Calling `scope_for_dependency("redis")` produces:
    /// ```yaml
    /// global:
    ///   imageRegistry: docker.io
    /// enabled: true
    /// replicas: 3
    /// ```
    pub fn scope_for_dependency(&self, dependency_name: &str) -> Values {
        let mut scoped = serde_json::Map::new();

        if let JsonValue::Object(parent_obj) = &self.0 {
            if let Some(global) = parent_obj.get("global") {
                scoped.insert("global".to_string(), global.clone());
            }

            if let Some(JsonValue::Object(dep_obj)) = parent_obj.get(dependency_name) {
                for (k, v) in dep_obj {
                    scoped.insert(k.clone(), v.clone());
                }
            }
        }

        Values(JsonValue::Object(scoped))
    }

    /// Merge dependency defaults with scoped parent values
    ///
    /// 1. Start with the dependency's own stored defaults
    /// 2. Merge in the values the parent scoped for it
    pub fn for_dependency(
        dependency_defaults: Values,
        parent_values: &Values,
        dependency_name: &str,
    ) -> Values {
        let mut result = dependency_defaults;
        let scoped = parent_values.scope_for_dependency(dependency_name);
        result.merge(&scoped);
        result
    }
}

/// Deep merge two JSON values
fn deep_merge(base: &mut JsonValue, overlay: &JsonValue) {
    match (base, overlay) {
        (JsonValue::Object(base_map), JsonValue::Object(overlay_map)) => {
            for (key, overlay_value) in overlay_map {
                match base_map.get_mut(key) {
                    Some(base_value) => deep_merge(base_value, overlay_value),
                    None => {
                        base_map.insert(key.clone(), overlay_value.clone());
                    }
                }
            }
        }
        (base, overlay) => {
            *base = overlay.clone();
        }
    }
}

/// Set a nested value by path, replacing non-object intermediates
fn set_nested(value: &mut JsonValue, path: &[&str], new_value: JsonValue) {
    let Some((key, remaining)) = path.split_first() else {
        *value = new_value;
        return;
    };

    if !value.is_object() {
        *value = JsonValue::Object(serde_json::Map::new());
    }

    if let JsonValue::Object(map) = value {
        let entry = map
            .entry(key.to_string())
            .or_insert_with(|| JsonValue::Object(serde_json::Map::new()));
        set_nested(entry, remaining, new_value);
    }
}

/// Get a nested value by path
fn get_nested<'a>(value: &'a JsonValue, path: &[&str]) -> Option<&'a JsonValue> {
    let Some((key, remaining)) = path.split_first() else {
        return Some(value);
    };

    match value {
        JsonValue::Object(map) => map.get(*key).and_then(|v| get_nested(v, remaining)),
        _ => None,
    }
}

/// Parse --set arguments (key=value format)
///
/// Only integers, booleans and `null` are typed; anything else, `2.0` and
/// `1.10` included, stays a string.
pub fn parse_set_values(set_args: &[String]) -> Result<Values> {
    let mut values = Values::new();

    for arg in set_args {
        let (key, val) = arg.split_once('=').ok_or_else(|| CoreError::ValuesMerge {
            message: format!("Invalid --set format: '{}'. Expected key=value", arg),
        })?;

        let json_value = if val == "true" {
            JsonValue::Bool(true)
        } else if val == "false" {
            JsonValue::Bool(false)
        } else if val == "null" {
            JsonValue::Null
        } else if let Ok(num) = val.parse::<i64>() {
            JsonValue::Number(num.into())
        } else if val.starts_with('[') || val.starts_with('{') {
            serde_json::from_str(val).unwrap_or_else(|_| JsonValue::String(val.to_string()))
        } else {
            JsonValue::String(val.to_string())
        };

        values.set(key, json_value)?;
    }

    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_deep_merge() {
        let mut base = Values::from_yaml(r#"
image:
  repository: nginx
  tag: "1.0"
replicas: 1
"#).unwrap();

        let overlay = Values::from_yaml(r#"
image:
  tag: "2.0"
  pullPolicy: Always
replicas: 3
"#).unwrap();

        base.merge(&overlay);

        assert_eq!(base.get("image.repository").unwrap(), "nginx");
        assert_eq!(base.get("image.tag").unwrap(), "2.0");
        assert_eq!(base.get("image.pullPolicy").unwrap(), "Always");
        assert_eq!(base.get("replicas").unwrap(), 3);
    }

    #[test]
    fn test_merge_scalar_replaces_map() {
        let mut base = Values(json!({"svc": {"port": 80}}));
        base.merge(&Values(json!({"svc": "disabled"})));
        assert_eq!(base.0, json!({"svc": "disabled"}));

        let mut base = Values(json!({"svc": "disabled"}));
        base.merge(&Values(json!({"svc": {"port": 80}})));
        assert_eq!(base.0, json!({"svc": {"port": 80}}));
    }

    #[test]
    fn test_merge_arrays_replace() {
        let mut base = Values(json!({"hosts": ["a", "b"]}));
        base.merge(&Values(json!({"hosts": ["c"]})));
        assert_eq!(base.0, json!({"hosts": ["c"]}));
    }

    #[test]
    fn test_merge_all_later_wins() {
        let merged = Values::merge_all(vec![
            Values(json!({"a": 1, "b": {"x": 1}})),
            Values(json!({"a": 2, "b": {"y": 2}})),
        ]);
        assert_eq!(merged.0, json!({"a": 2, "b": {"x": 1, "y": 2}}));
    }

    #[test]
    fn test_nested_under() {
        let values = Values(json!({"baz": "faz"}));
        assert_eq!(values.nested_under("boo").0, json!({"boo": {"baz": "faz"}}));
    }

    #[test]
    fn test_empty_yaml_is_empty_values() {
        let values = Values::from_yaml("").unwrap();
        assert!(values.is_empty());
        assert_eq!(values.0, json!({}));
    }

    #[test]
    fn test_set_nested() {
        let mut values = Values::new();
        values.set("image.tag", JsonValue::String("v1".into())).unwrap();
        values.set("replicas", JsonValue::Number(3.into())).unwrap();

        assert_eq!(values.get("image.tag").unwrap(), "v1");
        assert_eq!(values.get("replicas").unwrap(), 3);
    }

    #[test]
    fn test_set_rejects_empty_segment() {
        let mut values = Values::new();
        assert!(values.set("image..tag", json!("v1")).is_err());
    }

    #[test]
    fn test_to_json_string_is_stable() {
        let a = Values(json!({"b": 1, "a": {"d": 2, "c": 3}}));
        let b = Values(json!({"a": {"c": 3, "d": 2}, "b": 1}));
        assert_eq!(a.to_json_string().unwrap(), b.to_json_string().unwrap());
    }

    #[test]
    fn test_parse_set_values() {
        let args = vec![
            "image.tag=v2".to_string(),
            "replicas=5".to_string(),
            "debug=true".to_string(),
        ];

        let values = parse_set_values(&args).unwrap();

        assert_eq!(values.get("image.tag").unwrap(), "v2");
        assert_eq!(values.get("replicas").unwrap(), 5);
        assert_eq!(values.get("debug").unwrap(), true);
    }

    #[test]
    fn test_parse_set_values_keeps_decimal_text() {
        let args = vec!["image.tag=2.0".to_string(), "app.version=1.10".to_string()];

        let values = parse_set_values(&args).unwrap();

        assert_eq!(values.get("image.tag").unwrap(), "2.0");
        assert_eq!(values.get("app.version").unwrap(), "1.10");
    }

    #[test]
    fn test_parse_set_values_invalid() {
        let args = vec!["novalue".to_string()];
        assert!(parse_set_values(&args).is_err());
    }

    #[test]
    fn test_scope_for_dependency() {
        let parent = Values::from_yaml(r#"
global:
  imageRegistry: docker.io
redis:
  enabled: true
  replicas: 3
postgresql:
  enabled: false
"#).unwrap();

        let scoped = parent.scope_for_dependency("redis");

        assert_eq!(scoped.get("global.imageRegistry").unwrap(), "docker.io");
        assert_eq!(scoped.get("enabled").unwrap(), true);
        assert_eq!(scoped.get("replicas").unwrap(), 3);
        assert!(scoped.get("postgresql").is_none());
        assert!(scoped.get("redis").is_none());
    }

    #[test]
    fn test_scope_for_missing_dependency() {
        let parent = Values(json!({"other": {"a": 1}}));
        let scoped = parent.scope_for_dependency("redis");
        assert!(scoped.is_empty());
    }

    #[test]
    fn test_for_dependency_parent_wins_over_defaults() {
        let defaults = Values(json!({"replicas": 1, "image": {"tag": "7.0"}}));
        let parent = Values(json!({"redis": {"replicas": 3}}));

        let result = Values::for_dependency(defaults, &parent, "redis");

        assert_eq!(result.get("replicas").unwrap(), 3);
        assert_eq!(result.get("image.tag").unwrap(), "7.0");
    }
}
