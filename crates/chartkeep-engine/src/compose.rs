//! Configuration composition
//!
//! Merges a graph of configuration documents into one effective values map.
//!
//! ## Algorithm
//!
//! 1. **Fetch**: the graph is walked level by level. Every document of a
//!    level that has not been fetched yet is read by its own task; results
//!    are collected in edge order, so completion order never matters. Each
//!    document is read at most once per composition.
//! 2. **Merge**: a post-order walk from each root. A document's payload is
//!    the base of its result; each referenced document is merged in twice,
//!    once unqualified and once nested under its alias, so referenced values
//!    win on conflicts.
//!
//! Roots are merged into the final result in request order.

use chartkeep_core::Values;
use chartkeep_store::{ResourceCatalog, ValuesDocument};
use futures::future::try_join_all;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use crate::error::{EngineError, Result};

/// Composer configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComposerConfig {
    /// Deadline for fetching the whole document graph (default: 10s)
    #[serde(default = "default_fetch_timeout", with = "humantime_serde")]
    pub fetch_timeout: Duration,
}

fn default_fetch_timeout() -> Duration {
    Duration::from_secs(10)
}

impl Default for ComposerConfig {
    fn default() -> Self {
        Self {
            fetch_timeout: default_fetch_timeout(),
        }
    }
}

/// How a document was reached
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EdgeParent {
    /// Requested directly
    Base,
    /// Referenced by another document under this alias
    Alias(String),
}

impl std::fmt::Display for EdgeParent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Base => write!(f, "base"),
            Self::Alias(alias) => write!(f, "{}", alias),
        }
    }
}

/// A fetched document paired with the edge it was reached through
#[derive(Debug, Clone)]
pub struct ValuesRef {
    pub document: ValuesDocument,
    pub parent: EdgeParent,
}

/// Keep only the edges reached through `parent`
pub fn refs_with_parent<'a>(refs: &'a [ValuesRef], parent: &EdgeParent) -> Vec<&'a ValuesRef> {
    refs.iter().filter(|r| &r.parent == parent).collect()
}

/// Fetched documents plus every edge that reached them
struct FetchedGraph {
    documents: HashMap<String, ValuesDocument>,
    edges: Vec<ValuesRef>,
}

/// Composes configuration documents from a catalog
pub struct Composer<S: ?Sized> {
    store: Arc<S>,
    namespace: String,
    config: ComposerConfig,
}

impl<S> Composer<S>
where
    S: ResourceCatalog + ?Sized + 'static,
{
    pub fn new(store: Arc<S>, namespace: impl Into<String>) -> Self {
        Self {
            store,
            namespace: namespace.into(),
            config: ComposerConfig::default(),
        }
    }

    /// Builder: set configuration
    pub fn with_config(mut self, config: ComposerConfig) -> Self {
        self.config = config;
        self
    }

    /// Compose the named documents into one values map
    pub async fn compose(&self, roots: &[String]) -> Result<Values> {
        let graph = self.fetch_with_deadline(roots).await?;

        let mut memo = HashMap::new();
        let mut result = Values::new();
        for root in roots {
            let mut stack = Vec::new();
            let composed = merge_document(root, &graph.documents, &mut stack, &mut memo)?;
            result.merge(&composed);
        }

        info!(
            roots = roots.len(),
            documents = graph.documents.len(),
            "composed values"
        );
        Ok(result)
    }

    /// Fetch the document graph and return every edge in walk order
    pub async fn collect_refs(&self, roots: &[String]) -> Result<Vec<ValuesRef>> {
        Ok(self.fetch_with_deadline(roots).await?.edges)
    }

    async fn fetch_with_deadline(&self, roots: &[String]) -> Result<FetchedGraph> {
        match tokio::time::timeout(self.config.fetch_timeout, self.fetch_graph(roots)).await {
            Ok(result) => result,
            Err(_) => Err(EngineError::Timeout(self.config.fetch_timeout)),
        }
    }

    async fn fetch_graph(&self, roots: &[String]) -> Result<FetchedGraph> {
        let mut documents: HashMap<String, ValuesDocument> = HashMap::new();
        let mut edges = Vec::new();
        let mut level: Vec<(String, EdgeParent)> = roots
            .iter()
            .map(|r| (r.clone(), EdgeParent::Base))
            .collect();

        while !level.is_empty() {
            let mut pending: Vec<String> = Vec::new();
            for (name, _) in &level {
                if !documents.contains_key(name) && !pending.contains(name) {
                    pending.push(name.clone());
                }
            }

            debug!(level = level.len(), fetching = pending.len(), "fetching values level");
            let fetched = self.fetch_level(&pending).await?;

            let mut next = Vec::new();
            for (name, document) in pending.iter().zip(fetched) {
                for (alias, child) in &document.refs {
                    next.push((child.clone(), EdgeParent::Alias(alias.clone())));
                }
                documents.insert(name.clone(), document);
            }

            for (name, parent) in level {
                if let Some(document) = documents.get(&name) {
                    edges.push(ValuesRef {
                        document: document.clone(),
                        parent,
                    });
                }
            }

            level = next;
        }

        Ok(FetchedGraph { documents, edges })
    }

    /// Fetch sibling documents concurrently, results in input order
    ///
    /// On the first failure the remaining tasks are detached and left to
    /// finish on their own; their results are discarded.
    async fn fetch_level(&self, names: &[String]) -> Result<Vec<ValuesDocument>> {
        let tasks = names.iter().map(|name| {
            let store = Arc::clone(&self.store);
            let namespace = self.namespace.clone();
            let task_name = name.clone();
            let handle = tokio::spawn(async move { store.get_values(&namespace, &task_name).await });

            async move {
                match handle.await {
                    Ok(Ok(document)) => Ok(document),
                    Ok(Err(e)) => Err(EngineError::composition(format!(
                        "failed to fetch values '{}': {}",
                        name, e
                    ))),
                    Err(e) => Err(EngineError::composition(format!(
                        "fetch task for values '{}' failed: {}",
                        name, e
                    ))),
                }
            }
        });

        try_join_all(tasks).await
    }
}

/// Post-order merge of one document and everything it references
fn merge_document(
    name: &str,
    documents: &HashMap<String, ValuesDocument>,
    stack: &mut Vec<String>,
    memo: &mut HashMap<String, Values>,
) -> Result<Values> {
    if let Some(pos) = stack.iter().position(|n| n == name) {
        let mut cycle: Vec<&str> = stack[pos..].iter().map(String::as_str).collect();
        cycle.push(name);
        return Err(EngineError::composition(format!(
            "reference cycle: {}",
            cycle.join(" -> ")
        )));
    }
    if let Some(done) = memo.get(name) {
        return Ok(done.clone());
    }

    let document = documents
        .get(name)
        .ok_or_else(|| EngineError::composition(format!("values '{}' was not fetched", name)))?;
    let mut result = parse_payload(document)?;

    stack.push(name.to_string());
    for (alias, child) in &document.refs {
        let child_values = merge_document(child, documents, stack, memo)?;
        result.merge(&child_values);
        result.merge(&child_values.nested_under(alias));
    }
    stack.pop();

    memo.insert(name.to_string(), result.clone());
    Ok(result)
}

/// Read a document payload as a values map
///
/// Mappings are used as-is, strings are parsed as YAML (JSON included),
/// a missing payload is empty.
pub fn parse_payload(document: &ValuesDocument) -> Result<Values> {
    let values = match &document.values {
        JsonValue::Null => Values::new(),
        JsonValue::Object(_) => Values(document.values.clone()),
        JsonValue::String(raw) => Values::from_yaml(raw).map_err(|e| {
            EngineError::composition(format!("values '{}' has an unparsable payload: {}", document.name, e))
        })?,
        other => {
            return Err(EngineError::composition(format!(
                "values '{}' payload must be a mapping, found {}",
                document.name,
                json_type(other)
            )));
        }
    };

    if !values.inner().is_object() {
        return Err(EngineError::composition(format!(
            "values '{}' payload must be a mapping, found {}",
            document.name,
            json_type(values.inner())
        )));
    }
    Ok(values)
}

fn json_type(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "a boolean",
        JsonValue::Number(_) => "a number",
        JsonValue::String(_) => "a string",
        JsonValue::Array(_) => "a list",
        JsonValue::Object(_) => "a mapping",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chartkeep_store::MockStore;
    use serde_json::json;

    fn doc(name: &str, values: JsonValue) -> ValuesDocument {
        ValuesDocument::new(name, values)
    }

    fn roots(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    fn composer(store: MockStore) -> (Composer<MockStore>, Arc<MockStore>) {
        let store = Arc::new(store);
        (Composer::new(Arc::clone(&store), "default"), store)
    }

    #[tokio::test]
    async fn test_alias_scoped_merge() {
        let (composer, _) = composer(
            MockStore::new()
                .with_values("default", doc("A", json!({"foo": "bar"})).with_ref("boo", "B"))
                .with_values("default", doc("B", json!({"baz": "faz"}))),
        );

        let values = composer.compose(&roots(&["A"])).await.unwrap();
        assert_eq!(
            values.0,
            json!({"foo": "bar", "boo": {"baz": "faz"}, "baz": "faz"})
        );
    }

    #[tokio::test]
    async fn test_child_scalar_wins() {
        let (composer, _) = composer(
            MockStore::new()
                .with_values(
                    "default",
                    doc("A", json!({"replicas": 1, "image": {"tag": "1.0", "repo": "nginx"}}))
                        .with_ref("child", "B"),
                )
                .with_values("default", doc("B", json!({"replicas": 3, "image": {"tag": "2.0"}}))),
        );

        let values = composer.compose(&roots(&["A"])).await.unwrap();
        assert_eq!(values.get("replicas").unwrap(), 3);
        assert_eq!(values.get("image.tag").unwrap(), "2.0");
        assert_eq!(values.get("image.repo").unwrap(), "nginx");
        assert_eq!(values.get("child.replicas").unwrap(), 3);
    }

    #[tokio::test]
    async fn test_roots_merged_in_request_order() {
        let (composer, _) = composer(
            MockStore::new()
                .with_values("default", doc("first", json!({"env": "dev", "a": 1})))
                .with_values("default", doc("second", json!({"env": "prod", "b": 2}))),
        );

        let values = composer.compose(&roots(&["first", "second"])).await.unwrap();
        assert_eq!(values.0, json!({"env": "prod", "a": 1, "b": 2}));

        let values = composer.compose(&roots(&["second", "first"])).await.unwrap();
        assert_eq!(values.get("env").unwrap(), "dev");
    }

    #[tokio::test]
    async fn test_nested_refs_post_order() {
        let (composer, _) = composer(
            MockStore::new()
                .with_values("default", doc("A", json!({"level": "a"})).with_ref("b", "B"))
                .with_values("default", doc("B", json!({"level": "b"})).with_ref("c", "C"))
                .with_values("default", doc("C", json!({"level": "c", "deep": true}))),
        );

        let values = composer.compose(&roots(&["A"])).await.unwrap();
        assert_eq!(values.get("level").unwrap(), "c");
        assert_eq!(values.get("b.level").unwrap(), "c");
        assert_eq!(values.get("b.c.deep").unwrap(), true);
        assert_eq!(values.get("c.level").unwrap(), "c");
    }

    #[tokio::test]
    async fn test_diamond_fetches_shared_document_once() {
        let (composer, store) = composer(
            MockStore::new()
                .with_values("default", doc("A", json!({})).with_ref("b", "B").with_ref("c", "C"))
                .with_values("default", doc("B", json!({"from": "b"})).with_ref("d", "D"))
                .with_values("default", doc("C", json!({"from": "c"})).with_ref("d", "D"))
                .with_values("default", doc("D", json!({"shared": true}))),
        );

        let values = composer.compose(&roots(&["A"])).await.unwrap();
        assert_eq!(values.get("b.d.shared").unwrap(), true);
        assert_eq!(values.get("c.d.shared").unwrap(), true);

        let counts = store.operation_counts();
        assert_eq!(counts.value_gets.get("D"), Some(&1));
        assert_eq!(counts.gets, 4);
    }

    #[tokio::test]
    async fn test_cycle_is_composition_error() {
        let (composer, _) = composer(
            MockStore::new()
                .with_values("default", doc("A", json!({})).with_ref("b", "B"))
                .with_values("default", doc("B", json!({})).with_ref("a", "A")),
        );

        let err = composer.compose(&roots(&["A"])).await.unwrap_err();
        match err {
            EngineError::Composition { message } => assert!(message.contains("A -> B -> A"), "{message}"),
            other => panic!("expected composition error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_self_reference_is_cycle() {
        let (composer, _) = composer(
            MockStore::new().with_values("default", doc("A", json!({})).with_ref("me", "A")),
        );

        let err = composer.compose(&roots(&["A"])).await.unwrap_err();
        assert!(matches!(err, EngineError::Composition { .. }));
    }

    #[tokio::test]
    async fn test_missing_reference_is_composition_error() {
        let (composer, _) = composer(
            MockStore::new().with_values("default", doc("A", json!({})).with_ref("b", "missing")),
        );

        let err = composer.compose(&roots(&["A"])).await.unwrap_err();
        match err {
            EngineError::Composition { message } => assert!(message.contains("missing")),
            other => panic!("expected composition error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_string_payload_parsed_as_yaml() {
        let (composer, _) = composer(
            MockStore::new()
                .with_values("default", doc("A", json!("image:\n  tag: \"1.2\"\n")).with_ref("j", "B"))
                .with_values("default", doc("B", json!(r#"{"json": true}"#)))
                .with_values("default", doc("C", JsonValue::Null)),
        );

        let values = composer.compose(&roots(&["A", "C"])).await.unwrap();
        assert_eq!(values.get("image.tag").unwrap(), "1.2");
        assert_eq!(values.get("j.json").unwrap(), true);
    }

    #[tokio::test]
    async fn test_non_mapping_payload_rejected() {
        let (composer, _) = composer(
            MockStore::new()
                .with_values("default", doc("list", json!(["a"])))
                .with_values("default", doc("scalar", json!("just a string"))),
        );

        for name in ["list", "scalar"] {
            let err = composer.compose(&roots(&[name])).await.unwrap_err();
            assert!(matches!(err, EngineError::Composition { .. }), "{name}");
        }
    }

    #[tokio::test]
    async fn test_composition_is_idempotent() {
        let store = MockStore::new()
            .with_values("default", doc("A", json!({"x": {"y": 1}})).with_ref("b", "B").with_ref("c", "C"))
            .with_values("default", doc("B", json!({"x": {"z": 2}, "list": [1, 2]})))
            .with_values("default", doc("C", json!({"x": {"y": 3}})));
        let (composer, _) = composer(store);

        let first = composer.compose(&roots(&["A"])).await.unwrap();
        let second = composer.compose(&roots(&["A"])).await.unwrap();
        assert_eq!(first.to_json_string().unwrap(), second.to_json_string().unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_order_independent_of_fetch_latency() {
        let store = MockStore::new()
            .with_latency(Duration::from_millis(50))
            .with_values("default", doc("A", json!({})).with_ref("first", "B").with_ref("second", "C"))
            .with_values("default", doc("B", json!({"winner": "b"})))
            .with_values("default", doc("C", json!({"winner": "c"})));
        let (composer, store) = composer(store);

        let values = composer.compose(&roots(&["A"])).await.unwrap();
        assert_eq!(values.get("winner").unwrap(), "c");
        assert_eq!(store.peak_concurrent_reads(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fetch_deadline() {
        let store = MockStore::new()
            .with_latency(Duration::from_secs(30))
            .with_values("default", doc("A", json!({})));
        let (composer, _) = composer(store);
        let composer = composer.with_config(ComposerConfig {
            fetch_timeout: Duration::from_secs(1),
        });

        let err = composer.compose(&roots(&["A"])).await.unwrap_err();
        assert!(matches!(err, EngineError::Timeout(_)));
    }

    #[tokio::test]
    async fn test_collect_refs_edges() {
        let (composer, _) = composer(
            MockStore::new()
                .with_values("default", doc("A", json!({})).with_ref("boo", "B"))
                .with_values("default", doc("B", json!({}))),
        );

        let refs = composer.collect_refs(&roots(&["A"])).await.unwrap();
        assert_eq!(refs.len(), 2);
        assert_eq!(refs[0].parent, EdgeParent::Base);
        assert_eq!(refs[1].parent, EdgeParent::Alias("boo".to_string()));
        assert_eq!(refs[1].parent.to_string(), "boo");

        let base = refs_with_parent(&refs, &EdgeParent::Base);
        assert_eq!(base.len(), 1);
        assert_eq!(base[0].document.name, "A");
    }
}
