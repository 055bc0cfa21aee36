//! Mock store for testing
//!
//! Keeps artifacts, chart records and configuration documents in memory,
//! useful for unit tests without requiring a Kubernetes cluster.

use async_trait::async_trait;
use chartkeep_core::ChartRecord;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use super::{ArtifactStore, ResourceCatalog};
use crate::error::{Result, StoreError};
use crate::object::{LabelSelector, StoredObject, ValuesDocument};

type Namespaced<T> = HashMap<String, BTreeMap<String, T>>;

/// In-memory store for testing
#[derive(Clone, Default)]
pub struct MockStore {
    /// namespace -> object name -> object
    objects: Arc<RwLock<Namespaced<StoredObject>>>,
    /// namespace -> "<repo>/<chart>" -> record
    charts: Arc<RwLock<Namespaced<ChartRecord>>>,
    /// namespace -> document name -> document
    values: Arc<RwLock<Namespaced<ValuesDocument>>>,
    /// Track operation counts for assertions
    operations: Arc<RwLock<OperationCounts>>,
    /// Delay applied before every read
    latency: Option<Duration>,
    in_flight: Arc<AtomicUsize>,
    peak_in_flight: Arc<AtomicUsize>,
}

/// Counts of operations performed for testing assertions
#[derive(Debug, Default, Clone)]
pub struct OperationCounts {
    pub gets: usize,
    pub lists: usize,
    pub creates: usize,
    pub updates: usize,
    pub deletes: usize,
    /// Reads per configuration document name
    pub value_gets: HashMap<String, usize>,
}

impl MockStore {
    /// Create a new empty mock store
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: delay every read by `latency`
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Builder: pre-populate stored objects
    pub fn with_objects(self, objects: impl IntoIterator<Item = StoredObject>) -> Self {
        {
            let mut store = self.objects.write().unwrap();
            for object in objects {
                store
                    .entry(object.namespace.clone())
                    .or_default()
                    .insert(object.name.clone(), object);
            }
        }
        self
    }

    /// Builder: pre-populate a chart record
    pub fn with_chart(self, namespace: &str, record: ChartRecord) -> Self {
        self.charts
            .write()
            .unwrap()
            .entry(namespace.to_string())
            .or_default()
            .insert(chart_key(&record), record);
        self
    }

    /// Builder: pre-populate a configuration document
    pub fn with_values(self, namespace: &str, document: ValuesDocument) -> Self {
        self.values
            .write()
            .unwrap()
            .entry(namespace.to_string())
            .or_default()
            .insert(document.name.clone(), document);
        self
    }

    /// Get operation counts for assertions
    pub fn operation_counts(&self) -> OperationCounts {
        self.operations.read().unwrap().clone()
    }

    /// Reset operation counts
    pub fn reset_counts(&self) {
        let mut ops = self.operations.write().unwrap();
        *ops = OperationCounts::default();
        self.peak_in_flight.store(0, Ordering::SeqCst);
    }

    /// Highest number of reads observed running at the same time
    pub fn peak_concurrent_reads(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    /// All stored objects of a namespace, ordered by name
    pub fn objects_in(&self, namespace: &str) -> Vec<StoredObject> {
        self.objects
            .read()
            .unwrap()
            .get(namespace)
            .map(|ns| ns.values().cloned().collect())
            .unwrap_or_default()
    }

    /// All chart records of a namespace
    pub fn charts_in(&self, namespace: &str) -> Vec<ChartRecord> {
        self.charts
            .read()
            .unwrap()
            .get(namespace)
            .map(|ns| ns.values().cloned().collect())
            .unwrap_or_default()
    }

    async fn read_delay(&self) -> ReadGuard<'_> {
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(current, Ordering::SeqCst);
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        ReadGuard(&self.in_flight)
    }

    fn count(&self, f: impl FnOnce(&mut OperationCounts)) {
        let mut ops = self.operations.write().unwrap();
        f(&mut ops);
    }
}

struct ReadGuard<'a>(&'a AtomicUsize);

impl Drop for ReadGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

fn chart_key(record: &ChartRecord) -> String {
    format!("{}/{}", record.repository, record.name)
}

#[async_trait]
impl ArtifactStore for MockStore {
    async fn get(&self, namespace: &str, name: &str) -> Result<StoredObject> {
        let _guard = self.read_delay().await;
        self.count(|ops| ops.gets += 1);

        let store = self.objects.read().unwrap();
        store
            .get(namespace)
            .and_then(|ns| ns.get(name))
            .cloned()
            .ok_or_else(|| StoreError::not_found("object", name, namespace))
    }

    async fn list(&self, namespace: &str, selector: &LabelSelector) -> Result<Vec<StoredObject>> {
        let _guard = self.read_delay().await;
        self.count(|ops| ops.lists += 1);

        let store = self.objects.read().unwrap();
        Ok(store
            .get(namespace)
            .map(|ns| ns.values().filter(|o| o.matches(selector)).cloned().collect())
            .unwrap_or_default())
    }

    async fn create(&self, object: &StoredObject) -> Result<()> {
        self.count(|ops| ops.creates += 1);

        let mut store = self.objects.write().unwrap();
        let ns = store.entry(object.namespace.clone()).or_default();
        if ns.contains_key(&object.name) {
            return Err(StoreError::AlreadyExists {
                kind: "object",
                name: object.name.clone(),
                namespace: object.namespace.clone(),
            });
        }
        ns.insert(object.name.clone(), object.clone());
        Ok(())
    }

    async fn update(&self, object: &StoredObject) -> Result<()> {
        self.count(|ops| ops.updates += 1);

        let mut store = self.objects.write().unwrap();
        let existing = store
            .get_mut(&object.namespace)
            .and_then(|ns| ns.get_mut(&object.name))
            .ok_or_else(|| StoreError::not_found("object", &object.name, &object.namespace))?;

        if existing.immutable {
            return Err(StoreError::Immutable {
                name: object.name.clone(),
            });
        }
        *existing = object.clone();
        Ok(())
    }

    async fn delete(&self, namespace: &str, name: &str) -> Result<()> {
        self.count(|ops| ops.deletes += 1);

        let mut store = self.objects.write().unwrap();
        store
            .get_mut(namespace)
            .and_then(|ns| ns.remove(name))
            .map(|_| ())
            .ok_or_else(|| StoreError::not_found("object", name, namespace))
    }
}

#[async_trait]
impl ResourceCatalog for MockStore {
    async fn get_chart(&self, namespace: &str, repository: &str, name: &str) -> Result<ChartRecord> {
        let _guard = self.read_delay().await;
        self.count(|ops| ops.gets += 1);

        let store = self.charts.read().unwrap();
        store
            .get(namespace)
            .and_then(|ns| ns.get(&format!("{}/{}", repository, name)))
            .cloned()
            .ok_or_else(|| StoreError::not_found("chart", name, namespace))
    }

    async fn list_charts(&self, namespace: &str, selector: &LabelSelector) -> Result<Vec<ChartRecord>> {
        let _guard = self.read_delay().await;
        self.count(|ops| ops.lists += 1);

        let store = self.charts.read().unwrap();
        Ok(store
            .get(namespace)
            .map(|ns| {
                ns.values()
                    .filter(|r| selector.matches(&r.labels()))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn put_chart(&self, namespace: &str, record: &ChartRecord) -> Result<()> {
        self.count(|ops| ops.updates += 1);

        self.charts
            .write()
            .unwrap()
            .entry(namespace.to_string())
            .or_default()
            .insert(chart_key(record), record.clone());
        Ok(())
    }

    async fn get_values(&self, namespace: &str, name: &str) -> Result<ValuesDocument> {
        let _guard = self.read_delay().await;
        self.count(|ops| {
            ops.gets += 1;
            *ops.value_gets.entry(name.to_string()).or_default() += 1;
        });

        let store = self.values.read().unwrap();
        store
            .get(namespace)
            .and_then(|ns| ns.get(name))
            .cloned()
            .ok_or_else(|| StoreError::not_found("values", name, namespace))
    }
}
