//! Kubernetes-backed store
//!
//! Artifacts are ConfigMaps, chart records are `Chart` resources and
//! configuration documents are `Values` resources, all namespaced.

use async_trait::async_trait;
use chartkeep_core::ChartRecord;
use k8s_openapi::ByteString;
use k8s_openapi::api::core::v1::ConfigMap;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::Client;
use kube::api::{Api, DeleteParams, ListParams, PostParams};
use tracing::debug;

use super::{ArtifactStore, ResourceCatalog};
use crate::error::{Result, StoreError};
use crate::object::{LabelSelector, StoredObject, ValuesDocument};
use crate::resources::{ChartResource, ValuesResource, chart_resource_name, resource_name_for};

/// Store backed by a Kubernetes cluster
#[derive(Clone)]
pub struct KubeStore {
    client: Client,
}

impl KubeStore {
    /// Create a store from the default kubeconfig or in-cluster config
    pub async fn new() -> Result<Self> {
        let client = Client::try_default().await?;
        Ok(Self { client })
    }

    /// Create with an existing client
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    fn config_maps(&self, namespace: &str) -> Api<ConfigMap> {
        Api::namespaced(self.client.clone(), namespace)
    }

    fn charts(&self, namespace: &str) -> Api<ChartResource> {
        Api::namespaced(self.client.clone(), namespace)
    }

    fn values(&self, namespace: &str) -> Api<ValuesResource> {
        Api::namespaced(self.client.clone(), namespace)
    }
}

/// Build a ConfigMap from a stored object
fn to_config_map(object: &StoredObject) -> ConfigMap {
    let binary_data = object
        .binary_data
        .iter()
        .map(|(k, v)| (k.clone(), ByteString(v.clone())))
        .collect();

    ConfigMap {
        metadata: ObjectMeta {
            name: Some(object.name.clone()),
            namespace: Some(object.namespace.clone()),
            labels: Some(object.labels.clone()),
            ..Default::default()
        },
        data: Some(object.data.clone()),
        binary_data: Some(binary_data),
        immutable: Some(object.immutable),
    }
}

/// Parse a stored object from a ConfigMap
fn from_config_map(cm: ConfigMap) -> Result<StoredObject> {
    let name = cm
        .metadata
        .name
        .ok_or_else(|| StoreError::invalid("<unnamed>", "ConfigMap has no name"))?;
    let namespace = cm
        .metadata
        .namespace
        .ok_or_else(|| StoreError::invalid(&name, "ConfigMap has no namespace"))?;

    Ok(StoredObject {
        name,
        namespace,
        labels: cm.metadata.labels.unwrap_or_default(),
        data: cm.data.unwrap_or_default(),
        binary_data: cm
            .binary_data
            .unwrap_or_default()
            .into_iter()
            .map(|(k, v)| (k, v.0))
            .collect(),
        immutable: cm.immutable.unwrap_or(false),
    })
}

#[async_trait]
impl ArtifactStore for KubeStore {
    async fn get(&self, namespace: &str, name: &str) -> Result<StoredObject> {
        match self.config_maps(namespace).get(name).await {
            Ok(cm) => from_config_map(cm),
            Err(kube::Error::Api(e)) if e.code == 404 => {
                Err(StoreError::not_found("object", name, namespace))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn list(&self, namespace: &str, selector: &LabelSelector) -> Result<Vec<StoredObject>> {
        let params = ListParams::default().labels(&selector.to_string());
        let list = self.config_maps(namespace).list(&params).await?;
        debug!(namespace, selector = %selector, count = list.items.len(), "listed artifacts");

        list.items.into_iter().map(from_config_map).collect()
    }

    async fn create(&self, object: &StoredObject) -> Result<()> {
        let cm = to_config_map(object);
        match self
            .config_maps(&object.namespace)
            .create(&PostParams::default(), &cm)
            .await
        {
            Ok(_) => Ok(()),
            Err(kube::Error::Api(e)) if e.code == 409 => Err(StoreError::AlreadyExists {
                kind: "object",
                name: object.name.clone(),
                namespace: object.namespace.clone(),
            }),
            Err(e) => Err(e.into()),
        }
    }

    async fn update(&self, object: &StoredObject) -> Result<()> {
        let api = self.config_maps(&object.namespace);
        let existing = match api.get(&object.name).await {
            Ok(cm) => cm,
            Err(kube::Error::Api(e)) if e.code == 404 => {
                return Err(StoreError::not_found("object", &object.name, &object.namespace));
            }
            Err(e) => return Err(e.into()),
        };

        if existing.immutable.unwrap_or(false) {
            return Err(StoreError::Immutable {
                name: object.name.clone(),
            });
        }

        let mut cm = to_config_map(object);
        cm.metadata.resource_version = existing.metadata.resource_version;
        api.replace(&object.name, &PostParams::default(), &cm).await?;
        Ok(())
    }

    async fn delete(&self, namespace: &str, name: &str) -> Result<()> {
        match self
            .config_maps(namespace)
            .delete(name, &DeleteParams::default())
            .await
        {
            Ok(_) => Ok(()),
            Err(kube::Error::Api(e)) if e.code == 404 => {
                Err(StoreError::not_found("object", name, namespace))
            }
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl ResourceCatalog for KubeStore {
    async fn get_chart(&self, namespace: &str, repository: &str, name: &str) -> Result<ChartRecord> {
        match self.charts(namespace).get(&resource_name_for(repository, name)).await {
            Ok(resource) => Ok(resource.into_record()),
            Err(kube::Error::Api(e)) if e.code == 404 => {
                Err(StoreError::not_found("chart", name, namespace))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn list_charts(&self, namespace: &str, selector: &LabelSelector) -> Result<Vec<ChartRecord>> {
        let params = ListParams::default().labels(&selector.to_string());
        let list = self.charts(namespace).list(&params).await?;
        debug!(namespace, selector = %selector, count = list.items.len(), "listed charts");

        Ok(list.items.into_iter().map(ChartResource::into_record).collect())
    }

    async fn put_chart(&self, namespace: &str, record: &ChartRecord) -> Result<()> {
        let api = self.charts(namespace);
        let name = chart_resource_name(record);
        let mut resource = ChartResource::from_record(namespace, record);

        match api.get(&name).await {
            Ok(existing) => {
                resource.metadata.resource_version = existing.metadata.resource_version;
                api.replace(&name, &PostParams::default(), &resource).await?;
            }
            Err(kube::Error::Api(e)) if e.code == 404 => {
                api.create(&PostParams::default(), &resource).await?;
            }
            Err(e) => return Err(e.into()),
        }
        Ok(())
    }

    async fn get_values(&self, namespace: &str, name: &str) -> Result<ValuesDocument> {
        match self.values(namespace).get(name).await {
            Ok(resource) => Ok(resource.into_document()),
            Err(kube::Error::Api(e)) if e.code == 404 => {
                Err(StoreError::not_found("values", name, namespace))
            }
            Err(e) => Err(e.into()),
        }
    }
}
