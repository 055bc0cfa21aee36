//! Custom resources backing the catalog
//!
//! `Chart` holds one chart record with its version list, `Values` holds one
//! configuration document. Both live in the `helm.soer3n.info/v1alpha1`
//! API group.

use chartkeep_core::{ChartRecord, ChartVersion, REPO_GROUP_LABEL};
use indexmap::IndexMap;
use kube::CustomResource;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::object::ValuesDocument;

/// Spec of the `Chart` resource
#[derive(CustomResource, Clone, Debug, Default, Serialize, Deserialize)]
#[kube(
    group = "helm.soer3n.info",
    version = "v1alpha1",
    kind = "Chart",
    root = "ChartResource",
    namespaced,
    schema = "disabled"
)]
#[serde(rename_all = "camelCase")]
pub struct ChartSpec {
    pub name: String,
    pub repository: String,
    #[serde(default)]
    pub versions: Vec<ChartVersion>,
}

/// Spec of the `Values` resource
#[derive(CustomResource, Clone, Debug, Default, Serialize, Deserialize)]
#[kube(
    group = "helm.soer3n.info",
    version = "v1alpha1",
    kind = "Values",
    root = "ValuesResource",
    namespaced,
    schema = "disabled"
)]
pub struct ValuesSpec {
    /// Inline payload
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub values: Option<JsonValue>,

    /// Structured payload, preferred over `values` when set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub json: Option<JsonValue>,

    #[serde(default)]
    pub refs: IndexMap<String, String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selector: Option<String>,
}

/// Resource name of a chart record
///
/// Records are unique per repository, so the repository prefixes the name.
pub fn chart_resource_name(record: &ChartRecord) -> String {
    resource_name_for(&record.repository, &record.name)
}

pub(crate) fn resource_name_for(repository: &str, chart: &str) -> String {
    format!("{}-{}", repository, chart)
}

impl ChartResource {
    /// Build the resource for a record, carrying the record labels
    pub fn from_record(namespace: &str, record: &ChartRecord) -> Self {
        let mut resource = ChartResource::new(
            &chart_resource_name(record),
            ChartSpec {
                name: record.name.clone(),
                repository: record.repository.clone(),
                versions: record.versions.clone(),
            },
        );
        resource.metadata = ObjectMeta {
            name: Some(chart_resource_name(record)),
            namespace: Some(namespace.to_string()),
            labels: Some(record.labels()),
            ..Default::default()
        };
        resource
    }

    /// Convert back into a record
    pub fn into_record(self) -> ChartRecord {
        let repo_group = self
            .metadata
            .labels
            .as_ref()
            .and_then(|l| l.get(REPO_GROUP_LABEL))
            .cloned();

        ChartRecord {
            name: self.spec.name,
            repository: self.spec.repository,
            repo_group,
            versions: self.spec.versions,
        }
    }
}

impl ValuesResource {
    /// Convert into a configuration document
    pub fn into_document(self) -> ValuesDocument {
        let name = self.metadata.name.unwrap_or_default();
        let values = self
            .spec
            .json
            .or(self.spec.values)
            .unwrap_or(JsonValue::Null);

        ValuesDocument {
            name,
            values,
            refs: self.spec.refs,
            selector: self.spec.selector,
        }
    }
}
