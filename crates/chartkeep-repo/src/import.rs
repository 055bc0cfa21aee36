//! Chart import
//!
//! Stores an unpacked chart archive as artifacts and records the version in
//! the chart catalog:
//!
//! 1. Encode templates and CRDs, store them together with the default values
//! 2. Pin declared dependencies against the charts already in the catalog
//! 3. Upsert the `ChartVersion` on the chart record, replacing an existing
//!    entry of the same version

use chartkeep_core::{ChartDependency, ChartRecord, ChartVersion};
use chartkeep_engine::{RepoSelector, pin_dependencies};
use chartkeep_store::{
    ArtifactKind, ChartStore, delete_artifacts, encode, encode_default_values, store_artifacts,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

use crate::archive::ChartArchive;
use crate::error::Result;
use crate::fetch::ArchiveFetcher;
use crate::index::RepositoryIndex;

/// Outcome of importing one chart version
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportReport {
    pub chart: String,
    pub version: String,
    pub repository: String,
    /// Number of artifacts written, default values included
    pub artifacts: usize,
    /// Paths left out because they nest too deep
    pub dropped: Vec<String>,
    /// Dependencies as stored on the chart version
    pub dependencies: Vec<ChartDependency>,
}

/// Where an imported chart is recorded
#[derive(Debug, Clone)]
pub struct ImportTarget {
    pub repository: String,
    pub group: Option<String>,
}

impl ImportTarget {
    pub fn new(repository: impl Into<String>) -> Self {
        Self {
            repository: repository.into(),
            group: None,
        }
    }

    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    /// Catalog scope dependencies are pinned against
    fn selector(&self) -> RepoSelector {
        match &self.group {
            Some(group) => RepoSelector::Group(group.clone()),
            None => RepoSelector::Repository(self.repository.clone()),
        }
    }
}

/// Imports chart archives into a chart store
pub struct ChartImporter<S: ?Sized> {
    store: Arc<S>,
    namespace: String,
}

impl<S> ChartImporter<S>
where
    S: ChartStore + ?Sized,
{
    pub fn new(store: Arc<S>, namespace: impl Into<String>) -> Self {
        Self {
            store,
            namespace: namespace.into(),
        }
    }

    /// Store an unpacked archive and record its version
    pub async fn import(&self, archive: &ChartArchive, target: &ImportTarget, url: Option<&str>) -> Result<ImportReport> {
        let store = self.store.as_ref();
        let chart = archive.name();
        let version = archive.version();

        let encoded = encode(&archive.files, &self.namespace, chart, version)?;
        let defaults = encode_default_values(&archive.values, &self.namespace, chart, version)?;
        store_artifacts(store, &encoded.artifacts).await?;
        store_artifacts(store, std::slice::from_ref(&defaults)).await?;

        let candidates = store
            .list_charts(&self.namespace, &target.selector().label_selector())
            .await?;
        let dependencies = pin_dependencies(&archive.metadata.chart_dependencies(), &candidates);

        let mut record = match store.get_chart(&self.namespace, &target.repository, chart).await {
            Ok(record) => record,
            Err(e) if e.is_not_found() => ChartRecord::new(chart, target.repository.as_str()),
            Err(e) => return Err(e.into()),
        };
        if target.group.is_some() {
            record.repo_group = target.group.clone();
        }
        record.upsert_version(ChartVersion {
            name: version.to_string(),
            template_ref: encoded
                .base_ref(ArtifactKind::Templates)
                .map(str::to_string)
                .unwrap_or_default(),
            crd_ref: encoded.base_ref(ArtifactKind::Crds).map(str::to_string),
            deps: dependencies.clone(),
            url: url.map(str::to_string),
        });
        store.put_chart(&self.namespace, &record).await?;

        if !encoded.dropped.is_empty() {
            warn!(chart, version, dropped = encoded.dropped.len(), "some files were not stored");
        }
        info!(chart, version, repository = %target.repository, artifacts = encoded.artifacts.len() + 1, "imported chart");

        Ok(ImportReport {
            chart: chart.to_string(),
            version: version.to_string(),
            repository: target.repository.clone(),
            artifacts: encoded.artifacts.len() + 1,
            dropped: encoded.dropped,
            dependencies,
        })
    }

    /// Download an archive and import it
    pub async fn import_url<F>(&self, fetcher: &F, url: &str, target: &ImportTarget) -> Result<ImportReport>
    where
        F: ArchiveFetcher + ?Sized,
    {
        let bytes = fetcher.fetch(url).await?;
        let archive = ChartArchive::from_tgz(&bytes)?;
        self.import(&archive, target, Some(url)).await
    }

    /// Look a chart up in a repository index, download and import it
    pub async fn import_from_repository<F>(
        &self,
        fetcher: &F,
        repo_url: &str,
        chart: &str,
        constraint: &str,
        target: &ImportTarget,
    ) -> Result<ImportReport>
    where
        F: ArchiveFetcher + ?Sized,
    {
        let index = RepositoryIndex::fetch(fetcher, repo_url).await?;
        let (url, entry) = index.chart_url(repo_url, chart, constraint)?;
        info!(chart, version = %entry.version, url = %url, "downloading chart");
        self.import_url(fetcher, url.as_str(), target).await
    }

    /// Delete one chart version's artifacts and drop it from its record
    ///
    /// Returns the number of artifacts deleted.
    pub async fn remove(&self, repository: &str, chart: &str, version: &str) -> Result<usize> {
        let store = self.store.as_ref();
        let deleted = delete_artifacts(store, &self.namespace, chart, version).await?;

        match store.get_chart(&self.namespace, repository, chart).await {
            Ok(mut record) => {
                if record.remove_version(version).is_some() {
                    store.put_chart(&self.namespace, &record).await?;
                }
            }
            Err(e) if e.is_not_found() => {}
            Err(e) => return Err(e.into()),
        }

        info!(chart, version, deleted, "removed chart version");
        Ok(deleted)
    }
}
