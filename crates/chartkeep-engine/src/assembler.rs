//! Chart assembly
//!
//! Turns `(chart, version, repository, overrides)` into a validated
//! [`MaterializedBundle`] using stored artifacts, chart records and
//! configuration documents.

use chartkeep_core::{CHART_LABEL, Values};
use chartkeep_store::ChartStore;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use crate::bundle::{BundleMetadata, MaterializedBundle};
use crate::compose::{Composer, ComposerConfig};
use crate::dependency::{RepoSelector, Resolver, ResolverConfig};
use crate::error::{EngineError, Result};

/// Assembler configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssemblerConfig {
    /// Deadline for one assembly (default: 30s)
    #[serde(default = "default_timeout", with = "humantime_serde")]
    pub timeout: Duration,

    /// Maximum dependency nesting depth (default: 10)
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,

    /// Configuration document composition
    #[serde(default)]
    pub compose: ComposerConfig,
}

fn default_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_max_depth() -> usize {
    10
}

impl Default for AssemblerConfig {
    fn default() -> Self {
        Self {
            timeout: default_timeout(),
            max_depth: default_max_depth(),
            compose: ComposerConfig::default(),
        }
    }
}

impl AssemblerConfig {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.compose.fetch_timeout = timeout;
        self
    }
}

/// What to assemble
#[derive(Debug, Clone)]
pub struct AssembleRequest {
    pub chart: String,
    /// Exact version or version constraint
    pub version: String,
    pub repo: RepoSelector,
    /// Values merged over the chart's stored defaults
    pub overrides: Values,
}

impl AssembleRequest {
    pub fn new(chart: impl Into<String>, version: impl Into<String>, repo: RepoSelector) -> Self {
        Self {
            chart: chart.into(),
            version: version.into(),
            repo,
            overrides: Values::new(),
        }
    }

    pub fn with_overrides(mut self, overrides: Values) -> Self {
        self.overrides = overrides;
        self
    }
}

/// Assembles install-ready bundles from a chart store
pub struct Assembler<S: ?Sized> {
    store: Arc<S>,
    namespace: String,
    config: AssemblerConfig,
}

impl<S> Assembler<S>
where
    S: ChartStore + ?Sized + 'static,
{
    pub fn new(store: Arc<S>, namespace: impl Into<String>) -> Self {
        Self {
            store,
            namespace: namespace.into(),
            config: AssemblerConfig::default(),
        }
    }

    /// Builder: set configuration
    pub fn with_config(mut self, config: AssemblerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &AssemblerConfig {
        &self.config
    }

    /// Assemble one chart version with its dependency tree
    pub async fn assemble(&self, request: &AssembleRequest) -> Result<MaterializedBundle> {
        self.with_deadline(self.assemble_inner(request, request.overrides.clone()))
            .await
    }

    /// Compose configuration documents, then assemble with the result
    ///
    /// The composed values are merged under `request.overrides`, so explicit
    /// overrides still win.
    pub async fn compose_and_assemble(
        &self,
        request: &AssembleRequest,
        documents: &[String],
    ) -> Result<MaterializedBundle> {
        self.with_deadline(async {
            let mut overrides = self.composer().compose(documents).await?;
            overrides.merge(&request.overrides);
            self.assemble_inner(request, overrides).await
        })
        .await
    }

    /// Composer sharing this assembler's store and namespace
    pub fn composer(&self) -> Composer<S> {
        Composer::new(Arc::clone(&self.store), self.namespace.clone())
            .with_config(self.config.compose.clone())
    }

    fn resolver(&self) -> Resolver<S> {
        Resolver::new(Arc::clone(&self.store), self.namespace.clone())
            .with_config(ResolverConfig::default().with_max_depth(self.config.max_depth))
    }

    async fn with_deadline<T>(&self, work: impl Future<Output = Result<T>>) -> Result<T> {
        match tokio::time::timeout(self.config.timeout, work).await {
            Ok(result) => result,
            Err(_) => Err(EngineError::Timeout(self.config.timeout)),
        }
    }

    async fn assemble_inner(&self, request: &AssembleRequest, overrides: Values) -> Result<MaterializedBundle> {
        let selector = request.repo.label_selector().with(CHART_LABEL, request.chart.as_str());
        let records = self.store.list_charts(&self.namespace, &selector).await?;
        let record = records
            .iter()
            .find(|r| r.name == request.chart)
            .ok_or_else(|| EngineError::ChartNotFound {
                chart: request.chart.clone(),
                selector: request.repo.to_string(),
            })?;

        let version = record
            .get_chart_version(&request.version)
            .ok_or_else(|| EngineError::VersionNotFound {
                chart: request.chart.clone(),
                constraint: request.version.clone(),
            })?;
        debug!(chart = %record.name, constraint = %request.version, version = %version.name, "selected chart version");

        let resolver = self.resolver();
        let content = resolver.load_chart(&record.name, &version.name).await?;

        let mut values = content.defaults;
        values.merge(&overrides);

        let resolution = resolver
            .resolve(&record.name, &version.deps, &values, &request.repo)
            .await?;

        let bundle = MaterializedBundle {
            metadata: BundleMetadata {
                name: record.name.clone(),
                version: version.name.clone(),
                repository: record.repository.clone(),
                dependencies: resolution.pinned,
            },
            templates: content.templates,
            crds: content.crds,
            values,
            dependencies: resolution.bundles,
            skipped: resolution.skipped,
        };
        bundle.validate()?;

        info!(
            chart = %bundle.metadata.name,
            version = %bundle.metadata.version,
            bundles = bundle.bundle_count(),
            skipped = bundle.skipped.len(),
            "assembled chart"
        );
        Ok(bundle)
    }
}
