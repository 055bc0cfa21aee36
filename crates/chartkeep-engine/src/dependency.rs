//! Dependency resolution
//!
//! Walks a chart version's declared dependencies against the chart records
//! of a repository (or repository group), gates each one on its condition
//! path and materializes the included ones recursively.
//!
//! Exact versions must be stored verbatim. Ranges are resolved once against
//! the candidate's version list and the pinned version is written into the
//! parent's dependency list.

use chartkeep_core::{ChartDependency, ChartFile, ChartRecord, ChartVersion, Condition, REPO_GROUP_LABEL, REPO_LABEL, Values};
use chartkeep_store::{ArtifactKind, ChartStore, LabelSelector, decode, load_default_values};
use futures::future::{BoxFuture, FutureExt};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::bundle::{BundleMetadata, MaterializedBundle};
use crate::error::{EngineError, Result};

/// Which chart records dependencies are resolved against
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RepoSelector {
    /// Records of one repository (`repo` label)
    Repository(String),
    /// Records of every repository in a group (`repoGroup` label)
    Group(String),
}

impl RepoSelector {
    /// Label selector matching the chart records of this selector
    pub fn label_selector(&self) -> LabelSelector {
        match self {
            Self::Repository(repo) => LabelSelector::new().with(REPO_LABEL, repo.as_str()),
            Self::Group(group) => LabelSelector::new().with(REPO_GROUP_LABEL, group.as_str()),
        }
    }
}

impl std::fmt::Display for RepoSelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Repository(repo) => write!(f, "repository '{}'", repo),
            Self::Group(group) => write!(f, "repository group '{}'", group),
        }
    }
}

/// Resolver configuration
#[derive(Debug, Clone)]
pub struct ResolverConfig {
    /// Maximum nesting depth of dependencies (default: 10)
    pub max_depth: usize,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self { max_depth: 10 }
    }
}

impl ResolverConfig {
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }
}

/// Why a declared dependency was left out
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "camelCase")]
pub enum SkipReason {
    /// The condition path evaluated to false
    ConditionFalse { condition: String },
    /// The condition path is malformed
    InvalidCondition { condition: String, message: String },
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ConditionFalse { condition } => write!(f, "condition '{}' is false", condition),
            Self::InvalidCondition { condition, message } => {
                write!(f, "invalid condition '{}': {}", condition, message)
            }
        }
    }
}

/// A declared dependency that was not materialized
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedDependency {
    pub dependency: ChartDependency,
    #[serde(flatten)]
    pub reason: SkipReason,
}

/// Outcome of resolving one dependency list
#[derive(Debug, Default)]
pub struct Resolution {
    /// Sub-bundles of the included dependencies, in declared order
    pub bundles: Vec<MaterializedBundle>,
    /// The declared list with included dependencies pinned
    pub pinned: Vec<ChartDependency>,
    /// Dependencies left out by their condition
    pub skipped: Vec<SkippedDependency>,
}

/// Stored content of one chart version
#[derive(Debug, Clone)]
pub struct ChartContent {
    pub templates: Vec<ChartFile>,
    pub crds: Vec<ChartFile>,
    pub defaults: Values,
}

/// Resolves dependency trees from a chart store
pub struct Resolver<S: ?Sized> {
    store: Arc<S>,
    namespace: String,
    config: ResolverConfig,
}

impl<S> Resolver<S>
where
    S: ChartStore + ?Sized + 'static,
{
    pub fn new(store: Arc<S>, namespace: impl Into<String>) -> Self {
        Self {
            store,
            namespace: namespace.into(),
            config: ResolverConfig::default(),
        }
    }

    /// Builder: set configuration
    pub fn with_config(mut self, config: ResolverConfig) -> Self {
        self.config = config;
        self
    }

    /// Load templates, CRDs and default values of a chart version
    ///
    /// Missing templates are fatal. Missing CRDs mean the chart has none and
    /// missing defaults mean empty values.
    pub async fn load_chart(&self, chart: &str, version: &str) -> Result<ChartContent> {
        let store = self.store.as_ref();
        let namespace = self.namespace.as_str();

        let templates = async {
            decode(store, namespace, chart, version, ArtifactKind::Templates)
                .await
                .map_err(EngineError::from)
        };
        let crds = async {
            match decode(store, namespace, chart, version, ArtifactKind::Crds).await {
                Ok(files) => Ok(files),
                Err(e) if e.is_not_found() => Ok(Vec::new()),
                Err(e) => Err(EngineError::from(e)),
            }
        };
        let defaults = async {
            match load_default_values(store, namespace, chart, version).await {
                Ok(values) => Ok(values),
                Err(e) if e.is_not_found() => {
                    debug!(chart, version, "no default values stored");
                    Ok(Values::new())
                }
                Err(e) => Err(EngineError::from(e)),
            }
        };

        let (templates, crds, defaults) = tokio::try_join!(templates, crds, defaults)?;
        Ok(ChartContent {
            templates,
            crds,
            defaults,
        })
    }

    /// Resolve the dependencies declared by `chart`
    ///
    /// `values` are the composed values of `chart`; conditions are evaluated
    /// against them and each dependency receives its scoped slice.
    pub async fn resolve(
        &self,
        chart: &str,
        dependencies: &[ChartDependency],
        values: &Values,
        selector: &RepoSelector,
    ) -> Result<Resolution> {
        self.resolve_level(dependencies, values, selector, 1, vec![chart.to_string()])
            .await
    }

    fn resolve_level<'a>(
        &'a self,
        dependencies: &'a [ChartDependency],
        values: &'a Values,
        selector: &'a RepoSelector,
        depth: usize,
        path: Vec<String>,
    ) -> BoxFuture<'a, Result<Resolution>> {
        async move {
            let mut resolution = Resolution::default();
            if dependencies.is_empty() {
                return Ok(resolution);
            }

            let chart = path.last().map(String::as_str).unwrap_or_default();
            let candidates = self
                .store
                .list_charts(&self.namespace, &selector.label_selector())
                .await?;
            debug!(chart, depth, candidates = candidates.len(), "resolving dependencies");

            for dependency in dependencies {
                if let Some(reason) = skip_reason(dependency, values) {
                    debug!(chart, dependency = %dependency.name, %reason, "skipping dependency");
                    resolution.pinned.push(dependency.clone());
                    resolution.skipped.push(SkippedDependency {
                        dependency: dependency.clone(),
                        reason,
                    });
                    continue;
                }

                let candidate = candidates
                    .iter()
                    .find(|c| c.name == dependency.name)
                    .ok_or_else(|| EngineError::DependencyUnavailable {
                        chart: chart.to_string(),
                        dependency: dependency.name.clone(),
                        selector: selector.to_string(),
                    })?;

                if path.contains(&dependency.name) {
                    let mut cycle = path.clone();
                    cycle.push(dependency.name.clone());
                    return Err(EngineError::DependencyCycle {
                        path: cycle.join(" -> "),
                    });
                }
                if depth > self.config.max_depth {
                    let mut chain = path.clone();
                    chain.push(dependency.name.clone());
                    return Err(EngineError::DepthExceeded {
                        max: self.config.max_depth,
                        path: chain.join(" -> "),
                    });
                }

                let version = pin_version(dependency, candidate)?;
                let mut pinned = dependency.clone();
                pinned.version = version.name.clone();
                if pinned.repo.is_empty() {
                    pinned.repo = candidate.repository.clone();
                }

                let content = self.load_chart(&candidate.name, &version.name).await?;
                let sub_values = Values::for_dependency(content.defaults, values, &dependency.name);

                let mut sub_path = path.clone();
                sub_path.push(dependency.name.clone());
                let nested = self
                    .resolve_level(&version.deps, &sub_values, selector, depth + 1, sub_path)
                    .await?;

                debug!(chart, dependency = %dependency.name, version = %version.name, "resolved dependency");
                resolution.bundles.push(MaterializedBundle {
                    metadata: BundleMetadata {
                        name: candidate.name.clone(),
                        version: version.name.clone(),
                        repository: candidate.repository.clone(),
                        dependencies: nested.pinned,
                    },
                    templates: content.templates,
                    crds: content.crds,
                    values: sub_values,
                    dependencies: nested.bundles,
                    skipped: nested.skipped,
                });
                resolution.pinned.push(pinned);
            }

            Ok(resolution)
        }
        .boxed()
    }
}

/// Evaluate a dependency's condition; `None` means included
fn skip_reason(dependency: &ChartDependency, values: &Values) -> Option<SkipReason> {
    match Condition::parse(&dependency.condition) {
        Ok(None) => None,
        Ok(Some(condition)) if condition.evaluate(values.inner()) => None,
        Ok(Some(condition)) => Some(SkipReason::ConditionFalse {
            condition: condition.to_string(),
        }),
        Err(e) => {
            warn!(
                dependency = %dependency.name,
                condition = %dependency.condition,
                error = %e,
                "failed to parse condition for dependency"
            );
            Some(SkipReason::InvalidCondition {
                condition: dependency.condition.clone(),
                message: e.to_string(),
            })
        }
    }
}

/// Select the stored version a dependency resolves to
///
/// An exact version must be stored verbatim; a range selects the first
/// stored version satisfying it, in declared order.
pub fn pin_version<'a>(dependency: &ChartDependency, candidate: &'a ChartRecord) -> Result<&'a ChartVersion> {
    if dependency.is_pinned() {
        return candidate
            .versions
            .iter()
            .find(|v| v.name == dependency.version)
            .ok_or_else(|| EngineError::VersionMismatch {
                dependency: dependency.name.clone(),
                version: dependency.version.clone(),
                available: available_versions(candidate),
            });
    }

    candidate
        .get_chart_version(&dependency.version)
        .ok_or_else(|| EngineError::VersionNotFound {
            chart: dependency.name.clone(),
            constraint: dependency.version.clone(),
        })
}

/// Pin a dependency list against candidate records at storage time
///
/// Dependencies that cannot be pinned are kept as declared and logged.
pub fn pin_dependencies(dependencies: &[ChartDependency], candidates: &[ChartRecord]) -> Vec<ChartDependency> {
    dependencies
        .iter()
        .map(|dependency| {
            let Some(candidate) = candidates.iter().find(|c| c.name == dependency.name) else {
                warn!(dependency = %dependency.name, "no chart record to pin dependency against");
                return dependency.clone();
            };
            match pin_version(dependency, candidate) {
                Ok(version) => {
                    let mut pinned = dependency.clone();
                    pinned.version = version.name.clone();
                    pinned
                }
                Err(e) => {
                    warn!(dependency = %dependency.name, error = %e, "leaving dependency unpinned");
                    dependency.clone()
                }
            }
        })
        .collect()
}

fn available_versions(record: &ChartRecord) -> String {
    if record.versions.is_empty() {
        return "none".to_string();
    }
    record
        .versions
        .iter()
        .map(|v| v.name.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}
