//! Chart version codec
//!
//! Maps a chart version's files onto a flat set of labeled objects and back.
//!
//! ## Layout
//!
//! | file path                  | artifact                                   |
//! |----------------------------|--------------------------------------------|
//! | `templates/<file>`         | `helm-tmpl-<chart>-<version>`              |
//! | `templates/<sub>/<file>`   | `helm-tmpl-<chart>-<sub>-<version>`        |
//! | `crds/<file>`              | `helm-crds-<chart>-<version>`              |
//! | `crds/<sub>/<file>`        | `helm-crds-<chart>-<sub>-<version>`        |
//! | default values             | `helm-default-<chart>-<version>` (`values`)|
//!
//! Every artifact carries `helm.soer3n.info/chart=<chart>-<version>-<kind>`;
//! nested artifacts also carry `helm.soer3n.info/subname=<sub>`. Paths deeper
//! than three segments are not stored.

use chartkeep_core::{ChartFile, Values};
use std::collections::BTreeMap;
use tracing::{debug, warn};

use crate::error::{Result, StoreError};
use crate::object::{LabelSelector, StoredObject};
use crate::store::{ArtifactStore, MAX_ARTIFACT_SIZE};

/// Label holding `<chart>-<version>-<kind>`
pub const CHART_LABEL: &str = "helm.soer3n.info/chart";
/// Label holding the sub-directory of a nested artifact
pub const SUBNAME_LABEL: &str = "helm.soer3n.info/subname";
/// Key of the default values blob
pub const DEFAULT_VALUES_KEY: &str = "values";

/// Kind of stored artifact
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArtifactKind {
    Templates,
    Crds,
    Defaults,
}

impl ArtifactKind {
    /// Every kind, in storage order
    pub const ALL: [ArtifactKind; 3] = [Self::Templates, Self::Crds, Self::Defaults];

    /// Short tag used in names and labels
    pub fn tag(self) -> &'static str {
        match self {
            Self::Templates => "tmpl",
            Self::Crds => "crds",
            Self::Defaults => "default",
        }
    }

    /// Chart directory holding files of this kind
    pub fn directory(self) -> Option<&'static str> {
        match self {
            Self::Templates => Some("templates"),
            Self::Crds => Some("crds"),
            Self::Defaults => None,
        }
    }

    /// Kind stored for a top-level chart directory
    pub fn from_directory(dir: &str) -> Option<Self> {
        match dir {
            "templates" => Some(Self::Templates),
            "crds" => Some(Self::Crds),
            _ => None,
        }
    }
}

impl std::fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Templates => write!(f, "templates"),
            Self::Crds => write!(f, "crds"),
            Self::Defaults => write!(f, "defaults"),
        }
    }
}

/// Name of the artifact holding one slice of a chart version
pub fn artifact_name(kind: ArtifactKind, chart: &str, version: &str, subpath: Option<&str>) -> String {
    match subpath {
        Some(sub) => format!("helm-{}-{}-{}-{}", kind.tag(), chart, sub, version),
        None => format!("helm-{}-{}-{}", kind.tag(), chart, version),
    }
}

/// Labels of the artifact holding one slice of a chart version
pub fn artifact_labels(
    kind: ArtifactKind,
    chart: &str,
    version: &str,
    subpath: Option<&str>,
) -> BTreeMap<String, String> {
    let mut labels = BTreeMap::new();
    labels.insert(CHART_LABEL.to_string(), chart_label_value(kind, chart, version));
    if let Some(sub) = subpath {
        labels.insert(SUBNAME_LABEL.to_string(), sub.to_string());
    }
    labels
}

/// Selector matching every artifact of one kind of a chart version
pub fn kind_selector(kind: ArtifactKind, chart: &str, version: &str) -> LabelSelector {
    LabelSelector::new().with(CHART_LABEL, chart_label_value(kind, chart, version))
}

fn chart_label_value(kind: ArtifactKind, chart: &str, version: &str) -> String {
    format!("{}-{}-{}", chart, version, kind.tag())
}

/// Result of encoding a chart version
#[derive(Debug, Clone, Default)]
pub struct EncodedChart {
    /// Artifacts to store, base artifacts first
    pub artifacts: Vec<StoredObject>,
    /// Paths that were not stored because they nest too deep
    pub dropped: Vec<String>,
}

impl EncodedChart {
    /// Name of the base artifact of a kind, if one was produced
    pub fn base_ref(&self, kind: ArtifactKind) -> Option<&str> {
        self.artifacts
            .iter()
            .find(|a| {
                a.labels.get(CHART_LABEL).is_some_and(|l| l.ends_with(&format!("-{}", kind.tag())))
                    && !a.labels.contains_key(SUBNAME_LABEL)
            })
            .map(|a| a.name.as_str())
    }
}

/// Encode a chart version's files into artifacts
///
/// Files outside `templates/` and `crds/` are ignored. Base artifacts of
/// both kinds are always produced so an empty directory decodes as empty
/// rather than missing.
pub fn encode(files: &[ChartFile], namespace: &str, chart: &str, version: &str) -> Result<EncodedChart> {
    // (kind, subpath) -> artifact
    let mut grouped: BTreeMap<(u8, Option<String>), StoredObject> = BTreeMap::new();
    let mut dropped = Vec::new();

    let new_artifact = |kind: ArtifactKind, sub: Option<&str>| StoredObject {
        name: artifact_name(kind, chart, version, sub),
        namespace: namespace.to_string(),
        labels: artifact_labels(kind, chart, version, sub),
        immutable: true,
        ..Default::default()
    };

    grouped.insert((0, None), new_artifact(ArtifactKind::Templates, None));
    grouped.insert((1, None), new_artifact(ArtifactKind::Crds, None));

    for file in files {
        let segments = file.segments();
        let Some(kind) = segments.first().and_then(|d| ArtifactKind::from_directory(d)) else {
            debug!(file = %file.name, "skipping file outside templates and crds");
            continue;
        };
        let order = if kind == ArtifactKind::Templates { 0 } else { 1 };

        match segments.as_slice() {
            [_, key] => {
                grouped
                    .entry((order, None))
                    .or_insert_with(|| new_artifact(kind, None))
                    .insert_entry(*key, file.data.clone());
            }
            [_, sub, key] => {
                grouped
                    .entry((order, Some((*sub).to_string())))
                    .or_insert_with(|| new_artifact(kind, Some(*sub)))
                    .insert_entry(*key, file.data.clone());
            }
            _ => {
                warn!(file = %file.name, chart, version, "dropping file nested deeper than one sub-directory");
                dropped.push(file.name.clone());
            }
        }
    }

    let artifacts: Vec<StoredObject> = grouped.into_values().collect();
    for artifact in &artifacts {
        check_size(artifact)?;
    }

    debug!(chart, version, artifacts = artifacts.len(), dropped = dropped.len(), "encoded chart");
    Ok(EncodedChart { artifacts, dropped })
}

/// Encode default values as one JSON blob
pub fn encode_default_values(values: &Values, namespace: &str, chart: &str, version: &str) -> Result<StoredObject> {
    let kind = ArtifactKind::Defaults;
    let mut artifact = StoredObject {
        name: artifact_name(kind, chart, version, None),
        namespace: namespace.to_string(),
        labels: artifact_labels(kind, chart, version, None),
        immutable: true,
        ..Default::default()
    };
    artifact
        .data
        .insert(DEFAULT_VALUES_KEY.to_string(), values.to_json_string()?);
    check_size(&artifact)?;
    Ok(artifact)
}

fn check_size(artifact: &StoredObject) -> Result<()> {
    let size = artifact.payload_size();
    if size > MAX_ARTIFACT_SIZE {
        return Err(StoreError::ArtifactTooLarge {
            name: artifact.name.clone(),
            size,
            max: MAX_ARTIFACT_SIZE,
        });
    }
    Ok(())
}

/// Decode the files of one kind of a chart version
///
/// Returns `NotFound` when no artifact of that kind is stored, and an
/// empty list when artifacts exist but hold no files. Files are sorted
/// by path.
pub async fn decode<S>(store: &S, namespace: &str, chart: &str, version: &str, kind: ArtifactKind) -> Result<Vec<ChartFile>>
where
    S: ArtifactStore + ?Sized,
{
    let Some(directory) = kind.directory() else {
        return Err(StoreError::invalid(
            artifact_name(kind, chart, version, None),
            "default values are not file artifacts, use load_default_values",
        ));
    };

    let artifacts = store.list(namespace, &kind_selector(kind, chart, version)).await?;
    if artifacts.is_empty() {
        return Err(StoreError::not_found(
            "artifact",
            artifact_name(kind, chart, version, None),
            namespace,
        ));
    }

    let mut files = Vec::new();
    for artifact in &artifacts {
        let prefix = match artifact.labels.get(SUBNAME_LABEL) {
            Some(sub) => format!("{}/{}/", directory, sub),
            None => format!("{}/", directory),
        };
        for (key, content) in artifact.entries() {
            files.push(ChartFile::new(format!("{}{}", prefix, key), content));
        }
    }
    files.sort_by(|a, b| a.name.cmp(&b.name));

    debug!(chart, version, %kind, artifacts = artifacts.len(), files = files.len(), "decoded chart files");
    Ok(files)
}

/// Load the default values of a chart version
pub async fn load_default_values<S>(store: &S, namespace: &str, chart: &str, version: &str) -> Result<Values>
where
    S: ArtifactStore + ?Sized,
{
    let name = artifact_name(ArtifactKind::Defaults, chart, version, None);
    let artifact = store.get(namespace, &name).await?;
    let raw = artifact
        .data
        .get(DEFAULT_VALUES_KEY)
        .ok_or_else(|| StoreError::invalid(&name, format!("missing '{}' key", DEFAULT_VALUES_KEY)))?;
    Ok(Values::from_json(raw)?)
}

/// Create or replace every artifact
pub async fn store_artifacts<S>(store: &S, artifacts: &[StoredObject]) -> Result<()>
where
    S: ArtifactStore + ?Sized,
{
    for artifact in artifacts {
        store.apply(artifact).await?;
        debug!(artifact = %artifact.name, "stored artifact");
    }
    Ok(())
}

/// Delete every artifact of a chart version, returning how many were removed
pub async fn delete_artifacts<S>(store: &S, namespace: &str, chart: &str, version: &str) -> Result<usize>
where
    S: ArtifactStore + ?Sized,
{
    let mut deleted = 0;
    for kind in ArtifactKind::ALL {
        for artifact in store.list(namespace, &kind_selector(kind, chart, version)).await? {
            match store.delete(namespace, &artifact.name).await {
                Ok(()) => deleted += 1,
                Err(e) if e.is_not_found() => {}
                Err(e) => return Err(e),
            }
        }
    }
    debug!(chart, version, deleted, "deleted chart artifacts");
    Ok(deleted)
}
