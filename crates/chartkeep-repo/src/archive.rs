//! Chart archives
//!
//! Unpacks a packaged chart (`.tgz`) in memory into its metadata, default
//! values and files. Paths are made relative to the chart root, so
//! `nginx/templates/deployment.yaml` becomes `templates/deployment.yaml`.

use chartkeep_core::{ChartFile, ChartMetadata, Values};
use flate2::read::GzDecoder;
use std::io::Read;
use std::path::{Component, Path};
use tar::Archive;
use tracing::debug;

use crate::error::{RepoError, Result};

const CHART_FILE: &str = "Chart.yaml";
const VALUES_FILE: &str = "values.yaml";

/// An unpacked chart archive
#[derive(Debug, Clone)]
pub struct ChartArchive {
    pub metadata: ChartMetadata,
    /// Default values from `values.yaml`, empty when absent
    pub values: Values,
    /// Every file of the archive, sorted by path
    pub files: Vec<ChartFile>,
}

impl ChartArchive {
    /// Unpack a gzip-compressed chart tarball
    pub fn from_tgz(bytes: &[u8]) -> Result<Self> {
        let mut archive = Archive::new(GzDecoder::new(bytes));
        let mut files = Vec::new();

        for entry in archive.entries()? {
            let mut entry = entry?;
            if !entry.header().entry_type().is_file() {
                continue;
            }

            let Some(name) = chart_relative_path(&entry.path()?) else {
                continue;
            };
            let mut data = Vec::new();
            entry.read_to_end(&mut data)?;
            files.push(ChartFile::new(name, data));
        }
        files.sort_by(|a, b| a.name.cmp(&b.name));

        let chart_yaml = files
            .iter()
            .find(|f| f.name == CHART_FILE)
            .ok_or_else(|| RepoError::invalid_archive("missing Chart.yaml"))?;
        let metadata = ChartMetadata::from_yaml(&utf8(chart_yaml)?)?;

        let values = match files.iter().find(|f| f.name == VALUES_FILE) {
            Some(file) => Values::from_yaml(&utf8(file)?)?,
            None => Values::new(),
        };

        debug!(chart = %metadata.name, version = %metadata.version, files = files.len(), "unpacked chart archive");
        Ok(Self {
            metadata,
            values,
            files,
        })
    }

    pub fn name(&self) -> &str {
        &self.metadata.name
    }

    pub fn version(&self) -> &str {
        &self.metadata.version
    }
}

/// Strip the top-level chart directory; reject anything but plain segments
fn chart_relative_path(path: &Path) -> Option<String> {
    let mut segments = Vec::new();
    for component in path.components() {
        match component {
            Component::Normal(segment) => segments.push(segment.to_str()?),
            Component::CurDir => {}
            _ => return None,
        }
    }
    if segments.len() < 2 {
        return None;
    }
    Some(segments[1..].join("/"))
}

fn utf8(file: &ChartFile) -> Result<String> {
    String::from_utf8(file.data.clone())
        .map_err(|e| RepoError::invalid_archive(format!("{} is not valid UTF-8: {}", file.name, e)))
}
