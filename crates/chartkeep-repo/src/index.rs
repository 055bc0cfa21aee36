//! Repository index types
//!
//! Helm `index.yaml` format, reduced to what import needs.

use chartkeep_core::{is_exact_version, parse_version_req};
use chrono::{DateTime, Utc};
use semver::{Version, VersionReq};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use url::Url;

use crate::error::{RepoError, Result};
use crate::fetch::ArchiveFetcher;

/// Repository index (Helm-compatible)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepositoryIndex {
    /// API version
    #[serde(default = "default_api_version")]
    pub api_version: String,

    /// When this index was generated
    #[serde(default)]
    pub generated: Option<DateTime<Utc>>,

    /// Chart versions indexed by chart name
    #[serde(default)]
    pub entries: HashMap<String, Vec<ChartEntry>>,
}

fn default_api_version() -> String {
    "v1".to_string()
}

/// One chart version in an index
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartEntry {
    pub name: String,
    pub version: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_version: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Download URLs, absolute or relative to the repository URL
    #[serde(default)]
    pub urls: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub digest: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<DateTime<Utc>>,
}

impl RepositoryIndex {
    /// Parse index from YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).map_err(|e| RepoError::IndexParseError {
            message: e.to_string(),
        })
    }

    /// Parse index from bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let yaml = std::str::from_utf8(bytes).map_err(|e| RepoError::IndexParseError {
            message: format!("Invalid UTF-8: {}", e),
        })?;
        Self::from_yaml(yaml)
    }

    /// Download and parse the index of a repository
    pub async fn fetch<F>(fetcher: &F, repo_url: &str) -> Result<Self>
    where
        F: ArchiveFetcher + ?Sized,
    {
        let url = index_url(repo_url)?;
        let bytes = fetcher.fetch(url.as_str()).await?;
        Self::from_bytes(&bytes)
    }

    /// Get all versions of a chart
    pub fn get(&self, name: &str) -> Option<&Vec<ChartEntry>> {
        self.entries.get(name)
    }

    /// Find the entry for an exact version, or the highest matching a range
    ///
    /// An empty constraint selects the highest version.
    pub fn find_best_match(&self, name: &str, constraint: &str) -> Result<&ChartEntry> {
        let entries = self.entries.get(name).ok_or_else(|| RepoError::ChartNotFound {
            name: name.to_string(),
            repo: "index".to_string(),
        })?;

        let unsatisfiable = || RepoError::UnsatisfiableConstraint {
            name: name.to_string(),
            constraint: constraint.to_string(),
            available: entries
                .iter()
                .map(|e| e.version.as_str())
                .collect::<Vec<_>>()
                .join(", "),
        };

        let constraint = constraint.trim();
        if is_exact_version(constraint) {
            let wanted = constraint.strip_prefix('v').unwrap_or(constraint);
            return entries
                .iter()
                .find(|e| e.version.strip_prefix('v').unwrap_or(&e.version) == wanted)
                .ok_or_else(unsatisfiable);
        }

        let req = if constraint.is_empty() {
            VersionReq::STAR
        } else {
            parse_version_req(constraint).ok_or_else(unsatisfiable)?
        };

        entries
            .iter()
            .filter_map(|e| parse_version(&e.version).map(|v| (v, e)))
            .filter(|(v, _)| req.matches(v))
            .max_by(|(a, _), (b, _)| a.cmp(b))
            .map(|(_, e)| e)
            .ok_or_else(unsatisfiable)
    }

    /// Download URL of a chart version, resolved against the repository URL
    pub fn chart_url(&self, repo_url: &str, name: &str, constraint: &str) -> Result<(Url, &ChartEntry)> {
        let entry = self.find_best_match(name, constraint)?;
        let reference = entry.urls.first().ok_or_else(|| RepoError::NoDownloadUrl {
            name: entry.name.clone(),
            version: entry.version.clone(),
        })?;
        Ok((resolve_reference_url(repo_url, reference)?, entry))
    }
}

fn parse_version(version: &str) -> Option<Version> {
    Version::parse(version.strip_prefix('v').unwrap_or(version)).ok()
}

fn parse_repo_url(repo_url: &str) -> Result<Url> {
    Url::parse(repo_url).map_err(|e| RepoError::InvalidRepositoryUrl {
        url: repo_url.to_string(),
        reason: e.to_string(),
    })
}

/// URL of the `index.yaml` of a repository
pub fn index_url(repo_url: &str) -> Result<Url> {
    let mut url = parse_repo_url(repo_url)?;
    let path = format!("{}/index.yaml", url.path().trim_end_matches('/'));
    url.set_path(&path);
    Ok(url)
}

/// Resolve a possibly relative chart URL against the repository URL
pub fn resolve_reference_url(repo_url: &str, reference: &str) -> Result<Url> {
    let mut base = parse_repo_url(repo_url)?;
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    base.join(reference).map_err(|e| RepoError::InvalidRepositoryUrl {
        url: reference.to_string(),
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const INDEX: &str = r#"
apiVersion: v1
generated: "2024-01-15T10:00:00Z"
entries:
  nginx:
    - name: nginx
      version: 15.0.0
      appVersion: "1.25"
      urls:
        - charts/nginx-15.0.0.tgz
    - name: nginx
      version: 15.2.1
      urls:
        - https://cdn.example.com/nginx-15.2.1.tgz
    - name: nginx
      version: 16.0.0-rc.1
      urls:
        - charts/nginx-16.0.0-rc.1.tgz
  empty:
    - name: empty
      version: 1.0.0
"#;

    #[test]
    fn test_parse_index() {
        let index = RepositoryIndex::from_yaml(INDEX).unwrap();
        assert_eq!(index.api_version, "v1");
        assert!(index.generated.is_some());
        assert_eq!(index.get("nginx").unwrap().len(), 3);
    }

    #[test]
    fn test_parse_invalid_index() {
        let err = RepositoryIndex::from_yaml("entries: [").unwrap_err();
        assert!(matches!(err, RepoError::IndexParseError { .. }));
    }

    #[test]
    fn test_best_match() {
        let index = RepositoryIndex::from_yaml(INDEX).unwrap();

        assert_eq!(index.find_best_match("nginx", "15.0.0").unwrap().version, "15.0.0");
        assert_eq!(index.find_best_match("nginx", "^15").unwrap().version, "15.2.1");
        assert_eq!(index.find_best_match("nginx", "").unwrap().version, "15.2.1");
        assert_eq!(index.find_best_match("nginx", "15.0").unwrap().version, "15.0.0");
        assert!(matches!(
            index.find_best_match("nginx", "^17"),
            Err(RepoError::UnsatisfiableConstraint { .. })
        ));
        assert!(matches!(
            index.find_best_match("redis", "1.0.0"),
            Err(RepoError::ChartNotFound { .. })
        ));
    }

    #[test]
    fn test_chart_url_relative_and_absolute() {
        let index = RepositoryIndex::from_yaml(INDEX).unwrap();

        let (url, entry) = index.chart_url("https://charts.example.com/stable", "nginx", "15.0.0").unwrap();
        assert_eq!(url.as_str(), "https://charts.example.com/stable/charts/nginx-15.0.0.tgz");
        assert_eq!(entry.app_version.as_deref(), Some("1.25"));

        let (url, _) = index.chart_url("https://charts.example.com/stable/", "nginx", "15.2.1").unwrap();
        assert_eq!(url.as_str(), "https://cdn.example.com/nginx-15.2.1.tgz");
    }

    #[test]
    fn test_chart_url_missing_urls() {
        let index = RepositoryIndex::from_yaml(INDEX).unwrap();
        let err = index.chart_url("https://charts.example.com", "empty", "1.0.0").unwrap_err();
        assert!(matches!(err, RepoError::NoDownloadUrl { .. }));
    }

    #[test]
    fn test_index_url() {
        assert_eq!(
            index_url("https://charts.example.com/stable/").unwrap().as_str(),
            "https://charts.example.com/stable/index.yaml"
        );
        assert_eq!(
            index_url("https://charts.example.com").unwrap().as_str(),
            "https://charts.example.com/index.yaml"
        );
        assert!(index_url("not a url").is_err());
    }
}
