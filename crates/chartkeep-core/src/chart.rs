//! Chart records, versions and files
//!
//! A `ChartRecord` is the stored owner of every known version of one chart.
//! Each `ChartVersion` names the artifacts holding its files and lists the
//! dependencies it declares.

use semver::{Version, VersionReq};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::{CoreError, Result};

/// Label carrying the chart name on a chart record
pub const CHART_LABEL: &str = "chart";
/// Label carrying the repository name on a chart record
pub const REPO_LABEL: &str = "repo";
/// Label carrying the repository group on a chart record
pub const REPO_GROUP_LABEL: &str = "repoGroup";

/// All known versions of one chart in one repository
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartRecord {
    /// Chart name
    pub name: String,

    /// Repository the chart was imported from
    pub repository: String,

    /// Optional repository group
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repo_group: Option<String>,

    /// Versions in declared order
    #[serde(default)]
    pub versions: Vec<ChartVersion>,
}

impl ChartRecord {
    pub fn new(name: impl Into<String>, repository: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            repository: repository.into(),
            repo_group: None,
            versions: Vec::new(),
        }
    }

    /// Builder: set the repository group
    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.repo_group = Some(group.into());
        self
    }

    /// Builder: append a version
    pub fn with_version(mut self, version: ChartVersion) -> Self {
        self.versions.push(version);
        self
    }

    /// Labels identifying this record in the catalog
    pub fn labels(&self) -> BTreeMap<String, String> {
        let mut labels = BTreeMap::new();
        labels.insert(CHART_LABEL.to_string(), self.name.clone());
        labels.insert(REPO_LABEL.to_string(), self.repository.clone());
        if let Some(group) = &self.repo_group {
            labels.insert(REPO_GROUP_LABEL.to_string(), group.clone());
        }
        labels
    }

    /// Select a version by constraint
    ///
    /// Versions are scanned in declared order and the first one satisfying
    /// the constraint is returned. A bare version matches exactly, anything
    /// else is read as a semver requirement. An unparsable constraint or an
    /// empty match yields `None`.
    pub fn get_chart_version(&self, constraint: &str) -> Option<&ChartVersion> {
        let matcher = VersionMatcher::parse(constraint)?;
        self.versions.iter().find(|v| {
            parse_version(&v.name)
                .map(|parsed| matcher.matches(&parsed))
                .unwrap_or(false)
        })
    }

    /// Whether a version with exactly this name is stored
    pub fn has_version(&self, version: &str) -> bool {
        self.versions.iter().any(|v| v.name == version)
    }

    /// Insert a version, replacing an existing entry with the same name
    pub fn upsert_version(&mut self, version: ChartVersion) {
        match self.versions.iter_mut().find(|v| v.name == version.name) {
            Some(existing) => *existing = version,
            None => self.versions.push(version),
        }
    }

    /// Remove a version by name, returning it when present
    pub fn remove_version(&mut self, version: &str) -> Option<ChartVersion> {
        let idx = self.versions.iter().position(|v| v.name == version)?;
        Some(self.versions.remove(idx))
    }
}

/// One stored version of a chart
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartVersion {
    /// Semantic version of this entry
    pub name: String,

    /// Name of the base templates artifact
    pub template_ref: String,

    /// Name of the base CRD artifact
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crd_ref: Option<String>,

    /// Declared dependencies
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub deps: Vec<ChartDependency>,

    /// Archive URL this version was imported from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// A dependency declared by a chart version
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChartDependency {
    pub name: String,

    /// Version constraint, or an exact version once pinned
    pub version: String,

    /// Repository holding the dependency
    #[serde(default)]
    pub repo: String,

    /// Two-segment condition path, empty when unconditional
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub condition: String,
}

impl ChartDependency {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            ..Default::default()
        }
    }

    /// Builder: set the repository
    pub fn with_repo(mut self, repo: impl Into<String>) -> Self {
        self.repo = repo.into();
        self
    }

    /// Builder: set the condition path
    pub fn with_condition(mut self, condition: impl Into<String>) -> Self {
        self.condition = condition.into();
        self
    }

    /// Whether the version field names one exact version
    pub fn is_pinned(&self) -> bool {
        is_exact_version(&self.version)
    }
}

/// One logical file of a chart
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChartFile {
    /// Path relative to the chart root, e.g. `templates/sub/cm.yaml`
    pub name: String,

    #[serde(with = "base64_bytes")]
    pub data: Vec<u8>,
}

impl ChartFile {
    pub fn new(name: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            data: data.into(),
        }
    }

    /// Path segments of the file name
    pub fn segments(&self) -> Vec<&str> {
        self.name.split('/').filter(|s| !s.is_empty()).collect()
    }
}

/// Chart metadata as found in `Chart.yaml`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartMetadata {
    pub name: String,

    pub version: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_version: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<ChartYamlDependency>,
}

/// Dependency entry of `Chart.yaml`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartYamlDependency {
    pub name: String,

    #[serde(default)]
    pub version: String,

    #[serde(default)]
    pub repository: String,

    #[serde(default)]
    pub condition: Option<String>,
}

impl ChartMetadata {
    /// Parse `Chart.yaml` content
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let meta: Self = serde_yaml::from_str(yaml)?;
        if meta.name.is_empty() {
            return Err(CoreError::MissingField {
                field: "name".to_string(),
            });
        }
        if parse_version(&meta.version).is_none() {
            return Err(CoreError::InvalidChart {
                message: format!("version '{}' is not a semantic version", meta.version),
            });
        }
        Ok(meta)
    }

    /// Declared dependencies in stored form
    pub fn chart_dependencies(&self) -> Vec<ChartDependency> {
        self.dependencies
            .iter()
            .map(|d| ChartDependency {
                name: d.name.clone(),
                version: d.version.clone(),
                repo: d.repository.clone(),
                condition: d.condition.clone().unwrap_or_default(),
            })
            .collect()
    }
}

/// Whether a version string names one exact semantic version
pub fn is_exact_version(version: &str) -> bool {
    parse_version(version).is_some()
}

fn parse_version(version: &str) -> Option<Version> {
    let trimmed = version.trim();
    Version::parse(trimmed.strip_prefix('v').unwrap_or(trimmed)).ok()
}

enum VersionMatcher {
    Exact(Version),
    Range(VersionReq),
}

impl VersionMatcher {
    fn parse(constraint: &str) -> Option<Self> {
        if constraint.trim().is_empty() {
            return None;
        }
        if let Some(exact) = parse_version(constraint) {
            return Some(Self::Exact(exact));
        }
        parse_version_req(constraint).map(Self::Range)
    }

    fn matches(&self, version: &Version) -> bool {
        match self {
            Self::Exact(exact) => exact == version,
            Self::Range(req) => req.matches(version),
        }
    }
}

/// Parse a version range
///
/// A partial version without an operator is read as a wildcard, so `1.2`
/// means 1.2.x rather than `^1.2`.
pub fn parse_version_req(constraint: &str) -> Option<VersionReq> {
    let trimmed = constraint.trim();
    let bare = trimmed.strip_prefix('v').unwrap_or(trimmed);
    if is_partial_version(bare) {
        return VersionReq::parse(&format!("={}", bare)).ok();
    }
    VersionReq::parse(trimmed).ok()
}

/// `1` or `1.2` without an operator
fn is_partial_version(constraint: &str) -> bool {
    !constraint.is_empty()
        && constraint.split('.').count() < 3
        && constraint
            .split('.')
            .all(|part| !part.is_empty() && part.chars().all(|c| c.is_ascii_digit()))
}

mod base64_bytes {
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(data: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(data))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD.decode(encoded).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn version(name: &str) -> ChartVersion {
        ChartVersion {
            name: name.to_string(),
            template_ref: format!("helm-tmpl-app-{}", name),
            ..Default::default()
        }
    }

    fn record() -> ChartRecord {
        ChartRecord::new("app", "stable")
            .with_version(version("0.0.1"))
            .with_version(version("0.0.3"))
    }

    #[test]
    fn test_exact_version_selected() {
        let r = record();
        assert_eq!(r.get_chart_version("0.0.1").unwrap().name, "0.0.1");
        assert_eq!(r.get_chart_version("0.0.3").unwrap().name, "0.0.3");
    }

    #[test]
    fn test_missing_version_is_none() {
        assert!(record().get_chart_version("0.0.2").is_none());
    }

    #[test]
    fn test_unparsable_constraint_is_none() {
        assert!(record().get_chart_version("not-a-version").is_none());
        assert!(record().get_chart_version("").is_none());
    }

    #[test]
    fn test_range_returns_first_in_declared_order() {
        let r = ChartRecord::new("app", "stable")
            .with_version(version("1.2.0"))
            .with_version(version("1.5.0"))
            .with_version(version("1.1.0"));

        assert_eq!(r.get_chart_version(">=1.1.0, <2.0.0").unwrap().name, "1.2.0");
        assert_eq!(r.get_chart_version("~1.1").unwrap().name, "1.1.0");
        assert_eq!(r.get_chart_version("*").unwrap().name, "1.2.0");
        assert!(r.get_chart_version("^2").is_none());
    }

    #[test]
    fn test_bare_version_is_not_caret() {
        let r = ChartRecord::new("app", "stable").with_version(version("1.9.0"));
        assert!(r.get_chart_version("1.2.3").is_none());
    }

    #[test]
    fn test_partial_bare_version_stays_in_minor() {
        let r = ChartRecord::new("app", "stable").with_version(version("1.9.0"));
        assert!(r.get_chart_version("1.2").is_none());
        assert_eq!(r.get_chart_version("1").unwrap().name, "1.9.0");

        let r = ChartRecord::new("redis", "stable")
            .with_version(version("17.1.4"))
            .with_version(version("17.3.2"));
        assert_eq!(r.get_chart_version("17.3").unwrap().name, "17.3.2");
        assert_eq!(r.get_chart_version("v17.1").unwrap().name, "17.1.4");
    }

    #[test]
    fn test_unparsable_stored_version_skipped() {
        let r = ChartRecord::new("app", "stable")
            .with_version(version("latest"))
            .with_version(version("1.0.0"));
        assert_eq!(r.get_chart_version("*").unwrap().name, "1.0.0");
    }

    #[test]
    fn test_v_prefix_accepted() {
        let r = ChartRecord::new("app", "stable").with_version(version("v1.0.0"));
        assert_eq!(r.get_chart_version("1.0.0").unwrap().name, "v1.0.0");
    }

    #[test]
    fn test_upsert_and_remove_version() {
        let mut r = record();
        let mut replacement = version("0.0.1");
        replacement.url = Some("https://charts.example.com/app-0.0.1.tgz".to_string());
        r.upsert_version(replacement);
        assert_eq!(r.versions.len(), 2);
        assert!(r.versions[0].url.is_some());

        r.upsert_version(version("0.0.4"));
        assert_eq!(r.versions.len(), 3);

        assert!(r.remove_version("0.0.3").is_some());
        assert!(!r.has_version("0.0.3"));
        assert!(r.remove_version("9.9.9").is_none());
    }

    #[test]
    fn test_record_labels() {
        let labels = record().with_group("infra").labels();
        assert_eq!(labels.get("chart").unwrap(), "app");
        assert_eq!(labels.get("repo").unwrap(), "stable");
        assert_eq!(labels.get("repoGroup").unwrap(), "infra");
    }

    #[test]
    fn test_dependency_pinning_detection() {
        assert!(ChartDependency::new("redis", "17.3.1").is_pinned());
        assert!(!ChartDependency::new("redis", "^17.0.0").is_pinned());
        assert!(!ChartDependency::new("redis", "17.x").is_pinned());
    }

    #[test]
    fn test_chart_version_wire_names() {
        let v = ChartVersion {
            name: "0.1.0".to_string(),
            template_ref: "helm-tmpl-app-0.1.0".to_string(),
            crd_ref: Some("helm-crds-app-0.1.0".to_string()),
            deps: vec![ChartDependency::new("redis", "17.3.1")
                .with_repo("bitnami")
                .with_condition("redis.enabled")],
            url: None,
        };
        let json = serde_json::to_value(&v).unwrap();
        assert_eq!(json["templateRef"], "helm-tmpl-app-0.1.0");
        assert_eq!(json["crdRef"], "helm-crds-app-0.1.0");
        assert_eq!(json["deps"][0]["repo"], "bitnami");
        assert_eq!(json["deps"][0]["condition"], "redis.enabled");
    }

    #[test]
    fn test_chart_file_base64_serde() {
        let file = ChartFile::new("templates/cm.yaml", b"kind: ConfigMap".to_vec());
        let json = serde_json::to_value(&file).unwrap();
        assert_eq!(json["data"], "a2luZDogQ29uZmlnTWFw");
        assert_eq!(file.segments(), vec!["templates", "cm.yaml"]);
    }

    #[test]
    fn test_chart_metadata_from_yaml() {
        let meta = ChartMetadata::from_yaml(r#"
apiVersion: v2
name: app
version: 0.1.0
appVersion: "1.16.0"
dependencies:
  - name: redis
    version: ~17.3.0
    repository: https://charts.bitnami.com/bitnami
    condition: redis.enabled
"#).unwrap();

        assert_eq!(meta.name, "app");
        assert_eq!(meta.app_version.as_deref(), Some("1.16.0"));
        let deps = meta.chart_dependencies();
        assert_eq!(deps[0].repo, "https://charts.bitnami.com/bitnami");
        assert_eq!(deps[0].condition, "redis.enabled");
    }

    #[test]
    fn test_chart_metadata_rejects_bad_version() {
        let err = ChartMetadata::from_yaml("name: app\nversion: latest\n").unwrap_err();
        assert!(matches!(err, CoreError::InvalidChart { .. }));
    }
}
