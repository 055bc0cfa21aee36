//! Materialized bundles
//!
//! The install-ready output of assembly: one chart version with its files,
//! effective values and the resolved dependency sub-bundles. Bundles are
//! built per request and never persisted.

use chartkeep_core::{ChartDependency, ChartFile, Values};
use serde::Serialize;

use crate::dependency::SkippedDependency;
use crate::error::{EngineError, Result};

/// Identity of a materialized chart version
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BundleMetadata {
    pub name: String,
    pub version: String,
    pub repository: String,
    /// Declared dependencies; included ones carry their pinned version
    pub dependencies: Vec<ChartDependency>,
}

/// A fully resolved chart version ready for installation
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MaterializedBundle {
    pub metadata: BundleMetadata,
    pub templates: Vec<ChartFile>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub crds: Vec<ChartFile>,
    pub values: Values,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<MaterializedBundle>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub skipped: Vec<SkippedDependency>,
}

impl MaterializedBundle {
    /// Structural check of this bundle and every sub-bundle
    pub fn validate(&self) -> Result<()> {
        let chart = if self.metadata.name.is_empty() {
            "<unnamed>"
        } else {
            self.metadata.name.as_str()
        };
        let invalid = |message: &str| EngineError::Validation {
            chart: chart.to_string(),
            message: message.to_string(),
        };

        if self.metadata.name.is_empty() {
            return Err(invalid("metadata name is empty"));
        }
        if self.metadata.version.is_empty() {
            return Err(invalid("metadata version is empty"));
        }
        if self.templates.is_empty() {
            return Err(invalid("bundle has no templates"));
        }

        for dependency in &self.dependencies {
            dependency.validate()?;
        }
        Ok(())
    }

    /// Find a direct sub-bundle by chart name
    pub fn find_dependency(&self, name: &str) -> Option<&MaterializedBundle> {
        self.dependencies.iter().find(|d| d.metadata.name == name)
    }

    /// Total number of bundles in this tree, including this one
    pub fn bundle_count(&self) -> usize {
        1 + self.dependencies.iter().map(|d| d.bundle_count()).sum::<usize>()
    }

    /// Render the bundle tree for display
    pub fn render_tree(&self) -> String {
        let mut lines = vec![format!(
            "{}@{} ({} templates, {} crds)",
            self.metadata.name,
            self.metadata.version,
            self.templates.len(),
            self.crds.len()
        )];

        let children = self.dependencies.len() + self.skipped.len();
        let mut index = 0;
        for dependency in &self.dependencies {
            index += 1;
            render_tree_node(dependency, &mut lines, "", index == children);
        }
        for skipped in &self.skipped {
            index += 1;
            let connector = if index == children { "└── " } else { "├── " };
            lines.push(format!(
                "{}{} (skipped: {})",
                connector, skipped.dependency.name, skipped.reason
            ));
        }

        lines.join("\n")
    }
}

fn render_tree_node(bundle: &MaterializedBundle, lines: &mut Vec<String>, prefix: &str, is_last: bool) {
    let connector = if is_last { "└── " } else { "├── " };
    lines.push(format!(
        "{}{}{}@{} [{}]",
        prefix, connector, bundle.metadata.name, bundle.metadata.version, bundle.metadata.repository
    ));

    let new_prefix = format!("{}{}   ", prefix, if is_last { " " } else { "│" });

    let count = bundle.dependencies.len() + bundle.skipped.len();
    let mut index = 0;
    for dependency in &bundle.dependencies {
        index += 1;
        render_tree_node(dependency, lines, &new_prefix, index == count);
    }
    for skipped in &bundle.skipped {
        index += 1;
        let connector = if index == count { "└── " } else { "├── " };
        lines.push(format!(
            "{}{}{} (skipped: {})",
            new_prefix, connector, skipped.dependency.name, skipped.reason
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dependency::SkipReason;
    use serde_json::json;

    fn bundle(name: &str, version: &str) -> MaterializedBundle {
        MaterializedBundle {
            metadata: BundleMetadata {
                name: name.to_string(),
                version: version.to_string(),
                repository: "stable".to_string(),
                dependencies: Vec::new(),
            },
            templates: vec![ChartFile::new("templates/deployment.yaml", b"kind: Deployment".to_vec())],
            crds: Vec::new(),
            values: Values::new(),
            dependencies: Vec::new(),
            skipped: Vec::new(),
        }
    }

    #[test]
    fn test_validate_ok() {
        let mut root = bundle("app", "1.0.0");
        root.dependencies.push(bundle("redis", "17.0.0"));
        assert!(root.validate().is_ok());
    }

    #[test]
    fn test_validate_empty_templates() {
        let mut root = bundle("app", "1.0.0");
        root.templates.clear();

        match root.validate().unwrap_err() {
            EngineError::Validation { chart, message } => {
                assert_eq!(chart, "app");
                assert!(message.contains("templates"));
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_validate_recurses_into_dependencies() {
        let mut sub = bundle("redis", "17.0.0");
        sub.metadata.version.clear();
        let mut root = bundle("app", "1.0.0");
        root.dependencies.push(sub);

        match root.validate().unwrap_err() {
            EngineError::Validation { chart, .. } => assert_eq!(chart, "redis"),
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_validate_empty_name() {
        let root = bundle("", "1.0.0");
        assert!(matches!(root.validate(), Err(EngineError::Validation { .. })));
    }

    #[test]
    fn test_render_tree() {
        let mut redis = bundle("redis", "17.0.0");
        redis.dependencies.push(bundle("common", "2.1.0"));
        let mut root = bundle("app", "1.0.0");
        root.dependencies.push(redis);
        root.dependencies.push(bundle("postgresql", "12.5.0"));
        root.skipped.push(SkippedDependency {
            dependency: ChartDependency::new("metrics", "1.x"),
            reason: SkipReason::ConditionFalse {
                condition: "metrics.enabled".to_string(),
            },
        });

        insta::assert_snapshot!(root.render_tree(), @r"
        app@1.0.0 (1 templates, 0 crds)
        ├── redis@17.0.0 [stable]
        │   └── common@2.1.0 [stable]
        ├── postgresql@12.5.0 [stable]
        └── metrics (skipped: condition 'metrics.enabled' is false)
        ");
        assert_eq!(root.bundle_count(), 4);
        assert!(root.find_dependency("redis").is_some());
        assert!(root.find_dependency("common").is_none());
    }

    #[test]
    fn test_serialize_skips_empty_sections() {
        let mut root = bundle("app", "1.0.0");
        root.values = Values(json!({"replicas": 1}));

        let value = serde_json::to_value(&root).unwrap();
        assert_eq!(value["metadata"]["name"], "app");
        assert_eq!(value["values"]["replicas"], 1);
        assert!(value.get("crds").is_none());
        assert!(value.get("dependencies").is_none());
        assert_eq!(value["templates"][0]["name"], "templates/deployment.yaml");
    }
}
