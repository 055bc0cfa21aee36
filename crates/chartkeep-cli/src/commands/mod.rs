//! CLI commands

pub mod artifacts;
pub mod assemble;
pub mod compose;
pub mod delete;
pub mod import;

use chartkeep_engine::RepoSelector;
use chartkeep_store::KubeStore;
use clap::ValueEnum;
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

use crate::error::{CliError, Result};

/// How a command prints its result
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable summary
    #[default]
    Tree,
    Json,
    Yaml,
}

/// Print a serializable result as JSON or YAML
pub fn print_structured<T: Serialize>(value: &T, format: OutputFormat) -> Result<()> {
    let rendered = match format {
        OutputFormat::Json => serde_json::to_string_pretty(value).map_err(|e| CliError::Other {
            message: e.to_string(),
        })?,
        OutputFormat::Yaml => serde_yaml::to_string(value).map_err(|e| CliError::Other {
            message: e.to_string(),
        })?,
        OutputFormat::Tree => {
            return Err(CliError::usage("tree output is not available here"));
        }
    };
    println!("{}", rendered.trim_end());
    Ok(())
}

/// Connect to the cluster-backed store
pub async fn connect() -> Result<Arc<KubeStore>> {
    debug!("connecting to cluster");
    let store = KubeStore::new().await?;
    Ok(Arc::new(store))
}

/// Build the catalog scope from `--repo` / `--group`
pub fn selector(repo: Option<String>, group: Option<String>) -> Result<RepoSelector> {
    match (repo, group) {
        (Some(repo), None) => Ok(RepoSelector::Repository(repo)),
        (None, Some(group)) => Ok(RepoSelector::Group(group)),
        (Some(_), Some(_)) => Err(CliError::usage("--repo and --group are mutually exclusive")),
        (None, None) => Err(CliError::usage("one of --repo or --group is required")),
    }
}
