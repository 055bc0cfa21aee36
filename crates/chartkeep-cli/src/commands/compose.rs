//! Compose command - merge a graph of stored values documents

use chartkeep_engine::{Composer, ComposerConfig};

use super::{OutputFormat, connect, print_structured};
use crate::error::Result;
use crate::settings::Settings;

/// Run the compose command
pub async fn run(settings: &Settings, documents: &[String], output: OutputFormat) -> Result<()> {
    let store = connect().await?;
    let composer = Composer::new(store, settings.namespace.as_str()).with_config(ComposerConfig {
        fetch_timeout: settings.fetch_timeout,
    });

    let values = composer.compose(documents).await?;

    match output {
        // Values have no tree form; YAML reads closest to a values file
        OutputFormat::Tree | OutputFormat::Yaml => print_structured(&values, OutputFormat::Yaml),
        OutputFormat::Json => print_structured(&values, OutputFormat::Json),
    }
}
