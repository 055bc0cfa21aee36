//! Delete command - remove one chart version from the store

use chartkeep_repo::ChartImporter;
use console::style;

use super::connect;
use crate::error::Result;
use crate::settings::Settings;

/// Run the delete command
pub async fn run(settings: &Settings, repository: &str, chart: &str, version: &str) -> Result<()> {
    let store = connect().await?;
    let importer = ChartImporter::new(store, settings.namespace.as_str());

    let deleted = importer.remove(repository, chart, version).await?;

    if deleted == 0 {
        println!("No artifacts found for {}@{}", chart, version);
    } else {
        println!(
            "{} {}@{} ({} artifacts)",
            style("Deleted").green().bold(),
            chart,
            version,
            deleted
        );
    }

    Ok(())
}
