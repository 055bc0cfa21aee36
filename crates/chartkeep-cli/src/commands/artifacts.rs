//! Artifacts command - list the stored artifacts of one chart version

use chartkeep_store::codec::kind_selector;
use chartkeep_store::{ArtifactKind, ArtifactStore};
use console::style;

use super::connect;
use crate::error::Result;
use crate::settings::Settings;
use crate::util::format_size;

/// Run the artifacts command
pub async fn run(settings: &Settings, chart: &str, version: &str) -> Result<()> {
    let store = connect().await?;

    let mut rows = Vec::new();
    for kind in ArtifactKind::ALL {
        let mut objects = store
            .list(&settings.namespace, &kind_selector(kind, chart, version))
            .await?;
        objects.sort_by(|a, b| a.name.cmp(&b.name));
        rows.extend(objects.into_iter().map(|object| (kind, object)));
    }

    if rows.is_empty() {
        println!("No artifacts stored for {}@{}", chart, version);
        return Ok(());
    }

    println!(
        "{:<48} {:<10} {:<8} {:>12}",
        style("NAME").bold(),
        style("KIND").bold(),
        style("FILES").bold(),
        style("SIZE").bold()
    );

    for (kind, object) in &rows {
        println!(
            "{:<48} {:<10} {:<8} {:>12}",
            object.name,
            kind.tag(),
            object.len(),
            format_size(object.payload_size())
        );
    }

    let total: usize = rows.iter().map(|(_, object)| object.payload_size()).sum();
    println!();
    println!("{} artifacts, {}", rows.len(), style(format_size(total)).cyan());

    Ok(())
}
