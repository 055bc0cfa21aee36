//! Import command - load a packaged chart into the store

use chartkeep_repo::{ChartArchive, ChartImporter, HttpArchiveFetcher, ImportReport, ImportTarget};
use console::style;
use std::path::Path;
use tracing::debug;

use super::{OutputFormat, connect, print_structured};
use crate::error::{CliError, Result};
use crate::settings::Settings;

/// Arguments for one import
pub struct ImportArgs {
    /// Local `.tgz`, archive URL, or repository URL when `chart` is set
    pub source: String,
    pub chart: Option<String>,
    pub version: String,
    pub repository: String,
    pub group: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub output: OutputFormat,
}

/// Run the import command
pub async fn run(settings: &Settings, args: ImportArgs) -> Result<()> {
    let mut target = ImportTarget::new(args.repository.as_str());
    if let Some(group) = &args.group {
        target = target.with_group(group.as_str());
    }

    let local = if is_remote(&args.source) {
        None
    } else {
        if args.chart.is_some() {
            return Err(CliError::usage("--chart needs a repository URL as source"));
        }
        debug!(path = %args.source, "reading local chart archive");
        let bytes = std::fs::read(Path::new(&args.source))?;
        Some(ChartArchive::from_tgz(&bytes)?)
    };

    let store = connect().await?;
    let importer = ChartImporter::new(store, settings.namespace.as_str());

    let report = match local {
        Some(archive) => importer.import(&archive, &target, None).await?,
        None => {
            debug!(source = %args.source, chart = ?args.chart, "fetching remote chart");
            let mut fetcher = HttpArchiveFetcher::new(settings.fetch_timeout)?;
            if let Some(username) = &args.username {
                fetcher = fetcher.with_basic_auth(username.as_str(), args.password.clone().unwrap_or_default());
            }
            match &args.chart {
                Some(chart) => {
                    importer
                        .import_from_repository(&fetcher, &args.source, chart, &args.version, &target)
                        .await?
                }
                None => importer.import_url(&fetcher, &args.source, &target).await?,
            }
        }
    };

    match args.output {
        OutputFormat::Tree => print_report(&report),
        format => print_structured(&report, format)?,
    }

    Ok(())
}

fn is_remote(source: &str) -> bool {
    source.starts_with("http://") || source.starts_with("https://")
}

fn print_report(report: &ImportReport) {
    println!(
        "{} {}@{} into {} ({} artifacts)",
        style("Imported").green().bold(),
        report.chart,
        report.version,
        style(&report.repository).cyan(),
        report.artifacts
    );

    for dep in &report.dependencies {
        let status = if dep.is_pinned() {
            style("pinned").green()
        } else {
            style("unpinned").yellow()
        };
        println!("  {} {} {} [{}]", style("→").dim(), dep.name, dep.version, status);
    }

    if !report.dropped.is_empty() {
        println!(
            "{} {} files nest too deep and were not stored:",
            style("Warning:").yellow().bold(),
            report.dropped.len()
        );
        for path in &report.dropped {
            println!("  {}", style(path).dim());
        }
    }
}
