//! Assemble command - build an install-ready bundle from stored charts

use chartkeep_engine::{AssembleRequest, Assembler, AssemblerConfig, RepoSelector};
use console::style;
use std::path::PathBuf;
use tracing::debug;

use super::{OutputFormat, connect, print_structured};
use crate::error::Result;
use crate::settings::Settings;
use crate::util::load_overrides;

/// Arguments for one assembly
pub struct AssembleArgs {
    pub chart: String,
    pub version: String,
    pub selector: RepoSelector,
    pub values_files: Vec<PathBuf>,
    pub set: Vec<String>,
    pub values_refs: Vec<String>,
    pub output: OutputFormat,
}

/// Run the assemble command
pub async fn run(settings: &Settings, args: AssembleArgs) -> Result<()> {
    let overrides = load_overrides(&args.values_files, &args.set)?;
    debug!(
        files = args.values_files.len(),
        set = args.set.len(),
        values_refs = args.values_refs.len(),
        "loaded value overrides"
    );
    let store = connect().await?;

    let config = AssemblerConfig::default()
        .with_timeout(settings.assemble_timeout)
        .with_fetch_timeout(settings.fetch_timeout);
    let assembler = Assembler::new(store, settings.namespace.as_str()).with_config(config);

    let version = if args.version.is_empty() { "*" } else { args.version.as_str() };
    debug!(chart = %args.chart, version, namespace = %settings.namespace, "assembling chart");
    let request = AssembleRequest::new(args.chart.as_str(), version, args.selector).with_overrides(overrides);

    let bundle = if args.values_refs.is_empty() {
        assembler.assemble(&request).await?
    } else {
        assembler.compose_and_assemble(&request, &args.values_refs).await?
    };

    match args.output {
        OutputFormat::Tree => {
            println!(
                "{} {}@{} ({} bundles)",
                style("Assembled").green().bold(),
                bundle.metadata.name,
                bundle.metadata.version,
                bundle.bundle_count()
            );
            println!();
            println!("{}", bundle.render_tree());
        }
        format => print_structured(&bundle, format)?,
    }

    Ok(())
}
