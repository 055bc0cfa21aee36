//! chartkeep CLI - import, assemble and inspect charts kept in the cluster

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;
mod error;
mod exit_codes;
mod logging;
mod settings;
mod util;

use commands::OutputFormat;
use error::Result;
use settings::Settings;

#[derive(Parser)]
#[command(name = "chartkeep")]
#[command(author = "chartkeep Contributors")]
#[command(version)]
#[command(about = "Chart artifact store and values composition engine", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug output
    #[arg(long, global = true)]
    debug: bool,

    /// Namespace holding artifacts and chart records (overrides settings)
    #[arg(short, long, global = true, env = "CHARTKEEP_NAMESPACE")]
    namespace: Option<String>,

    /// Settings file (default: ~/.config/chartkeep/config.yaml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Assemble a stored chart and its dependencies into one bundle
    Assemble {
        /// Chart name
        chart: String,

        /// Exact version or semver range
        #[arg(long, default_value = "*")]
        version: String,

        /// Repository to look the chart up in
        #[arg(long, conflicts_with = "group", required_unless_present = "group")]
        repo: Option<String>,

        /// Repository group to look the chart up in
        #[arg(long)]
        group: Option<String>,

        /// Values file(s) to merge
        #[arg(short = 'f', long = "values")]
        values: Vec<PathBuf>,

        /// Set values on command line (key=value)
        #[arg(long = "set")]
        set: Vec<String>,

        /// Stored values document(s) to compose under the overrides
        #[arg(long = "values-ref")]
        values_refs: Vec<String>,

        /// Output format
        #[arg(short, long, value_enum, default_value_t)]
        output: OutputFormat,
    },

    /// Compose stored values documents and print the result
    Compose {
        /// Root document names, in merge order
        #[arg(required = true)]
        documents: Vec<String>,

        /// Output format
        #[arg(short, long, value_enum, default_value_t)]
        output: OutputFormat,
    },

    /// Import a packaged chart from a file, URL or repository
    Import {
        /// Local .tgz, archive URL, or repository URL with --chart
        source: String,

        /// Chart to look up in the repository index
        #[arg(long)]
        chart: Option<String>,

        /// Version constraint for --chart
        #[arg(long, default_value = "*")]
        version: String,

        /// Repository to record the chart under
        #[arg(long)]
        repo: String,

        /// Repository group to label the chart with
        #[arg(long)]
        group: Option<String>,

        /// Username for basic auth
        #[arg(long)]
        username: Option<String>,

        /// Password for basic auth
        #[arg(long, env = "CHARTKEEP_PASSWORD", hide_env_values = true)]
        password: Option<String>,

        /// Output format
        #[arg(short, long, value_enum, default_value_t)]
        output: OutputFormat,
    },

    /// List the stored artifacts of a chart version
    Artifacts {
        /// Chart name
        chart: String,

        /// Chart version
        version: String,
    },

    /// Delete a chart version's artifacts and its record entry
    Delete {
        /// Chart name
        chart: String,

        /// Chart version
        version: String,

        /// Repository the chart is recorded under
        #[arg(long)]
        repo: String,
    },
}

#[tokio::main]
async fn main() {
    miette::set_panic_hook();

    let cli = Cli::parse();

    if let Err(err) = run(cli).await {
        let code = err.exit_code();
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(code);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let mut settings = match &cli.config {
        Some(path) => Settings::load_from(path)?,
        None => Settings::load()?,
    };
    if let Some(namespace) = cli.namespace {
        settings.namespace = namespace;
    }

    logging::init(&settings.log_level, cli.debug);

    match cli.command {
        Commands::Assemble {
            chart,
            version,
            repo,
            group,
            values,
            set,
            values_refs,
            output,
        } => {
            let selector = commands::selector(repo, group)?;
            commands::assemble::run(
                &settings,
                commands::assemble::AssembleArgs {
                    chart,
                    version,
                    selector,
                    values_files: values,
                    set,
                    values_refs,
                    output,
                },
            )
            .await
        }

        Commands::Compose { documents, output } => commands::compose::run(&settings, &documents, output).await,

        Commands::Import {
            source,
            chart,
            version,
            repo,
            group,
            username,
            password,
            output,
        } => {
            commands::import::run(
                &settings,
                commands::import::ImportArgs {
                    source,
                    chart,
                    version,
                    repository: repo,
                    group,
                    username,
                    password,
                    output,
                },
            )
            .await
        }

        Commands::Artifacts { chart, version } => commands::artifacts::run(&settings, &chart, &version).await,

        Commands::Delete { chart, version, repo } => commands::delete::run(&settings, &repo, &chart, &version).await,
    }
}
