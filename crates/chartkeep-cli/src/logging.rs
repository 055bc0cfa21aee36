//! Log output setup

use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::LevelFilter;

/// Install the global subscriber
///
/// `RUST_LOG` wins when set. Otherwise `--debug` selects debug output and
/// the settings file level applies.
pub fn init(log_level: &str, debug: bool) {
    let default_level = if debug {
        LevelFilter::DEBUG
    } else {
        log_level.parse().unwrap_or(LevelFilter::WARN)
    };
    let filter = EnvFilter::builder()
        .with_default_directive(default_level.into())
        .from_env_lossy();

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .try_init();
}
