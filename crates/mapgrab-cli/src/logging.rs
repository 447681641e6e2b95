//! Log output for the CLI.
//!
//! Library events go to stderr so stdout stays a clean result stream.
//! `RUST_LOG` takes precedence over the `-v`/`-q` derived level.

use crate::config::Verbosity;
use tracing_subscriber::EnvFilter;

/// Install the global subscriber; a second call is a no-op
pub fn init_logging(verbosity: Verbosity) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("mapgrab={}", verbosity.log_level())));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
