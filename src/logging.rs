//! Log output for the CLI.
//!
//! Logs go to stderr so stdout only carries transcript lines, summaries,
//! and answers. `RUST_LOG` wins over the `--verbose` default.

use tracing_subscriber::EnvFilter;

/// Install the global subscriber. Safe to call more than once.
pub fn init_logging(verbose: bool) {
    let default_directive = if verbose { "pagewise=debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(verbose)
        .try_init();
}
