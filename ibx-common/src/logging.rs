//! Tracing setup shared by the command-line tools
//!
//! Diagnostics go to stderr so stdout stays reserved for results.
//! `RUST_LOG` overrides the level chosen here.

use tracing_subscriber::EnvFilter;

/// Initialize the global tracing subscriber.
///
/// Defaults to `warn`, or `debug` for this workspace's crates when
/// `verbose` is set.
pub fn init(verbose: bool) {
    let default_filter = if verbose {
        "warn,ibx_common=debug,ibx_nios=debug,ibx_bloxone=debug"
    } else {
        "warn"
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter));

    // A second init (e.g. from tests) is harmless
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
