//! Logging configuration for trino-eda.
//!
//! Logs go to stderr so stdout carries only the rendered tables.

use tracing_subscriber::EnvFilter;

/// Returns the filter directive used when `RUST_LOG` is not set.
pub fn default_directive(verbose: bool) -> &'static str {
    if verbose {
        "trino_eda=debug,info"
    } else {
        "info"
    }
}

/// Initializes logging to stderr.
///
/// `RUST_LOG` wins over the built-in default.
pub fn init_stderr_logging(verbose: bool) {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(default_directive(verbose))),
        )
        .with_writer(std::io::stderr)
        .init();
}
