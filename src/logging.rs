//! Logging configuration.
//!
//! Logs go to stderr; `RUST_LOG` overrides the default filter.

use tracing_subscriber::EnvFilter;

/// Filter used when `RUST_LOG` is unset or invalid.
///
/// sqlx logs every statement at info, which would duplicate the pipeline's
/// own query logging.
pub const DEFAULT_FILTER: &str = "info,sqlx=warn,tower_http=info";

/// Builds the filter from `RUST_LOG`, falling back to `DEFAULT_FILTER`.
pub fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Initializes logging to stderr.
///
/// Safe to call more than once; later calls are no-ops.
pub fn init_stderr_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(std::io::stderr)
        .try_init();
}
