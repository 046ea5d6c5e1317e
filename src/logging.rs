//! Logging setup for the provider binary.
//!
//! All logs are written to **stderr**; stdout carries only the handshake line.
//!
//! # Environment Variables
//!
//! - `RUST_LOG`: Controls log levels (e.g., `info`, `debug`, `archestra_provider=debug`)
//!
//! # Examples
//!
//! ```bash
//! # Show info logs (default)
//! RUST_LOG=info ./terraform-provider-archestra
//!
//! # Show request-level logs for the provider only
//! RUST_LOG=warn,archestra_provider=debug ./terraform-provider-archestra
//! ```

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn filter(default_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
}

fn subscriber(filter: EnvFilter) -> impl tracing::Subscriber + Send + Sync + 'static {
    tracing_subscriber::registry().with(filter).with(
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false),
    )
}

/// Initialize the default logging subscriber.
///
/// Writes to stderr, honours `RUST_LOG` and defaults to `info`.
///
/// # Panics
///
/// Panics if a global subscriber has already been set.
pub fn init_logging() {
    init_logging_with_default("info");
}

/// Like [`init_logging`], with a custom level used when `RUST_LOG` is unset.
pub fn init_logging_with_default(default_level: &str) {
    subscriber(filter(default_level)).init();
}

/// Try to initialize logging, returning false if already initialized.
pub fn try_init_logging() -> bool {
    subscriber(filter("info")).try_init().is_ok()
}

#[cfg(test)]
mod tests {
    // The global subscriber can only be set once per process.

    use super::*;

    #[test]
    fn test_env_filter_parsing() {
        assert!(EnvFilter::try_new("info").is_ok());
        assert!(EnvFilter::try_new("archestra_provider=debug").is_ok());
        assert!(EnvFilter::try_new("warn,archestra_provider::client=trace").is_ok());
    }

    #[test]
    fn test_second_init_is_rejected() {
        let _ = try_init_logging();
        assert!(!try_init_logging());
    }
}
