//! Diagnostic logging for the installer binary.
//!
//! The library logs through the `log` facade. The binary installs a
//! `tracing-subscriber` registry writing to stderr; its `try_init` also
//! forwards `log` records, so library diagnostics appear alongside.
//!
//! Priority: `RUST_LOG` env var > `-v`/`-q` flags > default "warn".

use log::debug;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Log filter implied by the command-line flags.
///
/// # Examples
///
/// ```
/// use plugstage_installer::telemetry::default_filter;
///
/// assert_eq!(default_filter(0, false), "warn");
/// assert_eq!(default_filter(2, false), "debug");
/// assert_eq!(default_filter(0, true), "error");
/// ```
#[must_use]
pub fn default_filter(verbosity: u8, quiet: bool) -> &'static str {
    if quiet {
        return "error";
    }
    match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

/// Install the global subscriber. Later calls are ignored.
pub fn init_logging(verbosity: u8, quiet: bool) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(verbosity, quiet)));

    if let Err(err) = tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .try_init()
    {
        debug!("keeping the existing log subscriber: {err}");
    }
}
