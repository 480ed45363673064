//! Logging setup.
//!
//! Human-readable logs go to stderr so stdout stays clean for JSON output.
//! `RUST_LOG` takes precedence over the verbosity flags. With a log file,
//! every event is also written there as one JSON object per line.

use crate::error::Result;
use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;
use tracing_subscriber::{EnvFilter, Layer};
use tracing_subscriber::fmt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Filter directive for the given verbosity flags.
#[must_use]
pub const fn level_directive(verbose: u8, quiet: bool) -> &'static str {
    if quiet {
        return "error";
    }
    match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

/// Install the global subscriber.
///
/// # Errors
///
/// Returns an error if the log file cannot be opened or a subscriber is
/// already installed.
pub fn init_logging(verbose: u8, quiet: bool, log_file: Option<&Path>) -> Result<()> {
    let filter = || {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(level_directive(verbose, quiet)))
    };

    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_filter(filter());

    let file_layer = match log_file {
        Some(path) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            Some(
                fmt::layer()
                    .json()
                    .with_writer(Mutex::new(file))
                    .with_current_span(true)
                    .with_filter(filter()),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
        .map_err(|err| anyhow::anyhow!("failed to install logger: {err}"))?;
    Ok(())
}

/// Route logs to the test harness. Safe to call from every test.
pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("info")
        .with_test_writer()
        .try_init();
}
