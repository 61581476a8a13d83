//! Tracing subscriber setup for the command line tool.
//!
//! The filter comes from `AMD_AUTOFIX_LOG`, then `RUST_LOG`, then the
//! `--verbose` flag (`debug`, otherwise `warn`). `AMD_AUTOFIX_LOG_FORMAT`
//! selects `text` (default) or `json`. Output always goes to stderr so it
//! never mixes with the JSON written to stdout.

use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter, Registry};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

impl LogFormat {
    fn from_env() -> Self {
        match std::env::var("AMD_AUTOFIX_LOG_FORMAT")
            .unwrap_or_default()
            .to_lowercase()
            .as_str()
        {
            "json" => Self::Json,
            _ => Self::Text,
        }
    }
}

fn build_filter(verbose: bool) -> EnvFilter {
    if let Ok(val) = std::env::var("AMD_AUTOFIX_LOG") {
        EnvFilter::builder().parse_lossy(val)
    } else if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    }
}

/// Installs the global subscriber. Calling it twice is harmless; the second
/// call leaves the first subscriber in place.
pub fn init_tracing(verbose: bool) {
    let filter = build_filter(verbose);
    match LogFormat::from_env() {
        LogFormat::Json => {
            let json_layer = fmt::layer().json().with_writer(std::io::stderr);
            let _ = Registry::default().with(filter).with(json_layer).try_init();
        }
        LogFormat::Text => {
            let _ = tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .try_init();
        }
    }
}
