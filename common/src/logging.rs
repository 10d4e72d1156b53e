//! Structured logging initialization
//!
//! Provides consistent logging initialization across the bootstrap binaries.
//! `LOG_FORMAT=json` switches to the JSON formatter.

use crate::config::ConfigExt;
use tracing_subscriber::{
    fmt, layer::SubscriberExt, registry::Registry, util::SubscriberInitExt, EnvFilter, Layer,
};

type FormatLayer =
    Box<dyn Layer<tracing_subscriber::layer::Layered<EnvFilter, Registry>> + Send + Sync>;

/// Where log lines are written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogOutput {
    /// Human-facing progress output.
    Stdout,
    /// Keeps stdout free for a machine-readable response.
    Stderr,
}

/// Guard that keeps the tracing subscriber active.
/// Drop this at the end of main to flush logs.
pub struct LogGuard;

/// Initialize structured logging for a component.
///
/// Returns a guard that should be held for the lifetime of the program.
///
/// # Example
/// ```ignore
/// let _guard = init_logging("setup-database", LogOutput::Stdout);
/// info!("Starting up...");
/// ```
pub fn init_logging(_component: &str, output: LogOutput) -> LogGuard {
    let filter = EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into());
    let json = String::env_or("LOG_FORMAT", "text").eq_ignore_ascii_case("json");

    let format: FormatLayer = match (json, output) {
        (false, LogOutput::Stdout) => fmt::layer().with_target(false).boxed(),
        (false, LogOutput::Stderr) => fmt::layer()
            .with_target(false)
            .with_writer(std::io::stderr)
            .boxed(),
        (true, LogOutput::Stdout) => fmt::layer().json().with_target(false).boxed(),
        (true, LogOutput::Stderr) => fmt::layer()
            .json()
            .with_target(false)
            .with_writer(std::io::stderr)
            .boxed(),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(format)
        .init();

    LogGuard
}
