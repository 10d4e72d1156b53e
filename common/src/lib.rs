//! Shared utilities for schema-bootstrap components
//!
//! This crate provides common functionality used by the bootstrap binaries:
//! - Structured logging initialization
//! - Environment variable parsing helpers
//! - Lifecycle events for reporting bootstrap progress

pub mod config;
pub mod events;
pub mod logging;

pub use config::{ConfigExt, EnvSource, ProcessEnv};
pub use events::{BootstrapEvent, EventLog};
pub use logging::{init_logging, LogOutput};
