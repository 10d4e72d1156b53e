//! Environment variable parsing helpers
//!
//! Provides ergonomic helpers for reading configuration from environment variables.
//! Every helper has a `*_from` variant that reads from an arbitrary [`EnvSource`],
//! so configuration can be built from fixture maps in tests.

use std::collections::HashMap;
use std::env;
use std::str::FromStr;

/// A source of environment-style key/value pairs.
pub trait EnvSource {
    /// Look up a variable. Empty values are treated as unset.
    fn get(&self, name: &str) -> Option<String>;
}

/// The process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl EnvSource for ProcessEnv {
    fn get(&self, name: &str) -> Option<String> {
        env::var(name).ok().filter(|v| !v.is_empty())
    }
}

impl EnvSource for HashMap<String, String> {
    fn get(&self, name: &str) -> Option<String> {
        HashMap::get(self, name).filter(|v| !v.is_empty()).cloned()
    }
}

impl EnvSource for HashMap<&str, &str> {
    fn get(&self, name: &str) -> Option<String> {
        HashMap::get(self, name)
            .filter(|v| !v.is_empty())
            .map(|v| v.to_string())
    }
}

/// Extension trait for parsing environment variables.
///
/// Provides convenient methods for reading env vars with defaults and type parsing.
pub trait ConfigExt {
    /// Get an environment variable with a default value.
    ///
    /// # Example
    /// ```ignore
    /// let port = String::env_or("DB_PORT", "5432");
    /// ```
    fn env_or(name: &str, default: &str) -> String {
        Self::env_or_from(&ProcessEnv, name, default)
    }

    /// Like [`ConfigExt::env_or`], reading from `source`.
    fn env_or_from(source: &impl EnvSource, name: &str, default: &str) -> String {
        source.get(name).unwrap_or_else(|| default.to_string())
    }

    /// Get a variable from `source` parsed as a specific type.
    ///
    /// Returns `default` if the variable is not set, and the raw value as the
    /// error if it is set but fails to parse.
    ///
    /// # Example
    /// ```ignore
    /// let timeout: u64 = u64::env_parse_from(&ProcessEnv, "DB_CONNECT_TIMEOUT", 10)?;
    /// ```
    fn env_parse_from<T: FromStr>(
        source: &impl EnvSource,
        name: &str,
        default: T,
    ) -> Result<T, String> {
        match source.get(name) {
            Some(raw) => raw.trim().parse().map_err(|_| raw),
            None => Ok(default),
        }
    }
}

// Blanket implementation for all types
impl<T> ConfigExt for T {}
