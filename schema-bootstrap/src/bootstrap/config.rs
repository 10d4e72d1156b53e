//! Connection and schema configuration
//!
//! Everything is read once at the boundary from an [`EnvSource`] and then
//! passed by value into the bootstrapper.

use crate::error::{BootstrapError, Result};
use common::{ConfigExt, EnvSource};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Default host for interactive runs
pub const DEFAULT_HOST: &str = "localhost";
/// Default application database
pub const DEFAULT_DATABASE: &str = "ldc_loan_review";
/// Fixed schema location in service mode
pub const SERVICE_SCHEMA_PATH: &str = "/tmp/schema.sql";
/// Tables the workflow application needs
pub const WORKFLOW_TABLES: [&str; 2] = ["workflow_state", "audit_trail"];

/// How the bootstrapper was invoked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Operator at a terminal, host defaults to localhost.
    Interactive,
    /// Request/response handler, host is mandatory.
    Service,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Interactive => "interactive",
            Self::Service => "service",
        }
    }
}

/// Database connection parameters
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectionParams {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub user: String,
    pub password: String,
    /// Catalog namespace the expected tables live in
    pub schema: String,
    pub connect_timeout: Duration,
}

impl fmt::Debug for ConnectionParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionParams")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("schema", &self.schema)
            .field("connect_timeout", &self.connect_timeout)
            .finish()
    }
}

impl ConnectionParams {
    /// Load parameters from the process environment
    pub fn from_env(mode: Mode) -> Result<Self> {
        Self::from_source(&common::ProcessEnv, mode)
    }

    /// Load parameters from any environment-style source
    pub fn from_source(source: &impl EnvSource, mode: Mode) -> Result<Self> {
        let host = match (mode, source.get("DB_HOST")) {
            (_, Some(host)) => host,
            (Mode::Interactive, None) => DEFAULT_HOST.to_string(),
            (Mode::Service, None) => return Err(BootstrapError::MissingCredential("DB_HOST")),
        };

        let password = source
            .get("DB_PASSWORD")
            .ok_or(BootstrapError::MissingCredential("DB_PASSWORD"))?;

        let port: u16 =
            u16::env_parse_from(source, "DB_PORT", 5432).map_err(|raw| {
                BootstrapError::InvalidSetting {
                    name: "DB_PORT",
                    reason: format!("{:?} is not a valid port", raw),
                }
            })?;

        let connect_timeout: u64 = u64::env_parse_from(source, "DB_CONNECT_TIMEOUT", 10)
            .map_err(|raw| BootstrapError::InvalidSetting {
                name: "DB_CONNECT_TIMEOUT",
                reason: format!("{:?} is not a whole number of seconds", raw),
            })?;

        Ok(Self {
            host,
            port,
            database: String::env_or_from(source, "DB_NAME", DEFAULT_DATABASE),
            user: String::env_or_from(source, "DB_USER", "postgres"),
            password,
            schema: String::env_or_from(source, "DB_SCHEMA", "public"),
            connect_timeout: Duration::from_secs(connect_timeout),
        })
    }

    /// Build the tokio-postgres client configuration
    pub fn pg_config(&self) -> tokio_postgres::Config {
        let mut config = tokio_postgres::Config::new();
        config
            .host(&self.host)
            .port(self.port)
            .dbname(&self.database)
            .user(&self.user)
            .password(&self.password)
            .application_name("schema-bootstrap")
            .connect_timeout(self.connect_timeout);
        config
    }
}

/// Where the schema text comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaSource {
    Inline(String),
    File(PathBuf),
}

impl SchemaSource {
    /// `SCHEMA_SQL` wins; otherwise the mode's schema file.
    ///
    /// Interactive runs read `SCHEMA_FILE` (default `schema.sql` in the working
    /// directory), service runs always read [`SERVICE_SCHEMA_PATH`].
    pub fn from_source(source: &impl EnvSource, mode: Mode) -> Self {
        if let Some(sql) = source.get("SCHEMA_SQL") {
            return Self::Inline(sql);
        }

        match mode {
            Mode::Interactive => Self::File(PathBuf::from(String::env_or_from(
                source,
                "SCHEMA_FILE",
                "schema.sql",
            ))),
            Mode::Service => Self::File(PathBuf::from(SERVICE_SCHEMA_PATH)),
        }
    }
}

/// How the schema text is submitted to the server
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ExecutionStrategy {
    /// The whole document as one simple-query batch
    #[default]
    Batch,
    /// Client-side split on `;`, one fragment at a time.
    ///
    /// Breaks any procedural body that contains `;`.
    SplitStatements,
}

impl ExecutionStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Batch => "batch",
            Self::SplitStatements => "split",
        }
    }

    /// Read `SCHEMA_STRATEGY`, defaulting to batch execution
    pub fn from_source(source: &impl EnvSource) -> Result<Self> {
        match source.get("SCHEMA_STRATEGY") {
            Some(raw) => raw.parse(),
            None => Ok(Self::default()),
        }
    }
}

impl FromStr for ExecutionStrategy {
    type Err = BootstrapError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "batch" => Ok(Self::Batch),
            "split" => Ok(Self::SplitStatements),
            other => Err(BootstrapError::InvalidSetting {
                name: "SCHEMA_STRATEGY",
                reason: format!("unknown strategy {:?}, expected batch or split", other),
            }),
        }
    }
}
