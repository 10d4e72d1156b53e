//! Schema bootstrapping
//!
//! Applies a schema document to a database exactly once per run and verifies
//! the expected tables afterwards:
//! - Loading credentials and the schema text
//! - Executing the schema (batch or split statements)
//! - Verifying tables and row counts
//!
//! The run walks `Idle -> CredentialsLoaded -> SchemaLoaded -> Connected ->
//! Applied -> Verified -> Closed`. A failure in any phase moves to `Failed`
//! and still ends in `Closed`, with the connection released.

mod apply;
mod config;
mod schema;
mod verify;

pub use apply::execute;
pub use config::{
    ConnectionParams, ExecutionStrategy, Mode, SchemaSource, DEFAULT_DATABASE, DEFAULT_HOST,
    SERVICE_SCHEMA_PATH, WORKFLOW_TABLES,
};
pub use schema::{SchemaDocument, WORKFLOW_SCHEMA};
pub use verify::{verify, VerificationResult};

use crate::connection::Connection;
use crate::error::{BootstrapError, Result};
use common::{BootstrapEvent, ConfigExt, EnvSource, EventLog};
use serde::Serialize;
use std::fmt;
use std::time::Instant;
use tracing::{info, warn};

/// Lifecycle phase of a bootstrap run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    CredentialsLoaded,
    SchemaLoaded,
    Connected,
    Applied,
    Verified,
    Closed,
    Failed,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::CredentialsLoaded => "credentials_loaded",
            Self::SchemaLoaded => "schema_loaded",
            Self::Connected => "connected",
            Self::Applied => "applied",
            Self::Verified => "verified",
            Self::Closed => "closed",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of a successful run
#[derive(Debug, Clone, Serialize)]
pub struct BootstrapReport {
    pub database: String,
    pub strategy: &'static str,
    pub statements: usize,
    pub duration_ms: u64,
    pub verification: VerificationResult,
}

/// Applies a schema document and verifies the result
pub struct SchemaBootstrapper {
    mode: Mode,
    expected_tables: Vec<String>,
    phase: Phase,
    events: EventLog,
}

impl SchemaBootstrapper {
    /// A bootstrapper expecting the workflow tables
    pub fn new(mode: Mode) -> Self {
        Self {
            mode,
            expected_tables: WORKFLOW_TABLES.iter().map(|t| t.to_string()).collect(),
            phase: Phase::Idle,
            events: EventLog::new("schema-bootstrap"),
        }
    }

    pub fn with_expected_tables<I, S>(mut self, tables: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.expected_tables = tables.into_iter().map(Into::into).collect();
        self
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn events(&self) -> &EventLog {
        &self.events
    }

    fn enter(&mut self, phase: Phase) {
        self.phase = phase;
        self.events.send(BootstrapEvent::PhaseEntered {
            phase: phase.as_str().to_string(),
        });
    }

    fn fail(&mut self, database: &str, error: &BootstrapError) {
        self.events.send(BootstrapEvent::BootstrapFailed {
            database: database.to_string(),
            error: error.to_string(),
            phase: self.phase.as_str().to_string(),
        });
        self.enter(Phase::Failed);
    }

    /// Read connection parameters. Never touches the network.
    pub fn load_credentials(&mut self, source: &impl EnvSource) -> Result<ConnectionParams> {
        let params = ConnectionParams::from_source(source, self.mode)?;

        info!(
            host = %params.host,
            port = params.port,
            database = %params.database,
            user = %params.user,
            "Loaded database credentials"
        );
        self.enter(Phase::CredentialsLoaded);
        Ok(params)
    }

    /// Read the schema text and execution strategy. Never touches the network.
    pub fn load_schema(
        &mut self,
        source: &impl EnvSource,
    ) -> Result<(SchemaDocument, ExecutionStrategy)> {
        let strategy = ExecutionStrategy::from_source(source)?;
        let schema = SchemaSource::from_source(source, self.mode).load()?;

        info!(
            origin = %schema.origin(),
            bytes = schema.len(),
            strategy = strategy.as_str(),
            "Loaded schema"
        );
        if strategy == ExecutionStrategy::SplitStatements {
            warn!("Split execution breaks procedural bodies containing ';'");
        }
        self.enter(Phase::SchemaLoaded);
        Ok((schema, strategy))
    }

    pub async fn connect(&mut self, params: &ConnectionParams) -> Result<Connection> {
        info!(host = %params.host, port = params.port, "Connecting to database");
        let conn = Connection::open(params).await?;
        self.enter(Phase::Connected);
        Ok(conn)
    }

    /// Execute the schema, then verify the expected tables
    pub async fn apply(
        &mut self,
        conn: &mut Connection,
        namespace: &str,
        schema: &SchemaDocument,
        strategy: ExecutionStrategy,
    ) -> Result<(usize, VerificationResult)> {
        let statements = execute(conn.client_mut(), schema, strategy).await?;
        self.events.send(BootstrapEvent::SchemaApplied {
            strategy: strategy.as_str().to_string(),
            bytes: schema.len(),
            statements,
        });
        self.enter(Phase::Applied);

        let verification = verify(conn.client(), namespace, &self.expected_tables).await?;
        for table in &verification.found_table_names {
            let rows = verification.row_counts.get(table).copied().unwrap_or_default();
            info!(table = %table, rows, "Table present");
        }
        self.enter(Phase::Verified);

        Ok((statements, verification))
    }

    /// Run the whole lifecycle against `source`.
    ///
    /// The connection, once opened, is closed on every exit path.
    pub async fn run(&mut self, source: &impl EnvSource) -> Result<BootstrapReport> {
        let start = Instant::now();
        let database = String::env_or_from(source, "DB_NAME", DEFAULT_DATABASE);

        self.events.send(BootstrapEvent::BootstrapStarted {
            database: database.clone(),
            mode: self.mode.as_str().to_string(),
        });

        let result = self.run_inner(source, start).await;

        if let Err(e) = &result {
            self.fail(&database, e);
        }
        self.enter(Phase::Closed);

        if let Ok(report) = &result {
            self.events.send(BootstrapEvent::BootstrapCompleted {
                database,
                duration_ms: report.duration_ms,
                tables: report.verification.found_table_names.iter().cloned().collect(),
            });
        }

        result
    }

    async fn run_inner(
        &mut self,
        source: &impl EnvSource,
        start: Instant,
    ) -> Result<BootstrapReport> {
        let params = self.load_credentials(source)?;
        let (schema, strategy) = self.load_schema(source)?;
        let mut conn = self.connect(&params).await?;

        let applied = self.apply(&mut conn, &params.schema, &schema, strategy).await;
        conn.close().await;

        let (statements, verification) = applied?;

        if !verification.is_complete() {
            let missing = verification.missing();
            warn!(missing = ?missing, "Expected tables not found after apply");
            return Err(BootstrapError::TablesMissing { missing });
        }

        Ok(BootstrapReport {
            database: params.database,
            strategy: strategy.as_str(),
            statements,
            duration_ms: start.elapsed().as_millis() as u64,
            verification,
        })
    }
}
