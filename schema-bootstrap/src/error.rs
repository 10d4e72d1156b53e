//! Error types for schema bootstrapping

use std::error::Error as _;
use thiserror::Error;

pub type Result<T, E = BootstrapError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("Missing required environment variable: {0}")]
    MissingCredential(&'static str),

    #[error("Invalid value for {name}: {reason}")]
    InvalidSetting { name: &'static str, reason: String },

    #[error("Schema SQL not provided: {0}")]
    SchemaNotFound(String),

    #[error("Connection failed: {}", cause(.0))]
    Connection(#[source] tokio_postgres::Error),

    #[error("Error executing schema{}: {}", .statement.map(|n| format!(" (statement {})", n)).unwrap_or_default(), cause(.source))]
    Execution {
        /// 1-based index of the failing fragment when statements are split.
        statement: Option<usize>,
        #[source]
        source: tokio_postgres::Error,
    },

    #[error("Verification query failed: {}", cause(.0))]
    Verification(#[source] tokio_postgres::Error),

    #[error("Schema applied but expected tables are missing: {}", .missing.join(", "))]
    TablesMissing { missing: Vec<String> },
}

/// The server's message for database errors, otherwise the full source chain.
///
/// `tokio_postgres::Error` alone displays only its kind ("db error").
pub fn cause(e: &tokio_postgres::Error) -> String {
    if let Some(db) = e.as_db_error() {
        return db.message().to_string();
    }

    let mut text = e.to_string();
    let mut source = e.source();
    while let Some(inner) = source {
        let message = inner.to_string();
        if !text.contains(&message) {
            text.push_str(": ");
            text.push_str(&message);
        }
        source = inner.source();
    }
    text
}

impl BootstrapError {
    pub(crate) fn execution(source: tokio_postgres::Error) -> Self {
        Self::Execution {
            statement: None,
            source,
        }
    }

    /// HTTP-style status for the service response.
    ///
    /// Configuration and input problems are 400, everything that happened
    /// after a connection attempt is 500.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::MissingCredential(_) | Self::InvalidSetting { .. } | Self::SchemaNotFound(_) => 400,
            Self::Connection(_)
            | Self::Execution { .. }
            | Self::Verification(_)
            | Self::TablesMissing { .. } => 500,
        }
    }
}
