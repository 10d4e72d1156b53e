//! PostgreSQL schema provisioning for the loan review workflow
//!
//! This crate loads connection parameters and a schema document, applies the
//! schema in one transaction, verifies the expected tables and reports row
//! counts. It backs two binaries:
//! - `setup-database`: interactive, human-readable progress
//! - `setup-db-service`: request/response with a structured result

pub mod bootstrap;
pub mod connection;
pub mod error;
pub mod service;

pub use bootstrap::{
    BootstrapReport, ConnectionParams, ExecutionStrategy, Mode, Phase, SchemaBootstrapper,
    SchemaDocument, SchemaSource, VerificationResult,
};
pub use connection::Connection;
pub use error::{BootstrapError, Result};
pub use service::{handle, ServiceResponse};
