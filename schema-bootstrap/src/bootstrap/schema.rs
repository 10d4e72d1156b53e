//! Schema documents

use super::config::SchemaSource;
use crate::error::{BootstrapError, Result};
use std::io::ErrorKind;

/// The workflow schema shipped with this crate
pub const WORKFLOW_SCHEMA: &str = include_str!("../../sql/schema.sql");

/// Raw DDL text plus a description of where it came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaDocument {
    text: String,
    origin: String,
}

impl SchemaDocument {
    pub fn new(text: impl Into<String>, origin: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            origin: origin.into(),
        }
    }

    /// The bundled workflow schema
    pub fn workflow() -> Self {
        Self::new(WORKFLOW_SCHEMA, "bundled workflow schema")
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// Size in bytes
    pub fn len(&self) -> usize {
        self.text.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty()
    }

    /// Split on `;` and drop blank fragments.
    ///
    /// Unaware of quoting: a `;` inside a string literal or a `$$` function
    /// body splits it too.
    pub fn split_statements(&self) -> Vec<&str> {
        self.text
            .split(';')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect()
    }
}

impl SchemaSource {
    /// Read the schema text. A blank document is treated as absent.
    pub fn load(&self) -> Result<SchemaDocument> {
        let document = match self {
            Self::Inline(sql) => SchemaDocument::new(sql.clone(), "SCHEMA_SQL"),
            Self::File(path) => match std::fs::read_to_string(path) {
                Ok(text) => SchemaDocument::new(text, path.display().to_string()),
                Err(e) if e.kind() == ErrorKind::NotFound => {
                    return Err(BootstrapError::SchemaNotFound(format!(
                        "{} not found",
                        path.display()
                    )));
                }
                Err(e) => {
                    return Err(BootstrapError::SchemaNotFound(format!(
                        "failed to read {}: {}",
                        path.display(),
                        e
                    )));
                }
            },
        };

        if document.is_empty() {
            return Err(BootstrapError::SchemaNotFound(format!(
                "{} is empty",
                document.origin
            )));
        }

        Ok(document)
    }
}
