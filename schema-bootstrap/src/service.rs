//! Service-mode request handling
//!
//! The event payload is accepted but ignored; all inputs come from the
//! environment. Responses carry an HTTP-style status and a JSON-encoded body.

use crate::bootstrap::{BootstrapReport, Mode, SchemaBootstrapper};
use crate::error::BootstrapError;
use common::EnvSource;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::BTreeMap;

/// Structured result of one invocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceResponse {
    pub status_code: u16,
    /// JSON text, not a nested object
    pub body: String,
}

#[derive(Serialize)]
struct SuccessBody<'a> {
    message: &'static str,
    tables: Vec<&'a str>,
    row_counts: &'a BTreeMap<String, i64>,
}

impl ServiceResponse {
    pub fn success(report: &BootstrapReport) -> Self {
        let body = SuccessBody {
            message: "Database schema created successfully",
            tables: report
                .verification
                .found_table_names
                .iter()
                .map(String::as_str)
                .collect(),
            row_counts: &report.verification.row_counts,
        };

        Self {
            status_code: 200,
            body: serde_json::to_string(&body).unwrap_or_else(|_| json!(body.message).to_string()),
        }
    }

    pub fn error(err: &BootstrapError) -> Self {
        Self {
            status_code: err.status_code(),
            body: json!(format!("Error: {}", err)).to_string(),
        }
    }
}

/// Handle one invocation against `source`
pub async fn handle(_event: &serde_json::Value, source: &impl EnvSource) -> ServiceResponse {
    let mut bootstrapper = SchemaBootstrapper::new(Mode::Service);
    match bootstrapper.run(source).await {
        Ok(report) => ServiceResponse::success(&report),
        Err(e) => ServiceResponse::error(&e),
    }
}
