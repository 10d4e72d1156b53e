//! Service-mode database setup
//!
//! Reads an event object (JSON, ignored) from stdin and writes
//! `{"statusCode": .., "body": ..}` to stdout. Logs go to stderr.
//! `DB_HOST` and `DB_PASSWORD` are required; the schema comes from
//! `SCHEMA_SQL` or `/tmp/schema.sql`.

use anyhow::{Context, Result};
use common::{init_logging, LogOutput, ProcessEnv};
use std::io::Read;
use tracing::{info, warn};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let _guard = init_logging("setup-db-service", LogOutput::Stderr);

    let mut input = String::new();
    std::io::stdin()
        .read_to_string(&mut input)
        .context("Failed to read event from stdin")?;

    let event = if input.trim().is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_str(&input).unwrap_or_else(|e| {
            warn!(error = %e, "Event is not valid JSON, ignoring it");
            serde_json::Value::Null
        })
    };

    let response = schema_bootstrap::handle(&event, &ProcessEnv).await;
    info!(status = response.status_code, "Request handled");

    println!(
        "{}",
        serde_json::to_string(&response).context("Failed to encode response")?
    );

    Ok(())
}
