//! Interactive database setup
//!
//! Creates the loan review workflow schema from `SCHEMA_SQL` or a schema file
//! (`SCHEMA_FILE`, default `./schema.sql`). Credentials come from `DB_*`
//! environment variables; `DB_PASSWORD` has no default.
//! Exits non-zero on any failure.

use anyhow::Result;
use common::{init_logging, LogOutput, ProcessEnv};
use schema_bootstrap::{Mode, SchemaBootstrapper};
use tracing::{error, info};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let _guard = init_logging("setup-database", LogOutput::Stdout);

    info!("=== LDC Loan Review Workflow - Database Setup ===");

    let mut bootstrapper = SchemaBootstrapper::new(Mode::Interactive);
    let report = match bootstrapper.run(&ProcessEnv).await {
        Ok(report) => report,
        Err(e) => {
            error!(error = %e, status = e.status_code(), "✗ Database setup failed");
            std::process::exit(1);
        }
    };

    let verification = &report.verification;
    info!(
        count = verification.found_table_names.len(),
        "✓ Tables created"
    );
    for (table, rows) in &verification.row_counts {
        info!("  - {}: {} rows", table, rows);
    }

    info!(
        database = %report.database,
        strategy = report.strategy,
        duration_ms = report.duration_ms,
        "=== Database setup complete! ==="
    );

    Ok(())
}
