//! Schema execution

use super::config::ExecutionStrategy;
use super::schema::SchemaDocument;
use crate::error::{BootstrapError, Result};
use tokio_postgres::{Client, Transaction};
use tracing::{debug, warn};

/// Execute the schema inside one transaction.
///
/// Commits on success. On any failure the transaction is rolled back and the
/// error returned, so nothing from this document is left applied. Returns the
/// number of units submitted to the server.
pub async fn execute(
    client: &mut Client,
    schema: &SchemaDocument,
    strategy: ExecutionStrategy,
) -> Result<usize> {
    let tx = client
        .transaction()
        .await
        .map_err(BootstrapError::execution)?;

    match run(&tx, schema, strategy).await {
        Ok(units) => {
            tx.commit().await.map_err(BootstrapError::execution)?;
            Ok(units)
        }
        Err(e) => {
            if let Err(rollback) = tx.rollback().await {
                warn!(error = %rollback, "Rollback failed");
            }
            Err(e)
        }
    }
}

async fn run(
    tx: &Transaction<'_>,
    schema: &SchemaDocument,
    strategy: ExecutionStrategy,
) -> Result<usize> {
    match strategy {
        ExecutionStrategy::Batch => {
            tx.batch_execute(schema.text())
                .await
                .map_err(BootstrapError::execution)?;
            Ok(1)
        }
        ExecutionStrategy::SplitStatements => {
            let statements = schema.split_statements();
            for (i, statement) in statements.iter().enumerate() {
                debug!(index = i + 1, "Executing statement");
                tx.batch_execute(statement)
                    .await
                    .map_err(|source| BootstrapError::Execution {
                        statement: Some(i + 1),
                        source,
                    })?;
            }
            Ok(statements.len())
        }
    }
}
