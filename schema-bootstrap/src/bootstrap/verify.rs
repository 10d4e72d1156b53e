//! Post-apply verification

use crate::error::{BootstrapError, Result};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use tokio_postgres::Client;

/// Tables found after applying a schema, with their row counts
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct VerificationResult {
    pub expected_table_names: BTreeSet<String>,
    pub found_table_names: BTreeSet<String>,
    /// Only tables that exist have a count
    pub row_counts: BTreeMap<String, i64>,
}

impl VerificationResult {
    /// Expected tables that were not found
    pub fn missing(&self) -> Vec<String> {
        self.expected_table_names
            .difference(&self.found_table_names)
            .cloned()
            .collect()
    }

    pub fn is_complete(&self) -> bool {
        self.expected_table_names.is_subset(&self.found_table_names)
    }
}

/// Look up `expected` base tables in `namespace` and count rows of those
/// present. Views with an expected name do not count.
///
/// Missing tables are reported, not treated as errors; only a failing
/// catalog or count query is.
pub async fn verify(
    client: &Client,
    namespace: &str,
    expected: &[String],
) -> Result<VerificationResult> {
    let rows = client
        .query(
            "SELECT table_name::text FROM information_schema.tables \
             WHERE table_schema::text = $1 AND table_name::text = ANY($2) \
               AND table_type = 'BASE TABLE' \
             ORDER BY table_name",
            &[&namespace, &expected],
        )
        .await
        .map_err(BootstrapError::Verification)?;

    let mut found_table_names = BTreeSet::new();
    for row in rows {
        let name: String = row.try_get(0).map_err(BootstrapError::Verification)?;
        found_table_names.insert(name);
    }

    let mut row_counts = BTreeMap::new();
    for table in &found_table_names {
        let sql = format!(
            "SELECT COUNT(*) FROM {}.{}",
            quote_ident(namespace),
            quote_ident(table)
        );
        let row = client
            .query_one(sql.as_str(), &[])
            .await
            .map_err(BootstrapError::Verification)?;
        let count: i64 = row.try_get(0).map_err(BootstrapError::Verification)?;
        row_counts.insert(table.clone(), count);
    }

    Ok(VerificationResult {
        expected_table_names: expected.iter().cloned().collect(),
        found_table_names,
        row_counts,
    })
}

/// Double-quote an identifier
fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}
