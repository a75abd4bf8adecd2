//! Handles to remote tables.
//!
//! A handle is bound once, after the engine has confirmed the table exists,
//! and is read-only afterwards.

use crate::db::{ColumnInfo, QueryEngine, QueryResult};
use crate::error::{EdaError, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// A remote table bound through a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableHandle {
    /// Catalog the table lives in.
    pub catalog: String,

    /// Schema the table lives in.
    pub schema: String,

    /// Table name.
    pub name: String,

    /// Columns as reported by `DESCRIBE`.
    pub columns: Vec<ColumnInfo>,
}

impl TableHandle {
    /// Resolves `catalog.schema.name` against the engine and binds a handle.
    ///
    /// Fails with a query error if the table does not exist.
    pub async fn bind(
        engine: &dyn QueryEngine,
        catalog: &str,
        schema: &str,
        name: &str,
    ) -> Result<Self> {
        let qualified = qualified_name(catalog, schema, name);
        let described = engine.execute_query(&format!("DESCRIBE {qualified}")).await?;
        let columns = columns_from_describe(&described)?;

        debug!("Bound {} ({} columns)", qualified, columns.len());

        Ok(Self {
            catalog: catalog.to_string(),
            schema: schema.to_string(),
            name: name.to_string(),
            columns,
        })
    }

    /// Returns the fully quoted `"catalog"."schema"."name"` reference.
    pub fn qualified_name(&self) -> String {
        qualified_name(&self.catalog, &self.schema, &self.name)
    }

    /// Returns the column with the given name, if present.
    pub fn column(&self, name: &str) -> Option<&ColumnInfo> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Fetches the first `limit` rows of the table.
    pub async fn head(&self, engine: &dyn QueryEngine, limit: usize) -> Result<QueryResult> {
        engine
            .execute_query(&format!(
                "SELECT * FROM {} LIMIT {}",
                self.qualified_name(),
                limit
            ))
            .await
    }

    /// Counts the rows of the table.
    pub async fn count(&self, engine: &dyn QueryEngine) -> Result<i64> {
        let result = engine
            .execute_query(&format!("SELECT count(*) FROM {}", self.qualified_name()))
            .await?;

        result.scalar().and_then(|v| v.as_i64()).ok_or_else(|| {
            EdaError::query(format!(
                "count(*) on {} returned no integer",
                self.qualified_name()
            ))
        })
    }
}

/// Quotes an identifier, doubling any embedded `"`.
pub fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

fn qualified_name(catalog: &str, schema: &str, name: &str) -> String {
    format!(
        "{}.{}.{}",
        quote_ident(catalog),
        quote_ident(schema),
        quote_ident(name)
    )
}

/// Maps `DESCRIBE` output (`Column`, `Type`, ...) into column metadata.
fn columns_from_describe(described: &QueryResult) -> Result<Vec<ColumnInfo>> {
    let (name_idx, type_idx) = match (
        described.column_index("Column"),
        described.column_index("Type"),
    ) {
        (Some(n), Some(t)) => (n, t),
        _ => {
            return Err(EdaError::query(
                "DESCRIBE output is missing the Column or Type field",
            ))
        }
    };

    described
        .rows
        .iter()
        .map(|row| {
            let name = row.get(name_idx).and_then(|v| v.as_str());
            let data_type = row.get(type_idx).and_then(|v| v.as_str());
            match (name, data_type) {
                (Some(name), Some(data_type)) => Ok(ColumnInfo::new(name, data_type)),
                _ => Err(EdaError::query("DESCRIBE returned a malformed row")),
            }
        })
        .collect()
}
