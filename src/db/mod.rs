//! Query engine abstraction layer for trino-eda.
//!
//! Provides a trait-based interface over the remote engine so the session
//! bootstrap can run against Trino or an in-memory engine interchangeably.

mod mock;
mod table;
mod trino;
mod types;

pub use mock::MockQueryEngine;
pub use table::{quote_ident, TableHandle};
pub use trino::TrinoClient;
pub use types::{ColumnInfo, QueryResult, Row, Value};

use crate::config::{ConnectionConfig, Credentials};
use crate::error::Result;
use async_trait::async_trait;

/// Opens a session against the Trino engine described by `config`.
///
/// The connection is verified with a `SELECT 1` round trip before returning.
pub async fn connect(
    config: &ConnectionConfig,
    credentials: Credentials,
) -> Result<Box<dyn QueryEngine>> {
    let client = TrinoClient::connect(config, credentials).await?;
    Ok(Box::new(client))
}

/// Trait defining the interface for query engine clients.
///
/// All operations are async and return Results with EdaError.
#[async_trait]
pub trait QueryEngine: Send + Sync {
    /// Executes a SQL statement and returns the results.
    async fn execute_query(&self, sql: &str) -> Result<QueryResult>;

    /// Releases the session. Further queries fail.
    async fn close(&self) -> Result<()>;
}
