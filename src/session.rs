//! Session bootstrap.
//!
//! Resolves credentials, opens one session against the engine and binds
//! the exploration tables to handles.

use crate::config::ConnectionConfig;
use crate::db::{self, QueryEngine, QueryResult, TableHandle};
use crate::error::{EdaError, Result};
use tracing::info;

/// Tables bound by default.
pub const DEFAULT_TABLES: [&str; 2] = ["astronauts", "missions"];

/// A live session bound to one catalog and schema.
pub struct Session {
    engine: Box<dyn QueryEngine>,
    catalog: String,
    schema: String,
}

impl Session {
    /// Opens a session against the engine described by `config`.
    ///
    /// Credentials are checked before any network traffic.
    pub async fn open(config: &ConnectionConfig) -> Result<Self> {
        let credentials = config.credentials()?;
        info!(
            "Connecting to {} as '{}'",
            config.display_string(),
            credentials.user
        );
        let engine = db::connect(config, credentials).await?;
        Ok(Self::with_engine(engine, config))
    }

    /// Wraps an already connected engine.
    pub fn with_engine(engine: Box<dyn QueryEngine>, config: &ConnectionConfig) -> Self {
        Self {
            engine,
            catalog: config.catalog.clone(),
            schema: config.schema.clone(),
        }
    }

    /// Returns the engine backing this session.
    pub fn engine(&self) -> &dyn QueryEngine {
        self.engine.as_ref()
    }

    /// Returns the catalog tables are resolved in.
    pub fn catalog(&self) -> &str {
        &self.catalog
    }

    /// Returns the schema tables are resolved in.
    pub fn schema(&self) -> &str {
        &self.schema
    }

    /// Binds a handle to a table in the session's catalog and schema.
    pub async fn table(&self, name: &str) -> Result<TableHandle> {
        TableHandle::bind(self.engine(), &self.catalog, &self.schema, name).await
    }

    /// Runs an arbitrary statement.
    pub async fn sql(&self, sql: &str) -> Result<QueryResult> {
        self.engine.execute_query(sql).await
    }

    /// Fetches the first `limit` rows of a bound table.
    pub async fn head(&self, table: &TableHandle, limit: usize) -> Result<QueryResult> {
        table.head(self.engine(), limit).await
    }

    /// Counts the rows of a bound table.
    pub async fn count(&self, table: &TableHandle) -> Result<i64> {
        table.count(self.engine()).await
    }

    /// Releases the session.
    pub async fn close(self) -> Result<()> {
        self.engine.close().await
    }
}

/// A session together with the tables bound through it.
pub struct Exploration {
    pub session: Session,
    pub tables: Vec<TableHandle>,
}

impl Exploration {
    /// Returns the bound table with the given name.
    pub fn table(&self, name: &str) -> Option<&TableHandle> {
        self.tables.iter().find(|t| t.name == name)
    }

    /// Returns the bound table with the given name, or a configuration error.
    pub fn expect_table(&self, name: &str) -> Result<&TableHandle> {
        self.table(name)
            .ok_or_else(|| EdaError::config(format!("Table '{name}' was not bound")))
    }
}

/// Binds every named table through `session`, in order.
///
/// The first failure aborts; no partial exploration is returned.
pub async fn bind_tables<S: AsRef<str>>(session: Session, names: &[S]) -> Result<Exploration> {
    let mut tables = Vec::with_capacity(names.len());
    for name in names {
        tables.push(session.table(name.as_ref()).await?);
    }
    info!(
        "Bound {} table(s) in {}.{}",
        tables.len(),
        session.catalog(),
        session.schema()
    );
    Ok(Exploration { session, tables })
}

/// Opens a session from `config` and binds the given tables.
pub async fn bootstrap<S: AsRef<str>>(
    config: &ConnectionConfig,
    table_names: &[S],
) -> Result<Exploration> {
    let session = Session::open(config).await?;
    bind_tables(session, table_names).await
}
