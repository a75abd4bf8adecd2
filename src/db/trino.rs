//! Trino query engine client.
//!
//! Speaks the Trino REST statement protocol: a statement is `POST`ed to
//! `/v1/statement` and the client follows `nextUri` until the engine stops
//! returning one, collecting columns and rows from each page.

use crate::config::{ConnectionConfig, Credentials};
use crate::db::{ColumnInfo, QueryEngine, QueryResult, Row, Value};
use crate::error::{EdaError, Result};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, warn};
use url::Url;

/// Maximum rows kept from a single query.
const MAX_ROWS: usize = 1000;

/// Attempts for a result poll answered with 502/503/504.
const MAX_BUSY_ATTEMPTS: u32 = 3;

/// Base delay between busy retries (doubles each retry).
const BUSY_BASE_DELAY_MS: u64 = 100;

/// Value sent as `X-Trino-Source`.
const CLIENT_SOURCE: &str = "trino-eda";

/// Statement used to verify a freshly opened session.
const CONNECT_CHECK_SQL: &str = "SELECT 1";

/// Trino client bound to one catalog and schema.
#[derive(Debug)]
pub struct TrinoClient {
    http: Client,
    statement_url: Url,
    catalog: String,
    schema: String,
    credentials: Credentials,
    send_password: bool,
    timeout_secs: u64,
    closed: AtomicBool,
}

impl TrinoClient {
    /// Creates a client without touching the network.
    pub fn new(config: &ConnectionConfig, credentials: Credentials) -> Result<Self> {
        let statement_url = config.statement_url()?;
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| EdaError::internal(format!("Failed to create HTTP client: {e}")))?;

        if !config.secure {
            warn!(
                "Plain HTTP connection to {}; password will not be sent",
                config.host
            );
        }

        Ok(Self {
            http,
            statement_url,
            catalog: config.catalog.clone(),
            schema: config.schema.clone(),
            credentials,
            send_password: config.secure,
            timeout_secs: config.timeout_secs,
            closed: AtomicBool::new(false),
        })
    }

    /// Creates a client and verifies connectivity and credentials.
    pub async fn connect(config: &ConnectionConfig, credentials: Credentials) -> Result<Self> {
        let client = Self::new(config, credentials)?;
        debug!("Probing {}", client.statement_url);
        client.execute_query(CONNECT_CHECK_SQL).await?;
        debug!("Session established for user '{}'", client.credentials.user);
        Ok(client)
    }

    /// Returns the statement endpoint this client submits to.
    pub fn statement_url(&self) -> &Url {
        &self.statement_url
    }

    /// Builds the initial `POST` for a statement.
    pub fn statement_request(&self, sql: &str) -> RequestBuilder {
        self.with_session_headers(self.http.post(self.statement_url.clone()))
            .body(sql.to_string())
    }

    /// Builds a `GET` for a `nextUri` page.
    fn next_page_request(&self, next_uri: &str) -> RequestBuilder {
        self.with_session_headers(self.http.get(next_uri))
    }

    fn with_session_headers(&self, builder: RequestBuilder) -> RequestBuilder {
        let builder = builder
            .header("X-Trino-User", &self.credentials.user)
            .header("X-Trino-Catalog", &self.catalog)
            .header("X-Trino-Schema", &self.schema)
            .header("X-Trino-Source", CLIENT_SOURCE);

        if self.send_password {
            builder.basic_auth(&self.credentials.user, Some(&self.credentials.password))
        } else {
            builder
        }
    }

    /// Sends a request. With `retry_busy` a 502/503/504 answer is retried
    /// up to `MAX_BUSY_ATTEMPTS` times; submissions are sent once.
    async fn send<F>(&self, make_request: F, retry_busy: bool) -> Result<Response>
    where
        F: Fn() -> RequestBuilder,
    {
        let attempts = if retry_busy { MAX_BUSY_ATTEMPTS } else { 1 };
        let mut delay = Duration::from_millis(BUSY_BASE_DELAY_MS);

        for attempt in 1..=attempts {
            let response = make_request()
                .send()
                .await
                .map_err(|e| self.map_send_error(e))?;

            let status = response.status();
            if is_busy(status) && attempt < attempts {
                warn!(
                    "Engine busy ({}) on attempt {} of {}, retrying in {:?}",
                    status, attempt, attempts, delay
                );
                tokio::time::sleep(delay).await;
                delay *= 2;
                continue;
            }

            return self.check_status(response).await;
        }

        Err(EdaError::internal("request retry loop exited without a response"))
    }

    async fn check_status(&self, response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());

        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(EdaError::auth(format!(
                "Engine rejected credentials for user '{}' ({})",
                self.credentials.user, status
            ))),
            _ => Err(EdaError::connection(format!(
                "Engine returned {}: {}",
                status,
                body.trim()
            ))),
        }
    }

    fn map_send_error(&self, e: reqwest::Error) -> EdaError {
        let host = self.statement_url.host_str().unwrap_or("engine");
        if e.is_timeout() {
            EdaError::connection(format!(
                "Request to {host} timed out after {} seconds",
                self.timeout_secs
            ))
        } else if e.is_connect() {
            EdaError::connection(format!("Failed to connect to {host}: {e}"))
        } else {
            EdaError::connection(format!("Request failed: {e}"))
        }
    }

    async fn read_page(response: Response) -> Result<QueryResults> {
        let body = response
            .text()
            .await
            .map_err(|e| EdaError::connection(format!("Failed to read response: {e}")))?;

        serde_json::from_str(&body)
            .map_err(|e| EdaError::connection(format!("Failed to parse engine response: {e}")))
    }
}

#[async_trait]
impl QueryEngine for TrinoClient {
    async fn execute_query(&self, sql: &str) -> Result<QueryResult> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(EdaError::connection("Session is closed"));
        }

        let start = Instant::now();
        let response = self.send(|| self.statement_request(sql), false).await?;
        let mut page = Self::read_page(response).await?;
        let mut collector = ResultCollector::default();

        loop {
            debug!(
                "Query {} state {}",
                page.id,
                page.stats.as_ref().map(|s| s.state.as_str()).unwrap_or("UNKNOWN")
            );

            if let Some(error) = page.error.take() {
                return Err(EdaError::query(error.describe()));
            }

            let next_uri = page.next_uri.take();
            collector.absorb(page);

            match next_uri {
                Some(uri) => {
                    let response = self
                        .send(|| self.next_page_request(&uri), true)
                        .await?;
                    page = Self::read_page(response).await?;
                }
                None => break,
            }
        }

        let result = collector.finish().with_execution_time(start.elapsed());
        if result.was_truncated {
            warn!(
                "Query returned {} rows, truncating to {} rows",
                result.total_rows.unwrap_or_default(),
                MAX_ROWS
            );
        }
        Ok(result)
    }

    async fn close(&self) -> Result<()> {
        if !self.closed.swap(true, Ordering::SeqCst) {
            debug!("Closed session for user '{}'", self.credentials.user);
        }
        Ok(())
    }
}

fn is_busy(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::BAD_GATEWAY | StatusCode::SERVICE_UNAVAILABLE | StatusCode::GATEWAY_TIMEOUT
    )
}

/// One page of the statement protocol.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QueryResults {
    id: String,
    next_uri: Option<String>,
    columns: Option<Vec<ProtocolColumn>>,
    data: Option<Vec<Vec<serde_json::Value>>>,
    stats: Option<StatementStats>,
    error: Option<QueryError>,
}

#[derive(Debug, Deserialize)]
struct ProtocolColumn {
    name: String,
    #[serde(rename = "type")]
    data_type: String,
}

#[derive(Debug, Deserialize)]
struct StatementStats {
    state: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QueryError {
    message: String,
    error_name: Option<String>,
}

impl QueryError {
    fn describe(&self) -> String {
        match &self.error_name {
            Some(name) => format!("{name}: {}", self.message),
            None => self.message.clone(),
        }
    }
}

/// Accumulates pages into a single result, capped at `MAX_ROWS`.
#[derive(Default)]
struct ResultCollector {
    query_id: Option<String>,
    columns: Option<Vec<ColumnInfo>>,
    rows: Vec<Row>,
    total_rows: usize,
}

impl ResultCollector {
    fn absorb(&mut self, page: QueryResults) {
        self.query_id.get_or_insert(page.id);

        if self.columns.is_none() {
            if let Some(columns) = page.columns {
                self.columns = Some(
                    columns
                        .into_iter()
                        .map(|c| ColumnInfo::new(c.name, c.data_type))
                        .collect(),
                );
            }
        }

        for row in page.data.unwrap_or_default() {
            self.total_rows += 1;
            if self.rows.len() < MAX_ROWS {
                self.rows.push(row.into_iter().map(Value::from_json).collect());
            }
        }
    }

    fn finish(self) -> QueryResult {
        let row_count = self.rows.len();
        QueryResult {
            query_id: self.query_id,
            columns: self.columns.unwrap_or_default(),
            rows: self.rows,
            execution_time: Duration::ZERO,
            row_count,
            total_rows: Some(self.total_rows),
            was_truncated: self.total_rows > row_count,
        }
    }
}
