//! Mock query engine for testing.
//!
//! Provides an in-memory engine that understands the handful of statements
//! the session issues: the connection check, `DESCRIBE`, row previews and
//! row counts.

use super::{ColumnInfo, QueryEngine, QueryResult, Row, Value};
use crate::error::{EdaError, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Duration;

#[derive(Debug, Clone)]
struct MockTable {
    columns: Vec<ColumnInfo>,
    rows: Vec<Row>,
}

/// An in-memory engine that returns predefined tables.
#[derive(Debug, Default)]
pub struct MockQueryEngine {
    tables: HashMap<String, MockTable>,
    queries: Mutex<Vec<String>>,
    closed: AtomicBool,
}

impl MockQueryEngine {
    /// Creates a new mock engine with no tables.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a mock engine seeded with small `astronauts` and `missions` tables.
    pub fn sample() -> Self {
        Self::new()
            .with_table(
                "astronauts",
                vec![
                    ColumnInfo::new("id", "bigint"),
                    ColumnInfo::new("name", "varchar"),
                    ColumnInfo::new("nationality", "varchar"),
                    ColumnInfo::new("year_of_birth", "integer"),
                    ColumnInfo::new("total_number_of_missions", "integer"),
                ],
                vec![
                    astronaut(1, "Gagarin, Yuri", "U.S.S.R/Russia", 1934, 1),
                    astronaut(2, "Tereshkova, Valentina", "U.S.S.R/Russia", 1937, 1),
                    astronaut(3, "Armstrong, Neil A.", "U.S.", 1930, 2),
                    astronaut(4, "Ride, Sally K.", "U.S.", 1951, 2),
                    astronaut(5, "Hadfield, Chris", "Canada", 1959, 3),
                ],
            )
            .with_table(
                "missions",
                vec![
                    ColumnInfo::new("id", "bigint"),
                    ColumnInfo::new("mission_title", "varchar"),
                    ColumnInfo::new("year_of_mission", "integer"),
                    ColumnInfo::new("ascend_shuttle", "varchar"),
                ],
                vec![
                    mission(1, "Vostok 1", 1961, "Vostok 1"),
                    mission(2, "Vostok 6", 1963, "Vostok 6"),
                    mission(3, "Apollo 11", 1969, "Apollo 11"),
                    mission(4, "STS-7", 1983, "STS-7"),
                ],
            )
    }

    /// Adds a table, replacing any table of the same name.
    pub fn with_table(mut self, name: &str, columns: Vec<ColumnInfo>, rows: Vec<Row>) -> Self {
        self.tables
            .insert(name.to_lowercase(), MockTable { columns, rows });
        self
    }

    /// Returns every statement executed so far, in order.
    pub fn queries(&self) -> Vec<String> {
        self.queries
            .lock()
            .map(|q| q.clone())
            .unwrap_or_default()
    }

    /// Returns true once `close` has been called.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn lookup(&self, reference: &str) -> Result<&MockTable> {
        let name = table_name_of(reference)
            .ok_or_else(|| EdaError::query(format!("SYNTAX_ERROR: bad table reference {reference}")))?;
        self.tables.get(&name).ok_or_else(|| {
            EdaError::query(format!("TABLE_NOT_FOUND: Table '{name}' does not exist"))
        })
    }

    fn run(&self, sql: &str) -> Result<QueryResult> {
        let sql = sql.trim().trim_end_matches(';').trim();

        if sql.eq_ignore_ascii_case("SELECT 1") {
            return Ok(QueryResult::with_data(
                vec![ColumnInfo::new("_col0", "integer")],
                vec![vec![Value::Int(1)]],
            ));
        }

        if let Some(reference) = strip_prefix_ci(sql, "DESCRIBE ") {
            let table = self.lookup(reference)?;
            let rows = table
                .columns
                .iter()
                .map(|c| {
                    vec![
                        Value::from(c.name.as_str()),
                        Value::from(c.data_type.as_str()),
                        Value::from(""),
                        Value::from(""),
                    ]
                })
                .collect();
            return Ok(QueryResult::with_data(
                vec![
                    ColumnInfo::new("Column", "varchar"),
                    ColumnInfo::new("Type", "varchar"),
                    ColumnInfo::new("Extra", "varchar"),
                    ColumnInfo::new("Comment", "varchar"),
                ],
                rows,
            ));
        }

        if let Some(reference) = strip_prefix_ci(sql, "SELECT count(*) FROM ") {
            let table = self.lookup(reference)?;
            return Ok(QueryResult::with_data(
                vec![ColumnInfo::new("_col0", "bigint")],
                vec![vec![Value::Int(table.rows.len() as i64)]],
            ));
        }

        if let Some(rest) = strip_prefix_ci(sql, "SELECT * FROM ") {
            let (reference, limit) = split_limit(rest)?;
            let table = self.lookup(reference)?;
            let rows = table
                .rows
                .iter()
                .take(limit.unwrap_or(usize::MAX))
                .cloned()
                .collect();
            return Ok(QueryResult::with_data(table.columns.clone(), rows));
        }

        Err(EdaError::query(format!(
            "NOT_SUPPORTED: mock engine cannot run: {sql}"
        )))
    }
}

#[async_trait]
impl QueryEngine for MockQueryEngine {
    async fn execute_query(&self, sql: &str) -> Result<QueryResult> {
        if self.is_closed() {
            return Err(EdaError::connection("Session is closed"));
        }

        if let Ok(mut queries) = self.queries.lock() {
            queries.push(sql.to_string());
        }

        Ok(self.run(sql)?.with_execution_time(Duration::from_millis(1)))
    }

    async fn close(&self) -> Result<()> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

fn astronaut(id: i64, name: &str, nationality: &str, born: i32, missions: i32) -> Row {
    vec![
        Value::Int(id),
        Value::from(name),
        Value::from(nationality),
        Value::from(born),
        Value::from(missions),
    ]
}

fn mission(id: i64, title: &str, year: i32, shuttle: &str) -> Row {
    vec![
        Value::Int(id),
        Value::from(title),
        Value::from(year),
        Value::from(shuttle),
    ]
}

fn strip_prefix_ci<'a>(s: &'a str, prefix: &str) -> Option<&'a str> {
    let head = s.get(..prefix.len())?;
    head.eq_ignore_ascii_case(prefix)
        .then(|| s[prefix.len()..].trim())
}

/// Splits `<reference> LIMIT n` into its parts.
fn split_limit(rest: &str) -> Result<(&str, Option<usize>)> {
    let upper = rest.to_ascii_uppercase();
    match upper.rfind(" LIMIT ") {
        Some(idx) => {
            let limit = rest[idx + " LIMIT ".len()..]
                .trim()
                .parse::<usize>()
                .map_err(|e| EdaError::query(format!("SYNTAX_ERROR: bad LIMIT: {e}")))?;
            Ok((rest[..idx].trim(), Some(limit)))
        }
        None => Ok((rest, None)),
    }
}

/// Returns the last segment of a possibly qualified, possibly quoted table
/// reference. Unquoted names are lowercased.
fn table_name_of(reference: &str) -> Option<String> {
    let mut segments = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;

    for c in reference.trim().chars() {
        match c {
            '"' => {
                in_quotes = !in_quotes;
                current.push(c);
            }
            '.' if !in_quotes => segments.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }
    segments.push(current);

    let last = segments.pop()?;
    let last = last.trim();
    if last.is_empty() || in_quotes {
        return None;
    }

    match last.strip_prefix('"').and_then(|s| s.strip_suffix('"')) {
        Some(quoted) => Some(quoted.replace("\"\"", "\"")),
        None => Some(last.to_lowercase()),
    }
}
