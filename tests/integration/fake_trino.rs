//! In-process fake engine for integration tests.
//!
//! A `wiremock` server that speaks just enough of the statement protocol:
//! every statement is queued first and its results are served from `nextUri`
//! pages, the way a real coordinator does.

use serde_json::{json, Value as Json};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use trino_eda::config::ConnectionConfig;
use wiremock::matchers::{method, path, path_regex};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

/// Rows per result page.
const PAGE_SIZE: usize = 500;

/// Rows in the `events` table, enough to span several pages.
pub const EVENT_ROWS: usize = 1200;

const EXECUTING_PREFIX: &str = "/v1/statement/executing/";

/// Knobs for misbehaving engines.
#[derive(Debug, Clone, Default)]
pub struct Behaviour {
    /// Reject requests whose `X-Trino-User` differs.
    pub expected_user: Option<String>,
    /// Answer this many result polls with 503 before serving them.
    pub busy_polls: usize,
    /// Answer every submission with this status and body.
    pub reject_submit: Option<(u16, &'static str)>,
    /// Hold every response back this long.
    pub delay: Option<Duration>,
}

/// Shared state behind both mounted mocks.
struct Coordinator {
    base_url: String,
    behaviour: Behaviour,
    pending: Mutex<HashMap<String, Vec<Json>>>,
    busy_remaining: AtomicUsize,
    next_id: AtomicUsize,
}

/// Answers `POST /v1/statement`.
struct Submit(Arc<Coordinator>);

/// Answers `GET /v1/statement/executing/{id}/{token}`.
struct Poll(Arc<Coordinator>);

impl Coordinator {
    fn template(&self, status: u16) -> ResponseTemplate {
        let template = ResponseTemplate::new(status);
        match self.behaviour.delay {
            Some(delay) => template.set_delay(delay),
            None => template,
        }
    }

    fn rejects(&self, request: &Request) -> Option<ResponseTemplate> {
        let expected = self.behaviour.expected_user.as_deref()?;
        let user = request
            .headers
            .get("x-trino-user")
            .and_then(|v| v.to_str().ok());
        (user != Some(expected)).then(|| self.template(401).set_body_string("Unauthorized"))
    }

    fn executing_uri(&self, id: &str, token: usize) -> String {
        format!("{}{EXECUTING_PREFIX}{id}/{token}", self.base_url)
    }
}

impl Respond for Submit {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let engine = &self.0;
        if let Some(rejected) = engine.rejects(request) {
            return rejected;
        }
        if let Some((status, body)) = engine.behaviour.reject_submit {
            return engine.template(status).set_body_string(body);
        }

        let sql = String::from_utf8_lossy(&request.body).trim().to_string();
        let id = format!("q{}", engine.next_id.fetch_add(1, Ordering::SeqCst));
        let pages = result_pages(&id, &sql);
        engine.pending.lock().unwrap().insert(id.clone(), pages);

        engine.template(200).set_body_json(json!({
            "id": id,
            "nextUri": engine.executing_uri(&id, 1),
            "stats": {"state": "QUEUED"},
        }))
    }
}

impl Respond for Poll {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let engine = &self.0;
        if let Some(rejected) = engine.rejects(request) {
            return rejected;
        }
        if engine
            .busy_remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return engine.template(503).set_body_string("busy");
        }

        let mut parts = request
            .url
            .path()
            .trim_start_matches(EXECUTING_PREFIX)
            .split('/');
        let id = parts.next().unwrap_or_default().to_string();
        let token: usize = parts.next().and_then(|t| t.parse().ok()).unwrap_or(0);

        let pending = engine.pending.lock().unwrap();
        let Some(pages) = pending.get(&id) else {
            return engine.template(404).set_body_string("unknown query");
        };
        let Some(page) = token.checked_sub(1).and_then(|i| pages.get(i)) else {
            return engine.template(404).set_body_string("unknown token");
        };

        let mut page = page.clone();
        if token < pages.len() {
            page["nextUri"] = json!(engine.executing_uri(&id, token + 1));
        }
        engine.template(200).set_body_json(page)
    }
}

/// Handle to a running fake engine.
pub struct FakeTrino {
    server: MockServer,
}

impl FakeTrino {
    /// Starts a well-behaved fake engine.
    pub async fn start() -> Self {
        Self::start_with(Behaviour::default()).await
    }

    /// Starts a fake engine with the given behaviour.
    pub async fn start_with(behaviour: Behaviour) -> Self {
        let server = MockServer::start().await;
        let coordinator = Arc::new(Coordinator {
            base_url: server.uri(),
            busy_remaining: AtomicUsize::new(behaviour.busy_polls),
            behaviour,
            pending: Mutex::new(HashMap::new()),
            next_id: AtomicUsize::new(1),
        });

        Mock::given(method("POST"))
            .and(path("/v1/statement"))
            .respond_with(Submit(Arc::clone(&coordinator)))
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path_regex(r"^/v1/statement/executing/[^/]+/\d+$"))
            .respond_with(Poll(coordinator))
            .mount(&server)
            .await;

        Self { server }
    }

    /// Returns a connection config pointing at this engine, credentials set.
    pub fn connection(&self) -> ConnectionConfig {
        let addr = self.server.address();
        ConnectionConfig {
            host: addr.ip().to_string(),
            port: addr.port(),
            user: Some("explorer".to_string()),
            password: Some("s3cret".to_string()),
            secure: false,
            timeout_secs: 5,
            ..Default::default()
        }
    }

    /// Returns every request received so far.
    pub async fn requests(&self) -> Vec<Request> {
        self.server.received_requests().await.unwrap_or_default()
    }

    /// Counts the received requests with the given method.
    pub async fn count(&self, verb: &str) -> usize {
        self.requests()
            .await
            .iter()
            .filter(|r| r.method.as_str() == verb)
            .count()
    }
}

/// Returns a header value of a received request.
pub fn header<'a>(request: &'a Request, name: &str) -> Option<&'a str> {
    request.headers.get(name).and_then(|v| v.to_str().ok())
}

fn table(name: &str) -> Option<(Vec<(&'static str, &'static str)>, Vec<Json>)> {
    match name {
        "astronauts" => Some((
            vec![("id", "bigint"), ("name", "varchar"), ("nationality", "varchar")],
            vec![
                json!([1, "Gagarin, Yuri", "U.S.S.R/Russia"]),
                json!([2, "Ride, Sally K.", "U.S."]),
                json!([3, "Hadfield, Chris", "Canada"]),
            ],
        )),
        "missions" => Some((
            vec![
                ("id", "bigint"),
                ("mission_title", "varchar"),
                ("year_of_mission", "integer"),
            ],
            vec![
                json!([1, "Vostok 1", 1961]),
                json!([2, "Apollo 11", 1969]),
            ],
        )),
        "events" => Some((
            vec![("seq", "bigint")],
            (0..EVENT_ROWS).map(|i| json!([i])).collect(),
        )),
        _ => None,
    }
}

/// Last quoted segment of `"catalog"."schema"."table"`.
fn referenced_table(sql: &str) -> String {
    sql.rsplit('.')
        .next()
        .unwrap_or_default()
        .split_whitespace()
        .next()
        .unwrap_or_default()
        .trim_matches('"')
        .to_string()
}

fn result_pages(id: &str, sql: &str) -> Vec<Json> {
    let finished = |columns: Vec<(&str, &str)>, rows: Vec<Json>| -> Vec<Json> {
        let columns: Vec<Json> = columns
            .iter()
            .map(|(name, ty)| json!({"name": name, "type": ty}))
            .collect();
        let chunks: Vec<Vec<Json>> = if rows.is_empty() {
            vec![Vec::new()]
        } else {
            rows.chunks(PAGE_SIZE).map(|c| c.to_vec()).collect()
        };
        chunks
            .into_iter()
            .map(|data| {
                json!({
                    "id": id,
                    "columns": columns,
                    "data": data,
                    "stats": {"state": "RUNNING"},
                })
            })
            .collect()
    };
    let failed = |name: &str, message: String| -> Vec<Json> {
        vec![json!({
            "id": id,
            "stats": {"state": "FAILED"},
            "error": {"message": message, "errorName": name, "errorCode": 1},
        })]
    };

    if sql == "SELECT 1" {
        return finished(vec![("_col0", "integer")], vec![json!([1])]);
    }

    let table_name = referenced_table(sql);
    let Some((columns, rows)) = table(&table_name) else {
        return failed(
            "TABLE_NOT_FOUND",
            format!("Table 'sample.demo.{table_name}' does not exist"),
        );
    };

    if sql.starts_with("DESCRIBE ") {
        let described = columns
            .iter()
            .map(|(name, ty)| json!([name, ty, "", ""]))
            .collect();
        return finished(
            vec![
                ("Column", "varchar"),
                ("Type", "varchar"),
                ("Extra", "varchar"),
                ("Comment", "varchar"),
            ],
            described,
        );
    }

    if sql.starts_with("SELECT count(*) FROM ") {
        return finished(vec![("_col0", "bigint")], vec![json!([rows.len()])]);
    }

    if sql.starts_with("SELECT * FROM ") {
        let limit = sql
            .split_once(" LIMIT ")
            .and_then(|(_, n)| n.trim().parse::<usize>().ok())
            .unwrap_or(usize::MAX);
        let rows = rows.into_iter().take(limit).collect();
        return finished(columns, rows);
    }

    failed("SYNTAX_ERROR", format!("cannot run: {sql}"))
}
