//! Session bootstrap tests.
//!
//! Covers the whole connect-then-bind path against the fake engine.

use super::fake_trino::FakeTrino;
use trino_eda::config::ConnectionConfig;
use trino_eda::error::EdaError;
use trino_eda::session::{bootstrap, Session, DEFAULT_TABLES};

#[tokio::test]
async fn test_bootstrap_binds_both_tables() {
    let engine = FakeTrino::start().await;
    let conn = engine.connection();

    let exploration = bootstrap(&conn, &DEFAULT_TABLES).await.unwrap();

    let names: Vec<&str> = exploration.tables.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, vec!["astronauts", "missions"]);

    let astronauts = exploration.expect_table("astronauts").unwrap();
    assert_eq!(astronauts.columns.len(), 3);
    assert_eq!(astronauts.column("name").unwrap().data_type, "varchar");

    let missions = exploration.expect_table("missions").unwrap();
    let preview = exploration.session.head(missions, 1).await.unwrap();
    assert_eq!(preview.row_count, 1);
    assert_eq!(exploration.session.count(missions).await.unwrap(), 2);

    exploration.session.close().await.unwrap();
}

#[tokio::test]
async fn test_missing_password_fails_before_any_request() {
    let engine = FakeTrino::start().await;
    let conn = ConnectionConfig {
        password: None,
        ..engine.connection()
    };

    let err = bootstrap(&conn, &DEFAULT_TABLES).await.err().unwrap();
    assert!(matches!(err, EdaError::Config(_)));
    assert!(engine.requests().await.is_empty());
}

#[tokio::test]
async fn test_missing_user_from_environment_fails() {
    let engine = FakeTrino::start().await;
    let mut conn = ConnectionConfig {
        user: None,
        password: None,
        ..engine.connection()
    };
    conn.apply_env_with(|key| (key == "PASSWORD").then(|| "s3cret".to_string()));

    let err = bootstrap(&conn, &DEFAULT_TABLES).await.err().unwrap();
    assert!(err.to_string().contains("USERNAME"));
    assert!(engine.requests().await.is_empty());
}

#[tokio::test]
async fn test_missing_table_aborts_bootstrap() {
    let engine = FakeTrino::start().await;
    let conn = engine.connection();

    let err = bootstrap(&conn, &["astronauts", "rockets"]).await.err().unwrap();
    assert!(matches!(err, EdaError::Query(_)));
}

#[tokio::test]
async fn test_sessions_are_independent() {
    let engine = FakeTrino::start().await;
    let conn = engine.connection();

    let first = Session::open(&conn).await.unwrap();
    let second = Session::open(&conn).await.unwrap();

    first.close().await.unwrap();

    let result = second.sql("SELECT 1").await.unwrap();
    assert_eq!(result.row_count, 1);
    second.close().await.unwrap();

    assert_eq!(engine.count("POST").await, 3);
}
