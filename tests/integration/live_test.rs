//! Live cluster tests.
//!
//! Skipped unless TRINO_TEST_HOST is set. Credentials come from USERNAME
//! and PASSWORD as in normal use.

use trino_eda::config::ConnectionConfig;
use trino_eda::session::{bootstrap, DEFAULT_TABLES};

/// Helper to build a connection to the test cluster from the environment.
fn get_test_connection() -> Option<ConnectionConfig> {
    let host = std::env::var("TRINO_TEST_HOST").ok()?;
    let mut conn = ConnectionConfig {
        host,
        ..Default::default()
    };
    conn.apply_env_defaults();
    Some(conn)
}

#[tokio::test]
async fn test_live_bootstrap() {
    let Some(conn) = get_test_connection() else {
        eprintln!("Skipping test: TRINO_TEST_HOST not set");
        return;
    };

    let exploration = bootstrap(&conn, &DEFAULT_TABLES).await.unwrap();
    assert_eq!(exploration.tables.len(), 2);

    for table in &exploration.tables {
        assert!(!table.columns.is_empty());
        let preview = exploration.session.head(table, 5).await.unwrap();
        assert!(preview.row_count <= 5);
    }

    exploration.session.close().await.unwrap();
}
