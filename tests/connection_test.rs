//! Integration tests for the connection façade against a temporary SQLite file.
//!
//! Tests verify that:
//! - connect/disconnect move between Connected and Disconnected
//! - a second connect replaces (and closes) the first connection
//! - a failed connect leaves the current connection untouched
//! - sample and execute honor their limits and report errors by kind

mod common;

use common::{manager_with_sample, team_database, team_database_named};
use nlsql_mcp_server::db::ConnectionManager;
use nlsql_mcp_server::error::NlsqlError;
use nlsql_mcp_server::models::{ConnectionStatus, DatabaseType};
use nlsql_mcp_server::tools::format::{OutputFormat, format_result};

#[tokio::test]
async fn test_connect_then_disconnect() {
    let db = team_database().await;
    let manager = ConnectionManager::default();

    let info = manager.connect("sqlite", db.location()).await.unwrap();
    assert_eq!(info.database_type, DatabaseType::SQLite);
    assert!(info.server_version.is_some());
    assert!(manager.status().await.is_connected());
    assert_eq!(manager.list_tables().await.unwrap(), vec!["team"]);

    assert!(manager.disconnect().await);
    assert!(matches!(manager.status().await, ConnectionStatus::Disconnected));
    assert!(matches!(
        manager.list_tables().await,
        Err(NlsqlError::NotConnected)
    ));

    // Idempotent
    assert!(!manager.disconnect().await);
}

#[tokio::test]
async fn test_second_connect_closes_first_pool() {
    let first = team_database_named("first.sqlite").await;
    let second = team_database_named("second.sqlite").await;
    let manager = ConnectionManager::default();

    let first_info = manager.connect("sqlite", first.location()).await.unwrap();
    let first_pool = manager.pool().await.unwrap();

    let second_info = manager.connect("SQLite3", second.location()).await.unwrap();
    let second_pool = manager.pool().await.unwrap();

    assert!(first_pool.is_closed());
    assert!(!second_pool.is_closed());
    assert_ne!(first_info.connection_id, second_info.connection_id);
    assert_eq!(
        manager.status().await.connection_id(),
        Some(second_info.connection_id)
    );
}

#[tokio::test]
async fn test_failed_connect_keeps_current_connection() {
    let db = team_database().await;
    let manager = ConnectionManager::default();
    let info = manager.connect("sqlite", db.location()).await.unwrap();

    let missing = db.path.with_file_name("missing.sqlite");
    let err = manager
        .connect("sqlite", missing.to_str().unwrap())
        .await
        .unwrap_err();
    assert!(matches!(err, NlsqlError::Connection { .. }));
    assert!(!missing.exists());

    let err = manager.connect("oracle", "db").await.unwrap_err();
    assert!(matches!(err, NlsqlError::Connection { .. }));

    assert_eq!(manager.status().await.connection_id(), Some(info.connection_id));
    assert!(!manager.pool().await.unwrap().is_closed());
}

#[tokio::test]
async fn test_connect_url_and_sample() {
    let db = team_database().await;

    let manager = ConnectionManager::default();
    let info = manager
        .connect_url(&format!("sqlite:{}", db.location()))
        .await
        .unwrap();
    assert_eq!(info.database_type, DatabaseType::SQLite);

    let manager = manager_with_sample(&db.path);
    let info = manager.connect_sample().await.unwrap();
    assert_eq!(info.location, db.location());
}

#[tokio::test]
async fn test_sample_limits() {
    let db = team_database().await;
    let manager = ConnectionManager::default();
    manager.connect("sqlite", db.location()).await.unwrap();

    let result = manager.sample("team", 1).await.unwrap();
    assert!(result.row_count() <= 1);
    assert_eq!(result.row_count(), 1);

    let result = manager.sample("team", 50).await.unwrap();
    assert_eq!(result.row_count(), 3);

    let err = manager.sample("no_such_table", 1).await.unwrap_err();
    assert!(matches!(err, NlsqlError::Query { .. }));

    let err = manager.sample("team", 0).await.unwrap_err();
    assert!(matches!(err, NlsqlError::InvalidArgument { .. }));
}

#[tokio::test]
async fn test_execute_count_query() {
    let db = team_database().await;
    let manager = ConnectionManager::default();
    manager.connect("sqlite", db.location()).await.unwrap();

    let result = manager
        .execute("SELECT COUNT(*) as team_count FROM team", None)
        .await
        .unwrap();
    assert_eq!(result.row_count(), 1);
    assert_eq!(result.columns[0].name, "team_count");
    let count = result.scalar().and_then(|v| v.as_i64()).unwrap();
    assert!(count >= 0);
    assert_eq!(count, 3);
}

#[tokio::test]
async fn test_execute_truncates_and_writes() {
    let db = team_database().await;
    let manager = ConnectionManager::default();
    manager.connect("sqlite", db.location()).await.unwrap();

    let result = manager
        .execute("SELECT * FROM team ORDER BY id", Some(2))
        .await
        .unwrap();
    assert_eq!(result.row_count(), 2);
    assert!(result.truncated);
    assert_eq!(result.rows[0]["full_name"], "Atlanta Hawks");

    let result = manager
        .execute(
            "INSERT INTO team (id, full_name) VALUES (4, 'Denver Nuggets')",
            None,
        )
        .await
        .unwrap();
    assert_eq!(result.rows_affected, Some(1));
    assert_eq!(manager.count_rows("team").await.unwrap(), 4);

    let err = manager
        .execute("SELECT * FROM missing_table", None)
        .await
        .unwrap_err();
    assert!(matches!(err, NlsqlError::Query { .. }));
}

#[tokio::test]
async fn test_execute_keeps_repeated_column_names_apart() {
    let db = team_database().await;
    let manager = ConnectionManager::default();
    manager.connect("sqlite", db.location()).await.unwrap();

    let result = manager
        .execute(
            "SELECT a.id, b.id FROM team a JOIN team b ON b.id = a.id + 1 ORDER BY a.id",
            None,
        )
        .await
        .unwrap();
    let names: Vec<&str> = result.columns.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["id", "id_2"]);
    assert_eq!(result.row_count(), 2);
    assert_eq!(result.rows[0]["id"], 1);
    assert_eq!(result.rows[0]["id_2"], 2);
    assert_eq!(result.rows[1]["id"], 2);
    assert_eq!(result.rows[1]["id_2"], 3);

    let table = format_result(&result, OutputFormat::Table);
    assert!(table.contains("|  1 |    2 |"), "{}", table);
    assert!(table.contains("|  2 |    3 |"), "{}", table);

    let markdown = format_result(&result, OutputFormat::Markdown);
    assert!(markdown.contains("| 1 | 2 |"), "{}", markdown);
}

#[tokio::test]
async fn test_execute_returning_yields_rows() {
    let db = team_database().await;
    let manager = ConnectionManager::default();
    manager.connect("sqlite", db.location()).await.unwrap();

    let result = manager
        .execute(
            "INSERT INTO team (id, full_name) VALUES (9, 'X') RETURNING id, full_name",
            None,
        )
        .await
        .unwrap();
    assert_eq!(result.rows_affected, None);
    assert_eq!(result.row_count(), 1);
    assert_eq!(result.rows[0]["id"], 9);
    assert_eq!(result.rows[0]["full_name"], "X");
    assert_eq!(manager.count_rows("team").await.unwrap(), 4);

    let result = manager
        .execute("DELETE FROM team WHERE id >= 3 RETURNING id", None)
        .await
        .unwrap();
    assert_eq!(result.row_count(), 2);
    assert_eq!(manager.count_rows("team").await.unwrap(), 2);
}

#[tokio::test]
async fn test_snapshot_and_file_size() {
    let db = team_database().await;
    let manager = ConnectionManager::default();
    manager.connect("sqlite", db.location()).await.unwrap();

    let columns = manager.describe_table("team").await.unwrap();
    assert_eq!(columns.len(), 3);
    assert!(columns[0].is_primary_key);

    let snapshot = manager.snapshot(2).await.unwrap();
    assert_eq!(snapshot.table_names(), vec!["team"]);
    assert_eq!(snapshot.tables[0].row_count, 3);
    assert_eq!(snapshot.tables[0].sample_rows.len(), 2);
    assert!(snapshot.describe().contains("Table: team (3 rows)"));

    let size = manager.database_file_size().await.unwrap();
    assert!(size.unwrap() > 0);
}
