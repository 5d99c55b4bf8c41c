//! Query execution engine.
//!
//! Row-returning statements are streamed and cut off at `limit + 1` rows so
//! the executor can report truncation without fetching the whole result.
//! Everything else is executed and reports the affected row count. Both paths
//! are bounded by the configured query timeout.
//!
//! Database-specific code lives in the `mysql`, `postgres` and `sqlite`
//! submodules, kept structurally parallel.

use crate::db::pool::DbPool;
use crate::db::types::RowToJson;
use crate::error::{NlsqlError, NlsqlResult};
use crate::models::QueryResult;
use futures_util::StreamExt;
use std::time::{Duration, Instant};
use tokio::time::timeout;
use tracing::{debug, warn};

/// Default query timeout in seconds.
pub const DEFAULT_QUERY_TIMEOUT_SECS: u64 = 30;

/// Executes raw SQL against a [`DbPool`].
#[derive(Debug, Clone)]
pub struct QueryExecutor {
    query_timeout: Duration,
}

impl QueryExecutor {
    pub fn new(timeout_secs: u64) -> Self {
        Self {
            query_timeout: Duration::from_secs(timeout_secs),
        }
    }

    pub fn query_timeout(&self) -> Duration {
        self.query_timeout
    }

    /// Fetch at most `row_limit` rows; `truncated` is set when more exist.
    pub async fn fetch(
        &self,
        pool: &DbPool,
        sql: &str,
        row_limit: u32,
    ) -> NlsqlResult<QueryResult> {
        let start = Instant::now();
        let row_limit = row_limit.max(1);

        debug!(
            sql = %sql,
            limit = row_limit,
            timeout_secs = self.query_timeout.as_secs(),
            "Executing query"
        );

        match pool {
            DbPool::MySql(p) => {
                let rows = mysql::fetch_rows(p, sql, row_limit, self.query_timeout).await?;
                Ok(process_rows(rows, row_limit, start))
            }
            DbPool::Postgres(p) => {
                let rows = postgres::fetch_rows(p, sql, row_limit, self.query_timeout).await?;
                Ok(process_rows(rows, row_limit, start))
            }
            DbPool::SQLite(p) => {
                let rows = sqlite::fetch_rows(p, sql, row_limit, self.query_timeout).await?;
                Ok(process_rows(rows, row_limit, start))
            }
        }
    }

    /// Execute a statement that does not return rows and report affected rows.
    pub async fn execute(&self, pool: &DbPool, sql: &str) -> NlsqlResult<QueryResult> {
        let start = Instant::now();

        debug!(
            sql = %sql,
            timeout_secs = self.query_timeout.as_secs(),
            "Executing statement"
        );

        let rows_affected = match pool {
            DbPool::MySql(p) => mysql::execute_write(p, sql, self.query_timeout).await?,
            DbPool::Postgres(p) => postgres::execute_write(p, sql, self.query_timeout).await?,
            DbPool::SQLite(p) => sqlite::execute_write(p, sql, self.query_timeout).await?,
        };

        Ok(QueryResult::write_result(
            rows_affected,
            start.elapsed().as_millis() as u64,
        ))
    }
}

impl Default for QueryExecutor {
    fn default() -> Self {
        Self::new(DEFAULT_QUERY_TIMEOUT_SECS)
    }
}

fn process_rows<R: RowToJson>(rows: Vec<R>, row_limit: u32, start: Instant) -> QueryResult {
    let execution_time_ms = start.elapsed().as_millis() as u64;

    let Some(first) = rows.first() else {
        return QueryResult {
            columns: Vec::new(),
            rows: Vec::new(),
            rows_affected: None,
            truncated: false,
            execution_time_ms,
        };
    };

    let columns = first.column_metadata();
    let total_rows = rows.len();
    let truncated = total_rows > row_limit as usize;

    let json_rows = rows
        .iter()
        .take(row_limit as usize)
        .map(|r| r.to_json_map())
        .collect();

    if truncated {
        warn!(limit = row_limit, "Query result truncated");
    }

    QueryResult {
        columns,
        rows: json_rows,
        rows_affected: None,
        truncated,
        execution_time_ms,
    }
}

fn collect_rows<R>(results: Vec<Result<R, sqlx::Error>>) -> NlsqlResult<Vec<R>> {
    results
        .into_iter()
        .map(|r| r.map_err(NlsqlError::from))
        .collect()
}

fn timeout_error(operation: &str, timeout: Duration) -> NlsqlError {
    NlsqlError::timeout(operation, timeout.as_secs())
}

// Raw SQL goes through `Executor::fetch`/`execute` (no prepared statement),
// so statements like PRAGMA or CREATE PROCEDURE work unchanged.

mod mysql {
    use super::*;
    use sqlx::Executor;
    use sqlx::MySqlPool;
    use sqlx::mysql::MySqlRow;

    pub async fn fetch_rows(
        pool: &MySqlPool,
        sql: &str,
        row_limit: u32,
        query_timeout: Duration,
    ) -> NlsqlResult<Vec<MySqlRow>> {
        let fetch_limit = row_limit as usize + 1;
        let rows_future = pool.fetch(sql).take(fetch_limit).collect::<Vec<_>>();

        match timeout(query_timeout, rows_future).await {
            Ok(results) => collect_rows(results),
            Err(_) => Err(timeout_error("query execution", query_timeout)),
        }
    }

    pub async fn execute_write(
        pool: &MySqlPool,
        sql: &str,
        query_timeout: Duration,
    ) -> NlsqlResult<u64> {
        match timeout(query_timeout, pool.execute(sql)).await {
            Ok(Ok(r)) => Ok(r.rows_affected()),
            Ok(Err(e)) => Err(NlsqlError::from(e)),
            Err(_) => Err(timeout_error("statement execution", query_timeout)),
        }
    }
}

mod postgres {
    use super::*;
    use sqlx::Executor;
    use sqlx::PgPool;
    use sqlx::postgres::PgRow;

    pub async fn fetch_rows(
        pool: &PgPool,
        sql: &str,
        row_limit: u32,
        query_timeout: Duration,
    ) -> NlsqlResult<Vec<PgRow>> {
        let fetch_limit = row_limit as usize + 1;
        let rows_future = pool.fetch(sql).take(fetch_limit).collect::<Vec<_>>();

        match timeout(query_timeout, rows_future).await {
            Ok(results) => collect_rows(results),
            Err(_) => Err(timeout_error("query execution", query_timeout)),
        }
    }

    pub async fn execute_write(
        pool: &PgPool,
        sql: &str,
        query_timeout: Duration,
    ) -> NlsqlResult<u64> {
        match timeout(query_timeout, pool.execute(sql)).await {
            Ok(Ok(r)) => Ok(r.rows_affected()),
            Ok(Err(e)) => Err(NlsqlError::from(e)),
            Err(_) => Err(timeout_error("statement execution", query_timeout)),
        }
    }
}

mod sqlite {
    use super::*;
    use sqlx::Executor;
    use sqlx::SqlitePool;
    use sqlx::sqlite::SqliteRow;

    pub async fn fetch_rows(
        pool: &SqlitePool,
        sql: &str,
        row_limit: u32,
        query_timeout: Duration,
    ) -> NlsqlResult<Vec<SqliteRow>> {
        let fetch_limit = row_limit as usize + 1;
        let rows_future = pool.fetch(sql).take(fetch_limit).collect::<Vec<_>>();

        match timeout(query_timeout, rows_future).await {
            Ok(results) => collect_rows(results),
            Err(_) => Err(timeout_error("query execution", query_timeout)),
        }
    }

    pub async fn execute_write(
        pool: &SqlitePool,
        sql: &str,
        query_timeout: Duration,
    ) -> NlsqlResult<u64> {
        match timeout(query_timeout, pool.execute(sql)).await {
            Ok(Ok(r)) => Ok(r.rows_affected()),
            Ok(Err(e)) => Err(NlsqlError::from(e)),
            Err(_) => Err(timeout_error("statement execution", query_timeout)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_executor_defaults() {
        let executor = QueryExecutor::default();
        assert_eq!(
            executor.query_timeout(),
            Duration::from_secs(DEFAULT_QUERY_TIMEOUT_SECS)
        );
    }

    #[test]
    fn test_executor_custom_timeout() {
        let executor = QueryExecutor::new(5);
        assert_eq!(executor.query_timeout(), Duration::from_secs(5));
    }

    #[test]
    fn test_timeout_error_reports_seconds() {
        let err = timeout_error("query execution", Duration::from_secs(7));
        assert!(matches!(
            err,
            NlsqlError::Timeout {
                elapsed_secs: 7,
                ..
            }
        ));
    }
}
