//! Schema introspection module.
//!
//! SQL queries are organized in the `queries` submodule with constants for each
//! database type. Database-specific implementations are in their respective
//! submodules (postgres, mysql, sqlite), each providing the same interface.

use crate::db::pool::DbPool;
use crate::error::{NlsqlError, NlsqlResult};
use crate::models::{ColumnDefinition, DatabaseType};
use tracing::debug;

/// Schema inspector for database introspection.
pub struct SchemaInspector;

impl SchemaInspector {
    /// List user tables ordered by name. SQLite internal `sqlite_*` tables are excluded.
    pub async fn list_tables(pool: &DbPool) -> NlsqlResult<Vec<String>> {
        match pool {
            DbPool::Postgres(p) => postgres::list_tables(p).await,
            DbPool::MySql(p) => mysql::list_tables(p).await,
            DbPool::SQLite(p) => sqlite::list_tables(p).await,
        }
    }

    /// Describe a table's columns. Unknown tables are a query error.
    pub async fn describe_table(pool: &DbPool, table: &str) -> NlsqlResult<Vec<ColumnDefinition>> {
        let columns = match pool {
            DbPool::Postgres(p) => postgres::describe_table(p, table).await?,
            DbPool::MySql(p) => mysql::describe_table(p, table).await?,
            DbPool::SQLite(p) => sqlite::describe_table(p, table).await?,
        };
        if columns.is_empty() {
            return Err(table_not_found(table));
        }
        Ok(columns)
    }

    /// Exact row count for a table.
    pub async fn count_rows(pool: &DbPool, table: &str) -> NlsqlResult<u64> {
        let sql = format!(
            "SELECT COUNT(*) AS row_count FROM {}",
            quote_identifier(pool.db_type(), table)
        );
        let count = match pool {
            DbPool::Postgres(p) => sqlx::query_scalar::<_, i64>(&sql).fetch_one(p).await?,
            DbPool::MySql(p) => sqlx::query_scalar::<_, i64>(&sql).fetch_one(p).await?,
            DbPool::SQLite(p) => sqlx::query_scalar::<_, i64>(&sql).fetch_one(p).await?,
        };
        Ok(count.max(0) as u64)
    }
}

fn table_not_found(table: &str) -> NlsqlError {
    NlsqlError::query(format!("Table '{}' not found", table), None)
}

/// Quote an identifier for the given dialect, doubling embedded quote characters.
pub fn quote_identifier(db_type: DatabaseType, name: &str) -> String {
    match db_type {
        DatabaseType::MySQL => format!("`{}`", name.replace('`', "``")),
        DatabaseType::PostgreSQL | DatabaseType::SQLite => {
            format!("\"{}\"", name.replace('"', "\"\""))
        }
    }
}

/// `SELECT * ... LIMIT n` for sampling a table.
pub fn sample_query(db_type: DatabaseType, table: &str, limit: u32) -> String {
    format!(
        "SELECT * FROM {} LIMIT {}",
        quote_identifier(db_type, table),
        limit
    )
}

mod queries {
    pub mod postgres {
        pub const LIST_TABLES: &str = r#"
            SELECT table_name::text AS table_name
            FROM information_schema.tables
            WHERE table_schema = current_schema()
            AND table_type = 'BASE TABLE'
            ORDER BY table_name
            "#;

        pub const DESCRIBE_COLUMNS: &str = r#"
            SELECT
                c.column_name::text AS column_name,
                c.data_type::text AS column_type,
                c.is_nullable::text AS is_nullable,
                c.column_default::text AS column_default,
                EXISTS (
                    SELECT 1
                    FROM information_schema.table_constraints tc
                    JOIN information_schema.key_column_usage kcu
                        ON tc.constraint_name = kcu.constraint_name
                        AND tc.table_schema = kcu.table_schema
                    WHERE tc.table_name = c.table_name
                    AND tc.table_schema = c.table_schema
                    AND tc.constraint_type = 'PRIMARY KEY'
                    AND kcu.column_name = c.column_name
                ) AS is_primary_key
            FROM information_schema.columns c
            WHERE c.table_name = $1 AND c.table_schema = current_schema()
            ORDER BY c.ordinal_position
            "#;
    }

    pub mod mysql {
        pub const LIST_TABLES: &str = r#"
            SELECT CONVERT(TABLE_NAME USING utf8) AS TABLE_NAME
            FROM information_schema.tables
            WHERE TABLE_SCHEMA = DATABASE()
            AND TABLE_TYPE = 'BASE TABLE'
            ORDER BY TABLE_NAME
            "#;

        pub const DESCRIBE_COLUMNS: &str = r#"
            SELECT
                CONVERT(COLUMN_NAME USING utf8) AS COLUMN_NAME,
                CONVERT(COLUMN_TYPE USING utf8) AS COLUMN_TYPE,
                CONVERT(IS_NULLABLE USING utf8) AS IS_NULLABLE,
                CONVERT(COLUMN_DEFAULT USING utf8) AS COLUMN_DEFAULT,
                CONVERT(COLUMN_KEY USING utf8) AS COLUMN_KEY
            FROM information_schema.columns
            WHERE TABLE_NAME = ? AND TABLE_SCHEMA = DATABASE()
            ORDER BY ORDINAL_POSITION
            "#;
    }

    pub mod sqlite {
        pub const LIST_TABLES: &str = r#"
            SELECT name FROM sqlite_master
            WHERE type = 'table'
            AND name NOT LIKE 'sqlite_%'
            ORDER BY name
            "#;

        pub const DESCRIBE_COLUMNS: &str = r#"
            SELECT name, type, "notnull", dflt_value, pk
            FROM pragma_table_info(?)
            ORDER BY cid
            "#;
    }
}

mod postgres {
    use super::*;
    use sqlx::{PgPool, Row};

    pub async fn list_tables(pool: &PgPool) -> NlsqlResult<Vec<String>> {
        let rows = sqlx::query(queries::postgres::LIST_TABLES)
            .fetch_all(pool)
            .await?;
        let tables: Vec<String> = rows.iter().map(|row| row.get("table_name")).collect();
        debug!(count = tables.len(), "Listed PostgreSQL tables");
        Ok(tables)
    }

    pub async fn describe_table(pool: &PgPool, table: &str) -> NlsqlResult<Vec<ColumnDefinition>> {
        let rows = sqlx::query(queries::postgres::DESCRIBE_COLUMNS)
            .bind(table)
            .fetch_all(pool)
            .await?;

        Ok(rows
            .iter()
            .map(|row| {
                let name: String = row.get("column_name");
                let column_type: String = row.get("column_type");
                let nullable: String = row.get("is_nullable");
                let default_value: Option<String> = row.try_get("column_default").ok().flatten();
                let is_pk: bool = row.get("is_primary_key");

                let col = ColumnDefinition::new(name, column_type, nullable == "YES")
                    .with_primary_key(is_pk);
                match default_value {
                    Some(def) => col.with_default(def),
                    None => col,
                }
            })
            .collect())
    }
}

mod mysql {
    use super::*;
    use sqlx::{MySqlPool, Row};

    pub async fn list_tables(pool: &MySqlPool) -> NlsqlResult<Vec<String>> {
        let rows = sqlx::query(queries::mysql::LIST_TABLES)
            .fetch_all(pool)
            .await?;
        let tables: Vec<String> = rows.iter().map(|row| row.get("TABLE_NAME")).collect();
        debug!(count = tables.len(), "Listed MySQL tables");
        Ok(tables)
    }

    pub async fn describe_table(
        pool: &MySqlPool,
        table: &str,
    ) -> NlsqlResult<Vec<ColumnDefinition>> {
        let rows = sqlx::query(queries::mysql::DESCRIBE_COLUMNS)
            .bind(table)
            .fetch_all(pool)
            .await?;

        Ok(rows
            .iter()
            .map(|row| {
                let name: String = row.get("COLUMN_NAME");
                let column_type: String = row.get("COLUMN_TYPE");
                let nullable: String = row.get("IS_NULLABLE");
                let default_value: Option<String> = row.try_get("COLUMN_DEFAULT").ok().flatten();
                let key: Option<String> = row.try_get("COLUMN_KEY").ok().flatten();

                let col = ColumnDefinition::new(name, column_type, nullable == "YES")
                    .with_primary_key(key.as_deref() == Some("PRI"));
                match default_value {
                    Some(def) => col.with_default(def),
                    None => col,
                }
            })
            .collect())
    }
}

mod sqlite {
    use super::*;
    use sqlx::{Row, SqlitePool};

    pub async fn list_tables(pool: &SqlitePool) -> NlsqlResult<Vec<String>> {
        let rows = sqlx::query(queries::sqlite::LIST_TABLES)
            .fetch_all(pool)
            .await?;
        let tables: Vec<String> = rows.iter().map(|row| row.get("name")).collect();
        debug!(count = tables.len(), "Listed SQLite tables");
        Ok(tables)
    }

    pub async fn describe_table(
        pool: &SqlitePool,
        table: &str,
    ) -> NlsqlResult<Vec<ColumnDefinition>> {
        let rows = sqlx::query(queries::sqlite::DESCRIBE_COLUMNS)
            .bind(table)
            .fetch_all(pool)
            .await?;

        Ok(rows
            .iter()
            .map(|row| {
                let name: String = row.get("name");
                // Untyped columns report an empty declared type
                let data_type: String = row.try_get("type").unwrap_or_default();
                let notnull: i64 = row.try_get("notnull").unwrap_or(0);
                let default_value: Option<String> = row.try_get("dflt_value").ok().flatten();
                let pk: i64 = row.try_get("pk").unwrap_or(0);

                let col = ColumnDefinition::new(name, data_type, notnull == 0)
                    .with_primary_key(pk > 0);
                match default_value {
                    Some(def) => col.with_default(def),
                    None => col,
                }
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_identifier_per_dialect() {
        assert_eq!(quote_identifier(DatabaseType::SQLite, "team"), "\"team\"");
        assert_eq!(
            quote_identifier(DatabaseType::PostgreSQL, "odd\"name"),
            "\"odd\"\"name\""
        );
        assert_eq!(quote_identifier(DatabaseType::MySQL, "order"), "`order`");
        assert_eq!(quote_identifier(DatabaseType::MySQL, "a`b"), "`a``b`");
    }

    #[test]
    fn test_sample_query() {
        assert_eq!(
            sample_query(DatabaseType::SQLite, "game", 3),
            "SELECT * FROM \"game\" LIMIT 3"
        );
    }

    #[test]
    fn test_table_not_found_is_query_error() {
        assert!(matches!(
            table_not_found("players"),
            NlsqlError::Query { .. }
        ));
    }
}
