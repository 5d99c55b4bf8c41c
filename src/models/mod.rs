//! Data models for the NLSQL MCP Server.
//!
//! This module re-exports all model types used throughout the application.

pub mod connection;
pub mod query;
pub mod schema;

// Re-export commonly used types
pub use connection::{
    ConnectionInfo, ConnectionStatus, ConnectionTarget, DatabaseType, mask_password,
};
pub use query::{
    ColumnMetadata, DEFAULT_ROW_LIMIT, MAX_ROW_LIMIT, QueryResult, effective_limit,
};
pub use schema::{ColumnDefinition, SchemaSnapshot, TableSnapshot};
