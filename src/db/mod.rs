//! Database abstraction layer.
//!
//! This module provides database access functionality:
//! - The single-connection façade and its pools
//! - Query execution
//! - Statement classification
//! - Schema introspection
//! - Type mappings

pub mod executor;
pub mod pool;
pub mod schema;
pub mod statement;
pub mod types;

pub use executor::QueryExecutor;
pub use pool::{ConnectionManager, ConnectionSettings, DbPool};
pub use schema::SchemaInspector;
pub use statement::StatementKind;
