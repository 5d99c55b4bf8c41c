//! NLSQL MCP Server Library
//!
//! MCP (Model Context Protocol) tools that let an AI assistant ask questions
//! about a SQL database (SQLite, PostgreSQL, MySQL) in natural language.

pub mod ai;
pub mod config;
pub mod db;
pub mod error;
pub mod mcp;
pub mod models;
pub mod tools;
pub mod transport;

pub use config::Config;
pub use error::NlsqlError;
pub use mcp::NlsqlService;
pub use tools::ToolDispatcher;
