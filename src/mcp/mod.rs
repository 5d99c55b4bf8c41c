//! MCP server integration module.
//!
//! Bridges the MCP protocol to the tool dispatcher using the rmcp framework.

pub mod service;

pub use service::NlsqlService;
