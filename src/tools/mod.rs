//! MCP tools.
//!
//! - `registry`: the six tool descriptors and argument validation
//! - `dispatcher`: runs validated calls against the database and the NL→SQL engine
//! - `format`: text rendering of query results

pub mod dispatcher;
pub mod format;
pub mod registry;

pub use dispatcher::{InvocationResult, ToolDispatcher, ToolOutput};
pub use format::OutputFormat;
pub use registry::{ParamDefault, ParamKind, ParamSpec, ToolCall, ToolDescriptor};
