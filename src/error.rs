//! Error types for the NLSQL MCP Server.
//!
//! All failures inside the server are expressed as [`NlsqlError`]. The database
//! façade and the NL→SQL engine return these typed errors; the tool dispatcher
//! is the only place that turns them into user-visible text.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum NlsqlError {
    #[error("Not connected to a database. Call connect_sample_database or start the server with --database first.")]
    NotConnected,

    #[error("Connection failed: {message}")]
    Connection { message: String, suggestion: String },

    #[error("Query failed: {message}")]
    Query {
        message: String,
        /// e.g., "42P01" for undefined table
        sql_state: Option<String>,
    },

    #[error("Unknown tool: '{name}'")]
    UnknownTool { name: String },

    #[error("Invalid argument '{parameter}': {message}")]
    InvalidArgument { parameter: String, message: String },

    #[error("{service} error: {message}")]
    ExternalService { service: String, message: String },

    #[error("Timeout: {operation} exceeded {elapsed_secs}s")]
    Timeout {
        operation: String,
        elapsed_secs: u64,
    },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl NlsqlError {
    /// Create a connection error with a helpful suggestion.
    pub fn connection(message: impl Into<String>, suggestion: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
            suggestion: suggestion.into(),
        }
    }

    /// Create a query error with optional SQL state.
    pub fn query(message: impl Into<String>, sql_state: Option<String>) -> Self {
        Self::Query {
            message: message.into(),
            sql_state,
        }
    }

    pub fn unknown_tool(name: impl Into<String>) -> Self {
        Self::UnknownTool { name: name.into() }
    }

    /// Create an invalid argument error naming the offending parameter.
    pub fn invalid_argument(parameter: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            parameter: parameter.into(),
            message: message.into(),
        }
    }

    /// Create an error for a failed call to an external service (AI engine).
    pub fn external_service(service: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ExternalService {
            service: service.into(),
            message: message.into(),
        }
    }

    pub fn timeout(operation: impl Into<String>, elapsed_secs: u64) -> Self {
        Self::Timeout {
            operation: operation.into(),
            elapsed_secs,
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Get the suggestion for this error, if available.
    pub fn suggestion(&self) -> Option<&str> {
        match self {
            Self::Connection { suggestion, .. } => Some(suggestion),
            Self::Query { .. } => Some("Check the SQL syntax and referenced tables"),
            Self::Timeout { .. } => {
                Some("Consider increasing the timeout or simplifying the operation")
            }
            _ => None,
        }
    }

    /// Short machine-friendly category name, used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NotConnected => "not_connected",
            Self::Connection { .. } => "connection",
            Self::Query { .. } => "query",
            Self::UnknownTool { .. } => "unknown_tool",
            Self::InvalidArgument { .. } => "invalid_argument",
            Self::ExternalService { .. } => "external_service",
            Self::Timeout { .. } => "timeout",
            Self::Internal { .. } => "internal",
        }
    }

    /// Render the error with its SQL state and suggestion for display to a caller.
    pub fn to_user_message(&self) -> String {
        let mut message = format!("Error: {}", self);
        if let Self::Query {
            sql_state: Some(code),
            ..
        } = self
        {
            message.push_str(&format!(" (SQLSTATE: {})", code));
        }
        if let Some(suggestion) = self.suggestion() {
            message.push_str(&format!("\nSuggestion: {}", suggestion));
        }
        message
    }
}

/// Convert sqlx errors to NlsqlError.
impl From<sqlx::Error> for NlsqlError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Configuration(msg) => NlsqlError::connection(
                msg.to_string(),
                "Check the connection string format and credentials",
            ),
            sqlx::Error::Database(db_err) => {
                let code = db_err.code().map(|c| c.to_string());
                NlsqlError::query(db_err.message(), code)
            }
            sqlx::Error::RowNotFound => NlsqlError::query("No rows returned", None),
            sqlx::Error::PoolTimedOut => NlsqlError::timeout("connection pool acquire", 30),
            sqlx::Error::PoolClosed => NlsqlError::connection(
                "Connection is closed",
                "The database was disconnected; connect again",
            ),
            sqlx::Error::Io(io_err) => NlsqlError::connection(
                format!("I/O error: {}", io_err),
                "Check that the database file or server is reachable",
            ),
            sqlx::Error::Tls(tls_err) => NlsqlError::connection(
                format!("TLS error: {}", tls_err),
                "Verify TLS configuration and certificates",
            ),
            sqlx::Error::Protocol(msg) => NlsqlError::connection(
                format!("Protocol error: {}", msg),
                "Check database server compatibility",
            ),
            sqlx::Error::ColumnNotFound(col) => {
                NlsqlError::query(format!("Column not found: {}", col), None)
            }
            sqlx::Error::ColumnDecode { index, source } => {
                NlsqlError::query(format!("Failed to decode column {}: {}", index, source), None)
            }
            sqlx::Error::Decode(source) => {
                NlsqlError::query(format!("Decode error: {}", source), None)
            }
            sqlx::Error::WorkerCrashed => NlsqlError::internal("Database worker crashed"),
            _ => NlsqlError::internal(format!("Unknown database error: {}", err)),
        }
    }
}

/// Result type alias used throughout the crate.
pub type NlsqlResult<T> = Result<T, NlsqlError>;
