//! Tool dispatcher.
//!
//! Looks tools up in the fixed registry, validates arguments into a
//! [`ToolCall`], runs it against the connection façade or the NL→SQL engine,
//! and renders the outcome as text. [`ToolDispatcher::dispatch`] returns typed
//! errors; [`ToolDispatcher::invoke`] is the only place they become text.

use std::fmt::Write as _;
use std::sync::Arc;
use std::time::Instant;

use serde_json::Value as JsonValue;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::ai::SqlEngine;
use crate::db::ConnectionManager;
use crate::error::{NlsqlError, NlsqlResult};
use crate::models::{ConnectionInfo, ConnectionStatus};
use crate::tools::format::{OutputFormat, format_result};
use crate::tools::registry::{self, DEFAULT_SAMPLE_ROWS, ToolCall, ToolDescriptor};

/// Successful tool output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolOutput {
    pub text: String,
}

impl From<String> for ToolOutput {
    fn from(text: String) -> Self {
        Self { text }
    }
}

/// What the caller of a tool sees: never-empty text blocks and an error flag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvocationResult {
    pub blocks: Vec<String>,
    pub is_error: bool,
}

impl InvocationResult {
    pub fn success(text: impl Into<String>) -> Self {
        Self {
            blocks: vec![text.into()],
            is_error: false,
        }
    }

    pub fn error(error: &NlsqlError) -> Self {
        Self {
            blocks: vec![error.to_user_message()],
            is_error: true,
        }
    }

    pub fn text(&self) -> String {
        self.blocks.join("\n")
    }
}

impl From<NlsqlResult<ToolOutput>> for InvocationResult {
    fn from(result: NlsqlResult<ToolOutput>) -> Self {
        match result {
            Ok(output) => Self::success(output.text),
            Err(e) => Self::error(&e),
        }
    }
}

/// Last AI schema summary and the connection it describes.
#[derive(Debug, Clone)]
struct CachedSummary {
    connection_id: Uuid,
    summary: String,
}

pub struct ToolDispatcher {
    manager: Arc<ConnectionManager>,
    engine: Arc<dyn SqlEngine>,
    schema_cache: Mutex<Option<CachedSummary>>,
}

impl ToolDispatcher {
    pub fn new(manager: Arc<ConnectionManager>, engine: Arc<dyn SqlEngine>) -> Self {
        Self {
            manager,
            engine,
            schema_cache: Mutex::new(None),
        }
    }

    pub fn manager(&self) -> &Arc<ConnectionManager> {
        &self.manager
    }

    pub fn list_tools(&self) -> &'static [ToolDescriptor] {
        registry::tools()
    }

    /// Validate and run a tool by name.
    pub async fn dispatch(&self, name: &str, args: &JsonValue) -> NlsqlResult<ToolOutput> {
        let call = ToolCall::parse(name, args).inspect_err(|e| {
            warn!(tool = %name, kind = e.kind(), error = %e, "Rejected tool call");
        })?;
        self.run(call).await
    }

    /// Like [`dispatch`](Self::dispatch), with every failure rendered as an error block.
    pub async fn invoke(&self, name: &str, args: &JsonValue) -> InvocationResult {
        self.dispatch(name, args).await.into()
    }

    /// Run an already-validated call.
    pub async fn run(&self, call: ToolCall) -> NlsqlResult<ToolOutput> {
        let tool = call.tool_name();
        let start = Instant::now();
        debug!(tool, ?call, "Running tool");

        let result = match call {
            ToolCall::GetConnectionStatus => self.connection_status().await,
            ToolCall::ConnectSampleDatabase => self.connect_sample_database().await,
            ToolCall::GetDatabaseInfo => self.database_info().await,
            ToolCall::AnalyzeSchema { sample_rows } => self.analyze_schema(sample_rows).await,
            ToolCall::NaturalLanguageToSql {
                question,
                skip_schema,
                execute,
            } => {
                self.natural_language_to_sql(&question, skip_schema, execute)
                    .await
            }
            ToolCall::ExecuteSqlQuery {
                sql_query,
                limit,
                format,
            } => self.execute_sql_query(&sql_query, limit, format).await,
        };

        let elapsed_ms = start.elapsed().as_millis() as u64;
        match &result {
            Ok(_) => info!(tool, elapsed_ms, "Tool completed"),
            Err(e) => warn!(tool, elapsed_ms, kind = e.kind(), error = %e, "Tool failed"),
        }
        result.map(ToolOutput::from)
    }

    async fn connected(&self) -> NlsqlResult<ConnectionInfo> {
        match self.manager.status().await {
            ConnectionStatus::Connected(info) => Ok(info),
            ConnectionStatus::Disconnected => Err(NlsqlError::NotConnected),
        }
    }

    /// Summary cached for `connection_id`, if any.
    async fn cached_summary(&self, connection_id: Uuid) -> Option<String> {
        self.schema_cache
            .lock()
            .await
            .as_ref()
            .filter(|c| c.connection_id == connection_id)
            .map(|c| c.summary.clone())
    }

    async fn store_summary(&self, connection_id: Uuid, summary: &str) {
        *self.schema_cache.lock().await = Some(CachedSummary {
            connection_id,
            summary: summary.to_string(),
        });
    }

    async fn connection_status(&self) -> NlsqlResult<String> {
        let info = match self.manager.status().await {
            ConnectionStatus::Connected(info) => info,
            ConnectionStatus::Disconnected => {
                return Ok(
                    "Not connected to any database.\n\
                     Use connect_sample_database, or start the server with --database."
                        .to_string(),
                );
            }
        };

        let mut text = format!(
            "Connected to {} database\nLocation: {}",
            info.database_type, info.location
        );
        if let Some(version) = &info.server_version {
            let _ = write!(text, "\nServer version: {}", version);
        }
        let _ = write!(
            text,
            "\nConnection ID: {}\nConnected at: {}",
            info.connection_id,
            info.connected_at.to_rfc3339()
        );
        Ok(text)
    }

    async fn connect_sample_database(&self) -> NlsqlResult<String> {
        let info = self.manager.connect_sample().await?;
        let tables = self.manager.list_tables().await?;
        Ok(format!(
            "Connected to sample {} database\nLocation: {}\nTables ({}): {}",
            info.database_type,
            info.location,
            tables.len(),
            tables.join(", ")
        ))
    }

    async fn database_info(&self) -> NlsqlResult<String> {
        let info = self.connected().await?;
        let tables = self.manager.list_tables().await?;

        let mut text = format!(
            "Database: {}\nLocation: {}",
            info.database_type, info.location
        );
        if let Some(size) = self.manager.database_file_size().await? {
            let _ = write!(
                text,
                "\nFile size: {}",
                humansize::format_size(size, humansize::BINARY)
            );
        }
        let _ = write!(text, "\nTables: {}", tables.len());

        for table in &tables {
            let columns = self.manager.describe_table(table).await?;
            let rows = self.manager.count_rows(table).await?;
            let _ = write!(
                text,
                "\n  - {}: {} rows, {} columns",
                table,
                rows,
                columns.len()
            );
        }
        Ok(text)
    }

    async fn analyze_schema(&self, sample_rows: u32) -> NlsqlResult<String> {
        let info = self.connected().await?;
        let snapshot = self.manager.snapshot(sample_rows).await?;
        let summary = self.engine.analyze_schema(&snapshot).await?;
        self.store_summary(info.connection_id, &summary).await;

        Ok(format!(
            "Schema analysis for {} database ({} tables):\n\n{}",
            snapshot.database_type,
            snapshot.tables.len(),
            summary
        ))
    }

    /// Schema context for translation.
    ///
    /// Without `skip_schema` the schema is analyzed afresh and the cache
    /// refreshed. With it, the engine's analysis is never called: the cached
    /// summary is used when it belongs to this connection, otherwise the
    /// structural description.
    async fn schema_context(
        &self,
        info: &ConnectionInfo,
        skip_schema: bool,
    ) -> NlsqlResult<String> {
        if skip_schema {
            if let Some(summary) = self.cached_summary(info.connection_id).await {
                debug!(connection_id = %info.connection_id, "Using cached schema summary");
                return Ok(summary);
            }
            debug!("No cached schema summary for this connection, using structural schema");
            let snapshot = self.manager.snapshot(DEFAULT_SAMPLE_ROWS).await?;
            return Ok(snapshot.describe());
        }

        let snapshot = self.manager.snapshot(DEFAULT_SAMPLE_ROWS).await?;
        let summary = self.engine.analyze_schema(&snapshot).await?;
        self.store_summary(info.connection_id, &summary).await;
        Ok(summary)
    }

    async fn natural_language_to_sql(
        &self,
        question: &str,
        skip_schema: bool,
        execute: bool,
    ) -> NlsqlResult<String> {
        let info = self.connected().await?;
        let context = self.schema_context(&info, skip_schema).await?;
        let sql = self
            .engine
            .translate(question, Some(&context), info.database_type)
            .await?;
        info!(question_len = question.len(), "Generated SQL");
        debug!(sql = %sql, "Generated SQL text");

        let mut text = format!(
            "Question: {}\n\nGenerated SQL:\n```sql\n{}\n```",
            question,
            sql
        );
        if execute {
            match self.manager.execute(&sql, None).await {
                Ok(result) => {
                    let _ = write!(
                        text,
                        "\n\nResult:\n{}",
                        format_result(&result, OutputFormat::Table)
                    );
                }
                Err(e) => {
                    warn!(error = %e, "Generated SQL failed to execute");
                    let _ = write!(text, "\n\nExecution failed:\n{}", e.to_user_message());
                }
            }
        }
        Ok(text)
    }

    async fn execute_sql_query(
        &self,
        sql: &str,
        limit: u32,
        format: OutputFormat,
    ) -> NlsqlResult<String> {
        let result = self.manager.execute(sql, Some(limit)).await?;
        Ok(format_result(&result, format))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DatabaseType, SchemaSnapshot};
    use async_trait::async_trait;
    use serde_json::json;

    struct EchoEngine;

    #[async_trait]
    impl SqlEngine for EchoEngine {
        async fn analyze_schema(&self, snapshot: &SchemaSnapshot) -> NlsqlResult<String> {
            Ok(format!("{} tables", snapshot.tables.len()))
        }

        async fn translate(
            &self,
            _question: &str,
            _schema_context: Option<&str>,
            _dialect: DatabaseType,
        ) -> NlsqlResult<String> {
            Ok("SELECT 1".to_string())
        }
    }

    fn dispatcher() -> ToolDispatcher {
        ToolDispatcher::new(Arc::new(ConnectionManager::default()), Arc::new(EchoEngine))
    }

    #[test]
    fn test_unknown_tool_is_error_block() {
        let result = tokio_test::block_on(dispatcher().invoke("no_such_tool", &json!({})));
        assert!(result.is_error);
        assert_eq!(result.blocks.len(), 1);
        assert!(result.blocks[0].contains("Unknown tool"));
    }

    #[tokio::test]
    async fn test_status_when_disconnected() {
        let result = dispatcher().invoke("get_connection_status", &JsonValue::Null).await;
        assert!(!result.is_error);
        assert!(result.text().contains("Not connected"));
    }

    #[tokio::test]
    async fn test_tools_requiring_connection() {
        let d = dispatcher();
        for (name, args) in [
            ("get_database_info", json!({})),
            ("analyze_schema", json!({})),
            ("natural_language_to_sql", json!({"question": "How many teams?"})),
            ("execute_sql_query", json!({"sql_query": "SELECT 1"})),
        ] {
            let err = d.dispatch(name, &args).await.unwrap_err();
            assert!(matches!(err, NlsqlError::NotConnected), "{} gave {:?}", name, err);
        }
    }

    #[tokio::test]
    async fn test_missing_parameter_is_reported() {
        let result = dispatcher().invoke("execute_sql_query", &json!({})).await;
        assert!(result.is_error);
        assert!(result.text().contains("'sql_query'"));
    }

    #[test]
    fn test_list_tools_matches_registry() {
        assert_eq!(dispatcher().list_tools().len(), 6);
    }
}
