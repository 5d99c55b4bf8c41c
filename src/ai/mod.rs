//! NL→SQL engine.
//!
//! The engine is an external collaborator with two operations: summarize a
//! schema, and translate a question into SQL. [`SqlEngine`] is the seam; the
//! server uses [`GenAiEngine`], tests substitute their own implementation.

mod engine;
mod prompt;

pub use self::engine::{
    DEFAULT_AI_TIMEOUT_SECS, DEFAULT_MODEL, EngineSettings, GenAiEngine, clean_sql,
};
pub use self::prompt::PromptTemplates;

use async_trait::async_trait;

use crate::error::NlsqlResult;
use crate::models::{DatabaseType, SchemaSnapshot};

#[async_trait]
pub trait SqlEngine: Send + Sync {
    /// Natural-language summary of the schema.
    async fn analyze_schema(&self, snapshot: &SchemaSnapshot) -> NlsqlResult<String>;

    /// SQL text answering `question`, using `schema_context` when given.
    async fn translate(
        &self,
        question: &str,
        schema_context: Option<&str>,
        dialect: DatabaseType,
    ) -> NlsqlResult<String>;
}
