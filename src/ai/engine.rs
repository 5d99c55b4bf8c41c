//! [`SqlEngine`] backed by the `genai` client against the OpenAI API.

use async_trait::async_trait;
use genai::ModelIden;
use genai::chat::{ChatMessage, ChatRequest};
use genai::resolver::{AuthData, AuthResolver};
use std::time::Duration;
use tracing::{debug, info, warn};

use super::SqlEngine;
use super::prompt::PromptTemplates;
use crate::error::{NlsqlError, NlsqlResult};
use crate::models::{DatabaseType, SchemaSnapshot};

pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_AI_TIMEOUT_SECS: u64 = 120;

const SERVICE: &str = "OpenAI";

/// Engine configuration.
#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub api_key: Option<String>,
    pub model: String,
    pub timeout_secs: u64,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            timeout_secs: DEFAULT_AI_TIMEOUT_SECS,
        }
    }
}

/// NL→SQL engine issuing one chat completion per call.
///
/// Constructing the engine never fails. Without an API key every call returns
/// an external-service error instead.
pub struct GenAiEngine {
    client: Option<genai::Client>,
    model: String,
    timeout: Duration,
}

impl GenAiEngine {
    pub fn new(settings: EngineSettings) -> Self {
        let client = settings
            .api_key
            .filter(|key| !key.trim().is_empty())
            .map(|key| {
                let auth_resolver = AuthResolver::from_resolver_fn(
                    move |_model_iden: ModelIden|
                          -> Result<Option<AuthData>, genai::resolver::Error> {
                        Ok(Some(AuthData::from_single(key.clone())))
                    },
                );
                genai::Client::builder()
                    .with_auth_resolver(auth_resolver)
                    .build()
            });

        if client.is_none() {
            warn!("OPENAI_API_KEY is not set; schema analysis and SQL generation are unavailable");
        }

        Self {
            client,
            model: settings.model,
            timeout: Duration::from_secs(settings.timeout_secs),
        }
    }

    pub fn has_credentials(&self) -> bool {
        self.client.is_some()
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, operation: &str, request: ChatRequest) -> NlsqlResult<String> {
        let client = self.client.as_ref().ok_or_else(|| {
            NlsqlError::external_service(
                SERVICE,
                concat!(
                    "OPENAI_API_KEY is not set. ",
                    "Export it or pass --openai-api-key to enable AI features."
                ),
            )
        })?;

        debug!(model = %self.model, operation, "Sending chat request");

        let response = tokio::time::timeout(
            self.timeout,
            client.exec_chat(&self.model, request, None),
        )
        .await
        .map_err(|_| NlsqlError::timeout(operation, self.timeout.as_secs()))?
        .map_err(|e| NlsqlError::external_service(SERVICE, format!("Chat request failed: {e}")))?;

        let text = response
            .content_text_into_string()
            .ok_or_else(|| NlsqlError::external_service(SERVICE, "No response from AI model"))?;

        info!(model = %self.model, operation, chars = text.len(), "Chat request completed");
        Ok(text)
    }
}

#[async_trait]
impl SqlEngine for GenAiEngine {
    async fn analyze_schema(&self, snapshot: &SchemaSnapshot) -> NlsqlResult<String> {
        let prompt = PromptTemplates::schema_analysis(&snapshot.describe(), snapshot.database_type);
        let request = ChatRequest::default().append_message(ChatMessage::user(prompt));

        let summary = self.complete("schema analysis", request).await?;
        let summary = summary.trim().to_string();
        if summary.is_empty() {
            return Err(NlsqlError::external_service(
                SERVICE,
                "AI model returned an empty schema analysis",
            ));
        }
        Ok(summary)
    }

    async fn translate(
        &self,
        question: &str,
        schema_context: Option<&str>,
        dialect: DatabaseType,
    ) -> NlsqlResult<String> {
        let request = ChatRequest::default()
            .with_system(PromptTemplates::sql_system(schema_context, dialect))
            .append_message(ChatMessage::user(PromptTemplates::sql_user(question)));

        let answer = self.complete("SQL generation", request).await?;
        let sql = clean_sql(&answer);
        if sql.is_empty() {
            return Err(NlsqlError::external_service(
                SERVICE,
                "AI model returned no SQL",
            ));
        }
        Ok(sql)
    }
}

/// Strip code fences and a leading `sql` tag, trim, and drop trailing semicolons.
pub fn clean_sql(answer: &str) -> String {
    let mut text = answer.trim();

    if let Some(start) = text.find("```") {
        let after = &text[start + 3..];
        text = match after.find("```") {
            Some(end) => &after[..end],
            None => after,
        };
    }

    let mut text = text.trim();
    if text.get(..3).is_some_and(|tag| tag.eq_ignore_ascii_case("sql")) {
        let rest = &text[3..];
        // Only a tag when followed by whitespace, not e.g. `sqlite_master`
        if rest.is_empty() || rest.starts_with(char::is_whitespace) {
            text = rest.trim_start();
        }
    }

    text.trim().trim_end_matches(';').trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_sql_fenced() {
        let answer = "```sql\nSELECT COUNT(*) FROM team;\n```";
        assert_eq!(clean_sql(answer), "SELECT COUNT(*) FROM team");
    }

    #[test]
    fn test_clean_sql_with_prose_around_fence() {
        let answer = "Here you go:\n```SQL\nSELECT 1;;\n```\nHope it helps";
        assert_eq!(clean_sql(answer), "SELECT 1");
    }

    #[test]
    fn test_clean_sql_plain() {
        assert_eq!(clean_sql("  SELECT * FROM game ;  "), "SELECT * FROM game");
        assert_eq!(clean_sql("sql SELECT 1"), "SELECT 1");
    }

    #[test]
    fn test_clean_sql_keeps_identifiers_starting_with_sql() {
        assert_eq!(
            clean_sql("sqlite_master"),
            "sqlite_master"
        );
    }

    #[test]
    fn test_clean_sql_empty() {
        assert_eq!(clean_sql("```sql\n```"), "");
        assert_eq!(clean_sql(";"), "");
    }

    #[tokio::test]
    async fn test_missing_key_fails_every_call() {
        let engine = GenAiEngine::new(EngineSettings::default());
        assert!(!engine.has_credentials());

        let err = engine
            .translate("How many teams?", None, DatabaseType::SQLite)
            .await
            .unwrap_err();
        assert!(matches!(err, NlsqlError::ExternalService { .. }));
        assert!(err.to_string().contains("OPENAI_API_KEY"));
    }

    #[test]
    fn test_blank_key_counts_as_missing() {
        let engine = GenAiEngine::new(EngineSettings {
            api_key: Some("  ".to_string()),
            ..EngineSettings::default()
        });
        assert!(!engine.has_credentials());
        assert_eq!(engine.model(), DEFAULT_MODEL);
    }
}
