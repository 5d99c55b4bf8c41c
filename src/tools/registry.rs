//! The fixed tool catalog and argument validation.
//!
//! Every tool is described by a static [`ToolDescriptor`]. Argument bags are
//! checked against the descriptor once, at the dispatch boundary, and turned
//! into a typed [`ToolCall`].

use serde::Serialize;
use serde_json::{Map, Value as JsonValue};

use crate::error::{NlsqlError, NlsqlResult};
use crate::models::{DEFAULT_ROW_LIMIT, MAX_ROW_LIMIT};
use crate::tools::format::OutputFormat;

pub const DEFAULT_SAMPLE_ROWS: u32 = 3;
pub const MAX_SAMPLE_ROWS: u32 = 100;

/// JSON type a parameter accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamKind {
    String,
    Integer,
    Boolean,
}

impl ParamKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Boolean => "boolean",
        }
    }

    fn matches(&self, value: &JsonValue) -> bool {
        match self {
            Self::String => value.is_string(),
            Self::Integer => value.is_i64() || value.is_u64(),
            Self::Boolean => value.is_boolean(),
        }
    }
}

impl std::fmt::Display for ParamKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Default value of an optional parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ParamDefault {
    String(&'static str),
    Integer(i64),
    Boolean(bool),
}

impl ParamDefault {
    fn to_json(self) -> JsonValue {
        match self {
            Self::String(s) => JsonValue::from(s),
            Self::Integer(i) => JsonValue::from(i),
            Self::Boolean(b) => JsonValue::from(b),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ParamSpec {
    pub name: &'static str,
    pub kind: ParamKind,
    pub required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<ParamDefault>,
    pub description: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct ToolDescriptor {
    pub name: &'static str,
    pub description: &'static str,
    pub params: &'static [ParamSpec],
}

impl ToolDescriptor {
    pub fn param(&self, name: &str) -> Option<&ParamSpec> {
        self.params.iter().find(|p| p.name == name)
    }

    /// JSON Schema of the argument object, as published in `tools/list`.
    pub fn input_schema(&self) -> Map<String, JsonValue> {
        let mut properties = Map::new();
        for spec in self.params {
            let mut property = Map::new();
            property.insert("type".to_string(), spec.kind.as_str().into());
            property.insert("description".to_string(), spec.description.into());
            if let Some(default) = spec.default {
                property.insert("default".to_string(), default.to_json());
            }
            properties.insert(spec.name.to_string(), JsonValue::Object(property));
        }
        let required: Vec<JsonValue> = self
            .params
            .iter()
            .filter(|p| p.required)
            .map(|p| p.name.into())
            .collect();

        let mut schema = Map::new();
        schema.insert("type".to_string(), "object".into());
        schema.insert("properties".to_string(), JsonValue::Object(properties));
        if !required.is_empty() {
            schema.insert("required".to_string(), JsonValue::Array(required));
        }
        schema.insert("additionalProperties".to_string(), false.into());
        schema
    }
}

pub const GET_CONNECTION_STATUS: &str = "get_connection_status";
pub const CONNECT_SAMPLE_DATABASE: &str = "connect_sample_database";
pub const GET_DATABASE_INFO: &str = "get_database_info";
pub const ANALYZE_SCHEMA: &str = "analyze_schema";
pub const NATURAL_LANGUAGE_TO_SQL: &str = "natural_language_to_sql";
pub const EXECUTE_SQL_QUERY: &str = "execute_sql_query";

static TOOLS: [ToolDescriptor; 6] = [
    ToolDescriptor {
        name: GET_CONNECTION_STATUS,
        description: concat!(
            "Report whether a database is connected, and if so which driver, ",
            "location and server version."
        ),
        params: &[],
    },
    ToolDescriptor {
        name: CONNECT_SAMPLE_DATABASE,
        description: concat!(
            "Connect to the bundled sample SQLite database (NBA data) and list its tables.\n",
            "Replaces any current connection."
        ),
        params: &[],
    },
    ToolDescriptor {
        name: GET_DATABASE_INFO,
        description: concat!(
            "List the tables of the connected database with their row and column counts.\n",
            "For SQLite, also reports the file size."
        ),
        params: &[],
    },
    ToolDescriptor {
        name: ANALYZE_SCHEMA,
        description: concat!(
            "Inspect the connected database's schema and sample data, and produce an AI ",
            "summary of what it contains.\n",
            "The summary is reused by natural_language_to_sql with skip_schema=true."
        ),
        params: &[ParamSpec {
            name: "sample_rows",
            kind: ParamKind::Integer,
            required: false,
            default: Some(ParamDefault::Integer(DEFAULT_SAMPLE_ROWS as i64)),
            description: "Sample rows to include per table (0-100)",
        }],
    },
    ToolDescriptor {
        name: NATURAL_LANGUAGE_TO_SQL,
        description: concat!(
            "Translate a natural-language question into SQL for the connected database.\n",
            "Set execute=true to also run the SQL and return its result.\n",
            "Set skip_schema=true to reuse the last schema analysis instead of analyzing again."
        ),
        params: &[
            ParamSpec {
                name: "question",
                kind: ParamKind::String,
                required: true,
                default: None,
                description: "The question to answer, in plain language",
            },
            ParamSpec {
                name: "skip_schema",
                kind: ParamKind::Boolean,
                required: false,
                default: Some(ParamDefault::Boolean(false)),
                description: "Reuse the last schema analysis instead of analyzing again",
            },
            ParamSpec {
                name: "execute",
                kind: ParamKind::Boolean,
                required: false,
                default: Some(ParamDefault::Boolean(false)),
                description: "Run the generated SQL and include its result",
            },
        ],
    },
    ToolDescriptor {
        name: EXECUTE_SQL_QUERY,
        description: concat!(
            "Run a SQL statement against the connected database.\n",
            "Row-returning statements are capped at `limit` rows (default 100, max 10000).\n",
            "Output format: \"table\" (default), \"markdown\" or \"json\"."
        ),
        params: &[
            ParamSpec {
                name: "sql_query",
                kind: ParamKind::String,
                required: true,
                default: None,
                description: "SQL statement to run",
            },
            ParamSpec {
                name: "limit",
                kind: ParamKind::Integer,
                required: false,
                default: Some(ParamDefault::Integer(DEFAULT_ROW_LIMIT as i64)),
                description: "Maximum rows to return (1-10000)",
            },
            ParamSpec {
                name: "format",
                kind: ParamKind::String,
                required: false,
                default: Some(ParamDefault::String("table")),
                description: "Output format: table, markdown or json",
            },
        ],
    },
];

/// The full, fixed catalog.
pub fn tools() -> &'static [ToolDescriptor] {
    &TOOLS
}

pub fn find_tool(name: &str) -> Option<&'static ToolDescriptor> {
    TOOLS.iter().find(|t| t.name == name)
}

/// A validated tool invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolCall {
    GetConnectionStatus,
    ConnectSampleDatabase,
    GetDatabaseInfo,
    AnalyzeSchema {
        sample_rows: u32,
    },
    NaturalLanguageToSql {
        question: String,
        skip_schema: bool,
        execute: bool,
    },
    ExecuteSqlQuery {
        sql_query: String,
        limit: u32,
        format: OutputFormat,
    },
}

impl ToolCall {
    /// Validate an argument bag against the named tool's parameters.
    ///
    /// `null` and a missing bag are both treated as "no arguments". A
    /// parameter explicitly set to `null` counts as omitted.
    pub fn parse(name: &str, args: &JsonValue) -> NlsqlResult<Self> {
        let descriptor = find_tool(name).ok_or_else(|| NlsqlError::unknown_tool(name))?;

        let empty = Map::new();
        let bag = match args {
            JsonValue::Null => &empty,
            JsonValue::Object(map) => map,
            other => {
                return Err(NlsqlError::invalid_argument(
                    "arguments",
                    format!("expected a JSON object, got {}", json_type(other)),
                ));
            }
        };

        let args = ValidatedArgs::new(descriptor, bag)?;

        let call = match descriptor.name {
            GET_CONNECTION_STATUS => Self::GetConnectionStatus,
            CONNECT_SAMPLE_DATABASE => Self::ConnectSampleDatabase,
            GET_DATABASE_INFO => Self::GetDatabaseInfo,
            ANALYZE_SCHEMA => Self::AnalyzeSchema {
                sample_rows: args.bounded_integer("sample_rows", 0, MAX_SAMPLE_ROWS)?,
            },
            NATURAL_LANGUAGE_TO_SQL => Self::NaturalLanguageToSql {
                question: args.non_empty_string("question")?,
                skip_schema: args.boolean("skip_schema")?,
                execute: args.boolean("execute")?,
            },
            EXECUTE_SQL_QUERY => Self::ExecuteSqlQuery {
                sql_query: args.non_empty_string("sql_query")?,
                limit: args.bounded_integer("limit", 1, MAX_ROW_LIMIT)?,
                format: args
                    .string("format")?
                    .parse()
                    .map_err(|e: String| NlsqlError::invalid_argument("format", e))?,
            },
            other => return Err(NlsqlError::unknown_tool(other)),
        };
        Ok(call)
    }

    pub fn tool_name(&self) -> &'static str {
        match self {
            Self::GetConnectionStatus => GET_CONNECTION_STATUS,
            Self::ConnectSampleDatabase => CONNECT_SAMPLE_DATABASE,
            Self::GetDatabaseInfo => GET_DATABASE_INFO,
            Self::AnalyzeSchema { .. } => ANALYZE_SCHEMA,
            Self::NaturalLanguageToSql { .. } => NATURAL_LANGUAGE_TO_SQL,
            Self::ExecuteSqlQuery { .. } => EXECUTE_SQL_QUERY,
        }
    }
}

fn json_type(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "boolean",
        JsonValue::Number(n) if n.is_i64() || n.is_u64() => "integer",
        JsonValue::Number(_) => "number",
        JsonValue::String(_) => "string",
        JsonValue::Array(_) => "array",
        JsonValue::Object(_) => "object",
    }
}

/// Argument bag that passed the structural checks for one descriptor.
struct ValidatedArgs<'a> {
    descriptor: &'static ToolDescriptor,
    bag: &'a Map<String, JsonValue>,
}

impl<'a> ValidatedArgs<'a> {
    fn new(
        descriptor: &'static ToolDescriptor,
        bag: &'a Map<String, JsonValue>,
    ) -> NlsqlResult<Self> {
        // Deterministic error for several unknown keys
        let mut keys: Vec<&String> = bag.keys().collect();
        keys.sort();
        if let Some(unknown) = keys.into_iter().find(|k| descriptor.param(k).is_none()) {
            return Err(NlsqlError::invalid_argument(
                unknown.as_str(),
                format!("unknown parameter for tool '{}'", descriptor.name),
            ));
        }

        for spec in descriptor.params {
            match bag.get(spec.name).filter(|v| !v.is_null()) {
                None if spec.required => {
                    return Err(NlsqlError::invalid_argument(spec.name, "is required"));
                }
                Some(value) if !spec.kind.matches(value) => {
                    return Err(NlsqlError::invalid_argument(
                        spec.name,
                        format!("expected {}, got {}", spec.kind, json_type(value)),
                    ));
                }
                _ => {}
            }
        }

        Ok(Self { descriptor, bag })
    }

    /// The supplied value, or the declared default.
    fn value(&self, name: &str) -> NlsqlResult<JsonValue> {
        if let Some(value) = self.bag.get(name).filter(|v| !v.is_null()) {
            return Ok(value.clone());
        }
        self.descriptor
            .param(name)
            .and_then(|p| p.default)
            .map(ParamDefault::to_json)
            .ok_or_else(|| NlsqlError::invalid_argument(name, "is required"))
    }

    fn string(&self, name: &str) -> NlsqlResult<String> {
        match self.value(name)? {
            JsonValue::String(s) => Ok(s),
            other => Err(NlsqlError::invalid_argument(
                name,
                format!("expected string, got {}", json_type(&other)),
            )),
        }
    }

    fn non_empty_string(&self, name: &str) -> NlsqlResult<String> {
        let value = self.string(name)?;
        if value.trim().is_empty() {
            return Err(NlsqlError::invalid_argument(name, "must not be empty"));
        }
        Ok(value)
    }

    fn boolean(&self, name: &str) -> NlsqlResult<bool> {
        self.value(name)?.as_bool().ok_or_else(|| {
            NlsqlError::invalid_argument(name, "expected boolean")
        })
    }

    fn bounded_integer(&self, name: &str, min: u32, max: u32) -> NlsqlResult<u32> {
        let value = self
            .value(name)?
            .as_i64()
            .ok_or_else(|| NlsqlError::invalid_argument(name, "expected integer"))?;
        if value < i64::from(min) || value > i64::from(max) {
            return Err(NlsqlError::invalid_argument(
                name,
                format!("must be between {} and {}, got {}", min, max, value),
            ));
        }
        Ok(value as u32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_catalog_has_six_unique_tools() {
        let names: Vec<_> = tools().iter().map(|t| t.name).collect();
        assert_eq!(
            names,
            vec![
                "get_connection_status",
                "connect_sample_database",
                "get_database_info",
                "analyze_schema",
                "natural_language_to_sql",
                "execute_sql_query",
            ]
        );
        for tool in tools() {
            assert!(!tool.description.is_empty(), "{} has no description", tool.name);
        }
    }

    #[test]
    fn test_parse_defaults() {
        assert_eq!(
            ToolCall::parse("analyze_schema", &JsonValue::Null).unwrap(),
            ToolCall::AnalyzeSchema { sample_rows: 3 }
        );
        assert_eq!(
            ToolCall::parse("execute_sql_query", &json!({"sql_query": "SELECT 1"})).unwrap(),
            ToolCall::ExecuteSqlQuery {
                sql_query: "SELECT 1".to_string(),
                limit: 100,
                format: OutputFormat::Table,
            }
        );
        assert_eq!(
            ToolCall::parse("natural_language_to_sql", &json!({"question": "How many teams?"}))
                .unwrap(),
            ToolCall::NaturalLanguageToSql {
                question: "How many teams?".to_string(),
                skip_schema: false,
                execute: false,
            }
        );
    }

    #[test]
    fn test_unknown_tool() {
        let err = ToolCall::parse("drop_everything", &json!({})).unwrap_err();
        assert!(matches!(err, NlsqlError::UnknownTool { .. }));
    }

    fn invalid_parameter(err: NlsqlError) -> String {
        match err {
            NlsqlError::InvalidArgument { parameter, .. } => parameter,
            other => panic!("expected InvalidArgument, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_required_names_parameter() {
        let err = ToolCall::parse("natural_language_to_sql", &json!({})).unwrap_err();
        assert_eq!(invalid_parameter(err), "question");

        let err = ToolCall::parse("execute_sql_query", &json!({"sql_query": null})).unwrap_err();
        assert_eq!(invalid_parameter(err), "sql_query");
    }

    #[test]
    fn test_type_mismatch_names_parameter() {
        let args = json!({"sql_query": "SELECT 1", "limit": "ten"});
        let err = ToolCall::parse("execute_sql_query", &args).unwrap_err();
        assert_eq!(invalid_parameter(err), "limit");

        let args = json!({"question": "q", "execute": "yes"});
        let err = ToolCall::parse("natural_language_to_sql", &args).unwrap_err();
        assert_eq!(invalid_parameter(err), "execute");

        let err = ToolCall::parse("natural_language_to_sql", &json!({"question": 42})).unwrap_err();
        assert!(err.to_string().contains("expected string, got integer"));
    }

    #[test]
    fn test_unknown_parameter_rejected() {
        let err = ToolCall::parse("get_database_info", &json!({"verbose": true})).unwrap_err();
        assert_eq!(invalid_parameter(err), "verbose");
    }

    #[test]
    fn test_bounds_and_format() {
        let args = json!({"sql_query": "SELECT 1", "limit": 0});
        let err = ToolCall::parse("execute_sql_query", &args).unwrap_err();
        assert_eq!(invalid_parameter(err), "limit");

        let args = json!({"sql_query": "SELECT 1", "format": "csv"});
        let err = ToolCall::parse("execute_sql_query", &args).unwrap_err();
        assert_eq!(invalid_parameter(err), "format");

        let args = json!({"question": "   "});
        let err = ToolCall::parse("natural_language_to_sql", &args).unwrap_err();
        assert_eq!(invalid_parameter(err), "question");
    }

    #[test]
    fn test_input_schema() {
        let schema = find_tool("execute_sql_query").unwrap().input_schema();
        assert_eq!(schema["type"], "object");
        assert_eq!(schema["required"], json!(["sql_query"]));
        assert_eq!(schema["properties"]["limit"]["type"], "integer");
        assert_eq!(schema["properties"]["limit"]["default"], 100);
        assert_eq!(schema["properties"]["format"]["default"], "table");
        assert_eq!(schema["additionalProperties"], false);

        let schema = find_tool("get_connection_status").unwrap().input_schema();
        assert!(schema["properties"].as_object().unwrap().is_empty());
        assert!(!schema.contains_key("required"));
    }

    #[test]
    fn test_non_object_arguments() {
        let err = ToolCall::parse("get_connection_status", &json!([1, 2])).unwrap_err();
        assert_eq!(invalid_parameter(err), "arguments");
    }
}
