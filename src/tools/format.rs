//! Output formatting for query results.
//!
//! Every tool result is text, so query results are rendered as an ASCII table
//! (like the MySQL CLI), a Markdown table, or pretty JSON.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::str::FromStr;
use unicode_width::UnicodeWidthStr;

use crate::models::QueryResult;

/// Output format for query results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// ASCII table format (default)
    #[default]
    Table,
    /// Markdown table format
    Markdown,
    /// Pretty-printed JSON
    Json,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "table" => Ok(Self::Table),
            "markdown" | "md" => Ok(Self::Markdown),
            "json" => Ok(Self::Json),
            other => Err(format!(
                "unknown format '{}', expected one of: table, markdown, json",
                other
            )),
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Table => write!(f, "table"),
            Self::Markdown => write!(f, "markdown"),
            Self::Json => write!(f, "json"),
        }
    }
}

pub fn format_value(value: &JsonValue) -> String {
    match value {
        JsonValue::Null => "NULL".to_string(),
        JsonValue::Bool(b) => b.to_string(),
        JsonValue::Number(n) => n.to_string(),
        JsonValue::String(s) => s.clone(),
        JsonValue::Array(_) | JsonValue::Object(_) => value.to_string(),
    }
}

/// Render a result in the requested format, including the truncation note.
pub fn format_result(result: &QueryResult, format: OutputFormat) -> String {
    if let Some(affected) = result.rows_affected {
        let row_text = if affected == 1 { "row" } else { "rows" };
        return format!(
            "Query OK, {} {} affected ({:.2} sec)",
            affected,
            row_text,
            result.execution_time_ms as f64 / 1000.0
        );
    }

    let mut output = match format {
        OutputFormat::Table => format_as_table(result),
        OutputFormat::Markdown => format_as_markdown(result),
        OutputFormat::Json => format_as_json(result),
    };

    if result.truncated {
        output.push_str(&format!(
            "\n(Result truncated to {} rows; raise `limit` to see more)",
            result.row_count()
        ));
    }
    output
}

fn column_names(result: &QueryResult) -> Vec<&str> {
    result.columns.iter().map(|c| c.name.as_str()).collect()
}

pub fn format_as_table(result: &QueryResult) -> String {
    let columns = column_names(result);
    if columns.is_empty() {
        return format!(
            "Empty set ({:.2} sec)",
            result.execution_time_ms as f64 / 1000.0
        );
    }

    let mut widths: Vec<usize> = columns.iter().map(|c| c.width()).collect();
    for row in &result.rows {
        for (i, col) in columns.iter().enumerate() {
            if let Some(value) = row.get(*col) {
                widths[i] = widths[i].max(format_value(value).width());
            }
        }
    }

    let separator: String = widths
        .iter()
        .map(|w| format!("+{}", "-".repeat(w + 2)))
        .collect::<String>()
        + "+\n";

    let mut output = separator.clone();
    output.push_str(
        &(columns
            .iter()
            .zip(&widths)
            .map(|(name, w)| format!("| {} ", pad(name, *w, Align::Center)))
            .collect::<String>()
            + "|\n"),
    );
    output.push_str(&separator);

    for row in &result.rows {
        let line: String = columns
            .iter()
            .zip(&widths)
            .map(|(col, w)| {
                let value = row.get(*col).unwrap_or(&JsonValue::Null);
                let align = if value.is_number() {
                    Align::Right
                } else {
                    Align::Left
                };
                format!("| {} ", pad(&format_value(value), *w, align))
            })
            .collect::<String>()
            + "|\n";
        output.push_str(&line);
    }
    output.push_str(&separator);

    let row_count = result.row_count();
    let row_text = if row_count == 1 { "row" } else { "rows" };
    output.push_str(&format!(
        "{} {} in set ({:.2} sec)",
        row_count,
        row_text,
        result.execution_time_ms as f64 / 1000.0
    ));
    output
}

#[derive(Clone, Copy)]
enum Align {
    Left,
    Right,
    Center,
}

/// Pad by display width so CJK and emoji cells line up.
fn pad(text: &str, width: usize, align: Align) -> String {
    let fill = width.saturating_sub(text.width());
    match align {
        Align::Left => format!("{}{}", text, " ".repeat(fill)),
        Align::Right => format!("{}{}", " ".repeat(fill), text),
        Align::Center => {
            let left = fill / 2;
            format!("{}{}{}", " ".repeat(left), text, " ".repeat(fill - left))
        }
    }
}

pub fn format_as_markdown(result: &QueryResult) -> String {
    let columns = column_names(result);
    if columns.is_empty() {
        return "*Empty set*".to_string();
    }

    let mut output = columns
        .iter()
        .map(|c| format!("| {} ", c))
        .collect::<String>()
        + "|\n";
    output.push_str(&(columns.iter().map(|_| "|---").collect::<String>() + "|\n"));

    for row in &result.rows {
        let line: String = columns
            .iter()
            .map(|col| {
                let value = row.get(*col).unwrap_or(&JsonValue::Null);
                // Pipes would split the cell
                format!("| {} ", format_value(value).replace('|', "\\|"))
            })
            .collect::<String>()
            + "|\n";
        output.push_str(&line);
    }

    output.push_str(&format!("\n*{} rows*", result.row_count()));
    output
}

pub fn format_as_json(result: &QueryResult) -> String {
    serde_json::to_string_pretty(&serde_json::json!({
        "columns": result.columns,
        "rows": result.rows,
        "row_count": result.row_count(),
        "truncated": result.truncated,
        "execution_time_ms": result.execution_time_ms,
    }))
    .unwrap_or_else(|e| format!("{{\"error\": \"failed to serialize result: {}\"}}", e))
}
