//! Schema-related data models.
//!
//! A [`SchemaSnapshot`] is the structural picture of the connected database
//! (tables, columns, row counts, sample rows). It is fed to the NL→SQL engine
//! and, when the engine is skipped, rendered as the schema context directly.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fmt::Write as _;

use super::connection::DatabaseType;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnDefinition {
    pub name: String,
    /// Declared type as reported by the database (e.g., `INTEGER`, `varchar(30)`)
    pub data_type: String,
    pub nullable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_value: Option<String>,
    pub is_primary_key: bool,
}

impl ColumnDefinition {
    pub fn new(name: impl Into<String>, data_type: impl Into<String>, nullable: bool) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
            nullable,
            default_value: None,
            is_primary_key: false,
        }
    }

    /// Set whether this is a primary key column.
    pub fn with_primary_key(mut self, is_pk: bool) -> Self {
        self.is_primary_key = is_pk;
        self
    }

    pub fn with_default(mut self, default_value: impl Into<String>) -> Self {
        self.default_value = Some(default_value.into());
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableSnapshot {
    pub name: String,
    pub columns: Vec<ColumnDefinition>,
    pub row_count: u64,
    /// Up to N sample rows, column order preserved by `columns`
    pub sample_rows: Vec<serde_json::Map<String, JsonValue>>,
}

impl TableSnapshot {
    pub fn primary_key(&self) -> Vec<&str> {
        self.columns
            .iter()
            .filter(|c| c.is_primary_key)
            .map(|c| c.name.as_str())
            .collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaSnapshot {
    pub database_type: DatabaseType,
    pub tables: Vec<TableSnapshot>,
}

impl SchemaSnapshot {
    pub fn table_names(&self) -> Vec<&str> {
        self.tables.iter().map(|t| t.name.as_str()).collect()
    }

    /// Render the snapshot as plain text suitable as schema context for the engine.
    pub fn describe(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "Database type: {} ({} tables)",
            self.database_type,
            self.tables.len()
        );

        for table in &self.tables {
            let _ = writeln!(out);
            let _ = writeln!(out, "Table: {} ({} rows)", table.name, table.row_count);
            for col in &table.columns {
                let mut flags = Vec::new();
                if col.is_primary_key {
                    flags.push("PRIMARY KEY");
                }
                if !col.nullable {
                    flags.push("NOT NULL");
                }
                if flags.is_empty() {
                    let _ = writeln!(out, "  - {} {}", col.name, col.data_type);
                } else {
                    let _ = writeln!(
                        out,
                        "  - {} {} {}",
                        col.name,
                        col.data_type,
                        flags.join(" ")
                    );
                }
            }

            if !table.sample_rows.is_empty() {
                let _ = writeln!(out, "  Sample rows:");
                for row in &table.sample_rows {
                    let cells: Vec<String> = table
                        .columns
                        .iter()
                        .map(|c| {
                            let value = row.get(&c.name).unwrap_or(&JsonValue::Null);
                            format!("{}={}", c.name, sample_cell(value))
                        })
                        .collect();
                    let _ = writeln!(out, "    {}", cells.join(", "));
                }
            }
        }

        out
    }
}

/// Sample cells are truncated so a single wide column cannot flood the prompt.
fn sample_cell(value: &JsonValue) -> String {
    const MAX_CELL_CHARS: usize = 60;
    let text = match value {
        JsonValue::String(s) => s.clone(),
        other => other.to_string(),
    };
    if text.chars().count() > MAX_CELL_CHARS {
        let truncated: String = text.chars().take(MAX_CELL_CHARS).collect();
        format!("{}...", truncated)
    } else {
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn team_snapshot() -> SchemaSnapshot {
        let mut row = serde_json::Map::new();
        row.insert("id".to_string(), JsonValue::from(1));
        row.insert("full_name".to_string(), JsonValue::from("Atlanta Hawks"));
        SchemaSnapshot {
            database_type: DatabaseType::SQLite,
            tables: vec![TableSnapshot {
                name: "team".to_string(),
                columns: vec![
                    ColumnDefinition::new("id", "INTEGER", false).with_primary_key(true),
                    ColumnDefinition::new("full_name", "TEXT", true),
                ],
                row_count: 30,
                sample_rows: vec![row],
            }],
        }
    }

    #[test]
    fn test_describe_lists_tables_columns_and_samples() {
        let text = team_snapshot().describe();
        assert!(text.contains("Database type: SQLite (1 tables)"));
        assert!(text.contains("Table: team (30 rows)"));
        assert!(text.contains("id INTEGER PRIMARY KEY NOT NULL"));
        assert!(text.contains("full_name TEXT\n"));
        assert!(text.contains("id=1, full_name=Atlanta Hawks"));
    }

    #[test]
    fn test_primary_key_and_names() {
        let snapshot = team_snapshot();
        assert_eq!(snapshot.table_names(), vec!["team"]);
        assert_eq!(snapshot.tables[0].primary_key(), vec!["id"]);
    }

    #[test]
    fn test_sample_cell_truncates_long_text() {
        let long = JsonValue::from("x".repeat(200));
        let cell = sample_cell(&long);
        assert!(cell.ends_with("..."));
        assert_eq!(cell.chars().count(), 63);
    }
}
