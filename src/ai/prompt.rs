use std::collections::HashMap;

use crate::models::DatabaseType;

/// Fixed prompt templates with `{{PLACEHOLDER}}` substitution.
pub struct PromptTemplates;

impl PromptTemplates {
    // Templates embedded at compile time
    const SCHEMA_ANALYSIS: &'static str =
        include_str!("../../templates/schema_analysis_prompt.txt");
    const SQL_SYSTEM: &'static str = include_str!("../../templates/sql_system_prompt.txt");
    const SQL_USER: &'static str = include_str!("../../templates/sql_user_prompt.txt");

    /// Substitute `{{KEY}}` placeholders in one pass over the template.
    /// Substituted values are never scanned again; unknown placeholders stay as written.
    #[must_use]
    pub fn render(template: &str, variables: &HashMap<&str, &str>) -> String {
        let mut result = String::with_capacity(template.len());
        let mut rest = template;

        while let Some(start) = rest.find("{{") {
            result.push_str(&rest[..start]);
            let after = &rest[start + 2..];
            match after
                .find("}}")
                .and_then(|end| variables.get(&after[..end]).map(|value| (end, value)))
            {
                Some((end, value)) => {
                    result.push_str(value);
                    rest = &after[end + 2..];
                }
                None => {
                    result.push_str("{{");
                    rest = after;
                }
            }
        }
        result.push_str(rest);

        result
    }

    #[must_use]
    pub fn schema_analysis(schema: &str, dialect: DatabaseType) -> String {
        let variables = HashMap::from([
            ("SCHEMA", schema),
            ("DIALECT", dialect.display_name()),
        ]);
        Self::render(Self::SCHEMA_ANALYSIS, &variables)
    }

    /// System prompt for translation. Without schema context the model is told so.
    #[must_use]
    pub fn sql_system(schema_context: Option<&str>, dialect: DatabaseType) -> String {
        let schema = schema_context
            .filter(|s| !s.trim().is_empty())
            .unwrap_or("(no schema information available)");
        let variables = HashMap::from([("SCHEMA", schema), ("DIALECT", dialect.display_name())]);
        Self::render(Self::SQL_SYSTEM, &variables)
    }

    #[must_use]
    pub fn sql_user(question: &str) -> String {
        let variables = HashMap::from([("QUESTION", question)]);
        Self::render(Self::SQL_USER, &variables)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_replaces_all_occurrences() {
        let vars = HashMap::from([("NAME", "team")]);
        assert_eq!(
            PromptTemplates::render("{{NAME}} and {{NAME}}", &vars),
            "team and team"
        );
    }

    #[test]
    fn test_render_does_not_rescan_substituted_values() {
        let vars = HashMap::from([
            ("SCHEMA", "note: {{DIALECT}} {{QUESTION}}"),
            ("DIALECT", "SQLite"),
        ]);
        assert_eq!(
            PromptTemplates::render("{{SCHEMA}} / {{DIALECT}} / {{OTHER}}", &vars),
            "note: {{DIALECT}} {{QUESTION}} / SQLite / {{OTHER}}"
        );
        assert_eq!(PromptTemplates::render("{{ unclosed", &vars), "{{ unclosed");

        let schema = "Table: t, cell {{DIALECT}}";
        let prompt = PromptTemplates::sql_system(Some(schema), DatabaseType::MySQL);
        assert!(prompt.contains("Table: t, cell {{DIALECT}}"));
    }

    #[test]
    fn test_sql_system_embeds_schema_and_dialect() {
        let prompt = PromptTemplates::sql_system(Some("Table: team"), DatabaseType::SQLite);
        assert!(prompt.contains("Table: team"));
        assert!(prompt.contains("SQLite"));
        assert!(!prompt.contains("{{"));
    }

    #[test]
    fn test_sql_system_without_schema() {
        let prompt = PromptTemplates::sql_system(None, DatabaseType::PostgreSQL);
        assert!(prompt.contains("no schema information available"));
    }

    #[test]
    fn test_user_prompt_has_question() {
        let prompt = PromptTemplates::sql_user("How many teams are there?");
        assert!(prompt.contains("Question: How many teams are there?"));
    }

    #[test]
    fn test_schema_analysis_prompt() {
        let prompt = PromptTemplates::schema_analysis("Table: game (10 rows)", DatabaseType::MySQL);
        assert!(prompt.contains("Table: game (10 rows)"));
        assert!(prompt.contains("MySQL database"));
    }
}
