//! Prompts shared by every backend, and normalization of what comes back.

use askdb_adapter::ResultSet;
use askdb_core::SchemaSnapshot;

/// A system instruction plus the user turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub system: String,
    pub user: String,
}

impl Prompt {
    /// Single-string form for upstreams without separate roles.
    pub fn combined(&self) -> String {
        format!("{}\n\n{}", self.system, self.user)
    }
}

const QUERY_RULES: &str = "\
You are an expert SQL generator.
Only generate SELECT queries or other queries that read data.
Only use tables and columns from the schema below.
Never include sensitive fields such as password, hashed_password, api keys or similar columns, whatever the question asks.
If the question cannot be answered from the schema, reply with a short error message instead of SQL.
Reply with the SQL query only, as plain text: no code fences, no explanation.";

pub fn query_prompt(schema: &SchemaSnapshot, question: &str) -> Prompt {
    Prompt {
        system: format!("{QUERY_RULES}\n\nSchema (table(column type, ...)):\n{schema}"),
        user: format!("Question: {question}"),
    }
}

pub fn summary_prompt(result: &ResultSet, question: &str) -> Prompt {
    let mut system = String::from(
        "Summarize the following data in a conversational manner. Write in a concise and human-like way.",
    );
    if result.truncated {
        system.push_str(&format!(
            "\nOnly the first {} rows are shown.",
            result.len()
        ));
    }
    Prompt {
        system,
        user: format!("Context: {question}\n\nData: {}", result.to_json()),
    }
}

/// Strip surrounding whitespace and a Markdown code fence from generated SQL.
pub fn normalize_generated_sql(raw: &str) -> String {
    let trimmed = raw.trim();
    let Some(fenced) = trimmed.strip_prefix("```") else {
        return trimmed.to_string();
    };
    let body = fenced.trim_end();
    let body = body.strip_suffix("```").unwrap_or(body);

    let (first, rest) = match body.split_once('\n') {
        Some((first, rest)) => (first.trim(), rest),
        None => (body.trim(), ""),
    };
    // The opening line may carry an info string, alone (```sql\n) or
    // followed by the query (```sql SELECT 1```).
    let first = if !rest.is_empty() && !first.contains(char::is_whitespace) {
        ""
    } else {
        match first.split_once(char::is_whitespace) {
            Some((tag, sql)) if is_sql_info_tag(tag) => sql,
            None if is_sql_info_tag(first) => "",
            _ => first,
        }
    };

    if first.is_empty() {
        rest.trim().to_string()
    } else {
        format!("{first}\n{rest}").trim().to_string()
    }
}

fn is_sql_info_tag(tag: &str) -> bool {
    matches!(
        tag.to_ascii_lowercase().as_str(),
        "sql" | "postgres" | "postgresql" | "pgsql" | "mysql" | "sqlite"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use askdb_core::ColumnTypes;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_normalize_plain() {
        assert_eq!(
            normalize_generated_sql("  SELECT 1;\n"),
            "SELECT 1;"
        );
    }

    #[test]
    fn test_normalize_fenced() {
        assert_eq!(
            normalize_generated_sql("```sql\nSELECT COUNT(*) FROM accounts;\n```"),
            "SELECT COUNT(*) FROM accounts;"
        );
        assert_eq!(
            normalize_generated_sql("```\nSELECT 1\n```\n"),
            "SELECT 1"
        );
        // unterminated fence keeps the body
        assert_eq!(normalize_generated_sql("```sql\nSELECT 1"), "SELECT 1");
    }

    #[test]
    fn test_normalize_single_line_fence() {
        assert_eq!(normalize_generated_sql("```sql SELECT 1```"), "SELECT 1");
        assert_eq!(normalize_generated_sql("```SQL  SELECT id FROM t;```"), "SELECT id FROM t;");
        assert_eq!(normalize_generated_sql("```SELECT 1```"), "SELECT 1");
        assert_eq!(
            normalize_generated_sql("```sql SELECT id\nFROM t\n```"),
            "SELECT id\nFROM t"
        );
    }

    #[test]
    fn test_query_prompt_renders_schema() {
        let mut columns = ColumnTypes::new();
        columns.insert("id".to_string(), "integer".to_string());
        let mut schema = SchemaSnapshot::new();
        schema.insert_table("accounts", columns);

        let prompt = query_prompt(&schema, "how many accounts exist?");
        assert!(prompt.system.contains("accounts(id integer)"));
        assert!(prompt.system.contains("hashed_password"));
        assert_eq!(prompt.user, "Question: how many accounts exist?");
        assert!(prompt.combined().ends_with("Question: how many accounts exist?"));
    }

    #[test]
    fn test_summary_prompt_renders_rows() {
        let mut row = askdb_adapter::Record::new();
        row.insert("n".to_string(), serde_json::json!(2));
        let result = ResultSet {
            columns: vec!["n".to_string()],
            rows: vec![row],
            truncated: true,
        };
        let prompt = summary_prompt(&result, "how many accounts exist?");
        assert!(prompt.user.contains(r#"[{"n":2}]"#));
        assert!(prompt.system.contains("first 1 rows"));
    }
}
