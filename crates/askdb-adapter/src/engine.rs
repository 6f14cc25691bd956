//! Database engine tags.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The closed set of supported database engines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Engine {
    Postgres,
    MySql,
    Sqlite,
}

impl Engine {
    /// Resolve an engine tag, case-insensitively. Unknown tags yield `None`.
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag.trim().to_lowercase().as_str() {
            "postgres" | "postgresql" | "pg" => Some(Engine::Postgres),
            "mysql" | "mariadb" => Some(Engine::MySql),
            "sqlite" | "sqlite3" => Some(Engine::Sqlite),
            _ => None,
        }
    }

    /// Canonical tag.
    pub fn as_str(&self) -> &'static str {
        match self {
            Engine::Postgres => "postgres",
            Engine::MySql => "mysql",
            Engine::Sqlite => "sqlite",
        }
    }
}

impl fmt::Display for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_tag() {
        assert_eq!(Engine::from_tag("postgres"), Some(Engine::Postgres));
        assert_eq!(Engine::from_tag("PostgreSQL"), Some(Engine::Postgres));
        assert_eq!(Engine::from_tag("mysql"), Some(Engine::MySql));
        assert_eq!(Engine::from_tag(" sqlite "), Some(Engine::Sqlite));
        assert_eq!(Engine::from_tag("oracle"), None);
        assert_eq!(Engine::from_tag(""), None);
    }

    #[test]
    fn test_display_is_canonical() {
        assert_eq!(Engine::from_tag("pg").unwrap().to_string(), "postgres");
    }
}
