//! The read-only safety gate.
//!
//! A candidate query goes through three checks, in order:
//!
//! 1. **Restricted keywords**: any case-insensitive occurrence of a configured
//!    keyword rejects the query outright.
//! 2. **Primary dialect** (PostgreSQL): if the text parses, the verdict is
//!    final. It is accepted only as a single read-only `SELECT`.
//! 3. **Secondary dialect** (MySQL): consulted only when the primary parser
//!    could not parse the text at all.
//!
//! | primary     | secondary   | verdict       |
//! |-------------|-------------|---------------|
//! | `Read`      | (skipped)   | accept        |
//! | `NotRead`   | (skipped)   | reject        |
//! | `Unparsed`  | `Read`      | accept        |
//! | `Unparsed`  | `NotRead`   | reject        |
//! | `Unparsed`  | `Unparsed`  | reject        |

use crate::error::QueryRejection;
use crate::parser::{DialectParser, ParseOutcome, SqlDialect};
use askdb_core::config::guard::default_restricted_keywords;
use askdb_core::GuardConfig;

/// Keywords rejected whatever the configuration says.
pub const MANDATORY_RESTRICTED_KEYWORDS: &[&str] = &["api_key", "apikey", "password", "hashedpassword"];

/// Validates generated SQL before it may reach a database.
#[derive(Debug, Clone)]
pub struct QueryValidator {
    restricted_keywords: Vec<String>,
    primary: DialectParser,
    secondary: DialectParser,
}

impl Default for QueryValidator {
    fn default() -> Self {
        Self::new(default_restricted_keywords())
    }
}

impl QueryValidator {
    /// Create a validator with the given restricted keywords on top of
    /// [`MANDATORY_RESTRICTED_KEYWORDS`].
    pub fn new<I, S>(restricted_keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut keywords: Vec<String> = MANDATORY_RESTRICTED_KEYWORDS
            .iter()
            .map(|k| k.to_string())
            .collect();
        for keyword in restricted_keywords {
            let keyword = keyword.into().trim().to_lowercase();
            if !keyword.is_empty() && !keywords.contains(&keyword) {
                keywords.push(keyword);
            }
        }
        Self {
            restricted_keywords: keywords,
            primary: DialectParser::postgres(),
            secondary: DialectParser::mysql(),
        }
    }

    pub fn from_config(config: &GuardConfig) -> Self {
        Self::new(config.restricted_keywords.iter().cloned())
    }

    pub fn restricted_keywords(&self) -> &[String] {
        &self.restricted_keywords
    }

    /// True when the query may be executed.
    pub fn is_read_only_safe(&self, candidate: &str) -> bool {
        self.check(candidate).is_ok()
    }

    /// Run the full policy and report why a query was refused.
    pub fn check(&self, candidate: &str) -> Result<(), QueryRejection> {
        self.check_restricted(candidate)?;

        let primary = self.primary.classify(candidate);
        let secondary = match primary {
            ParseOutcome::Unparsed { .. } => Some(self.secondary.classify(candidate)),
            _ => None,
        };

        let verdict = decide(
            (self.primary.dialect(), primary),
            secondary.map(|outcome| (self.secondary.dialect(), outcome)),
        );
        if let Err(rejection) = &verdict {
            tracing::debug!(%rejection, "query rejected by parser stage");
        }
        verdict
    }

    fn check_restricted(&self, candidate: &str) -> Result<(), QueryRejection> {
        let lowered = candidate.to_lowercase();
        match self
            .restricted_keywords
            .iter()
            .find(|keyword| lowered.contains(keyword.as_str()))
        {
            Some(keyword) => Err(QueryRejection::RestrictedKeyword {
                keyword: keyword.clone(),
            }),
            None => Ok(()),
        }
    }
}

/// The two-stage decision table.
fn decide(
    primary: (SqlDialect, ParseOutcome),
    secondary: Option<(SqlDialect, ParseOutcome)>,
) -> Result<(), QueryRejection> {
    match (primary, secondary) {
        ((_, ParseOutcome::Read), _) => Ok(()),
        ((dialect, ParseOutcome::NotRead { statement }), _) => Err(QueryRejection::NotReadOnly {
            dialect: dialect.name(),
            statement,
        }),
        ((_, ParseOutcome::Unparsed { .. }), Some((_, ParseOutcome::Read))) => Ok(()),
        ((_, ParseOutcome::Unparsed { .. }), Some((dialect, ParseOutcome::NotRead { statement }))) => {
            Err(QueryRejection::NotReadOnly {
                dialect: dialect.name(),
                statement,
            })
        }
        ((p_dialect, ParseOutcome::Unparsed { error: p_err }), Some((s_dialect, ParseOutcome::Unparsed { error: s_err }))) => {
            Err(QueryRejection::Unparseable {
                primary: format!("{}: {}", p_dialect.name(), p_err),
                secondary: format!("{}: {}", s_dialect.name(), s_err),
            })
        }
        ((p_dialect, ParseOutcome::Unparsed { error }), None) => Err(QueryRejection::Unparseable {
            primary: format!("{}: {}", p_dialect.name(), error),
            secondary: "not attempted".to_string(),
        }),
    }
}
