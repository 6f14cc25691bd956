//! Error types for the guard crate.

use thiserror::Error;

/// Why a candidate query was refused by the safety gate.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryRejection {
    /// The raw text mentions a restricted keyword.
    #[error("query references restricted keyword '{keyword}'")]
    RestrictedKeyword { keyword: String },

    /// The text parsed, but not as a single read-only SELECT.
    #[error("only a single read-only SELECT statement is allowed, got {statement} ({dialect})")]
    NotReadOnly {
        dialect: &'static str,
        statement: String,
    },

    /// Neither dialect could parse the text.
    #[error("query could not be parsed as SQL ({primary}; {secondary})")]
    Unparseable { primary: String, secondary: String },
}
