//! # askdb-guard
//!
//! The SQL safety gate. Every query produced by a generation backend passes
//! through [`QueryValidator`] before it can reach an attached database.
//!
//! ## Policy
//!
//! | Check | Rejects |
//! |-------|---------|
//! | Restricted keywords | `password`, `hashedpassword`, API key markers, ... |
//! | PostgreSQL parse | anything that is not one read-only `SELECT` |
//! | MySQL parse (fallback) | same, only when PostgreSQL could not parse |
//! | Neither parses | everything |
//!
//! **Accepted:**
//! ```sql
//! SELECT COUNT(*) FROM accounts;
//! ```
//!
//! **Rejected:**
//! ```sql
//! SELECT password FROM users;
//! DELETE FROM users WHERE id = 1;
//! WITH gone AS (DELETE FROM users RETURNING *) SELECT * FROM gone;
//! ```

pub mod error;
pub mod parser;
pub mod validator;

pub use error::QueryRejection;
pub use parser::{DialectParser, ParseOutcome, SqlDialect};
pub use validator::QueryValidator;
