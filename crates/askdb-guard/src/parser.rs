//! Dialect-aware SQL classification.

use sqlparser::ast::{Query, SetExpr, Statement, Visit, Visitor};
use sqlparser::dialect::{Dialect, MySqlDialect, PostgreSqlDialect};
use sqlparser::parser::Parser;
use std::ops::ControlFlow;

/// SQL dialects understood by the gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqlDialect {
    PostgreSql,
    MySql,
}

impl SqlDialect {
    pub fn name(&self) -> &'static str {
        match self {
            SqlDialect::PostgreSql => "PostgreSQL",
            SqlDialect::MySql => "MySQL",
        }
    }
}

/// Result of classifying a text with one dialect parser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseOutcome {
    /// Exactly one statement, and it only reads.
    Read,
    /// Parsed, but is not a single read-only statement.
    NotRead { statement: String },
    /// The parser rejected the text.
    Unparsed { error: String },
}

/// Parses SQL with a fixed dialect and classifies the result.
#[derive(Debug, Clone, Copy)]
pub struct DialectParser {
    dialect: SqlDialect,
}

impl DialectParser {
    pub fn new(dialect: SqlDialect) -> Self {
        Self { dialect }
    }

    pub fn postgres() -> Self {
        Self::new(SqlDialect::PostgreSql)
    }

    pub fn mysql() -> Self {
        Self::new(SqlDialect::MySql)
    }

    pub fn dialect(&self) -> SqlDialect {
        self.dialect
    }

    /// Parse a SQL string into statements.
    pub fn parse(&self, sql: &str) -> Result<Vec<Statement>, String> {
        let dialect: &dyn Dialect = match self.dialect {
            SqlDialect::PostgreSql => &PostgreSqlDialect {},
            SqlDialect::MySql => &MySqlDialect {},
        };
        Parser::parse_sql(dialect, sql).map_err(|e| e.to_string())
    }

    /// Classify a SQL string as a read, a non-read, or unparseable.
    pub fn classify(&self, sql: &str) -> ParseOutcome {
        let statements = match self.parse(sql) {
            Ok(statements) => statements,
            Err(error) => return ParseOutcome::Unparsed { error },
        };

        match statements.as_slice() {
            [] => ParseOutcome::NotRead {
                statement: "empty query".to_string(),
            },
            [stmt] if is_read_only_statement(stmt) => ParseOutcome::Read,
            [stmt] => ParseOutcome::NotRead {
                statement: statement_kind(stmt),
            },
            many => ParseOutcome::NotRead {
                statement: format!("{} statements", many.len()),
            },
        }
    }
}

/// A statement reads only if it is a query and every query nested anywhere
/// inside it (CTEs, derived tables, subqueries in expressions) is a read.
pub fn is_read_only_statement(stmt: &Statement) -> bool {
    match stmt {
        Statement::Query(_) => stmt.visit(&mut ReadOnlyWalker).is_continue(),
        _ => false,
    }
}

/// Stops at the first nested part that writes or locks.
struct ReadOnlyWalker;

impl Visitor for ReadOnlyWalker {
    type Break = ();

    fn pre_visit_statement(&mut self, statement: &Statement) -> ControlFlow<()> {
        match statement {
            Statement::Query(_) => ControlFlow::Continue(()),
            _ => ControlFlow::Break(()),
        }
    }

    fn pre_visit_query(&mut self, query: &Query) -> ControlFlow<()> {
        // FOR UPDATE / FOR SHARE take row locks
        if !query.locks.is_empty() || !is_read_only_set_expr(&query.body) {
            return ControlFlow::Break(());
        }
        ControlFlow::Continue(())
    }
}

/// Nested queries are checked by the walker when it reaches them.
fn is_read_only_set_expr(expr: &SetExpr) -> bool {
    match expr {
        // SELECT ... INTO creates a table
        SetExpr::Select(select) => select.into.is_none(),
        SetExpr::Query(_) | SetExpr::Values(_) | SetExpr::Table(_) => true,
        SetExpr::SetOperation { left, right, .. } => {
            is_read_only_set_expr(left) && is_read_only_set_expr(right)
        }
        _ => false,
    }
}

/// Short statement label for rejection messages, e.g. "DELETE".
fn statement_kind(stmt: &Statement) -> String {
    match stmt {
        Statement::Query(_) => "SELECT with side effects".to_string(),
        Statement::Insert(_) => "INSERT".to_string(),
        Statement::Update { .. } => "UPDATE".to_string(),
        Statement::Delete(_) => "DELETE".to_string(),
        other => other
            .to_string()
            .split_whitespace()
            .next()
            .unwrap_or("unknown")
            .to_uppercase(),
    }
}
