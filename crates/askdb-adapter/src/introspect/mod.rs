//! Schema introspection.
//!
//! A [`SchemaMapper`] reads table and column metadata from a live database
//! and folds it into a [`SchemaSnapshot`]. One mapper exists per engine;
//! [`mapper_for`] selects it from an engine tag.

mod mysql;
mod postgres;
mod sqlite;

pub use mysql::MySqlMapper;
pub use postgres::PostgresMapper;
pub use sqlite::SqliteMapper;

use crate::database::Database;
use crate::engine::Engine;
use crate::error::AdapterError;
use askdb_core::{ColumnTypes, SchemaSnapshot};
use async_trait::async_trait;
use tracing::info;

/// Reads catalog metadata for one engine.
#[async_trait]
pub trait SchemaMapper: Send + Sync {
    fn engine(&self) -> Engine;

    /// User table names in the attached database.
    async fn list_tables(&self, db: &Database, database_name: &str)
        -> Result<Vec<String>, AdapterError>;

    /// Column name to declared data type for one table.
    async fn list_columns(
        &self,
        db: &Database,
        database_name: &str,
        table: &str,
    ) -> Result<ColumnTypes, AdapterError>;

    /// Build the full snapshot. Fails as a whole if any table fails.
    async fn map_schema(
        &self,
        db: &Database,
        database_name: &str,
    ) -> Result<SchemaSnapshot, AdapterError> {
        let tables = self.list_tables(db, database_name).await?;
        let mut snapshot = SchemaSnapshot::new();
        for table in tables {
            let columns = self.list_columns(db, database_name, &table).await?;
            snapshot.insert_table(table, columns);
        }
        info!(
            engine = %self.engine(),
            database = %database_name,
            tables = snapshot.len(),
            "schema introspected"
        );
        Ok(snapshot)
    }
}

/// Select the mapper for an engine tag.
pub fn mapper_for(tag: &str) -> Result<Box<dyn SchemaMapper>, AdapterError> {
    match Engine::from_tag(tag) {
        Some(engine) => Ok(mapper_for_engine(engine)),
        None => Err(AdapterError::UnsupportedEngine {
            tag: tag.to_string(),
        }),
    }
}

pub fn mapper_for_engine(engine: Engine) -> Box<dyn SchemaMapper> {
    match engine {
        Engine::Postgres => Box::new(PostgresMapper),
        Engine::MySql => Box::new(MySqlMapper),
        Engine::Sqlite => Box::new(SqliteMapper),
    }
}

fn mismatch(mapper: Engine, db: &Database) -> AdapterError {
    AdapterError::EngineMismatch {
        mapper,
        handle: db.engine(),
    }
}
