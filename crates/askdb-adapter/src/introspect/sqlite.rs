use super::{mismatch, SchemaMapper};
use crate::database::Database;
use crate::engine::Engine;
use crate::error::AdapterError;
use askdb_core::ColumnTypes;
use async_trait::async_trait;
use sqlx::Row;

/// Reads SQLite's own catalog. The database name is ignored; a SQLite
/// handle holds exactly one main database.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteMapper;

#[async_trait]
impl SchemaMapper for SqliteMapper {
    fn engine(&self) -> Engine {
        Engine::Sqlite
    }

    async fn list_tables(
        &self,
        db: &Database,
        _database_name: &str,
    ) -> Result<Vec<String>, AdapterError> {
        let Database::Sqlite(pool) = db else {
            return Err(mismatch(Engine::Sqlite, db));
        };

        let rows = sqlx::query(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
        )
        .fetch_all(pool)
        .await
        .map_err(AdapterError::Introspection)?;

        rows.iter()
            .map(|row| row.try_get::<String, _>("name"))
            .collect::<Result<_, _>>()
            .map_err(AdapterError::Introspection)
    }

    async fn list_columns(
        &self,
        db: &Database,
        _database_name: &str,
        table: &str,
    ) -> Result<ColumnTypes, AdapterError> {
        let Database::Sqlite(pool) = db else {
            return Err(mismatch(Engine::Sqlite, db));
        };

        let rows = sqlx::query("SELECT name, type FROM pragma_table_info(?1) ORDER BY cid")
            .bind(table)
            .fetch_all(pool)
            .await
            .map_err(AdapterError::Introspection)?;

        let mut columns = ColumnTypes::new();
        for row in rows {
            let name: String = row.try_get("name").map_err(AdapterError::Introspection)?;
            let data_type: String = row.try_get("type").map_err(AdapterError::Introspection)?;
            columns.insert(name, data_type.to_lowercase());
        }
        Ok(columns)
    }
}
