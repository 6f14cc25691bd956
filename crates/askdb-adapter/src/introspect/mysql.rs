use super::{mismatch, SchemaMapper};
use crate::database::Database;
use crate::engine::Engine;
use crate::error::AdapterError;
use askdb_core::ColumnTypes;
use async_trait::async_trait;
use sqlx::Row;

/// Reads `INFORMATION_SCHEMA` scoped to the attached database name.
#[derive(Debug, Clone, Copy, Default)]
pub struct MySqlMapper;

#[async_trait]
impl SchemaMapper for MySqlMapper {
    fn engine(&self) -> Engine {
        Engine::MySql
    }

    async fn list_tables(
        &self,
        db: &Database,
        database_name: &str,
    ) -> Result<Vec<String>, AdapterError> {
        let Database::MySql(pool) = db else {
            return Err(mismatch(Engine::MySql, db));
        };

        // Catalog columns can come back as binary strings on MySQL 8.
        let rows = sqlx::query(
            r#"
            SELECT CAST(TABLE_NAME AS CHAR) AS table_name
            FROM INFORMATION_SCHEMA.TABLES
            WHERE TABLE_SCHEMA = ? AND TABLE_TYPE = 'BASE TABLE'
            ORDER BY TABLE_NAME
            "#,
        )
        .bind(database_name)
        .fetch_all(pool)
        .await
        .map_err(AdapterError::Introspection)?;

        rows.iter()
            .map(|row| row.try_get::<String, _>("table_name"))
            .collect::<Result<_, _>>()
            .map_err(AdapterError::Introspection)
    }

    async fn list_columns(
        &self,
        db: &Database,
        database_name: &str,
        table: &str,
    ) -> Result<ColumnTypes, AdapterError> {
        let Database::MySql(pool) = db else {
            return Err(mismatch(Engine::MySql, db));
        };

        let rows = sqlx::query(
            r#"
            SELECT CAST(COLUMN_NAME AS CHAR) AS column_name,
                   CAST(DATA_TYPE AS CHAR) AS data_type
            FROM INFORMATION_SCHEMA.COLUMNS
            WHERE TABLE_SCHEMA = ? AND TABLE_NAME = ?
            ORDER BY ORDINAL_POSITION
            "#,
        )
        .bind(database_name)
        .bind(table)
        .fetch_all(pool)
        .await
        .map_err(AdapterError::Introspection)?;

        let mut columns = ColumnTypes::new();
        for row in rows {
            let name: String = row.try_get("column_name").map_err(AdapterError::Introspection)?;
            let data_type: String = row.try_get("data_type").map_err(AdapterError::Introspection)?;
            columns.insert(name, data_type);
        }
        Ok(columns)
    }
}
