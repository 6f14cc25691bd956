use super::{mismatch, SchemaMapper};
use crate::database::Database;
use crate::engine::Engine;
use crate::error::AdapterError;
use askdb_core::ColumnTypes;
use async_trait::async_trait;
use sqlx::Row;

/// Reads `information_schema` in the `public` schema.
#[derive(Debug, Clone, Copy, Default)]
pub struct PostgresMapper;

#[async_trait]
impl SchemaMapper for PostgresMapper {
    fn engine(&self) -> Engine {
        Engine::Postgres
    }

    async fn list_tables(
        &self,
        db: &Database,
        _database_name: &str,
    ) -> Result<Vec<String>, AdapterError> {
        let Database::Postgres(pool) = db else {
            return Err(mismatch(Engine::Postgres, db));
        };

        let rows = sqlx::query(
            r#"
            select table_name::text as table_name
            from information_schema.tables
            where table_schema = 'public'
              and table_type = 'BASE TABLE'
            order by table_name
            "#,
        )
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
        _database_name: &str,
        table: &str,
    ) -> Result<ColumnTypes, AdapterError> {
        let Database::Postgres(pool) = db else {
            return Err(mismatch(Engine::Postgres, db));
        };

        let rows = sqlx::query(
            r#"
            select column_name::text as column_name, data_type::text as data_type
            from information_schema.columns
            where table_schema = 'public' and table_name = $1
            order by ordinal_position
            "#,
        )
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
