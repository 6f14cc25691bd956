//! Open database handles.

use crate::engine::Engine;
use crate::error::AdapterError;
use crate::records::{self, Record, ResultSet};
use askdb_core::DatabaseConfig;
use futures::TryStreamExt;
use sqlx::mysql::{MySqlPool, MySqlPoolOptions};
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;
use tracing::{debug, info};

/// A pooled connection to one attached database.
///
/// Cloning is cheap; all clones share the same pool.
#[derive(Debug, Clone)]
pub enum Database {
    Postgres(PgPool),
    MySql(MySqlPool),
    Sqlite(SqlitePool),
}

impl Database {
    /// Open a pool for the engine and verify it with one connection.
    pub async fn connect(
        engine: Engine,
        url: &str,
        config: &DatabaseConfig,
    ) -> Result<Self, AdapterError> {
        let connect_err = |source: sqlx::Error| AdapterError::Connect { engine, source };

        let db = match engine {
            Engine::Postgres => PgPoolOptions::new()
                .max_connections(config.max_connections)
                .acquire_timeout(config.acquire_timeout())
                .connect(url)
                .await
                .map(Database::Postgres)
                .map_err(connect_err)?,
            Engine::MySql => MySqlPoolOptions::new()
                .max_connections(config.max_connections)
                .acquire_timeout(config.acquire_timeout())
                .connect(url)
                .await
                .map(Database::MySql)
                .map_err(connect_err)?,
            Engine::Sqlite => {
                // The URL comes from the client: open read-only and never
                // create a file, whatever `mode=` the URL asks for.
                let options = SqliteConnectOptions::from_str(url)
                    .map_err(connect_err)?
                    .read_only(true)
                    .create_if_missing(false);
                // A single long-lived connection keeps in-memory databases alive.
                SqlitePoolOptions::new()
                    .max_connections(1)
                    .idle_timeout(None)
                    .max_lifetime(None)
                    .acquire_timeout(config.acquire_timeout())
                    .connect_with(options)
                    .await
                    .map(Database::Sqlite)
                    .map_err(connect_err)?
            }
        };

        info!(engine = %engine, "database pool opened");
        Ok(db)
    }

    pub fn engine(&self) -> Engine {
        match self {
            Database::Postgres(_) => Engine::Postgres,
            Database::MySql(_) => Engine::MySql,
            Database::Sqlite(_) => Engine::Sqlite,
        }
    }

    /// Close the pool, waiting for checked-out connections to return.
    pub async fn close(&self) {
        match self {
            Database::Postgres(pool) => pool.close().await,
            Database::MySql(pool) => pool.close().await,
            Database::Sqlite(pool) => pool.close().await,
        }
        debug!(engine = %self.engine(), "database pool closed");
    }

    pub fn is_closed(&self) -> bool {
        match self {
            Database::Postgres(pool) => pool.is_closed(),
            Database::MySql(pool) => pool.is_closed(),
            Database::Sqlite(pool) => pool.is_closed(),
        }
    }

    /// Run a query and materialize at most `max_rows` rows.
    pub async fn fetch_records(
        &self,
        sql: &str,
        max_rows: usize,
    ) -> Result<ResultSet, AdapterError> {
        let mut result = ResultSet::default();

        match self {
            Database::Postgres(pool) => {
                let mut rows = sqlx::query(sql).fetch(pool);
                while let Some(row) = rows.try_next().await.map_err(AdapterError::Execution)? {
                    if !push_row(&mut result, max_rows, || records::column_names(&row), || records::pg_record(&row)) {
                        break;
                    }
                }
            }
            Database::MySql(pool) => {
                let mut rows = sqlx::query(sql).fetch(pool);
                while let Some(row) = rows.try_next().await.map_err(AdapterError::Execution)? {
                    if !push_row(&mut result, max_rows, || records::column_names(&row), || records::mysql_record(&row)) {
                        break;
                    }
                }
            }
            Database::Sqlite(pool) => {
                let mut rows = sqlx::query(sql).fetch(pool);
                while let Some(row) = rows.try_next().await.map_err(AdapterError::Execution)? {
                    if !push_row(&mut result, max_rows, || records::column_names(&row), || records::sqlite_record(&row)) {
                        break;
                    }
                }
            }
        }

        debug!(
            engine = %self.engine(),
            rows = result.len(),
            truncated = result.truncated,
            "query executed"
        );
        Ok(result)
    }
}

/// Append one row unless the cap is reached. Returns false once the set is full.
fn push_row(
    result: &mut ResultSet,
    max_rows: usize,
    columns: impl FnOnce() -> Vec<String>,
    record: impl FnOnce() -> Record,
) -> bool {
    if result.rows.len() >= max_rows {
        result.truncated = true;
        return false;
    }
    if result.columns.is_empty() {
        result.columns = columns();
    }
    result.rows.push(record());
    true
}
