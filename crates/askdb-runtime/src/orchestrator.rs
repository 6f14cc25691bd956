use crate::error::{ConvertError, Stage};
use askdb_adapter::Database;
use askdb_backend::{normalize_generated_sql, BackendRegistry};
use askdb_core::SchemaSnapshot;
use askdb_guard::QueryValidator;
use tracing::{debug, warn};

/// Turns a question into an answer against one attached database.
///
/// Shared by every session; holds no per-session state.
#[derive(Debug, Clone)]
pub struct Converter {
    backends: BackendRegistry,
    validator: QueryValidator,
    max_result_rows: usize,
}

impl Converter {
    pub fn new(backends: BackendRegistry, validator: QueryValidator, max_result_rows: usize) -> Self {
        Self {
            backends,
            validator,
            max_result_rows,
        }
    }

    pub fn backends(&self) -> &BackendRegistry {
        &self.backends
    }

    pub fn validator(&self) -> &QueryValidator {
        &self.validator
    }

    /// Generate, validate, execute, summarize. The first failing step ends the run.
    pub async fn convert(
        &self,
        db: &Database,
        backend_name: &str,
        question: &str,
        schema: &SchemaSnapshot,
    ) -> Result<String, ConvertError> {
        let backend = self
            .backends
            .get(backend_name)
            .ok_or_else(|| ConvertError::UnknownBackend {
                name: backend_name.to_string(),
            })?;

        debug!(backend = %backend.name(), tables = schema.len(), "generating query");
        let raw = backend
            .generate_query(schema, question)
            .await
            .map_err(|source| ConvertError::Generation {
                stage: Stage::Query,
                source,
            })?;
        let sql = normalize_generated_sql(&raw);

        if let Err(rejection) = self.validator.check(&sql) {
            warn!(backend = %backend.name(), sql = %sql, reason = %rejection, "generated query rejected");
            return Err(ConvertError::UnsafeQuery(rejection));
        }

        debug!(engine = %db.engine(), sql = %sql, "executing generated query");
        let result = db
            .fetch_records(&sql, self.max_result_rows)
            .await
            .map_err(ConvertError::Execution)?;

        debug!(rows = result.len(), truncated = result.truncated, "summarizing result");
        backend
            .generate_summary(&result, question)
            .await
            .map_err(|source| ConvertError::Generation {
                stage: Stage::Summary,
                source,
            })
    }
}
