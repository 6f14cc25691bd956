use super::{closed, Frame, Lifeline, SessionError};
use askdb_adapter::{mapper_for, Database, Engine};
use askdb_core::protocol::{
    ASK, ASK_RESPONSE, ATTACH_DATABASE, ATTACH_DATABASE_RESPONSE, INVALID_RESPONSE, UNKNOWN_RESPONSE,
};
use askdb_core::{AskPayload, AttachDatabasePayload, DatabaseConfig, InboundMessage, Response, SchemaSnapshot};
use askdb_runtime::Converter;
use std::sync::Arc;
use tokio::sync::mpsc::{Receiver, Sender};
use tracing::{debug, info, warn};

/// A database attached to a session.
#[derive(Debug)]
pub struct AttachedDatabase {
    pub db: Database,
    pub engine: Engine,
    pub name: String,
    pub schema: Arc<SchemaSnapshot>,
}

#[derive(Debug, Default)]
pub enum SessionState {
    #[default]
    Uninitialized,
    Ready(AttachedDatabase),
}

/// Routes inbound messages to their handlers and owns the session state.
#[derive(Debug)]
pub struct Dispatcher {
    converter: Arc<Converter>,
    database: DatabaseConfig,
    default_backend: String,
    state: SessionState,
}

impl Dispatcher {
    pub fn new(converter: Arc<Converter>, database: DatabaseConfig, default_backend: String) -> Self {
        Self {
            converter,
            database,
            default_backend,
            state: SessionState::Uninitialized,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn is_ready(&self) -> bool {
        matches!(self.state, SessionState::Ready(_))
    }

    /// Schema of the attached database, if any.
    pub fn schema(&self) -> Option<Arc<SchemaSnapshot>> {
        match &self.state {
            SessionState::Ready(attached) => Some(attached.schema.clone()),
            SessionState::Uninitialized => None,
        }
    }

    /// Handle one inbound message. Never fails; errors become error responses.
    pub async fn handle(&mut self, message: &InboundMessage) -> Response {
        match message.kind.as_str() {
            ATTACH_DATABASE => match self.attach(message).await {
                Ok(text) => Response::success(ATTACH_DATABASE_RESPONSE, text),
                Err(e) => {
                    warn!(error = %e, "attach-database failed");
                    Response::error(ATTACH_DATABASE_RESPONSE, e.to_string())
                }
            },
            ASK => match self.ask(message).await {
                Ok(text) => Response::success(ASK_RESPONSE, text),
                Err(e) => {
                    warn!(error = %e, "ask failed");
                    Response::error(ASK_RESPONSE, e.to_string())
                }
            },
            other => {
                debug!(kind = %other, "unknown message type");
                Response::error(UNKNOWN_RESPONSE, format!("unknown message type: {other}"))
            }
        }
    }

    pub(crate) async fn dispatch(&mut self, frame: Frame) -> Response {
        match frame {
            Frame::Message(message) => self.handle(&message).await,
            Frame::Malformed(e) => {
                let err = SessionError::MalformedMessage(e);
                debug!(error = %err, "malformed frame");
                Response::error(INVALID_RESPONSE, err.to_string())
            }
        }
    }

    async fn attach(&mut self, message: &InboundMessage) -> Result<String, SessionError> {
        let payload: AttachDatabasePayload = message.payload_as()?;
        payload.validate()?;

        let mapper = mapper_for(&payload.engine).map_err(SessionError::Introspection)?;
        let engine = mapper.engine();
        let db = Database::connect(engine, &payload.url, &self.database)
            .await
            .map_err(SessionError::Introspection)?;

        let schema = match mapper.map_schema(&db, &payload.db).await {
            Ok(schema) => schema,
            Err(e) => {
                db.close().await;
                return Err(SessionError::Introspection(e));
            }
        };

        info!(engine = %engine, database = %payload.db, tables = schema.len(), "database attached");
        let attached = AttachedDatabase {
            db,
            engine,
            name: payload.db,
            schema: Arc::new(schema),
        };
        let text = format!("successfully connected to: {}", attached.name);

        if let SessionState::Ready(previous) = std::mem::replace(&mut self.state, SessionState::Ready(attached)) {
            debug!(engine = %previous.engine, database = %previous.name, "closing replaced database");
            previous.db.close().await;
        }
        Ok(text)
    }

    async fn ask(&self, message: &InboundMessage) -> Result<String, SessionError> {
        let SessionState::Ready(attached) = &self.state else {
            return Err(SessionError::NotInitialized);
        };

        let payload: AskPayload = message.payload_as()?;
        payload.validate()?;
        let backend = payload.backend.as_deref().unwrap_or(&self.default_backend);

        debug!(backend = %backend, database = %attached.name, "answering question");
        let answer = self
            .converter
            .convert(&attached.db, backend, &payload.question, &attached.schema)
            .await?;
        Ok(answer)
    }

    /// Close the attached database, if any.
    pub async fn shutdown(self) {
        if let SessionState::Ready(attached) = self.state {
            attached.db.close().await;
            debug!(database = %attached.name, "attached database closed");
        }
    }
}

/// Take frames off the inbound queue one at a time and push each response
/// before taking the next.
pub(crate) async fn dispatch_loop(
    mut dispatcher: Dispatcher,
    mut inbound: Receiver<Frame>,
    outbound: Sender<Response>,
    lifeline: Lifeline,
) {
    let mut close_rx = lifeline.subscribe();

    loop {
        let frame = tokio::select! {
            biased;
            _ = closed(&mut close_rx) => break,
            frame = inbound.recv() => match frame {
                Some(frame) => frame,
                None => break,
            },
        };

        let response = dispatcher.dispatch(frame).await;

        tokio::select! {
            biased;
            _ = closed(&mut close_rx) => break,
            sent = outbound.send(response) => {
                if sent.is_err() {
                    break;
                }
            }
        }
    }

    dispatcher.shutdown().await;
    lifeline.teardown("dispatcher stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use askdb_adapter::ResultSet;
    use askdb_backend::{BackendError, BackendRegistry, QueryBackend};
    use askdb_core::ResponseStatus;
    use askdb_guard::QueryValidator;
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    struct CountingBackend;

    #[async_trait]
    impl QueryBackend for CountingBackend {
        fn name(&self) -> &'static str {
            "counting"
        }

        async fn generate_query(
            &self,
            _schema: &SchemaSnapshot,
            _question: &str,
        ) -> Result<String, BackendError> {
            Ok("SELECT COUNT(*) AS n FROM t1;".to_string())
        }

        async fn generate_summary(
            &self,
            result: &ResultSet,
            _question: &str,
        ) -> Result<String, BackendError> {
            Ok(format!("rows: {}", result.to_json()))
        }
    }

    fn dispatcher() -> Dispatcher {
        let mut backends = BackendRegistry::new();
        backends.register("llama", Arc::new(CountingBackend));
        let converter = Converter::new(backends, QueryValidator::default(), 100);
        Dispatcher::new(Arc::new(converter), DatabaseConfig::default(), "llama".to_string())
    }

    /// A file-backed SQLite database, so two attachments see the same data.
    async fn sqlite_file(dir: &tempfile::TempDir, ddl: &[&str]) -> String {
        let url = format!("sqlite://{}?mode=rwc", dir.path().join("app.db").display());
        let pool = sqlx::SqlitePool::connect(&url).await.unwrap();
        for stmt in ddl {
            sqlx::query(stmt).execute(&pool).await.unwrap();
        }
        pool.close().await;
        url
    }

    fn attach_msg(engine: &str, url: &str) -> InboundMessage {
        InboundMessage::new(ATTACH_DATABASE, json!({"engine": engine, "db": "main", "url": url}))
    }

    fn ask_msg(question: &str) -> InboundMessage {
        InboundMessage::new(ASK, json!({"question": question}))
    }

    #[tokio::test]
    async fn test_ask_before_attach() {
        let mut dispatcher = dispatcher();
        let response = dispatcher.handle(&ask_msg("how many rows?")).await;

        assert_eq!(response.kind, ASK_RESPONSE);
        assert_eq!(response.status, ResponseStatus::Error);
        assert!(response.message.contains("not been initialized"));
        assert!(!dispatcher.is_ready());
    }

    #[tokio::test]
    async fn test_unknown_type() {
        let mut dispatcher = dispatcher();
        let response = dispatcher
            .handle(&InboundMessage::new("drop-everything", json!({})))
            .await;
        assert_eq!(response.kind, UNKNOWN_RESPONSE);
        assert_eq!(response.message, "unknown message type: drop-everything");
        assert!(!dispatcher.is_ready());
    }

    #[tokio::test]
    async fn test_malformed_frame() {
        let mut dispatcher = dispatcher();
        let frame = Frame::Malformed(askdb_core::ProtocolError::InvalidEnvelope("eof".to_string()));
        let response = dispatcher.dispatch(frame).await;
        assert_eq!(response.kind, INVALID_RESPONSE);
        assert_eq!(response.message, "invalid message format: eof");
    }

    #[tokio::test]
    async fn test_attach_validation_errors() {
        let mut dispatcher = dispatcher();

        let missing = dispatcher.handle(&InboundMessage::new(ATTACH_DATABASE, serde_json::Value::Null)).await;
        assert!(!missing.is_success());

        let empty = dispatcher.handle(&attach_msg("sqlite", "")).await;
        assert!(empty.message.contains("cannot be empty"));

        let unsupported = dispatcher.handle(&attach_msg("oracle", "oracle://x")).await;
        assert_eq!(unsupported.kind, ATTACH_DATABASE_RESPONSE);
        assert_eq!(unsupported.message, "unsupported database engine: oracle");
        assert!(!dispatcher.is_ready());
    }

    #[tokio::test]
    async fn test_attach_then_ask() {
        let dir = tempfile::tempdir().unwrap();
        let url = sqlite_file(&dir, &["CREATE TABLE t1 (c1 TEXT)", "INSERT INTO t1 (c1) VALUES ('a'), ('b'), ('c')"]).await;
        let mut dispatcher = dispatcher();

        let attached = dispatcher.handle(&attach_msg("sqlite", &url)).await;
        assert!(attached.is_success(), "{}", attached.message);
        assert_eq!(attached.message, "successfully connected to: main");
        assert_eq!(dispatcher.schema().unwrap().column_type("t1", "c1"), Some("text"));

        let answer = dispatcher.handle(&ask_msg("how many rows are in t1?")).await;
        assert_eq!(answer.kind, ASK_RESPONSE);
        assert!(answer.is_success(), "{}", answer.message);
        assert_eq!(answer.message, r#"rows: [{"n":3}]"#);

        dispatcher.shutdown().await;
    }

    #[tokio::test]
    async fn test_ask_with_unknown_backend() {
        let dir = tempfile::tempdir().unwrap();
        let url = sqlite_file(&dir, &["CREATE TABLE t1 (c1 TEXT)"]).await;
        let mut dispatcher = dispatcher();
        assert!(dispatcher.handle(&attach_msg("sqlite", &url)).await.is_success());

        let response = dispatcher
            .handle(&InboundMessage::new(ASK, json!({"question": "q", "backend": "gemini"})))
            .await;
        assert_eq!(response.message, "unknown backend: gemini");
        assert!(dispatcher.is_ready());
    }

    #[tokio::test]
    async fn test_attach_cannot_create_sqlite_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("created.db");
        let mut dispatcher = dispatcher();

        let response = dispatcher
            .handle(&attach_msg("sqlite", &format!("sqlite://{}?mode=rwc", path.display())))
            .await;
        assert_eq!(response.kind, ATTACH_DATABASE_RESPONSE);
        assert_eq!(response.status, ResponseStatus::Error);
        assert!(!path.exists());
        assert!(!dispatcher.is_ready());
    }

    #[tokio::test]
    async fn test_failed_reattach_keeps_previous_state() {
        let dir = tempfile::tempdir().unwrap();
        let url = sqlite_file(&dir, &["CREATE TABLE t1 (c1 TEXT)"]).await;
        let mut dispatcher = dispatcher();
        assert!(dispatcher.handle(&attach_msg("sqlite", &url)).await.is_success());
        let before = dispatcher.schema().unwrap();

        let missing = dir.path().join("missing").join("other.db");
        let failed = dispatcher
            .handle(&attach_msg("sqlite", &format!("sqlite://{}", missing.display())))
            .await;
        assert!(!failed.is_success());

        assert!(dispatcher.is_ready());
        assert!(Arc::ptr_eq(&before, &dispatcher.schema().unwrap()));
    }

    #[tokio::test]
    async fn test_reattach_replaces_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let first = sqlite_file(&dir, &["CREATE TABLE t1 (c1 TEXT)"]).await;
        let other_dir = tempfile::tempdir().unwrap();
        let second = sqlite_file(&other_dir, &["CREATE TABLE t2 (c2 INTEGER)"]).await;
        let mut dispatcher = dispatcher();

        assert!(dispatcher.handle(&attach_msg("sqlite", &first)).await.is_success());
        let old_db = match dispatcher.state() {
            SessionState::Ready(attached) => attached.db.clone(),
            SessionState::Uninitialized => unreachable!(),
        };

        assert!(dispatcher.handle(&attach_msg("sqlite", &second)).await.is_success());
        let schema = dispatcher.schema().unwrap();
        assert!(schema.table("t1").is_none());
        assert_eq!(schema.column_type("t2", "c2"), Some("integer"));
        assert!(old_db.is_closed());
    }
}
