//! One live client connection.
//!
//! A session runs three tasks that share only two bounded queues and a close
//! signal:
//!
//! ```text
//!  transport ──▶ reader ──inbound──▶ dispatcher ──outbound──▶ writer ──▶ transport
//!                  │                     │                      │
//!                  └──────────── close signal (watch) ──────────┘
//! ```
//!
//! Whichever task first sees the connection end tears the session down:
//! the close signal fires, the session leaves the registry, the writer sends
//! a close frame and the dispatcher closes the attached database.

mod dispatcher;
mod error;
mod reader;
mod writer;

pub use dispatcher::{AttachedDatabase, Dispatcher, SessionState};
pub use error::SessionError;

use crate::registry::{SessionId, SessionRegistry};
use askdb_core::{DatabaseConfig, InboundMessage, ProtocolError, SessionConfig};
use askdb_runtime::Converter;
use axum::extract::ws::Message;
use futures::{Sink, Stream};
use std::fmt::Display;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{info, info_span, Instrument};

/// Everything a new session needs from the server.
#[derive(Debug, Clone)]
pub struct SessionContext {
    pub session: SessionConfig,
    pub database: DatabaseConfig,
    /// Backend used when an `ask` names none.
    pub default_backend: String,
    pub converter: Arc<Converter>,
    pub registry: Arc<SessionRegistry>,
}

/// Item on the inbound queue. Malformed frames are queued too so their
/// error responses keep dispatch order.
#[derive(Debug)]
pub(crate) enum Frame {
    Message(InboundMessage),
    Malformed(ProtocolError),
}

/// Liveness flag and close signal shared by the three tasks.
#[derive(Debug, Clone)]
pub(crate) struct Lifeline {
    inner: Arc<LifelineInner>,
}

#[derive(Debug)]
struct LifelineInner {
    id: SessionId,
    alive: AtomicBool,
    close_tx: watch::Sender<bool>,
    registry: Arc<SessionRegistry>,
}

impl Lifeline {
    fn new(id: SessionId, registry: Arc<SessionRegistry>) -> Self {
        let (close_tx, _) = watch::channel(false);
        Self {
            inner: Arc::new(LifelineInner {
                id,
                alive: AtomicBool::new(true),
                close_tx,
                registry,
            }),
        }
    }

    pub(crate) fn subscribe(&self) -> watch::Receiver<bool> {
        self.inner.close_tx.subscribe()
    }

    pub(crate) fn is_alive(&self) -> bool {
        self.inner.alive.load(Ordering::SeqCst)
    }

    /// Tear the session down. Only the first call has any effect.
    pub(crate) fn teardown(&self, reason: &str) {
        if !self.inner.alive.swap(false, Ordering::SeqCst) {
            return;
        }
        info!(reason, "session closing");
        self.inner.close_tx.send_replace(true);
        self.inner.registry.unregister(&self.inner.id);
    }
}

/// Resolves once the close signal has fired.
pub(crate) async fn closed(rx: &mut watch::Receiver<bool>) {
    // An error means the sender is gone, which only happens after teardown.
    let _ = rx.wait_for(|closed| *closed).await;
}

/// A running session.
#[derive(Debug)]
pub struct Session {
    id: SessionId,
    lifeline: Lifeline,
    tasks: Vec<JoinHandle<()>>,
}

impl Session {
    /// Register a session for the transport halves and start its tasks.
    pub fn start<S, K, E>(ctx: &SessionContext, stream: S, sink: K) -> Result<Self, SessionError>
    where
        S: Stream<Item = Result<Message, E>> + Unpin + Send + 'static,
        E: Display + Send + 'static,
        K: Sink<Message> + Unpin + Send + 'static,
        K::Error: Display + Send,
    {
        let id = SessionId::new();
        if !ctx.registry.register(id) {
            return Err(SessionError::Connection(format!("session {id} already registered")));
        }

        let span = info_span!("session", session_id = %id);
        let lifeline = Lifeline::new(id, ctx.registry.clone());
        let (inbound_tx, inbound_rx) = mpsc::channel(ctx.session.inbound_capacity);
        let (outbound_tx, outbound_rx) = mpsc::channel(ctx.session.outbound_capacity);

        let dispatcher = Dispatcher::new(
            ctx.converter.clone(),
            ctx.database.clone(),
            ctx.default_backend.clone(),
        );

        let tasks = vec![
            tokio::spawn(
                reader::read_loop(
                    stream,
                    inbound_tx,
                    outbound_tx.clone(),
                    lifeline.clone(),
                    ctx.session.read_deadline(),
                )
                .instrument(span.clone()),
            ),
            tokio::spawn(
                writer::write_loop(sink, outbound_rx, lifeline.clone(), ctx.session.ping_interval())
                    .instrument(span.clone()),
            ),
            tokio::spawn(
                dispatcher::dispatch_loop(dispatcher, inbound_rx, outbound_tx, lifeline.clone())
                    .instrument(span.clone()),
            ),
        ];

        span.in_scope(|| info!(sessions = ctx.registry.len(), "session started"));
        Ok(Self { id, lifeline, tasks })
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn is_alive(&self) -> bool {
        self.lifeline.is_alive()
    }

    /// Tear the session down from outside.
    pub fn close(&self) {
        self.lifeline.teardown("closed by server");
    }

    /// Wait for all three tasks to finish.
    pub async fn closed(mut self) {
        self.join_tasks().await;
    }

    /// Wait for the session to end on its own, or close it once `shutdown`
    /// turns true. A dropped shutdown sender leaves the session running.
    pub async fn run_until_shutdown(mut self, mut shutdown: watch::Receiver<bool>) {
        tokio::select! {
            _ = self.join_tasks() => return,
            Ok(_) = shutdown.wait_for(|stop| *stop) => {}
        }
        self.close();
        self.join_tasks().await;
    }

    // Handles are popped only once finished, so an interrupted join can resume.
    async fn join_tasks(&mut self) {
        while let Some(task) = self.tasks.last_mut() {
            let result = task.await;
            self.tasks.pop();
            if let Err(e) = result {
                tracing::error!(session_id = %self.id, error = %e, "session task failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use askdb_backend::BackendRegistry;
    use askdb_core::protocol::{ASK_RESPONSE, INVALID_RESPONSE, UNKNOWN_RESPONSE};
    use askdb_core::{Response, ResponseStatus};
    use askdb_guard::QueryValidator;
    use futures::channel::mpsc as transport;
    use futures::{SinkExt, StreamExt};
    use pretty_assertions::assert_eq;
    use std::time::Duration;

    type ClientTx = transport::UnboundedSender<Result<Message, axum::Error>>;
    type ClientRx = transport::UnboundedReceiver<Message>;

    fn context() -> SessionContext {
        let converter = Converter::new(BackendRegistry::new(), QueryValidator::default(), 10);
        SessionContext {
            session: SessionConfig::default(),
            database: DatabaseConfig::default(),
            default_backend: "llama".to_string(),
            converter: Arc::new(converter),
            registry: Arc::new(SessionRegistry::new()),
        }
    }

    fn connect(ctx: &SessionContext) -> (Session, ClientTx, ClientRx) {
        let (client_tx, server_rx) = transport::unbounded();
        let (server_tx, client_rx) = transport::unbounded();
        let session = Session::start(ctx, server_rx, server_tx).unwrap();
        (session, client_tx, client_rx)
    }

    async fn next_response(rx: &mut ClientRx) -> Response {
        loop {
            match rx.next().await.expect("transport closed") {
                Message::Text(text) => return serde_json::from_str(text.as_str()).unwrap(),
                Message::Ping(_) => continue,
                other => panic!("unexpected frame: {other:?}"),
            }
        }
    }

    #[tokio::test]
    async fn test_session_registers_and_answers() {
        let ctx = context();
        let (session, mut tx, mut rx) = connect(&ctx);
        assert!(ctx.registry.contains(&session.id()));

        let ask = r#"{"type":"ask","payload":{"question":"how many accounts exist?"}}"#;
        tx.send(Ok(Message::Text(ask.into()))).await.unwrap();

        let response = next_response(&mut rx).await;
        assert_eq!(response.kind, ASK_RESPONSE);
        assert_eq!(response.status, ResponseStatus::Error);
        assert!(session.is_alive());
    }

    #[tokio::test]
    async fn test_responses_keep_order() {
        let ctx = context();
        let (_session, mut tx, mut rx) = connect(&ctx);

        tx.send(Ok(Message::Text("not json".into()))).await.unwrap();
        tx.send(Ok(Message::Binary(br#"{"type":"shrug"}"#.to_vec().into())))
            .await
            .unwrap();

        let first = next_response(&mut rx).await;
        assert_eq!(first.kind, INVALID_RESPONSE);
        assert!(first.message.starts_with("invalid message format"));

        let second = next_response(&mut rx).await;
        assert_eq!(second.kind, UNKNOWN_RESPONSE);
        assert_eq!(second.message, "unknown message type: shrug");
    }

    #[tokio::test]
    async fn test_client_close_unregisters() {
        let ctx = context();
        let (session, mut tx, mut rx) = connect(&ctx);

        tx.send(Ok(Message::Close(None))).await.unwrap();
        session.closed().await;

        assert!(ctx.registry.is_empty());
        assert!(matches!(rx.next().await, Some(Message::Close(None))));
    }

    #[tokio::test]
    async fn test_dropped_transport_unregisters() {
        let ctx = context();
        let (session, tx, _rx) = connect(&ctx);

        drop(tx);
        session.closed().await;
        assert!(ctx.registry.is_empty());
    }

    #[tokio::test]
    async fn test_server_close() {
        let ctx = context();
        let (session, _tx, mut rx) = connect(&ctx);

        session.close();
        session.close();
        assert!(!session.is_alive());
        session.closed().await;

        assert!(ctx.registry.is_empty());
        assert!(matches!(rx.next().await, Some(Message::Close(None))));
        assert!(rx.next().await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_pong_tears_down() {
        let ctx = context();
        let (session, _tx, mut rx) = connect(&ctx);
        let id = session.id();

        session.closed().await;
        assert!(!ctx.registry.contains(&id));

        // One ping at 50s, then the 60s deadline expires.
        assert!(matches!(rx.next().await, Some(Message::Ping(_))));
        assert!(matches!(rx.next().await, Some(Message::Close(None))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_pong_extends_deadline() {
        let ctx = context();
        let (session, mut tx, _rx) = connect(&ctx);

        tokio::time::sleep(Duration::from_secs(40)).await;
        tx.send(Ok(Message::Pong(Default::default()))).await.unwrap();

        // Past the original 60s deadline, still inside the extended one.
        tokio::time::sleep(Duration::from_secs(50)).await;
        assert!(session.is_alive());
        assert!(ctx.registry.contains(&session.id()));

        tokio::time::sleep(Duration::from_secs(20)).await;
        assert!(!session.is_alive());
        assert!(ctx.registry.is_empty());
    }

    #[tokio::test]
    async fn test_transport_error_tears_down() {
        let ctx = context();
        let (session, mut tx, _rx) = connect(&ctx);

        tx.send(Err(axum::Error::new(std::io::Error::other("reset"))))
            .await
            .unwrap();
        session.closed().await;
        assert!(ctx.registry.is_empty());
    }

    #[tokio::test]
    async fn test_shutdown_signal_closes_session() {
        let ctx = context();
        let (session, _tx, mut rx) = connect(&ctx);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let running = tokio::spawn(session.run_until_shutdown(shutdown_rx));
        shutdown_tx.send_replace(true);
        running.await.unwrap();

        assert!(ctx.registry.is_empty());
        assert!(matches!(rx.next().await, Some(Message::Close(None))));
    }

    #[tokio::test]
    async fn test_dropped_shutdown_sender_keeps_session() {
        let ctx = context();
        let (session, tx, _rx) = connect(&ctx);
        let id = session.id();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let running = tokio::spawn(session.run_until_shutdown(shutdown_rx));
        drop(shutdown_tx);
        tokio::task::yield_now().await;
        assert!(ctx.registry.contains(&id));

        drop(tx);
        running.await.unwrap();
        assert!(ctx.registry.is_empty());
    }

    #[test]
    fn test_teardown_is_idempotent() {
        let registry = Arc::new(SessionRegistry::new());
        let id = SessionId::new();
        registry.register(id);
        let lifeline = Lifeline::new(id, registry.clone());
        let mut rx = lifeline.subscribe();

        lifeline.teardown("first");
        lifeline.teardown("second");

        assert!(!lifeline.is_alive());
        assert!(registry.is_empty());
        assert!(*rx.borrow_and_update());
    }
}
