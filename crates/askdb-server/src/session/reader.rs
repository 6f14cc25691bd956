use super::{closed, Frame, Lifeline, SessionError};
use askdb_core::protocol::BUSY_RESPONSE;
use askdb_core::{InboundMessage, ProtocolError, Response};
use axum::extract::ws::Message;
use chrono::Utc;
use futures::{Stream, StreamExt};
use std::fmt::Display;
use std::ops::ControlFlow;
use std::time::Duration;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::mpsc::Sender;
use tokio::time::{timeout_at, Instant};
use tracing::{debug, warn};

/// Receive frames until the transport ends, the read deadline passes, or the
/// session closes. The deadline slides forward on every pong.
pub(crate) async fn read_loop<S, E>(
    mut stream: S,
    inbound: Sender<Frame>,
    outbound: Sender<Response>,
    lifeline: Lifeline,
    read_deadline: Duration,
) where
    S: Stream<Item = Result<Message, E>> + Unpin,
    E: Display,
{
    let mut close_rx = lifeline.subscribe();
    let mut deadline = Instant::now() + read_deadline;

    let reason = loop {
        let next = tokio::select! {
            _ = closed(&mut close_rx) => return,
            next = timeout_at(deadline, stream.next()) => next,
        };

        let message = match next {
            Err(_) => break "read deadline expired",
            Ok(None) => break "transport ended",
            Ok(Some(Err(e))) => {
                warn!(error = %SessionError::Connection(e.to_string()), "transport read failed");
                break "transport error";
            }
            Ok(Some(Ok(message))) => message,
        };

        let flow = match message {
            Message::Pong(_) => {
                deadline = Instant::now() + read_deadline;
                ControlFlow::Continue(())
            }
            // Pings are answered by the transport itself.
            Message::Ping(_) => ControlFlow::Continue(()),
            Message::Close(_) => break "client closed",
            Message::Text(text) => enqueue(&inbound, &outbound, decode(text.as_str())),
            Message::Binary(bytes) => {
                let frame = match std::str::from_utf8(&bytes) {
                    Ok(text) => decode(text),
                    Err(e) => Frame::Malformed(ProtocolError::InvalidEnvelope(e.to_string())),
                };
                enqueue(&inbound, &outbound, frame)
            }
        };

        if let ControlFlow::Break(reason) = flow {
            break reason;
        }
    };

    lifeline.teardown(reason);
}

fn decode(text: &str) -> Frame {
    match InboundMessage::decode(text, Utc::now()) {
        Ok(message) => {
            debug!(kind = %message.kind, "frame received");
            Frame::Message(message)
        }
        Err(e) => Frame::Malformed(e),
    }
}

/// Queue a frame without waiting. A full queue drops the frame and
/// answers `busy` instead.
fn enqueue(
    inbound: &Sender<Frame>,
    outbound: &Sender<Response>,
    frame: Frame,
) -> ControlFlow<&'static str> {
    match inbound.try_send(frame) {
        Ok(()) => ControlFlow::Continue(()),
        Err(TrySendError::Full(dropped)) => {
            warn!(frame = ?dropped, "inbound queue full, dropping message");
            let busy = Response::error(
                BUSY_RESPONSE,
                "server busy: message dropped, retry after pending requests complete",
            );
            if outbound.try_send(busy).is_err() {
                debug!("outbound queue full, busy response dropped");
            }
            ControlFlow::Continue(())
        }
        Err(TrySendError::Closed(_)) => ControlFlow::Break("dispatcher stopped"),
    }
}
