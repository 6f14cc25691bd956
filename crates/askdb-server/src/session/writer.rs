use super::{closed, Lifeline};
use askdb_core::Response;
use axum::body::Bytes;
use axum::extract::ws::Message;
use futures::{Sink, SinkExt};
use std::fmt::Display;
use std::time::Duration;
use tokio::sync::mpsc::Receiver;
use tokio::time::{interval_at, timeout, Instant, MissedTickBehavior};
use tracing::{debug, error, warn};

/// Upper bound on the farewell close frame.
const CLOSE_GRACE: Duration = Duration::from_secs(1);

/// Transmit responses in order and keep the connection alive with pings.
pub(crate) async fn write_loop<K>(
    mut sink: K,
    mut outbound: Receiver<Response>,
    lifeline: Lifeline,
    ping_interval: Duration,
) where
    K: Sink<Message> + Unpin,
    K::Error: Display,
{
    let mut close_rx = lifeline.subscribe();
    let mut ping = interval_at(Instant::now() + ping_interval, ping_interval);
    ping.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let reason = loop {
        tokio::select! {
            _ = closed(&mut close_rx) => {
                if let Ok(Err(e)) = timeout(CLOSE_GRACE, sink.send(Message::Close(None))).await {
                    debug!(error = %e, "close frame not delivered");
                }
                return;
            }
            response = outbound.recv() => {
                let Some(response) = response else {
                    break "outbound queue closed";
                };
                let frame = match response.encode() {
                    Ok(frame) => frame,
                    Err(e) => {
                        error!(error = %e, kind = %response.kind, "failed to encode response");
                        continue;
                    }
                };
                if let Err(e) = sink.send(Message::Text(frame.into())).await {
                    warn!(error = %e, "transport write failed");
                    break "transport write failed";
                }
                debug!(kind = %response.kind, status = ?response.status, "response sent");
            }
            _ = ping.tick() => {
                if let Err(e) = sink.send(Message::Ping(Bytes::new())).await {
                    warn!(error = %e, "keepalive ping failed");
                    break "keepalive ping failed";
                }
            }
        }
    };

    lifeline.teardown(reason);
}
