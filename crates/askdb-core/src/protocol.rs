//! Session protocol envelopes.
//!
//! Every WebSocket frame carries exactly one envelope. Clients send
//! [`InboundMessage`]s tagged by `type`; the server answers each one with a
//! [`Response`]. The payload of an inbound message is opaque until a handler
//! decodes it for its declared type.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Inbound type tag: attach a database to the session.
pub const ATTACH_DATABASE: &str = "attach-database";
/// Inbound type tag: ask a natural-language question.
pub const ASK: &str = "ask";

/// Response type for `attach-database`.
pub const ATTACH_DATABASE_RESPONSE: &str = "attach-database-response";
/// Response type for `ask`.
pub const ASK_RESPONSE: &str = "ask-response";
/// Response type for an unrecognized inbound type tag.
pub const UNKNOWN_RESPONSE: &str = "unknown";
/// Response type for a frame that is not a decodable envelope.
pub const INVALID_RESPONSE: &str = "invalid";
/// Response type sent when the inbound queue is full.
pub const BUSY_RESPONSE: &str = "busy";

/// Errors raised while decoding envelopes or their payloads.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// The frame is not a JSON envelope with a `type` field.
    #[error("invalid message format: {0}")]
    InvalidEnvelope(String),

    /// The envelope has no payload but its type requires one.
    #[error("missing payload for message type {kind}")]
    MissingPayload { kind: String },

    /// The payload does not match the shape required by its type.
    #[error("invalid payload for message type {kind}: {reason}")]
    InvalidPayload { kind: String, reason: String },

    /// A required payload field is present but empty.
    #[error("field {field} of message type {kind} cannot be empty")]
    EmptyField { kind: String, field: &'static str },
}

/// A message received from the client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboundMessage {
    /// Type tag used for routing.
    #[serde(rename = "type")]
    pub kind: String,

    /// Opaque body, interpreted per `kind`.
    #[serde(default)]
    pub payload: Value,

    /// Receive time. Stamped by the server; any client value is ignored.
    #[serde(skip_deserializing, default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
}

impl InboundMessage {
    /// Create a message stamped with the current time.
    pub fn new(kind: impl Into<String>, payload: Value) -> Self {
        Self {
            kind: kind.into(),
            payload,
            timestamp: Utc::now(),
        }
    }

    /// Decode a text frame and stamp it with the receive time.
    pub fn decode(frame: &str, received_at: DateTime<Utc>) -> Result<Self, ProtocolError> {
        let mut message: InboundMessage = serde_json::from_str(frame)
            .map_err(|e| ProtocolError::InvalidEnvelope(e.to_string()))?;
        message.timestamp = received_at;
        Ok(message)
    }

    /// Decode the payload into the shape required by this message's type.
    pub fn payload_as<T: DeserializeOwned>(&self) -> Result<T, ProtocolError> {
        if self.payload.is_null() {
            return Err(ProtocolError::MissingPayload {
                kind: self.kind.clone(),
            });
        }
        serde_json::from_value(self.payload.clone()).map_err(|e| ProtocolError::InvalidPayload {
            kind: self.kind.clone(),
            reason: e.to_string(),
        })
    }
}

/// Outcome of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseStatus {
    Success,
    Error,
}

/// A message sent to the client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
    #[serde(rename = "type")]
    pub kind: String,
    pub status: ResponseStatus,
    /// Human-readable body.
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

impl Response {
    /// Create a success response.
    pub fn success(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            status: ResponseStatus::Success,
            message: message.into(),
            timestamp: Utc::now(),
        }
    }

    /// Create an error response.
    pub fn error(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            status: ResponseStatus::Error,
            message: message.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == ResponseStatus::Success
    }

    /// Serialize into a text frame.
    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Payload of an `attach-database` message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachDatabasePayload {
    /// Engine tag, e.g. "postgres".
    #[serde(alias = "db_type")]
    pub engine: String,

    /// Database name used for catalog lookups.
    #[serde(alias = "db_name")]
    pub db: String,

    /// Connection URL.
    #[serde(alias = "db_url")]
    pub url: String,
}

impl AttachDatabasePayload {
    /// Reject empty fields, which serde happily accepts.
    pub fn validate(&self) -> Result<(), ProtocolError> {
        let fields = [("engine", &self.engine), ("db", &self.db), ("url", &self.url)];
        for (field, value) in fields {
            if value.trim().is_empty() {
                return Err(ProtocolError::EmptyField {
                    kind: ATTACH_DATABASE.to_string(),
                    field,
                });
            }
        }
        Ok(())
    }
}

/// Payload of an `ask` message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AskPayload {
    pub question: String,

    /// Backend override; the configured default is used when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backend: Option<String>,
}

impl AskPayload {
    pub fn validate(&self) -> Result<(), ProtocolError> {
        if self.question.trim().is_empty() {
            return Err(ProtocolError::EmptyField {
                kind: ASK.to_string(),
                field: "question",
            });
        }
        Ok(())
    }
}
