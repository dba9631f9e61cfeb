//! Wire types exchanged with the Creative Wand backend.
//!
//! Inbound events arrive over the real-time channel as `(name, payload)`
//! pairs; [`InboundEvent::decode`] turns them into typed values. Outbound
//! bodies are plain serde structs posted over HTTP or emitted on the channel.

use serde::{Deserialize, Serialize};

use crate::error::WandError;
use crate::session::SessionId;

pub const EVENT_DOCUMENT: &str = "document";
pub const EVENT_KILL_SESSION: &str = "kill_session";
pub const EVENT_MESSAGE: &str = "message";
pub const EVENT_CHAT_MESSAGE: &str = "chat_message";

/// Every inbound event name the session client listens for.
pub const INBOUND_EVENTS: &[&str] = &[EVENT_DOCUMENT, EVENT_KILL_SESSION, EVENT_MESSAGE];

// ---------------------------------------------------------------------------
// Document snapshot
// ---------------------------------------------------------------------------

/// A contiguous sentence-index range tagged with a narrative topic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SketchSpan {
    pub start: usize,
    pub end: usize,
    pub topic: String,
}

/// The combined document state pushed by the backend. Always replaced as a
/// whole so the sketch and coefficients never disagree with the sentences.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentSnapshot {
    pub document: Vec<String>,
    pub sketch: Vec<SketchSpan>,
    /// One density in `[0, 1]` per sentence. `None` disables highlighting.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub highlight_coeff: Option<Vec<f64>>,
}

impl DocumentSnapshot {
    pub fn is_empty(&self) -> bool {
        self.document.is_empty()
    }

    /// Describe every way this snapshot breaks its invariants. The renderer
    /// tolerates all of them; the list exists for logging.
    pub fn violations(&self) -> Vec<String> {
        let len = self.document.len();
        let mut out = Vec::new();
        for (n, span) in self.sketch.iter().enumerate() {
            if span.start > span.end || span.end >= len {
                out.push(format!(
                    "sketch span {n} [{}, {}] outside document of {len} sentences",
                    span.start, span.end
                ));
            }
        }
        if let Some(coeff) = &self.highlight_coeff {
            if coeff.len() != len {
                out.push(format!(
                    "highlight_coeff has {} entries for {len} sentences",
                    coeff.len()
                ));
            }
        }
        out
    }
}

// ---------------------------------------------------------------------------
// Inbound events
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DocumentEvent {
    pub id: String,
    #[serde(flatten)]
    pub snapshot: DocumentSnapshot,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct KillSessionEvent {
    pub id: String,
}

/// A canned response the user can pick instead of typing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuickReply {
    pub label: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ChatMessageEvent {
    pub id: String,
    pub message: String,
    #[serde(default)]
    pub options: Option<Vec<QuickReply>>,
}

/// A decoded push event from the backend.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundEvent {
    Document(DocumentEvent),
    KillSession(KillSessionEvent),
    Message(ChatMessageEvent),
}

impl InboundEvent {
    /// Decode a named channel event.
    ///
    /// # Returns
    /// - `Ok(Some(event))` for a known event with a well-formed payload.
    /// - `Ok(None)` for an event name this client does not handle.
    /// - `Err(WandError::Payload)` when the payload is malformed.
    pub fn decode(name: &str, payload: serde_json::Value) -> Result<Option<Self>, WandError> {
        let event = match name {
            EVENT_DOCUMENT => InboundEvent::Document(
                serde_json::from_value(payload).map_err(|e| WandError::payload(name, e))?,
            ),
            EVENT_KILL_SESSION => InboundEvent::KillSession(
                serde_json::from_value(payload).map_err(|e| WandError::payload(name, e))?,
            ),
            EVENT_MESSAGE => InboundEvent::Message(
                serde_json::from_value(payload).map_err(|e| WandError::payload(name, e))?,
            ),
            _ => return Ok(None),
        };
        Ok(Some(event))
    }

    /// The session identifier the event is addressed to.
    pub fn id(&self) -> &str {
        match self {
            InboundEvent::Document(e) => &e.id,
            InboundEvent::KillSession(e) => &e.id,
            InboundEvent::Message(e) => &e.id,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            InboundEvent::Document(_) => EVENT_DOCUMENT,
            InboundEvent::KillSession(_) => EVENT_KILL_SESSION,
            InboundEvent::Message(_) => EVENT_MESSAGE,
        }
    }
}

// ---------------------------------------------------------------------------
// Outbound bodies
// ---------------------------------------------------------------------------

/// Body of `POST /startup`. `mode` is passed through untouched.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StartupRequest {
    pub code: String,
    pub id: SessionId,
    pub mode: String,
}

/// Body of `POST /end_session`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EndSessionRequest {
    pub code: String,
    pub id: SessionId,
}

/// Payload of the outbound `chat_message` event.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutboundChat {
    pub message: String,
    pub code: String,
    pub id: SessionId,
}
