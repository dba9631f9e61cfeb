//! Crate-level error type.
//!
//! Each variant carries enough context to diagnose the failure without
//! needing to inspect the originating error directly.

use crate::session::SessionState;

#[derive(Debug, thiserror::Error)]
pub enum WandError {
    /// `start_session` was called with an empty session code.
    #[error("session code must not be empty")]
    EmptyCode,

    /// The launch link carried no `mode` parameter.
    #[error("missing experiment parameters: no mode in the launch link")]
    MissingMode,

    /// An operation was attempted from a state that does not allow it.
    #[error("cannot {action} while session is {state}")]
    InvalidTransition {
        action: &'static str,
        state: SessionState,
    },

    /// A quick reply was picked by a number that is not on offer.
    #[error("no quick reply numbered {0}")]
    NoSuchQuickReply(usize),

    /// The real-time channel has been closed or released.
    #[error("real-time channel is closed")]
    ChannelClosed,

    /// The backend dropped the websocket while the session was still active.
    #[error("websocket to {url} closed by the backend while the session was active")]
    ConnectionLost { url: String },

    /// A launch link or backend address could not be parsed as a URL.
    #[error("invalid URL {url:?}: {detail}")]
    InvalidUrl { url: String, detail: String },

    /// The backend replied with a non-2xx HTTP status code.
    #[error("HTTP {status} from {url}")]
    Http { status: u16, url: String },

    /// A TCP-level or TLS-level connection could not be established.
    #[error("connection failed to {url}: {detail}")]
    Connect { url: String, detail: String },

    /// A channel frame was not a valid Engine.IO / Socket.IO packet.
    #[error("malformed packet {packet:?}: {detail}")]
    Packet { packet: String, detail: String },

    /// An event payload did not match the expected shape.
    #[error("malformed '{event}' payload: {detail}")]
    Payload { event: String, detail: String },

    #[error("failed to read config {path}: {detail}")]
    ConfigRead { path: String, detail: String },

    #[error("invalid config: {0}")]
    ConfigParse(String),
}

impl WandError {
    pub(crate) fn payload(event: &str, err: impl std::fmt::Display) -> Self {
        WandError::Payload {
            event: event.to_string(),
            detail: err.to_string(),
        }
    }

    pub(crate) fn invalid_url(url: &str, err: impl std::fmt::Display) -> Self {
        WandError::InvalidUrl {
            url: url.to_string(),
            detail: err.to_string(),
        }
    }

    pub(crate) fn packet(packet: &str, detail: impl Into<String>) -> Self {
        WandError::Packet {
            packet: packet.chars().take(64).collect(),
            detail: detail.into(),
        }
    }
}
