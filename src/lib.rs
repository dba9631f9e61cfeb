//! Client for Creative Wand co-creative writing sessions.
//!
//! A session is identified by a per-launch [`SessionId`]. The client starts
//! it over HTTP, then listens on one Socket.IO channel for `document`,
//! `message`, and `kill_session` pushes addressed to that id, and renders
//! the pushed document as a sentence/topic table with highlight colors.

pub mod app;
pub mod backend;
pub mod channel;
pub mod chat;
pub mod cli;
pub mod client;
pub mod config;
pub mod error;
pub mod launch;
pub mod protocol;
pub mod render;
pub mod screens;
pub mod session;
pub mod socketio;

pub use backend::{HttpBackend, SessionBackend};
pub use channel::{ChannelHandle, Listeners, Subscription};
pub use client::{SessionClient, Update};
pub use config::ClientConfig;
pub use error::WandError;
pub use protocol::{DocumentSnapshot, InboundEvent, QuickReply, SketchSpan};
pub use render::{render_document, RenderedDocument, Rgb};
pub use session::{SessionId, SessionState};
