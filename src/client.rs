//! Session channel client.
//!
//! [`SessionClient`] owns the session identifier, the lifecycle state, the
//! current document snapshot, the chat log, and the one real-time
//! connection. Inbound events are filtered by session identifier before
//! anything is touched, so one backend can multiplex many browser sessions
//! over a shared channel.

use tracing::{debug, info, trace, warn};

use crate::backend::SessionBackend;
use crate::channel::ChannelHandle;
use crate::chat::ChatLog;
use crate::error::WandError;
use crate::protocol::{
    DocumentSnapshot, EndSessionRequest, InboundEvent, OutboundChat, StartupRequest,
    EVENT_CHAT_MESSAGE,
};
use crate::render::{render_document, RenderedDocument, Rgb};
use crate::session::{SessionId, SessionState};

/// What an applied inbound event changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Update {
    Document,
    Chat,
    SessionKilled,
}

pub struct SessionClient<B: SessionBackend> {
    id: SessionId,
    code: String,
    state: SessionState,
    snapshot: DocumentSnapshot,
    chat: ChatLog,
    channel: Option<ChannelHandle>,
    backend: B,
}

impl<B: SessionBackend> SessionClient<B> {
    pub fn new(id: SessionId, backend: B) -> Self {
        SessionClient {
            id,
            code: String::new(),
            state: SessionState::Unstarted,
            snapshot: DocumentSnapshot::default(),
            chat: ChatLog::new(),
            channel: None,
            backend,
        }
    }

    pub fn id(&self) -> &SessionId {
        &self.id
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn snapshot(&self) -> &DocumentSnapshot {
        &self.snapshot
    }

    pub fn chat(&self) -> &ChatLog {
        &self.chat
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn is_connected(&self) -> bool {
        self.channel.as_ref().is_some_and(ChannelHandle::is_open)
    }

    /// Render the current snapshot.
    pub fn render(&self, base: Rgb) -> RenderedDocument {
        render_document(&self.snapshot, base)
    }

    /// Hand the client its connection. A previously attached connection is
    /// closed first, so its listeners can no longer fire.
    pub fn attach_channel(&mut self, mut channel: ChannelHandle) -> Result<(), WandError> {
        if self.state.is_ended() {
            channel.close();
            return Err(WandError::InvalidTransition {
                action: "attach a channel",
                state: self.state,
            });
        }
        self.release_channel();
        debug!(session_id = %self.id, url = %channel.url(), "channel attached");
        self.channel = Some(channel);
        Ok(())
    }

    /// Start the session: `Unstarted -> Active`.
    ///
    /// The startup request is issued at most once and is fire-and-forget.
    /// A missing `mode` or an empty `code` is rejected before anything is
    /// sent.
    pub fn start_session(&mut self, code: &str, mode: Option<&str>) -> Result<(), WandError> {
        if self.state != SessionState::Unstarted {
            return Err(WandError::InvalidTransition {
                action: "start session",
                state: self.state,
            });
        }
        let mode = mode.ok_or(WandError::MissingMode)?;
        if code.is_empty() {
            return Err(WandError::EmptyCode);
        }

        self.code = code.to_string();
        self.backend.startup(StartupRequest {
            code: self.code.clone(),
            id: self.id.clone(),
            mode: mode.to_string(),
        });
        self.state = SessionState::Active;
        info!(session_id = %self.id, code = %self.code, mode = %mode, "session started");
        Ok(())
    }

    /// End the session on the user's request: `Active -> Ended`.
    pub fn end_session(&mut self) -> Result<(), WandError> {
        if !self.state.is_active() {
            return Err(WandError::InvalidTransition {
                action: "end session",
                state: self.state,
            });
        }
        self.backend.end_session(EndSessionRequest {
            code: self.code.clone(),
            id: self.id.clone(),
        });
        self.state = SessionState::Ended;
        self.release_channel();
        info!(session_id = %self.id, "session ended by user");
        Ok(())
    }

    /// Emit a chat message. No acknowledgement is awaited.
    pub fn send_chat_message(&mut self, text: &str) -> Result<(), WandError> {
        let channel = self
            .channel
            .as_ref()
            .filter(|c| c.is_open())
            .ok_or(WandError::ChannelClosed)?;
        channel.emit(
            EVENT_CHAT_MESSAGE,
            &OutboundChat {
                message: text.to_string(),
                code: self.code.clone(),
                id: self.id.clone(),
            },
        )?;
        self.chat.push_user(text);
        Ok(())
    }

    /// Pick a quick reply by its 1-based number. The offered set is cleared
    /// and the reply's value is sent as a chat message.
    pub fn choose_quick_reply(&mut self, number: usize) -> Result<(), WandError> {
        let value = self
            .chat
            .quick_reply(number)
            .map(|r| r.value.clone())
            .ok_or(WandError::NoSuchQuickReply(number))?;
        self.chat.clear_quick_replies();
        self.send_chat_message(&value)
    }

    /// Decode a raw channel event and apply it.
    pub fn handle_raw(
        &mut self,
        name: &str,
        payload: serde_json::Value,
    ) -> Result<Option<Update>, WandError> {
        match InboundEvent::decode(name, payload)? {
            Some(event) => Ok(self.handle_event(event)),
            None => {
                trace!(event = %name, "unhandled event");
                Ok(None)
            }
        }
    }

    /// Apply an inbound event addressed to this session.
    ///
    /// Returns `None` when the event was dropped: foreign identifier, or the
    /// connection has already been released.
    pub fn handle_event(&mut self, event: InboundEvent) -> Option<Update> {
        if self.channel.is_none() {
            trace!(session_id = %self.id, event = event.name(), "no channel, event dropped");
            return None;
        }
        if !self.id.matches(event.id()) {
            trace!(session_id = %self.id, foreign = %event.id(), "foreign session, event dropped");
            return None;
        }

        match event {
            InboundEvent::Document(doc) => {
                for problem in doc.snapshot.violations() {
                    warn!(session_id = %self.id, problem = %problem, "inconsistent document snapshot");
                }
                self.snapshot = doc.snapshot;
                debug!(session_id = %self.id, sentences = self.snapshot.document.len(), "document replaced");
                Some(Update::Document)
            }
            InboundEvent::KillSession(_) => {
                self.snapshot = DocumentSnapshot::default();
                self.state = SessionState::Ended;
                self.release_channel();
                info!(session_id = %self.id, "session killed by backend");
                Some(Update::SessionKilled)
            }
            InboundEvent::Message(msg) => {
                self.chat.push_wand(msg.message);
                self.chat.set_quick_replies(msg.options);
                Some(Update::Chat)
            }
        }
    }

    fn release_channel(&mut self) {
        if let Some(mut channel) = self.channel.take() {
            channel.close();
        }
    }
}
