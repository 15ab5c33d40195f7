//! Chat state container
//!
//! Owns the session store, message log, attachment staging, preview and the
//! stream state machine. All mutation goes through transition functions:
//! - user operations (`send`, `select_session`, ...) return `Action`s
//! - `apply` folds one `ClientEvent` into the state and may return more
//!
//! Nothing here performs I/O, so every transition is testable by feeding
//! events by hand.
//!
//! Stream lifecycle: `Idle -> Sending -> Streaming -> Closed(outcome)`.
//! Stream events are applied only while their ticket is current and its
//! session is still the active one.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use tracing::{debug, error, info, warn};

use crate::api::{ApiError, Attachment, ChatRequest, Message, Role, Session};
use crate::attachments::AttachmentStaging;
use crate::events::{Action, ClientEvent, StreamTicket};
use crate::message_log::MessageLog;
use crate::preview::Preview;
use crate::session::SessionStore;
use crate::stream::{DecodedLine, LineDecoder, StreamFrame};

/// Shown in place of the reply when the request or its body fails
pub const STREAM_FAILURE_TEXT: &str = "Sorry, I encountered an error. Please try again.";

/// Oldest notices are dropped beyond this
pub const MAX_NOTICES: usize = 20;

/// Why `send` refused
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SendError {
    #[error("a reply is still in progress")]
    Busy,
    #[error("nothing to send")]
    Empty,
}

/// In-flight stream bookkeeping
#[derive(Debug, Clone)]
pub struct StreamSession {
    pub ticket: StreamTicket,
    /// Assistant message receiving the snapshots
    pub message_id: String,
    decoder: LineDecoder,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamOutcome {
    Completed,
    Failed,
    /// Active session changed before the stream ended
    Abandoned,
}

#[derive(Debug, Clone, Default)]
pub enum StreamPhase {
    #[default]
    Idle,
    /// Request sent, waiting for response headers
    Sending(StreamSession),
    Streaming(StreamSession),
    Closed(StreamOutcome),
}

impl StreamPhase {
    fn session(&self) -> Option<&StreamSession> {
        match self {
            StreamPhase::Sending(s) | StreamPhase::Streaming(s) => Some(s),
            _ => None,
        }
    }

    fn session_mut(&mut self) -> Option<&mut StreamSession> {
        match self {
            StreamPhase::Sending(s) | StreamPhase::Streaming(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.session().is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Warning,
    Error,
}

/// Transient, non-fatal message for the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub text: String,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Default)]
pub struct ChatState {
    sessions: SessionStore,
    log: MessageLog,
    staging: AttachmentStaging,
    preview: Preview,
    phase: StreamPhase,
    notices: VecDeque<Notice>,
    /// Text waiting for an implicitly created session
    pending_send: Option<String>,
    /// Session whose history was requested most recently
    pending_load: Option<String>,
    next_ticket: u64,
}

impl ChatState {
    pub fn new() -> Self {
        Self::default()
    }

    // ---- reads -------------------------------------------------------------

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    pub fn active_session_id(&self) -> Option<&str> {
        self.sessions.active_id()
    }

    pub fn log(&self) -> &MessageLog {
        &self.log
    }

    /// Messages of the active session in append order
    pub fn messages(&self) -> &[Message] {
        self.log.messages()
    }

    pub fn staged(&self) -> &[Attachment] {
        self.staging.staged()
    }

    pub fn preview(&self) -> &Preview {
        &self.preview
    }

    pub fn phase(&self) -> &StreamPhase {
        &self.phase
    }

    pub fn is_streaming(&self) -> bool {
        self.phase.is_active()
    }

    /// Sending is allowed only with no stream and no pending implicit create
    pub fn can_send(&self) -> bool {
        matches!(self.phase, StreamPhase::Idle | StreamPhase::Closed(_))
            && self.pending_send.is_none()
    }

    pub fn notices(&self) -> impl Iterator<Item = &Notice> {
        self.notices.iter()
    }

    pub fn latest_notice(&self) -> Option<&Notice> {
        self.notices.back()
    }

    // ---- user operations ---------------------------------------------------

    /// Refresh the session list
    pub fn list_sessions(&self) -> Vec<Action> {
        vec![Action::FetchSessions]
    }

    /// Ask the backend for a new, empty session
    ///
    /// Local state is switched over only once the backend answers.
    pub fn create_session(&mut self) -> Vec<Action> {
        if self.pending_send.take().is_some() {
            debug!("explicit create supersedes pending send");
        }
        vec![Action::CreateSession]
    }

    /// Load a session's history and make it active once it arrives
    pub fn select_session(&mut self, session_id: &str) -> Vec<Action> {
        if self.sessions.is_active(session_id) && self.is_streaming() {
            debug!(session_id, "session already active with a reply in progress");
            return Vec::new();
        }
        self.pending_load = Some(session_id.to_string());
        vec![Action::LoadMessages {
            session_id: session_id.to_string(),
        }]
    }

    pub fn delete_session(&mut self, session_id: &str) -> Vec<Action> {
        vec![Action::DeleteSession {
            session_id: session_id.to_string(),
        }]
    }

    /// Upload a local file into the staging list
    pub fn stage_file(&mut self, path: impl Into<std::path::PathBuf>) -> Vec<Action> {
        vec![Action::Upload {
            generation: self.staging.generation(),
            path: path.into(),
        }]
    }

    /// Remove a staged attachment before sending; no-op if absent
    pub fn unstage(&mut self, attachment_id: &str) -> Option<Attachment> {
        self.staging.unstage(attachment_id)
    }

    /// Send a message with every staged attachment
    ///
    /// Without an active session a session is created first and the message
    /// goes out once it exists.
    pub fn send(&mut self, text: &str) -> Result<Vec<Action>, SendError> {
        if !self.can_send() {
            return Err(SendError::Busy);
        }
        let text = text.trim();
        if text.is_empty() && self.staging.is_empty() {
            return Err(SendError::Empty);
        }

        match self.sessions.active_id().map(str::to_string) {
            Some(session_id) => Ok(self.begin_send(&session_id, text)),
            None => {
                info!("no active session, creating one before sending");
                self.pending_send = Some(text.to_string());
                Ok(vec![Action::CreateSession])
            }
        }
    }

    pub fn dismiss_preview(&mut self) {
        self.preview.dismiss();
    }

    pub fn show_preview(&mut self) -> bool {
        self.preview.show()
    }

    pub fn dismiss_notices(&mut self) {
        self.notices.clear();
    }

    pub fn push_notice(&mut self, level: NoticeLevel, text: impl Into<String>) {
        if self.notices.len() == MAX_NOTICES {
            self.notices.pop_front();
        }
        self.notices.push_back(Notice {
            level,
            text: text.into(),
            at: Utc::now(),
        });
    }

    // ---- event application -------------------------------------------------

    /// Fold one runtime event into the state
    pub fn apply(&mut self, event: ClientEvent) -> Vec<Action> {
        debug!(kind = event.kind(), "applying event");
        match event {
            ClientEvent::SessionsLoaded(result) => {
                match result {
                    Ok(sessions) => self.sessions.replace_all(sessions),
                    Err(e) => self.resource_failure("load sessions", &e),
                }
                Vec::new()
            }
            ClientEvent::SessionCreated(result) => self.on_session_created(result),
            ClientEvent::MessagesLoaded { session_id, result } => {
                self.on_messages_loaded(&session_id, result);
                Vec::new()
            }
            ClientEvent::SessionDeleted { session_id, result } => {
                self.on_session_deleted(&session_id, result)
            }
            ClientEvent::AttachmentUploaded {
                generation,
                filename,
                result,
            } => {
                self.on_attachment_uploaded(generation, &filename, result);
                Vec::new()
            }
            ClientEvent::StreamOpened { ticket } => {
                if self.is_current(&ticket) {
                    debug!(ticket = ticket.id, "stream opened");
                    self.mark_streaming();
                }
                Vec::new()
            }
            ClientEvent::StreamChunk { ticket, bytes } => {
                if self.is_current(&ticket) {
                    self.on_chunk(&bytes);
                }
                Vec::new()
            }
            ClientEvent::StreamEnded { ticket } => {
                if self.is_current(&ticket) {
                    self.on_stream_ended();
                }
                Vec::new()
            }
            ClientEvent::StreamFailed { ticket, error } => {
                if self.is_current(&ticket) {
                    self.on_stream_failed(&error);
                } else {
                    debug!(ticket = ticket.id, %error, "stale stream failed");
                }
                Vec::new()
            }
        }
    }

    // ---- internals ---------------------------------------------------------

    fn begin_send(&mut self, session_id: &str, text: &str) -> Vec<Action> {
        let files = self.staging.drain_for_send();
        let files = (!files.is_empty()).then_some(files);

        let mut user_message = Message::new(session_id, Role::User, text);
        user_message.files = files.clone();
        self.log.append(user_message);
        let message_id = self
            .log
            .begin_assistant(Message::new(session_id, Role::Assistant, ""));

        self.next_ticket += 1;
        let ticket = StreamTicket {
            id: self.next_ticket,
            session_id: session_id.to_string(),
        };
        info!(
            ticket = ticket.id,
            session_id,
            attachments = files.as_ref().map_or(0, Vec::len),
            "sending message"
        );
        self.phase = StreamPhase::Sending(StreamSession {
            ticket: ticket.clone(),
            message_id,
            decoder: LineDecoder::new(),
        });

        vec![Action::OpenStream {
            ticket,
            request: ChatRequest {
                message: text.to_string(),
                session_id: session_id.to_string(),
                files,
            },
        }]
    }

    /// Switch every per-session component to `session_id`
    fn activate(&mut self, session_id: &str, messages: Vec<Message>) {
        self.abandon_stream();
        self.sessions.set_active(Some(session_id.to_string()));
        self.log = MessageLog::for_session(session_id, messages);
        self.staging.reset();
        self.preview.clear();
    }

    /// Stop applying updates from the in-flight stream
    ///
    /// The network task keeps running; its events no longer match.
    fn abandon_stream(&mut self) {
        if let Some(session) = self.phase.session() {
            info!(ticket = session.ticket.id, "abandoning in-flight stream");
            self.log.seal_tail();
            self.phase = StreamPhase::Closed(StreamOutcome::Abandoned);
        }
    }

    fn is_current(&self, ticket: &StreamTicket) -> bool {
        let current = self
            .phase
            .session()
            .is_some_and(|s| s.ticket == *ticket);
        let same_session = self.sessions.is_active(&ticket.session_id)
            && self.log.session_id() == Some(ticket.session_id.as_str());
        if !(current && same_session) {
            debug!(ticket = ticket.id, session_id = %ticket.session_id, "dropping stale stream event");
            return false;
        }
        true
    }

    fn on_session_created(&mut self, result: Result<Session, ApiError>) -> Vec<Action> {
        let session = match result {
            Ok(session) => session,
            Err(e) => {
                if self.pending_send.take().is_some() {
                    self.resource_failure("start a session, message not sent", &e);
                } else {
                    self.resource_failure("create session", &e);
                }
                return Vec::new();
            }
        };

        info!(session_id = %session.id, "session created");
        let session_id = session.id.clone();
        self.sessions.insert_created(session);

        let mut actions = match self.pending_send.take() {
            Some(text) => {
                // Staged files belong to the message that triggered the create
                let staged = std::mem::take(&mut self.staging);
                self.activate(&session_id, Vec::new());
                self.staging = staged;
                self.begin_send(&session_id, &text)
            }
            None => {
                self.activate(&session_id, Vec::new());
                Vec::new()
            }
        };
        actions.push(Action::FetchSessions);
        actions
    }

    fn on_messages_loaded(&mut self, session_id: &str, result: Result<Vec<Message>, ApiError>) {
        if self.pending_load.as_deref() != Some(session_id) {
            debug!(session_id, "ignoring superseded history load");
            return;
        }
        self.pending_load = None;
        match result {
            Ok(messages) => {
                info!(session_id, count = messages.len(), "session selected");
                self.activate(session_id, messages);
            }
            Err(e) => self.resource_failure("load messages", &e),
        }
    }

    fn on_session_deleted(&mut self, session_id: &str, result: Result<(), ApiError>) -> Vec<Action> {
        if let Err(e) = result {
            self.resource_failure("delete session", &e);
            return Vec::new();
        }
        info!(session_id, "session deleted");
        if self.pending_load.as_deref() == Some(session_id) {
            self.pending_load = None;
        }
        if self.sessions.remove(session_id) {
            self.abandon_stream();
            self.log.clear();
            self.staging.reset();
            self.preview.clear();
        }
        vec![Action::FetchSessions]
    }

    fn on_attachment_uploaded(
        &mut self,
        generation: u64,
        filename: &str,
        result: Result<Attachment, ApiError>,
    ) {
        if generation != self.staging.generation() {
            debug!(filename, "discarding upload for a previous session");
            return;
        }
        match result {
            Ok(attachment) => {
                info!(id = %attachment.id, filename, "attachment staged");
                self.staging.push(attachment);
            }
            Err(e) => {
                warn!(filename, error = %e, "upload failed");
                self.push_notice(NoticeLevel::Error, format!("Upload of {filename} failed: {e}"));
            }
        }
    }

    /// `Sending -> Streaming`; other phases are left alone
    fn mark_streaming(&mut self) {
        if matches!(self.phase, StreamPhase::Sending(_)) {
            if let StreamPhase::Sending(session) = std::mem::take(&mut self.phase) {
                self.phase = StreamPhase::Streaming(session);
            }
        }
    }

    fn on_chunk(&mut self, bytes: &[u8]) {
        self.mark_streaming();
        let lines = match self.phase.session_mut() {
            Some(session) => session.decoder.push(bytes),
            None => return,
        };
        for line in lines {
            match line {
                DecodedLine::Frame(frame) => self.apply_frame(frame),
                DecodedLine::Ignored => {}
                DecodedLine::Malformed { line, reason } => {
                    warn!(%line, %reason, "skipping malformed stream record");
                }
            }
        }
    }

    fn apply_frame(&mut self, frame: StreamFrame) {
        if let Some(message) = frame.error {
            warn!(%message, "server reported stream error");
            self.push_notice(NoticeLevel::Warning, format!("Assistant error: {message}"));
        }
        if let Some(content) = frame.content {
            self.apply_snapshot(content);
        }
        if frame.done == Some(true) {
            debug!("server marked reply done");
        }
    }

    /// Replace the in-flight reply with a full-content snapshot
    fn apply_snapshot(&mut self, content: String) {
        let Some(mut message) = self.log.in_flight_message().cloned() else {
            warn!("snapshot without an in-flight message");
            return;
        };
        message.content = content;
        match self.log.replace_tail(message) {
            Ok(true) => {
                if let Some(tail) = self.log.last() {
                    if self.preview.update_from(&tail.content) {
                        debug!("preview updated from reply");
                    }
                }
            }
            Ok(false) => {}
            Err(e) => warn!(error = %e, "snapshot rejected"),
        }
    }

    fn on_stream_ended(&mut self) {
        if let Some(session) = self.phase.session_mut() {
            let discarded = session.decoder.finish();
            if discarded > 0 {
                debug!(bytes = discarded, "discarding unterminated final line");
            }
            info!(ticket = session.ticket.id, "stream completed");
        }
        self.log.seal_tail();
        self.phase = StreamPhase::Closed(StreamOutcome::Completed);
    }

    fn on_stream_failed(&mut self, err: &ApiError) {
        error!(error = %err, "stream failed");
        if let Some(mut message) = self.log.in_flight_message().cloned() {
            message.content = STREAM_FAILURE_TEXT.to_string();
            if let Err(e) = self.log.replace_tail(message) {
                warn!(error = %e, "could not mark reply as failed");
            }
        }
        self.log.seal_tail();
        self.phase = StreamPhase::Closed(StreamOutcome::Failed);
        self.push_notice(NoticeLevel::Error, format!("Request failed: {err}"));
    }

    fn resource_failure(&mut self, what: &str, err: &ApiError) {
        warn!(error = %err, "could not {what}");
        self.push_notice(NoticeLevel::Error, format!("Could not {what}: {err}"));
    }
}
