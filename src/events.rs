//! Actions and client events
//!
//! State transitions never touch the network. They return `Action`s; the
//! runtime performs them and reports back with `ClientEvent`s over an
//! unbounded channel that the UI thread drains between frames.

use std::path::PathBuf;

use bytes::Bytes;
use tokio::sync::mpsc;

use crate::api::{ApiError, Attachment, ChatRequest, Message, Session};

pub type EventSender = mpsc::UnboundedSender<ClientEvent>;
pub type EventReceiver = mpsc::UnboundedReceiver<ClientEvent>;

/// Identity of one send-and-stream cycle
///
/// Every stream event carries the ticket it was opened with. The state
/// container drops events whose ticket is no longer current.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StreamTicket {
    pub id: u64,
    /// Session the request was sent to
    pub session_id: String,
}

/// Backend work requested by a state transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    FetchSessions,
    CreateSession,
    LoadMessages {
        session_id: String,
    },
    DeleteSession {
        session_id: String,
    },
    /// Read a local file and upload it
    Upload {
        generation: u64,
        path: PathBuf,
    },
    OpenStream {
        ticket: StreamTicket,
        request: ChatRequest,
    },
}

/// Result of an action, delivered back to the state container
#[derive(Debug)]
pub enum ClientEvent {
    SessionsLoaded(Result<Vec<Session>, ApiError>),
    SessionCreated(Result<Session, ApiError>),
    MessagesLoaded {
        session_id: String,
        result: Result<Vec<Message>, ApiError>,
    },
    SessionDeleted {
        session_id: String,
        result: Result<(), ApiError>,
    },
    AttachmentUploaded {
        generation: u64,
        filename: String,
        result: Result<Attachment, ApiError>,
    },
    /// Response headers arrived with a success status
    StreamOpened {
        ticket: StreamTicket,
    },
    StreamChunk {
        ticket: StreamTicket,
        bytes: Bytes,
    },
    /// Transport end-of-stream
    StreamEnded {
        ticket: StreamTicket,
    },
    /// Request rejected or body interrupted
    StreamFailed {
        ticket: StreamTicket,
        error: ApiError,
    },
}

impl ClientEvent {
    /// Ticket of a stream event; `None` for resource events
    pub fn ticket(&self) -> Option<&StreamTicket> {
        match self {
            ClientEvent::StreamOpened { ticket }
            | ClientEvent::StreamChunk { ticket, .. }
            | ClientEvent::StreamEnded { ticket }
            | ClientEvent::StreamFailed { ticket, .. } => Some(ticket),
            _ => None,
        }
    }

    /// Short name for log records
    pub fn kind(&self) -> &'static str {
        match self {
            ClientEvent::SessionsLoaded(_) => "sessions_loaded",
            ClientEvent::SessionCreated(_) => "session_created",
            ClientEvent::MessagesLoaded { .. } => "messages_loaded",
            ClientEvent::SessionDeleted { .. } => "session_deleted",
            ClientEvent::AttachmentUploaded { .. } => "attachment_uploaded",
            ClientEvent::StreamOpened { .. } => "stream_opened",
            ClientEvent::StreamChunk { .. } => "stream_chunk",
            ClientEvent::StreamEnded { .. } => "stream_ended",
            ClientEvent::StreamFailed { .. } => "stream_failed",
        }
    }

    /// True for events that end a stream
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ClientEvent::StreamEnded { .. } | ClientEvent::StreamFailed { .. }
        )
    }
}
