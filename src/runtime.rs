//! Action executor
//!
//! Runs each `Action` as a tokio task against a `ChatBackend` and reports the
//! result as a `ClientEvent`. Tasks never touch `ChatState`; the receiving
//! side applies events one at a time.

use std::path::Path;
use std::sync::Arc;

use futures::StreamExt;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::api::{ApiError, ChatBackend, ChatRequest};
use crate::events::{Action, ClientEvent, EventReceiver, EventSender, StreamTicket};

/// Spawns backend work and feeds results back through a channel
pub struct Runtime<B: ChatBackend + 'static> {
    backend: Arc<B>,
    handle: Handle,
    tx: EventSender,
}

impl<B: ChatBackend + 'static> Runtime<B> {
    /// Create a runtime spawning onto `handle`, plus the event receiver
    pub fn new(backend: Arc<B>, handle: Handle) -> (Self, EventReceiver) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                backend,
                handle,
                tx,
            },
            rx,
        )
    }

    pub fn backend(&self) -> &Arc<B> {
        &self.backend
    }

    /// Start one action in the background
    pub fn dispatch(&self, action: Action) {
        debug!(?action, "dispatching");
        let backend = Arc::clone(&self.backend);
        let tx = self.tx.clone();
        self.handle.spawn(execute(backend, action, tx));
    }

    pub fn dispatch_all(&self, actions: impl IntoIterator<Item = Action>) {
        for action in actions {
            self.dispatch(action);
        }
    }
}

/// Send an event; false once the receiving side is gone
fn emit(tx: &EventSender, event: ClientEvent) -> bool {
    if tx.send(event).is_err() {
        debug!("event receiver dropped");
        return false;
    }
    true
}

async fn execute<B: ChatBackend>(backend: Arc<B>, action: Action, tx: EventSender) {
    match action {
        Action::FetchSessions => {
            let result = backend.list_sessions().await;
            emit(&tx, ClientEvent::SessionsLoaded(result));
        }
        Action::CreateSession => {
            let result = backend.create_session().await;
            emit(&tx, ClientEvent::SessionCreated(result));
        }
        Action::LoadMessages { session_id } => {
            let result = backend.list_messages(&session_id).await;
            emit(&tx, ClientEvent::MessagesLoaded { session_id, result });
        }
        Action::DeleteSession { session_id } => {
            let result = backend.delete_session(&session_id).await;
            emit(&tx, ClientEvent::SessionDeleted { session_id, result });
        }
        Action::Upload { generation, path } => {
            let filename = display_name(&path);
            let result = match tokio::fs::read(&path).await {
                Ok(content) => backend.upload(&filename, content).await,
                Err(e) => Err(ApiError::Io(e)),
            };
            emit(
                &tx,
                ClientEvent::AttachmentUploaded {
                    generation,
                    filename,
                    result,
                },
            );
        }
        Action::OpenStream { ticket, request } => {
            pump_stream(&*backend, ticket, &request, &tx).await;
        }
    }
}

/// Forward a streaming reply chunk by chunk
///
/// Runs to completion even if the stream was abandoned; the receiver decides
/// what to keep.
async fn pump_stream<B: ChatBackend + ?Sized>(
    backend: &B,
    ticket: StreamTicket,
    request: &ChatRequest,
    tx: &EventSender,
) {
    let mut body = match backend.open_stream(request).await {
        Ok(body) => body,
        Err(error) => {
            emit(tx, ClientEvent::StreamFailed { ticket, error });
            return;
        }
    };
    if !emit(
        tx,
        ClientEvent::StreamOpened {
            ticket: ticket.clone(),
        },
    ) {
        return;
    }

    while let Some(chunk) = body.next().await {
        match chunk {
            Ok(bytes) => {
                let event = ClientEvent::StreamChunk {
                    ticket: ticket.clone(),
                    bytes,
                };
                if !emit(tx, event) {
                    return;
                }
            }
            Err(error) => {
                warn!(ticket = ticket.id, %error, "stream body interrupted");
                emit(tx, ClientEvent::StreamFailed { ticket, error });
                return;
            }
        }
    }
    emit(tx, ClientEvent::StreamEnded { ticket });
}

/// Name sent to the backend for an uploaded file
fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
