//! Fake backend for testing
//!
//! Serves in-memory sessions and scripted stream bodies instead of real HTTP calls.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;

use crate::api::{ApiError, Attachment, ByteStream, ChatBackend, ChatRequest, Message, Session};

/// Operation selector for injected failures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FakeOp {
    ListSessions,
    CreateSession,
    DeleteSession,
    ListMessages,
    Upload,
    OpenStream,
}

#[derive(Debug, Default)]
struct FakeState {
    sessions: Vec<Session>,
    messages: HashMap<String, Vec<Message>>,
    stream_chunks: Vec<Vec<u8>>,
    /// Fail the stream body after this many chunks
    stream_fails_after: Option<usize>,
    failures: HashSet<FakeOp>,
    chat_requests: Vec<ChatRequest>,
    uploads: Vec<(String, usize)>,
    next_id: usize,
}

/// In-memory backend (uses fixture data)
#[derive(Debug, Default)]
pub struct FakeBackend {
    state: Mutex<FakeState>,
}

impl FakeBackend {
    /// Create an empty backend
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the session list
    pub fn with_sessions(self, sessions: Vec<Session>) -> Self {
        self.lock().sessions = sessions;
        self
    }

    /// Seed the history of one session
    pub fn with_messages(self, session_id: &str, messages: Vec<Message>) -> Self {
        self.lock()
            .messages
            .insert(session_id.to_string(), messages);
        self
    }

    /// Script the body of every `open_stream` call
    pub fn with_stream<I, C>(self, chunks: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<Vec<u8>>,
    {
        self.lock().stream_chunks = chunks.into_iter().map(Into::into).collect();
        self
    }

    /// Break the stream body after `n` chunks have been delivered
    pub fn with_stream_failure_after(self, n: usize) -> Self {
        self.lock().stream_fails_after = Some(n);
        self
    }

    /// Make an operation fail with HTTP 500 until `recover` is called
    pub fn fail(&self, op: FakeOp) {
        self.lock().failures.insert(op);
    }

    /// Clear an injected failure
    pub fn recover(&self, op: FakeOp) {
        self.lock().failures.remove(&op);
    }

    /// Chat requests received so far
    pub fn chat_requests(&self) -> Vec<ChatRequest> {
        self.lock().chat_requests.clone()
    }

    /// (filename, byte count) of every upload received
    pub fn uploads(&self) -> Vec<(String, usize)> {
        self.lock().uploads.clone()
    }

    /// Current server-side session list
    pub fn sessions(&self) -> Vec<Session> {
        self.lock().sessions.clone()
    }

    fn lock(&self) -> MutexGuard<'_, FakeState> {
        // A panicking test thread must not hide the state from the others
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn check(&self, op: FakeOp) -> Result<(), ApiError> {
        if self.lock().failures.contains(&op) {
            return Err(ApiError::Http {
                status: 500,
                body: format!("injected failure: {:?}", op),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl ChatBackend for FakeBackend {
    async fn list_sessions(&self) -> Result<Vec<Session>, ApiError> {
        self.check(FakeOp::ListSessions)?;
        Ok(self.lock().sessions.clone())
    }

    async fn create_session(&self) -> Result<Session, ApiError> {
        self.check(FakeOp::CreateSession)?;
        let mut state = self.lock();
        state.next_id += 1;
        let session = Session {
            id: format!("session-{}", state.next_id),
            title: "New Chat".to_string(),
            updated_at: Some(chrono::Utc::now()),
        };
        state.sessions.insert(0, session.clone());
        Ok(session)
    }

    async fn delete_session(&self, session_id: &str) -> Result<(), ApiError> {
        self.check(FakeOp::DeleteSession)?;
        let mut state = self.lock();
        state.sessions.retain(|s| s.id != session_id);
        state.messages.remove(session_id);
        Ok(())
    }

    async fn list_messages(&self, session_id: &str) -> Result<Vec<Message>, ApiError> {
        self.check(FakeOp::ListMessages)?;
        Ok(self
            .lock()
            .messages
            .get(session_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn upload(&self, filename: &str, content: Vec<u8>) -> Result<Attachment, ApiError> {
        self.check(FakeOp::Upload)?;
        let mut state = self.lock();
        state.next_id += 1;
        state.uploads.push((filename.to_string(), content.len()));
        Ok(Attachment {
            id: format!("file-{}", state.next_id),
            filename: filename.to_string(),
            content_type: None,
            size: Some(content.len() as u64),
        })
    }

    async fn open_stream(&self, request: &ChatRequest) -> Result<ByteStream, ApiError> {
        self.check(FakeOp::OpenStream)?;
        let mut state = self.lock();
        state.chat_requests.push(request.clone());

        let mut items: Vec<Result<Bytes, ApiError>> = state
            .stream_chunks
            .iter()
            .cloned()
            .map(|chunk| Ok(Bytes::from(chunk)))
            .collect();
        if let Some(n) = state.stream_fails_after {
            items.truncate(n);
            items.push(Err(ApiError::Network("connection reset".to_string())));
        }

        Ok(futures::stream::iter(items).boxed())
    }
}
