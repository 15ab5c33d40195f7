//! Backend API: REST and streaming contract of the chat service
//!
//! `ChatBackend` is the seam between client state and the network:
//! - `HttpBackend` talks to the real service with reqwest
//! - `FakeBackend` serves scripted responses for tests

pub mod fake;
pub mod http;
pub mod types;

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;

pub use fake::{FakeBackend, FakeOp};
pub use http::HttpBackend;
pub use types::{Attachment, ChatRequest, Message, Role, Session};

/// Raw body chunks of a streaming reply, in arrival order
pub type ByteStream = BoxStream<'static, Result<Bytes, ApiError>>;

/// Backend call errors
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Connection refused, DNS failure, timeout, reset mid-body
    #[error("Network error: {0}")]
    Network(String),

    /// Non-success status
    #[error("HTTP error {status}: {body}")]
    Http { status: u16, body: String },

    /// Body did not match the expected shape
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Bad base URL or client construction failure
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Local file could not be read for upload
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if let Some(status) = err.status() {
            ApiError::Http {
                status: status.as_u16(),
                body: err.to_string(),
            }
        } else if err.is_decode() {
            ApiError::InvalidResponse(err.to_string())
        } else if err.is_builder() {
            ApiError::Configuration(err.to_string())
        } else {
            ApiError::Network(err.to_string())
        }
    }
}

/// Operations the client needs from the chat service
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// `GET /sessions`
    async fn list_sessions(&self) -> Result<Vec<Session>, ApiError>;

    /// `POST /sessions`
    async fn create_session(&self) -> Result<Session, ApiError>;

    /// `DELETE /sessions/{id}`
    async fn delete_session(&self, session_id: &str) -> Result<(), ApiError>;

    /// `GET /sessions/{id}/messages`
    async fn list_messages(&self, session_id: &str) -> Result<Vec<Message>, ApiError>;

    /// `POST /upload` (multipart, field `file`)
    async fn upload(&self, filename: &str, content: Vec<u8>) -> Result<Attachment, ApiError>;

    /// `POST /chat/stream`
    ///
    /// Resolves once response headers arrive with a success status; the body
    /// is returned unparsed.
    async fn open_stream(&self, request: &ChatRequest) -> Result<ByteStream, ApiError>;
}
