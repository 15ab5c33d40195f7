//! OdinChat: terminal client for a streaming chat backend
//!
//! The client keeps one conversation in view, streams assistant replies
//! over a server-sent-events style body, stages file attachments and shows
//! the first HTML block of a reply in a preview panel.
//!
//! `state::ChatState` owns every client-side transition. Frontends (the
//! TUI in `ui`, the one-shot modes in `cli`) feed it commands and backend
//! events; `runtime::Runtime` performs the I/O it asks for.

pub mod api;
pub mod attachments;
pub mod cli;
pub mod config;
pub mod events;
pub mod logging;
pub mod message_log;
pub mod preview;
pub mod runtime;
pub mod session;
pub mod state;
pub mod stream;
pub mod ui;

// Re-export the backend contract
pub use api::{ApiError, Attachment, ChatBackend, ChatRequest, HttpBackend, Message, Role, Session};

// Re-export client state
pub use events::{Action, ClientEvent, StreamTicket};
pub use state::{ChatState, Notice, NoticeLevel, SendError, StreamOutcome, StreamPhase};

// Re-export the stream decoder
pub use stream::{parse_line, DecodedLine, LineDecoder, StreamFrame};

pub use config::{Config, ConfigError};
pub use runtime::Runtime;
