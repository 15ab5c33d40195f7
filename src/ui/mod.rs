//! Terminal UI
//!
//! The UI is a presentation adapter only:
//! - NO network calls (commands queue actions, the runtime runs them)
//! - State changes go through `ChatState` transitions
//!
//! Input model:
//! - Text without "/" is sent as a chat message
//! - Commands start with "/": /new, /sessions, /open, /delete, /attach,
//!   /detach, /preview, /hide, /dismiss, /help, /quit

pub mod handlers;
pub mod input;
pub mod state;
pub mod view;

// Re-exports
pub use input::{parse_command, render_help, Command};
pub use state::{App, AppState};
pub use view::{draw, render};

/// UI result type
pub type Result<T> = std::result::Result<T, Error>;

/// UI errors
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Terminal setup failed: {0}")]
    Terminal(String),
}
