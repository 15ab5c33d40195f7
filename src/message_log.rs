//! Message log for the active session
//!
//! Append-only, except for the in-flight assistant message at the tail which
//! the stream engine rewrites with each content snapshot.

use crate::api::Message;

/// Tail mutation rejected
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LogError {
    #[error("message log is empty")]
    Empty,

    #[error("tail message is not from the assistant")]
    TailNotAssistant,

    #[error("tail message {0} is not the in-flight reply")]
    TailNotInFlight(String),

    #[error("no stream is writing to this log")]
    NoStreamActive,
}

#[derive(Debug, Default, Clone)]
pub struct MessageLog {
    session_id: Option<String>,
    messages: Vec<Message>,
    /// Id of the assistant message currently being streamed into
    in_flight: Option<String>,
}

impl MessageLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the log wholesale with a loaded history
    pub fn for_session(session_id: &str, messages: Vec<Message>) -> Self {
        Self {
            session_id: Some(session_id.to_string()),
            messages,
            in_flight: None,
        }
    }

    /// Session the messages belong to
    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// Forget everything, including the in-flight marker
    pub fn clear(&mut self) {
        self.session_id = None;
        self.messages.clear();
        self.in_flight = None;
    }

    pub fn append(&mut self, message: Message) {
        if self.session_id.is_none() {
            self.session_id = Some(message.session_id.clone());
        }
        self.messages.push(message);
    }

    /// Append an empty assistant message and mark it as the stream target
    ///
    /// Returns the new message id.
    pub fn begin_assistant(&mut self, message: Message) -> String {
        let id = message.id.clone();
        self.append(message);
        self.in_flight = Some(id.clone());
        id
    }

    /// Replace the in-flight tail message
    ///
    /// Returns `Ok(false)` when `message` equals the current tail, so repeated
    /// snapshots leave the log untouched.
    pub fn replace_tail(&mut self, message: Message) -> Result<bool, LogError> {
        let in_flight = self.in_flight.as_deref().ok_or(LogError::NoStreamActive)?;
        let tail = self.messages.last_mut().ok_or(LogError::Empty)?;
        if !tail.is_assistant() {
            return Err(LogError::TailNotAssistant);
        }
        if tail.id != in_flight || message.id != in_flight {
            return Err(LogError::TailNotInFlight(tail.id.clone()));
        }
        if *tail == message {
            return Ok(false);
        }
        *tail = message;
        Ok(true)
    }

    /// Freeze the in-flight message; later `replace_tail` calls fail
    pub fn seal_tail(&mut self) {
        self.in_flight = None;
    }

    pub fn in_flight_message(&self) -> Option<&Message> {
        let id = self.in_flight.as_deref()?;
        self.messages.last().filter(|m| m.id == id)
    }
}
