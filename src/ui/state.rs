//! Application state for the TUI
//!
//! State is split between:
//! - `ChatState`: sessions, transcript, staging, preview, stream machine
//! - Transient UI state: input buffer, scroll, sidebar, help overlay
//!
//! Actions produced by commands are queued here and handed to the runtime by
//! the main loop, so the App never performs I/O itself.

use tokio::sync::mpsc::error::TryRecvError;
use tracing::debug;

use crate::events::{Action, EventReceiver};
use crate::state::ChatState;

/// Lifecycle of the TUI
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppState {
    Running,
    Quitting,
}

/// Main application state
pub struct App {
    pub chat: ChatState,
    /// Current input buffer
    pub input_buffer: String,
    state: AppState,
    /// Session list visible on the left
    pub show_sidebar: bool,
    /// Help overlay visible
    pub show_help: bool,
    /// Transcript scroll offset (0 = bottom/latest, higher = further back)
    chat_scroll_offset: usize,
    /// Follow the latest message
    autoscroll_enabled: bool,
    /// Backend work waiting to be dispatched
    pending_actions: Vec<Action>,
}

impl Default for App {
    fn default() -> Self {
        Self::new()
    }
}

impl App {
    pub fn new() -> Self {
        Self {
            chat: ChatState::new(),
            input_buffer: String::new(),
            state: AppState::Running,
            show_sidebar: true,
            show_help: false,
            chat_scroll_offset: 0,
            autoscroll_enabled: true,
            pending_actions: Vec::new(),
        }
    }

    pub fn state(&self) -> AppState {
        self.state
    }

    pub fn quit(&mut self) {
        self.state = AppState::Quitting;
    }

    // ---- actions -----------------------------------------------------------

    /// Queue actions for the runtime
    pub fn queue(&mut self, actions: Vec<Action>) {
        self.pending_actions.extend(actions);
    }

    /// Hand queued actions to the caller
    pub fn take_actions(&mut self) -> Vec<Action> {
        std::mem::take(&mut self.pending_actions)
    }

    /// Apply every event already waiting on the channel
    ///
    /// Non-blocking; returns how many events were applied.
    pub fn process_events(&mut self, rx: &mut EventReceiver) -> usize {
        let mut applied = 0;
        loop {
            match rx.try_recv() {
                Ok(event) => {
                    let follow_up = self.chat.apply(event);
                    self.queue(follow_up);
                    applied += 1;
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    debug!("event channel closed");
                    break;
                }
            }
        }
        if applied > 0 && self.autoscroll_enabled {
            self.chat_scroll_offset = 0;
        }
        applied
    }

    // ---- input -------------------------------------------------------------

    pub fn handle_char(&mut self, c: char) {
        self.input_buffer.push(c);
    }

    pub fn handle_backspace(&mut self) {
        self.input_buffer.pop();
    }

    // ---- scroll ------------------------------------------------------------

    pub fn chat_scroll_offset(&self) -> usize {
        self.chat_scroll_offset
    }

    pub fn chat_scroll_up(&mut self, lines: usize) {
        self.chat_scroll_offset = self.chat_scroll_offset.saturating_add(lines);
        self.autoscroll_enabled = false;
    }

    pub fn chat_scroll_down(&mut self, lines: usize) {
        self.chat_scroll_offset = self.chat_scroll_offset.saturating_sub(lines);
        if self.chat_scroll_offset == 0 {
            self.autoscroll_enabled = true;
        }
    }

    pub fn chat_scroll_to_end(&mut self) {
        self.chat_scroll_offset = 0;
        self.autoscroll_enabled = true;
    }

    pub fn autoscroll_enabled(&self) -> bool {
        self.autoscroll_enabled
    }
}
