//! TUI command handlers
//!
//! Each command turns into `ChatState` operations; any backend work they
//! produce is queued on the App for the main loop to dispatch.

use std::path::PathBuf;

use crate::api::Session;
use crate::state::{NoticeLevel, SendError};
use crate::ui::input::Command;
use crate::ui::state::App;

/// Resolve `/open` and `/delete` arguments
///
/// Accepts a 1-based list number, an exact id, or an unambiguous id prefix.
pub fn resolve_session<'a>(sessions: &'a [Session], arg: &str) -> Option<&'a Session> {
    if let Ok(n) = arg.parse::<usize>() {
        if let Some(session) = n.checked_sub(1).and_then(|i| sessions.get(i)) {
            return Some(session);
        }
    }
    if let Some(session) = sessions.iter().find(|s| s.id == arg) {
        return Some(session);
    }
    let mut prefixed = sessions.iter().filter(|s| s.id.starts_with(arg));
    match (prefixed.next(), prefixed.next()) {
        (Some(session), None) => Some(session),
        _ => None,
    }
}

/// Expand a leading `~/` to the home directory
fn expand_path(raw: &str) -> PathBuf {
    match raw.strip_prefix("~/") {
        Some(rest) => dirs::home_dir()
            .map(|home| home.join(rest))
            .unwrap_or_else(|| PathBuf::from(raw)),
        None => PathBuf::from(raw),
    }
}

/// Handle chat input
///
/// Returns immediately; the reply arrives through the event channel. If a
/// reply is still streaming the text goes back into the input buffer.
pub fn handle_chat(app: &mut App, text: &str) {
    match app.chat.send(text) {
        Ok(actions) => {
            app.queue(actions);
            app.chat_scroll_to_end();
        }
        Err(SendError::Busy) => {
            app.input_buffer = text.to_string();
            app.chat.push_notice(
                NoticeLevel::Warning,
                "Wait for the current reply to finish",
            );
        }
        Err(SendError::Empty) => {}
    }
}

fn handle_open(app: &mut App, arg: &str) {
    let id = resolve_session(app.chat.sessions().sessions(), arg).map(|s| s.id.clone());
    match id {
        Some(id) => {
            let actions = app.chat.select_session(&id);
            app.queue(actions);
            app.chat_scroll_to_end();
        }
        None => app
            .chat
            .push_notice(NoticeLevel::Warning, format!("No session matches '{arg}'")),
    }
}

fn handle_delete(app: &mut App, arg: &str) {
    let id = resolve_session(app.chat.sessions().sessions(), arg).map(|s| s.id.clone());
    match id {
        Some(id) => {
            let actions = app.chat.delete_session(&id);
            app.queue(actions);
        }
        None => app
            .chat
            .push_notice(NoticeLevel::Warning, format!("No session matches '{arg}'")),
    }
}

fn handle_detach(app: &mut App, arg: &str) {
    let staged = app.chat.staged();
    let id = arg
        .parse::<usize>()
        .ok()
        .and_then(|n| n.checked_sub(1))
        .and_then(|i| staged.get(i))
        .or_else(|| staged.iter().find(|a| a.id == arg))
        .map(|a| a.id.clone());

    match id.and_then(|id| app.chat.unstage(&id)) {
        Some(removed) => app
            .chat
            .push_notice(NoticeLevel::Info, format!("Removed {}", removed.filename)),
        None => app
            .chat
            .push_notice(NoticeLevel::Warning, format!("No staged file matches '{arg}'")),
    }
}

/// Execute parsed command
///
/// /quit is normally intercepted by the key loop before reaching here.
pub fn execute_command(app: &mut App, cmd: Command) {
    match cmd {
        Command::Quit => app.quit(),
        Command::New => {
            let actions = app.chat.create_session();
            app.queue(actions);
        }
        Command::Sessions => {
            app.show_sidebar = true;
            let actions = app.chat.list_sessions();
            app.queue(actions);
        }
        Command::Open(arg) => handle_open(app, &arg),
        Command::Delete(arg) => handle_delete(app, &arg),
        Command::Attach(raw) => {
            let path = expand_path(&raw);
            app.chat
                .push_notice(NoticeLevel::Info, format!("Uploading {}", path.display()));
            let actions = app.chat.stage_file(path);
            app.queue(actions);
        }
        Command::Detach(arg) => handle_detach(app, &arg),
        Command::Preview => {
            if !app.chat.show_preview() {
                app.chat
                    .push_notice(NoticeLevel::Info, "No HTML preview available");
            }
        }
        Command::Hide => app.chat.dismiss_preview(),
        Command::Dismiss => app.chat.dismiss_notices(),
        Command::Help => app.show_help = !app.show_help,
        Command::Unknown(name) => app.chat.push_notice(
            NoticeLevel::Warning,
            format!("Unknown command /{name} (try /help)"),
        ),
        Command::Chat(text) => handle_chat(app, &text),
        Command::None => {}
    }
}
