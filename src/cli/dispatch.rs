//! CLI mode dispatch
//!
//! One-shot modes (everything except the TUI):
//! - sessions: list sessions
//! - ask: send one message through the same state machine as the TUI
//! - delete: delete a session

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use tokio::runtime::Handle;
use tracing::info;

use crate::api::{ChatBackend, Session};
use crate::cli::{Error, Mode, Result, EXIT_CONFIG_ERROR, EXIT_FAILURE, EXIT_SUCCESS};
use crate::events::EventReceiver;
use crate::runtime::Runtime;
use crate::state::{ChatState, NoticeLevel, StreamOutcome, StreamPhase};

/// Exit code wrapper for CLI operations
pub type ExitCode = i32;

/// Map a CLI error to its exit code
pub fn exit_code_for(err: &Error) -> ExitCode {
    match err {
        Error::Config(_) => EXIT_CONFIG_ERROR,
        _ => EXIT_FAILURE,
    }
}

/// Run a one-shot mode and return its exit code
///
/// Must be called from inside a tokio runtime.
pub async fn run_cli_mode<B: ChatBackend + 'static>(backend: Arc<B>, mode: Mode) -> ExitCode {
    let result = match mode {
        Mode::Sessions { json } => run_sessions_mode(&*backend, json)
            .await
            .and_then(|out| write_stdout(&out)),
        Mode::Delete { id } => run_delete_mode(&*backend, &id)
            .await
            .and_then(|out| write_stdout(&out)),
        Mode::Ask {
            message,
            session,
            attachments,
        } => {
            let mut stdout = std::io::stdout();
            run_ask_mode(backend, &message, session.as_deref(), &attachments, &mut stdout).await
        }
        Mode::Tui => Err(Error::Failed(
            "TUI mode is started by the binary, not the dispatcher".to_string(),
        )),
    };

    match result {
        Ok(()) => EXIT_SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            exit_code_for(&e)
        }
    }
}

fn write_stdout(text: &str) -> Result<()> {
    let mut stdout = std::io::stdout().lock();
    stdout.write_all(text.as_bytes())?;
    stdout.flush()?;
    Ok(())
}

/// Format the session list as a table or JSON
pub async fn run_sessions_mode<B: ChatBackend + ?Sized>(backend: &B, json: bool) -> Result<String> {
    let sessions = backend.list_sessions().await?;
    if json {
        return Ok(format!("{}\n", serde_json::to_string_pretty(&sessions)?));
    }
    Ok(format_sessions(&sessions))
}

fn format_sessions(sessions: &[Session]) -> String {
    if sessions.is_empty() {
        return "No sessions.\n".to_string();
    }
    let mut out = String::new();
    for (i, session) in sessions.iter().enumerate() {
        let when = session
            .updated_at
            .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| "-".to_string());
        out.push_str(&format!(
            "{:>3}  {:<36}  {:<16}  {}\n",
            i + 1,
            session.id,
            when,
            session.title
        ));
    }
    out
}

pub async fn run_delete_mode<B: ChatBackend + ?Sized>(backend: &B, id: &str) -> Result<String> {
    backend.delete_session(id).await?;
    info!(session_id = id, "session deleted");
    Ok(format!("Deleted session {id}\n"))
}

/// Drives a `ChatState` from the terminal instead of the TUI loop
struct Driver<B: ChatBackend + 'static> {
    state: ChatState,
    runtime: Runtime<B>,
    rx: EventReceiver,
    /// Notices already echoed to stderr
    notices_seen: usize,
}

impl<B: ChatBackend + 'static> Driver<B> {
    fn new(backend: Arc<B>) -> Self {
        let (runtime, rx) = Runtime::new(backend, Handle::current());
        Self {
            state: ChatState::new(),
            runtime,
            rx,
            notices_seen: 0,
        }
    }

    /// Apply events until `done` holds; fails on the first error notice
    async fn run_until(
        &mut self,
        mut on_event: impl FnMut(&ChatState) -> Result<()>,
        done: impl Fn(&ChatState) -> bool,
    ) -> Result<()> {
        while !done(&self.state) {
            let Some(event) = self.rx.recv().await else {
                return Err(Error::Failed("event channel closed".to_string()));
            };
            let actions = self.state.apply(event);
            self.runtime.dispatch_all(actions);
            on_event(&self.state)?;
            self.echo_notices()?;
        }
        Ok(())
    }

    /// Print new notices to stderr; an error notice aborts
    fn echo_notices(&mut self) -> Result<()> {
        let fresh: Vec<_> = self
            .state
            .notices()
            .skip(self.notices_seen)
            .cloned()
            .collect();
        self.notices_seen += fresh.len();
        for notice in &fresh {
            eprintln!("{}", notice.text);
        }
        match fresh.iter().find(|n| n.level == NoticeLevel::Error) {
            Some(notice) => Err(Error::Failed(notice.text.clone())),
            None => Ok(()),
        }
    }
}

/// Send one message and write the reply to `out` as it streams
pub async fn run_ask_mode<B: ChatBackend + 'static>(
    backend: Arc<B>,
    message: &str,
    session: Option<&str>,
    attachments: &[PathBuf],
    out: &mut impl Write,
) -> Result<()> {
    let mut driver = Driver::new(backend);

    if let Some(id) = session {
        let actions = driver.state.select_session(id);
        driver.runtime.dispatch_all(actions);
        driver
            .run_until(|_| Ok(()), |s| s.active_session_id() == Some(id))
            .await?;
    }

    for path in attachments {
        let expected = driver.state.staged().len() + 1;
        let actions = driver.state.stage_file(path.clone());
        driver.runtime.dispatch_all(actions);
        driver
            .run_until(|_| Ok(()), |s| s.staged().len() == expected)
            .await?;
    }

    let actions = driver.state.send(message)?;
    driver.runtime.dispatch_all(actions);

    // Snapshots are cumulative: print only what extends the previous one
    let mut printed = String::new();
    let mut print_reply = |state: &ChatState| -> Result<()> {
        if !state.is_streaming() {
            return Ok(());
        }
        let Some(reply) = state.log().in_flight_message() else {
            return Ok(());
        };
        match reply.content.strip_prefix(printed.as_str()) {
            Some("") => {}
            Some(delta) => out.write_all(delta.as_bytes())?,
            None => {
                // The server rewrote earlier text; start over on a new line
                out.write_all(b"\n")?;
                out.write_all(reply.content.as_bytes())?;
            }
        }
        out.flush()?;
        printed = reply.content.clone();
        Ok(())
    };
    driver
        .run_until(&mut print_reply, |s| matches!(s.phase(), StreamPhase::Closed(_)))
        .await?;

    match driver.state.phase() {
        StreamPhase::Closed(StreamOutcome::Completed) => {
            // Snapshot delivered in the final chunk
            if let Some(reply) = driver.state.log().last() {
                if let Some(delta) = reply.content.strip_prefix(printed.as_str()) {
                    out.write_all(delta.as_bytes())?;
                }
            }
            out.write_all(b"\n")?;
            out.flush()?;
            Ok(())
        }
        _ => Err(Error::Failed("reply did not complete".to_string())),
    }
}
