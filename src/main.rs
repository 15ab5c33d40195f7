//! OdinChat CLI
//!
//! Input routing in the TUI:
//! - Commands (start with "/") run immediately
//! - Anything else is sent as a chat message
//!
//! EXIT: /quit, /q, /exit and Ctrl+C work from any state

use std::io;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use crossterm::{
    event::{poll, read, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tracing::{error, info};

use odinchat::api::HttpBackend;
use odinchat::cli::{self, run_cli_mode, Args, Mode, EXIT_CONFIG_ERROR, EXIT_FAILURE};
use odinchat::config::Config;
use odinchat::events::EventReceiver;
use odinchat::logging::{self, LogTarget};
use odinchat::runtime::Runtime;
use odinchat::ui::{self, handlers, parse_command, App, AppState, Command};

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    let config = match cli::load_config(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(EXIT_CONFIG_ERROR);
        }
    };

    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;

    let backend = match HttpBackend::new(&config) {
        Ok(backend) => Arc::new(backend),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(EXIT_CONFIG_ERROR);
        }
    };

    match args.mode() {
        Mode::Tui => run_tui_mode(&rt, backend, &config),
        mode => {
            let _guard = logging::init(LogTarget::Stderr)?;
            let exit_code = rt.block_on(run_cli_mode(backend, mode));
            std::process::exit(exit_code);
        }
    }
}

/// Run TUI mode
fn run_tui_mode(
    rt: &tokio::runtime::Runtime,
    backend: Arc<HttpBackend>,
    config: &Config,
) -> anyhow::Result<()> {
    // Logs go to a file so they never draw over the terminal UI
    let _guard = logging::init(LogTarget::File(config.log_dir()))
        .with_context(|| format!("cannot open log directory {}", config.log_dir().display()))?;
    info!(base_url = %config.base_url, "starting TUI");

    let mut terminal = setup_terminal()?;

    let (runtime, mut rx) = Runtime::new(backend, rt.handle().clone());
    let mut app = App::new();
    runtime.dispatch_all(app.chat.list_sessions());

    let result = event_loop(&mut terminal, &mut app, &runtime, &mut rx);

    // Cleanup runs even when the loop failed
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(e) = &result {
        error!(error = %e, "TUI terminated");
        eprintln!("Error: {}", e);
        std::process::exit(EXIT_FAILURE);
    }
    info!("TUI closed");
    Ok(())
}

type Tui = Terminal<CrosstermBackend<io::Stdout>>;

fn setup_terminal() -> ui::Result<Tui> {
    enable_raw_mode().map_err(|e| ui::Error::Terminal(format!("raw mode: {e}")))?;
    let mut stdout = io::stdout();
    if let Err(e) = execute!(stdout, EnterAlternateScreen) {
        let _ = disable_raw_mode();
        return Err(ui::Error::Terminal(format!("alternate screen: {e}")));
    }
    Ok(Terminal::new(CrosstermBackend::new(stdout))?)
}

fn event_loop(
    terminal: &mut Tui,
    app: &mut App,
    runtime: &Runtime<HttpBackend>,
    rx: &mut EventReceiver,
) -> ui::Result<()> {
    while app.state() != AppState::Quitting {
        ui::render(terminal, app)?;

        // Block for input (100ms timeout)
        if poll(Duration::from_millis(100))? {
            if let Event::Key(key) = read()? {
                if key.kind == KeyEventKind::Press {
                    if key.code == KeyCode::Char('c')
                        && key.modifiers.contains(KeyModifiers::CONTROL)
                    {
                        break;
                    }
                    handle_key_event(app, key);
                    if app.state() == AppState::Quitting {
                        break;
                    }
                }
            }
        }

        // Apply backend events; the next render shows streamed text
        app.process_events(rx);
        runtime.dispatch_all(app.take_actions());
    }
    Ok(())
}

/// Handle keyboard input
fn handle_key_event(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char(c) => app.handle_char(c),
        KeyCode::Backspace => app.handle_backspace(),
        KeyCode::Enter => {
            let input = std::mem::take(&mut app.input_buffer);
            let cmd = parse_command(&input);

            // Quit bypasses every handler
            if matches!(cmd, Command::Quit) {
                app.quit();
                return;
            }
            handlers::execute_command(app, cmd);
        }
        KeyCode::Esc => {
            if app.show_help {
                app.show_help = false;
            } else {
                app.input_buffer.clear();
            }
        }
        KeyCode::Tab => app.show_sidebar = !app.show_sidebar,
        KeyCode::Up => app.chat_scroll_up(1),
        KeyCode::Down => app.chat_scroll_down(1),
        KeyCode::PageUp => app.chat_scroll_up(10),
        KeyCode::PageDown => app.chat_scroll_down(10),
        KeyCode::Home => app.chat_scroll_up(1000),
        KeyCode::End => app.chat_scroll_to_end(),
        _ => {}
    }
}
