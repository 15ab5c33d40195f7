//! CLI argument parsing
//!
//! Grammar:
//! ```text
//! odinchat [--base-url URL] [--config PATH] [mode]
//!
//! MODES:
//!   (no mode)                     TUI
//!   tui                           TUI
//!   sessions [--json]             List sessions
//!   ask <message> [--session ID] [--attach PATH]...
//!                                 Send one message, stream the reply to stdout
//!   delete <id>                   Delete a session
//! ```

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Parsed CLI arguments
#[derive(Debug, Clone, PartialEq, Eq, Parser)]
#[command(name = "odinchat", version, about = "Terminal client for a streaming chat backend")]
pub struct Args {
    /// Backend API root, e.g. http://localhost:8001/api
    #[arg(long, global = true, env = "ODINCHAT_BACKEND_URL", value_name = "URL")]
    pub base_url: Option<String>,

    /// Config file (default: $ODINCHAT_HOME/config.toml or the platform config dir)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub mode: Option<Mode>,
}

/// CLI modes
#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum Mode {
    /// Interactive terminal UI (default)
    Tui,

    /// List sessions, most recent first
    Sessions {
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Send one message and stream the reply to stdout
    Ask {
        message: String,

        /// Continue an existing session instead of starting a new one
        #[arg(long, value_name = "ID")]
        session: Option<String>,

        /// Attach a file (repeatable)
        #[arg(long = "attach", value_name = "PATH")]
        attachments: Vec<PathBuf>,
    },

    /// Delete a session and its messages
    Delete { id: String },
}

impl Args {
    /// Selected mode, TUI when none was given
    pub fn mode(&self) -> Mode {
        self.mode.clone().unwrap_or(Mode::Tui)
    }
}
