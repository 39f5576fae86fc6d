//! # Command-Line Interface Module
//!
//! Defines the command-line interface of the `myplay-service` binary using
//! Clap derive macros.
//!
//! ## Commands
//!
//! - `serve`: Run the playback service, speaking JSON lines on stdin/stdout
//! - `show`: Print the persisted playlist snapshot
//!
//! ## Examples
//!
//! ```bash
//! myplay-service serve --idle-timeout 0
//! echo '{"id":1,"op":"list"}' | myplay-service serve
//! myplay-service show
//! ```

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Main application arguments structure.
#[derive(Parser, Debug)]
#[command(name = "myplay-service")]
#[command(about = "MyPlay: background playback queue service")]
#[command(version)]
pub struct Args {
    /// Directory holding the playlist snapshot
    ///
    /// Defaults to the platform data directory (e.g. ~/.local/share/myplay).
    #[arg(long, global = true, env = "MYPLAY_DATA_DIR", value_hint = clap::ValueHint::DirPath)]
    pub data_dir: Option<PathBuf>,

    /// The subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Enumeration of all available subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the playback service
    ///
    /// Reads one JSON request per line on stdin and writes responses and
    /// change events as JSON lines on stdout. Logging goes to stderr and is
    /// controlled with RUST_LOG.
    Serve {
        /// Seconds to stay alive while nothing is playing (0 = forever)
        #[arg(long, env = "MYPLAY_IDLE_TIMEOUT")]
        idle_timeout: Option<u64>,
    },

    /// Print the persisted playlist
    Show,
}
