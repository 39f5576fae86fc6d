//! # MyPlay Service
//!
//! Background playback queue service. Clients talk to it with one JSON
//! request per line on stdin and receive responses and change events as
//! JSON lines on stdout.
//!
//! ## Usage
//!
//! ```bash
//! # Run the service
//! myplay-service serve
//!
//! # Keep running while idle
//! myplay-service serve --idle-timeout 0
//!
//! # Inspect the persisted playlist
//! myplay-service show
//! ```

use anyhow::Result;
use clap::Parser;
use log::info;

use myplay::cli::{Args, Command};
use myplay::config::RuntimeConfig;
use myplay::store::{FileStore, PersistenceStore};

/// Main entry point.
///
/// Initializes logging, parses command-line arguments, and routes commands.
///
/// # Logging
///
/// Logging goes to stderr and is controlled via `RUST_LOG`:
/// - `RUST_LOG=debug myplay-service serve` - Enable debug logging
/// - `RUST_LOG=myplay::scanner=debug myplay-service serve` - Module-specific logging
fn main() -> Result<()> {
    env_logger::init();

    let args = Args::parse();

    match args.command {
        Command::Serve { idle_timeout } => {
            let config = RuntimeConfig::from_args(args.data_dir, idle_timeout)?;
            myplay::service::run(&config)?;
        }
        Command::Show => {
            let config = RuntimeConfig::from_args(args.data_dir, None)?;
            let mut store = FileStore::new(config.playlist_path());
            info!("Reading playlist from {}", store.path().display());

            match store.load()? {
                Some(snapshot) => {
                    let snapshot = snapshot.sanitized();
                    for (i, reference) in snapshot.queue.iter().enumerate() {
                        let marker = if snapshot.current == Some(i) { '*' } else { ' ' };
                        println!("{marker} {i:>3}  {reference}");
                    }
                }
                None => println!("Playlist is empty"),
            }
        }
    }

    Ok(())
}
