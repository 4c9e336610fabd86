//! SessionVault CLI - a terminal front end for the session core.
//!
//! `start` behaves like an application launch: it attempts auto-login with
//! the saved credentials and, after a short delay, checks for updates.

mod commands;

use std::io;
use std::path::Path;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use sessionvault_core::Config;

#[derive(Parser)]
#[command(name = "sessionvault")]
#[command(version)]
#[command(about = "Saved-credential login, auto-login and update checks")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Auto-login with saved credentials, then check for updates
    Start,
    /// Log in interactively and save the credentials
    Login {
        /// Server base URL (falls back to SESSIONVAULT_SERVER)
        #[arg(long)]
        server: Option<String>,
        /// Username (falls back to SESSIONVAULT_USERNAME)
        #[arg(long)]
        username: Option<String>,
    },
    /// Forget the saved credentials
    Logout,
    /// Show what is currently saved
    Status,
    /// Check the release feed right away
    CheckUpdate {
        /// Version to compare against (defaults to this build)
        #[arg(long)]
        current: Option<String>,
    },
}

/// Initialize the tracing subscriber for logging.
///
/// The returned guard must live until exit so buffered file output is flushed.
fn init_tracing(log_dir: Option<&Path>) -> Option<WorkerGuard> {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "sessionvault.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (
                Some(fmt::layer().with_writer(writer).with_ansi(false)),
                Some(guard),
            )
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(file_layer)
        .with(filter)
        .init();

    guard
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let config = Config::load();
    let _log_guard = init_tracing(
        config
            .as_ref()
            .ok()
            .and_then(|c| c.log_dir.as_deref()),
    );
    let config = match config {
        Ok(c) => c,
        Err(e) => {
            warn!(error = %e, "Failed to load config, using defaults");
            Config::default()
        }
    };
    info!("SessionVault starting");

    match cli.command {
        Command::Start => commands::start(&config).await,
        Command::Login { server, username } => commands::login(&config, server, username).await,
        Command::Logout => commands::logout(&config).await,
        Command::Status => commands::status(&config).await,
        Command::CheckUpdate { current } => commands::check_update(&config, current).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_login_flags() {
        let cli = Cli::parse_from(["sessionvault", "login", "--server", "https://a", "--username", "bob"]);
        match cli.command {
            Command::Login { server, username } => {
                assert_eq!(server.as_deref(), Some("https://a"));
                assert_eq!(username.as_deref(), Some("bob"));
            }
            _ => panic!("expected login"),
        }
    }
}
