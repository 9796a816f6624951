//! gns - command line dashboard and notification sender for GNS.
//!
//! Dashboard commands keep a persisted session (login, register, logout,
//! whoami, status, open). `send` submits a notification with an API token
//! and never touches the session.

mod commands;

use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Command line client for the GNS notification platform
#[derive(Parser)]
#[command(name = "gns")]
#[command(about = "Dashboard session and notification sender for GNS", long_about = None)]
#[command(version)]
struct Cli {
    /// Server URL, e.g. http://localhost:8080 (overrides GNS_API_URL and the config file)
    #[arg(long, global = true)]
    server: Option<String>,

    /// Also write logs to this file
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Log in and store the session
    Login {
        /// Username (defaults to the last one used)
        #[arg(long, short)]
        username: Option<String>,
    },

    /// Create an account and store the session
    Register {
        #[arg(long, short)]
        username: String,

        #[arg(long, short)]
        email: String,
    },

    /// Forget the stored session
    Logout,

    /// Show the identity of the stored session
    Whoami {
        /// Fetch the identity from the server instead of the stored snapshot
        #[arg(long)]
        refresh: bool,
    },

    /// Show whether a session is stored and which server is configured
    Status,

    /// Navigate to a dashboard route, applying the login guard
    Open {
        /// Route path, e.g. /tasks
        path: String,
    },

    /// Send a notification using an API token
    Send(commands::SendArgs),
}

/// Initialize the tracing subscriber for logging
fn init_tracing(log_file: Option<&Path>) -> Result<Option<WorkerGuard>> {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let (file_layer, guard) = match log_file {
        Some(path) => {
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));
            let name = path
                .file_name()
                .context("Log file path has no file name")?;
            let (writer, guard) =
                tracing_appender::non_blocking(tracing_appender::rolling::never(dir, name));
            (
                Some(fmt::layer().with_ansi(false).with_writer(writer)),
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

    Ok(guard)
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    let _log_guard = init_tracing(cli.log_file.as_deref())?;
    info!("gns starting");

    let mut config = gns_core::Config::load().context("Failed to load config")?;
    config.apply_env();
    if let Some(server) = cli.server {
        config.server_url = server;
    }

    match cli.command {
        Commands::Login { username } => commands::login(&config, username).await,
        Commands::Register { username, email } => {
            commands::register(&config, &username, &email).await
        }
        Commands::Logout => commands::logout(&config),
        Commands::Whoami { refresh } => commands::whoami(&config, refresh).await,
        Commands::Status => commands::status(&config),
        Commands::Open { path } => commands::open(&config, &path),
        Commands::Send(args) => commands::send(&config, args).await,
    }
}
