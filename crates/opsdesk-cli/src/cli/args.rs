use crate::cli::{commands::Commands, handlers};
use crate::error::Result;
use clap::Parser;
use clap_verbosity_flag::{OffLevel, Verbosity};
use std::path::PathBuf;

/// OpsDesk CLI - signed-in access to the OpsDesk admin backend
#[derive(Parser, Debug)]
#[command(
    name = "opsdesk",
    author = "OpsDesk Team",
    version,
    about = "OpsDesk CLI - signed-in access to the OpsDesk admin backend",
    long_about = "Command-line client for the OpsDesk admin backend.

SESSION:
  opsdesk login --email you@example.com   # Sign in (prompts for password)
  opsdesk status                          # Show the current session
  opsdesk refresh                         # Refresh the access token now
  opsdesk logout                          # Sign out

REQUESTS:
  opsdesk request GET /hostels
  opsdesk request POST /rooms --data '{\"block\": \"A\"}'"
)]
pub struct Args {
    /// Configuration file path (defaults to ./opsdesk.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Session file path (defaults to the platform data directory)
    #[arg(long, global = true, env = "OPSDESK_SESSION_FILE")]
    pub session_file: Option<PathBuf>,

    /// Output format as JSON
    #[arg(long, global = true)]
    pub json: bool,

    #[command(flatten)]
    pub verbosity: Verbosity<OffLevel>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

impl Args {
    /// Execute the CLI command
    pub async fn run(self) -> Result<()> {
        let ctx = handlers::Context::load(self.config.as_deref(), self.session_file, self.json)?;

        match self.command {
            Commands::Login { email, password } => {
                handlers::auth::handle_login(&ctx, email, password).await
            }
            Commands::Logout => handlers::auth::handle_logout(&ctx).await,
            Commands::Status => handlers::auth::handle_status(&ctx),
            Commands::Refresh => handlers::auth::handle_refresh(&ctx).await,
            Commands::Request { method, path, data } => {
                handlers::request::handle_request(&ctx, &method, &path, data.as_deref()).await
            }
        }
    }
}
