use clap::Subcommand;

/// Main CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Sign in and store the session
    Login {
        /// Account email
        #[arg(short, long)]
        email: String,

        /// Account password (prompted for when omitted)
        #[arg(long, env = "OPSDESK_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },

    /// Sign out and clear the stored session
    Logout,

    /// Show the stored session
    Status,

    /// Refresh the access token now
    Refresh,

    /// Send an authenticated request to the backend
    Request {
        /// HTTP method (GET, POST, PUT, DELETE, ...)
        method: String,

        /// Path relative to the configured base URL
        path: String,

        /// JSON request body
        #[arg(short, long)]
        data: Option<String>,
    },
}
