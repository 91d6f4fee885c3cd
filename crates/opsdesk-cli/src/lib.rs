//! # OpsDesk CLI
//!
//! Command-line client for the OpsDesk admin backend. It keeps a session on
//! disk between invocations and runs every request through the same session
//! lifecycle as the console: startup refresh, 401 recovery and logout.

pub mod cli;
pub mod error;
pub mod output;
pub mod shell;

pub use error::*;
