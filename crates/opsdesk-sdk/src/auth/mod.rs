//! Authentication and session lifecycle
//!
//! This module provides:
//! - token and profile extraction from backend payloads
//! - single-flight token refresh
//! - the session controller (bootstrap, periodic check, 401 recovery, login, logout)
//! - the shell seam used for navigation and user notices

pub mod extract;
pub mod lifecycle;
pub mod refresh;
pub mod routes;
pub mod shell;
pub mod types;

// Re-export commonly used types
pub use lifecycle::{BootstrapOutcome, LifecycleSettings, MountedSession, SessionController};
pub use refresh::{RefreshCoordinator, RefreshSettings};
pub use shell::{MemoryShell, Notice, NoticeLevel, UiShell};
pub use types::{
    Credentials, RefreshFailure, RefreshOutcome, RefreshState, TokenGrant, UserProfile,
};
