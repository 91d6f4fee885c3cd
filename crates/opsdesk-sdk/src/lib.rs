//! # OpsDesk SDK
//!
//! Session lifecycle and authenticated request pipeline for the OpsDesk admin
//! console backend.
//!
//! ```rust,no_run
//! use opsdesk_sdk::{MemoryShell, SdkConfig, SessionController, SessionStore};
//! use std::sync::Arc;
//!
//! # async fn example() -> opsdesk_sdk::Result<()> {
//! let config = SdkConfig::load(None)?;
//! let shell = Arc::new(MemoryShell::new("/home"));
//! let controller = Arc::new(SessionController::from_config(
//!     &config,
//!     SessionStore::in_memory(),
//!     shell,
//! )?);
//!
//! let _mounted = controller.mount().await;
//! let rooms = controller.client().get("/rooms").await;
//! println!("ok: {}", rooms.ok);
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod interceptors;
pub mod session;

pub use auth::{
    BootstrapOutcome, Credentials, MemoryShell, MountedSession, Notice, NoticeLevel,
    RefreshCoordinator, RefreshOutcome, RefreshState, SessionController, TokenGrant, UiShell,
    UserProfile,
};
pub use client::{ApiResponse, ClientBuilder, HttpClient, Problem, RequestDescriptor};
pub use config::SdkConfig;
pub use error::{ApiError, Result};
pub use interceptors::{InterceptorHandle, ResponseInterceptor, Subscription};
pub use session::{FileStore, KeyValueStore, MemoryStore, Session, SessionStore};
