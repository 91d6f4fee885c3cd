//! Command handlers for the OpsDesk CLI

pub mod auth;
pub mod request;

use crate::error::Result;
use crate::shell::TerminalShell;
use opsdesk_sdk::{FileStore, SdkConfig, SessionController, SessionStore};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// Everything a handler needs for one invocation
pub struct Context {
    pub controller: Arc<SessionController>,
    pub json: bool,
}

impl Context {
    pub fn new(controller: Arc<SessionController>, json: bool) -> Self {
        Self { controller, json }
    }

    /// Load configuration and open the on-disk session
    pub fn load(config: Option<&Path>, session_file: Option<PathBuf>, json: bool) -> Result<Self> {
        let config = SdkConfig::load(config)?;
        let session_file = match session_file {
            Some(path) => path,
            None => FileStore::default_path()?,
        };
        debug!("Using session file {}", session_file.display());

        let session = SessionStore::new(Arc::new(FileStore::open(session_file)?));
        let shell = Arc::new(TerminalShell::new(
            config.session.home_route.clone(),
            config.session.login_route.clone(),
        ));
        let controller = SessionController::from_config(&config, session, shell)?;
        Ok(Self::new(Arc::new(controller), json))
    }
}
