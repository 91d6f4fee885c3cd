//! Seam between the session controller and whatever hosts it
//!
//! The controller never renders anything itself. It asks the shell for the
//! current route, tells it where to go, and hands it user-facing notices.

use parking_lot::RwLock;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Warning,
    Error,
}

/// Message meant for the user, e.g. a toast
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            message: message.into(),
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Warning,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Navigation and notification host
pub trait UiShell: Send + Sync {
    fn current_route(&self) -> String;

    fn navigate(&self, route: &str);

    fn notify(&self, notice: Notice);
}

/// In-process shell that records what it was asked to do
#[derive(Debug)]
pub struct MemoryShell {
    route: RwLock<String>,
    history: RwLock<Vec<String>>,
    notices: RwLock<Vec<Notice>>,
}

impl MemoryShell {
    pub fn new(initial_route: impl Into<String>) -> Self {
        Self {
            route: RwLock::new(initial_route.into()),
            history: RwLock::new(Vec::new()),
            notices: RwLock::new(Vec::new()),
        }
    }

    /// Routes navigated to, oldest first
    pub fn history(&self) -> Vec<String> {
        self.history.read().clone()
    }

    pub fn notices(&self) -> Vec<Notice> {
        self.notices.read().clone()
    }

    /// Move without recording a navigation, as a user typing a URL would
    pub fn set_route(&self, route: impl Into<String>) {
        *self.route.write() = route.into();
    }
}

impl Default for MemoryShell {
    fn default() -> Self {
        Self::new("/")
    }
}

impl UiShell for MemoryShell {
    fn current_route(&self) -> String {
        self.route.read().clone()
    }

    fn navigate(&self, route: &str) {
        *self.route.write() = route.to_string();
        self.history.write().push(route.to_string());
    }

    fn notify(&self, notice: Notice) {
        self.notices.write().push(notice);
    }
}
