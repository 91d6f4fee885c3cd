//! Terminal host for the session controller

use crate::output::{print_error, print_info, print_warning};
use opsdesk_sdk::auth::routes::same_route;
use opsdesk_sdk::{Notice, NoticeLevel, UiShell};
use parking_lot::RwLock;
use tracing::debug;

/// Prints notices and turns login redirects into a hint
pub struct TerminalShell {
    route: RwLock<String>,
    login_route: String,
}

impl TerminalShell {
    pub fn new(initial_route: impl Into<String>, login_route: impl Into<String>) -> Self {
        Self {
            route: RwLock::new(initial_route.into()),
            login_route: login_route.into(),
        }
    }
}

impl UiShell for TerminalShell {
    fn current_route(&self) -> String {
        self.route.read().clone()
    }

    fn navigate(&self, route: &str) {
        debug!(route, "Navigating");
        if same_route(route, &self.login_route) {
            print_warning("Not signed in. Run `opsdesk login` to start a session.");
        }
        *self.route.write() = route.to_string();
    }

    fn notify(&self, notice: Notice) {
        match notice.level {
            NoticeLevel::Info => print_info(&notice.message),
            NoticeLevel::Warning => print_warning(&notice.message),
            NoticeLevel::Error => print_error(&notice.message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn navigation_updates_route() {
        let shell = TerminalShell::new("/", "/login");
        shell.navigate("/login");
        assert_eq!(shell.current_route(), "/login");
    }
}
