//! Session lifecycle
//!
//! [`SessionController`] owns the whole life of a signed-in session:
//!
//! - bootstrap when the console starts (install header, refresh stale tokens,
//!   redirect anonymous users away from protected routes);
//! - a periodic expiry check while mounted;
//! - reactive recovery: a 401 on a first attempt refreshes the token once and
//!   re-issues the original request;
//! - login and logout.
//!
//! [`SessionController::mount`] wires all of it up and returns a
//! [`MountedSession`] guard; dropping the guard stops the timer and removes
//! the recovery interceptor.

use super::extract::{extract_profile, extract_token};
use super::refresh::{RefreshCoordinator, RefreshSettings};
use super::routes::{self, is_public_route, same_route};
use super::shell::{Notice, UiShell};
use super::types::{Credentials, RefreshFailure, RefreshOutcome};
use crate::client::{ApiResponse, ClientBuilder, HttpClient, RequestDescriptor};
use crate::config::SdkConfig;
use crate::error::{ApiError, Result};
use crate::interceptors::{ResponseInterceptor, Subscription};
use crate::session::{now_ms, ExpiryStatus, Session, SessionStore};
use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use reqwest::Method;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Interval between proactive expiry checks
pub const DEFAULT_CHECK_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Debug, Clone)]
pub struct LifecycleSettings {
    pub login_endpoint: String,
    pub logout_endpoint: String,
    pub check_interval: Duration,
    pub public_routes: Vec<String>,
    pub login_route: String,
    pub home_route: String,
    /// Pause between a successful login and the redirect home
    pub login_redirect_delay: Duration,
}

impl Default for LifecycleSettings {
    fn default() -> Self {
        Self {
            login_endpoint: "/login".to_string(),
            logout_endpoint: "/logout".to_string(),
            check_interval: DEFAULT_CHECK_INTERVAL,
            public_routes: routes::DEFAULT_PUBLIC_ROUTES
                .iter()
                .map(|r| r.to_string())
                .collect(),
            login_route: routes::DEFAULT_LOGIN_ROUTE.to_string(),
            home_route: routes::DEFAULT_HOME_ROUTE.to_string(),
            login_redirect_delay: Duration::ZERO,
        }
    }
}

/// What bootstrap found and did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootstrapOutcome {
    /// No token, already on a public route
    Anonymous,
    /// No token on a protected route; sent to the login route
    RedirectedToLogin,
    /// Token present and not due for refresh
    Authenticated,
    /// Token was stale and has been refreshed
    Refreshed,
    /// Token was stale and could not be refreshed
    LoggedOut,
}

pub struct SessionController {
    client: Arc<HttpClient>,
    session: SessionStore,
    coordinator: Arc<RefreshCoordinator>,
    shell: Arc<dyn UiShell>,
    settings: LifecycleSettings,
}

impl std::fmt::Debug for SessionController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionController")
            .field("client", &self.client)
            .field("coordinator", &self.coordinator)
            .field("settings", &self.settings)
            .finish()
    }
}

impl SessionController {
    pub fn new(
        client: Arc<HttpClient>,
        shell: Arc<dyn UiShell>,
        refresh: RefreshSettings,
        settings: LifecycleSettings,
    ) -> Self {
        let session = client.session().clone();
        let coordinator = Arc::new(RefreshCoordinator::new(
            client.clone(),
            session.clone(),
            refresh,
        ));
        Self {
            client,
            session,
            coordinator,
            shell,
            settings,
        }
    }

    /// Build client, coordinator and controller from loaded configuration
    pub fn from_config(
        config: &SdkConfig,
        session: SessionStore,
        shell: Arc<dyn UiShell>,
    ) -> Result<Self> {
        config.validate()?;
        let client = ClientBuilder::default()
            .base_url(&config.api.base_url)
            .timeout(config.api.timeout())
            .session(session)
            .build()?;
        Ok(Self::new(
            Arc::new(client),
            shell,
            config.refresh_settings(),
            config.lifecycle_settings(),
        ))
    }

    pub fn client(&self) -> &Arc<HttpClient> {
        &self.client
    }

    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    pub fn coordinator(&self) -> &Arc<RefreshCoordinator> {
        &self.coordinator
    }

    pub fn settings(&self) -> &LifecycleSettings {
        &self.settings
    }

    /// Bring the session into a consistent state at startup
    pub async fn bootstrap(&self) -> BootstrapOutcome {
        if !self.session.is_authenticated() {
            let route = self.shell.current_route();
            if is_public_route(&route, &self.settings.public_routes) {
                debug!(%route, "No session on public route");
                return BootstrapOutcome::Anonymous;
            }
            info!(%route, "No session, redirecting to login");
            self.shell.navigate(&self.settings.login_route);
            return BootstrapOutcome::RedirectedToLogin;
        }

        self.install_authorization_header();

        let status = self.coordinator.expiry_status();
        if !status.needs_refresh() {
            debug!(?status, "Existing session is valid");
            return BootstrapOutcome::Authenticated;
        }

        info!(?status, "Stored token is stale, refreshing");
        match self.coordinator.refresh().await {
            RefreshOutcome::Refreshed => BootstrapOutcome::Refreshed,
            RefreshOutcome::Failed(failure) => {
                if self.settle_failed_refresh(&failure, "startup") {
                    BootstrapOutcome::Authenticated
                } else {
                    BootstrapOutcome::LoggedOut
                }
            }
        }
    }

    /// One proactive expiry check; `None` when no refresh was needed
    pub async fn check_expiry(&self) -> Option<RefreshOutcome> {
        let outcome = self.coordinator.refresh_if_needed().await?;
        if let RefreshOutcome::Failed(failure) = &outcome {
            self.settle_failed_refresh(failure, "periodic check");
        }
        Some(outcome)
    }

    /// Sign in and persist the issued token and employee profile
    pub async fn login(&self, credentials: &Credentials) -> Result<Session> {
        let payload = serde_json::to_value(credentials)?;
        let request = RequestDescriptor::new(Method::POST, self.settings.login_endpoint.as_str())
            .with_payload(payload)
            .without_recovery();

        info!(email = %credentials.email, "Signing in");
        let response = self.client.request(request).await;
        if !response.ok {
            return Err(response.to_error());
        }

        let body = response.data.unwrap_or_default();
        let (shape, grant) = extract_token(&body).ok_or_else(|| ApiError::Authentication {
            message: "Login response did not contain an access token".to_string(),
        })?;
        let profile = extract_profile(&body);
        if profile.is_none() {
            warn!("Login response did not contain an employee profile");
        }

        self.session
            .store_token(&grant, now_ms(), self.coordinator.settings().default_ttl)?;
        if let Some(profile) = &profile {
            self.session.store_profile(profile)?;
        }
        self.client
            .set_header(AUTHORIZATION.as_str(), &grant.authorization())?;

        info!(shape, employee = ?profile.as_ref().map(|p| p.id.as_str()), "Signed in");
        if !self.settings.login_redirect_delay.is_zero() {
            tokio::time::sleep(self.settings.login_redirect_delay).await;
        }
        self.shell.navigate(&self.settings.home_route);
        Ok(self.session.snapshot())
    }

    /// End the session: tell the backend, then clean up locally.
    ///
    /// Never fails. Local cleanup runs even if this future is dropped while
    /// the logout call is still in flight.
    pub async fn logout(&self) {
        let _cleanup = LocalCleanup(self);

        if !self.session.is_authenticated() {
            debug!("Logout without a session, skipping backend call");
            return;
        }

        let request = RequestDescriptor::new(Method::POST, self.settings.logout_endpoint.as_str())
            .without_recovery();
        let response = self.client.request(request).await;
        if !response.ok {
            warn!(
                status = ?response.status,
                problem = ?response.problem,
                "Backend logout failed, clearing local session anyway"
            );
        }
    }

    /// Local-only logout, used when the session is already known to be dead
    pub fn force_logout(&self) {
        self.clear_local_session();
    }

    /// Bootstrap, start the periodic check and subscribe 401 recovery
    pub async fn mount(self: &Arc<Self>) -> MountedSession {
        let subscription = self.client.subscribe(Arc::new(RecoveryInterceptor {
            controller: Arc::downgrade(self),
        }));

        let bootstrap = self.bootstrap().await;

        let cancel = CancellationToken::new();
        let task = tokio::spawn(periodic_check(
            Arc::downgrade(self),
            self.settings.check_interval,
            cancel.clone(),
        ));

        info!(?bootstrap, "Session mounted");
        MountedSession {
            bootstrap,
            cancel,
            task,
            _subscription: subscription,
        }
    }

    /// Log out after a failed refresh, unless the backend was merely
    /// unreachable and the current token has not expired yet.
    ///
    /// Returns whether the session was kept.
    fn settle_failed_refresh(&self, failure: &RefreshFailure, trigger: &str) -> bool {
        if failure.is_transport() && self.coordinator.expiry_status() != ExpiryStatus::Expired {
            warn!(
                trigger,
                "Token refresh could not reach the server, keeping session: {}", failure
            );
            self.shell.notify(Notice::warning(
                "Unable to reach the server to renew your session. Retrying shortly.",
            ));
            return true;
        }

        warn!(trigger, "Token refresh failed, signing out: {}", failure);
        self.force_logout();
        false
    }

    fn install_authorization_header(&self) {
        if let Some(authorization) = self.session.authorization() {
            if let Err(e) = self
                .client
                .set_header(AUTHORIZATION.as_str(), &authorization)
            {
                warn!("Stored token is not a valid header value: {}", e);
            }
        }
    }

    fn clear_local_session(&self) {
        if let Err(e) = self.session.clear() {
            warn!("Failed to clear stored session: {}", e);
        }
        self.client.delete_header(AUTHORIZATION.as_str());

        let route = self.shell.current_route();
        if !same_route(&route, &self.settings.login_route) {
            self.shell.navigate(&self.settings.login_route);
        }
        info!("Signed out");
    }
}

/// Runs local logout cleanup when dropped
struct LocalCleanup<'a>(&'a SessionController);

impl Drop for LocalCleanup<'_> {
    fn drop(&mut self) {
        self.0.clear_local_session();
    }
}

/// Keeps a mounted session alive; dropping it unmounts
#[must_use = "dropping a MountedSession unmounts it immediately"]
pub struct MountedSession {
    bootstrap: BootstrapOutcome,
    cancel: CancellationToken,
    task: JoinHandle<()>,
    _subscription: Subscription,
}

impl MountedSession {
    pub fn bootstrap_outcome(&self) -> BootstrapOutcome {
        self.bootstrap
    }

    /// Stop the periodic check and remove 401 recovery
    pub fn unmount(self) {
        drop(self);
    }
}

impl Drop for MountedSession {
    fn drop(&mut self) {
        self.cancel.cancel();
        self.task.abort();
        debug!("Session unmounted");
    }
}

async fn periodic_check(
    controller: Weak<SessionController>,
    period: Duration,
    cancel: CancellationToken,
) {
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {
                let Some(controller) = controller.upgrade() else {
                    break;
                };
                if let Some(outcome) = controller.check_expiry().await {
                    debug!(success = outcome.is_success(), "Periodic token refresh finished");
                }
            }
        }
    }
    debug!("Periodic session check stopped");
}

/// Refresh-and-retry on 401, plus user notices for transport failures
struct RecoveryInterceptor {
    controller: Weak<SessionController>,
}

#[async_trait]
impl ResponseInterceptor for RecoveryInterceptor {
    async fn on_response(&self, client: &HttpClient, response: ApiResponse) -> ApiResponse {
        let Some(controller) = self.controller.upgrade() else {
            return response;
        };

        // session calls report their own failures
        if let Some(problem) = response
            .problem
            .filter(|p| p.is_transport() && response.request.recoverable)
        {
            controller.shell.notify(Notice::error(format!(
                "Unable to reach the server ({problem}). Check your connection and try again."
            )));
            return response;
        }

        if !response.is_unauthorized() || response.attempt > 0 || !response.request.recoverable {
            return response;
        }

        info!(
            method = %response.request.method,
            path = %response.request.path,
            "Request unauthorized, refreshing token"
        );
        match controller.coordinator.refresh().await {
            RefreshOutcome::Refreshed => {
                client
                    .dispatch(response.request.clone(), response.attempt + 1)
                    .await
            }
            RefreshOutcome::Failed(failure) => {
                controller.settle_failed_refresh(&failure, "unauthorized response");
                response
            }
        }
    }
}
