//! Single-flight token refresh
//!
//! Bootstrap, the periodic check and reactive 401 recovery may all decide to
//! refresh at the same moment. [`RefreshCoordinator::refresh`] makes sure only
//! one `POST /refresh` is in flight: later callers await the same shared
//! future and receive the same [`RefreshOutcome`].

use super::extract::extract_token;
use super::types::{RefreshFailure, RefreshOutcome, RefreshState};
use crate::client::{HttpClient, RequestDescriptor};
use crate::session::{now_ms, ExpiryStatus, SessionStore};
use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use reqwest::header::AUTHORIZATION;
use reqwest::Method;
use serde_json::{Map, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Refresh proactively when the token expires within this window
pub const DEFAULT_REFRESH_MARGIN: Duration = Duration::from_secs(5 * 60);

/// Lifetime assumed when the backend omits `expires_in`
pub const DEFAULT_TOKEN_TTL: Duration = Duration::from_secs(60 * 60);

#[derive(Debug, Clone)]
pub struct RefreshSettings {
    pub endpoint: String,
    pub default_ttl: Duration,
    pub margin: Duration,
}

impl Default for RefreshSettings {
    fn default() -> Self {
        Self {
            endpoint: "/refresh".to_string(),
            default_ttl: DEFAULT_TOKEN_TTL,
            margin: DEFAULT_REFRESH_MARGIN,
        }
    }
}

type InFlight = Shared<BoxFuture<'static, RefreshOutcome>>;

/// Coordinates token refreshes so at most one runs at a time
pub struct RefreshCoordinator {
    client: Arc<HttpClient>,
    session: SessionStore,
    settings: RefreshSettings,
    generation: AtomicU64,
    in_flight: Mutex<Option<(u64, InFlight)>>,
    state: Mutex<RefreshState>,
}

impl std::fmt::Debug for RefreshCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RefreshCoordinator")
            .field("settings", &self.settings)
            .field("state", &self.state())
            .finish()
    }
}

impl RefreshCoordinator {
    pub fn new(client: Arc<HttpClient>, session: SessionStore, settings: RefreshSettings) -> Self {
        Self {
            client,
            session,
            settings,
            generation: AtomicU64::new(0),
            in_flight: Mutex::new(None),
            state: Mutex::new(RefreshState::Idle),
        }
    }

    pub fn settings(&self) -> &RefreshSettings {
        &self.settings
    }

    pub fn state(&self) -> RefreshState {
        // a handle abandoned by cancelled callers may already hold a result
        if let Some((_, handle)) = self.in_flight.lock().as_ref() {
            return match handle.peek() {
                Some(outcome) => outcome.state(),
                None => RefreshState::Refreshing,
            };
        }
        *self.state.lock()
    }

    /// Expiry of the stored token against the refresh margin
    pub fn expiry_status(&self) -> ExpiryStatus {
        if !self.session.is_authenticated() {
            return ExpiryStatus::Unknown;
        }
        ExpiryStatus::evaluate(self.session.expiration_ms(), now_ms(), self.settings.margin)
    }

    /// Refresh only if the stored token is expired or about to expire
    pub async fn refresh_if_needed(&self) -> Option<RefreshOutcome> {
        let status = self.expiry_status();
        if !status.needs_refresh() {
            return None;
        }
        debug!(?status, "Token needs refresh");
        Some(self.refresh().await)
    }

    /// Refresh the access token, joining an in-flight refresh if there is one
    pub async fn refresh(&self) -> RefreshOutcome {
        let (generation, handle) = {
            let mut in_flight = self.in_flight.lock();
            match in_flight.as_ref() {
                Some((generation, handle)) if handle.peek().is_none() => {
                    debug!("Joining in-flight token refresh");
                    (*generation, handle.clone())
                }
                _ => {
                    let generation = self.generation.fetch_add(1, Ordering::Relaxed) + 1;
                    let handle = perform_refresh(
                        self.client.clone(),
                        self.session.clone(),
                        self.settings.clone(),
                    )
                    .boxed()
                    .shared();
                    *in_flight = Some((generation, handle.clone()));
                    *self.state.lock() = RefreshState::Refreshing;
                    (generation, handle)
                }
            }
        };

        let outcome = handle.await;

        let mut in_flight = self.in_flight.lock();
        if matches!(in_flight.as_ref(), Some((current, _)) if *current == generation) {
            *in_flight = None;
            *self.state.lock() = outcome.state();
        }
        outcome
    }
}

async fn perform_refresh(
    client: Arc<HttpClient>,
    session: SessionStore,
    settings: RefreshSettings,
) -> RefreshOutcome {
    let mut payload = Map::new();
    if let Some(token) = session.access_token() {
        payload.insert("token".into(), Value::String(token));
    }
    if let Some(refresh_token) = session.refresh_token() {
        payload.insert("refresh_token".into(), Value::String(refresh_token));
    }

    info!("Refreshing access token");
    let request = RequestDescriptor::new(Method::POST, settings.endpoint.as_str())
        .with_payload(Value::Object(payload))
        .without_recovery();
    let response = client.request(request).await;

    if !response.ok {
        let status = response.effective_status();
        warn!(?status, problem = ?response.problem, "Token refresh rejected");
        return RefreshOutcome::Failed(RefreshFailure::Rejected {
            status,
            problem: response.problem,
        });
    }

    let Some((shape, grant)) = response.data.as_ref().and_then(extract_token) else {
        warn!("Token refresh response carried no access token");
        return RefreshOutcome::Failed(RefreshFailure::MissingToken);
    };

    if let Err(e) = session.store_token(&grant, now_ms(), settings.default_ttl) {
        warn!("Failed to store refreshed token: {}", e);
        return RefreshOutcome::Failed(RefreshFailure::Storage(e.to_string()));
    }
    if let Err(e) = client.set_header(AUTHORIZATION.as_str(), &grant.authorization()) {
        warn!("Refreshed token is not a valid header value: {}", e);
    }

    info!(shape, expires_in = ?grant.expires_in, "Access token refreshed");
    RefreshOutcome::Refreshed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::types::TokenGrant;
    use crate::client::{ClientBuilder, Problem};
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn coordinator(server: &MockServer) -> (Arc<RefreshCoordinator>, Arc<HttpClient>) {
        let session = SessionStore::in_memory();
        session
            .store_token(
                &TokenGrant::new("old")
                    .with_token_type("Bearer")
                    .with_expires_in(60)
                    .with_refresh_token("r1"),
                now_ms(),
                DEFAULT_TOKEN_TTL,
            )
            .unwrap();
        let client = Arc::new(
            ClientBuilder::default()
                .base_url(server.uri())
                .session(session.clone())
                .build()
                .unwrap(),
        );
        client.set_header("Authorization", "Bearer old").unwrap();
        let coordinator = Arc::new(RefreshCoordinator::new(
            client.clone(),
            session,
            RefreshSettings::default(),
        ));
        (coordinator, client)
    }

    #[tokio::test]
    async fn concurrent_triggers_share_one_call() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/refresh"))
            .and(body_json(json!({ "token": "old", "refresh_token": "r1" })))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_delay(Duration::from_millis(200))
                    .set_body_json(json!({
                        "data": {
                            "authorization": {
                                "access_token": "new",
                                "token_type": "Bearer",
                                "expires_in": 3600
                            }
                        }
                    })),
            )
            .expect(1)
            .mount(&server)
            .await;

        let (coordinator, client) = coordinator(&server).await;
        let callers = (0..5).map(|_| {
            let coordinator = coordinator.clone();
            tokio::spawn(async move { coordinator.refresh().await })
        });
        let outcomes = futures::future::join_all(callers).await;

        for outcome in outcomes {
            assert_eq!(outcome.unwrap(), RefreshOutcome::Refreshed);
        }
        assert_eq!(coordinator.state(), RefreshState::Succeeded);
        assert_eq!(client.session().access_token().as_deref(), Some("new"));
        assert_eq!(client.header("Authorization").as_deref(), Some("Bearer new"));
        assert_eq!(client.session().refresh_token().as_deref(), Some("r1"));
        assert_eq!(coordinator.expiry_status(), ExpiryStatus::Valid);
    }

    #[tokio::test]
    async fn concurrent_triggers_share_one_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/refresh"))
            .respond_with(ResponseTemplate::new(401).set_delay(Duration::from_millis(200)))
            .expect(1)
            .mount(&server)
            .await;

        let (coordinator, client) = coordinator(&server).await;
        let before = client.session().snapshot();
        let callers = (0..5).map(|_| {
            let coordinator = coordinator.clone();
            tokio::spawn(async move { coordinator.refresh().await })
        });
        let outcomes = futures::future::join_all(callers).await;

        let expected = RefreshOutcome::Failed(RefreshFailure::Rejected {
            status: Some(401),
            problem: Some(Problem::ClientError),
        });
        for outcome in outcomes {
            assert_eq!(outcome.unwrap(), expected);
        }
        assert_eq!(coordinator.state(), RefreshState::Failed);
        assert_eq!(client.session().snapshot(), before);
        assert_eq!(client.header("Authorization").as_deref(), Some("Bearer old"));
    }

    #[tokio::test]
    async fn settled_refresh_is_not_reused() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/refresh"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "access_token": "next" })),
            )
            .expect(2)
            .mount(&server)
            .await;

        let (coordinator, _client) = coordinator(&server).await;
        assert!(coordinator.refresh().await.is_success());
        assert!(coordinator.refresh().await.is_success());
    }

    #[tokio::test]
    async fn soft_error_fails_without_mutation() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/refresh"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "error": "x", "code": 401 })),
            )
            .expect(1)
            .mount(&server)
            .await;

        let (coordinator, client) = coordinator(&server).await;
        let before = client.session().snapshot();

        let outcome = coordinator.refresh().await;
        assert_eq!(
            outcome,
            RefreshOutcome::Failed(RefreshFailure::Rejected {
                status: Some(401),
                problem: Some(Problem::ApplicationError),
            })
        );
        assert_eq!(coordinator.state(), RefreshState::Failed);
        assert_eq!(client.session().snapshot(), before);
        assert_eq!(client.header("Authorization").as_deref(), Some("Bearer old"));
    }

    #[tokio::test]
    async fn response_without_token_fails() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/refresh"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": {} })))
            .mount(&server)
            .await;

        let (coordinator, client) = coordinator(&server).await;
        assert_eq!(
            coordinator.refresh().await,
            RefreshOutcome::Failed(RefreshFailure::MissingToken)
        );
        assert_eq!(client.session().access_token().as_deref(), Some("old"));
    }

    #[tokio::test]
    async fn refresh_if_needed_respects_margin() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/refresh"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "access_token": "next" })),
            )
            .expect(1)
            .mount(&server)
            .await;

        // 60 s left, inside the 5 minute margin
        let (coordinator, _client) = coordinator(&server).await;
        assert_eq!(coordinator.expiry_status(), ExpiryStatus::ExpiringSoon);
        assert_eq!(
            coordinator.refresh_if_needed().await,
            Some(RefreshOutcome::Refreshed)
        );

        // fresh token with the default one hour lifetime
        assert_eq!(coordinator.expiry_status(), ExpiryStatus::Valid);
        assert!(coordinator.refresh_if_needed().await.is_none());
    }

    #[tokio::test]
    async fn unreachable_backend_is_a_failure() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = Arc::new(
            ClientBuilder::default()
                .base_url(format!("http://{addr}"))
                .build()
                .unwrap(),
        );
        let coordinator =
            RefreshCoordinator::new(client, SessionStore::in_memory(), RefreshSettings::default());

        match coordinator.refresh().await {
            RefreshOutcome::Failed(failure @ RefreshFailure::Rejected { status, problem }) => {
                assert!(status.is_none());
                assert_eq!(problem, Some(Problem::ConnectionError));
                assert!(failure.is_transport());
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }
}
