//! HTTP client for the OpsDesk backend
//!
//! One [`HttpClient`] serves every backend call. Verb methods never fail on
//! HTTP-level errors: they resolve to an [`ApiResponse`] envelope carrying
//! `ok`, the parsed body and a [`Problem`] classification.
//!
//! # Usage
//!
//! ```rust,no_run
//! use opsdesk_sdk::{ClientBuilder, SessionStore};
//! use serde_json::json;
//!
//! # async fn example() -> opsdesk_sdk::Result<()> {
//! let client = ClientBuilder::default()
//!     .base_url("https://ops.example.com/api")
//!     .session(SessionStore::in_memory())
//!     .build()?;
//!
//! let response = client.post("/rooms", Some(json!({ "block": "A" }))).await;
//! if !response.ok {
//!     eprintln!("failed: {:?}", response.problem);
//! }
//! # Ok(())
//! # }
//! ```

use crate::error::{ApiError, Result};
use crate::interceptors::{
    self, InterceptorHandle, InterceptorRegistry, ResponseInterceptor, Subscription,
};
use crate::session::SessionStore;
use parking_lot::RwLock;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, CONTENT_TYPE};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Default API URL when not specified
pub const DEFAULT_API_URL: &str = "http://localhost:8000/api";

/// Default timeout in seconds for API requests
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Failure classification of a response envelope
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Problem {
    /// 4xx status
    ClientError,
    /// 5xx status
    ServerError,
    /// No response before the deadline
    TimeoutError,
    /// Connection refused or reset
    ConnectionError,
    /// Any other failure to get a response
    NetworkError,
    /// 2xx status with an error payload
    ApplicationError,
    /// Non-2xx status outside the 4xx/5xx ranges
    UnknownError,
}

impl Problem {
    fn from_status(status: u16) -> Option<Self> {
        match status {
            200..=299 => None,
            400..=499 => Some(Problem::ClientError),
            500..=599 => Some(Problem::ServerError),
            _ => Some(Problem::UnknownError),
        }
    }

    fn from_transport(error: &reqwest::Error) -> Self {
        if error.is_timeout() {
            Problem::TimeoutError
        } else if error.is_connect() {
            Problem::ConnectionError
        } else {
            Problem::NetworkError
        }
    }

    /// No response was received at all
    pub fn is_transport(self) -> bool {
        matches!(
            self,
            Problem::TimeoutError | Problem::ConnectionError | Problem::NetworkError
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Problem::ClientError => "CLIENT_ERROR",
            Problem::ServerError => "SERVER_ERROR",
            Problem::TimeoutError => "TIMEOUT_ERROR",
            Problem::ConnectionError => "CONNECTION_ERROR",
            Problem::NetworkError => "NETWORK_ERROR",
            Problem::ApplicationError => "APPLICATION_ERROR",
            Problem::UnknownError => "UNKNOWN_ERROR",
        }
    }
}

impl fmt::Display for Problem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable description of a call, kept so it can be re-issued verbatim
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestDescriptor {
    pub method: Method,
    pub path: String,
    pub payload: Option<Value>,
    /// Whether a 401 may trigger refresh-and-retry
    pub recoverable: bool,
}

impl RequestDescriptor {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            payload: None,
            recoverable: true,
        }
    }

    pub fn with_payload(mut self, payload: Value) -> Self {
        self.payload = Some(payload);
        self
    }

    /// Opt out of 401 recovery (session endpoints themselves)
    pub fn without_recovery(mut self) -> Self {
        self.recoverable = false;
        self
    }
}

/// Normalized result of a call
#[derive(Debug, Clone)]
pub struct ApiResponse {
    /// 2xx and no error payload
    pub ok: bool,
    /// HTTP status, absent when no response arrived
    pub status: Option<u16>,
    /// Parsed body; non-JSON bodies are kept as a string value
    pub data: Option<Value>,
    pub problem: Option<Problem>,
    /// Transport error detail when no response arrived
    pub transport_error: Option<String>,
    pub request: Arc<RequestDescriptor>,
    /// 0 for the original call, 1 for its single retry
    pub attempt: u32,
}

impl ApiResponse {
    /// HTTP status, or the embedded `code` of a soft error
    pub fn effective_status(&self) -> Option<u16> {
        if self.problem == Some(Problem::ApplicationError) {
            if let Some(code) = self
                .data
                .as_ref()
                .and_then(interceptors::soft_error)
                .and_then(|e| e.code)
                .and_then(|c| u16::try_from(c).ok())
                .filter(|c| *c >= 400)
            {
                return Some(code);
            }
        }
        self.status
    }

    pub fn is_unauthorized(&self) -> bool {
        self.effective_status() == Some(401)
    }

    /// Payload of a successful call: `data.data` when present, else the whole body
    pub fn payload(&self) -> Option<&Value> {
        let body = self.data.as_ref()?;
        Some(body.get("data").unwrap_or(body))
    }

    /// Convert into a typed result, mapping failures to [`ApiError`]
    pub fn into_result<T: DeserializeOwned>(self) -> Result<T> {
        if !self.ok {
            return Err(self.to_error());
        }
        let payload = self.payload().cloned().unwrap_or(Value::Null);
        serde_json::from_value(payload).map_err(ApiError::Serialization)
    }

    /// Error equivalent of a failed envelope
    pub fn to_error(&self) -> ApiError {
        let message = self.error_message();

        match self.problem {
            Some(Problem::TimeoutError) => return ApiError::Timeout,
            Some(Problem::ConnectionError) | Some(Problem::NetworkError) => {
                return ApiError::Network {
                    message: self
                        .transport_error
                        .clone()
                        .unwrap_or_else(|| "no response received".to_string()),
                }
            }
            _ => {}
        }

        match self.effective_status() {
            Some(401) => ApiError::Authentication {
                message: message.unwrap_or_else(|| "Authentication failed".into()),
            },
            Some(403) => ApiError::Authorization {
                message: message.unwrap_or_else(|| "Access forbidden".into()),
            },
            Some(404) => ApiError::NotFound {
                resource: message.unwrap_or_else(|| self.request.path.clone()),
            },
            Some(429) => ApiError::RateLimitExceeded,
            Some(400) => ApiError::BadRequest {
                message: message.unwrap_or_default(),
            },
            Some(503) => ApiError::ServiceUnavailable,
            _ if self.problem == Some(Problem::ApplicationError) => ApiError::Application {
                message: message.unwrap_or_else(|| "Request failed".into()),
                code: self
                    .data
                    .as_ref()
                    .and_then(interceptors::soft_error)
                    .and_then(|e| e.code),
            },
            status => ApiError::Internal {
                message: match (status, message) {
                    (Some(s), Some(m)) => format!("Request failed with status {s}: {m}"),
                    (Some(s), None) => format!("Request failed with status {s}"),
                    (None, Some(m)) => m,
                    (None, None) => "Request failed".to_string(),
                },
            },
        }
    }

    fn error_message(&self) -> Option<String> {
        let body = self.data.as_ref()?;
        if let Some(soft) = interceptors::soft_error(body) {
            return Some(soft.message);
        }
        match body {
            Value::String(s) if !s.is_empty() => Some(s.clone()),
            Value::Object(map) => map
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_string),
            _ => None,
        }
    }
}

/// HTTP client for interacting with the OpsDesk backend
pub struct HttpClient {
    http: reqwest::Client,
    base_url: String,
    default_headers: RwLock<HeaderMap>,
    session: SessionStore,
    interceptors: Arc<InterceptorRegistry>,
}

impl fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpClient")
            .field("base_url", &self.base_url)
            .field("interceptors", &self.interceptors.len())
            .finish()
    }
}

impl HttpClient {
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    /// Set a default header for all future requests
    pub fn set_header(&self, name: &str, value: &str) -> Result<()> {
        let name = HeaderName::from_bytes(name.as_bytes()).map_err(|e| ApiError::InvalidRequest {
            message: format!("Invalid header name '{name}': {e}"),
        })?;
        let mut value = HeaderValue::from_str(value).map_err(|e| ApiError::InvalidRequest {
            message: format!("Invalid header value for '{name}': {e}"),
        })?;
        if name == reqwest::header::AUTHORIZATION {
            value.set_sensitive(true);
        }
        self.default_headers.write().insert(name, value);
        Ok(())
    }

    /// Remove a default header; unknown names are ignored
    pub fn delete_header(&self, name: &str) {
        if let Ok(name) = HeaderName::from_bytes(name.as_bytes()) {
            self.default_headers.write().remove(name);
        }
    }

    /// Current value of a default header
    pub fn header(&self, name: &str) -> Option<String> {
        self.default_headers
            .read()
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    }

    /// Register a response interceptor
    pub fn add_response_interceptor(
        &self,
        interceptor: Arc<dyn ResponseInterceptor>,
    ) -> InterceptorHandle {
        self.interceptors.add(interceptor)
    }

    /// Remove a response interceptor
    pub fn eject_response_interceptor(&self, handle: InterceptorHandle) -> bool {
        self.interceptors.eject(handle)
    }

    /// Register a response interceptor for the lifetime of the returned guard
    pub fn subscribe(&self, interceptor: Arc<dyn ResponseInterceptor>) -> Subscription {
        let handle = self.interceptors.add(interceptor);
        Subscription::new(&self.interceptors, handle)
    }

    pub fn interceptor_count(&self) -> usize {
        self.interceptors.len()
    }

    pub async fn get(&self, path: &str) -> ApiResponse {
        self.request(RequestDescriptor::new(Method::GET, path)).await
    }

    pub async fn post(&self, path: &str, payload: Option<Value>) -> ApiResponse {
        self.request(with_payload(RequestDescriptor::new(Method::POST, path), payload))
            .await
    }

    pub async fn put(&self, path: &str, payload: Option<Value>) -> ApiResponse {
        self.request(with_payload(RequestDescriptor::new(Method::PUT, path), payload))
            .await
    }

    pub async fn delete(&self, path: &str, payload: Option<Value>) -> ApiResponse {
        self.request(with_payload(RequestDescriptor::new(Method::DELETE, path), payload))
            .await
    }

    /// Issue a described request as a first attempt
    pub async fn request(&self, request: RequestDescriptor) -> ApiResponse {
        self.dispatch(Arc::new(request), 0).await
    }

    /// Issue `request` as attempt number `attempt`, running the full pipeline
    ///
    /// An interceptor that re-dispatches returns a response for a later
    /// attempt. That response has already been through the whole chain, so
    /// the remaining interceptors are skipped for it.
    pub async fn dispatch(&self, request: Arc<RequestDescriptor>, attempt: u32) -> ApiResponse {
        let mut response = self.send(request, attempt).await;
        interceptors::normalize_response(&mut response);

        for interceptor in self.interceptors.snapshot() {
            response = interceptor.on_response(self, response).await;
            if response.attempt != attempt {
                break;
            }
        }
        response
    }

    async fn send(&self, request: Arc<RequestDescriptor>, attempt: u32) -> ApiResponse {
        let url = self.url(&request.path);
        let mut headers = self.default_headers.read().clone();
        interceptors::apply_authorization(&self.session, &mut headers);

        debug!(method = %request.method, %url, attempt, "Sending request");

        let mut builder = self
            .http
            .request(request.method.clone(), &url)
            .headers(headers);
        if let Some(payload) = &request.payload {
            builder = builder.json(payload);
        }

        let outcome = match builder.send().await {
            Ok(resp) => {
                let status = resp.status().as_u16();
                resp.text().await.map(|text| (status, text))
            }
            Err(e) => Err(e),
        };

        match outcome {
            Ok((status, text)) => {
                let problem = Problem::from_status(status);
                ApiResponse {
                    ok: problem.is_none(),
                    status: Some(status),
                    data: parse_body(&text),
                    problem,
                    transport_error: None,
                    request,
                    attempt,
                }
            }
            Err(e) => ApiResponse {
                ok: false,
                status: None,
                data: None,
                problem: Some(Problem::from_transport(&e)),
                transport_error: Some(e.to_string()),
                request,
                attempt,
            },
        }
    }

    fn url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_string();
        }
        let base = self.base_url.trim_end_matches('/');
        if path.starts_with('/') {
            format!("{base}{path}")
        } else {
            format!("{base}/{path}")
        }
    }
}

fn with_payload(request: RequestDescriptor, payload: Option<Value>) -> RequestDescriptor {
    match payload {
        Some(payload) => request.with_payload(payload),
        None => request,
    }
}

fn parse_body(text: &str) -> Option<Value> {
    if text.trim().is_empty() {
        return None;
    }
    Some(serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string())))
}

/// Builder for constructing an [`HttpClient`]
#[derive(Default)]
pub struct ClientBuilder {
    base_url: Option<String>,
    timeout: Option<Duration>,
    connect_timeout: Option<Duration>,
    session: Option<SessionStore>,
    headers: Vec<(String, String)>,
}

impl ClientBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the base URL for the API
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Set the request timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set the connection timeout
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Session read by the outgoing interceptor
    pub fn session(mut self, session: SessionStore) -> Self {
        self.session = Some(session);
        self
    }

    /// Extra default header
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Build the client
    pub fn build(self) -> Result<HttpClient> {
        let base_url = self.base_url.unwrap_or_else(|| DEFAULT_API_URL.to_string());
        url::Url::parse(&base_url).map_err(|e| ApiError::InvalidRequest {
            message: format!("Invalid base URL '{base_url}': {e}"),
        })?;

        let mut http = reqwest::Client::builder().timeout(
            self.timeout
                .unwrap_or(Duration::from_secs(DEFAULT_TIMEOUT_SECS)),
        );
        if let Some(connect_timeout) = self.connect_timeout {
            http = http.connect_timeout(connect_timeout);
        }
        let http = http.build().map_err(ApiError::HttpClient)?;

        let mut default_headers = HeaderMap::new();
        default_headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        default_headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let client = HttpClient {
            http,
            base_url,
            default_headers: RwLock::new(default_headers),
            session: self.session.unwrap_or_else(SessionStore::in_memory),
            interceptors: Arc::new(InterceptorRegistry::default()),
        };
        for (name, value) in &self.headers {
            client.set_header(name, value)?;
        }
        Ok(client)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::types::TokenGrant;
    use crate::session::now_ms;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer, session: SessionStore) -> HttpClient {
        ClientBuilder::default()
            .base_url(server.uri())
            .session(session)
            .build()
            .unwrap()
    }

    fn signed_in(token: &str) -> SessionStore {
        let session = SessionStore::in_memory();
        session
            .store_token(
                &TokenGrant::new(token)
                    .with_token_type("Bearer")
                    .with_expires_in(3600),
                now_ms(),
                Duration::from_secs(3600),
            )
            .unwrap();
        session
    }

    #[tokio::test]
    async fn test_json_defaults_and_bearer_injection() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/hostels"))
            .and(header("Authorization", "Bearer abc"))
            .and(header("Accept", "application/json"))
            .and(header("Content-Type", "application/json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": [1, 2] })))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server, signed_in("abc"));
        let response = client.get("/hostels").await;

        assert!(response.ok);
        assert_eq!(response.status, Some(200));
        assert_eq!(response.attempt, 0);
        assert_eq!(response.payload(), Some(&json!([1, 2])));
        let ids: Vec<u32> = response.into_result().unwrap();
        assert_eq!(ids, vec![1, 2]);
    }

    #[tokio::test]
    async fn test_session_token_wins_over_stale_default_header() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rooms"))
            .and(header("Authorization", "Bearer fresh"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server, signed_in("fresh"));
        client.set_header("Authorization", "Bearer stale").unwrap();

        assert!(client.get("/rooms").await.ok);
    }

    #[tokio::test]
    async fn test_payload_is_sent_as_json() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/blocks/4"))
            .and(body_json(json!({ "name": "B" })))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server, SessionStore::in_memory());
        let response = client.put("/blocks/4", Some(json!({ "name": "B" }))).await;

        assert!(response.ok);
        assert!(response.data.is_none());
    }

    #[tokio::test]
    async fn test_http_errors_resolve_to_envelope() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/rooms/9"))
            .respond_with(
                ResponseTemplate::new(404).set_body_json(json!({ "message": "Room not found" })),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/plant"))
            .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
            .mount(&server)
            .await;

        let client = client_for(&server, SessionStore::in_memory());

        let missing = client.delete("/rooms/9", None).await;
        assert!(!missing.ok);
        assert_eq!(missing.problem, Some(Problem::ClientError));
        assert!(matches!(
            missing.to_error(),
            ApiError::NotFound { resource } if resource == "Room not found"
        ));

        let down = client.get("/plant").await;
        assert_eq!(down.problem, Some(Problem::ServerError));
        assert_eq!(down.data, Some(Value::String("maintenance".into())));
        assert!(matches!(down.into_result::<Value>(), Err(ApiError::ServiceUnavailable)));
    }

    #[tokio::test]
    async fn test_soft_error_is_a_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/oxygen/orders"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "error": "Cylinder stock exhausted", "code": 409 })),
            )
            .mount(&server)
            .await;

        let client = client_for(&server, SessionStore::in_memory());
        let response = client.post("/oxygen/orders", Some(json!({}))).await;

        assert!(!response.ok);
        assert_eq!(response.status, Some(200));
        assert_eq!(response.problem, Some(Problem::ApplicationError));
        assert_eq!(response.effective_status(), Some(409));
        match response.into_result::<Value>() {
            Err(ApiError::Application { message, code }) => {
                assert_eq!(message, "Cylinder stock exhausted");
                assert_eq!(code, Some(409));
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_soft_401_counts_as_unauthorized() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/me"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "error": "x", "code": 401 })),
            )
            .mount(&server)
            .await;

        let client = client_for(&server, SessionStore::in_memory());
        let response = client.get("/me").await;
        assert!(response.is_unauthorized());
        assert!(matches!(response.to_error(), ApiError::Authentication { .. }));
    }

    #[tokio::test]
    async fn test_timeout_classification() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/slow"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
            .mount(&server)
            .await;

        let client = ClientBuilder::default()
            .base_url(server.uri())
            .timeout(Duration::from_millis(200))
            .build()
            .unwrap();
        let response = client.get("/slow").await;

        assert!(!response.ok);
        assert!(response.status.is_none());
        assert_eq!(response.problem, Some(Problem::TimeoutError));
        assert!(response.problem.unwrap().is_transport());
        assert!(matches!(response.to_error(), ApiError::Timeout));
    }

    #[tokio::test]
    async fn test_connection_refused_classification() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = ClientBuilder::default()
            .base_url(format!("http://{addr}"))
            .build()
            .unwrap();
        let response = client.get("/anything").await;

        assert!(!response.ok);
        assert_eq!(response.problem, Some(Problem::ConnectionError));
        assert!(response.transport_error.is_some());
        assert!(response.to_error().is_retryable());
    }

    #[tokio::test]
    async fn test_default_header_mutation() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/ping"))
            .and(header("X-Business-Unit", "farm"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/ping"))
            .respond_with(ResponseTemplate::new(418))
            .mount(&server)
            .await;

        let client = client_for(&server, SessionStore::in_memory());
        client.set_header("X-Business-Unit", "farm").unwrap();
        assert_eq!(client.header("x-business-unit").as_deref(), Some("farm"));
        assert!(client.get("/ping").await.ok);

        client.delete_header("X-Business-Unit");
        assert!(client.header("X-Business-Unit").is_none());
        assert_eq!(client.get("/ping").await.status, Some(418));

        assert!(client.set_header("Bad Header", "x").is_err());
    }

    struct Counting(AtomicUsize);

    #[async_trait]
    impl ResponseInterceptor for Counting {
        async fn on_response(&self, _client: &HttpClient, response: ApiResponse) -> ApiResponse {
            self.0.fetch_add(1, Ordering::SeqCst);
            response
        }
    }

    #[tokio::test]
    async fn test_interceptor_lifetime() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let client = client_for(&server, SessionStore::in_memory());
        let counter = Arc::new(Counting(AtomicUsize::new(0)));

        let handle = client.add_response_interceptor(counter.clone());
        client.get("/a").await;
        assert!(client.eject_response_interceptor(handle));
        client.get("/b").await;
        assert_eq!(counter.0.load(Ordering::SeqCst), 1);

        {
            let _subscription = client.subscribe(counter.clone());
            client.get("/c").await;
        }
        client.get("/d").await;
        assert_eq!(counter.0.load(Ordering::SeqCst), 2);
        assert_eq!(client.interceptor_count(), 0);
    }

    #[test]
    fn test_builder_rejects_bad_base_url() {
        assert!(matches!(
            ClientBuilder::default().base_url("not a url").build(),
            Err(ApiError::InvalidRequest { .. })
        ));
    }

    #[test]
    fn test_builder_with_all_options() {
        let client = ClientBuilder::default()
            .base_url("https://ops.example.com/api/")
            .timeout(Duration::from_secs(60))
            .connect_timeout(Duration::from_secs(5))
            .header("X-Client", "opsdesk")
            .build()
            .unwrap();

        assert_eq!(client.url("/rooms"), "https://ops.example.com/api/rooms");
        assert_eq!(client.url("rooms"), "https://ops.example.com/api/rooms");
        assert_eq!(client.header("X-Client").as_deref(), Some("opsdesk"));
    }
}
