//! Request/response interceptors
//!
//! Two hooks always run around every call:
//! - outgoing: [`apply_authorization`] stamps `Authorization` from the session;
//! - incoming: [`normalize_response`] turns soft errors into failures and logs
//!   transport and status problems.
//!
//! On top of those, components register [`ResponseInterceptor`]s. Registration
//! hands back an [`InterceptorHandle`] for explicit ejection or a
//! [`Subscription`] guard that ejects on drop.

use crate::client::{ApiResponse, HttpClient, Problem};
use crate::session::SessionStore;
use async_trait::async_trait;
use parking_lot::RwLock;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tracing::{debug, error, warn};

/// Hook run on every response after normalization
#[async_trait]
pub trait ResponseInterceptor: Send + Sync {
    /// Inspect or replace `response`.
    ///
    /// `response.request` and `response.attempt` identify the original call and
    /// how many times it has been re-issued. Re-issuing goes through
    /// [`HttpClient::dispatch`] with `attempt + 1`.
    async fn on_response(&self, client: &HttpClient, response: ApiResponse) -> ApiResponse;
}

/// Identifies a registered interceptor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InterceptorHandle(u64);

/// Ordered set of response interceptors
#[derive(Default)]
pub struct InterceptorRegistry {
    next_id: AtomicU64,
    entries: RwLock<Vec<(InterceptorHandle, Arc<dyn ResponseInterceptor>)>>,
}

impl InterceptorRegistry {
    pub fn add(&self, interceptor: Arc<dyn ResponseInterceptor>) -> InterceptorHandle {
        let handle = InterceptorHandle(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.entries.write().push((handle, interceptor));
        debug!(?handle, "Response interceptor registered");
        handle
    }

    /// Remove an interceptor; `false` if it was already gone
    pub fn eject(&self, handle: InterceptorHandle) -> bool {
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|(h, _)| *h != handle);
        let removed = entries.len() != before;
        if removed {
            debug!(?handle, "Response interceptor ejected");
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Registration-ordered copy; the lock is not held while interceptors run
    pub(crate) fn snapshot(&self) -> Vec<Arc<dyn ResponseInterceptor>> {
        self.entries
            .read()
            .iter()
            .map(|(_, interceptor)| interceptor.clone())
            .collect()
    }
}

/// Ejects its interceptor when dropped
#[must_use = "dropping a Subscription ejects the interceptor immediately"]
pub struct Subscription {
    registry: Weak<InterceptorRegistry>,
    handle: InterceptorHandle,
}

impl Subscription {
    pub(crate) fn new(registry: &Arc<InterceptorRegistry>, handle: InterceptorHandle) -> Self {
        Self {
            registry: Arc::downgrade(registry),
            handle,
        }
    }

    pub fn handle(&self) -> InterceptorHandle {
        self.handle
    }

    /// Eject now instead of at drop
    pub fn unsubscribe(self) {
        drop(self);
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            registry.eject(self.handle);
        }
    }
}

/// Outgoing hook: set `Authorization` on this request from the session.
///
/// Reads the store on every call so a request issued right after a token
/// change carries the new token even if the default header lags behind.
pub fn apply_authorization(session: &SessionStore, headers: &mut HeaderMap) {
    let Some(authorization) = session.authorization() else {
        return;
    };
    match HeaderValue::from_str(&authorization) {
        Ok(mut value) => {
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }
        Err(e) => warn!("Stored token is not a valid header value: {}", e),
    }
}

/// Application-level failure carried in a 2xx body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SoftError {
    pub message: String,
    pub code: Option<i64>,
}

/// Detect `{ error: <truthy> }` or `{ code: >= 400 }` in a response body
pub fn soft_error(body: &Value) -> Option<SoftError> {
    let object = body.as_object()?;
    let code = object.get("code").and_then(numeric_code);
    let error = object.get("error").filter(|v| is_truthy(v));

    if error.is_none() && !code.is_some_and(|c| c >= 400) {
        return None;
    }

    let message = error
        .map(describe_error)
        .or_else(|| {
            object
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_string)
        })
        .unwrap_or_else(|| match code {
            Some(c) => format!("request failed with code {c}"),
            None => "request failed".to_string(),
        });

    Some(SoftError { message, code })
}

/// Incoming hook: soft-error normalization and diagnostic logging
pub fn normalize_response(response: &mut ApiResponse) {
    if response.ok {
        if let Some(soft) = response.data.as_ref().and_then(soft_error) {
            debug!(
                path = %response.request.path,
                code = ?soft.code,
                "Treating error payload in successful response as failure"
            );
            response.ok = false;
            response.problem = Some(Problem::ApplicationError);
        }
    }

    log_failure(response);
}

fn log_failure(response: &ApiResponse) {
    if response.ok {
        return;
    }
    let path = &response.request.path;
    let method = &response.request.method;

    match response.status {
        None => warn!(
            %method,
            %path,
            problem = ?response.problem,
            detail = response.transport_error.as_deref().unwrap_or(""),
            "No response received"
        ),
        Some(401) => warn!(%method, %path, "Unauthorized (401)"),
        Some(403) => warn!(%method, %path, "Forbidden (403)"),
        Some(404) => warn!(%method, %path, "Not found (404)"),
        Some(500) => error!(%method, %path, "Internal server error (500)"),
        Some(503) => error!(%method, %path, "Service unavailable (503)"),
        Some(status) => debug!(%method, %path, status, problem = ?response.problem, "Request failed"),
    }
}

fn numeric_code(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn describe_error(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Object(map) => map
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| value.to_string()),
        other => other.to_string(),
    }
}
