//! Session state
//!
//! [`SessionStore`] is the typed view over a [`KeyValueStore`] backend. It is
//! cheap to clone and is passed explicitly to the HTTP client and the refresh
//! coordinator so that both always see the same session.

pub mod keys;
pub mod store;

pub use store::{FileStore, KeyValueStore, MemoryStore, Mutation, StoreError, StoreResult};

use crate::auth::types::{TokenGrant, UserProfile};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Current wall clock in epoch milliseconds
pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Expiration timestamp for a token issued at `issued_at_ms` living `expires_in_secs`
pub fn expiration_ms(issued_at_ms: i64, expires_in_secs: u64) -> i64 {
    let lifetime_ms = i64::try_from(expires_in_secs.saturating_mul(1000)).unwrap_or(i64::MAX);
    issued_at_ms.saturating_add(lifetime_ms)
}

fn set_or_remove<'a>(key: &'a str, value: Option<&'a str>) -> Mutation<'a> {
    match value {
        Some(value) => Mutation::Set(key, value),
        None => Mutation::Remove(key),
    }
}

/// Where a token stands relative to its expiration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpiryStatus {
    /// No token, or a token with no recorded expiration
    Unknown,
    /// Expiration is in the past
    Expired,
    /// Expires within the refresh margin
    ExpiringSoon,
    Valid,
}

impl ExpiryStatus {
    pub fn evaluate(expiration_ms: Option<i64>, now_ms: i64, margin: Duration) -> Self {
        let Some(expiration) = expiration_ms else {
            return ExpiryStatus::Unknown;
        };
        let margin_ms = i64::try_from(margin.as_millis()).unwrap_or(i64::MAX);
        let remaining = expiration.saturating_sub(now_ms);

        if remaining < 0 {
            ExpiryStatus::Expired
        } else if remaining < margin_ms {
            ExpiryStatus::ExpiringSoon
        } else {
            ExpiryStatus::Valid
        }
    }

    /// Whether a proactive refresh should run
    pub fn needs_refresh(self) -> bool {
        matches!(self, ExpiryStatus::Expired | ExpiryStatus::ExpiringSoon)
    }
}

/// Point-in-time copy of the persisted session
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Session {
    pub access_token: Option<String>,
    pub token_type: Option<String>,
    pub expires_in_secs: Option<u64>,
    pub expiration_ms: Option<i64>,
    pub refresh_token: Option<String>,
    pub profile: Option<UserProfile>,
}

impl Session {
    pub fn is_authenticated(&self) -> bool {
        self.access_token.is_some()
    }

    pub fn expiry_status(&self, now_ms: i64, margin: Duration) -> ExpiryStatus {
        if self.access_token.is_none() {
            return ExpiryStatus::Unknown;
        }
        ExpiryStatus::evaluate(self.expiration_ms, now_ms, margin)
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("authenticated", &self.access_token.is_some())
            .field("token_type", &self.token_type)
            .field("expiration_ms", &self.expiration_ms)
            .field("has_refresh_token", &self.refresh_token.is_some())
            .field("profile", &self.profile)
            .finish()
    }
}

/// Typed access to session keys over a shared backend
#[derive(Clone, Debug)]
pub struct SessionStore {
    backend: Arc<dyn KeyValueStore>,
}

impl SessionStore {
    pub fn new(backend: Arc<dyn KeyValueStore>) -> Self {
        Self { backend }
    }

    /// Fresh in-memory session
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()))
    }

    /// Raw backend access
    pub fn backend(&self) -> &dyn KeyValueStore {
        self.backend.as_ref()
    }

    fn non_empty(&self, key: &str) -> Option<String> {
        self.backend.get(key).filter(|v| !v.trim().is_empty())
    }

    pub fn access_token(&self) -> Option<String> {
        self.non_empty(keys::AUTH_TOKEN)
    }

    pub fn token_type(&self) -> Option<String> {
        self.non_empty(keys::TOKEN_TYPE)
    }

    pub fn refresh_token(&self) -> Option<String> {
        self.non_empty(keys::REFRESH_TOKEN)
    }

    pub fn expiration_ms(&self) -> Option<i64> {
        self.non_empty(keys::TOKEN_EXPIRATION)
            .and_then(|v| v.trim().parse().ok())
    }

    /// `"{tokenType} {accessToken}"`, only when both are stored
    pub fn authorization(&self) -> Option<String> {
        let token = self.access_token()?;
        let token_type = self.token_type()?;
        Some(format!("{token_type} {token}"))
    }

    pub fn is_authenticated(&self) -> bool {
        self.access_token().is_some()
    }

    /// Cached profile decoded from `userInfo`
    pub fn profile(&self) -> Option<UserProfile> {
        let raw = self.non_empty(keys::USER_INFO)?;
        match serde_json::from_str(&raw) {
            Ok(profile) => Some(profile),
            Err(e) => {
                warn!("Ignoring unreadable cached user profile: {}", e);
                None
            }
        }
    }

    pub fn snapshot(&self) -> Session {
        Session {
            access_token: self.access_token(),
            token_type: self.token_type(),
            expires_in_secs: self
                .non_empty(keys::EXPIRES_IN)
                .and_then(|v| v.trim().parse().ok()),
            expiration_ms: self.expiration_ms(),
            refresh_token: self.refresh_token(),
            profile: self.profile(),
        }
    }

    /// Persist a freshly issued token.
    ///
    /// `default_ttl` stands in for a missing `expires_in` so the expiration is
    /// always written together with the token. Identity keys are not touched.
    pub fn store_token(
        &self,
        grant: &TokenGrant,
        issued_at_ms: i64,
        default_ttl: Duration,
    ) -> StoreResult<()> {
        let expires_in = grant.expires_in.unwrap_or_else(|| default_ttl.as_secs());
        let expiration = expiration_ms(issued_at_ms, expires_in);

        let expires_in_value = expires_in.to_string();
        let expiration_value = expiration.to_string();
        let mut batch = vec![
            Mutation::Set(keys::AUTH_TOKEN, &grant.access_token),
            Mutation::Set(keys::TOKEN_TYPE, grant.token_type()),
            Mutation::Set(keys::EXPIRES_IN, &expires_in_value),
            Mutation::Set(keys::TOKEN_EXPIRATION, &expiration_value),
        ];
        if let Some(refresh_token) = grant.refresh_token.as_deref().filter(|t| !t.is_empty()) {
            batch.push(Mutation::Set(keys::REFRESH_TOKEN, refresh_token));
        }
        self.backend.apply(&batch)?;

        debug!(expiration_ms = expiration, "Stored access token");
        Ok(())
    }

    /// Persist the signed-in user's identity fields
    pub fn store_profile(&self, profile: &UserProfile) -> StoreResult<()> {
        let user_info = serde_json::to_string(profile)?;
        self.backend.apply(&[
            Mutation::Set(keys::USER_INFO, &user_info),
            Mutation::Set(keys::EMPLOYEE_ID, &profile.id),
            Mutation::Set(keys::USER_NAME, &profile.name),
            Mutation::Set(keys::USER_EMAIL, &profile.email),
            set_or_remove(keys::CUSTOMER_ID, profile.customer_id.as_deref()),
            set_or_remove(keys::CUSTOMER_ORIGIN, profile.customer_origin.as_deref()),
        ])
    }

    /// Remove every session-derived key
    pub fn clear(&self) -> StoreResult<()> {
        self.backend.clear(keys::SESSION_KEYS)
    }
}
