//! Authentication-related types
//!
//! Token and profile payloads as the backend sends them, plus the state and
//! outcome types of the refresh coordinator.

use crate::client::Problem;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;

/// Token type assumed when the backend omits one
pub const DEFAULT_TOKEN_TYPE: &str = "Bearer";

/// Access token issued by `/login` or `/refresh`
#[derive(Clone, Deserialize, PartialEq, Eq)]
pub struct TokenGrant {
    #[serde(alias = "accessToken")]
    pub access_token: String,

    #[serde(default, alias = "tokenType")]
    pub token_type: Option<String>,

    /// Lifetime in seconds
    #[serde(default, alias = "expiresIn", deserialize_with = "lenient_u64")]
    pub expires_in: Option<u64>,

    #[serde(default, alias = "refreshToken")]
    pub refresh_token: Option<String>,
}

impl TokenGrant {
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            token_type: None,
            expires_in: None,
            refresh_token: None,
        }
    }

    pub fn with_token_type(mut self, token_type: impl Into<String>) -> Self {
        self.token_type = Some(token_type.into());
        self
    }

    pub fn with_expires_in(mut self, seconds: u64) -> Self {
        self.expires_in = Some(seconds);
        self
    }

    pub fn with_refresh_token(mut self, token: impl Into<String>) -> Self {
        self.refresh_token = Some(token.into());
        self
    }

    /// Token type, falling back to [`DEFAULT_TOKEN_TYPE`] when absent or blank
    pub fn token_type(&self) -> &str {
        self.token_type
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .unwrap_or(DEFAULT_TOKEN_TYPE)
    }

    /// `Authorization` header value for this grant
    pub fn authorization(&self) -> String {
        format!("{} {}", self.token_type(), self.access_token)
    }

    /// A grant is usable only with a non-blank access token
    pub fn is_usable(&self) -> bool {
        !self.access_token.trim().is_empty()
    }
}

impl fmt::Debug for TokenGrant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenGrant")
            .field("token_type", &self.token_type())
            .field("expires_in", &self.expires_in)
            .field("has_refresh_token", &self.refresh_token.is_some())
            .finish()
    }
}

/// Signed-in employee as cached in the session
///
/// Accepts the backend's spellings as well as its own serialized form. When
/// several spellings of a field are present, the first listed in
/// [`ProfilePayload`] wins.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(try_from = "ProfilePayload")]
pub struct UserProfile {
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_origin: Option<String>,
}

#[derive(Deserialize)]
struct ProfilePayload {
    #[serde(rename = "Employee_ID")]
    employee_id_upper: Option<Value>,
    employee_id: Option<Value>,
    id: Option<Value>,
    name: Option<Value>,
    #[serde(rename = "Name")]
    name_upper: Option<Value>,
    email: Option<Value>,
    #[serde(rename = "Email")]
    email_upper: Option<Value>,
    customer_id: Option<Value>,
    #[serde(rename = "customerId")]
    customer_id_camel: Option<Value>,
    #[serde(rename = "Customer_ID")]
    customer_id_upper: Option<Value>,
    customer_origin: Option<Value>,
    #[serde(rename = "customerOrigin")]
    customer_origin_camel: Option<Value>,
}

impl TryFrom<ProfilePayload> for UserProfile {
    type Error = String;

    fn try_from(raw: ProfilePayload) -> Result<Self, Self::Error> {
        let id = first_scalar([raw.employee_id_upper, raw.employee_id, raw.id])
            .ok_or_else(|| "profile has no string or numeric employee id".to_string())?;
        Ok(Self {
            id,
            name: first_scalar([raw.name, raw.name_upper]).unwrap_or_default(),
            email: first_scalar([raw.email, raw.email_upper]).unwrap_or_default(),
            customer_id: first_scalar([
                raw.customer_id,
                raw.customer_id_camel,
                raw.customer_id_upper,
            ]),
            customer_origin: first_scalar([raw.customer_origin, raw.customer_origin_camel]),
        })
    }
}

/// First candidate that is a string or a number, rendered as a string
fn first_scalar<const N: usize>(candidates: [Option<Value>; N]) -> Option<String> {
    candidates.into_iter().flatten().find_map(|value| match value {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

/// Login form payload
#[derive(Clone, Serialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Refresh coordinator state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RefreshState {
    #[default]
    Idle,
    Refreshing,
    Succeeded,
    Failed,
}

/// Why a refresh did not produce a new token
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshFailure {
    /// The refresh endpoint answered with a hard or soft error, or not at all
    Rejected {
        status: Option<u16>,
        problem: Option<Problem>,
    },
    /// The response carried no usable access token in any accepted shape
    MissingToken,
    /// The new token could not be persisted
    Storage(String),
}

impl RefreshFailure {
    /// The refresh endpoint could not be reached at all
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            RefreshFailure::Rejected { problem: Some(problem), .. } if problem.is_transport()
        )
    }
}

impl fmt::Display for RefreshFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RefreshFailure::Rejected { status, problem } => {
                write!(f, "refresh rejected (status: ")?;
                match status {
                    Some(s) => write!(f, "{s}")?,
                    None => write!(f, "none")?,
                }
                if let Some(p) = problem {
                    write!(f, ", problem: {p}")?;
                }
                write!(f, ")")
            }
            RefreshFailure::MissingToken => write!(f, "no access token in refresh response"),
            RefreshFailure::Storage(e) => write!(f, "failed to store refreshed token: {e}"),
        }
    }
}

/// Result of one refresh operation, shared by every caller that joined it
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshOutcome {
    Refreshed,
    Failed(RefreshFailure),
}

impl RefreshOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, RefreshOutcome::Refreshed)
    }

    pub(crate) fn state(&self) -> RefreshState {
        match self {
            RefreshOutcome::Refreshed => RefreshState::Succeeded,
            RefreshOutcome::Failed(_) => RefreshState::Failed,
        }
    }
}

fn lenient_u64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u64>, D::Error> {
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Number(n)) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64)),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    })
}
