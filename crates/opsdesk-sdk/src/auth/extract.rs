//! Token and profile extraction from backend payloads
//!
//! The backend has shipped several envelope shapes over time. Each accepted
//! shape is one extractor; they are tried in order and the first one yielding
//! a usable access token wins.

use super::types::{TokenGrant, UserProfile};
use serde_json::Value;

type Extractor = fn(&Value) -> Option<&Value>;

/// Candidate token locations, most specific first
const TOKEN_EXTRACTORS: [(&str, Extractor); 4] = [
    ("data.authorization", data_authorization),
    ("data", data),
    ("authorization", authorization),
    ("body", body),
];

/// Candidate profile locations
const PROFILE_EXTRACTORS: [(&str, Extractor); 4] = [
    ("data.employee", data_employee),
    ("employee", employee),
    ("data.user", data_user),
    ("user", user),
];

fn data_authorization(body: &Value) -> Option<&Value> {
    body.get("data")?.get("authorization")
}

fn data(body: &Value) -> Option<&Value> {
    body.get("data")
}

fn authorization(body: &Value) -> Option<&Value> {
    body.get("authorization")
}

fn body(body: &Value) -> Option<&Value> {
    Some(body)
}

fn data_employee(body: &Value) -> Option<&Value> {
    body.get("data")?.get("employee")
}

fn employee(body: &Value) -> Option<&Value> {
    body.get("employee")
}

fn data_user(body: &Value) -> Option<&Value> {
    body.get("data")?.get("user")
}

fn user(body: &Value) -> Option<&Value> {
    body.get("user")
}

fn grant_from(candidate: &Value) -> Option<TokenGrant> {
    if !candidate.is_object() {
        return None;
    }
    serde_json::from_value::<TokenGrant>(candidate.clone())
        .ok()
        .filter(TokenGrant::is_usable)
}

/// First usable token grant in `body`, with the name of the shape that matched
pub fn extract_token(body: &Value) -> Option<(&'static str, TokenGrant)> {
    TOKEN_EXTRACTORS.iter().find_map(|(shape, extractor)| {
        extractor(body)
            .and_then(grant_from)
            .map(|grant| (*shape, grant))
    })
}

/// Employee profile carried alongside a login token
pub fn extract_profile(body: &Value) -> Option<UserProfile> {
    PROFILE_EXTRACTORS.iter().find_map(|(_, extractor)| {
        extractor(body)
            .filter(|v| v.is_object())
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn shapes_are_tried_in_order() {
        let nested = json!({
            "data": {
                "authorization": { "access_token": "inner", "token_type": "Bearer" },
                "access_token": "outer"
            }
        });
        let (shape, grant) = extract_token(&nested).unwrap();
        assert_eq!(shape, "data.authorization");
        assert_eq!(grant.access_token, "inner");

        let (shape, grant) = extract_token(&json!({
            "data": { "access_token": "d", "expires_in": 60 }
        }))
        .unwrap();
        assert_eq!(shape, "data");
        assert_eq!(grant.expires_in, Some(60));

        let (shape, _) = extract_token(&json!({
            "authorization": { "accessToken": "a" }
        }))
        .unwrap();
        assert_eq!(shape, "authorization");

        let (shape, grant) = extract_token(&json!({
            "access_token": "top",
            "refresh_token": "r"
        }))
        .unwrap();
        assert_eq!(shape, "body");
        assert_eq!(grant.refresh_token.as_deref(), Some("r"));
    }

    #[test]
    fn blank_token_falls_through_to_next_shape() {
        let body = json!({
            "data": { "authorization": { "access_token": "" } },
            "access_token": "fallback"
        });
        assert_eq!(extract_token(&body).unwrap().1.access_token, "fallback");
    }

    #[test]
    fn nothing_usable() {
        assert!(extract_token(&json!({ "error": "x", "code": 401 })).is_none());
        assert!(extract_token(&json!({ "data": "abc" })).is_none());
        assert!(extract_token(&Value::String("abc".into())).is_none());
    }

    #[test]
    fn profile_from_login_payload() {
        let body = json!({
            "data": {
                "authorization": { "access_token": "abc" },
                "employee": { "Employee_ID": 7, "name": "Jane", "email": "j@x.com" }
            }
        });
        let profile = extract_profile(&body).unwrap();
        assert_eq!(profile.id, "7");
        assert_eq!(profile.name, "Jane");

        assert_eq!(
            extract_profile(&json!({ "user": { "id": "u1" } })).map(|p| p.id),
            Some("u1".to_string())
        );
        assert!(extract_profile(&json!({ "data": {} })).is_none());
    }
}
