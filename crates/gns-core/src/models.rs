//! Request and response payloads for the GNS auth endpoints.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Identity snapshot returned alongside a token.
///
/// Advisory only: nothing decides access from these fields. Fields the
/// client doesn't know about are kept so the persisted copy round-trips.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team_id: Option<i64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl UserInfo {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn display_name(&self) -> String {
        match (&self.username, self.id) {
            (Some(name), _) => name.clone(),
            (None, Some(id)) => format!("user #{}", id),
            (None, None) => "unknown user".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthResponse {
    pub token: String,
    #[serde(default)]
    pub user: UserInfo,
}

#[derive(Debug, Serialize)]
pub struct LoginRequest<'a> {
    pub username: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Serialize)]
pub struct RegisterRequest<'a> {
    pub username: &'a str,
    pub password: &'a str,
    pub email: &'a str,
}
