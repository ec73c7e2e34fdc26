// Account backend payloads
//
// Field names are snake_case on the wire. Optional and late-added fields
// carry `#[serde(default)]` so older servers still decode.

use serde::{Deserialize, Serialize};

// ── Requests ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub(crate) struct Credentials<'a> {
    pub account: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct Registration<'a> {
    pub account: &'a str,
    pub password: &'a str,
    pub name: &'a str,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct PasswordReset<'a> {
    pub account: &'a str,
    pub old_pwd: &'a str,
    pub new_pwd: &'a str,
}

// ── Responses ───────────────────────────────────────────────────────

/// Returned by `POST /api/auth/login`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginData {
    #[serde(default)]
    pub token: String,
    pub user_id: i64,
    #[serde(default)]
    pub account: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub avatar: Option<String>,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub updated_at: String,
}

/// Returned by `POST /api/auth/register`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterData {
    pub user_id: i64,
    #[serde(default)]
    pub account: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub created_at: String,
}

/// Profile record, both read from and written to `/api/user/info`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserInfo {
    pub user_id: i64,
    #[serde(default)]
    pub account: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub avatar: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    /// Account state as reported by the server (1 = active).
    #[serde(default)]
    pub status: i32,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub updated_at: String,
    #[serde(default)]
    pub last_login_at: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct UserInfoData {
    pub info: UserInfo,
}

/// Returned by `POST /api/auth/refresh`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshData {
    #[serde(default)]
    pub token: String,
    #[serde(default)]
    pub user_id: i64,
    /// Unix seconds.
    #[serde(default)]
    pub expires_at: i64,
}

/// Acknowledgement body used by logout and password reset.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Ack {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message: String,
}
