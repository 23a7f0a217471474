//! Response models for the mdpad server API
//!
//! The server speaks JSON on its session endpoints (`/me`, `/history`)
//! and redirects on the note endpoints. Only the `status` field is a
//! hard contract; display fields may be absent depending on the auth
//! provider, so they are kept lenient (`Option` / defaulted).

use serde::{Deserialize, Serialize};

/// Minimal status envelope returned by session endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthStatus {
    #[serde(default)]
    pub status: String,
}

impl AuthStatus {
    /// Whether the server considers the current session authenticated.
    pub fn is_ok(&self) -> bool {
        self.status == "ok"
    }
}

/// Profile payload from `GET /me`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(default)]
    pub status: String,
    /// Display name of the logged-in user
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Server-side user identifier
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Avatar URL, if the auth provider supplies one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub photo: Option<String>,
}

impl UserProfile {
    pub fn is_ok(&self) -> bool {
        self.status == "ok"
    }
}

/// One entry of the server-side edit history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// Private note identifier
    pub id: String,
    /// Note title as recorded by the server
    #[serde(default)]
    pub text: String,
    /// Last-visited timestamp (milliseconds), if the server reports one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time: Option<i64>,
    /// Tags attached to the note
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

/// Envelope for `GET /history`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryResponse {
    #[serde(default)]
    pub history: Vec<HistoryEntry>,
}
