// Chat backend payloads
//
// Sessions, messages, per-message feedback, and the product feedback API.
// The chat service is loose about nullability, so most response fields
// are defaulted.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

// ── Enums ───────────────────────────────────────────────────────────

/// Reaction on a single assistant message. Sent as its integer value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FeedbackType {
    /// Clears a previous reaction.
    #[default]
    None,
    Like,
    Dislike,
}

impl FeedbackType {
    pub fn value(self) -> i32 {
        match self {
            Self::None => 0,
            Self::Like => 1,
            Self::Dislike => 2,
        }
    }
}

// ── Requests ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub(crate) struct NewSession<'a> {
    pub user_id: i64,
    pub name: &'a str,
    pub role_id: &'a str,
    pub bot_id: &'a str,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct NewRoleSession<'a> {
    pub role_id: i64,
    pub user_id: i64,
    pub title: &'a str,
    pub desc: &'a str,
}

/// Body of a non-streamed message post.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SessionMessage {
    pub content: String,
    #[serde(rename = "messageType", skip_serializing_if = "Option::is_none")]
    pub message_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<HashMap<String, String>>,
}

impl SessionMessage {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct RetryRequest<'a> {
    pub session_id: &'a str,
    pub message_id: i64,
    pub msg: &'a str,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct StreamRequest<'a> {
    pub session_id: &'a str,
    pub content: &'a str,
}

/// Page selector for [`ChatService::session_messages`](super::ChatService::session_messages).
#[derive(Debug, Clone, Default)]
pub struct MessagePage {
    pub page: Option<u32>,
    pub page_size: Option<u32>,
    /// Fetch messages relative to this message instead of by page.
    pub message_id: Option<String>,
}

// ── Responses ───────────────────────────────────────────────────────

/// One stored chat message.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatMessage {
    pub id: i64,
    pub message_id: String,
    pub session_id: String,
    pub user_id: i64,
    pub content: String,
    pub msg_type: String,
    pub status: String,
    pub created_at: String,
    pub updated_at: String,
    pub deleted: bool,
    pub conversation_id: String,
    pub llm_content: String,
    pub like: i32,
    /// Arbitrary JSON or null.
    pub attachments: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatSession {
    pub user_id: Option<i64>,
    pub name: Option<String>,
    pub session_id: Option<String>,
    pub conversation_id: Option<String>,
    pub role_id: Option<String>,
    pub bot_id: Option<String>,
    pub msg_count: Option<i32>,
    pub start_time: Option<i64>,
    pub end_time: Option<i64>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
    pub last_message: Option<ChatMessage>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MessageList {
    pub msgs: Vec<ChatMessage>,
    pub has_more: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RoleDetail {
    pub role_id: String,
    pub role_name: String,
    pub role_description: String,
    pub role_avatar: String,
    pub bot_id: String,
}

/// Entry in a user's session list.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct UserSession {
    pub user_id: i64,
    pub session_id: String,
    pub conversation_id: String,
    pub role_id: String,
    pub bot_id: String,
    pub name: String,
    pub msg_count: i32,
    pub start_time: i64,
    pub end_time: i64,
    pub created_at: String,
    pub updated_at: String,
    pub last_message: Option<ChatMessage>,
    pub role_detail: Option<RoleDetail>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionList {
    pub sessions: Vec<UserSession>,
    pub has_more: bool,
    pub total: i32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MessageFeedback {
    pub id: i64,
    pub msg_id: String,
    pub user_id: i64,
    #[serde(rename = "type")]
    pub feedback_type: i32,
    pub content: String,
}

// ── Product feedback ────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub(crate) struct NewFeedback<'a> {
    pub feedback_type: i32,
    pub title: &'a str,
    pub description: &'a str,
}

/// A bug report or suggestion filed through the feedback API.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedbackDetail {
    pub id: i64,
    pub feedback_type: i32,
    pub title: String,
    pub description: String,
    pub status: i32,
    pub created_at: String,
    pub updated_at: String,
    pub admin_reply: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedbackList {
    pub feedbacks: Vec<FeedbackDetail>,
    pub total: i32,
    pub offset: i32,
    pub limit: i32,
}
