// Chat backend facade
//
// Session management, message history, per-message feedback, the product
// feedback API, and streamed replies over server-sent events.

pub mod models;

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::json;
use tracing::debug;
use url::Url;

use crate::client::{BackendConfig, ServiceClient};
use crate::credential::CredentialStore;
use crate::error::Error;
use crate::sse::{SseHandler, StreamHandle};
use crate::transport::RequestEnvelope;

use models::{NewFeedback, NewRoleSession, NewSession, RetryRequest, StreamRequest};
pub use models::{
    ChatMessage, ChatSession, FeedbackDetail, FeedbackList, FeedbackType, MessageFeedback,
    MessageList, MessagePage, RoleDetail, SessionList, SessionMessage, UserSession,
};

/// Typed verbs for the chat backend.
#[derive(Debug, Clone)]
pub struct ChatService {
    client: ServiceClient,
}

impl ChatService {
    /// Connect with the default chat settings.
    pub fn new(base_url: Url, credentials: Arc<CredentialStore>) -> Result<Self, Error> {
        Ok(Self::from_client(ServiceClient::new(
            &BackendConfig::chat(base_url),
            credentials,
        )?))
    }

    pub fn from_client(client: ServiceClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &ServiceClient {
        &self.client
    }

    // ── Sessions ────────────────────────────────────────────────────

    /// `POST /api/llmchat/session`
    pub async fn create_session(
        &self,
        user_id: i64,
        name: &str,
        role_id: &str,
        bot_id: &str,
    ) -> Result<ChatSession, Error> {
        debug!(user_id, role_id, "creating chat session");
        let request = RequestEnvelope::post("/api/llmchat/session").json(&NewSession {
            user_id,
            name,
            role_id,
            bot_id,
        })?;
        self.client.execute_required("createSession", request).await
    }

    /// `POST /api/llmchat/role/session`
    pub async fn create_role_session(
        &self,
        role_id: i64,
        user_id: i64,
        title: &str,
        desc: &str,
    ) -> Result<ChatSession, Error> {
        let request = RequestEnvelope::post("/api/llmchat/role/session").json(&NewRoleSession {
            role_id,
            user_id,
            title,
            desc,
        })?;
        self.client.execute_required("createRoleSession", request).await
    }

    /// Wipe a role session's history, keeping the session itself.
    ///
    /// `POST /api/llmchat/role/session/{id}/clear`
    pub async fn clear_role_session(&self, session_id: &str) -> Result<Option<ChatSession>, Error> {
        debug!(session_id, "clearing role session");
        let request = RequestEnvelope::post(format!("/api/llmchat/role/session/{session_id}/clear"));
        self.client.execute("clearRoleSession", request).await
    }

    /// `GET /api/llmchat/session?user_id=..&role_id=..`
    pub async fn get_session(&self, user_id: i64, role_id: i64) -> Result<ChatSession, Error> {
        let request = RequestEnvelope::get("/api/llmchat/session")
            .query("user_id", user_id)
            .query("role_id", role_id);
        self.client.execute_required("getSession", request).await
    }

    /// `GET /api/llmchat/session/list?user_id=..&page=..&page_size=..`
    pub async fn user_sessions(&self, user_id: i64, page: u32, page_size: u32) -> Result<SessionList, Error> {
        let request = RequestEnvelope::get("/api/llmchat/session/list")
            .query("user_id", user_id)
            .query("page", page)
            .query("page_size", page_size);
        let list: Option<SessionList> = self.client.execute("getUserSessions", request).await?;
        Ok(list.unwrap_or_default())
    }

    // ── Messages ────────────────────────────────────────────────────

    /// Post a message and wait for the stored result (no streaming).
    ///
    /// `POST /api/llmchat/session/{id}/messages`
    pub async fn send_session_message(
        &self,
        session_id: &str,
        message: &SessionMessage,
    ) -> Result<ChatMessage, Error> {
        let request =
            RequestEnvelope::post(format!("/api/llmchat/session/{session_id}/messages")).json(message)?;
        self.client.execute_required("sendSessionMessage", request).await
    }

    /// Page through a session's history.
    ///
    /// The server exposes this as a bodiless POST on the same path as
    /// [`send_session_message`](Self::send_session_message), selected by
    /// query parameters.
    pub async fn session_messages(&self, session_id: &str, page: &MessagePage) -> Result<MessageList, Error> {
        let request = RequestEnvelope::post(format!("/api/llmchat/session/{session_id}/messages"))
            .query_opt("page", page.page)
            .query_opt("page_size", page.page_size)
            .query_opt("message_id", page.message_id.as_deref());
        let list: Option<MessageList> = self.client.execute("getSessionMessages", request).await?;
        Ok(list.unwrap_or_default())
    }

    /// Regenerate the reply to a message.
    ///
    /// `POST /api/llmchat/message/{id}/retry`
    pub async fn retry_message(&self, session_id: &str, message_id: i64, msg: &str) -> Result<ChatMessage, Error> {
        debug!(session_id, message_id, "retrying message");
        let request = RequestEnvelope::post(format!("/api/llmchat/message/{message_id}/retry")).json(
            &RetryRequest {
                session_id,
                message_id,
                msg,
            },
        )?;
        self.client.execute_required("retryMessage", request).await
    }

    /// Stop a reply that is still being generated.
    ///
    /// `POST /api/llmchat/message/{id}/interrupt`
    pub async fn interrupt_message(&self, message_id: i64) -> Result<(), Error> {
        debug!(message_id, "interrupting message");
        let request = RequestEnvelope::post(format!("/api/llmchat/message/{message_id}/interrupt"));
        self.client.execute_unit("interruptMessage", request).await
    }

    /// `POST /api/llmchat/message/{id}/feedback`
    pub async fn message_feedback(
        &self,
        message_id: &str,
        feedback: FeedbackType,
        user_id: i64,
    ) -> Result<Option<MessageFeedback>, Error> {
        let request = RequestEnvelope::post(format!("/api/llmchat/message/{message_id}/feedback"))
            .json(&json!({ "type": feedback.value(), "user_id": user_id }))?;
        self.client.execute("sendMessageFeedback", request).await
    }

    /// Send a message and receive the reply as a stream of deltas.
    ///
    /// `POST /api/llmchat/message` with `Accept: text/event-stream`. The
    /// connection attempt is retried like any other call; once the body
    /// starts flowing, failures go to `handler.on_error` and are not
    /// retried. The returned handle cancels the stream.
    pub fn stream_message<H>(&self, session_id: &str, content: &str, handler: H) -> Result<StreamHandle, Error>
    where
        H: SseHandler + 'static,
    {
        debug!(session_id, content_len = content.len(), "streaming message");
        let request = RequestEnvelope::post("/api/llmchat/message")
            .json(&StreamRequest { session_id, content })?
            .event_stream();
        Ok(self.client.subscribe("sendMessageSSE", request, handler))
    }

    /// `GET /api/llmchat/health`
    pub async fn health_check(&self) -> Result<(), Error> {
        self.client
            .execute_unit("healthCheck", RequestEnvelope::get("/api/llmchat/health"))
            .await
    }

    // ── Product feedback ────────────────────────────────────────────

    /// `POST /api/feedback`
    pub async fn create_feedback(
        &self,
        feedback_type: i32,
        title: &str,
        description: &str,
    ) -> Result<FeedbackDetail, Error> {
        let request = RequestEnvelope::post("/api/feedback").json(&NewFeedback {
            feedback_type,
            title,
            description,
        })?;
        self.client.execute_required("createFeedback", request).await
    }

    /// `GET /api/feedback?offset=..&limit=..`
    pub async fn feedback_list(&self, offset: u32, limit: u32) -> Result<FeedbackList, Error> {
        let request = RequestEnvelope::get("/api/feedback")
            .query("offset", offset)
            .query("limit", limit);
        let list: Option<FeedbackList> = self.client.execute("getFeedbackList", request).await?;
        Ok(list.unwrap_or_default())
    }

    /// `GET /api/feedback/{id}`
    pub async fn feedback_detail(&self, id: i64) -> Result<FeedbackDetail, Error> {
        self.client
            .execute_required("getFeedbackDetail", RequestEnvelope::get(format!("/api/feedback/{id}")))
            .await
    }

    /// Feedback type codes and their labels.
    ///
    /// `GET /api/feedback/types`
    pub async fn feedback_types(&self) -> Result<HashMap<String, String>, Error> {
        let types: Option<HashMap<String, String>> = self
            .client
            .execute("getFeedbackTypes", RequestEnvelope::get("/api/feedback/types"))
            .await?;
        Ok(types.unwrap_or_default())
    }

    /// `GET /api/feedback/statuses`
    pub async fn feedback_statuses(&self) -> Result<HashMap<String, String>, Error> {
        let statuses: Option<HashMap<String, String>> = self
            .client
            .execute("getFeedbackStatuses", RequestEnvelope::get("/api/feedback/statuses"))
            .await?;
        Ok(statuses.unwrap_or_default())
    }

    /// `GET /api/feedback/health`
    pub async fn feedback_health_check(&self) -> Result<(), Error> {
        self.client
            .execute_unit("feedbackHealthCheck", RequestEnvelope::get("/api/feedback/health"))
            .await
    }
}
