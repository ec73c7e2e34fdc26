// Account backend facade
//
// Login, registration, profile, and session token lifecycle. The only
// facade with side effects on the credential store: login and refresh
// install a token, logout removes it.

pub mod models;

use std::collections::HashMap;
use std::sync::Arc;

use secrecy::ExposeSecret;
use serde_json::json;
use tracing::{debug, info};
use url::Url;

use crate::client::{BackendConfig, ServiceClient};
use crate::credential::CredentialStore;
use crate::error::Error;
use crate::transport::RequestEnvelope;

pub use models::{Ack, LoginData, RefreshData, RegisterData, UserInfo};
use models::{Credentials, PasswordReset, Registration, UserInfoData};

/// Typed verbs for the account backend.
#[derive(Debug, Clone)]
pub struct AuthService {
    client: ServiceClient,
}

impl AuthService {
    /// Connect with the default account-backend settings.
    pub fn new(base_url: Url, credentials: Arc<CredentialStore>) -> Result<Self, Error> {
        Ok(Self::from_client(ServiceClient::new(
            &BackendConfig::auth(base_url),
            credentials,
        )?))
    }

    pub fn from_client(client: ServiceClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &ServiceClient {
        &self.client
    }

    /// Authenticate and store the returned session token.
    ///
    /// `POST /api/auth/login`
    pub async fn login(&self, account: &str, password: &str) -> Result<LoginData, Error> {
        debug!(account, "logging in");
        let request = RequestEnvelope::post("/api/auth/login").json(&Credentials { account, password })?;
        let data: LoginData = self.client.execute_required("login", request).await?;

        if data.token.is_empty() {
            return Err(Error::Authentication {
                message: "login failed: server returned an empty token".into(),
                expired: false,
            });
        }

        self.client.credentials().set(data.token.clone());
        info!(user_id = data.user_id, "logged in");
        Ok(data)
    }

    /// `POST /api/auth/register`
    pub async fn register(&self, account: &str, password: &str, name: &str) -> Result<RegisterData, Error> {
        debug!(account, name, "registering account");
        let request = RequestEnvelope::post("/api/auth/register").json(&Registration {
            account,
            password,
            name,
        })?;
        self.client.execute_required("register", request).await
    }

    /// Fetch a user's profile.
    ///
    /// `POST /api/user/info`
    pub async fn user_info(&self, user_id: i64) -> Result<UserInfo, Error> {
        let request = RequestEnvelope::post("/api/user/info").json(&json!({
            "user_id": user_id,
            "account": "",
        }))?;
        let data: UserInfoData = self.client.execute_required("userInfo", request).await?;
        Ok(data.info)
    }

    /// `PUT /api/user/info`
    pub async fn update_user_info(&self, info: &UserInfo) -> Result<UserInfo, Error> {
        debug!(user_id = info.user_id, "updating user info");
        let request = RequestEnvelope::put("/api/user/info").json(info)?;
        self.client.execute_required("updateUserInfo", request).await
    }

    /// Exchange the stored token for a fresh one.
    ///
    /// `POST /api/auth/refresh`
    pub async fn refresh_token(&self) -> Result<RefreshData, Error> {
        let current = self.current_token("refreshToken")?;
        let request = RequestEnvelope::post("/api/auth/refresh").json(&json!({ "token": current }))?;
        let data: RefreshData = self.client.execute_required("refreshToken", request).await?;

        if data.token.is_empty() {
            return Err(Error::Authentication {
                message: "token refresh failed: server returned an empty token".into(),
                expired: false,
            });
        }

        self.client.credentials().set(data.token.clone());
        debug!(user_id = data.user_id, expires_at = data.expires_at, "token refreshed");
        Ok(data)
    }

    /// End the session server-side, then forget the local token.
    ///
    /// `POST /api/auth/logout`
    pub async fn logout(&self) -> Result<Ack, Error> {
        let current = self.current_token("logout")?;
        let request = RequestEnvelope::post("/api/auth/logout").json(&json!({ "token": current }))?;
        let ack: Option<Ack> = self.client.execute("logout", request).await?;

        self.client.credentials().clear();
        info!("logged out");
        Ok(ack.unwrap_or_default())
    }

    /// `POST /api/auth/reset-password`
    pub async fn reset_password(&self, account: &str, old_pwd: &str, new_pwd: &str) -> Result<Ack, Error> {
        debug!(account, "resetting password");
        let request = RequestEnvelope::post("/api/auth/reset-password").json(&PasswordReset {
            account,
            old_pwd,
            new_pwd,
        })?;
        let ack: Option<Ack> = self.client.execute("resetPassword", request).await?;
        Ok(ack.unwrap_or_default())
    }

    /// `GET /api/health`
    pub async fn health_check(&self) -> Result<HashMap<String, String>, Error> {
        let status: Option<HashMap<String, String>> = self
            .client
            .execute("healthCheck", RequestEnvelope::get("/api/health"))
            .await?;
        Ok(status.unwrap_or_default())
    }

    fn current_token(&self, operation: &str) -> Result<String, Error> {
        let credentials = self.client.credentials();
        match credentials.get() {
            Some(token) if credentials.is_valid() => Ok(token.expose_secret().to_owned()),
            _ => Err(Error::Authentication {
                message: format!("{operation} failed: no session token"),
                expired: false,
            }),
        }
    }
}
