//! Command dispatch: bridges CLI args -> service calls -> output formatting.

pub mod auth;
pub mod chat;
pub mod config_cmd;
pub mod health;
pub mod vip;

use std::sync::Arc;

use voyager_api::{AuthService, BillingService, ChatService, CredentialStore, ServiceClient};
use voyager_config::{Backend, Config};

use crate::cli::{Command, GlobalOpts, OutputFormat};
use crate::error::CliError;

/// Resolved configuration plus the credential store every backend shares.
pub struct Session {
    pub config: Config,
    pub account: Option<String>,
    pub credentials: Arc<CredentialStore>,
    pub output: OutputFormat,
}

impl Session {
    pub fn open(global: &GlobalOpts) -> Result<Self, CliError> {
        let mut config = match global.config {
            Some(ref path) => voyager_config::load_config_from(path)?,
            None => voyager_config::load_config()?,
        };
        if global.insecure {
            config.insecure = true;
        }

        let account = global
            .account
            .clone()
            .or_else(|| voyager_config::resolve_account(&config).ok());

        let credentials = Arc::new(CredentialStore::new());
        if let Some(token) = voyager_config::load_session_token(account.as_deref()) {
            use secrecy::ExposeSecret;
            credentials.set(token.expose_secret());
        }

        Ok(Self {
            config,
            account,
            credentials,
            output: global.output,
        })
    }

    fn client(&self, backend: Backend) -> Result<ServiceClient, CliError> {
        let config = self.config.backend_config(backend)?;
        Ok(ServiceClient::new(&config, Arc::clone(&self.credentials))?)
    }

    pub fn auth(&self) -> Result<AuthService, CliError> {
        Ok(AuthService::from_client(self.client(Backend::Auth)?))
    }

    pub fn chat(&self) -> Result<ChatService, CliError> {
        Ok(ChatService::from_client(self.client(Backend::Chat)?))
    }

    pub fn billing(&self) -> Result<BillingService, CliError> {
        Ok(BillingService::from_client(self.client(Backend::Billing)?))
    }

    /// The account commands act for, or a `NoCredentials` error.
    pub fn require_account(&self) -> Result<&str, CliError> {
        self.account.as_deref().ok_or_else(|| CliError::NoCredentials {
            what: "account".into(),
            hint: "Pass --account or set `account` in the config file.".into(),
        })
    }
}

/// Dispatch a backend-bound command to the appropriate handler.
pub async fn dispatch(cmd: Command, session: &Session) -> Result<(), CliError> {
    match cmd {
        Command::Login => auth::login(session).await,
        Command::Logout => auth::logout(session).await,
        Command::Refresh => auth::refresh(session).await,
        Command::UserInfo { user_id } => auth::user_info(session, user_id).await,
        Command::Chat(args) => chat::handle(session, args).await,
        Command::Vip(args) => vip::handle(session, args).await,
        Command::Health => health::handle(session).await,
        // Config and Completions are handled before dispatch
        Command::Config(_) | Command::Completions(_) => Err(CliError::Validation {
            field: "command".into(),
            reason: "handled before dispatch".into(),
        }),
    }
}
