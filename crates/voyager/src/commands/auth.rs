//! Session lifecycle commands: login, logout, refresh, user-info.

use secrecy::{ExposeSecret, SecretString};
use serde_json::json;
use tracing::warn;

use voyager_config::ConfigError;

use crate::commands::Session;
use crate::error::CliError;
use crate::output;

fn prompt_password(account: &str) -> Result<SecretString, CliError> {
    let pw = rpassword::prompt_password(format!("Password for {account}: "))?;
    if pw.is_empty() {
        return Err(CliError::Validation {
            field: "password".into(),
            reason: "password cannot be empty".into(),
        });
    }
    Ok(SecretString::from(pw))
}

pub async fn login(session: &Session) -> Result<(), CliError> {
    let account = session.require_account()?;
    let password = match voyager_config::resolve_password(&session.config, account) {
        Ok(pw) => pw,
        Err(ConfigError::NoCredentials { .. }) => prompt_password(account)?,
        Err(e) => return Err(e.into()),
    };

    let auth = session.auth()?;
    let login = auth.login(account, password.expose_secret()).await?;

    // The token stays valid for this process even if the keyring is unavailable.
    if let Err(e) = voyager_config::store_session_token(account, &login.token) {
        warn!(error = %e, "could not persist session token");
    }

    // The token itself is never printed.
    let summary = json!({ "user_id": login.user_id, "account": login.account, "name": login.name });
    output::render(
        session.output,
        &summary,
        &[
            ("user_id", login.user_id.to_string()),
            ("account", login.account.clone()),
            ("name", login.name.clone()),
        ],
    )
}

pub async fn logout(session: &Session) -> Result<(), CliError> {
    let auth = session.auth()?;
    let ack = auth.logout().await?;

    if let Some(ref account) = session.account {
        if let Err(e) = voyager_config::clear_session_token(account) {
            warn!(error = %e, "could not remove stored session token");
        }
    }

    output::render(
        session.output,
        &ack,
        &[("logged_out", ack.success.to_string()), ("message", ack.message.clone())],
    )
}

pub async fn refresh(session: &Session) -> Result<(), CliError> {
    let auth = session.auth()?;
    let refreshed = auth.refresh_token().await?;

    if let Some(ref account) = session.account {
        if let Err(e) = voyager_config::store_session_token(account, &refreshed.token) {
            warn!(error = %e, "could not persist refreshed token");
        }
    }

    let summary = json!({ "user_id": refreshed.user_id, "expires_at": refreshed.expires_at });
    output::render(
        session.output,
        &summary,
        &[
            ("user_id", refreshed.user_id.to_string()),
            ("expires_at", refreshed.expires_at.to_string()),
        ],
    )
}

pub async fn user_info(session: &Session, user_id: i64) -> Result<(), CliError> {
    let info = session.auth()?.user_info(user_id).await?;
    output::render(
        session.output,
        &info,
        &[
            ("user_id", info.user_id.to_string()),
            ("account", info.account.clone()),
            ("name", info.name.clone()),
            ("email", info.email.clone().unwrap_or_else(|| "-".into())),
            ("status", info.status.to_string()),
        ],
    )
}
