//! Probe each backend's health endpoint.

use serde_json::json;

use crate::commands::Session;
use crate::error::CliError;
use crate::output;

fn verdict<T, E: std::fmt::Display>(result: &Result<T, E>) -> String {
    match result {
        Ok(_) => "ok".into(),
        Err(e) => format!("down ({e})"),
    }
}

pub async fn handle(session: &Session) -> Result<(), CliError> {
    let auth = session.auth()?;
    let chat = session.chat()?;
    let billing = session.billing()?;

    let (auth_res, chat_res, billing_res) =
        tokio::join!(auth.health_check(), chat.health_check(), billing.health_check());

    let rows = [
        ("auth", verdict(&auth_res)),
        ("chat", verdict(&chat_res)),
        ("billing", verdict(&billing_res)),
    ];
    let summary = json!({
        "auth": rows[0].1,
        "chat": rows[1].1,
        "billing": rows[2].1,
    });
    output::render(session.output, &summary, &rows)?;

    // Report the first failure through the exit code.
    auth_res?;
    chat_res?;
    billing_res?;
    Ok(())
}
