//! Shared configuration for the Voyager client tools.
//!
//! TOML file + `VOYAGER_*` environment overrides, per-backend endpoint
//! settings, and credential resolution (env + keyring + plaintext).
//! Translates into `voyager_api::BackendConfig` for each backend.

use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use voyager_api::{BackendConfig, RetryPolicy, TlsMode, TransportConfig};

const KEYRING_SERVICE: &str = "voyager";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("no {what} configured; {hint}")]
    NoCredentials { what: String, hint: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("keyring error: {0}")]
    Keyring(#[from] keyring::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Which remote service an endpoint section describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    Auth,
    Chat,
    Billing,
}

/// Top-level TOML configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Config {
    /// Account used by `login` when none is given on the command line.
    pub account: Option<String>,

    /// Password (plaintext, prefer keyring or `VOYAGER_PASSWORD`).
    pub password: Option<String>,

    /// Accept any TLS certificate (development servers only).
    #[serde(default)]
    pub insecure: bool,

    /// Path to a custom CA certificate.
    pub ca_cert: Option<PathBuf>,

    #[serde(default = "Endpoint::auth")]
    pub auth: Endpoint,

    #[serde(default = "Endpoint::chat")]
    pub chat: Endpoint,

    #[serde(default = "Endpoint::billing")]
    pub billing: Endpoint,

    #[serde(default)]
    pub retry: RetrySettings,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            account: None,
            password: None,
            insecure: false,
            ca_cert: None,
            auth: Endpoint::auth(),
            chat: Endpoint::chat(),
            billing: Endpoint::billing(),
            retry: RetrySettings::default(),
        }
    }
}

/// One backend's location and request deadline.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Endpoint {
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Endpoint {
    fn auth() -> Self {
        Self {
            base_url: "http://127.0.0.1:8080".into(),
            timeout_secs: 600,
        }
    }

    fn chat() -> Self {
        Self {
            base_url: "http://127.0.0.1:8060".into(),
            timeout_secs: 600,
        }
    }

    fn billing() -> Self {
        Self {
            base_url: "http://127.0.0.1:8088/api/vippay".into(),
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct RetrySettings {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
        }
    }
}

fn default_max_attempts() -> u32 {
    3
}
fn default_base_delay_ms() -> u64 {
    1000
}

impl Config {
    pub fn endpoint(&self, backend: Backend) -> &Endpoint {
        match backend {
            Backend::Auth => &self.auth,
            Backend::Chat => &self.chat,
            Backend::Billing => &self.billing,
        }
    }

    /// Build the client settings for one backend.
    pub fn backend_config(&self, backend: Backend) -> Result<BackendConfig, ConfigError> {
        let endpoint = self.endpoint(backend);
        let field = match backend {
            Backend::Auth => "auth.base_url",
            Backend::Chat => "chat.base_url",
            Backend::Billing => "billing.base_url",
        };
        let url: url::Url = endpoint.base_url.parse().map_err(|_| ConfigError::Validation {
            field: field.into(),
            reason: format!("invalid URL: {}", endpoint.base_url),
        })?;

        let base = match backend {
            Backend::Auth => BackendConfig::auth(url),
            Backend::Chat => BackendConfig::chat(url),
            Backend::Billing => BackendConfig::billing(url),
        };

        let tls = if self.insecure {
            TlsMode::DangerAcceptInvalid
        } else if let Some(ref ca_path) = self.ca_cert {
            TlsMode::CustomCa(ca_path.clone())
        } else {
            TlsMode::System
        };

        let transport = TransportConfig {
            tls,
            timeout: Duration::from_secs(endpoint.timeout_secs),
            ..base.transport.clone()
        };

        Ok(base.with_transport(transport).with_retry(RetryPolicy {
            max_attempts: self.retry.max_attempts,
            base_delay: Duration::from_millis(self.retry.base_delay_ms),
        }))
    }
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("com", "rankquantity", "voyager").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("voyager");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from the canonical file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load from an explicit file path + environment.
///
/// Nested keys use a double underscore: `VOYAGER_CHAT__BASE_URL`.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    debug!(path = %path.display(), "loading config");
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("VOYAGER_").split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

/// Load config, returning a default if the file doesn't exist.
pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_default()
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<PathBuf, ConfigError> {
    let path = config_path();
    save_config_to(&path, cfg)?;
    Ok(path)
}

pub fn save_config_to(path: &Path, cfg: &Config) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Credential resolution ───────────────────────────────────────────

/// Resolve the login account: config, then `VOYAGER_ACCOUNT`.
pub fn resolve_account(cfg: &Config) -> Result<String, ConfigError> {
    cfg.account
        .clone()
        .or_else(|| std::env::var("VOYAGER_ACCOUNT").ok())
        .ok_or_else(|| ConfigError::NoCredentials {
            what: "account".into(),
            hint: "set `account` in the config file or VOYAGER_ACCOUNT".into(),
        })
}

/// Resolve the password for `account` (no CLI flag step).
pub fn resolve_password(cfg: &Config, account: &str) -> Result<SecretString, ConfigError> {
    // 1. Env var
    if let Ok(pw) = std::env::var("VOYAGER_PASSWORD") {
        return Ok(SecretString::from(pw));
    }

    // 2. Keyring
    if let Ok(entry) = keyring::Entry::new(KEYRING_SERVICE, &format!("{account}/password")) {
        if let Ok(pw) = entry.get_password() {
            return Ok(SecretString::from(pw));
        }
    }

    // 3. Plaintext in config
    if let Some(ref pw) = cfg.password {
        return Ok(SecretString::from(pw.clone()));
    }

    Err(ConfigError::NoCredentials {
        what: format!("password for '{account}'"),
        hint: "set VOYAGER_PASSWORD or store it in the system keyring".into(),
    })
}

// ── Session token persistence ───────────────────────────────────────

/// The session token saved by a previous `login`: `VOYAGER_TOKEN`, then
/// the keyring entry for `account`.
pub fn load_session_token(account: Option<&str>) -> Option<SecretString> {
    if let Ok(token) = std::env::var("VOYAGER_TOKEN") {
        return Some(SecretString::from(token));
    }
    let account = account?;
    keyring::Entry::new(KEYRING_SERVICE, &format!("{account}/token"))
        .and_then(|entry| entry.get_password())
        .ok()
        .map(SecretString::from)
}

pub fn store_session_token(account: &str, token: &str) -> Result<(), ConfigError> {
    let entry = keyring::Entry::new(KEYRING_SERVICE, &format!("{account}/token"))?;
    entry.set_password(token)?;
    Ok(())
}

pub fn clear_session_token(account: &str) -> Result<(), ConfigError> {
    let entry = keyring::Entry::new(KEYRING_SERVICE, &format!("{account}/token"))?;
    match entry.delete_credential() {
        Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
        Err(e) => Err(e.into()),
    }
}
