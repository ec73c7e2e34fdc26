use std::time::Duration;

use strum::{AsRefStr, Display};
use thiserror::Error;

/// Boxed cause carried by transport-level failures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

// ── Discriminators ──────────────────────────────────────────────────

/// What went wrong below the application layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, AsRefStr)]
#[strum(serialize_all = "kebab-case")]
pub enum NetworkKind {
    /// Connect, read, or write deadline elapsed.
    Timeout,
    /// The remote end refused or reset the connection.
    ConnectionRefused,
    /// DNS lookup for the backend host failed.
    HostUnresolved,
    /// The backend answered with a non-2xx HTTP status.
    HttpStatus(u16),
    /// Anything else the transport raised (body read failures, early EOF).
    Unknown,
}

impl NetworkKind {
    /// Whether a fresh attempt could plausibly succeed.
    ///
    /// 5xx and 429 are transient; every other 4xx is the caller's fault.
    pub fn is_retryable(self) -> bool {
        match self {
            Self::HttpStatus(status) => status == 429 || (500..=599).contains(&status),
            Self::Timeout | Self::ConnectionRefused | Self::HostUnresolved | Self::Unknown => true,
        }
    }
}

/// Machine-readable error family, stable across releases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, AsRefStr)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCategory {
    Network,
    Server,
    Authentication,
    Permission,
    NotFound,
    Validation,
    RateLimit,
    Business,
    Parse,
    Cancelled,
    Client,
}

// ── Error ───────────────────────────────────────────────────────────

/// Classified fault raised by every call in `voyager-api`.
///
/// Transport failures, application status codes returned inside the
/// `{code, message, data}` envelope, and SSE error frames all land here.
/// Each variant knows whether it is retryable, how long to back off, and
/// how to describe itself to an end user.
#[derive(Debug, Error)]
pub enum Error {
    // ── Transport ───────────────────────────────────────────────────
    /// Timeout, refused connection, DNS failure, or non-2xx HTTP status.
    #[error("network error ({kind}): {message}")]
    Network {
        kind: NetworkKind,
        message: String,
        #[source]
        source: Option<BoxError>,
    },

    // ── Application status codes ────────────────────────────────────
    /// Non-zero envelope code that maps to a server-side failure.
    #[error("server error [{status}]: {message}")]
    Server {
        status: i32,
        message: String,
        details: Option<String>,
    },

    /// Credentials missing, rejected, or expired.
    #[error("authentication failed: {message}")]
    Authentication { message: String, expired: bool },

    /// Caller is authenticated but not allowed to do this.
    #[error("permission denied: {message}")]
    Permission {
        message: String,
        required: Option<String>,
    },

    #[error("not found: {message}")]
    NotFound { message: String },

    #[error("validation failed [{field}]: {message}")]
    Validation { field: String, message: String },

    #[error("rate limited (limit {limit}, remaining {remaining})")]
    RateLimited {
        limit: u32,
        remaining: u32,
        reset_at: Option<i64>,
    },

    /// Catch-all for application codes with no dedicated variant.
    #[error("business error [{code}]: {message}")]
    Business { code: String, message: String },

    // ── Data ────────────────────────────────────────────────────────
    /// The body did not match the expected schema.
    #[error("failed to parse response: {message}")]
    Parse { message: String, body: String },

    /// Success envelope without the payload the operation requires.
    #[error("{operation} returned no data")]
    MissingData { operation: String },

    // ── Local ───────────────────────────────────────────────────────
    /// The surrounding call or the owning client was cancelled.
    #[error("request cancelled")]
    Cancelled,

    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// The HTTP client or a request could not be built.
    #[error("client setup failed: {0}")]
    Client(String),
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        let kind = if err.is_timeout() {
            NetworkKind::Timeout
        } else if let Some(status) = err.status() {
            NetworkKind::HttpStatus(status.as_u16())
        } else if err.is_connect() {
            if mentions_dns(&err) {
                NetworkKind::HostUnresolved
            } else {
                NetworkKind::ConnectionRefused
            }
        } else {
            NetworkKind::Unknown
        };

        Self::Network {
            kind,
            message: err.to_string(),
            source: Some(Box::new(err)),
        }
    }
}

/// hyper-util reports resolver failures as a connect error whose source
/// chain mentions "dns error".
fn mentions_dns(err: &(dyn std::error::Error + 'static)) -> bool {
    let mut current = Some(err);
    while let Some(e) = current {
        let text = e.to_string().to_ascii_lowercase();
        if text.contains("dns error") || text.contains("failed to lookup address") {
            return true;
        }
        current = e.source();
    }
    false
}

impl Error {
    // ── Constructors ────────────────────────────────────────────────

    /// Non-2xx HTTP response, with a short preview of the body.
    pub fn http_status(status: u16, body: &str) -> Self {
        Self::Network {
            kind: NetworkKind::HttpStatus(status),
            message: format!("HTTP {status}: {}", preview(body)),
            source: None,
        }
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::Network {
            kind: NetworkKind::Timeout,
            message: message.into(),
            source: None,
        }
    }

    /// An event stream that closed before its done marker.
    pub fn stream_closed() -> Self {
        Self::Network {
            kind: NetworkKind::Unknown,
            message: "event stream closed before completion".into(),
            source: None,
        }
    }

    // ── Classification ──────────────────────────────────────────────

    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Network { .. } => ErrorCategory::Network,
            Self::Server { .. } => ErrorCategory::Server,
            Self::Authentication { .. } => ErrorCategory::Authentication,
            Self::Permission { .. } => ErrorCategory::Permission,
            Self::NotFound { .. } => ErrorCategory::NotFound,
            Self::Validation { .. } => ErrorCategory::Validation,
            Self::RateLimited { .. } => ErrorCategory::RateLimit,
            Self::Business { .. } => ErrorCategory::Business,
            Self::Parse { .. } | Self::MissingData { .. } => ErrorCategory::Parse,
            Self::Cancelled => ErrorCategory::Cancelled,
            Self::InvalidUrl(_) | Self::Client(_) => ErrorCategory::Client,
        }
    }

    /// Returns `true` if a later attempt could succeed unchanged.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Network { kind, .. } => kind.is_retryable(),
            Self::Server { status, .. } => (500..=599).contains(status),
            Self::RateLimited { .. } => true,
            _ => false,
        }
    }

    /// Returns `true` for transport faults the retry executor may absorb.
    ///
    /// Application-level codes are never retried locally, even when
    /// [`is_retryable`](Self::is_retryable) says a caller might.
    pub fn is_transient_transport(&self) -> bool {
        matches!(self, Self::Network { kind, .. } if kind.is_retryable())
    }

    /// Suggested wait before a caller-driven retry.
    pub fn retry_delay(&self) -> Duration {
        match self {
            Self::Server { .. } => Duration::from_secs(2),
            Self::RateLimited { .. } => Duration::from_secs(5),
            _ => Duration::from_secs(1),
        }
    }

    /// Returns `true` if the session has expired and a fresh login is needed.
    pub fn is_auth_expired(&self) -> bool {
        matches!(self, Self::Authentication { expired: true, .. })
    }

    /// Numeric code for the failure: the envelope code, HTTP status, or
    /// the conventional HTTP equivalent for the category.
    pub fn status_code(&self) -> Option<i32> {
        match self {
            Self::Network {
                kind: NetworkKind::HttpStatus(status),
                ..
            } => Some(i32::from(*status)),
            Self::Server { status, .. } => Some(*status),
            Self::Authentication { .. } => Some(401),
            Self::Permission { .. } => Some(403),
            Self::NotFound { .. } => Some(404),
            Self::Validation { .. } => Some(400),
            Self::RateLimited { .. } => Some(429),
            _ => None,
        }
    }

    /// Short, non-technical description suitable for end users.
    pub fn user_friendly_message(&self) -> String {
        match self {
            Self::Network { kind, .. } => match kind {
                NetworkKind::Timeout => "Request timed out, please retry".into(),
                NetworkKind::ConnectionRefused | NetworkKind::HostUnresolved => {
                    "Network connection failed, please check your network".into()
                }
                NetworkKind::HttpStatus(_) | NetworkKind::Unknown => {
                    "Network error, please retry later".into()
                }
            },
            Self::Server { status, .. } => match status {
                503 => "Service temporarily unavailable, please retry later".into(),
                _ => "Server is busy, please retry later".into(),
            },
            Self::Authentication { expired: true, .. } => {
                "Session expired, please log in again".into()
            }
            Self::Authentication { .. } => "Authentication failed, please log in again".into(),
            Self::Permission { .. } => {
                "Insufficient permissions, please contact an administrator".into()
            }
            Self::NotFound { .. } => "The requested content does not exist".into(),
            Self::Validation { .. } => "Invalid input, please check and retry".into(),
            Self::RateLimited { .. } => "Too many requests, please try again later".into(),
            Self::Business { code, message } => match code.as_str() {
                "INVALID_PURCHASE" => "Purchase verification failed, please retry".into(),
                "ALREADY_OWNED" => "You already own this product".into(),
                "PRODUCT_NOT_AVAILABLE" => "This product is currently unavailable".into(),
                _ => message.clone(),
            },
            Self::Parse { .. } | Self::MissingData { .. } => {
                "Could not read the server response, please retry".into()
            }
            Self::Cancelled => "Request cancelled".into(),
            Self::InvalidUrl(_) | Self::Client(_) => self.to_string(),
        }
    }
}

/// First 200 characters of a body, for error messages and logs.
pub(crate) fn preview(body: &str) -> &str {
    match body.char_indices().nth(200) {
        Some((idx, _)) => &body[..idx],
        None => body,
    }
}
