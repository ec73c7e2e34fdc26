// voyager-api: Async Rust client for the Voyager auth, chat, and billing backends

pub mod auth;
pub mod billing;
pub mod chat;
pub mod client;
pub mod codes;
pub mod credential;
pub mod envelope;
pub mod error;
pub mod retry;
pub mod sse;
pub mod transport;

pub use auth::AuthService;
pub use billing::BillingService;
pub use chat::ChatService;
pub use client::{BackendConfig, ServiceClient};
pub use codes::{CodeTranslator, OperationCodes, ResponseCode, ServerCodes};
pub use credential::CredentialStore;
pub use error::{Error, ErrorCategory, NetworkKind};
pub use retry::{RetryPolicy, RetryingExecutor};
pub use sse::{SseHandler, StreamCallbacks, StreamHandle};
pub use transport::{AuthScheme, RequestEnvelope, TlsMode, TransportConfig};
