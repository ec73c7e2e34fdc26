// Generic backend client
//
// One `ServiceClient` per backend. It composes the authenticating
// transport, the retry executor, and the backend's status-code strategy,
// so every facade verb is just "build a request, name the operation".

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use url::Url;

use crate::codes::{CodeTranslator, OperationCodes, ServerCodes};
use crate::credential::CredentialStore;
use crate::envelope::ResponseEnvelope;
use crate::error::Error;
use crate::retry::{RetryPolicy, RetryingExecutor};
use crate::sse::{SseDecoder, SseHandler, StreamHandle, StreamSession, pump};
use crate::transport::{AuthScheme, AuthenticatingTransport, RequestEnvelope, TransportConfig};

// ── BackendConfig ───────────────────────────────────────────────────

/// Everything that differs between the auth, chat, and billing backends.
#[derive(Debug, Clone)]
pub struct BackendConfig {
    pub base_url: Url,
    pub scheme: AuthScheme,
    pub transport: TransportConfig,
    pub retry: RetryPolicy,
    pub translator: Arc<dyn CodeTranslator>,
}

impl BackendConfig {
    /// Account backend: raw token in `grpcgateway-cookie`, long timeout.
    pub fn auth(base_url: Url) -> Self {
        Self {
            base_url,
            scheme: AuthScheme::grpc_gateway_cookie(),
            transport: TransportConfig::long_running(),
            retry: RetryPolicy::default(),
            translator: Arc::new(OperationCodes),
        }
    }

    /// Chat backend: bearer token, long timeout for streamed replies.
    pub fn chat(base_url: Url) -> Self {
        Self {
            base_url,
            scheme: AuthScheme::Bearer,
            transport: TransportConfig::long_running(),
            retry: RetryPolicy::default(),
            translator: Arc::new(OperationCodes),
        }
    }

    /// Billing backend: bearer token, 30 s timeout, raw server codes.
    ///
    /// `base_url` should include the `/api/vippay` prefix.
    pub fn billing(base_url: Url) -> Self {
        Self {
            base_url,
            scheme: AuthScheme::Bearer,
            transport: TransportConfig::default(),
            retry: RetryPolicy::default(),
            translator: Arc::new(ServerCodes),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_transport(mut self, transport: TransportConfig) -> Self {
        self.transport = transport;
        self
    }
}

// ── ServiceClient ───────────────────────────────────────────────────

/// Shared client for one backend.
///
/// Cheap to clone; clones share the connection pool, the credential
/// store, and the shutdown signal.
#[derive(Debug, Clone)]
pub struct ServiceClient {
    transport: AuthenticatingTransport,
    executor: RetryingExecutor,
    translator: Arc<dyn CodeTranslator>,
    shutdown: CancellationToken,
}

impl ServiceClient {
    /// Build a client with its own connection pool.
    pub fn new(config: &BackendConfig, credentials: Arc<CredentialStore>) -> Result<Self, Error> {
        let http = config.transport.build_client()?;
        Ok(Self::with_client(http, config, credentials))
    }

    /// Build a client around an existing `reqwest::Client`.
    pub fn with_client(
        http: reqwest::Client,
        config: &BackendConfig,
        credentials: Arc<CredentialStore>,
    ) -> Self {
        Self {
            transport: AuthenticatingTransport::new(
                http,
                config.base_url.clone(),
                config.scheme.clone(),
                credentials,
            ),
            executor: RetryingExecutor::new(config.retry),
            translator: Arc::clone(&config.translator),
            shutdown: CancellationToken::new(),
        }
    }

    pub fn credentials(&self) -> &Arc<CredentialStore> {
        self.transport.credentials()
    }

    pub fn base_url(&self) -> &Url {
        self.transport.base_url()
    }

    // ── Request/response verbs ──────────────────────────────────────

    /// Send with retry, unwrap the envelope, decode the payload.
    ///
    /// Success with no `data` yields `Ok(None)`.
    pub async fn execute<T: DeserializeOwned>(
        &self,
        operation: &str,
        request: RequestEnvelope,
    ) -> Result<Option<T>, Error> {
        let body = self
            .executor
            .execute(operation, &self.shutdown, || self.transport.fetch_text(&request))
            .await?;
        let envelope = ResponseEnvelope::parse(&body)?;
        debug!(operation, code = envelope.code, "response envelope");
        envelope.into_result(operation, self.translator.as_ref())
    }

    /// Like [`execute`](Self::execute), but a missing payload is an error.
    pub async fn execute_required<T: DeserializeOwned>(
        &self,
        operation: &str,
        request: RequestEnvelope,
    ) -> Result<T, Error> {
        self.execute(operation, request)
            .await?
            .ok_or_else(|| Error::MissingData {
                operation: operation.to_owned(),
            })
    }

    /// Run for the status code only, discarding any payload.
    pub async fn execute_unit(&self, operation: &str, request: RequestEnvelope) -> Result<(), Error> {
        self.execute::<Value>(operation, request).await.map(drop)
    }

    // ── Streaming ───────────────────────────────────────────────────

    /// Open an event stream. Only the connection phase is retried.
    pub async fn open_stream(
        &self,
        operation: &str,
        request: RequestEnvelope,
        cancel: &CancellationToken,
    ) -> Result<reqwest::Response, Error> {
        let request = request.event_stream();
        self.executor
            .execute(operation, cancel, || self.transport.send(&request))
            .await
    }

    /// Open an event stream and decode it on a background task.
    ///
    /// `handler` sees every message in wire order and at most one terminal
    /// notification. A connection that cannot be established after
    /// retries is reported through `on_error`.
    pub fn subscribe<H>(&self, operation: &str, request: RequestEnvelope, handler: H) -> StreamHandle
    where
        H: SseHandler + 'static,
    {
        let cancel = self.shutdown.child_token();
        let session = Arc::new(StreamSession::default());

        let client = self.clone();
        let operation = operation.to_owned();
        let task_cancel = cancel.clone();
        let task_session = Arc::clone(&session);

        let task = tokio::spawn(async move {
            let mut decoder = SseDecoder::with_session(handler, task_session);
            match client.open_stream(&operation, request, &task_cancel).await {
                Ok(resp) => {
                    decoder.session().mark_connected();
                    debug!(operation, "event stream connected");
                    pump(decoder, resp.bytes_stream(), &task_cancel).await;
                }
                Err(Error::Cancelled) => decoder.abandon(),
                Err(err) => decoder.fail(err),
            }
        });

        StreamHandle::new(cancel, session, task)
    }

    // ── Lifecycle ───────────────────────────────────────────────────

    /// Cancel every in-flight retry loop and stream started from this
    /// client or its clones. Later calls fail with [`Error::Cancelled`].
    pub fn shutdown(&self) {
        debug!(base_url = %self.transport.base_url(), "shutting down service client");
        self.shutdown.cancel();
    }

    pub fn is_shut_down(&self) -> bool {
        self.shutdown.is_cancelled()
    }
}
