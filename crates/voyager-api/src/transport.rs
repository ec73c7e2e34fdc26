// Shared transport configuration and the authenticating request layer.
//
// Every backend client builds its `reqwest::Client` from a
// `TransportConfig`, and every outgoing request passes through
// `AuthenticatingTransport`, which stamps the session credential and the
// JSON / event-stream headers before the request hits the wire.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use reqwest::Method;
use reqwest::header::{ACCEPT, AUTHORIZATION, CACHE_CONTROL, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use secrecy::ExposeSecret;
use serde::Serialize;
use tracing::{debug, trace};
use url::Url;
use uuid::Uuid;

use crate::credential::CredentialStore;
use crate::error::Error;

const USER_AGENT: &str = concat!("voyager-api/", env!("CARGO_PKG_VERSION"));
const REQUEST_ID: &str = "x-request-id";

// ── TransportConfig ─────────────────────────────────────────────────

/// TLS verification mode.
#[derive(Debug, Clone, Default)]
pub enum TlsMode {
    /// Use the system certificate store.
    #[default]
    System,
    /// Use a custom CA certificate from the given PEM file.
    CustomCa(PathBuf),
    /// Accept any certificate (development backends on a LAN address).
    DangerAcceptInvalid,
}

/// Settings for building one backend's HTTP client.
///
/// One `reqwest::Client` (and therefore one connection pool) is shared by
/// every call a service client makes.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub tls: TlsMode,
    /// Whole-request deadline. Long for chat, short for transactional calls.
    pub timeout: Duration,
    pub connect_timeout: Duration,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            tls: TlsMode::System,
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(30),
        }
    }
}

impl TransportConfig {
    /// Ten-minute budget for long-running chat and streaming endpoints.
    pub fn long_running() -> Self {
        Self {
            timeout: Duration::from_secs(600),
            ..Self::default()
        }
    }

    /// Build a `reqwest::Client` from this config.
    pub fn build_client(&self) -> Result<reqwest::Client, Error> {
        let mut builder = reqwest::Client::builder()
            .timeout(self.timeout)
            .connect_timeout(self.connect_timeout)
            .user_agent(USER_AGENT);

        match &self.tls {
            TlsMode::System => {}
            TlsMode::CustomCa(path) => {
                let cert_pem = std::fs::read(path)
                    .map_err(|e| Error::Client(format!("failed to read CA cert: {e}")))?;
                let cert = reqwest::Certificate::from_pem(&cert_pem)
                    .map_err(|e| Error::Client(format!("invalid CA cert: {e}")))?;
                builder = builder.add_root_certificate(cert);
            }
            TlsMode::DangerAcceptInvalid => {
                builder = builder.danger_accept_invalid_certs(true);
            }
        }

        builder
            .build()
            .map_err(|e| Error::Client(format!("failed to build HTTP client: {e}")))
    }
}

// ── AuthScheme ──────────────────────────────────────────────────────

/// How a backend expects the session token to travel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthScheme {
    /// Raw token in a custom header, e.g. `grpcgateway-cookie: <token>`.
    RawHeader(HeaderName),
    /// `Authorization: Bearer <token>`.
    Bearer,
}

impl AuthScheme {
    /// The gRPC-gateway cookie header used by the auth backend.
    pub fn grpc_gateway_cookie() -> Self {
        Self::RawHeader(HeaderName::from_static("grpcgateway-cookie"))
    }

    fn header(&self, token: &str) -> Result<(HeaderName, HeaderValue), Error> {
        let (name, raw) = match self {
            Self::RawHeader(name) => (name.clone(), token.to_owned()),
            Self::Bearer if token.starts_with("Bearer ") => (AUTHORIZATION, token.to_owned()),
            Self::Bearer => (AUTHORIZATION, format!("Bearer {token}")),
        };
        let mut value = HeaderValue::from_str(&raw)
            .map_err(|e| Error::Client(format!("invalid credential header value: {e}")))?;
        value.set_sensitive(true);
        Ok((name, value))
    }
}

// ── RequestEnvelope ─────────────────────────────────────────────────

/// What the response body is expected to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseFormat {
    Json,
    EventStream,
}

/// One outgoing call, described independently of the HTTP client.
///
/// Built by a service facade, then handed to the transport (possibly more
/// than once, when the retry executor re-sends it).
#[derive(Debug, Clone)]
pub struct RequestEnvelope {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub headers: HeaderMap,
    pub body: Option<Bytes>,
    pub format: ResponseFormat,
    pub request_id: Uuid,
}

impl RequestEnvelope {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            headers: HeaderMap::new(),
            body: None,
            format: ResponseFormat::Json,
            request_id: Uuid::new_v4(),
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    /// Serialize `body` as the JSON request body.
    pub fn json<B: Serialize + ?Sized>(mut self, body: &B) -> Result<Self, Error> {
        let bytes = serde_json::to_vec(body).map_err(|e| Error::Client(format!("failed to encode request body: {e}")))?;
        self.body = Some(Bytes::from(bytes));
        Ok(self)
    }

    pub fn query(mut self, key: &str, value: impl ToString) -> Self {
        self.query.push((key.to_owned(), value.to_string()));
        self
    }

    /// Add the parameter only when a value is present.
    pub fn query_opt(self, key: &str, value: Option<impl ToString>) -> Self {
        match value {
            Some(v) => self.query(key, v),
            None => self,
        }
    }

    /// Expect a `text/event-stream` response.
    pub fn event_stream(mut self) -> Self {
        self.format = ResponseFormat::EventStream;
        self
    }
}

// ── AuthenticatingTransport ─────────────────────────────────────────

/// Injects the session credential and standard headers, then sends.
///
/// Holds no retry logic; the retry executor wraps [`send`](Self::send).
#[derive(Debug, Clone)]
pub struct AuthenticatingTransport {
    http: reqwest::Client,
    base_url: Url,
    scheme: AuthScheme,
    credentials: Arc<CredentialStore>,
}

impl AuthenticatingTransport {
    pub fn new(
        http: reqwest::Client,
        base_url: Url,
        scheme: AuthScheme,
        credentials: Arc<CredentialStore>,
    ) -> Self {
        Self {
            http,
            base_url,
            scheme,
            credentials,
        }
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn scheme(&self) -> &AuthScheme {
        &self.scheme
    }

    pub fn credentials(&self) -> &Arc<CredentialStore> {
        &self.credentials
    }

    /// Stamp auth, content-type, accept, and request-id headers.
    ///
    /// Reads the credential at call time, so a request re-sent after a
    /// token refresh carries the new token.
    pub fn prepare(&self, mut request: RequestEnvelope) -> Result<RequestEnvelope, Error> {
        let headers = &mut request.headers;

        if self.credentials.is_valid() {
            if let Some(token) = self.credentials.get() {
                let (name, value) = self.scheme.header(token.expose_secret())?;
                trace!(header = %name, token_len = token.expose_secret().len(), "attaching credential");
                headers.insert(name, value);
            }
        } else {
            trace!("no session token, sending unauthenticated");
        }

        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        match request.format {
            ResponseFormat::Json => {
                headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
            }
            ResponseFormat::EventStream => {
                headers.insert(ACCEPT, HeaderValue::from_static("text/event-stream"));
                headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));
            }
        }
        if let Ok(id) = HeaderValue::from_str(&request.request_id.to_string()) {
            headers.insert(HeaderName::from_static(REQUEST_ID), id);
        }

        Ok(request)
    }

    /// Full URL for a backend-relative path: `{base}{path}`.
    ///
    /// The base may carry its own path prefix (e.g. `/api/vippay`), which is
    /// kept rather than replaced.
    pub fn url(&self, path: &str) -> Result<Url, Error> {
        let base = self.base_url.as_str().trim_end_matches('/');
        let path = path.trim_start_matches('/');
        Ok(Url::parse(&format!("{base}/{path}"))?)
    }

    /// Send the request and return the response if its status is 2xx.
    ///
    /// Non-2xx statuses become `Network { kind: HttpStatus(..) }` faults.
    pub async fn send(&self, request: &RequestEnvelope) -> Result<reqwest::Response, Error> {
        let prepared = self.prepare(request.clone())?;
        let url = self.url(&prepared.path)?;
        debug!(method = %prepared.method, %url, request_id = %prepared.request_id, "sending request");

        let mut builder = self
            .http
            .request(prepared.method, url)
            .headers(prepared.headers);
        if !prepared.query.is_empty() {
            builder = builder.query(&prepared.query);
        }
        if let Some(body) = prepared.body {
            builder = builder.body(body);
        }

        let resp = builder.send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::http_status(status.as_u16(), &body));
        }
        Ok(resp)
    }

    /// Send and read the full body as text.
    pub async fn fetch_text(&self, request: &RequestEnvelope) -> Result<String, Error> {
        let resp = self.send(request).await?;
        Ok(resp.text().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transport(scheme: AuthScheme, token: Option<&str>) -> AuthenticatingTransport {
        let credentials = Arc::new(token.map_or_else(CredentialStore::new, CredentialStore::with_token));
        AuthenticatingTransport::new(
            reqwest::Client::new(),
            Url::parse("http://127.0.0.1:8088/api/vippay").expect("static url"),
            scheme,
            credentials,
        )
    }

    #[test]
    fn raw_header_scheme_sends_token_verbatim() {
        let t = transport(AuthScheme::grpc_gateway_cookie(), Some("abc"));
        let req = t.prepare(RequestEnvelope::get("/api/health")).expect("prepare");
        assert_eq!(req.headers["grpcgateway-cookie"], "abc");
        assert!(req.headers.get(AUTHORIZATION).is_none());
        assert_eq!(req.headers[CONTENT_TYPE], "application/json");
        assert_eq!(req.headers[ACCEPT], "application/json");
    }

    #[test]
    fn bearer_scheme_prefixes_once() {
        let t = transport(AuthScheme::Bearer, Some("abc"));
        let req = t.prepare(RequestEnvelope::get("/x")).expect("prepare");
        assert_eq!(req.headers[AUTHORIZATION], "Bearer abc");

        let t = transport(AuthScheme::Bearer, Some("Bearer abc"));
        let req = t.prepare(RequestEnvelope::get("/x")).expect("prepare");
        assert_eq!(req.headers[AUTHORIZATION], "Bearer abc");
    }

    #[test]
    fn missing_or_empty_token_leaves_request_unauthenticated() {
        let t = transport(AuthScheme::Bearer, None);
        let req = t.prepare(RequestEnvelope::get("/x")).expect("prepare");
        assert!(req.headers.get(AUTHORIZATION).is_none());

        let t = transport(AuthScheme::Bearer, Some(""));
        let req = t.prepare(RequestEnvelope::get("/x")).expect("prepare");
        assert!(req.headers.get(AUTHORIZATION).is_none());
    }

    #[test]
    fn event_stream_requests_accept_sse() {
        let t = transport(AuthScheme::Bearer, None);
        let req = t
            .prepare(RequestEnvelope::post("/api/llmchat/message").event_stream())
            .expect("prepare");
        assert_eq!(req.headers[ACCEPT], "text/event-stream");
        assert_eq!(req.headers[CACHE_CONTROL], "no-cache");
    }

    #[test]
    fn url_keeps_base_path_prefix() {
        let t = transport(AuthScheme::Bearer, None);
        assert_eq!(
            t.url("/iap/products").expect("url").as_str(),
            "http://127.0.0.1:8088/api/vippay/iap/products"
        );
    }

    #[test]
    fn query_opt_skips_absent_values() {
        let req = RequestEnvelope::get("/x")
            .query("page", 1)
            .query_opt("message_id", None::<String>);
        assert_eq!(req.query, vec![("page".to_owned(), "1".to_owned())]);
    }
}
