use std::time::Duration;

use anyhow::Context;
use reqwest::Client;

#[derive(Debug, Clone, Copy)]
pub struct HttpConfig {
    pub connect_timeout_ms: u64,
    pub request_timeout_ms: u64,
    pub stream_idle_timeout_ms: u64,
    pub max_response_bytes: usize,
    pub max_line_bytes: usize,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            connect_timeout_ms: 2000,
            request_timeout_ms: 120_000,
            stream_idle_timeout_ms: 30_000,
            max_response_bytes: 10_000_000,
            max_line_bytes: 200_000,
        }
    }
}

impl HttpConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn request_timeout_opt(&self) -> Option<Duration> {
        if self.request_timeout_ms == 0 {
            None
        } else {
            Some(Duration::from_millis(self.request_timeout_ms))
        }
    }

    pub fn idle_timeout_opt(&self) -> Option<Duration> {
        if self.stream_idle_timeout_ms == 0 {
            None
        } else {
            Some(Duration::from_millis(self.stream_idle_timeout_ms))
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceErrorKind {
    Connection,
    Timeout,
    RateLimit,
    Server,
    Client,
    Parse,
    PayloadTooLarge,
    Unauthorized,
    Other,
}

/// Typed failure raised by a session adapter. Carried through `anyhow` and
/// downcast by the controller when shaping `ErrorInfo`.
#[derive(Debug)]
pub struct ServiceError {
    pub kind: ServiceErrorKind,
    pub http_status: Option<u16>,
    pub message: String,
}

impl std::fmt::Display for ServiceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "service {:?} error: {}", self.kind, self.message)
    }
}

impl std::error::Error for ServiceError {}

impl ServiceError {
    pub fn new(kind: ServiceErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            http_status: None,
            message: message.into(),
        }
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.http_status = Some(status);
        self
    }
}

pub fn classify_status(status: u16) -> ServiceErrorKind {
    match status {
        429 => ServiceErrorKind::RateLimit,
        401 | 403 => ServiceErrorKind::Unauthorized,
        400 | 404 => ServiceErrorKind::Client,
        500..=599 => ServiceErrorKind::Server,
        _ => ServiceErrorKind::Other,
    }
}

pub fn classify_reqwest_error(err: &reqwest::Error) -> ServiceErrorKind {
    if err.is_timeout() {
        return ServiceErrorKind::Timeout;
    }
    if err.is_connect() {
        return ServiceErrorKind::Connection;
    }
    if err.is_decode() {
        return ServiceErrorKind::Parse;
    }
    ServiceErrorKind::Other
}

pub fn build_http_client(http: HttpConfig, context_msg: &'static str) -> anyhow::Result<Client> {
    let mut builder = Client::builder().connect_timeout(http.connect_timeout());
    if let Some(timeout) = http.request_timeout_opt() {
        builder = builder.timeout(timeout);
    }
    builder.build().context(context_msg)
}

pub fn truncate_for_error(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    s.chars().take(max).collect()
}
