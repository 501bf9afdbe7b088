use async_trait::async_trait;
use futures_util::stream::BoxStream;
use futures_util::StreamExt;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::providers::http::{
    build_http_client, classify_reqwest_error, classify_status, truncate_for_error, HttpConfig,
    ServiceError, ServiceErrorKind,
};
use crate::providers::partial::extract_candidates;
use crate::providers::{PaletteSource, Snapshot, SnapshotStream};
use crate::types::RawCandidate;

/// Session adapter backed by an Ollama `/api/chat` NDJSON stream. The
/// assistant text accumulates across chunks; whenever the decoded candidate
/// prefix changes, a new cumulative snapshot is yielded.
#[derive(Debug, Clone)]
pub struct OllamaSource {
    client: Client,
    base_url: String,
    model: String,
    http: HttpConfig,
}

impl OllamaSource {
    pub fn new(base_url: &str, model: &str, http: HttpConfig) -> anyhow::Result<Self> {
        let client = build_http_client(http, "failed to build Ollama HTTP client")?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            http,
        })
    }
}

#[derive(Debug, Serialize)]
struct OllamaMessageOut {
    role: String,
    content: String,
}

#[derive(Debug, Serialize)]
struct OllamaRequest {
    model: String,
    messages: Vec<OllamaMessageOut>,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct OllamaChunk {
    #[serde(default)]
    message: Option<OllamaMessageIn>,
    #[serde(default)]
    done: bool,
}

#[derive(Debug, Deserialize)]
struct OllamaMessageIn {
    content: Option<String>,
}

#[async_trait]
impl PaletteSource for OllamaSource {
    async fn open(
        &self,
        instructions: &str,
        prompt: &str,
    ) -> anyhow::Result<Box<dyn SnapshotStream>> {
        let url = format!("{}/api/chat", self.base_url);
        let payload = OllamaRequest {
            model: self.model.clone(),
            messages: vec![
                OllamaMessageOut {
                    role: "system".to_string(),
                    content: instructions.to_string(),
                },
                OllamaMessageOut {
                    role: "user".to_string(),
                    content: prompt.to_string(),
                },
            ],
            stream: true,
        };
        let response = self
            .client
            .post(&url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| {
                ServiceError::new(
                    classify_reqwest_error(&e),
                    format!("failed to call Ollama endpoint: {e}"),
                )
            })?;
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<body unavailable>".to_string());
            return Err(ServiceError::new(
                classify_status(status.as_u16()),
                format!(
                    "Ollama endpoint returned HTTP {}: {}",
                    status.as_u16(),
                    truncate_for_error(&body, 200)
                ),
            )
            .with_status(status.as_u16())
            .into());
        }
        Ok(Box::new(OllamaStream {
            bytes: response.bytes_stream().boxed(),
            http: self.http,
            text_buf: String::new(),
            content_accum: String::new(),
            last_reported: Vec::new(),
            total_bytes: 0,
            done: false,
        }))
    }
}

struct OllamaStream {
    bytes: BoxStream<'static, reqwest::Result<bytes::Bytes>>,
    http: HttpConfig,
    text_buf: String,
    content_accum: String,
    last_reported: Vec<RawCandidate>,
    total_bytes: usize,
    done: bool,
}

impl OllamaStream {
    /// Folds one NDJSON line into the accumulated assistant text.
    fn ingest_line(&mut self, line: &str) -> anyhow::Result<()> {
        let chunk: OllamaChunk = serde_json::from_str(line).map_err(|e| {
            ServiceError::new(
                ServiceErrorKind::Parse,
                format!("malformed Ollama stream line: {e}"),
            )
        })?;
        if let Some(content) = chunk.message.and_then(|m| m.content) {
            self.content_accum.push_str(&content);
        }
        if chunk.done {
            self.done = true;
        }
        Ok(())
    }

    /// Returns the cumulative candidate set when it differs from the one
    /// last handed out.
    fn changed_candidates(&mut self) -> Option<Snapshot> {
        let decoded = extract_candidates(&self.content_accum);
        if decoded == self.last_reported {
            return None;
        }
        self.last_reported = decoded.clone();
        Some(decoded)
    }
}

#[async_trait]
impl SnapshotStream for OllamaStream {
    async fn next_snapshot(&mut self) -> Option<anyhow::Result<Snapshot>> {
        if self.done {
            return None;
        }
        loop {
            let maybe_chunk = if let Some(idle) = self.http.idle_timeout_opt() {
                match tokio::time::timeout(idle, self.bytes.next()).await {
                    Ok(v) => v,
                    Err(_) => {
                        self.done = true;
                        return Some(Err(ServiceError::new(
                            ServiceErrorKind::Timeout,
                            "stream idle timeout exceeded",
                        )
                        .into()));
                    }
                }
            } else {
                self.bytes.next().await
            };
            let Some(chunk_res) = maybe_chunk else {
                self.done = true;
                return self.changed_candidates().map(Ok);
            };
            let chunk = match chunk_res {
                Ok(c) => c,
                Err(e) => {
                    self.done = true;
                    return Some(Err(ServiceError::new(
                        classify_reqwest_error(&e),
                        format!("failed reading stream chunk: {e}"),
                    )
                    .into()));
                }
            };
            self.total_bytes = self.total_bytes.saturating_add(chunk.len());
            if self.total_bytes > self.http.max_response_bytes {
                self.done = true;
                return Some(Err(ServiceError::new(
                    ServiceErrorKind::PayloadTooLarge,
                    format!(
                        "stream exceeded max bytes: {} > {}",
                        self.total_bytes, self.http.max_response_bytes
                    ),
                )
                .into()));
            }
            self.text_buf.push_str(&String::from_utf8_lossy(&chunk));
            for line in drain_json_lines(&mut self.text_buf) {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                if line.len() > self.http.max_line_bytes {
                    self.done = true;
                    return Some(Err(ServiceError::new(
                        ServiceErrorKind::PayloadTooLarge,
                        format!(
                            "json line exceeded max bytes: {} > {}",
                            line.len(),
                            self.http.max_line_bytes
                        ),
                    )
                    .into()));
                }
                if let Err(e) = self.ingest_line(line) {
                    self.done = true;
                    return Some(Err(e));
                }
            }
            if let Some(snapshot) = self.changed_candidates() {
                return Some(Ok(snapshot));
            }
            if self.done {
                return None;
            }
        }
    }
}

fn drain_json_lines(buf: &mut String) -> Vec<String> {
    let mut out = Vec::new();
    while let Some(pos) = buf.find('\n') {
        out.push(buf[..pos].to_string());
        *buf = buf[pos + 1..].to_string();
    }
    out
}
