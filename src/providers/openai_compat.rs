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

/// Session adapter for OpenAI-compatible `/chat/completions` SSE endpoints
/// (LM Studio, llama.cpp and friends). Delta text accumulates across events;
/// a new cumulative snapshot is yielded whenever the decoded candidate
/// prefix changes.
#[derive(Debug, Clone)]
pub struct OpenAiCompatSource {
    client: Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
    http: HttpConfig,
}

impl OpenAiCompatSource {
    pub fn new(
        base_url: &str,
        model: &str,
        api_key: Option<String>,
        http: HttpConfig,
    ) -> anyhow::Result<Self> {
        let client = build_http_client(http, "failed to build OpenAI-compatible HTTP client")?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            api_key,
            http,
        })
    }
}

#[derive(Debug, Serialize)]
struct ChatMessageOut {
    role: String,
    content: String,
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessageOut>,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct ChatStreamEvent {
    #[serde(default)]
    choices: Vec<ChatStreamChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatStreamChoice {
    #[serde(default)]
    delta: ChatDelta,
}

#[derive(Debug, Default, Deserialize)]
struct ChatDelta {
    #[serde(default)]
    content: Option<String>,
}

#[async_trait]
impl PaletteSource for OpenAiCompatSource {
    async fn open(
        &self,
        instructions: &str,
        prompt: &str,
    ) -> anyhow::Result<Box<dyn SnapshotStream>> {
        let url = format!("{}/chat/completions", self.base_url);
        let payload = ChatRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessageOut {
                    role: "system".to_string(),
                    content: instructions.to_string(),
                },
                ChatMessageOut {
                    role: "user".to_string(),
                    content: prompt.to_string(),
                },
            ],
            stream: true,
        };
        let mut req = self.client.post(&url).json(&payload);
        if let Some(key) = &self.api_key {
            req = req.bearer_auth(key);
        }
        let response = req.send().await.map_err(|e| {
            ServiceError::new(
                classify_reqwest_error(&e),
                format!("failed to call OpenAI-compatible endpoint: {e}"),
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
                    "endpoint returned HTTP {}: {}",
                    status.as_u16(),
                    truncate_for_error(&body, 200)
                ),
            )
            .with_status(status.as_u16())
            .into());
        }
        Ok(Box::new(SseStream {
            bytes: response.bytes_stream().boxed(),
            http: self.http,
            event_buf: String::new(),
            content_accum: String::new(),
            last_reported: Vec::new(),
            total_bytes: 0,
            done: false,
        }))
    }
}

struct SseStream {
    bytes: BoxStream<'static, reqwest::Result<bytes::Bytes>>,
    http: HttpConfig,
    event_buf: String,
    content_accum: String,
    last_reported: Vec<RawCandidate>,
    total_bytes: usize,
    done: bool,
}

impl SseStream {
    fn ingest_payload(&mut self, payload: &str) -> anyhow::Result<()> {
        if payload == "[DONE]" {
            self.done = true;
            return Ok(());
        }
        let event: ChatStreamEvent = serde_json::from_str(payload).map_err(|e| {
            ServiceError::new(
                ServiceErrorKind::Parse,
                format!("malformed SSE stream event: {e}"),
            )
        })?;
        if let Some(choice) = event.choices.into_iter().next() {
            if let Some(content) = choice.delta.content {
                self.content_accum.push_str(&content);
            }
        }
        Ok(())
    }

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
impl SnapshotStream for SseStream {
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
            self.event_buf.push_str(&String::from_utf8_lossy(&chunk));
            for raw_event in drain_sse_events(&mut self.event_buf) {
                if raw_event.len() > self.http.max_line_bytes {
                    self.done = true;
                    return Some(Err(ServiceError::new(
                        ServiceErrorKind::PayloadTooLarge,
                        format!(
                            "sse event exceeded max bytes: {} > {}",
                            raw_event.len(),
                            self.http.max_line_bytes
                        ),
                    )
                    .into()));
                }
                let Some(payload) = parse_sse_event_payload(&raw_event) else {
                    continue;
                };
                if let Err(e) = self.ingest_payload(&payload) {
                    self.done = true;
                    return Some(Err(e));
                }
                if self.done {
                    break;
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

/// Splits off complete SSE events (terminated by a blank line).
fn drain_sse_events(buf: &mut String) -> Vec<String> {
    let mut out = Vec::new();
    loop {
        let Some(pos) = buf.find("\n\n").or_else(|| buf.find("\r\n\r\n")) else {
            return out;
        };
        let sep_len = if buf[pos..].starts_with("\n\n") { 2 } else { 4 };
        out.push(buf[..pos].to_string());
        *buf = buf[pos + sep_len..].to_string();
    }
}

fn parse_sse_event_payload(raw_event: &str) -> Option<String> {
    let mut data_lines = Vec::new();
    for line in raw_event.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with(':') {
            continue;
        }
        if let Some(rest) = trimmed.strip_prefix("data:") {
            data_lines.push(rest.trim_start().to_string());
        }
    }
    if data_lines.is_empty() {
        return None;
    }
    Some(data_lines.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::{drain_sse_events, parse_sse_event_payload, ChatStreamEvent};

    #[test]
    fn drains_complete_events_only() {
        let mut buf = "data: {\"a\":1}\n".to_string();
        assert!(drain_sse_events(&mut buf).is_empty());
        buf.push('\n');
        buf.push_str("data: {\"b\":2}\n\n");
        let ev = drain_sse_events(&mut buf);
        assert_eq!(ev.len(), 2);
        assert_eq!(ev[0], "data: {\"a\":1}");
        assert_eq!(ev[1], "data: {\"b\":2}");
        assert!(buf.is_empty());
    }

    #[test]
    fn payload_skips_comments_and_joins_data_lines() {
        let p = parse_sse_event_payload(": keepalive\ndata: part1\ndata: part2").expect("payload");
        assert_eq!(p, "part1\npart2");
        assert!(parse_sse_event_payload(": only comment").is_none());
    }

    #[test]
    fn done_sentinel_payload_parses() {
        let p = parse_sse_event_payload("data: [DONE]\n").expect("payload");
        assert_eq!(p, "[DONE]");
    }

    #[test]
    fn delta_content_decodes() {
        let ev: ChatStreamEvent =
            serde_json::from_str(r#"{"choices":[{"delta":{"content":"[{\"id\""}}]}"#)
                .expect("parse");
        let first = ev.choices.into_iter().next().expect("choice");
        assert_eq!(first.delta.content.as_deref(), Some("[{\"id\""));
    }

    #[test]
    fn empty_delta_tolerated() {
        let ev: ChatStreamEvent =
            serde_json::from_str(r#"{"choices":[{"delta":{}}]}"#).expect("parse");
        assert!(ev.choices[0].delta.content.is_none());
    }
}
