use serde::{Deserialize, Serialize};

pub const LIMIT_MIN: u8 = 1;
pub const LIMIT_MAX: u8 = 10;

/// A validated gradient palette. Construction only succeeds when the id,
/// a non-blank name, and more than two color entries are all present, so an
/// instance is never partially valid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Palette {
    id: i64,
    name: String,
    colors: Vec<String>,
}

impl Palette {
    /// Builds a palette from already-filtered parts. Returns `None` when the
    /// name trims to empty or fewer than three colors remain.
    pub fn new(id: i64, name: &str, colors: Vec<String>) -> Option<Self> {
        let name = name.trim();
        if name.is_empty() || colors.len() <= 2 {
            return None;
        }
        Some(Self {
            id,
            name: name.to_string(),
            colors,
        })
    }

    pub fn id(&self) -> i64 {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn colors(&self) -> &[String] {
        &self.colors
    }
}

/// A partially-populated candidate as decoded mid-stream. Every field is
/// optional; candidates are never stored, only fed through the validator.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RawCandidate {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub colors: Option<Vec<Option<String>>>,
}

/// One generation attempt's input. The limit is clamped to 1..=10 at this
/// boundary; the prompt must be non-empty to submit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    prompt: String,
    limit: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestError {
    EmptyPrompt,
}

impl std::fmt::Display for RequestError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyPrompt => write!(f, "prompt must not be empty"),
        }
    }
}

impl std::error::Error for RequestError {}

impl GenerationRequest {
    pub fn new(prompt: &str, limit: u8) -> Result<Self, RequestError> {
        let prompt = prompt.trim();
        if prompt.is_empty() {
            return Err(RequestError::EmptyPrompt);
        }
        Ok(Self {
            prompt: prompt.to_string(),
            limit: limit.clamp(LIMIT_MIN, LIMIT_MAX),
        })
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn limit(&self) -> u8 {
        self.limit
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    ServiceFailure,
}

/// Last-error payload surfaced to the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorInfo {
    pub kind: ErrorKind,
    pub message: String,
}

impl ErrorInfo {
    pub fn service_failure(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::ServiceFailure,
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{ErrorInfo, ErrorKind, GenerationRequest, Palette, RequestError};

    #[test]
    fn palette_requires_three_colors() {
        assert!(Palette::new(1, "Dawn", vec!["#111".into(), "#222".into()]).is_none());
        let p = Palette::new(1, "Dawn", vec!["#111".into(), "#222".into(), "#333".into()])
            .expect("palette");
        assert_eq!(p.colors().len(), 3);
    }

    #[test]
    fn palette_rejects_blank_name() {
        assert!(Palette::new(1, "   ", vec!["#1".into(), "#2".into(), "#3".into()]).is_none());
    }

    #[test]
    fn palette_trims_name() {
        let p = Palette::new(2, "  Ocean  ", vec!["#1".into(), "#2".into(), "#3".into()])
            .expect("palette");
        assert_eq!(p.name(), "Ocean");
    }

    #[test]
    fn request_rejects_empty_prompt() {
        assert_eq!(
            GenerationRequest::new("   ", 3).expect_err("reject"),
            RequestError::EmptyPrompt
        );
    }

    #[test]
    fn request_clamps_limit_to_bounds() {
        assert_eq!(GenerationRequest::new("sunset", 0).expect("req").limit(), 1);
        assert_eq!(
            GenerationRequest::new("sunset", 99).expect("req").limit(),
            10
        );
        assert_eq!(GenerationRequest::new("sunset", 3).expect("req").limit(), 3);
    }

    #[test]
    fn request_trims_prompt() {
        let r = GenerationRequest::new("  dusk  ", 3).expect("req");
        assert_eq!(r.prompt(), "dusk");
    }

    #[test]
    fn error_info_serializes_kind_snake_case() {
        let e = ErrorInfo::service_failure("boom");
        assert_eq!(e.kind, ErrorKind::ServiceFailure);
        let s = serde_json::to_string(&e).expect("serialize");
        assert!(s.contains("\"service_failure\""));
    }
}
