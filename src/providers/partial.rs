use crate::types::RawCandidate;

/// Best-effort decoder for a possibly-truncated JSON array of candidate
/// objects, as accumulated from a model's streamed text.
///
/// Every complete top-level object inside the array decodes to a
/// `RawCandidate` (unknown or missing fields tolerated); the trailing
/// incomplete object is left for a later, longer prefix. Text outside the
/// first array, including markdown code fences some models wrap around
/// their output, is skipped.
pub fn extract_candidates(raw: &str) -> Vec<RawCandidate> {
    let body = strip_code_fence(raw);
    let Some(start) = body.find('[') else {
        return Vec::new();
    };
    let mut out = Vec::new();
    let mut depth = 0usize;
    let mut obj_start = None;
    let mut in_string = false;
    let mut escaped = false;
    for (i, ch) in body[start..].char_indices() {
        let pos = start + i;
        if in_string {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => {
                if depth == 0 {
                    obj_start = Some(pos);
                }
                depth += 1;
            }
            '}' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    if let Some(s) = obj_start.take() {
                        if let Ok(c) = serde_json::from_str::<RawCandidate>(&body[s..=pos]) {
                            out.push(c);
                        }
                    }
                }
            }
            ']' if depth == 0 => break,
            _ => {}
        }
    }
    out
}

fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim_start();
    match trimmed.strip_prefix("```") {
        Some(rest) => match rest.find('\n') {
            Some(nl) => &rest[nl + 1..],
            None => rest,
        },
        None => raw,
    }
}
