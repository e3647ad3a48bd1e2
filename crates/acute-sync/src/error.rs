use serde_json::Value;
use thiserror::Error;

const MAX_DETAIL_CHARS: usize = 512;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ClientError {
    #[error("network error: {0}")]
    Network(String),
    #[error("service responded with status {status}{}", detail_suffix(.detail))]
    Response { status: u16, detail: Option<String> },
    #[error("unexpected response body: {0}")]
    Decode(String),
    #[error("invalid base url '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },
}

impl ClientError {
    pub fn is_retryable(&self) -> bool {
        match self {
            ClientError::Network(_) => true,
            ClientError::Response { status, .. } => *status >= 500,
            ClientError::Decode(_) | ClientError::InvalidBaseUrl { .. } => false,
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Response { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Short operator-facing line for banners and the error view.
    pub fn user_message(&self) -> String {
        match self {
            ClientError::Network(_) => {
                "Failed to reach the summary service. Please try again.".to_string()
            }
            ClientError::Response { status, .. } => {
                format!("Failed to fetch summaries (status {status}). Please try again.")
            }
            ClientError::Decode(_) => {
                "The summary service sent an unreadable response.".to_string()
            }
            ClientError::InvalidBaseUrl { url, .. } => {
                format!("The summary service address '{url}' is not valid.")
            }
        }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ClientError::Decode(err.to_string())
        } else {
            ClientError::Network(err.to_string())
        }
    }
}

fn detail_suffix(detail: &Option<String>) -> String {
    match detail {
        Some(detail) => format!(": {detail}"),
        None => String::new(),
    }
}

/// Pulls the server's explanation out of an error body. JSON bodies are
/// searched for `detail`, `message` or `error`; anything else is kept as text.
pub(crate) fn extract_detail(body: &[u8]) -> Option<String> {
    if let Ok(value) = serde_json::from_slice::<Value>(body) {
        if let Some(object) = value.as_object() {
            for field in ["detail", "message", "error"] {
                match object.get(field) {
                    Some(Value::String(text)) if !text.trim().is_empty() => {
                        return Some(truncate(text.trim()));
                    }
                    Some(Value::Null) | None => {}
                    Some(other) => return Some(truncate(&other.to_string())),
                }
            }
        }
    }

    let text = String::from_utf8_lossy(body);
    let trimmed = text.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(truncate(trimmed))
    }
}

fn truncate(text: &str) -> String {
    if text.chars().count() <= MAX_DETAIL_CHARS {
        return text.to_string();
    }
    let mut out: String = text.chars().take(MAX_DETAIL_CHARS).collect();
    out.push_str("...");
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detail_prefers_json_fields() {
        assert_eq!(
            extract_detail(br#"{"detail":"Summary not found"}"#).as_deref(),
            Some("Summary not found")
        );
        assert_eq!(
            extract_detail(br#"{"detail":[{"loc":["body","title"],"msg":"field required"}]}"#)
                .as_deref(),
            Some(r#"[{"loc":["body","title"],"msg":"field required"}]"#)
        );
        assert_eq!(
            extract_detail(br#"{"error":"bad gateway"}"#).as_deref(),
            Some("bad gateway")
        );
    }

    #[test]
    fn detail_falls_back_to_text() {
        assert_eq!(
            extract_detail(b"  upstream timeout \n").as_deref(),
            Some("upstream timeout")
        );
        assert_eq!(extract_detail(b""), None);
        assert_eq!(extract_detail(b"{}").as_deref(), Some("{}"));
    }

    #[test]
    fn response_errors_render_detail() {
        let err = ClientError::Response {
            status: 404,
            detail: Some("Summary not found".to_string()),
        };
        assert_eq!(
            err.to_string(),
            "service responded with status 404: Summary not found"
        );
        assert!(!err.is_retryable());
        assert!(ClientError::Response {
            status: 503,
            detail: None
        }
        .is_retryable());
        assert!(ClientError::Network("connection refused".to_string()).is_retryable());
    }
}
