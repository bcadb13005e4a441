//! Crate-level error type.

use thiserror::Error;

/// Fallback message when a failed response carries no `error` field.
pub const GENERIC_FAILURE: &str = "Failed to send message";

/// Everything that can go wrong while driving a conversation.
///
/// Stream failures (`RequestFailed`, `UnreadableStream`, `Transport`) end up in
/// the session's `last_error` and halt the session. Malformed SSE frames are
/// not represented here: the decoder skips them.
#[derive(Debug, Error)]
pub enum ChatError {
    /// The completion endpoint answered with a non-success status.
    #[error("{message}")]
    RequestFailed { status: u16, message: String },

    /// The response body could not be read.
    #[error("Response body is not readable: {0}")]
    UnreadableStream(String),

    /// The request never produced a response (DNS, connect, TLS...).
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("a turn is already in progress")]
    TurnInProgress,

    #[error("the topic cannot change once the conversation has started")]
    TopicLocked,

    #[error("config error: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("invalid TOML: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

impl ChatError {
    /// Build a `RequestFailed`, falling back to the generic message when the
    /// server did not report one.
    pub fn request_failed(status: u16, message: Option<String>) -> Self {
        let message = message
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| GENERIC_FAILURE.to_string());
        ChatError::RequestFailed { status, message }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_failed_uses_server_message() {
        let err = ChatError::request_failed(429, Some("rate limited".to_string()));
        assert_eq!(err.to_string(), "rate limited");
    }

    #[test]
    fn test_request_failed_falls_back_to_generic() {
        assert_eq!(ChatError::request_failed(500, None).to_string(), GENERIC_FAILURE);
        assert_eq!(
            ChatError::request_failed(500, Some("  ".to_string())).to_string(),
            GENERIC_FAILURE
        );
    }

    #[test]
    fn test_unreadable_stream_message() {
        let err = ChatError::UnreadableStream("connection reset".to_string());
        assert!(err.to_string().contains("not readable"));
    }
}
