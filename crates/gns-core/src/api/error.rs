use reqwest::StatusCode;
use serde_json::Value;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    /// Rejected before any request was sent.
    #[error("Invalid request: {0}")]
    Validation(String),

    /// No response was received (connect failure, timeout, broken body).
    #[error("Network error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The server answered with a status outside 2xx.
    #[error("{message}")]
    Http {
        status: u16,
        message: String,
        body: String,
    },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// Maximum length for error response bodies kept on an error
const MAX_ERROR_BODY_LENGTH: usize = 2000;

impl ApiError {
    /// Truncate a response body to avoid carrying excessive data around
    fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            return body.to_string();
        }
        let mut end = MAX_ERROR_BODY_LENGTH;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}... (truncated, {} total bytes)", &body[..end], body.len())
    }

    /// Classify a non-2xx response.
    ///
    /// The human-readable message comes from the envelope's `error` field,
    /// then its `message` field, then a generic status line.
    pub fn from_response(status: StatusCode, body: &str) -> Self {
        ApiError::Http {
            status: status.as_u16(),
            message: Self::envelope_message(body)
                .unwrap_or_else(|| format!("Request failed with status code {}", status.as_u16())),
            body: Self::truncate_body(body),
        }
    }

    fn envelope_message(body: &str) -> Option<String> {
        let value: Value = serde_json::from_str(body).ok()?;
        ["error", "message"].iter().find_map(|field| {
            value
                .get(field)
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        })
    }

    /// HTTP status of the failed response, if one was received
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(StatusCode::UNAUTHORIZED.as_u16())
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, ApiError::Transport(_))
    }
}
