use thiserror::Error;

/// Exchange REST failures
#[derive(Debug, Error)]
pub enum ExchangeError {
    /// Transport failure (DNS, connect, timeout)
    #[error("Network error: {0}")]
    Network(String),

    /// Non-success HTTP status
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// Exchange accepted the request but rejected it with an error code
    #[error("API error {code}: {message}")]
    Api { code: String, message: String },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Rate limit exceeded")]
    RateLimited,

    /// Missing or unusable credentials
    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Not supported: {0}")]
    Unsupported(String),
}

impl ExchangeError {
    /// Whether repeating the same request could succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            ExchangeError::Network(_) | ExchangeError::RateLimited => true,
            ExchangeError::Http { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

impl From<reqwest::Error> for ExchangeError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            ExchangeError::Parse(e.to_string())
        } else {
            ExchangeError::Network(e.to_string())
        }
    }
}

impl From<serde_json::Error> for ExchangeError {
    fn from(e: serde_json::Error) -> Self {
        ExchangeError::Parse(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable() {
        assert!(ExchangeError::RateLimited.is_retryable());
        assert!(ExchangeError::Network("reset".into()).is_retryable());
        assert!(ExchangeError::Http { status: 503, body: String::new() }.is_retryable());
        assert!(!ExchangeError::Http { status: 400, body: String::new() }.is_retryable());
        assert!(!ExchangeError::Api { code: "102002".into(), message: "bad".into() }.is_retryable());
    }
}
