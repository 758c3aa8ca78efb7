//! Transport-level error type shared by all API clients

/// Error from sending a single HTTP request.
///
/// Non-success statuses are not errors at this level: they come back as an
/// [`HttpResponse`](crate::http::HttpResponse) and the retry client decides.
/// This type covers requests that produced no usable response at all.
#[derive(Debug, Clone)]
pub enum TransportError {
    /// Connect or read timeout
    Timeout(String),
    /// Connection refused, DNS failure, body read failure, ...
    Http {
        status: Option<u16>,
        message: String,
    },
}

impl std::fmt::Display for TransportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Timeout(message) => write!(f, "timeout: {message}"),
            Self::Http {
                status: Some(s),
                message,
            } => write!(f, "HTTP {s}: {message}"),
            Self::Http {
                status: None,
                message,
            } => write!(f, "HTTP error: {message}"),
        }
    }
}

impl std::error::Error for TransportError {}

impl TransportError {
    /// Build from a reqwest error, dropping the URL so API keys never reach the log.
    pub fn from_reqwest(e: reqwest::Error) -> Self {
        let e = e.without_url();
        if e.is_timeout() {
            return Self::Timeout(e.to_string());
        }
        Self::Http {
            status: e.status().map(|s| s.as_u16()),
            message: e.to_string(),
        }
    }

    /// Timeouts are treated like a gateway timeout; everything else is final.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Timeout(_) => None,
            Self::Http { status, .. } => *status,
        }
    }
}
