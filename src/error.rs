use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// Missing or out-of-range configuration. Fatal at startup.
    #[error("configuration error: {0}")]
    Config(String),

    /// Terminal failure for one chapter. Batch callers log it and move on.
    #[error(transparent)]
    Scraper(#[from] ScraperError),

    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error("{action} {}: {source}", path.display())]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn io(action: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            action,
            path: path.into(),
            source,
        }
    }
}

#[derive(Debug, Error)]
pub enum ScraperError {
    #[error("{0}")]
    ContentNotFound(String),

    #[error("Novel title not found.")]
    TitleNotFound,

    #[error("Failed to translate chapter after {attempts} attempts")]
    AttemptsExhausted { attempts: u32, last_failure: String },

    #[error("backend rejected the request on attempt {attempt}: {message}")]
    BackendRejected { attempt: u32, message: String },
}

/// Failure of a single call to the generative backend.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("transport: {0}")]
    Transport(String),

    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    /// The backend answered, but not with the agreed response shape.
    #[error("contract violation: {0}")]
    Contract(String),
}

impl BackendError {
    /// 408, 429 and 5xx are worth another attempt; other 4xx are not.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport(_) | Self::Contract(_) => true,
            Self::Http { status, .. } => *status == 408 || *status == 429 || *status >= 500,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exhaustion_message_names_attempt_count() {
        let err = Error::from(ScraperError::AttemptsExhausted {
            attempts: 3,
            last_failure: "incomplete".into(),
        });
        assert_eq!(err.to_string(), "Failed to translate chapter after 3 attempts");
    }

    #[test]
    fn http_retry_classification() {
        let http = |status| BackendError::Http {
            status,
            message: String::new(),
        };
        assert!(http(429).is_retryable());
        assert!(http(408).is_retryable());
        assert!(http(503).is_retryable());
        assert!(!http(401).is_retryable());
        assert!(!http(400).is_retryable());
        assert!(BackendError::Transport("reset".into()).is_retryable());
    }
}
