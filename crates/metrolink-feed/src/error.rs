use std::error;
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub enum FeedError {
    RequestError(Arc<reqwest::Error>),
    JsonError(Arc<serde_json::Error>),
    InvalidResponse {
        status_code: reqwest::StatusCode,
        url: String,
    },
    Timeout,
    NotConfigured,
}

impl fmt::Display for FeedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RequestError(e) => write!(f, "feed request error: {e}"),
            Self::JsonError(e) => write!(f, "feed response was not valid JSON: {e}"),
            Self::InvalidResponse { status_code, url } => {
                write!(f, "feed returned {status_code} for {url}")
            }
            Self::Timeout => write!(f, "feed request timed out"),
            Self::NotConfigured => write!(f, "no subscription key configured"),
        }
    }
}

impl error::Error for FeedError {}

impl From<reqwest::Error> for FeedError {
    fn from(e: reqwest::Error) -> Self {
        FeedError::RequestError(Arc::new(e))
    }
}

impl From<serde_json::Error> for FeedError {
    fn from(e: serde_json::Error) -> Self {
        FeedError::JsonError(Arc::new(e))
    }
}

pub type FeedResult<T> = Result<T, FeedError>;
