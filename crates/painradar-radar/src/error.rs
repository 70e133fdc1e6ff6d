use painradar_core::Platform;
use painradar_db::DbError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RadarError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("XML parse error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("failed to deserialize {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("{platform} returned unexpected status {status}")]
    UnexpectedStatus { platform: Platform, status: u16 },

    #[error("{platform} rate limited the request (retry after {retry_after_secs}s)")]
    RateLimited {
        platform: Platform,
        retry_after_secs: u64,
    },

    #[error("inference endpoint returned {status}: {body}")]
    Inference { status: u16, body: String },

    #[error("malformed model response: {0}")]
    MalformedResponse(String),

    #[error("keyword not found")]
    KeywordNotFound,

    #[error("keyword is inactive")]
    KeywordInactive,

    #[error("no posts found")]
    NoPostsFound,

    #[error("storage error: {0}")]
    Store(String),

    #[error("validation error: {0}")]
    Validation(String),
}

impl RadarError {
    /// Whether the retry helper should try the operation again.
    ///
    /// Network timeouts, connect failures, 5xx responses and explicit rate
    /// limiting are transient. Everything else fails on the first attempt.
    #[must_use]
    pub fn is_retriable(&self) -> bool {
        match self {
            RadarError::Http(e) => {
                e.is_timeout() || e.is_connect() || e.status().is_some_and(|s| s.is_server_error())
            }
            RadarError::UnexpectedStatus { status, .. } => *status >= 500,
            RadarError::RateLimited { .. } => true,
            RadarError::Xml(_)
            | RadarError::Deserialize { .. }
            | RadarError::Inference { .. }
            | RadarError::MalformedResponse(_)
            | RadarError::KeywordNotFound
            | RadarError::KeywordInactive
            | RadarError::NoPostsFound
            | RadarError::Store(_)
            | RadarError::Validation(_) => false,
        }
    }
}

impl From<DbError> for RadarError {
    fn from(err: DbError) -> Self {
        RadarError::Store(err.to_string())
    }
}
