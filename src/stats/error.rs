use thiserror::Error;

/// Everything that can go wrong fetching one item from the stats API.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("player '{0}' not found in the stats index")]
    PlayerNotFound(String),

    #[error("empty game log")]
    EmptyLog,

    #[error("rate limited (HTTP 429)")]
    RateLimited,

    #[error("HTTP status {0}")]
    Status(u16),

    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("malformed response: {0}")]
    Malformed(String),
}

impl FetchError {
    /// Worth another attempt: rate limiting, server-side errors, and
    /// timeouts or dropped connections. Everything else is permanent for
    /// this run.
    pub fn is_transient(&self) -> bool {
        match self {
            FetchError::RateLimited => true,
            FetchError::Status(code) => *code >= 500,
            FetchError::Transport(e) => e.is_timeout() || e.is_connect(),
            _ => false,
        }
    }
}
