use thiserror::Error;

/// Failures surfaced by the HTTP backend and push stream.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The lobby no longer exists server-side. Terminal for the session.
    #[error("lobby no longer exists")]
    LobbyGone,
    /// The server answered with a rejection payload.
    #[error("server rejected the request: {msg}")]
    Rejected { msg: String },
    /// Transport-level failure; the session stays alive and shows a
    /// connection-lost notice until the next success.
    #[error("network error: {0}")]
    Network(String),
    /// A 2xx response whose body did not parse.
    #[error("malformed response payload")]
    Payload,
    /// The transport cannot provide a push stream at all.
    #[error("push streaming unsupported by this transport")]
    StreamUnsupported,
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        ApiError::Network(err.to_string())
    }
}

impl ApiError {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ApiError::LobbyGone)
    }
}
