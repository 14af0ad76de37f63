/// Errors raised by the Airdee core library.
///
/// `InvalidInput` is the only variant the vector search client lets escape to
/// its caller; transport and remote failures are degraded locally by the
/// conversation controller and the vector client.
#[derive(Debug, thiserror::Error)]
pub enum AirdeeError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("remote returned status {status}: {body}")]
    Remote { status: u16, body: String },
    #[error("unexpected response: {0}")]
    UnexpectedResponse(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("vector shape error: {0}")]
    VectorShape(String),
    #[error("configuration error: {0}")]
    Config(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type AirdeeResult<T> = std::result::Result<T, AirdeeError>;

impl AirdeeError {
    /// Body excerpt kept on `Remote` errors.
    pub(crate) const BODY_EXCERPT: usize = 300;

    pub(crate) fn remote(status: u16, body: &str) -> Self {
        let body: String = body.chars().take(Self::BODY_EXCERPT).collect();
        AirdeeError::Remote { status, body }
    }
}
