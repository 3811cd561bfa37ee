/// Shared error type used across all HomeVoice crates.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("IO: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("websocket: {0}")]
    Ws(String),

    #[error("config: {0}")]
    Config(String),

    #[error("a live session already exists for call {0}")]
    DuplicateSession(String),

    #[error("no live session for call {0}")]
    SessionNotFound(String),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, Error>;
