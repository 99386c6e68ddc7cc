use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProtoError {
    #[error("wrong field count: {0}")]
    WrongFieldCount(usize),
    #[error("envelope too large: {0}")]
    EnvelopeTooLarge(usize),
    #[error("empty sender id")]
    EmptySender,
    #[error("bad timestamp: {0:?}")]
    BadTimestamp(String),
    #[error("unknown event type: {0:?}")]
    UnknownEvent(String),
    #[error("json payload error: {0}")]
    Json(#[from] serde_json::Error),
}
