use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("unauthorized webhook request")]
    Unauthorized,

    #[error("malformed event: {0}")]
    MalformedEvent(String),

    #[error("storage: {0}")]
    Storage(#[from] sqlx::Error),

    #[error("serialization: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("request timed out")]
    Timeout,

    #[error("internal: {0}")]
    Internal(String),
}

impl PipelineError {
    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedEvent(msg.into())
    }
}
