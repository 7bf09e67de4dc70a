pub type BoothResult<T> = Result<T, BoothError>;

#[derive(thiserror::Error, Debug)]
pub enum BoothError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("capture session already active")]
    SessionActive,

    #[error("capture incomplete: slot {slot} of {total} is empty")]
    IncompleteCapture { slot: usize, total: usize },

    #[error("render error: {0}")]
    Render(String),

    #[error("encode error: {0}")]
    Encode(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl BoothError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn render(msg: impl Into<String>) -> Self {
        Self::Render(msg.into())
    }

    pub fn encode(msg: impl Into<String>) -> Self {
        Self::Encode(msg.into())
    }
}
