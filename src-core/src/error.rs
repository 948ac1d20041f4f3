use thiserror::Error;

#[derive(Debug, Error)]
pub enum KaleError {
    #[error("{0}")]
    Validation(String),

    #[error("Failed to reach server: {0}")]
    Transport(String),

    #[error("{message}")]
    Status { code: u16, message: String },

    #[error("Invalid response format from server: {0}")]
    MalformedResponse(String),

    #[error("Failed to process image: {0}")]
    Image(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("{0}")]
    Auth(String),

    #[error("Invalid history ID format: {0} is not a valid ObjectID")]
    InvalidHistoryId(String),

    #[error("An analysis is already in progress")]
    Busy,

    #[error("Please upload an image before analyzing.")]
    NoFile,
}

impl KaleError {
    /// HTTP status carried by the error, if it came from a non-2xx response.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            KaleError::Status { code, .. } => Some(*code),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for KaleError {
    fn from(err: reqwest::Error) -> Self {
        KaleError::Transport(err.to_string())
    }
}

impl From<KaleError> for String {
    fn from(err: KaleError) -> Self {
        err.to_string()
    }
}
