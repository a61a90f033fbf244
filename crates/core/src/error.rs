use thiserror::Error;

/// Core domain errors
#[derive(Error, Debug)]
pub enum CoreError {
    /// Rejected locally, never reaches the network
    #[error("{reason}")]
    Validation { reason: String },

    /// The server answered but refused the request; `message` is its `error` field verbatim
    #[error("{message}")]
    Rejected { message: String },

    /// The connection itself failed
    #[error("{message}")]
    Transport { message: String },

    #[error("Failed to decode server response: {message}")]
    Decode { message: String },
}

impl CoreError {
    pub fn validation(reason: impl Into<String>) -> Self {
        Self::Validation { reason: reason.into() }
    }

    pub fn rejected(message: impl Into<String>) -> Self {
        Self::Rejected { message: message.into() }
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport { message: message.into() }
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;
