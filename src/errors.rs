use thiserror::Error;

use crate::api::RemoteError;

/// Failure taxonomy for every engine entry point. Validation failures are
/// caught before any network traffic; remote failures always follow the
/// rollback path; stale outcomes are dropped without user-visible noise.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("{message}")]
    Validation {
        code: &'static str,
        message: String,
    },
    #[error(transparent)]
    Remote(#[from] RemoteError),
    #[error("response outlived its console")]
    Stale,
}

impl EngineError {
    pub fn validation(code: &'static str, message: impl Into<String>) -> Self {
        EngineError::Validation {
            code,
            message: message.into(),
        }
    }

    pub fn bad_params(message: impl Into<String>) -> Self {
        Self::validation("bad_params", message)
    }
}
