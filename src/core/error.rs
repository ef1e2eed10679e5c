use thiserror::Error;

use crate::core::llm::LlmError;

/// Errors surfaced by core operations. Storage and plumbing failures arrive
/// as `Internal`; everything else names a domain condition the caller can act on.
#[derive(Debug, Error)]
pub enum CouncilError {
    #[error("{0}")]
    Validation(String),
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("invalid transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },
    #[error("project configuration: {0}")]
    Configuration(String),
    #[error("synthesis failed: {0}")]
    Synthesis(String),
    #[error(transparent)]
    Model(#[from] LlmError),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl CouncilError {
    pub fn validation(msg: impl Into<String>) -> Self {
        CouncilError::Validation(msg.into())
    }

    pub fn transition(from: impl ToString, to: impl ToString) -> Self {
        CouncilError::InvalidTransition {
            from: from.to_string(),
            to: to.to_string(),
        }
    }
}

pub type CouncilResult<T> = Result<T, CouncilError>;
