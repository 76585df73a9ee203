//! Node error types

use thiserror::Error;
use vote_core::VoteError;

#[derive(Debug, Error)]
pub enum NodeError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Vote(#[from] VoteError),

    #[error("Unknown vote: {0}")]
    UnknownVote(String),

    #[error("Unknown command: {0} (try 'help')")]
    UnknownCommand(String),

    #[error("Usage: {0}")]
    Usage(&'static str),

    #[error("Invalid number: {0}")]
    InvalidNumber(String),
}
