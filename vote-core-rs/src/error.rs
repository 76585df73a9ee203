//! Error types for the vote engine

use crate::types::Priority;
use std::collections::TryReserveError;
use thiserror::Error;

/// Errors reported by vote operations
#[derive(Debug, Error)]
pub enum VoteError {
    #[error("vote {0:?} already exists")]
    DuplicateName(String),

    #[error("vote {0:?} declares no voters")]
    NoVoters(String),

    #[error("vote {0:?} needs a comparator for its policy")]
    MissingComparator(String),

    #[error("priority structure capacity must be non-zero")]
    ZeroCapacity,

    #[error("allocation failed: {0}")]
    Allocation(#[from] TryReserveError),

    #[error("vote {0:?}: operation not permitted for custom_data policy")]
    NotPermitted(String),

    #[error("priority {priority} out of range [{min}, {max}]")]
    PriorityOutOfRange {
        priority: Priority,
        min: Priority,
        max: Priority,
    },

    #[error("vote {vote:?} has no voter named {voter:?}")]
    UnknownVoter { vote: String, voter: String },

    #[error("vote {0:?} has no active voter")]
    Empty(String),

    #[error("vote {vote:?}: callback failed: {source}")]
    Callback {
        vote: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

pub type VoteResult<T> = Result<T, VoteError>;
