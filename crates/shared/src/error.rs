use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::RevieweeId;

/// Structured failure payload the API attaches to non-success responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

impl ErrorBody {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum DomainError {
    #[error("assigned CV {} has status and submittedAt out of step", reviewee.0)]
    SubmissionFlagMismatch { reviewee: RevieweeId },
    #[error("assigned CV {} was submitted before it was assigned", reviewee.0)]
    SubmittedBeforeAssigned { reviewee: RevieweeId },
}
