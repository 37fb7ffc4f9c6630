//! Submission error taxonomy.
//!
//! Validation failures are plain data ([`crate::core::types::ValidationError`])
//! and never surface as `Err`; only submission can fail.

use thiserror::Error;

/// Why a submission did not complete.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubmissionError {
    /// Another submission is still outstanding.
    #[error("a submission is already in flight")]
    InFlight,

    /// Re-validation found errors; nothing was sent.
    #[error("step {step} failed validation")]
    LocalValidationFailed { step: u32 },

    /// The request never produced an HTTP response.
    #[error("transport failure: {0}")]
    TransportFailure(String),

    /// The endpoint answered with a non-2xx status.
    #[error("server rejected submission with status {status}")]
    ServerRejected { status: u16 },
}

impl SubmissionError {
    /// Global message shown to the user.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::InFlight => "Submission already in progress",
            Self::LocalValidationFailed { .. } => "Please fix the errors before submitting",
            Self::TransportFailure(_) | Self::ServerRejected { .. } => "Failed to submit form",
        }
    }
}
