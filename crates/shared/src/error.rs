use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failure taxonomy reported by the form controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    ValidationRejected,
    RateLimited,
    RecoveryNotice,
    TransportFailure,
    LookupFailure,
}

impl ErrorCode {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::ValidationRejected => "validation_rejected",
            ErrorCode::RateLimited => "rate_limited",
            ErrorCode::RecoveryNotice => "recovery_notice",
            ErrorCode::TransportFailure => "transport_failure",
            ErrorCode::LookupFailure => "lookup_failure",
        }
    }
}

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("malformed validation response: {0}")]
    Malformed(#[from] serde_json::Error),
}
