use shared::{domain::FieldKey, error::ErrorCode};

/// Result of one validation round-trip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationOutcome {
    /// Plain success; the accumulated error list was emptied.
    Cleared,
    /// Endpoint rejected the form; `errors` is the accumulated list.
    Rejected { errors: Vec<FieldKey> },
    /// Recovery notice rendered; the error list was left as it was.
    Notice { errors: Vec<FieldKey> },
    /// Throttled; navigation to `target` was requested.
    Redirected { target: String },
    /// Send or decode failure. Never clears the form for submission.
    TransportFailed,
}

impl ValidationOutcome {
    pub fn is_cleared(&self) -> bool {
        matches!(self, ValidationOutcome::Cleared)
    }

    pub fn errors(&self) -> &[FieldKey] {
        match self {
            ValidationOutcome::Rejected { errors } | ValidationOutcome::Notice { errors } => {
                errors.as_slice()
            }
            _ => &[],
        }
    }

    pub fn code(&self) -> Option<ErrorCode> {
        match self {
            ValidationOutcome::Cleared => None,
            ValidationOutcome::Rejected { .. } => Some(ErrorCode::ValidationRejected),
            ValidationOutcome::Notice { .. } => Some(ErrorCode::RecoveryNotice),
            ValidationOutcome::Redirected { .. } => Some(ErrorCode::RateLimited),
            ValidationOutcome::TransportFailed => Some(ErrorCode::TransportFailure),
        }
    }
}

/// Result of a submit click.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// No field changed since the previous sync; nothing was sent.
    Unchanged,
    /// The login form was already submitted by this controller.
    AlreadySubmitted,
    /// A recovery request is still pending; the click was dropped.
    InFlight,
    /// Validation ran without a real submission following it.
    Validated(ValidationOutcome),
    /// Validation cleared and the form was really submitted.
    Submitted,
}
