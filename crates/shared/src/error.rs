use std::fmt;

use thiserror::Error;

/// Why a call to the prediction service failed. Kept for logs only; users see
/// the collapsed message of [`AuthError`] or [`PredictError`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureCause {
    Transport(String),
    Status(u16),
    Malformed(String),
}

impl fmt::Display for FailureCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transport(message) => write!(f, "transport error: {message}"),
            Self::Status(status) => write!(f, "unexpected status {status}"),
            Self::Malformed(message) => write!(f, "malformed response: {message}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid username or password")]
pub struct AuthError {
    pub cause: FailureCause,
}

impl AuthError {
    pub fn new(cause: FailureCause) -> Self {
        Self { cause }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("prediction failed")]
pub struct PredictError {
    pub cause: FailureCause,
}

impl PredictError {
    pub fn new(cause: FailureCause) -> Self {
        Self { cause }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_facing_messages_hide_the_cause() {
        let network = AuthError::new(FailureCause::Transport("connection refused".into()));
        let rejected = AuthError::new(FailureCause::Status(401));
        assert_eq!(network.to_string(), rejected.to_string());
        assert_eq!(
            PredictError::new(FailureCause::Status(500)).to_string(),
            "prediction failed"
        );
    }

    #[test]
    fn cause_is_descriptive_for_logs() {
        assert_eq!(FailureCause::Status(401).to_string(), "unexpected status 401");
        assert!(FailureCause::Malformed("missing field".into())
            .to_string()
            .contains("missing field"));
    }
}
