use thiserror::Error;

/// Errors raised while resolving policies for a pod
#[derive(Debug, Error)]
pub enum Error {
    /// A policy's pod selector could not be compiled
    #[error("network policy {policy} has an invalid pod selector: {reason}")]
    InvalidSelector { policy: String, reason: String },
}

impl Error {
    pub fn invalid_selector(policy: impl Into<String>, reason: impl ToString) -> Self {
        Self::InvalidSelector {
            policy: policy.into(),
            reason: reason.to_string(),
        }
    }
}
