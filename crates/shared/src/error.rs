use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown run state token '{token}' (expected STOPPED or STARTED)")]
pub struct ParseRunStateError {
    pub token: String,
}

impl ParseRunStateError {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

