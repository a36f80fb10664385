use super::{PolicyName, PolicyOp};
use crate::BoxError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PolicyError {
    #[error("Name validation failed for '{name}'")]
    NameValidation {
        name: String,
        #[source]
        source: BoxError,
    },

    #[error("Parent validation failed for '{actual}' != '{expected}'")]
    ParentValidation { expected: String, actual: String },

    #[error("Lint failed for '{name}'")]
    Lint {
        name: PolicyName,
        #[source]
        source: BoxError,
    },

    #[error("Error during client method '{method}'")]
    ClientMethod {
        method: PolicyOp,
        #[source]
        source: BoxError,
    },
}

impl PolicyError {
    /// True when the caller supplied a name this layer refuses to handle.
    pub fn is_name_error(&self) -> bool {
        matches!(
            self,
            PolicyError::NameValidation { .. } | PolicyError::ParentValidation { .. }
        )
    }

    /// The backend operation that failed, if this is a client method error.
    pub fn method(&self) -> Option<PolicyOp> {
        match self {
            PolicyError::ClientMethod { method, .. } => Some(*method),
            _ => None,
        }
    }
}
