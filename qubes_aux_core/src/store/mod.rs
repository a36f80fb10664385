//! Policy stores implementing [`PolicyBackend`](crate::policy::PolicyBackend).
//!
//! Both stores share the admin token rules: `any` writes unconditionally,
//! `new` requires the policy to be absent, anything else must equal the
//! `sha256:` token of the stored content.

mod error;
mod file;
mod memory;

pub use error::{Result, StoreError};
pub use file::{FilePolicyStore, INCLUDE_DIR, LOCK_FILE, POLICY_SUFFIX};
pub use memory::InMemoryPolicyStore;

use crate::policy::PolicyToken;

/// Decide whether a write carrying `token` may replace `current`.
pub(crate) fn check_token(name: &str, current: Option<&str>, token: &PolicyToken) -> Result<()> {
    match (token.as_str(), current) {
        (PolicyToken::ANY, _) => Ok(()),
        (PolicyToken::NEW, None) => Ok(()),
        (PolicyToken::NEW, Some(_)) => Err(StoreError::AlreadyExists(name.to_string())),
        (_, None) => Err(StoreError::NotFound(name.to_string())),
        (_, Some(content)) if PolicyToken::for_content(content.as_bytes()) == *token => Ok(()),
        (_, Some(_)) => Err(StoreError::TokenMismatch(name.to_string())),
    }
}

/// Names that cannot address a file inside the policy directory.
pub(crate) fn check_name(name: &str) -> Result<()> {
    if name.is_empty() || name.starts_with('.') || name.contains('/') || name.contains('\0') {
        return Err(StoreError::InvalidName(name.to_string()));
    }
    Ok(())
}
