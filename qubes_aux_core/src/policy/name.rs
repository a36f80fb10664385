use super::{PolicyError, Result};
use crate::session::{self, SessionProvider};
use crate::BoxError;
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use tracing::debug;

/// Longest name the policy directory accepts.
pub const MAX_NAME_LEN: usize = 255;

lazy_static! {
    static ref NAME_PATTERN: Regex = Regex::new(r"^[0-9A-Za-z_][0-9A-Za-z_.\-]*$").unwrap();
}

/// Canonical identifier of a policy object, as used in every backend call.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PolicyName(String);

impl PolicyName {
    /// Wraps a name reported by the backend itself (e.g. from a listing).
    pub(crate) fn from_backend(name: String) -> Self {
        Self(name)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for PolicyName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for PolicyName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Platform name-syntax rule.
///
/// Returns the canonical form of `segment` or fails. A failure is never
/// transient and is not retried.
pub trait NameValidator: Send + Sync {
    fn validate_name(&self, segment: &str) -> std::result::Result<String, BoxError>;
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum NameSyntaxError {
    #[error("Policy name is empty")]
    Empty,

    #[error("Policy name is {0} bytes long, limit is {MAX_NAME_LEN}")]
    TooLong(usize),

    #[error("Policy name '{0}' contains invalid characters or starts with '.'")]
    InvalidCharacters(String),
}

/// The rule applied by the policy editor: `[0-9A-Za-z_.-]`, no leading dot.
#[derive(Debug, Clone, Copy, Default)]
pub struct EditorNameValidator;

impl EditorNameValidator {
    pub fn check(segment: &str) -> std::result::Result<(), NameSyntaxError> {
        if segment.is_empty() {
            return Err(NameSyntaxError::Empty);
        }
        if segment.len() > MAX_NAME_LEN {
            return Err(NameSyntaxError::TooLong(segment.len()));
        }
        if !NAME_PATTERN.is_match(segment) {
            return Err(NameSyntaxError::InvalidCharacters(segment.to_string()));
        }
        Ok(())
    }
}

impl NameValidator for EditorNameValidator {
    fn validate_name(&self, segment: &str) -> std::result::Result<String, BoxError> {
        Self::check(segment)?;
        Ok(segment.to_string())
    }
}

/// Final component of a POSIX path. Empty and `.` components are ignored,
/// so `"include/a/"` and `"./a"` end in `"a"`.
pub fn final_segment(raw_name: &str) -> &str {
    raw_name
        .split('/')
        .filter(|part| !part.is_empty() && *part != ".")
        .last()
        .unwrap_or("")
}

/// Extracts the final segment of `raw_name` and runs it through `validator`
/// inside a session.
pub fn normalize_and_validate(
    raw_name: &str,
    validator: &dyn NameValidator,
    sessions: &dyn SessionProvider,
) -> Result<PolicyName> {
    let segment = final_segment(raw_name);
    debug!(raw_name, segment, "validating policy name");

    session::scoped(sessions, "validate_name", || validator.validate_name(segment))
        .map(PolicyName)
        .map_err(|source| PolicyError::NameValidation {
            name: raw_name.to_string(),
            source,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::LocalSession;

    #[test]
    fn test_final_segment() {
        assert_eq!(final_segment("policy-a"), "policy-a");
        assert_eq!(final_segment("include/policy-a"), "policy-a");
        assert_eq!(final_segment("./policy-a"), "policy-a");
        assert_eq!(final_segment("include/policy-a/"), "policy-a");
        assert_eq!(final_segment("/etc/qubes/policy.d/30-user"), "30-user");
        assert_eq!(final_segment(""), "");
        assert_eq!(final_segment("/"), "");
    }

    #[test]
    fn test_editor_validator_accepts_platform_names() {
        for name in ["30-user", "admin-local-rwx", "50-config_updates", "a.b", "_x"] {
            assert!(EditorNameValidator::check(name).is_ok(), "{} rejected", name);
        }
    }

    #[test]
    fn test_editor_validator_rejects() {
        assert_eq!(EditorNameValidator::check(""), Err(NameSyntaxError::Empty));
        assert!(matches!(
            EditorNameValidator::check(".hidden"),
            Err(NameSyntaxError::InvalidCharacters(_))
        ));
        assert!(matches!(
            EditorNameValidator::check(".."),
            Err(NameSyntaxError::InvalidCharacters(_))
        ));
        assert!(matches!(
            EditorNameValidator::check("bad name"),
            Err(NameSyntaxError::InvalidCharacters(_))
        ));
        assert!(matches!(
            EditorNameValidator::check("semi;colon"),
            Err(NameSyntaxError::InvalidCharacters(_))
        ));
        let long = "a".repeat(MAX_NAME_LEN + 1);
        assert_eq!(
            EditorNameValidator::check(&long),
            Err(NameSyntaxError::TooLong(MAX_NAME_LEN + 1))
        );
    }

    #[test]
    fn test_validation_error_carries_raw_name() {
        let err = normalize_and_validate("include/bad name", &EditorNameValidator, &LocalSession)
            .unwrap_err();
        match err {
            PolicyError::NameValidation { name, .. } => assert_eq!(name, "include/bad name"),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_normalization_is_idempotent() {
        let once = normalize_and_validate("include/30-user", &EditorNameValidator, &LocalSession)
            .unwrap();
        let twice =
            normalize_and_validate(once.as_str(), &EditorNameValidator, &LocalSession).unwrap();
        assert_eq!(once, twice);
        assert_eq!(twice.as_str(), "30-user");
    }
}
