use super::{PolicyError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::warn;

/// Parent path of a regular policy name.
pub const CURRENT_DIR: &str = ".";

/// Parent path of an include fragment.
pub const INCLUDE_PARENT: &str = "include";

/// Namespace a policy name belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PolicyScope {
    Regular,
    Include,
}

impl PolicyScope {
    pub fn is_include(self) -> bool {
        matches!(self, PolicyScope::Include)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PolicyScope::Regular => "regular",
            PolicyScope::Include => "include",
        }
    }
}

impl fmt::Display for PolicyScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parent of a POSIX path with empty and `.` components collapsed.
/// A relative name without a parent yields `"."`.
pub fn parent_path(raw_name: &str) -> String {
    let parts: Vec<&str> = raw_name
        .split('/')
        .filter(|part| !part.is_empty() && *part != ".")
        .collect();
    let parent = &parts[..parts.len().saturating_sub(1)];

    if raw_name.starts_with('/') {
        format!("/{}", parent.join("/"))
    } else if parent.is_empty() {
        CURRENT_DIR.to_string()
    } else {
        parent.join("/")
    }
}

/// Decide the namespace of `raw_name` from its parent path.
///
/// Anything other than `.` or `include` is refused so that it never reaches
/// the backend.
pub fn classify(raw_name: &str) -> Result<PolicyScope> {
    let parent = parent_path(raw_name);
    match parent.as_str() {
        CURRENT_DIR => Ok(PolicyScope::Regular),
        INCLUDE_PARENT => Ok(PolicyScope::Include),
        _ => {
            warn!(raw_name, parent = %parent, "policy name outside sanctioned namespaces");
            Err(PolicyError::ParentValidation {
                expected: INCLUDE_PARENT.to_string(),
                actual: parent,
            })
        }
    }
}
