use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// Optimistic-concurrency token returned by `get` and required by `replace`.
///
/// The value is opaque to the dispatch layer. Stores in this crate use
/// `sha256:<hex>` of the current content, plus two sentinels: [`Self::ANY`]
/// (write unconditionally) and [`Self::NEW`] (the policy must not exist yet).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PolicyToken(String);

impl PolicyToken {
    pub const ANY: &'static str = "any";
    pub const NEW: &'static str = "new";

    pub fn any() -> Self {
        Self(Self::ANY.to_string())
    }

    pub fn new_policy() -> Self {
        Self(Self::NEW.to_string())
    }

    /// Token describing `content` as currently stored.
    pub fn for_content(content: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(content);
        Self(format!("sha256:{:x}", hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for PolicyToken {
    fn from(token: String) -> Self {
        Self(token)
    }
}

impl From<&str> for PolicyToken {
    fn from(token: &str) -> Self {
        Self(token.to_string())
    }
}

impl fmt::Display for PolicyToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_token() {
        let token = PolicyToken::for_content(b"");
        assert_eq!(
            token.as_str(),
            "sha256:e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
        assert_ne!(token, PolicyToken::for_content(b"qubes.Filecopy * @anyvm @anyvm deny\n"));
    }
}
