use super::{check_name, check_token, Result, StoreError};
use crate::policy::{PolicyBackend, PolicyToken};
use crate::BoxError;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use tracing::debug;

type Namespace = RwLock<BTreeMap<String, String>>;

/// Ephemeral store with the same token rules as [`super::FilePolicyStore`].
#[derive(Debug, Default)]
pub struct InMemoryPolicyStore {
    regular: Namespace,
    include: Namespace,
}

impl InMemoryPolicyStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn namespace(&self, include: bool) -> &Namespace {
        if include {
            &self.include
        } else {
            &self.regular
        }
    }

    pub fn get(&self, include: bool, name: &str) -> Result<(String, PolicyToken)> {
        let policies = self.namespace(include).read();
        let content = policies
            .get(name)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(name.to_string()))?;
        let token = PolicyToken::for_content(content.as_bytes());
        Ok((content, token))
    }

    pub fn list(&self, include: bool) -> Vec<String> {
        self.namespace(include).read().keys().cloned().collect()
    }

    pub fn remove(&self, include: bool, name: &str) -> Result<()> {
        self.namespace(include)
            .write()
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound(name.to_string()))
    }

    pub fn replace(
        &self,
        include: bool,
        name: &str,
        content: &str,
        token: &PolicyToken,
    ) -> Result<()> {
        check_name(name)?;
        let mut policies = self.namespace(include).write();
        check_token(name, policies.get(name).map(String::as_str), token)?;
        debug!(name, include, "storing policy in memory");
        policies.insert(name.to_string(), content.to_string());
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.regular.read().len() + self.include.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl PolicyBackend for InMemoryPolicyStore {
    fn policy_get(&self, name: &str) -> std::result::Result<(String, PolicyToken), BoxError> {
        Ok(self.get(false, name)?)
    }

    fn policy_list(&self) -> std::result::Result<Vec<String>, BoxError> {
        Ok(self.list(false))
    }

    fn policy_remove(&self, name: &str) -> std::result::Result<(), BoxError> {
        Ok(self.remove(false, name)?)
    }

    fn policy_replace(
        &self,
        name: &str,
        content: &str,
        token: &PolicyToken,
    ) -> std::result::Result<(), BoxError> {
        Ok(self.replace(false, name, content, token)?)
    }

    fn policy_include_get(
        &self,
        name: &str,
    ) -> std::result::Result<(String, PolicyToken), BoxError> {
        Ok(self.get(true, name)?)
    }

    fn policy_include_list(&self) -> std::result::Result<Vec<String>, BoxError> {
        Ok(self.list(true))
    }

    fn policy_include_remove(&self, name: &str) -> std::result::Result<(), BoxError> {
        Ok(self.remove(true, name)?)
    }

    fn policy_include_replace(
        &self,
        name: &str,
        content: &str,
        token: &PolicyToken,
    ) -> std::result::Result<(), BoxError> {
        Ok(self.replace(true, name, content, token)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_namespaces_are_separate() {
        let store = InMemoryPolicyStore::new();
        assert!(store.is_empty());

        store
            .replace(false, "shared", "regular\n", &PolicyToken::new_policy())
            .unwrap();
        store
            .replace(true, "shared", "include\n", &PolicyToken::new_policy())
            .unwrap();

        assert_eq!(store.get(false, "shared").unwrap().0, "regular\n");
        assert_eq!(store.get(true, "shared").unwrap().0, "include\n");
        assert_eq!(store.len(), 2);

        store.remove(true, "shared").unwrap();
        assert!(store.get(true, "shared").is_err());
        assert!(store.get(false, "shared").is_ok());
    }

    #[test]
    fn test_list_in_name_order() {
        let store = InMemoryPolicyStore::new();
        for name in ["50-config", "30-user", "90-default"] {
            store
                .replace(false, name, "", &PolicyToken::any())
                .unwrap();
        }
        assert_eq!(store.list(false), vec!["30-user", "50-config", "90-default"]);
        assert!(store.list(true).is_empty());
    }
}
