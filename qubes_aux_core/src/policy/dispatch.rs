use super::{PolicyError, PolicyScope, PolicyToken, Result};
use crate::session::{self, SessionProvider};
use crate::BoxError;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, warn};

/// Policy admin client.
///
/// Every operation exists twice: once for regular policies and once, with an
/// `include_` prefix, for include fragments. Errors are opaque to the
/// dispatch layer.
#[cfg_attr(test, mockall::automock)]
pub trait PolicyBackend: Send + Sync {
    fn policy_get(&self, name: &str) -> std::result::Result<(String, PolicyToken), BoxError>;
    fn policy_list(&self) -> std::result::Result<Vec<String>, BoxError>;
    fn policy_remove(&self, name: &str) -> std::result::Result<(), BoxError>;
    fn policy_replace(
        &self,
        name: &str,
        content: &str,
        token: &PolicyToken,
    ) -> std::result::Result<(), BoxError>;

    fn policy_include_get(&self, name: &str)
        -> std::result::Result<(String, PolicyToken), BoxError>;
    fn policy_include_list(&self) -> std::result::Result<Vec<String>, BoxError>;
    fn policy_include_remove(&self, name: &str) -> std::result::Result<(), BoxError>;
    fn policy_include_replace(
        &self,
        name: &str,
        content: &str,
        token: &PolicyToken,
    ) -> std::result::Result<(), BoxError>;
}

/// Backend operation, reported in [`PolicyError::ClientMethod`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PolicyOp {
    Get,
    List,
    Remove,
    Replace,
}

impl PolicyOp {
    pub fn as_str(self) -> &'static str {
        match self {
            PolicyOp::Get => "get",
            PolicyOp::List => "list",
            PolicyOp::Remove => "remove",
            PolicyOp::Replace => "replace",
        }
    }
}

impl fmt::Display for PolicyOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

type GetFn = fn(&dyn PolicyBackend, &str) -> std::result::Result<(String, PolicyToken), BoxError>;
type ListFn = fn(&dyn PolicyBackend) -> std::result::Result<Vec<String>, BoxError>;
type RemoveFn = fn(&dyn PolicyBackend, &str) -> std::result::Result<(), BoxError>;
type ReplaceFn =
    fn(&dyn PolicyBackend, &str, &str, &PolicyToken) -> std::result::Result<(), BoxError>;

/// The four backend functions serving one namespace.
pub(crate) struct BackendMethods {
    prefix: &'static str,
    pub get: GetFn,
    pub list: ListFn,
    pub remove: RemoveFn,
    pub replace: ReplaceFn,
}

impl BackendMethods {
    /// Name of the backend method serving `op`, e.g. `policy_include_get`.
    pub fn method_name(&self, op: PolicyOp) -> String {
        format!("{}{}", self.prefix, op)
    }
}

static REGULAR_METHODS: BackendMethods = BackendMethods {
    prefix: "policy_",
    get: |backend, name| backend.policy_get(name),
    list: |backend| backend.policy_list(),
    remove: |backend, name| backend.policy_remove(name),
    replace: |backend, name, content, token| backend.policy_replace(name, content, token),
};

static INCLUDE_METHODS: BackendMethods = BackendMethods {
    prefix: "policy_include_",
    get: |backend, name| backend.policy_include_get(name),
    list: |backend| backend.policy_include_list(),
    remove: |backend, name| backend.policy_include_remove(name),
    replace: |backend, name, content, token| {
        backend.policy_include_replace(name, content, token)
    },
};

/// The only place where a namespace is mapped to backend methods.
pub(crate) fn methods(scope: PolicyScope) -> &'static BackendMethods {
    match scope {
        PolicyScope::Regular => &REGULAR_METHODS,
        PolicyScope::Include => &INCLUDE_METHODS,
    }
}

/// Run one backend call for `scope` inside a session, wrapping any failure
/// as a client method error.
pub(crate) fn call_backend<T, F>(
    backend: &dyn PolicyBackend,
    sessions: &dyn SessionProvider,
    scope: PolicyScope,
    op: PolicyOp,
    call: F,
) -> Result<T>
where
    F: FnOnce(&BackendMethods, &dyn PolicyBackend) -> std::result::Result<T, BoxError>,
{
    let table = methods(scope);
    let method = table.method_name(op);
    debug!(method = %method, scope = %scope, "dispatching policy call");

    session::scoped(sessions, op.as_str(), || call(table, backend)).map_err(|source| {
        warn!(method = %method, error = %source, "policy client method failed");
        PolicyError::ClientMethod { method: op, source }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_names_follow_scope() {
        let ops = [
            PolicyOp::Get,
            PolicyOp::List,
            PolicyOp::Remove,
            PolicyOp::Replace,
        ];
        for op in ops {
            assert_eq!(
                methods(PolicyScope::Regular).method_name(op),
                format!("policy_{}", op)
            );
            assert_eq!(
                methods(PolicyScope::Include).method_name(op),
                format!("policy_include_{}", op)
            );
        }
    }

    #[test]
    fn test_op_display() {
        assert_eq!(PolicyOp::Replace.to_string(), "replace");
        assert_eq!(serde_json::to_string(&PolicyOp::Get).unwrap(), "\"get\"");
    }
}
