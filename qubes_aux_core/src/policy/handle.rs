use super::dispatch::{self, PolicyOp};
use super::lint::LintRequest;
use super::name::{self, PolicyName};
use super::scope::{self, PolicyScope};
use super::{PolicyAdmin, PolicyError, PolicyToken, Result};
use crate::session;
use std::fmt;
use tracing::{debug, info, warn};

/// A validated, classified policy identity.
///
/// Holding a handle means the name passed the syntax check and lives in one
/// of the two sanctioned namespaces. Operations are pure dispatch: nothing is
/// cached and a failed operation leaves the handle usable.
pub struct PolicyHandle<'a> {
    name: PolicyName,
    scope: PolicyScope,
    admin: &'a PolicyAdmin,
}

impl<'a> PolicyHandle<'a> {
    /// Validate `raw_name` and classify it. The name check runs first, so a
    /// name failing both reports the name validation error.
    pub fn new(raw_name: &str, admin: &'a PolicyAdmin) -> Result<Self> {
        let name = name::normalize_and_validate(raw_name, admin.validator(), admin.sessions())?;
        let scope = scope::classify(raw_name)?;
        debug!(raw_name, name = %name, scope = %scope, "policy handle ready");
        Ok(Self { name, scope, admin })
    }

    pub fn name(&self) -> &PolicyName {
        &self.name
    }

    pub fn scope(&self) -> PolicyScope {
        self.scope
    }

    pub fn is_include(&self) -> bool {
        self.scope.is_include()
    }

    /// Current content and its concurrency token.
    pub fn get(&self) -> Result<(String, PolicyToken)> {
        self.call(PolicyOp::Get, |methods, backend| {
            (methods.get)(backend, self.name.as_str())
        })
    }

    /// Names in this handle's namespace, in backend order.
    pub fn list(&self) -> Result<Vec<PolicyName>> {
        self.admin.list(self.scope)
    }

    pub fn remove(&self) -> Result<()> {
        self.call(PolicyOp::Remove, |methods, backend| {
            (methods.remove)(backend, self.name.as_str())
        })?;
        info!(name = %self.name, scope = %self.scope, "policy removed");
        Ok(())
    }

    /// Write `content` if `token` still matches the stored policy.
    ///
    /// A stale token is rejected by the backend and surfaces as a
    /// `replace` client method error. Linting first is up to the caller.
    pub fn replace(&self, content: &str, token: &PolicyToken) -> Result<()> {
        self.call(PolicyOp::Replace, |methods, backend| {
            (methods.replace)(backend, self.name.as_str(), content, token)
        })?;
        info!(name = %self.name, scope = %self.scope, "policy replaced");
        Ok(())
    }

    /// Check `content` with the lint engine using this namespace's grammar.
    pub fn lint(&self, content: &str) -> Result<()> {
        let request = LintRequest {
            content,
            show: self.admin.lint_output(),
            include_service: self.scope.is_include(),
        };

        session::scoped(self.admin.sessions(), "lint", || {
            self.admin.linter().parse(&request)
        })
        .map_err(|source| {
            warn!(name = %self.name, error = %source, "policy lint failed");
            PolicyError::Lint {
                name: self.name.clone(),
                source,
            }
        })
    }

    fn call<T, F>(&self, op: PolicyOp, call: F) -> Result<T>
    where
        F: FnOnce(
            &dispatch::BackendMethods,
            &dyn dispatch::PolicyBackend,
        ) -> std::result::Result<T, crate::BoxError>,
    {
        dispatch::call_backend(
            self.admin.backend(),
            self.admin.sessions(),
            self.scope,
            op,
            call,
        )
    }
}

impl fmt::Debug for PolicyHandle<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PolicyHandle")
            .field("name", &self.name)
            .field("scope", &self.scope)
            .finish_non_exhaustive()
    }
}
