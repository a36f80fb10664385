use super::dispatch::{self, PolicyBackend, PolicyOp};
use super::lint::{CommandLinter, PolicyLinter};
use super::name::{EditorNameValidator, NameValidator, PolicyName};
use super::{PolicyHandle, PolicyScope, Result};
use crate::config::AdminConfig;
use crate::session::{LocalSession, SessionProvider};
use crate::store::FilePolicyStore;
use std::fmt;
use std::sync::Arc;

/// Entry point bundling the collaborators a [`PolicyHandle`] dispatches to.
#[derive(Clone)]
pub struct PolicyAdmin {
    backend: Arc<dyn PolicyBackend>,
    validator: Arc<dyn NameValidator>,
    linter: Arc<dyn PolicyLinter>,
    sessions: Arc<dyn SessionProvider>,
    lint_output: bool,
}

impl PolicyAdmin {
    /// Admin over `backend` with the editor name rule, the lint command and
    /// local sessions.
    pub fn new(backend: Arc<dyn PolicyBackend>) -> Self {
        Self {
            backend,
            validator: Arc::new(EditorNameValidator),
            linter: Arc::new(CommandLinter::default()),
            sessions: Arc::new(LocalSession),
            lint_output: true,
        }
    }

    /// Admin over the policy directory named in `config`.
    pub fn from_config(config: &AdminConfig) -> Self {
        Self::new(Arc::new(FilePolicyStore::new(&config.policy_dir)))
            .with_linter(Arc::new(CommandLinter::from_config(&config.lint)))
            .with_lint_output(config.lint.show)
    }

    pub fn with_validator(mut self, validator: Arc<dyn NameValidator>) -> Self {
        self.validator = validator;
        self
    }

    pub fn with_linter(mut self, linter: Arc<dyn PolicyLinter>) -> Self {
        self.linter = linter;
        self
    }

    pub fn with_sessions(mut self, sessions: Arc<dyn SessionProvider>) -> Self {
        self.sessions = sessions;
        self
    }

    pub fn with_lint_output(mut self, show: bool) -> Self {
        self.lint_output = show;
        self
    }

    /// Validate and classify `raw_name`.
    pub fn open(&self, raw_name: &str) -> Result<PolicyHandle<'_>> {
        PolicyHandle::new(raw_name, self)
    }

    /// Names in the `scope` namespace, in backend order.
    pub fn list(&self, scope: PolicyScope) -> Result<Vec<PolicyName>> {
        let names = dispatch::call_backend(
            self.backend(),
            self.sessions(),
            scope,
            PolicyOp::List,
            |methods, backend| (methods.list)(backend),
        )?;
        Ok(names.into_iter().map(PolicyName::from_backend).collect())
    }

    pub(crate) fn backend(&self) -> &dyn PolicyBackend {
        self.backend.as_ref()
    }

    pub(crate) fn validator(&self) -> &dyn NameValidator {
        self.validator.as_ref()
    }

    pub(crate) fn linter(&self) -> &dyn PolicyLinter {
        self.linter.as_ref()
    }

    pub(crate) fn sessions(&self) -> &dyn SessionProvider {
        self.sessions.as_ref()
    }

    pub(crate) fn lint_output(&self) -> bool {
        self.lint_output
    }
}

impl fmt::Debug for PolicyAdmin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PolicyAdmin")
            .field("lint_output", &self.lint_output)
            .finish_non_exhaustive()
    }
}
