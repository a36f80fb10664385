//! Policy identity resolution and dispatch for the qrexec policy store.
//!
//! A raw policy name such as `include/admin-local-rwx` is validated,
//! classified into the regular or include namespace and turned into a
//! [`PolicyHandle`]. Every operation on the handle is routed to the
//! namespace-correct backend method.

pub mod config;
pub mod policy;
pub mod prefs;
pub mod qubesdb;
pub mod session;
pub mod store;
pub mod value;

pub use config::{AdminConfig, ConfigError, LintConfig};
pub use policy::{
    CommandLinter, EditorNameValidator, LintRequest, NameValidator, PolicyAdmin, PolicyBackend,
    PolicyError, PolicyHandle, PolicyLinter, PolicyName, PolicyOp, PolicyScope, PolicyToken,
};
pub use prefs::{
    GlobalTarget, PrefSource, PrefTarget, PrefValue, Prefs, PrefsError, QubeTarget, TargetResolver,
};
pub use qubesdb::{QubesDb, QubesDbError, QubesDbSource};
pub use session::{LocalSession, SessionGuard, SessionProvider};
pub use store::{FilePolicyStore, InMemoryPolicyStore, StoreError};
pub use value::ScalarValue;

/// Error type crossing the collaborator seams (backend, validator, linter,
/// session and data sources).
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;
