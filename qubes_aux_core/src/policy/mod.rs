mod admin;
mod dispatch;
mod error;
mod handle;
mod lint;
pub mod name;
pub mod scope;
mod token;


pub use admin::PolicyAdmin;
pub use dispatch::{PolicyBackend, PolicyOp};
pub use error::PolicyError;
pub use handle::PolicyHandle;
pub use lint::{CommandLinter, LintFailure, LintRequest, PolicyLinter};
pub use name::{EditorNameValidator, NameSyntaxError, NameValidator, PolicyName};
pub use scope::PolicyScope;
pub use token::PolicyToken;

pub type Result<T> = std::result::Result<T, PolicyError>;
