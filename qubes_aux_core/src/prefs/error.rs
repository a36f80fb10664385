use crate::BoxError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, PrefsError>;

#[derive(Debug, Error)]
pub enum PrefsError {
    #[error("No such qube: {0}")]
    UnknownQube(String),

    #[error("No parseable default value for preference {0}")]
    NoDefault(String),

    #[error("Options '{0}' and '{1}' are mutually exclusive")]
    ConflictingOptions(&'static str, &'static str),

    #[error("Preference '{pref}' failed: {source}")]
    Source {
        pref: String,
        #[source]
        source: BoxError,
    },
}
