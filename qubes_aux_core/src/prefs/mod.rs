//! Global and per-qube preference access.
//!
//! [`Prefs`] composes a [`PrefSource`] with a [`TargetResolver`] deciding
//! whose properties are read: the global admin properties or one qube's.

mod error;
mod lookup;

pub use error::{PrefsError, Result};
pub use lookup::{LookupOptions, LookupOutput};

use crate::value::ScalarValue;
use crate::BoxError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

pub type PrefValue = ScalarValue;

/// Result of a [`PrefSource`] call.
pub type SourceResult<T> = std::result::Result<T, BoxError>;

/// Owner of a set of properties.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PrefTarget {
    Global,
    Qube(String),
}

impl fmt::Display for PrefTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PrefTarget::Global => write!(f, "global"),
            PrefTarget::Qube(qube) => write!(f, "qube {}", qube),
        }
    }
}

/// Property storage of the admin API.
pub trait PrefSource: Send + Sync {
    fn has_target(&self, target: &PrefTarget) -> bool;

    fn property_get(&self, target: &PrefTarget, pref: &str) -> SourceResult<PrefValue>;

    /// `Ok(None)` when the property has no usable default.
    fn property_get_default(
        &self,
        target: &PrefTarget,
        pref: &str,
    ) -> SourceResult<Option<PrefValue>>;

    fn property_is_default(&self, target: &PrefTarget, pref: &str) -> SourceResult<bool>;

    fn property_list(&self, target: &PrefTarget) -> SourceResult<Vec<String>>;

    fn property_set(&self, target: &PrefTarget, pref: &str, value: PrefValue) -> SourceResult<()>;

    /// Reset the property to its default.
    fn property_delete(&self, target: &PrefTarget, pref: &str) -> SourceResult<()>;
}

/// Strategy picking the properties a [`Prefs`] reader operates on.
pub trait TargetResolver: Send + Sync {
    fn resolve(&self) -> PrefTarget;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct GlobalTarget;

impl TargetResolver for GlobalTarget {
    fn resolve(&self) -> PrefTarget {
        PrefTarget::Global
    }
}

#[derive(Debug, Clone)]
pub struct QubeTarget {
    qube: String,
}

impl QubeTarget {
    pub fn new(qube: impl Into<String>) -> Self {
        Self { qube: qube.into() }
    }
}

impl TargetResolver for QubeTarget {
    fn resolve(&self) -> PrefTarget {
        PrefTarget::Qube(self.qube.clone())
    }
}

/// Preference reader/writer bound to one resolved target.
pub struct Prefs {
    source: Arc<dyn PrefSource>,
    target: PrefTarget,
}

impl Prefs {
    pub fn new(source: Arc<dyn PrefSource>, resolver: &dyn TargetResolver) -> Result<Self> {
        let target = resolver.resolve();
        if !source.has_target(&target) {
            if let PrefTarget::Qube(qube) = &target {
                return Err(PrefsError::UnknownQube(qube.clone()));
            }
        }
        debug!(owner = %target, "preferences bound");
        Ok(Self { source, target })
    }

    pub fn global(source: Arc<dyn PrefSource>) -> Result<Self> {
        Self::new(source, &GlobalTarget)
    }

    pub fn for_qube(source: Arc<dyn PrefSource>, qube: &str) -> Result<Self> {
        Self::new(source, &QubeTarget::new(qube))
    }

    pub fn target(&self) -> &PrefTarget {
        &self.target
    }

    pub fn get(&self, pref: &str) -> Result<PrefValue> {
        self.source
            .property_get(&self.target, pref)
            .map_err(|source| wrap(pref, source))
    }

    pub fn get_default(&self, pref: &str) -> Result<PrefValue> {
        self.source
            .property_get_default(&self.target, pref)
            .map_err(|source| wrap(pref, source))?
            .ok_or_else(|| PrefsError::NoDefault(pref.to_string()))
    }

    pub fn is_default(&self, pref: &str) -> Result<bool> {
        self.source
            .property_is_default(&self.target, pref)
            .map_err(|source| wrap(pref, source))
    }

    pub fn list(&self) -> Result<Vec<String>> {
        self.source
            .property_list(&self.target)
            .map_err(|source| wrap("*", source))
    }

    pub fn set(&self, pref: &str, value: PrefValue) -> Result<()> {
        debug!(owner = %self.target, pref, value = %value, "setting preference");
        self.source
            .property_set(&self.target, pref, value)
            .map_err(|source| wrap(pref, source))
    }

    pub fn delete(&self, pref: &str) -> Result<()> {
        self.source
            .property_delete(&self.target, pref)
            .map_err(|source| wrap(pref, source))
    }
}

impl fmt::Debug for Prefs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Prefs")
            .field("target", &self.target)
            .finish_non_exhaustive()
    }
}

fn wrap(pref: &str, source: BoxError) -> PrefsError {
    PrefsError::Source {
        pref: pref.to_string(),
        source,
    }
}
