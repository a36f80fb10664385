//! Reads from the local QubesDB.
//!
//! Raw entries are byte strings; [`coerce`] turns them into scalars the way
//! the admin tooling expects (`True`/`False`, integers, floats, text).

use crate::value::ScalarValue;
use crate::BoxError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

pub type QubesDbValue = ScalarValue;

#[derive(Debug, Error)]
pub enum QubesDbError {
    #[error("QubesDB error at {path}: {source}")]
    Source {
        path: String,
        #[source]
        source: BoxError,
    },

    #[error("Value at {path} is not valid UTF-8")]
    Decode { path: String },
}

pub type Result<T> = std::result::Result<T, QubesDbError>;

/// Result of a [`QubesDbSource`] call.
pub type SourceResult<T> = std::result::Result<T, BoxError>;

/// Client of the QubesDB daemon.
pub trait QubesDbSource: Send + Sync {
    /// Value at `path`, `None` if absent.
    fn read(&self, path: &str) -> SourceResult<Option<Vec<u8>>>;

    /// Every entry under the `path` prefix, keyed by full path.
    fn multiread(&self, path: &str) -> SourceResult<BTreeMap<String, Vec<u8>>>;

    /// Paths under the `path` prefix.
    fn list(&self, path: &str) -> SourceResult<Vec<String>>;
}

/// Result of reading one path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum QubesDbEntry {
    Value(QubesDbValue),
    Values(BTreeMap<String, QubesDbValue>),
}

/// Interpret a raw entry. Empty → none, `True`/`False` → bool, then integer,
/// then float, otherwise UTF-8 text. Integers beyond `i64` stay text.
pub fn coerce(raw: Option<&[u8]>) -> std::result::Result<QubesDbValue, std::str::Utf8Error> {
    let raw = match raw {
        None | Some(b"") => return Ok(ScalarValue::None),
        Some(raw) => raw,
    };
    match raw {
        b"True" => return Ok(ScalarValue::Bool(true)),
        b"False" => return Ok(ScalarValue::Bool(false)),
        _ => {}
    }

    let text = std::str::from_utf8(raw)?;
    let trimmed = text.trim();
    if let Ok(int) = trimmed.parse::<i64>() {
        return Ok(ScalarValue::Int(int));
    }
    if is_integer_literal(trimmed) {
        // Out of i64 range; a float would drop digits.
        return Ok(ScalarValue::Str(text.to_string()));
    }
    if let Ok(float) = trimmed.parse::<f64>() {
        return Ok(ScalarValue::Float(float));
    }
    Ok(ScalarValue::Str(text.to_string()))
}

fn is_integer_literal(text: &str) -> bool {
    let digits = text.strip_prefix(['+', '-']).unwrap_or(text);
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}

/// Lookup front end over a [`QubesDbSource`].
#[derive(Clone)]
pub struct QubesDb {
    source: Arc<dyn QubesDbSource>,
}

impl QubesDb {
    pub fn new(source: Arc<dyn QubesDbSource>) -> Self {
        Self { source }
    }

    /// A path ending in `/` reads every entry below it; any other path reads
    /// a single value.
    pub fn read(&self, path: &str) -> Result<QubesDbEntry> {
        debug!("Lookup value at path {} from qubesdb", path);
        if path.ends_with('/') {
            let raw = self
                .source
                .multiread(path)
                .map_err(|source| source_error(path, source))?;
            let mut values = BTreeMap::new();
            for (key, value) in raw {
                let value = coerce(Some(value.as_slice()))
                    .map_err(|_| QubesDbError::Decode { path: key.clone() })?;
                values.insert(key, value);
            }
            Ok(QubesDbEntry::Values(values))
        } else {
            let raw = self
                .source
                .read(path)
                .map_err(|source| source_error(path, source))?;
            coerce(raw.as_deref())
                .map(QubesDbEntry::Value)
                .map_err(|_| QubesDbError::Decode {
                    path: path.to_string(),
                })
        }
    }

    pub fn list(&self, path: &str) -> Result<Vec<String>> {
        debug!("List paths at {} from qubesdb", path);
        self.source
            .list(path)
            .map_err(|source| source_error(path, source))
    }

    pub fn read_all<S: AsRef<str>>(&self, paths: &[S]) -> Result<Vec<QubesDbEntry>> {
        paths.iter().map(|path| self.read(path.as_ref())).collect()
    }

    pub fn list_all<S: AsRef<str>>(&self, paths: &[S]) -> Result<Vec<Vec<String>>> {
        paths.iter().map(|path| self.list(path.as_ref())).collect()
    }
}

impl fmt::Debug for QubesDb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QubesDb").finish_non_exhaustive()
    }
}

fn source_error(path: &str, source: BoxError) -> QubesDbError {
    QubesDbError::Source {
        path: path.to_string(),
        source,
    }
}
