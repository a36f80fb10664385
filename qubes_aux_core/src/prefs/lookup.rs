use super::{PrefValue, Prefs, PrefsError, Result};
use serde::{Deserialize, Serialize};

/// Options of a preference lookup.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LookupOptions {
    /// List property names instead of reading values.
    pub list: bool,
    /// Read default values instead of current ones.
    pub default: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LookupOutput {
    Names(Vec<String>),
    Values(Vec<PrefValue>),
}

impl Prefs {
    /// Answer a lookup for `terms`: property names with `list`, default
    /// values with `default`, current values otherwise.
    pub fn lookup<S: AsRef<str>>(
        &self,
        terms: &[S],
        options: LookupOptions,
    ) -> Result<LookupOutput> {
        if options.list && options.default {
            return Err(PrefsError::ConflictingOptions("list", "default"));
        }
        if options.list {
            return self.list().map(LookupOutput::Names);
        }

        let values = terms
            .iter()
            .map(|term| {
                if options.default {
                    self.get_default(term.as_ref())
                } else {
                    self.get(term.as_ref())
                }
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(LookupOutput::Values(values))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prefs::testing::{some, MemoryPrefSource};
    use crate::prefs::PrefTarget;
    use std::sync::Arc;

    fn prefs() -> Prefs {
        let source = MemoryPrefSource::default()
            .with(PrefTarget::Global, "updatevm", some("sys-firewall"), some("sys-net"))
            .with(PrefTarget::Global, "default_netvm", None, some("sys-firewall"));
        Prefs::global(Arc::new(source)).unwrap()
    }

    #[test]
    fn test_lookup_modes() {
        let prefs = prefs();
        let terms = ["updatevm", "default_netvm"];

        assert_eq!(
            prefs.lookup(&terms, LookupOptions::default()).unwrap(),
            LookupOutput::Values(vec!["sys-firewall".into(), "sys-firewall".into()])
        );
        assert_eq!(
            prefs
                .lookup(&terms, LookupOptions { default: true, list: false })
                .unwrap(),
            LookupOutput::Values(vec!["sys-net".into(), "sys-firewall".into()])
        );
        assert_eq!(
            prefs
                .lookup::<&str>(&[], LookupOptions { list: true, default: false })
                .unwrap(),
            LookupOutput::Names(vec!["default_netvm".into(), "updatevm".into()])
        );
    }

    #[test]
    fn test_conflicting_options() {
        let err = prefs()
            .lookup(&["updatevm"], LookupOptions { list: true, default: true })
            .unwrap_err();
        assert!(matches!(err, PrefsError::ConflictingOptions("list", "default")));
    }

    #[test]
    fn test_first_failing_term_aborts() {
        assert!(prefs()
            .lookup(&["updatevm", "missing"], LookupOptions::default())
            .is_err());
    }
}
