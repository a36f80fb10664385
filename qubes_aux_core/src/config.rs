//! Admin configuration, read from a TOML file.
//!
//! ```toml
//! policy_dir = "/etc/qubes/policy.d"
//! log_level = "info"
//!
//! [lint]
//! command = "qubes-policy-lint"
//! show = true
//! ```

use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

pub const DEFAULT_POLICY_DIR: &str = "/etc/qubes/policy.d";
pub const DEFAULT_LINT_COMMAND: &str = "qubes-policy-lint";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error reading {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Root of the policy directory; include fragments live in its
    /// `include/` subdirectory.
    pub policy_dir: PathBuf,

    /// Default tracing filter when `RUST_LOG` is unset.
    pub log_level: String,

    pub lint: LintConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LintConfig {
    pub command: String,

    /// Arguments placed before the scope flags.
    pub args: Vec<String>,

    /// Print the parsed rules after a successful lint.
    pub show: bool,

    pub show_flag: String,

    pub include_service_flag: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            policy_dir: PathBuf::from(DEFAULT_POLICY_DIR),
            log_level: "info".to_string(),
            lint: LintConfig::default(),
        }
    }
}

impl Default for LintConfig {
    fn default() -> Self {
        Self {
            command: DEFAULT_LINT_COMMAND.to_string(),
            args: Vec::new(),
            show: true,
            show_flag: "--show".to_string(),
            include_service_flag: "--include-service".to_string(),
        }
    }
}

impl AdminConfig {
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        debug!("Loading configuration from {:?}", path);
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// Load `path` if given, otherwise use defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.policy_dir.is_absolute() {
            return Err(ConfigError::Invalid(format!(
                "policy_dir must be absolute, got {:?}",
                self.policy_dir
            )));
        }
        if self.lint.command.trim().is_empty() {
            return Err(ConfigError::Invalid("lint.command cannot be empty".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_defaults() {
        let config = AdminConfig::default();
        assert_eq!(config.policy_dir, PathBuf::from("/etc/qubes/policy.d"));
        assert_eq!(config.lint.command, "qubes-policy-lint");
        assert!(config.lint.show);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config = AdminConfig::from_toml_str(
            r#"
            policy_dir = "/srv/policy.d"

            [lint]
            show = false
            "#,
        )
        .unwrap();
        assert_eq!(config.policy_dir, PathBuf::from("/srv/policy.d"));
        assert!(!config.lint.show);
        assert_eq!(config.lint.include_service_flag, "--include-service");
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn test_invalid_configs() {
        assert!(matches!(
            AdminConfig::from_toml_str(r#"policy_dir = "relative/policy.d""#),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            AdminConfig::from_toml_str("[lint]\ncommand = \"  \"\n"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            AdminConfig::from_toml_str("policy_dir = 5"),
            Err(ConfigError::Toml(_))
        ));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("qubes-policy.toml");
        fs::write(&path, "log_level = \"debug\"\n").unwrap();

        let config = AdminConfig::load(&path).unwrap();
        assert_eq!(config.log_level, "debug");

        assert!(matches!(
            AdminConfig::load(dir.path().join("missing.toml")),
            Err(ConfigError::Io { .. })
        ));
        assert_eq!(AdminConfig::load_or_default(None).unwrap(), AdminConfig::default());
    }
}
