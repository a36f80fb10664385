use super::{check_name, check_token, Result, StoreError};
use crate::policy::{PolicyBackend, PolicyToken};
use crate::BoxError;
use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, error};
use uuid::Uuid;

/// Suffix of regular policy files.
pub const POLICY_SUFFIX: &str = ".policy";

/// Subdirectory holding include fragments.
pub const INCLUDE_DIR: &str = "include";

/// Lock file serializing writers of one namespace directory. Dot-prefixed,
/// so listings skip it.
pub const LOCK_FILE: &str = ".lock";

/// Policy directory in the `policy.d` layout: regular policy `NAME` is
/// `NAME.policy`, include fragment `NAME` is `include/NAME`.
#[derive(Debug, Clone)]
pub struct FilePolicyStore {
    base_path: PathBuf,
}

impl FilePolicyStore {
    pub fn new<P: AsRef<Path>>(base_path: P) -> Self {
        let base_path = base_path.as_ref().to_path_buf();
        debug!("Creating FilePolicyStore with base path: {:?}", base_path);
        Self { base_path }
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn dir(&self, include: bool) -> PathBuf {
        if include {
            self.base_path.join(INCLUDE_DIR)
        } else {
            self.base_path.clone()
        }
    }

    fn policy_path(&self, include: bool, name: &str) -> Result<PathBuf> {
        check_name(name)?;
        let path = if include {
            self.dir(true).join(name)
        } else {
            self.base_path.join(format!("{}{}", name, POLICY_SUFFIX))
        };
        debug!("Policy path for {}: {:?}", name, path);
        Ok(path)
    }

    fn read_current(&self, path: &Path) -> Result<Option<String>> {
        match fs::read_to_string(path) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => {
                error!("Failed to read policy file {:?}: {}", path, e);
                Err(e.into())
            }
        }
    }

    pub fn get(&self, include: bool, name: &str) -> Result<(String, PolicyToken)> {
        let path = self.policy_path(include, name)?;
        let content = self
            .read_current(&path)?
            .ok_or_else(|| StoreError::NotFound(name.to_string()))?;
        let token = PolicyToken::for_content(content.as_bytes());
        Ok((content, token))
    }

    /// Policy names sorted by name. A missing directory lists as empty.
    pub fn list(&self, include: bool) -> Result<Vec<String>> {
        let dir = self.dir(include);
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("Policy directory does not exist: {:?}", dir);
                return Ok(Vec::new());
            }
            Err(e) => return Err(e.into()),
        };

        let mut names = Vec::new();
        for entry in entries {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let file_name = match entry.file_name().into_string() {
                Ok(file_name) => file_name,
                Err(raw) => {
                    debug!("Skipping non-UTF-8 entry {:?} in {:?}", raw, dir);
                    continue;
                }
            };
            if file_name.starts_with('.') {
                continue;
            }
            if include {
                names.push(file_name);
            } else if let Some(name) = file_name.strip_suffix(POLICY_SUFFIX) {
                if !name.is_empty() {
                    names.push(name.to_string());
                }
            }
        }

        names.sort();
        debug!("Found {} policies in {:?}", names.len(), dir);
        Ok(names)
    }

    /// Exclusive advisory lock on the namespace directory, held until the
    /// returned file is dropped. Other processes using this store honor it.
    fn lock_namespace(&self, include: bool) -> Result<File> {
        let dir = self.dir(include);
        fs::create_dir_all(&dir)?;
        let lock_path = dir.join(LOCK_FILE);
        let lock_file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(&lock_path)?;
        FileExt::lock_exclusive(&lock_file).map_err(|e| {
            error!("Failed to lock {:?}: {}", lock_path, e);
            e
        })?;
        Ok(lock_file)
    }

    pub fn remove(&self, include: bool, name: &str) -> Result<()> {
        let path = self.policy_path(include, name)?;
        if !self.dir(include).is_dir() {
            return Err(StoreError::NotFound(name.to_string()));
        }
        let _lock = self.lock_namespace(include)?;
        match fs::remove_file(&path) {
            Ok(()) => {
                debug!("Removed policy file {:?}", path);
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                Err(StoreError::NotFound(name.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Write `content` after checking `token`. The check and the write happen
    /// under the namespace lock; the file is replaced through a temporary
    /// sibling and a rename.
    pub fn replace(
        &self,
        include: bool,
        name: &str,
        content: &str,
        token: &PolicyToken,
    ) -> Result<()> {
        let path = self.policy_path(include, name)?;
        let _lock = self.lock_namespace(include)?;
        let current = self.read_current(&path)?;
        check_token(name, current.as_deref(), token)?;

        let tmp_path = self
            .dir(include)
            .join(format!(".{}.{}.tmp", name, Uuid::new_v4()));

        debug!("Writing policy to temporary file: {:?}", tmp_path);
        if let Err(e) = fs::write(&tmp_path, content).and_then(|_| fs::rename(&tmp_path, &path)) {
            error!("Failed to write policy file {:?}: {}", path, e);
            let _ = fs::remove_file(&tmp_path);
            return Err(e.into());
        }
        Ok(())
    }
}

impl PolicyBackend for FilePolicyStore {
    fn policy_get(&self, name: &str) -> std::result::Result<(String, PolicyToken), BoxError> {
        Ok(self.get(false, name)?)
    }

    fn policy_list(&self) -> std::result::Result<Vec<String>, BoxError> {
        Ok(self.list(false)?)
    }

    fn policy_remove(&self, name: &str) -> std::result::Result<(), BoxError> {
        Ok(self.remove(false, name)?)
    }

    fn policy_replace(
        &self,
        name: &str,
        content: &str,
        token: &PolicyToken,
    ) -> std::result::Result<(), BoxError> {
        Ok(self.replace(false, name, content, token)?)
    }

    fn policy_include_get(
        &self,
        name: &str,
    ) -> std::result::Result<(String, PolicyToken), BoxError> {
        Ok(self.get(true, name)?)
    }

    fn policy_include_list(&self) -> std::result::Result<Vec<String>, BoxError> {
        Ok(self.list(true)?)
    }

    fn policy_include_remove(&self, name: &str) -> std::result::Result<(), BoxError> {
        Ok(self.remove(true, name)?)
    }

    fn policy_include_replace(
        &self,
        name: &str,
        content: &str,
        token: &PolicyToken,
    ) -> std::result::Result<(), BoxError> {
        Ok(self.replace(true, name, content, token)?)
    }
}
