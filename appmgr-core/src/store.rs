//! Key/value configuration store.
//!
//! Keys are slash-separated paths (`/appmgr/clock/info/PID`). Values are
//! booleans, 32-bit integers, or strings. A missing key reads as `0`, `false`,
//! or `None`; only a value of the wrong type is an error.
//!
//! # Storage layout (file adapter)
//!
//! ```text
//! ~/.appmgr/
//!   registry.yaml   (flat key → value mapping, mode 0600)
//! ```
//!
//! Every access to [`YamlStore`] reads or rewrites the file so values written by
//! other processes are observed. Writes are atomic: serialize → `.yaml.tmp`
//! sibling → `chmod 0600` → `rename`.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{io_err, StoreError};

pub const REGISTRY_FILE: &str = "registry.yaml";

/// A single stored value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StoreValue {
    Bool(bool),
    Int(i32),
    Str(String),
}

/// Synchronous key/value store shared with the application-manager daemon.
pub trait ConfigStore {
    fn get(&self, key: &str) -> Result<Option<StoreValue>, StoreError>;

    fn set(&mut self, key: &str, value: StoreValue) -> Result<(), StoreError>;

    /// Names of the immediate sub-directories of `dir`, sorted.
    fn list_dirs(&self, dir: &str) -> Result<Vec<String>, StoreError>;

    fn contains(&self, key: &str) -> Result<bool, StoreError> {
        Ok(self.get(key)?.is_some())
    }

    fn get_int(&self, key: &str) -> Result<i32, StoreError> {
        match self.get(key)? {
            None => Ok(0),
            Some(StoreValue::Int(value)) => Ok(value),
            Some(_) => Err(mismatch(key, "integer")),
        }
    }

    fn get_bool(&self, key: &str) -> Result<bool, StoreError> {
        match self.get(key)? {
            None => Ok(false),
            Some(StoreValue::Bool(value)) => Ok(value),
            Some(_) => Err(mismatch(key, "boolean")),
        }
    }

    fn get_string(&self, key: &str) -> Result<Option<String>, StoreError> {
        match self.get(key)? {
            None => Ok(None),
            Some(StoreValue::Str(value)) => Ok(Some(value)),
            Some(_) => Err(mismatch(key, "string")),
        }
    }

    fn set_int(&mut self, key: &str, value: i32) -> Result<(), StoreError> {
        self.set(key, StoreValue::Int(value))
    }

    fn set_bool(&mut self, key: &str, value: bool) -> Result<(), StoreError> {
        self.set(key, StoreValue::Bool(value))
    }

    fn set_string(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        self.set(key, StoreValue::Str(value.to_owned()))
    }
}

fn mismatch(key: &str, expected: &'static str) -> StoreError {
    StoreError::TypeMismatch {
        key: key.to_owned(),
        expected,
    }
}

/// Directory names directly below `dir` among `keys`. A segment only counts as
/// a directory when something is stored beneath it.
fn child_dirs<'a>(keys: impl Iterator<Item = &'a String>, dir: &str) -> Vec<String> {
    let prefix = format!("{}/", dir.trim_end_matches('/'));
    keys.filter_map(|key| key.strip_prefix(&prefix))
        .filter_map(|rest| rest.split_once('/').map(|(segment, _)| segment))
        .filter(|segment| !segment.is_empty())
        .map(str::to_owned)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

// ---------------------------------------------------------------------------
// In-memory adapter
// ---------------------------------------------------------------------------

/// Process-local store; used by tests and embedders without a shared registry.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: BTreeMap<String, StoreValue>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entries<I, K>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, StoreValue)>,
        K: Into<String>,
    {
        Self {
            entries: entries.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

impl ConfigStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<StoreValue>, StoreError> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: StoreValue) -> Result<(), StoreError> {
        self.entries.insert(key.to_owned(), value);
        Ok(())
    }

    fn list_dirs(&self, dir: &str) -> Result<Vec<String>, StoreError> {
        Ok(child_dirs(self.entries.keys(), dir))
    }
}

// ---------------------------------------------------------------------------
// YAML file adapter
// ---------------------------------------------------------------------------

/// `<home>/.appmgr/registry.yaml`. Pure, no I/O.
pub fn registry_path_at(home: &Path) -> PathBuf {
    home.join(".appmgr").join(REGISTRY_FILE)
}

/// File-backed store shared between processes.
#[derive(Debug, Clone)]
pub struct YamlStore {
    path: PathBuf,
}

impl YamlStore {
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store at `<home>/.appmgr/registry.yaml`.
    pub fn open_at(home: &Path) -> Self {
        Self::open(registry_path_at(home))
    }

    /// `open_at` against `dirs::home_dir()`.
    pub fn open_default() -> Result<Self, StoreError> {
        let home = dirs::home_dir().ok_or(StoreError::HomeNotFound)?;
        Ok(Self::open_at(&home))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<BTreeMap<String, StoreValue>, StoreError> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        let contents = std::fs::read_to_string(&self.path).map_err(|e| io_err(&self.path, e))?;
        if contents.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        serde_yaml::from_str(&contents).map_err(|source| StoreError::Parse {
            path: self.path.clone(),
            source,
        })
    }

    fn save(&self, entries: &BTreeMap<String, StoreValue>) -> Result<(), StoreError> {
        if let Some(dir) = self.path.parent() {
            if !dir.exists() {
                std::fs::create_dir_all(dir).map_err(|e| io_err(dir, e))?;
                set_dir_permissions(dir)?;
            }
        }
        let tmp_path = self.path.with_extension("yaml.tmp");
        let yaml = serde_yaml::to_string(entries)?;
        std::fs::write(&tmp_path, yaml).map_err(|e| io_err(&tmp_path, e))?;
        set_file_permissions(&tmp_path)?;
        std::fs::rename(&tmp_path, &self.path).map_err(|e| io_err(&self.path, e))?;
        Ok(())
    }
}

impl ConfigStore for YamlStore {
    fn get(&self, key: &str) -> Result<Option<StoreValue>, StoreError> {
        Ok(self.load()?.remove(key))
    }

    fn set(&mut self, key: &str, value: StoreValue) -> Result<(), StoreError> {
        let mut entries = self.load()?;
        entries.insert(key.to_owned(), value);
        self.save(&entries)
    }

    fn list_dirs(&self, dir: &str) -> Result<Vec<String>, StoreError> {
        let entries = self.load()?;
        Ok(child_dirs(entries.keys(), dir))
    }
}

#[cfg(unix)]
fn set_dir_permissions(path: &Path) -> Result<(), StoreError> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o700))
        .map_err(|e| io_err(path, e))
}
#[cfg(not(unix))]
fn set_dir_permissions(_path: &Path) -> Result<(), StoreError> {
    Ok(())
}

#[cfg(unix)]
fn set_file_permissions(path: &Path) -> Result<(), StoreError> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
        .map_err(|e| io_err(path, e))
}
#[cfg(not(unix))]
fn set_file_permissions(_path: &Path) -> Result<(), StoreError> {
    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_keys_read_as_defaults() {
        let store = MemoryStore::new();
        assert_eq!(store.get_int("/appmgr/clock/info/AppID").expect("int"), 0);
        assert!(!store.get_bool("/appmgr/Shutdown").expect("bool"));
        assert_eq!(store.get_string("/appmgr/clock/info/Name").expect("str"), None);
    }

    #[test]
    fn wrong_type_is_reported() {
        let store = MemoryStore::with_entries([("/k", StoreValue::Str("seven".into()))]);
        let err = store.get_int("/k").unwrap_err();
        assert!(matches!(err, StoreError::TypeMismatch { expected: "integer", .. }));
    }

    #[test]
    fn list_dirs_returns_only_directories() {
        let store = MemoryStore::with_entries([
            ("/appmgr/Shutdown", StoreValue::Bool(false)),
            ("/appmgr/clock/info/PID", StoreValue::Int(1)),
            ("/appmgr/clock/LastInstId", StoreValue::Int(2)),
            ("/appmgr/browser/info/PID", StoreValue::Int(3)),
            ("/other/x/y", StoreValue::Int(4)),
        ]);
        assert_eq!(
            store.list_dirs("/appmgr").expect("dirs"),
            vec!["browser".to_owned(), "clock".to_owned()]
        );
    }

    #[test]
    fn yaml_store_persists_across_handles() {
        let home = TempDir::new().expect("tempdir");
        let mut writer = YamlStore::open_at(home.path());
        writer.set_int("/appmgr/clock/info/AppID", 7).expect("set");
        writer.set_bool("/appmgr/Shutdown", true).expect("set");

        let reader = YamlStore::open_at(home.path());
        assert_eq!(reader.get_int("/appmgr/clock/info/AppID").expect("get"), 7);
        assert!(reader.get_bool("/appmgr/Shutdown").expect("get"));
    }

    #[test]
    fn yaml_store_missing_file_is_empty() {
        let home = TempDir::new().expect("tempdir");
        let store = YamlStore::open_at(home.path());
        assert_eq!(store.get("/anything").expect("get"), None);
        assert!(store.list_dirs("/appmgr").expect("dirs").is_empty());
    }

    #[test]
    fn yaml_store_write_is_atomic_and_private() {
        let home = TempDir::new().expect("tempdir");
        let mut store = YamlStore::open_at(home.path());
        store.set_string("/appmgr/clock/info/Name", "Clock").expect("set");

        let tmp = store.path().with_extension("yaml.tmp");
        assert!(!tmp.exists(), ".tmp must be gone after successful save");
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = std::fs::metadata(store.path()).unwrap().permissions().mode() & 0o777;
            assert_eq!(mode, 0o600);
        }
    }
}
