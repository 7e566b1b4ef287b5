//! Typed access to application metadata in the configuration store.
//!
//! # Key layout
//!
//! ```text
//! /appmgr/
//!   Shutdown                     bool  global shutdown flag
//!   <app>/
//!     LastInstId                 int   id of the most recently launched instance
//!     info/PID                   int   pid written at registration
//!     info/AppID                 int   application id assigned by the AMS
//!     info/Visibility            bool  shown in the application switcher
//!     info/Priority              int   scheduling priority
//! /LiMo/System/AppInfo/
//!   <app id>/AppMultiInstance    bool  multi-instance flag
//! ```
//!
//! Each call is a single blocking key access; missing keys read as zero/false.

use crate::error::StoreError;
use crate::store::ConfigStore;
use crate::types::{AppName, InstanceType, Priority};

pub const APPS_DIR: &str = "/appmgr";
pub const APP_INFO_DIR: &str = "/LiMo/System/AppInfo";
pub const SHUTDOWN_KEY: &str = "/appmgr/Shutdown";

// ---------------------------------------------------------------------------
// 1. Key helpers
// ---------------------------------------------------------------------------

fn info_key(app: &str, field: &str) -> String {
    format!("{APPS_DIR}/{app}/info/{field}")
}

pub fn pid_key(app: &AppName) -> String {
    info_key(app.as_str(), "PID")
}

pub fn app_id_key(app: &AppName) -> String {
    info_key(app.as_str(), "AppID")
}

pub fn visibility_key(app: &AppName) -> String {
    info_key(app.as_str(), "Visibility")
}

pub fn priority_key(app: &AppName) -> String {
    info_key(app.as_str(), "Priority")
}

pub fn last_instance_key(app: &AppName) -> String {
    format!("{APPS_DIR}/{app}/LastInstId")
}

pub fn multi_instance_key(app_id: i32) -> String {
    format!("{APP_INFO_DIR}/{app_id}/AppMultiInstance")
}

// ---------------------------------------------------------------------------
// 2. Client
// ---------------------------------------------------------------------------

/// Registry lookups over any [`ConfigStore`].
#[derive(Debug, Clone)]
pub struct RegistryClient<S> {
    store: S,
}

impl<S: ConfigStore> RegistryClient<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn into_inner(self) -> S {
        self.store
    }

    pub fn app_id(&self, app: &AppName) -> Result<i32, StoreError> {
        self.store.get_int(&app_id_key(app))
    }

    /// Id of the most recently launched instance of `app`.
    pub fn last_instance_id(&self, app: &AppName) -> Result<i32, StoreError> {
        self.store.get_int(&last_instance_key(app))
    }

    pub fn shutdown_flag(&self) -> Result<bool, StoreError> {
        self.store.get_bool(SHUTDOWN_KEY)
    }

    pub fn set_shutdown_flag(&mut self, value: bool) -> Result<(), StoreError> {
        self.store.set_bool(SHUTDOWN_KEY, value)
    }

    pub fn pid(&self, app: &AppName) -> Result<i32, StoreError> {
        self.store.get_int(&pid_key(app))
    }

    pub fn set_pid(&mut self, app: &AppName, pid: u32) -> Result<(), StoreError> {
        self.store.set_int(&pid_key(app), pid_to_i32(pid))
    }

    pub fn visibility(&self, app: &AppName) -> Result<bool, StoreError> {
        self.store.get_bool(&visibility_key(app))
    }

    pub fn set_visibility(&mut self, app: &AppName, visible: bool) -> Result<(), StoreError> {
        self.store.set_bool(&visibility_key(app), visible)
    }

    /// Stored priority, `None` when the registry has no value.
    pub fn priority(&self, app: &AppName) -> Result<Option<Priority>, StoreError> {
        let key = priority_key(app);
        if !self.store.contains(&key)? {
            return Ok(None);
        }
        Ok(Some(Priority(self.store.get_int(&key)?.max(0) as u32)))
    }

    pub fn set_priority(&mut self, app: &AppName, priority: Priority) -> Result<(), StoreError> {
        let value = i32::try_from(priority.0).unwrap_or(i32::MAX);
        self.store.set_int(&priority_key(app), value)
    }

    /// Stored instance type, `None` when the registry has no value.
    pub fn instance_type(&self, app_id: i32) -> Result<Option<InstanceType>, StoreError> {
        let key = multi_instance_key(app_id);
        if !self.store.contains(&key)? {
            return Ok(None);
        }
        Ok(Some(if self.store.get_bool(&key)? {
            InstanceType::Multiple
        } else {
            InstanceType::Single
        }))
    }

    pub fn is_multi_instance(&self, app_id: i32) -> Result<bool, StoreError> {
        self.store.get_bool(&multi_instance_key(app_id))
    }

    pub fn set_instance_type(
        &mut self,
        app_id: i32,
        instance_type: InstanceType,
    ) -> Result<(), StoreError> {
        self.store.set_bool(
            &multi_instance_key(app_id),
            instance_type == InstanceType::Multiple,
        )
    }

    /// Every application directory under [`APPS_DIR`], sorted by name.
    /// Directories whose name is not a valid [`AppName`] are skipped.
    pub fn list_apps(&self) -> Result<Vec<AppName>, StoreError> {
        Ok(self
            .store
            .list_dirs(APPS_DIR)?
            .into_iter()
            .filter_map(|dir| AppName::new(&dir).ok())
            .collect())
    }

    /// Priority of the application whose registered pid is `pid`.
    pub fn priority_for_pid(&self, pid: u32) -> Result<Option<Priority>, StoreError> {
        let wanted = pid_to_i32(pid);
        for app in self.list_apps()? {
            if self.pid(&app)? == wanted {
                let priority = self.store.get_int(&priority_key(&app))?;
                return Ok(Some(Priority(priority.max(0) as u32)));
            }
        }
        Ok(None)
    }
}

fn pid_to_i32(pid: u32) -> i32 {
    i32::try_from(pid).unwrap_or(i32::MAX)
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryStore, StoreValue};

    fn app(name: &str) -> AppName {
        AppName::new(name).expect("valid app name")
    }

    #[test]
    fn keys_follow_store_layout() {
        assert_eq!(pid_key(&app("clock")), "/appmgr/clock/info/PID");
        assert_eq!(app_id_key(&app("clock")), "/appmgr/clock/info/AppID");
        assert_eq!(last_instance_key(&app("clock")), "/appmgr/clock/LastInstId");
        assert_eq!(visibility_key(&app("clock")), "/appmgr/clock/info/Visibility");
        assert_eq!(multi_instance_key(7), "/LiMo/System/AppInfo/7/AppMultiInstance");
    }

    #[test]
    fn absent_metadata_defaults_to_zero() {
        let registry = RegistryClient::new(MemoryStore::new());
        assert_eq!(registry.app_id(&app("clock")).expect("id"), 0);
        assert_eq!(registry.last_instance_id(&app("clock")).expect("inst"), 0);
        assert!(!registry.shutdown_flag().expect("flag"));
        assert_eq!(registry.priority(&app("clock")).expect("prio"), None);
        assert_eq!(registry.instance_type(0).expect("type"), None);
    }

    #[test]
    fn writes_are_visible_to_reads() {
        let mut registry = RegistryClient::new(MemoryStore::new());
        registry.set_pid(&app("clock"), 4242).expect("pid");
        registry.set_visibility(&app("clock"), true).expect("vis");
        registry.set_priority(&app("clock"), Priority::LOW).expect("prio");
        registry
            .set_instance_type(3, InstanceType::Multiple)
            .expect("type");

        assert_eq!(registry.pid(&app("clock")).expect("pid"), 4242);
        assert!(registry.visibility(&app("clock")).expect("vis"));
        assert_eq!(registry.priority(&app("clock")).expect("prio"), Some(Priority::LOW));
        assert!(registry.is_multi_instance(3).expect("multi"));
    }

    #[test]
    fn priority_lookup_by_pid_scans_apps() {
        let registry = RegistryClient::new(MemoryStore::with_entries([
            ("/appmgr/Shutdown", StoreValue::Bool(false)),
            ("/appmgr/clock/info/PID", StoreValue::Int(100)),
            ("/appmgr/clock/info/Priority", StoreValue::Int(10)),
            ("/appmgr/browser/info/PID", StoreValue::Int(200)),
            ("/appmgr/browser/info/Priority", StoreValue::Int(100)),
        ]));
        assert_eq!(registry.priority_for_pid(200).expect("lookup"), Some(Priority::LOW));
        assert_eq!(registry.priority_for_pid(999).expect("lookup"), None);
    }
}
