//! Client configuration.
//!
//! Every field has a default matching the deployed application manager, so the
//! config file is optional. When present it lives at `~/.appmgr/client.yaml`:
//!
//! ```yaml
//! rpc_timeout_ms: 5000
//! already_running_code: -3
//! launch_service:
//!   service: am.dbus.interface
//!   path: /app_manager
//!   interface: am.dbus.interface
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use appmgr_core::AddressBase;

use crate::error::ClientError;
use crate::paths::{
    config_path, socket_path, BUS_SOCKET_ENV, DEFAULT_OUTBOUND_BUFFER, DEFAULT_RPC_TIMEOUT,
};

/// Error code the AMS returns from `app_launch_call` when the target already runs.
pub const APP_ALREADY_RUNNING: i32 = -3;

/// Well-known name, object path, and interface of a remote service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceAddress {
    pub service: String,
    pub path: String,
    pub interface: String,
}

impl ServiceAddress {
    pub fn new(service: &str, path: &str, interface: &str) -> Self {
        Self {
            service: service.to_owned(),
            path: path.to_owned(),
            interface: interface.to_owned(),
        }
    }

    /// Application Management Service that owns `app_launch_call`.
    pub fn launch_service() -> Self {
        Self::new("am.dbus.interface", "/app_manager", "am.dbus.interface")
    }

    pub fn window_manager() -> Self {
        Self::new("org.clp.matchboxwm", "/org/clp/matchboxwm", "org.clp.matchboxwm")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Global application-manager names; per-instance addresses derive from these.
    pub app_manager: AddressBase,
    pub window_manager: ServiceAddress,
    pub launch_service: ServiceAddress,
    pub rpc_timeout_ms: u64,
    pub already_running_code: i32,
    /// Largest encoded outbound message the transport will buffer.
    pub outbound_buffer_bytes: usize,
    /// Bus broker socket; defaults to `~/.appmgr/bus.sock`.
    pub bus_socket: Option<PathBuf>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            app_manager: AddressBase::default(),
            window_manager: ServiceAddress::window_manager(),
            launch_service: ServiceAddress::launch_service(),
            rpc_timeout_ms: DEFAULT_RPC_TIMEOUT.as_millis() as u64,
            already_running_code: APP_ALREADY_RUNNING,
            outbound_buffer_bytes: DEFAULT_OUTBOUND_BUFFER,
            bus_socket: None,
        }
    }
}

impl ClientConfig {
    pub fn rpc_timeout(&self) -> Duration {
        Duration::from_millis(self.rpc_timeout_ms)
    }

    /// Load `<home>/.appmgr/client.yaml`, falling back to defaults when absent.
    pub fn load_at(home: &Path) -> Result<Self, ClientError> {
        let path = config_path(home);
        let mut config = if path.exists() {
            let contents = std::fs::read_to_string(&path).map_err(|e| ClientError::Config {
                path: path.clone(),
                reason: e.to_string(),
            })?;
            serde_yaml::from_str::<ClientConfig>(&contents).map_err(|e| ClientError::Config {
                path: path.clone(),
                reason: e.to_string(),
            })?
        } else {
            ClientConfig::default()
        };
        if config.rpc_timeout_ms == 0 {
            return Err(ClientError::Config {
                path,
                reason: "rpc_timeout_ms must be greater than zero".to_string(),
            });
        }
        if config.bus_socket.is_none() {
            config.bus_socket = Some(socket_path(home));
        }
        Ok(config)
    }

    /// `load_at` against `dirs::home_dir()`.
    pub fn load() -> Result<Self, ClientError> {
        let home = dirs::home_dir().ok_or_else(|| ClientError::Config {
            path: PathBuf::from("~"),
            reason: "cannot determine home directory".to_string(),
        })?;
        Self::load_at(&home)
    }

    /// Apply environment overrides; `lookup` is usually `|k| std::env::var(k).ok()`.
    pub fn with_env_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(socket) = lookup(BUS_SOCKET_ENV).filter(|s| !s.is_empty()) {
            self.bus_socket = Some(PathBuf::from(socket));
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_file_yields_defaults_with_home_socket() {
        let home = TempDir::new().expect("home");
        let config = ClientConfig::load_at(home.path()).expect("load");
        assert_eq!(config.rpc_timeout(), DEFAULT_RPC_TIMEOUT);
        assert_eq!(config.app_manager.interface, "org.clp.appmanager");
        assert_eq!(config.bus_socket, Some(socket_path(home.path())));
    }

    #[test]
    fn partial_file_overrides_only_named_fields() {
        let home = TempDir::new().expect("home");
        std::fs::create_dir_all(home.path().join(".appmgr")).expect("mkdir");
        std::fs::write(
            config_path(home.path()),
            "rpc_timeout_ms: 1500\nalready_running_code: 42\n",
        )
        .expect("write");

        let config = ClientConfig::load_at(home.path()).expect("load");
        assert_eq!(config.rpc_timeout(), Duration::from_millis(1500));
        assert_eq!(config.already_running_code, 42);
        assert_eq!(config.launch_service, ServiceAddress::launch_service());
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let home = TempDir::new().expect("home");
        std::fs::create_dir_all(home.path().join(".appmgr")).expect("mkdir");
        std::fs::write(config_path(home.path()), "rpc_timeout_ms: 0\n").expect("write");

        let err = ClientConfig::load_at(home.path()).unwrap_err();
        assert!(err.to_string().contains("rpc_timeout_ms"));
    }

    #[test]
    fn env_override_replaces_socket() {
        let config = ClientConfig::default().with_env_overrides(|key| {
            (key == BUS_SOCKET_ENV).then(|| "/run/appmgr/bus.sock".to_string())
        });
        assert_eq!(config.bus_socket, Some(PathBuf::from("/run/appmgr/bus.sock")));
    }
}
