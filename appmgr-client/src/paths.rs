use std::path::{Path, PathBuf};
use std::time::Duration;

pub const BUS_SOCKET: &str = "bus.sock";
pub const CLIENT_CONFIG: &str = "client.yaml";

/// Overrides the bus socket location from the config file.
pub const BUS_SOCKET_ENV: &str = "APPMGR_BUS_SOCKET";

/// D-Bus' own default reply timeout.
pub const DEFAULT_RPC_TIMEOUT: Duration = Duration::from_secs(25);

pub const DEFAULT_OUTBOUND_BUFFER: usize = 1024 * 1024;

pub fn appmgr_root(home: &Path) -> PathBuf {
    home.join(".appmgr")
}

pub fn socket_path(home: &Path) -> PathBuf {
    appmgr_root(home).join(BUS_SOCKET)
}

pub fn config_path(home: &Path) -> PathBuf {
    appmgr_root(home).join(CLIENT_CONFIG)
}
