//! Home-directory resolution, config loading and bus connection.

use std::path::PathBuf;

use appmgr_client::paths::socket_path;
use appmgr_client::{BusError, ClientConfig, ClientError, SocketTransport};
use appmgr_core::{RegistryClient, StoreError, YamlStore};

/// Everything a command needs before it touches the bus.
#[derive(Debug)]
pub struct Session {
    pub home: PathBuf,
    pub config: ClientConfig,
    pub registry: RegistryClient<YamlStore>,
}

impl Session {
    /// Load `~/.appmgr/client.yaml` (if any) and apply environment overrides.
    pub fn open() -> Result<Self, ClientError> {
        let home = dirs::home_dir().ok_or(ClientError::Store(StoreError::HomeNotFound))?;
        let config =
            ClientConfig::load_at(&home)?.with_env_overrides(|key| std::env::var(key).ok());
        let registry = RegistryClient::new(YamlStore::open_at(&home));
        Ok(Self {
            home,
            config,
            registry,
        })
    }

    pub fn socket(&self) -> PathBuf {
        self.config
            .bus_socket
            .clone()
            .unwrap_or_else(|| socket_path(&self.home))
    }

    pub fn connect(&self) -> Result<SocketTransport, BusError> {
        let socket = self.socket();
        tracing::debug!(socket = %socket.display(), "connecting to bus");
        let transport = SocketTransport::connect(&socket)?;
        Ok(transport.with_outbound_limit(self.config.outbound_buffer_bytes))
    }
}
