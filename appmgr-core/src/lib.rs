//! appmgr core library: naming, addressing, and the application registry.
//!
//! Public API surface:
//! - [`types`]: application/instance names and small domain enums
//! - [`address`]: per-instance bus interface and object path derivation
//! - [`store`]: the key/value configuration store and its adapters
//! - [`registry`]: typed lookups of application metadata in the store
//! - [`error`]: [`AddressError`], [`StoreError`]

pub mod address;
pub mod error;
pub mod registry;
pub mod store;
pub mod types;

pub use address::{build_addresses, AddressBase, AddressPair};
pub use error::{AddressError, StoreError};
pub use registry::RegistryClient;
pub use store::{ConfigStore, MemoryStore, StoreValue, YamlStore};
pub use types::{AppName, InstanceName, InstanceType, Priority, Rotation};
