//! appmgr client runtime: registration, launch negotiation, signal dispatch
//! and inter-application messaging on top of a [`bus::BusTransport`].
//!
//! Public API surface:
//! - [`client`]: [`AppClient`] registration and the per-process [`ClientContext`]
//! - [`launch`]: `app_launch_call` negotiation and the restore path
//! - [`dispatcher`]: inbound signal classification
//! - [`messaging`]: outbound `Message` / `stop` signals and power-off
//! - [`window`]: window-manager focus requests
//! - [`bus`]: message model, in-memory and socket transports
//! - [`runtime`]: tracing setup and the shutdown-aware pump loop

pub mod bus;
pub mod client;
pub mod codec;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod handlers;
pub mod launch;
pub mod messaging;
pub mod paths;
pub mod runtime;
pub mod window;

pub use bus::{BusMessage, BusTransport, MatchRule, MemoryBus, SocketTransport, Value};
pub use client::{AppClient, ClientContext, Registration};
pub use config::{ClientConfig, ServiceAddress, APP_ALREADY_RUNNING};
pub use dispatcher::{Dispatch, DispatcherState, SignalDispatcher};
pub use error::{BusError, ClientError};
pub use handlers::HandlerKind;
pub use launch::{LaunchNegotiator, LaunchOutcome};
pub use messaging::Messenger;
pub use window::WindowManager;
