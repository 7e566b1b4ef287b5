//! Registered application client.
//!
//! [`AppClient::register`] resolves the process identity from the registry,
//! derives its bus addresses and activates the signal dispatcher. The
//! returned client owns the bus connection for the rest of the process.

use std::time::Duration;

use appmgr_core::{
    AddressPair, AppName, ConfigStore, InstanceName, InstanceType, Priority, RegistryClient,
    Rotation,
};

use crate::bus::{BusMessage, BusTransport};
use crate::config::ClientConfig;
use crate::dispatcher::{Dispatch, DispatcherState, SignalDispatcher};
use crate::error::ClientError;
use crate::launch::{LaunchNegotiator, LaunchOutcome};
use crate::messaging::Messenger;
use crate::window::WindowManager;

/// Identity and connection of a registered process.
#[derive(Debug)]
pub struct ClientContext<T> {
    pub pid: u32,
    pub app_id: i32,
    /// `None` for single-instance applications.
    pub instance_id: Option<u32>,
    pub app_name: AppName,
    pub instance_name: InstanceName,
    pub addresses: AddressPair,
    pub bus: T,
    pub init_done: bool,
}

/// Registration parameters. Priority and instance type only apply when the
/// registry has no value of its own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    name: String,
    priority: Priority,
    instance_type: InstanceType,
    pid: Option<u32>,
}

impl Registration {
    /// `name` may be a dotted service name; only the first segment is used.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            priority: Priority::default(),
            instance_type: InstanceType::default(),
            pid: None,
        }
    }

    pub fn priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn instance_type(mut self, instance_type: InstanceType) -> Self {
        self.instance_type = instance_type;
        self
    }

    /// Register under `pid` instead of the current process id.
    pub fn pid(mut self, pid: u32) -> Self {
        self.pid = Some(pid);
        self
    }
}

pub struct AppClient<T, S> {
    context: ClientContext<T>,
    registry: RegistryClient<S>,
    config: ClientConfig,
    dispatcher: SignalDispatcher,
}

impl<T, S> std::fmt::Debug for AppClient<T, S>
where
    T: std::fmt::Debug,
    S: std::fmt::Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppClient")
            .field("context", &self.context)
            .field("registry", &self.registry)
            .field("dispatcher", &self.dispatcher)
            .finish()
    }
}

impl<T: BusTransport, S: ConfigStore> AppClient<T, S> {
    pub fn register(
        registration: Registration,
        bus: T,
        registry: RegistryClient<S>,
        config: ClientConfig,
    ) -> Result<Self, ClientError> {
        Self::register_with_post_init(registration, bus, registry, config, |_| Ok(()))
    }

    /// Register, then run `post_init` once before returning the client.
    pub fn register_with_post_init<F>(
        registration: Registration,
        mut bus: T,
        mut registry: RegistryClient<S>,
        config: ClientConfig,
        post_init: F,
    ) -> Result<Self, ClientError>
    where
        F: FnOnce(&mut Self) -> Result<(), ClientError>,
    {
        let app_name = AppName::from_registration(&registration.name)?;
        let pid = registration.pid.unwrap_or_else(std::process::id);

        // Resolve and validate everything before the first registry write.
        let app_id = registry.app_id(&app_name)?;
        let instance_type = registry
            .instance_type(app_id)?
            .unwrap_or(registration.instance_type);

        let (instance_id, instance_name) = match instance_type {
            InstanceType::Single => (None, InstanceName::single(app_name.clone())),
            InstanceType::Multiple => {
                let last = registry.last_instance_id(&app_name)?;
                let id = u32::try_from(last).map_err(|_| {
                    ClientError::InvalidParameter(format!(
                        "negative instance id {last} for '{app_name}'"
                    ))
                })?;
                (Some(id), InstanceName::multiple(app_name.clone(), id))
            }
        };
        let missing_priority = registry.priority(&app_name)?.is_none();

        let addresses = config.app_manager.for_instance(&instance_name);
        let mut dispatcher = SignalDispatcher::new(
            pid,
            &addresses,
            &config.app_manager.interface,
            &config.window_manager.interface,
        );
        dispatcher.activate(&mut bus)?;

        registry.set_pid(&app_name, pid)?;
        if missing_priority {
            registry.set_priority(&app_name, registration.priority)?;
        }

        let mut client = Self {
            context: ClientContext {
                pid,
                app_id,
                instance_id,
                app_name,
                instance_name,
                addresses,
                bus,
                init_done: false,
            },
            registry,
            config,
            dispatcher,
        };
        post_init(&mut client)?;
        client.context.init_done = true;

        tracing::info!(
            app = %client.context.instance_name,
            pid,
            app_id,
            interface = %client.context.addresses.interface,
            "registered with application manager"
        );
        Ok(client)
    }

    pub fn name(&self) -> &AppName {
        &self.context.app_name
    }

    pub fn instance_name(&self) -> &InstanceName {
        &self.context.instance_name
    }

    pub fn context(&self) -> &ClientContext<T> {
        &self.context
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn registry(&self) -> &RegistryClient<S> {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut RegistryClient<S> {
        &mut self.registry
    }

    pub fn bus_mut(&mut self) -> &mut T {
        &mut self.context.bus
    }

    pub fn dispatcher_state(&self) -> DispatcherState {
        self.dispatcher.state()
    }

    pub fn on_stop(&mut self, handler: impl FnMut() + Send + 'static) {
        self.dispatcher.handlers_mut().set_stop(handler);
    }

    pub fn on_exec(&mut self, handler: impl FnMut(&[String]) + Send + 'static) {
        self.dispatcher.handlers_mut().set_exec(handler);
    }

    pub fn on_rotate(&mut self, handler: impl FnMut(Rotation) + Send + 'static) {
        self.dispatcher.handlers_mut().set_rotate(handler);
    }

    pub fn on_death(&mut self, handler: impl FnMut(u32) + Send + 'static) {
        self.dispatcher.handlers_mut().set_death(handler);
    }

    pub fn on_focus_gained(&mut self, handler: impl FnMut() + Send + 'static) {
        self.dispatcher.handlers_mut().set_focus_gained(handler);
    }

    pub fn on_focus_lost(&mut self, handler: impl FnMut() + Send + 'static) {
        self.dispatcher.handlers_mut().set_focus_lost(handler);
    }

    pub fn on_message(&mut self, handler: impl FnMut(&[String]) + Send + 'static) {
        self.dispatcher.handlers_mut().set_message(handler);
    }

    pub fn launch(&mut self, application: &str, args: &[String]) -> Result<LaunchOutcome, ClientError> {
        LaunchNegotiator::new(&self.config).launch(
            &mut self.context.bus,
            &self.registry,
            application,
            args,
        )
    }

    pub fn send_message(&mut self, target: &str, args: &[String]) -> Result<(), ClientError> {
        Messenger::new(&self.config.app_manager).send_message(&mut self.context.bus, target, args)
    }

    pub fn stop(&mut self, target: &str) -> Result<(), ClientError> {
        Messenger::new(&self.config.app_manager).stop(&mut self.context.bus, target)
    }

    pub fn power_off(&mut self) -> Result<(), ClientError> {
        Messenger::new(&self.config.app_manager).power_off(&mut self.context.bus, &mut self.registry)
    }

    pub fn set_visibility(&mut self, visible: bool) -> Result<(), ClientError> {
        self.registry
            .set_visibility(&self.context.app_name, visible)
            .map_err(ClientError::from)
    }

    /// Priority of whichever registered application has `pid`.
    pub fn priority_of(&self, pid: u32) -> Result<Option<Priority>, ClientError> {
        Ok(self.registry.priority_for_pid(pid)?)
    }

    pub fn focus_application(&mut self, pid: u32) -> Result<(), ClientError> {
        WindowManager::new(&self.config.window_manager).focus_pid(&mut self.context.bus, pid)
    }

    pub fn minimize_application(&mut self, pid: u32) -> Result<(), ClientError> {
        WindowManager::new(&self.config.window_manager).minimize_pid(&mut self.context.bus, pid)
    }

    pub fn dispatch(&mut self, message: &BusMessage) -> Result<Dispatch, ClientError> {
        self.dispatcher.dispatch(message)
    }

    /// Drain inbound messages and dispatch them on this thread.
    ///
    /// Waits up to `timeout` for the first message, then takes whatever else is
    /// already queued. Malformed signals are logged and skipped. Returns the
    /// number of messages the dispatcher handled.
    pub fn pump(&mut self, timeout: Duration) -> Result<usize, ClientError> {
        let mut handled = 0;
        let mut wait = timeout;
        while let Some(message) = self.context.bus.recv(wait)? {
            wait = Duration::ZERO;
            match self.dispatcher.dispatch(&message) {
                Ok(Dispatch::Handled(_)) => handled += 1,
                Ok(Dispatch::NotYetHandled) => {}
                Err(err @ ClientError::MalformedSignal { .. }) => {
                    tracing::warn!(error = %err, "dropping malformed signal");
                }
                Err(err) => return Err(err),
            }
        }
        Ok(handled)
    }
}
