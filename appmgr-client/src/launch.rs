//! Launch negotiation with the Application Management Service.
//!
//! `app_launch_call(i32 app_id, string args, u32 model_data)` answers
//! `(i32 instance_id, i32 error_code)`. The already-running code turns the
//! launch into a restore: one `exec` signal to the running target carrying
//! `[target, args...]`.

use appmgr_core::{AddressBase, ConfigStore, InstanceName, RegistryClient};

use crate::bus::{BusMessage, BusTransport, Value};
use crate::codec::{encode_launch_args, string_array_body};
use crate::config::ClientConfig;
use crate::dispatcher::MEMBER_EXEC;
use crate::error::{BusError, ClientError};

pub const LAUNCH_MEMBER: &str = "app_launch_call";

/// How a successful launch request ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LaunchOutcome {
    /// A new instance was started.
    Launched { instance_id: i32 },
    /// The target was already running and received an `exec` signal instead.
    Restored {
        target: InstanceName,
        params: Vec<String>,
    },
}

#[derive(Debug, Clone, Copy)]
pub struct LaunchNegotiator<'a> {
    config: &'a ClientConfig,
}

impl<'a> LaunchNegotiator<'a> {
    pub fn new(config: &'a ClientConfig) -> Self {
        Self { config }
    }

    /// Ask the AMS to launch `application` (`app` or `app:N`) with `args`.
    ///
    /// Parameters are validated before anything touches the store or the bus.
    /// A set shutdown flag fails the launch without making the call.
    pub fn launch<T, S>(
        &self,
        bus: &mut T,
        registry: &RegistryClient<S>,
        application: &str,
        args: &[String],
    ) -> Result<LaunchOutcome, ClientError>
    where
        T: BusTransport + ?Sized,
        S: ConfigStore,
    {
        let target = InstanceName::parse(application)?;
        let blob = encode_launch_args(args)?;

        let app_id = registry.app_id(target.app())?;
        if registry.shutdown_flag()? {
            tracing::warn!(app = %target, "launch refused, shutdown in progress");
            return Err(ClientError::ShuttingDown);
        }

        let service = &self.config.launch_service;
        let call = BusMessage::method_call(
            &service.service,
            &service.path,
            &service.interface,
            LAUNCH_MEMBER,
        )
        .with_arg(Value::Int32(app_id))
        .with_arg(Value::Str(blob))
        .with_arg(Value::Uint32(0));

        tracing::info!(app = %target, app_id, args = args.len(), "requesting launch");
        let reply = bus.call(call, self.config.rpc_timeout())?;
        let (instance_id, error_code) = decode_launch_reply(&reply)?;

        if error_code == self.config.already_running_code {
            let message = restore_signal(&self.config.app_manager, &target, args)?;
            let params = restore_params(&message);
            bus.send(message)?;
            tracing::info!(app = %target, "already running, restore signal sent");
            return Ok(LaunchOutcome::Restored { target, params });
        }
        if error_code != 0 || instance_id <= 0 {
            tracing::warn!(app = %target, instance_id, error_code, "launch failed");
            return Err(ClientError::LaunchFailed {
                app: target.to_string(),
                instance_id,
                error_code,
            });
        }

        tracing::info!(app = %target, instance_id, "launched");
        Ok(LaunchOutcome::Launched { instance_id })
    }
}

/// `exec` signal restoring `target` with `args`; parameter 0 is the target name.
pub fn restore_signal(
    base: &AddressBase,
    target: &InstanceName,
    args: &[String],
) -> Result<BusMessage, ClientError> {
    let pair = base.for_instance(target);
    let mut params = Vec::with_capacity(args.len() + 1);
    params.push(target.to_string());
    params.extend(args.iter().cloned());
    Ok(
        BusMessage::signal(&pair.object_path, &pair.interface, MEMBER_EXEC)
            .with_body(string_array_body(params)?),
    )
}

fn restore_params(message: &BusMessage) -> Vec<String> {
    match message.body.get(1) {
        Some(Value::StrArray(params)) => params.clone(),
        _ => Vec::new(),
    }
}

fn decode_launch_reply(reply: &BusMessage) -> Result<(i32, i32), ClientError> {
    match reply.body.as_slice() {
        [Value::Int32(instance_id), Value::Int32(error_code), ..] => Ok((*instance_id, *error_code)),
        other => Err(ClientError::Transport(BusError::Protocol(format!(
            "malformed {LAUNCH_MEMBER} reply: {other:?}"
        )))),
    }
}
