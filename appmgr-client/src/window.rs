//! Fire-and-forget requests to the window manager.

use crate::bus::{BusMessage, BusTransport, Value};
use crate::config::ServiceAddress;
use crate::error::ClientError;

pub const MEMBER_FOCUS_PID: &str = "FocusPID";
pub const MEMBER_MINIMIZE_PID: &str = "MinimizePID";

#[derive(Debug, Clone, Copy)]
pub struct WindowManager<'a> {
    address: &'a ServiceAddress,
}

impl<'a> WindowManager<'a> {
    pub fn new(address: &'a ServiceAddress) -> Self {
        Self { address }
    }

    /// Bring the windows of `pid` to the front.
    pub fn focus_pid<T: BusTransport + ?Sized>(&self, bus: &mut T, pid: u32) -> Result<(), ClientError> {
        self.request(bus, MEMBER_FOCUS_PID, pid)
    }

    pub fn minimize_pid<T: BusTransport + ?Sized>(
        &self,
        bus: &mut T,
        pid: u32,
    ) -> Result<(), ClientError> {
        self.request(bus, MEMBER_MINIMIZE_PID, pid)
    }

    fn request<T: BusTransport + ?Sized>(
        &self,
        bus: &mut T,
        member: &str,
        pid: u32,
    ) -> Result<(), ClientError> {
        let pid = i32::try_from(pid)
            .map_err(|_| ClientError::InvalidParameter(format!("pid {pid} out of range")))?;
        let call = BusMessage::method_call(
            &self.address.service,
            &self.address.path,
            &self.address.interface,
            member,
        )
        .with_arg(Value::Int32(pid));
        bus.send(call)?;
        tracing::debug!(member, pid, "window manager request sent");
        Ok(())
    }
}
