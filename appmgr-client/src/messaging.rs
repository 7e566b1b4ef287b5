//! Outbound inter-application signals.

use appmgr_core::{AddressBase, ConfigStore, InstanceName, RegistryClient};

use crate::bus::{BusMessage, BusTransport};
use crate::codec::string_array_body;
use crate::dispatcher::{MEMBER_MESSAGE, MEMBER_STOP};
use crate::error::ClientError;

/// Builds signals addressed relative to `base`.
#[derive(Debug, Clone, Copy)]
pub struct Messenger<'a> {
    base: &'a AddressBase,
}

impl<'a> Messenger<'a> {
    pub fn new(base: &'a AddressBase) -> Self {
        Self { base }
    }

    /// `Message` signal for `target` carrying `[target, args...]`.
    pub fn message_signal(
        &self,
        target: &InstanceName,
        args: &[String],
    ) -> Result<BusMessage, ClientError> {
        let pair = self.base.for_instance(target);
        let mut params = Vec::with_capacity(args.len() + 1);
        params.push(target.to_string());
        params.extend(args.iter().cloned());
        Ok(BusMessage::signal(&pair.object_path, &pair.interface, MEMBER_MESSAGE)
            .with_body(string_array_body(params)?))
    }

    /// Send a `Message` to `target` (`app` or `app:N`) without waiting.
    pub fn send_message<T: BusTransport + ?Sized>(
        &self,
        bus: &mut T,
        target: &str,
        args: &[String],
    ) -> Result<(), ClientError> {
        let target = InstanceName::parse(target)?;
        let message = self.message_signal(&target, args)?;
        bus.send(message)?;
        tracing::debug!(app = %target, args = args.len(), "message sent");
        Ok(())
    }

    pub fn stop_signal(&self, target: &InstanceName) -> BusMessage {
        let pair = self.base.for_instance(target);
        BusMessage::signal(&pair.object_path, &pair.interface, MEMBER_STOP)
    }

    /// Ask one instance to stop.
    pub fn stop<T: BusTransport + ?Sized>(&self, bus: &mut T, target: &str) -> Result<(), ClientError> {
        let target = InstanceName::parse(target)?;
        bus.send(self.stop_signal(&target))?;
        tracing::info!(app = %target, "stop requested");
        Ok(())
    }

    /// Set the shutdown flag, then broadcast `stop` to every application.
    pub fn power_off<T, S>(
        &self,
        bus: &mut T,
        registry: &mut RegistryClient<S>,
    ) -> Result<(), ClientError>
    where
        T: BusTransport + ?Sized,
        S: ConfigStore,
    {
        registry.set_shutdown_flag(true)?;
        bus.send(BusMessage::signal(
            &self.base.object_path,
            &self.base.interface,
            MEMBER_STOP,
        ))?;
        bus.flush()?;
        tracing::info!("power off broadcast");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::{MemoryBus, Value};
    use appmgr_core::MemoryStore;

    #[test]
    fn message_goes_to_target_instance_with_target_first() {
        let bus = MemoryBus::new();
        let mut conn = bus.connect().expect("conn");
        let base = AddressBase::default();

        Messenger::new(&base)
            .send_message(&mut conn, "notes:4", &["open".into(), "/tmp/a".into()])
            .expect("send");

        let sent = bus.sent_signals();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].is_signal("org.clp.appmanager.notes4", "Message"));
        assert_eq!(
            sent[0].body,
            vec![
                Value::Uint32(3),
                Value::StrArray(vec!["notes:4".into(), "open".into(), "/tmp/a".into()])
            ]
        );
    }

    #[test]
    fn bad_target_is_rejected_without_sending() {
        let bus = MemoryBus::new();
        let mut conn = bus.connect().expect("conn");
        let base = AddressBase::default();
        let err = Messenger::new(&base)
            .send_message(&mut conn, "notes:x", &[])
            .unwrap_err();
        assert!(matches!(err, ClientError::InvalidParameter(_)));
        assert!(bus.sent().is_empty());
    }

    #[test]
    fn power_off_sets_flag_and_broadcasts_stop() {
        let bus = MemoryBus::new();
        let mut conn = bus.connect().expect("conn");
        let base = AddressBase::default();
        let mut registry = RegistryClient::new(MemoryStore::new());

        Messenger::new(&base)
            .power_off(&mut conn, &mut registry)
            .expect("power off");

        assert!(registry.shutdown_flag().expect("flag"));
        let sent = bus.sent_signals();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].is_signal("org.clp.appmanager", "stop"));
        assert_eq!(sent[0].path.as_deref(), Some("/org/clp/appmanager"));
    }

    #[test]
    fn stop_addresses_single_instance() {
        let base = AddressBase::default();
        let message = Messenger::new(&base).stop_signal(&InstanceName::parse("clock").expect("name"));
        assert!(message.is_signal("org.clp.appmanager.clock", "stop"));
        assert!(message.body.is_empty());
    }
}
