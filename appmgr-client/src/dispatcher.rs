//! Inbound signal classification and handler invocation.
//!
//! | interface      | member                  | handler                      |
//! |----------------|-------------------------|------------------------------|
//! | instance       | `stop`                  | stop                         |
//! | app-manager    | `stop`                  | stop                         |
//! | window-manager | `UserInteractionGained` | focus-gained, own pid only   |
//! | window-manager | `UserInteractionLost`   | focus-lost, own pid only     |
//! | instance       | `exec`                  | exec                         |
//! | app-manager    | `AppExit`               | death                        |
//! | instance       | `Message`               | message                      |
//! | app-manager    | `rotate`                | rotate                       |
//!
//! The instance interface always carries a `.<app>` suffix so it never equals
//! the app-manager interface; at most one row matches a message.

use appmgr_core::{AddressPair, Rotation};

use crate::bus::{BusMessage, BusTransport, MatchRule, MessageKind};
use crate::codec::{decode_i32, decode_pid, decode_string_array};
use crate::error::{BusError, ClientError};
use crate::handlers::{HandlerKind, Handlers};

pub const MEMBER_STOP: &str = "stop";
pub const MEMBER_EXEC: &str = "exec";
pub const MEMBER_MESSAGE: &str = "Message";
pub const MEMBER_APP_EXIT: &str = "AppExit";
pub const MEMBER_ROTATE: &str = "rotate";
pub const MEMBER_FOCUS_GAINED: &str = "UserInteractionGained";
pub const MEMBER_FOCUS_LOST: &str = "UserInteractionLost";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatcherState {
    Unregistered,
    Active,
}

/// Outcome of offering one message to the dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// Recognised and consumed, whether or not a handler was set.
    Handled(HandlerKind),
    /// Not one of ours; other filters may look at it.
    NotYetHandled,
}

#[derive(Debug)]
pub struct SignalDispatcher {
    pid: u32,
    instance_interface: String,
    app_manager_interface: String,
    window_manager_interface: String,
    state: DispatcherState,
    handlers: Handlers,
}

impl SignalDispatcher {
    pub fn new(
        pid: u32,
        instance: &AddressPair,
        app_manager_interface: &str,
        window_manager_interface: &str,
    ) -> Self {
        Self {
            pid,
            instance_interface: instance.interface.clone(),
            app_manager_interface: app_manager_interface.to_owned(),
            window_manager_interface: window_manager_interface.to_owned(),
            state: DispatcherState::Unregistered,
            handlers: Handlers::new(),
        }
    }

    pub fn state(&self) -> DispatcherState {
        self.state
    }

    pub fn handlers(&self) -> &Handlers {
        &self.handlers
    }

    pub fn handlers_mut(&mut self) -> &mut Handlers {
        &mut self.handlers
    }

    /// Instance, app-manager and window-manager signal subscriptions.
    pub fn match_rules(&self) -> [MatchRule; 3] {
        [
            MatchRule::signals_on(&self.instance_interface),
            MatchRule::signals_on(&self.app_manager_interface),
            MatchRule::signals_on(&self.window_manager_interface),
        ]
    }

    /// Install the match rules on `bus`. Later calls are no-ops.
    pub fn activate<T: BusTransport + ?Sized>(&mut self, bus: &mut T) -> Result<(), BusError> {
        if self.state == DispatcherState::Active {
            return Ok(());
        }
        for rule in self.match_rules() {
            tracing::debug!(rule = %rule, "adding match rule");
            bus.add_match(rule)?;
        }
        self.state = DispatcherState::Active;
        Ok(())
    }

    /// Which handler `message` is addressed to, if any.
    pub fn classify(&self, message: &BusMessage) -> Option<HandlerKind> {
        if message.kind != MessageKind::Signal {
            return None;
        }
        let interface = message.interface.as_deref()?;
        let member = message.member.as_deref()?;

        if interface == self.instance_interface {
            match member {
                MEMBER_STOP => Some(HandlerKind::Stop),
                MEMBER_EXEC => Some(HandlerKind::Exec),
                MEMBER_MESSAGE => Some(HandlerKind::Message),
                _ => None,
            }
        } else if interface == self.app_manager_interface {
            match member {
                MEMBER_STOP => Some(HandlerKind::Stop),
                MEMBER_APP_EXIT => Some(HandlerKind::Death),
                MEMBER_ROTATE => Some(HandlerKind::Rotate),
                _ => None,
            }
        } else if interface == self.window_manager_interface {
            match member {
                MEMBER_FOCUS_GAINED => Some(HandlerKind::FocusGained),
                MEMBER_FOCUS_LOST => Some(HandlerKind::FocusLost),
                _ => None,
            }
        } else {
            None
        }
    }

    /// Classify `message` and run its handler.
    ///
    /// A message for an empty slot is consumed without decoding. A malformed
    /// payload is reported as [`ClientError::MalformedSignal`]; the dispatcher
    /// stays usable either way.
    pub fn dispatch(&mut self, message: &BusMessage) -> Result<Dispatch, ClientError> {
        if self.state != DispatcherState::Active {
            return Ok(Dispatch::NotYetHandled);
        }
        let Some(kind) = self.classify(message) else {
            return Ok(Dispatch::NotYetHandled);
        };
        if !self.handlers.is_set(kind) {
            tracing::trace!(handler = %kind, "no handler set, dropping signal");
            return Ok(Dispatch::Handled(kind));
        }

        let member = message.member_or_empty();
        let body = &message.body;
        tracing::debug!(handler = %kind, member, "dispatching signal");
        match kind {
            HandlerKind::Stop => {
                if let Some(handler) = self.handlers.stop.as_mut() {
                    handler();
                }
            }
            HandlerKind::Exec => {
                let params = decode_string_array(member, body)?;
                if let Some(handler) = self.handlers.exec.as_mut() {
                    handler(&params);
                }
            }
            HandlerKind::Message => {
                let params = decode_string_array(member, body)?;
                if let Some(handler) = self.handlers.message.as_mut() {
                    handler(&params);
                }
            }
            HandlerKind::Death => {
                let pid = decode_pid(member, body)?;
                if let Some(handler) = self.handlers.death.as_mut() {
                    handler(pid);
                }
            }
            HandlerKind::Rotate => {
                let code = decode_i32(member, body)?;
                let rotation = Rotation::from_code(code).ok_or_else(|| {
                    ClientError::malformed(member, format!("unknown rotation {code}"))
                })?;
                if let Some(handler) = self.handlers.rotate.as_mut() {
                    handler(rotation);
                }
            }
            HandlerKind::FocusGained | HandlerKind::FocusLost => {
                let pid = decode_pid(member, body)?;
                if pid != self.pid {
                    tracing::trace!(pid, own = self.pid, "focus change for another process");
                    return Ok(Dispatch::Handled(kind));
                }
                let slot = if kind == HandlerKind::FocusGained {
                    self.handlers.focus_gained.as_mut()
                } else {
                    self.handlers.focus_lost.as_mut()
                };
                if let Some(handler) = slot {
                    handler();
                }
            }
        }
        Ok(Dispatch::Handled(kind))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::{MemoryBus, Value};
    use appmgr_core::{AddressBase, AppName, InstanceType};
    use std::sync::{Arc, Mutex};

    const APP_MANAGER: &str = "org.clp.appmanager";
    const WINDOW_MANAGER: &str = "org.clp.matchboxwm";
    const INSTANCE: &str = "org.clp.appmanager.clock";

    fn dispatcher() -> SignalDispatcher {
        let app = AppName::new("clock").expect("name");
        let pair = AddressBase::default().build(&app, InstanceType::Single, 0);
        let mut dispatcher = SignalDispatcher::new(4242, &pair, APP_MANAGER, WINDOW_MANAGER);
        let bus = MemoryBus::new();
        let mut conn = bus.connect().expect("conn");
        dispatcher.activate(&mut conn).expect("activate");
        dispatcher
    }

    fn signal(interface: &str, member: &str) -> BusMessage {
        BusMessage::signal("/org/clp/appmanager", interface, member)
    }

    #[test]
    fn unregistered_dispatcher_handles_nothing() {
        let app = AppName::new("clock").expect("name");
        let pair = AddressBase::default().build(&app, InstanceType::Single, 0);
        let mut dispatcher = SignalDispatcher::new(1, &pair, APP_MANAGER, WINDOW_MANAGER);
        assert_eq!(dispatcher.state(), DispatcherState::Unregistered);
        assert_eq!(
            dispatcher.dispatch(&signal(INSTANCE, MEMBER_STOP)).expect("dispatch"),
            Dispatch::NotYetHandled
        );
    }

    #[test]
    fn stop_fires_once_from_either_interface() {
        let mut dispatcher = dispatcher();
        let count = Arc::new(Mutex::new(0));
        let seen = Arc::clone(&count);
        dispatcher.handlers_mut().set_stop(move || *seen.lock().expect("lock") += 1);

        for iface in [INSTANCE, APP_MANAGER] {
            assert_eq!(
                dispatcher.dispatch(&signal(iface, MEMBER_STOP)).expect("dispatch"),
                Dispatch::Handled(HandlerKind::Stop)
            );
        }
        assert_eq!(*count.lock().expect("lock"), 2);
    }

    #[test]
    fn unset_slot_drops_even_malformed_payload() {
        let mut dispatcher = dispatcher();
        let garbage = signal(INSTANCE, MEMBER_EXEC).with_arg(Value::Bool(true));
        assert_eq!(
            dispatcher.dispatch(&garbage).expect("dropped"),
            Dispatch::Handled(HandlerKind::Exec)
        );
    }

    #[test]
    fn focus_only_for_own_pid() {
        let mut dispatcher = dispatcher();
        let hits = Arc::new(Mutex::new(Vec::new()));
        let gained = Arc::clone(&hits);
        dispatcher
            .handlers_mut()
            .set_focus_gained(move || gained.lock().expect("lock").push("gained"));
        let lost = Arc::clone(&hits);
        dispatcher
            .handlers_mut()
            .set_focus_lost(move || lost.lock().expect("lock").push("lost"));

        let other = signal(WINDOW_MANAGER, MEMBER_FOCUS_GAINED).with_arg(Value::Int32(1));
        let mine = signal(WINDOW_MANAGER, MEMBER_FOCUS_LOST).with_arg(Value::Int32(4242));
        dispatcher.dispatch(&other).expect("other");
        dispatcher.dispatch(&mine).expect("mine");
        assert_eq!(*hits.lock().expect("lock"), vec!["lost"]);
    }

    #[test]
    fn death_and_rotate_decode_payloads() {
        let mut dispatcher = dispatcher();
        let events = Arc::new(Mutex::new(Vec::new()));
        let deaths = Arc::clone(&events);
        dispatcher
            .handlers_mut()
            .set_death(move |pid| deaths.lock().expect("lock").push(format!("exit {pid}")));
        let rotations = Arc::clone(&events);
        dispatcher.handlers_mut().set_rotate(move |rotation| {
            rotations.lock().expect("lock").push(format!("{rotation:?}"))
        });

        dispatcher
            .dispatch(&signal(APP_MANAGER, MEMBER_APP_EXIT).with_arg(Value::Int32(99)))
            .expect("exit");
        dispatcher
            .dispatch(&signal(APP_MANAGER, MEMBER_ROTATE).with_arg(Value::Int32(1)))
            .expect("rotate");
        assert_eq!(*events.lock().expect("lock"), vec!["exit 99", "Anticlockwise"]);

        let err = dispatcher
            .dispatch(&signal(APP_MANAGER, MEMBER_ROTATE).with_arg(Value::Int32(7)))
            .unwrap_err();
        assert!(matches!(err, ClientError::MalformedSignal { .. }));
    }

    #[test]
    fn unknown_members_and_method_calls_are_not_ours() {
        let mut dispatcher = dispatcher();
        dispatcher.handlers_mut().set_stop(|| {});
        assert_eq!(
            dispatcher.dispatch(&signal(INSTANCE, "Frobnicate")).expect("dispatch"),
            Dispatch::NotYetHandled
        );
        assert_eq!(
            dispatcher
                .dispatch(&signal(WINDOW_MANAGER, MEMBER_STOP))
                .expect("dispatch"),
            Dispatch::NotYetHandled
        );
        let call = BusMessage::method_call(APP_MANAGER, "/org/clp/appmanager", APP_MANAGER, "stop");
        assert_eq!(dispatcher.dispatch(&call).expect("dispatch"), Dispatch::NotYetHandled);
    }

    #[test]
    fn malformed_message_leaves_dispatcher_usable() {
        let mut dispatcher = dispatcher();
        let received = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&received);
        dispatcher
            .handlers_mut()
            .set_message(move |params| sink.lock().expect("lock").push(params.to_vec()));

        let bad = signal(INSTANCE, MEMBER_MESSAGE)
            .with_arg(Value::Uint32(3))
            .with_arg(Value::StrArray(vec!["clock".into()]));
        assert!(dispatcher.dispatch(&bad).is_err());

        let good = signal(INSTANCE, MEMBER_MESSAGE)
            .with_arg(Value::Uint32(2))
            .with_arg(Value::StrArray(vec!["clock".into(), "tick".into()]));
        dispatcher.dispatch(&good).expect("good");
        assert_eq!(
            *received.lock().expect("lock"),
            vec![vec!["clock".to_string(), "tick".to_string()]]
        );
    }
}
