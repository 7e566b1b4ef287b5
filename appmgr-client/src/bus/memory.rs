//! In-process bus.
//!
//! Every [`MemoryConnection`] made from the same [`MemoryBus`] shares one hub.
//! Signals fan out to each connection whose match rules accept them, the
//! sender included. Method calls are answered by services registered with
//! [`MemoryBus::serve`]. The hub also keeps a log of the most recent traffic
//! (bounded by [`DEFAULT_LOG_LIMIT`], see [`MemoryBus::with_log_limit`]) so
//! tests can assert on it.

use std::collections::{BTreeMap, VecDeque};
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use super::{BusMessage, BusTransport, MatchRule, MessageKind, Value};
use crate::error::BusError;

/// Inbound messages a connection may hold before further deliveries fail.
pub const DEFAULT_QUEUE_CAPACITY: usize = 256;

/// Messages the traffic log keeps before dropping the oldest.
pub const DEFAULT_LOG_LIMIT: usize = 1024;

/// What a served method answers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceReply {
    Return(Vec<Value>),
    Error { name: String, message: String },
    /// Never reply; the caller times out.
    NoReply,
}

type ServiceFn = Box<dyn FnMut(&BusMessage) -> ServiceReply + Send>;

struct Service {
    interface: String,
    member: String,
    handler: ServiceFn,
}

struct Endpoint {
    name: String,
    rules: Vec<MatchRule>,
    inbox: VecDeque<BusMessage>,
    next_serial: u32,
}

#[derive(Default)]
struct Hub {
    next_id: u32,
    capacity: usize,
    endpoints: BTreeMap<u32, Endpoint>,
    services: Vec<Service>,
    log: VecDeque<BusMessage>,
    log_limit: usize,
}

impl Hub {
    fn record(&mut self, message: BusMessage) {
        if self.log_limit == 0 {
            return;
        }
        while self.log.len() >= self.log_limit {
            self.log.pop_front();
        }
        self.log.push_back(message);
    }

    fn endpoint(&mut self, id: u32) -> Result<&mut Endpoint, BusError> {
        self.endpoints.get_mut(&id).ok_or(BusError::Disconnected)
    }

    fn stamp(&mut self, id: u32, message: &mut BusMessage) -> Result<u32, BusError> {
        let endpoint = self.endpoint(id)?;
        endpoint.next_serial += 1;
        if message.serial == 0 {
            message.serial = endpoint.next_serial;
        }
        message.sender = Some(endpoint.name.clone());
        Ok(message.serial)
    }

    /// Deliver a signal to every subscribed endpoint. Fails without delivering
    /// anything when one of them has no room left.
    fn broadcast(&mut self, message: &BusMessage) -> Result<(), BusError> {
        let capacity = self.capacity;
        let targets: Vec<u32> = self
            .endpoints
            .iter()
            .filter(|(_, ep)| ep.rules.iter().any(|rule| rule.matches(message)))
            .map(|(id, _)| *id)
            .collect();
        if targets
            .iter()
            .any(|id| self.endpoints.get(id).map_or(false, |ep| ep.inbox.len() >= capacity))
        {
            return Err(BusError::OutOfMemory);
        }
        for id in targets {
            if let Some(endpoint) = self.endpoints.get_mut(&id) {
                endpoint.inbox.push_back(message.clone());
            }
        }
        Ok(())
    }

    fn answer(&mut self, call: &BusMessage) -> Option<ServiceReply> {
        let interface = call.interface.as_deref()?;
        let member = call.member.as_deref()?;
        self.services
            .iter_mut()
            .find(|svc| svc.interface == interface && svc.member == member)
            .map(|svc| (svc.handler)(call))
    }
}

struct Shared {
    hub: Mutex<Hub>,
    ready: Condvar,
}

/// Handle to an in-process bus. Cloning shares the same hub.
#[derive(Clone)]
pub struct MemoryBus {
    shared: Arc<Shared>,
}

impl Default for MemoryBus {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_QUEUE_CAPACITY)
    }
}

impl std::fmt::Debug for MemoryBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryBus").finish_non_exhaustive()
    }
}

impl MemoryBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            shared: Arc::new(Shared {
                hub: Mutex::new(Hub {
                    capacity,
                    log_limit: DEFAULT_LOG_LIMIT,
                    ..Hub::default()
                }),
                ready: Condvar::new(),
            }),
        }
    }

    /// Keep at most `limit` messages in the traffic log; zero disables it.
    pub fn with_log_limit(self, limit: usize) -> Self {
        if let Ok(mut hub) = self.lock() {
            hub.log_limit = limit;
            while hub.log.len() > limit {
                hub.log.pop_front();
            }
        }
        self
    }

    fn lock(&self) -> Result<MutexGuard<'_, Hub>, BusError> {
        lock_hub(&self.shared)
    }

    pub fn connect(&self) -> Result<MemoryConnection, BusError> {
        let mut hub = self.lock()?;
        hub.next_id += 1;
        let id = hub.next_id;
        let name = format!(":1.{id}");
        hub.endpoints.insert(
            id,
            Endpoint {
                name: name.clone(),
                rules: Vec::new(),
                inbox: VecDeque::new(),
                next_serial: 0,
            },
        );
        Ok(MemoryConnection {
            id,
            name,
            shared: Arc::clone(&self.shared),
        })
    }

    /// Answer method calls to `interface.member`. A later registration for the
    /// same pair replaces the earlier one. The handler runs with the hub locked
    /// and must not use the bus itself.
    pub fn serve<F>(&self, interface: &str, member: &str, handler: F) -> Result<(), BusError>
    where
        F: FnMut(&BusMessage) -> ServiceReply + Send + 'static,
    {
        let mut hub = self.lock()?;
        hub.services
            .retain(|svc| !(svc.interface == interface && svc.member == member));
        hub.services.push(Service {
            interface: interface.to_owned(),
            member: member.to_owned(),
            handler: Box::new(handler),
        });
        Ok(())
    }

    /// Logged traffic, oldest first.
    pub fn sent(&self) -> Vec<BusMessage> {
        self.lock()
            .map(|hub| hub.log.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn sent_signals(&self) -> Vec<BusMessage> {
        self.sent_of(MessageKind::Signal)
    }

    pub fn calls(&self) -> Vec<BusMessage> {
        self.sent_of(MessageKind::MethodCall)
    }

    fn sent_of(&self, kind: MessageKind) -> Vec<BusMessage> {
        self.sent().into_iter().filter(|m| m.kind == kind).collect()
    }

    /// Inject a signal as if a remote peer had emitted it.
    pub fn emit(&self, message: BusMessage) -> Result<(), BusError> {
        let mut hub = self.lock()?;
        hub.broadcast(&message)?;
        hub.record(message);
        self.shared.ready.notify_all();
        Ok(())
    }
}

fn lock_hub(shared: &Shared) -> Result<MutexGuard<'_, Hub>, BusError> {
    shared
        .hub
        .lock()
        .map_err(|_| BusError::Protocol("memory bus lock poisoned".to_string()))
}

/// One client connection to a [`MemoryBus`].
pub struct MemoryConnection {
    id: u32,
    name: String,
    shared: Arc<Shared>,
}

impl std::fmt::Debug for MemoryConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryConnection")
            .field("name", &self.name)
            .finish()
    }
}

impl Drop for MemoryConnection {
    fn drop(&mut self) {
        if let Ok(mut hub) = lock_hub(&self.shared) {
            hub.endpoints.remove(&self.id);
        }
    }
}

impl BusTransport for MemoryConnection {
    fn unique_name(&self) -> &str {
        &self.name
    }

    fn add_match(&mut self, rule: MatchRule) -> Result<(), BusError> {
        let mut hub = lock_hub(&self.shared)?;
        let endpoint = hub.endpoint(self.id)?;
        if !endpoint.rules.contains(&rule) {
            endpoint.rules.push(rule);
        }
        Ok(())
    }

    fn send(&mut self, mut message: BusMessage) -> Result<u32, BusError> {
        let mut hub = lock_hub(&self.shared)?;
        let serial = hub.stamp(self.id, &mut message)?;
        match message.kind {
            MessageKind::Signal => hub.broadcast(&message)?,
            MessageKind::MethodCall => {
                // No reply expected; the service still observes the call.
                let _ = hub.answer(&message);
            }
            MessageKind::MethodReturn | MessageKind::Error => {}
        }
        hub.record(message);
        self.shared.ready.notify_all();
        Ok(serial)
    }

    fn call(&mut self, mut message: BusMessage, timeout: Duration) -> Result<BusMessage, BusError> {
        let mut hub = lock_hub(&self.shared)?;
        hub.stamp(self.id, &mut message)?;
        hub.record(message.clone());
        let member = message.member_or_empty().to_owned();
        let reply = match hub.answer(&message) {
            None => BusMessage::error(
                &message,
                "org.freedesktop.DBus.Error.ServiceUnknown",
                &format!(
                    "no service answers {}.{member}",
                    message.interface.as_deref().unwrap_or_default()
                ),
            ),
            Some(ServiceReply::Return(body)) => BusMessage::method_return(&message, body),
            Some(ServiceReply::Error { name, message: text }) => {
                BusMessage::error(&message, &name, &text)
            }
            Some(ServiceReply::NoReply) => return Err(BusError::Timeout { member, timeout }),
        };
        reply.into_result()
    }

    fn recv(&mut self, timeout: Duration) -> Result<Option<BusMessage>, BusError> {
        let deadline = Instant::now() + timeout;
        let mut hub = lock_hub(&self.shared)?;
        loop {
            if let Some(message) = hub.endpoint(self.id)?.inbox.pop_front() {
                return Ok(Some(message));
            }
            let now = Instant::now();
            if now >= deadline {
                return Ok(None);
            }
            hub = self
                .shared
                .ready
                .wait_timeout(hub, deadline - now)
                .map_err(|_| BusError::Protocol("memory bus lock poisoned".to_string()))?
                .0;
        }
    }
}
