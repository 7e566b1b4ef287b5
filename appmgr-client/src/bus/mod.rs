//! Bus message model and the transport seam.
//!
//! The runtime never talks to a concrete bus directly. It builds [`BusMessage`]s
//! and hands them to a [`BusTransport`]; the adapters in [`memory`] and
//! [`socket`] decide how those messages travel.

pub mod memory;
pub mod socket;

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::BusError;

pub use memory::{MemoryBus, MemoryConnection, ServiceReply};
pub use socket::SocketTransport;

/// A single typed argument in a message body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Value {
    Int32(i32),
    Uint32(u32),
    Bool(bool),
    Str(String),
    StrArray(Vec<String>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    Signal,
    MethodCall,
    MethodReturn,
    Error,
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageKind::Signal => write!(f, "signal"),
            MessageKind::MethodCall => write!(f, "method_call"),
            MessageKind::MethodReturn => write!(f, "method_return"),
            MessageKind::Error => write!(f, "error"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusMessage {
    pub kind: MessageKind,
    /// Assigned by the transport on send when left at zero.
    #[serde(default)]
    pub serial: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply_serial: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interface: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub member: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_name: Option<String>,
    #[serde(default)]
    pub body: Vec<Value>,
}

impl BusMessage {
    fn empty(kind: MessageKind) -> Self {
        Self {
            kind,
            serial: 0,
            reply_serial: None,
            sender: None,
            destination: None,
            path: None,
            interface: None,
            member: None,
            error_name: None,
            body: Vec::new(),
        }
    }

    pub fn signal(path: &str, interface: &str, member: &str) -> Self {
        Self {
            path: Some(path.to_owned()),
            interface: Some(interface.to_owned()),
            member: Some(member.to_owned()),
            ..Self::empty(MessageKind::Signal)
        }
    }

    pub fn method_call(destination: &str, path: &str, interface: &str, member: &str) -> Self {
        Self {
            destination: Some(destination.to_owned()),
            path: Some(path.to_owned()),
            interface: Some(interface.to_owned()),
            member: Some(member.to_owned()),
            ..Self::empty(MessageKind::MethodCall)
        }
    }

    pub fn method_return(call: &BusMessage, body: Vec<Value>) -> Self {
        Self {
            reply_serial: Some(call.serial),
            destination: call.sender.clone(),
            body,
            ..Self::empty(MessageKind::MethodReturn)
        }
    }

    pub fn error(call: &BusMessage, name: &str, message: &str) -> Self {
        Self {
            reply_serial: Some(call.serial),
            destination: call.sender.clone(),
            error_name: Some(name.to_owned()),
            body: vec![Value::Str(message.to_owned())],
            ..Self::empty(MessageKind::Error)
        }
    }

    pub fn with_arg(mut self, value: Value) -> Self {
        self.body.push(value);
        self
    }

    pub fn with_body(mut self, body: Vec<Value>) -> Self {
        self.body = body;
        self
    }

    /// True for a signal with exactly this interface and member.
    pub fn is_signal(&self, interface: &str, member: &str) -> bool {
        self.kind == MessageKind::Signal
            && self.interface.as_deref() == Some(interface)
            && self.member.as_deref() == Some(member)
    }

    pub fn member_or_empty(&self) -> &str {
        self.member.as_deref().unwrap_or_default()
    }

    /// Turn an `Error` reply into [`BusError::Remote`]; other kinds pass through.
    pub fn into_result(self) -> Result<BusMessage, BusError> {
        if self.kind != MessageKind::Error {
            return Ok(self);
        }
        let message = match self.body.first() {
            Some(Value::Str(text)) => text.clone(),
            _ => String::new(),
        };
        Err(BusError::Remote {
            name: self.error_name.unwrap_or_else(|| "unknown".to_string()),
            message,
        })
    }
}

/// Subscription filter, rendered in bus match-rule syntax:
/// `type='signal',interface='org.clp.appmanager'`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MatchRule {
    pub kind: MessageKind,
    pub interface: String,
}

impl MatchRule {
    pub fn signals_on(interface: &str) -> Self {
        Self {
            kind: MessageKind::Signal,
            interface: interface.to_owned(),
        }
    }

    pub fn matches(&self, message: &BusMessage) -> bool {
        message.kind == self.kind && message.interface.as_deref() == Some(self.interface.as_str())
    }
}

impl fmt::Display for MatchRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "type='{}',interface='{}'", self.kind, self.interface)
    }
}

/// A connection to the shared message bus.
///
/// Implementations are used from one thread at a time; every method blocks.
pub trait BusTransport {
    /// Unique name the bus assigned to this connection.
    fn unique_name(&self) -> &str;

    fn add_match(&mut self, rule: MatchRule) -> Result<(), BusError>;

    /// Queue `message` for delivery and return its serial. Does not wait for
    /// any acknowledgement. [`BusError::OutOfMemory`] when the bus refuses to
    /// buffer it.
    fn send(&mut self, message: BusMessage) -> Result<u32, BusError>;

    /// Send a method call and block until its reply arrives or `timeout`
    /// elapses ([`BusError::Timeout`]). Error replies surface as
    /// [`BusError::Remote`]. Unrelated messages received while waiting stay
    /// queued for [`BusTransport::recv`].
    fn call(&mut self, message: BusMessage, timeout: Duration) -> Result<BusMessage, BusError>;

    /// Next inbound message matching this connection's rules, or `None` once
    /// `timeout` elapses.
    fn recv(&mut self, timeout: Duration) -> Result<Option<BusMessage>, BusError>;

    fn flush(&mut self) -> Result<(), BusError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn match_rule_renders_bus_syntax() {
        let rule = MatchRule::signals_on("org.clp.appmanager.clock");
        assert_eq!(
            rule.to_string(),
            "type='signal',interface='org.clp.appmanager.clock'"
        );
    }

    #[test]
    fn match_rule_requires_kind_and_interface() {
        let rule = MatchRule::signals_on("org.clp.appmanager");
        assert!(rule.matches(&BusMessage::signal("/org/clp/appmanager", "org.clp.appmanager", "stop")));
        assert!(!rule.matches(&BusMessage::signal("/x", "org.clp.matchboxwm", "stop")));
        assert!(!rule.matches(&BusMessage::method_call(
            "org.clp.appmanager",
            "/org/clp/appmanager",
            "org.clp.appmanager",
            "stop"
        )));
    }

    #[test]
    fn error_reply_becomes_remote_error() {
        let mut call = BusMessage::method_call("svc", "/svc", "svc", "m");
        call.serial = 4;
        let reply = BusMessage::error(&call, "org.example.Failed", "nope");
        assert_eq!(reply.reply_serial, Some(4));
        let err = reply.into_result().unwrap_err();
        assert!(matches!(err, BusError::Remote { ref name, .. } if name == "org.example.Failed"));
    }

    #[test]
    fn message_json_shape_is_stable() {
        let msg = BusMessage::signal("/org/clp/appmanager/clock", "org.clp.appmanager.clock", "exec")
            .with_arg(Value::Uint32(1))
            .with_arg(Value::StrArray(vec!["clock".into()]));
        let json = serde_json::to_value(&msg).expect("encode");
        assert_eq!(json["kind"], "signal");
        assert_eq!(json["body"][0], serde_json::json!({"type": "uint32", "value": 1}));
        assert!(json.get("reply_serial").is_none());
    }
}
