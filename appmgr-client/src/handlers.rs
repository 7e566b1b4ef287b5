//! Per-event handler slots.
//!
//! Each event kind has at most one handler. Setting a slot replaces whatever
//! was there before; handlers never chain.

use std::fmt;

use appmgr_core::Rotation;

pub type StopHandler = Box<dyn FnMut() + Send>;
/// Receives the restore parameters; element 0 is the target application name.
pub type ExecHandler = Box<dyn FnMut(&[String]) + Send>;
pub type RotateHandler = Box<dyn FnMut(Rotation) + Send>;
/// Receives the pid of the application that exited.
pub type DeathHandler = Box<dyn FnMut(u32) + Send>;
pub type FocusHandler = Box<dyn FnMut() + Send>;
/// Receives the message parameters; element 0 is this instance's name.
pub type MessageHandler = Box<dyn FnMut(&[String]) + Send>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandlerKind {
    Stop,
    Exec,
    Rotate,
    Death,
    FocusGained,
    FocusLost,
    Message,
}

impl fmt::Display for HandlerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            HandlerKind::Stop => "stop",
            HandlerKind::Exec => "exec",
            HandlerKind::Rotate => "rotate",
            HandlerKind::Death => "death",
            HandlerKind::FocusGained => "focus-gained",
            HandlerKind::FocusLost => "focus-lost",
            HandlerKind::Message => "message",
        };
        f.write_str(name)
    }
}

#[derive(Default)]
pub struct Handlers {
    pub(crate) stop: Option<StopHandler>,
    pub(crate) exec: Option<ExecHandler>,
    pub(crate) rotate: Option<RotateHandler>,
    pub(crate) death: Option<DeathHandler>,
    pub(crate) focus_gained: Option<FocusHandler>,
    pub(crate) focus_lost: Option<FocusHandler>,
    pub(crate) message: Option<MessageHandler>,
}

impl Handlers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_stop(&mut self, handler: impl FnMut() + Send + 'static) {
        self.stop = Some(Box::new(handler));
    }

    pub fn set_exec(&mut self, handler: impl FnMut(&[String]) + Send + 'static) {
        self.exec = Some(Box::new(handler));
    }

    pub fn set_rotate(&mut self, handler: impl FnMut(Rotation) + Send + 'static) {
        self.rotate = Some(Box::new(handler));
    }

    pub fn set_death(&mut self, handler: impl FnMut(u32) + Send + 'static) {
        self.death = Some(Box::new(handler));
    }

    pub fn set_focus_gained(&mut self, handler: impl FnMut() + Send + 'static) {
        self.focus_gained = Some(Box::new(handler));
    }

    pub fn set_focus_lost(&mut self, handler: impl FnMut() + Send + 'static) {
        self.focus_lost = Some(Box::new(handler));
    }

    pub fn set_message(&mut self, handler: impl FnMut(&[String]) + Send + 'static) {
        self.message = Some(Box::new(handler));
    }

    pub fn clear(&mut self, kind: HandlerKind) {
        match kind {
            HandlerKind::Stop => self.stop = None,
            HandlerKind::Exec => self.exec = None,
            HandlerKind::Rotate => self.rotate = None,
            HandlerKind::Death => self.death = None,
            HandlerKind::FocusGained => self.focus_gained = None,
            HandlerKind::FocusLost => self.focus_lost = None,
            HandlerKind::Message => self.message = None,
        }
    }

    pub fn is_set(&self, kind: HandlerKind) -> bool {
        match kind {
            HandlerKind::Stop => self.stop.is_some(),
            HandlerKind::Exec => self.exec.is_some(),
            HandlerKind::Rotate => self.rotate.is_some(),
            HandlerKind::Death => self.death.is_some(),
            HandlerKind::FocusGained => self.focus_gained.is_some(),
            HandlerKind::FocusLost => self.focus_lost.is_some(),
            HandlerKind::Message => self.message.is_some(),
        }
    }
}

impl fmt::Debug for Handlers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handlers")
            .field("stop", &self.stop.is_some())
            .field("exec", &self.exec.is_some())
            .field("rotate", &self.rotate.is_some())
            .field("death", &self.death.is_some())
            .field("focus_gained", &self.focus_gained.is_some())
            .field("focus_lost", &self.focus_lost.is_some())
            .field("message", &self.message.is_some())
            .finish()
    }
}
