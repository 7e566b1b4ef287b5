//! Bus transport over the broker's Unix socket.
//!
//! Frames are newline-delimited JSON objects tagged by `op`:
//!
//! ```text
//! → {"op":"hello"}
//! ← {"op":"welcome","name":":1.7"}
//! → {"op":"add_match","rule":{"kind":"signal","interface":"org.clp.appmanager"}}
//! ↔ {"op":"message","message":{...}}
//! ```
//!
//! The broker routes `message` frames; this side never waits for an
//! acknowledgement of a send.

use std::collections::VecDeque;
use std::io::{BufRead, BufReader, ErrorKind, Write};
use std::os::unix::net::UnixStream;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use super::{BusMessage, BusTransport, MatchRule, MessageKind};
use crate::error::{io_err, BusError};
use crate::paths::DEFAULT_OUTBOUND_BUFFER;

const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Frame {
    Hello,
    Welcome { name: String },
    AddMatch { rule: MatchRule },
    Message { message: BusMessage },
}

pub struct SocketTransport {
    socket: PathBuf,
    name: String,
    writer: UnixStream,
    reader: BufReader<UnixStream>,
    partial: Vec<u8>,
    pending: VecDeque<BusMessage>,
    next_serial: u32,
    outbound_limit: usize,
}

impl std::fmt::Debug for SocketTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SocketTransport")
            .field("socket", &self.socket)
            .field("name", &self.name)
            .field("pending", &self.pending.len())
            .finish()
    }
}

impl SocketTransport {
    /// Connect to the broker at `socket` and complete the hello handshake.
    pub fn connect(socket: &Path) -> Result<Self, BusError> {
        if !socket.exists() {
            return Err(BusError::NotRunning {
                socket: socket.to_path_buf(),
            });
        }

        let stream = UnixStream::connect(socket).map_err(|err| {
            if matches!(
                err.kind(),
                ErrorKind::NotFound | ErrorKind::ConnectionRefused | ErrorKind::ConnectionReset
            ) {
                BusError::NotRunning {
                    socket: socket.to_path_buf(),
                }
            } else {
                io_err(socket, err)
            }
        })?;
        let writer = stream.try_clone().map_err(|e| io_err(socket, e))?;

        let mut transport = Self {
            socket: socket.to_path_buf(),
            name: String::new(),
            writer,
            reader: BufReader::new(stream),
            partial: Vec::new(),
            pending: VecDeque::new(),
            next_serial: 0,
            outbound_limit: DEFAULT_OUTBOUND_BUFFER,
        };

        transport.write_frame(&Frame::Hello)?;
        match transport.read_frame(Instant::now() + HANDSHAKE_TIMEOUT)? {
            Some(Frame::Welcome { name }) => transport.name = name,
            Some(other) => {
                return Err(BusError::Protocol(format!(
                    "expected welcome from broker, got {other:?}"
                )))
            }
            None => {
                return Err(BusError::Protocol(
                    "broker did not answer hello".to_string(),
                ))
            }
        }
        tracing::debug!(socket = %socket.display(), name = %transport.name, "connected to bus");
        Ok(transport)
    }

    /// Largest encoded message [`BusTransport::send`] accepts.
    pub fn with_outbound_limit(mut self, bytes: usize) -> Self {
        self.outbound_limit = bytes;
        self
    }

    pub fn socket(&self) -> &Path {
        &self.socket
    }

    fn write_frame(&mut self, frame: &Frame) -> Result<(), BusError> {
        let mut payload = serde_json::to_vec(frame)?;
        payload.push(b'\n');
        self.writer
            .write_all(&payload)
            .map_err(|e| self.write_err(e))?;
        self.writer.flush().map_err(|e| self.write_err(e))
    }

    fn write_err(&self, err: std::io::Error) -> BusError {
        if matches!(err.kind(), ErrorKind::BrokenPipe | ErrorKind::ConnectionReset) {
            BusError::Disconnected
        } else {
            io_err(&self.socket, err)
        }
    }

    /// Read one frame, or `None` when `deadline` passes first. A frame cut
    /// short by the timeout is kept and completed by the next read.
    fn read_frame(&mut self, deadline: Instant) -> Result<Option<Frame>, BusError> {
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() && !self.reader.buffer().contains(&b'\n') {
                return Ok(None);
            }
            // A zero read timeout means "block forever" to the OS.
            let wait = remaining.max(Duration::from_millis(1));
            self.reader
                .get_ref()
                .set_read_timeout(Some(wait))
                .map_err(|e| io_err(&self.socket, e))?;

            match self.reader.read_until(b'\n', &mut self.partial) {
                Ok(0) => return Err(BusError::Disconnected),
                Ok(_) if self.partial.ends_with(b"\n") => {
                    let line = std::mem::take(&mut self.partial);
                    let text = String::from_utf8_lossy(&line);
                    let text = text.trim();
                    if text.is_empty() {
                        continue;
                    }
                    return Ok(Some(serde_json::from_str(text)?));
                }
                Ok(_) => return Err(BusError::Disconnected),
                Err(err)
                    if matches!(
                        err.kind(),
                        ErrorKind::WouldBlock | ErrorKind::TimedOut | ErrorKind::Interrupted
                    ) =>
                {
                    if Instant::now() >= deadline {
                        return Ok(None);
                    }
                }
                Err(err) => return Err(io_err(&self.socket, err)),
            }
        }
    }

    fn read_message(&mut self, deadline: Instant) -> Result<Option<BusMessage>, BusError> {
        loop {
            match self.read_frame(deadline)? {
                None => return Ok(None),
                Some(Frame::Message { message }) => return Ok(Some(message)),
                Some(other) => {
                    tracing::debug!(frame = ?other, "ignoring unexpected broker frame");
                }
            }
        }
    }
}

impl BusTransport for SocketTransport {
    fn unique_name(&self) -> &str {
        &self.name
    }

    fn add_match(&mut self, rule: MatchRule) -> Result<(), BusError> {
        self.write_frame(&Frame::AddMatch { rule })
    }

    fn send(&mut self, mut message: BusMessage) -> Result<u32, BusError> {
        self.next_serial = self.next_serial.wrapping_add(1).max(1);
        if message.serial == 0 {
            message.serial = self.next_serial;
        }
        message.sender = Some(self.name.clone());
        let serial = message.serial;
        let frame = Frame::Message { message };
        let encoded = serde_json::to_vec(&frame)?.len();
        if encoded > self.outbound_limit {
            tracing::warn!(
                bytes = encoded,
                limit = self.outbound_limit,
                "outbound message exceeds buffer"
            );
            return Err(BusError::OutOfMemory);
        }
        self.write_frame(&frame)?;
        Ok(serial)
    }

    fn call(&mut self, message: BusMessage, timeout: Duration) -> Result<BusMessage, BusError> {
        let member = message.member_or_empty().to_owned();
        let serial = self.send(message)?;
        let deadline = Instant::now() + timeout;
        loop {
            match self.read_message(deadline)? {
                None => return Err(BusError::Timeout { member, timeout }),
                Some(reply)
                    if reply.reply_serial == Some(serial)
                        && matches!(reply.kind, MessageKind::MethodReturn | MessageKind::Error) =>
                {
                    return reply.into_result();
                }
                Some(other) => self.pending.push_back(other),
            }
        }
    }

    fn recv(&mut self, timeout: Duration) -> Result<Option<BusMessage>, BusError> {
        if let Some(message) = self.pending.pop_front() {
            return Ok(Some(message));
        }
        self.read_message(Instant::now() + timeout)
    }

    fn flush(&mut self) -> Result<(), BusError> {
        self.writer.flush().map_err(|e| self.write_err(e))
    }
}
