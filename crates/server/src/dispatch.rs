// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-connection dispatch loop.
//!
//! One instance runs per accepted connection, as an explicit state machine:
//!
//! ```text
//! WaitCommand -> Send -> AwaitResponse -> Deliver -> WaitCommand
//!                                                    (or Closed)
//! ```
//!
//! The queue wait is bounded so the loop re-checks the session's alive flag
//! periodically; that periodic wake is the only way an operator-initiated
//! shutdown is observed. A write failure or peer reset removes the session
//! from the registry and terminates the loop. Failures stay inside this
//! loop: one connection going away never touches any other.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::time::timeout;
use tracing::{debug, warn};

use drover_core::{Command, CommandQueue, ResponseSink, Session, SessionRegistry};

/// Errors from one connection's dispatch loop.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("connection closed by peer")]
    ConnectionClosed,
}

/// Timing for the dispatch loop.
#[derive(Debug, Clone, Copy)]
pub struct DispatchConfig {
    /// Bounded wait on the command queue. On expiry the alive flag is
    /// re-checked before waiting again.
    pub queue_wait: Duration,
    /// How long a response read may sit idle before the accumulated bytes
    /// count as the complete response.
    pub idle_window: Duration,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            queue_wait: Duration::from_secs(30),
            idle_window: Duration::from_millis(100),
        }
    }
}

/// Read buffer size for response chunks.
const READ_CHUNK: usize = 4096;

/// Loop states. `Send` through `Deliver` carry the in-flight command.
enum State {
    WaitCommand,
    Send(Command),
    AwaitResponse(Command),
    Deliver(Command),
    Closed,
}

/// Dispatch loop for a single connection.
///
/// Generic over the stream so tests can drive it with an in-memory duplex
/// pipe instead of a TCP socket.
pub struct Dispatcher<S> {
    stream: S,
    session: Arc<Session>,
    queue: CommandQueue,
    registry: Arc<SessionRegistry>,
    sink: Arc<dyn ResponseSink>,
    config: DispatchConfig,
}

impl<S: AsyncRead + AsyncWrite + Unpin + Send> Dispatcher<S> {
    pub fn new(
        stream: S,
        session: Arc<Session>,
        queue: CommandQueue,
        registry: Arc<SessionRegistry>,
        sink: Arc<dyn ResponseSink>,
        config: DispatchConfig,
    ) -> Self {
        Self {
            stream,
            session,
            queue,
            registry,
            sink,
            config,
        }
    }

    /// Run the state machine until it reaches `Closed`, then shut the
    /// stream down best-effort.
    pub async fn run(mut self) {
        let mut state = State::WaitCommand;
        loop {
            state = match state {
                State::WaitCommand => self.wait_command().await,
                State::Send(cmd) => self.send(cmd).await,
                State::AwaitResponse(cmd) => self.await_response(cmd).await,
                State::Deliver(cmd) => self.deliver(cmd),
                State::Closed => break,
            };
        }
        let _ = self.stream.shutdown().await;
        debug!(id = %self.session.id(), "dispatch loop closed");
    }

    /// Block on the queue, bounded, re-checking liveness on expiry.
    async fn wait_command(&mut self) -> State {
        match timeout(self.config.queue_wait, self.queue.recv()).await {
            Ok(Some(cmd)) => State::Send(cmd),
            // Queue producers gone: the session handle itself was dropped.
            Ok(None) => State::Closed,
            Err(_) if self.session.alive() => State::WaitCommand,
            Err(_) => State::Closed,
        }
    }

    /// Write the command text plus the newline terminator.
    async fn send(&mut self, cmd: Command) -> State {
        match self.write_line(cmd.text()).await {
            Ok(()) => State::AwaitResponse(cmd),
            Err(e) => {
                warn!(id = %self.session.id(), error = %e, "send failed, removing session");
                self.registry.remove(&self.session);
                State::Closed
            }
        }
    }

    async fn write_line(&mut self, text: &str) -> Result<(), DispatchError> {
        self.stream.write_all(text.as_bytes()).await?;
        self.stream.write_all(b"\n").await?;
        self.stream.flush().await?;
        Ok(())
    }

    /// Read the peer's response until it goes idle, then complete the
    /// command. The in-flight command's result stays unset on failure; no
    /// retry is attempted.
    async fn await_response(&mut self, mut cmd: Command) -> State {
        match read_until_idle(&mut self.stream, self.config.idle_window).await {
            Ok(bytes) => {
                cmd.complete(String::from_utf8_lossy(&bytes).into_owned());
                State::Deliver(cmd)
            }
            Err(e) => {
                warn!(id = %self.session.id(), error = %e, "response read failed, removing session");
                self.registry.remove(&self.session);
                State::Closed
            }
        }
    }

    /// Hand the completed command to the response sink.
    fn deliver(&mut self, cmd: Command) -> State {
        debug!(id = %self.session.id(), job = %cmd.full_name(), "response delivered");
        self.sink.deliver(&self.session, &cmd);
        if self.session.alive() {
            State::WaitCommand
        } else {
            State::Closed
        }
    }
}

/// Accumulate response bytes until the peer stops sending.
///
/// There is no framing on the wire beyond the command's newline terminator:
/// the agent is assumed to emit its whole output in one burst and then go
/// idle. The first read waits as long as command execution takes; each
/// subsequent read is bounded by `idle_window`, and the response is complete
/// once a read times out. A response that pauses longer than the window
/// mid-stream gets truncated; accepted protocol limitation.
async fn read_until_idle<S: AsyncRead + Unpin>(
    stream: &mut S,
    idle_window: Duration,
) -> Result<Vec<u8>, DispatchError> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; READ_CHUNK];

    let n = stream.read(&mut chunk).await?;
    if n == 0 {
        return Err(DispatchError::ConnectionClosed);
    }
    buf.extend_from_slice(&chunk[..n]);

    loop {
        match timeout(idle_window, stream.read(&mut chunk)).await {
            // Idle: response complete.
            Err(_) => break,
            // Peer closed after sending; deliver what arrived.
            Ok(Ok(0)) => break,
            Ok(Ok(n)) => buf.extend_from_slice(&chunk[..n]),
            Ok(Err(e)) => return Err(DispatchError::Io(e)),
        }
    }

    Ok(buf)
}

#[cfg(test)]
#[path = "dispatch_tests.rs"]
mod tests;
