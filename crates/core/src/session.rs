// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! One connected agent: identity, tag membership, outbound command queue.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;

use crate::clock::Clock;
use crate::command::Command;
use crate::id::{IdGen, SessionId};
use crate::policy::ConnectPolicy;

/// Handle for one connected agent.
///
/// Shared between the registry, the operator surface, and the session's own
/// dispatch task. The dispatch task is the sole consumer of the command
/// queue; everyone else only enqueues.
pub struct Session {
    id: SessionId,
    peer_addr: String,
    tags: Mutex<Vec<String>>,
    alive: AtomicBool,
    queue: mpsc::UnboundedSender<Command>,
}

/// Consumer end of a session's command queue, owned by its dispatch task.
pub struct CommandQueue {
    rx: mpsc::UnboundedReceiver<Command>,
}

impl CommandQueue {
    /// Next queued command, in FIFO order. `None` once the session handle
    /// has been dropped with the queue drained.
    pub async fn recv(&mut self) -> Option<Command> {
        self.rx.recv().await
    }

    /// Non-blocking variant for tests and draining.
    pub fn try_recv(&mut self) -> Option<Command> {
        self.rx.try_recv().ok()
    }
}

impl Session {
    /// Build a session for a freshly accepted connection.
    ///
    /// Tags are seeded as `[id, peer_addr]` plus the default tag if one is
    /// set. The autorun table is then consulted for every seeded tag, in tag
    /// order, and each listed command is enqueued. Autoruns fire only here:
    /// tags added later never retroactively trigger them.
    ///
    /// Returns the shared handle and the queue consumer for the dispatch
    /// task.
    pub fn connect(
        peer_addr: impl Into<String>,
        policy: &ConnectPolicy,
        ids: &dyn IdGen,
        clock: &dyn Clock,
    ) -> (Arc<Self>, CommandQueue) {
        let peer_addr = peer_addr.into();
        let id = ids.next();

        let mut tags = vec![id.to_string(), peer_addr.clone()];
        if let Some(tag) = policy.default_tag() {
            if !tags.contains(&tag) {
                tags.push(tag);
            }
        }

        let autorun_texts: Vec<String> = tags
            .iter()
            .flat_map(|tag| policy.autoruns_for(tag))
            .collect();

        let (tx, rx) = mpsc::unbounded_channel();
        let session = Arc::new(Self {
            id,
            peer_addr,
            tags: Mutex::new(tags),
            alive: AtomicBool::new(true),
            queue: tx,
        });

        for text in autorun_texts {
            session.enqueue(Command::new(text, clock));
        }

        (session, CommandQueue { rx })
    }

    pub fn id(&self) -> &SessionId {
        &self.id
    }

    pub fn peer_addr(&self) -> &str {
        &self.peer_addr
    }

    /// Snapshot of the tag set, in insertion order.
    pub fn tags(&self) -> Vec<String> {
        self.tags.lock().clone()
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.lock().iter().any(|t| t == tag)
    }

    /// Append `tag` if absent. Returns whether it was added.
    pub fn add_tag(&self, tag: impl Into<String>) -> bool {
        let tag = tag.into();
        let mut tags = self.tags.lock();
        if tags.contains(&tag) {
            return false;
        }
        tags.push(tag);
        true
    }

    /// Remove `tag` if present. The session's own id and peer address are
    /// permanent; removing them is a no-op. Returns whether it was removed.
    pub fn remove_tag(&self, tag: &str) -> bool {
        if tag == self.id.as_str() || tag == self.peer_addr {
            return false;
        }
        let mut tags = self.tags.lock();
        match tags.iter().position(|t| t == tag) {
            Some(idx) => {
                tags.remove(idx);
                true
            }
            None => false,
        }
    }

    /// Append a command to the outbound queue. Never blocks; if the dispatch
    /// task is already gone the command is silently dropped along with the
    /// dying session.
    pub fn enqueue(&self, command: Command) {
        let _ = self.queue.send(command);
    }

    pub fn alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    /// Request cooperative shutdown. Idempotent; only clears the flag — the
    /// dispatch task observes it at its next queue-wait timeout and closes
    /// the connection itself.
    pub fn shutdown(&self) {
        self.alive.store(false, Ordering::SeqCst);
    }

    /// Directory name for this session's output files: `<peer_addr>_<id>`.
    pub fn output_dir_name(&self) -> String {
        format!("{}_{}", self.peer_addr, self.id)
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("peer_addr", &self.peer_addr)
            .field("alive", &self.alive.load(Ordering::SeqCst))
            .finish()
    }
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod tests;
