// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared registry of live sessions with tag-based lookup.
//!
//! One exclusive lock guards everything: the authoritative session list and
//! a tag-to-id index kept consistent with it in the same critical section.
//! Acceptor tasks and the operator thread both mutate the registry, so every
//! public operation holds the lock for its full duration and is never
//! partially visible to another caller.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use crate::command::Command;
use crate::id::SessionId;
use crate::session::Session;

/// Reserved tag matching every session.
pub const WILDCARD_TAG: &str = "*";

#[derive(Default)]
struct Inner {
    /// Authoritative list, in connection order. Iteration order is what
    /// makes listings deterministic.
    sessions: Vec<Arc<Session>>,
    /// Lookup index, maintained alongside `sessions` under the same lock.
    by_tag: HashMap<String, HashSet<SessionId>>,
}

impl Inner {
    fn index_tag(&mut self, tag: &str, id: &SessionId) {
        self.by_tag
            .entry(tag.to_string())
            .or_default()
            .insert(id.clone());
    }

    fn unindex_tag(&mut self, tag: &str, id: &SessionId) {
        if let Some(ids) = self.by_tag.get_mut(tag) {
            ids.remove(id);
            if ids.is_empty() {
                self.by_tag.remove(tag);
            }
        }
    }

    /// Matches in connection order. The index narrows membership; the
    /// session list supplies the ordering.
    fn find(&self, tag: &str) -> Vec<Arc<Session>> {
        let tag = trim_quotes(tag);
        if tag == WILDCARD_TAG {
            return self.sessions.clone();
        }
        let Some(ids) = self.by_tag.get(tag) else {
            return Vec::new();
        };
        self.sessions
            .iter()
            .filter(|s| ids.contains(s.id()))
            .cloned()
            .collect()
    }

    /// Shut down and drop one session. Safe to call for a session that was
    /// already removed.
    fn remove(&mut self, session: &Session) {
        session.shutdown();
        let Some(idx) = self.sessions.iter().position(|s| s.id() == session.id()) else {
            return;
        };
        let removed = self.sessions.remove(idx);
        for tag in removed.tags() {
            self.unindex_tag(&tag, removed.id());
        }
        debug!(id = %removed.id(), peer = removed.peer_addr(), "session removed");
    }
}

/// The shared collection of all live sessions.
#[derive(Default)]
pub struct SessionRegistry {
    inner: Mutex<Inner>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a freshly connected session.
    pub fn add(&self, session: Arc<Session>) {
        let mut inner = self.inner.lock();
        for tag in session.tags() {
            inner.index_tag(&tag, session.id());
        }
        debug!(id = %session.id(), peer = session.peer_addr(), "session added");
        inner.sessions.push(session);
    }

    /// Shut down `session` and drop it from the registry.
    ///
    /// Idempotent: removing a session that is already gone is a no-op.
    pub fn remove(&self, session: &Session) {
        self.inner.lock().remove(session);
    }

    /// All sessions holding `tag`. `*` matches everything. Surrounding
    /// quote characters are trimmed, so quoted tags from the operator shell
    /// match their bare form. Unknown tags yield an empty list.
    pub fn find_by_tag(&self, tag: &str) -> Vec<Arc<Session>> {
        self.inner.lock().find(tag)
    }

    /// Shut down and drop every session matching `tag`.
    pub fn remove_all_by_tag(&self, tag: &str) {
        let mut inner = self.inner.lock();
        for session in inner.find(tag) {
            inner.remove(&session);
        }
    }

    /// Enqueue an independent copy of `command` onto every session matching
    /// `tag`. Returns how many sessions were reached; zero matches is a
    /// silent no-op.
    pub fn broadcast(&self, tag: &str, command: &Command) -> usize {
        let inner = self.inner.lock();
        let matched = inner.find(tag);
        for session in &matched {
            session.enqueue(command.clone());
        }
        matched.len()
    }

    /// Add `new_tag` to every session matching `search_tag`. Returns the
    /// number of sessions actually changed.
    pub fn tag_all(&self, search_tag: &str, new_tag: &str) -> usize {
        let new_tag = trim_quotes(new_tag);
        let mut inner = self.inner.lock();
        let mut changed = 0;
        for session in inner.find(search_tag) {
            let added = session.add_tag(new_tag);
            // Index unconditionally; the session may already hold a tag
            // the index has not seen.
            inner.index_tag(new_tag, session.id());
            if added {
                changed += 1;
            }
        }
        changed
    }

    /// Remove `tag` from every session matching `search_tag`. Sessions for
    /// which `tag` is the id or peer address are silently skipped. Returns
    /// the number of sessions actually changed.
    pub fn untag_all(&self, search_tag: &str, tag: &str) -> usize {
        let tag = trim_quotes(tag);
        let mut inner = self.inner.lock();
        let mut changed = 0;
        for session in inner.find(search_tag) {
            if session.remove_tag(tag) {
                inner.unindex_tag(tag, session.id());
                changed += 1;
            }
        }
        changed
    }

    /// Count of sessions holding each tag currently in use.
    pub fn tag_counts(&self) -> HashMap<String, usize> {
        self.inner
            .lock()
            .by_tag
            .iter()
            .map(|(tag, ids)| (tag.clone(), ids.len()))
            .collect()
    }

    /// Snapshot of all sessions, in connection order.
    pub fn sessions(&self) -> Vec<Arc<Session>> {
        self.inner.lock().sessions.clone()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().sessions.is_empty()
    }
}

/// Strip surrounding quote characters from an operator-supplied tag.
fn trim_quotes(tag: &str) -> &str {
    tag.trim_matches(|c| c == '"' || c == '\'')
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
