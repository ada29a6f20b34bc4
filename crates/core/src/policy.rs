// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Connect-time policy: the default tag and the autorun table.
//!
//! Both values are owned by the control domain and consulted exactly once
//! per session, at construction. Later changes affect only sessions that
//! connect afterwards. Readers always see a whole value, never a
//! half-replaced list.

use std::collections::HashMap;

use parking_lot::RwLock;

/// Process-wide defaults applied to newly connecting sessions.
#[derive(Default)]
pub struct ConnectPolicy {
    default_tag: RwLock<Option<String>>,
    autoruns: RwLock<HashMap<String, Vec<String>>>,
}

impl ConnectPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tag added to every new session's tag set, if any.
    pub fn default_tag(&self) -> Option<String> {
        self.default_tag.read().clone()
    }

    /// Set or clear the default tag. `None` clears it.
    pub fn set_default_tag(&self, tag: Option<String>) {
        *self.default_tag.write() = tag;
    }

    /// Commands auto-enqueued for a session that connects holding `tag`.
    ///
    /// A tag with no entry reads as an empty list.
    pub fn autoruns_for(&self, tag: &str) -> Vec<String> {
        self.autoruns.read().get(tag).cloned().unwrap_or_default()
    }

    /// Replace the autorun list for `tag`.
    pub fn set_autoruns(&self, tag: impl Into<String>, commands: Vec<String>) {
        self.autoruns.write().insert(tag.into(), commands);
    }

    /// Clear the autorun list for `tag`.
    pub fn clear_autoruns(&self, tag: &str) {
        self.autoruns.write().remove(tag);
    }
}

#[cfg(test)]
#[path = "policy_tests.rs"]
mod tests;
