// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Delivery seam between the dispatch loop and the operator-facing output.

use crate::command::Command;
use crate::session::Session;

/// Receives each completed command once its response has arrived.
///
/// Implementations live outside the core: printing to the operator console,
/// or writing per-session output files. Delivery must not fail loudly; a
/// sink that cannot deliver logs and moves on, it never kills the session.
pub trait ResponseSink: Send + Sync {
    fn deliver(&self, session: &Session, command: &Command);
}
