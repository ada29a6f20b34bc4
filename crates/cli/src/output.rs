// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Response delivery: operator console or per-session output files.

use std::fs;
use std::io;
use std::path::PathBuf;

use tracing::warn;

use drover_core::{Command, ResponseSink, Session};

/// Print each response to the operator console.
pub struct ConsoleSink;

impl ResponseSink for ConsoleSink {
    fn deliver(&self, session: &Session, command: &Command) {
        println!(
            "[{} - {}]: {}\n{}",
            session.id(),
            session.peer_addr(),
            command.full_name(),
            command.result().unwrap_or(""),
        );
    }
}

/// Write each response to `<root>/<peer_addr>_<id>/<full_name>.out`,
/// creating directories on demand. Write failures are logged and swallowed;
/// output persistence must never take a session down.
pub struct FileSink {
    root: PathBuf,
}

impl FileSink {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    fn write(&self, session: &Session, command: &Command) -> io::Result<()> {
        let dir = self.root.join(session.output_dir_name());
        fs::create_dir_all(&dir)?;
        let path = dir.join(format!("{}.out", command.full_name()));
        fs::write(path, command.result().unwrap_or(""))
    }
}

impl ResponseSink for FileSink {
    fn deliver(&self, session: &Session, command: &Command) {
        if let Err(e) = self.write(session, command) {
            warn!(
                id = %session.id(),
                job = %command.full_name(),
                error = %e,
                "failed to write response file"
            );
        }
    }
}

#[cfg(test)]
#[path = "output_tests.rs"]
mod tests;
