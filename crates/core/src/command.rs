// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Command sent to an agent and the response paired with it.

use crate::clock::Clock;

/// Timestamp format used in command full names: `YYYYMMDDHHMMSS`.
const STAMP_FORMAT: &str = "%Y%m%d%H%M%S";

/// One shell command addressed to one session.
///
/// A command lives on exactly one session's queue. Broadcasting to a tag
/// clones the command per matched session, so each copy tracks its own
/// `result`. A command is never re-queued after dispatch.
#[derive(Debug, Clone)]
pub struct Command {
    text: String,
    job_name: String,
    timestamp: String,
    result: Option<String>,
}

impl Command {
    /// New command with the job name defaulted to the first word of `text`.
    pub fn new(text: impl Into<String>, clock: &dyn Clock) -> Self {
        let text = text.into();
        let job_name = text
            .split_whitespace()
            .next()
            .unwrap_or_default()
            .to_string();
        Self {
            text,
            job_name,
            timestamp: clock.now().format(STAMP_FORMAT).to_string(),
            result: None,
        }
    }

    /// Override the default job name.
    pub fn with_job_name(mut self, job_name: impl Into<String>) -> Self {
        self.job_name = job_name.into();
        self
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn job_name(&self) -> &str {
        &self.job_name
    }

    /// Correlation key for output artifacts: `<job_name>.<timestamp>`.
    pub fn full_name(&self) -> String {
        format!("{}.{}", self.job_name, self.timestamp)
    }

    /// Record the agent's response. Set at most once, when the paired
    /// response arrives; unset if the connection died mid-flight.
    pub fn complete(&mut self, result: impl Into<String>) {
        if self.result.is_none() {
            self.result = Some(result.into());
        }
    }

    pub fn result(&self) -> Option<&str> {
        self.result.as_deref()
    }
}

#[cfg(test)]
#[path = "command_tests.rs"]
mod tests;
