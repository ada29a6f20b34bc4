// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Operator command loop.
//!
//! Reads commands from stdin and turns them into registry and policy calls.
//! Bad input is reported with a `[-]` line and changes nothing; nothing an
//! operator types here can take the process down.

use std::io::{self, BufRead, Write};
use std::sync::Arc;

use drover_core::{Clock, Command, ConnectPolicy, SessionRegistry};

use crate::table::Table;

/// Whether the loop keeps going after a line.
#[derive(Debug, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Exit,
}

const HELP: &str = "\
Commands:
  run <tag> <command>            queue a shell command on every session with <tag>
  settag [tag]                   default tag for new sessions; empty clears it
  addtag <search_tag> <new_tag>  add a tag to every session matching <search_tag>
  removetag <search_tag> <tag>   remove a tag from every matching session
  settagautos <tag> <file|none>  commands auto-run when a session connects with <tag>
  tags                           list tags with session counts
  sessions [tag]                 list sessions, optionally filtered by tag
  disconnect <tag>               drop every session matching <tag>
  exit                           disconnect everything and quit
The tag '*' matches every session.";

pub struct Repl {
    registry: Arc<SessionRegistry>,
    policy: Arc<ConnectPolicy>,
    clock: Arc<dyn Clock>,
}

impl Repl {
    pub fn new(
        registry: Arc<SessionRegistry>,
        policy: Arc<ConnectPolicy>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            registry,
            policy,
            clock,
        }
    }

    /// Prompt reflects the current default tag.
    fn prompt(&self) -> String {
        match self.policy.default_tag() {
            Some(tag) => format!("{}> ", tag),
            None => "> ".to_string(),
        }
    }

    /// Read and handle lines until `exit` or end of input.
    pub fn run(&mut self) -> io::Result<()> {
        let stdin = io::stdin();
        let mut stdout = io::stdout();
        let mut line = String::new();
        loop {
            write!(stdout, "{}", self.prompt())?;
            stdout.flush()?;

            line.clear();
            if stdin.lock().read_line(&mut line)? == 0 {
                // End of input behaves like `exit`.
                self.registry.remove_all_by_tag("*");
                return Ok(());
            }
            if self.handle_line(&line, &mut stdout)? == Flow::Exit {
                return Ok(());
            }
        }
    }

    /// Handle one operator line. Split out from [`Repl::run`] so tests can
    /// drive the loop without a terminal.
    pub fn handle_line(&mut self, line: &str, out: &mut dyn Write) -> io::Result<Flow> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(Flow::Continue);
        }
        let (cmd, rest) = line
            .split_once(char::is_whitespace)
            .unwrap_or((line, ""));
        let rest = rest.trim();

        match cmd {
            "run" => self.cmd_run(rest, out)?,
            "settag" => self.cmd_settag(rest),
            "addtag" => self.cmd_addtag(rest, out)?,
            "removetag" => self.cmd_removetag(rest, out)?,
            "settagautos" => self.cmd_settagautos(rest, out)?,
            "tags" => self.cmd_tags(out)?,
            "sessions" => self.cmd_sessions(rest, out)?,
            "disconnect" => self.cmd_disconnect(rest, out)?,
            "help" => writeln!(out, "{}", HELP)?,
            "exit" => {
                self.registry.remove_all_by_tag("*");
                return Ok(Flow::Exit);
            }
            other => writeln!(out, "[-] Unknown command: {} (try 'help')", other)?,
        }
        Ok(Flow::Continue)
    }

    fn cmd_run(&self, rest: &str, out: &mut dyn Write) -> io::Result<()> {
        let Some((tag, text)) = rest.split_once(char::is_whitespace) else {
            return writeln!(out, "[-] Usage: run <tag> <command>");
        };
        let text = text.trim();
        if text.is_empty() {
            return writeln!(out, "[-] Usage: run <tag> <command>");
        }
        let command = Command::new(text, self.clock.as_ref());
        let reached = self.registry.broadcast(tag, &command);
        writeln!(out, "[+] Queued for {} session(s)", reached)
    }

    fn cmd_settag(&self, rest: &str) {
        let tag = rest.split_whitespace().next();
        self.policy.set_default_tag(tag.map(str::to_string));
    }

    fn cmd_addtag(&self, rest: &str, out: &mut dyn Write) -> io::Result<()> {
        let args: Vec<&str> = rest.split_whitespace().collect();
        let (search_tag, new_tag) = match args[..] {
            [search_tag, new_tag] => (search_tag, new_tag),
            _ => return writeln!(out, "[-] Must provide 2 arguments: search tag, and new tag"),
        };
        self.registry.tag_all(search_tag, new_tag);
        Ok(())
    }

    fn cmd_removetag(&self, rest: &str, out: &mut dyn Write) -> io::Result<()> {
        let args: Vec<&str> = rest.split_whitespace().collect();
        let (search_tag, tag) = match args[..] {
            [search_tag, tag] => (search_tag, tag),
            _ => {
                return writeln!(
                    out,
                    "[-] Must provide 2 arguments: search tag, and tag to remove"
                )
            }
        };
        self.registry.untag_all(search_tag, tag);
        Ok(())
    }

    fn cmd_settagautos(&self, rest: &str, out: &mut dyn Write) -> io::Result<()> {
        let args: Vec<&str> = rest.split_whitespace().collect();
        let (tag, file) = match args[..] {
            [tag, file] => (tag, file),
            _ => {
                return writeln!(out, "[-] Must provide 2 arguments: tag, and a file (or 'none')")
            }
        };
        let tag = tag.trim_matches(|c| c == '"' || c == '\'');

        if file == "none" {
            self.policy.clear_autoruns(tag);
            return Ok(());
        }
        match std::fs::read_to_string(file) {
            Ok(contents) => {
                let commands: Vec<String> = contents
                    .lines()
                    .map(str::trim)
                    .filter(|l| !l.is_empty())
                    .map(str::to_string)
                    .collect();
                self.policy.set_autoruns(tag, commands);
                Ok(())
            }
            Err(e) => writeln!(out, "[-] Issue with provided file: {}", e),
        }
    }

    fn cmd_tags(&self, out: &mut dyn Write) -> io::Result<()> {
        let mut counts: Vec<(String, usize)> = self.registry.tag_counts().into_iter().collect();
        // Descending by count; ties broken by tag so the listing is stable.
        counts.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

        let mut table = Table::new(vec!["TAG", "COUNT"]);
        for (tag, count) in counts {
            table.row(vec![tag, count.to_string()]);
        }
        table.render(out)
    }

    fn cmd_sessions(&self, rest: &str, out: &mut dyn Write) -> io::Result<()> {
        let sessions = match rest.split_whitespace().next() {
            Some(tag) => self.registry.find_by_tag(tag),
            None => self.registry.sessions(),
        };

        let mut table = Table::new(vec!["SESSION", "ADDRESS", "TAGS"]);
        for session in sessions {
            table.row(vec![
                session.id().to_string(),
                session.peer_addr().to_string(),
                session.tags().join(", "),
            ]);
        }
        table.render(out)
    }

    fn cmd_disconnect(&self, rest: &str, out: &mut dyn Write) -> io::Result<()> {
        let Some(tag) = rest.split_whitespace().next() else {
            return writeln!(out, "[-] Usage: disconnect <tag>");
        };
        self.registry.remove_all_by_tag(tag);
        Ok(())
    }
}

#[cfg(test)]
#[path = "repl_tests.rs"]
mod tests;
