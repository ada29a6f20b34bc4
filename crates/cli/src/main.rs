// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! drover - tag-addressed console for inbound shell sessions
//!
//! The binary wires the pieces together: a tokio runtime running the
//! connection acceptor, and the operator REPL running synchronously on the
//! main thread. The two sides share only the session registry and the
//! connect policy.

mod output;
mod repl;
mod table;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing::info;

use drover_core::{ConnectPolicy, ResponseSink, SessionRegistry, SystemClock, TokenIdGen};
use drover_server::{DispatchConfig, Listener};

#[derive(Parser)]
#[command(
    name = "drover",
    version,
    about = "Tag-addressed console for inbound shell sessions"
)]
struct Cli {
    /// Port to listen on, across all local addresses
    port: u16,

    /// Directory for response output files; responses print to the console
    /// when unset
    #[arg(long)]
    out: Option<PathBuf>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging();

    let registry = Arc::new(SessionRegistry::new());
    let policy = Arc::new(ConnectPolicy::new());
    let clock = Arc::new(SystemClock);
    let sink: Arc<dyn ResponseSink> = match &cli.out {
        Some(dir) => Arc::new(output::FileSink::new(dir.clone())),
        None => Arc::new(output::ConsoleSink),
    };

    let runtime = tokio::runtime::Runtime::new()?;
    let listener = runtime.block_on(Listener::bind(
        ("0.0.0.0", cli.port),
        Arc::clone(&registry),
        Arc::clone(&policy),
        sink,
        Arc::clone(&clock) as _,
        Arc::new(TokenIdGen),
        DispatchConfig::default(),
    ))?;
    info!(port = cli.port, "listening for agents");
    runtime.spawn(listener.run());

    let mut repl = repl::Repl::new(registry, policy, clock);
    repl.run()?;

    // `exit` has already disconnected every session; dropping the runtime
    // tears down the acceptor and any lingering dispatch tasks.
    drop(runtime);
    Ok(())
}

fn setup_logging() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
}
