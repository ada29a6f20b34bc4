// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! drover-server: the connection acceptor and per-connection dispatch loop.
//!
//! Network I/O lives here. Each accepted agent connection gets its own
//! spawned task running the dispatch state machine; the operator thread
//! never touches a socket and talks to connections only through the
//! session registry in `drover-core`.

pub mod dispatch;
pub mod listener;

pub use dispatch::{DispatchConfig, DispatchError, Dispatcher};
pub use listener::Listener;
