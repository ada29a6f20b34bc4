// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! drover-core: session registry, tag addressing, and command model for the
//! drover shell console.
//!
//! This crate is the concurrency core: the registry of live agent sessions,
//! the tag-based addressing scheme, and the per-session outbound command
//! queue. Network I/O and the operator surface live in the `drover-server`
//! and `drover` crates and talk to each other only through the types here.

pub mod clock;
pub mod command;
pub mod id;
pub mod policy;
pub mod registry;
pub mod session;
pub mod sink;

pub use clock::{Clock, FakeClock, SystemClock};
pub use command::Command;
pub use id::{IdGen, SequentialIdGen, SessionId, TokenIdGen};
pub use policy::ConnectPolicy;
pub use registry::SessionRegistry;
pub use session::{CommandQueue, Session};
pub use sink::ResponseSink;
