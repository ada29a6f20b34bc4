// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! TCP acceptor for inbound agent connections.
//!
//! Each accepted connection gets a fresh session, registered before its
//! dispatch task starts, so operator commands can address it immediately.
//! Acceptance never waits on any connection's dispatch loop.

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::{TcpListener, TcpStream, ToSocketAddrs};
use tracing::{error, info};

use drover_core::{Clock, ConnectPolicy, IdGen, ResponseSink, Session, SessionRegistry};

use crate::dispatch::{DispatchConfig, Dispatcher};

/// Acceptor for inbound agent connections.
pub struct Listener {
    socket: TcpListener,
    registry: Arc<SessionRegistry>,
    policy: Arc<ConnectPolicy>,
    sink: Arc<dyn ResponseSink>,
    clock: Arc<dyn Clock>,
    ids: Arc<dyn IdGen>,
    config: DispatchConfig,
}

impl Listener {
    /// Bind the listening socket. `addr` is typically `0.0.0.0:<port>`;
    /// tests bind port 0 and read back [`Listener::local_addr`].
    pub async fn bind(
        addr: impl ToSocketAddrs,
        registry: Arc<SessionRegistry>,
        policy: Arc<ConnectPolicy>,
        sink: Arc<dyn ResponseSink>,
        clock: Arc<dyn Clock>,
        ids: Arc<dyn IdGen>,
        config: DispatchConfig,
    ) -> io::Result<Self> {
        let socket = TcpListener::bind(addr).await?;
        Ok(Self {
            socket,
            registry,
            policy,
            sink,
            clock,
            ids,
            config,
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    /// Accept connections forever, spawning a dispatch task per connection.
    pub async fn run(self) {
        loop {
            match self.socket.accept().await {
                Ok((stream, peer)) => self.accept(stream, peer),
                Err(e) => {
                    error!("accept error: {}", e);
                }
            }
        }
    }

    fn accept(&self, stream: TcpStream, peer: SocketAddr) {
        let peer_ip = peer.ip().to_string();
        let (session, queue) = Session::connect(
            &peer_ip,
            &self.policy,
            self.ids.as_ref(),
            self.clock.as_ref(),
        );
        info!(id = %session.id(), peer = %peer_ip, "connection");

        self.registry.add(Arc::clone(&session));

        let dispatcher = Dispatcher::new(
            stream,
            session,
            queue,
            Arc::clone(&self.registry),
            Arc::clone(&self.sink),
            self.config,
        );
        tokio::spawn(dispatcher.run());
    }
}

#[cfg(test)]
#[path = "listener_tests.rs"]
mod tests;
