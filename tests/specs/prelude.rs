//! Shared harness: a listening console and fake TCP agents.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::io::AsyncReadExt;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::time::{sleep, timeout};

use drover_core::{
    Command, ConnectPolicy, FakeClock, ResponseSink, SequentialIdGen, Session, SessionRegistry,
};
use drover_server::{DispatchConfig, Listener};

/// Records `(session id, command text, result)` per delivered response.
#[derive(Default)]
pub struct RecordingSink {
    pub delivered: Mutex<Vec<(String, String, Option<String>)>>,
}

impl ResponseSink for RecordingSink {
    fn deliver(&self, session: &Session, command: &Command) {
        self.delivered.lock().push((
            session.id().to_string(),
            command.text().to_string(),
            command.result().map(str::to_string),
        ));
    }
}

/// A console listening on an ephemeral localhost port.
pub struct Console {
    pub registry: Arc<SessionRegistry>,
    pub policy: Arc<ConnectPolicy>,
    pub sink: Arc<RecordingSink>,
    pub clock: Arc<FakeClock>,
    pub addr: SocketAddr,
}

impl Console {
    pub async fn start() -> Self {
        Self::start_with(ConnectPolicy::new()).await
    }

    /// Start with a pre-configured policy, for autorun and default-tag
    /// scenarios that must be in place before the first agent connects.
    pub async fn start_with(policy: ConnectPolicy) -> Self {
        let registry = Arc::new(SessionRegistry::new());
        let policy = Arc::new(policy);
        let sink = Arc::new(RecordingSink::default());
        let clock = Arc::new(FakeClock::at(2026, 8, 23, 12, 0, 0));

        let listener = Listener::bind(
            "127.0.0.1:0",
            Arc::clone(&registry),
            Arc::clone(&policy),
            Arc::clone(&sink) as Arc<dyn ResponseSink>,
            Arc::clone(&clock) as _,
            Arc::new(SequentialIdGen::new("s")),
            DispatchConfig {
                queue_wait: Duration::from_millis(50),
                idle_window: Duration::from_millis(50),
            },
        )
        .await
        .unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(listener.run());

        Self {
            registry,
            policy,
            sink,
            clock,
            addr,
        }
    }

    pub async fn agent(&self) -> Agent {
        let stream = TcpStream::connect(self.addr).await.unwrap();
        Agent { stream }
    }

    pub fn command(&self, text: &str) -> Command {
        Command::new(text, self.clock.as_ref())
    }

    pub async fn wait_sessions(&self, count: usize) {
        wait_for(|| self.registry.len() == count).await;
    }

    pub async fn wait_deliveries(&self, count: usize) {
        wait_for(|| self.sink.delivered.lock().len() >= count).await;
    }
}

/// The remote end: a scripted agent over a real TCP socket.
pub struct Agent {
    stream: TcpStream,
}

impl Agent {
    /// Read up to and including the next newline.
    pub async fn expect_command(&mut self) -> String {
        let mut line = Vec::new();
        let mut byte = [0u8; 1];
        timeout(Duration::from_secs(2), async {
            loop {
                let n = self.stream.read(&mut byte).await.unwrap();
                assert_ne!(n, 0, "console closed the connection mid-command");
                line.push(byte[0]);
                if byte[0] == b'\n' {
                    break;
                }
            }
        })
        .await
        .unwrap();
        String::from_utf8(line).unwrap()
    }

    pub async fn respond(&mut self, data: &str) {
        self.stream.write_all(data.as_bytes()).await.unwrap();
    }

    /// The console closed our connection.
    pub async fn expect_closed(&mut self) {
        let mut buf = [0u8; 16];
        let n = timeout(Duration::from_secs(2), self.stream.read(&mut buf))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(n, 0, "expected the connection to be closed");
    }
}

pub async fn wait_for<F: Fn() -> bool>(cond: F) {
    timeout(Duration::from_secs(2), async {
        while !cond() {
            sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .unwrap();
}
