//! Common test utilities for livechannels integration tests
//!
//! Provides a mock realtime WebSocket server that records connection URLs,
//! counts ping frames, and can broadcast frames or force-close sessions.

use futures::{SinkExt, StreamExt};
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::{mpsc, Notify};
use tokio_tungstenite::accept_hdr_async;
use tokio_tungstenite::tungstenite::handshake::server::{
    ErrorResponse, Request, Response,
};
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;

/// Macro for verbose test output (controlled by TEST_VERBOSE env var)
#[macro_export]
macro_rules! verbose_println {
    ($($arg:tt)*) => {
        if std::env::var("TEST_VERBOSE").is_ok() {
            println!($($arg)*);
        }
    };
}

#[derive(Default)]
struct ServerState {
    /// Request URI of every accepted connection, in order
    connect_urls: Mutex<Vec<String>>,
    /// Outbound channel of every session ever opened (dead ones are pruned
    /// on broadcast)
    sessions: Mutex<Vec<mpsc::UnboundedSender<Message>>>,
    open_sessions: AtomicUsize,
    ping_count: AtomicUsize,
}

/// A mock realtime WebSocket server for testing
pub struct MockRealtimeServer {
    pub addr: SocketAddr,
    shutdown: Arc<Notify>,
    state: Arc<ServerState>,
}

impl MockRealtimeServer {
    /// Create and start a new mock server
    pub async fn start() -> Self {
        // Honors RUST_LOG; a no-op after the first test in the binary
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .try_init();

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let shutdown = Arc::new(Notify::new());
        let state = Arc::new(ServerState::default());

        let shutdown_accept = Arc::clone(&shutdown);
        let state_accept = Arc::clone(&state);
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    result = listener.accept() => {
                        match result {
                            Ok((stream, _)) => {
                                let state = Arc::clone(&state_accept);
                                let shutdown = Arc::clone(&shutdown_accept);
                                tokio::spawn(async move {
                                    Self::handle_connection(stream, state, shutdown).await;
                                });
                            }
                            Err(e) => {
                                eprintln!("Accept error: {}", e);
                                break;
                            }
                        }
                    }
                    _ = shutdown_accept.notified() => {
                        break;
                    }
                }
            }
        });

        Self {
            addr,
            shutdown,
            state,
        }
    }

    async fn handle_connection(
        stream: tokio::net::TcpStream,
        state: Arc<ServerState>,
        shutdown: Arc<Notify>,
    ) {
        let state_cb = Arc::clone(&state);
        let callback = move |req: &Request, resp: Response| -> Result<Response, ErrorResponse> {
            state_cb.connect_urls.lock().push(req.uri().to_string());
            Ok(resp)
        };

        let ws_stream = match accept_hdr_async(stream, callback).await {
            Ok(ws) => ws,
            Err(e) => {
                eprintln!("WebSocket handshake failed: {}", e);
                return;
            }
        };

        let (mut write, mut read) = ws_stream.split();
        let (out_tx, mut out_rx) = mpsc::unbounded_channel();
        state.sessions.lock().push(out_tx);
        state.open_sessions.fetch_add(1, Ordering::SeqCst);

        loop {
            tokio::select! {
                msg = read.next() => {
                    match msg {
                        Some(Ok(Message::Text(text))) => {
                            if text.contains(r#""ping""#) {
                                state.ping_count.fetch_add(1, Ordering::SeqCst);
                                let pong = Message::Text(r#"{"type":"pong"}"#.to_string());
                                if write.send(pong).await.is_err() {
                                    break;
                                }
                            }
                        }
                        Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                        Some(Ok(_)) => {}
                    }
                }
                out = out_rx.recv() => {
                    match out {
                        Some(msg) => {
                            let is_close = msg.is_close();
                            if write.send(msg).await.is_err() {
                                break;
                            }
                            if is_close {
                                break;
                            }
                        }
                        None => break,
                    }
                }
                _ = shutdown.notified() => {
                    break;
                }
            }
        }

        state.open_sessions.fetch_sub(1, Ordering::SeqCst);
    }

    /// WebSocket endpoint base for this server
    pub fn endpoint(&self) -> String {
        format!("ws://{}", self.addr)
    }

    /// Total number of connections ever accepted
    pub fn connection_count(&self) -> usize {
        self.state.connect_urls.lock().len()
    }

    /// Number of currently-open sessions
    pub fn open_sessions(&self) -> usize {
        self.state.open_sessions.load(Ordering::SeqCst)
    }

    /// Request URI of the most recent connection
    pub fn last_connect_url(&self) -> Option<String> {
        self.state.connect_urls.lock().last().cloned()
    }

    /// Number of ping frames received across all sessions
    pub fn ping_count(&self) -> usize {
        self.state.ping_count.load(Ordering::SeqCst)
    }

    /// Broadcast an event frame to every open session
    pub fn broadcast_event(&self, channels: &[&str], payload: Value) {
        let frame = json!({
            "type": "event",
            "data": {
                "channels": channels,
                "payload": payload,
                "timestamp": "2024-01-01T00:00:00Z",
            }
        });
        self.broadcast_raw(&frame.to_string());
    }

    /// Broadcast an arbitrary text frame to every open session
    pub fn broadcast_raw(&self, text: &str) {
        let msg = Message::Text(text.to_string());
        self.state
            .sessions
            .lock()
            .retain(|tx| tx.send(msg.clone()).is_ok());
    }

    /// Close every open session with a normal close code (simulates a
    /// server-initiated disconnect)
    pub fn close_all_sessions(&self) {
        let frame = CloseFrame {
            code: CloseCode::Normal,
            reason: "".into(),
        };
        let msg = Message::Close(Some(frame));
        self.state
            .sessions
            .lock()
            .retain(|tx| tx.send(msg.clone()).is_ok());
    }

    /// Shutdown the server
    pub fn shutdown(&self) {
        self.shutdown.notify_waiters();
    }
}

impl Drop for MockRealtimeServer {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Poll `condition` every 25ms until it holds or `timeout` elapses
pub async fn wait_until<F>(condition: F, timeout: Duration) -> bool
where
    F: Fn() -> bool,
{
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        if condition() {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
}
