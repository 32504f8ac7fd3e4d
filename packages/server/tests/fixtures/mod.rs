//! Shared fixtures for the integration tests.
//!
//! Starts the relay in-process on an ephemeral port with a deterministic
//! translator, and provides a small WebSocket client that pairs requests
//! with their acknowledgments.

#![allow(dead_code)]

use std::{
    collections::VecDeque,
    net::SocketAddr,
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use clap::Parser;
use futures_util::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio::{
    net::{TcpListener, TcpStream},
    sync::oneshot,
};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message};
use tsuyaku_server::{
    Config,
    domain::{LanguageCode, Translator, TranslatorError},
    infrastructure::auth::issue_token,
};

pub const SECRET: &str = "integration-test-secret";

const EVENT_TIMEOUT: Duration = Duration::from_secs(5);

/// Translator returning `[{target}] {text}` and counting its calls
#[derive(Default)]
pub struct FakeTranslator {
    calls: AtomicUsize,
    failing: AtomicBool,
    delay: Option<Duration>,
}

impl FakeTranslator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every call fails with a 503 from the engine
    pub fn failing() -> Self {
        Self {
            failing: AtomicBool::new(true),
            ..Self::default()
        }
    }

    /// Every call takes `delay` before answering
    pub fn slow(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Translator for FakeTranslator {
    async fn translate(
        &self,
        text: &str,
        _source: &LanguageCode,
        target: &LanguageCode,
    ) -> Result<String, TranslatorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(TranslatorError::Status {
                status: 503,
                body: "engine unavailable".to_string(),
            });
        }
        Ok(format!("[{target}] {text}"))
    }
}

/// Test server running in the current runtime
pub struct TestServer {
    addr: SocketAddr,
    shutdown: Option<oneshot::Sender<()>>,
    pub translator: Arc<FakeTranslator>,
}

impl TestServer {
    pub async fn start() -> Self {
        Self::start_with(FakeTranslator::new()).await
    }

    pub async fn start_with(translator: FakeTranslator) -> Self {
        let translator = Arc::new(translator);
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind test listener");
        let addr = listener.local_addr().expect("Listener has no address");

        let config = Config::try_parse_from([
            "tsuyaku-server",
            "--jwt-secret",
            SECRET,
            "--job-backoff-ms",
            "10",
            "--translate-timeout-secs",
            "5",
            "--auth-grace-secs",
            "1",
        ])
        .expect("Invalid test configuration");

        let (shutdown, signal) = oneshot::channel::<()>();
        let engine: Arc<dyn Translator> = translator.clone();
        tokio::spawn(async move {
            let shutdown = async {
                let _ = signal.await;
            };
            if let Err(e) = tsuyaku_server::serve(listener, &config, engine, shutdown).await {
                eprintln!("Test server failed: {e}");
            }
        });

        Self {
            addr,
            shutdown: Some(shutdown),
            translator,
        }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn ws_url(&self) -> String {
        format!("ws://{}/ws", self.addr)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
    }
}

/// Token for `user_id` valid for an hour
pub fn token_for(user_id: &str, username: &str) -> String {
    issue_token(SECRET, user_id, username, Duration::from_secs(3600))
        .expect("Failed to issue test token")
}

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// WebSocket client that matches acknowledgments to requests
pub struct WsClient {
    socket: Socket,
    next_request_id: u64,
    /// Events received while waiting for an acknowledgment
    pending: VecDeque<Value>,
}

impl WsClient {
    /// Connect with the credential in the handshake
    pub async fn connect(server: &TestServer, user_id: &str, username: &str) -> Self {
        let url = format!("{}?token={}", server.ws_url(), token_for(user_id, username));
        Self::connect_url(&url).await
    }

    /// Connect without a credential
    pub async fn connect_anonymous(server: &TestServer) -> Self {
        Self::connect_url(&server.ws_url()).await
    }

    pub async fn connect_url(url: &str) -> Self {
        let (socket, _) = connect_async(url)
            .await
            .expect("Failed to connect to WebSocket");
        Self {
            socket,
            next_request_id: 1,
            pending: VecDeque::new(),
        }
    }

    pub async fn send_json(&mut self, value: Value) {
        self.socket
            .send(Message::Text(value.to_string().into()))
            .await
            .expect("Failed to send frame");
    }

    /// Send `frame` with a fresh `request_id` and return the `response` of its ack
    pub async fn request(&mut self, mut frame: Value) -> Value {
        let request_id = self.next_request_id;
        self.next_request_id += 1;
        frame["request_id"] = json!(request_id);
        self.send_json(frame).await;

        loop {
            let event = self.read_frame().await;
            if event["event"] == "ack" && event["request_id"] == json!(request_id) {
                return event["response"].clone();
            }
            self.pending.push_back(event);
        }
    }

    /// Next server event, buffered ones first
    pub async fn next_event(&mut self) -> Value {
        match self.pending.pop_front() {
            Some(event) => event,
            None => self.read_frame().await,
        }
    }

    /// Skip events until one named `name` arrives
    pub async fn expect_event(&mut self, name: &str) -> Value {
        loop {
            let event = self.next_event().await;
            if event["event"] == name {
                return event;
            }
        }
    }

    /// Assert that no event named `name` arrives within `wait`
    pub async fn assert_no_event(&mut self, name: &str, wait: Duration) {
        assert!(
            self.pending.iter().all(|event| event["event"] != name),
            "unexpected buffered '{name}' event"
        );
        let deadline = tokio::time::Instant::now() + wait;
        while let Ok(Some(Ok(msg))) =
            tokio::time::timeout_at(deadline, self.socket.next()).await
        {
            if let Message::Text(text) = msg {
                let event: Value = serde_json::from_str(text.as_str()).expect("Invalid JSON");
                assert_ne!(event["event"], name, "unexpected '{name}' event: {event}");
                self.pending.push_back(event);
            }
        }
    }

    /// True once the server has closed the socket
    pub async fn is_closed(&mut self) -> bool {
        loop {
            match tokio::time::timeout(EVENT_TIMEOUT, self.socket.next()).await {
                Ok(Some(Ok(Message::Close(_)))) | Ok(Some(Err(_))) | Ok(None) => return true,
                Ok(Some(Ok(_))) => continue,
                Err(_) => return false,
            }
        }
    }

    async fn read_frame(&mut self) -> Value {
        loop {
            let msg = tokio::time::timeout(EVENT_TIMEOUT, self.socket.next())
                .await
                .expect("Timed out waiting for a server event")
                .expect("Socket closed")
                .expect("WebSocket error");
            if let Message::Text(text) = msg {
                return serde_json::from_str(text.as_str()).expect("Invalid JSON from server");
            }
        }
    }
}
