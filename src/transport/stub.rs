//! In-memory transport driven by tests.

use super::{ConnectionState, Transport, TransportEvent, TransportEventKind, TransportHandler, TransportHandlers};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

pub struct StubTransport {
    handlers: TransportHandlers,
    state: Mutex<ConnectionState>,
    sent: Mutex<Vec<String>>,
    connects: AtomicUsize,
    disconnects: AtomicUsize,
    // Every connect attempt fails straight away while set
    refusing: AtomicBool,
    // A graceful stub reports its own disconnect; otherwise it stays open
    graceful: bool,
}

impl StubTransport {
    pub fn new() -> Self {
        Self {
            handlers: TransportHandlers::new(),
            state: Mutex::new(ConnectionState::Idle),
            sent: Mutex::new(Vec::new()),
            connects: AtomicUsize::new(0),
            disconnects: AtomicUsize::new(0),
            refusing: AtomicBool::new(false),
            graceful: true,
        }
    }

    /// A stub whose `disconnect` does nothing, like a primitive that cannot close
    pub fn stubborn() -> Self {
        Self {
            graceful: false,
            ..Self::new()
        }
    }

    /// Makes later connect attempts fail like an unreachable server
    pub fn refuse_connections(&self) {
        self.refusing.store(true, Ordering::SeqCst);
    }

    pub fn open(&self) {
        self.set_state(ConnectionState::Open);
        self.handlers.fire(TransportEvent::Connect);
    }

    pub fn drop_connection(&self) {
        self.set_state(ConnectionState::Idle);
        self.handlers.fire(TransportEvent::Disconnect);
    }

    pub fn deliver(&self, data: &str) {
        self.handlers.fire(TransportEvent::Message(data.to_string()));
    }

    pub fn fail(&self, reason: &str) {
        self.handlers.fire(TransportEvent::Error(reason.to_string()));
    }

    pub fn sent(&self) -> Vec<String> {
        self.sent.lock().unwrap().clone()
    }

    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    pub fn disconnects(&self) -> usize {
        self.disconnects.load(Ordering::SeqCst)
    }

    fn set_state(&self, state: ConnectionState) {
        *self.state.lock().unwrap() = state;
    }
}

impl Transport for StubTransport {
    fn url(&self) -> &str {
        "stub://channel"
    }

    fn connect(&self) {
        self.connects.fetch_add(1, Ordering::SeqCst);
        self.set_state(ConnectionState::Connecting);
        if self.refusing.load(Ordering::SeqCst) {
            self.fail("connection refused");
            self.drop_connection();
        }
    }

    fn send(&self, message: String) {
        self.sent.lock().unwrap().push(message);
    }

    fn on(&self, kind: TransportEventKind, handler: TransportHandler) {
        self.handlers.register(kind, handler);
    }

    fn state(&self) -> ConnectionState {
        *self.state.lock().unwrap()
    }

    fn disconnect(&self) {
        self.disconnects.fetch_add(1, Ordering::SeqCst);
        if self.graceful && self.state().is_live() {
            self.drop_connection();
        }
    }
}
