use super::{
    ConnectionState, PersistentSocketTransport, PollingTransport, Transport, TransportEventKind,
    TransportHandler,
};
use crate::infrastructure::Endpoints;
use serde::{Deserialize, Serialize};

/// What the hosting environment can do
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportCapabilities {
    /// WebSocket connections are available
    pub websocket: bool,
}

impl Default for TransportCapabilities {
    fn default() -> Self {
        Self { websocket: true }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportKind {
    PersistentSocket,
    Polling,
}

/// The transport picked for a channel, fixed for its whole life
pub enum SelectedTransport {
    Socket(PersistentSocketTransport),
    Polling(PollingTransport),
}

impl SelectedTransport {
    pub fn kind(&self) -> TransportKind {
        match self {
            Self::Socket(_) => TransportKind::PersistentSocket,
            Self::Polling(_) => TransportKind::Polling,
        }
    }
}

impl Transport for SelectedTransport {
    fn url(&self) -> &str {
        match self {
            Self::Socket(t) => t.url(),
            Self::Polling(t) => t.url(),
        }
    }

    fn connect(&self) {
        match self {
            Self::Socket(t) => t.connect(),
            Self::Polling(t) => t.connect(),
        }
    }

    fn send(&self, message: String) {
        match self {
            Self::Socket(t) => t.send(message),
            Self::Polling(t) => t.send(message),
        }
    }

    fn on(&self, kind: TransportEventKind, handler: TransportHandler) {
        match self {
            Self::Socket(t) => t.on(kind, handler),
            Self::Polling(t) => t.on(kind, handler),
        }
    }

    fn state(&self) -> ConnectionState {
        match self {
            Self::Socket(t) => t.state(),
            Self::Polling(t) => t.state(),
        }
    }

    fn disconnect(&self) {
        match self {
            Self::Socket(t) => t.disconnect(),
            Self::Polling(t) => t.disconnect(),
        }
    }
}

/// Factory choosing between the socket and long-poll transports
pub struct TransportFactory;

impl TransportFactory {
    /// Prefers the persistent socket whenever the environment supports it
    pub fn create(endpoints: &Endpoints, capabilities: TransportCapabilities) -> SelectedTransport {
        if capabilities.websocket {
            tracing::debug!("Selected WebSocket transport: {}", endpoints.socket);
            SelectedTransport::Socket(PersistentSocketTransport::new(endpoints.socket.clone()))
        } else {
            tracing::debug!("Selected long-poll transport: {}", endpoints.polling);
            SelectedTransport::Polling(PollingTransport::new(endpoints.polling.clone()))
        }
    }
}
