//! Pluggable conduits between the channel and the server.
//!
//! A [`Transport`] is non-blocking: `connect` and `disconnect` only initiate,
//! and every outcome comes back as a [`TransportEvent`] through the handler
//! registered for its kind.

mod factory;
mod polling;
#[cfg(test)]
pub(crate) mod stub;
mod websocket;

pub use factory::{SelectedTransport, TransportCapabilities, TransportFactory, TransportKind};
pub use polling::PollingTransport;
pub use websocket::PersistentSocketTransport;

use crate::types::constants::event_names;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

/// Connection state of a transport
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    Idle,
    Connecting,
    Open,
    Closing,
}

impl ConnectionState {
    /// Open or on its way there
    pub fn is_live(self) -> bool {
        matches!(self, Self::Connecting | Self::Open)
    }
}

/// Event kinds a transport reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransportEventKind {
    Connect,
    Disconnect,
    Error,
    Message,
}

impl TransportEventKind {
    pub const ALL: [TransportEventKind; 4] =
        [Self::Connect, Self::Disconnect, Self::Error, Self::Message];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Connect => event_names::CONNECT,
            Self::Disconnect => event_names::DISCONNECT,
            Self::Error => event_names::ERROR,
            Self::Message => event_names::MESSAGE,
        }
    }
}

/// An event reported by a transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    Connect,
    Disconnect,
    Error(String),
    Message(String),
}

impl TransportEvent {
    pub fn kind(&self) -> TransportEventKind {
        match self {
            Self::Connect => TransportEventKind::Connect,
            Self::Disconnect => TransportEventKind::Disconnect,
            Self::Error(_) => TransportEventKind::Error,
            Self::Message(_) => TransportEventKind::Message,
        }
    }
}

pub type TransportHandler = Arc<dyn Fn(TransportEvent) + Send + Sync + 'static>;

/// Handler registry shared between a transport and its background tasks.
/// One handler per event kind; the last registration wins.
#[derive(Clone, Default)]
pub struct TransportHandlers {
    slots: Arc<RwLock<HashMap<TransportEventKind, TransportHandler>>>,
}

impl TransportHandlers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, kind: TransportEventKind, handler: TransportHandler) {
        self.slots
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(kind, handler);
    }

    /// Invokes the handler for the event's kind, if any
    pub fn fire(&self, event: TransportEvent) {
        let handler = self
            .slots
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&event.kind())
            .cloned(); // Lock released before the handler runs

        match handler {
            Some(handler) => handler(event),
            None => tracing::debug!("No '{}' handler registered", event.kind().as_str()),
        }
    }
}

/// A conduit carrying opaque string messages to and from the server.
///
/// Contract shared by every implementation:
/// - `connect` starts a conduit and is ignored while one is live; success
///   fires `Connect`, failure or a server close fires `Disconnect`.
/// - `send` is fire-and-forget and silently drops the message unless open.
/// - `disconnect` on a live transport is followed by a `Disconnect` event.
/// - a conduit that ends because of an error fires `Error` and then
///   `Disconnect`, so each failure is reported as exactly one disconnect.
pub trait Transport: Send + Sync + 'static {
    /// Endpoint this transport talks to
    fn url(&self) -> &str;

    fn connect(&self);

    fn send(&self, message: String);

    fn on(&self, kind: TransportEventKind, handler: TransportHandler);

    fn state(&self) -> ConnectionState;

    fn is_open(&self) -> bool {
        self.state() == ConnectionState::Open
    }

    fn disconnect(&self);
}
