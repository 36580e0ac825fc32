use crate::types::constants::event_names;
use crate::types::{ChannelError, Result};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Kinds of notification a channel delivers to the application.
///
/// Each kind has exactly one callback slot; registering again replaces the
/// previous callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelEventKind {
    /// Inbound data from the server
    Message,

    /// The channel came back after a disconnect (never the initial connect)
    Connect,

    /// The channel has been down for more than a few attempts
    Disconnect,
}

impl ChannelEventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Message => event_names::MESSAGE,
            Self::Connect => event_names::CONNECT,
            Self::Disconnect => event_names::DISCONNECT,
        }
    }
}

impl FromStr for ChannelEventKind {
    type Err = ChannelError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            event_names::MESSAGE => Ok(Self::Message),
            event_names::CONNECT => Ok(Self::Connect),
            event_names::DISCONNECT => Ok(Self::Disconnect),
            other => Err(ChannelError::InvalidEventKind(other.to_string())),
        }
    }
}

impl std::fmt::Display for ChannelEventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A notification handed to an application callback
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelEvent {
    Message(String),
    Connect,
    Disconnect,
}

impl ChannelEvent {
    pub fn kind(&self) -> ChannelEventKind {
        match self {
            Self::Message(_) => ChannelEventKind::Message,
            Self::Connect => ChannelEventKind::Connect,
            Self::Disconnect => ChannelEventKind::Disconnect,
        }
    }
}

/// Host connectivity as reported by the environment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NetworkStatus {
    Online,
    Offline,
}
