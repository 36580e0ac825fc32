//! # Sitebricks Channel
//!
//! A resilient client channel to a Sitebricks server, carried over a
//! WebSocket or, where sockets are unavailable, HTTP long-polling.
//!
//! The channel reconnects with cubic backoff, pings when idle, treats a long
//! silence as a dead connection, and reacts to host connectivity changes.
//!
//! ## Example
//!
//! ```no_run
//! use sitebricks_channel_rs::{Channel, ChannelOptions};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let channel = Channel::new(ChannelOptions {
//!         page_url: "http://localhost:8080/chat".to_string(),
//!         url_prefix: "/channel".to_string(),
//!         ..Default::default()
//!     })?;
//!
//!     channel.on_message(|data| println!("{}", data))?;
//!     channel.connect()?;
//!     Ok(())
//! }
//! ```

pub mod channel;
pub mod infrastructure;
pub mod messaging;
pub mod transport;
pub mod types;

pub use channel::{Channel, ChannelBuilder, ChannelOptions, ChannelSnapshot};
pub use messaging::{ChannelEvent, ChannelEventKind, NetworkStatus};
pub use transport::{
    ConnectionState, PersistentSocketTransport, PollingTransport, Transport,
    TransportCapabilities,
};
pub use types::{ChannelError, Result};
