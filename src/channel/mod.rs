// Module declarations
mod builder;
mod core;
mod driver;
mod state;

// Public API exports
pub use builder::{ChannelBuilder, ChannelOptions};
pub use core::Channel;
pub use state::{ChannelSnapshot, ChannelState};
