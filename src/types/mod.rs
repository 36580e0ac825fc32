pub mod constants;
pub mod error;
pub mod frame;

pub use constants::*;
pub use error::{ChannelError, Result};
pub use frame::OutboundFrame;
