// Messaging module - Channel notifications and callback routing
pub mod event;
pub mod router;

pub use event::{ChannelEvent, ChannelEventKind, NetworkStatus};
pub use router::{Callback, CallbackRouter};
