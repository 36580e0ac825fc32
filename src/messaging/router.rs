use super::{ChannelEvent, ChannelEventKind};
use std::sync::Arc;

/// Application callback for channel notifications
pub type Callback = Arc<dyn Fn(ChannelEvent) + Send + Sync + 'static>;

/// Routes channel notifications to the application.
///
/// One slot per event kind, not a list: the last registration wins.
#[derive(Default)]
pub struct CallbackRouter {
    message: Option<Callback>,
    connect: Option<Callback>,
    disconnect: Option<Callback>,
}

impl CallbackRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs `callback` for `kind`, returning true if it replaced one
    pub fn register(&mut self, kind: ChannelEventKind, callback: Callback) -> bool {
        let replaced = self.slot_mut(kind).replace(callback).is_some();
        if replaced {
            tracing::debug!("Replaced '{}' callback", kind);
        }
        replaced
    }

    /// Delivers an event to its callback.
    /// Returns false when no callback is registered for its kind.
    pub fn dispatch(&self, event: ChannelEvent) -> bool {
        match self.slot(event.kind()) {
            Some(callback) => {
                callback(event);
                true
            }
            None => false,
        }
    }

    fn slot(&self, kind: ChannelEventKind) -> &Option<Callback> {
        match kind {
            ChannelEventKind::Message => &self.message,
            ChannelEventKind::Connect => &self.connect,
            ChannelEventKind::Disconnect => &self.disconnect,
        }
    }

    fn slot_mut(&mut self, kind: ChannelEventKind) -> &mut Option<Callback> {
        match kind {
            ChannelEventKind::Message => &mut self.message,
            ChannelEventKind::Connect => &mut self.connect,
            ChannelEventKind::Disconnect => &mut self.disconnect,
        }
    }
}
