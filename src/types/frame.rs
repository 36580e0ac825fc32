use super::constants::{FRAME_SEPARATOR, PING_EVENT};

/// One outbound payload, optionally tagged with an event name.
///
/// On the wire a tagged frame is `"<event>:<data>"`; an untagged frame is the
/// data unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundFrame {
    pub event: Option<String>,
    pub data: String,
}

impl OutboundFrame {
    pub fn new(data: impl Into<String>) -> Self {
        Self {
            event: None,
            data: data.into(),
        }
    }

    pub fn with_event(mut self, event: impl Into<String>) -> Self {
        self.event = Some(event.into());
        self
    }

    /// The keep-alive frame, `"ping:"`
    pub fn ping() -> Self {
        Self::new("").with_event(PING_EVENT)
    }

    pub fn encode(&self) -> String {
        match &self.event {
            Some(event) => format!("{}{}{}", event, FRAME_SEPARATOR, self.data),
            None => self.data.clone(),
        }
    }
}

impl std::fmt::Display for OutboundFrame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.encode())
    }
}
