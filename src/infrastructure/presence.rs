use crate::messaging::NetworkStatus;

/// Outcome of a connectivity change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresenceDecision {
    /// Leave the channel alone
    Ignore,
    /// Tear the transport down and go through the reconnect path.
    /// `accelerate` restarts the backoff curve first.
    ForceReconnect { accelerate: bool },
}

/// Turns host online/offline signals into reconnect decisions.
///
/// Going offline is authoritative and always forces a reconnect. Coming back
/// online only does so when the channel is visibly broken: a backoff cycle is
/// under way or the heartbeat is late.
#[derive(Debug, Clone, Default)]
pub struct PresenceProbe {
    last_status: Option<NetworkStatus>,
}

impl PresenceProbe {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_status(&self) -> Option<NetworkStatus> {
        self.last_status
    }

    pub fn observe(
        &mut self,
        status: NetworkStatus,
        in_backoff: bool,
        heartbeat_late: bool,
    ) -> PresenceDecision {
        self.last_status = Some(status);

        match status {
            NetworkStatus::Offline => PresenceDecision::ForceReconnect { accelerate: false },
            NetworkStatus::Online if in_backoff || heartbeat_late => {
                PresenceDecision::ForceReconnect { accelerate: true }
            }
            NetworkStatus::Online => PresenceDecision::Ignore,
        }
    }
}
