use crate::infrastructure::{HeartbeatMonitor, PresenceProbe, ReconnectController};
use crate::messaging::{CallbackRouter, NetworkStatus};
use crate::transport::ConnectionState;
use tokio::time::Instant;

/// Consolidated mutable state of a channel.
/// Owned by the driver task alone, so transitions never contend.
pub struct ChannelState {
    /// Whether `connect()` has been called
    pub started: bool,

    /// Application callbacks, one per event kind
    pub callbacks: CallbackRouter,

    /// Attempt counter and pending reconnect
    pub reconnect: ReconnectController,

    /// Last inbound activity and pending ping
    pub heartbeat: HeartbeatMonitor,

    /// Last reported host connectivity
    pub presence: PresenceProbe,
}

impl ChannelState {
    pub fn new() -> Self {
        Self {
            started: false,
            callbacks: CallbackRouter::new(),
            reconnect: ReconnectController::new(),
            heartbeat: HeartbeatMonitor::new(),
            presence: PresenceProbe::new(),
        }
    }

    pub fn snapshot(&self, transport_state: ConnectionState, now: Instant) -> ChannelSnapshot {
        ChannelSnapshot {
            started: self.started,
            transport_state,
            attempts: self.reconnect.attempts(),
            reconnect_at: self.reconnect.deadline(),
            heartbeat_at: self.heartbeat.deadline(),
            last_activity: self.heartbeat.last_activity(),
            heartbeat_late: self.heartbeat.is_late(now),
            network: self.presence.last_status(),
        }
    }
}

impl Default for ChannelState {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time view of a channel, for diagnostics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelSnapshot {
    pub started: bool,
    pub transport_state: ConnectionState,
    /// Reconnect attempt counter
    pub attempts: u32,
    /// When the pending reconnect fires
    pub reconnect_at: Option<Instant>,
    /// When the next heartbeat tick fires
    pub heartbeat_at: Option<Instant>,
    /// Last inbound message or successful connect
    pub last_activity: Option<Instant>,
    pub heartbeat_late: bool,
    pub network: Option<NetworkStatus>,
}
