use crate::types::{PING_RATE_MS, STALE_THRESHOLD_MS};
use std::time::Duration;
use tokio::time::Instant;

const DEFAULT_PING_RATE: Duration = Duration::from_millis(PING_RATE_MS);
const DEFAULT_STALE_THRESHOLD: Duration = Duration::from_millis(STALE_THRESHOLD_MS);

/// What to do when the heartbeat deadline passes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeartbeatAction {
    /// Still alive, send a keep-alive ping
    Ping,
    /// Nothing heard for too long, the connection is presumed dead
    Stale { silent_for: Duration },
}

/// Idle heartbeat and staleness detection.
///
/// Catches half-open connections that the transport itself never reports.
/// The deadline is armed lazily by the first inbound activity and pushed back
/// by every later one; there is never more than one.
#[derive(Debug, Clone)]
pub struct HeartbeatMonitor {
    interval: Duration,
    stale_after: Duration,
    last_activity: Option<Instant>,
    deadline: Option<Instant>,
}

impl HeartbeatMonitor {
    pub fn new() -> Self {
        Self {
            interval: DEFAULT_PING_RATE,
            stale_after: DEFAULT_STALE_THRESHOLD,
            last_activity: None,
            deadline: None,
        }
    }

    pub fn last_activity(&self) -> Option<Instant> {
        self.last_activity
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Marks inbound activity and re-arms the idle deadline
    pub fn record_activity(&mut self, now: Instant) {
        self.last_activity = Some(now);
        self.deadline = Some(now + self.interval);
    }

    /// True once the silence since the last inbound activity exceeds the
    /// stale threshold. Never true before the first activity.
    pub fn is_late(&self, now: Instant) -> bool {
        self.last_activity
            .is_some_and(|last| now.saturating_duration_since(last) > self.stale_after)
    }

    /// Handles a deadline expiry and re-arms for the next interval
    pub fn on_tick(&mut self, now: Instant) -> HeartbeatAction {
        self.deadline = Some(now + self.interval);

        match self.last_activity {
            Some(last) if self.is_late(now) => HeartbeatAction::Stale {
                silent_for: now.saturating_duration_since(last),
            },
            _ => HeartbeatAction::Ping,
        }
    }

    /// Whether the deadline has passed
    pub fn is_due(&self, now: Instant) -> bool {
        self.deadline.is_some_and(|deadline| deadline <= now)
    }

    /// Disarms the deadline
    pub fn stop(&mut self) {
        self.deadline = None;
    }
}

impl Default for HeartbeatMonitor {
    fn default() -> Self {
        Self::new()
    }
}
