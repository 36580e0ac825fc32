use crate::types::{
    BACKOFF_CAP, BACKOFF_UNIT_MS, DISCONNECT_REPORT_THRESHOLD, RECONNECT_FALLBACK_MS,
};
use std::time::Duration;
use tokio::time::Instant;

/// Delay before reconnect attempt `attempts`: `attempts³ × 100 ms`.
///
/// Falls back to 1001 ms when the curve overflows.
pub fn backoff_delay(attempts: u32) -> Duration {
    attempts
        .checked_pow(3)
        .and_then(|cubed| u64::from(cubed).checked_mul(BACKOFF_UNIT_MS))
        .map(Duration::from_millis)
        .unwrap_or(Duration::from_millis(RECONNECT_FALLBACK_MS))
}

/// What a disconnect did to the controller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisconnectOutcome {
    /// Counter value after the increment
    pub attempts: u32,
    /// Whether the application should be told the channel is down
    pub report: bool,
    /// Delay before the next connect attempt
    pub delay: Duration,
}

/// Reconnect state machine with cubic backoff.
///
/// The counter lives in `[0, BACKOFF_CAP]`, starts at 0, is reset to 0 by a
/// successful connect and grows by one per disconnect. Only presence-driven
/// acceleration moves it down (to 1). At most one reconnect is pending.
#[derive(Debug, Clone)]
pub struct ReconnectController {
    attempts: u32,
    cap: u32,
    report_threshold: u32,
    pending: Option<Instant>,
}

impl ReconnectController {
    pub fn new() -> Self {
        Self {
            attempts: 0,
            cap: BACKOFF_CAP,
            report_threshold: DISCONNECT_REPORT_THRESHOLD,
            pending: None,
        }
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// An active backoff cycle is one past its first attempt
    pub fn in_backoff(&self) -> bool {
        self.attempts > 1
    }

    /// Deadline of the pending reconnect, if one is scheduled
    pub fn deadline(&self) -> Option<Instant> {
        self.pending
    }

    /// Records a successful connect.
    ///
    /// Returns true when this was a reconnect rather than the first connect.
    pub fn on_connect(&mut self) -> bool {
        let was_reconnect = self.attempts > 0;
        self.attempts = 0;
        self.pending = None;
        was_reconnect
    }

    /// Records a disconnect and schedules the next attempt, replacing any
    /// attempt already pending.
    pub fn on_disconnect(&mut self, now: Instant) -> DisconnectOutcome {
        if self.attempts < self.cap {
            self.attempts += 1;
        }

        let delay = backoff_delay(self.attempts);
        self.pending = Some(now + delay);

        DisconnectOutcome {
            attempts: self.attempts,
            report: self.attempts > self.report_threshold,
            delay,
        }
    }

    /// Restarts the backoff curve at its first step
    pub fn accelerate(&mut self) {
        self.attempts = 1;
    }

    /// Consumes the pending reconnect if it is due
    pub fn take_due(&mut self, now: Instant) -> bool {
        match self.pending {
            Some(deadline) if deadline <= now => {
                self.pending = None;
                true
            }
            _ => false,
        }
    }

    /// Drops any pending reconnect
    pub fn cancel(&mut self) {
        self.pending = None;
    }
}

impl Default for ReconnectController {
    fn default() -> Self {
        Self::new()
    }
}
