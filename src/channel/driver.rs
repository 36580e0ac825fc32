use super::state::{ChannelSnapshot, ChannelState};
use crate::infrastructure::{HeartbeatAction, PresenceDecision};
use crate::messaging::{Callback, ChannelEvent, ChannelEventKind, NetworkStatus};
use crate::transport::{Transport, TransportEvent};
use crate::types::OutboundFrame;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{self, Instant};

/// Everything the driver reacts to besides its own timers
pub(crate) enum Signal {
    Start,
    Transport(TransportEvent),
    Register(ChannelEventKind, Callback),
    ForceReconnect,
    Network(NetworkStatus),
    Inspect(oneshot::Sender<ChannelSnapshot>),
    Shutdown,
}

/// Sends a frame if the transport is open; otherwise it is dropped
pub(crate) fn send_if_open<T: Transport>(transport: &T, frame: &OutboundFrame) -> bool {
    if !transport.is_open() {
        tracing::debug!("Transport not open, dropping frame '{}'", frame);
        return false;
    }
    transport.send(frame.encode());
    true
}

/// Owns the channel state and runs every lifecycle transition, one at a time.
pub(crate) struct ChannelDriver<T: Transport> {
    transport: Arc<T>,
    signals: mpsc::UnboundedReceiver<Signal>,
    state: ChannelState,
}

impl<T: Transport> ChannelDriver<T> {
    pub fn new(transport: Arc<T>, signals: mpsc::UnboundedReceiver<Signal>) -> Self {
        Self {
            transport,
            signals,
            state: ChannelState::new(),
        }
    }

    pub async fn run(mut self) {
        tracing::debug!("Channel driver started for {}", self.transport.url());

        loop {
            let heartbeat_at = self.state.heartbeat.deadline();
            let reconnect_at = self.state.reconnect.deadline();

            tokio::select! {
                biased;

                signal = self.signals.recv() => match signal {
                    Some(Signal::Shutdown) | None => break,
                    Some(signal) => self.handle(signal),
                },
                _ = sleep_until(reconnect_at) => self.on_reconnect_due(),
                _ = sleep_until(heartbeat_at) => self.on_heartbeat_due(),
            }
        }

        self.state.reconnect.cancel();
        self.state.heartbeat.stop();
        if self.state.started {
            self.transport.disconnect();
        }
        tracing::info!("Channel to {} shut down", self.transport.url());
    }

    fn handle(&mut self, signal: Signal) {
        match signal {
            Signal::Start => self.start(),
            Signal::Transport(TransportEvent::Connect) => self.on_connect(),
            Signal::Transport(TransportEvent::Disconnect) => self.on_disconnect(),
            Signal::Transport(TransportEvent::Error(reason)) => {
                tracing::error!("Transport error on {}: {}", self.transport.url(), reason);
            }
            Signal::Transport(TransportEvent::Message(data)) => self.on_message(data),
            Signal::Register(kind, callback) => {
                self.state.callbacks.register(kind, callback);
            }
            Signal::ForceReconnect => self.force_reconnect(),
            Signal::Network(status) => self.on_network(status),
            Signal::Inspect(reply) => {
                let snapshot = self
                    .state
                    .snapshot(self.transport.state(), Instant::now());
                let _ = reply.send(snapshot);
            }
            Signal::Shutdown => {}
        }
    }

    fn start(&mut self) {
        if self.state.started {
            tracing::warn!("Channel already connecting, ignoring connect()");
            return;
        }
        self.state.started = true;
        self.transport.connect();
    }

    fn on_connect(&mut self) {
        tracing::info!("Channel connected to {}", self.transport.url());
        self.state.heartbeat.record_activity(Instant::now());

        if self.state.reconnect.on_connect() {
            // Not the first connect: let the application refresh itself
            self.state.callbacks.dispatch(ChannelEvent::Connect);
        }
        self.sync();
    }

    /// Single entry into the disconnected state, natural or synthesized
    fn on_disconnect(&mut self) {
        if !self.state.started {
            tracing::debug!("Disconnect before connect(), ignoring");
            return;
        }

        let outcome = self.state.reconnect.on_disconnect(Instant::now());
        if outcome.report {
            self.state.callbacks.dispatch(ChannelEvent::Disconnect);
        }
        tracing::info!(
            "Channel closed, reconnecting in {:?} (attempt {})",
            outcome.delay,
            outcome.attempts
        );
    }

    fn on_message(&mut self, data: String) {
        self.state.heartbeat.record_activity(Instant::now());

        if !self.state.callbacks.dispatch(ChannelEvent::Message(data)) {
            tracing::debug!(
                "No callback registered. Sign one up with Channel::on_message, dropping message"
            );
        }
    }

    fn on_reconnect_due(&mut self) {
        if self.state.reconnect.take_due(Instant::now()) {
            tracing::debug!("Reconnect attempt {}", self.state.reconnect.attempts());
            self.transport.connect();
        }
    }

    fn on_heartbeat_due(&mut self) {
        let now = Instant::now();
        if !self.state.heartbeat.is_due(now) {
            return;
        }

        match self.state.heartbeat.on_tick(now) {
            HeartbeatAction::Ping => {
                send_if_open(self.transport.as_ref(), &OutboundFrame::ping());
            }
            HeartbeatAction::Stale { .. }
                if !self.transport.is_open() || self.state.reconnect.deadline().is_some() =>
            {
                // Already down and recovering; the pending attempt stands
                tracing::debug!("Heartbeat late while reconnecting, leaving backoff alone");
            }
            HeartbeatAction::Stale { silent_for } => {
                tracing::warn!(
                    "Nothing heard for {:?}, presuming the connection dead",
                    silent_for
                );
                self.force_reconnect();
            }
        }
    }

    fn on_network(&mut self, status: NetworkStatus) {
        let late = self.state.heartbeat.is_late(Instant::now());
        let in_backoff = self.state.reconnect.in_backoff();

        match self.state.presence.observe(status, in_backoff, late) {
            PresenceDecision::Ignore => {
                tracing::debug!("{:?} event received, channel healthy", status);
            }
            PresenceDecision::ForceReconnect { accelerate } => {
                if accelerate {
                    tracing::info!("Online event received. Accelerating reconnect...");
                    self.state.reconnect.accelerate();
                } else {
                    tracing::info!("{:?} event received", status);
                }
                self.force_reconnect();
            }
        }
    }

    /// Tears the transport down and makes sure the reconnect path runs.
    ///
    /// A transport that stays open after `disconnect()`, or one that was not
    /// live to begin with, will never report a disconnect of its own, so one
    /// is synthesized.
    fn force_reconnect(&mut self) {
        if !self.state.started {
            tracing::debug!("Forced reconnect before connect(), ignoring");
            return;
        }

        let was_live = self.transport.state().is_live();
        self.transport.disconnect();

        if self.transport.is_open() || !was_live {
            tracing::debug!("Synthesizing disconnect");
            self.on_disconnect();
        }
    }

    /// Confirms server-side liveness after every (re)connect
    fn sync(&self) {
        send_if_open(self.transport.as_ref(), &OutboundFrame::ping());
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
