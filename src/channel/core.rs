use super::builder::{ChannelBuilder, ChannelOptions};
use super::driver::{ChannelDriver, Signal, send_if_open};
use super::state::ChannelSnapshot;
use crate::messaging::{Callback, ChannelEvent, ChannelEventKind, NetworkStatus};
use crate::transport::{SelectedTransport, Transport, TransportEvent, TransportEventKind};
use crate::types::{ChannelError, OutboundFrame, Result};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;

/// A resilient logical channel to the server.
///
/// The channel hides transport selection, disconnection and recovery behind a
/// small contract: [`send`](Self::send) frames and [`on`](Self::on)
/// callbacks. Lost connections are retried forever with cubic backoff, an
/// idle heartbeat catches half-open connections, and host connectivity
/// changes can be fed in to speed recovery up.
///
/// `Channel` is a cheap handle: clones share the same driver task, which is
/// shut down when the last handle is dropped.
///
/// # Example
///
/// ```no_run
/// use sitebricks_channel_rs::{Channel, ChannelOptions};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let channel = Channel::new(ChannelOptions {
///     page_url: "https://example.com/wiki".to_string(),
///     url_prefix: "/channel".to_string(),
///     ..Default::default()
/// })?;
///
/// channel.on_message(|data| println!("received {}", data))?;
/// channel.on_reconnect(|| println!("back online, refreshing"))?;
/// channel.connect()?;
///
/// channel.send(Some("chat"), "hello");
/// # Ok(())
/// # }
/// ```
pub struct Channel<T: Transport = SelectedTransport> {
    shared: Arc<ChannelShared<T>>,
}

struct ChannelShared<T: Transport> {
    transport: Arc<T>,
    signals: mpsc::UnboundedSender<Signal>,
}

impl<T: Transport> Drop for ChannelShared<T> {
    fn drop(&mut self) {
        // Transport handlers hold senders too, so the driver never sees the
        // queue close on its own
        let _ = self.signals.send(Signal::Shutdown);
    }
}

impl<T: Transport> Clone for Channel<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl Channel<SelectedTransport> {
    /// Creates a channel over the best transport the options allow.
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(options: ChannelOptions) -> Result<Self> {
        Ok(ChannelBuilder::new(options)?.build())
    }
}

impl<T: Transport> Channel<T> {
    /// Wraps an already constructed transport and spawns the driver task.
    ///
    /// The transport's handlers are taken over by the channel.
    pub fn with_transport(transport: T) -> Self {
        let transport = Arc::new(transport);
        let (tx, rx) = mpsc::unbounded_channel();

        for kind in TransportEventKind::ALL {
            let tx = tx.clone();
            transport.on(
                kind,
                Arc::new(move |event: TransportEvent| {
                    let _ = tx.send(Signal::Transport(event));
                }),
            );
        }

        let driver = ChannelDriver::new(Arc::clone(&transport), rx);
        tokio::spawn(driver.run());

        Self {
            shared: Arc::new(ChannelShared {
                transport,
                signals: tx,
            }),
        }
    }

    /// Starts the transport. Calling it again has no effect.
    pub fn connect(&self) -> Result<()> {
        self.signal(Signal::Start)
    }

    /// Sends `data`, framed as `"<event>:<data>"` when an event name is given.
    ///
    /// Nothing is queued: when the transport is not open the frame is dropped
    /// and `false` is returned.
    pub fn send(&self, event: Option<&str>, data: &str) -> bool {
        let mut frame = OutboundFrame::new(data);
        if let Some(event) = event {
            frame = frame.with_event(event);
        }
        send_if_open(self.shared.transport.as_ref(), &frame)
    }

    /// Sends a no-op keep-alive frame
    pub fn sync(&self) -> bool {
        send_if_open(self.shared.transport.as_ref(), &OutboundFrame::ping())
    }

    /// Registers the callback for a named event: `message`, `connect` or
    /// `disconnect`. The last registration for a name wins.
    ///
    /// `connect` fires on reconnects only, and `disconnect` only once the
    /// channel has failed to come back several times in a row.
    pub fn on<F>(&self, event: &str, callback: F) -> Result<()>
    where
        F: Fn(ChannelEvent) + Send + Sync + 'static,
    {
        let kind: ChannelEventKind = event.parse()?;
        self.on_kind(kind, callback)
    }

    pub fn on_kind<F>(&self, kind: ChannelEventKind, callback: F) -> Result<()>
    where
        F: Fn(ChannelEvent) + Send + Sync + 'static,
    {
        let callback: Callback = Arc::new(callback);
        self.signal(Signal::Register(kind, callback))
    }

    pub fn on_message<F>(&self, callback: F) -> Result<()>
    where
        F: Fn(String) + Send + Sync + 'static,
    {
        self.on_kind(ChannelEventKind::Message, move |event| {
            if let ChannelEvent::Message(data) = event {
                callback(data);
            }
        })
    }

    pub fn on_reconnect<F>(&self, callback: F) -> Result<()>
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.on_kind(ChannelEventKind::Connect, move |_| callback())
    }

    pub fn on_disconnect<F>(&self, callback: F) -> Result<()>
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.on_kind(ChannelEventKind::Disconnect, move |_| callback())
    }

    /// Closes the transport and goes through the reconnect path
    pub fn force_reconnect(&self) -> Result<()> {
        self.signal(Signal::ForceReconnect)
    }

    /// Reports a host connectivity change
    pub fn network_status_changed(&self, status: NetworkStatus) -> Result<()> {
        self.signal(Signal::Network(status))
    }

    /// Forwards every change published on `status` to the channel.
    ///
    /// The task ends when the sender is dropped or the channel shuts down.
    pub fn watch_network(&self, mut status: watch::Receiver<NetworkStatus>) -> JoinHandle<()> {
        let signals = self.shared.signals.clone();

        tokio::spawn(async move {
            while status.changed().await.is_ok() {
                let current = *status.borrow_and_update();
                if signals.send(Signal::Network(current)).is_err() {
                    break;
                }
            }
            tracing::debug!("Network watcher stopped");
        })
    }

    /// Current lifecycle state, taken after every earlier call has been handled
    pub async fn snapshot(&self) -> Result<ChannelSnapshot> {
        let (tx, rx) = oneshot::channel();
        self.signal(Signal::Inspect(tx))?;
        rx.await.map_err(|_| ChannelError::Closed)
    }

    pub fn is_open(&self) -> bool {
        self.shared.transport.is_open()
    }

    pub fn url(&self) -> &str {
        self.shared.transport.url()
    }

    pub fn transport(&self) -> &T {
        &self.shared.transport
    }

    /// Stops the driver and closes the transport. No reconnect follows.
    pub fn shutdown(&self) {
        let _ = self.shared.signals.send(Signal::Shutdown);
    }

    fn signal(&self, signal: Signal) -> Result<()> {
        self.shared
            .signals
            .send(signal)
            .map_err(|_| ChannelError::Closed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::PollingTransport;
    use crate::transport::stub::StubTransport;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::time::{self, Instant};

    async fn settle() {
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
    }

    async fn advance(ms: u64) {
        time::advance(Duration::from_millis(ms)).await;
        settle().await;
    }

    fn counter() -> (Arc<AtomicUsize>, impl Fn() + Send + Sync + 'static) {
        let count = Arc::new(AtomicUsize::new(0));
        let handle = Arc::clone(&count);
        (count, move || {
            handle.fetch_add(1, Ordering::SeqCst);
        })
    }

    async fn connected(stub: StubTransport) -> Channel<StubTransport> {
        let channel = Channel::with_transport(stub);
        channel.connect().unwrap();
        channel.snapshot().await.unwrap();
        channel.transport().open();
        channel.snapshot().await.unwrap();
        channel
    }

    #[tokio::test(start_paused = true)]
    async fn test_fresh_connect_syncs_once() {
        let channel = Channel::with_transport(StubTransport::new());
        let (reconnects, on_reconnect) = counter();
        channel.on_reconnect(on_reconnect).unwrap();

        channel.connect().unwrap();
        channel.snapshot().await.unwrap();
        assert_eq!(channel.transport().connects(), 1);

        channel.transport().open();
        let snapshot = channel.snapshot().await.unwrap();

        assert_eq!(snapshot.attempts, 0);
        assert_eq!(snapshot.last_activity, Some(Instant::now()));
        assert_eq!(channel.transport().sent(), vec!["ping:"]);
        assert_eq!(reconnects.load(Ordering::SeqCst), 0);
        assert!(channel.is_open());
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_connect_is_ignored() {
        let channel = Channel::with_transport(StubTransport::new());
        channel.connect().unwrap();
        channel.connect().unwrap();
        channel.snapshot().await.unwrap();
        assert_eq!(channel.transport().connects(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_backoff_and_disconnect_report() {
        let channel = connected(StubTransport::new()).await;
        let (reported, on_disconnect) = counter();
        channel.on_disconnect(on_disconnect).unwrap();

        for (attempt, delay) in [(1, 100), (2, 800), (3, 2700)] {
            channel.transport().drop_connection();
            let snapshot = channel.snapshot().await.unwrap();
            assert_eq!(snapshot.attempts, attempt);
            assert_eq!(reported.load(Ordering::SeqCst), 0);

            advance(delay).await;
            assert_eq!(channel.transport().connects(), attempt as usize + 1);
        }

        let dropped_at = Instant::now();
        channel.transport().drop_connection();
        let snapshot = channel.snapshot().await.unwrap();
        assert_eq!(snapshot.attempts, 4);
        assert_eq!(reported.load(Ordering::SeqCst), 1);
        assert_eq!(
            snapshot.reconnect_at,
            Some(dropped_at + Duration::from_millis(6400))
        );

        advance(6399).await;
        assert_eq!(channel.transport().connects(), 4);
        advance(1).await;
        assert_eq!(channel.transport().connects(), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_counter_stops_at_cap() {
        let channel = connected(StubTransport::new()).await;

        for _ in 0..12 {
            channel.transport().drop_connection();
        }
        let snapshot = channel.snapshot().await.unwrap();
        assert_eq!(snapshot.attempts, 8);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reconnect_callback_and_resync() {
        let channel = connected(StubTransport::new()).await;
        let (reconnects, on_reconnect) = counter();
        channel.on_reconnect(on_reconnect).unwrap();

        channel.transport().drop_connection();
        channel.snapshot().await.unwrap();
        advance(100).await;

        channel.transport().open();
        let snapshot = channel.snapshot().await.unwrap();

        assert_eq!(snapshot.attempts, 0);
        assert_eq!(snapshot.reconnect_at, None);
        assert_eq!(reconnects.load(Ordering::SeqCst), 1);
        assert_eq!(channel.transport().sent(), vec!["ping:", "ping:"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_send_while_closed_is_dropped() {
        let channel = Channel::with_transport(StubTransport::new());

        for _ in 0..3 {
            assert!(!channel.send(Some("chat"), "hi"));
        }
        assert!(channel.transport().sent().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_send_frames_event() {
        let channel = connected(StubTransport::new()).await;

        assert!(channel.send(Some("chat"), "hi"));
        assert!(channel.send(None, "raw"));
        assert_eq!(channel.transport().sent(), vec!["ping:", "chat:hi", "raw"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_messages_reach_callback_in_order() {
        let channel = connected(StubTransport::new()).await;
        let received = Arc::new(std::sync::Mutex::new(Vec::new()));
        let sink = Arc::clone(&received);
        channel
            .on_message(move |data| sink.lock().unwrap().push(data))
            .unwrap();

        channel.transport().deliver("one");
        channel.transport().deliver("two");
        channel.snapshot().await.unwrap();

        assert_eq!(*received.lock().unwrap(), vec!["one", "two"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transport_error_does_not_count() {
        let channel = connected(StubTransport::new()).await;
        channel.transport().fail("boom");
        let snapshot = channel.snapshot().await.unwrap();
        assert_eq!(snapshot.attempts, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_heartbeat_pings_then_detects_stale() {
        let channel = connected(StubTransport::new()).await;
        channel.transport().deliver("hello");
        channel.snapshot().await.unwrap();

        advance(25_000).await;
        assert_eq!(channel.transport().sent(), vec!["ping:", "ping:"]);
        assert_eq!(channel.transport().disconnects(), 0);

        advance(25_000).await;
        let snapshot = channel.snapshot().await.unwrap();
        assert_eq!(channel.transport().disconnects(), 1);
        assert_eq!(channel.transport().sent().len(), 2);
        assert_eq!(snapshot.attempts, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_activity_pushes_heartbeat_back() {
        let channel = connected(StubTransport::new()).await;
        channel.transport().deliver("a");
        channel.snapshot().await.unwrap();

        advance(20_000).await;
        channel.transport().deliver("b");
        channel.snapshot().await.unwrap();

        advance(20_000).await;
        assert_eq!(channel.transport().sent().len(), 1);

        advance(5_000).await;
        assert_eq!(channel.transport().sent(), vec!["ping:", "ping:"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_long_outage_keeps_retrying_at_cap() {
        let channel = connected(StubTransport::new()).await;
        channel.transport().deliver("hello");
        channel.snapshot().await.unwrap();

        channel.transport().refuse_connections();
        channel.transport().drop_connection();
        channel.snapshot().await.unwrap();

        // Far past the stale threshold, with heartbeat ticks all along
        for _ in 0..600 {
            advance(1_000).await;
        }
        let snapshot = channel.snapshot().await.unwrap();
        assert_eq!(snapshot.attempts, 8);
        let halfway = channel.transport().connects();

        for _ in 0..600 {
            advance(1_000).await;
        }
        let snapshot = channel.snapshot().await.unwrap();

        // One attempt every 51.2 s once capped
        assert!(channel.transport().connects() - halfway >= 10);
        assert_eq!(snapshot.attempts, 8);
        let pending = snapshot
            .reconnect_at
            .unwrap()
            .saturating_duration_since(Instant::now());
        assert!(pending <= Duration::from_millis(51_200));
        // Nothing was live to tear down
        assert_eq!(channel.transport().disconnects(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_open_connection_still_forced_after_reconnect() {
        let channel = connected(StubTransport::new()).await;
        channel.transport().drop_connection();
        channel.snapshot().await.unwrap();
        advance(100).await;
        channel.transport().open();
        channel.snapshot().await.unwrap();

        // The reconnect counts as activity; silence from there goes stale
        advance(25_000).await;
        assert_eq!(channel.transport().disconnects(), 0);
        advance(25_000).await;
        let snapshot = channel.snapshot().await.unwrap();
        assert_eq!(channel.transport().disconnects(), 1);
        assert_eq!(snapshot.attempts, 1);
    }

    #[tokio::test]
    async fn test_polling_against_dead_server_backs_off() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let channel = Channel::with_transport(PollingTransport::new(format!(
            "http://{}/async?SBSocketId=x",
            addr
        )));
        let (reconnects, on_reconnect) = counter();
        let (reported, on_disconnect) = counter();
        channel.on_reconnect(on_reconnect).unwrap();
        channel.on_disconnect(on_disconnect).unwrap();
        channel.connect().unwrap();

        // 100 + 800 + 2700 ms of backoff before the fourth failure
        let give_up = Instant::now() + Duration::from_secs(15);
        loop {
            let snapshot = channel.snapshot().await.unwrap();
            if snapshot.attempts >= 4 {
                break;
            }
            assert!(
                Instant::now() < give_up,
                "backoff stuck at {} attempts",
                snapshot.attempts
            );
            time::sleep(Duration::from_millis(20)).await;
        }

        assert_eq!(reconnects.load(Ordering::SeqCst), 0);
        assert_eq!(reported.load(Ordering::SeqCst), 1);
        assert!(!channel.is_open());
    }

    #[tokio::test(start_paused = true)]
    async fn test_offline_forces_reconnect() {
        let channel = connected(StubTransport::new()).await;
        channel.transport().drop_connection();
        channel.snapshot().await.unwrap();

        channel
            .network_status_changed(NetworkStatus::Offline)
            .unwrap();
        let snapshot = channel.snapshot().await.unwrap();

        assert_eq!(channel.transport().disconnects(), 1);
        assert_eq!(snapshot.attempts, 2);
        assert_eq!(snapshot.network, Some(NetworkStatus::Offline));
    }

    #[tokio::test(start_paused = true)]
    async fn test_online_with_one_attempt_is_ignored() {
        let channel = connected(StubTransport::new()).await;
        channel.transport().drop_connection();
        channel.snapshot().await.unwrap();

        channel.network_status_changed(NetworkStatus::Online).unwrap();
        let snapshot = channel.snapshot().await.unwrap();

        assert_eq!(channel.transport().disconnects(), 0);
        assert_eq!(snapshot.attempts, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_online_during_backoff_accelerates() {
        let channel = connected(StubTransport::new()).await;
        channel.transport().drop_connection();
        channel.transport().drop_connection();
        channel.snapshot().await.unwrap();

        let now = Instant::now();
        channel.network_status_changed(NetworkStatus::Online).unwrap();
        let snapshot = channel.snapshot().await.unwrap();

        assert_eq!(channel.transport().disconnects(), 1);
        assert_eq!(snapshot.attempts, 2);
        assert_eq!(snapshot.reconnect_at, Some(now + Duration::from_millis(800)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_watch_network_forwards_changes() {
        let channel = connected(StubTransport::new()).await;
        let (tx, rx) = watch::channel(NetworkStatus::Online);
        let watcher = channel.watch_network(rx);

        tx.send(NetworkStatus::Offline).unwrap();
        settle().await;
        let snapshot = channel.snapshot().await.unwrap();
        assert_eq!(snapshot.network, Some(NetworkStatus::Offline));
        assert_eq!(channel.transport().disconnects(), 1);

        drop(tx);
        watcher.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_stubborn_transport_gets_synthesized_disconnect() {
        let channel = connected(StubTransport::stubborn()).await;

        channel.force_reconnect().unwrap();
        let snapshot = channel.snapshot().await.unwrap();

        assert_eq!(channel.transport().disconnects(), 1);
        assert!(channel.is_open());
        assert_eq!(snapshot.attempts, 1);
        assert!(snapshot.reconnect_at.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_force_reconnect_before_connect_is_ignored() {
        let channel = Channel::with_transport(StubTransport::new());
        channel.force_reconnect().unwrap();
        let snapshot = channel.snapshot().await.unwrap();

        assert!(!snapshot.started);
        assert_eq!(snapshot.attempts, 0);
        assert_eq!(channel.transport().disconnects(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unknown_event_name_is_rejected() {
        let channel = Channel::with_transport(StubTransport::new());
        let result = channel.on("bogus", |_: ChannelEvent| {});
        assert!(matches!(result, Err(ChannelError::InvalidEventKind(name)) if name == "bogus"));
        assert!(channel.on("message", |_: ChannelEvent| {}).is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_closes_channel() {
        let channel = connected(StubTransport::new()).await;

        channel.shutdown();
        assert!(matches!(
            channel.snapshot().await,
            Err(ChannelError::Closed)
        ));
        assert!(matches!(channel.connect(), Err(ChannelError::Closed)));
        assert_eq!(channel.transport().disconnects(), 1);
        assert!(!channel.is_open());
    }
}
