use super::{ConnectionState, Transport, TransportEvent, TransportEventKind, TransportHandler, TransportHandlers};
use crate::types::{Result, SOCKET_CLOSE_TIMEOUT_MS};
use futures::{SinkExt, StreamExt};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

enum Outbound {
    Frame(String),
    Close,
}

/// Full-duplex transport over a single WebSocket per `connect()`.
///
/// One task owns the socket: it writes queued frames, reads inbound frames
/// and, whatever ends the connection, fires `Disconnect` exactly once.
pub struct PersistentSocketTransport {
    inner: Arc<SocketInner>,
}

struct SocketInner {
    url: String,
    handlers: TransportHandlers,
    state: watch::Sender<ConnectionState>,
    outbound: Mutex<Option<mpsc::UnboundedSender<Outbound>>>,
    // Bumped per connect; a superseded connection stays silent
    epoch: AtomicU64,
    close_timeout: Duration,
}

impl PersistentSocketTransport {
    pub fn new(url: impl Into<String>) -> Self {
        let (state, _) = watch::channel(ConnectionState::Idle);
        Self {
            inner: Arc::new(SocketInner {
                url: url.into(),
                handlers: TransportHandlers::new(),
                state,
                outbound: Mutex::new(None),
                epoch: AtomicU64::new(0),
                close_timeout: Duration::from_millis(SOCKET_CLOSE_TIMEOUT_MS),
            }),
        }
    }
}

impl Transport for PersistentSocketTransport {
    fn url(&self) -> &str {
        &self.inner.url
    }

    fn connect(&self) {
        if self.state().is_live() {
            tracing::debug!("Socket already {:?}, ignoring connect", self.state());
            return;
        }

        let epoch = self.inner.epoch.fetch_add(1, Ordering::SeqCst) + 1;
        let (tx, rx) = mpsc::unbounded_channel();
        *self.inner.lock_outbound() = Some(tx);
        self.inner.state.send_replace(ConnectionState::Connecting);

        tracing::info!("Attempting socket connect to {}", self.inner.url);
        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move { inner.run(epoch, rx).await });
    }

    fn send(&self, message: String) {
        if !self.is_open() {
            tracing::debug!("Socket not open, dropping frame");
            return;
        }

        if let Some(tx) = self.inner.lock_outbound().as_ref()
            && tx.send(Outbound::Frame(message)).is_err()
        {
            tracing::debug!("Socket task gone, dropping frame");
        }
    }

    fn on(&self, kind: TransportEventKind, handler: TransportHandler) {
        self.inner.handlers.register(kind, handler);
    }

    fn state(&self) -> ConnectionState {
        *self.inner.state.borrow()
    }

    fn disconnect(&self) {
        let Some(tx) = self.inner.lock_outbound().take() else {
            tracing::debug!("Socket disconnect requested while idle");
            return;
        };

        self.inner.state.send_replace(ConnectionState::Closing);
        let _ = tx.send(Outbound::Close);
        tracing::info!("Closing socket to {}", self.inner.url);
    }
}

impl SocketInner {
    fn lock_outbound(&self) -> MutexGuard<'_, Option<mpsc::UnboundedSender<Outbound>>> {
        self.outbound.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn is_current(&self, epoch: u64) -> bool {
        self.epoch.load(Ordering::SeqCst) == epoch
    }

    fn fire(&self, epoch: u64, event: TransportEvent) {
        if self.is_current(epoch) {
            self.handlers.fire(event);
        }
    }

    async fn run(self: Arc<Self>, epoch: u64, mut outbound: mpsc::UnboundedReceiver<Outbound>) {
        let stream = tokio::select! {
            result = open_socket(&self.url) => match result {
                Ok(stream) => stream,
                Err(e) => {
                    tracing::error!("Socket connect to {} failed: {}", self.url, e);
                    self.fire(epoch, TransportEvent::Error(e.to_string()));
                    self.finish(epoch);
                    return;
                }
            },
            // Only a close request (or the sender being dropped) arrives before open
            _ = outbound.recv() => {
                tracing::debug!("Socket handshake abandoned");
                self.finish(epoch);
                return;
            }
        };

        if !self.is_current(epoch) {
            return;
        }
        self.state.send_replace(ConnectionState::Open);
        tracing::info!("Socket connected to {}", self.url);
        self.fire(epoch, TransportEvent::Connect);

        let (mut write, mut read) = stream.split();

        loop {
            tokio::select! {
                command = outbound.recv() => match command {
                    Some(Outbound::Frame(text)) => {
                        if let Err(e) = write.send(Message::Text(text.into())).await {
                            tracing::error!("Socket write failed: {}", e);
                            self.fire(epoch, TransportEvent::Error(e.to_string()));
                            break;
                        }
                    }
                    Some(Outbound::Close) | None => {
                        match tokio::time::timeout(self.close_timeout, write.close()).await {
                            Ok(Ok(())) => tracing::debug!("Socket closed cleanly"),
                            Ok(Err(e)) => tracing::debug!("Socket close failed: {}", e),
                            Err(_) => tracing::warn!("Socket close handshake timed out"),
                        }
                        break;
                    }
                },
                frame = read.next() => match frame {
                    Some(Ok(Message::Text(text))) => {
                        tracing::debug!("Received text frame ({} bytes)", text.len());
                        self.fire(epoch, TransportEvent::Message(text.to_string()));
                    }
                    Some(Ok(Message::Close(frame))) => {
                        if let Some(close_frame) = frame {
                            tracing::info!(
                                "Server closed connection: code={:?}, reason='{}'",
                                close_frame.code,
                                close_frame.reason
                            );
                        } else {
                            tracing::info!("Server closed connection without close frame");
                        }
                        break;
                    }
                    Some(Ok(Message::Ping(data))) => {
                        tracing::debug!("Received ping ({} bytes)", data.len());
                    }
                    Some(Ok(Message::Pong(data))) => {
                        tracing::debug!("Received pong ({} bytes)", data.len());
                    }
                    Some(Ok(Message::Binary(data))) => {
                        tracing::warn!("Received unexpected binary frame ({} bytes)", data.len());
                    }
                    Some(Ok(Message::Frame(_))) => {
                        tracing::debug!("Received raw frame (internal)");
                    }
                    Some(Err(e)) => {
                        tracing::error!("Socket read error: {}", e);
                        self.fire(epoch, TransportEvent::Error(e.to_string()));
                        break;
                    }
                    None => {
                        tracing::warn!("Socket stream ended");
                        break;
                    }
                },
            }
        }

        self.finish(epoch);
    }

    fn finish(&self, epoch: u64) {
        if !self.is_current(epoch) {
            return;
        }
        self.lock_outbound().take();
        self.state.send_replace(ConnectionState::Idle);
        tracing::info!("Socket to {} closed", self.url);
        self.handlers.fire(TransportEvent::Disconnect);
    }
}

async fn open_socket(url: &str) -> Result<WsStream> {
    let (stream, response) = tokio_tungstenite::connect_async(url).await?;
    tracing::debug!("Socket handshake completed with status {}", response.status());
    Ok(stream)
}
