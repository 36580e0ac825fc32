use super::{ConnectionState, Transport, TransportEvent, TransportEventKind, TransportHandler, TransportHandlers};
use crate::infrastructure::TaskManager;
use crate::types::Result;
use reqwest::header::CONTENT_TYPE;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Emulates a persistent channel with HTTP long-polling.
///
/// A GET stays outstanding until the server has something to say; every
/// response is delivered as a message and re-arms the poll. Sends are
/// separate POSTs to the same URL. Open means at least one GET in flight.
///
/// Only the very first `connect()` is reported straight away. A later one is
/// reported by its first successful response, so an unreachable server shows
/// up as a run of disconnects and nothing else.
pub struct PollingTransport {
    inner: Arc<PollingInner>,
}

struct PollingInner {
    url: String,
    client: reqwest::Client,
    handlers: TransportHandlers,
    outstanding: AtomicUsize,
    // No connect has been made yet
    first: AtomicBool,
    // The current run of polls has fired `Connect`
    announced: AtomicBool,
    // Bumped by disconnect so aborted polls never re-arm or report
    session: AtomicU64,
    polls: Mutex<TaskManager>,
}

impl PollingTransport {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(PollingInner {
                url: url.into(),
                client: reqwest::Client::new(),
                handlers: TransportHandlers::new(),
                outstanding: AtomicUsize::new(0),
                first: AtomicBool::new(true),
                announced: AtomicBool::new(false),
                session: AtomicU64::new(0),
                polls: Mutex::new(TaskManager::new()),
            }),
        }
    }

    /// Number of GET requests currently in flight
    pub fn outstanding(&self) -> usize {
        self.inner.outstanding.load(Ordering::SeqCst)
    }
}

impl Transport for PollingTransport {
    fn url(&self) -> &str {
        &self.inner.url
    }

    fn connect(&self) {
        if self.is_open() {
            tracing::debug!("Long-poll already running, ignoring connect");
            return;
        }

        tracing::info!("Starting long-poll against {}", self.inner.url);

        // No handshake exists on plain HTTP, so the first connect is simulated
        let first = self.inner.first.swap(false, Ordering::SeqCst);
        self.inner.announced.store(first, Ordering::SeqCst);
        if first {
            self.inner.handlers.fire(TransportEvent::Connect);
        }

        self.inner.spawn_poll();
    }

    fn send(&self, message: String) {
        if !self.is_open() {
            tracing::debug!("Long-poll not open, dropping frame");
            return;
        }

        let client = self.inner.client.clone();
        let url = self.inner.url.clone();
        tokio::spawn(async move {
            let request = client
                .post(&url)
                .header(CONTENT_TYPE, "application/json")
                .body(message);

            // The response body carries nothing for us
            match request.send().await {
                Ok(response) => tracing::debug!("Posted frame, status {}", response.status()),
                Err(e) => tracing::error!("Posting frame to {} failed: {}", url, e),
            }
        });
    }

    fn on(&self, kind: TransportEventKind, handler: TransportHandler) {
        self.inner.handlers.register(kind, handler);
    }

    fn state(&self) -> ConnectionState {
        if self.outstanding() > 0 {
            ConnectionState::Open
        } else {
            ConnectionState::Idle
        }
    }

    fn disconnect(&self) {
        self.inner.session.fetch_add(1, Ordering::SeqCst);
        let aborted = self.inner.lock_polls().abort_all();

        if self.inner.outstanding.swap(0, Ordering::SeqCst) > 0 {
            tracing::info!(
                "Long-poll against {} stopped, {} request(s) aborted",
                self.inner.url,
                aborted
            );
            self.inner.handlers.fire(TransportEvent::Disconnect);
        } else {
            tracing::debug!("Long-poll disconnect requested while idle");
        }
    }
}

impl PollingInner {
    fn lock_polls(&self) -> MutexGuard<'_, TaskManager> {
        self.polls.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn spawn_poll(self: &Arc<Self>) {
        let session = self.session.load(Ordering::SeqCst);
        self.outstanding.fetch_add(1, Ordering::SeqCst);

        let inner = Arc::clone(self);
        self.lock_polls().spawn(async move { inner.poll(session).await });
    }

    async fn poll(self: Arc<Self>, session: u64) {
        let result = self.fetch().await;
        if self.session.load(Ordering::SeqCst) != session {
            return;
        }

        match result {
            Ok(body) => {
                tracing::debug!("Long-poll returned {} bytes", body.len());
                if !self.announced.swap(true, Ordering::SeqCst) {
                    self.handlers.fire(TransportEvent::Connect);
                }
                self.handlers.fire(TransportEvent::Message(body));
                if let Some(remaining) = self.release(session)
                    && remaining <= 1
                {
                    self.spawn_poll();
                }
            }
            Err(e) => {
                tracing::error!("Long-poll request to {} failed: {}", self.url, e);
                self.handlers.fire(TransportEvent::Error(e.to_string()));
                if self.release(session) == Some(0) {
                    self.handlers.fire(TransportEvent::Disconnect);
                }
            }
        }
    }

    async fn fetch(&self) -> Result<String> {
        let response = self.client.get(&self.url).send().await?.error_for_status()?;
        Ok(response.text().await?)
    }

    /// Marks one GET of `session` as finished, returning how many remain.
    ///
    /// `None` when a disconnect got there first: the count was already
    /// zeroed and that disconnect has been reported.
    fn release(&self, session: u64) -> Option<usize> {
        let previous = self
            .outstanding
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .ok()?;

        if self.session.load(Ordering::SeqCst) != session {
            return None;
        }
        Some(previous - 1)
    }
}
